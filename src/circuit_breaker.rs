use crate::errors::AppError;
use crate::models::{NormalizedOrder, StoredOrder};
use crate::store::{CandidatePool, OrderStore};
use chrono::{DateTime, Utc};
use failsafe::{backoff, failure_policy, CircuitBreaker, Config, Error};
use std::time::Duration;

/// Creates a circuit breaker for candidate-pool reads to prevent cascading failures.
///
/// # Configuration
///
/// - **Failure threshold**: `failure_threshold` consecutive failures triggers OPEN state.
/// - **Backoff**: Exponential backoff from 10s to 60s before attempting recovery.
///
/// # States
///
/// - **CLOSED**: Normal operation, reads pass through.
/// - **OPEN**: Too many failures, reads fail fast.
/// - **HALF_OPEN**: Testing if the pool recovered.
pub fn create_pool_circuit_breaker(failure_threshold: u32) -> impl CircuitBreaker {
    let backoff_strategy = backoff::exponential(
        Duration::from_secs(10), // Initial delay
        Duration::from_secs(60), // Maximum delay
    );

    let failure_policy = failure_policy::consecutive_failures(failure_threshold, backoff_strategy);

    Config::new().failure_policy(failure_policy).build()
}

/// A [`CandidatePool`] whose reads go through a circuit breaker.
///
/// While the circuit is open every read fails with
/// [`AppError::UpstreamUnavailable`] without touching the inner pool.
pub struct GuardedPool<P, B> {
    inner: P,
    breaker: B,
}

/// Wrap `inner` with a breaker that opens after `failure_threshold`
/// consecutive failed reads.
pub fn guard_pool<P: CandidatePool>(
    inner: P,
    failure_threshold: u32,
) -> GuardedPool<P, impl CircuitBreaker> {
    GuardedPool {
        inner,
        breaker: create_pool_circuit_breaker(failure_threshold),
    }
}

impl<P, B: CircuitBreaker> GuardedPool<P, B> {
    pub fn inner(&self) -> &P {
        &self.inner
    }

    /// Whether the next read would reach the inner pool.
    pub fn is_available(&self) -> bool {
        self.breaker.is_call_permitted()
    }
}

impl<P: CandidatePool, B: CircuitBreaker> CandidatePool for GuardedPool<P, B> {
    fn find_orders(
        &self,
        email: Option<&str>,
        name: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StoredOrder>, AppError> {
        match self
            .breaker
            .call(|| self.inner.find_orders(email, name, start, end))
        {
            Ok(orders) => Ok(orders),
            Err(Error::Inner(e)) => {
                tracing::warn!("Candidate pool read failed: {}", e);
                Err(e)
            }
            Err(Error::Rejected) => {
                tracing::warn!("Candidate pool circuit open, failing fast");
                Err(AppError::UpstreamUnavailable(
                    "candidate pool circuit open".to_string(),
                ))
            }
        }
    }
}

/// Writes pass straight through; only candidate reads trip the breaker.
impl<P: OrderStore, B: CircuitBreaker> OrderStore for GuardedPool<P, B> {
    fn insert_if_absent(&mut self, order: &NormalizedOrder) -> Result<bool, AppError> {
        self.inner.insert_if_absent(order)
    }

    fn record_link(
        &mut self,
        order_id: i64,
        origin_order_id: i64,
        inherited_theme: Option<&str>,
    ) -> Result<bool, AppError> {
        self.inner
            .record_link(order_id, origin_order_id, inherited_theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FlakyPool {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CandidatePool for FlakyPool {
        fn find_orders(
            &self,
            _email: Option<&str>,
            _name: Option<&str>,
            _start: DateTime<Utc>,
            _end: DateTime<Utc>,
        ) -> Result<Vec<StoredOrder>, AppError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(AppError::UpstreamUnavailable("connection refused".to_string()))
            } else {
                Ok(Vec::new())
            }
        }
    }

    fn read(pool: &impl CandidatePool) -> Result<Vec<StoredOrder>, AppError> {
        let end = Utc::now();
        pool.find_orders(Some("a@x.com"), None, end - ChronoDuration::hours(24), end)
    }

    #[test]
    fn test_circuit_opens_after_failures() {
        let pool = guard_pool(
            FlakyPool {
                calls: AtomicUsize::new(0),
                fail: true,
            },
            3,
        );

        for _ in 0..3 {
            let err = read(&pool).unwrap_err();
            assert_eq!(
                err,
                AppError::UpstreamUnavailable("connection refused".to_string())
            );
        }

        // Circuit is open: fails fast without reaching the pool
        let err = read(&pool).unwrap_err();
        assert_eq!(
            err,
            AppError::UpstreamUnavailable("candidate pool circuit open".to_string())
        );
        assert_eq!(pool.inner().calls.load(Ordering::SeqCst), 3);
        assert!(!pool.is_available());
    }

    #[test]
    fn test_circuit_allows_success() {
        let pool = guard_pool(
            FlakyPool {
                calls: AtomicUsize::new(0),
                fail: false,
            },
            3,
        );

        assert!(read(&pool).unwrap().is_empty());
        assert!(pool.is_available());
    }

    #[test]
    fn test_guarded_store_passes_writes_through() {
        use crate::store::InMemoryOrderStore;

        let mut store = guard_pool(InMemoryOrderStore::new(), 3);
        assert!(store.inner().get(1).is_none());
        assert!(!store.record_link(1, 2, None).unwrap());
        assert!(read(&store).unwrap().is_empty());
        assert!(store.inner().is_empty());
    }
}
