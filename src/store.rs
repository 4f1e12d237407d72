/// Candidate pool and order store seams
///
/// Persistence belongs to the caller. The engine reads prior orders through
/// [`CandidatePool`] and, for batch ingestion, writes through [`OrderStore`].
/// [`InMemoryOrderStore`] implements both for tests, demos and batch jobs
/// that keep a page in memory.
use crate::errors::AppError;
use crate::models::{NormalizedOrder, StoredOrder};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// Read access to previously normalized orders.
pub trait CandidatePool {
    /// Orders placed in `[start, end)` whose email equals `email` or whose
    /// full/first name contains `name`. Implementations may return a superset;
    /// the linker re-applies every filter.
    fn find_orders(
        &self,
        email: Option<&str>,
        name: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StoredOrder>, AppError>;
}

impl<P: CandidatePool + ?Sized> CandidatePool for &P {
    fn find_orders(
        &self,
        email: Option<&str>,
        name: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StoredOrder>, AppError> {
        (**self).find_orders(email, name, start, end)
    }
}

/// Write access used by batch ingestion.
pub trait OrderStore: CandidatePool {
    /// Insert `order` unless its id is already stored. Returns `false` for
    /// an existing id, leaving the stored record untouched.
    fn insert_if_absent(&mut self, order: &NormalizedOrder) -> Result<bool, AppError>;

    /// Set the origin link, and the inherited theme if given, only while the
    /// stored order has no origin yet. Returns `false` when it already had one.
    fn record_link(
        &mut self,
        order_id: i64,
        origin_order_id: i64,
        inherited_theme: Option<&str>,
    ) -> Result<bool, AppError>;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryOrderStore {
    orders: BTreeMap<i64, StoredOrder>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_orders(orders: impl IntoIterator<Item = StoredOrder>) -> Self {
        Self {
            orders: orders.into_iter().map(|o| (o.order_id, o)).collect(),
        }
    }

    pub fn get(&self, order_id: i64) -> Option<&StoredOrder> {
        self.orders.get(&order_id)
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

fn matches_identity(order: &StoredOrder, email: Option<&str>, name: Option<&str>) -> bool {
    if email.is_none() && name.is_none() {
        return true;
    }

    let email_hit = email
        .zip(order.customer_email.as_deref())
        .is_some_and(|(wanted, stored)| wanted == stored);

    let name_hit = name.is_some_and(|wanted| {
        let wanted = wanted.to_lowercase();
        [&order.customer_name, &order.customer_first_name]
            .into_iter()
            .flatten()
            .any(|stored| stored.to_lowercase().contains(&wanted))
    });

    email_hit || name_hit
}

impl CandidatePool for InMemoryOrderStore {
    fn find_orders(
        &self,
        email: Option<&str>,
        name: Option<&str>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<StoredOrder>, AppError> {
        Ok(self
            .orders
            .values()
            .filter(|o| o.ordered_at.is_some_and(|at| at >= start && at < end))
            .filter(|o| matches_identity(o, email, name))
            .cloned()
            .collect())
    }
}

impl OrderStore for InMemoryOrderStore {
    fn insert_if_absent(&mut self, order: &NormalizedOrder) -> Result<bool, AppError> {
        if self.orders.contains_key(&order.order_id) {
            return Ok(false);
        }
        self.orders.insert(order.order_id, order.to_stored());
        Ok(true)
    }

    fn record_link(
        &mut self,
        order_id: i64,
        origin_order_id: i64,
        inherited_theme: Option<&str>,
    ) -> Result<bool, AppError> {
        let Some(stored) = self.orders.get_mut(&order_id) else {
            return Ok(false);
        };
        if stored.origin_order_id.is_some() {
            return Ok(false);
        }

        stored.origin_order_id = Some(origin_order_id);
        if let Some(theme) = inherited_theme {
            stored.theme = Some(theme.to_string());
        }
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap()
    }

    fn stored(order_id: i64, hours_ago: i64, email: &str, name: &str) -> StoredOrder {
        StoredOrder {
            order_id,
            ordered_at: Some(t0() - Duration::hours(hours_ago)),
            customer_name: Some(name.to_string()),
            customer_first_name: name.split_whitespace().next().map(str::to_string),
            customer_email: Some(email.to_string()),
            product_ids: vec![1],
            theme: None,
            origin_order_id: None,
        }
    }

    #[test]
    fn test_window_is_half_open() {
        let store = InMemoryOrderStore::with_orders([
            stored(1, 24, "a@x.com", "Ann"),
            stored(2, 0, "a@x.com", "Ann"),
            stored(3, 25, "a@x.com", "Ann"),
        ]);

        let found = store
            .find_orders(Some("a@x.com"), None, t0() - Duration::hours(24), t0())
            .unwrap();
        let ids: Vec<i64> = found.iter().map(|o| o.order_id).collect();
        assert_eq!(ids, vec![1]);
    }

    #[test]
    fn test_identity_prefilter() {
        let store = InMemoryOrderStore::with_orders([
            stored(1, 1, "a@x.com", "Ann de Wit"),
            stored(2, 1, "b@x.com", "Bram Smit"),
        ]);
        let start = t0() - Duration::hours(24);

        let by_name = store.find_orders(None, Some("smit"), start, t0()).unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name[0].order_id, 2);

        let by_either = store
            .find_orders(Some("a@x.com"), Some("bram"), start, t0())
            .unwrap();
        assert_eq!(by_either.len(), 2);
    }

    #[test]
    fn test_record_link_only_once() {
        let mut store = InMemoryOrderStore::with_orders([stored(5, 1, "a@x.com", "Ann")]);

        assert!(store.record_link(5, 1, Some("liefde")).unwrap());
        assert!(!store.record_link(5, 2, None).unwrap());
        assert!(!store.record_link(404, 2, None).unwrap());

        let order = store.get(5).unwrap();
        assert_eq!(order.origin_order_id, Some(1));
        assert_eq!(order.theme.as_deref(), Some("liefde"));
    }
}
