/// Upsell → original order linking
///
/// Linking flow for one upsell order:
/// 1. Resolve identity (email, checkout name). Neither → no match
/// 2. Read candidates placed in `[ordered_at - window, ordered_at)`
/// 3. Keep candidates that bought a primary product
/// 4. Exact email match; when that finds nothing, name substring match
/// 5. Pick the latest candidate, highest order id on ties
///
/// The confidence score is only for human review and never drives selection.
use crate::config::ProductCatalog;
use crate::errors::AppError;
use crate::identity::{resolve_contact_name, resolve_email};
use crate::models::StoredOrder;
use crate::payload::RawOrderPayload;
use crate::store::CandidatePool;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Scores above this are high confidence.
pub const HIGH_CONFIDENCE_THRESHOLD: u8 = 70;
/// Scores above this (and up to the high threshold) are ambiguous.
pub const AMBIGUOUS_THRESHOLD: u8 = 50;

const EMAIL_WEIGHT: f64 = 60.0;
const NAME_WEIGHT: f64 = 25.0;
const RECENCY_WEIGHT: f64 = 15.0;
const RECENCY_HALF_LIFE_HOURS: f64 = 24.0;
const CURRENT_LINK_BONUS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceBucket {
    High,
    Ambiguous,
    Weak,
}

impl ConfidenceBucket {
    pub fn from_score(score: u8) -> Self {
        if score > HIGH_CONFIDENCE_THRESHOLD {
            ConfidenceBucket::High
        } else if score > AMBIGUOUS_THRESHOLD {
            ConfidenceBucket::Ambiguous
        } else {
            ConfidenceBucket::Weak
        }
    }
}

/// Who placed the upsell and when, as far as the payload tells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LinkIdentity {
    pub order_id: Option<i64>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub ordered_at: Option<DateTime<Utc>>,
    /// Original the upsell is linked to today, if any.
    pub current_origin: Option<i64>,
}

impl LinkIdentity {
    pub fn from_payload(payload: &RawOrderPayload) -> Self {
        Self {
            order_id: payload.order_id(),
            email: resolve_email(payload),
            name: resolve_contact_name(payload),
            ordered_at: payload.ordered_at(),
            current_origin: None,
        }
    }

    pub fn with_current_origin(mut self, origin_order_id: Option<i64>) -> Self {
        self.current_origin = origin_order_id;
        self
    }

    fn has_identity(&self) -> bool {
        self.email.is_some() || self.name.is_some()
    }
}

/// Why a linking attempt ended without a link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoMatchReason {
    /// Neither email nor name could be resolved.
    MissingIdentity,
    /// The upsell has no usable timestamp to anchor the window.
    MissingTimestamp,
    /// The search and filters left no candidate.
    NoCandidate,
}

/// The selected original and how confident the match is.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkMatch {
    pub original: StoredOrder,
    pub confidence: u8,
}

impl LinkMatch {
    pub fn result(&self) -> LinkResult {
        LinkResult {
            origin_order_id: self.original.order_id,
            confidence: self.confidence,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkResult {
    pub origin_order_id: i64,
    pub confidence: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    Linked(LinkMatch),
    NoMatch(NoMatchReason),
}

impl LinkOutcome {
    pub fn origin_order_id(&self) -> Option<i64> {
        match self {
            LinkOutcome::Linked(found) => Some(found.original.order_id),
            LinkOutcome::NoMatch(_) => None,
        }
    }
}

/// One row of the manual review report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkCandidate {
    pub candidate_order_id: i64,
    pub customer_name_snapshot: Option<String>,
    pub ordered_at: DateTime<Utc>,
    pub confidence_score: u8,
    pub hours_before_upsell: f64,
    pub bucket: ConfidenceBucket,
}

#[derive(Debug, Clone)]
pub struct UpsellLinker {
    products: ProductCatalog,
}

impl UpsellLinker {
    pub fn new(products: ProductCatalog) -> Self {
        Self { products }
    }

    /// Find the original order of `payload` within `window` before it.
    ///
    /// Running twice over the same pool gives the same answer.
    pub fn find_original<P: CandidatePool + ?Sized>(
        &self,
        payload: &RawOrderPayload,
        pool: &P,
        window: Duration,
    ) -> Result<LinkOutcome, AppError> {
        self.find_original_for(&LinkIdentity::from_payload(payload), pool, window)
    }

    pub fn find_original_for<P: CandidatePool + ?Sized>(
        &self,
        identity: &LinkIdentity,
        pool: &P,
        window: Duration,
    ) -> Result<LinkOutcome, AppError> {
        if !identity.has_identity() {
            tracing::debug!("Order {:?}: no email or name, cannot link", identity.order_id);
            return Ok(LinkOutcome::NoMatch(NoMatchReason::MissingIdentity));
        }

        let Some(upsell_at) = identity.ordered_at else {
            tracing::debug!("Order {:?}: no timestamp, cannot link", identity.order_id);
            return Ok(LinkOutcome::NoMatch(NoMatchReason::MissingTimestamp));
        };

        let primaries = self.windowed_primaries(identity, pool, upsell_at, window)?;
        tracing::debug!(
            "Order {:?}: {} primary candidate(s) in {}h window",
            identity.order_id,
            primaries.len(),
            window.num_hours()
        );

        let mut matched: Vec<StoredOrder> = match identity.email.as_deref() {
            Some(email) => primaries
                .iter()
                .filter(|c| c.customer_email.as_deref() == Some(email))
                .cloned()
                .collect(),
            None => Vec::new(),
        };

        if matched.is_empty() {
            if let Some(name) = identity.name.as_deref() {
                tracing::debug!("Order {:?}: falling back to name match", identity.order_id);
                matched = primaries
                    .into_iter()
                    .filter(|c| name_matches(name, c))
                    .collect();
            }
        }

        let Some(original) = matched
            .into_iter()
            .max_by_key(|c| (c.ordered_at, c.order_id))
        else {
            return Ok(LinkOutcome::NoMatch(NoMatchReason::NoCandidate));
        };

        let confidence = score_candidate(identity, &original);
        tracing::info!(
            "Order {:?} linked to original {} (confidence {})",
            identity.order_id,
            original.order_id,
            confidence
        );

        Ok(LinkOutcome::Linked(LinkMatch {
            original,
            confidence,
        }))
    }

    /// Every identity-matching primary order in `window`, scored for review.
    ///
    /// Sorted by score, then recency, then order id, all descending.
    pub fn review_matches<P: CandidatePool + ?Sized>(
        &self,
        identity: &LinkIdentity,
        pool: &P,
        window: Duration,
    ) -> Result<Vec<LinkCandidate>, AppError> {
        let Some(upsell_at) = identity.ordered_at.filter(|_| identity.has_identity()) else {
            return Ok(Vec::new());
        };

        let mut report: Vec<LinkCandidate> = self
            .windowed_primaries(identity, pool, upsell_at, window)?
            .into_iter()
            .filter(|c| {
                let email_hit = identity.email.is_some()
                    && c.customer_email.as_deref() == identity.email.as_deref();
                let name_hit = identity
                    .name
                    .as_deref()
                    .is_some_and(|name| name_matches(name, c));
                email_hit || name_hit
            })
            .filter_map(|c| {
                let ordered_at = c.ordered_at?;
                let hours_before_upsell = hours_between(ordered_at, upsell_at);
                let confidence_score = score_candidate(identity, &c);
                Some(LinkCandidate {
                    candidate_order_id: c.order_id,
                    customer_name_snapshot: c.customer_name.clone(),
                    ordered_at,
                    confidence_score,
                    hours_before_upsell,
                    bucket: ConfidenceBucket::from_score(confidence_score),
                })
            })
            .collect();

        report.sort_by(|a, b| {
            b.confidence_score
                .cmp(&a.confidence_score)
                .then(b.ordered_at.cmp(&a.ordered_at))
                .then(b.candidate_order_id.cmp(&a.candidate_order_id))
        });

        Ok(report)
    }

    /// Confidence 0–100 that `candidate` is the original of `payload`.
    pub fn score(&self, payload: &RawOrderPayload, candidate: &StoredOrder) -> u8 {
        score_candidate(&LinkIdentity::from_payload(payload), candidate)
    }

    fn windowed_primaries<P: CandidatePool + ?Sized>(
        &self,
        identity: &LinkIdentity,
        pool: &P,
        upsell_at: DateTime<Utc>,
        window: Duration,
    ) -> Result<Vec<StoredOrder>, AppError> {
        // Windows reaching before the earliest representable time start there
        let start = upsell_at
            .checked_sub_signed(window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        let candidates = pool.find_orders(
            identity.email.as_deref(),
            identity.name.as_deref(),
            start,
            upsell_at,
        )?;

        // The pool may return a superset; the window is enforced here.
        let mut seen = HashSet::new();
        Ok(candidates
            .into_iter()
            .filter(|c| c.ordered_at.is_some_and(|at| at >= start && at < upsell_at))
            .filter(|c| Some(c.order_id) != identity.order_id)
            .filter(|c| c.has_primary_product(&self.products))
            .filter(|c| seen.insert(c.order_id))
            .collect())
    }
}

fn name_matches(name: &str, candidate: &StoredOrder) -> bool {
    let wanted = name.trim().to_lowercase();
    if wanted.is_empty() {
        return false;
    }
    [&candidate.customer_name, &candidate.customer_first_name]
        .into_iter()
        .flatten()
        .any(|stored| stored.to_lowercase().contains(&wanted))
}

/// Hours from `earlier` to `later`; negative when `earlier` is after `later`.
fn hours_between(earlier: DateTime<Utc>, later: DateTime<Utc>) -> f64 {
    (later - earlier).num_seconds() as f64 / 3600.0
}

/// Similarity of two names in `[0, 1]`.
///
/// Word-set overlap, lifted to 0.75 when one name contains the other.
pub fn name_similarity(a: &str, b: &str) -> f64 {
    let a = a.trim().to_lowercase();
    let b = b.trim().to_lowercase();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let a_words: HashSet<&str> = a.split_whitespace().collect();
    let b_words: HashSet<&str> = b.split_whitespace().collect();
    let shared = a_words.intersection(&b_words).count() as f64;
    let total = a_words.union(&b_words).count() as f64;
    let overlap = if total > 0.0 { shared / total } else { 0.0 };

    if a.contains(&b) || b.contains(&a) {
        overlap.max(0.75)
    } else {
        overlap
    }
}

/// Weighted confidence that `candidate` is the original of the upsell.
///
/// Email match dominates; name similarity and recency add to it; an existing
/// link to the same candidate adds a small bonus. A candidate without a
/// timestamp gets no recency points.
pub fn score_candidate(identity: &LinkIdentity, candidate: &StoredOrder) -> u8 {
    let mut score = 0.0;

    if let (Some(wanted), Some(stored)) = (&identity.email, &candidate.customer_email) {
        if wanted == stored {
            score += EMAIL_WEIGHT;
        }
    }

    if let Some(name) = identity.name.as_deref() {
        let similarity = [&candidate.customer_name, &candidate.customer_first_name]
            .into_iter()
            .flatten()
            .map(|stored| name_similarity(name, stored))
            .fold(0.0, f64::max);
        score += NAME_WEIGHT * similarity;
    }

    let hours_before = identity
        .ordered_at
        .zip(candidate.ordered_at)
        .map(|(upsell_at, candidate_at)| hours_between(candidate_at, upsell_at))
        .filter(|hours| *hours >= 0.0);
    if let Some(hours) = hours_before {
        score += RECENCY_WEIGHT * 0.5f64.powf(hours / RECENCY_HALF_LIFE_HOURS);
    }

    if identity.current_origin == Some(candidate.order_id) {
        score += CURRENT_LINK_BONUS;
    }

    score.round().clamp(0.0, 100.0) as u8
}
