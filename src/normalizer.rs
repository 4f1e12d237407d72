/// Order normalization and batch ingestion
///
/// Per payload:
/// 1. Extract custom fields, resolve identity, classify the order type
/// 2. Match the free-text theme against the catalog
/// 3. For upsell orders, link to the original and inherit its theme
///
/// Batch ingestion links each new upsell before recording it, so a failed
/// link never leaves an unlinked record behind.
use crate::config::EngineConfig;
use crate::custom_fields::{self, CustomFieldMap};
use crate::errors::{AppError, ResultExt};
use crate::field_labels::{
    DEADLINE_LABELS, STRUCTURE_LABELS, THEME_LABELS, THEME_PLACEHOLDERS, TONE_LABELS,
};
use crate::identity::{resolve_email, resolve_first_name, resolve_full_name};
use crate::models::NormalizedOrder;
use crate::order_type::{classify, classify_item, OrderTypeClassification};
use crate::payload::RawOrderPayload;
use crate::store::{CandidatePool, OrderStore};
use crate::themes::{CachedThemeStore, ThemeStore};
use crate::upsell_linker::{LinkCandidate, LinkIdentity, LinkOutcome, UpsellLinker};
use serde::Serialize;

/// Result of ingesting one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct IngestOutcome {
    pub order: NormalizedOrder,
    /// `None` when the order is not an upsell and no link was attempted.
    pub link: Option<LinkOutcome>,
}

impl IngestOutcome {
    pub fn is_linked(&self) -> bool {
        matches!(self.link, Some(LinkOutcome::Linked(_)))
    }
}

/// Counters and records of one ingested page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub received: usize,
    /// Newly recorded orders.
    pub normalized: usize,
    /// Upsells whose origin link was recorded in this batch.
    pub linked: usize,
    /// Orders the store already held.
    pub duplicates: usize,
    /// Payloads that could not produce an order record.
    pub failed: usize,
    pub orders: Vec<NormalizedOrder>,
}

pub struct OrderNormalizer<S> {
    config: EngineConfig,
    themes: CachedThemeStore<S>,
    linker: UpsellLinker,
}

impl<S: ThemeStore> OrderNormalizer<S> {
    /// Build the engine. A configured default theme id must exist in the
    /// catalog.
    pub fn new(config: EngineConfig, theme_store: S) -> Result<Self, AppError> {
        let themes = CachedThemeStore::new(theme_store, config.theme_cache_ttl);

        if let Some(default_id) = config.default_theme_id {
            let catalog = themes
                .catalog()
                .context("validating default theme id")?;
            if !catalog.contains_id(default_id) {
                return Err(AppError::Configuration(format!(
                    "default theme id {} is not in the theme catalog",
                    default_id
                )));
            }
        }

        let linker = UpsellLinker::new(config.products.clone());

        Ok(Self {
            config,
            themes,
            linker,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn linker(&self) -> &UpsellLinker {
        &self.linker
    }

    /// Build the canonical record for one payload.
    ///
    /// Fails with [`AppError::InvalidPayload`] only when the payload has no
    /// order id, and with [`AppError::UpstreamUnavailable`] when the theme
    /// catalog cannot be loaded.
    pub fn normalize(&self, payload: &RawOrderPayload) -> Result<NormalizedOrder, AppError> {
        let order_id = payload
            .order_id()
            .ok_or_else(|| AppError::InvalidPayload("order has no numeric id".to_string()))?;

        let fields = custom_fields::extract(payload);
        let order_type = classify(payload, &self.config.products);
        let theme = field_value(&fields, THEME_LABELS);
        let theme_id = self
            .match_theme_id(theme.as_deref())
            .with_context(|| format!("normalizing order {}", order_id))?;

        let order = NormalizedOrder {
            order_id,
            customer_name: resolve_full_name(payload, &fields),
            customer_first_name: resolve_first_name(payload, &fields),
            customer_email: resolve_email(payload),
            ordered_at: payload.ordered_at(),
            product_name: self.product_name(payload, &order_type),
            theme,
            theme_id,
            tone: field_value(&fields, TONE_LABELS),
            structure: field_value(&fields, STRUCTURE_LABELS),
            description: fields.description().map(str::to_string),
            deadline: field_value(&fields, DEADLINE_LABELS),
            order_type,
            origin_order_id: None,
            product_ids: payload.product_ids(),
        };

        tracing::debug!(
            "Order {} normalized: type='{}' theme={:?} theme_id={:?}",
            order.order_id,
            order.order_type.display(),
            order.theme,
            order.theme_id
        );

        Ok(order)
    }

    /// Link an upsell order to its original using the auto-link window.
    ///
    /// Sets `origin_order_id` and, over a placeholder theme, inherits the
    /// original's theme. An order that already has an origin is left alone.
    pub fn link<P: CandidatePool + ?Sized>(
        &self,
        order: &mut NormalizedOrder,
        payload: &RawOrderPayload,
        pool: &P,
    ) -> Result<LinkOutcome, AppError> {
        let outcome = self
            .linker
            .find_original(payload, pool, self.config.auto_link_window)
            .with_context(|| format!("linking order {}", order.order_id))?;

        if let LinkOutcome::Linked(found) = &outcome {
            if order.origin_order_id.is_some() {
                tracing::debug!("Order {} already linked, keeping origin", order.order_id);
                return Ok(outcome);
            }
            order.origin_order_id = Some(found.original.order_id);
            if order.inherit_theme_from(&found.original) {
                order.theme_id = self.match_theme_id(order.theme.as_deref())?;
            }
        }

        Ok(outcome)
    }

    /// Normalize one payload and, for upsells, link it against `pool`.
    pub fn ingest<P: CandidatePool + ?Sized>(
        &self,
        payload: &RawOrderPayload,
        pool: &P,
    ) -> Result<IngestOutcome, AppError> {
        let mut order = self.normalize(payload)?;

        let link = if order.order_type.is_upsell() {
            Some(self.link(&mut order, payload, pool)?)
        } else {
            None
        };

        Ok(IngestOutcome { order, link })
    }

    /// Scored candidates for manual review, using the review window.
    pub fn review_matches<P: CandidatePool + ?Sized>(
        &self,
        payload: &RawOrderPayload,
        pool: &P,
        current_origin: Option<i64>,
    ) -> Result<Vec<LinkCandidate>, AppError> {
        let identity = LinkIdentity::from_payload(payload).with_current_origin(current_origin);
        self.linker
            .review_matches(&identity, pool, self.config.review_window)
            .with_context(|| format!("reviewing matches for order {:?}", identity.order_id))
    }

    /// Ingest a page of payloads into `store`, oldest order first.
    ///
    /// The page is sorted by `ordered_at` (orders without one last) so an
    /// upsell finds an original delivered later in the same page. An upsell
    /// is linked before it is stored; re-ingesting a stored upsell that still
    /// has no origin claims the link with a guarded write.
    ///
    /// Invalid payloads are counted and skipped; an unreadable store or theme
    /// catalog aborts the page.
    pub fn ingest_page<O: OrderStore>(
        &self,
        payloads: impl IntoIterator<Item = RawOrderPayload>,
        store: &mut O,
    ) -> Result<BatchReport, AppError> {
        let mut payloads: Vec<RawOrderPayload> = payloads.into_iter().collect();
        payloads.sort_by_cached_key(|payload| {
            let ordered_at = payload.ordered_at();
            (ordered_at.is_none(), ordered_at)
        });

        let mut report = BatchReport::default();

        for payload in payloads {
            report.received += 1;

            let mut order = match self.normalize(&payload) {
                Ok(order) => order,
                Err(e) if e.is_upstream() => return Err(e),
                Err(e) => {
                    tracing::warn!("Skipping payload: {}", e);
                    report.failed += 1;
                    continue;
                }
            };

            let theme_before = order.theme.clone();
            if order.order_type.is_upsell() {
                self.link(&mut order, &payload, &*store)?;
            }

            if store.insert_if_absent(&order)? {
                report.normalized += 1;
                if order.origin_order_id.is_some() {
                    report.linked += 1;
                }
                report.orders.push(order);
                continue;
            }

            tracing::debug!("Order {} already stored", order.order_id);
            report.duplicates += 1;

            // Stored before its original arrived
            if let Some(origin_order_id) = order.origin_order_id {
                let inherited = order
                    .theme
                    .as_deref()
                    .filter(|_| order.theme != theme_before);
                if store.record_link(order.order_id, origin_order_id, inherited)? {
                    tracing::info!(
                        "Stored order {} linked to original {} on re-ingest",
                        order.order_id,
                        origin_order_id
                    );
                    report.linked += 1;
                }
            }
        }

        tracing::info!(
            "Page ingested: received={} normalized={} linked={} duplicates={} failed={}",
            report.received,
            report.normalized,
            report.linked,
            report.duplicates,
            report.failed
        );

        Ok(report)
    }

    fn match_theme_id(&self, theme: Option<&str>) -> Result<Option<i64>, AppError> {
        let catalog = self.themes.catalog()?;
        let matched = theme
            .map(str::trim)
            .filter(|t| !THEME_PLACEHOLDERS.contains(t))
            .and_then(|t| catalog.match_theme(t));

        if matched.is_none() && theme.is_some() {
            tracing::debug!("Theme {:?} not in catalog, using default", theme);
        }
        Ok(matched.or(self.config.default_theme_id))
    }

    /// Title of the item that decided the main type, else any title, else
    /// the type label itself.
    fn product_name(
        &self,
        payload: &RawOrderPayload,
        order_type: &OrderTypeClassification,
    ) -> String {
        payload
            .line_items()
            .iter()
            .filter(|item| {
                classify_item(item, &self.config.products).label == order_type.main_type
            })
            .find_map(|item| item.title)
            .or_else(|| payload.first_product_title())
            .map(str::to_string)
            .unwrap_or_else(|| order_type.main_type.clone())
    }
}

fn field_value(fields: &CustomFieldMap, labels: &[&str]) -> Option<String> {
    fields.first_of(labels).map(str::to_string)
}
