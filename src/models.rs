use crate::config::ProductCatalog;
use crate::field_labels::THEME_PLACEHOLDERS;
use crate::order_type::OrderTypeClassification;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============ Engine Output ============

/// Canonical order record produced from one raw payload.
///
/// Only `origin_order_id` and `theme` (plus the derived `theme_id`) change
/// after creation, and only through the linking step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedOrder {
    /// External order id from the order API.
    pub order_id: i64,
    pub customer_name: Option<String>,
    pub customer_first_name: Option<String>,
    pub customer_email: Option<String>,
    pub ordered_at: Option<DateTime<Utc>>,
    /// Title of the product that decided the order type.
    pub product_name: String,
    /// Free-text theme as the customer entered it.
    pub theme: Option<String>,
    /// Catalog id for `theme`, never outside the catalog.
    pub theme_id: Option<i64>,
    pub tone: Option<String>,
    pub structure: Option<String>,
    pub description: Option<String>,
    pub deadline: Option<String>,
    pub order_type: OrderTypeClassification,
    /// Original order this upsell extends.
    pub origin_order_id: Option<i64>,
    /// Product ids of all line items, kept for later link lookups.
    pub product_ids: Vec<i64>,
}

impl NormalizedOrder {
    /// Main order type, always set.
    pub fn order_type_label(&self) -> &str {
        &self.order_type.main_type
    }

    /// Whether the theme is missing or one of the "not given" placeholders.
    pub fn has_placeholder_theme(&self) -> bool {
        match self.theme.as_deref() {
            None => true,
            Some(theme) => THEME_PLACEHOLDERS.contains(&theme.trim()),
        }
    }

    /// Copy the original order's theme when this order has none of its own.
    ///
    /// Returns `true` when the theme changed.
    pub fn inherit_theme_from(&mut self, original: &StoredOrder) -> bool {
        if !self.has_placeholder_theme() {
            return false;
        }

        let Some(theme) = original
            .theme
            .as_deref()
            .map(str::trim)
            .filter(|t| !THEME_PLACEHOLDERS.contains(t))
        else {
            return false;
        };

        tracing::debug!(
            "Order {} inherits theme '{}' from order {}",
            self.order_id,
            theme,
            original.order_id
        );
        self.theme = Some(theme.to_string());
        self.theme_id = None;
        true
    }

    /// Snapshot in the shape the candidate pool stores.
    pub fn to_stored(&self) -> StoredOrder {
        StoredOrder {
            order_id: self.order_id,
            ordered_at: self.ordered_at,
            customer_name: self.customer_name.clone(),
            customer_first_name: self.customer_first_name.clone(),
            customer_email: self.customer_email.clone(),
            product_ids: self.product_ids.clone(),
            theme: self.theme.clone(),
            origin_order_id: self.origin_order_id,
        }
    }
}

// ============ Candidate Pool Records ============

/// A previously normalized order as returned by the candidate pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredOrder {
    pub order_id: i64,
    pub ordered_at: Option<DateTime<Utc>>,
    pub customer_name: Option<String>,
    pub customer_first_name: Option<String>,
    pub customer_email: Option<String>,
    pub product_ids: Vec<i64>,
    pub theme: Option<String>,
    pub origin_order_id: Option<i64>,
}

impl StoredOrder {
    /// Whether any line item is one of the two primary products.
    pub fn has_primary_product(&self, products: &ProductCatalog) -> bool {
        self.product_ids.iter().any(|id| products.is_primary(*id))
    }
}
