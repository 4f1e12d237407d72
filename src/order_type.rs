use crate::config::ProductCatalog;
use crate::payload::{LineItem, RawOrderPayload};
use serde::{Deserialize, Serialize};

pub const STANDARD_LABEL: &str = "Standaard 72u";
pub const EXPRESS_LABEL: &str = "Spoed 24u";
pub const UPSELL_LABEL: &str = "Upsell";
pub const ORDER_BUMP_LABEL: &str = "Order-bump";
pub const UNKNOWN_LABEL: &str = "Onbekend";

const EXPRESS_PRIORITY: u32 = 200;
const STANDARD_PRIORITY: u32 = 100;
const UPSELL_PRIORITY: u32 = 50;
const ORDER_BUMP_PRIORITY: u32 = 30;
const UNKNOWN_PRIORITY: u32 = 0;

/// What kind of product decided an order's main type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Standard,
    Express,
    Upsell,
    OrderBump,
    Unknown,
}

/// Classification of a single line item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemType {
    pub label: String,
    pub priority: u32,
    pub kind: OrderKind,
}

impl ItemType {
    fn new(label: impl Into<String>, priority: u32, kind: OrderKind) -> Self {
        Self {
            label: label.into(),
            priority,
            kind,
        }
    }
}

/// Order type as structured data; see [`OrderTypeClassification::display`]
/// for the combined label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTypeClassification {
    pub main_type: String,
    pub main_kind: OrderKind,
    /// Every other distinct label, in line-item order.
    pub additional_types: Vec<String>,
}

impl OrderTypeClassification {
    pub fn unknown() -> Self {
        Self {
            main_type: UNKNOWN_LABEL.to_string(),
            main_kind: OrderKind::Unknown,
            additional_types: Vec::new(),
        }
    }

    /// `"<main> + <t1>, <t2>"`, or just the main type.
    pub fn display(&self) -> String {
        if self.additional_types.is_empty() {
            self.main_type.clone()
        } else {
            format!("{} + {}", self.main_type, self.additional_types.join(", "))
        }
    }

    /// Whether the order is a follow-on add-on purchase.
    pub fn is_upsell(&self) -> bool {
        self.main_kind == OrderKind::Upsell
    }
}

/// Classify one line item by product id, add-on marker, then title.
pub fn classify_item(item: &LineItem<'_>, products: &ProductCatalog) -> ItemType {
    if let Some(product_id) = item.product_id {
        if product_id == products.express_product_id {
            return ItemType::new(EXPRESS_LABEL, EXPRESS_PRIORITY, OrderKind::Express);
        }
        if product_id == products.standard_product_id {
            return ItemType::new(STANDARD_LABEL, STANDARD_PRIORITY, OrderKind::Standard);
        }
    }

    let marker = item
        .addon_type
        .map(|m| m.trim().to_lowercase())
        .unwrap_or_default();

    match marker.as_str() {
        "upsell" => {
            let label = item
                .product_id
                .and_then(|id| products.upsell_label(id))
                .unwrap_or(UPSELL_LABEL);
            ItemType::new(label, UPSELL_PRIORITY, OrderKind::Upsell)
        }
        "order-bump" | "order_bump" | "orderbump" => {
            let label = item
                .product_id
                .and_then(|id| products.order_bump_label(id))
                .unwrap_or(ORDER_BUMP_LABEL);
            ItemType::new(label, ORDER_BUMP_PRIORITY, OrderKind::OrderBump)
        }
        _ => classify_by_title(item.title),
    }
}

fn classify_by_title(title: Option<&str>) -> ItemType {
    let title = title.unwrap_or_default().to_lowercase();

    if title.contains("24") || title.contains("spoed") {
        ItemType::new(EXPRESS_LABEL, EXPRESS_PRIORITY, OrderKind::Express)
    } else if title.contains("72") || title.contains("standaard") {
        ItemType::new(STANDARD_LABEL, STANDARD_PRIORITY, OrderKind::Standard)
    } else if title.contains("songtekst") || title.contains("lied") {
        // Best guess: a song product without a delivery speed is the regular one
        ItemType::new(STANDARD_LABEL, STANDARD_PRIORITY, OrderKind::Standard)
    } else {
        ItemType::new(UNKNOWN_LABEL, UNKNOWN_PRIORITY, OrderKind::Unknown)
    }
}

/// Classify a whole order: the highest-priority item sets the main type.
/// Ties keep the earliest item.
pub fn classify(payload: &RawOrderPayload, products: &ProductCatalog) -> OrderTypeClassification {
    let item_types: Vec<ItemType> = payload
        .line_items()
        .iter()
        .map(|item| classify_item(item, products))
        .collect();

    let Some(main) = item_types
        .iter()
        .fold(None::<&ItemType>, |best, current| match best {
            Some(b) if b.priority >= current.priority => Some(b),
            _ => Some(current),
        })
    else {
        return OrderTypeClassification::unknown();
    };

    let mut additional_types: Vec<String> = Vec::new();
    for item_type in &item_types {
        if item_type.label != main.label && !additional_types.contains(&item_type.label) {
            additional_types.push(item_type.label.clone());
        }
    }

    tracing::debug!(
        "Order {:?} classified as '{}' (+{} add-on types)",
        payload.order_id(),
        main.label,
        additional_types.len()
    );

    OrderTypeClassification {
        main_type: main.label.clone(),
        main_kind: main.kind,
        additional_types,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify_json(value: serde_json::Value) -> OrderTypeClassification {
        classify(&RawOrderPayload::new(value), &ProductCatalog::default())
    }

    #[test]
    fn test_single_express_item() {
        let products = ProductCatalog::default();
        let result = classify_json(json!({
            "items": [{"product_id": products.express_product_id, "title": "Lied"}]
        }));

        assert_eq!(result.main_type, EXPRESS_LABEL);
        assert!(result.additional_types.is_empty());
        assert_eq!(result.display(), EXPRESS_LABEL);
        assert!(!result.is_upsell());
    }

    #[test]
    fn test_main_with_addons() {
        let products = ProductCatalog::default();
        let result = classify_json(json!({
            "items": [
                {"product_id": 481_420, "type": "order-bump"},
                {"product_id": products.standard_product_id},
                {"product_id": 999, "type": "Upsell"},
                {"product_id": 998, "type": "upsell"}
            ]
        }));

        assert_eq!(result.main_type, STANDARD_LABEL);
        assert_eq!(
            result.additional_types,
            vec!["Songtekst Poster".to_string(), UPSELL_LABEL.to_string()]
        );
        assert_eq!(result.display(), "Standaard 72u + Songtekst Poster, Upsell");
    }

    #[test]
    fn test_known_upsell_only_order() {
        let result = classify_json(json!({
            "items": [{"product_id": 481_310, "type": "upsell", "title": "Revisie"}]
        }));

        assert_eq!(result.main_type, "Revisie");
        assert_eq!(result.main_kind, OrderKind::Upsell);
        assert!(result.is_upsell());
    }

    #[test]
    fn test_title_fallbacks() {
        let cases = [
            ("Spoedlevering lied", EXPRESS_LABEL),
            ("Lied binnen 24u", EXPRESS_LABEL),
            ("Standaard levering", STANDARD_LABEL),
            ("Klaar in 72 uur", STANDARD_LABEL),
            ("Persoonlijke songtekst", STANDARD_LABEL),
            ("Cadeaubon", UNKNOWN_LABEL),
        ];

        for (title, expected) in cases {
            let result = classify_json(json!({"items": [{"title": title}]}));
            assert_eq!(result.main_type, expected, "title: {}", title);
        }
    }

    #[test]
    fn test_equal_priority_keeps_first_item() {
        let result = classify_json(json!({
            "items": [
                {"product_id": 1, "type": "upsell"},
                {"product_id": 481_311, "type": "upsell"}
            ]
        }));

        assert_eq!(result.main_type, UPSELL_LABEL);
        assert_eq!(result.additional_types, vec!["Soundtrack Bundel".to_string()]);
    }

    #[test]
    fn test_no_items_is_unknown() {
        let result = classify_json(json!({"items": []}));
        assert_eq!(result, OrderTypeClassification::unknown());
        assert_eq!(result.display(), UNKNOWN_LABEL);
    }
}
