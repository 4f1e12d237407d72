use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A page of orders as delivered by the order API.
///
/// The API has shipped three shapes over time: a bare order object, a bare
/// array, and an envelope with a `data` array.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OrderPage {
    Batch(Vec<RawOrderPayload>),
    Wrapped { data: Vec<RawOrderPayload> },
    Single(RawOrderPayload),
}

impl OrderPage {
    /// Convert to a vec of payloads for uniform processing
    pub fn into_orders(self) -> Vec<RawOrderPayload> {
        match self {
            OrderPage::Batch(orders) | OrderPage::Wrapped { data: orders } => orders,
            OrderPage::Single(order) => vec![order],
        }
    }
}

/// One order exactly as received. Never mutated by the engine.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct RawOrderPayload(Value);

/// A borrowed view over one line item of a payload.
#[derive(Debug, Clone, Copy)]
pub struct LineItem<'a> {
    pub product_id: Option<i64>,
    pub title: Option<&'a str>,
    /// The add-on marker, e.g. `upsell` or `order-bump`.
    pub addon_type: Option<&'a str>,
    /// The item's own custom-field array, if it has one.
    pub fields: Option<&'a Value>,
}

impl RawOrderPayload {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Top-level value for `key`, if the payload is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// External numeric order id. Accepts a JSON number or a numeric string.
    pub fn order_id(&self) -> Option<i64> {
        self.get("id").and_then(lenient_i64)
    }

    /// Creation timestamp of the order, if present and parseable.
    pub fn ordered_at(&self) -> Option<DateTime<Utc>> {
        let raw = self.get("created_at").or_else(|| self.get("ordered_at"))?;
        match raw {
            Value::String(s) => {
                let parsed = parse_timestamp(s);
                if parsed.is_none() {
                    tracing::warn!(
                        "Unparseable order timestamp '{}' on order {:?}",
                        s,
                        self.order_id()
                    );
                }
                parsed
            }
            Value::Number(n) => n
                .as_i64()
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
            _ => None,
        }
    }

    pub fn customer(&self) -> Option<&Map<String, Value>> {
        self.get("customer").and_then(Value::as_object)
    }

    /// Trimmed, non-empty string under `customer.<key>`.
    pub fn customer_str(&self, key: &str) -> Option<&str> {
        non_empty_str(self.customer().and_then(|c| c.get(key)))
    }

    /// The shipping/billing address sub-object.
    ///
    /// Looks at `address`, then `billing.address`, `shipping.address`, and
    /// finally a flat `billing` or `shipping` object.
    pub fn address(&self) -> Option<&Map<String, Value>> {
        if let Some(address) = self.get("address").and_then(Value::as_object) {
            return Some(address);
        }

        for parent in ["billing", "shipping"] {
            if let Some(address) = self
                .get(parent)
                .and_then(|p| p.get("address"))
                .and_then(Value::as_object)
            {
                return Some(address);
            }
        }

        for parent in ["billing", "shipping"] {
            if let Some(flat) = self.get(parent).and_then(Value::as_object) {
                return Some(flat);
            }
        }

        None
    }

    /// Trimmed, non-empty string under `address.<key>`.
    pub fn address_str(&self, key: &str) -> Option<&str> {
        non_empty_str(self.address().and_then(|a| a.get(key)))
    }

    /// Line items of the order. Non-object entries are skipped.
    pub fn line_items(&self) -> Vec<LineItem<'_>> {
        let items = self
            .get("items")
            .and_then(Value::as_array)
            .or_else(|| self.get("line_items").and_then(Value::as_array));

        let Some(items) = items else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(Value::as_object)
            .map(|item| {
                let product = item.get("product").and_then(Value::as_object);

                LineItem {
                    product_id: item
                        .get("product_id")
                        .and_then(lenient_i64)
                        .or_else(|| product.and_then(|p| p.get("id")).and_then(lenient_i64)),
                    title: non_empty_str(item.get("title"))
                        .or_else(|| non_empty_str(item.get("name")))
                        .or_else(|| non_empty_str(product.and_then(|p| p.get("title")))),
                    addon_type: non_empty_str(item.get("type")),
                    fields: item.get("custom_fields").or_else(|| item.get("fields")),
                }
            })
            .collect()
    }

    /// Product ids across all line items, in order.
    pub fn product_ids(&self) -> Vec<i64> {
        self.line_items()
            .iter()
            .filter_map(|item| item.product_id)
            .collect()
    }

    /// Title of the first line item that has one.
    pub fn first_product_title(&self) -> Option<&str> {
        self.line_items().into_iter().find_map(|item| item.title)
    }
}

impl From<Value> for RawOrderPayload {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Trimmed string content of `value`, or `None` when absent, not a string,
/// or blank.
pub fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Scalar rendered as a string; `None` for null, arrays and objects.
pub fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Integer from a JSON number or a numeric string.
pub fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.is_finite())
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Parse timestamp string to DateTime<Utc>
pub fn parse_timestamp(timestamp_str: &str) -> Option<DateTime<Utc>> {
    let timestamp_str = timestamp_str.trim();

    // Try ISO 8601 / RFC3339 format first (standard)
    DateTime::parse_from_rfc3339(timestamp_str)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Fallback: custom format with timezone
            DateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S%.f %z")
                .map(|dt| dt.with_timezone(&Utc))
        })
        .or_else(|_| {
            // Fallback: naive datetime, assume UTC
            NaiveDateTime::parse_from_str(timestamp_str, "%Y-%m-%d %H:%M:%S%.f")
                .map(|ndt| DateTime::<Utc>::from_naive_utc_and_offset(ndt, Utc))
        })
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_parse_single_order() {
        let raw = r#"{"id": 1001, "created_at": "2025-01-01T10:00:00Z"}"#;

        let page: OrderPage = serde_json::from_str(raw).unwrap();
        let orders = page.into_orders();
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].order_id(), Some(1001));
    }

    #[test]
    fn test_parse_wrapped_and_bare_batches() {
        let wrapped: OrderPage =
            serde_json::from_str(r#"{"data": [{"id": 1}, {"id": 2}]}"#).unwrap();
        assert_eq!(wrapped.into_orders().len(), 2);

        let bare: OrderPage = serde_json::from_str(r#"[{"id": 1}, {"id": 2}, {"id": 3}]"#).unwrap();
        assert_eq!(bare.into_orders().len(), 3);
    }

    #[test]
    fn test_order_id_accepts_numeric_string() {
        let payload = RawOrderPayload::new(json!({"id": " 77 "}));
        assert_eq!(payload.order_id(), Some(77));

        let payload = RawOrderPayload::new(json!({"id": "abc"}));
        assert_eq!(payload.order_id(), None);
    }

    #[test]
    fn test_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap();

        assert_eq!(parse_timestamp("2025-03-01T12:30:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01T13:30:00+01:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01 12:30:00 +0000"), Some(expected));
        assert_eq!(parse_timestamp("2025-03-01 12:30:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_address_lookup_order() {
        let nested = RawOrderPayload::new(json!({
            "billing": {"address": {"firstname": "Sanne"}}
        }));
        assert_eq!(nested.address_str("firstname"), Some("Sanne"));

        let flat = RawOrderPayload::new(json!({
            "shipping": {"firstname": "Joost"}
        }));
        assert_eq!(flat.address_str("firstname"), Some("Joost"));

        let direct = RawOrderPayload::new(json!({
            "address": {"firstname": "Eva"},
            "billing": {"address": {"firstname": "Sanne"}}
        }));
        assert_eq!(direct.address_str("firstname"), Some("Eva"));
    }

    #[test]
    fn test_line_items_tolerate_malformed_entries() {
        let payload = RawOrderPayload::new(json!({
            "items": [
                "not an item",
                {"product_id": "481202", "title": "Spoed lied", "type": "upsell"},
                {"product": {"id": 5, "title": "Nested"}}
            ]
        }));

        let items = payload.line_items();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].product_id, Some(481_202));
        assert_eq!(items[0].addon_type, Some("upsell"));
        assert_eq!(items[1].product_id, Some(5));
        assert_eq!(items[1].title, Some("Nested"));
        assert_eq!(payload.product_ids(), vec![481_202, 5]);
    }

    #[test]
    fn test_items_of_wrong_type_are_absent() {
        let payload = RawOrderPayload::new(json!({"items": "oops", "customer": 3}));
        assert!(payload.line_items().is_empty());
        assert!(payload.customer().is_none());
        assert_eq!(payload.first_product_title(), None);
    }
}
