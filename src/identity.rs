/// Customer identity resolution
///
/// Full name and first name are resolved independently, each through its own
/// ordered list of rules. The first rule that yields a non-empty value wins.
use crate::custom_fields::CustomFieldMap;
use crate::field_labels::{LAST_NAME_LABELS, NAME_STOP_WORDS, RECIPIENT_NAME_LABELS};
use crate::payload::RawOrderPayload;
use regex::Regex;
use std::sync::LazyLock;

const TITLE_NAME_MAX_CHARS: usize = 30;

// One to three capitalised words, e.g. "Anne-Marie de Vries" stops at "de".
const NAME_WORDS: &str = r"\p{Lu}[\p{Ll}'\-]+(?:\s+\p{Lu}[\p{Ll}'\-]+){0,2}";

static DESCRIPTION_NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        format!(r"(?i:\bvoor)\s+({})", NAME_WORDS),
        format!(r"(?i:\baan)\s+({})", NAME_WORDS),
        format!(r"({})\s+(?i:heet\b)", NAME_WORDS),
        format!(r"(?i:\bheet)\s+({})", NAME_WORDS),
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("description name pattern is valid"))
    .collect()
});

static TITLE_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i:voor )(\p{Lu}\S*(?:\s+\p{Lu}\S*)*)").expect("title name pattern is valid")
});

/// Customer email: `customer.email`, else the address email.
pub fn resolve_email(payload: &RawOrderPayload) -> Option<String> {
    payload
        .customer_str("email")
        .or_else(|| payload.address_str("email"))
        .map(str::to_string)
}

/// Name as the customer entered it at checkout, ignoring form fields.
///
/// Address `full_name`, else address first + last name, else `customer.name`.
pub fn resolve_contact_name(payload: &RawOrderPayload) -> Option<String> {
    if let Some(full_name) = payload.address_str("full_name") {
        return Some(full_name.to_string());
    }

    if let Some(first) = payload.address_str("firstname") {
        return Some(match payload.address_str("lastname") {
            Some(last) => format!("{} {}", first, last),
            None => first.to_string(),
        });
    }

    payload.customer_str("name").map(str::to_string)
}

/// Resolve the customer's full name.
///
/// Checkout name first, then the recipient-name form fields, then a name
/// mentioned in the description, then a name in the product title.
pub fn resolve_full_name(payload: &RawOrderPayload, fields: &CustomFieldMap) -> Option<String> {
    if let Some(name) = resolve_contact_name(payload) {
        return Some(name);
    }

    if let Some(recipient) = fields.first_of(RECIPIENT_NAME_LABELS) {
        tracing::debug!("Full name resolved from recipient field");
        return Some(match fields.first_of(LAST_NAME_LABELS) {
            Some(last) => format!("{} {}", recipient, last),
            None => recipient.to_string(),
        });
    }

    if let Some(name) = fields.description().and_then(name_from_description) {
        tracing::debug!("Full name resolved from description text");
        return Some(name);
    }

    let from_title = payload.first_product_title().and_then(name_from_title);
    if from_title.is_some() {
        tracing::debug!("Full name resolved from product title");
    }
    from_title
}

/// Resolve the customer's first name. Not derived from the full name.
pub fn resolve_first_name(payload: &RawOrderPayload, fields: &CustomFieldMap) -> Option<String> {
    payload
        .address_str("firstname")
        .map(str::to_string)
        .or_else(|| fields.first_of(RECIPIENT_NAME_LABELS).and_then(first_token))
        .or_else(|| payload.customer_str("name").and_then(first_token))
        .or_else(|| payload.address_str("full_name").and_then(first_token))
}

fn first_token(value: &str) -> Option<String> {
    value.split_whitespace().next().map(str::to_string)
}

fn is_stop_word(candidate: &str) -> bool {
    let first = candidate
        .split_whitespace()
        .next()
        .unwrap_or(candidate)
        .to_lowercase();
    NAME_STOP_WORDS.contains(&first.as_str())
}

/// Name following "voor"/"aan", or around "heet", in free text.
pub fn name_from_description(description: &str) -> Option<String> {
    DESCRIPTION_NAME_PATTERNS.iter().find_map(|pattern| {
        pattern
            .captures_iter(description)
            .filter_map(|caps| caps.get(1))
            .map(|m| m.as_str().trim())
            .find(|candidate| !candidate.is_empty() && !is_stop_word(candidate))
            .map(str::to_string)
    })
}

/// Capitalised words after "voor " in a product title, at most 30 chars.
pub fn name_from_title(title: &str) -> Option<String> {
    let caps = TITLE_NAME_PATTERN.captures(title)?;
    let name: String = caps
        .get(1)?
        .as_str()
        .chars()
        .take(TITLE_NAME_MAX_CHARS)
        .collect();
    let name = name.trim();
    (!name.is_empty()).then(|| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::custom_fields::extract;
    use serde_json::json;

    fn resolve(value: serde_json::Value) -> (Option<String>, Option<String>) {
        let payload = RawOrderPayload::new(value);
        let fields = extract(&payload);
        (
            resolve_full_name(&payload, &fields),
            resolve_first_name(&payload, &fields),
        )
    }

    #[test]
    fn test_address_full_name_beats_customer_name() {
        let (full, _) = resolve(json!({
            "address": {"full_name": "  A B  "},
            "customer": {"name": "C D"}
        }));
        assert_eq!(full.as_deref(), Some("A B"));
    }

    #[test]
    fn test_customer_name_only_without_address_firstname() {
        let (full, _) = resolve(json!({
            "address": {"firstname": "Eva", "lastname": "Jansen"},
            "customer": {"name": "C D"}
        }));
        assert_eq!(full.as_deref(), Some("Eva Jansen"));

        let (full, _) = resolve(json!({
            "address": {"lastname": "Jansen"},
            "customer": {"name": "C D"}
        }));
        assert_eq!(full.as_deref(), Some("C D"));
    }

    #[test]
    fn test_recipient_field_with_last_name() {
        let (full, first) = resolve(json!({
            "custom_fields": [
                {"name": "Voor wie is dit lied?", "value": "Truus Bakker"},
                {"name": "Achternaam", "value": "de Boer"}
            ]
        }));
        assert_eq!(full.as_deref(), Some("Truus Bakker de Boer"));
        assert_eq!(first.as_deref(), Some("Truus"));
    }

    #[test]
    fn test_name_from_description_patterns() {
        assert_eq!(
            name_from_description("Een lied voor Oma Truus graag").as_deref(),
            Some("Oma Truus")
        );
        assert_eq!(
            name_from_description("Opgedragen aan Pieter").as_deref(),
            Some("Pieter")
        );
        assert_eq!(
            name_from_description("Mijn beste vriendin Lotte heet ze").as_deref(),
            Some("Lotte")
        );
        assert_eq!(
            name_from_description("ze heet Anouk en is 30").as_deref(),
            Some("Anouk")
        );
    }

    #[test]
    fn test_description_stop_words_rejected() {
        assert_eq!(name_from_description("Voor Het feest van morgen"), None);
        assert_eq!(
            name_from_description("Voor Mijn moeder, bedoeld voor Ria").as_deref(),
            Some("Ria")
        );
    }

    #[test]
    fn test_name_from_title_is_capped() {
        assert_eq!(
            name_from_title("Persoonlijk lied voor Emma").as_deref(),
            Some("Emma")
        );
        assert_eq!(name_from_title("Lied voor jou"), None);
        assert_eq!(name_from_title("Lied zonder naam"), None);

        let long =
            name_from_title("Lied voor Maximiliaan Alexander Vandenberghe-Oosterhout").unwrap();
        assert!(long.chars().count() <= 30);
        assert!(long.starts_with("Maximiliaan"));
    }

    #[test]
    fn test_full_name_falls_back_to_description_then_title() {
        let (full, _) = resolve(json!({
            "custom_fields": [{"name": "Beschrijf", "value": "Dit lied is voor Sem"}]
        }));
        assert_eq!(full.as_deref(), Some("Sem"));

        let (full, _) = resolve(json!({
            "items": [{"title": "Songtekst voor Noor"}]
        }));
        assert_eq!(full.as_deref(), Some("Noor"));
    }

    #[test]
    fn test_first_name_order() {
        let (_, first) = resolve(json!({
            "address": {"firstname": "Eva", "full_name": "Anna Smit"},
            "customer": {"name": "Kees Smit"}
        }));
        assert_eq!(first.as_deref(), Some("Eva"));

        let (_, first) = resolve(json!({
            "address": {"full_name": "Anna Smit"},
            "customer": {"name": "Kees Smit"}
        }));
        assert_eq!(first.as_deref(), Some("Kees"));

        let (_, first) = resolve(json!({"address": {"full_name": "Anna Smit"}}));
        assert_eq!(first.as_deref(), Some("Anna"));
    }

    #[test]
    fn test_nothing_resolves_to_none() {
        assert_eq!(resolve(json!({})), (None, None));
    }

    #[test]
    fn test_email_prefers_customer() {
        let payload = RawOrderPayload::new(json!({
            "customer": {"email": " a@x.com "},
            "address": {"email": "b@x.com"}
        }));
        assert_eq!(resolve_email(&payload).as_deref(), Some("a@x.com"));

        let payload = RawOrderPayload::new(json!({"address": {"email": "b@x.com"}}));
        assert_eq!(resolve_email(&payload).as_deref(), Some("b@x.com"));
    }
}
