/// Custom-field extraction
///
/// Order forms have stored their free-form answers in several places over
/// the API's lifetime. This module merges all of them into one flat
/// label → value map, in this precedence (later overwrites earlier):
/// 1. Root legacy map (`custom_data`)
/// 2. Root field array (`custom_fields`)
/// 3. Each line item's own field array
/// 4. The address note, written under `Beschrijf`
///
/// Extraction is total: wrong-typed fields are treated as absent.
use crate::field_labels::{
    DESCRIPTION, DESCRIPTION_KEYWORDS, DESCRIPTION_LABELS, OCCASION, THEME, TONE,
};
use crate::payload::{non_empty_str, scalar_to_string, RawOrderPayload};
use serde_json::Value;

const LEGACY_MAP_KEY: &str = "custom_data";
const FIELD_ARRAY_KEY: &str = "custom_fields";

/// Label → value mapping with case-sensitive labels.
///
/// Keeps first-insertion order so "first match" scans are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomFieldMap {
    entries: Vec<(String, String)>,
}

impl CustomFieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the value under `label`.
    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed value under `label`, if it is non-empty.
    pub fn present(&self, label: &str) -> Option<&str> {
        self.get(label).map(str::trim).filter(|v| !v.is_empty())
    }

    /// First present value among `labels`, in table order.
    pub fn first_of(&self, labels: &[&str]) -> Option<&str> {
        labels.iter().find_map(|label| self.present(label))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    /// The resolved description, whichever recognised label carries it.
    pub fn description(&self) -> Option<&str> {
        self.first_of(DESCRIPTION_LABELS)
    }
}

/// Merge every custom-field source of `payload` into one map.
pub fn extract(payload: &RawOrderPayload) -> CustomFieldMap {
    let mut fields = CustomFieldMap::new();

    // 1. Root legacy map
    if let Some(map) = payload.get(LEGACY_MAP_KEY).and_then(Value::as_object) {
        for (label, value) in map {
            let label = label.trim();
            let Some(value) = scalar_to_string(value) else {
                continue;
            };
            let value = value.trim();
            if !label.is_empty() && !value.is_empty() {
                fields.insert(label, value);
            }
        }
    }

    // 2. Root field array
    if let Some(entries) = payload.get(FIELD_ARRAY_KEY) {
        merge_field_array(&mut fields, entries);
    }

    // 3. Per line item field arrays
    for item in payload.line_items() {
        if let Some(entries) = item.fields {
            merge_field_array(&mut fields, entries);
        }
    }

    // 4. Address note always wins for the description
    if let Some(note) = payload.address_str("note") {
        tracing::debug!("Address note overrides {}", DESCRIPTION);
        fields.insert(DESCRIPTION, note);
    }

    if fields.description().is_none() {
        fill_description_fallback(&mut fields);
    }

    fields
}

/// Merge a `[{name|label, value|input}]` array. Anything that is not an
/// array of objects is ignored.
fn merge_field_array(fields: &mut CustomFieldMap, entries: &Value) {
    let Some(entries) = entries.as_array() else {
        tracing::debug!("Custom field array has unexpected type, ignoring");
        return;
    };

    for entry in entries.iter().filter_map(Value::as_object) {
        let label = non_empty_str(entry.get("name")).or_else(|| non_empty_str(entry.get("label")));

        let value = entry
            .get("value")
            .and_then(scalar_to_string)
            .filter(|v| !v.trim().is_empty())
            .or_else(|| {
                entry
                    .get("input")
                    .and_then(scalar_to_string)
                    .filter(|v| !v.trim().is_empty())
            });

        if let (Some(label), Some(value)) = (label, value) {
            fields.insert(label, value.trim());
        }
    }
}

fn fill_description_fallback(fields: &mut CustomFieldMap) {
    let keyword_hit = fields
        .iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .find(|(label, _)| {
            let label = label.to_lowercase();
            DESCRIPTION_KEYWORDS.iter().any(|kw| label.contains(kw))
        })
        .map(|(label, value)| (label.to_string(), value.to_string()));

    if let Some((label, value)) = keyword_hit {
        tracing::debug!("Description taken from field '{}'", label);
        fields.insert(DESCRIPTION, value);
        return;
    }

    let lines: Vec<String> = [
        (THEME, "Thema"),
        (OCCASION, "Gelegenheid"),
        (TONE, "Gewenste toon"),
    ]
    .iter()
    .filter_map(|(label, prefix)| fields.present(label).map(|v| format!("{}: {}", prefix, v)))
    .collect();

    if !lines.is_empty() {
        tracing::debug!("Description synthesized from {} field(s)", lines.len());
        fields.insert(DESCRIPTION, lines.join("\n"));
    }
}
