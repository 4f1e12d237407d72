/// Theme catalog and free-text theme matching
///
/// The catalog is reference data owned by the theme store; this module only
/// reads it. Matching runs exact → substring → synonym and stops there.
use crate::errors::AppError;
use moka::sync::Cache;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Synonym → canonical theme name. Checked in order against the lowercased
/// input by substring.
pub const THEME_SYNONYMS: &[(&str, &str)] = &[
    ("birthday", "verjaardag"),
    ("jarig", "verjaardag"),
    ("love", "liefde"),
    ("romance", "liefde"),
    ("romantic", "liefde"),
    ("wedding", "liefde"),
    ("bruiloft", "liefde"),
    ("huwelijk", "liefde"),
    ("valentijn", "liefde"),
    ("goodbye", "afscheid"),
    ("farewell", "afscheid"),
    ("uitvaart", "afscheid"),
    ("pensioen", "afscheid"),
    ("thanks", "bedankt"),
    ("thank", "bedankt"),
    ("appreciation", "bedankt"),
    ("dankjewel", "bedankt"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeCatalogEntry {
    pub id: i64,
    /// Lowercase slug, e.g. `verjaardag`.
    pub canonical_name: String,
    pub display_name: String,
}

impl ThemeCatalogEntry {
    pub fn new(id: i64, canonical_name: &str, display_name: &str) -> Self {
        Self {
            id,
            canonical_name: canonical_name.to_string(),
            display_name: display_name.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThemeCatalog {
    entries: Vec<ThemeCatalogEntry>,
}

impl ThemeCatalog {
    pub fn new(entries: Vec<ThemeCatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[ThemeCatalogEntry] {
        &self.entries
    }

    pub fn get(&self, id: i64) -> Option<&ThemeCatalogEntry> {
        self.entries.iter().find(|entry| entry.id == id)
    }

    pub fn contains_id(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    /// Canonical theme id for `free_text`; see [`match_theme`].
    pub fn match_theme(&self, free_text: &str) -> Option<i64> {
        match_theme(free_text, &self.entries)
    }
}

/// Map free text to a catalog id, or `None`.
///
/// 1. lowercase + trim
/// 2. exact canonical name
/// 3. substring either way, or display name containing the input
/// 4. synonym table, then 2/3 again on the synonym's canonical form
pub fn match_theme(free_text: &str, catalog: &[ThemeCatalogEntry]) -> Option<i64> {
    let normalized = free_text.trim().to_lowercase();
    if normalized.is_empty() {
        return None;
    }

    if let Some(id) = match_direct(&normalized, catalog) {
        return Some(id);
    }

    let canonical = THEME_SYNONYMS
        .iter()
        .find(|(synonym, _)| normalized.contains(synonym))
        .map(|(_, canonical)| *canonical)?;

    tracing::debug!("Theme '{}' matched synonym for '{}'", normalized, canonical);
    match_direct(canonical, catalog)
}

fn match_direct(normalized: &str, catalog: &[ThemeCatalogEntry]) -> Option<i64> {
    if let Some(entry) = catalog
        .iter()
        .find(|entry| entry.canonical_name == normalized)
    {
        return Some(entry.id);
    }

    catalog
        .iter()
        .filter(|entry| !entry.canonical_name.is_empty())
        .find(|entry| {
            normalized.contains(entry.canonical_name.as_str())
                || entry.canonical_name.contains(normalized)
                || entry.display_name.to_lowercase().contains(normalized)
        })
        .map(|entry| entry.id)
}

/// Source of the theme catalog (a database table, a config file, ...).
pub trait ThemeStore {
    /// Load the full catalog. Fails with [`AppError::UpstreamUnavailable`]
    /// when the store cannot be read.
    fn load_themes(&self) -> Result<ThemeCatalog, AppError>;
}

/// A fixed, in-memory catalog.
#[derive(Debug, Clone, Default)]
pub struct StaticThemeStore {
    catalog: ThemeCatalog,
}

impl StaticThemeStore {
    pub fn new(entries: Vec<ThemeCatalogEntry>) -> Self {
        Self {
            catalog: ThemeCatalog::new(entries),
        }
    }
}

impl ThemeStore for StaticThemeStore {
    fn load_themes(&self) -> Result<ThemeCatalog, AppError> {
        Ok(self.catalog.clone())
    }
}

/// Caches the catalog of an inner store for a fixed TTL.
///
/// Failed loads are not cached; the next call retries the store.
pub struct CachedThemeStore<S> {
    inner: S,
    cache: Cache<(), Arc<ThemeCatalog>>,
}

impl<S: ThemeStore> CachedThemeStore<S> {
    pub fn new(inner: S, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Cache::builder().time_to_live(ttl).max_capacity(1).build(),
        }
    }

    pub fn catalog(&self) -> Result<Arc<ThemeCatalog>, AppError> {
        self.cache
            .try_get_with((), || {
                tracing::debug!("Loading theme catalog from store");
                self.inner.load_themes().map(Arc::new)
            })
            .map_err(|e| e.as_ref().clone())
    }

    /// Drop the cached catalog so the next read reloads it.
    pub fn invalidate(&self) {
        self.cache.invalidate(&());
    }
}
