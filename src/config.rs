use chrono::Duration;
use std::time::Duration as StdDuration;

/// Product identifiers the classifier and linker recognise.
///
/// Kept as data so a shop that re-creates its products only changes config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCatalog {
    /// The regular 72-hour delivery product.
    pub standard_product_id: i64,
    /// The 24-hour express delivery product.
    pub express_product_id: i64,
    /// Known upsell add-ons and the label each one classifies as.
    pub upsell_labels: Vec<(i64, String)>,
    /// Known order-bump add-ons and the label each one classifies as.
    pub order_bump_labels: Vec<(i64, String)>,
}

impl ProductCatalog {
    /// Whether `product_id` is one of the two primary (non add-on) products.
    pub fn is_primary(&self, product_id: i64) -> bool {
        product_id == self.standard_product_id || product_id == self.express_product_id
    }

    pub fn upsell_label(&self, product_id: i64) -> Option<&str> {
        lookup_label(&self.upsell_labels, product_id)
    }

    pub fn order_bump_label(&self, product_id: i64) -> Option<&str> {
        lookup_label(&self.order_bump_labels, product_id)
    }
}

fn lookup_label(table: &[(i64, String)], product_id: i64) -> Option<&str> {
    table
        .iter()
        .find(|(id, _)| *id == product_id)
        .map(|(_, label)| label.as_str())
}

impl Default for ProductCatalog {
    fn default() -> Self {
        Self {
            standard_product_id: 481_201,
            express_product_id: 481_202,
            upsell_labels: vec![
                (481_310, "Revisie".to_string()),
                (481_311, "Soundtrack Bundel".to_string()),
                (481_312, "Extra Coupletten".to_string()),
            ],
            order_bump_labels: vec![
                (481_420, "Songtekst Poster".to_string()),
                (481_421, "Instrumentale Versie".to_string()),
            ],
        }
    }
}

/// Engine configuration, passed explicitly into the orchestrator.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Look-back window for automatic upsell linking during ingestion.
    pub auto_link_window: Duration,
    /// Look-back window for the manual "review matches" report.
    pub review_window: Duration,
    pub products: ProductCatalog,
    /// Theme id assigned when the matcher finds nothing. `None` leaves it unset.
    pub default_theme_id: Option<i64>,
    /// How long a loaded theme catalog stays cached.
    pub theme_cache_ttl: StdDuration,
    /// Consecutive candidate-pool failures before the circuit opens.
    pub pool_failure_threshold: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            auto_link_window: Duration::hours(24),
            review_window: Duration::days(7),
            products: ProductCatalog::default(),
            default_theme_id: None,
            theme_cache_ttl: StdDuration::from_secs(300),
            pool_failure_threshold: 5,
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();

        let auto_link_window = window(
            "AUTO_LINK_WINDOW_HOURS",
            env_number("AUTO_LINK_WINDOW_HOURS", 24i64)?,
            Duration::try_hours,
        )?;

        let review_window = window(
            "REVIEW_WINDOW_DAYS",
            env_number("REVIEW_WINDOW_DAYS", 7i64)?,
            Duration::try_days,
        )?;

        let mut products = defaults.products;
        products.standard_product_id =
            env_number("STANDARD_PRODUCT_ID", products.standard_product_id)?;
        products.express_product_id =
            env_number("EXPRESS_PRODUCT_ID", products.express_product_id)?;
        if products.standard_product_id == products.express_product_id {
            anyhow::bail!("STANDARD_PRODUCT_ID and EXPRESS_PRODUCT_ID must differ");
        }

        let default_theme_id = match std::env::var("DEFAULT_THEME_ID") {
            Ok(raw) if !raw.trim().is_empty() => Some(
                raw.trim()
                    .parse::<i64>()
                    .map_err(|_| anyhow::anyhow!("DEFAULT_THEME_ID must be a number"))?,
            ),
            _ => None,
        };

        let ttl_secs = env_number("THEME_CACHE_TTL_SECS", 300u64)?;

        let pool_failure_threshold = env_number("POOL_FAILURE_THRESHOLD", 5u32)?;
        if pool_failure_threshold == 0 {
            anyhow::bail!("POOL_FAILURE_THRESHOLD must be at least 1");
        }

        let config = Self {
            auto_link_window,
            review_window,
            products,
            default_theme_id,
            theme_cache_ttl: StdDuration::from_secs(ttl_secs),
            pool_failure_threshold,
        };

        tracing::info!("Engine configuration loaded");
        tracing::debug!(
            "Link windows: auto={}h review={}d",
            config.auto_link_window.num_hours(),
            config.review_window.num_days()
        );
        tracing::debug!(
            "Primary products: standard={} express={}",
            config.products.standard_product_id,
            config.products.express_product_id
        );
        if let Some(theme_id) = config.default_theme_id {
            tracing::info!("Default theme id configured: {}", theme_id);
        }

        Ok(config)
    }
}

/// Positive window length, rejecting values chrono cannot represent.
fn window(
    key: &str,
    amount: i64,
    to_duration: fn(i64) -> Option<Duration>,
) -> anyhow::Result<Duration> {
    if amount <= 0 {
        anyhow::bail!("{} must be positive", key);
    }
    to_duration(amount).ok_or_else(|| anyhow::anyhow!("{} is out of range", key))
}

fn env_number<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} must be a valid number", key)),
        _ => Ok(default),
    }
}
