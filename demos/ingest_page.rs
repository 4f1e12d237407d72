//! Ingest one page of orders and print the result.
//!
//! ```text
//! cargo run --example ingest_page -- [path/to/page.json]
//! ```
//!
//! Without a path the bundled sample page is used.

use anyhow::Context;
use rust_order_linker::circuit_breaker::guard_pool;
use rust_order_linker::config::EngineConfig;
use rust_order_linker::normalizer::OrderNormalizer;
use rust_order_linker::obs::init_tracing;
use rust_order_linker::payload::OrderPage;
use rust_order_linker::store::InMemoryOrderStore;
use rust_order_linker::themes::{StaticThemeStore, ThemeCatalogEntry};

const SAMPLE_PAGE: &str = include_str!("sample_page.json");

fn main() -> anyhow::Result<()> {
    init_tracing("rust_order_linker=debug,ingest_page=info")?;

    let config = EngineConfig::from_env()?;
    tracing::info!("Configuration loaded successfully");

    let raw = match std::env::args().nth(1) {
        Some(path) => std::fs::read_to_string(&path)
            .with_context(|| format!("reading order page from {}", path))?,
        None => SAMPLE_PAGE.to_string(),
    };
    let page: OrderPage = serde_json::from_str(&raw).context("parsing order page")?;

    let themes = StaticThemeStore::new(vec![
        ThemeCatalogEntry::new(1, "verjaardag", "Verjaardag"),
        ThemeCatalogEntry::new(2, "liefde", "Liefde & Romantiek"),
        ThemeCatalogEntry::new(3, "afscheid", "Afscheid"),
        ThemeCatalogEntry::new(4, "bedankt", "Bedankt"),
        ThemeCatalogEntry::new(5, "overig", "Overig"),
    ]);

    let mut store = guard_pool(InMemoryOrderStore::new(), config.pool_failure_threshold);
    let normalizer = OrderNormalizer::new(config, themes)?;

    let report = normalizer.ingest_page(page.into_orders(), &mut store)?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    tracing::info!("{} order(s) held in store", store.inner().len());

    Ok(())
}
