//! Order Normalization & Linking Library
//!
//! Turns raw order payloads from the order API into normalized order records,
//! and links upsell add-on orders back to the original order they extend.
//!
//! # Modules
//!
//! - `circuit_breaker`: Circuit breaker around candidate-pool reads.
//! - `config`: Engine configuration and product catalog.
//! - `custom_fields`: Merges scattered form fields into one map.
//! - `errors`: Error handling types.
//! - `field_labels`: Form label tables.
//! - `identity`: Customer name and email resolution.
//! - `models`: Normalized and stored order records.
//! - `normalizer`: Per-order normalization and batch ingestion.
//! - `obs`: Tracing setup.
//! - `order_type`: Order type classification from line items.
//! - `payload`: Tolerant access to raw payloads.
//! - `store`: Candidate pool and order store seams.
//! - `themes`: Theme catalog, matching and caching.
//! - `upsell_linker`: Upsell → original order linking and scoring.

pub mod circuit_breaker;
pub mod config;
pub mod custom_fields;
pub mod errors;
pub mod field_labels;
pub mod identity;
pub mod models;
pub mod normalizer;
pub mod obs;
pub mod order_type;
pub mod payload;
pub mod store;
pub mod themes;
pub mod upsell_linker;
