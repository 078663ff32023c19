//! Catalog Module
//!
//! The agent catalog: built-in listings, platform fetch with fallback
//! merge, and local agent onboarding.

pub mod listings;
pub mod onboard;

pub use listings::{builtin_listings, fetch_catalog, find_agent, CatalogFetch};
