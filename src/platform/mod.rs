//! Platform Module
//!
//! HTTP client for the marketplace platform: login, agent catalog,
//! negotiation, contract creation, and task tracking endpoints.

pub mod client;

pub use client::PlatformHttpClient;
