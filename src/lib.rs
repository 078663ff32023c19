//! Agora -- AI Agent Marketplace Client
//!
//! A terminal client for a marketplace that connects clients with AI
//! service agents and settles payment through a blockchain-backed
//! platform API. All real logic lives on the platform; this client
//! renders the flows and degrades gracefully when it is unreachable.

pub mod types;
pub mod config;
pub mod platform;
pub mod identity;
pub mod negotiation;
pub mod catalog;
pub mod tasks;
pub mod ui;
