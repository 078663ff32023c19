//! Client Identity Module
//!
//! Local registration and session storage, plus the read-only identity
//! provider the negotiation controller consumes.

pub mod session;

pub use session::{ClientIdentity, FileIdentityProvider, IdentityProvider};
