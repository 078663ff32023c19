//! Negotiation Module
//!
//! The client-side negotiation workflow: a four-phase state machine
//! driving proposal submission, message exchange with the platform's
//! negotiation service (with a local simulator standing in when the
//! service is down), and contract finalization.

pub mod controller;
pub mod fallback;
pub mod ticker;

pub use controller::{
    ContractResult, Message, NegotiationController, NegotiationError, NegotiationStatus, Phase,
    Proposal, Sender,
};
pub use ticker::LoadingTicker;
