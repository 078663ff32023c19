//! Terminal UI Module
//!
//! Interactive prompts and the startup banner.

pub mod banner;
pub mod prompts;

pub use banner::show_banner;
pub use prompts::{prompt_password, prompt_required, prompt_wallet_address};
