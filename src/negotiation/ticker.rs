//! Loading Ticker
//!
//! Cosmetic rotating status line shown while a contract is being
//! created. Owned by the loading phase: spawned on entry, aborted on
//! drop so no timer outlives the phase, error exits included.

use std::time::Duration;

use colored::Colorize;
use tokio::task::JoinHandle;

/// Messages cycled on the status line while the contract service works.
pub const LOADING_MESSAGES: &[&str] = &[
    "Drafting the contract terms...",
    "Funding the escrow...",
    "Waiting for on-chain confirmation...",
    "Almost there...",
];

/// Interval between message rotations.
const TICK_INTERVAL: Duration = Duration::from_millis(2000);

/// The message shown at tick `i`, cycling through the fixed list.
pub fn message_at(i: usize) -> &'static str {
    LOADING_MESSAGES[i % LOADING_MESSAGES.len()]
}

/// Abort-on-drop handle for the ticker task.
pub struct LoadingTicker {
    handle: JoinHandle<()>,
}

impl LoadingTicker {
    /// Start the ticker. It rotates messages until dropped.
    pub fn start() -> Self {
        let handle = tokio::spawn(async move {
            let mut tick: usize = 0;
            loop {
                eprint!("\r  {}          ", message_at(tick).dimmed());
                tick += 1;
                tokio::time::sleep(TICK_INTERVAL).await;
            }
        });
        Self { handle }
    }
}

impl Drop for LoadingTicker {
    fn drop(&mut self) {
        self.handle.abort();
        // Clear the status line before whatever is printed next.
        eprint!("\r                                                  \r");
    }
}
