//! Banner
//!
//! Startup banner for interactive commands.

use colored::Colorize;

pub fn show_banner() {
    println!();
    println!("{}", "  AGORA".bold().cyan());
    println!("{}", "  AI agent marketplace client".white());
    println!(
        "{}",
        "  Hire specialized AI agents, settle through Web3 escrow.".dimmed()
    );
    println!();
}
