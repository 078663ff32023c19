//! Prompts
//!
//! Interactive terminal prompts for the marketplace forms.
//! Uses the `dialoguer` crate for input handling.

use anyhow::Result;
use colored::Colorize;
use dialoguer::{Input, Password};
use regex::Regex;

/// Prompt the user for a required string value.
/// Repeats until a non-empty value is entered.
pub fn prompt_required(label: &str) -> Result<String> {
    loop {
        let value: String = Input::new()
            .with_prompt(format!("  {} {}", "\u{2192}".cyan(), label.white()))
            .allow_empty(true)
            .interact_text()?;

        let trimmed = value.trim().to_string();
        if !trimmed.is_empty() {
            return Ok(trimmed);
        }
        println!("{}", "  This field is required.".yellow());
    }
}

/// Prompt for a secret without echoing it.
/// Repeats until a non-empty value is entered.
pub fn prompt_password(label: &str) -> Result<String> {
    loop {
        let value = Password::new()
            .with_prompt(format!("  {} {}", "\u{2192}".cyan(), label.white()))
            .allow_empty_password(true)
            .interact()?;

        if !value.trim().is_empty() {
            return Ok(value);
        }
        println!("{}", "  This field is required.".yellow());
    }
}

/// Prompt the user for an Ethereum address with validation.
/// Must be 0x followed by 40 hex characters.
pub fn prompt_wallet_address(label: &str) -> Result<String> {
    let re = Regex::new(r"^0x[0-9a-fA-F]{40}$")?;

    loop {
        let value: String = Input::new()
            .with_prompt(format!("  {} {}", "\u{2192}".cyan(), label.white()))
            .allow_empty(true)
            .interact_text()?;

        let trimmed = value.trim().to_string();
        if re.is_match(&trimmed) {
            return Ok(trimmed);
        }
        println!(
            "{}",
            "  Invalid Ethereum address. Must be 0x followed by 40 hex characters.".yellow()
        );
    }
}

#[cfg(test)]
mod tests {
    use regex::Regex;

    #[test]
    fn test_wallet_regex_accepts_checksummed_address() {
        let re = Regex::new(r"^0x[0-9a-fA-F]{40}$").unwrap();
        assert!(re.is_match("0x52908400098527886E0F7030069857D2E4169EE7"));
        assert!(!re.is_match("0x123"));
        assert!(!re.is_match("52908400098527886E0F7030069857D2E4169EE7"));
    }
}
