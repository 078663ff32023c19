//! Agent Onboarding
//!
//! Collects a new agent listing and appends it to the local
//! `onboarded_agents.json` store. The store is local-only (the
//! platform keeps its own registry) but its agents surface in the
//! merged catalog.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::session::get_agora_dir;

/// Onboarded-agents file name within the agora directory.
const ONBOARDED_FILENAME: &str = "onboarded_agents.json";

/// One locally onboarded agent. New listings start unrated.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardedAgent {
    pub id: String,
    pub name: String,
    pub company: String,
    pub specialty: String,
    pub description: String,
    pub webhook_url: String,
    pub api_key: String,
    pub rating: f64,
    pub reviews: u32,
    pub created_at: String,
}

/// Returns the full path to the onboarded-agents file.
pub fn get_onboarded_path() -> PathBuf {
    get_agora_dir().join(ONBOARDED_FILENAME)
}

/// Validate and build a new onboarded agent record.
pub fn new_agent(
    name: &str,
    company: &str,
    specialty: &str,
    description: &str,
    webhook_url: &str,
    api_key: &str,
) -> Result<OnboardedAgent> {
    let fields = [name, company, specialty, description, webhook_url, api_key];
    if fields.iter().any(|f| f.trim().is_empty()) {
        anyhow::bail!("Please fill in all fields");
    }
    Ok(OnboardedAgent {
        id: Uuid::new_v4().to_string(),
        name: name.trim().to_string(),
        company: company.trim().to_string(),
        specialty: specialty.trim().to_string(),
        description: description.trim().to_string(),
        webhook_url: webhook_url.trim().to_string(),
        api_key: api_key.trim().to_string(),
        rating: 0.0,
        reviews: 0,
        created_at: Utc::now().to_rfc3339(),
    })
}

/// Load all locally onboarded agents. A missing or corrupt file reads
/// as an empty list.
pub fn list_onboarded() -> Vec<OnboardedAgent> {
    let Ok(contents) = fs::read_to_string(get_onboarded_path()) else {
        return Vec::new();
    };
    serde_json::from_str(&contents).unwrap_or_default()
}

/// Append an agent to the local store.
pub fn save_onboarded(agent: &OnboardedAgent) -> Result<()> {
    let dir = get_agora_dir();
    if !dir.exists() {
        fs::create_dir_all(&dir).context("Failed to create agora directory")?;
    }

    let mut agents = list_onboarded();
    agents.push(agent.clone());

    let json =
        serde_json::to_string_pretty(&agents).context("Failed to serialize onboarded agents")?;
    fs::write(get_onboarded_path(), &json).context("Failed to write onboarded agents file")?;
    Ok(())
}
