//! Agora - Type Definitions
//!
//! Shared types for the marketplace client: platform wire payloads,
//! catalog listings, task records, and the `PlatformClient` trait that
//! fronts every HTTP call to the platform.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ─── Catalog ─────────────────────────────────────────────────────

/// One agent listing, as returned by `/list-agents` or carried in the
/// built-in catalog. The platform mixes numeric and string ids, so ids
/// are normalized to strings on deserialization.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentListing {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub specialty: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews: u32,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub capabilities: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time: Option<String>,
    /// Platform username used when creating contracts with this agent.
    /// Built-in listings have none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Value::deserialize(deserializer)?;
    match v {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "agent id must be a string or number, got {other}"
        ))),
    }
}

// ─── Tasks ───────────────────────────────────────────────────────

/// One row of the task-tracking dashboard, as returned by
/// `/tasks-by-email=<email>`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TaskRecord {
    pub contract_id: String,
    pub task_id: String,
    #[serde(default)]
    pub verifier_notes: String,
    #[serde(default)]
    pub proof_cid: String,
}

// ─── Negotiation wire format ─────────────────────────────────────

/// One turn of the role-tagged transcript sent to `/haggle`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranscriptTurn {
    pub role: String,
    pub content: String,
}

/// Request body for `POST /haggle`.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HaggleRequest {
    pub agent_name: String,
    pub budget: String,
    pub task_requirements: String,
    pub satisfaction_criteria: String,
    pub conversation_history: Vec<TranscriptTurn>,
    pub negotiation_count: u32,
    pub max_budget: f64,
}

/// Response body from `POST /haggle`. Both fields are optional on the
/// wire; the defaulting rules live in the negotiation controller
/// (`message` falls back to a templated line, `status` to haggling).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct HaggleResponse {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

// ─── Contract wire format ────────────────────────────────────────

/// Request body for `POST /create-funded-contract-v2`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContractRequest {
    pub agent_username: String,
    pub client_username: String,
    pub final_task_price: f64,
    pub task_description: String,
    pub task_validation_requirements: String,
}

/// Success body from `POST /create-funded-contract-v2`. Error bodies
/// (`{error, details}`) are mapped to `Err` by the client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContractResponse {
    pub task_uuid: String,
    pub contract_address: String,
    pub task_price: f64,
}

// ─── Platform client trait ───────────────────────────────────────

/// Everything the application asks of the platform, behind one seam so
/// the negotiation controller and the dashboards can be tested against
/// a scripted implementation.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Authenticate a client. Returns the raw session blob the platform
    /// hands back; the identity layer extracts fields from it leniently.
    async fn login(&self, email: &str, password: &str) -> anyhow::Result<Value>;

    /// Fetch the platform's agent listings.
    async fn list_agents(&self) -> anyhow::Result<Vec<AgentListing>>;

    /// Run one negotiation turn.
    async fn haggle(&self, req: &HaggleRequest) -> anyhow::Result<HaggleResponse>;

    /// Create a funded on-chain contract for finalized terms.
    async fn create_funded_contract(
        &self,
        req: &ContractRequest,
    ) -> anyhow::Result<ContractResponse>;

    /// Fetch the task rows for a client.
    async fn tasks_by_email(&self, email: &str) -> anyhow::Result<Vec<TaskRecord>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_listing_accepts_numeric_id() {
        let listing: AgentListing = serde_json::from_str(
            r#"{"id": 3, "name": "CodeMaster Bot", "company": "DevGenius Inc"}"#,
        )
        .unwrap();
        assert_eq!(listing.id, "3");
        assert_eq!(listing.name, "CodeMaster Bot");
        assert!(listing.capabilities.is_empty());
    }

    #[test]
    fn test_agent_listing_accepts_string_id() {
        let listing: AgentListing =
            serde_json::from_str(r#"{"id": "data-analyzer-pro", "name": "DataAnalyzer Pro"}"#)
                .unwrap();
        assert_eq!(listing.id, "data-analyzer-pro");
    }

    #[test]
    fn test_haggle_request_serializes_camel_case() {
        let req = HaggleRequest {
            agent_name: "ContentCraft AI".to_string(),
            budget: "$200".to_string(),
            task_requirements: "Write a blog post".to_string(),
            satisfaction_criteria: "Client approval".to_string(),
            conversation_history: vec![],
            negotiation_count: 0,
            max_budget: 260.0,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("agentName").is_some());
        assert!(json.get("maxBudget").is_some());
        assert!(json.get("negotiationCount").is_some());
    }

    #[test]
    fn test_haggle_response_fields_optional() {
        let resp: HaggleResponse = serde_json::from_str("{}").unwrap();
        assert!(resp.message.is_none());
        assert!(resp.status.is_none());
    }

    #[test]
    fn test_contract_request_serializes_snake_case() {
        let req = ContractRequest {
            agent_username: "craft".to_string(),
            client_username: "client@example.com".to_string(),
            final_task_price: 200.0,
            task_description: "Write a blog post".to_string(),
            task_validation_requirements: "Client approval".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("agent_username").is_some());
        assert!(json.get("final_task_price").is_some());
    }
}
