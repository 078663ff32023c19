//! Platform API Client
//!
//! Communicates with the marketplace platform over HTTP/JSON. The
//! platform owns all real logic (auth, agent registry, escrow, task
//! verification); this client only moves requests and responses.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::types::{
    AgentListing, ContractRequest, ContractResponse, HaggleRequest, HaggleResponse,
    PlatformClient, TaskRecord,
};

/// HTTP client for the marketplace platform.
pub struct PlatformHttpClient {
    pub base_url: String,
    http: Client,
}

impl PlatformHttpClient {
    /// Create a new platform client pointed at `base_url`.
    pub fn new(base_url: String) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http: Client::new(),
        }
    }

    /// Internal helper: send an HTTP request to the platform and return JSON.
    async fn request(&self, method: &str, path: &str, body: Option<Value>) -> Result<Value> {
        let url = format!("{}{}", self.base_url, path);

        let mut builder = match method {
            "GET" => self.http.get(&url),
            "POST" => self.http.post(&url),
            _ => self.http.get(&url),
        };

        builder = builder.header("Content-Type", "application/json");

        if let Some(b) = body {
            builder = builder.json(&b);
        }

        let resp = builder
            .send()
            .await
            .with_context(|| format!("Platform request failed: {} {}", method, path))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!(
                "Platform error: {} {} -> {}: {}",
                method,
                path,
                status.as_u16(),
                text
            );
        }

        let json: Value = resp
            .json()
            .await
            .with_context(|| format!("Platform returned non-JSON body for {}", path))?;
        Ok(json)
    }
}

/// Extract the application-level failure message from a 2xx contract
/// body. The endpoint reports failures as `{error, details}`; `details`
/// may be absent and `error` is not always a string.
fn contract_error(json: &Value) -> Option<String> {
    let error = json.get("error")?;
    if error.is_null() {
        return None;
    }
    let error = match error.as_str() {
        Some(s) => s.to_string(),
        None => error.to_string(),
    };
    match json.get("details").and_then(|v| v.as_str()) {
        Some(details) if !details.is_empty() => Some(format!("{error}: {details}")),
        _ => Some(error),
    }
}

#[async_trait]
impl PlatformClient for PlatformHttpClient {
    async fn login(&self, email: &str, password: &str) -> Result<Value> {
        let body = serde_json::json!({
            "email_address": email,
            "password": password,
        });
        self.request("POST", "/login", Some(body)).await
    }

    async fn list_agents(&self) -> Result<Vec<AgentListing>> {
        let json = self.request("GET", "/list-agents", None).await?;
        let agents: Vec<AgentListing> =
            serde_json::from_value(json).context("Failed to parse agent listings")?;
        Ok(agents)
    }

    async fn haggle(&self, req: &HaggleRequest) -> Result<HaggleResponse> {
        let body = serde_json::to_value(req)?;
        let json = self.request("POST", "/haggle", Some(body)).await?;
        let resp: HaggleResponse =
            serde_json::from_value(json).context("Failed to parse haggle response")?;
        Ok(resp)
    }

    async fn create_funded_contract(&self, req: &ContractRequest) -> Result<ContractResponse> {
        let body = serde_json::to_value(req)?;
        let json = self
            .request("POST", "/create-funded-contract-v2", Some(body))
            .await?;

        if let Some(message) = contract_error(&json) {
            anyhow::bail!("{message}");
        }

        let resp: ContractResponse =
            serde_json::from_value(json).context("Failed to parse contract response")?;
        Ok(resp)
    }

    async fn tasks_by_email(&self, email: &str) -> Result<Vec<TaskRecord>> {
        let path = format!("/tasks-by-email={}", urlencoding::encode(email));
        let json = self.request("GET", &path, None).await?;
        let tasks: Vec<TaskRecord> =
            serde_json::from_value(json).context("Failed to parse task rows")?;
        Ok(tasks)
    }
}
