//! Agent Catalog
//!
//! Fetches the platform's agent listings and merges them ahead of a
//! fixed built-in set, with any locally onboarded agents appended
//! last. When the platform is unreachable the local sets are shown
//! alone, with the fetch error carried alongside so the caller can
//! surface a warning.

use tracing::warn;

use crate::catalog::onboard::OnboardedAgent;
use crate::types::{AgentListing, PlatformClient};

fn listing(
    id: &str,
    name: &str,
    company: &str,
    specialty: &str,
    rating: f64,
    reviews: u32,
    description: &str,
    avatar: &str,
) -> AgentListing {
    AgentListing {
        id: id.to_string(),
        name: name.to_string(),
        company: company.to_string(),
        specialty: specialty.to_string(),
        rating,
        reviews,
        description: description.to_string(),
        avatar: avatar.to_string(),
        capabilities: Vec::new(),
        price_range: None,
        response_time: None,
        username: None,
    }
}

/// The fixed built-in catalog, shown after any platform listings.
pub fn builtin_listings() -> Vec<AgentListing> {
    let mut agents = vec![
        listing(
            "data-analyzer-pro",
            "DataAnalyzer Pro",
            "TechCorp AI",
            "Data Analysis & Insights",
            4.9,
            156,
            "Advanced AI agent specializing in complex data analysis, pattern recognition, \
             and business insights generation.",
            "🤖",
        ),
        listing(
            "content-craft-ai",
            "ContentCraft AI",
            "Creative Solutions",
            "Content Creation",
            4.8,
            203,
            "Expert content creation AI for marketing materials, blog posts, and creative \
             writing with brand consistency.",
            "✍️",
        ),
        listing(
            "codemaster-bot",
            "CodeMaster Bot",
            "DevGenius Inc",
            "Software Development",
            4.9,
            89,
            "Full-stack development AI capable of writing, testing, and deploying \
             production-ready code across multiple languages.",
            "💻",
        ),
        listing(
            "vision-analyst-ai",
            "VisionAnalyst AI",
            "ImageTech Solutions",
            "Image & Video Analysis",
            4.7,
            124,
            "Computer vision specialist for object detection, image classification, and \
             video content analysis.",
            "👁️",
        ),
        listing(
            "customer-care-pro",
            "CustomerCare Pro",
            "ServiceBot Ltd",
            "Customer Support",
            4.8,
            312,
            "Intelligent customer service AI with natural language processing and \
             multi-language support.",
            "💬",
        ),
        listing(
            "market-predictor-ai",
            "MarketPredictor AI",
            "FinanceAI Corp",
            "Market Analysis",
            4.9,
            78,
            "Financial market analysis AI with predictive modeling and risk assessment \
             capabilities.",
            "📈",
        ),
    ];

    agents[0].capabilities = vec![
        "Statistical Analysis".to_string(),
        "Predictive Modeling".to_string(),
        "Data Visualization".to_string(),
        "Report Generation".to_string(),
    ];
    agents[0].price_range = Some("0.004 - 0.6 ETH".to_string());
    agents[0].response_time = Some("< 2 hours".to_string());

    agents[1].capabilities = vec![
        "Blog Writing".to_string(),
        "Marketing Copy".to_string(),
        "Social Media".to_string(),
        "SEO Content".to_string(),
    ];
    agents[1].price_range = Some("0.001 - 5 ETH".to_string());
    agents[1].response_time = Some("< 1 hour".to_string());

    agents
}

/// Present a locally onboarded agent as a catalog listing.
fn onboarded_listing(agent: &OnboardedAgent) -> AgentListing {
    AgentListing {
        id: agent.id.clone(),
        name: agent.name.clone(),
        company: agent.company.clone(),
        specialty: agent.specialty.clone(),
        rating: agent.rating,
        reviews: agent.reviews,
        description: agent.description.clone(),
        avatar: "🤖".to_string(),
        capabilities: Vec::new(),
        price_range: None,
        response_time: None,
        username: None,
    }
}

/// The merged catalog plus the fetch error, if the platform call failed.
pub struct CatalogFetch {
    pub agents: Vec<AgentListing>,
    pub fetch_error: Option<String>,
}

fn merged(platform_agents: Vec<AgentListing>, onboarded: &[OnboardedAgent]) -> Vec<AgentListing> {
    let mut agents = platform_agents;
    agents.extend(builtin_listings());
    agents.extend(onboarded.iter().map(onboarded_listing));
    agents
}

/// Fetch the catalog: platform agents first, built-ins next, locally
/// onboarded agents last. Falls back to the local sets alone when the
/// platform is unreachable.
pub async fn fetch_catalog(
    platform: &dyn PlatformClient,
    onboarded: &[OnboardedAgent],
) -> CatalogFetch {
    match platform.list_agents().await {
        Ok(agents) => CatalogFetch {
            agents: merged(agents, onboarded),
            fetch_error: None,
        },
        Err(e) => {
            warn!("Agent fetch failed, falling back to the local catalog: {e:#}");
            CatalogFetch {
                agents: merged(Vec::new(), onboarded),
                fetch_error: Some(format!("{e:#}")),
            }
        }
    }
}

/// Look up a listing by string id over the merged set.
pub fn find_agent<'a>(agents: &'a [AgentListing], id: &str) -> Option<&'a AgentListing> {
    agents.iter().find(|a| a.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ContractRequest, ContractResponse, HaggleRequest, HaggleResponse, TaskRecord,
    };
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::Value;

    struct ListingPlatform(Option<Vec<AgentListing>>);

    #[async_trait]
    impl PlatformClient for ListingPlatform {
        async fn login(&self, _e: &str, _p: &str) -> anyhow::Result<Value> {
            Err(anyhow!("not scripted"))
        }

        async fn list_agents(&self) -> anyhow::Result<Vec<AgentListing>> {
            match &self.0 {
                Some(agents) => Ok(agents.clone()),
                None => Err(anyhow!("connection refused")),
            }
        }

        async fn haggle(&self, _r: &HaggleRequest) -> anyhow::Result<HaggleResponse> {
            Err(anyhow!("not scripted"))
        }

        async fn create_funded_contract(
            &self,
            _r: &ContractRequest,
        ) -> anyhow::Result<ContractResponse> {
            Err(anyhow!("not scripted"))
        }

        async fn tasks_by_email(&self, _e: &str) -> anyhow::Result<Vec<TaskRecord>> {
            Err(anyhow!("not scripted"))
        }
    }

    fn onboarded(name: &str) -> OnboardedAgent {
        crate::catalog::onboard::new_agent(
            name,
            "Local Co",
            "Testing",
            "Locally onboarded",
            "https://hook.example.com",
            "key-123",
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_platform_agents_sort_ahead_of_builtins() {
        let api_agent = listing("remote-1", "Remote One", "Platform", "Testing", 5.0, 1, "", "🛰️");
        let platform = ListingPlatform(Some(vec![api_agent]));

        let fetched = fetch_catalog(&platform, &[]).await;
        assert!(fetched.fetch_error.is_none());
        assert_eq!(fetched.agents[0].id, "remote-1");
        assert_eq!(fetched.agents.len(), 1 + builtin_listings().len());
    }

    #[tokio::test]
    async fn test_fetch_failure_falls_back_to_builtins() {
        let platform = ListingPlatform(None);
        let fetched = fetch_catalog(&platform, &[]).await;
        assert!(fetched.fetch_error.is_some());
        assert_eq!(fetched.agents.len(), builtin_listings().len());
    }

    #[tokio::test]
    async fn test_onboarded_agents_join_the_catalog() {
        let platform = ListingPlatform(Some(Vec::new()));
        let local = onboarded("Local Bot");

        let fetched = fetch_catalog(&platform, std::slice::from_ref(&local)).await;
        let found = find_agent(&fetched.agents, &local.id).unwrap();
        assert_eq!(found.name, "Local Bot");
        assert_eq!(found.reviews, 0);
        // Local agents sort after the built-in set.
        assert_eq!(fetched.agents.last().unwrap().id, local.id);
    }

    #[tokio::test]
    async fn test_onboarded_agents_survive_fetch_failure() {
        let platform = ListingPlatform(None);
        let local = onboarded("Offline Bot");

        let fetched = fetch_catalog(&platform, std::slice::from_ref(&local)).await;
        assert!(fetched.fetch_error.is_some());
        assert!(find_agent(&fetched.agents, &local.id).is_some());
    }

    #[test]
    fn test_find_agent_by_id() {
        let agents = builtin_listings();
        assert_eq!(
            find_agent(&agents, "content-craft-ai").unwrap().name,
            "ContentCraft AI"
        );
        assert!(find_agent(&agents, "nope").is_none());
    }
}
