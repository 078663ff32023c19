//! Negotiation Workflow Controller
//!
//! Drives one client/agent negotiation from proposal through haggling
//! to a funded contract. The controller owns the phase machine, the
//! message history, and the budget ceiling; all real negotiation logic
//! lives on the platform, with the local simulator standing in when
//! the `/haggle` endpoint is unreachable. Contract creation has no
//! local substitute: fabricating a funded on-chain reference would be
//! worse than failing.

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::identity::IdentityProvider;
use crate::types::{ContractRequest, HaggleRequest, PlatformClient, TranscriptTurn};

use super::fallback;

// ─── Session model ───────────────────────────────────────────────

/// Which side of the conversation a message belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Sender {
    Client,
    Agent,
}

/// One message in the negotiation transcript. History is append-only
/// and display order equals insertion order.
#[derive(Clone, Debug)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub content: String,
    pub timestamp: String,
}

impl Message {
    fn new(sender: Sender, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            sender,
            content,
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

/// The client's terms, set once in the details phase and immutable
/// afterwards.
#[derive(Clone, Debug)]
pub struct Proposal {
    pub budget: String,
    pub task_requirements: String,
    pub satisfaction_criteria: String,
}

/// Whether the agent side has agreed to terms. Transitions only
/// `Haggling -> Accepted`, never back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NegotiationStatus {
    Haggling,
    Accepted,
}

/// The workflow phase. Monotonic within one session except for the
/// rollback `Loading -> Negotiation` when contract creation fails.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Details,
    Negotiation,
    Loading,
    Result,
}

/// The funded contract reference returned on successful finalization.
#[derive(Clone, Debug)]
pub struct ContractResult {
    pub task_id: String,
    pub contract_address: String,
    pub task_price: f64,
    pub message: String,
}

/// The agent being negotiated with, fixed for the session.
#[derive(Clone, Debug)]
pub struct AgentIdentity {
    pub display_name: String,
    pub platform_username: String,
}

// ─── Errors ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum NegotiationError {
    /// Missing or malformed form input. Handled synchronously; never
    /// reaches the network.
    #[error("{0}")]
    Validation(String),

    /// `/haggle` transport failure or non-2xx. Compensated internally
    /// by the fallback simulator; callers never see this variant from
    /// `submit_proposal` or `send_message`.
    #[error("negotiation service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Contract creation failed. Never compensated locally; the phase
    /// rolls back to negotiation and the message is surfaced verbatim.
    #[error("contract creation failed: {0}")]
    Finalization(String),

    /// Finalize was invoked before the agent accepted the terms.
    #[error("cannot finalize: the agent has not accepted the terms yet")]
    GuardViolation,
}

// ─── Controller ──────────────────────────────────────────────────

/// Multiplier applied to the parsed budget to form the ceiling the
/// negotiation service may settle at.
const BUDGET_CEILING_FACTOR: f64 = 1.3;

/// Extract the numeric value from a free-form budget string by
/// stripping every character that is not an ASCII digit or `.`, then
/// parsing. Empty or unparseable remainders read as zero.
pub fn parse_budget(budget: &str) -> f64 {
    let numeric: String = budget
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    numeric.parse::<f64>().unwrap_or(0.0)
}

/// One negotiation session: created when the hire flow opens, dropped
/// when it closes. No cross-session memory.
pub struct NegotiationController<'a> {
    platform: &'a dyn PlatformClient,
    identity: &'a dyn IdentityProvider,
    agent: AgentIdentity,
    proposal: Option<Proposal>,
    history: Vec<Message>,
    round: u32,
    status: NegotiationStatus,
    phase: Phase,
    max_budget: f64,
    contract_result: Option<ContractResult>,
}

impl<'a> NegotiationController<'a> {
    pub fn new(
        platform: &'a dyn PlatformClient,
        identity: &'a dyn IdentityProvider,
        agent: AgentIdentity,
    ) -> Self {
        Self {
            platform,
            identity,
            agent,
            proposal: None,
            history: Vec::new(),
            round: 0,
            status: NegotiationStatus::Haggling,
            phase: Phase::Details,
            max_budget: 0.0,
            contract_result: None,
        }
    }

    // ---- Accessors ------------------------------------------------

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn status(&self) -> NegotiationStatus {
        self.status
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn max_budget(&self) -> f64 {
        self.max_budget
    }

    pub fn contract_result(&self) -> Option<&ContractResult> {
        self.contract_result.as_ref()
    }

    pub fn agent_name(&self) -> &str {
        &self.agent.display_name
    }

    /// Last message appended, if any. Convenience for rendering.
    pub fn last_message(&self) -> Option<&Message> {
        self.history.last()
    }

    // ---- Status helpers -------------------------------------------

    /// Adopt a status reported by the service. Acceptance is one-way:
    /// a later `haggling` report never reverts an accepted session.
    fn adopt_status(&mut self, reported: Option<&str>) {
        if matches!(reported, Some(s) if s.eq_ignore_ascii_case("accepted")) {
            self.status = NegotiationStatus::Accepted;
        }
    }

    fn force_accept_at(&mut self, ceiling: u32) {
        if self.round >= ceiling && self.status != NegotiationStatus::Accepted {
            info!(round = self.round, "Forcing acceptance at round ceiling");
            self.status = NegotiationStatus::Accepted;
        }
    }

    fn transcript(&self) -> Vec<TranscriptTurn> {
        self.history
            .iter()
            .map(|m| TranscriptTurn {
                role: match m.sender {
                    Sender::Client => "user".to_string(),
                    Sender::Agent => "assistant".to_string(),
                },
                content: m.content.clone(),
            })
            .collect()
    }

    fn client_opening(proposal: &Proposal) -> String {
        format!(
            "I'd like to work with you on: {}. My budget is {} and success criteria: {}",
            proposal.task_requirements, proposal.budget, proposal.satisfaction_criteria
        )
    }

    // ---- submit_proposal ------------------------------------------

    /// Validate the proposal and open the negotiation.
    ///
    /// All three fields must be non-empty, else a validation error is
    /// returned with no request sent and the phase unchanged. On a live
    /// service the agent's opening reply and status come from the
    /// response; when the service is down the simulator's opening line
    /// is used instead. Either way the session moves to the negotiation
    /// phase with `round = 1`; this step never blocks on service
    /// unavailability.
    pub async fn submit_proposal(
        &mut self,
        budget: &str,
        requirements: &str,
        criteria: &str,
    ) -> Result<(), NegotiationError> {
        if self.phase != Phase::Details {
            return Err(NegotiationError::Validation(
                "Proposal already submitted".to_string(),
            ));
        }

        let budget = budget.trim();
        let requirements = requirements.trim();
        let criteria = criteria.trim();
        if budget.is_empty() || requirements.is_empty() || criteria.is_empty() {
            return Err(NegotiationError::Validation(
                "Please fill in all fields".to_string(),
            ));
        }

        let proposal = Proposal {
            budget: budget.to_string(),
            task_requirements: requirements.to_string(),
            satisfaction_criteria: criteria.to_string(),
        };
        // Computed once; carried unchanged on every later request.
        self.max_budget = parse_budget(budget) * BUDGET_CEILING_FACTOR;

        let req = HaggleRequest {
            agent_name: self.agent.display_name.clone(),
            budget: proposal.budget.clone(),
            task_requirements: proposal.task_requirements.clone(),
            satisfaction_criteria: proposal.satisfaction_criteria.clone(),
            conversation_history: Vec::new(),
            negotiation_count: 0,
            max_budget: self.max_budget,
        };

        let outcome = self
            .platform
            .haggle(&req)
            .await
            .map_err(|e| NegotiationError::ServiceUnavailable(format!("{e:#}")));

        let opening = Self::client_opening(&proposal);
        self.history.push(Message::new(Sender::Client, opening));

        match outcome {
            Ok(resp) => {
                let reply = resp
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(|| {
                        fallback::default_opening_reply(
                            &proposal.task_requirements,
                            &proposal.budget,
                        )
                    });
                self.history.push(Message::new(Sender::Agent, reply));
                self.adopt_status(resp.status.as_deref());
            }
            Err(e) => {
                warn!("Negotiation start failed, using local simulator: {e}");
                let reply =
                    fallback::opening_line(&proposal.task_requirements, &proposal.budget);
                self.history.push(Message::new(Sender::Agent, reply));
            }
        }

        self.proposal = Some(proposal);
        self.round = 1;
        self.phase = Phase::Negotiation;
        debug!(max_budget = self.max_budget, "Negotiation opened");
        Ok(())
    }

    // ---- send_message ---------------------------------------------

    /// Send one negotiation turn.
    ///
    /// Empty input is a no-op. The client message is appended
    /// optimistically before the request goes out and the turn counter
    /// advances whether or not the service answers; a failed call is
    /// compensated with a round-indexed canned reply. Acceptance is
    /// forced at round 15 on the service path and round 6 on the
    /// fallback path. Requests are serialized by the exclusive borrow:
    /// no second turn can start while one is outstanding.
    pub async fn send_message(&mut self, text: &str) -> Result<(), NegotiationError> {
        let text = text.trim();
        if text.is_empty() || self.phase != Phase::Negotiation {
            return Ok(());
        }

        let Some(proposal) = self.proposal.clone() else {
            return Err(NegotiationError::Validation(
                "No proposal on file".to_string(),
            ));
        };

        self.history
            .push(Message::new(Sender::Client, text.to_string()));

        // The new text rides as the last transcript turn.
        let req = HaggleRequest {
            agent_name: self.agent.display_name.clone(),
            budget: proposal.budget.clone(),
            task_requirements: proposal.task_requirements.clone(),
            satisfaction_criteria: proposal.satisfaction_criteria.clone(),
            conversation_history: self.transcript(),
            negotiation_count: self.round + 1,
            max_budget: self.max_budget,
        };

        let outcome = self
            .platform
            .haggle(&req)
            .await
            .map_err(|e| NegotiationError::ServiceUnavailable(format!("{e:#}")));

        match outcome {
            Ok(resp) => {
                let reply = resp
                    .message
                    .filter(|m| !m.trim().is_empty())
                    .unwrap_or_else(fallback::default_reply);
                self.history.push(Message::new(Sender::Agent, reply));
                self.adopt_status(resp.status.as_deref());
                self.round += 1;
                self.force_accept_at(fallback::SERVICE_ACCEPT_ROUND);
            }
            Err(e) => {
                warn!("Negotiation turn failed, using local simulator: {e}");
                let reply = fallback::pick_reply(self.round).to_string();
                self.history.push(Message::new(Sender::Agent, reply));
                self.round += 1;
                self.force_accept_at(fallback::FALLBACK_ACCEPT_ROUND);
            }
        }

        Ok(())
    }

    // ---- finalize_agreement ---------------------------------------

    /// Create the funded contract for the agreed terms.
    ///
    /// Guarded: while the status is still haggling this is rejected
    /// with no request sent and no state change. A missing client
    /// identity is likewise reported before the loading phase is
    /// entered. On service failure the phase rolls back to negotiation
    /// with the status still accepted, so finalize can be retried.
    pub async fn finalize_agreement(&mut self) -> Result<ContractResult, NegotiationError> {
        if self.status != NegotiationStatus::Accepted {
            return Err(NegotiationError::GuardViolation);
        }
        let Some(proposal) = self.proposal.clone() else {
            return Err(NegotiationError::GuardViolation);
        };
        let Some(client) = self.identity.client_identity() else {
            return Err(NegotiationError::Finalization(
                "Not logged in. Log in before finalizing an agreement.".to_string(),
            ));
        };

        self.phase = Phase::Loading;

        let req = ContractRequest {
            agent_username: self.agent.platform_username.clone(),
            client_username: client.email_address,
            final_task_price: parse_budget(&proposal.budget),
            task_description: proposal.task_requirements.clone(),
            task_validation_requirements: proposal.satisfaction_criteria.clone(),
        };

        match self.platform.create_funded_contract(&req).await {
            Ok(resp) => {
                info!(
                    task_id = %resp.task_uuid,
                    contract = %resp.contract_address,
                    "Funded contract created"
                );
                let result = ContractResult {
                    task_id: resp.task_uuid,
                    contract_address: resp.contract_address,
                    task_price: resp.task_price,
                    message: format!(
                        "Contract established with {}. Work will begin shortly.",
                        self.agent.display_name
                    ),
                };
                self.contract_result = Some(result.clone());
                self.phase = Phase::Result;
                Ok(result)
            }
            Err(e) => {
                warn!("Contract creation failed: {e:#}");
                self.phase = Phase::Negotiation;
                Err(NegotiationError::Finalization(format!("{e:#}")))
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::ClientIdentity;
    use crate::types::{
        AgentListing, ContractResponse, HaggleResponse, TaskRecord,
    };
    use anyhow::anyhow;
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Platform double driven by a script of haggle outcomes. An empty
    /// script answers every call with a transport error, which models
    /// "service down for all calls".
    #[derive(Default)]
    struct ScriptedPlatform {
        haggle_script: Mutex<VecDeque<anyhow::Result<HaggleResponse>>>,
        haggle_requests: Mutex<Vec<HaggleRequest>>,
        contract_script: Mutex<VecDeque<anyhow::Result<ContractResponse>>>,
        contract_requests: Mutex<Vec<ContractRequest>>,
    }

    impl ScriptedPlatform {
        fn queue_haggle(&self, outcome: anyhow::Result<HaggleResponse>) {
            self.haggle_script.lock().unwrap().push_back(outcome);
        }

        fn queue_contract(&self, outcome: anyhow::Result<ContractResponse>) {
            self.contract_script.lock().unwrap().push_back(outcome);
        }

        fn haggle_calls(&self) -> usize {
            self.haggle_requests.lock().unwrap().len()
        }

        fn contract_calls(&self) -> usize {
            self.contract_requests.lock().unwrap().len()
        }

        fn last_haggle(&self) -> HaggleRequest {
            self.haggle_requests.lock().unwrap().last().unwrap().clone()
        }
    }

    #[async_trait]
    impl PlatformClient for ScriptedPlatform {
        async fn login(&self, _email: &str, _password: &str) -> anyhow::Result<Value> {
            Err(anyhow!("not scripted"))
        }

        async fn list_agents(&self) -> anyhow::Result<Vec<AgentListing>> {
            Err(anyhow!("not scripted"))
        }

        async fn haggle(&self, req: &HaggleRequest) -> anyhow::Result<HaggleResponse> {
            self.haggle_requests.lock().unwrap().push(req.clone());
            self.haggle_script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("connection refused")))
        }

        async fn create_funded_contract(
            &self,
            req: &ContractRequest,
        ) -> anyhow::Result<ContractResponse> {
            self.contract_requests.lock().unwrap().push(req.clone());
            self.contract_script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(anyhow!("connection refused")))
        }

        async fn tasks_by_email(&self, _email: &str) -> anyhow::Result<Vec<TaskRecord>> {
            Err(anyhow!("not scripted"))
        }
    }

    struct FixedIdentity(Option<ClientIdentity>);

    impl IdentityProvider for FixedIdentity {
        fn client_identity(&self) -> Option<ClientIdentity> {
            self.0.clone()
        }
    }

    fn logged_in() -> FixedIdentity {
        FixedIdentity(Some(ClientIdentity {
            email_address: "client@example.com".to_string(),
            eth_wallet_address: Some("0xabc".to_string()),
        }))
    }

    fn test_agent() -> AgentIdentity {
        AgentIdentity {
            display_name: "ContentCraft AI".to_string(),
            platform_username: "contentcraft".to_string(),
        }
    }

    fn haggle_ok(message: &str, status: &str) -> anyhow::Result<HaggleResponse> {
        Ok(HaggleResponse {
            message: Some(message.to_string()),
            status: Some(status.to_string()),
        })
    }

    #[test]
    fn test_parse_budget_strips_non_numeric() {
        assert_eq!(parse_budget("$200"), 200.0);
        assert_eq!(parse_budget("0.5 ETH"), 0.5);
        assert_eq!(parse_budget("$100-500"), 100500.0);
        assert_eq!(parse_budget("no numbers"), 0.0);
    }

    #[tokio::test]
    async fn test_submit_with_empty_field_is_rejected_without_request() {
        let platform = ScriptedPlatform::default();
        let identity = logged_in();
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());

        let err = ctl.submit_proposal("$200", "  ", "Client approval").await;
        assert!(matches!(err, Err(NegotiationError::Validation(_))));
        assert_eq!(ctl.phase(), Phase::Details);
        assert_eq!(platform.haggle_calls(), 0);
        assert!(ctl.history().is_empty());
    }

    #[tokio::test]
    async fn test_submit_seeds_history_and_computes_ceiling() {
        let platform = ScriptedPlatform::default();
        platform.queue_haggle(haggle_ok("Happy to help!", "haggling"));
        let identity = logged_in();
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());

        ctl.submit_proposal("$200", "Write a blog post", "Client approval")
            .await
            .unwrap();

        assert_eq!(ctl.phase(), Phase::Negotiation);
        assert_eq!(ctl.round(), 1);
        assert_eq!(ctl.status(), NegotiationStatus::Haggling);
        assert_eq!(ctl.history().len(), 2);
        assert_eq!(ctl.history()[0].sender, Sender::Client);
        assert_eq!(ctl.history()[1].sender, Sender::Agent);
        assert_eq!(ctl.history()[1].content, "Happy to help!");
        assert!((ctl.max_budget() - 260.0).abs() < 1e-9);

        let req = platform.last_haggle();
        assert_eq!(req.negotiation_count, 0);
        assert!(req.conversation_history.is_empty());
        assert!((req.max_budget - 260.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_submit_proceeds_when_service_is_down() {
        let platform = ScriptedPlatform::default();
        let identity = logged_in();
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());

        ctl.submit_proposal("$200", "Write a blog post", "Client approval")
            .await
            .unwrap();

        assert_eq!(ctl.phase(), Phase::Negotiation);
        assert_eq!(ctl.round(), 1);
        assert_eq!(ctl.status(), NegotiationStatus::Haggling);
        assert_eq!(ctl.history().len(), 2);
        assert!(ctl.history()[1].content.contains("Write a blog post"));
    }

    #[tokio::test]
    async fn test_submit_defaults_missing_message_and_status() {
        let platform = ScriptedPlatform::default();
        platform.queue_haggle(Ok(HaggleResponse::default()));
        let identity = logged_in();
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());

        ctl.submit_proposal("$200", "Write a blog post", "Client approval")
            .await
            .unwrap();

        assert_eq!(ctl.status(), NegotiationStatus::Haggling);
        assert!(ctl.history()[1].content.contains("Write a blog post"));
    }

    #[tokio::test]
    async fn test_empty_message_is_a_no_op() {
        let platform = ScriptedPlatform::default();
        platform.queue_haggle(haggle_ok("hello", "haggling"));
        let identity = logged_in();
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());
        ctl.submit_proposal("$200", "Write a blog post", "Client approval")
            .await
            .unwrap();

        ctl.send_message("   ").await.unwrap();
        assert_eq!(ctl.history().len(), 2);
        assert_eq!(ctl.round(), 1);
        assert_eq!(platform.haggle_calls(), 1);
    }

    #[tokio::test]
    async fn test_send_carries_transcript_and_round() {
        let platform = ScriptedPlatform::default();
        platform.queue_haggle(haggle_ok("opening", "haggling"));
        platform.queue_haggle(haggle_ok("counter-offer", "haggling"));
        let identity = logged_in();
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());
        ctl.submit_proposal("$200", "Write a blog post", "Client approval")
            .await
            .unwrap();

        ctl.send_message("Can you do it for $150?").await.unwrap();

        assert_eq!(ctl.round(), 2);
        assert_eq!(ctl.history().len(), 4);

        let req = platform.last_haggle();
        assert_eq!(req.negotiation_count, 2);
        assert_eq!(req.conversation_history.len(), 3);
        assert_eq!(req.conversation_history[0].role, "user");
        assert_eq!(req.conversation_history[1].role, "assistant");
        let last = req.conversation_history.last().unwrap();
        assert_eq!(last.role, "user");
        assert_eq!(last.content, "Can you do it for $150?");
        assert!((req.max_budget - 260.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_acceptance_is_one_way() {
        let platform = ScriptedPlatform::default();
        platform.queue_haggle(haggle_ok("opening", "haggling"));
        platform.queue_haggle(haggle_ok("deal", "accepted"));
        platform.queue_haggle(haggle_ok("actually...", "haggling"));
        let identity = logged_in();
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());
        ctl.submit_proposal("$200", "Write a blog post", "Client approval")
            .await
            .unwrap();

        ctl.send_message("Deal?").await.unwrap();
        assert_eq!(ctl.status(), NegotiationStatus::Accepted);

        ctl.send_message("One more thing").await.unwrap();
        assert_eq!(ctl.status(), NegotiationStatus::Accepted);
    }

    #[tokio::test]
    async fn test_service_path_forces_acceptance_at_round_15() {
        let platform = ScriptedPlatform::default();
        platform.queue_haggle(haggle_ok("opening", "haggling"));
        for _ in 0..14 {
            platform.queue_haggle(haggle_ok("still haggling", "haggling"));
        }
        let identity = logged_in();
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());
        ctl.submit_proposal("$200", "Write a blog post", "Client approval")
            .await
            .unwrap();

        for i in 0..13 {
            ctl.send_message(&format!("turn {i}")).await.unwrap();
            assert_eq!(ctl.status(), NegotiationStatus::Haggling);
        }
        ctl.send_message("turn 14").await.unwrap();
        assert_eq!(ctl.round(), 15);
        assert_eq!(ctl.status(), NegotiationStatus::Accepted);
    }

    #[tokio::test]
    async fn test_fallback_scenario_six_turns() {
        // Service down for every call, six messages in a row.
        let platform = ScriptedPlatform::default();
        let identity = logged_in();
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());
        ctl.submit_proposal("$100-500", "Build a landing page", "Client approval")
            .await
            .unwrap();

        for i in 0..6 {
            ctl.send_message(&format!("message {i}")).await.unwrap();
        }

        assert_eq!(ctl.round(), 7);
        assert_eq!(ctl.history().len(), 14);
        assert_eq!(ctl.status(), NegotiationStatus::Accepted);
    }

    #[tokio::test]
    async fn test_fallback_replies_are_round_indexed() {
        let platform = ScriptedPlatform::default();
        let identity = logged_in();
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());
        ctl.submit_proposal("$200", "Write a blog post", "Client approval")
            .await
            .unwrap();

        ctl.send_message("first").await.unwrap();
        assert_eq!(ctl.last_message().unwrap().content, fallback::pick_reply(1));

        ctl.send_message("second").await.unwrap();
        assert_eq!(ctl.last_message().unwrap().content, fallback::pick_reply(2));
    }

    #[tokio::test]
    async fn test_finalize_guarded_while_haggling() {
        let platform = ScriptedPlatform::default();
        platform.queue_haggle(haggle_ok("opening", "haggling"));
        let identity = logged_in();
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());
        ctl.submit_proposal("$200", "Write a blog post", "Client approval")
            .await
            .unwrap();

        let err = ctl.finalize_agreement().await;
        assert!(matches!(err, Err(NegotiationError::GuardViolation)));
        assert_eq!(ctl.phase(), Phase::Negotiation);
        assert_eq!(platform.contract_calls(), 0);
    }

    #[tokio::test]
    async fn test_finalize_success_reaches_result() {
        let platform = ScriptedPlatform::default();
        platform.queue_haggle(haggle_ok("deal", "accepted"));
        platform.queue_contract(Ok(ContractResponse {
            task_uuid: "task-1".to_string(),
            contract_address: "0xc0ffee".to_string(),
            task_price: 200.0,
        }));
        let identity = logged_in();
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());
        ctl.submit_proposal("$200", "Write a blog post", "Client approval")
            .await
            .unwrap();
        assert_eq!(ctl.status(), NegotiationStatus::Accepted);

        ctl.finalize_agreement().await.unwrap();

        assert_eq!(ctl.phase(), Phase::Result);
        let result = ctl.contract_result().unwrap();
        assert_eq!(result.task_id, "task-1");
        assert_eq!(result.contract_address, "0xc0ffee");
        assert!((result.task_price - 200.0).abs() < 1e-9);

        let req = &platform.contract_requests.lock().unwrap()[0];
        assert_eq!(req.agent_username, "contentcraft");
        assert_eq!(req.client_username, "client@example.com");
        assert!((req.final_task_price - 200.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_finalize_failure_rolls_back_and_surfaces_error() {
        let platform = ScriptedPlatform::default();
        platform.queue_haggle(haggle_ok("deal", "accepted"));
        platform.queue_contract(Err(anyhow!("insufficient funds")));
        let identity = logged_in();
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());
        ctl.submit_proposal("$200", "Write a blog post", "Client approval")
            .await
            .unwrap();

        let err = ctl.finalize_agreement().await.unwrap_err();
        assert!(err.to_string().contains("insufficient funds"));
        assert_eq!(ctl.phase(), Phase::Negotiation);
        assert_eq!(ctl.status(), NegotiationStatus::Accepted);
        assert!(ctl.contract_result().is_none());

        // Retry is permitted and can succeed.
        platform.queue_contract(Ok(ContractResponse {
            task_uuid: "task-2".to_string(),
            contract_address: "0xretry".to_string(),
            task_price: 200.0,
        }));
        ctl.finalize_agreement().await.unwrap();
        assert_eq!(ctl.phase(), Phase::Result);
    }

    #[tokio::test]
    async fn test_finalize_without_identity_fails_before_loading() {
        let platform = ScriptedPlatform::default();
        platform.queue_haggle(haggle_ok("deal", "accepted"));
        let identity = FixedIdentity(None);
        let mut ctl = NegotiationController::new(&platform, &identity, test_agent());
        ctl.submit_proposal("$200", "Write a blog post", "Client approval")
            .await
            .unwrap();

        let err = ctl.finalize_agreement().await.unwrap_err();
        assert!(matches!(err, NegotiationError::Finalization(_)));
        assert_eq!(ctl.phase(), Phase::Negotiation);
        assert_eq!(platform.contract_calls(), 0);
    }
}
