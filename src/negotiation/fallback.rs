//! Local Fallback Simulator
//!
//! Canned agent replies used when the negotiation service is
//! unreachable. Replies are chosen by round index (deterministic), with
//! later entries steering the conversation toward acceptance so a dead
//! service never leaves the client stuck haggling.

/// Canned replies for failed `/haggle` turns, indexed by round number
/// and clamped to the last entry.
pub const CANNED_REPLIES: &[&str] = &[
    "Thanks for reaching out. Let me look over your requirements and get back to you with a plan.",
    "That sounds reasonable. I can adjust my approach to fit within your budget while maintaining quality.",
    "I understand your requirements better now. Let me propose a revised timeline that works for both of us.",
    "I can definitely accommodate that request. Let me outline the specific deliverables.",
    "We're close. I can commit to the scope as discussed if the budget stays where we agreed.",
    "Great! I think we're aligned on the scope. Shall we finalize the agreement and start working?",
    "Agreed on all points. I'm ready to start as soon as the contract is funded.",
];

/// Rounds at which the fallback path forces acceptance. Shorter than
/// the service-backed ceiling because the canned pool is small.
pub const FALLBACK_ACCEPT_ROUND: u32 = 6;

/// Rounds at which the service-backed path forces acceptance,
/// preventing unbounded haggling.
pub const SERVICE_ACCEPT_ROUND: u32 = 15;

/// Pick the canned reply for a round: `canned[min(round, len - 1)]`.
pub fn pick_reply(round: u32) -> &'static str {
    let idx = (round as usize).min(CANNED_REPLIES.len() - 1);
    CANNED_REPLIES[idx]
}

/// Agent opening line used when the initial `/haggle` call fails.
pub fn opening_line(requirements: &str, budget: &str) -> String {
    format!(
        "Thank you for your interest! I've reviewed your requirements for \"{requirements}\" \
         with a budget of {budget}. I can deliver excellent results that meet your criteria. \
         Let's discuss the timeline and specific deliverables."
    )
}

/// Agent opening line used when the initial `/haggle` call succeeds but
/// the response omits `message`.
pub fn default_opening_reply(requirements: &str, budget: &str) -> String {
    format!(
        "Thank you for your interest! I've reviewed your requirements. Based on the complexity \
         of \"{requirements}\" and your budget of {budget}, I can definitely help. Let me \
         propose a detailed approach that meets your satisfaction criteria."
    )
}

/// Agent reply used when a mid-negotiation `/haggle` call succeeds but
/// the response omits `message`.
pub fn default_reply() -> String {
    "Understood. Let me factor that in and refine the proposal.".to_string()
}
