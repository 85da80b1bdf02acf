//! Types for the approval handoff.
//!
//! A pending request travels to Slack as a [`CorrelationToken`] embedded in
//! the Approve/Deny buttons. When a human clicks one, the relay turns the
//! click into a [`DecisionRecord`] that the waiting hook picks up.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Slack `action_id` of the Approve button.
pub const APPROVE_ACTION_ID: &str = "approve_command";
/// Slack `action_id` of the Deny button.
pub const DENY_ACTION_ID: &str = "deny_command";

/// The outcome a human picked for a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Approve,
    Deny,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecisionKind::Approve => write!(f, "approve"),
            DecisionKind::Deny => write!(f, "deny"),
        }
    }
}

impl DecisionKind {
    /// Map a Slack button `action_id` to the decision it triggers.
    /// Returns None for actions the relay does not handle.
    pub fn from_action_id(action_id: &str) -> Option<DecisionKind> {
        match action_id {
            APPROVE_ACTION_ID => Some(DecisionKind::Approve),
            DENY_ACTION_ID => Some(DecisionKind::Deny),
            _ => None,
        }
    }

    pub fn action_id(&self) -> &'static str {
        match self {
            DecisionKind::Approve => APPROVE_ACTION_ID,
            DecisionKind::Deny => DENY_ACTION_ID,
        }
    }

    /// "approved" / "denied"
    pub fn past_tense(&self) -> &'static str {
        match self {
            DecisionKind::Approve => "approved",
            DecisionKind::Deny => "denied",
        }
    }

    /// "approval" / "denial", used in error messages.
    pub fn noun(&self) -> &'static str {
        match self {
            DecisionKind::Approve => "approval",
            DecisionKind::Deny => "denial",
        }
    }
}

/// Errors from decoding a button's correlation token.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("interaction carries no correlation token")]
    Missing,

    #[error("malformed correlation token: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("correlation token has an empty session_id")]
    EmptySessionId,

    #[error("session_id {0:?} is not a plain file name")]
    UnsafeSessionId(String),
}

/// The payload attached to each Approve/Deny button.
///
/// Created by the requester (the hook), consumed once by the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorrelationToken {
    /// Unique per pending request; names the decision file
    pub session_id: String,
    /// The tool awaiting approval (e.g., "Write", "Bash")
    pub tool_name: String,
    /// File the tool targets, or "N/A"
    pub file_path: String,
}

impl CorrelationToken {
    /// Decode a serialized token and validate it.
    ///
    /// The session id ends up as a file name in the shared approval
    /// directory, so anything that could escape that directory is rejected.
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let token: CorrelationToken = serde_json::from_str(raw)?;
        validate_session_id(&token.session_id)?;
        Ok(token)
    }

    /// Serialize the token for a button `value`.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Check that a session id is usable as a single file name.
pub fn validate_session_id(session_id: &str) -> Result<(), DecodeError> {
    if session_id.is_empty() {
        return Err(DecodeError::EmptySessionId);
    }
    if !is_plain_file_name(session_id) {
        return Err(DecodeError::UnsafeSessionId(session_id.to_string()));
    }
    Ok(())
}

/// True if `name` is one path component with no traversal.
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}

/// The persisted outcome of a request.
/// One JSON file per session; the hook polls for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionRecord {
    pub decision: DecisionKind,
    /// Human-readable reason naming the actor
    pub reason: String,
    /// When the button was handled
    pub timestamp: DateTime<Utc>,
    /// Display name of the actor who clicked
    pub user: String,
    pub tool_name: String,
    pub file_path: String,
}

impl DecisionRecord {
    pub fn new(
        decision: DecisionKind,
        user: &str,
        token: &CorrelationToken,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            decision,
            reason: format!("User {} {}", user, decision.past_tense()),
            timestamp,
            user: user.to_string(),
            tool_name: token.tool_name.clone(),
            file_path: token.file_path.clone(),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.decision == DecisionKind::Approve
    }
}

/// One button click, as delivered by the chat platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteractionEvent {
    /// Which handler fired
    pub kind: DecisionKind,
    /// Display name of the clicking user
    pub actor: String,
    /// The button's serialized correlation token
    pub token: Option<String>,
    /// Channel of the message carrying the buttons
    pub channel_id: String,
    /// Timestamp (Slack message id) of that message
    pub message_ts: String,
}
