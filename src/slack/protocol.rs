//! Slack Socket Mode wire types.
//!
//! Slack pushes JSON envelopes over the websocket. Every envelope that
//! carries an `envelope_id` must be acknowledged by echoing that id back,
//! otherwise Slack treats the delivery as failed and retries it.
//!
//! Button clicks arrive as `interactive` envelopes whose payload is a
//! `block_actions` interaction.

use crate::approval::types::{DecisionKind, InteractionEvent};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One frame pushed by Slack.
#[derive(Debug, Clone, Deserialize)]
pub struct SocketEnvelope {
    /// "hello", "disconnect", "interactive", "events_api", ...
    #[serde(rename = "type")]
    pub kind: String,

    #[serde(default)]
    pub envelope_id: Option<String>,

    #[serde(default)]
    pub payload: Option<serde_json::Value>,

    /// For "disconnect": why Slack is closing the socket
    #[serde(default)]
    pub reason: Option<String>,
}

/// The frame we send back to acknowledge an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Acknowledgement {
    pub envelope_id: String,
}

impl Acknowledgement {
    pub fn new(envelope_id: impl Into<String>) -> Self {
        Self {
            envelope_id: envelope_id.into(),
        }
    }
}

/// A `block_actions` interaction payload (only the fields the relay uses).
#[derive(Debug, Clone, Deserialize)]
pub struct BlockActionsPayload {
    #[serde(rename = "type")]
    pub kind: String,

    pub user: SlackUser,

    #[serde(default)]
    pub channel: Option<ChannelRef>,

    #[serde(default)]
    pub container: Option<Container>,

    #[serde(default)]
    pub message: Option<MessageRef>,

    #[serde(default)]
    pub actions: Vec<BlockAction>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl SlackUser {
    /// The name shown in decisions: `name`, then `username`, then the id.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|n| !n.is_empty())
            .or_else(|| self.username.as_deref().filter(|n| !n.is_empty()))
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChannelRef {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Container {
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub message_ts: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageRef {
    pub ts: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BlockAction {
    pub action_id: String,
    #[serde(default)]
    pub value: Option<String>,
}

/// Errors turning an interactive payload into an event.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("malformed interaction payload: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("interaction has no originating message to update")]
    MissingMessage,
}

/// Turn an `interactive` envelope payload into an event for the listener.
///
/// Returns `Ok(None)` for interactions the relay does not handle (other
/// payload types, other buttons).
pub fn parse_interaction(
    payload: serde_json::Value,
) -> Result<Option<InteractionEvent>, PayloadError> {
    let is_block_actions = payload
        .get("type")
        .and_then(|t| t.as_str())
        .is_some_and(|t| t == "block_actions");
    if !is_block_actions {
        return Ok(None);
    }

    let payload: BlockActionsPayload = serde_json::from_value(payload)?;

    let Some(action) = payload.actions.first() else {
        return Ok(None);
    };
    let Some(kind) = DecisionKind::from_action_id(&action.action_id) else {
        return Ok(None);
    };

    let channel_id = payload
        .channel
        .as_ref()
        .map(|c| c.id.clone())
        .or_else(|| payload.container.as_ref().and_then(|c| c.channel_id.clone()))
        .ok_or(PayloadError::MissingMessage)?;
    let message_ts = payload
        .message
        .as_ref()
        .map(|m| m.ts.clone())
        .or_else(|| payload.container.as_ref().and_then(|c| c.message_ts.clone()))
        .ok_or(PayloadError::MissingMessage)?;

    Ok(Some(InteractionEvent {
        kind,
        actor: payload.user.display_name().to_string(),
        token: action.value.clone(),
        channel_id,
        message_ts,
    }))
}
