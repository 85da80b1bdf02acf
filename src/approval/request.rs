//! The requester side of the handoff: what the hook reads from Claude Code
//! and what it answers.
//!
//! Stdin format (from Claude Code):
//! {
//!   "session_id": "...",
//!   "hook_event_name": "PreToolUse",
//!   "tool_name": "Write",
//!   "tool_input": { "file_path": "src/main.rs", "content": "..." }
//! }

use crate::approval::types::{CorrelationToken, DecisionKind, DecisionRecord};
use serde::{Deserialize, Serialize};

const CONTENT_PREVIEW_CHARS: usize = 200;
const EDIT_PREVIEW_CHARS: usize = 100;
const DETAILS_PREVIEW_CHARS: usize = 500;

/// Input from Claude Code's hook system.
#[derive(Debug, Clone, Deserialize)]
pub struct HookInput {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub hook_event_name: Option<String>,
    #[serde(default)]
    pub tool_name: Option<String>,
    #[serde(default)]
    pub tool_input: serde_json::Value,
}

/// A pending request, ready to be posted to Slack.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    pub session_id: String,
    pub tool_name: String,
    /// Target file, or "N/A" for tools without one
    pub file_path: String,
    pub tool_input: serde_json::Value,
}

impl ApprovalRequest {
    pub fn from_hook_input(input: &HookInput) -> Self {
        let file_path = str_field(&input.tool_input, "file_path").unwrap_or("N/A");
        Self {
            session_id: input
                .session_id
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            tool_name: input
                .tool_name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            file_path: file_path.to_string(),
            tool_input: input.tool_input.clone(),
        }
    }

    /// The token that rides along on both buttons.
    pub fn token(&self) -> CorrelationToken {
        CorrelationToken {
            session_id: self.session_id.clone(),
            tool_name: self.tool_name.clone(),
            file_path: self.file_path.clone(),
        }
    }

    /// First line of the Slack message.
    pub fn headline(&self) -> String {
        format!("🚨 Approval Required: `{}`", self.tool_name)
    }

    /// Tool-specific detail shown under the headline (Slack mrkdwn).
    pub fn detail(&self) -> String {
        let input = &self.tool_input;
        match self.tool_name.as_str() {
            "Write" => {
                let content = str_field(input, "content").unwrap_or("");
                format!(
                    "*File:* `{}`\n*Content Preview:*\n```{}```",
                    self.file_path,
                    preview(content, CONTENT_PREVIEW_CHARS)
                )
            }
            "Edit" => {
                let old = str_field(input, "old_string").unwrap_or("");
                let new = str_field(input, "new_string").unwrap_or("");
                format!(
                    "*File:* `{}`\n*Replace:*\n```{}```\n*With:*\n```{}```",
                    self.file_path,
                    truncate_chars(old, EDIT_PREVIEW_CHARS),
                    truncate_chars(new, EDIT_PREVIEW_CHARS)
                )
            }
            "MultiEdit" => {
                let edits = input
                    .get("edits")
                    .and_then(|v| v.as_array())
                    .map_or(0, |a| a.len());
                format!(
                    "*File:* `{}`\n*Number of edits:* {}",
                    self.file_path, edits
                )
            }
            _ => {
                let pretty =
                    serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string());
                format!(
                    "*Details:*\n```json\n{}```",
                    truncate_chars(&pretty, DETAILS_PREVIEW_CHARS)
                )
            }
        }
    }
}

/// The hook's answer to Claude Code, printed as one JSON line on stdout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookResponse {
    /// "approve" or "block"
    pub decision: String,
    pub reason: String,
}

impl HookResponse {
    pub fn approve(reason: impl Into<String>) -> Self {
        Self {
            decision: "approve".to_string(),
            reason: reason.into(),
        }
    }

    pub fn block(reason: impl Into<String>) -> Self {
        Self {
            decision: "block".to_string(),
            reason: reason.into(),
        }
    }

    /// Translate a human's decision into the hook protocol.
    pub fn from_record(record: &DecisionRecord) -> Self {
        match record.decision {
            DecisionKind::Approve => Self::approve(record.reason.clone()),
            DecisionKind::Deny => Self::block(record.reason.clone()),
        }
    }

    pub fn is_approved(&self) -> bool {
        self.decision == "approve"
    }
}

/// A tool call that is only announced in Slack, never held for approval.
#[derive(Debug, Clone)]
pub struct ToolNotification {
    pub session_id: String,
    pub tool_name: String,
    pub tool_input: serde_json::Value,
}

impl ToolNotification {
    pub fn from_hook_input(input: &HookInput) -> Self {
        Self {
            session_id: input
                .session_id
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            tool_name: input
                .tool_name
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
            tool_input: input.tool_input.clone(),
        }
    }

    /// "🔔 Claude ran: `Bash`" for shell commands, "🔔 Claude used: `Grep`" otherwise.
    pub fn headline(&self) -> String {
        match self.tool_name.as_str() {
            "Bash" => format!("🔔 Claude ran: `{}`", self.tool_name),
            _ => format!("🔔 Claude used: `{}`", self.tool_name),
        }
    }

    pub fn detail(&self) -> String {
        let input = &self.tool_input;
        match self.tool_name.as_str() {
            "Bash" => format!(
                "*Command:*\n```{}```\n*Description:* {}",
                str_field(input, "command").unwrap_or("N/A"),
                str_field(input, "description").unwrap_or("No description")
            ),
            _ => {
                let pretty =
                    serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string());
                format!("*Details:*\n```json\n{}```", pretty)
            }
        }
    }

    /// Short session tag for the message footer: "Session: `abcd1234...`"
    pub fn session_label(&self) -> String {
        let short: String = self.session_id.chars().take(8).collect();
        format!("Session: `{}...`", short)
    }
}

/// Answer of the notify-only hook. Claude Code always carries on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContinueResponse {
    #[serde(rename = "continue")]
    pub proceed: bool,
}

impl ContinueResponse {
    pub fn proceed() -> Self {
        Self { proceed: true }
    }
}

fn str_field<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

/// Cut to `max` characters, appending "..." when something was dropped.
fn preview(s: &str, max: usize) -> String {
    let mut out = truncate_chars(s, max);
    if s.chars().count() > max {
        out.push_str("...");
    }
    out
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
