//! Slack message bodies: the approval request with its buttons, the
//! resolved summary that replaces it, and the error notice.

use crate::approval::request::{ApprovalRequest, ToolNotification};
use crate::approval::types::{DecisionKind, DecisionRecord};
use crate::slack::client::{MessageUpdate, PostMessage};
use chrono::Local;
use serde_json::{json, Value};
use std::fmt::Display;

/// "✅ Approved by alice" / "❌ Denied by bob"
pub fn resolved_headline(record: &DecisionRecord) -> String {
    match record.decision {
        DecisionKind::Approve => format!("✅ Approved by {}", record.user),
        DecisionKind::Deny => format!("❌ Denied by {}", record.user),
    }
}

/// The edit that puts a message into its terminal state.
pub fn resolved_update(channel: &str, ts: &str, record: &DecisionRecord) -> MessageUpdate {
    let (icon, verb) = match record.decision {
        DecisionKind::Approve => ("✅", "Approved"),
        DecisionKind::Deny => ("❌", "Denied"),
    };
    let when = record
        .timestamp
        .with_timezone(&Local)
        .format("%-m/%-d/%Y, %-I:%M:%S %p");

    MessageUpdate {
        channel: channel.to_string(),
        ts: ts.to_string(),
        text: resolved_headline(record),
        blocks: Some(vec![section(&format!(
            "{} *{} by {}*\n`{}` on `{}`\n_{}_",
            icon, verb, record.user, record.tool_name, record.file_path, when
        ))]),
    }
}

/// The edit shown when handling a click failed.
///
/// `chat.update` keeps the old blocks when none are sent, so the error goes
/// in a section that replaces the buttons.
pub fn error_update(channel: &str, ts: &str, kind: DecisionKind, error: &dyn Display) -> MessageUpdate {
    let text = format!("❌ Error processing {}: {}", kind.noun(), error);
    MessageUpdate {
        channel: channel.to_string(),
        ts: ts.to_string(),
        blocks: Some(vec![section(&text)]),
        text,
    }
}

/// The message the hook posts to ask for a decision.
pub fn approval_request(
    channel: &str,
    request: &ApprovalRequest,
) -> Result<PostMessage, serde_json::Error> {
    let value = request.token().encode()?;
    let headline = request.headline();

    Ok(PostMessage {
        channel: channel.to_string(),
        text: headline.clone(),
        blocks: Some(vec![
            section(&format!("{}\n{}", headline, request.detail())),
            json!({
                "type": "actions",
                "elements": [
                    button("✅ Approve", "primary", &value, DecisionKind::Approve),
                    button("❌ Deny", "danger", &value, DecisionKind::Deny),
                ]
            }),
        ]),
    })
}

/// A heads-up for a tool that runs without approval. No buttons.
pub fn notification(channel: &str, notification: &ToolNotification) -> PostMessage {
    let headline = notification.headline();
    PostMessage {
        channel: channel.to_string(),
        text: headline.clone(),
        blocks: Some(vec![
            section(&format!("{}\n{}", headline, notification.detail())),
            json!({
                "type": "context",
                "elements": [
                    { "type": "mrkdwn", "text": notification.session_label() }
                ]
            }),
        ]),
    }
}

fn section(mrkdwn: &str) -> Value {
    json!({
        "type": "section",
        "text": { "type": "mrkdwn", "text": mrkdwn }
    })
}

fn button(label: &str, style: &str, value: &str, kind: DecisionKind) -> Value {
    json!({
        "type": "button",
        "text": { "type": "plain_text", "text": label },
        "style": style,
        "value": value,
        "action_id": kind.action_id(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::request::HookInput;
    use crate::approval::types::CorrelationToken;
    use chrono::Utc;

    fn record(kind: DecisionKind, user: &str) -> DecisionRecord {
        let token = CorrelationToken {
            session_id: "abc123".to_string(),
            tool_name: "Bash".to_string(),
            file_path: "/etc/hosts".to_string(),
        };
        DecisionRecord::new(kind, user, &token, Utc::now())
    }

    #[test]
    fn test_resolved_update_approve() {
        let update = resolved_update("C1", "1.2", &record(DecisionKind::Approve, "alice"));
        assert_eq!(update.text, "✅ Approved by alice");
        let blocks = update.blocks.unwrap();
        let text = blocks[0]["text"]["text"].as_str().unwrap();
        assert!(text.starts_with("✅ *Approved by alice*\n`Bash` on `/etc/hosts`\n_"));
    }

    #[test]
    fn test_resolved_update_deny() {
        let update = resolved_update("C1", "1.2", &record(DecisionKind::Deny, "bob"));
        assert!(update.text.contains("Denied by bob"));
        assert!(update.text.starts_with("❌"));
    }

    #[test]
    fn test_error_update_replaces_buttons() {
        let update = error_update("C1", "1.2", DecisionKind::Deny, &"disk full");
        assert_eq!(update.text, "❌ Error processing denial: disk full");

        let json = serde_json::to_value(&update).unwrap();
        let blocks = json["blocks"].as_array().unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0]["type"], "section");
        assert_eq!(
            blocks[0]["text"]["text"],
            "❌ Error processing denial: disk full"
        );
    }

    #[test]
    fn test_notification_has_no_buttons() {
        let input: HookInput = serde_json::from_value(json!({
            "session_id": "0123456789abcdef",
            "tool_name": "Bash",
            "tool_input": {"command": "ls", "description": "List"}
        }))
        .unwrap();
        let message = notification("claude-code", &ToolNotification::from_hook_input(&input));

        assert_eq!(message.text, "🔔 Claude ran: `Bash`");
        let blocks = message.blocks.unwrap();
        assert_eq!(blocks.len(), 2);
        assert!(blocks[0]["text"]["text"]
            .as_str()
            .unwrap()
            .starts_with("🔔 Claude ran: `Bash`\n*Command:*"));
        assert_eq!(blocks[1]["type"], "context");
        assert_eq!(blocks[1]["elements"][0]["text"], "Session: `01234567...`");
    }

    #[test]
    fn test_approval_request_buttons_carry_token() {
        let input: HookInput = serde_json::from_value(json!({
            "session_id": "abc123",
            "tool_name": "Write",
            "tool_input": {"file_path": "src/main.rs", "content": "fn main() {}"}
        }))
        .unwrap();
        let request = ApprovalRequest::from_hook_input(&input);
        let message = approval_request("claude-code", &request).unwrap();

        assert_eq!(message.channel, "claude-code");
        assert_eq!(message.text, "🚨 Approval Required: `Write`");

        let blocks = message.blocks.unwrap();
        let elements = blocks[1]["elements"].as_array().unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(elements[0]["action_id"], "approve_command");
        assert_eq!(elements[0]["style"], "primary");
        assert_eq!(elements[1]["action_id"], "deny_command");
        assert_eq!(elements[1]["style"], "danger");

        let token = CorrelationToken::decode(elements[1]["value"].as_str().unwrap()).unwrap();
        assert_eq!(token.session_id, "abc123");
        assert_eq!(token.file_path, "src/main.rs");
    }
}
