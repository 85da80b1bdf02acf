//! Approval listener: turns one button click into a decision file and
//! a resolved Slack message.
//!
//! Each click is handled as two steps:
//! 1. Primary: decode the token, persist the record, edit the message.
//! 2. If any part of step 1 fails: one edit showing the error. If that edit
//!    fails too, it is logged and dropped.
//!
//! Nothing escapes a handler. One broken click never affects another.

use crate::approval::types::{CorrelationToken, DecisionRecord, DecodeError, InteractionEvent};
use crate::approval::DecisionSink;
use crate::slack::{blocks, MessageUpdater, SlackError};
use crate::store::StoreError;
use chrono::Utc;
use std::sync::Arc;
use thiserror::Error;

/// Why handling a click failed.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("failed to update message: {0}")]
    Update(#[from] SlackError),
}

/// What happened to one click.
#[derive(Debug)]
pub enum HandlerOutcome {
    /// Decision persisted and message resolved
    Resolved(DecisionRecord),
    /// The primary step failed; `notified` says whether the error edit landed
    Failed { error: HandlerError, notified: bool },
}

impl HandlerOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, HandlerOutcome::Resolved(_))
    }
}

/// Handles approve/deny interactions.
pub struct ApprovalListener {
    sink: Arc<dyn DecisionSink + Send + Sync>,
    updater: Arc<dyn MessageUpdater + Send + Sync>,
}

impl ApprovalListener {
    pub fn new(
        sink: Arc<dyn DecisionSink + Send + Sync>,
        updater: Arc<dyn MessageUpdater + Send + Sync>,
    ) -> Self {
        Self { sink, updater }
    }

    /// Handle one click. The transport has already acknowledged it.
    pub async fn handle(&self, event: InteractionEvent) -> HandlerOutcome {
        match self.resolve(&event).await {
            Ok(record) => {
                tracing::info!(
                    decision = %record.decision,
                    tool = %record.tool_name,
                    file = %record.file_path,
                    user = %record.user,
                    "Request {}",
                    record.decision.past_tense()
                );
                HandlerOutcome::Resolved(record)
            }
            Err(error) => {
                tracing::error!(
                    kind = %event.kind,
                    channel = %event.channel_id,
                    ts = %event.message_ts,
                    "Error handling {}: {}",
                    event.kind.noun(),
                    error
                );
                let notified = self.notify_failure(&event, &error).await;
                HandlerOutcome::Failed { error, notified }
            }
        }
    }

    async fn resolve(&self, event: &InteractionEvent) -> Result<DecisionRecord, HandlerError> {
        let raw = event.token.as_deref().ok_or(DecodeError::Missing)?;
        let token = CorrelationToken::decode(raw)?;

        let record = DecisionRecord::new(event.kind, &event.actor, &token, Utc::now());
        self.sink.put(&token.session_id, &record).await?;

        let update = blocks::resolved_update(&event.channel_id, &event.message_ts, &record);
        self.updater.update_message(&update).await?;

        Ok(record)
    }

    /// Best effort: a single error edit, never retried.
    async fn notify_failure(&self, event: &InteractionEvent, error: &HandlerError) -> bool {
        let update = blocks::error_update(&event.channel_id, &event.message_ts, event.kind, error);
        match self.updater.update_message(&update).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to update message with error: {}", e);
                false
            }
        }
    }
}
