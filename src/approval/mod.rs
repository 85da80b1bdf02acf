pub mod request;
pub mod types;

use crate::approval::types::DecisionRecord;
use crate::store::StoreError;
use async_trait::async_trait;

pub use request::{ApprovalRequest, ContinueResponse, HookInput, HookResponse, ToolNotification};
pub use types::{CorrelationToken, DecisionKind, DecodeError, InteractionEvent};

/// Trait for decision sinks.
/// The listener persists through this; the filesystem store is the real one,
/// tests substitute recorders.
#[async_trait]
pub trait DecisionSink {
    async fn put(&self, session_id: &str, record: &DecisionRecord) -> Result<(), StoreError>;
}
