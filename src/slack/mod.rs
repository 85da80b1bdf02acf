pub mod blocks;
pub mod client;
pub mod protocol;
pub mod socket;

use async_trait::async_trait;

pub use client::{MessageUpdate, PostMessage, SlackClient, SlackError};
pub use socket::{SocketModeListener, SocketStream};

/// Trait for editing a posted message (`chat.update`).
/// Implemented by the Web API client; tests substitute recorders.
#[async_trait]
pub trait MessageUpdater {
    async fn update_message(&self, update: &MessageUpdate) -> Result<(), SlackError>;
}
