//! Socket Mode transport: the relay's connection to Slack.
//!
//! Opens a websocket via `apps.connections.open` and reads envelopes:
//! 1. Acknowledge the envelope (before anything else happens)
//! 2. Route approve/deny clicks to the listener, each in its own task
//! 3. Reconnect when Slack sends `disconnect` or the socket drops
//!
//! Runs until the shutdown token is cancelled, then waits for in-flight
//! clicks to finish so an acknowledged decision is never dropped.

use crate::approval::types::InteractionEvent;
use crate::listener::ApprovalListener;
use crate::slack::protocol::{self, Acknowledgement, SocketEnvelope};
use crate::slack::SlackClient;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use secrecy::SecretString;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

pub type SocketStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

const RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// What to do with one incoming frame.
#[derive(Debug, PartialEq)]
pub struct FramePlan {
    /// Ack frame to send first, if the envelope needs one
    pub ack: Option<String>,
    pub action: FrameAction,
}

#[derive(Debug, PartialEq)]
pub enum FrameAction {
    /// Hand the click to the listener
    Dispatch(InteractionEvent),
    /// Slack wants us to move to a new socket
    Reconnect(String),
    Hello,
    Ignore,
}

/// How a connection ended.
#[derive(Debug, PartialEq)]
enum ConnectionEnd {
    Shutdown,
    Reconnect,
}

/// Decide how to handle a text frame. Pure, so it can be tested without a socket.
pub fn plan_frame(text: &str) -> FramePlan {
    let envelope: SocketEnvelope = match serde_json::from_str(text) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("Ignoring unparseable Socket Mode frame: {}", e);
            return FramePlan {
                ack: None,
                action: FrameAction::Ignore,
            };
        }
    };

    let ack = envelope
        .envelope_id
        .as_deref()
        .and_then(|id| serde_json::to_string(&Acknowledgement::new(id)).ok());

    let action = match envelope.kind.as_str() {
        "hello" => FrameAction::Hello,
        "disconnect" => FrameAction::Reconnect(
            envelope
                .reason
                .unwrap_or_else(|| "unspecified".to_string()),
        ),
        "interactive" => match envelope.payload.map(protocol::parse_interaction) {
            Some(Ok(Some(event))) => FrameAction::Dispatch(event),
            Some(Ok(None)) | None => FrameAction::Ignore,
            Some(Err(e)) => {
                tracing::warn!("Dropping interaction: {}", e);
                FrameAction::Ignore
            }
        },
        other => {
            tracing::debug!("Ignoring {} envelope", other);
            FrameAction::Ignore
        }
    };

    FramePlan { ack, action }
}

/// Listens for interactions over Slack Socket Mode.
pub struct SocketModeListener {
    client: Arc<SlackClient>,
    app_token: SecretString,
    listener: Arc<ApprovalListener>,
    reconnect_delay: Duration,
    handlers: TaskTracker,
}

impl SocketModeListener {
    pub fn new(
        client: Arc<SlackClient>,
        app_token: SecretString,
        listener: Arc<ApprovalListener>,
    ) -> Self {
        Self {
            client,
            app_token,
            listener,
            reconnect_delay: RECONNECT_DELAY,
            handlers: TaskTracker::new(),
        }
    }

    /// Override the pause before reconnecting (tests).
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Open a fresh Socket Mode connection.
    pub async fn connect(&self) -> Result<SocketStream> {
        let url = self
            .client
            .open_socket_url(&self.app_token)
            .await
            .context("Failed to open Socket Mode connection")?;

        let (stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .context("Failed to connect Socket Mode websocket")?;

        tracing::debug!("Socket Mode websocket connected");
        Ok(stream)
    }

    /// Serve on an established connection, reconnecting as needed,
    /// until `shutdown` is cancelled. Returns once every dispatched click
    /// has been handled.
    pub async fn run(&self, first: SocketStream, shutdown: CancellationToken) -> Result<()> {
        self.serve(first, &shutdown).await;

        self.handlers.close();
        if !self.handlers.is_empty() {
            tracing::info!("Waiting for {} in-flight decision(s)", self.handlers.len());
        }
        self.handlers.wait().await;
        Ok(())
    }

    async fn serve(&self, first: SocketStream, shutdown: &CancellationToken) {
        let mut stream = first;
        loop {
            if self.pump(stream, shutdown).await == ConnectionEnd::Shutdown {
                return;
            }

            stream = loop {
                tokio::select! {
                    _ = shutdown.cancelled() => return,
                    _ = tokio::time::sleep(self.reconnect_delay) => {}
                }
                match self.connect().await {
                    Ok(stream) => {
                        tracing::info!("Reconnected to Slack");
                        break stream;
                    }
                    Err(e) => tracing::warn!("Reconnect failed: {:#}", e),
                }
            };
        }
    }

    /// Read frames from one connection until it ends.
    async fn pump(&self, stream: SocketStream, shutdown: &CancellationToken) -> ConnectionEnd {
        let (mut write, mut read) = stream.split();

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    if let Err(e) = write.send(Message::Close(None)).await {
                        tracing::debug!("Close frame not sent: {}", e);
                    }
                    return ConnectionEnd::Shutdown;
                }
                frame = read.next() => {
                    let Some(frame) = frame else {
                        tracing::warn!("Socket Mode connection closed; reconnecting");
                        return ConnectionEnd::Reconnect;
                    };
                    let frame = match frame {
                        Ok(frame) => frame,
                        Err(e) => {
                            tracing::warn!("Socket Mode read error: {}; reconnecting", e);
                            return ConnectionEnd::Reconnect;
                        }
                    };

                    match frame {
                        Message::Text(text) => {
                            let plan = plan_frame(text.as_str());
                            if let Some(ack) = plan.ack {
                                if let Err(e) = write.send(Message::Text(ack.into())).await {
                                    tracing::warn!("Failed to acknowledge envelope: {}; reconnecting", e);
                                    return ConnectionEnd::Reconnect;
                                }
                            }
                            match plan.action {
                                FrameAction::Dispatch(event) => self.dispatch(event),
                                FrameAction::Reconnect(reason) => {
                                    tracing::info!("Slack requested reconnect ({})", reason);
                                    return ConnectionEnd::Reconnect;
                                }
                                FrameAction::Hello => tracing::debug!("Socket Mode hello"),
                                FrameAction::Ignore => {}
                            }
                        }
                        Message::Close(_) => {
                            tracing::info!("Slack closed the socket; reconnecting");
                            return ConnectionEnd::Reconnect;
                        }
                        // Pings are answered by tungstenite on the next read
                        _ => {}
                    }
                }
            }
        }
    }

    /// Handle a click on its own task so slow I/O never blocks the socket.
    fn dispatch(&self, event: InteractionEvent) {
        let listener = self.listener.clone();
        self.handlers.spawn(async move {
            listener.handle(event).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approval::types::DecisionKind;
    use serde_json::json;

    #[test]
    fn test_interactive_is_acked_and_dispatched() {
        let frame = json!({
            "envelope_id": "env-42",
            "type": "interactive",
            "accepts_response_payload": false,
            "payload": {
                "type": "block_actions",
                "user": {"id": "U1", "name": "alice"},
                "channel": {"id": "C1"},
                "message": {"ts": "1.2"},
                "actions": [{"action_id": "approve_command", "value": "{}"}]
            }
        })
        .to_string();

        let plan = plan_frame(&frame);
        assert_eq!(plan.ack.as_deref(), Some(r#"{"envelope_id":"env-42"}"#));
        match plan.action {
            FrameAction::Dispatch(event) => {
                assert_eq!(event.kind, DecisionKind::Approve);
                assert_eq!(event.actor, "alice");
            }
            other => panic!("expected dispatch, got {:?}", other),
        }
    }

    #[test]
    fn test_unhandled_envelope_still_acked() {
        let frame = json!({
            "envelope_id": "env-7",
            "type": "events_api",
            "payload": {"event": {"type": "message"}}
        })
        .to_string();

        let plan = plan_frame(&frame);
        assert!(plan.ack.is_some());
        assert_eq!(plan.action, FrameAction::Ignore);
    }

    #[test]
    fn test_hello_and_disconnect() {
        let hello = plan_frame(r#"{"type":"hello","num_connections":1}"#);
        assert_eq!(hello.ack, None);
        assert_eq!(hello.action, FrameAction::Hello);

        let bye = plan_frame(r#"{"type":"disconnect","reason":"refresh_requested"}"#);
        assert_eq!(
            bye.action,
            FrameAction::Reconnect("refresh_requested".to_string())
        );
    }

    #[test]
    fn test_garbage_frame_ignored() {
        let plan = plan_frame("not json");
        assert_eq!(plan.ack, None);
        assert_eq!(plan.action, FrameAction::Ignore);
    }

    #[test]
    fn test_bad_interaction_still_acked() {
        let frame = json!({
            "envelope_id": "env-9",
            "type": "interactive",
            "payload": {"type": "block_actions", "user": {"id": "U1"},
                        "actions": [{"action_id": "deny_command"}]}
        })
        .to_string();
        let plan = plan_frame(&frame);
        assert!(plan.ack.is_some());
        assert_eq!(plan.action, FrameAction::Ignore);
    }
}
