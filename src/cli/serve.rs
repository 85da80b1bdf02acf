//! `hookrelay serve` — connect to Slack and relay decisions until Ctrl-C.
//!
//! Startup is all-or-nothing: the approval directory must be creatable and
//! the first Socket Mode connection must succeed, otherwise we exit non-zero
//! and let the supervisor restart us.

use crate::config::RelayConfig;
use crate::listener::ApprovalListener;
use crate::slack::{SlackClient, SocketModeListener};
use crate::store::DecisionStore;
use anyhow::{Context, Result};
use colored::Colorize;
use std::future::Future;
use std::io;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Run the `hookrelay serve` command.
pub async fn run_serve(config: &RelayConfig) -> Result<()> {
    let store = Arc::new(DecisionStore::new(&config.approval_dir));
    store
        .ensure_dir()
        .await
        .context("Failed to prepare approval directory")?;

    let client = Arc::new(
        SlackClient::new(config.bot_token.clone())
            .context("Failed to create Slack client")?
            .with_api_url(&config.api_url),
    );
    let listener = Arc::new(ApprovalListener::new(store.clone(), client.clone()));
    let socket = SocketModeListener::new(client, config.app_token.clone(), listener);

    let stream = socket.connect().await?;

    print_banner(config);
    tracing::info!(
        approval_dir = %config.approval_dir.display(),
        channel = %config.channel,
        "Slack approval relay is running"
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(tokio::signal::ctrl_c(), shutdown.clone()));

    socket.run(stream, shutdown).await?;

    println!();
    println!("  {} Stopped.", "■".dimmed());
    println!();
    Ok(())
}

/// Cancel `shutdown` once `signal` fires. If the signal can't be listened
/// for, the relay keeps running.
async fn cancel_on_signal<F>(signal: F, shutdown: CancellationToken)
where
    F: Future<Output = io::Result<()>>,
{
    match signal.await {
        Ok(()) => {
            tracing::info!("Shutting down");
            shutdown.cancel();
        }
        Err(e) => tracing::error!("Failed to listen for Ctrl-C: {}; running without it", e),
    }
}

fn print_banner(config: &RelayConfig) {
    println!();
    println!(
        "  {}  {}",
        "hookrelay".bold(),
        "— connected to Slack".green()
    );
    println!("  {}", "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".dimmed());
    println!();
    println!("  Channel:   {}", format!("#{}", config.channel).cyan());
    println!(
        "  Decisions: {}",
        config.approval_dir.display().to_string().dimmed()
    );
    println!();
    println!("  {}", "Press Ctrl-C to stop.".dimmed());
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_signal_cancels_shutdown() {
        let shutdown = CancellationToken::new();
        cancel_on_signal(async { Ok(()) }, shutdown.clone()).await;
        assert!(shutdown.is_cancelled());
    }

    #[tokio::test]
    async fn test_signal_failure_keeps_running() {
        let shutdown = CancellationToken::new();
        cancel_on_signal(
            async { Err(io::Error::other("no signal driver")) },
            shutdown.clone(),
        )
        .await;
        assert!(!shutdown.is_cancelled());
    }
}
