//! hookrelay-hook — Claude Code PreToolUse hook that asks Slack for approval.
//!
//! Reads the tool call JSON from stdin, posts an Approve/Deny message to the
//! channel, then waits for the relay to drop a decision file for this
//! session. Answers Claude Code with one JSON line on stdout:
//!   - Decision found: `approve` or `block` with the decider's reason, exit 0
//!   - Timeout or error: `block` with the cause, exit 2
//!   - No bot token configured: `approve`, exit 0 (Slack approval is off)
//!
//! With `--notify-only` the hook just announces the call in the channel and
//! always answers `{"continue":true}` with exit 0, whatever happens. Use it
//! for tools that are safe to run unattended.
//!
//! Logs go to stderr; stdout carries only the answer.

use anyhow::{Context, Result};
use clap::Parser;
use hookrelay::approval::{
    ApprovalRequest, ContinueResponse, HookInput, HookResponse, ToolNotification,
};
use hookrelay::config::{
    resolve_approval_dir, API_URL_ENV, APPROVAL_DIR_ENV, BOT_TOKEN_ENV, CHANNEL_ENV,
    DEFAULT_CHANNEL,
};
use hookrelay::slack::client::DEFAULT_API_URL;
use hookrelay::slack::{blocks, SlackClient};
use hookrelay::store::{DecisionReader, DecisionStore};
use secrecy::SecretString;
use std::io::Read;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "hookrelay-hook",
    version,
    about = "Claude Code PreToolUse hook that waits for a Slack decision"
)]
struct HookArgs {
    /// Bot token used to post the request; approval is skipped without one
    #[arg(long, env = BOT_TOKEN_ENV, hide_env_values = true)]
    bot_token: Option<String>,

    /// Channel to post approval requests to
    #[arg(long, env = CHANNEL_ENV, default_value = DEFAULT_CHANNEL)]
    channel: String,

    /// Directory the relay writes decisions to
    #[arg(long, env = APPROVAL_DIR_ENV)]
    approval_dir: Option<PathBuf>,

    /// Slack Web API root
    #[arg(long, env = API_URL_ENV, default_value = DEFAULT_API_URL, hide = true)]
    api_url: String,

    /// Seconds to wait for a decision
    #[arg(long, env = "HOOKRELAY_TIMEOUT_SECS", default_value_t = 60)]
    timeout_secs: u64,

    /// Milliseconds between checks for the decision file
    #[arg(long, env = "HOOKRELAY_POLL_MS", default_value_t = 1000)]
    poll_ms: u64,

    /// Only post a notification; never wait for a decision
    #[arg(long)]
    notify_only: bool,
}

/// Exit code that makes Claude Code treat the call as blocked.
const EXIT_BLOCK: i32 = 2;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: failed to install rustls crypto provider: {e:?}");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = HookArgs::parse();

    let mut input = String::new();
    let read = std::io::stdin().read_to_string(&mut input);

    if args.notify_only {
        match read {
            Ok(_) => {
                if let Err(e) = notify(&args, &input).await {
                    tracing::warn!("Slack notification failed: {:#}", e);
                }
            }
            Err(e) => tracing::warn!("Failed to read hook input: {}", e),
        }
        print_line(&ContinueResponse::proceed());
        process::exit(0);
    }

    let (response, code) = match read {
        Ok(_) => run(&args, &input).await,
        Err(e) => (
            HookResponse::block(format!("Failed to read hook input: {}", e)),
            EXIT_BLOCK,
        ),
    };

    print_line(&response);
    process::exit(code);
}

/// The configured bot token, if any. Blank counts as unset.
fn bot_token(args: &HookArgs) -> Option<&str> {
    args.bot_token
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Print the answer as one JSON line.
fn print_line<T: serde::Serialize>(response: &T) {
    match serde_json::to_string(response) {
        Ok(line) => println!("{}", line),
        Err(e) => {
            eprintln!("[hookrelay] Failed to encode hook response: {}", e);
            process::exit(EXIT_BLOCK);
        }
    }
}

/// Announce the tool call in the channel. Nothing waits on it.
async fn notify(args: &HookArgs, input: &str) -> Result<()> {
    let Some(token) = bot_token(args) else {
        return Ok(());
    };

    let hook_input: HookInput =
        serde_json::from_str(input).context("Failed to parse hook input")?;
    let notification = ToolNotification::from_hook_input(&hook_input);

    let client = SlackClient::new(SecretString::from(token.to_string()))?
        .with_api_url(args.api_url.as_str());
    client
        .post_message(&blocks::notification(&args.channel, &notification))
        .await
        .context("Failed to post notification")?;
    Ok(())
}

/// Produce the hook's answer and exit code.
async fn run(args: &HookArgs, input: &str) -> (HookResponse, i32) {
    let Some(token) = bot_token(args) else {
        return (HookResponse::approve("No Slack token configured"), 0);
    };

    match request_decision(args, token, input).await {
        Ok(Some(response)) => (response, 0),
        Ok(None) => (
            HookResponse::block(format!(
                "Timeout waiting for Slack approval ({} seconds)",
                args.timeout_secs
            )),
            EXIT_BLOCK,
        ),
        Err(e) => {
            tracing::error!("Slack approval failed: {:#}", e);
            (HookResponse::block(format!("Error: {:#}", e)), EXIT_BLOCK)
        }
    }
}

/// Post the request and wait for the relay's decision.
/// Returns None on timeout.
async fn request_decision(
    args: &HookArgs,
    token: &str,
    input: &str,
) -> Result<Option<HookResponse>> {
    let hook_input: HookInput =
        serde_json::from_str(input).context("Failed to parse hook input")?;
    let request = ApprovalRequest::from_hook_input(&hook_input);

    let dir = resolve_approval_dir(args.approval_dir.clone())?;
    let store = DecisionStore::new(&dir);
    store.ensure_dir().await?;

    // A record left over from an earlier request must not answer this one
    let reader = DecisionReader::new(&dir);
    if reader.clear(&request.session_id).await? {
        tracing::debug!(session = %request.session_id, "Removed stale decision");
    }

    let client = SlackClient::new(SecretString::from(token.to_string()))?
        .with_api_url(args.api_url.as_str());
    let message = blocks::approval_request(&args.channel, &request)
        .context("Failed to encode approval buttons")?;
    let ts = client
        .post_message(&message)
        .await
        .context("Failed to post approval request")?;
    tracing::info!(
        session = %request.session_id,
        tool = %request.tool_name,
        ts = %ts,
        "Waiting for Slack decision"
    );

    let record = reader
        .wait_for(
            &request.session_id,
            Duration::from_secs(args.timeout_secs),
            Duration::from_millis(args.poll_ms),
        )
        .await?;

    Ok(record.map(|r| HookResponse::from_record(&r)))
}
