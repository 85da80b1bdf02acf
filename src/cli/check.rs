//! `hookrelay check` — validate configuration without connecting.

use crate::config::{ConfigArgs, RelayConfig};
use crate::slack::SlackClient;
use anyhow::{Context, Result};
use colored::Colorize;

/// Run the `hookrelay check` command.
pub async fn run_check(args: ConfigArgs, ping: bool) -> Result<()> {
    let config = RelayConfig::resolve(args).context("Configuration is invalid")?;

    println!();
    println!("  {} Configuration is valid!", "✓".green().bold());
    println!();
    println!("  Bot token:      {}", RelayConfig::masked(&config.bot_token));
    println!("  App token:      {}", RelayConfig::masked(&config.app_token));
    println!("  Signing secret: {}", "[REDACTED]".dimmed());
    println!("  Channel:        {}", format!("#{}", config.channel).cyan());
    println!("  Approval dir:   {}", config.approval_dir.display());
    println!("  API:            {}", config.api_url.dimmed());

    if ping {
        let client = SlackClient::new(config.bot_token.clone())
            .context("Failed to create Slack client")?
            .with_api_url(&config.api_url);
        let identity = client
            .auth_test()
            .await
            .context("Slack rejected the bot token")?;

        println!();
        println!(
            "  {} Authenticated as {} in {}",
            "✓".green().bold(),
            identity
                .user
                .or(identity.user_id)
                .unwrap_or_else(|| "unknown".to_string())
                .bold(),
            identity.team.unwrap_or_else(|| "unknown".to_string()).bold()
        );
    }

    println!();
    Ok(())
}
