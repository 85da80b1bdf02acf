//! hookrelay — Slack approval relay.
//!
//! Listens for approve/deny button clicks and writes the decision where the
//! waiting hook can find it.
//!
//! Quick start:
//!   hookrelay              # connect and serve (same as `hookrelay serve`)
//!   hookrelay check        # validate configuration
//!   hookrelay decisions    # see decisions waiting to be picked up
//!
//! For more info: hookrelay --help

use clap::{Parser, Subcommand};
use colored::Colorize;
use hookrelay::cli;
use hookrelay::config::{ConfigArgs, RelayConfig};
use tracing_subscriber::EnvFilter;

/// hookrelay — approve agent tool calls from Slack.
#[derive(Parser)]
#[command(
    name = "hookrelay",
    version,
    about = "Approve or deny agent tool calls from Slack",
    long_about = "hookrelay listens for Approve/Deny button clicks over Slack Socket Mode\n\
                  and writes each decision to the approval directory, where the\n\
                  waiting hook picks it up.\n\n\
                  Quick start:\n  \
                  hookrelay              # connect and serve\n  \
                  hookrelay check        # validate configuration\n  \
                  hookrelay decisions    # see waiting decisions"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to Slack and relay decisions (the default)
    Serve,

    /// Validate configuration
    Check {
        /// Also verify the bot token with Slack
        #[arg(long)]
        ping: bool,
    },

    /// List decisions waiting in the approval directory
    Decisions {
        /// Max entries to show
        #[arg(short, long)]
        limit: Option<usize>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Warning: failed to install rustls crypto provider: {e:?}");
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("hookrelay=info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        None | Some(Commands::Serve) => match RelayConfig::resolve(cli.config) {
            Ok(config) => cli::serve::run_serve(&config).await,
            Err(e) => Err(e.into()),
        },
        Some(Commands::Check { ping }) => cli::check::run_check(cli.config, ping).await,
        Some(Commands::Decisions { limit }) => {
            cli::decisions::run_decisions(cli.config.approval_dir, limit).await
        }
    };

    if let Err(e) = result {
        eprintln!("\n  {} {}", "Error:".red().bold(), e);
        for cause in e.chain().skip(1) {
            eprintln!("    {} {}", "caused by:".dimmed(), cause);
        }
        eprintln!();
        std::process::exit(1);
    }
}
