//! `hookrelay decisions` — show decisions waiting to be picked up.
//!
//! A record stays in the approval directory until the hook that asked for it
//! reads it, so anything listed here is either in flight or orphaned.

use crate::approval::types::{DecisionKind, DecisionRecord};
use crate::config::resolve_approval_dir;
use crate::store::DecisionReader;
use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use std::path::PathBuf;

/// Run the `hookrelay decisions` command.
pub async fn run_decisions(approval_dir: Option<PathBuf>, limit: Option<usize>) -> Result<()> {
    let dir = resolve_approval_dir(approval_dir)?;
    let reader = DecisionReader::new(&dir);
    let listing = reader
        .list()
        .await
        .with_context(|| format!("Failed to list decisions in {}", dir.display()))?;

    if listing.records.is_empty() && listing.unreadable.is_empty() {
        println!();
        println!("  {} No decisions waiting in {}", "ℹ".blue(), dir.display());
        println!();
        return Ok(());
    }

    println!();
    println!(
        "  {} {} waiting in {}",
        "📋".to_string().bold(),
        plural(listing.records.len(), "decision", "decisions"),
        dir.display().to_string().dimmed()
    );
    println!();

    let shown = limit.unwrap_or(listing.records.len());
    for (session_id, record) in listing.records.iter().take(shown) {
        println!("  {}", format_record(session_id, record));
    }
    if shown < listing.records.len() {
        println!(
            "  {}",
            format!("... and {} more", listing.records.len() - shown).dimmed()
        );
    }

    if !listing.unreadable.is_empty() {
        println!();
        for (path, reason) in &listing.unreadable {
            println!(
                "  {} {} ({})",
                "⚠".yellow(),
                path.display(),
                reason.dimmed()
            );
        }
    }

    println!();
    Ok(())
}

fn format_record(session_id: &str, record: &DecisionRecord) -> String {
    let decision = match record.decision {
        DecisionKind::Approve => "APPROVED".green().bold(),
        DecisionKind::Deny => "DENIED".red().bold(),
    };
    format!(
        "{} {} {} by {}  {} on {}",
        record
            .timestamp
            .with_timezone(&Local)
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed(),
        decision,
        session_id.cyan(),
        record.user.bold(),
        record.tool_name,
        record.file_path
    )
}

fn plural(n: usize, one: &str, many: &str) -> String {
    format!("{} {}", n, if n == 1 { one } else { many })
}
