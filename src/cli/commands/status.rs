//! Status command for showing tracked pages.

use console::style;

use crate::config::Settings;
use crate::monitor::reconcile;
use crate::watchlist::WatchList;

use super::super::helpers::short_digest;

/// Show tracked URLs, their snapshots, and pending watch-list changes.
pub async fn cmd_status(settings: &Settings) -> anyhow::Result<()> {
    if !settings.state_file.exists() {
        println!(
            "{} Not initialized. Run 'pagewatch init' first.",
            style("!").yellow()
        );
        return Ok(());
    }

    let state = settings.state_store().load()?;
    let snapshots = settings.snapshot_store();
    let watchlist = match WatchList::load(&settings.urls_file) {
        Ok(list) => Some(list),
        Err(e) => {
            println!("{} {}", style("!").yellow(), e);
            None
        }
    };

    let separator = "─".repeat(70);
    println!();
    println!("{}", style("pagewatch status").bold());
    println!("{}", separator);
    println!("Watch-list: {}", settings.urls_file.display());
    println!("State:      {}", settings.state_file.display());
    println!("Snapshots:  {}", settings.snapshot_dir.display());
    println!();

    println!("{} ({})", style("TRACKED").cyan().bold(), state.len());
    for (url, digest) in &state {
        let snapshot = if snapshots.exists(url) {
            style("snapshot").dim()
        } else {
            style("no snapshot").red()
        };
        println!("  {}  {}  {}", short_digest(digest), snapshot, url);
    }

    if let Some(watchlist) = watchlist {
        let pending = reconcile(&state, watchlist.urls());
        if !pending.is_noop() {
            println!();
            println!("{}", style("PENDING").cyan().bold());
            for url in &pending.added {
                println!("  {} {}", style("+").green(), url);
            }
            for url in &pending.removed {
                println!("  {} {}", style("-").red(), url);
            }
        }
    }
    println!();

    Ok(())
}
