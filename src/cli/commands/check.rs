//! Check command: one monitoring pass.

use std::sync::Arc;

use anyhow::Context;
use console::style;

use crate::config::{Config, Settings};
use crate::lock::RunLock;
use crate::monitor::{Monitor, RunSummary, UrlOutcome};
use crate::watchlist::WatchList;

use super::super::helpers::{build_notifier, build_summarizer};

#[derive(Debug, Clone, Copy, Default)]
pub struct CheckOptions {
    pub no_email: bool,
    pub no_summary: bool,
    pub no_lock: bool,
}

/// Run one pass over the watch-list.
pub async fn cmd_check(
    settings: &Settings,
    config: &Config,
    options: CheckOptions,
) -> anyhow::Result<()> {
    settings
        .ensure_directories()
        .context("failed to create state or snapshot directory")?;

    let _lock = if options.no_lock {
        None
    } else {
        Some(RunLock::acquire(&settings.state_file)?)
    };

    // Read the watch-list before touching state so a missing file never
    // looks like "every URL was removed"
    let watchlist = WatchList::load(&settings.urls_file).with_context(|| {
        format!(
            "cannot read watch-list {}",
            settings.urls_file.display()
        )
    })?;
    if watchlist.is_empty() {
        println!(
            "{} Watch-list {} is empty",
            style("!").yellow(),
            settings.urls_file.display()
        );
    }

    let state = settings.state_store();
    state.initialize()?;

    let fetcher = Arc::new(settings.http_client()?);
    let notifier = build_notifier(&config.smtp, options.no_email);

    let mut monitor = Monitor::new(fetcher, notifier, state, settings.snapshot_store());
    if let Some(summarizer) = build_summarizer(&config.llm, options.no_summary) {
        monitor = monitor.with_summarizer(summarizer);
    }

    let summary = monitor.run(watchlist.urls()).await?;
    print_summary(&summary);

    Ok(())
}

fn print_summary(summary: &RunSummary) {
    for url in &summary.added {
        println!("  {} {}", style("+").green(), url);
    }
    for url in &summary.removed {
        println!("  {} {}", style("-").red(), url);
    }

    for (url, outcome) in &summary.outcomes {
        let marker = match outcome {
            UrlOutcome::FirstObservation => style("new").cyan(),
            UrlOutcome::Changed => style("changed").green().bold(),
            UrlOutcome::Unchanged => style("ok").dim(),
            UrlOutcome::Failed { .. } => style("failed").red(),
        };
        match outcome {
            UrlOutcome::Failed { reason } => println!("  {:<9} {} ({})", marker, url, reason),
            _ => println!("  {:<9} {}", marker, url),
        }
    }

    let symbol = if summary.failed() > 0 {
        style("!").yellow()
    } else {
        style("✓").green()
    };
    println!("{} {}", symbol, summary);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::SmtpConfig;
    use tempfile::tempdir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_mistyped_recipient_does_not_abort_pass() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>hello</p>"))
            .mount(&server)
            .await;

        let dir = tempdir().unwrap();
        let settings = Settings::with_base_dir(dir.path());
        let url = format!("{}/page", server.uri());
        std::fs::write(&settings.urls_file, format!("{}\n", url)).unwrap();

        let config = Config {
            smtp: SmtpConfig {
                server: Some("smtp.example.test".to_string()),
                user: Some("pagewatch@example.test".to_string()),
                recipients: vec!["typo-no-at-sign".to_string()],
                ..SmtpConfig::default()
            },
            ..Config::default()
        };
        let options = CheckOptions {
            no_summary: true,
            ..CheckOptions::default()
        };

        cmd_check(&settings, &config, options).await.unwrap();

        let state = settings.state_store().load().unwrap();
        assert!(state.contains_key(&url));
        assert!(settings.snapshot_store().exists(&url));
        // lock released at the end of the pass
        RunLock::acquire(&settings.state_file).unwrap();
    }
}
