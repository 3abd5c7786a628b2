//! Initialize command.

use console::style;

use crate::config::Settings;

/// Create the state file, snapshot directory and watch-list if missing.
pub async fn cmd_init(settings: &Settings) -> anyhow::Result<()> {
    settings.ensure_directories()?;

    if settings.state_store().initialize()? {
        println!(
            "  {} Created state file {}",
            style("✓").green(),
            settings.state_file.display()
        );
    }

    if !settings.urls_file.exists() {
        if let Some(parent) = settings.urls_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&settings.urls_file, "")?;
        println!(
            "  {} Created empty watch-list {}",
            style("✓").green(),
            settings.urls_file.display()
        );
        println!("  Add one URL per line to start monitoring");
    }

    println!(
        "{} Initialized pagewatch (snapshots in {})",
        style("✓").green(),
        settings.snapshot_dir.display()
    );

    Ok(())
}
