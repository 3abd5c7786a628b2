//! pagewatch - web page change monitoring.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (before anything else)
    let _ = dotenvy::dotenv();

    let default_filter = match pagewatch::cli::verbosity() {
        pagewatch::cli::Verbosity::Quiet => "pagewatch=warn",
        pagewatch::cli::Verbosity::Normal => "pagewatch=info",
        pagewatch::cli::Verbosity::Verbose => "pagewatch=debug",
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    pagewatch::cli::run().await
}
