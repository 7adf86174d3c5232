use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vmail::app::AppContext;
use vmail::cli::{commands, Cli, Commands, FeedAction};
use vmail::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vmail=info")))
        .init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(workers) = cli.workers {
        config.fetch.workers = workers;
    }
    let ctx = AppContext::new(config)?;

    match cli.command {
        Commands::Feed { action } => match action {
            FeedAction::Add { name, url } => {
                commands::add_feed(&ctx, &name, &url)?;
            }
            FeedAction::List { name } => {
                commands::list_feeds(&ctx, name.as_deref())?;
            }
            FeedAction::SetUrl { name, url } => {
                commands::set_feed_url(&ctx, &name, &url)?;
            }
        },
        Commands::Update { name } => {
            let summary = commands::update_feeds(&ctx, name.as_deref()).await?;
            if summary.all_failed() {
                anyhow::bail!("all {} feeds failed to update", summary.failed);
            }
        }
    }

    Ok(())
}
