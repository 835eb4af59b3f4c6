mod api;
mod config;
mod github;
mod line;
mod notifier;
mod policy;
mod registry;
mod scheduler;
mod tally;

use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::signal;

use github::EventSource;

#[derive(Parser)]
#[command(
    name = "kusabot",
    version,
    about = "Daily GitHub commit goal notifier for LINE"
)]
struct Cli {
    #[arg(short, long, default_value = "~/.kusabot/config.toml")]
    config: String,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the webhook server and the nightly scheduler
    Run,
    /// Create ~/.kusabot/ with a config template
    Init,
    /// Print today's commit count and exit
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Commands::Run) {
        Commands::Init => {
            config::init_config_dir().await?;
            tracing::info!("Initialized ~/.kusabot/");
        }
        Commands::Run => run(&cli.config).await?,
        Commands::Status => status(&cli.config).await?,
    }
    Ok(())
}

async fn run(config_path: &str) -> Result<()> {
    let cfg = config::load(config_path)?;
    let offset = cfg.notify.offset()?;

    let source = Arc::new(github::GitHubClient::new(&cfg.github)?);
    let sink = Arc::new(line::LineClient::new(&cfg.line)?);
    let registry = Arc::new(registry::UserRegistry::new());
    let notifier = Arc::new(notifier::Notifier::new(
        source,
        sink.clone(),
        cfg.notify.threshold,
        offset,
    ));

    let mut scheduler = scheduler::Scheduler::new(
        notifier.clone(),
        registry.clone(),
        offset,
        cfg.notify.hour,
        cfg.notify.minute,
    );
    scheduler.start();

    let state = api::AppState {
        registry,
        notifier,
        sink,
        channel_secret: cfg.line.channel_secret.clone(),
    };
    let listener = tokio::net::TcpListener::bind(&cfg.server.bind).await?;
    tracing::info!("kusabot listening on {}", cfg.server.bind);

    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(async {
            signal::ctrl_c().await.ok();
        })
        .await?;

    scheduler.stop();
    Ok(())
}

async fn status(config_path: &str) -> Result<()> {
    let cfg = config::load(config_path)?;
    let offset = cfg.notify.offset()?;

    let client = github::GitHubClient::new(&cfg.github)?;
    let events = client.fetch_events().await?;
    let count = tally::count_today(&events, chrono::Utc::now(), offset);

    println!(
        "{}: {count} commit(s) today (goal {})",
        cfg.github.username, cfg.notify.threshold
    );
    Ok(())
}
