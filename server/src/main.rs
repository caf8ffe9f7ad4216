//! dropbin: serve one directory over HTTP for listing, upload, download and delete

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod config;
mod storage;

use config::Config;

#[derive(Parser)]
#[command(name = "dropbin")]
#[command(about = "Single-directory HTTP file manager", long_about = None)]
struct Cli {
    /// Directory to serve (created if missing)
    directory: PathBuf,
    /// TCP port to listen on
    #[arg(value_parser = clap::value_parser!(u16).range(1..))]
    port: u16,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dropbin=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    dotenvy::dotenv().ok();
    let config = Config::from_args(&cli.directory, cli.port)?;

    run_server(config).await
}

async fn run_server(config: Config) -> anyhow::Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!(
        "serving {} on http://127.0.0.1:{}",
        config.root.path().display(),
        config.port
    );

    let state = api::AppState::new(config);
    if let Err(e) = api::rest::serve(addr, state).await {
        tracing::error!("server exited with error: {:#}", e);
        return Err(e);
    }

    tracing::info!("server exited");
    Ok(())
}
