use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use castle_rescue::constants::{AGENTS, DEFAULT_SEED, HEIGHT, WIDTH};
use castle_rescue::model::ModelConfig;
use castle_rescue::sandbox::sandbox_factory;
use castle_rescue::server::create_router;
use castle_rescue::session::SessionController;

#[derive(Debug, Parser)]
#[command(
    name = "castle-server",
    about = "Serve one live Castle Rescue session to the renderer",
    version
)]
struct Args {
    /// Grid width in cells.
    #[arg(long, default_value_t = WIDTH)]
    width: usize,

    /// Grid height in cells.
    #[arg(long, default_value_t = HEIGHT)]
    height: usize,

    /// Number of agents.
    #[arg(long, default_value_t = AGENTS)]
    agents: usize,

    /// Seed of the first game; each reset uses the next seed.
    #[arg(long, default_value_t = DEFAULT_SEED)]
    seed: u64,
}

#[tokio::main]
async fn main() {
    castle_rescue::env_config::init_tracing();
    let args = Args::parse();
    let port = castle_rescue::env_config::server_port();

    let config = ModelConfig {
        width: args.width,
        height: args.height,
        agents: args.agents,
    };
    let session = match SessionController::new(sandbox_factory, config, args.seed) {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!(error = %e, "failed to create session");
            std::process::exit(1);
        }
    };
    let app = create_router(session);

    let listener = match tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await {
        Ok(l) => l,
        Err(e) => {
            error!(port, error = %e, "failed to bind");
            std::process::exit(1);
        }
    };
    info!(port, "server running, press Ctrl+C to stop");
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!(error = %e, "server error");
    }

    info!("stopping server");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install CTRL+C signal handler");
    }
}
