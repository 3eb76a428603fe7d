//! HTTP front end for the taskpilot agent.

mod routes;
mod state;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use clap::Parser;
use taskpilot::io::config::{DEFAULT_CONFIG_PATH, load_config};
use taskpilot::io::llm::ChatCompletionsClient;
use taskpilot::io::sandbox::ProcessSandbox;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::state::{AppState, SharedLlm, SharedSandbox};

#[derive(Parser)]
#[command(name = "taskpilot-server")]
#[command(about = "HTTP API for the taskpilot agent")]
struct Args {
    /// Address to bind the server to
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Port to listen on
    #[arg(long, default_value = "8000")]
    port: u16,

    /// Path to the TOML config file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Override the data root from the config file
    #[arg(long)]
    data_root: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("taskpilot_server=info".parse()?)
                .add_directive("taskpilot=info".parse()?),
        )
        .init();

    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(root) = args.data_root {
        config.data_root = root;
    }
    info!(data_root = %config.data_root.display(), model = %config.llm.model, "starting taskpilot-server");

    // The blocking HTTP client must be built and dropped outside the async runtime.
    let llm: SharedLlm =
        Arc::new(ChatCompletionsClient::from_config(&config.llm).context("build llm client")?);
    let sandbox: SharedSandbox = Arc::new(ProcessSandbox::from_config(
        &config.generation,
        &config.data_root,
    ));
    let state = AppState::new(config, Arc::clone(&llm), sandbox)?;

    let addr: SocketAddr = format!("{}:{}", args.bind, args.port).parse()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("build tokio runtime")?;
    runtime.block_on(serve(addr, state))?;
    drop(runtime);
    drop(llm);

    Ok(())
}

async fn serve(addr: SocketAddr, state: AppState) -> anyhow::Result<()> {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::router())
        .layer(cors)
        .with_state(state);

    info!(addr = %addr, "listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
