use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use anyhow::{Context, Result};
use clap::Parser;
use rs_posture_pipeline::api::{create_router, AppState};
use rs_posture_pipeline::config::{load_config, ConfigOverrides};
use rs_posture_pipeline::logging::init_logging;
use rs_posture_pipeline::modules::pose_landmark_client::PoseLandmarkClient;
use rs_posture_pipeline::pipeline::pipeline::PosturePipeline;
use rs_posture_pipeline::triton_client::client::TritonInferenceClient;

#[derive(Parser, Debug)]
#[command(name = "posture-server", about = "Posture classification server", version)]
struct Cli {
    /// Path to the TOML config file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Address to bind, overrides `server.host`
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overrides `server.port`
    #[arg(long)]
    port: Option<u16>,

    /// Triton gRPC endpoint, overrides `pose_model.endpoint`
    #[arg(long)]
    model_endpoint: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        host: cli.host,
        port: cli.port,
        model_endpoint: cli.model_endpoint,
    };
    let config = load_config(cli.config.as_deref(), &overrides).context("failed to load configuration")?;

    init_logging(&config.logging)?;
    tracing::debug!(config = ?cli.config, "configuration loaded");

    let model_config = config.pose_model.clone();
    let triton_infer_client = TritonInferenceClient::new(
        &model_config.endpoint,
        Duration::from_millis(model_config.timeout_ms),
    )?;
    let model_metadata = triton_infer_client
        .model_metadata(&model_config.model_name, &model_config.model_version)
        .await
        .with_context(|| {
            format!(
                "failed to fetch metadata of model {} from {}",
                model_config.model_name, model_config.endpoint
            )
        })?;

    let landmark_client = PoseLandmarkClient::new(triton_infer_client, model_metadata, model_config)?;
    tracing::info!(
        model = %landmark_client.model_name,
        input = ?landmark_client.input(),
        "pose landmark model loaded"
    );

    let pipeline = PosturePipeline::new(Arc::new(landmark_client));
    let state = AppState::new(pipeline, Duration::from_millis(config.server.request_timeout_ms));
    let app = create_router(state, &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "posture server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("posture server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
