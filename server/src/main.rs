use anyhow::{bail, Result};
use axum::Router;
use clap::Parser;
use recommender::ModelKind;
use server::{build_app, ServerConfig};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
struct Args {
    /// Snapshot directory holding the corpus and model blobs
    #[arg(long, default_value = "./snapshot")]
    snapshot: String,
    /// Model variant to serve: lsi, lda, artm or d2v
    #[arg(long, default_value = "lsi")]
    model: String,
    /// Rating store path
    #[arg(long, default_value = "./ratings")]
    ratings: String,
    /// Host to bind
    #[arg(long, default_value = "0.0.0.0")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 8080)]
    port: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();

    let model = match args.model.as_str() {
        "lsi" => ModelKind::Lsi,
        "lda" => ModelKind::Lda,
        "artm" => ModelKind::Artm,
        "d2v" => ModelKind::Embedding,
        other => bail!("unknown model variant {other}"),
    };
    let app: Router = build_app(ServerConfig {
        snapshot_dir: args.snapshot,
        model,
        ratings_path: args.ratings,
    })?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
