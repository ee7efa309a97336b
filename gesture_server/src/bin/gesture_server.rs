//! Gesture server binary.
//!
use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::Result;
use clap::Parser;
use env_logger::{Env, TimestampPrecision};
use gesture_server::{endpoints::app, holder::ModelHolder, DEFAULT_MODEL_PATH};

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// Address to serve the HTTP API on
    #[clap(long, default_value = "0.0.0.0:5000")]
    server_address: String,

    /// Model to load at startup
    #[clap(long, default_value = DEFAULT_MODEL_PATH)]
    model_path: PathBuf,

    /// Start without a model, waiting for `POST /model/load`
    #[clap(long)]
    no_startup_load: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Setup logger
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let holder = Arc::new(ModelHolder::default());

    if !args.no_startup_load {
        let holder = holder.clone();
        let model_path = args.model_path.clone();
        // Serving without a model is fine, `/model/load` can still provide one.
        if !tokio::task::spawn_blocking(move || holder.load(model_path)).await? {
            log::warn!("Starting without a model");
        }
    }

    // Serve HTTP server
    let addr: SocketAddr = args.server_address.parse()?;
    log::info!("Serving on {}", addr);
    axum::Server::bind(&addr)
        .serve(app(holder).into_make_service())
        .await?;

    Ok(())
}
