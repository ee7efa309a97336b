use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use common::api::PredictRequest;
use env_logger::{Env, TimestampPrecision};
use gesture_client::{encode_image_file, GestureClient};

#[derive(Parser, Debug)]
#[clap(author, version)]
struct Args {
    /// Base URL of the gesture server
    #[clap(long, default_value = "http://127.0.0.1:5000")]
    server_address: String,

    /// Image to recognize a gesture in
    #[clap(long)]
    image: PathBuf,

    /// Ask the server to load this model before predicting
    #[clap(long)]
    load_model: Option<String>,

    /// Width of the captured frame
    #[clap(long, default_value_t = common::api::DEFAULT_WIDTH)]
    width: u32,

    /// Height of the captured frame
    #[clap(long, default_value_t = common::api::DEFAULT_HEIGHT)]
    height: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp(Some(TimestampPrecision::Millis))
        .init();

    let client = GestureClient::new(&args.server_address);

    if let Some(model_path) = &args.load_model {
        let resp = client.load_model(model_path).await?;
        log::info!("{}", resp.message);
    }

    let health = client.health().await?;
    log::info!(
        "Server is {}, model loaded: {}",
        health.status,
        health.model_loaded
    );

    let request = PredictRequest {
        width: args.width,
        height: args.height,
        ..PredictRequest::new(encode_image_file(&args.image)?)
    };
    let result = client.predict(&request).await?;

    log::info!(
        "{}: gesture {:?} with confidence {:.2} (text {:?})",
        args.image.display(),
        result.gesture,
        result.confidence,
        result.text
    );

    Ok(())
}
