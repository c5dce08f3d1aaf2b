mod config;
mod error;
mod models;
mod preview;
mod progress;
mod routes;
mod video_processor;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use config::Config;
use routes::{create_routes, AppState};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{filter::LevelFilter, layer::SubscriberExt, util::SubscriberInitExt};
use video_processor::{ClipProcessor, Ffmpeg, YtDlp};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(LevelFilter::from_level(config.log_level))
        .init();

    let processor = ClipProcessor::new(
        Arc::new(YtDlp::new(&config.yt_dlp)),
        Arc::new(Ffmpeg::new(&config.ffmpeg)),
    )
    .with_scratch_root(config.scratch_dir.clone());

    let app = create_routes(AppState::new(processor))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

    tracing::info!(
        yt_dlp = %config.yt_dlp.display(),
        ffmpeg = %config.ffmpeg.display(),
        "Listening on {}",
        config.bind
    );
    axum::Server::bind(&config.bind)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
