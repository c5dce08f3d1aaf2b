use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tracing::Level;

/// Paste a video URL, pick a range and a resolution, get a clip back.
#[derive(Parser, Debug, Clone)]
#[command(name = "yt-clipper", version, about)]
pub struct Config {
    /// Address the web form listens on
    #[arg(long, default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// yt-dlp executable used to fetch sources
    #[arg(long = "yt-dlp", default_value = "yt-dlp")]
    pub yt_dlp: PathBuf,

    /// ffmpeg executable used to cut clips
    #[arg(long, default_value = "ffmpeg")]
    pub ffmpeg: PathBuf,

    /// Directory under which per-request working directories are created
    #[arg(long)]
    pub scratch_dir: Option<PathBuf>,

    /// Log verbosity (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    pub log_level: Level,
}
