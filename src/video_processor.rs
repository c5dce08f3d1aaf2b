use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use tempfile::TempDir;
use tokio::process::Command;
use uuid::Uuid;

use crate::error::ClipError;
use crate::models::{ClipRequest, ClipResult, Quality};
use crate::progress::{ProgressAnimation, ProgressSink};

pub const MERGE_FORMAT: &str = "mp4";

/// Options handed to the downloader for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    pub format: String,
    pub output_path: PathBuf,
    pub merge_output_format: &'static str,
    pub quiet: bool,
}

impl DownloadOptions {
    pub fn new(quality: Quality, output_path: &Path) -> Self {
        Self {
            format: format_expression(quality),
            output_path: output_path.to_path_buf(),
            merge_output_format: MERGE_FORMAT,
            quiet: true,
        }
    }
}

/// Best video no taller than the ceiling plus best audio, else the best single file.
pub fn format_expression(quality: Quality) -> String {
    format!("bestvideo[height<={}]+bestaudio/best", quality.height())
}

/// A stream-copy cut of `duration_seconds` starting at `start_seconds`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipCommand {
    pub start_seconds: u32,
    pub duration_seconds: u32,
    pub input: PathBuf,
    pub output: PathBuf,
}

impl ClipCommand {
    pub fn args(&self) -> Vec<OsString> {
        vec![
            "-ss".into(),
            self.start_seconds.to_string().into(),
            "-t".into(),
            self.duration_seconds.to_string().into(),
            "-i".into(),
            self.input.clone().into_os_string(),
            "-c:v".into(),
            "copy".into(),
            "-c:a".into(),
            "copy".into(),
            self.output.clone().into_os_string(),
            "-y".into(),
        ]
    }
}

#[async_trait]
pub trait Downloader: Send + Sync {
    async fn download(&self, url: &str, options: &DownloadOptions) -> Result<()>;
}

#[async_trait]
pub trait Trimmer: Send + Sync {
    async fn trim(&self, command: &ClipCommand) -> Result<()>;
}

/// Fetches sources through the `yt-dlp` executable.
#[derive(Debug, Clone)]
pub struct YtDlp {
    pub binary: PathBuf,
}

impl YtDlp {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    pub fn args(url: &str, options: &DownloadOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-f".into(),
            options.format.clone().into(),
            "-o".into(),
            options.output_path.clone().into_os_string(),
            "--merge-output-format".into(),
            options.merge_output_format.into(),
        ];
        if options.quiet {
            args.push("--quiet".into());
            args.push("--no-warnings".into());
        }
        args.push("--no-playlist".into());
        args.push(url.into());
        args
    }
}

#[async_trait]
impl Downloader for YtDlp {
    async fn download(&self, url: &str, options: &DownloadOptions) -> Result<()> {
        let output = Command::new(&self.binary)
            .args(Self::args(url, options))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("could not run {}", self.binary.display()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.trim();
            if message.is_empty() {
                bail!("{} exited with {}", self.binary.display(), output.status);
            }
            bail!("{message}");
        }
        Ok(())
    }
}

/// Cuts clips with the `ffmpeg` executable.
#[derive(Debug, Clone)]
pub struct Ffmpeg {
    pub binary: PathBuf,
}

impl Ffmpeg {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }
}

#[async_trait]
impl Trimmer for Ffmpeg {
    async fn trim(&self, command: &ClipCommand) -> Result<()> {
        let output = Command::new(&self.binary)
            .args(command.args())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| format!("could not run {}", self.binary.display()))?;

        tracing::debug!(
            stderr = %String::from_utf8_lossy(&output.stderr),
            "ffmpeg finished"
        );
        if !output.status.success() {
            bail!("{} exited with {}", self.binary.display(), output.status);
        }
        Ok(())
    }
}

/// Per-request scratch space holding the raw download and the clip.
pub struct WorkingDirectory {
    dir: TempDir,
    raw_path: PathBuf,
    clip_path: PathBuf,
}

impl WorkingDirectory {
    pub fn create(root: Option<&Path>) -> std::io::Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("clipper-");
        let dir = match root {
            Some(root) => builder.tempdir_in(root)?,
            None => builder.tempdir()?,
        };

        let uid = Uuid::new_v4().simple().to_string();
        let uid = &uid[..8];
        let raw_path = dir.path().join(format!("video_{uid}.mp4"));
        let clip_path = dir.path().join(format!("clip_{uid}.mp4"));
        Ok(Self {
            dir,
            raw_path,
            clip_path,
        })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn raw_path(&self) -> &Path {
        &self.raw_path
    }

    pub fn clip_path(&self) -> &Path {
        &self.clip_path
    }

    /// Removes the directory and everything in it.
    pub fn close(self) -> std::io::Result<()> {
        self.dir.close()
    }
}

/// Runs one clip request end to end.
#[derive(Clone)]
pub struct ClipProcessor {
    downloader: Arc<dyn Downloader>,
    trimmer: Arc<dyn Trimmer>,
    animation: ProgressAnimation,
    scratch_root: Option<PathBuf>,
}

impl ClipProcessor {
    pub fn new(downloader: Arc<dyn Downloader>, trimmer: Arc<dyn Trimmer>) -> Self {
        Self {
            downloader,
            trimmer,
            animation: ProgressAnimation::default(),
            scratch_root: None,
        }
    }

    pub fn with_animation(mut self, animation: ProgressAnimation) -> Self {
        self.animation = animation;
        self
    }

    pub fn with_scratch_root(mut self, root: Option<PathBuf>) -> Self {
        self.scratch_root = root;
        self
    }

    pub async fn process(
        &self,
        request: &ClipRequest,
        progress: &mut dyn ProgressSink,
    ) -> Result<ClipResult, ClipError> {
        let workdir = WorkingDirectory::create(self.scratch_root.as_deref())?;
        tracing::debug!(path = %workdir.path().display(), "created working directory");

        // Dropping `workdir` on any early return removes it.
        let bytes = self.run(request, &workdir, progress).await?;

        let path = workdir.path().to_path_buf();
        if let Err(e) = workdir.close() {
            tracing::warn!(path = %path.display(), "failed to remove working directory: {e}");
        }
        Ok(ClipResult::new(bytes))
    }

    async fn run(
        &self,
        request: &ClipRequest,
        workdir: &WorkingDirectory,
        progress: &mut dyn ProgressSink,
    ) -> Result<Bytes, ClipError> {
        let options = DownloadOptions::new(request.quality, workdir.raw_path());
        tracing::info!(url = %request.source_url, format = %options.format, "downloading source");
        self.downloader
            .download(&request.source_url, &options)
            .await
            .map_err(|e| {
                tracing::error!("download failed: {e:#}");
                ClipError::Download(format!("{e:#}"))
            })?;

        self.animation.run(progress).await;

        let command = ClipCommand {
            start_seconds: request.start_seconds,
            duration_seconds: request.duration_seconds(),
            input: workdir.raw_path().to_path_buf(),
            output: workdir.clip_path().to_path_buf(),
        };
        tracing::info!(
            start = command.start_seconds,
            duration = command.duration_seconds,
            "cutting clip"
        );
        self.trimmer.trim(&command).await.map_err(|e| {
            tracing::error!("clip failed: {e:#}");
            ClipError::Clip(format!("{e:#}"))
        })?;

        self.animation.finish(progress);

        let bytes = tokio::fs::read(workdir.clip_path()).await?;
        tracing::info!(size = bytes.len(), "clip ready");
        Ok(Bytes::from(bytes))
    }
}
