// Fetch orchestration around the external download program (yt-dlp)
//
// - commands: invocation builder and child process plumbing
// - progress: parsing of the progress lines we ask yt-dlp to print

pub mod commands;
pub mod progress;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub use commands::{YtDlpCommand, YtDlpCommandBuilder};
pub use progress::{DownloadProgress, DownloadStatus, ProgressTracker};
use crate::config::FetchConfig;
use crate::error::{CapfetchError, Result};
use crate::progress::{ProgressEvent, ProgressReporter};
use crate::session::Session;

/// Extensions treated as an already downloaded video
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "webm", "avi", "mov", "flv", "m4v"];

static UNSAFE_FILENAME_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[<>:"/\\|?*]"#).unwrap());

/// Replace characters that are not allowed in file names with `_`
pub fn sanitize_filename(name: &str) -> String {
    UNSAFE_FILENAME_CHARS.replace_all(name, "_").into_owned()
}

/// Metadata the download program reports for a video
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct VideoInfo {
    #[serde(default = "unknown_id")]
    pub id: String,
    #[serde(default = "unknown_title")]
    pub title: String,
    #[serde(default)]
    pub uploader: Option<String>,
    /// Seconds
    #[serde(default)]
    pub duration: Option<f64>,
}

fn unknown_id() -> String {
    "unknown".to_string()
}

fn unknown_title() -> String {
    "Unknown".to_string()
}

impl VideoInfo {
    /// Parse `--dump-json` output; the title comes back sanitized
    pub fn from_json(output: &str) -> Result<Self> {
        let line = output
            .lines()
            .find(|l| !l.trim().is_empty())
            .ok_or_else(|| CapfetchError::Fetch("No video metadata returned".to_string()))?;

        let mut info: VideoInfo = serde_json::from_str(line)?;
        info.title = sanitize_filename(&info.title);
        Ok(info)
    }
}

/// Destination folder for a video: `<output_dir>/<title>_<id>`
pub fn video_folder(output_dir: &Path, info: &VideoInfo) -> PathBuf {
    output_dir.join(format!("{}_{}", info.title, info.id))
}

/// What an earlier fetch left behind for the same video
#[derive(Debug, Clone, PartialEq)]
pub struct ExistingVideo {
    pub folder: PathBuf,
    /// Video file names found in the folder
    pub files: Vec<String>,
}

impl ExistingVideo {
    pub fn exists(&self) -> bool {
        !self.files.is_empty()
    }
}

pub fn check_existing(output_dir: &Path, info: &VideoInfo) -> Result<ExistingVideo> {
    let folder = video_folder(output_dir, info);
    let mut files = Vec::new();

    if folder.is_dir() {
        for entry in std::fs::read_dir(&folder)? {
            let path = entry?.path();
            let is_video = path.is_file()
                && path
                    .extension()
                    .and_then(|e| e.to_str())
                    .is_some_and(|e| VIDEO_EXTENSIONS.contains(&e.to_lowercase().as_str()));
            if is_video {
                if let Some(name) = path.file_name() {
                    files.push(name.to_string_lossy().to_string());
                }
            }
        }
    }

    files.sort();
    Ok(ExistingVideo { folder, files })
}

/// Drives the download program for metadata and downloads
pub struct Fetcher {
    config: FetchConfig,
    commands: YtDlpCommandBuilder,
}

impl Fetcher {
    pub fn new(config: FetchConfig) -> Self {
        let commands = YtDlpCommandBuilder::new(&config.binary_path);
        Self { config, commands }
    }

    /// Version string of the download program, failing when it cannot be run
    pub async fn check_available(&self) -> Result<String> {
        let output = self.commands.version_check().execute().await?;
        Ok(output.trim().to_string())
    }

    pub async fn video_info(&self, url: &str) -> Result<VideoInfo> {
        let output = self.commands.video_info(url).execute().await?;
        let info = VideoInfo::from_json(&output)?;
        debug!("Video info: {} ({})", info.title, info.id);
        Ok(info)
    }

    /// Look up the video and download it with captions into its own folder
    pub async fn download(
        &self,
        url: &str,
        output_dir: &Path,
        session: &Session,
        progress: &ProgressReporter,
    ) -> Result<PathBuf> {
        session.check_cancelled()?;
        progress.status("Extracting video info");
        let info = self.video_info(url).await?;
        self.download_into(url, &video_folder(output_dir, &info), session, progress)
            .await
    }

    /// Download into a known folder, creating it first
    pub async fn download_into(
        &self,
        url: &str,
        folder: &Path,
        session: &Session,
        progress: &ProgressReporter,
    ) -> Result<PathBuf> {
        session.check_cancelled()?;
        tokio::fs::create_dir_all(folder).await?;
        info!("Downloading {} into {}", url, folder.display());
        progress.status(format!("Downloading to {}", folder.display()));

        let mut tracker = ProgressTracker::new();
        let command = self.commands.download(url, folder, &self.config);
        command
            .execute_with_lines(|line| {
                session.check_cancelled()?;
                match tracker.update(line) {
                    Some(update) => progress.report(ProgressEvent::Download(update)),
                    None => debug!("yt-dlp: {}", line),
                }
                Ok(())
            })
            .await
            .inspect_err(|e| {
                if matches!(e, CapfetchError::Cancelled) {
                    warn!("Download of {} cancelled", url);
                }
            })?;

        session.record_download(folder);
        info!("Download finished: {}", folder.display());
        Ok(folder.to_path_buf())
    }
}
