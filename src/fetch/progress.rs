use std::time::{Duration, Instant};

/// Prefix yt-dlp puts in front of every progress line we ask it for
pub const PROGRESS_PREFIX: &str = "capfetch:";

/// Value passed to `--progress-template`; fields are colon separated and the
/// filename comes last so it may contain colons itself
pub const PROGRESS_TEMPLATE: &str = "download:capfetch:%(progress.status)s:%(progress.downloaded_bytes)s:%(progress.total_bytes,progress.total_bytes_estimate)s:%(progress.speed)s:%(progress.eta)s:%(progress.filename)s";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadStatus {
    #[default]
    Starting,
    Downloading,
    Finished,
    Error,
}

impl DownloadStatus {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "starting" => Some(Self::Starting),
            "downloading" => Some(Self::Downloading),
            "finished" => Some(Self::Finished),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// One snapshot of the download program's progress
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DownloadProgress {
    pub status: DownloadStatus,
    pub percent: f64,
    pub downloaded_bytes: u64,
    pub total_bytes: Option<u64>,
    /// Bytes per second
    pub speed: Option<f64>,
    /// Seconds remaining
    pub eta: Option<u64>,
    pub filename: Option<String>,
    pub elapsed: Duration,
}

const KB: f64 = 1024.0;
const MB: f64 = KB * 1024.0;
const GB: f64 = MB * 1024.0;

fn format_bytes(bytes: u64) -> String {
    let value = bytes as f64;
    if bytes == 0 {
        "-- B".to_string()
    } else if value < KB {
        format!("{} B", bytes)
    } else if value < MB {
        format!("{:.1} KB", value / KB)
    } else if value < GB {
        format!("{:.1} MB", value / MB)
    } else {
        format!("{:.1} GB", value / GB)
    }
}

impl DownloadProgress {
    pub fn percent_str(&self) -> String {
        format!("{:.1}%", self.percent)
    }

    pub fn speed_str(&self) -> String {
        match self.speed {
            Some(speed) if speed > 0.0 => {
                if speed < KB {
                    format!("{:.0} B/s", speed)
                } else if speed < MB {
                    format!("{:.1} KB/s", speed / KB)
                } else if speed < GB {
                    format!("{:.1} MB/s", speed / MB)
                } else {
                    format!("{:.1} GB/s", speed / GB)
                }
            }
            _ => "-- B/s".to_string(),
        }
    }

    /// "downloaded / total", with "??" for an unknown total
    pub fn size_str(&self) -> String {
        let total = match self.total_bytes {
            Some(total) if total > 0 => format_bytes(total),
            _ => "??".to_string(),
        };
        format!("{} / {}", format_bytes(self.downloaded_bytes), total)
    }

    pub fn eta_str(&self) -> String {
        match self.eta {
            Some(eta) if eta > 0 => {
                let (hours, minutes, seconds) = (eta / 3600, (eta / 60) % 60, eta % 60);
                if hours > 0 {
                    format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
                } else {
                    format!("{:02}:{:02}", minutes, seconds)
                }
            }
            _ => "--:--".to_string(),
        }
    }
}

fn field<T: std::str::FromStr>(value: &str) -> Option<T> {
    match value.trim() {
        "" | "NA" | "None" => None,
        v => v.parse().ok(),
    }
}

/// Parse a line printed through `PROGRESS_TEMPLATE`.
///
/// Returns `None` for any other output of the download program.
pub fn parse_progress_line(line: &str) -> Option<DownloadProgress> {
    let rest = line.trim_end().strip_prefix(PROGRESS_PREFIX)?;
    let parts: Vec<&str> = rest.splitn(6, ':').collect();
    if parts.len() != 6 {
        return None;
    }

    let status = DownloadStatus::parse(parts[0])?;
    // Byte counts arrive as floats for some extractors
    let downloaded_bytes = field::<f64>(parts[1]).map(|b| b as u64).unwrap_or(0);
    let total_bytes = field::<f64>(parts[2]).map(|b| b as u64);
    let speed = field::<f64>(parts[3]);
    let eta = field::<f64>(parts[4]).map(|e| e as u64);
    let filename = Some(parts[5].to_string()).filter(|f| !f.is_empty() && f != "NA");

    let percent = match (status, total_bytes) {
        (DownloadStatus::Finished, _) => 100.0,
        (_, Some(total)) if total > 0 => downloaded_bytes as f64 / total as f64 * 100.0,
        _ => 0.0,
    };

    Some(DownloadProgress {
        status,
        percent,
        downloaded_bytes,
        total_bytes,
        speed,
        eta,
        filename,
        elapsed: Duration::ZERO,
    })
}

/// Turns raw progress lines into snapshots stamped with the time since the first one
#[derive(Debug, Default)]
pub struct ProgressTracker {
    started: Option<Instant>,
    current: DownloadProgress,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, line: &str) -> Option<DownloadProgress> {
        let mut progress = parse_progress_line(line)?;
        let started = *self.started.get_or_insert_with(Instant::now);
        progress.elapsed = started.elapsed();

        if progress.status == DownloadStatus::Finished && progress.total_bytes.is_none() {
            progress.total_bytes = self.current.total_bytes;
            progress.downloaded_bytes = self.current.total_bytes.unwrap_or(progress.downloaded_bytes);
        }

        self.current = progress.clone();
        Some(progress)
    }

    pub fn current(&self) -> &DownloadProgress {
        &self.current
    }
}
