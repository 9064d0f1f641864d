use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, warn};

use crate::config::FetchConfig;
use crate::error::{CapfetchError, Result};
use super::progress::PROGRESS_TEMPLATE;

/// One invocation of the download program
#[derive(Debug, Clone)]
pub struct YtDlpCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl YtDlpCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Output path template
    pub fn output_template<P: AsRef<Path>>(self, folder: P) -> Self {
        let template = folder.as_ref().join("%(title)s.%(ext)s");
        self.arg("-o").arg(template.to_string_lossy().to_string())
    }

    pub fn format<S: Into<String>>(self, selector: S) -> Self {
        self.arg("-f").arg(selector)
    }

    /// Request uploaded and automatic captions in the given languages
    pub fn subtitles(self, languages: &[String], format: &str) -> Self {
        self.arg("--write-subs")
            .arg("--write-auto-subs")
            .arg("--sub-langs")
            .arg(languages.join(","))
            .arg("--sub-format")
            .arg(format)
    }

    /// One progress line per update, in our own template
    pub fn progress_lines(self) -> Self {
        self.arg("--newline")
            .arg("--progress-template")
            .arg(PROGRESS_TEMPLATE)
    }

    pub fn url<S: Into<String>>(self, url: S) -> Self {
        self.arg("--").arg(url)
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary_path);
        cmd.args(&self.args).kill_on_drop(true);
        cmd
    }

    fn spawn_error(&self, e: std::io::Error) -> CapfetchError {
        CapfetchError::Fetch(format!("Failed to execute {}: {}", self.binary_path, e))
    }

    /// Run to completion and return stdout
    pub async fn execute(&self) -> Result<String> {
        debug!("Executing: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let output = self.command().output().await.map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CapfetchError::Fetch(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Run while handing each stdout line to `on_line`.
    ///
    /// An error from `on_line` kills the child and is returned as is.
    pub async fn execute_with_lines<F>(&self, mut on_line: F) -> Result<()>
    where
        F: FnMut(&str) -> Result<()>,
    {
        debug!("Executing: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut child = self
            .command()
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CapfetchError::Fetch("Child stdout unavailable".to_string()))?;

        // Drained on its own task so a chatty stderr cannot block the child
        let stderr = child.stderr.take();
        let stderr_task = tokio::spawn(async move {
            let mut text = String::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_string(&mut text).await;
            }
            text
        });

        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if let Err(e) = on_line(&line) {
                if let Err(kill_err) = child.kill().await {
                    warn!("Failed to stop {}: {}", self.binary_path, kill_err);
                }
                return Err(e);
            }
        }

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(CapfetchError::Fetch(format!(
                "{} failed: {}",
                self.description,
                stderr.trim()
            )));
        }

        Ok(())
    }
}

/// Builder for the download program invocations we need
pub struct YtDlpCommandBuilder {
    binary_path: String,
}

impl YtDlpCommandBuilder {
    pub fn new<S: Into<String>>(binary_path: S) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Metadata only, as a single JSON document on stdout
    pub fn video_info(&self, url: &str) -> YtDlpCommand {
        YtDlpCommand::new(&self.binary_path, "Video info extraction")
            .args(["--dump-json", "--no-playlist", "--skip-download", "--no-warnings"])
            .url(url)
    }

    /// Media plus captions into `folder`
    pub fn download<P: AsRef<Path>>(&self, url: &str, folder: P, config: &FetchConfig) -> YtDlpCommand {
        YtDlpCommand::new(&self.binary_path, "Video download")
            .arg("--no-playlist")
            .output_template(folder)
            .format(&config.video_format)
            .subtitles(&config.subtitle_languages, &config.subtitle_format)
            .progress_lines()
            .url(url)
    }

    pub fn version_check(&self) -> YtDlpCommand {
        YtDlpCommand::new(&self.binary_path, "Version check").arg("--version")
    }
}
