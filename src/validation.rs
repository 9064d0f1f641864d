use std::path::PathBuf;
use url::Url;

use crate::error::{CapfetchError, Result};

const YOUTUBE_HOSTS: &[&str] = &["www.youtube.com", "youtube.com", "youtu.be"];

/// Accept only https YouTube links
pub fn validate_video_url(input: &str) -> Result<Url> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CapfetchError::Validation("Please enter a video URL".to_string()));
    }

    let invalid = || CapfetchError::Validation("Please enter a valid YouTube URL".to_string());

    let url = Url::parse(input).map_err(|_| invalid())?;
    if url.scheme() != "https" {
        return Err(invalid());
    }
    match url.host_str() {
        Some(host) if YOUTUBE_HOSTS.contains(&host) => Ok(url),
        _ => Err(invalid()),
    }
}

/// Check the output directory is usable, creating it when missing
pub fn validate_output_directory(input: &str) -> Result<PathBuf> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CapfetchError::Validation("Please specify an output directory".to_string()));
    }

    let path = PathBuf::from(input);
    std::fs::create_dir_all(&path).map_err(|e| {
        CapfetchError::Validation(format!("Cannot create output directory: {}", e))
    })?;
    Ok(path)
}

/// Broad category of a failure message, for user-facing reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Permission,
    NotFound,
    RateLimited,
    Other,
}

impl ErrorKind {
    pub fn user_message(&self, detail: &str) -> String {
        match self {
            Self::Network => "Network error: Check your internet connection".to_string(),
            Self::Permission => "Permission error: Check folder write permissions".to_string(),
            Self::NotFound => "Video not found: Invalid URL or private video".to_string(),
            Self::RateLimited => "Rate limited: Try again in a few minutes".to_string(),
            Self::Other => format!("Error: {}", detail),
        }
    }
}

pub fn classify_error(message: &str) -> ErrorKind {
    let lowered = message.to_lowercase();

    if lowered.contains("network") || lowered.contains("connection") {
        ErrorKind::Network
    } else if lowered.contains("permission") {
        ErrorKind::Permission
    } else if lowered.contains("not found") {
        ErrorKind::NotFound
    } else if message.contains("429") || lowered.contains("too many requests") {
        ErrorKind::RateLimited
    } else {
        ErrorKind::Other
    }
}
