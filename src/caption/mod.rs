// Caption pipeline
//
// Timed-caption files flow through these stages:
// - parser: raw WebVTT text -> CaptionEntry list
// - cleaner: strip markup and translation boilerplate, block by block
// - language: target-language label -> filename tag
// - writer: CaptionEntry list + texts -> WebVTT file on disk

pub mod cleaner;
pub mod language;
pub mod parser;
pub mod writer;

use once_cell::sync::Lazy;
use regex::Regex;

pub use cleaner::{clean_block, clean_caption_file, clean_captions, strip_markup, CleanOptions, CleanedBlock};
pub use language::{language_code, translated_file_name};
pub use parser::{parse_caption_file, parse_captions};
pub use writer::{render_captions, write_translated};

/// First line of every WebVTT file
pub const VTT_HEADER: &str = "WEBVTT";

/// Separates start and end time on a timing line
pub const TIMING_DELIMITER: &str = "-->";

static TIMING_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2}:\d{2}:\d{2}\.\d{3})\s+-->\s+(\d{2}:\d{2}:\d{2}\.\d{3})").unwrap()
});

static BLOCK_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\n+").unwrap());

/// A single timed caption
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionEntry {
    /// Position of the source block in the file
    pub index: usize,
    /// Start time as written in the file (HH:MM:SS.mmm)
    pub start_time: String,
    /// End time as written in the file (HH:MM:SS.mmm)
    pub end_time: String,
    /// Text lines joined with single spaces
    pub text: String,
    /// The block exactly as it appeared in the source
    pub original_block: String,
}

impl CaptionEntry {
    pub fn timing_line(&self) -> String {
        format!("{} {} {}", self.start_time, TIMING_DELIMITER, self.end_time)
    }

    pub fn has_text(&self) -> bool {
        !self.text.trim().is_empty()
    }
}

pub fn is_timing_line(line: &str) -> bool {
    line.contains(TIMING_DELIMITER)
}

/// A line holding nothing but a cue number
pub fn is_index_line(line: &str) -> bool {
    !line.is_empty() && line.chars().all(|c| c.is_ascii_digit())
}

/// Extract (start, end) from a well-formed timing line
pub fn parse_timing(line: &str) -> Option<(String, String)> {
    let captures = TIMING_REGEX.captures(line.trim())?;
    Some((captures[1].to_string(), captures[2].to_string()))
}

/// Split file content into blank-line separated blocks
pub(crate) fn split_blocks(content: &str) -> Vec<String> {
    let normalized = content.replace("\r\n", "\n");
    let trimmed = normalized.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }
    BLOCK_SEPARATOR
        .split(trimmed)
        .map(|block| block.trim().to_string())
        .collect()
}
