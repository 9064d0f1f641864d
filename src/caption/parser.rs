use std::path::Path;
use tracing::debug;

use crate::error::Result;
use super::{is_index_line, is_timing_line, parse_timing, split_blocks, CaptionEntry, VTT_HEADER};

/// Read a caption file and parse it into entries
pub async fn parse_caption_file<P: AsRef<Path>>(path: P) -> Result<Vec<CaptionEntry>> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    let entries = parse_captions(&content);
    debug!("Parsed {} caption entries from {}", entries.len(), path.display());
    Ok(entries)
}

/// Parse WebVTT text into entries, silently skipping blocks without a usable timing line
pub fn parse_captions(content: &str) -> Vec<CaptionEntry> {
    split_blocks(content)
        .into_iter()
        .enumerate()
        .filter_map(|(index, block)| parse_block(index, block))
        .collect()
}

fn parse_block(index: usize, block: String) -> Option<CaptionEntry> {
    let lines: Vec<&str> = block.lines().collect();

    let first = lines.first()?;
    if first.starts_with(VTT_HEADER) || lines.iter().all(|line| line.trim().is_empty()) {
        return None;
    }

    let mut timing_line = None;
    let mut text_lines = Vec::new();

    for line in &lines {
        if is_timing_line(line) {
            timing_line = Some(*line);
        } else {
            let trimmed = line.trim();
            if !trimmed.is_empty() && !is_index_line(trimmed) {
                text_lines.push(trimmed);
            }
        }
    }

    let (start_time, end_time) = parse_timing(timing_line?)?;

    Some(CaptionEntry {
        index,
        start_time,
        end_time,
        text: text_lines.join(" "),
        original_block: block,
    })
}
