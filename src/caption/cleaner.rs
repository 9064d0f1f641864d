use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::config::CleanConfig;
use crate::error::Result;
use super::{is_index_line, is_timing_line, split_blocks, writer::write_atomically};

static TIMESTAMP_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<\d{2}:\d{2}:\d{2}\.\d{3}>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Which transformations the cleaner applies
#[derive(Debug, Clone)]
pub struct CleanOptions {
    pub remove_artifacts: bool,
    pub remove_markup: bool,
    /// Lower-cased boilerplate phrases
    artifact_phrases: Vec<String>,
}

impl CleanOptions {
    pub fn new(remove_artifacts: bool, remove_markup: bool, artifact_phrases: &[String]) -> Self {
        Self {
            remove_artifacts,
            remove_markup,
            artifact_phrases: artifact_phrases.iter().map(|p| p.to_lowercase()).collect(),
        }
    }

    /// Strip markup but leave boilerplate lines alone
    pub fn markup_only(&self) -> Self {
        Self {
            remove_artifacts: false,
            ..self.clone()
        }
    }

    fn is_artifact(&self, line: &str) -> bool {
        let lowered = line.to_lowercase();
        self.artifact_phrases.iter().any(|phrase| lowered.contains(phrase.as_str()))
    }
}

impl From<&CleanConfig> for CleanOptions {
    fn from(config: &CleanConfig) -> Self {
        Self::new(config.remove_artifacts, config.remove_markup, &config.artifact_phrases)
    }
}

/// Outcome of cleaning one caption block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanedBlock {
    Keep(Vec<String>),
    Drop,
}

/// Remove inline tags (including `<00:00:01.000>` timestamps) and collapse whitespace
pub fn strip_markup(text: &str) -> String {
    let text = TIMESTAMP_TAG.replace_all(text, "");
    let text = ANY_TAG.replace_all(&text, "");
    WHITESPACE_RUN.replace_all(&text, " ").trim().to_string()
}

/// Clean the lines of a single block.
///
/// Timing lines pass through untouched. A block left without any text line
/// is dropped whole, timing line included.
pub fn clean_block<S: AsRef<str>>(lines: &[S], options: &CleanOptions) -> CleanedBlock {
    let mut cleaned = Vec::with_capacity(lines.len());
    let mut text_lines_kept = 0;

    for line in lines {
        let line = line.as_ref();

        if is_timing_line(line) {
            cleaned.push(line.to_string());
            continue;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() || is_index_line(trimmed) {
            cleaned.push(trimmed.to_string());
            continue;
        }

        if options.remove_artifacts && options.is_artifact(line) {
            debug!("Dropping boilerplate line: {}", trimmed);
            continue;
        }

        let text = if options.remove_markup {
            strip_markup(line)
        } else {
            line.to_string()
        };

        if !text.trim().is_empty() {
            text_lines_kept += 1;
            cleaned.push(text);
        }
    }

    if text_lines_kept == 0 {
        return CleanedBlock::Drop;
    }

    CleanedBlock::Keep(cleaned.into_iter().filter(|line| !line.trim().is_empty()).collect())
}

/// Clean a whole caption document and return the compacted result
pub fn clean_captions(content: &str, options: &CleanOptions) -> String {
    let kept_blocks: Vec<String> = split_blocks(content)
        .iter()
        .filter_map(|block| {
            let lines: Vec<&str> = block.split('\n').collect();
            match clean_block(&lines, options) {
                CleanedBlock::Keep(lines) => Some(lines.join("\n")),
                CleanedBlock::Drop => None,
            }
        })
        .collect();

    let mut joined = kept_blocks.join("\n\n");
    if !kept_blocks.is_empty() {
        joined.push('\n');
    }

    compact_after_timing(&joined)
}

/// Remove blank lines that directly follow a timing line
fn compact_after_timing(content: &str) -> String {
    let mut result = Vec::new();
    let mut after_timing = false;

    for line in content.split('\n') {
        if after_timing && line.trim().is_empty() {
            continue;
        }
        after_timing = is_timing_line(line);
        result.push(line);
    }

    result.join("\n")
}

/// Clean a caption file in place
pub async fn clean_caption_file<P: AsRef<Path>>(path: P, options: &CleanOptions) -> Result<()> {
    let path = path.as_ref();
    let content = tokio::fs::read_to_string(path).await?;
    let cleaned = clean_captions(&content, options);
    write_atomically(path, &cleaned)?;
    debug!("Cleaned caption file: {}", path.display());
    Ok(())
}

/// Find every `*.<lang_tag>.vtt` file below `base_dir`
pub fn find_caption_files<P: AsRef<Path>>(base_dir: P, lang_tag: &str) -> Vec<std::path::PathBuf> {
    let suffix = format!(".{}.vtt", lang_tag);
    let mut files: Vec<_> = WalkDir::new(base_dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.file_name().to_string_lossy().ends_with(&suffix))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    info!("Found {} caption files tagged '{}'", files.len(), lang_tag);
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> CleanOptions {
        CleanOptions::from(&crate::config::Config::default().clean)
    }

    #[test]
    fn test_strip_markup() {
        assert_eq!(
            strip_markup("into<00:03:09.120><c> a</c> mathematical"),
            "into a mathematical"
        );
        assert_eq!(strip_markup("<i>Hello</i>   <b>world</b> "), "Hello world");
        assert_eq!(strip_markup("no tags here"), "no tags here");
        assert_eq!(strip_markup("<c></c>"), "");
    }

    #[test]
    fn test_artifact_only_block_is_dropped_whole() {
        let lines = ["00:00:01.000 --> 00:00:05.000", "Sau đây là bản dịch"];
        assert_eq!(clean_block(&lines, &options()), CleanedBlock::Drop);
    }

    #[test]
    fn test_markup_is_stripped_and_timing_preserved() {
        let lines = ["00:00:01.000 --> 00:00:05.000", "Hello <c>world</c> test"];
        assert_eq!(
            clean_block(&lines, &options()),
            CleanedBlock::Keep(vec![
                "00:00:01.000 --> 00:00:05.000".to_string(),
                "Hello world test".to_string(),
            ])
        );
    }

    #[test]
    fn test_toggles_are_independent() {
        let lines = ["00:00:01.000 --> 00:00:05.000", "Sau đây là <c>bản dịch</c>"];

        let no_artifacts = CleanOptions { remove_artifacts: false, ..options() };
        assert_eq!(
            clean_block(&lines, &no_artifacts),
            CleanedBlock::Keep(vec![
                "00:00:01.000 --> 00:00:05.000".to_string(),
                "Sau đây là bản dịch".to_string(),
            ])
        );

        let no_markup = CleanOptions { remove_markup: false, ..options() };
        assert_eq!(clean_block(&lines, &no_markup), CleanedBlock::Drop);

        let keep_raw = ["00:00:01.000 --> 00:00:05.000", "Hello <c>world</c> test"];
        match clean_block(&keep_raw, &no_markup) {
            CleanedBlock::Keep(lines) => assert_eq!(lines[1], "Hello <c>world</c> test"),
            CleanedBlock::Drop => panic!("block should be kept"),
        }
    }

    #[test]
    fn test_artifact_match_is_case_insensitive() {
        let lines = ["00:00:01.000 --> 00:00:05.000", "HERE'S THE VIETNAMESE version", "Real line"];
        assert_eq!(
            clean_block(&lines, &options()),
            CleanedBlock::Keep(vec![
                "00:00:01.000 --> 00:00:05.000".to_string(),
                "Real line".to_string(),
            ])
        );
    }

    #[test]
    fn test_custom_phrase_list() {
        let opts = CleanOptions::new(true, true, &["Voici la traduction".to_string()]);
        let lines = ["00:00:01.000 --> 00:00:05.000", "voici la traduction :"];
        assert_eq!(clean_block(&lines, &opts), CleanedBlock::Drop);
    }

    #[test]
    fn test_empty_block_dropped() {
        let lines: [&str; 2] = ["", "  "];
        assert_eq!(clean_block(&lines, &options()), CleanedBlock::Drop);
    }

    #[test]
    fn test_timing_only_block_dropped() {
        let lines = ["00:00:01.000 --> 00:00:02.000"];
        assert_eq!(clean_block(&lines, &options()), CleanedBlock::Drop);

        let numbered = ["7", "00:00:01.000 --> 00:00:02.000", ""];
        assert_eq!(clean_block(&numbered, &options()), CleanedBlock::Drop);
    }

    #[test]
    fn test_padded_index_line_is_not_text() {
        let lines = ["12 ", "00:00:01.000 --> 00:00:02.000", "<c></c>"];
        assert_eq!(clean_block(&lines, &options()), CleanedBlock::Drop);

        let lines = ["12 ", "00:00:01.000 --> 00:00:02.000", "Hi"];
        assert_eq!(
            clean_block(&lines, &options()),
            CleanedBlock::Keep(vec![
                "12".to_string(),
                "00:00:01.000 --> 00:00:02.000".to_string(),
                "Hi".to_string(),
            ])
        );
    }

    #[test]
    fn test_text_less_cue_does_not_merge_into_next() {
        let content = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\n\n00:00:02.000 --> 00:00:03.000\nHi\n";
        assert_eq!(
            clean_captions(content, &options()),
            "WEBVTT\n\n00:00:02.000 --> 00:00:03.000\nHi\n"
        );
    }

    #[test]
    fn test_clean_rendered_output_with_empty_entries() {
        use crate::caption::{parse_captions, render_captions};

        let source = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nOne\n\n\
            00:00:02.000 --> 00:00:03.000\n\n\
            00:00:03.000 --> 00:00:04.000\nThree\n";
        let entries = parse_captions(source);
        let rendered = render_captions(&entries, &["Một", "Ba"]);

        let cleaned = clean_captions(&rendered, &options());
        assert_eq!(
            cleaned,
            "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nMột\n\n00:00:03.000 --> 00:00:04.000\nBa\n"
        );

        let reparsed = parse_captions(&cleaned);
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[1].start_time, "00:00:03.000");
        assert_eq!(reparsed[1].text, "Ba");
    }

    #[test]
    fn test_clean_captions_document() {
        let content = "WEBVTT\nKind: captions\n\n\
            00:00:01.000 --> 00:00:05.000\nSau đây là bản dịch phụ đề\n\n\
            00:00:05.000 --> 00:00:10.000\nHello <c>world</c> with <i>tags</i>\n\n\
            00:00:10.000 --> 00:00:15.000\n<00:00:10.500><c>Final</c> good content\n";

        let cleaned = clean_captions(content, &options());
        assert_eq!(
            cleaned,
            "WEBVTT\nKind: captions\n\n\
             00:00:05.000 --> 00:00:10.000\nHello world with tags\n\n\
             00:00:10.000 --> 00:00:15.000\nFinal good content\n"
        );
        assert!(!cleaned.to_lowercase().contains("bản dịch"));
    }

    #[test]
    fn test_compact_after_timing() {
        assert_eq!(
            compact_after_timing("00:00:01.000 --> 00:00:02.000\n\n\nText\n\nNext"),
            "00:00:01.000 --> 00:00:02.000\nText\n\nNext"
        );
    }

    #[tokio::test]
    async fn test_clean_file_and_find_files() {
        use assert_fs::prelude::*;

        let temp = assert_fs::TempDir::new().unwrap();
        let nested = temp.child("Video_abc");
        nested.create_dir_all().unwrap();
        let vi = nested.child("clip.vi.vtt");
        vi.write_str("WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nbản dịch\n\n00:00:02.000 --> 00:00:03.000\nXin <c>chào</c>\n")
            .unwrap();
        nested.child("clip.en.vtt").write_str("WEBVTT\n").unwrap();

        let found = find_caption_files(temp.path(), "vi");
        assert_eq!(found, vec![vi.path().to_path_buf()]);

        clean_caption_file(vi.path(), &options()).await.unwrap();
        let content = std::fs::read_to_string(vi.path()).unwrap();
        assert_eq!(content, "WEBVTT\n\n00:00:02.000 --> 00:00:03.000\nXin chào\n");
    }
}
