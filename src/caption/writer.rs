use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::Result;
use super::{language::translated_file_name, CaptionEntry, VTT_HEADER};

/// Render entries as WebVTT, substituting `translated` texts in order.
///
/// The cursor into `translated` only advances on entries that have text, so
/// empty entries keep their (empty) original and never consume a slot. Each
/// text is written on a single line.
pub fn render_captions<S: AsRef<str>>(entries: &[CaptionEntry], translated: &[S]) -> String {
    let mut lines = vec![VTT_HEADER.to_string(), String::new()];
    let mut cursor = 0;

    for entry in entries {
        let text = if entry.has_text() && cursor < translated.len() {
            let text = single_line(translated[cursor].as_ref());
            cursor += 1;
            text
        } else {
            entry.text.clone()
        };

        lines.push(entry.timing_line());
        lines.push(text);
        lines.push(String::new());
    }

    lines.join("\n")
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Write the translated counterpart of `source_path` and return its path
pub async fn write_translated<P: AsRef<Path>, S: AsRef<str>>(
    source_path: P,
    entries: &[CaptionEntry],
    translated: &[S],
    target_language: &str,
) -> Result<PathBuf> {
    let output_path = translated_file_name(source_path.as_ref(), target_language);
    info!("Writing caption file: {}", output_path.display());

    let content = render_captions(entries, translated);
    write_atomically(&output_path, &content)?;

    info!("Caption file written successfully");
    Ok(output_path)
}

/// Replace `path` with `content` via a temp file in the same directory, so
/// readers see either the old file or the complete new one
pub(crate) fn write_atomically(path: &Path, content: &str) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(content.as_bytes())?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::caption::parse_captions;

    fn entry(index: usize, start: &str, end: &str, text: &str) -> CaptionEntry {
        CaptionEntry {
            index,
            start_time: start.to_string(),
            end_time: end.to_string(),
            text: text.to_string(),
            original_block: String::new(),
        }
    }

    #[test]
    fn test_render_uses_cursor_over_non_empty_entries() {
        let entries = vec![
            entry(1, "00:00:01.000", "00:00:02.000", "one"),
            entry(2, "00:00:02.000", "00:00:03.000", ""),
            entry(3, "00:00:03.000", "00:00:04.000", "three"),
        ];

        let rendered = render_captions(&entries, &["một", "ba"]);
        assert_eq!(
            rendered,
            "WEBVTT\n\n\
             00:00:01.000 --> 00:00:02.000\nmột\n\n\
             00:00:02.000 --> 00:00:03.000\n\n\n\
             00:00:03.000 --> 00:00:04.000\nba\n"
        );
    }

    #[test]
    fn test_multi_line_translation_stays_in_its_cue() {
        let entries = vec![
            entry(1, "00:00:01.000", "00:00:02.000", "Hello"),
            entry(2, "00:00:02.000", "00:00:03.000", "World"),
        ];

        let rendered = render_captions(&entries, &["Xin\n\nchào ", "Thế\r\ngiới"]);
        assert_eq!(
            rendered,
            "WEBVTT\n\n\
             00:00:01.000 --> 00:00:02.000\nXin chào\n\n\
             00:00:02.000 --> 00:00:03.000\nThế giới\n"
        );

        let reparsed = parse_captions(&rendered);
        assert_eq!(reparsed.len(), 2);
        assert_eq!(reparsed[0].text, "Xin chào");
    }

    #[test]
    fn test_render_falls_back_when_translations_run_out() {
        let entries = vec![
            entry(1, "00:00:01.000", "00:00:02.000", "one"),
            entry(2, "00:00:02.000", "00:00:03.000", "two"),
        ];
        let rendered = render_captions(&entries, &["uno"]);
        assert!(rendered.contains("uno\n"));
        assert!(rendered.contains("two\n"));
    }

    #[test]
    fn test_parse_then_write_is_stable() {
        let source = "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nHello\nworld\n\n00:00:02.500 --> 00:00:04.000\nAgain\n";
        let entries = parse_captions(source);
        let originals: Vec<String> = entries.iter().map(|e| e.text.clone()).collect();

        let first = render_captions(&entries, &originals);
        let reparsed = parse_captions(&first);
        let second = render_captions(&reparsed, &originals);

        assert_eq!(first, second);
        assert_eq!(
            reparsed.iter().map(|e| (&e.start_time, &e.end_time, &e.text)).collect::<Vec<_>>(),
            entries.iter().map(|e| (&e.start_time, &e.end_time, &e.text)).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn test_write_translated_derives_name_and_replaces_file() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("video.en.vtt");
        let target = dir.path().join("video.vi.vtt");
        std::fs::write(&target, "stale").unwrap();

        let entries = vec![entry(1, "00:00:01.000", "00:00:02.000", "hi")];
        let written = write_translated(&source, &entries, &["xin chào"], "Vietnamese")
            .await
            .unwrap();

        assert_eq!(written, target);
        assert_eq!(
            std::fs::read_to_string(&target).unwrap(),
            "WEBVTT\n\n00:00:01.000 --> 00:00:02.000\nxin chào\n"
        );
    }

    #[test]
    fn test_write_atomically_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope").join("out.vtt");
        assert!(write_atomically(&path, "x").is_err());
        assert!(!path.exists());
    }
}
