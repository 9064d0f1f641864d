use std::path::{Path, PathBuf};

/// Tag used when the target language is not in the table
pub const FALLBACK_TAG: &str = "trans";

/// Target-language label -> filename tag
const LANGUAGE_CODES: &[(&str, &str)] = &[
    ("vietnamese", "vi"),
    ("spanish", "es"),
    ("french", "fr"),
    ("german", "de"),
    ("chinese", "zh"),
    ("japanese", "ja"),
    ("korean", "ko"),
];

/// Tags stripped from a source stem before the new tag is appended
const SOURCE_TAGS: &[&str] = &["en", "en-US"];

/// Resolve a language label such as "Vietnamese" to its filename tag
pub fn language_code(label: &str) -> &'static str {
    let lowered = label.trim().to_lowercase();
    LANGUAGE_CODES
        .iter()
        .find(|(name, _)| *name == lowered)
        .map(|(_, code)| *code)
        .unwrap_or(FALLBACK_TAG)
}

/// Every tag this tool writes, fallback included
pub fn output_tags() -> impl Iterator<Item = &'static str> {
    LANGUAGE_CODES.iter().map(|(_, code)| *code).chain(std::iter::once(FALLBACK_TAG))
}

/// Stem of a caption file with any trailing source-language tag removed
pub fn base_stem(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();

    SOURCE_TAGS
        .iter()
        .find_map(|tag| stem.strip_suffix(&format!(".{}", tag)))
        .map(str::to_string)
        .unwrap_or(stem)
}

/// Rank of a source caption file by its language tag, lowest first: `.en`
/// before `.en-US`, untagged files last
pub fn source_preference(path: &Path) -> usize {
    SOURCE_TAGS
        .iter()
        .position(|tag| has_tag(path, tag))
        .unwrap_or(SOURCE_TAGS.len())
}

/// True when the file's stem ends with `.<tag>`
pub fn has_tag(path: &Path, tag: &str) -> bool {
    path.file_stem()
        .map(|s| s.to_string_lossy().ends_with(&format!(".{}", tag)))
        .unwrap_or(false)
}

/// True when the stem already carries one of the tags this tool produces
pub fn carries_output_tag(path: &Path) -> bool {
    output_tags().any(|tag| has_tag(path, tag))
}

/// `video.en.vtt` + "Vietnamese" -> `video.vi.vtt`, in the source's directory
pub fn translated_file_name(source: &Path, target_language: &str) -> PathBuf {
    let file_name = format!("{}.{}.vtt", base_stem(source), language_code(target_language));
    match source.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}
