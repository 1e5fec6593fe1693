use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Folds a label for dictionary lookups: trimmed, lower-cased, diacritics
/// removed and inner whitespace collapsed to single spaces.
pub fn fold(value: &str) -> String {
    let stripped: String = value
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|ch| !is_combining_mark(*ch))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn non_empty(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
