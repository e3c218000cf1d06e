//! Word counting for mixed English and CJK notes.

use regex::Regex;
use std::sync::LazyLock;

static WORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9]+(?:['_-][A-Za-z0-9]+)*").expect("word pattern is valid")
});

static CJK_IDEOGRAPH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\x{3400}-\x{4DBF}\x{4E00}-\x{9FFF}\x{F900}-\x{FAFF}]")
        .expect("cjk pattern is valid")
});

/// Counts words: each alphanumeric chunk (allowing inner `'`, `_`, `-`) is
/// one word, and each CJK ideograph is one word.
pub fn count_mixed_words(content: &str) -> usize {
    WORD.find_iter(content).count() + CJK_IDEOGRAPH.find_iter(content).count()
}
