//! Image reference scanner.
//!
//! Recognizes two independent syntaxes in a text blob:
//!
//! - markdown images: `![alt](url "optional title")`
//! - HTML `<img>` tags with a quoted `src` attribute (tag name case-insensitive)
//!
//! Each syntax is scanned separately, leftmost-first and non-overlapping. A
//! [`Reference`] borrows the text it was found in and keeps the exact bytes
//! around the URL, so it can be rebuilt with a different URL and nothing else
//! changed.

use regex::{CaptureMatches, Captures, Regex};
use std::ops::Range;
use std::sync::LazyLock;

static MARKDOWN_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[(?P<alt>[^\]]*)\]\((?P<url>[^)\s]+)(?P<tail>\s+"[^"]*")?\)"#)
        .expect("markdown image pattern is valid")
});

static HTML_IMAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)(?P<prefix><img\b[^>]*\bsrc\s*=\s*["'])(?P<url>[^"']+)(?P<suffix>["'])"#)
        .expect("html image pattern is valid")
});

/// Which grammar produced a reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Markdown,
    Html,
}

impl Syntax {
    /// Scan order used by rewriting and counting.
    pub const ALL: [Syntax; 2] = [Syntax::Markdown, Syntax::Html];

    fn pattern(self) -> &'static Regex {
        match self {
            Syntax::Markdown => &MARKDOWN_IMAGE,
            Syntax::Html => &HTML_IMAGE,
        }
    }
}

/// An image reference located in a text blob.
///
/// `lead + url + trail` is exactly `text[span]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference<'t> {
    pub syntax: Syntax,
    /// Byte range of the whole reference in the scanned text.
    pub span: Range<usize>,
    /// Everything before the URL, e.g. `![alt](` or `<img alt="x" src="`.
    pub lead: &'t str,
    pub url: &'t str,
    /// Everything after the URL, e.g. ` "title")` or `"`.
    pub trail: &'t str,
}

impl Reference<'_> {
    /// Rebuilds the reference around a different URL.
    pub fn render(&self, url: &str) -> String {
        let mut out = String::with_capacity(self.lead.len() + url.len() + self.trail.len());
        out.push_str(self.lead);
        out.push_str(url);
        out.push_str(self.trail);
        out
    }
}

/// Lazy iterator over the references of one syntax.
pub struct References<'t> {
    syntax: Syntax,
    text: &'t str,
    captures: CaptureMatches<'static, 't>,
}

impl<'t> Iterator for References<'t> {
    type Item = Reference<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let caps = self.captures.next()?;
        Some(to_reference(self.syntax, self.text, &caps))
    }
}

fn to_reference<'t>(syntax: Syntax, text: &'t str, caps: &Captures<'t>) -> Reference<'t> {
    // Both patterns require `url` and always match a whole reference.
    let whole = caps.get(0).map_or(0..0, |m| m.range());
    let url = caps.name("url").map_or(whole.start..whole.start, |m| m.range());
    Reference {
        syntax,
        lead: &text[whole.start..url.start],
        url: &text[url.clone()],
        trail: &text[url.end..whole.end],
        span: whole,
    }
}

/// Scans `text` for references of one syntax, left to right.
///
/// Calling it again on the same text restarts the scan.
pub fn scan(text: &str, syntax: Syntax) -> References<'_> {
    References {
        syntax,
        text,
        captures: syntax.pattern().captures_iter(text),
    }
}

/// Scans markdown references first, then HTML references, over the same text.
pub fn scan_all(text: &str) -> impl Iterator<Item = Reference<'_>> {
    Syntax::ALL.into_iter().flat_map(move |syntax| scan(text, syntax))
}
