//! Turns reply text and citations into display-ready pieces.
//!
//! Reply text is never interpreted as markup. `**bold**`, `*italic*` and
//! newlines become styled fragments; everything else stays literal text.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::client::Source;

pub const SOURCES_HEADING: &str = "Legal Sources:";

/// Longest preview shown under a citation, in characters.
pub const PREVIEW_LIMIT: usize = 200;

static BOLD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*\*(.*?)\*\*").expect("valid bold pattern"));
static ITALIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*(.*?)\*").expect("valid italic pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    Text { text: String, bold: bool, italic: bool },
    LineBreak,
}

impl Fragment {
    #[cfg(test)]
    fn plain(text: &str) -> Self {
        Fragment::Text { text: text.to_string(), bold: false, italic: false }
    }
}

/// Splits `text` into styled fragments: bold first, then italic over the
/// line with the bold markers removed, then line breaks.
pub fn format_text(text: &str) -> Vec<Fragment> {
    let mut fragments = Vec::new();

    for (i, line) in text.split('\n').enumerate() {
        if i > 0 {
            fragments.push(Fragment::LineBreak);
        }
        push_line(&mut fragments, line);
    }

    fragments
}

fn push_line(fragments: &mut Vec<Fragment>, line: &str) {
    // Per-byte flags over `stripped`, the line without its bold markers.
    let mut stripped = String::with_capacity(line.len());
    let mut bold = Vec::with_capacity(line.len());

    let mut last = 0;
    for caps in BOLD.captures_iter(line) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        append(&mut stripped, &mut bold, &line[last..whole.start()], false);
        append(&mut stripped, &mut bold, inner.as_str(), true);
        last = whole.end();
    }
    append(&mut stripped, &mut bold, &line[last..], false);

    let mut italic = vec![false; stripped.len()];
    let mut marker = vec![false; stripped.len()];
    for caps in ITALIC.captures_iter(&stripped) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        marker[whole.start()] = true;
        marker[whole.end() - 1] = true;
        italic[inner.range()].fill(true);
    }

    let mut run = String::new();
    let mut style = (false, false);
    for (i, ch) in stripped.char_indices() {
        if marker[i] {
            continue;
        }
        let next = (bold[i], italic[i]);
        if next != style {
            push_text(fragments, &std::mem::take(&mut run), style.0, style.1);
            style = next;
        }
        run.push(ch);
    }
    push_text(fragments, &run, style.0, style.1);
}

fn append(stripped: &mut String, bold: &mut Vec<bool>, text: &str, is_bold: bool) {
    stripped.push_str(text);
    bold.resize(stripped.len(), is_bold);
}

fn push_text(fragments: &mut Vec<Fragment>, text: &str, bold: bool, italic: bool) {
    if !text.is_empty() {
        fragments.push(Fragment::Text {
            text: text.to_string(),
            bold,
            italic,
        });
    }
}

/// One line of the citation list under a reply.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceView {
    pub link_text: String,
    pub href: String,
    /// Relevance and page range, shown after the link.
    pub annotation: String,
    pub preview: Option<String>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl SourceView {
    /// `index` is the zero-based position of the source in the reply.
    pub fn new(index: usize, source: &Source) -> Self {
        let link_text = non_empty(&source.title)
            .or_else(|| non_empty(&source.uri))
            .map(str::to_string)
            .unwrap_or_else(|| format!("Source {}", index + 1));

        let mut href = non_empty(&source.uri).unwrap_or("#").to_string();
        if let Some(page) = source.page_number {
            href.push_str(&format!("#page={}", page));
        }

        let mut annotation = String::new();
        if let Some(score) = source.score {
            annotation.push_str(&format!(" (Relevance: {:.2})", score));
        }
        if let Some(range) = non_empty(&source.page_range) {
            annotation.push_str(&format!(" - Page {}", range));
        }

        SourceView {
            link_text,
            href,
            annotation,
            preview: non_empty(&source.text).map(truncate_preview),
        }
    }
}

pub fn source_views(sources: &[Source]) -> Vec<SourceView> {
    sources
        .iter()
        .enumerate()
        .map(|(i, s)| SourceView::new(i, s))
        .collect()
}

pub fn truncate_preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}
