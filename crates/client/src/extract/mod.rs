//! Visible-text extraction from rendered HTML.
//!
//! Walks the parsed DOM and keeps text nodes that a reader would see,
//! skipping non-content elements (scripts, navigation, chrome around the
//! article) and anything whose class or id marks it as an ad or banner.

use scraper::{ElementRef, Html, Node, Selector};

/// Elements whose subtree never contributes text.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "nav", "header", "footer", "aside", "iframe", "form", "svg", "template", "head",
];

/// Class or id tokens that mark boilerplate blocks. Values are split on
/// `-` and `_` before matching so `thread-list` is not an ad.
const SKIPPED_MARKERS: &[&str] = &[
    "ad", "ads", "advert", "advertisement", "banner", "cookie", "cookies", "consent", "sponsor", "sponsored", "popup",
    "newsletter",
];

/// Text pulled out of one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    pub title: Option<String>,
    /// Whitespace-collapsed visible text.
    pub text: String,
    /// True when `text` was cut at `max_chars`.
    pub truncated: bool,
}

impl ExtractedText {
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }
}

/// Extract visible text from an HTML document, keeping at most `max_chars`
/// characters.
pub fn extract_text(html: &str, max_chars: usize) -> ExtractedText {
    let document = Html::parse_document(html);

    let title = Selector::parse("title")
        .ok()
        .and_then(|sel| document.select(&sel).next())
        .map(|t| collapse_whitespace(&t.text().collect::<String>()))
        .filter(|t| !t.is_empty());

    let mut raw = String::new();
    collect_text(document.root_element(), &mut raw);

    let text = collapse_whitespace(&raw);
    let (text, truncated) = truncate_chars(text, max_chars);

    ExtractedText { title, text, truncated }
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    if is_boilerplate(&element) {
        return;
    }

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_el) = ElementRef::wrap(child) {
                    collect_text(child_el, out);
                }
            }
            _ => {}
        }
    }
}

fn is_boilerplate(element: &ElementRef<'_>) -> bool {
    let el = element.value();
    if SKIPPED_TAGS.contains(&el.name()) {
        return true;
    }

    if el.attr("hidden").is_some() || el.attr("aria-hidden") == Some("true") {
        return true;
    }

    let marked = |value: &str| {
        value
            .split(['-', '_'])
            .any(|token| SKIPPED_MARKERS.iter().any(|m| token.eq_ignore_ascii_case(m)))
    };

    el.classes().any(marked) || el.id().is_some_and(marked)
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cut to `max_chars` on a char boundary.
pub(crate) fn truncate_chars(text: String, max_chars: usize) -> (String, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => {
            let mut text = text;
            text.truncate(byte_idx);
            (text.trim_end().to_string(), true)
        }
        None => (text, false),
    }
}
