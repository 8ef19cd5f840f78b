//! Rendering helpers: highlighted text and match-centred excerpts.

use regex::{Captures, Regex};

use crate::query::ParsedQuery;

/// Default number of words kept on each side of a match in an excerpt.
pub const DEFAULT_CONTEXT_WORDS: usize = 20;

/// Marker appended or prepended when an excerpt is truncated.
pub const ELLIPSIS: &str = "...";

/// How highlighted spans are delimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Marker {
    pub open: &'static str,
    pub close: &'static str,
    /// Escape HTML-significant characters before marking.
    pub escape_html: bool,
}

impl Marker {
    pub const HTML: Marker = Marker {
        open: "<mark>",
        close: "</mark>",
        escape_html: true,
    };

    /// Bold yellow, for terminals.
    pub const ANSI: Marker = Marker {
        open: "\x1b[1;33m",
        close: "\x1b[0m",
        escape_html: false,
    };
}

/// Escape `&`, `<`, `>`, `"` and `'`.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

/// HTML-escape `text` and wrap every match of `query` in `<mark>` tags.
///
/// # Examples
///
/// ```
/// use lectern::text_util::highlight;
///
/// assert_eq!(
///     highlight("The Lord is my <shepherd>", "lord"),
///     "The <mark>Lord</mark> is my &lt;shepherd&gt;"
/// );
/// ```
pub fn highlight(text: &str, query: &str) -> String {
    highlight_with(text, query, Marker::HTML)
}

/// Wrap every case-insensitive occurrence of the query's phrases, then its
/// required terms, in `marker`. Excluded terms are never marked.
///
/// Terms are applied one after another to the already-marked text, so a
/// term that overlaps an earlier match (or the marker itself) can be
/// wrapped twice.
pub fn highlight_with(text: &str, query: &str, marker: Marker) -> String {
    let mut out = if marker.escape_html {
        escape_html(text)
    } else {
        text.to_string()
    };

    let parsed = ParsedQuery::parse(query);
    for term in parsed.positive_terms() {
        let needle = if marker.escape_html {
            escape_html(term)
        } else {
            term.to_string()
        };
        let pattern = format!("(?i){}", regex::escape(&needle));
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(e) => {
                tracing::debug!("skipping highlight for {term:?}: {e}");
                continue;
            }
        };
        out = re
            .replace_all(&out, |caps: &Captures| {
                format!("{}{}{}", marker.open, &caps[0], marker.close)
            })
            .into_owned();
    }

    out
}

/// Extract a window of words around the earliest match of `query`.
///
/// Without positive terms in `query`, returns the first
/// `2 * context_words` words (plus [`ELLIPSIS`] if anything was cut), or
/// `text` unchanged when it is short enough. With terms, keeps
/// `context_words` words on each side of the word holding the earliest
/// match and marks truncated ends with [`ELLIPSIS`]. If nothing matches,
/// `text` is returned unchanged.
///
/// # Examples
///
/// ```
/// use lectern::text_util::excerpt;
///
/// let text = "one two three four five six seven eight nine ten";
/// assert_eq!(excerpt(text, "five", 2), "...three four five six seven...");
/// ```
pub fn excerpt(text: &str, query: &str, context_words: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let parsed = ParsedQuery::parse(query);

    if parsed.positive_terms().next().is_none() {
        let limit = context_words.saturating_mul(2);
        if words.len() <= limit {
            return text.to_string();
        }
        return format!("{}{ELLIPSIS}", words[..limit].join(" "));
    }

    let lower = text.to_lowercase();
    let Some(first_match) = parsed
        .positive_terms()
        .filter_map(|term| lower.find(term))
        .min()
    else {
        return text.to_string();
    };

    let center = word_index_at(&lower, first_match);
    let start = center.saturating_sub(context_words);
    let end = center
        .saturating_add(context_words)
        .saturating_add(1)
        .min(words.len());
    if start >= end {
        return text.to_string();
    }

    let mut out = String::new();
    if start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.push_str(&words[start..end].join(" "));
    if end < words.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

/// Index of the whitespace-delimited word containing byte `pos`.
///
/// A position inside a run of whitespace belongs to the preceding word.
fn word_index_at(text: &str, pos: usize) -> usize {
    let mut started = 0usize;
    let mut in_word = false;
    for (i, c) in text.char_indices() {
        if i > pos {
            break;
        }
        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            in_word = true;
            started += 1;
        }
    }
    started.saturating_sub(1)
}
