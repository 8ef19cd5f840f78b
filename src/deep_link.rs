//! Query-string fragments that point at one chunk of a result view.
//!
//! Components are encoded the way browsers' `encodeURIComponent` does, so
//! links built here round-trip through ordinary URL handling.

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};

use crate::corpus::ChunkId;

/// Everything except ASCII alphanumerics and `-_.!~*'()`.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// A decoded deep link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeepLink {
    pub id: String,
    /// The search term active when the link was made, if any.
    pub query: Option<String>,
}

impl DeepLink {
    pub fn new(id: &ChunkId, query: &str) -> Self {
        let query = query.trim();
        Self {
            id: id.to_string(),
            query: (!query.is_empty()).then(|| query.to_string()),
        }
    }

    /// Render as `?id=<id>` followed by `&q=<query>` when a query is set.
    ///
    /// # Examples
    ///
    /// ```
    /// use lectern::{corpus::ChunkId, deep_link::DeepLink};
    ///
    /// let link = DeepLink::new(&ChunkId::Int(42), "\"still waters\"");
    /// assert_eq!(link.to_fragment(), "?id=42&q=%22still%20waters%22");
    /// ```
    pub fn to_fragment(&self) -> String {
        let mut out = format!("?id={}", utf8_percent_encode(&self.id, COMPONENT));
        if let Some(query) = &self.query {
            out.push_str("&q=");
            out.extend(utf8_percent_encode(query, COMPONENT));
        }
        out
    }

    /// Decode a fragment such as `?id=42&q=lord`.
    ///
    /// A leading `?` or `#` is optional, unknown parameters are ignored and
    /// `+` decodes to a space. Returns `None` when there is no `id`.
    pub fn parse(fragment: &str) -> Option<Self> {
        let fragment = fragment.trim_start_matches(['?', '#']);
        let mut id = None;
        let mut query = None;

        for pair in fragment.split('&') {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            let value = value.replace('+', " ");
            let value = percent_decode_str(&value).decode_utf8_lossy().into_owned();
            match key {
                "id" => id = Some(value),
                "q" if !value.is_empty() => query = Some(value),
                _ => {}
            }
        }

        id.filter(|id| !id.is_empty())
            .map(|id| Self { id, query })
    }
}

impl std::fmt::Display for DeepLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_fragment())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragment_without_query() {
        let link = DeepLink::new(&ChunkId::from("gen-1:1"), "   ");
        assert_eq!(link.to_fragment(), "?id=gen-1%3A1");
    }

    #[test]
    fn fragment_keeps_unreserved_marks() {
        let link = DeepLink::new(&ChunkId::Int(7), "-wolf (lamb)*");
        assert_eq!(link.to_fragment(), "?id=7&q=-wolf%20(lamb)*");
    }

    #[test]
    fn parse_restores_fragment() {
        let link = DeepLink::new(&ChunkId::from("act 3/scene 1"), "\"to be\" -not");
        assert_eq!(DeepLink::parse(&link.to_fragment()), Some(link));
    }

    #[test]
    fn parse_accepts_plus_and_hash() {
        assert_eq!(
            DeepLink::parse("#q=green+pastures&id=12&view=full"),
            Some(DeepLink {
                id: "12".to_string(),
                query: Some("green pastures".to_string()),
            })
        );
    }

    #[test]
    fn parse_requires_id() {
        assert_eq!(DeepLink::parse("?q=lord"), None);
        assert_eq!(DeepLink::parse("?id=&q=lord"), None);
        assert_eq!(DeepLink::parse(""), None);
    }
}
