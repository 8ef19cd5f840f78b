//! Query language: quoted phrases, required terms and `-excluded` terms.
//!
//! ```text
//! "lie down" green -wolf
//! ```
//!
//! parses into one phrase (`lie down`), one required term (`green`) and one
//! excluded term (`wolf`). Matching is plain substring containment against a
//! chunk's precomputed lowercase text: there is no tokenization, so `cat`
//! matches inside `category` and `-cat` excludes it too. There is no escaping
//! mechanism for a literal `-` or `"` inside an unquoted token.

use std::sync::LazyLock;

use regex::Regex;

/// Points awarded per occurrence of a phrase.
pub const PHRASE_WEIGHT: u32 = 10;

/// Points awarded per occurrence of a required term.
pub const TERM_WEIGHT: u32 = 5;

static QUOTED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""([^"]+)""#).expect("quoted phrase pattern compiles")
});

/// A parsed query. All terms are lowercase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedQuery {
    pub phrases: Vec<String>,
    pub required: Vec<String>,
    pub excluded: Vec<String>,
}

impl ParsedQuery {
    /// Parse a raw query string. Never fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use lectern::query::ParsedQuery;
    ///
    /// let q = ParsedQuery::parse(r#""Lie Down" green -Wolf"#);
    /// assert_eq!(q.phrases, vec!["lie down"]);
    /// assert_eq!(q.required, vec!["green"]);
    /// assert_eq!(q.excluded, vec!["wolf"]);
    /// ```
    pub fn parse(query: &str) -> Self {
        let mut parsed = Self::default();

        for caps in QUOTED.captures_iter(query) {
            parsed.phrases.push(caps[1].to_lowercase());
        }
        let remainder = QUOTED.replace_all(query, "");

        for token in remainder.split_whitespace() {
            if let Some(term) = token.strip_prefix('-') {
                if !term.is_empty() {
                    parsed.excluded.push(term.to_lowercase());
                }
            } else {
                parsed.required.push(token.to_lowercase());
            }
        }

        parsed
    }

    /// True when the query carries no terms of any kind.
    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
            && self.required.is_empty()
            && self.excluded.is_empty()
    }

    /// Phrases followed by required terms: everything that can match.
    pub fn positive_terms(&self) -> impl Iterator<Item = &str> {
        self.phrases
            .iter()
            .chain(self.required.iter())
            .map(String::as_str)
    }

    /// Whether lowercase `search_text` satisfies every constraint.
    pub fn matches(&self, search_text: &str) -> bool {
        self.phrases.iter().all(|p| search_text.contains(p.as_str()))
            && self.required.iter().all(|t| search_text.contains(t.as_str()))
            && !self.excluded.iter().any(|t| search_text.contains(t.as_str()))
    }

    /// Relevance score of lowercase `search_text`.
    ///
    /// Occurrences are counted without overlap, scanning left to right.
    /// Excluded terms only gate inclusion and never contribute.
    pub fn score(&self, search_text: &str) -> u32 {
        let phrase_hits: usize = self
            .phrases
            .iter()
            .map(|p| search_text.matches(p.as_str()).count())
            .sum();
        let term_hits: usize = self
            .required
            .iter()
            .map(|t| search_text.matches(t.as_str()).count())
            .sum();

        weighted(PHRASE_WEIGHT, phrase_hits)
            .saturating_add(weighted(TERM_WEIGHT, term_hits))
    }
}

/// `weight * hits`, saturating at `u32::MAX`.
fn weighted(weight: u32, hits: usize) -> u32 {
    u32::try_from(hits)
        .unwrap_or(u32::MAX)
        .saturating_mul(weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_terms_are_required() {
        let q = ParsedQuery::parse("Lord  Shepherd");
        assert_eq!(q.required, vec!["lord", "shepherd"]);
        assert!(q.phrases.is_empty());
        assert!(q.excluded.is_empty());
    }

    #[test]
    fn multiple_phrases_are_extracted() {
        let q = ParsedQuery::parse(r#""still waters" restoreth "green pastures""#);
        assert_eq!(q.phrases, vec!["still waters", "green pastures"]);
        assert_eq!(q.required, vec!["restoreth"]);
    }

    #[test]
    fn bare_dash_contributes_nothing() {
        let q = ParsedQuery::parse("lord - shepherd");
        assert_eq!(q.required, vec!["lord", "shepherd"]);
        assert!(q.excluded.is_empty());
    }

    #[test]
    fn dash_inside_token_is_literal() {
        let q = ParsedQuery::parse("well-being --x");
        assert_eq!(q.required, vec!["well-being"]);
        assert_eq!(q.excluded, vec!["-x"]);
    }

    #[test]
    fn unbalanced_quote_stays_in_token() {
        let q = ParsedQuery::parse(r#"say "hello"#);
        assert!(q.phrases.is_empty());
        assert_eq!(q.required, vec!["say", "\"hello"]);
    }

    #[test]
    fn empty_and_blank_queries_parse_to_nothing() {
        assert!(ParsedQuery::parse("").is_empty());
        assert!(ParsedQuery::parse("   \t ").is_empty());
    }

    #[test]
    fn stripping_a_phrase_joins_adjacent_text() {
        let q = ParsedQuery::parse(r#"a"b c"d"#);
        assert_eq!(q.phrases, vec!["b c"]);
        assert_eq!(q.required, vec!["ad"]);
    }

    #[test]
    fn matches_is_substring_based() {
        let q = ParsedQuery::parse("cat");
        assert!(q.matches("a category of things"));

        let q = ParsedQuery::parse("-cat");
        assert!(!q.matches("a category of things"));
        assert!(q.matches("a dog"));
    }

    #[test]
    fn matches_requires_every_phrase_and_term() {
        let q = ParsedQuery::parse(r#""lie down" green"#);
        assert!(q.matches("he maketh me to lie down in green pastures"));
        assert!(!q.matches("he maketh me to lie down"));
        assert!(!q.matches("down to lie in green"));
    }

    #[test]
    fn score_weights_phrases_and_terms() {
        let q = ParsedQuery::parse(r#""lie down" green"#);
        assert_eq!(q.score("lie down in green, green pastures"), 10 + 5 * 2);
    }

    #[test]
    fn score_counts_non_overlapping_occurrences() {
        let q = ParsedQuery::parse("aa");
        assert_eq!(q.score("aaaa"), 10);
        assert_eq!(q.score("aaa"), 5);
    }

    #[test]
    fn excluded_terms_do_not_score() {
        let q = ParsedQuery::parse("-wolf");
        assert_eq!(q.score("wolf wolf wolf"), 0);
    }

    #[test]
    fn positive_terms_lists_phrases_first() {
        let q = ParsedQuery::parse(r#"green "lie down" -wolf"#);
        let terms: Vec<&str> = q.positive_terms().collect();
        assert_eq!(terms, vec!["lie down", "green"]);
    }

    #[test]
    fn weighted_hits_saturate() {
        assert_eq!(weighted(TERM_WEIGHT, 3), 15);
        assert_eq!(weighted(PHRASE_WEIGHT, 500_000_000), u32::MAX);
        assert_eq!(weighted(TERM_WEIGHT, usize::MAX), u32::MAX);
        assert_eq!(
            weighted(PHRASE_WEIGHT, 400_000_000)
                .saturating_add(weighted(TERM_WEIGHT, 400_000_000)),
            u32::MAX
        );
    }
}
