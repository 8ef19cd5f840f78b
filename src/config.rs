use std::time::Duration;

use crate::{
    error::{Error, Result},
    text_util::DEFAULT_CONTEXT_WORDS,
};

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

pub const PAGE_SIZE_ENV_VAR: &str = "LECTERN_PAGE_SIZE";
pub const DEBOUNCE_ENV_VAR: &str = "LECTERN_DEBOUNCE_MS";
pub const CONTEXT_WORDS_ENV_VAR: &str = "LECTERN_CONTEXT_WORDS";

/// Tunables for a [`SearchEngine`](crate::engine::SearchEngine).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Results per page. Never zero.
    pub page_size: usize,
    /// Quiet period before a debounced search runs.
    pub debounce: Duration,
    /// Words kept on each side of a match by excerpts.
    pub context_words: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            debounce: DEFAULT_DEBOUNCE,
            context_words: DEFAULT_CONTEXT_WORDS,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by, when set:
    /// 1. `LECTERN_PAGE_SIZE`
    /// 2. `LECTERN_DEBOUNCE_MS`
    /// 3. `LECTERN_CONTEXT_WORDS`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(value) = lookup(PAGE_SIZE_ENV_VAR) {
            config = config.with_page_size(parse_var(PAGE_SIZE_ENV_VAR, &value)?)?;
        }
        if let Some(value) = lookup(DEBOUNCE_ENV_VAR) {
            config.debounce =
                Duration::from_millis(parse_var(DEBOUNCE_ENV_VAR, &value)?);
        }
        if let Some(value) = lookup(CONTEXT_WORDS_ENV_VAR) {
            config.context_words = parse_var(CONTEXT_WORDS_ENV_VAR, &value)?;
        }

        Ok(config)
    }

    pub fn with_page_size(mut self, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(Error::Config("page size must be at least 1".into()));
        }
        self.page_size = page_size;
        Ok(self)
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn with_context_words(mut self, context_words: usize) -> Self {
        self.context_words = context_words;
        self
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        Error::Config(format!("{key} must be a non-negative integer, got {value:?}"))
    })
}
