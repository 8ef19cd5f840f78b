//! Fetching corpus documents from URLs and local paths.

use std::path::PathBuf;

use crate::{corpus::Corpus, error::LoadError};

/// Where a corpus document lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CorpusSource {
    /// An `http://` or `https://` URL.
    Http(String),
    /// A local file, given directly or as a `file://` URL.
    File(PathBuf),
}

impl CorpusSource {
    /// Classify a location string.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::path::PathBuf;
    /// use lectern::loader::CorpusSource;
    ///
    /// assert_eq!(
    ///     CorpusSource::parse("file:///srv/kjv.json"),
    ///     CorpusSource::File(PathBuf::from("/srv/kjv.json"))
    /// );
    /// assert!(matches!(
    ///     CorpusSource::parse("https://example.org/kjv.json"),
    ///     CorpusSource::Http(_)
    /// ));
    /// ```
    pub fn parse(location: &str) -> Self {
        let lower = location.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            CorpusSource::Http(location.to_string())
        } else if let Some(path) = location.strip_prefix("file://") {
            CorpusSource::File(PathBuf::from(path))
        } else {
            CorpusSource::File(PathBuf::from(location))
        }
    }
}

/// Fetch, parse and index the corpus at `location`.
pub async fn fetch_corpus(location: &str) -> Result<Corpus, LoadError> {
    let bytes = read_source(location).await?;
    tracing::debug!(location, bytes = bytes.len(), "corpus fetched");
    parse_corpus(location, &bytes)
}

/// Parse and index a corpus document already held in memory.
pub fn parse_corpus(location: &str, bytes: &[u8]) -> Result<Corpus, LoadError> {
    let mut corpus: Corpus =
        serde_json::from_slice(bytes).map_err(|source| LoadError::Parse {
            location: location.to_string(),
            source,
        })?;

    corpus
        .build_index()
        .map_err(|reason| LoadError::Invalid {
            location: location.to_string(),
            reason,
        })?;

    Ok(corpus)
}

async fn read_source(location: &str) -> Result<Vec<u8>, LoadError> {
    match CorpusSource::parse(location) {
        CorpusSource::Http(url) => fetch_http(&url).await,
        CorpusSource::File(path) => {
            tokio::fs::read(&path).await.map_err(|source| LoadError::Io {
                location: location.to_string(),
                source,
            })
        }
    }
}

async fn fetch_http(url: &str) -> Result<Vec<u8>, LoadError> {
    let fetch_err = |source| LoadError::Fetch {
        location: url.to_string(),
        source,
    };

    let response = reqwest::get(url).await.map_err(fetch_err)?;
    let status = response.status();
    if !status.is_success() {
        return Err(LoadError::Status {
            location: url.to_string(),
            status: status.as_u16(),
        });
    }

    let body = response.bytes().await.map_err(fetch_err)?;
    Ok(body.to_vec())
}
