pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to load corpus: {0}")]
    Load(#[from] LoadError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },
}

/// Failure to fetch or decode a corpus document.
///
/// Every variant carries the location that was being loaded so the
/// message stays meaningful once it reaches a user.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {location}: {source}")]
    Io {
        location: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot fetch {location}: {source}")]
    Fetch {
        location: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("fetching {location} returned HTTP {status}")]
    Status { location: String, status: u16 },

    #[error("cannot parse {location}: {source}")]
    Parse {
        location: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{location} is not a valid corpus: {reason}")]
    Invalid { location: String, reason: String },
}

impl LoadError {
    /// The URL or path whose load failed.
    pub fn location(&self) -> &str {
        match self {
            LoadError::Io { location, .. }
            | LoadError::Fetch { location, .. }
            | LoadError::Status { location, .. }
            | LoadError::Parse { location, .. }
            | LoadError::Invalid { location, .. } => location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_error_message_names_location() {
        let err = LoadError::Status {
            location: "https://example.org/kjv.json".to_string(),
            status: 404,
        };
        assert_eq!(err.location(), "https://example.org/kjv.json");
        assert!(err.to_string().contains("HTTP 404"));
    }

    #[test]
    fn load_error_converts_into_error() {
        let err: Error = LoadError::Invalid {
            location: "corpus.json".to_string(),
            reason: "duplicate chunk id 7".to_string(),
        }
        .into();
        let msg = err.to_string();
        assert!(msg.starts_with("failed to load corpus"));
        assert!(msg.contains("duplicate chunk id 7"));
    }
}
