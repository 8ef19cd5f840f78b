//! lectern - an in-memory search engine for chunked document corpora.
//!
//! A corpus (scripture, plays, founding documents...) is split into chunks
//! ahead of time by an external tool and shipped as one JSON document.
//! lectern loads it, parses a small query language (`"phrases"`, required
//! terms, `-excluded` terms), ranks matching chunks, paginates them and
//! renders highlighted excerpts.
//!
//! # Quick start
//!
//! ```no_run
//! use lectern::{EngineConfig, SearchEngine, observer::Callbacks};
//!
//! # async fn run() -> lectern::Result<()> {
//! let engine = SearchEngine::new(
//!     EngineConfig::from_env()?,
//!     Callbacks::new().with_results(|page| {
//!         println!("{} result(s), page {}/{}", page.total, page.page + 1, page.total_pages);
//!     }),
//! );
//!
//! engine.load_corpus("https://example.org/kjv.json").await?;
//! engine.search_now("\"still waters\" -wicked");
//! engine.next_page();
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod corpus;
pub mod debounce;
pub mod deep_link;
pub mod engine;
pub mod error;
pub mod loader;
pub mod observer;
pub mod query;
pub mod text_util;

pub use config::EngineConfig;
pub use corpus::{Chunk, ChunkId, Corpus, Work};
pub use engine::{EngineStatus, Filter, ResultsPage, SearchEngine, SearchHit};
pub use error::{Error, LoadError, Result};
pub use observer::{EngineEvent, EngineObserver};
