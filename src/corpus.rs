//! Typed corpus model.
//!
//! A corpus is produced by an external preprocessing step and shipped as a
//! single JSON document: summary metadata, a flat list of works, and the
//! chunks those works were split into. The schema here is the boundary
//! where that document becomes typed data; once [`Corpus::build_index`]
//! has run, the corpus is treated as immutable and shared behind an `Arc`.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{LoadError, Result};

/// Location reported for corpora assembled in memory.
const IN_MEMORY_LOCATION: &str = "<memory>";

/// Stable chunk identifier. Producers emit either integers or strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChunkId {
    Int(i64),
    Text(String),
}

impl std::fmt::Display for ChunkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChunkId::Int(n) => write!(f, "{n}"),
            ChunkId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ChunkId {
    fn from(value: i64) -> Self {
        ChunkId::Int(value)
    }
}

impl From<i32> for ChunkId {
    fn from(value: i32) -> Self {
        ChunkId::Int(value.into())
    }
}

impl From<&str> for ChunkId {
    fn from(value: &str) -> Self {
        ChunkId::Text(value.to_string())
    }
}

impl From<String> for ChunkId {
    fn from(value: String) -> Self {
        ChunkId::Text(value)
    }
}

/// The atomic unit of searchable text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    pub id: ChunkId,
    /// Key of the [`Work`] this chunk belongs to.
    #[serde(default)]
    pub file: String,
    /// Display text with original casing and punctuation.
    #[serde(default)]
    pub text: String,
    /// Lowercase copy of `text`, precomputed by the producer.
    #[serde(default)]
    pub search_text: String,
    /// Positional metadata (index, chapter, act, scene, ...) passed
    /// through as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Chunk {
    /// Build a chunk in memory, deriving `search_text` from `text`.
    ///
    /// # Examples
    ///
    /// ```
    /// use lectern::corpus::Chunk;
    ///
    /// let chunk = Chunk::new(1, "psalms.txt", "The Lord is my Shepherd");
    /// assert_eq!(chunk.search_text, "the lord is my shepherd");
    /// ```
    pub fn new(
        id: impl Into<ChunkId>,
        file: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        let text = text.into();
        let search_text = text.to_lowercase();
        Self {
            id: id.into(),
            file: file.into(),
            text,
            search_text,
            extra: Map::new(),
        }
    }
}

/// Metadata about one source document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Work {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub chunk_count: u64,
    #[serde(default)]
    pub word_count: u64,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Work {
    /// Build a work keyed by `file`.
    pub fn new(file: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            file: Some(file.into()),
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// The identifier chunks use to reference this work: `file`, falling
    /// back to `id`.
    pub fn key(&self) -> &str {
        self.file.as_deref().or(self.id.as_deref()).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    #[serde(default)]
    pub works: u64,
    #[serde(default)]
    pub chunks: u64,
    #[serde(default)]
    pub words: u64,
}

/// Corpus-level metadata returned by [`Corpus::info`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CorpusInfo {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub stats: Stats,
    pub generated: Option<String>,
}

#[derive(Debug, Clone, Default)]
struct CorpusIndex {
    by_id: HashMap<String, usize>,
    by_work: HashMap<String, Vec<usize>>,
    works_by_category: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Corpus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    author: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default)]
    works: Vec<Work>,
    #[serde(default)]
    chunks: Vec<Chunk>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    stats: Option<Stats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    generated: Option<String>,
    #[serde(flatten)]
    extra: Map<String, Value>,
    #[serde(skip)]
    index: CorpusIndex,
}

impl Corpus {
    /// Assemble and index a corpus from in-memory works and chunks.
    pub fn from_parts(works: Vec<Work>, chunks: Vec<Chunk>) -> Result<Self> {
        let mut corpus = Self {
            works,
            chunks,
            ..Self::default()
        };
        corpus.build_index().map_err(|reason| LoadError::Invalid {
            location: IN_MEMORY_LOCATION.to_string(),
            reason,
        })?;
        Ok(corpus)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Build the lookup tables used by filtering and accessors.
    ///
    /// Fails with a human-readable reason when two chunks share an id.
    /// Derives `stats` when the producer omitted them.
    pub(crate) fn build_index(&mut self) -> std::result::Result<(), String> {
        let mut index = CorpusIndex::default();

        for (pos, chunk) in self.chunks.iter().enumerate() {
            let key = chunk.id.to_string();
            if index.by_id.insert(key, pos).is_some() {
                return Err(format!("duplicate chunk id {}", chunk.id));
            }
            index
                .by_work
                .entry(chunk.file.clone())
                .or_default()
                .push(pos);
        }

        for work in &self.works {
            if let Some(category) = work.category.as_deref()
                && !category.is_empty()
            {
                index
                    .works_by_category
                    .entry(category.to_string())
                    .or_default()
                    .push(work.key().to_string());
            }
        }

        let orphans = index
            .by_work
            .keys()
            .filter(|file| !self.works.iter().any(|w| w.key() == *file))
            .count();
        if orphans > 0 {
            tracing::debug!(orphans, "chunks reference works missing from metadata");
        }

        if self.stats.is_none() {
            let words = self
                .chunks
                .iter()
                .map(|c| c.text.split_whitespace().count() as u64)
                .sum();
            self.stats = Some(Stats {
                works: self.works.len() as u64,
                chunks: self.chunks.len() as u64,
                words,
            });
        }

        self.index = index;
        Ok(())
    }

    pub fn info(&self) -> CorpusInfo {
        CorpusInfo {
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            author: self.author.clone(),
            description: self.description.clone(),
            stats: self.stats.unwrap_or_default(),
            generated: self.generated.clone(),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn works(&self) -> &[Work] {
        &self.works
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn work(&self, key: &str) -> Option<&Work> {
        self.works.iter().find(|w| w.key() == key)
    }

    /// Deduplicated category tags, sorted.
    pub fn categories(&self) -> Vec<String> {
        self.index.works_by_category.keys().cloned().collect()
    }

    /// Keys of the works tagged with `category`.
    pub fn category_works(&self, category: &str) -> &[String] {
        self.index
            .works_by_category
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn chunk_by_id(&self, id: &str) -> Option<&Chunk> {
        self.index.by_id.get(id).map(|&pos| &self.chunks[pos])
    }

    /// Chunks belonging to the work keyed `file`, in corpus order.
    pub fn work_chunks<'a>(
        &'a self,
        file: &str,
    ) -> impl Iterator<Item = &'a Chunk> + 'a {
        self.work_positions(file)
            .iter()
            .map(move |&pos| &self.chunks[pos])
    }

    pub(crate) fn work_positions(&self, file: &str) -> &[usize] {
        self.index
            .by_work
            .get(file)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}
