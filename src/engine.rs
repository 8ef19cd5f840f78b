//! The query engine: filtering, ranking, pagination and result delivery.
//!
//! One [`SearchEngine`] owns one corpus and one search state. Results are
//! never returned from the search entry points; every recompute or page
//! change is pushed to the [`EngineObserver`] given at construction.
//!
//! ```text
//! Empty --load--> Ready --search--> Searching --timer--> Results
//!                   |                                      ^
//!                   +------ search_now / set_filter -------+
//! ```

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError},
    time::{Duration, Instant},
};

use serde::{Serialize, Serializer};

use crate::{
    config::EngineConfig,
    corpus::{Chunk, Corpus, CorpusInfo, Work},
    debounce::Debouncer,
    deep_link::DeepLink,
    error::{Error, Result},
    loader,
    observer::EngineObserver,
    query::ParsedQuery,
    text_util,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineStatus {
    /// No corpus loaded.
    Empty,
    /// Corpus loaded, no search issued since.
    Ready,
    /// A debounced search is waiting for its timer.
    Searching,
    /// Results computed and delivered.
    Results,
}

/// Which restriction [`SearchEngine::set_filter`] changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// Keep chunks of one work, by work key.
    Work,
    /// Keep chunks of works carrying one category tag.
    Category,
}

impl std::str::FromStr for Filter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "work" => Ok(Filter::Work),
            "category" => Ok(Filter::Category),
            other => Err(Error::Config(format!(
                "unknown filter '{other}', expected 'work' or 'category'"
            ))),
        }
    }
}

/// One ranked chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub score: u32,
    pub chunk: Chunk,
}

/// One page of results, as delivered to observers.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultsPage {
    pub results: Vec<SearchHit>,
    /// Results across all pages.
    pub total: usize,
    /// Zero-based index of this page.
    pub page: usize,
    pub total_pages: usize,
    #[serde(rename = "elapsedMs", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
    /// The search term this page answers.
    pub query: String,
}

fn serialize_millis<S: Serializer>(
    elapsed: &Duration,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64() * 1000.0)
}

#[derive(Debug, Clone, Copy)]
struct Hit {
    position: usize,
    score: u32,
}

#[derive(Debug)]
struct EngineState {
    corpus: Option<Arc<Corpus>>,
    term: String,
    work: Option<String>,
    category: Option<String>,
    page: usize,
    hits: Vec<Hit>,
    status: EngineStatus,
    /// Bumped by every state change that supersedes a pending search.
    generation: u64,
    last: Option<ResultsPage>,
    /// Newest page not yet handed to the observer.
    outbox: Option<ResultsPage>,
}

impl EngineState {
    fn new() -> Self {
        Self {
            corpus: None,
            term: String::new(),
            work: None,
            category: None,
            page: 0,
            hits: Vec::new(),
            status: EngineStatus::Empty,
            generation: 0,
            last: None,
            outbox: None,
        }
    }

    fn total_pages(&self, page_size: usize) -> usize {
        self.hits.len().div_ceil(page_size)
    }

    /// Filter, score and sort the corpus against the current term and
    /// filters. Ties keep corpus order.
    fn recompute(&mut self) {
        let Some(corpus) = self.corpus.clone() else {
            self.hits.clear();
            return;
        };
        let chunks = corpus.chunks();

        let mut positions: Vec<usize> = match &self.work {
            Some(work) => corpus.work_positions(work).to_vec(),
            None => (0..chunks.len()).collect(),
        };

        if let Some(category) = &self.category {
            let works: HashSet<&str> = corpus
                .category_works(category)
                .iter()
                .map(String::as_str)
                .collect();
            positions.retain(|&pos| works.contains(chunks[pos].file.as_str()));
        }

        if self.term.is_empty() {
            self.hits = positions
                .into_iter()
                .map(|position| Hit { position, score: 0 })
                .collect();
            return;
        }

        let query = ParsedQuery::parse(&self.term);
        let mut hits: Vec<Hit> = positions
            .into_iter()
            .filter(|&pos| query.matches(&chunks[pos].search_text))
            .map(|position| Hit {
                position,
                score: query.score(&chunks[position].search_text),
            })
            .collect();
        hits.sort_by(|a, b| b.score.cmp(&a.score));
        self.hits = hits;
    }

    /// Slice the current page out of the cached hits, remember it and
    /// queue it for delivery.
    fn snapshot(&mut self, page_size: usize, elapsed: Duration) {
        let total = self.hits.len();
        let start = self.page.saturating_mul(page_size).min(total);
        let end = start.saturating_add(page_size).min(total);

        let results = match &self.corpus {
            Some(corpus) => self.hits[start..end]
                .iter()
                .map(|hit| SearchHit {
                    score: hit.score,
                    chunk: corpus.chunks()[hit.position].clone(),
                })
                .collect(),
            None => Vec::new(),
        };

        if self.corpus.is_some() {
            self.status = EngineStatus::Results;
        }

        let page = ResultsPage {
            results,
            total,
            page: self.page,
            total_pages: self.total_pages(page_size),
            elapsed,
            query: self.term.clone(),
        };
        self.last = Some(page.clone());
        self.outbox = Some(page);
    }
}

struct Shared {
    state: Mutex<EngineState>,
    /// Held by whichever thread is currently draining the outbox.
    delivering: Mutex<()>,
    observer: Box<dyn EngineObserver>,
    config: EngineConfig,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run the full pipeline and notify the observer.
    ///
    /// With `generation` set, does nothing if the state has moved on since
    /// the caller captured it.
    fn run_search(&self, generation: Option<u64>) {
        {
            let mut state = self.lock();
            if generation.is_some_and(|g| g != state.generation) {
                tracing::debug!("dropping superseded search");
                return;
            }

            let started = Instant::now();
            state.recompute();
            state.snapshot(self.config.page_size, started.elapsed());
            if let Some(page) = &state.outbox {
                tracing::debug!(
                    query = %page.query,
                    total = page.total,
                    elapsed_ms = page.elapsed.as_secs_f64() * 1000.0,
                    "search complete"
                );
            }
        }
        self.deliver();
    }

    /// Move to the page chosen by `pick(current, last)` and notify.
    fn paginate(&self, pick: impl FnOnce(usize, usize) -> usize) {
        {
            let mut state = self.lock();
            let started = Instant::now();
            let last = state.total_pages(self.config.page_size).saturating_sub(1);
            state.page = pick(state.page, last).min(last);
            state.snapshot(self.config.page_size, started.elapsed());
        }
        self.deliver();
    }

    /// Hand queued pages to the observer, one deliverer at a time.
    ///
    /// Pages are queued under the state lock, so the outbox always holds
    /// the newest one. A caller that finds another delivery in progress
    /// leaves its page for that deliverer, which keeps draining until the
    /// outbox is empty. The observer therefore never sees an older page
    /// after a newer one, and may call back into the engine.
    fn deliver(&self) {
        loop {
            let delivering = match self.delivering.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(e)) => e.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            loop {
                let page = self.lock().outbox.take();
                let Some(page) = page else { break };
                self.observer.on_results(&page);
            }
            drop(delivering);

            if self.lock().outbox.is_none() {
                return;
            }
        }
    }
}

/// In-memory search over one corpus.
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct SearchEngine {
    shared: Arc<Shared>,
    debouncer: Debouncer,
}

impl std::fmt::Debug for SearchEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SearchEngine")
            .field("config", &self.shared.config)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

impl SearchEngine {
    pub fn new(config: EngineConfig, observer: impl EngineObserver + 'static) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(EngineState::new()),
                delivering: Mutex::new(()),
                observer: Box::new(observer),
                config,
            }),
            debouncer: Debouncer::new(config.debounce),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared.config
    }

    pub fn status(&self) -> EngineStatus {
        self.shared.lock().status
    }

    /// Fetch the corpus at `location` (URL or path) and make it current.
    ///
    /// The observer sees `on_loading(true)` before the fetch and
    /// `on_loading(false)` after it. On failure the previous corpus stays in
    /// place and the error is also passed to `on_error`.
    pub async fn load_corpus(&self, location: &str) -> Result<Arc<Corpus>> {
        let observer = &self.shared.observer;
        observer.on_loading(true);

        let result = match loader::fetch_corpus(location).await {
            Ok(corpus) => {
                let corpus = self.install_corpus(corpus);
                tracing::info!(
                    location,
                    works = corpus.works().len(),
                    chunks = corpus.chunks().len(),
                    "corpus loaded"
                );
                Ok(corpus)
            }
            Err(e) => {
                let err = Error::from(e);
                tracing::error!("{err}");
                observer.on_error(&err);
                Err(err)
            }
        };

        observer.on_loading(false);
        result
    }

    /// Make an already-built corpus current.
    ///
    /// Cancels any pending search, clears the term and filters, and resets
    /// the cached results to the full chunk set.
    pub fn install_corpus(&self, corpus: Corpus) -> Arc<Corpus> {
        self.debouncer.cancel();
        let corpus = Arc::new(corpus);

        let mut state = self.shared.lock();
        state.generation += 1;
        state.corpus = Some(corpus.clone());
        state.term.clear();
        state.work = None;
        state.category = None;
        state.page = 0;
        state.last = None;
        state.outbox = None;
        state.recompute();
        state.status = EngineStatus::Ready;

        corpus
    }

    pub fn corpus(&self) -> Option<Arc<Corpus>> {
        self.shared.lock().corpus.clone()
    }

    /// Corpus metadata, or `None` before a corpus is loaded.
    pub fn info(&self) -> Option<CorpusInfo> {
        self.corpus().map(|c| c.info())
    }

    pub fn works(&self) -> Vec<Work> {
        self.corpus()
            .map(|c| c.works().to_vec())
            .unwrap_or_default()
    }

    pub fn categories(&self) -> Vec<String> {
        self.corpus().map(|c| c.categories()).unwrap_or_default()
    }

    pub fn chunk_by_id(&self, id: &str) -> Option<Chunk> {
        self.corpus()?.chunk_by_id(id).cloned()
    }

    pub fn work_chunks(&self, file: &str) -> Vec<Chunk> {
        self.corpus()
            .map(|c| c.work_chunks(file).cloned().collect())
            .unwrap_or_default()
    }

    /// The current (trimmed) search term.
    pub fn search_term(&self) -> String {
        self.shared.lock().term.clone()
    }

    /// Set or clear (`None` or empty) a filter and recompute immediately.
    pub fn set_filter(&self, filter: Filter, value: Option<&str>) {
        self.debouncer.cancel();
        let value = value
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        tracing::debug!(?filter, ?value, "filter changed");

        {
            let mut state = self.shared.lock();
            state.generation += 1;
            state.page = 0;
            match filter {
                Filter::Work => state.work = value,
                Filter::Category => state.category = value,
            }
        }
        self.shared.run_search(None);
    }

    /// Debounced search: the last call within the configured quiet period
    /// runs, earlier ones are dropped. Returns immediately.
    pub fn search(&self, term: &str) {
        let generation = {
            let mut state = self.shared.lock();
            state.term = term.trim().to_string();
            state.page = 0;
            state.generation += 1;
            if state.corpus.is_some() {
                state.status = EngineStatus::Searching;
            }
            state.generation
        };

        let shared = self.shared.clone();
        self.debouncer
            .schedule(move || shared.run_search(Some(generation)));
    }

    /// Search immediately, superseding any pending debounced search.
    pub fn search_now(&self, term: &str) {
        self.debouncer.cancel();
        {
            let mut state = self.shared.lock();
            state.term = term.trim().to_string();
            state.page = 0;
            state.generation += 1;
        }
        self.shared.run_search(None);
    }

    pub fn next_page(&self) {
        self.shared.paginate(|current, _| current.saturating_add(1));
    }

    pub fn prev_page(&self) {
        self.shared.paginate(|current, _| current.saturating_sub(1));
    }

    /// Jump to page `page`, clamped to the valid range.
    pub fn go_to_page(&self, page: i64) {
        self.shared.paginate(|_, last| {
            if page <= 0 {
                0
            } else {
                usize::try_from(page).unwrap_or(usize::MAX).min(last)
            }
        });
    }

    /// The most recently delivered page, if any.
    pub fn current_page(&self) -> Option<ResultsPage> {
        self.shared.lock().last.clone()
    }

    /// [`text_util::highlight`] against `query`, or the current term.
    pub fn highlight(&self, text: &str, query: Option<&str>) -> String {
        match query {
            Some(query) => text_util::highlight(text, query),
            None => text_util::highlight(text, &self.search_term()),
        }
    }

    /// [`text_util::excerpt`] against `query` (or the current term) with
    /// `context_words` (or the configured default) on each side.
    pub fn excerpt(
        &self,
        text: &str,
        query: Option<&str>,
        context_words: Option<usize>,
    ) -> String {
        let context_words =
            context_words.unwrap_or(self.shared.config.context_words);
        match query {
            Some(query) => text_util::excerpt(text, query, context_words),
            None => text_util::excerpt(text, &self.search_term(), context_words),
        }
    }

    /// Fragment linking to `chunk` under the current search term.
    pub fn deep_link(&self, chunk: &Chunk) -> String {
        DeepLink::new(&chunk.id, &self.search_term()).to_fragment()
    }
}
