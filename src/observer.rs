//! How a [`SearchEngine`](crate::engine::SearchEngine) reports back.
//!
//! The engine never returns results from `search`; it pushes them to an
//! observer supplied at construction. Implement [`EngineObserver`] directly,
//! assemble one from closures with [`Callbacks`], or hand the engine an
//! unbounded channel sender and consume [`EngineEvent`]s asynchronously.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::{engine::ResultsPage, error::Error};

/// Receives result pages, loading transitions and load failures.
///
/// Called without the engine state lock held, so implementations may call
/// back into the engine. `on_results` calls never overlap and never deliver
/// an older page after a newer one. All methods default to no-ops.
pub trait EngineObserver: Send + Sync {
    fn on_results(&self, _page: &ResultsPage) {}

    fn on_loading(&self, _busy: bool) {}

    fn on_error(&self, _error: &Error) {}
}

impl EngineObserver for () {}

impl<T: EngineObserver + ?Sized> EngineObserver for Arc<T> {
    fn on_results(&self, page: &ResultsPage) {
        (**self).on_results(page);
    }

    fn on_loading(&self, busy: bool) {
        (**self).on_loading(busy);
    }

    fn on_error(&self, error: &Error) {
        (**self).on_error(error);
    }
}

/// An owned copy of one observer notification.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    Results(ResultsPage),
    Loading(bool),
    /// The rendered error message.
    Error(String),
}

impl EngineObserver for UnboundedSender<EngineEvent> {
    fn on_results(&self, page: &ResultsPage) {
        let _ = self.send(EngineEvent::Results(page.clone()));
    }

    fn on_loading(&self, busy: bool) {
        let _ = self.send(EngineEvent::Loading(busy));
    }

    fn on_error(&self, error: &Error) {
        let _ = self.send(EngineEvent::Error(error.to_string()));
    }
}

type ResultsFn = Box<dyn Fn(&ResultsPage) + Send + Sync>;
type LoadingFn = Box<dyn Fn(bool) + Send + Sync>;
type ErrorFn = Box<dyn Fn(&Error) + Send + Sync>;

/// Observer built from optional closures.
///
/// # Examples
///
/// ```
/// use lectern::observer::Callbacks;
///
/// let callbacks = Callbacks::new()
///     .with_results(|page| println!("{} results", page.total))
///     .with_error(|err| eprintln!("{err}"));
/// ```
#[derive(Default)]
pub struct Callbacks {
    results: Option<ResultsFn>,
    loading: Option<LoadingFn>,
    error: Option<ErrorFn>,
}

impl Callbacks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(
        mut self,
        f: impl Fn(&ResultsPage) + Send + Sync + 'static,
    ) -> Self {
        self.results = Some(Box::new(f));
        self
    }

    pub fn with_loading(mut self, f: impl Fn(bool) + Send + Sync + 'static) -> Self {
        self.loading = Some(Box::new(f));
        self
    }

    pub fn with_error(
        mut self,
        f: impl Fn(&Error) + Send + Sync + 'static,
    ) -> Self {
        self.error = Some(Box::new(f));
        self
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks")
            .field("results", &self.results.is_some())
            .field("loading", &self.loading.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

impl EngineObserver for Callbacks {
    fn on_results(&self, page: &ResultsPage) {
        if let Some(f) = &self.results {
            f(page);
        }
    }

    fn on_loading(&self, busy: bool) {
        if let Some(f) = &self.loading {
            f(busy);
        }
    }

    fn on_error(&self, error: &Error) {
        if let Some(f) = &self.error {
            f(error);
        }
    }
}
