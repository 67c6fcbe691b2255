use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::aggregator::ResultAggregator;
use crate::browse::{list_subdirectories, parent_of, resolve_dir};
use crate::config::Config;
use crate::logging;
use crate::model::SearchResult;
use crate::query_engine::{CancelToken, QueryEngine, QueryError, QuerySpec, ResultStream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Idle,
    Searching,
    Browsing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryEvent {
    TextEntered,
    TextCleared,
    Navigated,
    Settled,
    Failed,
}

pub fn transition(state: QueryState, event: QueryEvent) -> QueryState {
    match (state, event) {
        (_, QueryEvent::Navigated) => QueryState::Browsing,
        (_, QueryEvent::TextEntered) => QueryState::Searching,
        (QueryState::Searching, QueryEvent::TextCleared)
        | (QueryState::Searching, QueryEvent::Settled)
        | (QueryState::Searching, QueryEvent::Failed) => QueryState::Idle,
        (state, _) => state,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// No query in flight.
    Idle,
    Pending { received: usize },
    Settled { received: usize },
    /// The query was cancelled; its partial results are gone.
    Cancelled,
    Failed(QueryError),
}

/// Removes control characters and surrounding whitespace from search box input.
pub fn sanitize_query_text(raw: &str) -> String {
    let cleaned: String = raw.chars().filter(|c| !c.is_control()).collect();
    cleaned.trim().to_string()
}

struct ActiveQuery {
    cancel: CancelToken,
    stream: ResultStream,
}

pub struct QueryController {
    engine: Box<dyn QueryEngine>,
    state: QueryState,
    search_text: String,
    browse_path: Option<PathBuf>,
    results: ResultAggregator,
    active: Option<ActiveQuery>,
    limit: usize,
    timeout: Duration,
}

impl QueryController {
    pub fn new(engine: Box<dyn QueryEngine>) -> Self {
        Self {
            engine,
            state: QueryState::Idle,
            search_text: String::new(),
            browse_path: None,
            results: ResultAggregator::new(),
            active: None,
            limit: 100,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn from_config(cfg: &Config, engine: Box<dyn QueryEngine>) -> Self {
        let mut controller = Self::new(engine);
        controller.limit = cfg.max_results;
        controller.timeout = Duration::from_millis(cfg.search_timeout_ms);
        controller
    }

    pub fn state(&self) -> QueryState {
        self.state
    }

    pub fn search_text(&self) -> &str {
        &self.search_text
    }

    pub fn browse_path(&self) -> Option<&Path> {
        self.browse_path.as_deref()
    }

    pub fn results(&self) -> &[SearchResult] {
        self.results.items()
    }

    pub fn find_result(&self, path: &Path) -> Option<&SearchResult> {
        self.results.find(path)
    }

    pub fn is_querying(&self) -> bool {
        self.active.is_some()
    }

    pub fn engine_name(&self) -> &'static str {
        self.engine.engine_name()
    }

    /// One keystroke: assigns the sanitized text and restarts the query if it changed.
    /// Only a failure to start the query is returned; stream failures come from `poll`.
    pub fn set_search_text(&mut self, raw: &str) -> Result<(), QueryError> {
        let text = sanitize_query_text(raw);
        if text == self.search_text {
            return Ok(());
        }

        self.cancel_active();
        self.results.clear();
        self.search_text = text;

        if self.search_text.is_empty() {
            self.state = transition(self.state, QueryEvent::TextCleared);
            return Ok(());
        }

        self.state = transition(self.state, QueryEvent::TextEntered);
        let spec = QuerySpec {
            limit: self.limit,
            timeout: self.timeout,
            ..QuerySpec::new(&self.search_text, self.browse_path.as_deref())
        };
        let cancel = CancelToken::new();
        match self.engine.start(&spec, cancel.clone()) {
            Ok(stream) => {
                self.active = Some(ActiveQuery { cancel, stream });
                Ok(())
            }
            Err(error) => {
                logging::error(&format!(
                    "{} query '{}' failed to start: {error}",
                    self.engine.engine_name(),
                    self.search_text
                ));
                self.state = transition(self.state, QueryEvent::Failed);
                Err(error)
            }
        }
    }

    /// Folds at most `budget` results from the in-flight query into the display list.
    pub fn poll(&mut self, budget: usize) -> PollOutcome {
        let Some(active) = self.active.as_mut() else {
            return PollOutcome::Idle;
        };

        let mut received = 0;
        while received < budget {
            match active.stream.next() {
                Some(Ok(result)) => {
                    self.results.fold(result);
                    received += 1;
                }
                Some(Err(error)) if error.is_cancellation() => {
                    self.active = None;
                    self.results.clear();
                    self.state = transition(self.state, QueryEvent::Settled);
                    return PollOutcome::Cancelled;
                }
                Some(Err(error)) => {
                    self.active = None;
                    logging::error(&format!(
                        "query '{}' failed: {error}",
                        self.search_text
                    ));
                    self.state = transition(self.state, QueryEvent::Failed);
                    return PollOutcome::Failed(error);
                }
                None => {
                    self.active = None;
                    self.state = transition(self.state, QueryEvent::Settled);
                    return PollOutcome::Settled { received };
                }
            }
        }

        PollOutcome::Pending { received }
    }

    /// Polls until the in-flight query ends. Cancellation is not an error.
    pub fn run_to_completion(&mut self) -> Result<usize, QueryError> {
        let mut total = 0;
        loop {
            match self.poll(64) {
                PollOutcome::Pending { received } => total += received,
                PollOutcome::Settled { received } => return Ok(total + received),
                PollOutcome::Idle | PollOutcome::Cancelled => return Ok(total),
                PollOutcome::Failed(error) => return Err(error),
            }
        }
    }

    /// Switches to listing `dir`. The search text is cleared and no query runs.
    pub fn navigate_to(&mut self, dir: &Path) -> std::io::Result<()> {
        self.cancel_active();
        self.search_text.clear();
        let dir = resolve_dir(dir);
        self.browse_path = Some(dir.clone());
        self.state = transition(self.state, QueryEvent::Navigated);

        match list_subdirectories(&dir) {
            Ok(listing) => {
                self.results.replace_with_listing(listing);
                Ok(())
            }
            Err(error) => {
                self.results.clear();
                logging::warn(&format!("failed to list {}: {error}", dir.display()));
                Err(error)
            }
        }
    }

    /// Navigates to the parent of the current folder. Without a current folder this is a no-op.
    pub fn navigate_up(&mut self) -> std::io::Result<()> {
        match self.browse_path.clone() {
            Some(current) => self.navigate_to(&parent_of(&current)),
            None => Ok(()),
        }
    }

    /// Aborts the in-flight query and drops its partial results.
    pub fn cancel(&mut self) {
        if self.active.is_some() {
            self.cancel_active();
            self.results.clear();
            self.state = transition(self.state, QueryEvent::Settled);
        }
    }

    fn cancel_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}

impl Drop for QueryController {
    fn drop(&mut self) {
        self.cancel_active();
    }
}
