use std::path::{Path, PathBuf};

use rusqlite::Connection;

use crate::browse::resolve_dir;
use crate::config::{validate, Config};
use crate::controller::{PollOutcome, QueryController};
use crate::kv_store::{self, StoreError};
use crate::logging;
use crate::model::{RecentFolder, SearchResult};
use crate::notify::{Notification, Notifier, OverwritePrompt};
use crate::preferences;
use crate::query_engine::{QueryEngine, QueryError};
use crate::recents::RecencyStore;
use crate::selection::{require_selection, SelectionError, SelectionProvider};
use crate::transfer::{transfer, TransferError, TransferMode, TransferSummary};

#[derive(Debug)]
pub enum SessionError {
    Config(String),
    Store(StoreError),
    Selection(SelectionError),
    Query(QueryError),
    Browse(std::io::Error),
    Transfer(TransferError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(error) => write!(f, "config error: {error}"),
            Self::Store(error) => write!(f, "store error: {error}"),
            Self::Selection(error) => write!(f, "selection error: {error}"),
            Self::Query(error) => write!(f, "query error: {error}"),
            Self::Browse(error) => write!(f, "browse error: {error}"),
            Self::Transfer(error) => write!(f, "transfer error: {error}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<StoreError> for SessionError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<SelectionError> for SessionError {
    fn from(value: SelectionError) -> Self {
        Self::Selection(value)
    }
}

impl From<QueryError> for SessionError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

impl From<TransferError> for SessionError {
    fn from(value: TransferError) -> Self {
        Self::Transfer(value)
    }
}

pub fn search_failure_notification() -> Notification {
    Notification::failure(
        "Search Error",
        "Something went wrong with the search. Please try again.",
    )
}

pub fn browse_failure_notification() -> Notification {
    Notification::failure("Error", "Failed to read folder contents")
}

/// One launcher invocation: the selected files, the search/browse controller and the
/// persisted state they share.
pub struct Session {
    config: Config,
    db: Connection,
    recents: RecencyStore,
    controller: QueryController,
    selection: Vec<PathBuf>,
}

impl Session {
    pub fn new(config: Config, engine: Box<dyn QueryEngine>) -> Result<Self, SessionError> {
        validate(&config).map_err(SessionError::Config)?;
        let db = kv_store::open_from_config(&config)?;
        Self::with_connection(config, db, engine)
    }

    pub fn with_connection(
        config: Config,
        db: Connection,
        engine: Box<dyn QueryEngine>,
    ) -> Result<Self, SessionError> {
        validate(&config).map_err(SessionError::Config)?;
        let recents = RecencyStore::new(config.max_recent_folders);
        let controller = QueryController::from_config(&config, engine);
        Ok(Self {
            config,
            db,
            recents,
            controller,
            selection: Vec::new(),
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn controller(&self) -> &QueryController {
        &self.controller
    }

    pub fn selection(&self) -> &[PathBuf] {
        &self.selection
    }

    pub fn set_selection(&mut self, paths: Vec<PathBuf>) {
        self.selection = paths;
    }

    /// Loads the file manager selection. An empty or unavailable selection is announced
    /// once and halts the session.
    pub fn load_selection(
        &mut self,
        provider: &dyn SelectionProvider,
        notifier: &mut dyn Notifier,
    ) -> Result<&[PathBuf], SessionError> {
        match require_selection(provider) {
            Ok(paths) => {
                logging::info(&format!(
                    "{} selection: {} item(s)",
                    provider.provider_name(),
                    paths.len()
                ));
                self.selection = paths;
                Ok(&self.selection)
            }
            Err(error) => {
                logging::warn(&format!("{} selection failed: {error}", provider.provider_name()));
                notifier.toast(&error.notification());
                Err(error.into())
            }
        }
    }

    pub fn recent_folders(&self) -> Vec<RecentFolder> {
        self.recents.load(&self.db)
    }

    pub fn forget_recent(&self, path: &Path) -> Result<bool, SessionError> {
        Ok(self.recents.remove(&self.db, path)?)
    }

    pub fn show_details(&self) -> bool {
        preferences::load_show_details(&self.db)
    }

    pub fn toggle_details(&self) -> Result<bool, SessionError> {
        Ok(preferences::toggle_show_details(&self.db)?)
    }

    pub fn search(&mut self, text: &str, notifier: &mut dyn Notifier) -> Result<(), SessionError> {
        if let Err(error) = self.controller.set_search_text(text) {
            notifier.toast(&search_failure_notification());
            return Err(error.into());
        }
        Ok(())
    }

    /// Pulls pending results. A failed query is announced here, once.
    pub fn poll(&mut self, budget: usize, notifier: &mut dyn Notifier) -> PollOutcome {
        let outcome = self.controller.poll(budget);
        if let PollOutcome::Failed(_) = outcome {
            notifier.toast(&search_failure_notification());
        }
        outcome
    }

    pub fn finish_query(&mut self, notifier: &mut dyn Notifier) -> Result<usize, SessionError> {
        match self.controller.run_to_completion() {
            Ok(count) => Ok(count),
            Err(error) => {
                notifier.toast(&search_failure_notification());
                Err(error.into())
            }
        }
    }

    pub fn navigate_to(&mut self, dir: &Path, notifier: &mut dyn Notifier) -> Result<(), SessionError> {
        self.controller.navigate_to(dir).map_err(|error| {
            notifier.toast(&browse_failure_notification());
            SessionError::Browse(error)
        })
    }

    pub fn navigate_up(&mut self, notifier: &mut dyn Notifier) -> Result<(), SessionError> {
        self.controller.navigate_up().map_err(|error| {
            notifier.toast(&browse_failure_notification());
            SessionError::Browse(error)
        })
    }

    /// The entry for `destination` if the user could have picked it from what is on screen
    /// or from the recents list.
    /// Browse paths are canonical, so `destination` is tried both as given and resolved.
    pub fn known_folder(&self, destination: &Path) -> Option<SearchResult> {
        let resolved = resolve_dir(destination);
        let candidates = [destination, resolved.as_path()];

        for candidate in candidates {
            if let Some(result) = self.controller.find_result(candidate) {
                return Some(result.clone());
            }
            if self.controller.browse_path() == Some(candidate) {
                return Some(
                    SearchResult::from_path(candidate)
                        .unwrap_or_else(|_| SearchResult::folder(candidate)),
                );
            }
        }

        self.recents
            .find(&self.db, destination)
            .or_else(|| self.recents.find(&self.db, &resolved))
            .map(|recent| recent.folder)
    }

    /// Transfers the selection into `destination`, updates recents and announces the result.
    pub fn transfer_to(
        &mut self,
        mode: TransferMode,
        destination: &Path,
        prompt: &mut dyn OverwritePrompt,
        notifier: &mut dyn Notifier,
    ) -> Result<TransferSummary, SessionError> {
        if self.selection.is_empty() {
            let error = SelectionError::Empty;
            notifier.toast(&error.notification());
            return Err(error.into());
        }

        let known = self.known_folder(destination);
        let summary = match transfer(mode, &self.selection, destination, prompt, notifier) {
            Ok(summary) => summary,
            Err(error) => {
                logging::warn(&format!("{} aborted: {error}", mode.verb()));
                notifier.toast(&error.notification());
                return Err(error.into());
            }
        };

        if let Some(folder) = known {
            if let Err(error) = self.recents.record(&self.db, folder) {
                logging::warn(&format!("failed to record recent folder: {error}"));
            }
        }

        notifier.toast(&summary.notification(mode));
        if summary.any_succeeded() {
            notifier.close_window();
        }
        Ok(summary)
    }
}
