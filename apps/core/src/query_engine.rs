use std::fmt::{Display, Formatter};
use std::io::{BufRead, BufReader, Lines};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use walkdir::WalkDir;

use crate::config::EngineKind;
use crate::logging;
use crate::model::SearchResult;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    Cancelled,
    Unavailable(String),
    Engine(String),
    Io(String),
}

impl QueryError {
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl Display for QueryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cancelled => write!(f, "query cancelled"),
            Self::Unavailable(message) => write!(f, "search engine unavailable: {message}"),
            Self::Engine(message) => write!(f, "search engine error: {message}"),
            Self::Io(message) => write!(f, "search io error: {message}"),
        }
    }
}

impl std::error::Error for QueryError {}

/// Cooperative cancellation flag shared between a controller and one query stream.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    pub text: String,
    pub scope: Option<PathBuf>,
    pub limit: usize,
    pub timeout: Duration,
}

impl QuerySpec {
    pub fn new(text: &str, scope: Option<&Path>) -> Self {
        Self {
            text: text.to_string(),
            scope: scope.map(Path::to_path_buf),
            limit: 100,
            timeout: Duration::from_secs(5),
        }
    }
}

pub type ResultStream = Box<dyn Iterator<Item = Result<SearchResult, QueryError>>>;

pub trait QueryEngine: Send + Sync {
    fn engine_name(&self) -> &'static str;

    /// Starts a query. The returned stream is lazy; nothing is read until it is polled.
    fn start(&self, spec: &QuerySpec, cancel: CancelToken) -> Result<ResultStream, QueryError>;
}

pub fn engine_for(kind: EngineKind) -> Box<dyn QueryEngine> {
    match kind {
        EngineKind::Spotlight => Box::new(SpotlightEngine::default()),
        EngineKind::Walk => Box::new(WalkEngine),
        EngineKind::Auto if cfg!(target_os = "macos") => Box::new(SpotlightEngine::default()),
        EngineKind::Auto => Box::new(WalkEngine),
    }
}

pub fn name_matches(display_name: &str, text: &str) -> bool {
    let needle = text.trim().to_lowercase();
    !needle.is_empty() && display_name.to_lowercase().contains(&needle)
}

/// Strict descendant check; the scope folder itself is not part of its own results.
pub fn is_within_scope(path: &Path, scope: Option<&Path>) -> bool {
    match scope {
        Some(scope) => path != scope && path.starts_with(scope),
        None => true,
    }
}

/// Applies cancellation, scope, result limit and deadline on top of any engine stream.
struct Guarded<I> {
    inner: I,
    cancel: CancelToken,
    scope: Option<PathBuf>,
    remaining: usize,
    deadline: Instant,
    done: bool,
}

fn guard<I>(inner: I, spec: &QuerySpec, cancel: CancelToken) -> ResultStream
where
    I: Iterator<Item = Result<SearchResult, QueryError>> + 'static,
{
    Box::new(Guarded {
        inner,
        cancel,
        scope: spec.scope.clone(),
        remaining: spec.limit,
        deadline: Instant::now() + spec.timeout,
        done: false,
    })
}

impl<I> Iterator for Guarded<I>
where
    I: Iterator<Item = Result<SearchResult, QueryError>>,
{
    type Item = Result<SearchResult, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.done {
                return None;
            }
            if self.cancel.is_cancelled() {
                self.done = true;
                return Some(Err(QueryError::Cancelled));
            }
            if self.remaining == 0 {
                self.done = true;
                return None;
            }
            if Instant::now() >= self.deadline {
                logging::info("query deadline reached; ending stream");
                self.done = true;
                return None;
            }

            match self.inner.next() {
                None => {
                    self.done = true;
                    return None;
                }
                Some(Ok(result)) => {
                    if !is_within_scope(&result.path, self.scope.as_deref()) {
                        continue;
                    }
                    self.remaining -= 1;
                    return Some(Ok(result));
                }
                Some(Err(error)) => {
                    self.done = true;
                    return Some(Err(error));
                }
            }
        }
    }
}

/// In-memory engine over a fixed result set, for hosts that push their own results and for tests.
#[derive(Debug, Clone, Default)]
pub struct FixedEngine {
    results: Vec<SearchResult>,
    trailing_error: Option<String>,
}

impl FixedEngine {
    pub fn from_results(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            trailing_error: None,
        }
    }

    /// Emits the matching results, then fails with `message`.
    pub fn failing_after(results: Vec<SearchResult>, message: &str) -> Self {
        Self {
            results,
            trailing_error: Some(message.to_string()),
        }
    }
}

impl QueryEngine for FixedEngine {
    fn engine_name(&self) -> &'static str {
        "fixed"
    }

    fn start(&self, spec: &QuerySpec, cancel: CancelToken) -> Result<ResultStream, QueryError> {
        let matches: Vec<Result<SearchResult, QueryError>> = self
            .results
            .iter()
            .filter(|result| name_matches(&result.display_name, &spec.text))
            .cloned()
            .map(Ok)
            .chain(
                self.trailing_error
                    .iter()
                    .map(|message| Err(QueryError::Engine(message.clone()))),
            )
            .collect();
        Ok(guard(matches.into_iter(), spec, cancel))
    }
}

/// Walks the scope (or the filesystem root) for folders whose name contains the query.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkEngine;

impl QueryEngine for WalkEngine {
    fn engine_name(&self) -> &'static str {
        "walk"
    }

    fn start(&self, spec: &QuerySpec, cancel: CancelToken) -> Result<ResultStream, QueryError> {
        let root = spec.scope.clone().unwrap_or_else(whole_system_root);
        if !root.is_dir() {
            return Err(QueryError::Io(format!(
                "search scope is not a directory: {}",
                root.display()
            )));
        }

        let entries = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry.file_name()));
        let stream = WalkStream {
            entries: Box::new(entries),
            text: spec.text.clone(),
            cancel: cancel.clone(),
            deadline: Instant::now() + spec.timeout,
        };
        Ok(guard(stream, spec, cancel))
    }
}

/// Checks cancellation and the deadline per visited entry, not per match, so a rare
/// name under a large tree cannot hold a poll for the whole walk.
struct WalkStream {
    entries: Box<dyn Iterator<Item = walkdir::Result<walkdir::DirEntry>>>,
    text: String,
    cancel: CancelToken,
    deadline: Instant,
}

impl Iterator for WalkStream {
    type Item = Result<SearchResult, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.cancel.is_cancelled() {
                return Some(Err(QueryError::Cancelled));
            }
            if Instant::now() >= self.deadline {
                logging::info("walk deadline reached; ending stream");
                return None;
            }

            let Ok(entry) = self.entries.next()? else {
                continue;
            };
            if !entry.file_type().is_dir() {
                continue;
            }
            if !name_matches(&entry.file_name().to_string_lossy(), &self.text) {
                continue;
            }
            if let Ok(result) = SearchResult::from_path(entry.path()) {
                return Some(Ok(result));
            }
        }
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

pub fn whole_system_root() -> PathBuf {
    if cfg!(target_os = "windows") {
        let drive = std::env::var("SystemDrive").unwrap_or_else(|_| "C:".to_string());
        PathBuf::from(format!("{drive}\\"))
    } else {
        PathBuf::from("/")
    }
}

/// Spotlight folder search through `mdfind`, read line by line from the child process.
#[derive(Debug, Clone)]
pub struct SpotlightEngine {
    binary: PathBuf,
}

impl Default for SpotlightEngine {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("mdfind"),
        }
    }
}

impl SpotlightEngine {
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl QueryEngine for SpotlightEngine {
    fn engine_name(&self) -> &'static str {
        "spotlight"
    }

    fn start(&self, spec: &QuerySpec, cancel: CancelToken) -> Result<ResultStream, QueryError> {
        let mut command = Command::new(&self.binary);
        if let Some(scope) = &spec.scope {
            command.arg("-onlyin").arg(scope);
        }
        command
            .arg(spotlight_folder_query(&spec.text))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = command
            .spawn()
            .map_err(|e| QueryError::Unavailable(format!("{}: {e}", self.binary.display())))?;
        let Some(stdout) = child.stdout.take() else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(QueryError::Engine("mdfind stdout was not captured".to_string()));
        };

        let stream = SpotlightStream {
            child,
            lines: BufReader::new(stdout).lines(),
            finished: false,
        };
        Ok(guard(stream, spec, cancel))
    }
}

struct SpotlightStream {
    child: Child,
    lines: Lines<BufReader<ChildStdout>>,
    finished: bool,
}

impl Iterator for SpotlightStream {
    type Item = Result<SearchResult, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        loop {
            match self.lines.next() {
                Some(Ok(line)) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    // Entries can disappear between indexing and stat.
                    if let Ok(result) = SearchResult::from_path(Path::new(trimmed)) {
                        return Some(Ok(result));
                    }
                }
                Some(Err(error)) => {
                    self.finished = true;
                    return Some(Err(QueryError::Io(error.to_string())));
                }
                None => {
                    self.finished = true;
                    return match self.child.wait() {
                        Ok(status) if status.success() => None,
                        Ok(status) => Some(Err(QueryError::Engine(format!(
                            "mdfind exited with {status}"
                        )))),
                        Err(error) => Some(Err(QueryError::Io(error.to_string()))),
                    };
                }
            }
        }
    }
}

impl Drop for SpotlightStream {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
            let _ = self.child.wait();
        }
    }
}

pub fn spotlight_folder_query(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.trim().chars() {
        if matches!(ch, '\'' | '"' | '\\' | '*') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    format!("kMDItemContentType == 'public.folder' && kMDItemFSName == '*{escaped}*'cd")
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{is_within_scope, name_matches, spotlight_folder_query};

    #[test]
    fn name_match_is_case_insensitive_substring() {
        assert!(name_matches("Projects", "proj"));
        assert!(name_matches("my PROJ", "Proj"));
        assert!(!name_matches("Documents", "proj"));
        assert!(!name_matches("Projects", "   "));
    }

    #[test]
    fn scope_excludes_itself_and_siblings_with_shared_prefix() {
        let scope = Path::new("/Users/me");
        assert!(is_within_scope(Path::new("/Users/me/Proj"), Some(scope)));
        assert!(!is_within_scope(Path::new("/Users/me"), Some(scope)));
        assert!(!is_within_scope(Path::new("/Users/meg/Proj"), Some(scope)));
        assert!(is_within_scope(Path::new("/anything"), None));
    }

    #[test]
    fn spotlight_query_escapes_quotes_and_wildcards() {
        let query = spotlight_folder_query("it's*");
        assert_eq!(
            query,
            "kMDItemContentType == 'public.folder' && kMDItemFSName == '*it\\'s\\**'cd"
        );
    }
}
