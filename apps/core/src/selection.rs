use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

use crate::notify::Notification;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    Empty,
    Unavailable(String),
}

impl SelectionError {
    pub fn notification(&self) -> Notification {
        match self {
            Self::Empty => {
                Notification::failure("No files selected", "Please select files in Finder first")
            }
            Self::Unavailable(_) => {
                Notification::failure("Error", "Failed to get selected files from Finder")
            }
        }
    }
}

impl Display for SelectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "no files selected"),
            Self::Unavailable(message) => write!(f, "selection unavailable: {message}"),
        }
    }
}

impl std::error::Error for SelectionError {}

pub trait SelectionProvider {
    fn provider_name(&self) -> &'static str;
    fn selected_paths(&self) -> Result<Vec<PathBuf>, SelectionError>;
}

/// Selected paths, or `SelectionError::Empty` when the provider has none.
pub fn require_selection(provider: &dyn SelectionProvider) -> Result<Vec<PathBuf>, SelectionError> {
    let paths = provider.selected_paths()?;
    if paths.is_empty() {
        return Err(SelectionError::Empty);
    }
    Ok(paths)
}

/// Paths handed over directly, e.g. as command-line arguments. Relative paths are
/// resolved against `base`.
pub struct ExplicitSelection {
    paths: Vec<PathBuf>,
}

impl ExplicitSelection {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }

    pub fn relative_to(base: &Path, paths: Vec<PathBuf>) -> Self {
        Self {
            paths: paths
                .into_iter()
                .map(|path| if path.is_absolute() { path } else { base.join(path) })
                .collect(),
        }
    }
}

impl SelectionProvider for ExplicitSelection {
    fn provider_name(&self) -> &'static str {
        "explicit"
    }

    fn selected_paths(&self) -> Result<Vec<PathBuf>, SelectionError> {
        Ok(self.paths.clone())
    }
}

/// Current Finder selection, read through AppleScript.
#[derive(Debug, Clone, Copy, Default)]
pub struct FinderSelection;

#[cfg(target_os = "macos")]
const FINDER_SELECTION_SCRIPT: [&str; 6] = [
    "tell application \"Finder\" to set sel to selection as alias list",
    "set out to \"\"",
    "repeat with f in sel",
    "set out to out & POSIX path of f & linefeed",
    "end repeat",
    "return out",
];

impl SelectionProvider for FinderSelection {
    fn provider_name(&self) -> &'static str {
        "finder"
    }

    #[cfg(target_os = "macos")]
    fn selected_paths(&self) -> Result<Vec<PathBuf>, SelectionError> {
        let mut command = std::process::Command::new("osascript");
        for line in FINDER_SELECTION_SCRIPT {
            command.arg("-e").arg(line);
        }
        let output = command
            .output()
            .map_err(|e| SelectionError::Unavailable(format!("failed to run osascript: {e}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(SelectionError::Unavailable(stderr.trim().to_string()));
        }
        Ok(parse_selection_output(&String::from_utf8_lossy(&output.stdout)))
    }

    #[cfg(not(target_os = "macos"))]
    fn selected_paths(&self) -> Result<Vec<PathBuf>, SelectionError> {
        Err(SelectionError::Unavailable(
            "file manager selection is only supported on macOS".to_string(),
        ))
    }
}

/// One POSIX path per line; folders come back with a trailing slash.
pub fn parse_selection_output(raw: &str) -> Vec<PathBuf> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let trimmed = line.trim_end_matches('/');
            if trimmed.is_empty() {
                PathBuf::from("/")
            } else {
                PathBuf::from(trimmed)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::parse_selection_output;

    #[test]
    fn parses_one_path_per_line_and_drops_trailing_slash() {
        let paths = parse_selection_output("/a/x.txt\n/a/folder/\n\n/\n");
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/a/x.txt"),
                PathBuf::from("/a/folder"),
                PathBuf::from("/"),
            ]
        );
    }
}
