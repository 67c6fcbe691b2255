use std::fmt::{Display, Formatter};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::logging;
use crate::notify::{Notification, Notifier, OverwritePrompt};

pub const SAME_LOCATION_MESSAGE: &str = "The source and destination file are the same";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransferMode {
    Move,
    Copy,
}

impl TransferMode {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "move" | "mv" => Some(Self::Move),
            "copy" | "cp" => Some(Self::Copy),
            _ => None,
        }
    }

    pub fn verb(self) -> &'static str {
        match self {
            Self::Move => "move",
            Self::Copy => "copy",
        }
    }

    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Move => "Moved",
            Self::Copy => "Copied",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum FileFailure {
    /// The user declined to overwrite an existing entry.
    Skipped,
    SameLocation,
    Io(String),
}

impl Display for FileFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Skipped => write!(f, "skipped by user"),
            Self::SameLocation => write!(f, "source and destination are the same"),
            Self::Io(message) => write!(f, "{message}"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferOutcome {
    pub source: PathBuf,
    pub destination: Option<PathBuf>,
    pub failure: Option<FileFailure>,
}

impl TransferOutcome {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }

    fn ok(source: &Path, destination: PathBuf) -> Self {
        Self {
            source: source.to_path_buf(),
            destination: Some(destination),
            failure: None,
        }
    }

    fn failed(source: &Path, destination: Option<PathBuf>, failure: FileFailure) -> Self {
        Self {
            source: source.to_path_buf(),
            destination,
            failure: Some(failure),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransferSummary {
    pub success_count: usize,
    pub fail_count: usize,
    pub outcomes: Vec<TransferOutcome>,
}

impl TransferSummary {
    fn push(&mut self, outcome: TransferOutcome) {
        if outcome.succeeded() {
            self.success_count += 1;
        } else {
            self.fail_count += 1;
        }
        self.outcomes.push(outcome);
    }

    pub fn any_succeeded(&self) -> bool {
        self.success_count > 0
    }

    /// The single aggregate toast for a finished batch.
    pub fn notification(&self, mode: TransferMode) -> Notification {
        if self.success_count == 0 {
            return Notification::failure(
                format!("Failed to {} files", mode.verb()),
                format!("No files were {} successfully", past_participle(mode)),
            );
        }

        let title = format!("{} {}", mode.past_tense(), count_files(self.success_count));
        if self.fail_count == 0 {
            Notification::success(title, "")
        } else {
            Notification::failure(
                title,
                format!("Failed to {} {}", mode.verb(), count_files(self.fail_count)),
            )
        }
    }
}

fn past_participle(mode: TransferMode) -> &'static str {
    match mode {
        TransferMode::Move => "moved",
        TransferMode::Copy => "copied",
    }
}

fn count_files(count: usize) -> String {
    if count == 1 {
        "1 file".to_string()
    } else {
        format!("{count} files")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferError {
    DestinationInvalid(PathBuf),
}

impl TransferError {
    pub fn notification(&self) -> Notification {
        match self {
            Self::DestinationInvalid(_) => {
                Notification::failure("Error", "Destination folder does not exist")
            }
        }
    }
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DestinationInvalid(path) => {
                write!(f, "destination is not a directory: {}", path.display())
            }
        }
    }
}

impl std::error::Error for TransferError {}

/// Moves or copies each source into `destination_dir`, one file at a time.
/// Per-file failures are recorded in the summary and never stop the batch.
///
/// A source that already lives at its target (same path or same inode) fails with
/// `SameLocation` before any overwrite prompt, so dropping a file onto its own folder
/// never asks to overwrite it.
pub fn transfer(
    mode: TransferMode,
    sources: &[PathBuf],
    destination_dir: &Path,
    prompt: &mut dyn OverwritePrompt,
    notifier: &mut dyn Notifier,
) -> Result<TransferSummary, TransferError> {
    if !destination_dir.is_dir() {
        return Err(TransferError::DestinationInvalid(
            destination_dir.to_path_buf(),
        ));
    }

    let mut summary = TransferSummary::default();
    for source in sources {
        let outcome = transfer_one(mode, source, destination_dir, prompt, notifier);
        if let Some(failure) = &outcome.failure {
            logging::warn(&format!(
                "{} {} -> {} failed: {failure}",
                mode.verb(),
                source.display(),
                destination_dir.display()
            ));
        }
        summary.push(outcome);
    }

    logging::info(&format!(
        "{} batch into {}: {} succeeded, {} failed",
        mode.verb(),
        destination_dir.display(),
        summary.success_count,
        summary.fail_count
    ));
    Ok(summary)
}

fn transfer_one(
    mode: TransferMode,
    source: &Path,
    destination_dir: &Path,
    prompt: &mut dyn OverwritePrompt,
    notifier: &mut dyn Notifier,
) -> TransferOutcome {
    let Some(file_name) = source.file_name() else {
        return TransferOutcome::failed(
            source,
            None,
            FileFailure::Io(format!("{} has no file name", source.display())),
        );
    };
    let target = destination_dir.join(file_name);

    let source_meta = match fs::symlink_metadata(source) {
        Ok(meta) => meta,
        Err(error) => {
            return TransferOutcome::failed(source, Some(target), FileFailure::Io(error.to_string()))
        }
    };

    if same_location(source, &target) {
        notifier.hud(SAME_LOCATION_MESSAGE);
        return TransferOutcome::failed(source, Some(target), FileFailure::SameLocation);
    }

    if source_meta.is_dir() && is_inside(destination_dir, source) {
        return TransferOutcome::failed(
            source,
            Some(target),
            FileFailure::Io("cannot place a folder inside itself".to_string()),
        );
    }

    if let Ok(existing) = fs::symlink_metadata(&target) {
        let name = file_name.to_string_lossy();
        if !prompt.confirm_overwrite(&name, destination_dir) {
            return TransferOutcome::failed(source, Some(target), FileFailure::Skipped);
        }
        if let Err(error) = clear_target(&target, &existing, source_meta.is_dir()) {
            return TransferOutcome::failed(source, Some(target), FileFailure::Io(error.to_string()));
        }
    }

    let result = match mode {
        TransferMode::Move => move_entry(source, &target, source_meta.is_dir()),
        TransferMode::Copy => copy_entry(source, &target, source_meta.is_dir()),
    };

    match result {
        Ok(()) => TransferOutcome::ok(source, target),
        Err(error) => TransferOutcome::failed(source, Some(target), FileFailure::Io(error.to_string())),
    }
}

/// True when both paths resolve to the same filesystem entry, including two hard links
/// to one file.
pub fn same_location(source: &Path, target: &Path) -> bool {
    match (fs::canonicalize(source), fs::canonicalize(target)) {
        (Ok(a), Ok(b)) if a == b => true,
        _ => same_file_identity(source, target),
    }
}

#[cfg(unix)]
fn same_file_identity(source: &Path, target: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::metadata(source), fs::metadata(target)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

// TODO: compare volume serial and file index once `windows_by_handle` is stable.
#[cfg(not(unix))]
fn same_file_identity(_source: &Path, _target: &Path) -> bool {
    false
}

fn is_inside(candidate: &Path, folder: &Path) -> bool {
    match (fs::canonicalize(candidate), fs::canonicalize(folder)) {
        (Ok(candidate), Ok(folder)) => candidate.starts_with(folder),
        _ => false,
    }
}

/// Makes room for the incoming entry. A file replacing a file is overwritten in place.
fn clear_target(target: &Path, existing: &fs::Metadata, source_is_dir: bool) -> io::Result<()> {
    if existing.is_dir() {
        fs::remove_dir_all(target)
    } else if source_is_dir {
        fs::remove_file(target)
    } else {
        Ok(())
    }
}

fn move_entry(source: &Path, target: &Path, is_dir: bool) -> io::Result<()> {
    match fs::rename(source, target) {
        Ok(()) => Ok(()),
        Err(error) if is_cross_device(&error) => {
            copy_entry(source, target, is_dir)?;
            if is_dir {
                fs::remove_dir_all(source)
            } else {
                fs::remove_file(source)
            }
        }
        Err(error) => Err(error),
    }
}

fn copy_entry(source: &Path, target: &Path, is_dir: bool) -> io::Result<()> {
    if !is_dir {
        fs::copy(source, target)?;
        return Ok(());
    }

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry
            .path()
            .strip_prefix(source)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let dest = target.join(relative);
        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&dest)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &dest)?;
        } else {
            fs::copy(entry.path(), &dest)?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(link: &Path, dest: &Path) -> io::Result<()> {
    let pointee = fs::read_link(link)?;
    std::os::unix::fs::symlink(pointee, dest)
}

#[cfg(not(unix))]
fn copy_symlink(link: &Path, dest: &Path) -> io::Result<()> {
    fs::copy(link, dest).map(|_| ())
}

#[cfg(unix)]
fn is_cross_device(error: &io::Error) -> bool {
    // EXDEV
    error.raw_os_error() == Some(18)
}

#[cfg(windows)]
fn is_cross_device(error: &io::Error) -> bool {
    // ERROR_NOT_SAME_DEVICE
    error.raw_os_error() == Some(17)
}

#[cfg(not(any(unix, windows)))]
fn is_cross_device(_error: &io::Error) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::{count_files, TransferMode, TransferSummary};
    use crate::notify::ToastStyle;

    #[test]
    fn file_counts_are_pluralized() {
        assert_eq!(count_files(1), "1 file");
        assert_eq!(count_files(3), "3 files");
    }

    #[test]
    fn partial_success_is_reported_as_failure_with_counts() {
        let summary = TransferSummary {
            success_count: 2,
            fail_count: 1,
            outcomes: Vec::new(),
        };
        let note = summary.notification(TransferMode::Copy);
        assert_eq!(note.style, ToastStyle::Failure);
        assert_eq!(note.title, "Copied 2 files");
        assert_eq!(note.message, "Failed to copy 1 file");
    }

    #[test]
    fn total_failure_has_distinct_title() {
        let summary = TransferSummary {
            success_count: 0,
            fail_count: 2,
            outcomes: Vec::new(),
        };
        let note = summary.notification(TransferMode::Move);
        assert_eq!(note.title, "Failed to move files");
        assert_eq!(note.message, "No files were moved successfully");
    }

    #[test]
    fn parses_mode_aliases() {
        assert_eq!(TransferMode::parse("MV"), Some(TransferMode::Move));
        assert_eq!(TransferMode::parse("copy"), Some(TransferMode::Copy));
        assert_eq!(TransferMode::parse("link"), None);
    }
}
