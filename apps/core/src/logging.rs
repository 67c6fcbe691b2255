use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use crate::model::now_epoch_secs;

const LOG_STEM: &str = "folderdrop";
const MAX_LOG_BYTES: u64 = 1_000_000;
const MAX_ARCHIVES: usize = 5;

static LOGGER: OnceLock<Logger> = OnceLock::new();
static PANIC_HOOK_INSTALLED: OnceLock<()> = OnceLock::new();

struct Logger {
    file: Mutex<File>,
}

pub fn logs_dir() -> PathBuf {
    crate::config::stable_app_data_dir().join("logs")
}

pub fn init() -> Result<(), std::io::Error> {
    init_in(&logs_dir())
}

/// Opens the log under `log_dir`. Later calls keep the first logger.
pub fn init_in(log_dir: &Path) -> Result<(), std::io::Error> {
    if LOGGER.get().is_some() {
        return Ok(());
    }

    fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(format!("{LOG_STEM}.log"));
    rotate_if_needed(&log_path, log_dir)?;

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    let _ = LOGGER.set(Logger {
        file: Mutex::new(file),
    });

    install_panic_hook();
    Ok(())
}

pub fn info(message: &str) {
    write_line("INFO", message);
}

pub fn warn(message: &str) {
    write_line("WARN", message);
}

pub fn error(message: &str) {
    write_line("ERROR", message);
}

fn write_line(level: &str, message: &str) {
    let Some(logger) = LOGGER.get() else {
        return;
    };
    let Ok(mut file) = logger.file.lock() else {
        return;
    };

    let line = format_line(now_epoch_secs(), std::process::id(), level, message);
    let _ = file.write_all(line.as_bytes());
    let _ = file.flush();
}

/// Every launcher invocation and the `serve` process share one log file; the pid
/// keeps their lines apart.
fn format_line(epoch_secs: i64, pid: u32, level: &str, message: &str) -> String {
    format!("[{epoch_secs}] [pid {pid}] [{level}] {message}\n")
}

fn rotate_if_needed(log_path: &Path, log_dir: &Path) -> Result<(), std::io::Error> {
    let meta = match fs::metadata(log_path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };

    if meta.len() < MAX_LOG_BYTES {
        return Ok(());
    }

    let archived = log_dir.join(format!("{LOG_STEM}-{}.log", now_epoch_secs()));
    fs::rename(log_path, archived)?;
    prune_old_archives(log_dir)
}

fn prune_old_archives(log_dir: &Path) -> Result<(), std::io::Error> {
    let mut archives = fs::read_dir(log_dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| is_archive_name(path))
        .collect::<Vec<_>>();

    archives.sort();
    let excess = archives.len().saturating_sub(MAX_ARCHIVES);
    for oldest in archives.drain(..excess) {
        let _ = fs::remove_file(oldest);
    }
    Ok(())
}

fn is_archive_name(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with(&format!("{LOG_STEM}-")) && n.ends_with(".log"))
        .unwrap_or(false)
}

fn install_panic_hook() {
    let _ = PANIC_HOOK_INSTALLED.get_or_init(|| {
        let prior = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |panic_info| {
            let location = panic_info
                .location()
                .map(|l| format!("{}:{}", l.file(), l.line()))
                .unwrap_or_else(|| "unknown".to_string());
            let payload = panic_info
                .payload()
                .downcast_ref::<&str>()
                .map(|s| (*s).to_string())
                .or_else(|| panic_info.payload().downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "panic payload unavailable".to_string());
            error(&format!("panic at {location}: {payload}"));
            prior(panic_info);
        }));
    });
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{format_line, is_archive_name, logs_dir};

    #[test]
    fn logs_dir_uses_stable_app_data_layout() {
        let dir = logs_dir();
        assert!(dir.ends_with("logs"));
    }

    #[test]
    fn archive_names_exclude_live_log() {
        assert!(is_archive_name(Path::new("/x/folderdrop-1700000000.log")));
        assert!(!is_archive_name(Path::new("/x/folderdrop.log")));
        assert!(!is_archive_name(Path::new("/x/other-1.log")));
    }

    #[test]
    fn lines_carry_timestamp_pid_and_level() {
        assert_eq!(
            format_line(1_700_000_000, 4242, "WARN", "copy /a/x.txt -> /b failed"),
            "[1700000000] [pid 4242] [WARN] copy /a/x.txt -> /b failed\n"
        );
    }
}
