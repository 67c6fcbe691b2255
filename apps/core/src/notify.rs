use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ToastStyle {
    Success,
    Failure,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notification {
    pub style: ToastStyle,
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            style: ToastStyle::Success,
            title: title.into(),
            message: message.into(),
        }
    }

    pub fn failure(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            style: ToastStyle::Failure,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Fire-and-forget feedback surface of the host launcher.
pub trait Notifier {
    fn toast(&mut self, notification: &Notification);
    fn hud(&mut self, message: &str);
    fn close_window(&mut self);
}

/// Blocking confirm-or-cancel prompt shown once per colliding file name.
pub trait OverwritePrompt {
    fn confirm_overwrite(&mut self, file_name: &str, destination_dir: &Path) -> bool;
}

pub const OVERWRITE_TITLE: &str = "Overwrite the existing file?";

pub fn overwrite_message(file_name: &str, destination_dir: &Path) -> String {
    format!("{file_name} already exists in {}", destination_dir.display())
}

/// Collects everything it is told; the JSON transport returns the collection to its host.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    pub toasts: Vec<Notification>,
    pub huds: Vec<String>,
    pub close_requested: bool,
}

impl Notifier for RecordingNotifier {
    fn toast(&mut self, notification: &Notification) {
        self.toasts.push(notification.clone());
    }

    fn hud(&mut self, message: &str) {
        self.huds.push(message.to_string());
    }

    fn close_window(&mut self) {
        self.close_requested = true;
    }
}

/// Answers every prompt the same way and remembers which files were asked about.
#[derive(Debug, Clone)]
pub struct FixedAnswerPrompt {
    answer: bool,
    asked: Vec<String>,
}

impl FixedAnswerPrompt {
    pub fn new(answer: bool) -> Self {
        Self {
            answer,
            asked: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl OverwritePrompt for FixedAnswerPrompt {
    fn confirm_overwrite(&mut self, file_name: &str, _destination_dir: &Path) -> bool {
        self.asked.push(file_name.to_string());
        self.answer
    }
}

/// Answers by file name, falling back to `default` for names it has no entry for.
#[derive(Debug, Clone)]
pub struct AnswerMapPrompt {
    answers: BTreeMap<String, bool>,
    default: bool,
    asked: Vec<String>,
}

impl AnswerMapPrompt {
    pub fn new(answers: BTreeMap<String, bool>, default: bool) -> Self {
        Self {
            answers,
            default,
            asked: Vec::new(),
        }
    }

    pub fn asked(&self) -> &[String] {
        &self.asked
    }
}

impl OverwritePrompt for AnswerMapPrompt {
    fn confirm_overwrite(&mut self, file_name: &str, _destination_dir: &Path) -> bool {
        self.asked.push(file_name.to_string());
        self.answers.get(file_name).copied().unwrap_or(self.default)
    }
}

/// Terminal notifier writing one line per event.
pub struct ConsoleNotifier<W: Write> {
    out: W,
}

impl<W: Write> ConsoleNotifier<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Notifier for ConsoleNotifier<W> {
    fn toast(&mut self, notification: &Notification) {
        let marker = match notification.style {
            ToastStyle::Success => "ok",
            ToastStyle::Failure => "failed",
        };
        let _ = if notification.message.is_empty() {
            writeln!(self.out, "[{marker}] {}", notification.title)
        } else {
            writeln!(
                self.out,
                "[{marker}] {}: {}",
                notification.title, notification.message
            )
        };
    }

    fn hud(&mut self, message: &str) {
        let _ = writeln!(self.out, "{message}");
    }

    fn close_window(&mut self) {
        let _ = self.out.flush();
    }
}

/// Asks on `out` and reads a y/n answer from `input`. Anything but yes declines.
pub struct LinePrompt<R: BufRead, W: Write> {
    input: R,
    out: W,
}

impl<R: BufRead, W: Write> LinePrompt<R, W> {
    pub fn new(input: R, out: W) -> Self {
        Self { input, out }
    }
}

impl<R: BufRead, W: Write> OverwritePrompt for LinePrompt<R, W> {
    fn confirm_overwrite(&mut self, file_name: &str, destination_dir: &Path) -> bool {
        let _ = write!(
            self.out,
            "{OVERWRITE_TITLE} {} [y/N] ",
            overwrite_message(file_name, destination_dir)
        );
        let _ = self.out.flush();

        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(_) => is_yes(&answer),
            Err(_) => false,
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
