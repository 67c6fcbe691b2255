use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use crate::config::{self, ConfigError, EngineKind};
use crate::controller::QueryController;
use crate::logging;
use crate::model::SearchResult;
use crate::notify::{ConsoleNotifier, FixedAnswerPrompt, LinePrompt, OverwritePrompt};
use crate::query_engine::engine_for;
use crate::selection::{ExplicitSelection, FinderSelection, SelectionProvider};
use crate::session::{Session, SessionError};
use crate::transfer::TransferMode;
use crate::transport::handle_json;

#[derive(Debug)]
pub enum RuntimeError {
    Config(ConfigError),
    Session(SessionError),
    Io(io::Error),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(error) => write!(f, "config error: {error}"),
            Self::Session(error) => write!(f, "{error}"),
            Self::Io(error) => write!(f, "io error: {error}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<ConfigError> for RuntimeError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<SessionError> for RuntimeError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

impl From<io::Error> for RuntimeError {
    fn from(value: io::Error) -> Self {
        Self::Io(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Transfer {
        mode: TransferMode,
        destination: Option<PathBuf>,
        query: Option<String>,
        scope: Option<PathBuf>,
        assume_yes: bool,
        files: Vec<PathBuf>,
    },
    Search {
        text: String,
        scope: Option<PathBuf>,
    },
    Browse {
        dir: PathBuf,
    },
    Recents,
    Serve,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliOptions {
    pub command: Command,
    pub config_path: Option<PathBuf>,
    pub engine: Option<EngineKind>,
}

pub const USAGE: &str = "usage: folderdrop-core <move|copy> [--to DIR] [--query TEXT] [--in DIR] [--yes] [FILES...]
       folderdrop-core search TEXT [--in DIR]
       folderdrop-core browse DIR
       folderdrop-core recents
       folderdrop-core serve
global options: --config PATH, --engine auto|spotlight|walk";

pub fn parse_cli_args(args: &[String]) -> Result<CliOptions, String> {
    let Some((verb, rest)) = args.split_first() else {
        return Err(USAGE.to_string());
    };

    let mut config_path = None;
    let mut engine = None;
    let mut destination = None;
    let mut query = None;
    let mut scope = None;
    let mut assume_yes = false;
    let mut positional = Vec::new();

    let mut iter = rest.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" => config_path = Some(PathBuf::from(flag_value(&mut iter, arg)?)),
            "--engine" => {
                let value = flag_value(&mut iter, arg)?;
                engine = Some(
                    EngineKind::parse(value)
                        .ok_or_else(|| format!("unknown engine '{value}'"))?,
                );
            }
            "--to" => destination = Some(PathBuf::from(flag_value(&mut iter, arg)?)),
            "--query" => query = Some(flag_value(&mut iter, arg)?.to_string()),
            "--in" => scope = Some(PathBuf::from(flag_value(&mut iter, arg)?)),
            "--yes" | "-y" => assume_yes = true,
            "--help" | "-h" => return Err(USAGE.to_string()),
            flag if flag.starts_with("--") => return Err(format!("unknown option '{flag}'")),
            value => positional.push(value.to_string()),
        }
    }

    let command = match verb.as_str() {
        "move" | "copy" => Command::Transfer {
            mode: TransferMode::parse(verb).ok_or_else(|| USAGE.to_string())?,
            destination,
            query,
            scope,
            assume_yes,
            files: positional.into_iter().map(PathBuf::from).collect(),
        },
        "search" => {
            let text = positional.join(" ");
            if text.trim().is_empty() {
                return Err("search requires query text".to_string());
            }
            Command::Search { text, scope }
        }
        "browse" => match positional.as_slice() {
            [dir] => Command::Browse {
                dir: PathBuf::from(dir),
            },
            _ => return Err("browse requires exactly one directory".to_string()),
        },
        "recents" => Command::Recents,
        "serve" => Command::Serve,
        other => return Err(format!("unknown command '{other}'\n{USAGE}")),
    };

    Ok(CliOptions {
        command,
        config_path,
        engine,
    })
}

fn flag_value<'a>(
    iter: &mut std::slice::Iter<'a, String>,
    flag: &str,
) -> Result<&'a str, String> {
    iter.next()
        .map(String::as_str)
        .ok_or_else(|| format!("{flag} requires a value"))
}

pub fn run_with_options(options: CliOptions) -> Result<(), RuntimeError> {
    if let Err(error) = logging::init() {
        eprintln!("[folderdrop-core] logging disabled: {error}");
    }

    let mut config = config::load(options.config_path.as_deref())?;
    if let Some(engine) = options.engine {
        config.engine = engine;
    }
    if !config.config_path.exists() {
        config::save(&config)?;
        logging::info(&format!(
            "wrote default config to {}",
            config.config_path.display()
        ));
    }

    let engine = engine_for(config.engine);
    logging::info(&format!(
        "startup engine={} config_path={} kv_db_path={}",
        engine.engine_name(),
        config.config_path.display(),
        config.kv_db_path.display()
    ));
    let mut session = Session::new(config, engine)?;
    let stdout = io::stdout();
    let mut notifier = ConsoleNotifier::new(stdout.lock());

    match options.command {
        Command::Search { text, scope } => {
            if let Some(scope) = scope {
                session.navigate_to(&scope, &mut notifier)?;
            }
            session.search(&text, &mut notifier)?;
            session.finish_query(&mut notifier)?;
            print_results(&mut io::stdout(), session.controller(), false)?;
        }
        Command::Browse { dir } => {
            session.navigate_to(&dir, &mut notifier)?;
            print_results(&mut io::stdout(), session.controller(), false)?;
        }
        Command::Recents => {
            let mut out = io::stdout();
            for recent in session.recent_folders() {
                writeln!(out, "{}\t{}", recent.folder.path.display(), recent.last_used_epoch_secs)?;
            }
        }
        Command::Serve => serve(&mut session)?,
        Command::Transfer {
            mode,
            destination,
            query,
            scope,
            assume_yes,
            files,
        } => {
            let provider: Box<dyn SelectionProvider> = if files.is_empty() {
                Box::new(FinderSelection)
            } else {
                Box::new(ExplicitSelection::relative_to(&std::env::current_dir()?, files))
            };
            session.load_selection(provider.as_ref(), &mut notifier)?;

            if let Some(scope) = scope {
                session.navigate_to(&scope, &mut notifier)?;
            }

            if let Some(destination) = destination {
                // Listing the destination makes it a known folder for the recents list.
                // A missing one is left to the transfer, which reports it as invalid.
                let destination = if destination.is_dir() {
                    session.navigate_to(&destination, &mut notifier)?;
                    session
                        .controller()
                        .browse_path()
                        .map(Path::to_path_buf)
                        .unwrap_or(destination)
                } else {
                    destination
                };
                let mut prompt = build_prompt(assume_yes);
                session.transfer_to(mode, &destination, prompt.as_mut(), &mut notifier)?;
                return Ok(());
            }

            if let Some(query) = query {
                session.search(&query, &mut notifier)?;
                session.finish_query(&mut notifier)?;
            }
            drop(notifier);
            interact(&mut session, mode, assume_yes)?;
        }
    }

    Ok(())
}

fn build_prompt(assume_yes: bool) -> Box<dyn OverwritePrompt> {
    if assume_yes {
        Box::new(FixedAnswerPrompt::new(true))
    } else {
        Box::new(LinePrompt::new(io::stdin().lock(), io::stdout()))
    }
}

/// JSON transport: one request per stdin line, one response per stdout line.
fn serve(session: &mut Session) -> Result<(), RuntimeError> {
    let stdin = io::stdin();
    let mut out = io::stdout();
    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        writeln!(out, "{}", handle_json(session, &line))?;
        out.flush()?;
    }
    Ok(())
}

const INTERACTIVE_HELP: &str = "type to search, :cd DIR, :up, :open N, :pick N, :here, :recent N, :forget N, :details, :quit";

fn interact(session: &mut Session, mode: TransferMode, assume_yes: bool) -> Result<(), RuntimeError> {
    let stdin = io::stdin();
    let mut out = io::stdout();
    writeln!(
        out,
        "{} {} selected; {INTERACTIVE_HELP}",
        capitalize(mode.verb()),
        count_label(session.selection().len())
    )?;

    loop {
        render(&mut out, session)?;
        write!(out, "> ")?;
        out.flush()?;

        let mut line = String::new();
        if stdin.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let input = line.trim_end_matches(['\r', '\n']);
        let mut notifier = ConsoleNotifier::new(io::stdout());

        let (command, argument) = match input.strip_prefix(':') {
            Some(rest) => {
                let mut parts = rest.splitn(2, ' ');
                (
                    parts.next().unwrap_or_default(),
                    parts.next().unwrap_or_default().trim(),
                )
            }
            None => {
                if session.search(input, &mut notifier).is_ok() {
                    let _ = session.finish_query(&mut notifier);
                }
                continue;
            }
        };

        let destination = match command {
            "q" | "quit" => return Ok(()),
            "cd" => {
                let _ = session.navigate_to(Path::new(argument), &mut notifier);
                None
            }
            "up" => {
                let _ = session.navigate_up(&mut notifier);
                None
            }
            "open" => {
                let picked = pick_result(session.controller().results(), argument)
                    .map(|folder| folder.path.clone());
                if let Some(folder) = picked {
                    let _ = session.navigate_to(&folder, &mut notifier);
                } else {
                    writeln!(out, "no result {argument}")?;
                }
                None
            }
            "details" => {
                session.toggle_details()?;
                None
            }
            "pick" => pick_result(session.controller().results(), argument).map(|r| r.path.clone()),
            "recent" => {
                let recents = session.recent_folders();
                argument
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|index| recents.get(index))
                    .map(|recent| recent.folder.path.clone())
            }
            "forget" => {
                let recents = session.recent_folders();
                let picked = argument
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| n.checked_sub(1))
                    .and_then(|index| recents.get(index));
                match picked {
                    Some(recent) => {
                        session.forget_recent(recent.path())?;
                    }
                    None => writeln!(out, "no recent folder {argument}")?,
                }
                None
            }
            "here" => session.controller().browse_path().map(Path::to_path_buf),
            _ => {
                writeln!(out, "{INTERACTIVE_HELP}")?;
                None
            }
        };

        let Some(destination) = destination else {
            continue;
        };

        let mut prompt = build_prompt(assume_yes);
        if let Ok(summary) = session.transfer_to(mode, &destination, prompt.as_mut(), &mut notifier) {
            if summary.any_succeeded() {
                return Ok(());
            }
        }
    }
}

fn pick_result<'a>(results: &'a [SearchResult], argument: &str) -> Option<&'a SearchResult> {
    argument
        .parse::<usize>()
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| results.get(index))
}

fn render(out: &mut impl Write, session: &Session) -> io::Result<()> {
    let controller = session.controller();
    let show_details = session.show_details();

    if let Some(current) = controller.browse_path() {
        writeln!(out, "in {}  (:up for {})", current.display(), crate::browse::parent_of(current).display())?;
    }

    if controller.search_text().is_empty() {
        let recents = session.recent_folders();
        if !recents.is_empty() {
            writeln!(out, "Recent Folders")?;
            for (index, recent) in recents.iter().enumerate() {
                writeln!(
                    out,
                    "  r{}. {}  {}",
                    index + 1,
                    recent.folder.display_name,
                    recent.folder.path.display()
                )?;
            }
        }
    }

    print_results(out, controller, show_details)
}

fn print_results(out: &mut impl Write, controller: &QueryController, show_details: bool) -> io::Result<()> {
    let heading = if controller.browse_path().is_some() && controller.search_text().is_empty() {
        "Subfolders"
    } else if controller.search_text().is_empty() {
        "Search for a folder"
    } else {
        "Search Results"
    };
    writeln!(out, "{heading}")?;

    for (index, result) in controller.results().iter().enumerate() {
        writeln!(out, "  {}. {}  {}", index + 1, result.display_name, result.path.display())?;
        if show_details {
            writeln!(
                out,
                "       modified={} last_used={} created={}",
                epoch_label(result.modified_epoch_secs),
                epoch_label(result.last_accessed_epoch_secs),
                epoch_label(result.created_epoch_secs)
            )?;
        }
    }
    Ok(())
}

fn epoch_label(value: Option<i64>) -> String {
    value.map(|secs| secs.to_string()).unwrap_or_else(|| "-".to_string())
}

fn count_label(count: usize) -> String {
    if count == 1 {
        "1 file".to_string()
    } else {
        format!("{count} files")
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
