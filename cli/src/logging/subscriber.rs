//! Tracing subscriber setup: console formatter, file layer, and initialisation.
use std::fs;
use std::io::Write as _;
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use tracing::Level;

use super::utils::{log_file_path, strip_ansi};

/// Event target for stage headers.
pub(super) const STAGE: &str = "sage::stage";
/// Event target for completed artifact actions.
pub(super) const SUCCESS: &str = "sage::success";
/// Event target for actions skipped because of `--dry-run`.
pub(super) const DRY_RUN: &str = "sage::dry_run";

/// How an event is rendered, derived from its level and target.
///
/// Both sinks share this so the console and the log file never disagree on
/// what an event is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Stage,
    Success,
    DryRun,
    Error,
    Warn,
    Info,
    Debug,
}

impl EventKind {
    fn classify(level: Level, target: &str) -> Self {
        match level {
            Level::ERROR => Self::Error,
            Level::WARN => Self::Warn,
            Level::INFO => match target {
                STAGE => Self::Stage,
                SUCCESS => Self::Success,
                DRY_RUN => Self::DryRun,
                _ => Self::Info,
            },
            _ => Self::Debug,
        }
    }

    /// Plain-text line for the log file. Stage headers stay flush with the
    /// timestamp; everything else is indented under them.
    fn file_line(self, time: &str, msg: &str) -> String {
        let tag = match self {
            Self::Stage => return format!("[{time}] ==> {msg}"),
            Self::Success => "[ok] ",
            Self::DryRun => "[dry run] ",
            Self::Error => "[error] ",
            Self::Warn => "[warn] ",
            Self::Debug => "[debug] ",
            Self::Info => "",
        };
        format!("[{time}]     {tag}{msg}")
    }

    /// Coloured console line in the installer's `[i]`/`[✓]`/`[!]`/`[✗]` style.
    fn console_line(self, msg: &str) -> String {
        match self {
            Self::Stage => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{msg}\x1b[0m"),
            Self::Success => format!("\x1b[32m[✓]\x1b[0m {msg}"),
            Self::DryRun => format!("  \x1b[33m[DRY RUN]\x1b[0m {msg}"),
            Self::Error => format!("\x1b[31m[✗]\x1b[0m {msg}"),
            Self::Warn => format!("\x1b[33m[!]\x1b[0m {msg}"),
            Self::Info => format!("\x1b[36m[i]\x1b[0m {msg}"),
            Self::Debug => format!("    \x1b[2m{msg}\x1b[0m"),
        }
    }
}

/// Pulls the `message` field out of an event.
#[derive(Default)]
struct Message(String);

impl tracing::field::Visit for Message {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.0.clear();
            self.0.push_str(value);
        }
    }
}

/// Classify `event` and extract its message.
fn read_event(event: &tracing::Event<'_>) -> (EventKind, String) {
    let metadata = event.metadata();
    let mut message = Message::default();
    event.record(&mut message);
    (
        EventKind::classify(*metadata.level(), metadata.target()),
        message.0,
    )
}

/// Banner written at the top of every log file.
fn run_header(command: &str, started: DateTime<Utc>) -> String {
    let version =
        option_env!("SAGE_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
    let rule = "=".repeat(42);
    format!(
        "{rule}\nSage {version} {command} {}\n{rule}\n",
        started.format("%Y-%m-%d %H:%M:%S")
    )
}

/// A [`tracing_subscriber::Layer`] that appends every event to the log file
/// of one command run, timestamped and without ANSI codes.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate `path`, write the run header for `command`, and keep the file
    /// open for appending.
    fn create(path: &Path, command: &str) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        file.write_all(run_header(command, Utc::now()).as_bytes())?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let (kind, msg) = read_event(event);
        let time = Utc::now().format("%H:%M:%S").to_string();
        let line = kind.file_line(&time, &strip_ansi(&msg));
        if let Ok(mut file) = self.file.lock() {
            writeln!(file, "{line}").ok();
        }
    }
}

/// Console [`tracing_subscriber::fmt::FormatEvent`] built on [`EventKind`].
struct ConsoleFormat;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormat
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let (kind, msg) = read_event(event);
        writeln!(writer, "{}", kind.console_line(&msg))
    }
}

/// Initialise the global [`tracing`] subscriber.
///
/// Console output goes to stdout (info and below) and stderr (warnings and
/// errors); every event at `DEBUG` and above is also appended to the log
/// file for `command`. If the log file cannot be created the run continues
/// with console output only. Must be called once, after target resolution.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let make_writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ConsoleFormat)
        .with_writer(make_writer)
        .with_filter(console_level);

    let file_layer = FileLayer::create(&log_file_path(command), command)
        .ok()
        .map(|layer| layer.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use tracing_subscriber::layer::SubscriberExt as _;

    #[test]
    fn classify_uses_target_only_at_info() {
        assert_eq!(EventKind::classify(Level::INFO, STAGE), EventKind::Stage);
        assert_eq!(EventKind::classify(Level::INFO, SUCCESS), EventKind::Success);
        assert_eq!(EventKind::classify(Level::INFO, DRY_RUN), EventKind::DryRun);
        assert_eq!(EventKind::classify(Level::INFO, "sage"), EventKind::Info);
        assert_eq!(EventKind::classify(Level::WARN, STAGE), EventKind::Warn);
        assert_eq!(EventKind::classify(Level::ERROR, SUCCESS), EventKind::Error);
        assert_eq!(EventKind::classify(Level::TRACE, "sage"), EventKind::Debug);
    }

    #[test]
    fn file_lines_indent_everything_but_stages() {
        assert_eq!(
            EventKind::Stage.file_line("10:00:00", "Install"),
            "[10:00:00] ==> Install"
        );
        assert_eq!(
            EventKind::Success.file_line("10:00:00", "persona"),
            "[10:00:00]     [ok] persona"
        );
        assert_eq!(
            EventKind::Info.file_line("10:00:00", "target claude"),
            "[10:00:00]     target claude"
        );
    }

    #[test]
    fn console_lines_carry_markers() {
        assert!(EventKind::Warn.console_line("x").contains("[!]"));
        assert!(EventKind::Error.console_line("x").contains("[✗]"));
        assert!(EventKind::DryRun.console_line("x").contains("[DRY RUN]"));
    }

    #[test]
    fn run_header_names_command_and_start() {
        let started = DateTime::parse_from_rfc3339("2026-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        let header = run_header("install", started);
        let lines: Vec<&str> = header.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("Sage "), "{header}");
        assert!(lines[1].ends_with(" install 2026-01-02 03:04:05"), "{header}");
        assert_eq!(lines[0], lines[2]);
    }

    #[test]
    fn file_layer_writes_plain_lines_after_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache/sage/status.log");
        let layer = FileLayer::create(&path, "status").unwrap();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(target: STAGE, "\x1b[1mStatus\x1b[0m");
            tracing::warn!("codex not installed");
        });

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5, "{text}");
        assert!(lines[3].ends_with("] ==> Status"), "{text}");
        assert!(lines[4].ends_with("]     [warn] codex not installed"), "{text}");
    }
}
