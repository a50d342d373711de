//! Structured logger with dry-run awareness and summary collection.
use std::path::PathBuf;
use std::sync::Mutex;

use super::types::{Log, StepEntry, StepStatus};
use super::subscriber::{DRY_RUN, STAGE, SUCCESS};
use super::utils::log_file_path;

/// Implement the display methods of [`Log`] by delegating to inherent methods
/// of the same name on the implementing type.
macro_rules! forward_log_methods {
    ($($method:ident),+ $(,)?) => {
        $(
            fn $method(&self, msg: &str) {
                self.$method(msg);
            }
        )+
    };
}

/// Structured logger with dry-run awareness and summary collection.
///
/// Messages go through [`tracing`]; the subscriber installed by
/// [`init_subscriber`](super::init_subscriber) renders them to the console
/// and appends them to `$XDG_CACHE_HOME/sage/<command>.log`.
#[derive(Debug)]
pub struct Logger {
    steps: Mutex<Vec<StepEntry>>,
    log_file: PathBuf,
}

impl Logger {
    /// Create a new logger for `command`.
    ///
    /// Only remembers the log file path for the summary; the file itself is
    /// opened by the subscriber.
    #[must_use]
    pub fn new(command: &str) -> Self {
        Self {
            steps: Mutex::new(Vec::new()),
            log_file: log_file_path(command),
        }
    }

    /// Return a clone of all recorded step entries.
    #[must_use]
    pub fn step_entries(&self) -> Vec<StepEntry> {
        self.steps.lock().map_or_else(|_| vec![], |g| g.clone())
    }

    /// Log an error message.
    pub fn error(&self, msg: &str) {
        tracing::error!("{msg}");
    }

    /// Log a warning message.
    pub fn warn(&self, msg: &str) {
        tracing::warn!("{msg}");
    }

    /// Log a stage header (major section).
    pub fn stage(&self, msg: &str) {
        tracing::info!(target: STAGE, "{msg}");
    }

    /// Log an informational message.
    pub fn info(&self, msg: &str) {
        tracing::info!("{msg}");
    }

    /// Log a success message.
    pub fn success(&self, msg: &str) {
        tracing::info!(target: SUCCESS, "{msg}");
    }

    /// Log a debug message.
    pub fn debug(&self, msg: &str) {
        tracing::debug!("{msg}");
    }

    /// Log a dry-run action message.
    pub fn dry_run(&self, msg: &str) {
        tracing::info!(target: DRY_RUN, "{msg}");
    }

    /// Record a step result for the summary.
    pub fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        if let Ok(mut guard) = self.steps.lock() {
            guard.push(StepEntry {
                name: name.to_string(),
                status,
                message: message.map(String::from),
            });
        }
    }

    /// Count the number of failed steps.
    #[must_use]
    pub fn failure_count(&self) -> usize {
        self.steps.lock().map_or(0, |guard| {
            guard
                .iter()
                .filter(|s| s.status == StepStatus::Failed)
                .count()
        })
    }

    /// Print the summary banner of all recorded steps.
    pub fn print_summary(&self) {
        let steps = self.step_entries();
        if steps.is_empty() {
            return;
        }
        self.stage("Summary");
        for line in summary_lines(&steps) {
            self.info(&line);
        }
        self.info(&format!("\x1b[2mlog: {}\x1b[0m", self.log_file.display()));
    }
}

/// Console marker and colour for one step status.
const fn marker(status: StepStatus) -> (&'static str, &'static str) {
    match status {
        StepStatus::Ok => ("✓", "\x1b[32m"),
        StepStatus::Skipped => ("○", "\x1b[33m"),
        StepStatus::DryRun => ("~", "\x1b[37m"),
        StepStatus::Failed => ("✗", "\x1b[31m"),
    }
}

/// One line per step followed by the per-status totals.
fn summary_lines(steps: &[StepEntry]) -> Vec<String> {
    let count = |status: StepStatus| steps.iter().filter(|s| s.status == status).count();
    let mut lines: Vec<String> = steps
        .iter()
        .map(|step| {
            let (icon, color) = marker(step.status);
            let detail = step
                .message
                .as_deref()
                .map_or_else(String::new, |msg| format!(" ({msg})"));
            format!("{color}{icon} {}{detail}\x1b[0m", step.name)
        })
        .collect();
    lines.push(format!(
        "{} steps: \x1b[32m{} ok\x1b[0m, \x1b[33m{} skipped\x1b[0m, \
         \x1b[37m{} dry-run\x1b[0m, \x1b[31m{} failed\x1b[0m",
        steps.len(),
        count(StepStatus::Ok),
        count(StepStatus::Skipped),
        count(StepStatus::DryRun),
        count(StepStatus::Failed),
    ));
    lines
}

impl Log for Logger {
    forward_log_methods!(stage, info, success, debug, warn, error, dry_run);

    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>) {
        self.record_step(name, status, message);
    }
}
