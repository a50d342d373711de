//! Core logging types: step entries, status, and the [`Log`] trait.

/// Per-artifact result for summary reporting.
#[derive(Debug, Clone)]
pub struct StepEntry {
    /// Artifact identifier or step name.
    pub name: String,
    /// Final status of the step.
    pub status: StepStatus,
    /// Optional detail message (e.g., skip reason or error description).
    pub message: Option<String>,
}

/// Status of a completed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// Step completed successfully.
    Ok,
    /// Step was skipped (e.g., content already in place).
    Skipped,
    /// Step ran in dry-run mode; no changes were applied.
    DryRun,
    /// Step encountered an error and could not complete.
    Failed,
}

/// Abstraction over logging backends.
///
/// Installer and uninstaller code log through this trait so tests can run
/// them against a [`Logger`](super::Logger) without a global subscriber.
pub trait Log: std::fmt::Debug {
    /// Log a stage header (major section).
    fn stage(&self, msg: &str);
    /// Log an informational message.
    fn info(&self, msg: &str);
    /// Log a success message.
    fn success(&self, msg: &str);
    /// Log a debug message (suppressed on console unless verbose).
    fn debug(&self, msg: &str);
    /// Log a warning message.
    fn warn(&self, msg: &str);
    /// Log an error message.
    fn error(&self, msg: &str);
    /// Log a dry-run action message.
    fn dry_run(&self, msg: &str);
    /// Record a step result for the summary.
    fn record_step(&self, name: &str, status: StepStatus, message: Option<&str>);
}
