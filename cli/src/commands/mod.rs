pub mod install;
pub mod status;
pub mod uninstall;
pub mod version;

use std::io::IsTerminal as _;
use std::path::PathBuf;

use anyhow::Result;

use crate::cli::GlobalOpts;
use crate::logging::Logger;
use crate::platform::Platform;
use crate::prompt::Prompt;
use crate::target::{self, ExecutableLocation, Request, Target};

/// Shared state produced by the common command setup sequence.
///
/// Encapsulates platform detection and target resolution so that each
/// command does not have to repeat the boilerplate.
#[derive(Debug)]
pub struct CommandSetup {
    /// Detected platform.
    pub platform: Platform,
    /// Resolved target.
    pub target: Target,
    /// Path of the running executable, when it can be determined.
    pub executable: Option<PathBuf>,
}

impl CommandSetup {
    /// Detect the platform and resolve the target.
    ///
    /// Runs before logging is initialised and writes nothing, so a bad
    /// selection leaves the filesystem untouched (log file included).
    /// Prompting is only allowed when `--yes` is absent and stdin is a
    /// terminal.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory is unknown or no target can be
    /// resolved.
    pub fn init(global: &GlobalOpts, prompt: &mut dyn Prompt) -> Result<Self> {
        let platform = Platform::detect()?;
        let executable = std::env::current_exe().ok();

        let request = Request {
            flag: global.target.as_deref(),
            invoking_path: executable.as_deref(),
            interactive: !global.yes && std::io::stdin().is_terminal(),
            home: &platform.home,
        };
        let target = target::resolve(&request, &ExecutableLocation, prompt)?;

        Ok(Self {
            platform,
            target,
            executable,
        })
    }

    /// Log what [`init`](Self::init) resolved.
    pub fn report(&self, log: &Logger) {
        log.debug(&format!("platform: {}", self.platform.os));
        log.info(&format!(
            "target: {} ({})",
            self.target.id.display_name(),
            self.target.base_dir.display()
        ));
    }
}

/// Print the summary and bail if anything was recorded as failed.
///
/// # Errors
///
/// Returns an error if one or more steps failed.
pub fn finish(log: &Logger) -> Result<()> {
    log.print_summary();

    let count = log.failure_count();
    if count > 0 {
        anyhow::bail!("{count} step(s) failed");
    }
    Ok(())
}
