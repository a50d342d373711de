use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Top-level CLI entry point for the Sage installer.
#[derive(Parser, Debug)]
#[command(
    name = "sage",
    about = "Install, inspect, and remove the Sage persona and skills",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Options accepted by every subcommand.
    #[command(flatten)]
    pub global: GlobalOpts,
}

/// Options shared across all subcommands.
#[derive(Parser, Debug, Clone, Default)]
pub struct GlobalOpts {
    /// Target assistant (claude, codex, gemini)
    #[arg(short, long, global = true)]
    pub target: Option<String>,

    /// Answer yes to confirmations and never prompt
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Preview changes without applying
    #[arg(short = 'd', long, global = true)]
    pub dry_run: bool,

    /// Override the distribution root directory
    #[arg(long, global = true)]
    pub source: Option<PathBuf>,

    /// Download artifacts from a base URL (defaults to `[remote] base_url`)
    #[arg(long, global = true, num_args = 0..=1, value_name = "URL")]
    pub remote: Option<Option<String>>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install the persona, skills, and settings for a target
    Install,
    /// Remove installed artifacts and restore backed-up files
    Uninstall,
    /// Show which artifacts and backups are present for a target
    Status,
    /// Print version information
    Version,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        shell: Shell,
    },
}

impl Command {
    /// Name used for the log file.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Install => "install",
            Self::Uninstall => "uninstall",
            Self::Status => "status",
            Self::Version => "version",
            Self::Completions { .. } => "completions",
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_install_with_target() {
        let cli = Cli::parse_from(["sage", "--target", "codex", "install"]);
        assert_eq!(cli.global.target.as_deref(), Some("codex"));
        assert!(matches!(cli.command, Command::Install));
    }

    #[test]
    fn parse_target_short_after_subcommand() {
        let cli = Cli::parse_from(["sage", "uninstall", "-t", "gemini", "-y"]);
        assert_eq!(cli.global.target.as_deref(), Some("gemini"));
        assert!(cli.global.yes);
        assert!(matches!(cli.command, Command::Uninstall));
    }

    #[test]
    fn parse_dry_run_short() {
        let cli = Cli::parse_from(["sage", "-d", "install"]);
        assert!(cli.global.dry_run);
    }

    #[test]
    fn parse_source_override() {
        let cli = Cli::parse_from(["sage", "--source", "/tmp/dist", "install"]);
        assert_eq!(cli.global.source, Some(PathBuf::from("/tmp/dist")));
    }

    #[test]
    fn parse_remote_with_and_without_url() {
        let cli = Cli::parse_from(["sage", "install", "--remote", "https://example.invalid"]);
        assert_eq!(
            cli.global.remote,
            Some(Some("https://example.invalid".to_string()))
        );
        let cli = Cli::parse_from(["sage", "install", "--remote"]);
        assert_eq!(cli.global.remote, Some(None));
        let cli = Cli::parse_from(["sage", "install"]);
        assert_eq!(cli.global.remote, None);
    }

    #[test]
    fn parse_status_and_version() {
        assert!(matches!(
            Cli::parse_from(["sage", "status"]).command,
            Command::Status
        ));
        assert!(matches!(
            Cli::parse_from(["sage", "version"]).command,
            Command::Version
        ));
    }

    #[test]
    fn parse_completions() {
        let cli = Cli::parse_from(["sage", "completions", "bash"]);
        assert!(matches!(
            cli.command,
            Command::Completions { shell: Shell::Bash }
        ));
        assert_eq!(cli.command.name(), "completions");
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::parse_from(["sage", "-v", "status"]);
        assert!(cli.verbose);
    }

    #[test]
    fn missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["sage"]).is_err());
    }
}
