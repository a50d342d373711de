use anyhow::Result;
use clap::{CommandFactory, Parser};

use sage_installer::cli::{self, Cli};
use sage_installer::commands::{self, CommandSetup};
use sage_installer::logging;
use sage_installer::prompt::LinePrompt;

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();

    match args.command {
        cli::Command::Version => {
            commands::version::run();
            return Ok(());
        }
        cli::Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "sage", &mut std::io::stdout());
            return Ok(());
        }
        _ => {}
    }

    // Target resolution comes before the subscriber so a rejected selection
    // never creates the log file.
    let mut prompt = LinePrompt::stdio();
    let setup = CommandSetup::init(&args.global, &mut prompt)?;

    let name = args.command.name();
    logging::init_subscriber(args.verbose, name);
    let log = logging::Logger::new(name);

    match args.command {
        cli::Command::Install => commands::install::run(&args.global, &setup, &log),
        cli::Command::Uninstall => {
            commands::uninstall::run(&args.global, &setup, &mut prompt, &log)
        }
        cli::Command::Status => commands::status::run(&setup, &log),
        cli::Command::Version | cli::Command::Completions { .. } => Ok(()),
    }
}
