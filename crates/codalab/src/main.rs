//! CodaLab command-line client.
//!
//! Main entry point for `cl`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use console::Style;

use codalab_auth::{CredentialPrompt, NonInteractivePrompt, TerminalPrompt};
use codalab_session::{CodaLabManager, ManagerError};

mod commands;

use commands::{alias, logout, session, status, work};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// CodaLab - manage sessions, worksheets and credentials for bundle services
#[derive(Parser)]
#[command(name = "cl")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// CodaLab home directory (default: ~/.codalab)
    #[arg(long, global = true, env = "CODALAB_HOME")]
    pub home: Option<PathBuf>,

    /// Session name (default: derived from the enclosing shell)
    #[arg(long, global = true, env = "CODALAB_SESSION")]
    pub session: Option<String>,

    /// Do not read or write config and state on disk
    #[arg(long, global = true)]
    pub temporary: bool,

    /// Fail instead of prompting for credentials
    #[arg(long, global = true)]
    pub no_prompt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show the current session, worksheet and credentials
    Status(status::StatusArgs),

    /// Show or switch the current worksheet
    Work(work::WorkArgs),

    /// List, add or remove address aliases
    Alias(alias::AliasArgs),

    /// Clear stored credentials for an address
    Logout(logout::LogoutArgs),

    /// Show the name of the current session
    Session(session::SessionArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    let _guard = init_tracing(&cli);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let red = Style::new().red().bold();
            eprintln!("{} {:#}", red.apply_to("error:"), e);
            ExitCode::FAILURE
        }
    }
}

/// Install tracing: console (human-readable, stderr) + rotating JSON file.
///
/// The file layer is skipped in temporary mode or when the log directory
/// cannot be created.
fn init_tracing(cli: &Cli) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let filter = if cli.verbose {
        "cl=debug,codalab_session=debug,codalab_auth=debug,codalab_client=debug,codalab_config=debug,info"
    } else {
        "warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let mut guard = None;
    let file_layer = if cli.temporary {
        None
    } else {
        let home = cli
            .home
            .as_deref()
            .map(codalab_config::expand_path)
            .unwrap_or_else(codalab_config::effective_home);
        tracing_appender::rolling::RollingFileAppender::builder()
            .rotation(tracing_appender::rolling::Rotation::DAILY)
            .filename_prefix("cl.log")
            .build(home.join("logs"))
            .ok()
            .map(|appender| {
                let (non_blocking, worker) = tracing_appender::non_blocking(appender);
                guard = Some(worker);
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking)
                    .with_filter(EnvFilter::new(
                        "cl=trace,codalab_session=trace,codalab_auth=trace,codalab_client=trace,codalab_config=trace,info",
                    ))
            })
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    guard
}

fn run(cli: Cli) -> Result<()> {
    let manager = open_manager(&cli)?;

    let ctx = commands::Context {
        manager,
        json_output: cli.json,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Status(args) => status::run(args, &ctx),
        Commands::Work(args) => work::run(args, &ctx),
        Commands::Alias(args) => alias::run(args, &ctx),
        Commands::Logout(args) => logout::run(args, &ctx),
        Commands::Session(args) => session::run(args, &ctx),
    }
}

/// Build the manager. A malformed config or state document ends the process.
fn open_manager(cli: &Cli) -> Result<CodaLabManager> {
    let prompt: Box<dyn CredentialPrompt> = if cli.no_prompt {
        Box::new(NonInteractivePrompt)
    } else {
        Box::new(TerminalPrompt)
    };

    let mut builder = CodaLabManager::builder()
        .temporary(cli.temporary)
        .boxed_prompt(prompt);
    if let Some(home) = &cli.home {
        builder = builder.home(home);
    }
    if let Some(name) = cli.session.as_deref().filter(|name| !name.is_empty()) {
        builder = builder.session_name(name);
    }

    match builder.build() {
        Ok(manager) => Ok(manager),
        Err(ManagerError::Config(e)) if e.is_fatal() => e.exit(),
        Err(e) => Err(e.into()),
    }
}
