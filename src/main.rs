mod checklist;
mod config;
mod context;
mod decision;
mod diff;
mod gate;
mod types;

use anyhow::{Context, Result};
use clap::Parser;
use config::HookConfig;
use gate::Gate;
use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::process;
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;
use types::{HookInput, HookOutput};

/// Claude Code Stop hook that keeps the assistant working until its changes
/// have been reviewed and linted.
#[derive(Parser, Debug)]
#[command(name = "review-gate", version)]
struct Cli {
    /// Project root. Falls back to the hook payload's `cwd`, then the
    /// current directory.
    #[arg(long, env = "CLAUDE_PROJECT_DIR")]
    project_dir: Option<PathBuf>,
}

fn init_logging() {
    let filter = EnvFilter::try_from_env("REVIEW_GATE_LOG")
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn read_stdin() -> Result<String> {
    let mut buffer = String::new();
    let stdin = io::stdin();
    if stdin.is_terminal() {
        return Ok(buffer);
    }
    stdin.lock().read_to_string(&mut buffer).context("reading stdin")?;
    Ok(buffer)
}

/// Parse the hook payload. The decision never depends on it, so an absent
/// or unreadable payload is treated as a plain stop.
fn parse_input(raw: &str) -> Option<HookInput> {
    if raw.trim().is_empty() {
        debug!("no hook payload on stdin");
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(input) => Some(input),
        Err(e) => {
            warn!(error = %e, "ignoring unparseable hook payload");
            None
        }
    }
}

fn run(cli: &Cli) -> Result<HookOutput> {
    let input = parse_input(&read_stdin()?);
    if input.as_ref().is_some_and(|i| !i.is_stop()) {
        debug!("not a stop event, passing through");
        return Ok(HookOutput::allow());
    }
    if let Some(input) = &input {
        debug!(
            session = input.session_id().unwrap_or_default(),
            stop_hook_active = input.stop_hook_active(),
            "stop event"
        );
    }

    let payload_cwd = input.as_ref().and_then(HookInput::cwd);
    let root = config::resolve_root(cli.project_dir.as_deref(), payload_cwd)?;
    let config = HookConfig::load(root)?;
    Gate::new(config).run()
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            eprint!("{e}");
            process::exit(1);
        }
    };
    init_logging();

    let emitted = run(&cli).and_then(|output| {
        serde_json::to_string(&output).context("serializing hook output")
    });
    match emitted {
        Ok(json) => println!("{json}"),
        Err(err) => {
            // Exit 1 is a non-blocking error: the assistant may still stop.
            eprintln!("review-gate: {err:#}");
            process::exit(1);
        }
    }
}
