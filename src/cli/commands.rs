use crate::config::AppConfig;
use crate::context::{Request, Response};
use crate::dispatcher::DispatchOutcome;
use crate::hot_reload::watch_config;
use crate::runtime_config::RuntimeConfig;
use anyhow::{Context, Result};
use arc_swap::ArcSwap;
use clap::{Parser, Subcommand};
use http::Method;
use serde::Serialize;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

/// Command-line interface for brrtdispatch
///
/// Loads a route table and lists or exercises its dispatch rules.
#[derive(Debug, Parser)]
#[command(name = "brrtdispatch")]
#[command(about = "Action dispatch explorer", long_about = None, version)]
pub struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Print the dispatch tables of a route table
    Routes {
        /// Route table file (YAML, TOML or JSON)
        #[arg(short, long, env = "BRRTD_CONFIG")]
        config: PathBuf,

        /// Emit JSON instead of a text table
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Dispatch one or more request targets and print the results
    Resolve {
        /// Route table file (YAML, TOML or JSON)
        #[arg(short, long, env = "BRRTD_CONFIG")]
        config: PathBuf,

        /// Request method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request targets, e.g. `/users/42?expand=posts`
        #[arg(required = true)]
        targets: Vec<String>,
    },
    /// Read `METHOD /target` lines from stdin and dispatch each one
    Shell {
        /// Route table file (YAML, TOML or JSON)
        #[arg(short, long, env = "BRRTD_CONFIG")]
        config: PathBuf,

        /// Rebuild the application when the route table changes
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
}

/// One dispatched request as printed by `resolve` and `shell`.
#[derive(Debug, Serialize)]
pub struct DispatchReport {
    pub method: String,
    pub target: String,
    pub outcome: DispatchOutcome,
    pub status: u16,
    pub body: serde_json::Value,
}

impl DispatchReport {
    fn new(method: &Method, target: &str, outcome: DispatchOutcome, response: Response) -> Self {
        Self {
            method: method.to_string(),
            target: target.to_string(),
            outcome,
            status: response.status,
            body: response.body,
        }
    }
}

/// Parse a method name case-insensitively.
///
/// # Errors
///
/// The name is not a valid HTTP method token.
pub fn parse_method(method: &str) -> Result<Method> {
    Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{method}'"))
}

/// Parse a shell line: `METHOD /target`, or just `/target` for GET.
/// Blank lines and `#` comments yield `None`.
///
/// # Errors
///
/// The method token is invalid.
pub fn parse_line(line: &str) -> Result<Option<(Method, String)>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    match line.split_once(char::is_whitespace) {
        Some((method, target)) => Ok(Some((parse_method(method)?, target.trim().to_string()))),
        None if line.starts_with('/') => Ok(Some((Method::GET, line.to_string()))),
        None => Ok(Some((parse_method(line)?, "/".to_string()))),
    }
}

/// Run the parsed CLI against stdin/stdout.
///
/// # Errors
///
/// Loading or building the route table, or writing output.
pub fn run_cli(cli: Cli) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    run_command(cli.command, &RuntimeConfig::from_env(), stdin.lock(), stdout.lock())
}

/// Run one command with explicit I/O.
///
/// # Errors
///
/// Loading or building the route table, or writing output.
pub fn run_command<R: BufRead, W: Write>(
    command: Commands,
    runtime: &RuntimeConfig,
    input: R,
    mut out: W,
) -> Result<()> {
    match command {
        Commands::Routes { config, json } => {
            let app = AppConfig::load(&config)?.build_application(runtime)?;
            app.dispatcher().dump_routes();
            if json {
                serde_json::to_writer_pretty(&mut out, &app.dispatcher().list())?;
                writeln!(out)?;
            } else {
                write!(out, "{}", app.dispatcher().format_routes())?;
            }
        }
        Commands::Resolve {
            config,
            method,
            targets,
        } => {
            let method = parse_method(&method)?;
            let app = AppConfig::load(&config)?.build_application(runtime)?;
            let workers = runtime.workers.clamp(1, targets.len().max(1));
            let chunk = targets.len().div_ceil(workers).max(1);
            let chunks: Vec<&[String]> = targets.chunks(chunk).collect();

            let reports = app.run_workers(chunks.len(), |worker| {
                chunks[worker.id()]
                    .iter()
                    .map(|target| {
                        let (outcome, response) =
                            worker.handle(Request::from_target(method.clone(), target));
                        DispatchReport::new(&method, target, outcome, response)
                    })
                    .collect::<Vec<_>>()
            })?;
            for report in reports.into_iter().flatten() {
                writeln!(out, "{}", serde_json::to_string(&report)?)?;
            }
        }
        Commands::Shell { config, watch } => {
            let app = AppConfig::load(&config)?.build_application(runtime)?;
            let current = Arc::new(ArcSwap::from_pointee(app));
            let _watcher = if watch {
                Some(
                    watch_config(&config, Arc::clone(&current), *runtime)
                        .with_context(|| format!("failed to watch {}", config.display()))?,
                )
            } else {
                None
            };

            for line in input.lines() {
                let line = line.context("failed to read input")?;
                let (method, target) = match parse_line(&line) {
                    Ok(Some(parsed)) => parsed,
                    Ok(None) => continue,
                    Err(e) => {
                        writeln!(out, "{}", serde_json::json!({ "error": format!("{e:#}") }))?;
                        continue;
                    }
                };
                let (outcome, response) = current
                    .load()
                    .handle(Request::from_target(method.clone(), &target));
                let report = DispatchReport::new(&method, &target, outcome, response);
                writeln!(out, "{}", serde_json::to_string(&report)?)?;
                out.flush()?;
            }
        }
    }
    Ok(())
}
