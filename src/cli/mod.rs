//! # CLI Module
//!
//! Command-line front end for exploring route tables (see [`crate::config`]).
//!
//! ## Commands
//!
//! ### `routes`
//!
//! Print the dispatch tables, per dispatch type in precedence order:
//!
//! ```bash
//! brrtdispatch routes --config routes.yaml
//! brrtdispatch routes --config routes.yaml --json
//! ```
//!
//! ### `resolve`
//!
//! Dispatch request targets and print one JSON report per target:
//!
//! ```bash
//! brrtdispatch resolve --config routes.yaml /foo/baz/42 '/users/7/view?x=1'
//! brrtdispatch resolve --config routes.yaml --method post /users
//! ```
//!
//! Targets are spread over `BRRTD_WORKERS` worker threads; reports are
//! printed in input order.
//!
//! ### `shell`
//!
//! Read `METHOD /target` lines from stdin (a bare `/target` means `GET`):
//!
//! ```bash
//! printf 'GET /foo/baz/1\nPOST /users\n' | brrtdispatch shell --config routes.yaml
//! brrtdispatch shell --config routes.yaml --watch
//! ```
//!
//! With `--watch` the route table is rebuilt whenever the file changes.
//!
//! ## Usage from Code
//!
//! ```rust,ignore
//! use brrtdispatch::cli::{run_cli, Cli};
//! use clap::Parser;
//!
//! run_cli(Cli::parse())?;
//! ```

mod commands;


pub use commands::{parse_line, parse_method, run_cli, run_command, Cli, Commands, DispatchReport};
