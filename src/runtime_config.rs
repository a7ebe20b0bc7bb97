//! # Runtime Configuration Module
//!
//! Environment-variable configuration for the dispatch runtime.
//!
//! ## Environment Variables
//!
//! ### `BRRTD_WORKERS`
//!
//! Number of worker threads the application starts (each one runs the
//! controllers' `post_fork` hooks). Accepts a positive decimal number.
//!
//! Default: the available parallelism of the host, or `1`.
//!
//! ### `BRRTD_CHAINED_LOW_PRECEDENCE`
//!
//! Whether the `Chained` dispatch type is tried after the normal-precedence
//! types. Accepts `true`/`false`, `1`/`0`, `yes`/`no`, `on`/`off`.
//!
//! Default: `true`
//!
//! ## Usage
//!
//! ```rust
//! use brrtdispatch::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Workers: {}", config.workers);
//! ```
//!
//! Invalid values fall back to the default and are logged at `warn`.

use std::env;
use tracing::warn;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Worker thread count (at least 1)
    pub workers: usize,
    /// Whether `Chained` has low precedence (default: true)
    pub chained_low_precedence: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            chained_low_precedence: true,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let workers = match lookup("BRRTD_WORKERS") {
            Some(val) => match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    warn!(value = %val, default = defaults.workers, "Invalid BRRTD_WORKERS");
                    defaults.workers
                }
            },
            None => defaults.workers,
        };

        let chained_low_precedence = match lookup("BRRTD_CHAINED_LOW_PRECEDENCE") {
            Some(val) => parse_bool(&val).unwrap_or_else(|| {
                warn!(value = %val, "Invalid BRRTD_CHAINED_LOW_PRECEDENCE");
                defaults.chained_low_precedence
            }),
            None => defaults.chained_low_precedence,
        };

        RuntimeConfig {
            workers,
            chained_low_precedence,
        }
    }
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(std::num::NonZeroUsize::get)
        .unwrap_or(1)
}

pub(crate) fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
