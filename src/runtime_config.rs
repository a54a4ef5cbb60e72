//! # Runtime Configuration Module
//!
//! Environment-based configuration for the coroutine runtime that drives
//! dispatch workers.
//!
//! ## Environment Variables
//!
//! ### `RQUEUE_STACK_SIZE`
//!
//! Stack size for worker coroutines. Accepts decimal (`65536`) or hexadecimal
//! (`0x10000`). Default: `0x10000` (64 KB).
//!
//! Listeners run on the worker's stack, so listeners with deep call chains or
//! large locals need a bigger value. Memory use grows with
//! stack_size × workers.
//!
//! ### `RQUEUE_WORKERS`
//!
//! Number of dispatch worker coroutines. Default: `4`.
//!
//! ## Usage
//!
//! ```rust
//! use rqueue::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! assert!(config.workers > 0);
//! ```

use std::env;

pub const DEFAULT_STACK_SIZE: usize = 0x10000;
pub const DEFAULT_WORKERS: usize = 4;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for worker coroutines in bytes
    pub stack_size: usize,
    /// Number of dispatch workers
    pub workers: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to the defaults; a worker count of zero
    /// is raised to one.
    pub fn from_env() -> Self {
        let stack_size = env::var("RQUEUE_STACK_SIZE")
            .ok()
            .and_then(|v| parse_size(&v))
            .unwrap_or(DEFAULT_STACK_SIZE);
        let workers = env::var("RQUEUE_WORKERS")
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_WORKERS)
            .max(1);
        RuntimeConfig {
            stack_size,
            workers,
        }
    }

    /// Make `stack_size` the default for coroutines spawned from now on.
    pub fn apply(&self) {
        may::config().set_stack_size(self.stack_size);
    }
}

/// Parse a byte size given in decimal or `0x` hexadecimal.
pub fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}
