//! # CLI Module
//!
//! Command-line tooling for listener declaration files.
//!
//! ## Commands
//!
//! ### `validate`
//!
//! Build the registry from a declaration file. Exits non-zero on any
//! configuration error and lists listeners skipped for having no queue:
//!
//! ```bash
//! rqueue-cli validate --file listeners.yaml
//! ```
//!
//! ### `inspect`
//!
//! Print every destination queue with its listeners; the one marked `*` is
//! the one dispatch selects:
//!
//! ```bash
//! rqueue-cli inspect --file listeners.yaml
//! ```
//!
//! ### `dispatch`
//!
//! Route one payload through echo listeners bound to the declarations and
//! print the outcome as JSON:
//!
//! ```bash
//! rqueue-cli dispatch --file listeners.yaml --queue orders --payload '{"id":42}'
//! ```
//!
//! Placeholders resolve against the file's `properties:`; pass `--env` to
//! fall back to environment variables.

mod commands;


pub use commands::{build_registry, run, run_cli, Cli, Commands};
