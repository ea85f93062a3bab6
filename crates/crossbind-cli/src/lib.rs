//! The `crossbind` command-line tool.
//!
//! Two build steps: `compile` produces one platform's fragment
//! manifest into the intermediate directory, `link` merges the
//! fragments from one or more intermediate directories into the
//! manifest a target toolchain consumes.
//!
//! The binary in `main.rs` only parses arguments, initializes
//! tracing, and maps the command result to an exit code; everything
//! testable lives here.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod args;
pub mod commands;
pub mod error;

pub use args::{Cli, Command, CompileArgs, Configuration, LinkArgs, LinkTarget};
pub use error::CliError;
