//! Tanglit - command-driven tangle engine for literate documents.
//!
//! A literate document mixes prose with inline commands (`%!codefile:`,
//! `%!codeinsert:`, ...) that mark where code begins, ends, continues, or
//! is quoted by reference from a named block possibly defined in another
//! file. Tanglit walks the document once, recognises these commands and
//! reconstructs the output source files, resolving references recursively.
//!
//! # Example
//!
//! ```no_run
//! use tanglit::{Config, Scanner};
//!
//! let scanner = Scanner::new(Config::default(), ".");
//! let summary = scanner.tangle_file("notes.txt".as_ref()).unwrap();
//! println!("wrote {} file(s)", summary.files.len());
//! ```

pub mod command;
pub mod config;
pub mod errors;
pub mod resolver;
pub mod scanner;
pub mod writer;

#[cfg(test)]
mod test_utils;

// Re-export commonly used types
pub use command::{BlockRef, Command};
pub use config::{CommandMarker, Config, MatchPolicy, DEFAULT_MARKER, MAX_RECURSION_LEVEL};
pub use errors::{Result, TangleError};
pub use scanner::{Scanner, TangleSummary};
