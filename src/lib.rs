//! A small interactive shell.
//!
//! Lines are read through a raw-mode line editor with history, then parsed into
//! statements: variable assignments and lookups, `if ... then ... else ... fi`,
//! `or`, the `cd`/`read`/`quit` builtins, `!!`, prompt changes, and command lines.
//! Command lines may be pipelines with an output redirection on the last stage.
//! Every stage is handed to an external executor (`sh -c` by default); the
//! shell itself only wires processes together and waits for them.
//!
//! While a job runs it is the foreground job: Ctrl-C is relayed to its process
//! group and the shell keeps running.
//!
//! The entry point is [`Session`].

mod builtin;
pub mod command;
pub mod config;
pub mod editor;
pub mod env;
pub mod external;
pub mod history;
mod io_adapters;
mod lexer;
pub mod logging;
pub mod parser;
pub mod pipeline;
mod redirect;
mod session;
pub mod signal;
pub mod terminal;

pub use config::{Config, Options};
pub use io_adapters::MemWriter;
pub use redirect::{RedirectKind, Redirection};
/// The interpreter loop.
///
/// See [`Session`] for the high-level API and examples.
pub use session::Session;
