//! Session layer: everything between the overlay and the transport.
//!
//! - [`parse_with_recovery`]: parsing with the mid-edit recovery shim.
//! - [`FsImporter`]/[`CachingImporter`]: import resolution over the
//!   workspace, overlay-first, with the byte-identical replay guarantee.
//! - [`Session`]: the single active import/evaluation session.
//! - [`SessionResolver`]: the `Resolver` implementation queries run on.
//! - [`process_update`]: the overlay callback producing diagnostics
//!   (parse error, lints, optional runtime evaluation).
//! - [`features`]: completion, hover, signature help, definition, symbols.
//! - [`Configuration`]: editor-provided settings, formatter options
//!   included.

mod config;
mod eval;
pub mod features;
mod importer;
mod parse;
mod resolver;
mod session;
mod update;

pub use config::{Configuration, DiagConfiguration, FmtConfiguration, FormatError, Formatter};
pub use eval::{
    parse_runtime_trace, runtime_error_diags, EvalError, Evaluator, RuntimeError, StackFrame,
};
pub use importer::{
    CachingImporter, DirEntry, FsImporter, ImportError, Imported, Importer, WorkspaceDirs,
};
pub use parse::{parse_with_recovery, ParseResult};
pub use resolver::SessionResolver;
pub use session::{Session, SessionState};
pub use update::process_update;

#[cfg(test)]
mod tests;
