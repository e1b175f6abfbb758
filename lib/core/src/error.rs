//! The shared `Result` alias.
//!
//! Errors are per-crate enums (`SnapshotError`, `LlmError`, `DesignError`,
//! ...) carried in a `rootcause::Report`. A crate that hands an error to a
//! later stage attaches its own enum with `.context()`.

use rootcause::Report;

/// `Result` whose error is a `Report` carrying context `C`.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;
