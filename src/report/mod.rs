//! Report renderers for audit results.
//!
//! - [`json`] — the persisted report: license → dependency paths, indented
//!   with four spaces and written owner-readable only.
//! - [`terminal`] — colored summary box and license table; respects
//!   `--verbose` / `--quiet`.

pub mod json;
pub mod terminal;
