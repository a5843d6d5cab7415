//! License identification.
//!
//! - [`oracle`] — the [`LicenseOracle`](oracle::LicenseOracle) seam and the
//!   phrase-based default implementation.
//! - [`catalog`] — signature phrases per license.
//! - [`risk`] — maps detected license names to a
//!   [`LicenseRisk`](crate::models::LicenseRisk) tier for reporting.

pub mod catalog;
pub mod oracle;
pub mod risk;

#[cfg(test)]
pub(crate) mod fixtures;
