use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Bucket name for dependencies with no license file, or whose license
/// could not be identified.
pub const UNKNOWN: &str = "Unknown";

/// One detected license inside one candidate file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub file: PathBuf,
    pub license: String,
    /// Fraction of the license's signature found, in `0.0..=1.0`.
    pub confidence: f64,
    /// Byte offset of the match within the classified chunk.
    pub offset: usize,
    /// Byte length of the match.
    pub extent: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LicenseRisk {
    Permissive,
    WeakCopyleft,
    StrongCopyleft,
    Unknown,
}

impl std::fmt::Display for LicenseRisk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LicenseRisk::Permissive => write!(f, "Permissive"),
            LicenseRisk::WeakCopyleft => write!(f, "Weak Copyleft"),
            LicenseRisk::StrongCopyleft => write!(f, "Strong Copyleft"),
            LicenseRisk::Unknown => write!(f, "Unknown"),
        }
    }
}

/// How a directory subtree resolved.
#[derive(Debug)]
pub enum Resolution {
    Licensed,
    Unlicensed,
    /// The subtree could not be listed, so licensed-ness is unknown.
    Unreadable(crate::error::ScanError),
}

impl Resolution {
    pub fn is_licensed(&self) -> bool {
        matches!(self, Resolution::Licensed)
    }
}

/// Rule that reduces every match found in a single file to one license.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TieBreak {
    /// The last match the oracle reported for the file.
    Last,
    /// The most confident match; equal confidences go to the later match.
    #[default]
    HighestConfidence,
}

impl TieBreak {
    /// Pick the winning match. `matches` must be in the order the oracle
    /// produced them.
    pub fn pick<'a>(&self, matches: &[&'a Match]) -> Option<&'a Match> {
        match self {
            TieBreak::Last => matches.last().copied(),
            TieBreak::HighestConfidence => matches
                .iter()
                .copied()
                .reduce(|best, m| if m.confidence >= best.confidence { m } else { best }),
        }
    }
}

/// License name → dependency paths (relative to the vendor root).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComplianceReport {
    pub buckets: BTreeMap<String, BTreeSet<String>>,
}

impl ComplianceReport {
    pub fn insert(&mut self, license: &str, dependency: &str) {
        self.buckets
            .entry(license.to_string())
            .or_default()
            .insert(dependency.to_string());
    }

    pub fn get(&self, license: &str) -> Option<&BTreeSet<String>> {
        self.buckets.get(license)
    }

    pub fn dependency_count(&self) -> usize {
        self.buckets.values().map(BTreeSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// A bucket whose license is not on the allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub license: String,
    pub dependencies: Vec<String>,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "forbidden license {:?}: {}",
            self.license,
            self.dependencies.join(", ")
        )
    }
}
