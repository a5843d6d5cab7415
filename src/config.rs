use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::ScanError;

/// Name of the allow-list file looked up next to the vendor directory.
pub const ALLOW_LIST_FILE: &str = ".license";

/// Licenses the policy accepts. Empty means no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    licenses: BTreeSet<String>,
}

impl AllowList {
    pub fn is_empty(&self) -> bool {
        self.licenses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.licenses.len()
    }

    pub fn allows(&self, license: &str) -> bool {
        self.licenses.contains(license)
    }

    /// Parse the line-oriented format: one license per line, blank lines and
    /// `#` comments ignored.
    pub fn parse_lines(content: &str) -> Self {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .collect()
    }

    /// Parse the TOML format: `[policy] allow = ["MIT", ...]`.
    pub fn parse_toml(content: &str) -> Result<Self, toml::de::Error> {
        let file: AllowListFile = toml::from_str(content)?;
        Ok(file.policy.allow.iter().map(|s| s.trim()).collect())
    }
}

impl<S: Into<String>> FromIterator<S> for AllowList {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            licenses: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AllowListFile {
    #[serde(default)]
    policy: PolicySection,
}

#[derive(Debug, Default, Deserialize)]
struct PolicySection {
    #[serde(default)]
    allow: Vec<String>,
}

/// Default allow-list location: `.license` beside the vendor directory.
pub fn default_allow_list_path(vendor_root: &Path) -> PathBuf {
    let trimmed = vendor_root
        .to_str()
        .map(|s| Path::new(s.trim_end_matches('/')))
        .unwrap_or(vendor_root);
    trimmed
        .parent()
        .unwrap_or_else(|| Path::new(""))
        .join(ALLOW_LIST_FILE)
}

/// Load the allow-list, searching in order:
///
/// 1. `override_path` (`--allow-list`), which must exist
/// 2. `<parent of vendor_root>/.license`
/// 3. `~/.config/vendor-license-check/allowed`
/// 4. none: an empty allow-list, meaning no restriction
pub fn load_allow_list(vendor_root: &Path, override_path: Option<&Path>) -> Result<AllowList, ScanError> {
    if let Some(path) = override_path {
        return read_allow_list(path);
    }

    let beside_vendor = default_allow_list_path(vendor_root);
    if beside_vendor.is_file() {
        return read_allow_list(&beside_vendor);
    }

    if let Some(home) = dirs::home_dir() {
        let home_list = home
            .join(".config")
            .join("vendor-license-check")
            .join("allowed");
        if home_list.is_file() {
            return read_allow_list(&home_list);
        }
    }

    debug!("no allow-list found, every license is accepted");
    Ok(AllowList::default())
}

fn read_allow_list(path: &Path) -> Result<AllowList, ScanError> {
    let content = std::fs::read_to_string(path).map_err(|e| ScanError::AllowList {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let list = if path.extension().is_some_and(|ext| ext == "toml") {
        AllowList::parse_toml(&content).map_err(|e| ScanError::AllowList {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
    } else {
        AllowList::parse_lines(&content)
    };

    debug!(path = %path.display(), licenses = list.len(), "allow-list loaded");
    Ok(list)
}
