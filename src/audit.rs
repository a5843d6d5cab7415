use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendOptions};
use crate::config::AllowList;
use crate::error::ScanError;
use crate::license::oracle::LicenseOracle;
use crate::models::{ComplianceReport, Match, Resolution, TieBreak, Violation, UNKNOWN};
use crate::report;
use crate::resolver::{DirSnapshot, Resolver};

/// License file names recognized when none are configured.
pub const DEFAULT_LICENSE_FILES: &[&str] = &["LICENSE", "LICENSE.TXT", "LICENSE.MD", "COPYING"];

/// What to do with a repo whose subtree cannot be listed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnreadablePolicy {
    /// Fail the whole run.
    #[default]
    Abort,
    /// Log it, leave it out of the report and carry on.
    SkipRepo,
}

#[derive(Debug, Clone)]
pub struct AuditOptions {
    pub license_files: Vec<String>,
    pub backend: BackendOptions,
    pub allow_list: AllowList,
    pub tie_break: TieBreak,
    pub on_unreadable: UnreadablePolicy,
    /// Budget for the whole of [`Auditor::process`].
    pub deadline: Option<Duration>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            license_files: DEFAULT_LICENSE_FILES.iter().map(|s| s.to_string()).collect(),
            backend: BackendOptions::default(),
            allow_list: AllowList::default(),
            tie_break: TieBreak::default(),
            on_unreadable: UnreadablePolicy::default(),
            deadline: None,
        }
    }
}

#[derive(Debug)]
pub struct AuditOutcome {
    pub report: ComplianceReport,
    /// Every forbidden bucket, in report order.
    pub violations: Vec<Violation>,
    /// License files that could not be classified.
    pub file_errors: Vec<ScanError>,
    /// Repos skipped under [`UnreadablePolicy::SkipRepo`].
    pub unreadable: Vec<(String, ScanError)>,
    pub candidates: usize,
}

impl AuditOutcome {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Runs one license audit over a `host/repo` vendor tree.
pub struct Auditor {
    oracle: Arc<dyn LicenseOracle>,
    options: AuditOptions,
}

impl Auditor {
    pub fn new(oracle: Arc<dyn LicenseOracle>, options: AuditOptions) -> Self {
        Self { oracle, options }
    }

    /// Audit `vendor_root`, writing the JSON report to `output` when given.
    ///
    /// The report is written before the allow-list is checked, so it exists
    /// even when the audit ends with violations. The deadline covers the
    /// directory walk as well as classification; on expiry both are
    /// cancelled and the result is [`ScanError::Timeout`].
    pub async fn process(&self, vendor_root: &Path, output: Option<&Path>) -> Result<AuditOutcome, ScanError> {
        let cancelled = Arc::new(AtomicBool::new(false));
        let Some(deadline) = self.options.deadline else {
            return self.run(vendor_root, output, None, cancelled).await;
        };

        let expires = Instant::now() + deadline;
        let run = self.run(vendor_root, output, Some(expires), Arc::clone(&cancelled));
        match tokio::time::timeout(deadline, run).await {
            Ok(Err(e)) if e.is_timeout() => Err(ScanError::Timeout(deadline)),
            Ok(result) => result,
            Err(_) => {
                cancelled.store(true, Ordering::SeqCst);
                warn!(?deadline, "audit deadline exceeded, cancelling");
                Err(ScanError::Timeout(deadline))
            }
        }
    }

    async fn run(
        &self,
        vendor_root: &Path,
        output: Option<&Path>,
        expires: Option<Instant>,
        cancelled: Arc<AtomicBool>,
    ) -> Result<AuditOutcome, ScanError> {
        let root = vendor_root.to_path_buf();
        let license_files = self.options.license_files.clone();
        let on_unreadable = self.options.on_unreadable;
        let flag = Arc::clone(&cancelled);
        let tree = tokio::task::spawn_blocking(move || {
            let resolver = Resolver::new(&license_files).with_cancel(flag);
            walk_vendor(&root, &resolver, on_unreadable)
        })
        .await
        .map_err(|e| ScanError::Worker {
            path: vendor_root.to_path_buf(),
            message: e.to_string(),
        })??;

        let mut report = ComplianceReport::default();
        for repo in &tree.unlicensed {
            report.insert(UNKNOWN, repo);
        }

        let (matches, file_errors) = self.classify(&tree.candidates, expires, cancelled).await?;

        let mut per_file: BTreeMap<&Path, Vec<&Match>> = BTreeMap::new();
        for m in &matches {
            per_file.entry(m.file.as_path()).or_default().push(m);
        }

        for file in &tree.candidates {
            let Some(repo) = tree.owners.get(file) else {
                continue;
            };
            let winner = per_file
                .get(file.as_path())
                .and_then(|found| self.options.tie_break.pick(found));
            match winner {
                Some(m) => {
                    debug!(repo = %repo, license = %m.license, confidence = m.confidence, "classified");
                    report.insert(&m.license, repo);
                }
                None => report.insert(UNKNOWN, repo),
            }
        }

        if let Some(path) = output {
            report::json::write(&report, path)?;
            info!(path = %path.display(), "report written");
        }

        let violations = check_policy(&report, &self.options.allow_list);
        for v in &violations {
            warn!(
                license = %v.license,
                dependencies = %v.dependencies.join(", "),
                "dependencies use a forbidden license"
            );
        }

        Ok(AuditOutcome {
            report,
            violations,
            file_errors,
            unreadable: tree.unreadable,
            candidates: tree.candidates.len(),
        })
    }

    async fn classify(
        &self,
        candidates: &[PathBuf],
        expires: Option<Instant>,
        cancelled: Arc<AtomicBool>,
    ) -> Result<(Vec<Match>, Vec<ScanError>), ScanError> {
        if candidates.is_empty() {
            return Ok((Vec::new(), Vec::new()));
        }

        let backend = Backend::new(Arc::clone(&self.oracle), self.options.backend.clone())
            .with_cancel(cancelled);
        let errors = match expires {
            Some(expires) => {
                let remaining = expires.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(ScanError::Timeout(remaining));
                }
                let errors = backend.classify_all_until(candidates, remaining).await;
                if errors.iter().any(ScanError::is_timeout) {
                    return Err(ScanError::Timeout(remaining));
                }
                errors
            }
            None => backend.classify_all(candidates).await,
        };

        for e in &errors {
            warn!(error = %e, "license file skipped");
        }

        let matches = backend.results();
        if matches.is_empty() {
            return Err(ScanError::NoMatches {
                files: candidates.len(),
            });
        }
        Ok((matches, errors))
    }
}

/// Repos found under the vendor root and the license files they own.
#[derive(Debug, Default)]
struct VendorTree {
    candidates: Vec<PathBuf>,
    /// Candidate path → `host/repo`.
    owners: HashMap<PathBuf, String>,
    unlicensed: Vec<String>,
    unreadable: Vec<(String, ScanError)>,
}

/// Resolve every `<host>/<repo>` below `vendor_root`, hosts then repos in
/// sorted order. Only repos that resolve `Licensed` contribute candidates.
fn walk_vendor(
    vendor_root: &Path,
    resolver: &Resolver,
    on_unreadable: UnreadablePolicy,
) -> Result<VendorTree, ScanError> {
    let mut tree = VendorTree::default();
    let mut repos_seen = 0usize;

    let hosts = DirSnapshot::read(vendor_root)?;
    for host in &hosts.dirs {
        let repos = DirSnapshot::read(&hosts.path.join(host))?;
        for repo in &repos.dirs {
            repos_seen += 1;
            let repo_path = repos.path.join(repo);
            let name = relative_name(vendor_root, &repo_path);
            let first = tree.candidates.len();

            match resolver.resolve(&repo_path, &mut tree.candidates) {
                Resolution::Licensed => {
                    for file in &tree.candidates[first..] {
                        tree.owners.insert(file.clone(), name.clone());
                    }
                }
                Resolution::Unlicensed => {
                    debug!(repo = %name, "no license file");
                    tree.candidates.truncate(first);
                    tree.unlicensed.push(name);
                }
                Resolution::Unreadable(ScanError::Cancelled) => return Err(ScanError::Cancelled),
                Resolution::Unreadable(e) => match on_unreadable {
                    UnreadablePolicy::Abort => return Err(e),
                    UnreadablePolicy::SkipRepo => {
                        warn!(repo = %name, error = %e, "skipping unreadable repo");
                        tree.candidates.truncate(first);
                        tree.unreadable.push((name, e));
                    }
                },
            }
        }
    }

    info!(
        repos = repos_seen,
        candidates = tree.candidates.len(),
        dirs = resolver.visited(),
        "vendor tree resolved"
    );
    Ok(tree)
}

/// Every bucket whose license the allow-list does not name. An empty
/// allow-list accepts everything.
pub fn check_policy(report: &ComplianceReport, allow_list: &AllowList) -> Vec<Violation> {
    if allow_list.is_empty() {
        return Vec::new();
    }

    report
        .buckets
        .iter()
        .filter(|(license, _)| !allow_list.allows(license))
        .map(|(license, deps)| Violation {
            license: license.clone(),
            dependencies: deps.iter().cloned().collect(),
        })
        .collect()
}

/// `root/host/repo` → `host/repo`, always `/`-separated.
fn relative_name(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::license::fixtures::{APACHE_NOTICE, GPL_3_NOTICE, MIT};
    use crate::license::oracle::PhraseOracle;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::TempDir;

    fn auditor(options: AuditOptions) -> Auditor {
        Auditor::new(Arc::new(PhraseOracle::new().unwrap()), options)
    }

    fn write(root: &Path, rel: &str, text: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_end_to_end_report() {
        let tmp = TempDir::new().unwrap();
        let vendor = tmp.path().join("vendor");
        write(&vendor, "hostA/repoA/LICENSE", MIT);
        fs::create_dir_all(vendor.join("hostB/repoB")).unwrap();
        let output = tmp.path().join("licenses.json");

        let outcome = auditor(AuditOptions::default())
            .process(&vendor, Some(&output))
            .await
            .unwrap();

        let mut expected = ComplianceReport::default();
        expected.insert("MIT", "hostA/repoA");
        expected.insert(UNKNOWN, "hostB/repoB");
        assert_eq!(outcome.report, expected);
        assert!(outcome.passed());
        assert_eq!(outcome.candidates, 1);

        let written: ComplianceReport =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written, expected);
    }

    #[tokio::test]
    async fn test_allow_list_flags_every_forbidden_bucket() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "github.com/ok/LICENSE", MIT);
        write(tmp.path(), "github.com/copyleft/COPYING", GPL_3_NOTICE);

        let options = AuditOptions {
            allow_list: ["MIT"].into_iter().collect(),
            ..Default::default()
        };
        let outcome = auditor(options).process(tmp.path(), None).await.unwrap();

        assert!(!outcome.passed());
        assert_eq!(
            outcome.violations,
            vec![Violation {
                license: "GPL-3.0".to_string(),
                dependencies: vec!["github.com/copyleft".to_string()],
            }]
        );
    }

    #[test]
    fn test_check_policy() {
        let mut report = ComplianceReport::default();
        report.insert("MIT", "a/x");
        report.insert("GPL-3.0", "b/y");
        report.insert("GPL-3.0", "c/z");

        let allow: AllowList = ["MIT"].into_iter().collect();
        let violations = check_policy(&report, &allow);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].license, "GPL-3.0");
        assert_eq!(violations[0].dependencies, vec!["b/y", "c/z"]);

        assert!(check_policy(&report, &AllowList::default()).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_bucket_is_subject_to_allow_list() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "h/licensed/LICENSE", MIT);
        fs::create_dir_all(tmp.path().join("h/bare")).unwrap();

        let options = AuditOptions {
            allow_list: ["MIT"].into_iter().collect(),
            ..Default::default()
        };
        let outcome = auditor(options).process(tmp.path(), None).await.unwrap();
        assert_eq!(outcome.violations.len(), 1);
        assert_eq!(outcome.violations[0].license, UNKNOWN);
    }

    #[tokio::test]
    async fn test_zero_matches_fails_the_run() {
        let tmp = TempDir::new().unwrap();
        for repo in ["a", "b", "c"] {
            write(tmp.path(), &format!("host/{repo}/LICENSE"), "All rights reserved.");
        }

        let err = auditor(AuditOptions::default())
            .process(tmp.path(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::NoMatches { files: 3 }));
    }

    #[tokio::test]
    async fn test_no_candidates_is_not_an_error() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("host/repo")).unwrap();
        fs::create_dir_all(tmp.path().join("empty-host")).unwrap();

        let outcome = auditor(AuditOptions::default())
            .process(tmp.path(), None)
            .await
            .unwrap();
        assert_eq!(outcome.report.get(UNKNOWN), Some(&set(&["host/repo"])));
        assert_eq!(outcome.report.dependency_count(), 1);
    }

    #[tokio::test]
    async fn test_dual_license_file_lands_in_one_bucket() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "h/dual/LICENSE", &format!("{MIT}\n{APACHE_NOTICE}"));

        for tie_break in [TieBreak::Last, TieBreak::HighestConfidence] {
            let options = AuditOptions {
                tie_break,
                ..Default::default()
            };
            let outcome = auditor(options).process(tmp.path(), None).await.unwrap();
            assert_eq!(outcome.report.buckets.len(), 1, "{tie_break:?}");
            assert_eq!(outcome.report.dependency_count(), 1, "{tie_break:?}");
            if tie_break == TieBreak::Last {
                assert_eq!(outcome.report.get("Apache-2.0"), Some(&set(&["h/dual"])));
            }
        }
    }

    #[tokio::test]
    async fn test_repo_with_licensed_subpackages() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "h/mono/core/LICENSE", MIT);
        write(tmp.path(), "h/mono/extra/LICENSE.txt", APACHE_NOTICE);

        let outcome = auditor(AuditOptions::default())
            .process(tmp.path(), None)
            .await
            .unwrap();
        assert_eq!(outcome.report.get("MIT"), Some(&set(&["h/mono"])));
        assert_eq!(outcome.report.get("Apache-2.0"), Some(&set(&["h/mono"])));
        assert!(outcome.report.get(UNKNOWN).is_none());
    }

    #[tokio::test]
    async fn test_partially_licensed_repo_is_only_unknown() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "h/ok/LICENSE", MIT);
        write(tmp.path(), "h/r/a/LICENSE", MIT);
        fs::create_dir_all(tmp.path().join("h/r/b")).unwrap();

        let outcome = auditor(AuditOptions::default())
            .process(tmp.path(), None)
            .await
            .unwrap();
        assert_eq!(outcome.report.get("MIT"), Some(&set(&["h/ok"])));
        assert_eq!(outcome.report.get(UNKNOWN), Some(&set(&["h/r"])));
        assert_eq!(outcome.candidates, 1);
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_non_utf8_repo_name_is_readable() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "h/good/LICENSE", MIT);
        let odd = tmp.path().join("h").join(OsStr::from_bytes(b"caf\xe9"));
        fs::create_dir_all(&odd).unwrap();
        fs::write(odd.join("LICENSE"), MIT).unwrap();

        let outcome = auditor(AuditOptions::default())
            .process(tmp.path(), None)
            .await
            .unwrap();
        assert_eq!(
            outcome.report.get("MIT"),
            Some(&set(&["h/caf\u{FFFD}", "h/good"]))
        );
        assert!(outcome.file_errors.is_empty());
    }

    #[tokio::test]
    async fn test_deadline_covers_directory_walk() {
        let tmp = TempDir::new().unwrap();
        for i in 0..3000 {
            write(tmp.path(), &format!("h/r{i}/pkg/LICENSE"), "x");
        }

        let start = Instant::now();
        let err = auditor(AuditOptions::default())
            .process(tmp.path(), None)
            .await
            .unwrap_err();
        let full_run = start.elapsed();
        assert!(matches!(err, ScanError::NoMatches { files: 3000 }));

        let options = AuditOptions {
            deadline: Some(Duration::from_millis(1)),
            ..Default::default()
        };
        let start = Instant::now();
        let err = auditor(options).process(tmp.path(), None).await.unwrap_err();
        let elapsed = start.elapsed();

        assert!(matches!(err, ScanError::Timeout(d) if d == Duration::from_millis(1)));
        assert!(elapsed < full_run, "timed out after {elapsed:?}, full run took {full_run:?}");
    }

    #[tokio::test]
    async fn test_missing_vendor_root_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let err = auditor(AuditOptions::default())
            .process(&tmp.path().join("vendor"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::ReadDir { .. }));
    }

    #[tokio::test]
    async fn test_exhausted_deadline_times_out() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "h/r/LICENSE", MIT);

        let options = AuditOptions {
            deadline: Some(Duration::ZERO),
            ..Default::default()
        };
        let err = auditor(options).process(tmp.path(), None).await.unwrap_err();
        assert!(err.is_timeout());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_license_file_buckets_repo_as_unknown() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "h/good/LICENSE", MIT);
        fs::create_dir_all(tmp.path().join("h/broken")).unwrap();
        std::os::unix::fs::symlink(
            tmp.path().join("nowhere"),
            tmp.path().join("h/broken/LICENSE"),
        )
        .unwrap();

        let outcome = auditor(AuditOptions::default())
            .process(tmp.path(), None)
            .await
            .unwrap();
        assert_eq!(outcome.file_errors.len(), 1);
        assert_eq!(outcome.report.get("MIT"), Some(&set(&["h/good"])));
        assert_eq!(outcome.report.get(UNKNOWN), Some(&set(&["h/broken"])));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_repo_policy() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "h/good/LICENSE", MIT);
        let locked = tmp.path().join("h/locked");
        fs::create_dir_all(locked.join("sub")).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&locked).is_ok() {
            // Privileged users can list anything; nothing to test.
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let err = auditor(AuditOptions::default())
            .process(tmp.path(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, ScanError::ReadDir { .. }));

        let options = AuditOptions {
            on_unreadable: UnreadablePolicy::SkipRepo,
            ..Default::default()
        };
        let outcome = auditor(options).process(tmp.path(), None).await.unwrap();
        assert_eq!(outcome.unreadable.len(), 1);
        assert_eq!(outcome.unreadable[0].0, "h/locked");
        assert_eq!(outcome.report.get("MIT"), Some(&set(&["h/good"])));
        assert_eq!(outcome.report.dependency_count(), 1);

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
    }

    #[test]
    fn test_relative_name() {
        assert_eq!(
            relative_name(Path::new("./vendor/"), Path::new("./vendor/github.com/foo")),
            "github.com/foo"
        );
    }
}
