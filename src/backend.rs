use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use futures::stream::{self, StreamExt};
use indicatif::ProgressBar;
use tracing::{debug, warn};

use crate::comments::{self, detect_language};
use crate::error::ScanError;
use crate::license::oracle::LicenseOracle;
use crate::models::Match;

/// Default worker pool capacity.
pub const DEFAULT_JOBS: usize = 1000;

#[derive(Debug, Clone)]
pub struct BackendOptions {
    /// Maximum number of files classified at once.
    pub jobs: usize,
    /// Classify only comment bodies of files whose language is recognized.
    pub comments_only: bool,
    /// Advanced once per finished file.
    pub progress: Option<ProgressBar>,
}

impl Default for BackendOptions {
    fn default() -> Self {
        Self {
            jobs: DEFAULT_JOBS,
            comments_only: true,
            progress: None,
        }
    }
}

/// Append-only collection of matches shared by every worker.
///
/// Each worker appends all matches of one file in a single locked call, so
/// a file's matches stay contiguous and in oracle order.
#[derive(Debug, Default)]
pub struct MatchSet {
    inner: Mutex<Vec<Match>>,
}

impl MatchSet {
    pub fn append(&self, batch: Vec<Match>) {
        if batch.is_empty() {
            return;
        }
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(batch);
    }

    pub fn snapshot(&self) -> Vec<Match> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Classifies candidate license files on a bounded worker pool.
pub struct Backend {
    oracle: Arc<dyn LicenseOracle>,
    options: BackendOptions,
    results: Arc<MatchSet>,
    cancelled: Arc<AtomicBool>,
}

impl Backend {
    pub fn new(oracle: Arc<dyn LicenseOracle>, options: BackendOptions) -> Self {
        Self {
            oracle,
            options,
            results: Arc::new(MatchSet::default()),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Share `flag` as the cancellation signal, so a caller can stop the
    /// workers from outside.
    pub fn with_cancel(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancelled = flag;
        self
    }

    /// Classify every file in `paths`, returning one error per file that
    /// could not be classified. A failing file never stops the others.
    pub async fn classify_all(&self, paths: &[PathBuf]) -> Vec<ScanError> {
        let jobs = self.options.jobs.max(1);
        debug!(files = paths.len(), jobs, "classifying license files");
        if let Some(pb) = &self.options.progress {
            pb.set_length(paths.len() as u64);
        }

        stream::iter(paths.iter().cloned())
            .map(|path| self.classify_file(path))
            .buffer_unordered(jobs)
            .filter_map(|result| async move { result.err() })
            .collect()
            .await
    }

    /// Like [`Backend::classify_all`], but give up once `deadline` elapses.
    ///
    /// On expiry the only error returned is [`ScanError::Timeout`]. Files not
    /// yet started are never admitted, and running workers stop at their
    /// next chunk boundary without publishing their matches. The backend
    /// stays cancelled afterwards.
    pub async fn classify_all_until(&self, paths: &[PathBuf], deadline: Duration) -> Vec<ScanError> {
        match tokio::time::timeout(deadline, self.classify_all(paths)).await {
            Ok(errors) => errors,
            Err(_) => {
                self.cancel();
                warn!(?deadline, "classification deadline exceeded, cancelling workers");
                vec![ScanError::Timeout(deadline)]
            }
        }
    }

    /// Matches collected so far. Complete only once classification returned.
    pub fn results(&self) -> Vec<Match> {
        self.results.snapshot()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    async fn classify_file(&self, path: PathBuf) -> Result<(), ScanError> {
        let result = self.run_worker(path).await;
        if let Some(pb) = &self.options.progress {
            pb.inc(1);
        }
        result
    }

    async fn run_worker(&self, path: PathBuf) -> Result<(), ScanError> {
        if self.is_cancelled() {
            return Ok(());
        }

        let contents = tokio::fs::read(&path)
            .await
            .map_err(|source| ScanError::ReadFile {
                path: path.clone(),
                source,
            })?;

        let oracle = Arc::clone(&self.oracle);
        let results = Arc::clone(&self.results);
        let cancelled = Arc::clone(&self.cancelled);
        let comments_only = self.options.comments_only;
        let file = path.clone();

        let worker = tokio::task::spawn_blocking(move || {
            let text = String::from_utf8_lossy(&contents);
            let language = if comments_only {
                detect_language(&file)
            } else {
                None
            };

            let mut local = Vec::new();
            for chunk in comments::chunks(&text, language) {
                if cancelled.load(Ordering::SeqCst) {
                    return;
                }
                local.extend(oracle.matches(&chunk).into_iter().map(|m| Match {
                    file: file.clone(),
                    license: m.name,
                    confidence: m.confidence,
                    offset: m.offset,
                    extent: m.extent,
                }));
            }

            if cancelled.load(Ordering::SeqCst) {
                return;
            }
            debug!(path = %file.display(), matches = local.len(), "classified");
            results.append(local);
        });

        worker.await.map_err(|e| ScanError::Worker {
            path,
            message: e.to_string(),
        })
    }
}
