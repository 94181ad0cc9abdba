use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};

/// Error type for durable store writes
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("could not create data directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: io::Error,
    },
    #[error("could not serialize {name}: {source}")]
    Serialize {
        name: String,
        source: serde_json::Error,
    },
    #[error("could not save {path} after {attempts} attempt(s): {source}")]
    Write {
        path: PathBuf,
        attempts: usize,
        source: io::Error,
    },
}

/// The logical documents the store knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocKind {
    /// The keyword database
    Catalog,
    /// Vendor-scoped issue lists and delimiters
    IssueConfig,
    /// Window layout and last selection
    UiState,
}

impl DocKind {
    pub const ALL: [DocKind; 3] = [DocKind::Catalog, DocKind::IssueConfig, DocKind::UiState];

    pub fn file_name(self) -> &'static str {
        match self {
            DocKind::Catalog => "keywords_db.json",
            DocKind::IssueConfig => "issues_config.json",
            DocKind::UiState => "ui_state.json",
        }
    }
}

impl fmt::Display for DocKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Delays slept before each write attempt. One attempt per delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    delays: Vec<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy::from_millis(&[0, 30, 60, 120, 250, 500, 900])
    }
}

impl RetryPolicy {
    /// An empty delay list still allows a single immediate attempt.
    pub fn new(delays: Vec<Duration>) -> Self {
        if delays.is_empty() {
            return RetryPolicy {
                delays: vec![Duration::ZERO],
            };
        }
        RetryPolicy { delays }
    }

    pub fn from_millis(ms: &[u64]) -> Self {
        RetryPolicy::new(ms.iter().map(|m| Duration::from_millis(*m)).collect())
    }

    /// `attempts` tries with no waiting in between.
    pub fn immediate(attempts: usize) -> Self {
        RetryPolicy::new(vec![Duration::ZERO; attempts.max(1)])
    }

    pub fn attempts(&self) -> usize {
        self.delays.len()
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

/// Run `op` until it succeeds or the policy runs out of attempts, sleeping the
/// policy's delay before each attempt. `op` receives the 0-based attempt number.
/// The last error is returned when every attempt fails.
pub fn retry_with_backoff<T, F>(policy: &RetryPolicy, mut op: F) -> io::Result<T>
where
    F: FnMut(usize) -> io::Result<T>,
{
    let mut last_err = None;
    for (attempt, delay) in policy.delays().iter().enumerate() {
        if !delay.is_zero() {
            std::thread::sleep(*delay);
        }
        match op(attempt) {
            Ok(value) => {
                if attempt > 0 {
                    tracing::info!(attempt = attempt + 1, "write succeeded after retry");
                }
                return Ok(value);
            }
            Err(e) => {
                tracing::warn!(attempt = attempt + 1, error = %e, "write attempt failed");
                last_err = Some(e);
            }
        }
    }
    Err(last_err.unwrap_or_else(|| io::Error::other("no write attempts allowed")))
}

// ---------------------------------------------------------------------------
// Atomic file write
// ---------------------------------------------------------------------------

/// Write `content` to `path` atomically: temp file in the same directory,
/// flushed and synced, then renamed over the target. The temp file is removed
/// on any failure, and the target is either the old or the new content.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// `atomic_write` under a retry policy.
pub fn atomic_write_with_retry(
    path: &Path,
    content: &[u8],
    policy: &RetryPolicy,
) -> Result<(), StoreError> {
    write_with(path, content, policy, atomic_write)
}

fn write_with<F>(
    path: &Path,
    content: &[u8],
    policy: &RetryPolicy,
    mut write: F,
) -> Result<(), StoreError>
where
    F: FnMut(&Path, &[u8]) -> io::Result<()>,
{
    retry_with_backoff(policy, |_| write(path, content)).map_err(|source| StoreError::Write {
        path: path.to_path_buf(),
        attempts: policy.attempts(),
        source,
    })
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// JSON documents in one data directory
#[derive(Debug, Clone)]
pub struct Store {
    dir: PathBuf,
    policy: RetryPolicy,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Store::with_policy(dir, RetryPolicy::default())
    }

    pub fn with_policy(dir: impl Into<PathBuf>, policy: RetryPolicy) -> Self {
        Store {
            dir: dir.into(),
            policy,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn path(&self, kind: DocKind) -> PathBuf {
        self.dir.join(kind.file_name())
    }

    /// Read a document. Missing, unreadable, non-JSON or non-object files all
    /// read as an empty object.
    pub fn load(&self, kind: DocKind) -> Map<String, Value> {
        let path = self.path(kind);
        match read_object(&path) {
            Ok(Some(doc)) => doc,
            Ok(None) => {
                tracing::debug!(path = %path.display(), "document missing, starting empty");
                Map::new()
            }
            Err(reason) => {
                tracing::warn!(path = %path.display(), %reason, "ignoring unreadable document");
                Map::new()
            }
        }
    }

    /// Persist a document atomically, retrying transient failures. When every
    /// attempt fails the serialized document is copied to the recovery log
    /// before the error is returned.
    pub fn save(&self, kind: DocKind, doc: &Map<String, Value>) -> Result<(), StoreError> {
        self.save_to(&self.path(kind), &Value::Object(doc.clone()))
    }

    /// Persist any JSON value to an explicit path with the same guarantees.
    pub fn save_to(&self, path: &Path, value: &Value) -> Result<(), StoreError> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content = serde_json::to_string_pretty(value).map_err(|source| {
            StoreError::Serialize {
                name: name.clone(),
                source,
            }
        })?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| StoreError::CreateDir {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let result = atomic_write_with_retry(path, content.as_bytes(), &self.policy);
        if let Err(e) = &result {
            self.record_failed_write(&name, e, content);
        }
        result
    }

    fn record_failed_write(&self, name: &str, err: &StoreError, content: String) {
        if fs::create_dir_all(&self.dir).is_err() {
            return;
        }
        recovery::log_recovery(
            &self.dir,
            RecoveryEntry {
                timestamp: chrono::Utc::now(),
                category: RecoveryCategory::Write,
                description: format!("{} save failed", name),
                fields: vec![
                    ("Target".to_string(), name.to_string()),
                    ("Attempts".to_string(), self.policy.attempts().to_string()),
                    ("Error".to_string(), err.to_string()),
                ],
                body: content,
            },
        );
    }
}

/// `Ok(None)` when the file does not exist; `Err` describes why a present
/// file was not usable.
fn read_object(path: &Path) -> Result<Option<Map<String, Value>>, String> {
    let text = match fs::read_to_string(path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err("top-level value is not an object".to_string()),
        Err(e) => Err(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn obj(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn load_missing_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        assert!(store.load(DocKind::Catalog).is_empty());
    }

    #[test]
    fn load_garbage_or_non_object_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path());
        fs::write(store.path(DocKind::Catalog), "not json {{{").unwrap();
        fs::write(store.path(DocKind::IssueConfig), "[1, 2, 3]").unwrap();
        assert!(store.load(DocKind::Catalog).is_empty());
        assert!(store.load(DocKind::IssueConfig).is_empty());
    }

    #[test]
    fn save_and_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = Store::new(tmp.path().join("nested"));
        let doc = obj(json!({"vendors": {"MTK": {"issues": ["데이터 이슈"], "delimiter": ";"}}}));
        store.save(DocKind::IssueConfig, &doc).unwrap();

        assert_eq!(store.load(DocKind::IssueConfig), doc);
        let text = fs::read_to_string(store.path(DocKind::IssueConfig)).unwrap();
        assert!(text.contains("데이터 이슈"), "non-ASCII is written unescaped");
        assert_eq!(dir_entries(store.dir()), vec!["issues_config.json"]);
    }

    #[test]
    fn atomic_write_replaces_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.json");
        atomic_write(&path, b"old").unwrap();
        atomic_write(&path, b"new").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new");
        assert_eq!(dir_entries(tmp.path()), vec!["doc.json"]);
    }

    #[test]
    fn transient_failures_then_success_leave_exact_content() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("keywords_db.json");
        fs::write(&path, "{\"previous\": true}").unwrap();
        let intended = b"{\"MTK\": {}}";

        let mut calls = 0;
        let result = write_with(&path, intended, &RetryPolicy::immediate(7), |p, c| {
            calls += 1;
            if calls <= 3 {
                // A temp file that is written then abandoned, as a locked target would.
                let mut tmp = NamedTempFile::new_in(p.parent().unwrap())?;
                tmp.write_all(&c[..c.len() / 2])?;
                return Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"));
            }
            atomic_write(p, c)
        });

        result.unwrap();
        assert_eq!(calls, 4);
        assert_eq!(fs::read(&path).unwrap(), intended);
        assert_eq!(dir_entries(tmp.path()), vec!["keywords_db.json"]);
    }

    #[test]
    fn exhausted_retries_report_attempts_and_keep_old_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("doc.json");
        fs::write(&path, "old").unwrap();

        let err = write_with(&path, b"new", &RetryPolicy::immediate(3), |_, _| {
            Err(io::Error::new(io::ErrorKind::PermissionDenied, "locked"))
        })
        .unwrap_err();

        match err {
            StoreError::Write { attempts, source, .. } => {
                assert_eq!(attempts, 3);
                assert_eq!(source.kind(), io::ErrorKind::PermissionDenied);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
    }

    #[test]
    fn failed_save_is_copied_to_recovery_log() {
        let tmp = TempDir::new().unwrap();
        let store = Store::with_policy(tmp.path(), RetryPolicy::immediate(2));
        // A directory at the target path makes the final rename fail every time.
        fs::create_dir(store.path(DocKind::Catalog)).unwrap();

        let doc = obj(json!({"MTK": {"Data": {}}}));
        let err = store.save(DocKind::Catalog, &doc).unwrap_err();
        assert!(matches!(err, StoreError::Write { attempts: 2, .. }));

        let entries = recovery::read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Write);
        assert!(entries[0].body.contains("\"MTK\""));
        // no temp files left behind by the failed attempts
        assert_eq!(
            dir_entries(tmp.path()),
            vec![".recovery.log", "keywords_db.json"]
        );
    }

    #[test]
    fn retry_counts_attempts() {
        let mut seen = Vec::new();
        let out = retry_with_backoff(&RetryPolicy::immediate(5), |attempt| {
            seen.push(attempt);
            if attempt < 2 {
                Err(io::Error::other("busy"))
            } else {
                Ok(attempt)
            }
        })
        .unwrap();
        assert_eq!(out, 2);
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn default_policy_is_bounded() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.attempts(), 7);
        assert_eq!(policy.delays()[0], Duration::ZERO);
        assert_eq!(*policy.delays().last().unwrap(), Duration::from_millis(900));
        assert_eq!(RetryPolicy::new(Vec::new()).attempts(), 1);
    }
}
