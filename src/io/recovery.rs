use std::fmt::{self, Write as _};
use std::fs::{self, OpenOptions};
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use indexmap::IndexMap;
use serde::Serialize;

/// Entries older than this many days are dropped by a default prune.
pub const PRUNE_AGE_DAYS: i64 = 30;

const LOG_FILE: &str = ".recovery.log";

const PREAMBLE: &str = "\
<!-- keyguide recovery log
     Documents that could not be saved, and catalogs replaced by an import.
     Copy a body back into the matching .json file to restore it.
     `kg recovery` lists entries, `kg recovery --prune` drops old ones. -->

";

const ENTRY_PREFIX: &str = "### ";
const FIELD_PREFIX: &str = "- ";
const BODY_OPEN: &str = "```json";
const BODY_CLOSE: &str = "```";

/// Why an entry was written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecoveryCategory {
    /// A document save exhausted its retries
    Write,
    /// An import replaced the existing catalog
    Import,
}

impl RecoveryCategory {
    fn as_str(self) -> &'static str {
        match self {
            RecoveryCategory::Write => "write",
            RecoveryCategory::Import => "import",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        [RecoveryCategory::Write, RecoveryCategory::Import]
            .into_iter()
            .find(|c| c.as_str() == tag)
    }
}

impl fmt::Display for RecoveryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One saved document with the circumstances it was saved under.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryEntry {
    pub timestamp: DateTime<Utc>,
    pub category: RecoveryCategory,
    pub description: String,
    /// Ordered `key: value` details (target file, attempts, error)
    pub fields: Vec<(String, String)>,
    /// The JSON document that would otherwise be lost
    pub body: String,
}

/// `kg recovery --json` shape
#[derive(Serialize)]
struct EntryJson<'a> {
    timestamp: String,
    category: RecoveryCategory,
    description: &'a str,
    fields: IndexMap<&'a str, &'a str>,
    body: &'a str,
}

impl RecoveryEntry {
    pub fn to_json(&self) -> serde_json::Value {
        let view = EntryJson {
            timestamp: self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            category: self.category,
            description: &self.description,
            fields: self
                .fields
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            body: &self.body,
        };
        serde_json::to_value(view).unwrap_or(serde_json::Value::Null)
    }
}

/// The entry exactly as it is stored in the log.
impl fmt::Display for RecoveryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}{} [{}] {}",
            ENTRY_PREFIX,
            self.timestamp.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.category,
            self.description
        )?;
        for (key, value) in &self.fields {
            writeln!(f, "{}{}: {}", FIELD_PREFIX, key, value)?;
        }
        if !self.body.is_empty() {
            writeln!(f, "{}", BODY_OPEN)?;
            writeln!(f, "{}", self.body.trim_end_matches('\n'))?;
            writeln!(f, "{}", BODY_CLOSE)?;
        }
        writeln!(f)
    }
}

pub fn recovery_log_path(data_dir: &Path) -> PathBuf {
    data_dir.join(LOG_FILE)
}

/// Append an entry. A log that cannot be written is reported on stderr and
/// otherwise ignored.
pub fn log_recovery(data_dir: &Path, entry: RecoveryEntry) {
    let path = recovery_log_path(data_dir);
    if let Err(e) = append_entry(&path, &entry) {
        eprintln!("warning: could not write to recovery log: {}", e);
        return;
    }
    tracing::info!(path = %path.display(), category = %entry.category, "recovery entry written");
}

fn append_entry(path: &Path, entry: &RecoveryEntry) -> io::Result<()> {
    let fresh = fs::metadata(path).map_or(true, |m| m.len() == 0);
    let mut text = String::new();
    if fresh {
        text.push_str(PREAMBLE);
    }
    // Writing into a String cannot fail.
    let _ = write!(text, "{}", entry);
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?
        .write_all(text.as_bytes())
}

/// Entries newest first, at most `limit` of them.
pub fn read_recovery_entries(data_dir: &Path, limit: Option<usize>) -> Vec<RecoveryEntry> {
    let Ok(text) = fs::read_to_string(recovery_log_path(data_dir)) else {
        return Vec::new();
    };
    let mut entries = parse_log(&text);
    entries.reverse();
    if let Some(n) = limit {
        entries.truncate(n);
    }
    entries
}

fn parse_log(text: &str) -> Vec<RecoveryEntry> {
    let mut entries: Vec<RecoveryEntry> = Vec::new();
    let mut in_body = false;
    let mut current: Option<RecoveryEntry> = None;

    for line in text.lines() {
        if in_body {
            if line == BODY_CLOSE {
                in_body = false;
            } else if let Some(entry) = current.as_mut() {
                if !entry.body.is_empty() {
                    entry.body.push('\n');
                }
                entry.body.push_str(line);
            }
            continue;
        }
        if let Some(header) = line.strip_prefix(ENTRY_PREFIX) {
            entries.extend(current.take());
            current = parse_header(header);
        } else if line == BODY_OPEN {
            in_body = true;
        } else if let Some(field) = line.strip_prefix(FIELD_PREFIX)
            && let Some(entry) = current.as_mut()
            && let Some((key, value)) = field.split_once(": ")
        {
            entry.fields.push((key.to_string(), value.to_string()));
        }
    }
    entries.extend(current);
    entries
}

/// `<rfc3339> [<category>] <description>`
fn parse_header(header: &str) -> Option<RecoveryEntry> {
    let (stamp, rest) = header.split_once(' ')?;
    let timestamp = DateTime::parse_from_rfc3339(stamp).ok()?.with_timezone(&Utc);
    let (tag, description) = rest.strip_prefix('[')?.split_once("] ")?;
    Some(RecoveryEntry {
        timestamp,
        category: RecoveryCategory::from_tag(tag)?,
        description: description.to_string(),
        fields: Vec::new(),
        body: String::new(),
    })
}

/// Drop entries older than `before` (default: [`PRUNE_AGE_DAYS`] ago), or
/// every entry when `all` is set. Returns how many were dropped.
pub fn prune_recovery(
    data_dir: &Path,
    before: Option<DateTime<Utc>>,
    all: bool,
) -> io::Result<usize> {
    let path = recovery_log_path(data_dir);
    let text = match fs::read_to_string(&path) {
        Ok(t) => t,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e),
    };

    let cutoff = before.unwrap_or_else(|| Utc::now() - chrono::Duration::days(PRUNE_AGE_DAYS));
    let entries = parse_log(&text);
    let total = entries.len();
    let mut out = String::from(PREAMBLE);
    let mut kept = 0;
    for entry in entries.iter().filter(|e| !all && e.timestamp >= cutoff) {
        let _ = write!(out, "{}", entry);
        kept += 1;
    }
    crate::io::store::atomic_write(&path, out.as_bytes())?;
    Ok(total - kept)
}
