use std::path::Path;
use std::time::Instant;

use chrono::Utc;
use serde_json::{Map, Value};

use crate::io::recovery::{self, RecoveryCategory, RecoveryEntry};
use crate::io::settings_io::{SettingsError, read_settings};
use crate::io::state::UiState;
use crate::io::store::{DocKind, RetryPolicy, Store, StoreError};
use crate::model::catalog::{COMMON_CATEGORY, Catalog, Category};
use crate::model::config::IssueConfig;
use crate::model::keyword::KeywordDraft;
use crate::model::settings::Settings;
use crate::ops::feedback::FeedbackTimer;
use crate::ops::package::{SchemaError, build_export, validate_package};
use crate::ops::reconcile::{SyncReport, reconcile_config, sync_with_catalog};
use crate::ops::selection::Selection;
use crate::ops::template::{CopyMode, copy_text, joined_template};
use crate::ops::{NameKind, ValidationError, catalog_ops, keyword_ops};
use crate::parse::{parse_catalog, serialize_catalog};

#[derive(Debug, thiserror::Error)]
pub enum WorkspaceError {
    #[error("{0}")]
    Validation(#[from] ValidationError),
    #[error("{0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Schema(#[from] SchemaError),
    #[error("{0}")]
    Settings(#[from] SettingsError),
}

/// A user edit. Keyword and param commands address their category with `at`.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    AddIssue { vendor: String, name: String },
    DeleteIssue { vendor: String, name: String },
    RenameIssue { vendor: String, old: String, new: String },
    AddCategory { vendor: String, issue: String, name: String },
    DeleteCategory { vendor: String, issue: String, name: String },
    RenameCategory {
        vendor: String,
        issue: String,
        old: String,
        new: String,
    },
    AddKeyword { at: Selection, draft: KeywordDraft },
    EditKeyword {
        at: Selection,
        index: usize,
        draft: KeywordDraft,
    },
    RemoveKeyword { at: Selection, index: usize },
    MoveKeywordUp { at: Selection, index: usize },
    MoveKeywordDown { at: Selection, index: usize },
    SetParam {
        at: Selection,
        name: String,
        value: String,
    },
    RemoveParam { at: Selection, name: String },
    SetDelimiter { vendor: String, delimiter: String },
}

impl Command {
    /// The documents this command rewrites.
    fn touches(&self) -> &'static [DocKind] {
        match self {
            Command::AddIssue { .. } | Command::DeleteIssue { .. } | Command::RenameIssue { .. } => {
                &[DocKind::Catalog, DocKind::IssueConfig]
            }
            Command::SetDelimiter { .. } => &[DocKind::IssueConfig],
            _ => &[DocKind::Catalog],
        }
    }
}

/// What a successful command produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The (trimmed) name that was created or renamed to
    Name(String),
    /// The keyword's index after the command
    Index(usize),
    /// The command removed something, or changed nothing that has an identity
    Done,
    /// Removing a param that was not there
    Unchanged,
}

/// A placeholder of a keyword with its current value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub value: String,
}

/// What an open or import had to repair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// The catalog was empty and the default vendors were created
    pub seeded: bool,
    pub sync: SyncReport,
    /// Documents rewritten because their stored form was out of date
    pub catalog_rewritten: bool,
    pub config_rewritten: bool,
}

/// The open data directory: model, config, UI state and the store behind them.
#[derive(Debug)]
pub struct Workspace {
    store: Store,
    settings: Settings,
    catalog: Catalog,
    config: IssueConfig,
    ui_state: UiState,
    selection: Option<Selection>,
    feedback: FeedbackTimer<usize>,
    report: LoadReport,
    /// Documents whose last save failed; retried by `close`.
    unsaved: Vec<DocKind>,
}

impl Workspace {
    /// Open a data directory, reading `keyguide.toml` if present.
    pub fn open(dir: &Path) -> Result<Workspace, WorkspaceError> {
        let settings = read_settings(dir)?;
        let store = Store::with_policy(dir, RetryPolicy::new(settings.retry_delays()));
        Ok(Workspace::open_with(store, settings))
    }

    /// Load, reconcile and persist whatever reconciliation repaired. A failed
    /// repair write is logged and left for the next save.
    pub fn open_with(store: Store, settings: Settings) -> Workspace {
        let raw_db = store.load(DocKind::Catalog);
        let raw_cfg = store.load(DocKind::IssueConfig);
        let raw_ui = store.load(DocKind::UiState);

        let delimiter = settings.defaults.delimiter.clone();
        let (catalog, config, mut report) = reconcile_documents(&raw_db, &raw_cfg, &delimiter);
        let ui_state = UiState::from_document(&raw_ui);

        let db_doc = serialize_catalog(&catalog);
        let cfg_doc = config_document(&config);
        report.catalog_rewritten = report.sync.catalog_changed || db_doc != raw_db;
        report.config_rewritten = report.sync.config_changed || cfg_doc != raw_cfg;
        let mut unsaved = Vec::new();
        if report.catalog_rewritten
            && let Err(e) = store.save(DocKind::Catalog, &db_doc)
        {
            tracing::warn!(error = %e, "could not persist repaired catalog");
            unsaved.push(DocKind::Catalog);
        }
        if report.config_rewritten
            && let Err(e) = store.save(DocKind::IssueConfig, &cfg_doc)
        {
            tracing::warn!(error = %e, "could not persist repaired issue config");
            unsaved.push(DocKind::IssueConfig);
        }

        let selection = ui_state
            .last_selection
            .clone()
            .unwrap_or_default()
            .resolve(&catalog, &config);
        let feedback = FeedbackTimer::new(settings.copy_feedback());

        Workspace {
            store,
            settings,
            catalog,
            config,
            ui_state,
            selection,
            feedback,
            report,
            unsaved,
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &IssueConfig {
        &self.config
    }

    pub fn ui_state(&self) -> &UiState {
        &self.ui_state
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn dir(&self) -> &Path {
        self.store.dir()
    }

    pub fn load_report(&self) -> LoadReport {
        self.report
    }

    /// The current, always-valid selection.
    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    /// The vendor's delimiter (the configured default for unknown vendors).
    pub fn delimiter(&self, vendor: &str) -> &str {
        match self.config.vendor(vendor) {
            Some(v) => &v.delimiter,
            None => &self.settings.defaults.delimiter,
        }
    }

    pub fn category(&self, at: &Selection) -> Result<&Category, ValidationError> {
        if self.catalog.vendor(&at.vendor).is_none() {
            return Err(ValidationError::not_found(NameKind::Vendor, &at.vendor));
        }
        let issue = self
            .catalog
            .issue(&at.vendor, &at.issue)
            .ok_or_else(|| ValidationError::not_found(NameKind::Issue, &at.issue))?;
        issue
            .category(&at.category)
            .ok_or_else(|| ValidationError::not_found(NameKind::Category, &at.category))
    }

    fn category_mut(&mut self, at: &Selection) -> Result<&mut Category, ValidationError> {
        self.category(at)?;
        self.catalog
            .category_mut(&at.vendor, &at.issue, &at.category)
            .ok_or_else(|| ValidationError::not_found(NameKind::Category, &at.category))
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    /// Validate and apply a command, then write the affected documents. On a
    /// validation error nothing changes. On a store error the in-memory change
    /// is kept so the save can be retried.
    ///
    /// Adding an issue or category selects it; renaming the selected one
    /// keeps it selected under the new name.
    pub fn execute(&mut self, cmd: Command) -> Result<Outcome, WorkspaceError> {
        let touches = cmd.touches();
        let follow = self.follow_target(&cmd);
        let outcome = self.apply(cmd)?;
        if outcome != Outcome::Unchanged {
            for kind in touches {
                self.persist(*kind)?;
            }
        }
        if let Some((mut target, level)) = follow
            && let Outcome::Name(name) = &outcome
        {
            match level {
                NameKind::Issue => target.issue = name.clone(),
                _ => target.category = name.clone(),
            }
            self.selection = Some(target);
        }
        self.refresh_selection();
        Ok(outcome)
    }

    /// Where the selection goes if `cmd` succeeds, with the level the
    /// resulting name fills in.
    fn follow_target(&self, cmd: &Command) -> Option<(Selection, NameKind)> {
        let current = self.selection.as_ref();
        match cmd {
            Command::AddIssue { vendor, .. } => Some((
                Selection::new(vendor, "", COMMON_CATEGORY),
                NameKind::Issue,
            )),
            Command::RenameIssue { vendor, old, .. } => current
                .filter(|s| s.vendor == *vendor && s.issue == *old)
                .map(|s| (s.clone(), NameKind::Issue)),
            Command::AddCategory { vendor, issue, .. } => {
                Some((Selection::new(vendor, issue, ""), NameKind::Category))
            }
            Command::RenameCategory {
                vendor, issue, old, ..
            } => current
                .filter(|s| s.vendor == *vendor && s.issue == *issue && s.category == *old)
                .map(|s| (s.clone(), NameKind::Category)),
            _ => None,
        }
    }

    fn apply(&mut self, cmd: Command) -> Result<Outcome, ValidationError> {
        let outcome = match cmd {
            Command::AddIssue { vendor, name } => Outcome::Name(catalog_ops::add_issue(
                &mut self.config,
                &mut self.catalog,
                &vendor,
                &name,
            )?),
            Command::DeleteIssue { vendor, name } => {
                catalog_ops::delete_issue(&mut self.config, &mut self.catalog, &vendor, &name)?;
                Outcome::Done
            }
            Command::RenameIssue { vendor, old, new } => Outcome::Name(catalog_ops::rename_issue(
                &mut self.config,
                &mut self.catalog,
                &vendor,
                &old,
                &new,
            )?),
            Command::AddCategory {
                vendor,
                issue,
                name,
            } => Outcome::Name(catalog_ops::add_category(
                &mut self.catalog,
                &vendor,
                &issue,
                &name,
            )?),
            Command::DeleteCategory {
                vendor,
                issue,
                name,
            } => {
                catalog_ops::delete_category(&mut self.catalog, &vendor, &issue, &name)?;
                Outcome::Done
            }
            Command::RenameCategory {
                vendor,
                issue,
                old,
                new,
            } => Outcome::Name(catalog_ops::rename_category(
                &mut self.catalog,
                &vendor,
                &issue,
                &old,
                &new,
            )?),
            Command::SetDelimiter { vendor, delimiter } => {
                catalog_ops::set_delimiter(&mut self.config, &vendor, &delimiter)?;
                Outcome::Done
            }
            Command::AddKeyword { at, draft } => {
                let delimiter = self.delimiter(&at.vendor).to_string();
                let category = self.category_mut(&at)?;
                Outcome::Index(keyword_ops::add_keyword(category, draft, &delimiter)?)
            }
            Command::EditKeyword { at, index, draft } => {
                let delimiter = self.delimiter(&at.vendor).to_string();
                let category = self.category_mut(&at)?;
                keyword_ops::edit_keyword(category, index, draft, &delimiter)?;
                Outcome::Index(index)
            }
            Command::RemoveKeyword { at, index } => {
                keyword_ops::remove_keyword(self.category_mut(&at)?, index)?;
                Outcome::Done
            }
            Command::MoveKeywordUp { at, index } => {
                Outcome::Index(keyword_ops::move_up(self.category_mut(&at)?, index)?)
            }
            Command::MoveKeywordDown { at, index } => {
                Outcome::Index(keyword_ops::move_down(self.category_mut(&at)?, index)?)
            }
            Command::SetParam { at, name, value } => {
                Outcome::Name(keyword_ops::set_param(self.category_mut(&at)?, &name, &value)?)
            }
            Command::RemoveParam { at, name } => {
                if keyword_ops::remove_param(self.category_mut(&at)?, &name) {
                    Outcome::Done
                } else {
                    Outcome::Unchanged
                }
            }
        };
        Ok(outcome)
    }

    /// Move the selection to `wanted` (resolved against the model) and
    /// remember it in the UI state.
    pub fn select(&mut self, wanted: &Selection) -> Result<Option<Selection>, WorkspaceError> {
        self.selection = wanted.resolve(&self.catalog, &self.config);
        self.ui_state.last_selection = self.selection.clone();
        self.persist(DocKind::UiState)?;
        Ok(self.selection.clone())
    }

    /// Re-resolve after a change; a selection that moved is remembered.
    fn refresh_selection(&mut self) {
        let before = self.selection.take();
        self.selection = before
            .clone()
            .unwrap_or_default()
            .resolve(&self.catalog, &self.config);
        if self.selection == before {
            return;
        }
        self.ui_state.last_selection = self.selection.clone();
        if let Err(e) = self.persist(DocKind::UiState) {
            tracing::warn!(error = %e, "could not remember selection");
        }
    }

    // -----------------------------------------------------------------------
    // Keyword views
    // -----------------------------------------------------------------------

    /// Placeholders of a keyword with their values. Unknown placeholders are
    /// registered as empty params and the catalog is saved.
    pub fn inspect_keyword(
        &mut self,
        at: &Selection,
        index: usize,
    ) -> Result<Vec<Placeholder>, WorkspaceError> {
        let delimiter = self.delimiter(&at.vendor).to_string();
        let category = self.category_mut(at)?;
        let kw = category
            .keywords
            .get(index)
            .ok_or(ValidationError::IndexOutOfRange {
                index,
                len: category.keywords.len(),
            })?;
        let template = joined_template(kw, &delimiter).into_owned();
        let before = category.params.len();
        let names = keyword_ops::ensure_placeholder_params(category, &template);
        let placeholders = names
            .into_iter()
            .map(|name| {
                let value = category.params.get(&name).cloned().unwrap_or_default();
                Placeholder { name, value }
            })
            .collect();
        if category.params.len() != before {
            self.persist(DocKind::Catalog)?;
        }
        Ok(placeholders)
    }

    /// The clipboard text for a keyword. Arms the copy-feedback timer.
    pub fn copy_text(
        &mut self,
        at: &Selection,
        index: usize,
        mode: CopyMode,
    ) -> Result<String, WorkspaceError> {
        let category = self.category(at)?;
        let kw = category
            .keywords
            .get(index)
            .ok_or(ValidationError::IndexOutOfRange {
                index,
                len: category.keywords.len(),
            })?;
        let text = copy_text(kw, self.delimiter(&at.vendor), &category.params, mode);
        self.feedback.schedule(index, Instant::now());
        Ok(text)
    }

    /// The keyword whose "copied" marker should be shown, if any.
    pub fn copied_marker(&self) -> Option<usize> {
        self.feedback.pending().copied()
    }

    /// Clear the "copied" marker once its time is up. Returns the index reset.
    pub fn poll_feedback(&mut self, now: Instant) -> Option<usize> {
        self.feedback.poll(now)
    }

    // -----------------------------------------------------------------------
    // Export / import
    // -----------------------------------------------------------------------

    pub fn export_value(&self) -> Value {
        build_export(
            serialize_catalog(&self.catalog),
            config_document(&self.config),
            self.ui_state.to_document(),
            Utc::now(),
        )
    }

    /// Write an export package to `path`.
    pub fn export_package(&self, path: &Path) -> Result<Value, WorkspaceError> {
        let value = self.export_value();
        self.store.save_to(path, &value)?;
        tracing::info!(path = %path.display(), "exported package");
        Ok(value)
    }

    /// Replace catalog, config and UI state with an import package. The
    /// package is fully validated and reconciled before anything is replaced;
    /// on error the workspace is untouched. The replaced catalog is copied to
    /// the recovery log.
    pub fn import_package(&mut self, value: Value) -> Result<LoadReport, WorkspaceError> {
        let pkg = validate_package(value)?;
        let delimiter = self.settings.defaults.delimiter.clone();
        let (catalog, config, report) = reconcile_documents(&pkg.db, &pkg.issue_cfg, &delimiter);
        let ui_state = UiState::from_document(&pkg.ui_state);

        self.record_replaced_catalog(pkg.exported_at.as_deref());

        self.catalog = catalog;
        self.config = config;
        self.ui_state = ui_state;
        self.selection = self
            .ui_state
            .last_selection
            .clone()
            .unwrap_or_default()
            .resolve(&self.catalog, &self.config);
        tracing::info!(
            vendors = self.catalog.vendors.len(),
            version = pkg.schema_version.as_deref().unwrap_or("?"),
            "imported package"
        );

        self.save_all()?;
        Ok(LoadReport {
            catalog_rewritten: true,
            config_rewritten: true,
            ..report
        })
    }

    fn record_replaced_catalog(&self, exported_at: Option<&str>) {
        let body = match serde_json::to_string_pretty(&Value::Object(serialize_catalog(
            &self.catalog,
        ))) {
            Ok(text) => text,
            Err(_) => return,
        };
        if std::fs::create_dir_all(self.store.dir()).is_err() {
            return;
        }
        recovery::log_recovery(
            self.store.dir(),
            RecoveryEntry {
                timestamp: Utc::now(),
                category: RecoveryCategory::Import,
                description: "catalog replaced by import".to_string(),
                fields: vec![(
                    "Package exported at".to_string(),
                    exported_at.unwrap_or("unknown").to_string(),
                )],
                body,
            },
        );
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    fn persist(&mut self, kind: DocKind) -> Result<(), StoreError> {
        let doc = match kind {
            DocKind::Catalog => serialize_catalog(&self.catalog),
            DocKind::IssueConfig => config_document(&self.config),
            DocKind::UiState => self.ui_state.to_document(),
        };
        let result = self.store.save(kind, &doc);
        self.unsaved.retain(|k| *k != kind);
        if result.is_err() {
            self.unsaved.push(kind);
        }
        result
    }

    /// Write the given documents. Every one is attempted; the first error is
    /// returned.
    fn persist_each(&mut self, kinds: &[DocKind]) -> Result<(), WorkspaceError> {
        let mut first_err = None;
        for kind in kinds {
            if let Err(e) = self.persist(*kind)
                && first_err.is_none()
            {
                first_err = Some(e);
            }
        }
        match first_err {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Write all three documents.
    pub fn save_all(&mut self) -> Result<(), WorkspaceError> {
        self.persist_each(&DocKind::ALL)
    }

    /// Documents still waiting for a successful save.
    pub fn unsaved(&self) -> &[DocKind] {
        &self.unsaved
    }

    /// Retry any save that failed and drop the workspace.
    pub fn close(mut self) -> Result<(), WorkspaceError> {
        let pending = std::mem::take(&mut self.unsaved);
        if !pending.is_empty() {
            tracing::debug!(count = pending.len(), "retrying unsaved documents on close");
        }
        self.persist_each(&pending)
    }
}

/// Decode and cross-link raw documents. An empty catalog (and config naming
/// no vendors) is seeded with the defaults.
fn reconcile_documents(
    raw_db: &Map<String, Value>,
    raw_cfg: &Map<String, Value>,
    default_delimiter: &str,
) -> (Catalog, IssueConfig, LoadReport) {
    let mut report = LoadReport::default();
    let mut catalog = parse_catalog(raw_db);
    let config_has_vendors = matches!(raw_cfg.get("vendors"), Some(Value::Object(v)) if !v.is_empty());
    if catalog.is_empty() && !config_has_vendors {
        tracing::info!("catalog is empty, creating default vendors");
        catalog = Catalog::with_defaults();
        report.seeded = true;
    }
    let mut config = reconcile_config(raw_cfg, &catalog.vendor_names(), default_delimiter);
    report.sync = sync_with_catalog(&mut config, &mut catalog, default_delimiter);
    if report.sync.any() {
        tracing::info!(
            config = report.sync.config_changed,
            catalog = report.sync.catalog_changed,
            "reconciled issue config with catalog"
        );
    }
    (catalog, config, report)
}

fn config_document(config: &IssueConfig) -> Map<String, Value> {
    match serde_json::to_value(config) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::config::default_issues;
    use crate::ops::package::EXPORT_SCHEMA;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn open(tmp: &TempDir) -> Workspace {
        Workspace::open_with(
            Store::with_policy(tmp.path(), RetryPolicy::immediate(1)),
            Settings::default(),
        )
    }

    fn read_doc(tmp: &TempDir, kind: DocKind) -> Value {
        let text = fs::read_to_string(tmp.path().join(kind.file_name())).unwrap();
        serde_json::from_str(&text).unwrap()
    }

    fn first(ws: &Workspace) -> Selection {
        ws.selection().cloned().unwrap()
    }

    #[test]
    fn empty_start_creates_defaults_on_disk() {
        let tmp = TempDir::new().unwrap();
        let ws = open(&tmp);
        assert!(ws.load_report().seeded);

        let cfg = read_doc(&tmp, DocKind::IssueConfig);
        for vendor in ["MTK", "SLSI"] {
            assert_eq!(cfg["vendors"][vendor]["delimiter"], ";");
            assert_eq!(cfg["vendors"][vendor]["issues"], json!(default_issues()));
        }
        let db = read_doc(&tmp, DocKind::Catalog);
        for issue in default_issues() {
            assert_eq!(
                db["MTK"][&issue][COMMON_CATEGORY],
                json!({"_keywords": [], "_params": {}})
            );
        }
        assert_eq!(first(&ws), Selection::new("MTK", &default_issues()[0], COMMON_CATEGORY));
    }

    #[test]
    fn reopen_is_stable() {
        let tmp = TempDir::new().unwrap();
        drop(open(&tmp));
        let ws = open(&tmp);
        let report = ws.load_report();
        assert!(!report.seeded);
        assert!(!report.catalog_rewritten);
        assert!(!report.config_rewritten);
        assert!(ws.ui_state().last_selection.is_none());
        assert_eq!(ws.store().dir(), tmp.path());
    }

    #[test]
    fn keyword_commands_write_through() {
        let tmp = TempDir::new().unwrap();
        let mut ws = open(&tmp);
        let at = first(&ws);

        let out = ws
            .execute(Command::AddKeyword {
                at: at.clone(),
                draft: KeywordDraft::with_parts(["adb logcat", "", " grep {PID} "]),
            })
            .unwrap();
        assert_eq!(out, Outcome::Index(0));

        let db = read_doc(&tmp, DocKind::Catalog);
        let stored = &db["MTK"][&at.issue][COMMON_CATEGORY];
        assert_eq!(stored["_keywords"][0]["parts"], json!(["adb logcat", "grep {PID}"]));
        assert_eq!(stored["_params"], json!({"PID": ""}));

        ws.execute(Command::SetParam {
            at: at.clone(),
            name: "PID".into(),
            value: "4242".into(),
        })
        .unwrap();
        assert_eq!(
            ws.copy_text(&at, 0, CopyMode::Rendered).unwrap(),
            "adb logcat;grep 4242"
        );
        assert_eq!(
            ws.copy_text(&at, 0, CopyMode::WithoutParams).unwrap(),
            "adb logcat;grep "
        );
        assert_eq!(ws.copied_marker(), Some(0));
    }

    #[test]
    fn copy_marker_clears_after_delay() {
        let tmp = TempDir::new().unwrap();
        let mut ws = open(&tmp);
        let at = first(&ws);
        ws.execute(Command::AddKeyword {
            at: at.clone(),
            draft: KeywordDraft::with_parts(["x"]),
        })
        .unwrap();
        ws.copy_text(&at, 0, CopyMode::Rendered).unwrap();
        assert_eq!(ws.copied_marker(), Some(0));

        let later = Instant::now() + ws.settings().copy_feedback();
        assert_eq!(ws.poll_feedback(later), Some(0));
        assert_eq!(ws.copied_marker(), None);
        ws.close().unwrap();
    }

    #[test]
    fn validation_error_changes_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut ws = open(&tmp);
        let before = ws.catalog().clone();
        let at = first(&ws);

        let err = ws
            .execute(Command::AddKeyword {
                at: at.clone(),
                draft: KeywordDraft::with_parts([" "]),
            })
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::Validation(ValidationError::EmptyParts)));

        let err = ws
            .execute(Command::DeleteCategory {
                vendor: at.vendor.clone(),
                issue: at.issue.clone(),
                name: COMMON_CATEGORY.into(),
            })
            .unwrap_err();
        assert!(matches!(
            err,
            WorkspaceError::Validation(ValidationError::ProtectedName(_))
        ));
        assert_eq!(ws.catalog(), &before);
    }

    #[test]
    fn issue_commands_update_both_documents() {
        let tmp = TempDir::new().unwrap();
        let mut ws = open(&tmp);
        ws.execute(Command::AddIssue {
            vendor: "SLSI".into(),
            name: "VoLTE".into(),
        })
        .unwrap();

        let cfg = read_doc(&tmp, DocKind::IssueConfig);
        assert_eq!(cfg["vendors"]["SLSI"]["issues"][2], "VoLTE");
        let db = read_doc(&tmp, DocKind::Catalog);
        assert!(db["SLSI"]["VoLTE"][COMMON_CATEGORY].is_object());
        assert!(db["MTK"].get("VoLTE").is_none());
    }

    #[test]
    fn deleting_selected_category_moves_selection() {
        let tmp = TempDir::new().unwrap();
        let mut ws = open(&tmp);
        let at = first(&ws);
        ws.execute(Command::AddCategory {
            vendor: at.vendor.clone(),
            issue: at.issue.clone(),
            name: "Attach".into(),
        })
        .unwrap();
        let picked = ws
            .select(&Selection::new(&at.vendor, &at.issue, "Attach"))
            .unwrap()
            .unwrap();
        assert_eq!(picked.category, "Attach");

        ws.execute(Command::DeleteCategory {
            vendor: at.vendor.clone(),
            issue: at.issue.clone(),
            name: "Attach".into(),
        })
        .unwrap();
        assert_eq!(first(&ws).category, COMMON_CATEGORY);
    }

    #[test]
    fn selection_follows_adds_and_renames() {
        let tmp = TempDir::new().unwrap();
        let mut ws = open(&tmp);
        let at = first(&ws);
        ws.execute(Command::AddCategory {
            vendor: at.vendor.clone(),
            issue: at.issue.clone(),
            name: " Attach ".into(),
        })
        .unwrap();
        assert_eq!(first(&ws).category, "Attach");

        ws.execute(Command::RenameCategory {
            vendor: at.vendor.clone(),
            issue: at.issue.clone(),
            old: "Attach".into(),
            new: "Detach".into(),
        })
        .unwrap();
        assert_eq!(first(&ws), Selection::new(&at.vendor, &at.issue, "Detach"));
        let ui = read_doc(&tmp, DocKind::UiState);
        assert_eq!(ui["last_selection"]["category"], "Detach");

        ws.execute(Command::RenameIssue {
            vendor: at.vendor.clone(),
            old: at.issue.clone(),
            new: "Throughput".into(),
        })
        .unwrap();
        assert_eq!(first(&ws), Selection::new(&at.vendor, "Throughput", "Detach"));

        ws.execute(Command::AddIssue {
            vendor: "SLSI".into(),
            name: "VoLTE".into(),
        })
        .unwrap();
        assert_eq!(first(&ws), Selection::new("SLSI", "VoLTE", COMMON_CATEGORY));

        drop(ws);
        let ws = open(&tmp);
        assert_eq!(first(&ws), Selection::new("SLSI", "VoLTE", COMMON_CATEGORY));
    }

    #[test]
    fn renaming_another_category_keeps_selection() {
        let tmp = TempDir::new().unwrap();
        let mut ws = open(&tmp);
        let at = first(&ws);
        for name in ["Attach", "Detach"] {
            ws.execute(Command::AddCategory {
                vendor: at.vendor.clone(),
                issue: at.issue.clone(),
                name: name.into(),
            })
            .unwrap();
        }
        ws.execute(Command::RenameCategory {
            vendor: at.vendor.clone(),
            issue: at.issue.clone(),
            old: "Attach".into(),
            new: "Paging".into(),
        })
        .unwrap();
        assert_eq!(first(&ws).category, "Detach");
    }

    #[test]
    fn padded_config_vendor_reopens_without_rewrite() {
        let tmp = TempDir::new().unwrap();
        let issue = default_issues()[0].clone();
        fs::write(
            tmp.path().join(DocKind::Catalog.file_name()),
            json!({"MTK": {&issue: {COMMON_CATEGORY: {"_keywords": [], "_params": {}}}}})
                .to_string(),
        )
        .unwrap();
        fs::write(
            tmp.path().join(DocKind::IssueConfig.file_name()),
            json!({"vendors": {" MTK ": {"issues": [&issue], "delimiter": "|"}}}).to_string(),
        )
        .unwrap();

        let ws = open(&tmp);
        assert!(ws.load_report().config_rewritten);
        assert_eq!(ws.catalog().vendor_names(), vec!["MTK"]);
        assert_eq!(ws.delimiter("MTK"), "|");
        drop(ws);

        let ws = open(&tmp);
        let report = ws.load_report();
        assert!(!report.catalog_rewritten);
        assert!(!report.config_rewritten);
        assert_eq!(ws.catalog().vendor_names(), vec!["MTK"]);
        assert_eq!(ws.config().vendors.keys().collect::<Vec<_>>(), vec!["MTK"]);
        assert_eq!(ws.delimiter("MTK"), "|");
    }

    #[test]
    fn close_retries_a_failed_save() {
        let tmp = TempDir::new().unwrap();
        let mut ws = open(&tmp);
        let at = first(&ws);
        // A directory at the catalog path makes the save fail.
        let db_path = tmp.path().join(DocKind::Catalog.file_name());
        fs::remove_file(&db_path).unwrap();
        fs::create_dir(&db_path).unwrap();

        let err = ws
            .execute(Command::AddKeyword {
                at: at.clone(),
                draft: KeywordDraft::with_parts(["pending"]),
            })
            .unwrap_err();
        assert!(matches!(err, WorkspaceError::Store(_)));
        assert_eq!(ws.unsaved(), [DocKind::Catalog]);

        fs::remove_dir(&db_path).unwrap();
        ws.close().unwrap();
        let db = read_doc(&tmp, DocKind::Catalog);
        assert_eq!(
            db["MTK"][&at.issue][COMMON_CATEGORY]["_keywords"][0]["parts"],
            json!(["pending"])
        );
    }

    #[test]
    fn inspect_registers_params_from_legacy_text() {
        let tmp = TempDir::new().unwrap();
        let issue = default_issues()[0].clone();
        let db = json!({"MTK": {issue.clone(): {"_COMMON": ["ping {HOST} -c {N}"]}}});
        fs::write(tmp.path().join("keywords_db.json"), db.to_string()).unwrap();

        let mut ws = open(&tmp);
        let at = Selection::new("MTK", issue, COMMON_CATEGORY);
        let found = ws.inspect_keyword(&at, 0).unwrap();
        let names: Vec<_> = found.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["HOST", "N"]);
        assert_eq!(ws.category(&at).unwrap().params.len(), 2);
        assert!(ws.inspect_keyword(&at, 3).is_err());
    }

    #[test]
    fn import_is_all_or_nothing() {
        let tmp = TempDir::new().unwrap();
        let mut ws = open(&tmp);
        let before = ws.catalog().clone();

        let bad = json!({"schema": EXPORT_SCHEMA, "db": {}, "issue_cfg": 3});
        assert!(matches!(
            ws.import_package(bad),
            Err(WorkspaceError::Schema(SchemaError::FieldNotObject("issue_cfg")))
        ));
        assert_eq!(ws.catalog(), &before);

        let good = json!({
            "schema": EXPORT_SCHEMA,
            "schema_version": "1",
            "db": {"QCOM": {"Crash": {"_COMMON": {"_keywords": ["dmesg"], "_params": {}}}}},
            "issue_cfg": {"vendors": {"QCOM": {"issues": ["Crash"], "delimiter": "|"}}},
        });
        ws.import_package(good).unwrap();
        assert_eq!(ws.catalog().vendor_names(), vec!["QCOM"]);
        assert_eq!(ws.delimiter("QCOM"), "|");
        assert_eq!(first(&ws), Selection::new("QCOM", "Crash", COMMON_CATEGORY));

        let entries = recovery::read_recovery_entries(tmp.path(), None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].category, RecoveryCategory::Import);
        assert!(entries[0].body.contains("MTK"));
    }

    #[test]
    fn export_then_import_preserves_model() {
        let tmp = TempDir::new().unwrap();
        let mut ws = open(&tmp);
        let at = first(&ws);
        ws.execute(Command::AddKeyword {
            at,
            draft: KeywordDraft::with_parts(["a", "b"]),
        })
        .unwrap();
        let out = tmp.path().join("export.json");
        ws.export_package(&out).unwrap();
        let catalog = ws.catalog().clone();

        let other = TempDir::new().unwrap();
        let mut ws2 = open(&other);
        let text = fs::read_to_string(&out).unwrap();
        ws2.import_package(serde_json::from_str(&text).unwrap())
            .unwrap();
        assert_eq!(ws2.catalog(), &catalog);
    }

    #[test]
    fn delimiter_change_affects_copy() {
        let tmp = TempDir::new().unwrap();
        let mut ws = open(&tmp);
        let at = first(&ws);
        ws.execute(Command::AddKeyword {
            at: at.clone(),
            draft: KeywordDraft::with_parts(["A", "B", "A"]),
        })
        .unwrap();
        ws.execute(Command::SetDelimiter {
            vendor: at.vendor.clone(),
            delimiter: String::new(),
        })
        .unwrap();
        assert_eq!(ws.copy_text(&at, 0, CopyMode::Rendered).unwrap(), "ABA");
        let cfg = read_doc(&tmp, DocKind::IssueConfig);
        assert_eq!(cfg["vendors"]["MTK"]["delimiter"], "");
    }
}
