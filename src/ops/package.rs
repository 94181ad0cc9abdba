use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Map, Value, json};

/// Sentinel every export package carries in its `schema` field.
pub const EXPORT_SCHEMA: &str = "KeywordGuideExport";
pub const EXPORT_SCHEMA_VERSION: &str = "1";

/// Why an import package was rejected
#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("import package must be a JSON object")]
    NotAnObject,
    #[error("not a keyword guide export (schema: {found})")]
    WrongSchema { found: String },
    #[error("import package is missing \"{0}\"")]
    MissingField(&'static str),
    #[error("import package field \"{0}\" must be an object")]
    FieldNotObject(&'static str),
    #[error("import package is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A validated import package, still in raw document form.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportPackage {
    pub db: Map<String, Value>,
    pub issue_cfg: Map<String, Value>,
    pub ui_state: Map<String, Value>,
    pub schema_version: Option<String>,
    pub exported_at: Option<String>,
}

/// Assemble an export package from the three documents.
pub fn build_export(
    db: Map<String, Value>,
    issue_cfg: Map<String, Value>,
    ui_state: Map<String, Value>,
    exported_at: DateTime<Utc>,
) -> Value {
    json!({
        "schema": EXPORT_SCHEMA,
        "schema_version": EXPORT_SCHEMA_VERSION,
        "exported_at": exported_at.to_rfc3339_opts(SecondsFormat::Secs, true),
        "db": db,
        "issue_cfg": issue_cfg,
        "ui_state": ui_state,
    })
}

/// Check the envelope of an import package. Nothing about the documents'
/// contents is checked here; they are normalized on decode.
pub fn validate_package(value: Value) -> Result<ImportPackage, SchemaError> {
    let Value::Object(mut root) = value else {
        return Err(SchemaError::NotAnObject);
    };

    match root.get("schema") {
        Some(Value::String(s)) if s == EXPORT_SCHEMA => {}
        Some(other) => {
            let found = match other {
                Value::String(s) => s.clone(),
                v => v.to_string(),
            };
            return Err(SchemaError::WrongSchema { found });
        }
        None => return Err(SchemaError::MissingField("schema")),
    }

    let db = take_object(&mut root, "db")?;
    let issue_cfg = take_object(&mut root, "issue_cfg")?;
    let ui_state = match root.remove("ui_state") {
        Some(Value::Object(map)) => map,
        _ => Map::new(),
    };

    Ok(ImportPackage {
        db,
        issue_cfg,
        ui_state,
        schema_version: string_field(&root, "schema_version"),
        exported_at: string_field(&root, "exported_at"),
    })
}

/// Parse and validate package text.
pub fn parse_package(text: &str) -> Result<ImportPackage, SchemaError> {
    let value: Value = serde_json::from_str(text)?;
    validate_package(value)
}

fn take_object(
    root: &mut Map<String, Value>,
    field: &'static str,
) -> Result<Map<String, Value>, SchemaError> {
    match root.remove(field) {
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(SchemaError::FieldNotObject(field)),
        None => Err(SchemaError::MissingField(field)),
    }
}

fn string_field(root: &Map<String, Value>, field: &str) -> Option<String> {
    root.get(field).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Value {
        let at = Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0).unwrap();
        let db = json!({"MTK": {"I": {"_COMMON": {"_keywords": [], "_params": {}}}}});
        let cfg = json!({"vendors": {"MTK": {"issues": ["I"], "delimiter": ";"}}});
        build_export(
            db.as_object().cloned().unwrap(),
            cfg.as_object().cloned().unwrap(),
            Map::new(),
            at,
        )
    }

    #[test]
    fn export_envelope() {
        let pkg = sample();
        assert_eq!(pkg["schema"], EXPORT_SCHEMA);
        assert_eq!(pkg["schema_version"], "1");
        assert_eq!(pkg["exported_at"], "2026-03-01T09:30:00Z");
    }

    #[test]
    fn valid_package_round_trips() {
        let parsed = parse_package(&sample().to_string()).unwrap();
        assert!(parsed.db.contains_key("MTK"));
        assert!(parsed.issue_cfg.contains_key("vendors"));
        assert!(parsed.ui_state.is_empty());
        assert_eq!(parsed.schema_version.as_deref(), Some("1"));
    }

    #[test]
    fn rejects_wrong_schema() {
        let mut pkg = sample();
        pkg["schema"] = json!("SomethingElse");
        let err = validate_package(pkg).unwrap_err();
        assert!(matches!(err, SchemaError::WrongSchema { ref found } if found == "SomethingElse"));
    }

    #[test]
    fn rejects_missing_or_mistyped_fields() {
        let mut pkg = sample();
        pkg.as_object_mut().unwrap().remove("issue_cfg");
        assert!(matches!(
            validate_package(pkg),
            Err(SchemaError::MissingField("issue_cfg"))
        ));

        let mut pkg = sample();
        pkg["db"] = json!([1, 2]);
        let err = validate_package(pkg).unwrap_err();
        assert!(matches!(err, SchemaError::FieldNotObject("db")));
        assert!(err.to_string().contains("\"db\""));

        assert!(matches!(
            validate_package(json!([])),
            Err(SchemaError::NotAnObject)
        ));
        assert!(matches!(parse_package("{"), Err(SchemaError::Parse(_))));
    }

    #[test]
    fn non_object_ui_state_is_ignored() {
        let mut pkg = sample();
        pkg["ui_state"] = json!("nope");
        assert!(validate_package(pkg).unwrap().ui_state.is_empty());
    }
}
