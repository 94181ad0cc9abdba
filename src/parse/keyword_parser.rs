use serde_json::{Map, Value};

use crate::model::keyword::{DescRun, Keyword, KeywordBody, RunColor, plain_from_runs};

/// Normalize a raw keyword list into canonical keywords.
///
/// Accepted item shapes, oldest first:
/// - a bare string (single-text keyword)
/// - `{"text", "summary", "desc" | "description"}`
/// - `{"parts": [...], "summary", "group", "desc", "desc_rich"}`
///
/// Anything that yields neither parts nor text is dropped. Duplicated parts
/// are kept. Normalizing an already-normalized list is a no-op.
pub fn normalize_keywords(raw: &[Value]) -> Vec<Keyword> {
    let mut out = Vec::with_capacity(raw.len());
    for item in raw {
        match normalize_item(item) {
            Some(kw) => out.push(kw),
            None => tracing::debug!(item = %item, "dropping malformed keyword record"),
        }
    }
    out
}

/// Normalize a raw value that should hold a keyword list. Non-lists yield nothing.
pub fn normalize_keyword_value(raw: &Value) -> Vec<Keyword> {
    match raw {
        Value::Array(items) => normalize_keywords(items),
        _ => Vec::new(),
    }
}

fn normalize_item(item: &Value) -> Option<Keyword> {
    let obj = match item {
        Value::String(s) => {
            let text = s.trim();
            return (!text.is_empty()).then(|| Keyword::from_text(text));
        }
        Value::Object(obj) => obj,
        _ => return None,
    };

    let summary = field_str(obj, "summary");
    let group = field_str(obj, "group");
    let mut desc = match obj.get("desc") {
        Some(v) => scalar_to_string(v).trim().to_string(),
        None => field_str(obj, "description"),
    };

    let desc_rich = obj
        .get("desc_rich")
        .and_then(Value::as_array)
        .map(|runs| parse_runs(runs))
        .filter(|runs| !runs.is_empty());
    if desc.is_empty()
        && let Some(runs) = &desc_rich
    {
        desc = plain_from_runs(runs);
    }

    let body = parts_body(obj).or_else(|| {
        let text = field_str(obj, "text");
        (!text.is_empty()).then_some(KeywordBody::Text(text))
    })?;

    Some(Keyword {
        body,
        summary,
        group,
        desc,
        desc_rich,
    })
}

fn parts_body(obj: &Map<String, Value>) -> Option<KeywordBody> {
    let parts: Vec<String> = obj
        .get("parts")?
        .as_array()?
        .iter()
        .map(|p| scalar_to_string(p).trim().to_string())
        .filter(|p| !p.is_empty())
        .collect();
    (!parts.is_empty()).then_some(KeywordBody::Parts(parts))
}

/// Parse rich description runs. Accepts `{text, b, c}` and `{text, bold, color}`.
pub fn parse_runs(raw: &[Value]) -> Vec<DescRun> {
    raw.iter()
        .filter_map(Value::as_object)
        .map(|run| {
            let text = run.get("text").map(scalar_to_string).unwrap_or_default();
            let bold = run
                .get("b")
                .or_else(|| run.get("bold"))
                .map(truthy)
                .unwrap_or(false);
            let color = run
                .get("c")
                .or_else(|| run.get("color"))
                .and_then(Value::as_str)
                .and_then(RunColor::parse_color)
                .unwrap_or_default();
            DescRun { text, bold, color }
        })
        .collect()
}

fn field_str(obj: &Map<String, Value>, key: &str) -> String {
    obj.get(key)
        .map(scalar_to_string)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// Stringify a JSON scalar. Null, arrays and objects become "".
pub fn scalar_to_string(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => matches!(s.trim(), "1" | "true" | "True"),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse::keyword_serializer::keywords_to_value;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn normalize(v: Value) -> Vec<Keyword> {
        normalize_keyword_value(&v)
    }

    #[test]
    fn bare_string_becomes_text_keyword() {
        let kws = normalize(json!(["  FreeAck  ", "", "   "]));
        assert_eq!(kws, vec![Keyword::from_text("FreeAck")]);
    }

    #[test]
    fn non_objects_are_dropped() {
        let kws = normalize(json!([1, null, true, ["x"]]));
        assert!(kws.is_empty());
    }

    #[test]
    fn description_fallback_and_trim() {
        let kws = normalize(json!([
            {"text": " t ", "summary": " s ", "description": " old desc "}
        ]));
        assert_eq!(kws[0].body, KeywordBody::Text("t".into()));
        assert_eq!(kws[0].summary, "s");
        assert_eq!(kws[0].group, "");
        assert_eq!(kws[0].desc, "old desc");
    }

    #[test]
    fn explicit_desc_wins_over_description() {
        let kws = normalize(json!([{"text": "t", "desc": "new", "description": "old"}]));
        assert_eq!(kws[0].desc, "new");
    }

    #[test]
    fn parts_are_trimmed_and_keep_duplicates() {
        let kws = normalize(json!([{"parts": ["A", " B ", "", "A"], "summary": "x"}]));
        assert_eq!(
            kws[0].body,
            KeywordBody::Parts(vec!["A".into(), "B".into(), "A".into()])
        );
    }

    #[test]
    fn empty_parts_fall_back_to_text() {
        let kws = normalize(json!([
            {"parts": ["", "  "], "text": "legacy"},
            {"parts": "not a list", "text": "other"},
            {"parts": [], "text": ""}
        ]));
        assert_eq!(kws.len(), 2);
        assert_eq!(kws[0].body, KeywordBody::Text("legacy".into()));
        assert_eq!(kws[1].body, KeywordBody::Text("other".into()));
    }

    #[test]
    fn numeric_parts_are_stringified() {
        let kws = normalize(json!([{"parts": [1, "x", null]}]));
        assert_eq!(kws[0].body, KeywordBody::Parts(vec!["1".into(), "x".into()]));
    }

    #[test]
    fn rich_desc_derives_plain_desc_when_empty() {
        let kws = normalize(json!([{
            "parts": ["k"],
            "desc": "",
            "desc_rich": [
                {"text": " check ", "b": true, "c": "red"},
                {"text": "attach", "bold": false, "color": "blue"},
                "junk"
            ]
        }]));
        let kw = &kws[0];
        assert_eq!(kw.desc, "check attach");
        let runs = kw.desc_rich.as_ref().unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs[0].bold);
        assert_eq!(runs[0].color, RunColor::Red);
        assert_eq!(runs[1].color, RunColor::Blue);
    }

    #[test]
    fn rich_desc_does_not_override_plain_desc() {
        let kws = normalize(json!([{
            "text": "k",
            "desc": "kept",
            "desc_rich": [{"text": "other"}]
        }]));
        assert_eq!(kws[0].desc, "kept");
        assert!(kws[0].desc_rich.is_some());
    }

    #[test]
    fn normalize_is_idempotent() {
        let raw = json!([
            " a ",
            {"parts": ["x", "", "x"], "summary": " s ", "group": " g "},
            {"text": "t", "description": "d"},
            {"text": "", "parts": []},
            {"parts": ["p"], "desc_rich": [{"text": "r", "b": 1, "c": "purple"}]},
            42
        ]);
        let once = normalize(raw);
        let twice = normalize(keywords_to_value(&once));
        assert_eq!(once, twice);
    }
}
