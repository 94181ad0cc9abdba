use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::ops::selection::Selection;

/// Persisted UI layout (ui_state.json).
///
/// Read permissively: known keys with the wrong shape are ignored, unknown
/// keys are carried through untouched so another front end's layout survives.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UiState {
    /// Window geometry string, e.g. `1250x760`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geometry: Option<String>,
    /// Keyword list column widths by column name
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub keyword_tree_cols: IndexMap<String, u32>,
    /// Param list column widths by column name
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub param_tree_cols: IndexMap<String, u32>,
    /// Last selected vendor/issue/category
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_selection: Option<Selection>,
    /// Keys this crate does not interpret
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

const GEOMETRY: &str = "geometry";
const KEYWORD_COLS: &str = "keyword_tree_cols";
const PARAM_COLS: &str = "param_tree_cols";
const LAST_SELECTION: &str = "last_selection";

impl UiState {
    /// Decode a UI-state document. Never fails.
    pub fn from_document(doc: &Map<String, Value>) -> Self {
        let mut state = UiState::default();
        for (key, value) in doc {
            match key.as_str() {
                GEOMETRY => state.geometry = value.as_str().map(str::to_string),
                KEYWORD_COLS => state.keyword_tree_cols = parse_widths(value),
                PARAM_COLS => state.param_tree_cols = parse_widths(value),
                LAST_SELECTION => {
                    state.last_selection = serde_json::from_value(value.clone()).ok();
                }
                _ => {
                    state.extra.insert(key.clone(), value.clone());
                }
            }
        }
        state
    }

    pub fn to_document(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}

fn parse_widths(value: &Value) -> IndexMap<String, u32> {
    let Value::Object(obj) = value else {
        return IndexMap::new();
    };
    obj.iter()
        .filter_map(|(k, v)| {
            let width = match v {
                Value::Number(n) => n.as_u64(),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }?;
            Some((k.clone(), u32::try_from(width).ok()?))
        })
        .collect()
}
