use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::model::catalog::{Catalog, Category, Issue, VendorIssues};
use crate::parse::keyword_parser::{normalize_keyword_value, scalar_to_string};

/// Key holding a category's keyword list
pub const KEYWORDS_KEY: &str = "_keywords";
/// Key holding a category's parameter map
pub const PARAMS_KEY: &str = "_params";

/// Decode the keyword database document.
///
/// Never fails: malformed levels decode as empty, every keyword list goes
/// through the normalizer, and names are trimmed (blank names dropped, the
/// first of two names that trim alike wins).
pub fn parse_catalog(doc: &Map<String, Value>) -> Catalog {
    let mut vendors = IndexMap::new();
    for (name, value) in doc {
        if let Some(name) = clean_key(name, &vendors) {
            vendors.insert(name, parse_vendor(value));
        }
    }
    Catalog { vendors }
}

fn parse_vendor(value: &Value) -> VendorIssues {
    let mut issues = IndexMap::new();
    if let Value::Object(obj) = value {
        for (name, issue) in obj {
            if let Some(name) = clean_key(name, &issues) {
                issues.insert(name, parse_issue(issue));
            }
        }
    }
    issues
}

fn parse_issue(value: &Value) -> Issue {
    let mut categories = IndexMap::new();
    if let Value::Object(obj) = value {
        for (name, category) in obj {
            if let Some(name) = clean_key(name, &categories) {
                categories.insert(name, parse_category(category));
            }
        }
    }
    Issue { categories }
}

/// Decode one category. The oldest schema stored a bare keyword list.
pub fn parse_category(value: &Value) -> Category {
    match value {
        Value::Array(_) => Category {
            keywords: normalize_keyword_value(value),
            params: IndexMap::new(),
        },
        Value::Object(obj) => Category {
            keywords: obj
                .get(KEYWORDS_KEY)
                .map(normalize_keyword_value)
                .unwrap_or_default(),
            params: obj.get(PARAMS_KEY).map(parse_params).unwrap_or_default(),
        },
        _ => Category::default(),
    }
}

fn parse_params(value: &Value) -> IndexMap<String, String> {
    let Value::Object(obj) = value else {
        return IndexMap::new();
    };
    obj.iter()
        .filter(|(k, _)| !k.trim().is_empty())
        .map(|(k, v)| (k.clone(), scalar_to_string(v)))
        .collect()
}

fn clean_key<V>(raw: &str, seen: &IndexMap<String, V>) -> Option<String> {
    let name = raw.trim();
    if name.is_empty() {
        return None;
    }
    if seen.contains_key(name) {
        tracing::warn!(name, "duplicate catalog name after trimming; keeping the first");
        return None;
    }
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::catalog::COMMON_CATEGORY;
    use crate::model::keyword::{Keyword, KeywordBody};
    use serde_json::json;

    fn doc(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    #[test]
    fn parses_nested_document() {
        let catalog = parse_catalog(&doc(json!({
            "MTK": {
                "Data": {
                    "_COMMON": {
                        "_keywords": [{"parts": ["FreeAck", "CH:{CH}"], "summary": "ack"}],
                        "_params": {"CH": "3"}
                    }
                }
            }
        })));
        let cat = catalog.category("MTK", "Data", COMMON_CATEGORY).unwrap();
        assert_eq!(cat.keywords.len(), 1);
        assert_eq!(
            cat.keywords[0].body,
            KeywordBody::Parts(vec!["FreeAck".into(), "CH:{CH}".into()])
        );
        assert_eq!(cat.params.get("CH").map(String::as_str), Some("3"));
    }

    #[test]
    fn legacy_list_category_is_migrated() {
        let catalog = parse_catalog(&doc(json!({
            "MTK": {"Data": {"Attach": ["one", "", {"text": "two"}]}}
        })));
        let cat = catalog.category("MTK", "Data", "Attach").unwrap();
        assert_eq!(
            cat.keywords,
            vec![Keyword::from_text("one"), Keyword::from_text("two")]
        );
        assert!(cat.params.is_empty());
    }

    #[test]
    fn malformed_levels_decode_as_empty() {
        let catalog = parse_catalog(&doc(json!({
            "MTK": "oops",
            "SLSI": {"Data": 7, "Reg": {"X": {"_keywords": "no", "_params": [1]}}}
        })));
        assert!(catalog.vendor("MTK").unwrap().is_empty());
        assert!(catalog.issue("SLSI", "Data").unwrap().categories.is_empty());
        let x = catalog.category("SLSI", "Reg", "X").unwrap();
        assert!(x.keywords.is_empty());
        assert!(x.params.is_empty());
    }

    #[test]
    fn params_are_stringified() {
        let catalog = parse_catalog(&doc(json!({
            "MTK": {"Data": {"_COMMON": {"_keywords": [], "_params": {"N": 5, "B": true, "Z": null}}}}
        })));
        let params = &catalog.category("MTK", "Data", "_COMMON").unwrap().params;
        assert_eq!(params["N"], "5");
        assert_eq!(params["B"], "true");
        assert_eq!(params["Z"], "");
    }

    #[test]
    fn names_are_trimmed_and_blank_names_dropped() {
        let catalog = parse_catalog(&doc(json!({
            " MTK ": {" Data ": {}, "  ": {}, "Data": {"_COMMON": {}}}
        })));
        let issues = catalog.vendor("MTK").unwrap();
        assert_eq!(issues.keys().collect::<Vec<_>>(), vec!["Data"]);
        assert!(issues["Data"].categories.is_empty());
    }
}
