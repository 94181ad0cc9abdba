use serde_json::{Map, Value};

use crate::model::catalog::{Catalog, Category};
use crate::parse::catalog_parser::{KEYWORDS_KEY, PARAMS_KEY};
use crate::parse::keyword_serializer::keywords_to_value;

/// Encode the catalog as the keyword database document.
pub fn serialize_catalog(catalog: &Catalog) -> Map<String, Value> {
    let mut doc = Map::new();
    for (vendor, issues) in &catalog.vendors {
        let mut vendor_obj = Map::new();
        for (issue_name, issue) in issues {
            let mut issue_obj = Map::new();
            for (cat_name, category) in &issue.categories {
                issue_obj.insert(cat_name.clone(), serialize_category(category));
            }
            vendor_obj.insert(issue_name.clone(), Value::Object(issue_obj));
        }
        doc.insert(vendor.clone(), Value::Object(vendor_obj));
    }
    doc
}

/// Encode one category as `{"_keywords": [...], "_params": {...}}`.
pub fn serialize_category(category: &Category) -> Value {
    let params: Map<String, Value> = category
        .params
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect();
    let mut obj = Map::new();
    obj.insert(KEYWORDS_KEY.to_string(), keywords_to_value(&category.keywords));
    obj.insert(PARAMS_KEY.to_string(), Value::Object(params));
    Value::Object(obj)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::keyword::Keyword;
    use crate::parse::catalog_parser::parse_catalog;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn default_catalog_document() {
        let doc = serialize_catalog(&Catalog::with_defaults());
        assert_eq!(
            Value::Object(doc),
            json!({
                "MTK": {
                    "데이터 이슈": {"_COMMON": {"_keywords": [], "_params": {}}},
                    "망등록 이슈": {"_COMMON": {"_keywords": [], "_params": {}}}
                },
                "SLSI": {
                    "데이터 이슈": {"_COMMON": {"_keywords": [], "_params": {}}},
                    "망등록 이슈": {"_COMMON": {"_keywords": [], "_params": {}}}
                }
            })
        );
    }

    #[test]
    fn decode_of_encode_is_identity() {
        let mut catalog = Catalog::with_defaults();
        let cat = catalog.category_mut("MTK", "데이터 이슈", "_COMMON").unwrap();
        cat.keywords.push(Keyword::from_parts(["A", "B", "A"]));
        cat.keywords.push(Keyword::from_text("legacy;text"));
        cat.params.insert("CH".into(), "3".into());

        let decoded = parse_catalog(&serialize_catalog(&catalog));
        assert_eq!(decoded, catalog);
    }
}
