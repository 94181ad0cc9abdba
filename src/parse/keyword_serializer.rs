use serde::Serialize;
use serde_json::Value;

use crate::model::keyword::{DescRun, Keyword, KeywordBody};

/// On-disk shape of a keyword
#[derive(Serialize)]
struct KeywordRecord<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    parts: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    summary: &'a str,
    group: &'a str,
    desc: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    desc_rich: Option<&'a [DescRun]>,
}

impl<'a> From<&'a Keyword> for KeywordRecord<'a> {
    fn from(kw: &'a Keyword) -> Self {
        let (parts, text) = match &kw.body {
            KeywordBody::Parts(p) => (Some(p.as_slice()), None),
            KeywordBody::Text(t) => (None, Some(t.as_str())),
        };
        KeywordRecord {
            parts,
            text,
            summary: &kw.summary,
            group: &kw.group,
            desc: &kw.desc,
            desc_rich: kw.desc_rich.as_deref(),
        }
    }
}

/// Encode a keyword in its stored JSON form.
pub fn keyword_to_value(kw: &Keyword) -> Value {
    // Plain strings, bools and unit enums only: serialization cannot fail.
    serde_json::to_value(KeywordRecord::from(kw)).unwrap_or(Value::Null)
}

/// Encode a keyword list.
pub fn keywords_to_value(kws: &[Keyword]) -> Value {
    Value::Array(kws.iter().map(keyword_to_value).collect())
}
