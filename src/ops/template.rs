use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};

use crate::model::keyword::{Keyword, KeywordBody, clean_parts};

/// `{NAME}` with NAME made of ASCII letters, digits and underscores.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z0-9_]+)\}").expect("placeholder pattern is valid"));

/// Distinct placeholder names in first-seen order.
pub fn detect_placeholders(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    for caps in PLACEHOLDER_RE.captures_iter(text) {
        let Some(name) = caps.get(1).map(|m| m.as_str()) else {
            continue;
        };
        if seen.insert(name) {
            ordered.push(name.to_string());
        }
    }
    ordered
}

/// Substitute `{NAME}` tokens from `params`. Tokens without an entry stay as
/// written. Substituted values are not scanned again.
pub fn render(template: &str, params: &IndexMap<String, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures| match params.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

/// Delete every `{NAME}` token, whether or not a value exists.
pub fn render_without_params(template: &str) -> String {
    PLACEHOLDER_RE.replace_all(template, "").into_owned()
}

/// Join trimmed non-empty parts with `delimiter`. An empty delimiter concatenates.
pub fn join_parts<S: AsRef<str>>(parts: &[S], delimiter: &str) -> String {
    clean_parts(parts).join(delimiter)
}

/// Split on the exact delimiter, trimming fragments and dropping empties.
/// An empty delimiter cannot split and yields nothing.
pub fn split_by_delimiter(text: &str, delimiter: &str) -> Vec<String> {
    if delimiter.is_empty() {
        return Vec::new();
    }
    text.split(delimiter)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// The editable parts of a keyword. Text keywords are split with the vendor
/// delimiter; when that is empty or absent from the text, the whole text is
/// one part.
pub fn keyword_parts(kw: &Keyword, delimiter: &str) -> Vec<String> {
    match &kw.body {
        KeywordBody::Parts(parts) => clean_parts(parts),
        KeywordBody::Text(text) => {
            let text = text.trim();
            if text.is_empty() {
                Vec::new()
            } else if !delimiter.is_empty() && text.contains(delimiter) {
                split_by_delimiter(text, delimiter)
            } else {
                vec![text.to_string()]
            }
        }
    }
}

/// The unrendered template of a keyword: joined parts, or the legacy text.
pub fn joined_template<'a>(kw: &'a Keyword, delimiter: &str) -> Cow<'a, str> {
    match &kw.body {
        KeywordBody::Parts(parts) => Cow::Owned(join_parts(parts, delimiter)),
        KeywordBody::Text(text) => Cow::Borrowed(text.trim()),
    }
}

/// How a keyword should be turned into clipboard text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// Substitute category params
    Rendered,
    /// Strip every placeholder
    WithoutParams,
}

/// The text a copy action hands to the clipboard.
pub fn copy_text(
    kw: &Keyword,
    delimiter: &str,
    params: &IndexMap<String, String>,
    mode: CopyMode,
) -> String {
    let joined = joined_template(kw, delimiter);
    match mode {
        CopyMode::Rendered => render(&joined, params),
        CopyMode::WithoutParams => render_without_params(&joined),
    }
}
