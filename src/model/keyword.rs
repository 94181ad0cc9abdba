use serde::{Deserialize, Serialize};

/// Text color of a rich description run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunColor {
    #[default]
    Black,
    Red,
    Blue,
}

impl RunColor {
    /// Parse a stored color name. Unknown names map to `None`.
    pub fn parse_color(s: &str) -> Option<RunColor> {
        match s.trim().to_ascii_lowercase().as_str() {
            "black" => Some(RunColor::Black),
            "red" => Some(RunColor::Red),
            "blue" => Some(RunColor::Blue),
            _ => None,
        }
    }
}

/// A styled run of description text.
///
/// Stored as `{"text": ..., "b": bool, "c": "black"|"red"|"blue"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescRun {
    pub text: String,
    #[serde(rename = "b", default)]
    pub bold: bool,
    #[serde(rename = "c", default)]
    pub color: RunColor,
}

impl DescRun {
    pub fn plain(text: impl Into<String>) -> Self {
        DescRun {
            text: text.into(),
            bold: false,
            color: RunColor::Black,
        }
    }
}

/// Plain description derived from rich runs: concatenation, trimmed.
pub fn plain_from_runs(runs: &[DescRun]) -> String {
    runs.iter()
        .map(|r| r.text.as_str())
        .collect::<String>()
        .trim()
        .to_string()
}

/// The template content of a keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeywordBody {
    /// Ordered parts, joined with the vendor delimiter. Duplicates are allowed.
    Parts(Vec<String>),
    /// Legacy single-string template, split on demand.
    Text(String),
}

/// A single templated entry in a category
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub body: KeywordBody,
    /// Short label shown in lists
    pub summary: String,
    /// Secondary label
    pub group: String,
    /// Plain-text long description
    pub desc: String,
    /// Optional styled description; `desc` mirrors it when present
    pub desc_rich: Option<Vec<DescRun>>,
}

impl Keyword {
    /// Create a parts-based keyword with empty metadata. Parts are not cleaned here.
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Keyword {
            body: KeywordBody::Parts(parts.into_iter().map(Into::into).collect()),
            summary: String::new(),
            group: String::new(),
            desc: String::new(),
            desc_rich: None,
        }
    }

    /// Create a legacy text keyword with empty metadata.
    pub fn from_text(text: impl Into<String>) -> Self {
        Keyword {
            body: KeywordBody::Text(text.into()),
            summary: String::new(),
            group: String::new(),
            desc: String::new(),
            desc_rich: None,
        }
    }
}

/// Unvalidated keyword contents coming from an editor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordDraft {
    pub parts: Vec<String>,
    pub summary: String,
    pub group: String,
    pub desc: String,
    pub desc_rich: Option<Vec<DescRun>>,
}

impl KeywordDraft {
    pub fn with_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        KeywordDraft {
            parts: parts.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Clean the draft into a keyword: parts trimmed, empties dropped, order and
    /// duplicates kept. Returns `None` when no part survives.
    pub fn into_keyword(self) -> Option<Keyword> {
        let parts = clean_parts(&self.parts);
        if parts.is_empty() {
            return None;
        }
        let desc_rich = self.desc_rich.filter(|runs| !runs.is_empty());
        let desc = match &desc_rich {
            Some(runs) => plain_from_runs(runs),
            None => self.desc.trim().to_string(),
        };
        Some(Keyword {
            body: KeywordBody::Parts(parts),
            summary: self.summary.trim().to_string(),
            group: self.group.trim().to_string(),
            desc,
            desc_rich,
        })
    }
}

/// Trim each part and drop empties, keeping order and duplicates.
pub fn clean_parts<S: AsRef<str>>(parts: &[S]) -> Vec<String> {
    parts
        .iter()
        .map(|p| p.as_ref().trim())
        .filter(|p| !p.is_empty())
        .map(str::to_string)
        .collect()
}
