use serde::Serialize;

use crate::model::catalog::{Catalog, Category};
use crate::model::config::IssueConfig;
use crate::model::keyword::{DescRun, Keyword, KeywordBody};
use crate::ops::template::{joined_template, render};
use crate::util::unicode::{display_width, pad_to_width, single_line, truncate_to_width};

/// Widest a free-text column is allowed to get in table output
const MAX_TEXT_COL: usize = 48;

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct VendorJson {
    pub name: String,
    pub delimiter: String,
    pub issues: Vec<String>,
    pub keywords: usize,
}

#[derive(Serialize)]
pub struct CategoryJson {
    pub name: String,
    pub keywords: usize,
    pub params: usize,
}

#[derive(Serialize)]
pub struct KeywordJson {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parts: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub summary: String,
    pub group: String,
    pub desc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desc_rich: Option<Vec<DescRun>>,
    /// Joined, unrendered template
    pub template: String,
    /// Template with the category params substituted
    pub preview: String,
}

#[derive(Serialize)]
pub struct ParamJson {
    pub name: String,
    pub value: String,
}

#[derive(Serialize)]
pub struct InitJson {
    pub data_dir: String,
    pub seeded: bool,
    pub repaired: Vec<String>,
    pub vendors: Vec<VendorJson>,
}

#[derive(Serialize)]
pub struct ChangeJson {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
    pub changed: bool,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn vendors_to_json(catalog: &Catalog, config: &IssueConfig) -> Vec<VendorJson> {
    catalog
        .vendors
        .keys()
        .map(|name| VendorJson {
            name: name.clone(),
            delimiter: config.delimiter(name).to_string(),
            issues: config.issues(name).to_vec(),
            keywords: catalog.keyword_count(name),
        })
        .collect()
}

pub fn keyword_to_json(
    index: usize,
    kw: &Keyword,
    category: &Category,
    delimiter: &str,
) -> KeywordJson {
    let template = joined_template(kw, delimiter).into_owned();
    let preview = render(&template, &category.params);
    let (parts, text) = match &kw.body {
        KeywordBody::Parts(p) => (Some(p.clone()), None),
        KeywordBody::Text(t) => (None, Some(t.clone())),
    };
    KeywordJson {
        index,
        parts,
        text,
        summary: kw.summary.clone(),
        group: kw.group.clone(),
        desc: kw.desc.clone(),
        desc_rich: kw.desc_rich.clone(),
        template,
        preview,
    }
}

// ---------------------------------------------------------------------------
// Text output
// ---------------------------------------------------------------------------

/// Render rows as left-aligned columns separated by two spaces. Column widths
/// come from the widest cell (capped for free text); the last column is not
/// padded.
pub fn format_table(header: &[&str], rows: &[Vec<String>]) -> String {
    let cols = header.len();
    let mut widths: Vec<usize> = header.iter().map(|h| display_width(h)).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate().take(cols) {
            widths[i] = widths[i].max(display_width(cell).min(MAX_TEXT_COL));
        }
    }

    let mut out = String::new();
    let mut push_row = |cells: Vec<String>| {
        let mut line = String::new();
        for (i, cell) in cells.iter().enumerate().take(cols) {
            if i + 1 == cols {
                line.push_str(&truncate_to_width(cell, MAX_TEXT_COL));
            } else {
                line.push_str(&pad_to_width(cell, widths[i]));
                line.push_str("  ");
            }
        }
        out.push_str(line.trim_end());
        out.push('\n');
    };
    push_row(header.iter().map(|h| h.to_string()).collect());
    for row in rows {
        push_row(row.iter().map(|c| single_line(c)).collect());
    }
    out
}

pub fn keyword_rows(category: &Category, delimiter: &str) -> Vec<Vec<String>> {
    category
        .keywords
        .iter()
        .enumerate()
        .map(|(i, kw)| {
            let template = joined_template(kw, delimiter);
            let preview = render(&template, &category.params);
            vec![
                i.to_string(),
                kw.summary.clone(),
                kw.group.clone(),
                template.into_owned(),
                preview,
            ]
        })
        .collect()
}

/// A delimiter as shown to users: quoted so blanks and spaces are visible.
pub fn show_delimiter(delimiter: &str) -> String {
    format!("{:?}", delimiter)
}
