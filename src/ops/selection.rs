use serde::{Deserialize, Serialize};

use crate::model::catalog::{COMMON_CATEGORY, Catalog};
use crate::model::config::IssueConfig;

/// The vendor / issue / category path the editor is looking at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(default)]
    pub vendor: String,
    #[serde(default)]
    pub issue: String,
    #[serde(default)]
    pub category: String,
}

impl Selection {
    pub fn new(
        vendor: impl Into<String>,
        issue: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Selection {
            vendor: vendor.into(),
            issue: issue.into(),
            category: category.into(),
        }
    }

    /// Resolve against the model, falling back level by level: the first
    /// vendor, the vendor's first configured issue, then `_COMMON` or the first
    /// category. Returns `None` only when there is no vendor or issue at all.
    pub fn resolve(&self, catalog: &Catalog, config: &IssueConfig) -> Option<Selection> {
        let vendor = if catalog.vendor(&self.vendor).is_some() {
            self.vendor.clone()
        } else {
            catalog.vendors.keys().next()?.clone()
        };

        let issues = catalog.vendor(&vendor)?;
        let issue = if issues.contains_key(&self.issue) {
            self.issue.clone()
        } else {
            config
                .issues(&vendor)
                .iter()
                .find(|name| issues.contains_key(*name))
                .or_else(|| issues.keys().next())?
                .clone()
        };

        let categories = &issues.get(&issue)?.categories;
        let category = if categories.contains_key(&self.category) {
            self.category.clone()
        } else if categories.contains_key(COMMON_CATEGORY) {
            COMMON_CATEGORY.to_string()
        } else {
            categories
                .keys()
                .next()
                .cloned()
                .unwrap_or_else(|| COMMON_CATEGORY.to_string())
        };

        Some(Selection {
            vendor,
            issue,
            category,
        })
    }
}
