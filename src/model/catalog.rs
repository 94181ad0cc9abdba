use indexmap::IndexMap;

use super::config::default_issues;
use super::keyword::Keyword;

/// The protected category every issue carries.
pub const COMMON_CATEGORY: &str = "_COMMON";

/// Vendors created when the catalog starts out empty.
pub const DEFAULT_VENDORS: [&str; 2] = ["MTK", "SLSI"];

/// A named group of keywords with its substitution parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Category {
    pub keywords: Vec<Keyword>,
    /// Placeholder name -> substitution value
    pub params: IndexMap<String, String>,
}

/// An issue: category name -> category. Always holds `_COMMON` once reconciled.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Issue {
    pub categories: IndexMap<String, Category>,
}

impl Issue {
    /// A fresh issue holding only an empty `_COMMON` category.
    pub fn new() -> Self {
        let mut categories = IndexMap::new();
        categories.insert(COMMON_CATEGORY.to_string(), Category::default());
        Issue { categories }
    }

    /// Insert `_COMMON` if missing. Returns true when the issue changed.
    pub fn ensure_common(&mut self) -> bool {
        if self.categories.contains_key(COMMON_CATEGORY) {
            return false;
        }
        self.categories
            .insert(COMMON_CATEGORY.to_string(), Category::default());
        true
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.get(name)
    }

    pub fn category_mut(&mut self, name: &str) -> Option<&mut Category> {
        self.categories.get_mut(name)
    }

    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }
}

/// Issues of one vendor, keyed by issue name
pub type VendorIssues = IndexMap<String, Issue>;

/// The keyword database: vendor -> issue -> category
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    pub vendors: IndexMap<String, VendorIssues>,
}

impl Catalog {
    /// The catalog a first run starts from: default vendors, each with the
    /// default issues, each issue holding `_COMMON`.
    pub fn with_defaults() -> Self {
        let mut vendors = IndexMap::new();
        for vendor in DEFAULT_VENDORS {
            let issues = default_issues()
                .into_iter()
                .map(|name| (name, Issue::new()))
                .collect();
            vendors.insert(vendor.to_string(), issues);
        }
        Catalog { vendors }
    }

    pub fn is_empty(&self) -> bool {
        self.vendors.is_empty()
    }

    pub fn vendor_names(&self) -> Vec<String> {
        self.vendors.keys().cloned().collect()
    }

    pub fn vendor(&self, vendor: &str) -> Option<&VendorIssues> {
        self.vendors.get(vendor)
    }

    pub fn vendor_mut(&mut self, vendor: &str) -> Option<&mut VendorIssues> {
        self.vendors.get_mut(vendor)
    }

    pub fn issue(&self, vendor: &str, issue: &str) -> Option<&Issue> {
        self.vendors.get(vendor)?.get(issue)
    }

    pub fn issue_mut(&mut self, vendor: &str, issue: &str) -> Option<&mut Issue> {
        self.vendors.get_mut(vendor)?.get_mut(issue)
    }

    pub fn category(&self, vendor: &str, issue: &str, category: &str) -> Option<&Category> {
        self.issue(vendor, issue)?.category(category)
    }

    pub fn category_mut(
        &mut self,
        vendor: &str,
        issue: &str,
        category: &str,
    ) -> Option<&mut Category> {
        self.issue_mut(vendor, issue)?.category_mut(category)
    }

    /// Total number of keywords under a vendor.
    pub fn keyword_count(&self, vendor: &str) -> usize {
        self.vendors.get(vendor).map_or(0, |issues| {
            issues
                .values()
                .flat_map(|i| i.categories.values())
                .map(|c| c.keywords.len())
                .sum()
        })
    }
}

/// Rename `old` to `new` in an ordered map, keeping the entry's position.
/// Returns false when `old` is absent.
pub fn rename_key<V>(map: &mut IndexMap<String, V>, old: &str, new: &str) -> bool {
    match map.shift_remove_full(old) {
        Some((index, _, value)) => {
            map.shift_insert(index, new.to_string(), value);
            true
        }
        None => false,
    }
}
