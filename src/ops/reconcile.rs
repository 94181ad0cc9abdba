use std::collections::HashSet;

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::model::catalog::{Catalog, Issue};
use crate::model::config::{IssueConfig, VendorConfig, default_issues};
use crate::parse::keyword_parser::scalar_to_string;

/// Which side a sync pass had to repair
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub config_changed: bool,
    pub catalog_changed: bool,
}

impl SyncReport {
    pub fn any(&self) -> bool {
        self.config_changed || self.catalog_changed
    }
}

/// Normalize a raw issues_config document into the vendor-scoped form.
///
/// The legacy flat form `{"issues": [...]}` is spread over `vendor_names`.
/// Every known vendor gets an entry; issue lists are trimmed, deduplicated and
/// never empty; delimiters are always strings. Vendor keys are trimmed and
/// blank ones dropped; when two keys trim alike the first wins. Entries for
/// vendors outside `vendor_names` are cleaned the same way and kept.
pub fn reconcile_config(
    raw: &Map<String, Value>,
    vendor_names: &[String],
    default_delimiter: &str,
) -> IssueConfig {
    let mut config = IssueConfig::default();

    if raw.contains_key("issues") && !raw.contains_key("vendors") {
        let shared = match raw.get("issues") {
            Some(Value::Array(items)) if !items.is_empty() => clean_issue_list(items),
            _ => default_issues(),
        };
        tracing::info!(
            vendors = vendor_names.len(),
            "migrating flat issue config to vendor-scoped form"
        );
        for vendor in vendor_names {
            config.vendors.insert(
                vendor.clone(),
                VendorConfig {
                    issues: shared.clone(),
                    delimiter: default_delimiter.to_string(),
                },
            );
        }
        return config;
    }

    if let Some(Value::Object(vendors)) = raw.get("vendors") {
        for (raw_name, entry) in vendors {
            let name = raw_name.trim();
            if name.is_empty() || config.vendors.contains_key(name) {
                tracing::warn!(vendor = %raw_name, "dropping blank or duplicate vendor config entry");
                continue;
            }
            config
                .vendors
                .insert(name.to_string(), vendor_entry(entry, default_delimiter));
        }
    }
    for vendor in vendor_names {
        if !config.vendors.contains_key(vendor) {
            config.vendors.insert(
                vendor.clone(),
                vendor_entry(&Value::Null, default_delimiter),
            );
        }
    }
    config
}

fn vendor_entry(raw: &Value, default_delimiter: &str) -> VendorConfig {
    let obj = raw.as_object();
    let issues = match obj.and_then(|o| o.get("issues")) {
        Some(Value::Array(items)) => clean_issue_list(items),
        _ => Vec::new(),
    };
    let issues = if issues.is_empty() {
        default_issues()
    } else {
        issues
    };
    let delimiter = match obj.and_then(|o| o.get("delimiter")) {
        None | Some(Value::Null) => default_delimiter.to_string(),
        Some(v) => scalar_to_string(v),
    };
    VendorConfig { issues, delimiter }
}

/// Trim, drop blanks, keep the first of each duplicate. May return empty.
fn clean_issue_list(items: &[Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for item in items {
        let name = scalar_to_string(item).trim().to_string();
        if name.is_empty() || !seen.insert(name.clone()) {
            continue;
        }
        out.push(name);
    }
    out
}

/// Cross-link config and catalog so that each references the other.
///
/// Vendors are unioned in both directions. Catalog-only issues are appended to
/// the vendor's list; listed issues missing from the catalog are created with
/// only `_COMMON`; every issue ends up holding `_COMMON`. Calling this twice in
/// a row reports no change the second time.
pub fn sync_with_catalog(
    config: &mut IssueConfig,
    catalog: &mut Catalog,
    default_delimiter: &str,
) -> SyncReport {
    let mut report = SyncReport::default();

    for vendor in catalog.vendor_names() {
        if !config.vendors.contains_key(&vendor) {
            config.vendors.insert(
                vendor,
                VendorConfig {
                    issues: default_issues(),
                    delimiter: default_delimiter.to_string(),
                },
            );
            report.config_changed = true;
        }
    }
    for vendor in config.vendors.keys() {
        if !catalog.vendors.contains_key(vendor) {
            tracing::info!(vendor = %vendor, "adding config-only vendor to catalog");
            catalog.vendors.insert(vendor.clone(), IndexMap::new());
            report.catalog_changed = true;
        }
    }

    for (vendor, vcfg) in config.vendors.iter_mut() {
        let Some(issues) = catalog.vendors.get_mut(vendor) else {
            continue;
        };

        if vcfg.issues.is_empty() {
            vcfg.issues = default_issues();
            report.config_changed = true;
        }

        let mut seen: HashSet<String> = vcfg.issues.iter().cloned().collect();
        for name in issues.keys() {
            let name = name.trim();
            if name.is_empty() || seen.contains(name) {
                continue;
            }
            tracing::debug!(vendor = %vendor, issue = %name, "listing catalog-only issue");
            seen.insert(name.to_string());
            vcfg.issues.push(name.to_string());
            report.config_changed = true;
        }

        for name in &vcfg.issues {
            if !issues.contains_key(name) {
                tracing::debug!(vendor = %vendor, issue = %name, "creating listed issue");
                issues.insert(name.clone(), Issue::new());
                report.catalog_changed = true;
            }
        }
        for issue in issues.values_mut() {
            if issue.ensure_common() {
                report.catalog_changed = true;
            }
        }
    }

    report
}
