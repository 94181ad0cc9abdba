use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Delimiter used when a vendor has none configured.
pub const DEFAULT_DELIMITER: &str = ";";

/// Issues a vendor starts with (data issue, network registration issue).
pub fn default_issues() -> Vec<String> {
    vec!["데이터 이슈".to_string(), "망등록 이슈".to_string()]
}

/// Vendor-scoped issue configuration (issues_config.json)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueConfig {
    #[serde(default)]
    pub vendors: IndexMap<String, VendorConfig>,
}

/// Issue list and join delimiter for one vendor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorConfig {
    /// Display order of the vendor's issues
    pub issues: Vec<String>,
    /// May be empty; never absent
    pub delimiter: String,
}

impl Default for VendorConfig {
    fn default() -> Self {
        VendorConfig {
            issues: default_issues(),
            delimiter: DEFAULT_DELIMITER.to_string(),
        }
    }
}

impl IssueConfig {
    pub fn vendor(&self, vendor: &str) -> Option<&VendorConfig> {
        self.vendors.get(vendor)
    }

    pub fn vendor_mut(&mut self, vendor: &str) -> Option<&mut VendorConfig> {
        self.vendors.get_mut(vendor)
    }

    /// Configured issues of a vendor, empty when the vendor is unknown.
    pub fn issues(&self, vendor: &str) -> &[String] {
        self.vendors
            .get(vendor)
            .map_or(&[][..], |v| v.issues.as_slice())
    }

    /// The vendor's delimiter, or the default for an unknown vendor.
    pub fn delimiter(&self, vendor: &str) -> &str {
        self.vendors
            .get(vendor)
            .map_or(DEFAULT_DELIMITER, |v| v.delimiter.as_str())
    }
}
