use crate::model::catalog::{COMMON_CATEGORY, Catalog, Category, Issue, rename_key};
use crate::model::config::IssueConfig;
use crate::ops::{NameKind, ValidationError, clean_name};

// ---------------------------------------------------------------------------
// Issues (vendor-scoped: touch both the config list and the catalog)
// ---------------------------------------------------------------------------

/// Append a new issue to the vendor's list and give it an empty `_COMMON`.
/// Returns the trimmed issue name.
pub fn add_issue(
    config: &mut IssueConfig,
    catalog: &mut Catalog,
    vendor: &str,
    name: &str,
) -> Result<String, ValidationError> {
    let name = clean_name(name, NameKind::Issue)?;
    let vcfg = config
        .vendor_mut(vendor)
        .ok_or_else(|| ValidationError::not_found(NameKind::Vendor, vendor))?;
    let issues = catalog
        .vendor_mut(vendor)
        .ok_or_else(|| ValidationError::not_found(NameKind::Vendor, vendor))?;
    if vcfg.issues.contains(&name) || issues.contains_key(&name) {
        return Err(ValidationError::duplicate(NameKind::Issue, &name));
    }

    vcfg.issues.push(name.clone());
    issues.insert(name.clone(), Issue::new());
    Ok(name)
}

/// Remove an issue from the vendor's list and the catalog. The vendor's last
/// remaining issue cannot be deleted.
pub fn delete_issue(
    config: &mut IssueConfig,
    catalog: &mut Catalog,
    vendor: &str,
    name: &str,
) -> Result<(), ValidationError> {
    let vcfg = config
        .vendor_mut(vendor)
        .ok_or_else(|| ValidationError::not_found(NameKind::Vendor, vendor))?;
    let pos = vcfg
        .issues
        .iter()
        .position(|i| i == name)
        .ok_or_else(|| ValidationError::not_found(NameKind::Issue, name))?;
    if vcfg.issues.len() <= 1 {
        return Err(ValidationError::LastIssue(vendor.to_string()));
    }

    vcfg.issues.remove(pos);
    if let Some(issues) = catalog.vendor_mut(vendor) {
        issues.shift_remove(name);
    }
    Ok(())
}

/// Rename an issue, keeping its position in the list and its subtree.
/// Renaming to the current name is a no-op. Returns the trimmed new name.
pub fn rename_issue(
    config: &mut IssueConfig,
    catalog: &mut Catalog,
    vendor: &str,
    old: &str,
    new: &str,
) -> Result<String, ValidationError> {
    let new = clean_name(new, NameKind::Issue)?;
    let vcfg = config
        .vendor_mut(vendor)
        .ok_or_else(|| ValidationError::not_found(NameKind::Vendor, vendor))?;
    let issues = catalog
        .vendor_mut(vendor)
        .ok_or_else(|| ValidationError::not_found(NameKind::Vendor, vendor))?;
    let pos = vcfg
        .issues
        .iter()
        .position(|i| i == old)
        .ok_or_else(|| ValidationError::not_found(NameKind::Issue, old))?;
    if new == old {
        return Ok(new);
    }
    if vcfg.issues.contains(&new) || issues.contains_key(&new) {
        return Err(ValidationError::duplicate(NameKind::Issue, &new));
    }

    vcfg.issues[pos] = new.clone();
    if !rename_key(issues, old, &new) {
        issues.insert(new.clone(), Issue::new());
    }
    Ok(new)
}

/// Set the vendor's join delimiter. Any string is accepted, including "".
pub fn set_delimiter(
    config: &mut IssueConfig,
    vendor: &str,
    delimiter: &str,
) -> Result<(), ValidationError> {
    let vcfg = config
        .vendor_mut(vendor)
        .ok_or_else(|| ValidationError::not_found(NameKind::Vendor, vendor))?;
    vcfg.delimiter = delimiter.to_string();
    Ok(())
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

fn issue_mut<'a>(
    catalog: &'a mut Catalog,
    vendor: &str,
    issue: &str,
) -> Result<&'a mut Issue, ValidationError> {
    if catalog.vendor(vendor).is_none() {
        return Err(ValidationError::not_found(NameKind::Vendor, vendor));
    }
    catalog
        .issue_mut(vendor, issue)
        .ok_or_else(|| ValidationError::not_found(NameKind::Issue, issue))
}

/// Add an empty category to an issue. Returns the trimmed name.
pub fn add_category(
    catalog: &mut Catalog,
    vendor: &str,
    issue: &str,
    name: &str,
) -> Result<String, ValidationError> {
    let name = clean_name(name, NameKind::Category)?;
    let issue = issue_mut(catalog, vendor, issue)?;
    if issue.categories.contains_key(&name) {
        return Err(ValidationError::duplicate(NameKind::Category, &name));
    }
    issue.categories.insert(name.clone(), Category::default());
    Ok(name)
}

/// Delete a category. `_COMMON` is protected.
pub fn delete_category(
    catalog: &mut Catalog,
    vendor: &str,
    issue: &str,
    name: &str,
) -> Result<Category, ValidationError> {
    if name == COMMON_CATEGORY {
        return Err(ValidationError::ProtectedName(name.to_string()));
    }
    let issue = issue_mut(catalog, vendor, issue)?;
    issue
        .categories
        .shift_remove(name)
        .ok_or_else(|| ValidationError::not_found(NameKind::Category, name))
}

/// Rename a category in place. `_COMMON` can be neither the source nor the
/// target. Returns the trimmed new name.
pub fn rename_category(
    catalog: &mut Catalog,
    vendor: &str,
    issue: &str,
    old: &str,
    new: &str,
) -> Result<String, ValidationError> {
    if old == COMMON_CATEGORY {
        return Err(ValidationError::ProtectedName(old.to_string()));
    }
    let new = clean_name(new, NameKind::Category)?;
    let issue = issue_mut(catalog, vendor, issue)?;
    if !issue.categories.contains_key(old) {
        return Err(ValidationError::not_found(NameKind::Category, old));
    }
    if new == old {
        return Ok(new);
    }
    if issue.categories.contains_key(&new) {
        return Err(ValidationError::duplicate(NameKind::Category, &new));
    }
    rename_key(&mut issue.categories, old, &new);
    Ok(new)
}
