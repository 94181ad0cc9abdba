pub mod catalog_ops;
pub mod feedback;
pub mod keyword_ops;
pub mod package;
pub mod reconcile;
pub mod selection;
pub mod template;

use std::fmt;

/// Which level of the catalog a name belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Vendor,
    Issue,
    Category,
    Param,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameKind::Vendor => write!(f, "vendor"),
            NameKind::Issue => write!(f, "issue"),
            NameKind::Category => write!(f, "category"),
            NameKind::Param => write!(f, "param"),
        }
    }
}

/// A rejected edit. Raised before anything is mutated.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{kind} already exists: {name}")]
    DuplicateName { kind: NameKind, name: String },
    #[error("{0} is protected and cannot be deleted or renamed")]
    ProtectedName(String),
    #[error("at least one issue must remain for vendor {0}")]
    LastIssue(String),
    #[error("at least one non-empty part is required")]
    EmptyParts,
    #[error("{0} name cannot be empty")]
    BlankName(NameKind),
    #[error("{kind} not found: {name}")]
    NotFound { kind: NameKind, name: String },
    #[error("keyword index {index} out of range ({len} keywords)")]
    IndexOutOfRange { index: usize, len: usize },
}

impl ValidationError {
    pub(crate) fn not_found(kind: NameKind, name: &str) -> Self {
        ValidationError::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    pub(crate) fn duplicate(kind: NameKind, name: &str) -> Self {
        ValidationError::DuplicateName {
            kind,
            name: name.to_string(),
        }
    }
}

/// Trim a user-supplied name, rejecting blanks.
pub(crate) fn clean_name(raw: &str, kind: NameKind) -> Result<String, ValidationError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ValidationError::BlankName(kind));
    }
    Ok(name.to_string())
}
