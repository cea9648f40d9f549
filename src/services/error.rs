//! Service error type
//!
//! Every service returns [`ServiceError`]; the HTTP layer maps each variant to
//! a status code in one place.

use std::fmt;

use crate::db::is_unique_violation;

/// The kind of entity an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Tag,
    Category,
    Classification,
    News,
}

impl EntityKind {
    /// Capitalised label used at the start of messages
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Tag => "Tag",
            EntityKind::Category => "Category",
            EntityKind::Classification => "Classification",
            EntityKind::News => "News article",
        }
    }

    /// Lowercase label used inside messages
    pub fn noun(&self) -> &'static str {
        match self {
            EntityKind::Tag => "tag",
            EntityKind::Category => "category",
            EntityKind::Classification => "classification",
            EntityKind::News => "news article",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error types for service operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Input rejected before touching the database
    #[error("{0}")]
    Validation(String),

    #[error("{0} with this name already exists")]
    DuplicateName(EntityKind),

    #[error("News article with slug '{0}' already exists")]
    DuplicateSlug(String),

    #[error("{0} not found")]
    NotFound(EntityKind),

    /// Delete refused while news articles still reference the entity
    #[error("Cannot delete {} with {count} associated articles", .kind.noun())]
    HasArticles { kind: EntityKind, count: i64 },

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ServiceError {
    /// Classify a failed insert or update of a named entity.
    ///
    /// A unique-index violation means a concurrent writer took the name after
    /// the duplicate check passed.
    pub fn from_name_write(kind: EntityKind, err: anyhow::Error) -> Self {
        if is_unique_violation(&err) {
            tracing::warn!("Unique index rejected {} name: {:#}", kind.noun(), err);
            ServiceError::DuplicateName(kind)
        } else {
            ServiceError::Internal(err)
        }
    }
}

/// Trim a name and check it against the entity's length limit.
///
/// The limit counts characters, not bytes.
pub fn validate_name(kind: EntityKind, raw: &str, max_len: usize) -> Result<String, ServiceError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation(format!(
            "{} name is required and must be a non-empty string",
            kind.label()
        )));
    }
    if name.chars().count() > max_len {
        return Err(ServiceError::Validation(format!(
            "{} name must be at most {} characters",
            kind.label(),
            max_len
        )));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        assert_eq!(
            ServiceError::DuplicateName(EntityKind::Tag).to_string(),
            "Tag with this name already exists"
        );
        assert_eq!(
            ServiceError::NotFound(EntityKind::Classification).to_string(),
            "Classification not found"
        );
        assert_eq!(
            ServiceError::HasArticles {
                kind: EntityKind::Category,
                count: 3
            }
            .to_string(),
            "Cannot delete category with 3 associated articles"
        );
        assert_eq!(
            ServiceError::NotFound(EntityKind::News).to_string(),
            "News article not found"
        );
    }

    #[test]
    fn test_validate_name() {
        assert_eq!(
            validate_name(EntityKind::Tag, "  Para Cycling ", 50).unwrap(),
            "Para Cycling"
        );

        let err = validate_name(EntityKind::Tag, "   ", 50).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Tag name is required and must be a non-empty string"
        );

        let err = validate_name(EntityKind::Category, &"x".repeat(101), 100).unwrap_err();
        assert_eq!(err.to_string(), "Category name must be at most 100 characters");

        // Multi-byte characters count once each
        assert!(validate_name(EntityKind::Tag, &"é".repeat(50), 50).is_ok());
    }

    #[test]
    fn test_from_name_write_keeps_other_errors_internal() {
        let err = ServiceError::from_name_write(EntityKind::Tag, anyhow::anyhow!("disk full"));
        assert!(matches!(err, ServiceError::Internal(_)));
    }
}
