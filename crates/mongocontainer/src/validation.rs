//! Name validation for collections and databases
//!
//! Names arrive as plain strings from callers. They are checked before any
//! driver call so that reserved namespaces and operator-like names never
//! reach the server.

use mongocontainer_common::{ContainerError, Result};

/// Maximum allowed length for collection names (MongoDB allows 255 for the full namespace)
const MAX_COLLECTION_NAME_LENGTH: usize = 120;

/// MongoDB rejects database names of 64 bytes or more
const MAX_DATABASE_NAME_LENGTH: usize = 63;

/// Characters MongoDB forbids in database names
const FORBIDDEN_DATABASE_CHARS: &[char] = &['/', '\\', '.', ' ', '"', '$', '*', '<', '>', ':', '|', '?'];

/// Validated collection name
///
/// - Not empty
/// - At most 120 bytes
/// - No null bytes
/// - No "system." prefix
/// - No `$` characters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCollectionName {
    name: String,
}

impl ValidatedCollectionName {
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(ContainerError::Validation(
                "Collection name cannot be empty".to_string(),
            ));
        }

        if name.len() > MAX_COLLECTION_NAME_LENGTH {
            return Err(ContainerError::Validation(format!(
                "Collection name exceeds maximum length of {} characters: '{}'",
                MAX_COLLECTION_NAME_LENGTH, name
            )));
        }

        if name.contains('\0') {
            return Err(ContainerError::Validation(
                "Collection name cannot contain null bytes".to_string(),
            ));
        }

        if name.starts_with("system.") {
            return Err(ContainerError::Validation(format!(
                "Collection name cannot start with 'system.' (reserved): '{}'",
                name
            )));
        }

        if name.contains('$') {
            return Err(ContainerError::Validation(format!(
                "Collection name cannot contain '$': '{}'",
                name
            )));
        }

        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

impl AsRef<str> for ValidatedCollectionName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}

/// Validated database name
///
/// - Not empty
/// - Shorter than 64 bytes
/// - None of `/\. "$*<>:|?` and no null bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedDatabaseName {
    name: String,
}

impl ValidatedDatabaseName {
    pub fn new(name: &str) -> Result<Self> {
        if name.is_empty() {
            return Err(ContainerError::Validation(
                "Database name cannot be empty".to_string(),
            ));
        }

        if name.len() > MAX_DATABASE_NAME_LENGTH {
            return Err(ContainerError::Validation(format!(
                "Database name exceeds maximum length of {} bytes: '{}'",
                MAX_DATABASE_NAME_LENGTH, name
            )));
        }

        if name.contains('\0') {
            return Err(ContainerError::Validation(
                "Database name cannot contain null bytes".to_string(),
            ));
        }

        if let Some(c) = name.chars().find(|c| FORBIDDEN_DATABASE_CHARS.contains(c)) {
            return Err(ContainerError::Validation(format!(
                "Database name cannot contain '{}': '{}'",
                c, name
            )));
        }

        Ok(Self {
            name: name.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_collection_names() {
        for name in ["users", "posts", "my_collection", "test123", "audit.events"] {
            assert!(
                ValidatedCollectionName::new(name).is_ok(),
                "Should accept valid name: {}",
                name
            );
        }
    }

    #[test]
    fn test_empty_collection_name() {
        let result = ValidatedCollectionName::new("");
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_collection_name_too_long() {
        let long_name = "a".repeat(MAX_COLLECTION_NAME_LENGTH + 1);
        let result = ValidatedCollectionName::new(&long_name);
        assert!(result.unwrap_err().to_string().contains("maximum length"));
    }

    #[test]
    fn test_collection_name_with_null_byte() {
        let result = ValidatedCollectionName::new("test\0collection");
        assert!(result.unwrap_err().to_string().contains("null bytes"));
    }

    #[test]
    fn test_system_collection_rejected() {
        let result = ValidatedCollectionName::new("system.users");
        assert!(result.unwrap_err().to_string().contains("system."));
    }

    #[test]
    fn test_collection_name_with_dollar() {
        let result = ValidatedCollectionName::new("$cmd");
        assert!(matches!(result, Err(ContainerError::Validation(_))));
    }

    #[test]
    fn test_collection_name_as_str() {
        let name = ValidatedCollectionName::new("users").unwrap();
        assert_eq!(name.as_str(), "users");
        assert_eq!(name.as_ref(), "users");
    }

    #[test]
    fn test_valid_database_names() {
        for name in ["testdb", "app_prod", "tenant-42"] {
            assert!(ValidatedDatabaseName::new(name).is_ok(), "{}", name);
        }
    }

    #[test]
    fn test_empty_database_name() {
        let result = ValidatedDatabaseName::new("");
        assert!(result.unwrap_err().to_string().contains("empty"));
    }

    #[test]
    fn test_database_name_forbidden_chars() {
        for name in ["my.db", "my db", "a/b", "a$b", "what?"] {
            let result = ValidatedDatabaseName::new(name);
            assert!(
                matches!(result, Err(ContainerError::Validation(_))),
                "Should reject: {}",
                name
            );
        }
    }

    #[test]
    fn test_database_name_too_long() {
        let result = ValidatedDatabaseName::new(&"d".repeat(64));
        assert!(result.unwrap_err().to_string().contains("maximum length"));
    }
}
