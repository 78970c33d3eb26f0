/// Failures surfaced by registry operations.
///
/// Lookups and removals report absence through `Option`/`bool`, so the only
/// user-facing failure of the core is a uniqueness violation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// `(dimension, name)` is already occupied and replacement was not requested.
    #[error("item '{name}' already exists in dimension '{dimension}'")]
    AlreadyExists { name: String, dimension: String },
}

impl RegistryError {
    pub(crate) fn already_exists(name: &str, dimension: &str) -> Self {
        RegistryError::AlreadyExists {
            name: name.to_owned(),
            dimension: dimension.to_owned(),
        }
    }

    /// Name of the item the error refers to.
    pub fn item_name(&self) -> &str {
        match self {
            RegistryError::AlreadyExists { name, .. } => name,
        }
    }

    /// Dimension of the item the error refers to.
    pub fn dimension(&self) -> &str {
        match self {
            RegistryError::AlreadyExists { dimension, .. } => dimension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_exists_display() {
        let err = RegistryError::already_exists("svc", "types");
        assert_eq!(
            err.to_string(),
            "item 'svc' already exists in dimension 'types'"
        );
    }

    #[test]
    fn test_accessors() {
        let err = RegistryError::already_exists("backup", "command");
        assert_eq!(err.item_name(), "backup");
        assert_eq!(err.dimension(), "command");
    }

    #[test]
    fn test_equality() {
        assert_eq!(
            RegistryError::already_exists("a", "b"),
            RegistryError::already_exists("a", "b")
        );
        assert_ne!(
            RegistryError::already_exists("a", "b"),
            RegistryError::already_exists("a", "c")
        );
    }

    #[test]
    fn test_error_trait() {
        let err: &dyn std::error::Error = &RegistryError::already_exists("x", "default");
        assert_eq!(err.to_string(), "item 'x' already exists in dimension 'default'");
    }
}
