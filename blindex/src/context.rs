//! Associated-data context bound into every sealed value.

use std::fmt;

/// Associated data used when none is configured.
pub const DEFAULT_ASSOCIATED_DATA: &str = "profile|email|v1";

/// Fixed associated-data context shared by all seal/open calls of a deployment.
///
/// The bytes are authenticated but not encrypted. Opening a value with any
/// other context fails authentication, so changing the context invalidates
/// everything sealed under the old one.
///
/// # Example
///
/// ```
/// use blindex::context::AssociatedData;
///
/// let ad = AssociatedData::for_field("profile", "email", 1);
/// assert_eq!(ad.to_string(), "profile|email|v1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AssociatedData {
    bytes: Vec<u8>,
}

impl AssociatedData {
    /// Creates a context from arbitrary bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self { bytes: bytes.into() }
    }

    /// Creates the canonical `table|column|v<version>` context.
    #[must_use]
    pub fn for_field(table_name: &str, column_name: &str, version: u32) -> Self {
        Self::new(format!("{table_name}|{column_name}|v{version}"))
    }

    /// Returns the raw context bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns `true` if the context is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl Default for AssociatedData {
    fn default() -> Self {
        Self::new(DEFAULT_ASSOCIATED_DATA)
    }
}

impl fmt::Display for AssociatedData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.bytes))
    }
}

impl From<&str> for AssociatedData {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for AssociatedData {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_field_display() {
        let ad = AssociatedData::for_field("users", "email", 2);
        assert_eq!(ad.to_string(), "users|email|v2");
    }

    #[test]
    fn test_default_context() {
        assert_eq!(AssociatedData::default().as_bytes(), DEFAULT_ASSOCIATED_DATA.as_bytes());
        assert_eq!(AssociatedData::default(), AssociatedData::for_field("profile", "email", 1));
    }

    #[test]
    fn test_versions_differ() {
        assert_ne!(
            AssociatedData::for_field("profile", "email", 1),
            AssociatedData::for_field("profile", "email", 2)
        );
    }

    #[test]
    fn test_raw_bytes_context() {
        let ad = AssociatedData::new(vec![0u8, 1, 2]);
        assert_eq!(ad.as_bytes(), &[0, 1, 2]);
        assert!(!ad.is_empty());
        assert!(AssociatedData::new(Vec::new()).is_empty());
    }
}
