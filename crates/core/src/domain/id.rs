// Identifier rules shared by providers and customers

use crate::domain::error::{DomainError, Result};

/// Longest identifier the engine accepts (UUIDs are 36 chars)
pub const MAX_ID_LEN: usize = 64;

/// An identifier is well-formed when it is non-empty, at most `MAX_ID_LEN`
/// characters, and made only of ASCII alphanumerics, `-` and `_`.
pub fn is_well_formed_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn ensure_well_formed(id: &str) -> Result<()> {
    if is_well_formed_id(id) {
        Ok(())
    } else {
        Err(DomainError::InvalidIdentifier(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_formed_ids() {
        assert!(is_well_formed_id("cust-1"));
        assert!(is_well_formed_id("3f0b8a4e-2d1c-4b7a-9e55-0c1f2a3b4c5d"));
        assert!(is_well_formed_id("walk_in_7"));
    }

    #[test]
    fn test_malformed_ids() {
        assert!(!is_well_formed_id(""));
        assert!(!is_well_formed_id("a b"));
        assert!(!is_well_formed_id("{\"$ne\":null}"));
        assert!(!is_well_formed_id(&"x".repeat(MAX_ID_LEN + 1)));
        assert!(ensure_well_formed("bad id").is_err());
    }
}
