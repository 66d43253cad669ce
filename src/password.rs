/// Hash a password for storage
pub fn hash_password(plain: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plain, bcrypt::DEFAULT_COST)
}

/// Check a password against a stored value.
///
/// bcrypt hashes are verified as hashes; any other non-empty stored value is
/// a legacy plain-text record and compared directly.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    if stored.is_empty() {
        return false;
    }

    if stored.starts_with("$2a$") || stored.starts_with("$2b$") || stored.starts_with("$2y$") {
        return bcrypt::verify(plain, stored).unwrap_or(false);
    }

    plain == stored
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_then_verify() {
        let hash = bcrypt::hash("hunter2", 4).unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
    }

    #[test]
    fn test_legacy_plain_text() {
        assert!(verify_password("secret", "secret"));
        assert!(!verify_password("secret", "Secret"));
    }

    #[test]
    fn test_empty_stored_never_matches() {
        assert!(!verify_password("", ""));
        assert!(!verify_password("anything", ""));
    }

    #[test]
    fn test_malformed_hash_is_rejected() {
        assert!(!verify_password("x", "$2b$not-a-real-hash"));
    }
}
