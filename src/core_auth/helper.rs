use bcrypt::{hash, verify, BcryptResult, DEFAULT_COST};

const BCRYPT_PREFIXES: [&str; 3] = ["$2a$", "$2b$", "$2y$"];

pub fn hash_password(password: &str) -> BcryptResult<String> {
    hash(password, DEFAULT_COST)
}

pub fn verify_password(password: &str, hashed_password: &str) -> bool {
    verify(password, hashed_password).unwrap_or(false)
}

/// Whether a configured password is a bcrypt hash rather than plaintext.
pub fn is_bcrypt_hash(value: &str) -> bool {
    value.len() == 60 && BCRYPT_PREFIXES.iter().any(|prefix| value.starts_with(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_detection() {
        let hashed = hash("secret", 4).unwrap();
        assert!(is_bcrypt_hash(&hashed));
        assert!(!is_bcrypt_hash("secret"));
        assert!(!is_bcrypt_hash("$2b$short"));
    }

    #[test]
    fn test_verify_password() {
        let hashed = hash("secret", 4).unwrap();
        assert!(verify_password("secret", &hashed));
        assert!(!verify_password("Secret", &hashed));
        assert!(!verify_password("secret", "not a hash"));
    }
}
