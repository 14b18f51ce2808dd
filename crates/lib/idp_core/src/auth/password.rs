//! Password hashing via bcrypt.

use super::AuthError;

/// bcrypt cost factor used when none is configured.
pub const DEFAULT_BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;

/// Lowest cost bcrypt accepts. Only sensible in tests.
pub const MIN_BCRYPT_COST: u32 = 4;

pub const MAX_BCRYPT_COST: u32 = 31;

/// Salted, tunable-cost password hasher.
///
/// Hashing is slow on purpose; callers on an async runtime should run it on a
/// blocking thread. Verification compares digests in constant time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    /// Create a hasher with the given bcrypt cost (4..=31).
    pub fn new(cost: u32) -> Result<Self, AuthError> {
        if !(MIN_BCRYPT_COST..=MAX_BCRYPT_COST).contains(&cost) {
            return Err(AuthError::ValidationError(format!(
                "bcrypt cost must be between {MIN_BCRYPT_COST} and {MAX_BCRYPT_COST}, got {cost}"
            )));
        }
        Ok(Self { cost })
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a password.
    pub fn hash(&self, password: &str) -> Result<String, AuthError> {
        bcrypt::hash(password, self.cost)
            .map_err(|e| AuthError::Internal(format!("bcrypt hash: {e}")))
    }

    /// Verify a password against a bcrypt hash.
    pub fn verify(&self, password: &str, hash: &str) -> Result<bool, AuthError> {
        bcrypt::verify(password, hash)
            .map_err(|e| AuthError::Internal(format!("bcrypt verify: {e}")))
    }
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self {
            cost: DEFAULT_BCRYPT_COST,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> PasswordHasher {
        PasswordHasher::new(MIN_BCRYPT_COST).unwrap()
    }

    #[test]
    fn hash_then_verify() {
        let hasher = fast();
        let digest = hasher.hash("pw").unwrap();
        assert_ne!(digest, "pw");
        assert!(hasher.verify("pw", &digest).unwrap());
        assert!(!hasher.verify("wrong", &digest).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let hasher = fast();
        assert_ne!(hasher.hash("pw").unwrap(), hasher.hash("pw").unwrap());
    }

    #[test]
    fn cost_is_range_checked() {
        assert!(PasswordHasher::new(3).is_err());
        assert!(PasswordHasher::new(32).is_err());
        assert_eq!(PasswordHasher::new(10).unwrap().cost(), 10);
    }

    #[test]
    fn garbage_digest_is_an_error() {
        assert!(fast().verify("pw", "not-a-bcrypt-hash").is_err());
    }
}
