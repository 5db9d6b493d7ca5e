/// Hash a password using bcrypt at the given cost
pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
  bcrypt::hash(password, cost)
}

/// Verify a password against a stored hash.
/// bcrypt re-derives the digest and compares it in constant time.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, bcrypt::BcryptError> {
  bcrypt::verify(password, hash)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_hash_and_verify() {
    let hash = hash_password("secret1", 4).unwrap();
    assert_ne!(hash, "secret1");
    assert!(verify_password("secret1", &hash).unwrap());
    assert!(!verify_password("secret2", &hash).unwrap());
  }
}
