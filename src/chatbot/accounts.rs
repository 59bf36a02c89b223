//! Password hashing for user accounts (bcrypt).

use tracing::warn;

#[cfg(not(test))]
const COST: u32 = bcrypt::DEFAULT_COST;
// Minimum cost keeps the test suite fast.
#[cfg(test)]
const COST: u32 = 4;

pub fn hash_password(password: &str) -> Result<String, String> {
    bcrypt::hash(password, COST).map_err(|e| format!("Failed to hash password: {e}"))
}

/// Check `password` against a stored hash. Malformed hashes never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match bcrypt::verify(password, stored) {
        Ok(ok) => ok,
        Err(e) => {
            warn!("Unreadable password hash: {e}");
            false
        }
    }
}
