use argon2::password_hash::{
    self, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString,
};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;

pub const DEFAULT_HASH_ITERATIONS: u32 = Params::DEFAULT_T_COST;
pub const DEFAULT_HASH_MEMORY_KIB: u32 = Params::DEFAULT_M_COST;
pub const MIN_HASH_MEMORY_KIB: u32 = Params::MIN_M_COST;

const BURN_SALT: &str = "cGxhY2VtZW50cG9ydGFsYnVybg";

/// Argon2id password hashing into PHC strings.
///
/// Cost parameters travel with each hash, so changing the configured memory
/// or iteration count only affects newly registered users.
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self::new(DEFAULT_HASH_MEMORY_KIB, DEFAULT_HASH_ITERATIONS)
    }
}

impl PasswordHasher {
    /// Cost values below the Argon2 minimums are raised to them.
    pub fn new(memory_kib: u32, iterations: u32) -> Self {
        let params = Params::new(
            memory_kib.max(MIN_HASH_MEMORY_KIB),
            iterations.max(Params::MIN_T_COST),
            Params::DEFAULT_P_COST,
            None,
        )
        .unwrap_or_default();
        Self { params }
    }

    pub fn iterations(&self) -> u32 {
        self.params.t_cost()
    }

    pub fn memory_kib(&self) -> u32 {
        self.params.m_cost()
    }

    pub fn hash(&self, password: &str) -> Result<String, password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self.argon2().hash_password(password.as_bytes(), &salt)?;
        Ok(hash.to_string())
    }

    /// Check `password` against a stored PHC string. Malformed hashes never verify.
    pub fn verify(&self, password: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        self.argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }

    /// Spend the cost of a verification without a stored hash to compare against.
    pub fn burn(&self, password: &str) {
        if let Ok(salt) = SaltString::from_b64(BURN_SALT) {
            let _ = self.argon2().hash_password(password.as_bytes(), &salt);
        }
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}
