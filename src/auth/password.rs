use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};
use tracing::error;

use crate::config::PasswordConfig;

/// Argon2id hasher carrying the configured cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordPolicy {
    pub time_cost: u32,
    pub memory_kib: u32,
}

impl From<&PasswordConfig> for PasswordPolicy {
    fn from(cfg: &PasswordConfig) -> Self {
        Self {
            time_cost: cfg.hash_cost,
            memory_kib: cfg.hash_memory_kib,
        }
    }
}

impl PasswordPolicy {
    fn argon2(&self) -> anyhow::Result<Argon2<'static>> {
        let params = Params::new(self.memory_kib, self.time_cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| anyhow::anyhow!("invalid argon2 params: {e}"))?;
        Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()?
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow::anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// Hashing is CPU bound; run it off the async workers.
    pub async fn hash_blocking(&self, plain: String) -> anyhow::Result<String> {
        let policy = *self;
        tokio::task::spawn_blocking(move || policy.hash(&plain)).await?
    }
}

/// Cost parameters are read back from the PHC string, so verification needs no policy.
pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

pub async fn verify_password_blocking(plain: String, hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || verify_password(&plain, &hash)).await?
}

/// 9 random bytes, base64url without padding (12 chars).
pub fn generate_password() -> String {
    let mut bytes = [0u8; 9];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
