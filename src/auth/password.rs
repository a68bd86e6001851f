use anyhow::{anyhow, Context};
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand::rngs::OsRng;
use tracing::error;

use crate::config::HashConfig;

/// Argon2id hasher with a fixed work factor.
///
/// Holds a dummy hash made with the same parameters so that a login for an
/// unknown email pays the same verification cost as a wrong password.
#[derive(Clone)]
pub struct CredentialHasher {
    params: Params,
    dummy_hash: String,
}

impl CredentialHasher {
    pub fn new(cfg: HashConfig) -> anyhow::Result<Self> {
        let params = Params::new(cfg.memory_kib, cfg.time_cost, Params::DEFAULT_P_COST, None)
            .map_err(|e| anyhow!("invalid argon2 params: {e}"))?;
        let mut hasher = Self {
            params,
            dummy_hash: String::new(),
        };
        hasher.dummy_hash = hasher.hash("tasktrack-dummy-password")?;
        Ok(hasher)
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    pub fn hash(&self, plain: &str) -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2()
            .hash_password(plain.as_bytes(), &salt)
            .map_err(|e| {
                error!(error = %e, "argon2 hash_password error");
                anyhow!(e.to_string())
            })?
            .to_string();
        Ok(hash)
    }

    /// Parameters are read from the stored PHC string, so hashes made under an
    /// older work factor still verify.
    pub fn verify(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(hash).map_err(|e| {
            error!(error = %e, "argon2 parse hash error");
            anyhow!(e.to_string())
        })?;
        Ok(self
            .argon2()
            .verify_password(plain.as_bytes(), &parsed)
            .is_ok())
    }

    /// Burns one verification against the dummy hash. Result is discarded.
    pub fn verify_dummy(&self, plain: &str) {
        let _ = self.verify(plain, &self.dummy_hash);
    }

    /// [`hash`](Self::hash) on the blocking pool.
    pub async fn hash_async(&self, plain: &str) -> anyhow::Result<String> {
        let hasher = self.clone();
        let plain = plain.to_owned();
        tokio::task::spawn_blocking(move || hasher.hash(&plain))
            .await
            .context("hash task")?
    }

    /// [`verify`](Self::verify) on the blocking pool.
    pub async fn verify_async(&self, plain: &str, hash: &str) -> anyhow::Result<bool> {
        let hasher = self.clone();
        let plain = plain.to_owned();
        let hash = hash.to_owned();
        tokio::task::spawn_blocking(move || hasher.verify(&plain, &hash))
            .await
            .context("verify task")?
    }

    pub async fn verify_dummy_async(&self, plain: &str) {
        let hasher = self.clone();
        let plain = plain.to_owned();
        let _ = tokio::task::spawn_blocking(move || hasher.verify_dummy(&plain)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(HashConfig {
            time_cost: 1,
            memory_kib: 64,
        })
        .expect("hasher")
    }

    #[test]
    fn hash_and_verify_roundtrip() {
        let h = hasher();
        let password = "Secur3P@ssw0rd!";
        let hash = h.hash(password).expect("hashing should succeed");
        assert!(h.verify(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let h = hasher();
        let hash = h.hash("correct-horse-battery-staple").expect("hashing should succeed");
        assert!(!h.verify("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn hashes_are_salted_and_opaque() {
        let h = hasher();
        let a = h.hash("secret1").unwrap();
        let b = h.hash("secret1").unwrap();
        assert_ne!(a, b);
        assert!(!a.contains("secret1"));
        assert!(a.starts_with("$argon2id$"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = hasher().verify("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }

    #[tokio::test(flavor = "current_thread")]
    async fn async_hashing_leaves_the_runtime_free() {
        use std::sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        };

        let h = CredentialHasher::new(HashConfig {
            time_cost: 2,
            memory_kib: 8_192,
        })
        .expect("hasher");
        let ticked = Arc::new(AtomicBool::new(false));
        let flag = ticked.clone();
        tokio::spawn(async move { flag.store(true, Ordering::SeqCst) });

        // on a single-threaded runtime the spawned task only runs if hashing yields
        let hash = h.hash_async("secret1").await.expect("hash");
        assert!(ticked.load(Ordering::SeqCst));

        assert!(h.verify_async("secret1", &hash).await.expect("verify"));
        assert!(!h.verify_async("secret2", &hash).await.expect("verify"));
        h.verify_dummy_async("whatever").await;
    }

    #[test]
    fn rejects_impossible_params() {
        assert!(CredentialHasher::new(HashConfig {
            time_cost: 0,
            memory_kib: 64,
        })
        .is_err());
    }
}
