use std::sync::Arc;

use anyhow::Context;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use super::claims::Claims;
use crate::{config::JwtConfig, error::AppError};

/// Signing and verification keys, built once from config at startup.
#[derive(Clone)]
pub struct JwtKeys {
    inner: Arc<KeysInner>,
}

struct KeysInner {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    issuer: String,
    audience: String,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(cfg: &JwtConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(std::slice::from_ref(&cfg.audience));
        validation.set_issuer(std::slice::from_ref(&cfg.issuer));
        validation.leeway = 0;
        Self {
            inner: Arc::new(KeysInner {
                encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
                decoding: DecodingKey::from_secret(cfg.secret.as_bytes()),
                validation,
                issuer: cfg.issuer.clone(),
                audience: cfg.audience.clone(),
                ttl: Duration::seconds(cfg.ttl_minutes.saturating_mul(60)),
            }),
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str) -> anyhow::Result<String> {
        self.issue_at(user_id, email, OffsetDateTime::now_utc())
    }

    fn issue_at(&self, user_id: Uuid, email: &str, now: OffsetDateTime) -> anyhow::Result<String> {
        let k = &self.inner;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            iat: now.unix_timestamp().max(0) as usize,
            exp: now
                .checked_add(k.ttl)
                .context("token expiry out of range")?
                .unix_timestamp()
                .max(0) as usize,
            iss: k.issuer.clone(),
            aud: k.audience.clone(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &k.encoding)?;
        debug!(user_id = %user_id, "jwt signed");
        Ok(token)
    }

    /// Malformed, forged and expired tokens all collapse into `InvalidToken`.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let k = &self.inner;
        let data = decode::<Claims>(token, &k.decoding, &k.validation).map_err(|e| {
            debug!(error = %e, "jwt rejected");
            AppError::InvalidToken
        })?;
        debug!(user_id = %data.claims.sub, "jwt verified");
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str, issuer: &str, audience: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            ttl_minutes: 60 * 24 * 7,
        })
    }

    #[test]
    fn issue_and_verify_roundtrip() {
        let keys = make_keys("dev-secret", "test-issuer", "test-aud");
        let user_id = Uuid::new_v4();
        let token = keys.issue(user_id, "a@b.com").expect("issue");
        let claims = keys.verify(&token).expect("verify token");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email, "a@b.com");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let eight_days_ago = OffsetDateTime::now_utc() - Duration::days(8);
        let token = keys
            .issue_at(Uuid::new_v4(), "a@b.com", eight_days_ago)
            .expect("issue");
        assert!(matches!(keys.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn verify_accepts_token_inside_window() {
        let keys = make_keys("dev-secret", "iss", "aud");
        let six_days_ago = OffsetDateTime::now_utc() - Duration::days(6);
        let token = keys
            .issue_at(Uuid::new_v4(), "a@b.com", six_days_ago)
            .expect("issue");
        assert!(keys.verify(&token).is_ok());
    }

    #[test]
    fn rotated_secret_invalidates_tokens() {
        let old = make_keys("old-secret", "iss", "aud");
        let new = make_keys("new-secret", "iss", "aud");
        let token = old.issue(Uuid::new_v4(), "a@b.com").expect("issue");
        assert!(matches!(new.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn verify_rejects_wrong_issuer_or_audience() {
        let good_keys = make_keys("same-secret", "good-iss", "good-aud");
        let bad_keys = make_keys("same-secret", "bad-iss", "bad-aud");
        let token = good_keys.issue(Uuid::new_v4(), "a@b.com").expect("issue");
        assert!(matches!(bad_keys.verify(&token), Err(AppError::InvalidToken)));
    }

    #[test]
    fn oversized_ttl_errors_instead_of_panicking() {
        let keys = JwtKeys::new(&JwtConfig {
            secret: "dev-secret".into(),
            issuer: "iss".into(),
            audience: "aud".into(),
            ttl_minutes: 10_000_000_000,
        });
        assert!(keys.issue(Uuid::new_v4(), "a@b.com").is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = make_keys("dev-secret", "iss", "aud");
        assert!(matches!(keys.verify("not.a.jwt"), Err(AppError::InvalidToken)));
        assert!(matches!(keys.verify(""), Err(AppError::InvalidToken)));
    }
}
