use std::time::Duration;

use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, warn};

use crate::auth::claims::Claims;
use crate::config::JwtConfig;
use crate::error::AppError;
use crate::users::repo_types::PublicUser;

/// Holds JWT signing and verification keys with the configured TTL.
/// Stateless: tokens carry their own expiry and nothing is stored
/// server-side, so revocation before expiry is not possible.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl JwtKeys {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::from_secs((config.ttl_days as u64) * 24 * 60 * 60),
        }
    }

    /// Sign a token carrying the user's id, email and role.
    pub fn sign(&self, user: &PublicUser) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.ttl.as_secs() as i64);
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user.id, "jwt signed");
        Ok(token)
    }

    /// Check signature, structure and expiry. Nothing else is validated;
    /// any failure collapses into the same `Unauthorized` error.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        match decode::<Claims>(token, &self.decoding, &Validation::default()) {
            Ok(data) => {
                debug!(user_id = %data.claims.sub, "jwt verified");
                Ok(data.claims)
            }
            Err(e) => {
                warn!(error = %e, "jwt verification failed");
                Err(AppError::Unauthorized("Invalid token".into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::repo_types::{Role, User};
    use uuid::Uuid;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::new(&JwtConfig {
            secret: secret.into(),
            ttl_days: 7,
        })
    }

    fn make_user() -> PublicUser {
        let now = OffsetDateTime::now_utc();
        PublicUser::from(User {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            password_hash: None,
            name: "A".into(),
            phone: None,
            district: None,
            verified: false,
            is_representative: false,
            role: Role::User,
            position: None,
            party: None,
            rating: None,
            balance: 10,
            last_activity: None,
            oauth_provider: None,
            oauth_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys("dev-secret");
        let user = make_user();
        let token = keys.sign(&user).expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, user.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.role, Role::User);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_rejects_tampered_signature() {
        let keys = make_keys("dev-secret");
        let token = keys.sign(&make_user()).expect("sign");
        let (rest, signature) = token.rsplit_once('.').expect("three segments");
        let tampered = format!("{rest}.{}", "A".repeat(signature.len()));
        assert!(keys.verify(&tampered).is_err());
    }

    #[test]
    fn verify_rejects_wrong_secret() {
        let token = make_keys("secret-one").sign(&make_user()).expect("sign");
        assert!(make_keys("secret-two").verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_expired_token() {
        let keys = make_keys("dev-secret");
        let user = make_user();
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let claims = Claims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: (now - 7200) as usize,
            exp: (now - 3600) as usize, // expired an hour ago, past leeway
        };
        let token = encode(&Header::default(), &claims, &keys.encoding).expect("encode");
        assert!(keys.verify(&token).is_err());
    }

    #[test]
    fn verify_rejects_garbage() {
        let keys = make_keys("dev-secret");
        assert!(keys.verify("not-a-jwt").is_err());
        assert!(keys.verify("").is_err());
    }
}
