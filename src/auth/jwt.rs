use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;

use crate::{config::JwtConfig, error::AuthError, state::AppState};

/// JWT payload. The subject is the user's email, which the identity resolver
/// looks up against the credential store on every authenticated request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
    pub iss: String,
    pub aud: String,
}

/// Signing and verification keys derived from the configured secret.
#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
    pub issuer: String,
    pub audience: String,
    pub ttl: Duration,
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(config: &JwtConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            issuer: config.issuer.clone(),
            audience: config.audience.clone(),
            ttl: Duration::from_secs((config.ttl_minutes as u64) * 60),
        }
    }

    pub fn sign(&self, subject: &str) -> anyhow::Result<String> {
        self.sign_with_ttl(subject, TimeDuration::seconds(self.ttl.as_secs() as i64))
    }

    pub fn sign_with_ttl(&self, subject: &str, ttl: TimeDuration) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + ttl;
        let claims = Claims {
            sub: subject.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(subject = %subject, "jwt signed");
        Ok(token)
    }

    /// Parse and verify a presented token. The error distinguishes how
    /// verification failed; callers must collapse that distinction before it
    /// reaches a client.
    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let mut validation = Validation::default();
        // No clock slack: a token is rejected from the first second past exp.
        validation.leeway = 0;
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));

        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => {
                debug!(subject = %data.claims.sub, "jwt verified");
                Ok(data.claims)
            }
            Err(e) => Err(match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::ExpiredToken,
                ErrorKind::InvalidSignature => AuthError::BadSignature,
                _ => AuthError::MalformedToken,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(secret: &str) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            secret: secret.into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 30,
        })
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let keys = make_keys("dev-secret");
        let token = keys.sign("a@x.com").expect("sign");
        let claims = keys.verify(&token).expect("verify");
        assert_eq!(claims.sub, "a@x.com");
        assert_eq!(claims.iss, "test-issuer");
        assert_eq!(claims.aud, "test-aud");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_is_valid_immediately_after_issue() {
        let keys = make_keys("dev-secret");
        let token = keys.sign("a@x.com").expect("sign");
        assert!(keys.verify(&token).is_ok());
    }

    #[test]
    fn elapsed_ttl_is_rejected_as_expired() {
        let keys = make_keys("dev-secret");
        let token = keys
            .sign_with_ttl("a@x.com", TimeDuration::seconds(-60))
            .expect("sign");
        assert_eq!(keys.verify(&token).unwrap_err(), AuthError::ExpiredToken);
    }

    #[test]
    fn different_secret_fails_regardless_of_payload() {
        let good = make_keys("secret-one");
        let other = make_keys("secret-two");
        let token = good.sign("a@x.com").expect("sign");
        assert_eq!(other.verify(&token).unwrap_err(), AuthError::BadSignature);
    }

    #[test]
    fn truncated_token_is_rejected() {
        let keys = make_keys("dev-secret");
        let token = keys.sign("a@x.com").expect("sign");
        let truncated = &token[..token.len() - 1];
        let err = keys.verify(truncated).unwrap_err();
        assert!(matches!(
            err,
            AuthError::BadSignature | AuthError::MalformedToken
        ));
    }

    #[test]
    fn garbage_token_is_malformed() {
        let keys = make_keys("dev-secret");
        assert_eq!(
            keys.verify("not.a.jwt").unwrap_err(),
            AuthError::MalformedToken
        );
        assert_eq!(keys.verify("").unwrap_err(), AuthError::MalformedToken);
    }
}
