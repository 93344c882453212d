use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::{
    auth::{error::AuthError, repo_types::Account},
    config::JwtConfig,
};

/// Bearer token payload. Field names and HS256 are shared with whatever
/// verifies these tokens, so they must not drift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    #[serde(rename = "id")]
    pub sub: Uuid, // account id
    pub email: String,
    pub exp: i64, // expires at (unix timestamp)
}

/// Ten years; keeps every expiry well inside the representable date range.
pub const MAX_TTL_HOURS: i64 = 24 * 366 * 10;

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(cfg: &JwtConfig) -> Result<Self, AuthError> {
        if cfg.secret.is_empty() {
            return Err(AuthError::Signing("signing secret is empty".into()));
        }
        if cfg.ttl_hours <= 0 || cfg.ttl_hours > MAX_TTL_HOURS {
            return Err(AuthError::Signing(format!(
                "token ttl must be within 1..={MAX_TTL_HOURS}h, got {}h",
                cfg.ttl_hours
            )));
        }
        let ttl_secs = cfg
            .ttl_hours
            .checked_mul(60 * 60)
            .ok_or_else(|| AuthError::Signing("token ttl overflows".into()))?;
        Ok(Self {
            encoding: EncodingKey::from_secret(cfg.secret.as_bytes()),
            ttl: Duration::seconds(ttl_secs),
        })
    }

    pub fn issue(&self, account: &Account) -> Result<String, AuthError> {
        self.issue_at(account, OffsetDateTime::now_utc())
    }

    pub fn issue_at(&self, account: &Account, now: OffsetDateTime) -> Result<String, AuthError> {
        let expires_at = now
            .checked_add(self.ttl)
            .ok_or_else(|| AuthError::Signing("token expiry out of range".into()))?;
        let claims = Claims {
            sub: account.id,
            email: account.email.clone(),
            exp: expires_at.unix_timestamp(),
        };
        let token = encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        debug!(account_id = %account.id, exp = claims.exp, "jwt signed");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    fn config(secret: &str) -> JwtConfig {
        JwtConfig {
            secret: secret.into(),
            ttl_hours: 72,
        }
    }

    fn account() -> Account {
        Account {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            password_hash: "unused".into(),
        }
    }

    fn decode_with(secret: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
            .map(|data| data.claims)
    }

    #[test]
    fn token_carries_account_claims_and_72h_expiry() {
        let issuer = TokenIssuer::new(&config("dev-secret")).unwrap();
        let account = account();
        let issued_at = OffsetDateTime::now_utc();

        let token = issuer.issue_at(&account, issued_at).expect("sign");
        let claims = decode_with("dev-secret", &token).expect("verify");

        assert_eq!(claims.sub, account.id);
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(
            claims.exp,
            issued_at.unix_timestamp() + 72 * 60 * 60
        );
    }

    #[test]
    fn claims_use_wire_field_names() {
        let issuer = TokenIssuer::new(&config("dev-secret")).unwrap();
        let account = account();
        let token = issuer.issue(&account).unwrap();

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        let raw = decode::<serde_json::Value>(
            &token,
            &DecodingKey::from_secret(b"dev-secret"),
            &validation,
        )
        .unwrap()
        .claims;

        assert_eq!(raw["id"], account.id.to_string());
        assert_eq!(raw["email"], "a@x.com");
        assert!(raw["exp"].is_i64());
        assert_eq!(raw.as_object().unwrap().len(), 3);
    }

    #[test]
    fn token_is_rejected_under_another_key() {
        let issuer = TokenIssuer::new(&config("dev-secret")).unwrap();
        let token = issuer.issue(&account()).unwrap();
        assert!(decode_with("other-secret", &token).is_err());
    }

    #[test]
    fn oversized_ttl_is_rejected_up_front() {
        for ttl_hours in [MAX_TTL_HOURS + 1, 100_000_000, i64::MAX] {
            let cfg = JwtConfig {
                secret: "dev-secret".into(),
                ttl_hours,
            };
            let err = TokenIssuer::new(&cfg).err().expect("must fail");
            assert!(matches!(err, AuthError::Signing(_)));
        }
        assert!(TokenIssuer::new(&JwtConfig {
            secret: "dev-secret".into(),
            ttl_hours: MAX_TTL_HOURS,
        })
        .is_ok());
    }

    #[test]
    fn expiry_past_the_date_range_is_a_signing_error() {
        let issuer = TokenIssuer::new(&config("dev-secret")).unwrap();
        let now = time::PrimitiveDateTime::MAX.assume_utc();

        let err = issuer.issue_at(&account(), now).unwrap_err();
        assert!(matches!(err, AuthError::Signing(_)));
    }

    #[test]
    fn empty_secret_is_a_signing_error() {
        let err = TokenIssuer::new(&config("")).err().expect("must fail");
        assert!(matches!(err, AuthError::Signing(_)));
    }
}
