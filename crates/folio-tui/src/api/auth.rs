use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use uuid::Uuid;

/// Claims carried in the identity service's bearer token. The client
/// never mints or refreshes tokens; it reads one issued elsewhere and
/// the server verifies the signature on every request.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenClaims {
    pub sub: Uuid,
    pub name: String,
    pub exp: i64,
}

#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: String,
    pub claims: TokenClaims,
}

impl AuthToken {
    fn token_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("folio-tui");
        Ok(config_dir.join("token"))
    }

    /// Loads the bearer token, preferring `FOLIO_TOKEN` over the token
    /// file under the config dir. Returns `None` when neither exists.
    pub fn load() -> Result<Option<Self>> {
        let raw = match env::var("FOLIO_TOKEN") {
            Ok(token) => Some(token),
            Err(_) => {
                let path = Self::token_path()?;
                if path.exists() {
                    Some(fs::read_to_string(&path).context("Could not read token file")?)
                } else {
                    None
                }
            }
        };
        let Some(raw) = raw else {
            return Ok(None);
        };

        let token = raw.trim().to_string();
        let claims =
            Self::decode_claims(&token).context("Stored token is not a valid access token")?;
        Ok(Some(Self { token, claims }))
    }

    /// Decodes the JWT payload without checking the signature. Only the
    /// server holds the secret; a forged token gets it nothing but 401s.
    fn decode_claims(token: &str) -> Result<TokenClaims> {
        let parts: Vec<&str> = token.split('.').collect();
        if parts.len() != 3 {
            anyhow::bail!("token is not a JWT");
        }
        let payload = URL_SAFE_NO_PAD
            .decode(parts[1])
            .context("token payload is not base64")?;
        let claims = serde_json::from_slice(&payload).context("token payload is not claims")?;
        Ok(claims)
    }

    pub fn is_expired(&self) -> bool {
        self.claims.exp < chrono::Utc::now().timestamp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_jwt(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{header}.{payload}.unchecked-signature")
    }

    #[test]
    fn decodes_claims_from_the_payload_segment() {
        let token = fake_jwt(&serde_json::json!({
            "sub": "00000000-0000-0000-0000-000000000001",
            "name": "Ada",
            "avatar_url": null,
            "exp": 4_102_444_800i64,
            "iat": 0,
        }));

        let claims = AuthToken::decode_claims(&token).unwrap();
        assert_eq!(claims.sub, Uuid::from_u128(1));
        assert_eq!(claims.name, "Ada");
    }

    #[test]
    fn rejects_strings_that_are_not_tokens() {
        assert!(AuthToken::decode_claims("not-a-token").is_err());
        assert!(AuthToken::decode_claims("a.b").is_err());
    }

    #[test]
    fn expiry_is_checked_against_the_clock() {
        let expired = AuthToken {
            token: String::new(),
            claims: TokenClaims {
                sub: Uuid::from_u128(1),
                name: "Ada".to_string(),
                exp: 1_000,
            },
        };
        assert!(expired.is_expired());

        let fresh = AuthToken {
            claims: TokenClaims {
                exp: chrono::Utc::now().timestamp() + 3_600,
                ..expired.claims.clone()
            },
            token: String::new(),
        };
        assert!(!fresh.is_expired());
    }
}
