use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Claims minted by the product's identity service. This server only
/// verifies them; it never issues tokens of its own.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,                 // Actor ID
    pub name: String,              // Display name snapshot
    pub avatar_url: Option<String>,
    pub exp: i64,                  // Expiration timestamp
    pub iat: i64,                  // Issued at timestamp
}

pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("Token verification failed: {}", e);
        AppError::Unauthorized
    })?;

    Ok(token_data.claims)
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};

    use super::*;

    fn token_for(claims: &Claims, secret: &str) -> String {
        encode(
            &Header::default(),
            claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn claims(expires_in: Duration) -> Claims {
        let now = Utc::now();
        Claims {
            sub: Uuid::new_v4(),
            name: "Ada Lovelace".to_string(),
            avatar_url: Some("https://example.com/ada.png".to_string()),
            exp: (now + expires_in).timestamp(),
            iat: now.timestamp(),
        }
    }

    #[test]
    fn accepts_a_token_minted_by_the_identity_service() {
        let claims = claims(Duration::hours(1));
        let verified = verify_access_token(&token_for(&claims, "secret"), "secret").unwrap();

        assert_eq!(verified.sub, claims.sub);
        assert_eq!(verified.name, "Ada Lovelace");
        assert_eq!(
            verified.avatar_url.as_deref(),
            Some("https://example.com/ada.png")
        );
    }

    #[test]
    fn rejects_a_token_signed_with_another_secret() {
        let claims = claims(Duration::hours(1));
        let result = verify_access_token(&token_for(&claims, "other"), "secret");
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[test]
    fn rejects_an_expired_token() {
        // jsonwebtoken allows 60s of leeway, so expire well past it
        let claims = claims(Duration::hours(-2));
        let result = verify_access_token(&token_for(&claims, "secret"), "secret");
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }
}
