use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use pulse_types::api::{Claims, TokenType};

/// Signing key and lifetimes for issued JWTs.
#[derive(Clone)]
pub struct TokenSettings {
    pub secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

pub struct IssuedToken {
    pub token: String,
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
}

impl TokenSettings {
    pub fn issue(
        &self,
        kind: TokenType,
        user_id: Uuid,
        email: &str,
    ) -> anyhow::Result<IssuedToken> {
        let now = Utc::now();
        let ttl = match kind {
            TokenType::Access => self.access_ttl,
            TokenType::Refresh => self.refresh_ttl,
        };
        let expires_at = now + ttl;

        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            token_type: kind,
            jti: Uuid::new_v4(),
            iat: now.timestamp() as usize,
            exp: expires_at.timestamp().max(0) as usize,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )?;

        Ok(IssuedToken {
            token,
            jti: claims.jti,
            expires_at,
        })
    }

    /// Verify signature and expiry, and that the token is of the expected kind.
    pub fn decode(&self, token: &str, kind: TokenType) -> Option<Claims> {
        let mut validation = Validation::default();
        validation.leeway = 0;

        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .ok()?;

        (data.claims.token_type == kind).then_some(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> TokenSettings {
        TokenSettings {
            secret: "test-secret".into(),
            access_ttl: Duration::minutes(15),
            refresh_ttl: Duration::days(7),
        }
    }

    #[test]
    fn issued_tokens_decode_as_their_own_kind() {
        let settings = settings();
        let user = Uuid::new_v4();

        let access = settings.issue(TokenType::Access, user, "a@example.com").unwrap();
        let claims = settings.decode(&access.token, TokenType::Access).unwrap();
        assert_eq!(claims.sub, user);
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.jti, access.jti);

        assert!(settings.decode(&access.token, TokenType::Refresh).is_none());
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = settings().issue(TokenType::Access, Uuid::new_v4(), "a@example.com").unwrap();
        let other = TokenSettings {
            secret: "another-secret".into(),
            ..settings()
        };
        assert!(other.decode(&token.token, TokenType::Access).is_none());
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let expired = TokenSettings {
            access_ttl: Duration::minutes(-5),
            ..settings()
        };
        let token = expired.issue(TokenType::Access, Uuid::new_v4(), "a@example.com").unwrap();
        assert!(expired.decode(&token.token, TokenType::Access).is_none());
    }
}
