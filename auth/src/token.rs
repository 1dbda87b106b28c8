//! Bearer token issuance and verification.
//!
//! Tokens are HS256 JWTs. Expiry is checked against a caller-supplied `now`
//! instead of the system clock so the whole lifecycle can be tested with a
//! fixed clock.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use raffle_core::{Role, UserId, UserProfile};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AuthError, Result};

/// Default token lifetime.
pub const DEFAULT_TOKEN_TTL: Duration = Duration::hours(24);

/// Default `iss` claim.
pub const DEFAULT_ISSUER: &str = "raffle-api";

/// Claims carried by every token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (the user's email)
    pub sub: String,
    /// User ID
    pub user_id: Uuid,
    /// User email
    pub email: String,
    /// User role
    pub role: Role,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expires at (Unix seconds)
    pub exp: i64,
    /// Issuer
    pub iss: String,
}

impl Claims {
    /// The authenticated user's ID.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::from_uuid(self.user_id)
    }
}

/// A freshly signed token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct IssuedToken {
    /// Encoded JWT
    pub token: String,
    /// When it stops being accepted
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies bearer tokens with a shared secret.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    issuer: String,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .field("issuer", &self.issuer)
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    /// Create an issuer for `secret` with the default TTL and issuer.
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl: DEFAULT_TOKEN_TTL,
            issuer: DEFAULT_ISSUER.to_string(),
        }
    }

    /// Set token lifetime.
    #[must_use]
    pub const fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the `iss` claim written and required.
    #[must_use]
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `user`, valid from `now` for the configured TTL.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Signing`] if encoding fails.
    pub fn issue(&self, user: &UserProfile, now: DateTime<Utc>) -> Result<IssuedToken> {
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: user.email.clone(),
            user_id: *user.id.as_uuid(),
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            iss: self.issuer.clone(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, expires_at })
    }

    /// Verify a token's signature and issuer, and that it has not expired at `now`.
    ///
    /// # Errors
    ///
    /// - Expired → [`AuthError::TokenExpired`]
    /// - Anything else wrong with it → [`AuthError::InvalidToken`]
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                _ => {
                    tracing::debug!(error = %e, "rejected bearer token");
                    AuthError::InvalidToken
                }
            }
        })?;

        if data.claims.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired);
        }

        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raffle_core::environment::Clock;
    use raffle_testing::mocks::test_clock;

    fn profile(role: Role) -> UserProfile {
        let now = test_clock().now();
        UserProfile {
            id: UserId::new(),
            name: "Ana".to_string(),
            email: "ana@example.com".to_string(),
            role,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn issued_token_verifies() {
        let now = test_clock().now();
        let issuer = TokenIssuer::new(b"secret");
        let user = profile(Role::Admin);

        let issued = issuer.issue(&user, now).unwrap();
        assert_eq!(issued.expires_at, now + Duration::hours(24));

        let claims = issuer.verify(&issued.token, now).unwrap();
        assert_eq!(claims.user_id(), user.id);
        assert_eq!(claims.email, "ana@example.com");
        assert_eq!(claims.sub, "ana@example.com");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.iss, DEFAULT_ISSUER);
    }

    #[test]
    fn expires_after_ttl() {
        let now = test_clock().now();
        let issuer = TokenIssuer::new(b"secret").with_ttl(Duration::minutes(5));
        let issued = issuer.issue(&profile(Role::User), now).unwrap();

        assert!(issuer.verify(&issued.token, now + Duration::minutes(4)).is_ok());
        assert_eq!(
            issuer.verify(&issued.token, now + Duration::minutes(5)),
            Err(AuthError::TokenExpired)
        );
    }

    #[test]
    fn wrong_secret_is_invalid() {
        let now = test_clock().now();
        let issued = TokenIssuer::new(b"one").issue(&profile(Role::User), now).unwrap();

        assert_eq!(
            TokenIssuer::new(b"two").verify(&issued.token, now),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn wrong_issuer_is_invalid() {
        let now = test_clock().now();
        let issued = TokenIssuer::new(b"secret")
            .with_issuer("someone-else")
            .issue(&profile(Role::User), now)
            .unwrap();

        assert_eq!(
            TokenIssuer::new(b"secret").verify(&issued.token, now),
            Err(AuthError::InvalidToken)
        );
    }

    #[test]
    fn garbage_is_invalid() {
        let now = test_clock().now();
        assert_eq!(
            TokenIssuer::new(b"secret").verify("not.a.jwt", now),
            Err(AuthError::InvalidToken)
        );
    }
}
