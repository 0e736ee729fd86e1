//! Bearer token verification. Tokens are issued by the external auth service
//! with a shared HS256 secret; this service only checks them.

pub mod jwt;
pub mod middleware;

pub use middleware::AuthUser;

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::{AppError, Result};
use jwt::JwtService;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // User id
    pub username: String,
    pub exp: usize, // Expiration time
}

impl Claims {
    pub fn user_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub)
            .map_err(|_| AppError::AuthError("Invalid user ID in token".to_string()))
    }
}

pub struct AuthService {
    jwt: JwtService,
}

impl AuthService {
    pub fn new(jwt_secret: &str) -> Self {
        Self { jwt: JwtService::new(jwt_secret) }
    }

    /// Mints a token the way the auth service does; used by tooling and tests.
    pub fn generate_token(&self, user_id: Uuid, username: &str, ttl: Duration) -> Result<String> {
        let exp = (Utc::now() + ttl).timestamp().max(0) as usize;
        let claims = Claims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp,
        };
        self.jwt.encode_token(&claims)
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let claims = self.jwt.decode_token(token)?;
        // Reject tokens whose subject is not a user id up front
        claims.user_id()?;
        Ok(claims)
    }
}
