//! Bearer-token authentication and role checks.
//!
//! Tokens are issued by the auth collaborator; this crate only verifies
//! them and extracts the caller identity. Fulfillment operations receive
//! the [`AuthUser`] explicitly rather than reading ambient session state,
//! so every role-gated transition names its actor in the signature.

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::header, http::request::Parts};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{entities::user::UserRole, errors::ServiceError, AppState};

/// Claim structure for JWT tokens.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user id)
    pub sub: String,
    /// Single role carried by the account
    pub role: String,
    /// Issued at time
    pub iat: i64,
    /// Expiration time
    pub exp: i64,
}

/// Authenticated caller extracted from the bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }

    /// Staff means any internal role; customers are not staff.
    pub fn is_staff(&self) -> bool {
        self.role != UserRole::Customer
    }
}

/// Requires the caller to hold exactly `role`.
pub fn ensure_role(user: &AuthUser, role: UserRole) -> Result<(), ServiceError> {
    if user.has_role(role) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "Requires the {} role",
            role
        )))
    }
}

/// Requires any internal staff role.
pub fn ensure_staff(user: &AuthUser) -> Result<(), ServiceError> {
    if user.is_staff() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(
            "Requires an internal staff role".to_string(),
        ))
    }
}

/// Verifies and issues bearer tokens.
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_lifetime: Duration,
}

impl AuthService {
    pub fn new(secret: &str, token_lifetime: Duration) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            token_lifetime,
        }
    }

    /// Issues a signed token for a user. Exposed for tests and tooling;
    /// production tokens come from the auth collaborator sharing the secret.
    pub fn issue_token(&self, user_id: Uuid, role: UserRole) -> Result<String, ServiceError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            iat: now,
            exp: now + self.token_lifetime.as_secs() as i64,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ServiceError::InternalError(format!("Failed to sign token: {}", e)))
    }

    /// Verifies a token and resolves the caller identity.
    pub fn verify_token(&self, token: &str) -> Result<AuthUser, ServiceError> {
        let data = decode::<Claims>(
            token,
            &self.decoding_key,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(|e| ServiceError::Unauthorized(format!("Invalid token: {}", e)))?;

        let id = Uuid::parse_str(&data.claims.sub)
            .map_err(|_| ServiceError::Unauthorized("Invalid token subject".to_string()))?;
        let role = UserRole::from_str(&data.claims.role)
            .map_err(|_| ServiceError::Unauthorized("Unknown role in token".to_string()))?;

        Ok(AuthUser { id, role })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| {
                ServiceError::Unauthorized("Missing bearer token".to_string())
            })?;

        state.auth.verify_token(token)
    }
}
