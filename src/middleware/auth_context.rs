use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};

use crate::auth::hash_access_token;
use crate::error::ApiError;

/// Caller identity, passed explicitly to whatever talks to the backend.
/// The gateway does not validate the token; the backend does.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub access_token: String,
    /// Key for this caller's page session.
    pub session_key: String,
}

impl AuthContext {
    pub fn from_token(token: &str) -> Self {
        AuthContext {
            access_token: token.to_string(),
            session_key: hash_access_token(token),
        }
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Extract Authorization: Bearer <token>
        let TypedHeader(authz): TypedHeader<Authorization<Bearer>> =
            TypedHeader::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::session_expired())?;

        let token = authz.token().trim();
        if token.is_empty() {
            return Err(ApiError::session_expired());
        }
        Ok(AuthContext::from_token(token))
    }
}
