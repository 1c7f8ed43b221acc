use axum::{
    extract::{FromRef, FromRequestParts, Request},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::ApiError,
    repository::RepositoryState,
};

/// TokenKind
///
/// Distinguishes short-lived access tokens from the refresh tokens exchanged at
/// `/token/refresh`. Only access tokens authenticate requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Claims
///
/// Payload of every HS256 token issued by this server.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user's id.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    pub token_type: TokenKind,
}

/// issue_token
///
/// Signs a token of `kind` for `user_id`, valid for the TTL configured for that kind.
pub fn issue_token(config: &AppConfig, user_id: Uuid, kind: TokenKind) -> Result<String, ApiError> {
    let now = Utc::now().timestamp().max(0) as usize;
    let ttl = match kind {
        TokenKind::Access => config.access_token_ttl_secs,
        TokenKind::Refresh => config.refresh_token_ttl_secs,
    } as usize;

    let claims = Claims {
        sub: user_id,
        iat: now,
        exp: now + ttl,
        token_type: kind,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(format!("token signing failed: {}", e)))
}

/// decode_token
///
/// Validates signature and expiry and checks the token is of the `expected` kind.
pub fn decode_token(
    config: &AppConfig,
    token: &str,
    expected: TokenKind,
) -> Result<Claims, ApiError> {
    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;

    let claims = decode::<Claims>(token, &decoding_key, &validation)
        .map_err(|e| match e.kind() {
            ErrorKind::ExpiredSignature => ApiError::Unauthorized("Token has expired.".into()),
            _ => ApiError::Unauthorized("Token is invalid.".into()),
        })?
        .claims;

    if claims.token_type != expected {
        return Err(ApiError::Unauthorized("Token has wrong type.".into()));
    }
    Ok(claims)
}

/// AuthUser
///
/// Resolved identity of an authenticated request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: Uuid,
    /// Staff may administer every resource, including other users' subscriptions.
    pub is_staff: bool,
}

impl AuthUser {
    pub fn require_staff(&self) -> Result<(), ApiError> {
        if self.is_staff {
            Ok(())
        } else {
            Err(ApiError::Forbidden)
        }
    }

    /// Staff act on anything; everyone else only on what `owner` owns.
    pub fn can_act_on(&self, owner: Uuid) -> bool {
        self.is_staff || self.id == owner
    }
}

/// AuthUser extractor
///
/// 1. In `Env::Local`, a valid `x-user-id` header naming an existing user is accepted.
/// 2. Otherwise a `Bearer` access token is required.
/// 3. The user must still exist and be active.
///
/// Rejection: `ApiError::Unauthorized` (401).
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let repo = RepositoryState::from_ref(state);
        let config = AppConfig::from_ref(state);

        if config.env == Env::Local {
            let bypass_id = parts
                .headers
                .get("x-user-id")
                .and_then(|value| value.to_str().ok())
                .and_then(|value| Uuid::parse_str(value).ok());

            if let Some(user_id) = bypass_id {
                if let Some(user) = repo.get_user(user_id).await.filter(|u| u.is_active) {
                    return Ok(AuthUser {
                        id: user.id,
                        is_staff: user.is_staff,
                    });
                }
            }
        }

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| {
                ApiError::Unauthorized("Authentication credentials were not provided.".into())
            })?;

        let claims = decode_token(&config, token, TokenKind::Access)?;

        // Users deleted or deactivated after the token was issued are rejected.
        let user = repo
            .get_user(claims.sub)
            .await
            .filter(|u| u.is_active)
            .ok_or_else(|| ApiError::Unauthorized("User not found or inactive.".into()))?;

        Ok(AuthUser {
            id: user.id,
            is_staff: user.is_staff,
        })
    }
}

/// auth_middleware
///
/// Route layer for the authenticated router. Rejects before the handler runs.
pub async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// staff_middleware
///
/// Route layer for the admin router: authenticated (401) and staff (403).
pub async fn staff_middleware(
    auth_user: AuthUser,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if let Err(e) = auth_user.require_staff() {
        tracing::warn!(user_id = %auth_user.id, "non-staff user denied admin route");
        return Err(e);
    }
    Ok(next.run(request).await)
}
