use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;
use uuid::Uuid;

use crate::response::AppError;
use crate::state::AppState;

const AUTH_COOKIE_NAME: &str = "auth_token";

type HmacSha256 = Hmac<Sha256>;

/// Caller identity taken from a verified user token.
///
/// Usable as an extractor; `Option<AuthUser>` yields `None` for anonymous
/// callers instead of rejecting.
#[derive(Debug, Clone, Serialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing token")]
    MissingToken,
    #[error("invalid token")]
    InvalidToken,
    #[error("missing AUTH_JWT_SECRET")]
    MissingSecret,
}

pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = get_cookie(headers, AUTH_COOKIE_NAME) {
        return Some(token);
    }

    let auth_header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Verifies a user token issued by the auth provider; `sub` carries the user id.
pub fn verify_user_token(token: &str, secret: &str) -> Result<AuthUser, AuthError> {
    let claims = verify_hs256(token, secret)?;

    let id = claims
        .get("sub")
        .and_then(|value| value.as_str())
        .and_then(|value| Uuid::parse_str(value).ok())
        .ok_or(AuthError::InvalidToken)?;
    let email = claims
        .get("email")
        .and_then(|value| value.as_str())
        .map(str::to_string);

    Ok(AuthUser { id, email })
}

pub fn sign_user_token(user_id: Uuid, secret: &str, ttl: chrono::Duration) -> Result<String, AuthError> {
    let issued_at = Utc::now();
    let exp = issued_at
        .checked_add_signed(ttl)
        .ok_or(AuthError::InvalidToken)?;
    sign_hs256(
        &serde_json::json!({
            "sub": user_id.to_string(),
            "iat": issued_at.timestamp(),
            "exp": exp.timestamp(),
        }),
        secret,
    )
}

/// Resolves the caller or fails with 401.
pub fn require_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let token = extract_token(headers).ok_or_else(|| AppError::unauthorized("Missing auth token"))?;
    let secret = state
        .config()
        .auth_jwt_secret
        .as_deref()
        .ok_or_else(|| AppError::service_unavailable("User authentication is not configured"))?;
    verify_user_token(&token, secret).map_err(|err| {
        tracing::debug!(error = %err, "Rejected user token");
        AppError::unauthorized("Authentication failed, please sign in again")
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        require_user(state, &parts.headers)
    }
}

// ==================== HS256 ====================

pub(crate) fn sign_hs256(payload: &serde_json::Value, secret: &str) -> Result<String, AuthError> {
    let header_json = serde_json::json!({
        "alg": "HS256",
        "typ": "JWT",
    });

    let header_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header_json).map_err(|_| AuthError::InvalidToken)?);
    let payload_b64 =
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload).map_err(|_| AuthError::InvalidToken)?);
    let signing_input = format!("{header_b64}.{payload_b64}");

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::MissingSecret)?;
    mac.update(signing_input.as_bytes());
    let sig_b64 = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

    Ok(format!("{signing_input}.{sig_b64}"))
}

/// Checks signature, algorithm, `exp` and `nbf`; returns the payload.
pub(crate) fn verify_hs256(token: &str, secret: &str) -> Result<serde_json::Value, AuthError> {
    let mut parts = token.split('.');
    let header_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let payload_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    let sig_b64 = parts.next().ok_or(AuthError::InvalidToken)?;
    if parts.next().is_some() {
        return Err(AuthError::InvalidToken);
    }

    let header_bytes = URL_SAFE_NO_PAD
        .decode(header_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;
    let sig_bytes = URL_SAFE_NO_PAD
        .decode(sig_b64.as_bytes())
        .map_err(|_| AuthError::InvalidToken)?;

    let header_json: serde_json::Value =
        serde_json::from_slice(&header_bytes).map_err(|_| AuthError::InvalidToken)?;
    let alg = header_json
        .get("alg")
        .and_then(|value| value.as_str())
        .ok_or(AuthError::InvalidToken)?;
    if alg != "HS256" {
        return Err(AuthError::InvalidToken);
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::MissingSecret)?;
    mac.update(format!("{header_b64}.{payload_b64}").as_bytes());
    mac.verify_slice(&sig_bytes)
        .map_err(|_| AuthError::InvalidToken)?;

    let payload_json: serde_json::Value =
        serde_json::from_slice(&payload_bytes).map_err(|_| AuthError::InvalidToken)?;

    validate_registered_claims(&payload_json)?;

    Ok(payload_json)
}

fn validate_registered_claims(payload: &serde_json::Value) -> Result<(), AuthError> {
    let now = Utc::now().timestamp();

    if let Some(exp) = payload.get("exp").and_then(|value| value.as_i64()) {
        if now >= exp {
            return Err(AuthError::InvalidToken);
        }
    }

    if let Some(nbf) = payload.get("nbf").and_then(|value| value.as_i64()) {
        if now < nbf {
            return Err(AuthError::InvalidToken);
        }
    }

    Ok(())
}

fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "test-secret";

    #[test]
    fn signed_token_round_trips_user_id() {
        let user = Uuid::new_v4();
        let token = sign_user_token(user, SECRET, chrono::Duration::minutes(5)).unwrap();
        assert_eq!(verify_user_token(&token, SECRET).unwrap().id, user);
    }

    #[test]
    fn wrong_secret_and_expired_tokens_fail() {
        let user = Uuid::new_v4();
        let token = sign_user_token(user, SECRET, chrono::Duration::minutes(5)).unwrap();
        assert!(verify_user_token(&token, "other").is_err());

        let expired = sign_user_token(user, SECRET, chrono::Duration::seconds(-10)).unwrap();
        assert!(matches!(
            verify_user_token(&expired, SECRET),
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn non_uuid_subject_is_rejected() {
        let token = sign_hs256(&serde_json::json!({ "sub": "42" }), SECRET).unwrap();
        assert!(verify_user_token(&token, SECRET).is_err());
    }

    #[test]
    fn token_is_read_from_cookie_before_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer from-header"));
        assert_eq!(extract_token(&headers).as_deref(), Some("from-header"));

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; auth_token=from-cookie"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("from-cookie"));
    }
}
