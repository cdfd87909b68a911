use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{sign_hs256, verify_hs256};
use crate::config::AdminConfig;

const ADMIN_TOKEN_TYPE: &str = "admin";
const ADMIN_TOKEN_TTL_MINUTES: i64 = 15;

#[derive(Debug, Error)]
pub enum AdminAuthError {
    #[error("missing ADMIN_JWT_SECRET")]
    MissingSecret,
    #[error("missing ADMIN_PASSWORD_HASH")]
    NotConfigured,
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("invalid token")]
    InvalidToken,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminLoginResponse {
    pub token: String,
    pub expires_at: String,
}

/// Verified admin token, inserted as a request extension on admin routes.
#[derive(Debug, Clone, Serialize)]
pub struct AdminSession {
    pub issued_at: i64,
    pub expires_at: i64,
}

fn secret(config: &AdminConfig) -> Result<&str, AdminAuthError> {
    config
        .jwt_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(AdminAuthError::MissingSecret)
}

pub fn sign_admin_jwt(config: &AdminConfig) -> Result<(String, DateTime<Utc>), AdminAuthError> {
    let secret = secret(config)?;

    let issued_at = Utc::now();
    let exp = issued_at
        .checked_add_signed(chrono::Duration::minutes(ADMIN_TOKEN_TTL_MINUTES))
        .ok_or(AdminAuthError::InvalidToken)?;

    let payload = serde_json::json!({
        "type": ADMIN_TOKEN_TYPE,
        "iat": issued_at.timestamp(),
        "exp": exp.timestamp(),
    });
    let token = sign_hs256(&payload, secret).map_err(|_| AdminAuthError::MissingSecret)?;

    Ok((token, exp))
}

pub fn verify_admin_jwt(config: &AdminConfig, token: &str) -> Result<AdminSession, AdminAuthError> {
    let secret = secret(config)?;
    let payload = verify_hs256(token, secret).map_err(|_| AdminAuthError::InvalidToken)?;

    if payload.get("type").and_then(|v| v.as_str()) != Some(ADMIN_TOKEN_TYPE) {
        return Err(AdminAuthError::InvalidToken);
    }
    // Admin tokens must expire.
    let expires_at = payload
        .get("exp")
        .and_then(|v| v.as_i64())
        .ok_or(AdminAuthError::InvalidToken)?;
    let issued_at = payload.get("iat").and_then(|v| v.as_i64()).unwrap_or_default();

    Ok(AdminSession {
        issued_at,
        expires_at,
    })
}

/// Exchanges the shared admin password for a short-lived admin token.
pub fn admin_login(config: &AdminConfig, password: &str) -> Result<AdminLoginResponse, AdminAuthError> {
    let password_hash = config
        .password_hash
        .as_deref()
        .ok_or(AdminAuthError::NotConfigured)?;

    if !bcrypt::verify(password, password_hash).unwrap_or(false) {
        return Err(AdminAuthError::InvalidCredentials);
    }

    let (token, expires_at) = sign_admin_jwt(config)?;

    Ok(AdminLoginResponse {
        token,
        expires_at: expires_at.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AdminConfig {
        AdminConfig {
            password_hash: Some(bcrypt::hash("hunter22", 4).unwrap()),
            jwt_secret: Some("admin-secret".into()),
        }
    }

    #[test]
    fn correct_password_yields_verifiable_token() {
        let config = config();
        let login = admin_login(&config, "hunter22").unwrap();
        let session = verify_admin_jwt(&config, &login.token).unwrap();
        assert_eq!(session.expires_at - session.issued_at, 15 * 60);
    }

    #[test]
    fn wrong_password_is_rejected() {
        assert!(matches!(
            admin_login(&config(), "nope"),
            Err(AdminAuthError::InvalidCredentials)
        ));
    }

    #[test]
    fn user_tokens_are_not_admin_tokens() {
        let config = config();
        let user_token = crate::auth::sign_user_token(
            uuid::Uuid::new_v4(),
            "admin-secret",
            chrono::Duration::minutes(5),
        )
        .unwrap();
        assert!(verify_admin_jwt(&config, &user_token).is_err());
    }

    #[test]
    fn missing_hash_means_not_configured() {
        let config = AdminConfig {
            password_hash: None,
            jwt_secret: Some("s".into()),
        };
        assert!(matches!(
            admin_login(&config, "x"),
            Err(AdminAuthError::NotConfigured)
        ));
    }
}
