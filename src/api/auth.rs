//! JWT bearer authentication for the task API.
//!
//! Tokens are issued by the external user service and verified here with the
//! shared `JWT_SECRET` (HS256). Verification fails closed: a missing header,
//! an expired or malformed token, and any unexpected verification error all
//! map to a 401 response, and no handler runs.

use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use super::routes::AppState;
use crate::error::ApiError;

/// Claims carried by a user-service token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Identifier of the authenticated user
    #[serde(rename = "userId")]
    pub user_id: i64,
    /// Email, carried for auditing only
    #[serde(default)]
    pub email: Option<String>,
    /// Expiration unix seconds
    pub exp: i64,
}

/// The authenticated caller, inserted into request extensions.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: i64,
}

/// Decode and verify a token. `Validation::default()` enforces the expiry
/// claim.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = jsonwebtoken::decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Middleware guarding every protected route.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    let token = auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
        .unwrap_or("");

    if token.is_empty() {
        return Err(ApiError::Unauthorized("Access token required".to_string()));
    }

    match verify_token(token, &state.config.jwt_secret) {
        Ok(claims) => {
            req.extensions_mut().insert(AuthUser {
                id: claims.user_id,
            });
            Ok(next.run(req).await)
        }
        Err(e) => match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                Err(ApiError::Unauthorized("Token has expired".to_string()))
            }
            _ => Err(ApiError::Unauthorized("Invalid token".to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header};

    const SECRET: &str = "test-secret";

    fn issue(user_id: i64, exp: i64) -> String {
        let claims = Claims {
            user_id,
            email: Some("user@example.com".to_string()),
            exp,
        };
        jsonwebtoken::encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_yields_claims() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = issue(42, exp);
        let claims = verify_token(&token, SECRET).unwrap();
        assert_eq!(claims.user_id, 42);
    }

    #[test]
    fn expired_token_is_rejected() {
        // Past the default leeway.
        let exp = (Utc::now() - Duration::hours(1)).timestamp();
        let token = issue(42, exp);
        let err = verify_token(&token, SECRET).unwrap_err();
        assert!(matches!(
            err.kind(),
            jsonwebtoken::errors::ErrorKind::ExpiredSignature
        ));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let exp = (Utc::now() + Duration::hours(1)).timestamp();
        let token = issue(42, exp);
        assert!(verify_token(&token, "other-secret").is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        assert!(verify_token("not.a.jwt", SECRET).is_err());
        assert!(verify_token("", SECRET).is_err());
    }
}
