use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;

use crate::entity::user::ADMIN_ROLE;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Authenticated user, taken from the session cookie or an `Authorization: Bearer <token>` header.
///
/// Add this as a handler parameter to require authentication.
/// Role checks happen via `require_admin()` in the handler body.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }

    /// Returns `Ok(())` for administrators, `Err(PermissionDenied)` otherwise.
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(AppError::PermissionDenied)
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let auth = &state.config.auth;

        let jar = CookieJar::from_headers(&parts.headers);
        let token = match jar.get(&auth.cookie_name) {
            Some(cookie) => cookie.value().to_string(),
            None => {
                let header = parts
                    .headers
                    .get("Authorization")
                    .and_then(|v| v.to_str().ok())
                    .ok_or(AppError::TokenMissing)?;
                header
                    .strip_prefix("Bearer ")
                    .ok_or(AppError::TokenInvalid)?
                    .to_string()
            }
        };

        let claims = jwt::verify(&token, &auth.jwt_secret).map_err(|_| AppError::TokenInvalid)?;

        Ok(AuthUser {
            user_id: claims.uid,
            username: claims.sub,
            role: claims.role,
        })
    }
}
