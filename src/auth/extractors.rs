use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::dto::{JwtKeys, TokenKind};
use super::repo_types::{Profile, Role};
use crate::error::AppError;
use crate::state::AppState;

/// Extracts and validates a Bearer access token, returning the profile ID.
pub struct AuthUser(pub Uuid);

/// An authenticated profile whose stored role is `admin`.
pub struct AdminUser(pub Uuid);

fn bearer_token(parts: &Parts) -> Result<&str, AppError> {
    let auth = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Silakan login terlebih dahulu".into()))?;

    auth.strip_prefix("Bearer ")
        .or_else(|| auth.strip_prefix("bearer "))
        .ok_or_else(|| AppError::Unauthorized("Header Authorization tidak valid".into()))
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    JwtKeys: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        let keys = JwtKeys::from_ref(state);

        let claims = keys.verify(token).map_err(|_| {
            warn!("invalid or expired token");
            AppError::Unauthorized("Sesi tidak valid atau sudah berakhir".into())
        })?;

        if claims.kind != TokenKind::Access {
            return Err(AppError::Unauthorized("Access token diperlukan".into()));
        }

        Ok(AuthUser(claims.sub))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let AuthUser(user_id) = AuthUser::from_request_parts(parts, state).await?;

        // Role is read fresh so demotions take effect before token expiry.
        match Profile::role_of(&state.db, user_id).await? {
            Some(Role::Admin) => Ok(AdminUser(user_id)),
            Some(Role::Customer) => {
                warn!(%user_id, "non-admin hit admin route");
                Err(AppError::Forbidden("Akses khusus admin".into()))
            }
            None => Err(AppError::Unauthorized("Akun tidak ditemukan".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header::AUTHORIZATION, Request};

    fn parts_with(auth: Option<&str>) -> Parts {
        let mut req = Request::builder().uri("/api/v1/me");
        if let Some(v) = auth {
            req = req.header(AUTHORIZATION, v);
        }
        req.body(()).unwrap().into_parts().0
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let state = AppState::fake();
        let mut parts = parts_with(None);
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn refresh_token_is_not_accepted_as_access() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let token = keys.sign_refresh(Uuid::new_v4()).unwrap();
        let mut parts = parts_with(Some(&format!("Bearer {token}")));
        let err = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .err()
            .unwrap();
        assert_eq!(err.to_string(), "Access token diperlukan");
    }

    #[tokio::test]
    async fn valid_access_token_yields_user_id() {
        let state = AppState::fake();
        let keys = JwtKeys::from_ref(&state);
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).unwrap();
        let mut parts = parts_with(Some(&format!("bearer {token}")));
        let AuthUser(got) = AuthUser::from_request_parts(&mut parts, &state)
            .await
            .ok()
            .unwrap();
        assert_eq!(got, user_id);
    }
}
