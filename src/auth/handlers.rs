use axum::{
    extract::{FromRef, State},
    routing::{get, post, put},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, LoginRequest, PublicProfile, RefreshRequest,
            RegisterRequest, UpdateProfileRequest,
        },
        extractors::AuthUser,
        repo_types::{Profile, ProfilePatch, Role},
        services::{
            create_account, hash_password, is_valid_phone, is_valid_username, verify_password,
            AccountInput, JwtKeys, MIN_PASSWORD_LEN,
        },
    },
    error::{AppError, AppResult, MessageBody},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).put(update_me))
        .route("/me/password", put(change_password))
}

fn issue_tokens(state: &AppState, profile: Profile) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(profile.id)?;
    let refresh_token = keys.sign_refresh(profile.id)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: profile.into(),
    })
}

async fn load_profile(state: &AppState, user_id: Uuid) -> AppResult<Profile> {
    Profile::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Akun tidak ditemukan".into()))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    let profile = create_account(
        &state.db,
        AccountInput {
            username: payload.username,
            email: payload.email,
            password: payload.password,
            full_name: payload.full_name,
            role: Role::Customer,
        },
    )
    .await?;

    info!(user_id = %profile.id, "user registered");
    Ok(Json(issue_tokens(&state, profile)?))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let identifier = payload.identifier.trim().to_lowercase();
    let invalid = || AppError::Unauthorized("Email/username atau password salah".into());

    let found = if identifier.contains('@') {
        Profile::find_by_email(&state.db, &identifier).await?
    } else {
        Profile::find_by_username(&state.db, &identifier).await?
    };

    let Some(profile) = found else {
        warn!(%identifier, "login unknown identifier");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &profile.password_hash)? {
        warn!(user_id = %profile.id, "login invalid password");
        return Err(invalid());
    }

    info!(user_id = %profile.id, "user logged in");
    Ok(Json(issue_tokens(&state, profile)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> AppResult<Json<AuthResponse>> {
    let keys = JwtKeys::from_ref(&state);
    let claims = keys
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let profile = load_profile(&state, claims.sub).await?;
    Ok(Json(issue_tokens(&state, profile)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<PublicProfile>> {
    Ok(Json(load_profile(&state, user_id).await?.into()))
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[instrument(skip(state, payload))]
pub async fn update_me(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<PublicProfile>> {
    let patch = ProfilePatch {
        username: non_empty(payload.username).map(|u| u.to_lowercase()),
        full_name: non_empty(payload.full_name),
        phone: non_empty(payload.phone),
        address: non_empty(payload.address),
    };

    if let Some(username) = patch.username.as_deref() {
        if !is_valid_username(username) {
            return Err(AppError::BadRequest("Username tidak valid".into()));
        }
        if Profile::username_taken(&state.db, username, Some(user_id)).await? {
            return Err(AppError::Conflict("Username sudah digunakan".into()));
        }
    }
    if let Some(phone) = patch.phone.as_deref() {
        if !is_valid_phone(phone) {
            return Err(AppError::BadRequest("Nomor telepon tidak valid".into()));
        }
    }

    let profile = Profile::update(&state.db, user_id, &patch).await?;
    info!(%user_id, "profile updated");
    Ok(Json(profile.into()))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<Json<MessageBody>> {
    let profile = load_profile(&state, user_id).await?;

    if !verify_password(&payload.current_password, &profile.password_hash)? {
        return Err(AppError::BadRequest("Password saat ini salah".into()));
    }
    if payload.new_password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest("Password minimal 8 karakter".into()));
    }

    let hash = hash_password(&payload.new_password)?;
    Profile::set_password_hash(&state.db, user_id, &hash).await?;
    info!(%user_id, "password changed");
    Ok(MessageBody::json("Password berhasil diubah"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_profile_serialization_hides_hash() {
        let profile = Profile {
            id: Uuid::new_v4(),
            username: "budi".into(),
            email: "budi@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            full_name: Some("Budi Santoso".into()),
            phone: None,
            address: None,
            role: Role::Customer,
            wallet_balance: 150_000,
            created_at: time::OffsetDateTime::UNIX_EPOCH,
        };

        let json = serde_json::to_string(&PublicProfile::from(profile)).unwrap();
        assert!(json.contains("budi@example.com"));
        assert!(json.contains("\"role\":\"customer\""));
        assert!(json.contains("1970-01-01T00:00:00Z"));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn non_empty_trims_and_drops_blank() {
        assert_eq!(non_empty(Some("  x ".into())), Some("x".into()));
        assert_eq!(non_empty(Some("   ".into())), None);
        assert_eq!(non_empty(None), None);
    }
}
