pub(crate) use crate::auth::dto::{Claims, JwtKeys, TokenKind};
use crate::auth::repo_types::{NewProfile, Profile, Role};
use crate::config::JwtConfig;
use crate::error::{is_unique_violation, AppError, AppResult};
use crate::state::AppState;
use argon2::{password_hash::SaltString, Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use lazy_static::lazy_static;
use rand::rngs::OsRng;
use regex::Regex;
use sqlx::PgPool;
use std::time::Duration;
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

pub const MIN_PASSWORD_LEN: usize = 8;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref USERNAME_RE: Regex = Regex::new(r"^[a-z0-9_]{3,32}$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{8,15}$").unwrap();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn is_valid_username(username: &str) -> bool {
    USERNAME_RE.is_match(username)
}

pub(crate) fn is_valid_phone(phone: &str) -> bool {
    PHONE_RE.is_match(phone)
}

pub fn hash_password(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| {
            error!(error = %e, "argon2 hash_password error");
            anyhow::anyhow!(e.to_string())
        })?
        .to_string();
    Ok(hash)
}

pub fn verify_password(plain: &str, hash: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(hash).map_err(|e| {
        error!(error = %e, "argon2 parse hash error");
        anyhow::anyhow!(e.to_string())
    })?;
    Ok(Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok())
}

/// Validated input for a new account.
pub struct AccountInput {
    pub username: String,
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub role: Role,
}

/// Normalizes and validates account input, then creates the profile.
/// Used by self-registration and by admins creating accounts.
pub async fn create_account(db: &PgPool, mut input: AccountInput) -> AppResult<Profile> {
    input.email = input.email.trim().to_lowercase();
    input.username = input.username.trim().to_lowercase();

    if !is_valid_email(&input.email) {
        warn!(email = %input.email, "invalid email");
        return Err(AppError::BadRequest("Email tidak valid".into()));
    }
    if !is_valid_username(&input.username) {
        warn!(username = %input.username, "invalid username");
        return Err(AppError::BadRequest(
            "Username harus 3-32 karakter huruf kecil, angka, atau garis bawah".into(),
        ));
    }
    if input.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::BadRequest("Password minimal 8 karakter".into()));
    }

    if Profile::find_by_email(db, &input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(AppError::Conflict("Email sudah terdaftar".into()));
    }
    if Profile::username_taken(db, &input.username, None).await? {
        warn!(username = %input.username, "username already taken");
        return Err(AppError::Conflict("Username sudah digunakan".into()));
    }

    let hash = hash_password(&input.password)?;
    let full_name = input
        .full_name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let profile = Profile::create(
        db,
        NewProfile {
            username: &input.username,
            email: &input.email,
            password_hash: &hash,
            full_name,
            role: input.role,
        },
    )
    .await
    .map_err(|e| {
        if is_unique_violation(&e) {
            AppError::Conflict("Username atau email sudah digunakan".into())
        } else {
            AppError::Internal(e)
        }
    })?;

    info!(user_id = %profile.id, username = %profile.username, role = ?profile.role, "account created");
    Ok(profile)
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        JwtKeys::from_config(&state.config.jwt)
    }
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        let JwtConfig {
            secret,
            issuer,
            audience,
            ttl_minutes,
            refresh_ttl_minutes,
        } = cfg.clone();
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            access_ttl: Duration::from_secs((ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((refresh_ttl_minutes as u64) * 60),
        }
    }

    fn sign_with_kind(&self, user_id: Uuid, kind: TokenKind) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let exp = now + TimeDuration::seconds(ttl.as_secs() as i64);
        let claims = Claims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
            kind,
        };
        let token = encode(&Header::default(), &claims, &self.encoding)?;
        debug!(user_id = %user_id, kind = ?kind, "jwt signed");
        Ok(token)
    }

    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Access)
    }
    pub fn sign_refresh(&self, user_id: Uuid) -> anyhow::Result<String> {
        self.sign_with_kind(user_id, TokenKind::Refresh)
    }

    pub fn verify(&self, token: &str) -> anyhow::Result<Claims> {
        let mut validation = Validation::default();
        validation.set_audience(std::slice::from_ref(&self.audience));
        validation.set_issuer(std::slice::from_ref(&self.issuer));
        let data = decode::<Claims>(token, &self.decoding, &validation)?;
        debug!(user_id = %data.claims.sub, kind = ?data.claims.kind, "jwt verified");
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<Claims> {
        let claims = self.verify(token)?;
        if claims.kind != TokenKind::Refresh {
            anyhow::bail!("not a refresh token");
        }
        Ok(claims)
    }
}

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn email_format() {
        assert!(is_valid_email("budi@example.co.id"));
        assert!(!is_valid_email("budi@example"));
        assert!(!is_valid_email("budi example@x.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn username_format() {
        assert!(is_valid_username("budi_99"));
        assert!(!is_valid_username("bu"));
        assert!(!is_valid_username("Budi"));
        assert!(!is_valid_username("budi.santoso"));
        assert!(!is_valid_username(&"a".repeat(33)));
    }

    #[test]
    fn phone_format() {
        assert!(is_valid_phone("081234567890"));
        assert!(is_valid_phone("+6281234567890"));
        assert!(!is_valid_phone("0812-3456"));
        assert!(!is_valid_phone("1234"));
    }
}

#[cfg(test)]
mod password_tests {
    use super::*;

    #[test]
    fn hash_and_verify_roundtrip() {
        let password = "Secur3P@ssw0rd!";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(verify_password(password, &hash).expect("verify should succeed"));
    }

    #[test]
    fn verify_rejects_wrong_password() {
        let password = "correct-horse-battery-staple";
        let hash = hash_password(password).expect("hashing should succeed");
        assert!(!verify_password("wrong-password", &hash).expect("verify should not error"));
    }

    #[test]
    fn verify_errors_on_malformed_hash() {
        let err = verify_password("anything", "not-a-valid-hash").unwrap_err();
        assert!(!err.to_string().is_empty());
    }
}
