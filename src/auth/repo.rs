use crate::auth::repo_types::{NewProfile, Profile, ProfilePatch, Role};
use sqlx::PgPool;
use uuid::Uuid;

pub(crate) const PROFILE_COLUMNS: &str =
    "id, username, email, password_hash, full_name, phone, address, role, wallet_balance, created_at";

impl Profile {
    /// Find a profile by email.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE email = $1");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(email)
            .fetch_optional(db)
            .await?;
        Ok(profile)
    }

    /// Find a profile by username.
    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE username = $1");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(username)
            .fetch_optional(db)
            .await?;
        Ok(profile)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Profile>> {
        let sql = format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1");
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(profile)
    }

    pub async fn role_of(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Role>> {
        let role = sqlx::query_scalar::<_, Role>("SELECT role FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(db)
            .await?;
        Ok(role)
    }

    /// Create a new profile with a zero wallet balance.
    pub async fn create(db: &PgPool, new: NewProfile<'_>) -> anyhow::Result<Profile> {
        let sql = format!(
            r#"
            INSERT INTO profiles (username, email, password_hash, full_name, role)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(new.username)
            .bind(new.email)
            .bind(new.password_hash)
            .bind(new.full_name)
            .bind(new.role)
            .fetch_one(db)
            .await?;
        Ok(profile)
    }

    /// True when `username` belongs to a profile other than `except`.
    pub async fn username_taken(
        db: &PgPool,
        username: &str,
        except: Option<Uuid>,
    ) -> anyhow::Result<bool> {
        let taken = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM profiles
                 WHERE username = $1 AND ($2::uuid IS NULL OR id <> $2)
            )
            "#,
        )
        .bind(username)
        .bind(except)
        .fetch_one(db)
        .await?;
        Ok(taken)
    }

    pub async fn update(db: &PgPool, id: Uuid, patch: &ProfilePatch) -> anyhow::Result<Profile> {
        let sql = format!(
            r#"
            UPDATE profiles
               SET username  = COALESCE($2, username),
                   full_name = COALESCE($3, full_name),
                   phone     = COALESCE($4, phone),
                   address   = COALESCE($5, address)
             WHERE id = $1
            RETURNING {PROFILE_COLUMNS}
            "#
        );
        let profile = sqlx::query_as::<_, Profile>(&sql)
            .bind(id)
            .bind(patch.username.as_deref())
            .bind(patch.full_name.as_deref())
            .bind(patch.phone.as_deref())
            .bind(patch.address.as_deref())
            .fetch_one(db)
            .await?;
        Ok(profile)
    }

    pub async fn set_password_hash(db: &PgPool, id: Uuid, hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE profiles SET password_hash = $2 WHERE id = $1")
            .bind(id)
            .bind(hash)
            .execute(db)
            .await?;
        Ok(())
    }
}
