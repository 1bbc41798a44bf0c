use tracing::{info, warn};
use uuid::Uuid;

use super::repo;
use crate::auth::repo_types::{Profile, Role};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

pub fn check_role_change(admin_id: Uuid, target: Uuid, role: Role) -> AppResult<()> {
    if admin_id == target && role != Role::Admin {
        return Err(AppError::BadRequest(
            "Anda tidak dapat menurunkan peran akun sendiri".into(),
        ));
    }
    Ok(())
}

pub fn check_delete(admin_id: Uuid, target: Uuid, order_count: i64) -> AppResult<()> {
    if admin_id == target {
        return Err(AppError::BadRequest("Anda tidak dapat menghapus akun sendiri".into()));
    }
    if order_count > 0 {
        return Err(AppError::Conflict(
            "Pengguna memiliki riwayat pesanan dan tidak dapat dihapus".into(),
        ));
    }
    Ok(())
}

pub async fn set_role(state: &AppState, admin_id: Uuid, target: Uuid, role: Role) -> AppResult<Profile> {
    check_role_change(admin_id, target, role)?;
    let profile = repo::set_role(&state.db, target, role)
        .await?
        .ok_or_else(|| AppError::not_found("Pengguna"))?;
    info!(%admin_id, user_id = %target, ?role, "role changed");
    Ok(profile)
}

pub async fn delete_user(state: &AppState, admin_id: Uuid, target: Uuid) -> AppResult<()> {
    check_delete(admin_id, target, 0)?;
    let user = repo::find(&state.db, target)
        .await?
        .ok_or_else(|| AppError::not_found("Pengguna"))?;
    check_delete(admin_id, target, user.order_count)?;

    // An order placed between the check and here keeps the row.
    if !repo::delete_without_orders(&state.db, target).await? {
        warn!(%admin_id, user_id = %target, "user gained orders before delete");
        return Err(AppError::Conflict(
            "Pengguna memiliki riwayat pesanan dan tidak dapat dihapus".into(),
        ));
    }
    info!(%admin_id, user_id = %target, username = %user.profile.username, "user deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_cannot_demote_self() {
        let me = Uuid::new_v4();
        assert!(check_role_change(me, me, Role::Customer).is_err());
        assert!(check_role_change(me, me, Role::Admin).is_ok());
        assert!(check_role_change(me, Uuid::new_v4(), Role::Customer).is_ok());
    }

    #[test]
    fn delete_guards() {
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert!(matches!(check_delete(me, me, 0), Err(AppError::BadRequest(_))));
        assert!(matches!(check_delete(me, other, 3), Err(AppError::Conflict(_))));
        assert!(check_delete(me, other, 0).is_ok());
    }

    #[tokio::test]
    async fn self_delete_rejected_before_db() {
        let state = AppState::fake();
        let me = Uuid::new_v4();
        let err = delete_user(&state, me, me).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
