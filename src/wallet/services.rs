use tracing::{info, warn};
use uuid::Uuid;

use super::repo::{self, WalletTxKind};
use crate::error::{AppError, AppResult};
use crate::notifications::repo as notifications;
use crate::state::AppState;

/// Ledger kind for a manual admin change.
pub fn adjustment_kind(amount: i64) -> WalletTxKind {
    if amount > 0 {
        WalletTxKind::Topup
    } else {
        WalletTxKind::Adjustment
    }
}

/// Admin top-up or correction of a user's balance. Returns the new balance.
pub async fn adjust(
    state: &AppState,
    admin_id: Uuid,
    user_id: Uuid,
    amount: i64,
    note: Option<&str>,
) -> AppResult<i64> {
    if amount == 0 {
        return Err(AppError::BadRequest("Nominal tidak boleh 0".into()));
    }

    let mut tx = state.db.begin().await?;
    let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM profiles WHERE id = $1)")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    if !exists {
        return Err(AppError::not_found("Pengguna"));
    }

    let Some(balance) =
        repo::apply(&mut tx, user_id, amount, adjustment_kind(amount), None, note).await?
    else {
        warn!(%user_id, amount, "wallet adjustment would go negative");
        return Err(AppError::InsufficientBalance);
    };

    let message = if amount > 0 {
        format!(
            "Saldo Anda bertambah {}. Saldo sekarang {}.",
            crate::money::format_rupiah(amount),
            crate::money::format_rupiah(balance)
        )
    } else {
        format!(
            "Saldo Anda dikurangi {}. Saldo sekarang {}.",
            crate::money::format_rupiah(-amount),
            crate::money::format_rupiah(balance)
        )
    };
    notifications::insert(&mut *tx, user_id, "Saldo diperbarui", &message, None).await?;
    tx.commit().await?;

    info!(%admin_id, %user_id, amount, balance, "wallet adjusted");
    Ok(balance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_sign() {
        assert_eq!(adjustment_kind(50_000), WalletTxKind::Topup);
        assert_eq!(adjustment_kind(-50_000), WalletTxKind::Adjustment);
    }

    #[tokio::test]
    async fn zero_adjustment_rejected_without_db() {
        let state = AppState::fake();
        let err = adjust(&state, Uuid::new_v4(), Uuid::new_v4(), 0, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
