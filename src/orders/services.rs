use std::collections::{BTreeMap, HashMap};

use rand::{distributions::Alphanumeric, Rng};
use time::{macros::format_description, OffsetDateTime};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::dto::{CheckoutItem, CheckoutRequest};
use super::repo;
use super::repo_types::{LockedVariant, NewOrder, NewOrderItem, Order};
use super::status::{Actor, OrderStatus, PaymentMethod};
use crate::auth::repo_types::Profile;
use crate::auth::services::is_valid_phone;
use crate::cart::repo as cart_repo;
use crate::config::STORE_OFFSET;
use crate::error::{AppError, AppResult};
use crate::money::format_rupiah;
use crate::notifications::repo as notifications;
use crate::state::AppState;
use crate::wallet::repo::{self as wallet, WalletTxKind};

const CODE_ATTEMPTS: usize = 5;
pub const MAX_LINE_QUANTITY: i32 = 99;

/// Sums quantities per variant; the result is sorted by variant id, which is
/// also the order rows are locked in.
pub fn merge_lines(lines: &[CheckoutItem]) -> AppResult<Vec<(Uuid, i32)>> {
    let mut merged: BTreeMap<Uuid, i32> = BTreeMap::new();
    for line in lines {
        if line.quantity <= 0 {
            return Err(AppError::BadRequest("Jumlah barang harus lebih dari 0".into()));
        }
        let qty = merged.entry(line.variant_id).or_default();
        *qty = qty
            .checked_add(line.quantity)
            .filter(|q| *q <= MAX_LINE_QUANTITY)
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Jumlah per barang maksimal {MAX_LINE_QUANTITY}"
                ))
            })?;
    }
    Ok(merged.into_iter().collect())
}

/// `INV-YYYYMMDD-XXXXXX` with the date in store time.
pub fn generate_code<R: Rng>(now: OffsetDateTime, rng: &mut R) -> String {
    let date = now
        .to_offset(STORE_OFFSET)
        .format(format_description!("[year][month][day]"))
        .unwrap_or_default();
    let suffix: String = rng
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(|b| char::from(b).to_ascii_uppercase())
        .collect();
    format!("INV-{date}-{suffix}")
}

#[derive(Debug, PartialEq, Eq)]
pub struct Shipping {
    pub recipient_name: String,
    pub phone: String,
    pub address: String,
}

fn non_blank(v: Option<&str>) -> Option<&str> {
    v.map(str::trim).filter(|s| !s.is_empty())
}

/// Fills shipping details from the request, falling back to the profile.
pub fn resolve_shipping(profile: &Profile, req: &CheckoutRequest) -> AppResult<Shipping> {
    let recipient_name = non_blank(req.recipient_name.as_deref())
        .or(non_blank(profile.full_name.as_deref()))
        .unwrap_or(&profile.username)
        .to_string();
    let phone = non_blank(req.phone.as_deref())
        .or(non_blank(profile.phone.as_deref()))
        .ok_or_else(|| AppError::BadRequest("Nomor telepon wajib diisi".into()))?
        .to_string();
    if !is_valid_phone(&phone) {
        return Err(AppError::BadRequest("Nomor telepon tidak valid".into()));
    }
    let address = non_blank(req.shipping_address.as_deref())
        .or(non_blank(profile.address.as_deref()))
        .ok_or_else(|| AppError::BadRequest("Alamat pengiriman wajib diisi".into()))?
        .to_string();
    Ok(Shipping {
        recipient_name,
        phone,
        address,
    })
}

/// Checks that run before any database access.
pub fn validate_checkout(req: &CheckoutRequest) -> AppResult<()> {
    if req.payment_method == PaymentMethod::Gateway
        && non_blank(req.payment_reference.as_deref()).is_none()
    {
        return Err(AppError::BadRequest(
            "Referensi pembayaran wajib diisi untuk Payment Gateway".into(),
        ));
    }
    if matches!(&req.items, Some(items) if items.is_empty()) {
        return Err(AppError::BadRequest("Tidak ada barang yang dipesan".into()));
    }
    Ok(())
}

/// Builds item snapshots for the locked variants and the order total.
fn price_lines(
    lines: &[(Uuid, i32)],
    locked: &[LockedVariant],
) -> AppResult<(Vec<NewOrderItem>, i64)> {
    let by_id: HashMap<Uuid, &LockedVariant> = locked.iter().map(|v| (v.variant.id, v)).collect();
    let mut items = Vec::with_capacity(lines.len());
    let mut total: i64 = 0;

    for &(variant_id, quantity) in lines {
        let v = by_id
            .get(&variant_id)
            .filter(|v| v.is_active)
            .ok_or_else(|| AppError::NotFound("Produk tidak ditemukan atau tidak lagi dijual".into()))?;
        if v.variant.stock < quantity {
            return Err(AppError::InsufficientStock(format!(
                "{} ({})",
                v.product_name, v.variant.sku
            )));
        }
        total = v
            .variant
            .price
            .checked_mul(i64::from(quantity))
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| AppError::BadRequest("Total pesanan terlalu besar".into()))?;
        items.push(NewOrderItem {
            variant_id,
            product_name: v.product_name.clone(),
            variant_label: v.variant.label(),
            unit_price: v.variant.price,
            quantity,
        });
    }
    Ok((items, total))
}

/// Places an order in one transaction: lock variants, check stock, charge the
/// wallet when chosen, decrement stock, write the order and its items.
#[instrument(skip(state, req), fields(payment = ?req.payment_method))]
pub async fn checkout(state: &AppState, user_id: Uuid, req: CheckoutRequest) -> AppResult<Order> {
    validate_checkout(&req)?;

    let profile = Profile::find_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Akun tidak ditemukan".into()))?;
    let shipping = resolve_shipping(&profile, &req)?;

    let from_cart = req.items.is_none();
    let requested: Vec<CheckoutItem> = match &req.items {
        Some(items) => items.clone(),
        None => cart_repo::list(&state.db, user_id)
            .await?
            .into_iter()
            .map(|row| CheckoutItem {
                variant_id: row.variant.id,
                quantity: row.quantity,
            })
            .collect(),
    };
    if requested.is_empty() {
        return Err(AppError::BadRequest("Keranjang belanja kosong".into()));
    }
    let lines = merge_lines(&requested)?;
    let variant_ids: Vec<Uuid> = lines.iter().map(|(id, _)| *id).collect();

    let mut tx = state.db.begin().await?;
    let locked = repo::lock_variants(&mut tx, &variant_ids).await?;
    let (items, total) = price_lines(&lines, &locked)?;

    let note = non_blank(req.note.as_deref());
    let reference = match req.payment_method {
        PaymentMethod::Gateway => non_blank(req.payment_reference.as_deref()),
        PaymentMethod::Wallet => None,
    };

    let mut order = None;
    for _ in 0..CODE_ATTEMPTS {
        let code = generate_code(OffsetDateTime::now_utc(), &mut rand::thread_rng());
        let new = NewOrder {
            code: &code,
            user_id,
            payment_method: req.payment_method,
            payment_reference: reference,
            recipient_name: &shipping.recipient_name,
            phone: &shipping.phone,
            shipping_address: &shipping.address,
            note,
            total,
        };
        order = repo::insert_order(&mut tx, &new).await?;
        if order.is_some() {
            break;
        }
        warn!(%code, "order code collision, retrying");
    }
    let order = order.ok_or_else(|| anyhow::anyhow!("could not allocate a unique order code"))?;

    if req.payment_method == PaymentMethod::Wallet {
        let memo = format!("Pembayaran {}", order.code);
        let paid = wallet::apply(
            &mut tx,
            user_id,
            -total,
            WalletTxKind::Payment,
            Some(order.id),
            Some(&memo),
        )
        .await?;
        if paid.is_none() {
            warn!(%user_id, total, "wallet balance too low for checkout");
            return Err(AppError::InsufficientBalance);
        }
    }

    for item in &items {
        if !repo::decrement_stock(&mut tx, item.variant_id, item.quantity).await? {
            return Err(AppError::InsufficientStock(item.product_name.clone()));
        }
    }
    repo::insert_items(&mut tx, order.id, &items).await?;
    if from_cart {
        repo::remove_cart_lines(&mut tx, user_id, &variant_ids).await?;
    }
    notifications::insert(
        &mut *tx,
        user_id,
        "Pesanan dibuat",
        &order.status.owner_message(&order.code),
        Some(order.id),
    )
    .await?;
    tx.commit().await?;

    info!(order_id = %order.id, code = %order.code, total, lines = items.len(), "order created");

    let message = format!(
        "Pesanan baru {} dari {} sebesar {}.",
        order.code,
        profile.username,
        format_rupiah(total)
    );
    if let Err(e) =
        notifications::insert_for_admins(&state.db, "Pesanan baru", &message, Some(order.id)).await
    {
        warn!(error = %e, order_id = %order.id, "failed to notify admins");
    }

    Ok(order)
}

fn transition_error(from: OrderStatus, to: OrderStatus, actor: Actor) -> AppError {
    match (actor, to) {
        (Actor::Customer, OrderStatus::Dibatalkan) => {
            AppError::InvalidTransition("Pesanan tidak dapat dibatalkan".into())
        }
        (Actor::Customer, OrderStatus::Selesai) => AppError::InvalidTransition(
            "Pesanan hanya dapat dikonfirmasi saat dalam pengiriman".into(),
        ),
        _ => AppError::InvalidTransition(format!(
            "Status pesanan tidak dapat diubah dari {from} ke {to}"
        )),
    }
}

/// Moves an order along the status machine. Cancelling restocks the items and
/// refunds the total to the buyer's wallet in the same transaction.
#[instrument(skip(state, reason))]
pub async fn change_status(
    state: &AppState,
    actor_id: Uuid,
    actor: Actor,
    order_id: Uuid,
    to: OrderStatus,
    reason: Option<&str>,
) -> AppResult<Order> {
    let mut tx = state.db.begin().await?;
    let order = repo::lock_order(&mut tx, order_id)
        .await?
        .filter(|o| actor == Actor::Admin || o.user_id == actor_id)
        .ok_or_else(|| AppError::not_found("Pesanan"))?;

    if !order.status.can_move_to(to, actor) {
        warn!(%order_id, from = %order.status, %to, ?actor, "rejected status change");
        return Err(transition_error(order.status, to, actor));
    }

    let reason = non_blank(reason);
    if to == OrderStatus::Dibatalkan {
        let restocked = repo::restock(&mut tx, order.id).await?;
        let memo = format!("Pengembalian dana {}", order.code);
        wallet::apply(
            &mut tx,
            order.user_id,
            order.total,
            WalletTxKind::Refund,
            Some(order.id),
            Some(&memo),
        )
        .await?
        .ok_or_else(|| anyhow::anyhow!("refund target profile {} missing", order.user_id))?;
        info!(%order_id, restocked, refund = order.total, "order cancelled");
    }

    let updated = repo::set_status(
        &mut tx,
        order.id,
        to,
        reason.filter(|_| to == OrderStatus::Dibatalkan),
    )
    .await?;
    notifications::insert(
        &mut *tx,
        order.user_id,
        &format!("Status pesanan: {to}"),
        &to.owner_message(&order.code),
        Some(order.id),
    )
    .await?;
    tx.commit().await?;

    info!(%order_id, from = %order.status, %to, ?actor, %actor_id, "order status changed");

    if actor == Actor::Customer {
        let message = match to {
            OrderStatus::Dibatalkan => format!("Pesanan {} dibatalkan oleh pelanggan.", order.code),
            _ => format!("Pesanan {} telah diterima pelanggan.", order.code),
        };
        if let Err(e) =
            notifications::insert_for_admins(&state.db, "Pembaruan pesanan", &message, Some(order.id))
                .await
        {
            warn!(error = %e, %order_id, "failed to notify admins");
        }
    }

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo_types::Role;
    use crate::catalog::repo_types::Variant;
    use rand::{rngs::StdRng, SeedableRng};
    use time::macros::datetime;

    fn item(variant_id: Uuid, quantity: i32) -> CheckoutItem {
        CheckoutItem {
            variant_id,
            quantity,
        }
    }

    fn profile() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            username: "budi".into(),
            email: "budi@example.com".into(),
            password_hash: String::new(),
            full_name: Some("Budi Santoso".into()),
            phone: Some("081234567890".into()),
            address: Some("Jl. Merdeka 1, Jakarta".into()),
            role: Role::Customer,
            wallet_balance: 0,
            created_at: datetime!(2024-01-01 0:00 UTC),
        }
    }

    fn request(method: PaymentMethod) -> CheckoutRequest {
        CheckoutRequest {
            items: None,
            recipient_name: None,
            phone: None,
            shipping_address: None,
            note: None,
            payment_method: method,
            payment_reference: None,
        }
    }

    fn locked(id: Uuid, price: i64, stock: i32, active: bool) -> LockedVariant {
        LockedVariant {
            variant: Variant {
                id,
                product_id: Uuid::new_v4(),
                sku: "TP-X1-16".into(),
                processor: "Intel Core i7-1365U".into(),
                ram_gb: 16,
                storage_gb: 512,
                storage_type: "SSD".into(),
                screen_inches: 14.0,
                gpu: None,
                color: None,
                price,
                stock,
                created_at: datetime!(2024-01-01 0:00 UTC),
            },
            product_name: "ThinkPad X1 Carbon".into(),
            is_active: active,
        }
    }

    #[test]
    fn merge_sums_and_sorts_by_variant() {
        let a = Uuid::from_u128(2);
        let b = Uuid::from_u128(1);
        let merged = merge_lines(&[item(a, 1), item(b, 2), item(a, 3)]).unwrap();
        assert_eq!(merged, vec![(b, 2), (a, 4)]);
    }

    #[test]
    fn merge_rejects_bad_quantities() {
        let a = Uuid::new_v4();
        assert!(matches!(merge_lines(&[item(a, 0)]), Err(AppError::BadRequest(_))));
        assert!(matches!(merge_lines(&[item(a, -1)]), Err(AppError::BadRequest(_))));
        assert!(matches!(
            merge_lines(&[item(a, 60), item(a, 60)]),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            merge_lines(&[item(a, i32::MAX), item(a, 1)]),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn code_uses_store_date_and_uppercase_suffix() {
        let mut rng = StdRng::seed_from_u64(7);
        // 18:30 UTC is already the next day in WIB.
        let code = generate_code(datetime!(2024-05-01 18:30 UTC), &mut rng);
        assert!(code.starts_with("INV-20240502-"), "{code}");
        let suffix = &code["INV-20240502-".len()..];
        assert_eq!(suffix.len(), 6);
        assert!(suffix
            .chars()
            .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn shipping_falls_back_to_profile() {
        let p = profile();
        let s = resolve_shipping(&p, &request(PaymentMethod::Wallet)).unwrap();
        assert_eq!(s.recipient_name, "Budi Santoso");
        assert_eq!(s.phone, "081234567890");
        assert_eq!(s.address, "Jl. Merdeka 1, Jakarta");

        let mut req = request(PaymentMethod::Wallet);
        req.recipient_name = Some("  Sari ".into());
        req.shipping_address = Some("Jl. Sudirman 5".into());
        let s = resolve_shipping(&p, &req).unwrap();
        assert_eq!(s.recipient_name, "Sari");
        assert_eq!(s.address, "Jl. Sudirman 5");
    }

    #[test]
    fn shipping_requires_phone_and_address() {
        let mut p = profile();
        p.phone = None;
        assert!(matches!(
            resolve_shipping(&p, &request(PaymentMethod::Wallet)),
            Err(AppError::BadRequest(_))
        ));
        let mut p = profile();
        p.address = Some("   ".into());
        assert!(matches!(
            resolve_shipping(&p, &request(PaymentMethod::Wallet)),
            Err(AppError::BadRequest(_))
        ));
        let mut req = request(PaymentMethod::Wallet);
        req.phone = Some("12ab".into());
        assert!(resolve_shipping(&profile(), &req).is_err());
    }

    #[test]
    fn gateway_needs_reference() {
        assert!(validate_checkout(&request(PaymentMethod::Gateway)).is_err());
        let mut req = request(PaymentMethod::Gateway);
        req.payment_reference = Some("MID-123".into());
        assert!(validate_checkout(&req).is_ok());
        assert!(validate_checkout(&request(PaymentMethod::Wallet)).is_ok());
    }

    #[test]
    fn explicit_empty_items_rejected() {
        let mut req = request(PaymentMethod::Wallet);
        req.items = Some(vec![]);
        assert!(matches!(validate_checkout(&req), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn price_lines_totals_and_snapshots() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let rows = [locked(a, 10_000_000, 5, true), locked(b, 2_500_000, 1, true)];
        let (items, total) = price_lines(&[(a, 2), (b, 1)], &rows).unwrap();
        assert_eq!(total, 22_500_000);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].unit_price, 10_000_000);
        assert_eq!(items[0].product_name, "ThinkPad X1 Carbon");
        assert!(items[0].variant_label.contains("16GB"));
    }

    #[test]
    fn price_lines_rejects_missing_inactive_and_short_stock() {
        let a = Uuid::from_u128(1);
        let rows = [locked(a, 10_000_000, 1, true)];
        assert!(matches!(
            price_lines(&[(Uuid::from_u128(9), 1)], &rows),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            price_lines(&[(a, 2)], &rows),
            Err(AppError::InsufficientStock(_))
        ));
        let inactive = [locked(a, 10_000_000, 5, false)];
        assert!(matches!(
            price_lines(&[(a, 1)], &inactive),
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn customer_transition_messages() {
        let e = transition_error(OrderStatus::Diproses, OrderStatus::Dibatalkan, Actor::Customer);
        assert_eq!(e.to_string(), "Pesanan tidak dapat dibatalkan");
        let e = transition_error(OrderStatus::Selesai, OrderStatus::Diproses, Actor::Admin);
        assert_eq!(
            e.to_string(),
            "Status pesanan tidak dapat diubah dari Selesai ke Diproses"
        );
    }

    #[tokio::test]
    async fn gateway_checkout_without_reference_fails_before_db() {
        let state = AppState::fake();
        let err = checkout(&state, Uuid::new_v4(), request(PaymentMethod::Gateway))
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::BadRequest(_)));
    }
}
