//! Order lifecycle.
//!
//! ```text
//! Menunggu Konfirmasi ──► Diproses ──► Dalam Pengiriman ──► Selesai
//!         │                  │
//!         └──────────────────┴──► Dibatalkan
//! ```
//!
//! Customers may cancel only while the order awaits confirmation and may
//! confirm receipt of a shipped order. Admins may make any listed move.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "order_status")]
pub enum OrderStatus {
    #[sqlx(rename = "Menunggu Konfirmasi")]
    #[serde(rename = "Menunggu Konfirmasi")]
    MenungguKonfirmasi,
    #[sqlx(rename = "Diproses")]
    #[serde(rename = "Diproses")]
    Diproses,
    #[sqlx(rename = "Dalam Pengiriman")]
    #[serde(rename = "Dalam Pengiriman")]
    DalamPengiriman,
    #[sqlx(rename = "Selesai")]
    #[serde(rename = "Selesai")]
    Selesai,
    #[sqlx(rename = "Dibatalkan")]
    #[serde(rename = "Dibatalkan")]
    Dibatalkan,
}

/// Who is asking for the transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actor {
    Customer,
    Admin,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        Self::MenungguKonfirmasi,
        Self::Diproses,
        Self::DalamPengiriman,
        Self::Selesai,
        Self::Dibatalkan,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Self::MenungguKonfirmasi => "Menunggu Konfirmasi",
            Self::Diproses => "Diproses",
            Self::DalamPengiriman => "Dalam Pengiriman",
            Self::Selesai => "Selesai",
            Self::Dibatalkan => "Dibatalkan",
        }
    }

    /// Statuses reachable from `self` for the given actor.
    pub fn next(self, actor: Actor) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match (self, actor) {
            (MenungguKonfirmasi, Actor::Admin) => &[Diproses, Dibatalkan],
            (MenungguKonfirmasi, Actor::Customer) => &[Dibatalkan],
            (Diproses, Actor::Admin) => &[DalamPengiriman, Dibatalkan],
            (Diproses, Actor::Customer) => &[],
            (DalamPengiriman, _) => &[Selesai],
            (Selesai | Dibatalkan, _) => &[],
        }
    }

    pub fn can_move_to(self, to: OrderStatus, actor: Actor) -> bool {
        self.next(actor).contains(&to)
    }

    /// Notification text sent to the order owner on entering this status.
    pub fn owner_message(self, code: &str) -> String {
        match self {
            Self::MenungguKonfirmasi => format!("Pesanan {code} menunggu konfirmasi admin."),
            Self::Diproses => format!("Pesanan {code} sedang diproses."),
            Self::DalamPengiriman => format!("Pesanan {code} sedang dalam pengiriman."),
            Self::Selesai => format!("Pesanan {code} telah selesai. Terima kasih!"),
            Self::Dibatalkan => format!(
                "Pesanan {code} dibatalkan. Dana telah dikembalikan ke saldo Anda."
            ),
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "payment_method", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// External payment gateway; the client SDK supplies the reference.
    Gateway,
    /// Internal wallet balance.
    Wallet,
}

impl PaymentMethod {
    pub fn label(self) -> &'static str {
        match self {
            Self::Gateway => "Payment Gateway",
            Self::Wallet => "Saldo",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::OrderStatus::*;
    use super::*;

    #[test]
    fn admin_transitions() {
        let allowed = [
            (MenungguKonfirmasi, Diproses),
            (MenungguKonfirmasi, Dibatalkan),
            (Diproses, DalamPengiriman),
            (Diproses, Dibatalkan),
            (DalamPengiriman, Selesai),
        ];
        for from in OrderStatus::ALL {
            for to in OrderStatus::ALL {
                assert_eq!(
                    from.can_move_to(to, Actor::Admin),
                    allowed.contains(&(from, to)),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn customer_may_cancel_only_while_waiting() {
        assert!(MenungguKonfirmasi.can_move_to(Dibatalkan, Actor::Customer));
        assert!(!Diproses.can_move_to(Dibatalkan, Actor::Customer));
        assert!(!DalamPengiriman.can_move_to(Dibatalkan, Actor::Customer));
        assert!(!MenungguKonfirmasi.can_move_to(Diproses, Actor::Customer));
    }

    #[test]
    fn customer_confirms_receipt() {
        assert!(DalamPengiriman.can_move_to(Selesai, Actor::Customer));
        assert!(!Diproses.can_move_to(Selesai, Actor::Customer));
    }

    #[test]
    fn terminal_states_have_no_exits() {
        for actor in [Actor::Admin, Actor::Customer] {
            assert!(Selesai.next(actor).is_empty());
            assert!(Dibatalkan.next(actor).is_empty());
        }
    }

    #[test]
    fn labels_match_serialized_names() {
        for s in OrderStatus::ALL {
            assert_eq!(serde_json::to_string(&s).unwrap(), format!("\"{}\"", s.label()));
        }
        assert_eq!(
            serde_json::to_string(&MenungguKonfirmasi).unwrap(),
            "\"Menunggu Konfirmasi\""
        );
        let parsed: OrderStatus = serde_json::from_str("\"Dibatalkan\"").unwrap();
        assert_eq!(parsed, Dibatalkan);
    }
}
