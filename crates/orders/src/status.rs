use serde::{Deserialize, Serialize};

/// Order status lifecycle.
///
/// `Paid` is terminal: there is no refund path, so `Paid -> Cancelled` is
/// not a legal transition. `Cancelled` may be reactivated back to `Pending`
/// or straight to `Paid`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Paid,
    Cancelled,
}

impl core::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Paid => "PAID",
            OrderStatus::Cancelled => "CANCELLED",
        };
        f.write_str(s)
    }
}

/// Stock side effect of a status transition.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StockEffect {
    /// Stock stays as it is (it was reserved at creation and remains so).
    Keep,
    /// Every line's quantity goes back to the ledger.
    Release,
    /// Every line's quantity must be reserved again; the transition fails
    /// if any line's current stock is insufficient.
    Reacquire,
}

impl OrderStatus {
    /// Stock side effect of moving from `self` to `to`.
    ///
    /// Returns `None` when the transition is not allowed (including
    /// same-status no-ops and anything out of `Paid`).
    pub fn stock_effect(self, to: OrderStatus) -> Option<StockEffect> {
        use OrderStatus::*;
        match (self, to) {
            (Pending, Paid) => Some(StockEffect::Keep),
            (Pending, Cancelled) => Some(StockEffect::Release),
            (Cancelled, Pending) | (Cancelled, Paid) => Some(StockEffect::Reacquire),
            _ => None,
        }
    }

    pub fn can_transition_to(self, to: OrderStatus) -> bool {
        self.stock_effect(to).is_some()
    }
}
