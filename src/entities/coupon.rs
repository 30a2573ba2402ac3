use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Code-based discount with a validity window and an optional usage cap.
/// `is_active` is maintained by the periodic validity sweep; request-time
/// validation re-checks the window so a stale flag never widens eligibility.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub min_order_value: Option<Decimal>,
    /// NULL means unlimited uses
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    /// Whether the sweep should consider this coupon active at `now`.
    pub fn should_be_active(&self, now: DateTime<Utc>) -> bool {
        self.starts_at <= now && now <= self.ends_at && self.has_uses_remaining()
    }

    pub fn has_uses_remaining(&self) -> bool {
        match self.max_uses {
            Some(cap) => self.used_count < cap,
            None => true,
        }
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::Id"
    )]
    Store,
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    #[sea_orm(string_value = "percentage")]
    Percentage,
    #[sea_orm(string_value = "fixed")]
    Fixed,
}

impl fmt::Display for DiscountKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscountKind::Percentage => write!(f, "percentage"),
            DiscountKind::Fixed => write!(f, "fixed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal_macros::dec;

    fn coupon(starts_offset_days: i64, ends_offset_days: i64, max_uses: Option<i32>, used: i32) -> Model {
        let now = Utc::now();
        Model {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            code: "SAVE10".to_string(),
            kind: DiscountKind::Percentage,
            value: dec!(10),
            min_order_value: None,
            max_uses,
            used_count: used,
            starts_at: now + Duration::days(starts_offset_days),
            ends_at: now + Duration::days(ends_offset_days),
            is_active: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn active_inside_window_with_uses_left() {
        assert!(coupon(-1, 1, Some(5), 4).should_be_active(Utc::now()));
    }

    #[test]
    fn inactive_before_window() {
        assert!(!coupon(1, 2, None, 0).should_be_active(Utc::now()));
    }

    #[test]
    fn inactive_after_window() {
        assert!(!coupon(-2, -1, None, 0).should_be_active(Utc::now()));
    }

    #[test]
    fn exhausted_coupon_is_never_active() {
        assert!(!coupon(-1, 1, Some(3), 3).should_be_active(Utc::now()));
    }

    #[test]
    fn null_cap_means_unlimited() {
        assert!(coupon(-1, 1, None, 1_000_000).should_be_active(Utc::now()));
    }
}
