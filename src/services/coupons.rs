use crate::{
    db::DbPool,
    entities::coupon::{self, DiscountKind, Entity as CouponEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct CouponService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

pub struct CreateCouponInput {
    pub code: String,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub min_order_value: Option<Decimal>,
    pub max_uses: Option<i32>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct UpdateCouponInput {
    pub value: Option<Decimal>,
    pub min_order_value: Option<Option<Decimal>>,
    pub max_uses: Option<Option<i32>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

/// Result of applying a coupon to an order subtotal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponApplication {
    pub coupon_id: Uuid,
    pub code: String,
    pub discount_amount: Decimal,
}

/// Row counts from one validity sweep over a discount table.
#[derive(Debug, Clone, Copy, Default)]
pub struct SweepOutcome {
    pub activated: u64,
    pub deactivated: u64,
}

/// Checks a coupon against an order subtotal at `now`. This re-derives the
/// window and usage checks instead of trusting `is_active` alone, so a
/// coupon whose sweep has not run yet still cannot over-apply.
pub fn evaluate_coupon(
    model: &coupon::Model,
    subtotal: Decimal,
    now: DateTime<Utc>,
) -> Result<CouponApplication, ServiceError> {
    if !model.is_active || !model.should_be_active(now) {
        return Err(ServiceError::InvalidOperation(format!(
            "coupon '{}' is not currently active",
            model.code
        )));
    }

    if let Some(min) = model.min_order_value {
        if subtotal < min {
            return Err(ServiceError::InvalidOperation(format!(
                "order subtotal {} is below the coupon minimum of {}",
                subtotal, min
            )));
        }
    }

    let discount_amount = match model.kind {
        DiscountKind::Percentage => (subtotal * model.value / dec!(100)).round_dp(2),
        DiscountKind::Fixed => model.value.min(subtotal),
    };

    Ok(CouponApplication {
        coupon_id: model.id,
        code: model.code.clone(),
        discount_amount,
    })
}

impl CouponService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, code = %input.code))]
    pub async fn create_coupon(
        &self,
        store_id: Uuid,
        input: CreateCouponInput,
    ) -> Result<coupon::Model, ServiceError> {
        if input.ends_at <= input.starts_at {
            return Err(ServiceError::ValidationError(
                "coupon window must end after it starts".into(),
            ));
        }
        if input.value <= Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "discount value must be positive".into(),
            ));
        }
        if input.kind == DiscountKind::Percentage && input.value > dec!(100) {
            return Err(ServiceError::ValidationError(
                "percentage discount cannot exceed 100".into(),
            ));
        }

        let db = &*self.db_pool;
        let code = input.code.trim().to_uppercase();
        let duplicate = CouponEntity::find()
            .filter(coupon::Column::StoreId.eq(store_id))
            .filter(coupon::Column::Code.eq(code.clone()))
            .one(db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "coupon code '{}' already exists",
                code
            )));
        }

        let now = Utc::now();
        let is_active = input.starts_at <= now && now <= input.ends_at;
        Ok(coupon::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            code: Set(code),
            kind: Set(input.kind),
            value: Set(input.value),
            min_order_value: Set(input.min_order_value),
            max_uses: Set(input.max_uses),
            used_count: Set(0),
            starts_at: Set(input.starts_at),
            ends_at: Set(input.ends_at),
            is_active: Set(is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?)
    }

    pub async fn get_coupon(
        &self,
        store_id: Uuid,
        coupon_id: Uuid,
    ) -> Result<Option<coupon::Model>, ServiceError> {
        Ok(CouponEntity::find_by_id(coupon_id)
            .filter(coupon::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn find_by_code(
        &self,
        store_id: Uuid,
        code: &str,
    ) -> Result<Option<coupon::Model>, ServiceError> {
        Ok(CouponEntity::find()
            .filter(coupon::Column::StoreId.eq(store_id))
            .filter(coupon::Column::Code.eq(code.trim().to_uppercase()))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn list_coupons(
        &self,
        store_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<coupon::Model>, u64), ServiceError> {
        let paginator = CouponEntity::find()
            .filter(coupon::Column::StoreId.eq(store_id))
            .order_by_desc(coupon::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let coupons = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((coupons, total))
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, coupon_id = %coupon_id))]
    pub async fn update_coupon(
        &self,
        store_id: Uuid,
        coupon_id: Uuid,
        input: UpdateCouponInput,
    ) -> Result<coupon::Model, ServiceError> {
        let model = self
            .get_coupon(store_id, coupon_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("coupon {} not found", coupon_id)))?;

        let starts_at = input.starts_at.unwrap_or(model.starts_at);
        let ends_at = input.ends_at.unwrap_or(model.ends_at);
        if ends_at <= starts_at {
            return Err(ServiceError::ValidationError(
                "coupon window must end after it starts".into(),
            ));
        }

        let mut active: coupon::ActiveModel = model.into();
        if let Some(value) = input.value {
            active.value = Set(value);
        }
        if let Some(min_order_value) = input.min_order_value {
            active.min_order_value = Set(min_order_value);
        }
        if let Some(max_uses) = input.max_uses {
            active.max_uses = Set(max_uses);
        }
        active.starts_at = Set(starts_at);
        active.ends_at = Set(ends_at);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self), fields(store_id = %store_id, coupon_id = %coupon_id))]
    pub async fn delete_coupon(&self, store_id: Uuid, coupon_id: Uuid) -> Result<(), ServiceError> {
        let model = self
            .get_coupon(store_id, coupon_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("coupon {} not found", coupon_id)))?;
        CouponEntity::delete_by_id(model.id)
            .exec(&*self.db_pool)
            .await?;
        Ok(())
    }

    /// Storefront/admin validation: does this code apply to this subtotal
    /// right now, and for how much?
    pub async fn validate_code(
        &self,
        store_id: Uuid,
        code: &str,
        subtotal: Decimal,
    ) -> Result<CouponApplication, ServiceError> {
        let model = self
            .find_by_code(store_id, code)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("coupon '{}' not found", code)))?;
        evaluate_coupon(&model, subtotal, Utc::now())
    }

    /// Flips `is_active` on every coupon to match its window and usage cap.
    /// Deactivation runs before activation inside one transaction, so a
    /// coupon can never be observed active outside its window.
    #[instrument(skip(self))]
    pub async fn run_validity_sweep(&self) -> Result<SweepOutcome, ServiceError> {
        let now = Utc::now();
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let exhausted = Condition::all()
            .add(coupon::Column::MaxUses.is_not_null())
            .add(Expr::col(coupon::Column::UsedCount).gte(Expr::col(coupon::Column::MaxUses)));

        let deactivated = CouponEntity::update_many()
            .col_expr(coupon::Column::IsActive, Expr::value(false))
            .col_expr(coupon::Column::UpdatedAt, Expr::value(now))
            .filter(coupon::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(coupon::Column::StartsAt.gt(now))
                    .add(coupon::Column::EndsAt.lt(now))
                    .add(exhausted),
            )
            .exec(&txn)
            .await?
            .rows_affected;

        let has_uses_left = Condition::any()
            .add(coupon::Column::MaxUses.is_null())
            .add(Expr::col(coupon::Column::UsedCount).lt(Expr::col(coupon::Column::MaxUses)));

        let activated = CouponEntity::update_many()
            .col_expr(coupon::Column::IsActive, Expr::value(true))
            .col_expr(coupon::Column::UpdatedAt, Expr::value(now))
            .filter(coupon::Column::IsActive.eq(false))
            .filter(coupon::Column::StartsAt.lte(now))
            .filter(coupon::Column::EndsAt.gte(now))
            .filter(has_uses_left)
            .exec(&txn)
            .await?
            .rows_affected;

        txn.commit().await?;

        info!(activated, deactivated, "coupon validity sweep finished");
        Ok(SweepOutcome {
            activated,
            deactivated,
        })
    }

    /// Emits the redeemed event after the caller's transaction committed.
    pub async fn notify_redeemed(&self, coupon_id: Uuid, order_id: Uuid) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::CouponRedeemed {
                    coupon_id,
                    order_id,
                })
                .await
            {
                warn!(coupon_id = %coupon_id, error = %e, "failed to send coupon redeemed event");
            }
        }
    }
}

/// Increments a coupon's usage counter inside the caller's transaction.
pub async fn redeem_in_txn<C: ConnectionTrait>(
    db: &C,
    coupon_id: Uuid,
) -> Result<(), ServiceError> {
    let model = CouponEntity::find_by_id(coupon_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("coupon {} not found", coupon_id)))?;

    let used = model.used_count;
    let mut active: coupon::ActiveModel = model.into();
    active.used_count = Set(used + 1);
    active.updated_at = Set(Utc::now());
    active.update(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn coupon(kind: DiscountKind, value: Decimal, min: Option<Decimal>) -> coupon::Model {
        let now = Utc::now();
        coupon::Model {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            code: "WELCOME".to_string(),
            kind,
            value,
            min_order_value: min,
            max_uses: Some(10),
            used_count: 0,
            starts_at: now - Duration::hours(1),
            ends_at: now + Duration::hours(1),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn percentage_discount_is_rounded_to_cents() {
        let model = coupon(DiscountKind::Percentage, dec!(15), None);
        let applied = evaluate_coupon(&model, dec!(33.33), Utc::now()).unwrap();
        assert_eq!(applied.discount_amount, dec!(5.00));
    }

    #[test]
    fn fixed_discount_never_exceeds_subtotal() {
        let model = coupon(DiscountKind::Fixed, dec!(50), None);
        let applied = evaluate_coupon(&model, dec!(20), Utc::now()).unwrap();
        assert_eq!(applied.discount_amount, dec!(20));
    }

    #[test]
    fn subtotal_below_minimum_is_rejected() {
        let model = coupon(DiscountKind::Percentage, dec!(10), Some(dec!(100)));
        let err = evaluate_coupon(&model, dec!(99.99), Utc::now()).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidOperation(_)));
    }

    #[test]
    fn exhausted_coupon_is_rejected_even_when_flag_is_stale() {
        let mut model = coupon(DiscountKind::Percentage, dec!(10), None);
        model.max_uses = Some(3);
        model.used_count = 3;
        // Stale flag: the sweep has not deactivated it yet.
        model.is_active = true;
        assert!(evaluate_coupon(&model, dec!(50), Utc::now()).is_err());
    }

    #[test]
    fn window_is_checked_at_request_time() {
        let mut model = coupon(DiscountKind::Percentage, dec!(10), None);
        model.ends_at = Utc::now() - Duration::minutes(5);
        model.is_active = true;
        assert!(evaluate_coupon(&model, dec!(50), Utc::now()).is_err());
    }
}
