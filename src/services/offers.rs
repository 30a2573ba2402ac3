use crate::{
    db::DbPool,
    entities::offer::{self, DiscountKind, Entity as OfferEntity},
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::coupons::SweepOutcome;

#[derive(Clone)]
pub struct OfferService {
    db_pool: Arc<DbPool>,
}

pub struct CreateOfferInput {
    pub name: String,
    pub description: Option<String>,
    pub kind: DiscountKind,
    pub value: Decimal,
    pub category_id: Option<Uuid>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct UpdateOfferInput {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub value: Option<Decimal>,
    pub category_id: Option<Option<Uuid>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl OfferService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, name = %input.name))]
    pub async fn create_offer(
        &self,
        store_id: Uuid,
        input: CreateOfferInput,
    ) -> Result<offer::Model, ServiceError> {
        if input.ends_at <= input.starts_at {
            return Err(ServiceError::ValidationError(
                "offer window must end after it starts".into(),
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

        let now = Utc::now();
        let is_active = input.starts_at <= now && now <= input.ends_at;
        Ok(offer::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            category_id: Set(input.category_id),
            name: Set(input.name),
            description: Set(input.description),
            kind: Set(input.kind),
            value: Set(input.value),
            starts_at: Set(input.starts_at),
            ends_at: Set(input.ends_at),
            is_active: Set(is_active),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&*self.db_pool)
        .await?)
    }

    pub async fn get_offer(
        &self,
        store_id: Uuid,
        offer_id: Uuid,
    ) -> Result<Option<offer::Model>, ServiceError> {
        Ok(OfferEntity::find_by_id(offer_id)
            .filter(offer::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn list_offers(
        &self,
        store_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<offer::Model>, u64), ServiceError> {
        let paginator = OfferEntity::find()
            .filter(offer::Column::StoreId.eq(store_id))
            .order_by_desc(offer::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let offers = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((offers, total))
    }

    /// Storefront view: offers currently live for the store.
    pub async fn list_active_offers(
        &self,
        store_id: Uuid,
    ) -> Result<Vec<offer::Model>, ServiceError> {
        Ok(OfferEntity::find()
            .filter(offer::Column::StoreId.eq(store_id))
            .filter(offer::Column::IsActive.eq(true))
            .order_by_desc(offer::Column::EndsAt)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, offer_id = %offer_id))]
    pub async fn update_offer(
        &self,
        store_id: Uuid,
        offer_id: Uuid,
        input: UpdateOfferInput,
    ) -> Result<offer::Model, ServiceError> {
        let model = self
            .get_offer(store_id, offer_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("offer {} not found", offer_id)))?;

        let starts_at = input.starts_at.unwrap_or(model.starts_at);
        let ends_at = input.ends_at.unwrap_or(model.ends_at);
        if ends_at <= starts_at {
            return Err(ServiceError::ValidationError(
                "offer window must end after it starts".into(),
            ));
        }

        let mut active: offer::ActiveModel = model.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(value) = input.value {
            active.value = Set(value);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        active.starts_at = Set(starts_at);
        active.ends_at = Set(ends_at);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self), fields(store_id = %store_id, offer_id = %offer_id))]
    pub async fn delete_offer(&self, store_id: Uuid, offer_id: Uuid) -> Result<(), ServiceError> {
        let model = self
            .get_offer(store_id, offer_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("offer {} not found", offer_id)))?;
        OfferEntity::delete_by_id(model.id)
            .exec(&*self.db_pool)
            .await?;
        Ok(())
    }

    /// Offer counterpart of the coupon sweep: window only, no usage cap.
    /// Deactivate-then-activate inside one transaction.
    #[instrument(skip(self))]
    pub async fn run_validity_sweep(&self) -> Result<SweepOutcome, ServiceError> {
        let now = Utc::now();
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let deactivated = OfferEntity::update_many()
            .col_expr(offer::Column::IsActive, Expr::value(false))
            .col_expr(offer::Column::UpdatedAt, Expr::value(now))
            .filter(offer::Column::IsActive.eq(true))
            .filter(
                Condition::any()
                    .add(offer::Column::StartsAt.gt(now))
                    .add(offer::Column::EndsAt.lt(now)),
            )
            .exec(&txn)
            .await?
            .rows_affected;

        let activated = OfferEntity::update_many()
            .col_expr(offer::Column::IsActive, Expr::value(true))
            .col_expr(offer::Column::UpdatedAt, Expr::value(now))
            .filter(offer::Column::IsActive.eq(false))
            .filter(offer::Column::StartsAt.lte(now))
            .filter(offer::Column::EndsAt.gte(now))
            .exec(&txn)
            .await?
            .rows_affected;

        txn.commit().await?;
        info!(activated, deactivated, "offer validity sweep finished");
        Ok(SweepOutcome {
            activated,
            deactivated,
        })
    }
}
