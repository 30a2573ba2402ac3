use crate::{
    db::DbPool,
    entities::inventory_level::{self, Entity as InventoryEntity},
    entities::order_item,
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct InventoryService {
    db_pool: Arc<DbPool>,
}

impl InventoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    pub async fn get_level(
        &self,
        store_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<inventory_level::Model>, ServiceError> {
        Ok(InventoryEntity::find()
            .filter(inventory_level::Column::StoreId.eq(store_id))
            .filter(inventory_level::Column::ProductId.eq(product_id))
            .one(&*self.db_pool)
            .await?)
    }

    /// Creates or replaces the level row for a product.
    #[instrument(skip(self), fields(store_id = %store_id, product_id = %product_id))]
    pub async fn set_level(
        &self,
        store_id: Uuid,
        product_id: Uuid,
        quantity: i32,
        low_stock_threshold: i32,
    ) -> Result<inventory_level::Model, ServiceError> {
        if quantity < 0 || low_stock_threshold < 0 {
            return Err(ServiceError::ValidationError(
                "quantity and threshold must not be negative".into(),
            ));
        }

        let db = &*self.db_pool;
        match self.get_level(store_id, product_id).await? {
            Some(existing) => {
                let mut active: inventory_level::ActiveModel = existing.into();
                active.quantity = Set(quantity);
                active.low_stock_threshold = Set(low_stock_threshold);
                active.updated_at = Set(Utc::now());
                Ok(active.update(db).await?)
            }
            None => Ok(inventory_level::ActiveModel {
                id: Set(Uuid::new_v4()),
                store_id: Set(store_id),
                product_id: Set(product_id),
                quantity: Set(quantity),
                low_stock_threshold: Set(low_stock_threshold),
                updated_at: Set(Utc::now()),
            }
            .insert(db)
            .await?),
        }
    }

    /// Adjusts on-hand stock by a signed delta, rejecting adjustments that
    /// would take it negative.
    #[instrument(skip(self), fields(store_id = %store_id, product_id = %product_id, delta))]
    pub async fn adjust(
        &self,
        store_id: Uuid,
        product_id: Uuid,
        delta: i32,
    ) -> Result<inventory_level::Model, ServiceError> {
        let level = self
            .get_level(store_id, product_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("no inventory level for product {}", product_id))
            })?;

        let next = level.quantity + delta;
        if next < 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "product {}: adjustment of {} would leave {} on hand",
                product_id, delta, next
            )));
        }

        let mut active: inventory_level::ActiveModel = level.into();
        active.quantity = Set(next);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }

    pub async fn list_levels(
        &self,
        store_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<inventory_level::Model>, u64), ServiceError> {
        let paginator = InventoryEntity::find()
            .filter(inventory_level::Column::StoreId.eq(store_id))
            .order_by_asc(inventory_level::Column::ProductId)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let levels = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((levels, total))
    }

    /// Products at or below their low-stock threshold.
    pub async fn list_low_stock(
        &self,
        store_id: Uuid,
    ) -> Result<Vec<inventory_level::Model>, ServiceError> {
        Ok(InventoryEntity::find()
            .filter(inventory_level::Column::StoreId.eq(store_id))
            .filter(
                Expr::col(inventory_level::Column::Quantity)
                    .lte(Expr::col(inventory_level::Column::LowStockThreshold)),
            )
            .order_by_asc(inventory_level::Column::Quantity)
            .all(&*self.db_pool)
            .await?)
    }
}

/// Decrements stock for every order item inside the caller's transaction.
/// Products without a level row are untracked and skipped; tracked products
/// must have enough on hand or the whole transaction fails.
pub async fn decrement_for_items<C: ConnectionTrait>(
    db: &C,
    store_id: Uuid,
    items: &[order_item::Model],
) -> Result<(), ServiceError> {
    for item in items {
        let level = InventoryEntity::find()
            .filter(inventory_level::Column::StoreId.eq(store_id))
            .filter(inventory_level::Column::ProductId.eq(item.product_id))
            .one(db)
            .await?;

        let Some(level) = level else {
            continue;
        };

        let next = level.quantity - item.quantity;
        if next < 0 {
            return Err(ServiceError::InsufficientStock(format!(
                "product {}: {} requested, {} on hand",
                item.product_id, item.quantity, level.quantity
            )));
        }

        let mut active: inventory_level::ActiveModel = level.into();
        active.quantity = Set(next);
        active.updated_at = Set(Utc::now());
        active.update(db).await?;
    }
    Ok(())
}
