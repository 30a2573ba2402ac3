use crate::{
    db::DbPool,
    entities::invoice::{self, Entity as InvoiceEntity, InvoiceStatus},
    entities::order,
    errors::ServiceError,
};
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_TERMS_DAYS: i64 = 30;

#[derive(Clone)]
pub struct InvoiceService {
    db_pool: Arc<DbPool>,
}

impl InvoiceService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    pub async fn get_invoice(
        &self,
        store_id: Uuid,
        invoice_id: Uuid,
    ) -> Result<Option<invoice::Model>, ServiceError> {
        Ok(InvoiceEntity::find_by_id(invoice_id)
            .filter(invoice::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn get_invoice_for_order(
        &self,
        store_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<invoice::Model>, ServiceError> {
        Ok(InvoiceEntity::find()
            .filter(invoice::Column::StoreId.eq(store_id))
            .filter(invoice::Column::OrderId.eq(order_id))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn list_invoices(
        &self,
        store_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<invoice::Model>, u64), ServiceError> {
        let paginator = InvoiceEntity::find()
            .filter(invoice::Column::StoreId.eq(store_id))
            .order_by_desc(invoice::Column::IssuedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let invoices = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((invoices, total))
    }
}

/// Issues the invoice for a freshly paid order inside the caller's
/// transaction. The unique index on `order_id` backs the once-per-order
/// guarantee at the schema level.
pub async fn issue_for_order<C: ConnectionTrait>(
    db: &C,
    order: &order::Model,
) -> Result<invoice::Model, ServiceError> {
    let existing = InvoiceEntity::find()
        .filter(invoice::Column::OrderId.eq(order.id))
        .one(db)
        .await?;
    if existing.is_some() {
        return Err(ServiceError::Conflict(format!(
            "order {} already has an invoice",
            order.id
        )));
    }

    let now = Utc::now();
    Ok(invoice::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(order.store_id),
        order_id: Set(order.id),
        invoice_number: Set(super::generate_number("INV")),
        status: Set(InvoiceStatus::Paid),
        amount: Set(order.total),
        currency: Set(order.currency.clone()),
        issued_at: Set(now),
        due_at: Set(Some(now + Duration::days(DEFAULT_TERMS_DAYS))),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?)
}
