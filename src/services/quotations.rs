use crate::{
    db::DbPool,
    entities::customer::{self, Entity as CustomerEntity},
    entities::order::{self, OrderStatus, PaymentStatus},
    entities::order_item,
    entities::product::{self, Entity as ProductEntity},
    entities::quotation::{self, Entity as QuotationEntity, QuotationStatus},
    entities::quotation_item::{self, Entity as QuotationItemEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct QuotationService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

pub struct QuotationItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
    /// Proposed price; defaults to the catalog price
    pub unit_price: Option<Decimal>,
}

pub struct CreateQuotationInput {
    pub customer_id: Uuid,
    pub items: Vec<QuotationItemInput>,
    pub valid_until: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl QuotationService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, customer_id = %input.customer_id))]
    pub async fn create_quotation(
        &self,
        store_id: Uuid,
        input: CreateQuotationInput,
    ) -> Result<(quotation::Model, Vec<quotation_item::Model>), ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "quotation needs at least one item".into(),
            ));
        }
        if input.items.iter().any(|item| item.quantity <= 0) {
            return Err(ServiceError::ValidationError(
                "item quantities must be positive".into(),
            ));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        CustomerEntity::find_by_id(input.customer_id)
            .filter(customer::Column::StoreId.eq(store_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("customer {} not found", input.customer_id))
            })?;

        let mut subtotal = Decimal::ZERO;
        let mut lines = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let product = ProductEntity::find_by_id(item.product_id)
                .filter(product::Column::StoreId.eq(store_id))
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("product {} not found", item.product_id))
                })?;
            let unit_price = item.unit_price.unwrap_or(product.price);
            if unit_price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "quoted unit price must not be negative".into(),
                ));
            }
            let total = unit_price * Decimal::from(item.quantity);
            subtotal += total;
            lines.push((product, item.quantity, unit_price, total));
        }

        let now = Utc::now();
        let quotation_id = Uuid::new_v4();
        let model = quotation::ActiveModel {
            id: Set(quotation_id),
            store_id: Set(store_id),
            customer_id: Set(input.customer_id),
            quotation_number: Set(super::generate_number("QTE")),
            status: Set(QuotationStatus::Draft),
            valid_until: Set(input.valid_until),
            subtotal: Set(subtotal),
            total: Set(subtotal),
            notes: Set(input.notes),
            converted_order_id: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(lines.len());
        for (product, quantity, unit_price, total) in lines {
            items.push(
                quotation_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    quotation_id: Set(quotation_id),
                    product_id: Set(product.id),
                    product_name: Set(product.name.clone()),
                    quantity: Set(quantity),
                    unit_price: Set(unit_price),
                    total: Set(total),
                }
                .insert(&txn)
                .await?,
            );
        }

        txn.commit().await?;
        info!(quotation_id = %quotation_id, "quotation created");
        Ok((model, items))
    }

    pub async fn get_quotation(
        &self,
        store_id: Uuid,
        quotation_id: Uuid,
    ) -> Result<Option<quotation::Model>, ServiceError> {
        Ok(QuotationEntity::find_by_id(quotation_id)
            .filter(quotation::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn get_quotation_items(
        &self,
        store_id: Uuid,
        quotation_id: Uuid,
    ) -> Result<Vec<quotation_item::Model>, ServiceError> {
        let quotation = self
            .get_quotation(store_id, quotation_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("quotation {} not found", quotation_id))
            })?;
        Ok(quotation
            .find_related(QuotationItemEntity)
            .all(&*self.db_pool)
            .await?)
    }

    pub async fn list_quotations(
        &self,
        store_id: Uuid,
        page: u64,
        limit: u64,
        status: Option<QuotationStatus>,
    ) -> Result<(Vec<quotation::Model>, u64), ServiceError> {
        let mut query = QuotationEntity::find().filter(quotation::Column::StoreId.eq(store_id));
        if let Some(status) = status {
            query = query.filter(quotation::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(quotation::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let quotations = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((quotations, total))
    }

    /// Draft -> sent.
    #[instrument(skip(self), fields(store_id = %store_id, quotation_id = %quotation_id))]
    pub async fn send_quotation(
        &self,
        store_id: Uuid,
        quotation_id: Uuid,
    ) -> Result<quotation::Model, ServiceError> {
        self.transition(store_id, quotation_id, QuotationStatus::Draft, QuotationStatus::Sent)
            .await
    }

    /// Sent -> accepted.
    #[instrument(skip(self), fields(store_id = %store_id, quotation_id = %quotation_id))]
    pub async fn accept_quotation(
        &self,
        store_id: Uuid,
        quotation_id: Uuid,
    ) -> Result<quotation::Model, ServiceError> {
        self.transition(store_id, quotation_id, QuotationStatus::Sent, QuotationStatus::Accepted)
            .await
    }

    /// Sent -> declined.
    #[instrument(skip(self), fields(store_id = %store_id, quotation_id = %quotation_id))]
    pub async fn decline_quotation(
        &self,
        store_id: Uuid,
        quotation_id: Uuid,
    ) -> Result<quotation::Model, ServiceError> {
        self.transition(store_id, quotation_id, QuotationStatus::Sent, QuotationStatus::Declined)
            .await
    }

    async fn transition(
        &self,
        store_id: Uuid,
        quotation_id: Uuid,
        expected: QuotationStatus,
        target: QuotationStatus,
    ) -> Result<quotation::Model, ServiceError> {
        let model = self
            .get_quotation(store_id, quotation_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("quotation {} not found", quotation_id))
            })?;

        if model.status != expected {
            return Err(ServiceError::InvalidStatus(format!(
                "quotation {} is '{}', expected '{}'",
                quotation_id, model.status, expected
            )));
        }
        if model.is_expired(Utc::now()) {
            return Err(ServiceError::InvalidOperation(format!(
                "quotation {} expired on {}",
                quotation_id,
                model.valid_until.map(|t| t.to_rfc3339()).unwrap_or_default()
            )));
        }

        let mut active: quotation::ActiveModel = model.into();
        active.status = Set(target);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Converts an accepted, unexpired quotation into a real order. Items
    /// are copied with their quoted prices and the quotation is linked to
    /// the new order — all in one transaction, so converting twice is a
    /// conflict, never a duplicate order.
    #[instrument(skip(self), fields(store_id = %store_id, quotation_id = %quotation_id))]
    pub async fn convert_to_order(
        &self,
        store_id: Uuid,
        quotation_id: Uuid,
    ) -> Result<(quotation::Model, order::Model), ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let model = QuotationEntity::find_by_id(quotation_id)
            .filter(quotation::Column::StoreId.eq(store_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("quotation {} not found", quotation_id))
            })?;

        if model.converted_order_id.is_some() || model.status == QuotationStatus::Converted {
            return Err(ServiceError::Conflict(format!(
                "quotation {} was already converted",
                quotation_id
            )));
        }
        if model.status != QuotationStatus::Accepted {
            return Err(ServiceError::InvalidStatus(format!(
                "quotation {} is '{}' and cannot be converted",
                quotation_id, model.status
            )));
        }
        if model.is_expired(Utc::now()) {
            return Err(ServiceError::InvalidOperation(format!(
                "quotation {} has expired",
                quotation_id
            )));
        }

        let store = crate::entities::store::Entity::find_by_id(store_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("store {} not found", store_id)))?;
        let customer = CustomerEntity::find_by_id(model.customer_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("customer {} not found", model.customer_id))
            })?;
        let shipping_address = customer.shipping_address.clone().ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "customer {} has no shipping address on file",
                customer.id
            ))
        })?;

        let quote_items = model.find_related(QuotationItemEntity).all(&txn).await?;

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let order_model = order::ActiveModel {
            id: Set(order_id),
            store_id: Set(store_id),
            customer_id: Set(model.customer_id),
            order_number: Set(super::generate_number("ORD")),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            payment_reference: Set(None),
            coupon_id: Set(None),
            subtotal: Set(model.subtotal),
            discount_total: Set(Decimal::ZERO),
            shipping_total: Set(Decimal::ZERO),
            total: Set(model.total),
            currency: Set(store.currency.clone()),
            shipping_address: Set(shipping_address),
            notes: Set(Some(format!(
                "converted from quotation {}",
                model.quotation_number
            ))),
            placed_at: Set(now),
            paid_at: Set(None),
            is_archived: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            version: Set(1),
        }
        .insert(&txn)
        .await?;

        for item in &quote_items {
            order_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                product_name: Set(item.product_name.clone()),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                total: Set(item.total),
            }
            .insert(&txn)
            .await?;
        }

        let mut active: quotation::ActiveModel = model.into();
        active.status = Set(QuotationStatus::Converted);
        active.converted_order_id = Set(Some(order_id));
        active.updated_at = Set(now);
        let converted = active.update(&txn).await?;

        txn.commit().await?;

        info!(quotation_id = %quotation_id, order_id = %order_id, "quotation converted to order");
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender
                .send(Event::QuotationConverted {
                    quotation_id,
                    order_id,
                })
                .await
            {
                warn!(error = %e, "failed to send quotation converted event");
            }
        }
        Ok((converted, order_model))
    }
}
