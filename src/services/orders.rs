use crate::{
    db::DbPool,
    entities::customer::{self, Entity as CustomerEntity},
    entities::order::{self, Entity as OrderEntity, OrderStatus, PaymentStatus},
    entities::order_item::{self, Entity as OrderItemEntity},
    entities::product::{self, Entity as ProductEntity, ProductStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{self, EmailClient},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{coupons, inventory, invoices};

#[derive(Clone)]
pub struct OrderService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
    mailer: Option<Arc<dyn EmailClient>>,
    email_from: String,
}

pub struct OrderItemInput {
    pub product_id: Uuid,
    pub quantity: i32,
}

pub struct CreateOrderInput {
    pub customer_id: Uuid,
    pub items: Vec<OrderItemInput>,
    pub coupon_code: Option<String>,
    pub shipping_address: Option<String>,
    pub shipping_total: Decimal,
    pub notes: Option<String>,
}

impl OrderService {
    pub fn new(
        db_pool: Arc<DbPool>,
        event_sender: Option<Arc<EventSender>>,
        mailer: Option<Arc<dyn EmailClient>>,
        email_from: String,
    ) -> Self {
        Self {
            db_pool,
            event_sender,
            mailer,
            email_from,
        }
    }

    async fn notify(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send order event");
            }
        }
    }

    /// Creates an order from explicit items. Prices are snapshotted from the
    /// catalog, an optional coupon is validated against the subtotal and
    /// redeemed in the same transaction that writes the order.
    #[instrument(skip(self, input), fields(store_id = %store_id, customer_id = %input.customer_id))]
    pub async fn create_order(
        &self,
        store_id: Uuid,
        input: CreateOrderInput,
    ) -> Result<(order::Model, Vec<order_item::Model>), ServiceError> {
        if input.items.is_empty() {
            return Err(ServiceError::ValidationError(
                "order needs at least one item".into(),
            ));
        }
        if input.items.iter().any(|item| item.quantity <= 0) {
            return Err(ServiceError::ValidationError(
                "item quantities must be positive".into(),
            ));
        }
        if input.shipping_total < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "shipping total must not be negative".into(),
            ));
        }

        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let store = crate::entities::store::Entity::find_by_id(store_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("store {} not found", store_id)))?;

        let customer = CustomerEntity::find_by_id(input.customer_id)
            .filter(customer::Column::StoreId.eq(store_id))
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("customer {} not found", input.customer_id))
            })?;

        // Snapshot prices and names from the catalog.
        let mut subtotal = Decimal::ZERO;
        let mut line_inputs = Vec::with_capacity(input.items.len());
        for item in &input.items {
            let product = ProductEntity::find_by_id(item.product_id)
                .filter(product::Column::StoreId.eq(store_id))
                .one(&txn)
                .await?
                .ok_or_else(|| {
                    ServiceError::NotFound(format!("product {} not found", item.product_id))
                })?;
            if product.status != ProductStatus::Active {
                return Err(ServiceError::InvalidOperation(format!(
                    "product '{}' is not purchasable",
                    product.slug
                )));
            }

            let line_total = product.price * Decimal::from(item.quantity);
            subtotal += line_total;
            line_inputs.push((product, item.quantity, line_total));
        }

        // Coupon applies to the subtotal; redemption happens in this
        // transaction so the counter and the order commit together.
        let coupon_applied = match &input.coupon_code {
            Some(code) => {
                let coupon = crate::entities::coupon::Entity::find()
                    .filter(crate::entities::coupon::Column::StoreId.eq(store_id))
                    .filter(crate::entities::coupon::Column::Code.eq(code.trim().to_uppercase()))
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("coupon '{}' not found", code))
                    })?;
                Some(coupons::evaluate_coupon(&coupon, subtotal, Utc::now())?)
            }
            None => None,
        };
        let discount_total = coupon_applied
            .as_ref()
            .map(|c| c.discount_amount)
            .unwrap_or(Decimal::ZERO);
        let total = subtotal - discount_total + input.shipping_total;

        let now = Utc::now();
        let order_id = Uuid::new_v4();
        let shipping_address = input
            .shipping_address
            .or(customer.shipping_address.clone())
            .ok_or_else(|| {
                ServiceError::ValidationError(
                    "order needs a shipping address (none on customer record)".into(),
                )
            })?;

        let order_model = order::ActiveModel {
            id: Set(order_id),
            store_id: Set(store_id),
            customer_id: Set(customer.id),
            order_number: Set(super::generate_number("ORD")),
            status: Set(OrderStatus::Pending),
            payment_status: Set(PaymentStatus::Pending),
            payment_reference: Set(None),
            coupon_id: Set(coupon_applied.as_ref().map(|c| c.coupon_id)),
            subtotal: Set(subtotal),
            discount_total: Set(discount_total),
            shipping_total: Set(input.shipping_total),
            total: Set(total),
            currency: Set(store.currency.clone()),
            shipping_address: Set(shipping_address),
            notes: Set(input.notes),
            placed_at: Set(now),
            paid_at: Set(None),
            is_archived: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
            version: Set(1),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(line_inputs.len());
        for (product, quantity, line_total) in line_inputs {
            items.push(
                order_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    order_id: Set(order_id),
                    product_id: Set(product.id),
                    product_name: Set(product.name.clone()),
                    quantity: Set(quantity),
                    unit_price: Set(product.price),
                    total: Set(line_total),
                }
                .insert(&txn)
                .await?,
            );
        }

        if let Some(applied) = &coupon_applied {
            coupons::redeem_in_txn(&txn, applied.coupon_id).await?;
        }

        txn.commit().await?;

        info!(order_id = %order_id, total = %order_model.total, "order created");
        self.notify(Event::OrderCreated(order_id)).await;
        if let Some(applied) = &coupon_applied {
            self.notify(Event::CouponRedeemed {
                coupon_id: applied.coupon_id,
                order_id,
            })
            .await;
        }

        Ok((order_model, items))
    }

    pub async fn get_order(
        &self,
        store_id: Uuid,
        order_id: Uuid,
    ) -> Result<Option<order::Model>, ServiceError> {
        Ok(OrderEntity::find_by_id(order_id)
            .filter(order::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn get_order_items(
        &self,
        store_id: Uuid,
        order_id: Uuid,
    ) -> Result<Vec<order_item::Model>, ServiceError> {
        let order = self
            .get_order(store_id, order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;
        Ok(order
            .find_related(OrderItemEntity)
            .all(&*self.db_pool)
            .await?)
    }

    pub async fn list_orders(
        &self,
        store_id: Uuid,
        page: u64,
        limit: u64,
        status: Option<OrderStatus>,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let mut query = OrderEntity::find()
            .filter(order::Column::StoreId.eq(store_id))
            .filter(order::Column::IsArchived.eq(false));
        if let Some(status) = status {
            query = query.filter(order::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(order::Column::PlacedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((orders, total))
    }

    /// Records a successful payment: flips payment status, decrements stock
    /// for every item and issues the invoice — one transaction, so stock can
    /// never be decremented twice for the same order.
    #[instrument(skip(self), fields(store_id = %store_id, order_id = %order_id))]
    pub async fn mark_paid(
        &self,
        store_id: Uuid,
        order_id: Uuid,
        payment_reference: String,
    ) -> Result<order::Model, ServiceError> {
        let db = &*self.db_pool;
        let txn = db.begin().await?;

        let order = OrderEntity::find_by_id(order_id)
            .filter(order::Column::StoreId.eq(store_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;

        match order.payment_status {
            PaymentStatus::Pending => {}
            PaymentStatus::Paid => {
                return Err(ServiceError::Conflict(format!(
                    "order {} is already paid",
                    order_id
                )))
            }
            other => {
                return Err(ServiceError::InvalidOperation(format!(
                    "order {} cannot be paid from payment status '{}'",
                    order_id, other
                )))
            }
        }
        if order.status == OrderStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(format!(
                "order {} is cancelled",
                order_id
            )));
        }

        let items = order.find_related(OrderItemEntity).all(&txn).await?;
        inventory::decrement_for_items(&txn, store_id, &items).await?;

        let now = Utc::now();
        let version = order.version;
        let mut active: order::ActiveModel = order.into();
        active.payment_status = Set(PaymentStatus::Paid);
        active.payment_reference = Set(Some(payment_reference.clone()));
        active.status = Set(OrderStatus::Processing);
        active.paid_at = Set(Some(now));
        active.updated_at = Set(now);
        active.version = Set(version + 1);
        let updated = active.update(&txn).await?;

        let invoice = invoices::issue_for_order(&txn, &updated).await?;

        txn.commit().await?;

        info!(order_id = %order_id, invoice_id = %invoice.id, "order paid and invoiced");
        self.notify(Event::OrderPaid {
            order_id,
            payment_reference,
        })
        .await;
        self.notify(Event::InvoiceIssued(invoice.id)).await;

        self.send_confirmation_email(&updated).await;

        Ok(updated)
    }

    async fn send_confirmation_email(&self, order: &order::Model) {
        let Some(mailer) = &self.mailer else {
            return;
        };
        let customer = CustomerEntity::find_by_id(order.customer_id)
            .one(&*self.db_pool)
            .await;
        if let Ok(Some(customer)) = customer {
            let message = notifications::EmailMessage {
                from: self.email_from.clone(),
                to: customer.email,
                subject: format!("Order {} confirmed", order.order_number),
                body: format!(
                    "Thanks for your purchase. Order {} for {} {} has been received and paid.",
                    order.order_number, order.total, order.currency
                ),
            };
            notifications::send_detached(mailer.clone(), message);
        }
    }

    /// Moves an order forward along its lifecycle. Cancellation goes through
    /// `cancel_order` so the guard there cannot be bypassed.
    #[instrument(skip(self), fields(store_id = %store_id, order_id = %order_id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        store_id: Uuid,
        order_id: Uuid,
        new_status: OrderStatus,
    ) -> Result<order::Model, ServiceError> {
        if new_status == OrderStatus::Cancelled {
            return Err(ServiceError::InvalidOperation(
                "use the cancel operation to cancel an order".into(),
            ));
        }

        let order = self
            .get_order(store_id, order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;

        if matches!(order.status, OrderStatus::Cancelled | OrderStatus::Delivered) {
            return Err(ServiceError::InvalidStatus(format!(
                "order {} is {} and cannot change status",
                order_id, order.status
            )));
        }

        let old_status = order.status;
        let version = order.version;
        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status);
        active.updated_at = Set(Utc::now());
        active.version = Set(version + 1);
        let updated = active.update(&*self.db_pool).await?;

        self.notify(Event::OrderStatusChanged {
            order_id,
            old_status: old_status.to_string(),
            new_status: new_status.to_string(),
        })
        .await;
        Ok(updated)
    }

    /// Cancels an order that has not shipped yet.
    #[instrument(skip(self), fields(store_id = %store_id, order_id = %order_id))]
    pub async fn cancel_order(
        &self,
        store_id: Uuid,
        order_id: Uuid,
        reason: Option<String>,
    ) -> Result<order::Model, ServiceError> {
        let order = self
            .get_order(store_id, order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;

        if !order.status.is_cancellable() {
            return Err(ServiceError::InvalidOperation(format!(
                "order {} is {} and can no longer be cancelled",
                order_id, order.status
            )));
        }

        let version = order.version;
        let notes = order.notes.clone();
        let mut active: order::ActiveModel = order.into();
        active.status = Set(OrderStatus::Cancelled);
        if let Some(reason) = reason {
            active.notes = Set(Some(match notes {
                Some(existing) => format!("{}\ncancelled: {}", existing, reason),
                None => format!("cancelled: {}", reason),
            }));
        }
        active.updated_at = Set(Utc::now());
        active.version = Set(version + 1);
        let updated = active.update(&*self.db_pool).await?;

        self.notify(Event::OrderCancelled(order_id)).await;
        Ok(updated)
    }

    #[instrument(skip(self), fields(store_id = %store_id, order_id = %order_id))]
    pub async fn archive_order(
        &self,
        store_id: Uuid,
        order_id: Uuid,
    ) -> Result<order::Model, ServiceError> {
        let order = self
            .get_order(store_id, order_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("order {} not found", order_id)))?;

        let version = order.version;
        let mut active: order::ActiveModel = order.into();
        active.is_archived = Set(true);
        active.updated_at = Set(Utc::now());
        active.version = Set(version + 1);
        Ok(active.update(&*self.db_pool).await?)
    }
}
