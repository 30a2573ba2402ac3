use crate::{
    carriers::{CarrierClient, GuideRequest, RateRequest},
    db::DbPool,
    entities::customer::Entity as CustomerEntity,
    entities::order::{self, Entity as OrderEntity, PaymentStatus},
    entities::shipment::{self, Entity as ShipmentEntity, ShipmentStatus},
    errors::ServiceError,
    events::{Event, EventSender},
    notifications::{self, EmailClient},
};
use chrono::Utc;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ShipmentService {
    db_pool: Arc<DbPool>,
    carrier: Arc<dyn CarrierClient>,
    event_sender: Option<Arc<EventSender>>,
    mailer: Option<Arc<dyn EmailClient>>,
    email_from: String,
}

pub struct CreateShipmentInput {
    pub order_id: Uuid,
    pub recipient_name: String,
    /// Defaults to the order's shipping address when absent
    pub shipping_address: Option<String>,
    pub service_level: Option<String>,
}

impl ShipmentService {
    pub fn new(
        db_pool: Arc<DbPool>,
        carrier: Arc<dyn CarrierClient>,
        event_sender: Option<Arc<EventSender>>,
        mailer: Option<Arc<dyn EmailClient>>,
        email_from: String,
    ) -> Self {
        Self {
            db_pool,
            carrier,
            event_sender,
            mailer,
            email_from,
        }
    }

    async fn notify(&self, event: Event) {
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(event).await {
                warn!(error = %e, "failed to send shipment event");
            }
        }
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, order_id = %input.order_id))]
    pub async fn create_shipment(
        &self,
        store_id: Uuid,
        input: CreateShipmentInput,
    ) -> Result<shipment::Model, ServiceError> {
        let db = &*self.db_pool;
        let order = OrderEntity::find_by_id(input.order_id)
            .filter(order::Column::StoreId.eq(store_id))
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("order {} not found", input.order_id))
            })?;

        let now = Utc::now();
        let model = shipment::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            order_id: Set(order.id),
            status: Set(ShipmentStatus::Preparing),
            carrier: Set(None),
            service_level: Set(input.service_level),
            recipient_name: Set(input.recipient_name),
            shipping_address: Set(input
                .shipping_address
                .unwrap_or_else(|| order.shipping_address.clone())),
            rate_ref: Set(None),
            rate_amount: Set(None),
            quoted_at: Set(None),
            guide_ref: Set(None),
            tracking_number: Set(None),
            label_url: Set(None),
            shipped_at: Set(None),
            delivered_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(shipment_id = %model.id, "shipment created");
        self.notify(Event::ShipmentCreated(model.id)).await;
        Ok(model)
    }

    pub async fn get_shipment(
        &self,
        store_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<Option<shipment::Model>, ServiceError> {
        Ok(ShipmentEntity::find_by_id(shipment_id)
            .filter(shipment::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn find_by_tracking_number(
        &self,
        store_id: Uuid,
        tracking_number: &str,
    ) -> Result<Option<shipment::Model>, ServiceError> {
        Ok(ShipmentEntity::find()
            .filter(shipment::Column::StoreId.eq(store_id))
            .filter(shipment::Column::TrackingNumber.eq(tracking_number))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn list_shipments(
        &self,
        store_id: Uuid,
        page: u64,
        limit: u64,
        status: Option<ShipmentStatus>,
    ) -> Result<(Vec<shipment::Model>, u64), ServiceError> {
        let mut query = ShipmentEntity::find().filter(shipment::Column::StoreId.eq(store_id));
        if let Some(status) = status {
            query = query.filter(shipment::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(shipment::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let shipments = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((shipments, total))
    }

    /// Single-shipment transition, checked against the allow-list.
    #[instrument(skip(self), fields(store_id = %store_id, shipment_id = %shipment_id, target = %target))]
    pub async fn update_status(
        &self,
        store_id: Uuid,
        shipment_id: Uuid,
        target: ShipmentStatus,
    ) -> Result<shipment::Model, ServiceError> {
        let db = &*self.db_pool;
        let model = self
            .get_shipment(store_id, shipment_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("shipment {} not found", shipment_id))
            })?;

        let current = model.status;
        if !current.can_transition_to(target) {
            return Err(ServiceError::InvalidStatus(format!(
                "shipment {} cannot move from '{}' to '{}' (allowed: {})",
                shipment_id,
                current,
                target,
                format_allowed(current)
            )));
        }

        let now = Utc::now();
        let mut active: shipment::ActiveModel = model.into();
        active.status = Set(target);
        if target == ShipmentStatus::InTransit {
            active.shipped_at = Set(Some(now));
        }
        if target == ShipmentStatus::Delivered {
            active.delivered_at = Set(Some(now));
        }
        active.updated_at = Set(now);
        let updated = active.update(db).await?;

        self.notify(Event::ShipmentStatusChanged {
            shipment_id,
            old_status: current.to_string(),
            new_status: target.to_string(),
        })
        .await;
        Ok(updated)
    }

    /// Bulk transition: every requested shipment must pass the allow-list or
    /// the whole batch is rejected, naming the offenders. Valid batches are
    /// applied as one batched update in a transaction.
    #[instrument(skip(self, shipment_ids), fields(store_id = %store_id, target = %target, count = shipment_ids.len()))]
    pub async fn bulk_update_status(
        &self,
        store_id: Uuid,
        shipment_ids: &[Uuid],
        target: ShipmentStatus,
    ) -> Result<u64, ServiceError> {
        if shipment_ids.is_empty() {
            return Err(ServiceError::ValidationError(
                "no shipment ids supplied".into(),
            ));
        }
        let mut shipment_ids = shipment_ids.to_vec();
        shipment_ids.sort_unstable();
        shipment_ids.dedup();

        let db = &*self.db_pool;
        let found = ShipmentEntity::find()
            .filter(shipment::Column::StoreId.eq(store_id))
            .filter(shipment::Column::Id.is_in(shipment_ids.iter().copied()))
            .all(db)
            .await?;

        if found.len() != shipment_ids.len() {
            let found_ids: Vec<Uuid> = found.iter().map(|s| s.id).collect();
            let missing: Vec<String> = shipment_ids
                .iter()
                .filter(|id| !found_ids.contains(id))
                .map(|id| id.to_string())
                .collect();
            return Err(ServiceError::NotFound(format!(
                "shipments not found: {}",
                missing.join(", ")
            )));
        }

        let offenders: Vec<String> = found
            .iter()
            .filter(|s| !s.status.can_transition_to(target))
            .map(|s| format!("{} ({} -> {})", s.id, s.status, target))
            .collect();
        if !offenders.is_empty() {
            return Err(ServiceError::InvalidStatus(format!(
                "illegal transitions for shipments: {}",
                offenders.join(", ")
            )));
        }

        let now = Utc::now();
        let txn = db.begin().await?;
        let mut update = ShipmentEntity::update_many()
            .col_expr(shipment::Column::Status, Expr::value(target))
            .col_expr(shipment::Column::UpdatedAt, Expr::value(now));
        if target == ShipmentStatus::InTransit {
            update = update.col_expr(shipment::Column::ShippedAt, Expr::value(Some(now)));
        }
        if target == ShipmentStatus::Delivered {
            update = update.col_expr(shipment::Column::DeliveredAt, Expr::value(Some(now)));
        }
        let result = update
            .filter(shipment::Column::StoreId.eq(store_id))
            .filter(shipment::Column::Id.is_in(shipment_ids.iter().copied()))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        info!(rows = result.rows_affected, target = %target, "bulk shipment status update applied");
        for model in &found {
            self.notify(Event::ShipmentStatusChanged {
                shipment_id: model.id,
                old_status: model.status.to_string(),
                new_status: target.to_string(),
            })
            .await;
        }
        Ok(result.rows_affected)
    }

    /// Fetches a rate from the carrier and persists it on the shipment.
    #[instrument(skip(self), fields(store_id = %store_id, shipment_id = %shipment_id))]
    pub async fn quote(
        &self,
        store_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<shipment::Model, ServiceError> {
        let model = self
            .get_shipment(store_id, shipment_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("shipment {} not found", shipment_id))
            })?;

        if model.has_guide() {
            return Err(ServiceError::Conflict(format!(
                "shipment {} already has a guide; re-quoting is pointless",
                shipment_id
            )));
        }

        let quote = self
            .carrier
            .quote_rate(&RateRequest {
                shipment_id,
                recipient_name: model.recipient_name.clone(),
                address: model.shipping_address.clone(),
                service_level: model.service_level.clone(),
            })
            .await?;

        let rate_ref = quote.rate_id.clone();
        let mut active: shipment::ActiveModel = model.into();
        active.rate_ref = Set(Some(quote.rate_id));
        active.rate_amount = Set(Some(quote.amount));
        active.carrier = Set(Some(quote.carrier));
        active.quoted_at = Set(Some(Utc::now()));
        active.updated_at = Set(Utc::now());
        let updated = active.update(&*self.db_pool).await?;

        self.notify(Event::ShipmentQuoted {
            shipment_id,
            rate_ref,
        })
        .await;
        Ok(updated)
    }

    /// Creates the carrier guide. Preconditions: the order is paid, a quote
    /// exists and no guide exists yet. A carrier failure leaves the shipment
    /// unguided and surfaces the provider's message; there is no retry.
    #[instrument(skip(self), fields(store_id = %store_id, shipment_id = %shipment_id))]
    pub async fn create_guide(
        &self,
        store_id: Uuid,
        shipment_id: Uuid,
    ) -> Result<shipment::Model, ServiceError> {
        let db = &*self.db_pool;
        let model = self
            .get_shipment(store_id, shipment_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("shipment {} not found", shipment_id))
            })?;

        if model.has_guide() {
            return Err(ServiceError::Conflict(format!(
                "shipment {} already has guide {}",
                shipment_id,
                model.guide_ref.as_deref().unwrap_or("?")
            )));
        }
        let Some(rate_ref) = model.rate_ref.clone() else {
            return Err(ServiceError::InvalidOperation(format!(
                "shipment {} has no quote; request a rate first",
                shipment_id
            )));
        };

        let order = OrderEntity::find_by_id(model.order_id)
            .one(db)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("order {} not found", model.order_id))
            })?;
        if order.payment_status != PaymentStatus::Paid {
            return Err(ServiceError::InvalidOperation(format!(
                "order {} must be paid before a guide can be created",
                order.id
            )));
        }

        let guide = self
            .carrier
            .create_guide(&GuideRequest {
                shipment_id,
                rate_id: rate_ref,
            })
            .await?;

        let guide_ref = guide.guide_id.clone();
        let tracking_number = guide.tracking_number.clone();
        let mut active: shipment::ActiveModel = model.into();
        active.guide_ref = Set(Some(guide.guide_id));
        active.tracking_number = Set(Some(guide.tracking_number));
        active.label_url = Set(Some(guide.label_url));
        active.updated_at = Set(Utc::now());
        let updated = active.update(db).await?;

        info!(shipment_id = %shipment_id, guide_ref = %guide_ref, "shipping guide created");
        self.notify(Event::ShipmentGuideCreated {
            shipment_id,
            guide_ref,
        })
        .await;
        self.send_guide_email(&order, &tracking_number).await;
        Ok(updated)
    }

    async fn send_guide_email(&self, order: &order::Model, tracking_number: &str) {
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
                subject: format!("Order {} is on its way", order.order_number),
                body: format!(
                    "A shipping guide was created for order {}. Track it with number {}.",
                    order.order_number, tracking_number
                ),
            };
            notifications::send_detached(mailer.clone(), message);
        }
    }
}

fn format_allowed(status: ShipmentStatus) -> String {
    let allowed = status.allowed_next();
    if allowed.is_empty() {
        "none".to_string()
    } else {
        allowed
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    }
}
