use crate::{
    db::DbPool,
    entities::store::{self, Entity as StoreEntity},
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct StoreService {
    db_pool: Arc<DbPool>,
    event_sender: Option<Arc<EventSender>>,
}

pub struct CreateStoreInput {
    pub name: String,
    pub slug: String,
    pub owner_subject: String,
    pub contact_email: String,
    pub currency: String,
    pub logo_url: Option<String>,
}

#[derive(Default)]
pub struct UpdateStoreInput {
    pub name: Option<String>,
    pub contact_email: Option<String>,
    pub currency: Option<String>,
    pub logo_url: Option<Option<String>>,
}

impl StoreService {
    pub fn new(db_pool: Arc<DbPool>, event_sender: Option<Arc<EventSender>>) -> Self {
        Self {
            db_pool,
            event_sender,
        }
    }

    #[instrument(skip(self, input), fields(slug = %input.slug))]
    pub async fn create_store(&self, input: CreateStoreInput) -> Result<store::Model, ServiceError> {
        let db = &*self.db_pool;

        let existing = StoreEntity::find()
            .filter(store::Column::Slug.eq(input.slug.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "store slug '{}' is already taken",
                input.slug
            )));
        }

        let now = Utc::now();
        let model = store::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name),
            slug: Set(input.slug),
            owner_subject: Set(input.owner_subject),
            contact_email: Set(input.contact_email),
            currency: Set(input.currency),
            logo_url: Set(input.logo_url),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;

        info!(store_id = %model.id, "store created");
        if let Some(sender) = &self.event_sender {
            if let Err(e) = sender.send(Event::StoreCreated(model.id)).await {
                warn!(error = %e, "failed to send store created event");
            }
        }
        Ok(model)
    }

    pub async fn get_store(&self, store_id: Uuid) -> Result<Option<store::Model>, ServiceError> {
        Ok(StoreEntity::find_by_id(store_id).one(&*self.db_pool).await?)
    }

    pub async fn get_store_by_slug(&self, slug: &str) -> Result<Option<store::Model>, ServiceError> {
        Ok(StoreEntity::find()
            .filter(store::Column::Slug.eq(slug))
            .filter(store::Column::IsActive.eq(true))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn list_stores(
        &self,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<store::Model>, u64), ServiceError> {
        let paginator = StoreEntity::find()
            .order_by_asc(store::Column::Name)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let stores = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((stores, total))
    }

    #[instrument(skip(self, input), fields(store_id = %store_id))]
    pub async fn update_store(
        &self,
        store_id: Uuid,
        input: UpdateStoreInput,
    ) -> Result<store::Model, ServiceError> {
        let db = &*self.db_pool;
        let store = StoreEntity::find_by_id(store_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("store {} not found", store_id)))?;

        let mut active: store::ActiveModel = store.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(contact_email) = input.contact_email {
            active.contact_email = Set(contact_email);
        }
        if let Some(currency) = input.currency {
            active.currency = Set(currency);
        }
        if let Some(logo_url) = input.logo_url {
            active.logo_url = Set(logo_url);
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(db).await?)
    }

    /// Soft-deactivates a store; resources stay behind the tenant boundary.
    #[instrument(skip(self), fields(store_id = %store_id))]
    pub async fn archive_store(&self, store_id: Uuid) -> Result<store::Model, ServiceError> {
        let db = &*self.db_pool;
        let store = StoreEntity::find_by_id(store_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("store {} not found", store_id)))?;

        let mut active: store::ActiveModel = store.into();
        active.is_active = Set(false);
        active.updated_at = Set(Utc::now());
        Ok(active.update(db).await?)
    }
}
