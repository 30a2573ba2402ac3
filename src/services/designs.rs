use crate::{
    db::DbPool,
    entities::design::{self, Entity as DesignEntity},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct DesignService {
    db_pool: Arc<DbPool>,
}

pub struct CreateDesignInput {
    pub name: String,
    pub slug: String,
    pub preview_url: Option<String>,
    pub payload: serde_json::Value,
}

#[derive(Default)]
pub struct UpdateDesignInput {
    pub name: Option<String>,
    pub preview_url: Option<Option<String>>,
    pub payload: Option<serde_json::Value>,
}

impl DesignService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, slug = %input.slug))]
    pub async fn create_design(
        &self,
        store_id: Uuid,
        input: CreateDesignInput,
    ) -> Result<design::Model, ServiceError> {
        let db = &*self.db_pool;
        let duplicate = DesignEntity::find()
            .filter(design::Column::StoreId.eq(store_id))
            .filter(design::Column::Slug.eq(input.slug.clone()))
            .one(db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "design slug '{}' already exists",
                input.slug
            )));
        }

        let now = Utc::now();
        Ok(design::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            name: Set(input.name),
            slug: Set(input.slug),
            preview_url: Set(input.preview_url),
            payload: Set(input.payload),
            is_published: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?)
    }

    pub async fn get_design(
        &self,
        store_id: Uuid,
        design_id: Uuid,
    ) -> Result<Option<design::Model>, ServiceError> {
        Ok(DesignEntity::find_by_id(design_id)
            .filter(design::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn list_designs(&self, store_id: Uuid) -> Result<Vec<design::Model>, ServiceError> {
        Ok(DesignEntity::find()
            .filter(design::Column::StoreId.eq(store_id))
            .order_by_desc(design::Column::UpdatedAt)
            .all(&*self.db_pool)
            .await?)
    }

    /// The design the storefront is currently rendering.
    pub async fn published_design(
        &self,
        store_id: Uuid,
    ) -> Result<Option<design::Model>, ServiceError> {
        Ok(DesignEntity::find()
            .filter(design::Column::StoreId.eq(store_id))
            .filter(design::Column::IsPublished.eq(true))
            .one(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, design_id = %design_id))]
    pub async fn update_design(
        &self,
        store_id: Uuid,
        design_id: Uuid,
        input: UpdateDesignInput,
    ) -> Result<design::Model, ServiceError> {
        let model = self
            .get_design(store_id, design_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("design {} not found", design_id)))?;

        let mut active: design::ActiveModel = model.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(preview_url) = input.preview_url {
            active.preview_url = Set(preview_url);
        }
        if let Some(payload) = input.payload {
            active.payload = Set(payload);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }

    /// Publishes one design and unpublishes the rest, so at most one design
    /// is live per store.
    #[instrument(skip(self), fields(store_id = %store_id, design_id = %design_id))]
    pub async fn publish_design(
        &self,
        store_id: Uuid,
        design_id: Uuid,
    ) -> Result<design::Model, ServiceError> {
        use sea_orm::sea_query::Expr;
        use sea_orm::TransactionTrait;

        let db = &*self.db_pool;
        let model = self
            .get_design(store_id, design_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("design {} not found", design_id)))?;

        let txn = db.begin().await?;
        DesignEntity::update_many()
            .col_expr(design::Column::IsPublished, Expr::value(false))
            .filter(design::Column::StoreId.eq(store_id))
            .filter(design::Column::IsPublished.eq(true))
            .exec(&txn)
            .await?;

        let mut active: design::ActiveModel = model.into();
        active.is_published = Set(true);
        active.updated_at = Set(Utc::now());
        let published = active.update(&txn).await?;
        txn.commit().await?;
        Ok(published)
    }

    #[instrument(skip(self), fields(store_id = %store_id, design_id = %design_id))]
    pub async fn delete_design(&self, store_id: Uuid, design_id: Uuid) -> Result<(), ServiceError> {
        let model = self
            .get_design(store_id, design_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("design {} not found", design_id)))?;
        DesignEntity::delete_by_id(model.id)
            .exec(&*self.db_pool)
            .await?;
        Ok(())
    }
}
