use crate::{
    db::DbPool,
    entities::category::{self, Entity as CategoryEntity},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct CategoryService {
    db_pool: Arc<DbPool>,
}

pub struct CreateCategoryInput {
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub parent_id: Option<Uuid>,
    pub position: i32,
    pub is_visible: bool,
}

#[derive(Default)]
pub struct UpdateCategoryInput {
    pub name: Option<String>,
    pub description: Option<Option<String>>,
    pub parent_id: Option<Option<Uuid>>,
    pub position: Option<i32>,
    pub is_visible: Option<bool>,
}

impl CategoryService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, slug = %input.slug))]
    pub async fn create_category(
        &self,
        store_id: Uuid,
        input: CreateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        let db = &*self.db_pool;

        let duplicate = CategoryEntity::find()
            .filter(category::Column::StoreId.eq(store_id))
            .filter(category::Column::Slug.eq(input.slug.clone()))
            .one(db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "category slug '{}' already exists",
                input.slug
            )));
        }

        if let Some(parent_id) = input.parent_id {
            let parent = CategoryEntity::find_by_id(parent_id)
                .filter(category::Column::StoreId.eq(store_id))
                .one(db)
                .await?;
            if parent.is_none() {
                return Err(ServiceError::ValidationError(format!(
                    "parent category {} does not exist in this store",
                    parent_id
                )));
            }
        }

        let now = Utc::now();
        Ok(category::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            parent_id: Set(input.parent_id),
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            position: Set(input.position),
            is_visible: Set(input.is_visible),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?)
    }

    pub async fn get_category(
        &self,
        store_id: Uuid,
        category_id: Uuid,
    ) -> Result<Option<category::Model>, ServiceError> {
        Ok(CategoryEntity::find_by_id(category_id)
            .filter(category::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn list_categories(
        &self,
        store_id: Uuid,
        only_visible: bool,
    ) -> Result<Vec<category::Model>, ServiceError> {
        let mut query = CategoryEntity::find().filter(category::Column::StoreId.eq(store_id));
        if only_visible {
            query = query.filter(category::Column::IsVisible.eq(true));
        }
        Ok(query
            .order_by_asc(category::Column::Position)
            .order_by_asc(category::Column::Name)
            .all(&*self.db_pool)
            .await?)
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, category_id = %category_id))]
    pub async fn update_category(
        &self,
        store_id: Uuid,
        category_id: Uuid,
        input: UpdateCategoryInput,
    ) -> Result<category::Model, ServiceError> {
        let category = self
            .get_category(store_id, category_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("category {} not found", category_id)))?;

        let mut active: category::ActiveModel = category.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(parent_id) = input.parent_id {
            active.parent_id = Set(parent_id);
        }
        if let Some(position) = input.position {
            active.position = Set(position);
        }
        if let Some(is_visible) = input.is_visible {
            active.is_visible = Set(is_visible);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self), fields(store_id = %store_id, category_id = %category_id))]
    pub async fn delete_category(
        &self,
        store_id: Uuid,
        category_id: Uuid,
    ) -> Result<(), ServiceError> {
        let category = self
            .get_category(store_id, category_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("category {} not found", category_id)))?;
        CategoryEntity::delete_by_id(category.id)
            .exec(&*self.db_pool)
            .await?;
        Ok(())
    }
}
