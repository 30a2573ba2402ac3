use crate::{
    db::DbPool,
    entities::product::{self, Entity as ProductEntity, ProductStatus},
    entities::product_image::{self, Entity as ProductImageEntity},
    errors::ServiceError,
    images::ImageHostClient,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{instrument, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct ProductService {
    db_pool: Arc<DbPool>,
    image_host: Option<Arc<dyn ImageHostClient>>,
}

pub struct CreateProductInput {
    pub name: String,
    pub slug: String,
    pub description: String,
    pub sku: Option<String>,
    pub price: Decimal,
    pub compare_at_price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub status: ProductStatus,
    pub is_featured: bool,
}

#[derive(Default)]
pub struct UpdateProductInput {
    pub name: Option<String>,
    pub description: Option<String>,
    pub sku: Option<Option<String>>,
    pub price: Option<Decimal>,
    pub compare_at_price: Option<Option<Decimal>>,
    pub category_id: Option<Option<Uuid>>,
    pub status: Option<ProductStatus>,
    pub is_featured: Option<bool>,
}

pub struct AttachImageInput {
    pub url: String,
    pub provider_ref: String,
    pub alt_text: Option<String>,
    pub position: i32,
}

impl ProductService {
    pub fn new(db_pool: Arc<DbPool>, image_host: Option<Arc<dyn ImageHostClient>>) -> Self {
        Self {
            db_pool,
            image_host,
        }
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, slug = %input.slug))]
    pub async fn create_product(
        &self,
        store_id: Uuid,
        input: CreateProductInput,
    ) -> Result<product::Model, ServiceError> {
        if input.price < Decimal::ZERO {
            return Err(ServiceError::ValidationError(
                "price must not be negative".into(),
            ));
        }

        let db = &*self.db_pool;
        let duplicate = ProductEntity::find()
            .filter(product::Column::StoreId.eq(store_id))
            .filter(product::Column::Slug.eq(input.slug.clone()))
            .one(db)
            .await?;
        if duplicate.is_some() {
            return Err(ServiceError::Conflict(format!(
                "product slug '{}' already exists",
                input.slug
            )));
        }

        let now = Utc::now();
        Ok(product::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            category_id: Set(input.category_id),
            name: Set(input.name),
            slug: Set(input.slug),
            description: Set(input.description),
            sku: Set(input.sku),
            price: Set(input.price),
            compare_at_price: Set(input.compare_at_price),
            status: Set(input.status),
            is_featured: Set(input.is_featured),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?)
    }

    pub async fn get_product(
        &self,
        store_id: Uuid,
        product_id: Uuid,
    ) -> Result<Option<product::Model>, ServiceError> {
        Ok(ProductEntity::find_by_id(product_id)
            .filter(product::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn get_product_by_slug(
        &self,
        store_id: Uuid,
        slug: &str,
    ) -> Result<Option<product::Model>, ServiceError> {
        Ok(ProductEntity::find()
            .filter(product::Column::StoreId.eq(store_id))
            .filter(product::Column::Slug.eq(slug))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn list_products(
        &self,
        store_id: Uuid,
        page: u64,
        limit: u64,
        status: Option<ProductStatus>,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut query = ProductEntity::find().filter(product::Column::StoreId.eq(store_id));
        if let Some(status) = status {
            query = query.filter(product::Column::Status.eq(status));
        }
        let paginator = query
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((products, total))
    }

    /// Storefront listing: active products only.
    pub async fn list_active_products(
        &self,
        store_id: Uuid,
        page: u64,
        limit: u64,
        category_id: Option<Uuid>,
    ) -> Result<(Vec<product::Model>, u64), ServiceError> {
        let mut query = ProductEntity::find()
            .filter(product::Column::StoreId.eq(store_id))
            .filter(product::Column::Status.eq(ProductStatus::Active));
        if let Some(category_id) = category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }
        let paginator = query
            .order_by_desc(product::Column::IsFeatured)
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((products, total))
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, product_id = %product_id))]
    pub async fn update_product(
        &self,
        store_id: Uuid,
        product_id: Uuid,
        input: UpdateProductInput,
    ) -> Result<product::Model, ServiceError> {
        if let Some(price) = input.price {
            if price < Decimal::ZERO {
                return Err(ServiceError::ValidationError(
                    "price must not be negative".into(),
                ));
            }
        }

        let db = &*self.db_pool;
        let model = self
            .get_product(store_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {} not found", product_id)))?;

        let mut active: product::ActiveModel = model.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(description) = input.description {
            active.description = Set(description);
        }
        if let Some(sku) = input.sku {
            active.sku = Set(sku);
        }
        if let Some(price) = input.price {
            active.price = Set(price);
        }
        if let Some(compare_at_price) = input.compare_at_price {
            active.compare_at_price = Set(compare_at_price);
        }
        if let Some(category_id) = input.category_id {
            active.category_id = Set(category_id);
        }
        if let Some(status) = input.status {
            active.status = Set(status);
        }
        if let Some(is_featured) = input.is_featured {
            active.is_featured = Set(is_featured);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(db).await?)
    }

    /// Archives instead of deleting: order items keep their product link.
    #[instrument(skip(self), fields(store_id = %store_id, product_id = %product_id))]
    pub async fn archive_product(
        &self,
        store_id: Uuid,
        product_id: Uuid,
    ) -> Result<product::Model, ServiceError> {
        let model = self
            .get_product(store_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {} not found", product_id)))?;

        let mut active: product::ActiveModel = model.into();
        active.status = Set(ProductStatus::Archived);
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, product_id = %product_id))]
    pub async fn attach_image(
        &self,
        store_id: Uuid,
        product_id: Uuid,
        input: AttachImageInput,
    ) -> Result<product_image::Model, ServiceError> {
        self.get_product(store_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {} not found", product_id)))?;

        Ok(product_image::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_id: Set(product_id),
            url: Set(input.url),
            provider_ref: Set(input.provider_ref),
            alt_text: Set(input.alt_text),
            position: Set(input.position),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db_pool)
        .await?)
    }

    pub async fn list_images(
        &self,
        store_id: Uuid,
        product_id: Uuid,
    ) -> Result<Vec<product_image::Model>, ServiceError> {
        let product = self
            .get_product(store_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {} not found", product_id)))?;

        Ok(product
            .find_related(ProductImageEntity)
            .order_by_asc(product_image::Column::Position)
            .all(&*self.db_pool)
            .await?)
    }

    /// Removes the row, then tells the image host to drop the asset. The
    /// provider call is best-effort: a failure leaves an orphan at the host,
    /// never a dangling row here.
    #[instrument(skip(self), fields(store_id = %store_id, image_id = %image_id))]
    pub async fn detach_image(
        &self,
        store_id: Uuid,
        product_id: Uuid,
        image_id: Uuid,
    ) -> Result<(), ServiceError> {
        let db = &*self.db_pool;
        self.get_product(store_id, product_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("product {} not found", product_id)))?;

        let image = ProductImageEntity::find_by_id(image_id)
            .filter(product_image::Column::ProductId.eq(product_id))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("image {} not found", image_id)))?;

        let provider_ref = image.provider_ref.clone();
        ProductImageEntity::delete_by_id(image.id).exec(db).await?;

        if let Some(host) = &self.image_host {
            if let Err(e) = host.delete(&provider_ref).await {
                warn!(provider_ref = %provider_ref, error = %e, "image host delete failed; asset orphaned");
            }
        }
        Ok(())
    }
}
