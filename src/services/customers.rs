use crate::{
    db::DbPool,
    entities::customer::{self, Entity as CustomerEntity},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

#[derive(Clone)]
pub struct CustomerService {
    db_pool: Arc<DbPool>,
}

pub struct CreateCustomerInput {
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub shipping_address: Option<String>,
}

#[derive(Default)]
pub struct UpdateCustomerInput {
    pub name: Option<String>,
    pub phone: Option<Option<String>>,
    pub shipping_address: Option<Option<String>>,
}

impl CustomerService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, email = %input.email))]
    pub async fn create_customer(
        &self,
        store_id: Uuid,
        input: CreateCustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        let db = &*self.db_pool;

        let existing = CustomerEntity::find()
            .filter(customer::Column::StoreId.eq(store_id))
            .filter(customer::Column::Email.eq(input.email.clone()))
            .one(db)
            .await?;
        if existing.is_some() {
            return Err(ServiceError::Conflict(format!(
                "customer '{}' already exists for this store",
                input.email
            )));
        }

        let now = Utc::now();
        Ok(customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            email: Set(input.email),
            name: Set(input.name),
            phone: Set(input.phone),
            shipping_address: Set(input.shipping_address),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?)
    }

    pub async fn get_customer(
        &self,
        store_id: Uuid,
        customer_id: Uuid,
    ) -> Result<Option<customer::Model>, ServiceError> {
        Ok(CustomerEntity::find_by_id(customer_id)
            .filter(customer::Column::StoreId.eq(store_id))
            .one(&*self.db_pool)
            .await?)
    }

    pub async fn list_customers(
        &self,
        store_id: Uuid,
        page: u64,
        limit: u64,
    ) -> Result<(Vec<customer::Model>, u64), ServiceError> {
        let paginator = CustomerEntity::find()
            .filter(customer::Column::StoreId.eq(store_id))
            .order_by_desc(customer::Column::CreatedAt)
            .paginate(&*self.db_pool, limit);
        let total = paginator.num_items().await?;
        let customers = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((customers, total))
    }

    #[instrument(skip(self, input), fields(store_id = %store_id, customer_id = %customer_id))]
    pub async fn update_customer(
        &self,
        store_id: Uuid,
        customer_id: Uuid,
        input: UpdateCustomerInput,
    ) -> Result<customer::Model, ServiceError> {
        let customer = self
            .get_customer(store_id, customer_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("customer {} not found", customer_id)))?;

        let mut active: customer::ActiveModel = customer.into();
        if let Some(name) = input.name {
            active.name = Set(name);
        }
        if let Some(phone) = input.phone {
            active.phone = Set(phone);
        }
        if let Some(address) = input.shipping_address {
            active.shipping_address = Set(address);
        }
        active.updated_at = Set(Utc::now());
        Ok(active.update(&*self.db_pool).await?)
    }

    #[instrument(skip(self), fields(store_id = %store_id, customer_id = %customer_id))]
    pub async fn delete_customer(
        &self,
        store_id: Uuid,
        customer_id: Uuid,
    ) -> Result<(), ServiceError> {
        let customer = self
            .get_customer(store_id, customer_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("customer {} not found", customer_id)))?;
        CustomerEntity::delete_by_id(customer.id)
            .exec(&*self.db_pool)
            .await?;
        Ok(())
    }
}
