//! Manual maintenance script: export a store's orders to CSV.
//!
//! `export-orders --database-url postgres://... --store-id <uuid> --output orders.csv`

use clap::Parser;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use shopcore_api::{
    db,
    entities::order::{self, Entity as OrderEntity},
};
use std::path::PathBuf;
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "export-orders", about = "Export a store's orders to CSV")]
struct Args {
    /// Database connection URL; falls back to DATABASE_URL
    #[arg(long)]
    database_url: Option<String>,

    /// Store to export
    #[arg(long)]
    store_id: Uuid,

    /// Output file path
    #[arg(long, default_value = "orders.csv")]
    output: PathBuf,

    /// Include archived orders
    #[arg(long, default_value_t = false)]
    include_archived: bool,
}

fn record_for(order: &order::Model) -> Vec<String> {
    vec![
        order.order_number.clone(),
        order.status.to_string(),
        order.payment_status.to_string(),
        order.customer_id.to_string(),
        order.subtotal.to_string(),
        order.discount_total.to_string(),
        order.shipping_total.to_string(),
        order.total.to_string(),
        order.currency.clone(),
        order.placed_at.to_rfc3339(),
        order
            .paid_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_default(),
    ]
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let url = args
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .ok_or_else(|| anyhow::anyhow!("pass --database-url or set DATABASE_URL"))?;

    let pool = db::establish_connection(&url).await?;

    let mut query = OrderEntity::find()
        .filter(order::Column::StoreId.eq(args.store_id))
        .order_by_asc(order::Column::PlacedAt);
    if !args.include_archived {
        query = query.filter(order::Column::IsArchived.eq(false));
    }
    let orders = query.all(&pool).await?;

    let mut writer = csv::Writer::from_path(&args.output)?;
    writer.write_record([
        "order_number",
        "status",
        "payment_status",
        "customer_id",
        "subtotal",
        "discount_total",
        "shipping_total",
        "total",
        "currency",
        "placed_at",
        "paid_at",
    ])?;
    for order in &orders {
        writer.write_record(record_for(order))?;
    }
    writer.flush()?;

    println!("exported {} orders to {}", orders.len(), args.output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use shopcore_api::entities::order::{OrderStatus, PaymentStatus};

    #[test]
    fn csv_record_has_one_field_per_header() {
        let now = Utc::now();
        let model = order::Model {
            id: Uuid::new_v4(),
            store_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            order_number: "ORD-20260101-000001".into(),
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            payment_reference: None,
            coupon_id: None,
            subtotal: dec!(10),
            discount_total: dec!(0),
            shipping_total: dec!(0),
            total: dec!(10),
            currency: "USD".into(),
            shipping_address: "1 Main St".into(),
            notes: None,
            placed_at: now,
            paid_at: None,
            is_archived: false,
            created_at: now,
            updated_at: now,
            version: 1,
        };
        assert_eq!(record_for(&model).len(), 11);
    }
}
