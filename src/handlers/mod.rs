pub mod categories;
pub mod common;
pub mod coupons;
pub mod customers;
pub mod designs;
pub mod inventory;
pub mod invoices;
pub mod maintenance;
pub mod offers;
pub mod orders;
pub mod payment_webhooks;
pub mod products;
pub mod quotations;
pub mod shipments;
pub mod storefront;
pub mod stores;

use std::sync::Arc;

use crate::{
    carriers::CarrierClient,
    db::DbPool,
    events::EventSender,
    images::ImageHostClient,
    notifications::EmailClient,
    services,
};

/// Aggregated services handed to the HTTP handlers through `AppState`.
#[derive(Clone)]
pub struct AppServices {
    pub stores: Arc<services::stores::StoreService>,
    pub customers: Arc<services::customers::CustomerService>,
    pub categories: Arc<services::categories::CategoryService>,
    pub products: Arc<services::products::ProductService>,
    pub designs: Arc<services::designs::DesignService>,
    pub inventory: Arc<services::inventory::InventoryService>,
    pub orders: Arc<services::orders::OrderService>,
    pub shipments: Arc<services::shipments::ShipmentService>,
    pub coupons: Arc<services::coupons::CouponService>,
    pub offers: Arc<services::offers::OfferService>,
    pub quotations: Arc<services::quotations::QuotationService>,
    pub invoices: Arc<services::invoices::InvoiceService>,
}

impl AppServices {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<DbPool>,
        event_sender: Arc<EventSender>,
        carrier: Arc<dyn CarrierClient>,
        mailer: Option<Arc<dyn EmailClient>>,
        image_host: Option<Arc<dyn ImageHostClient>>,
        email_from: String,
    ) -> Self {
        Self {
            stores: Arc::new(services::stores::StoreService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            customers: Arc::new(services::customers::CustomerService::new(db.clone())),
            categories: Arc::new(services::categories::CategoryService::new(db.clone())),
            products: Arc::new(services::products::ProductService::new(
                db.clone(),
                image_host,
            )),
            designs: Arc::new(services::designs::DesignService::new(db.clone())),
            inventory: Arc::new(services::inventory::InventoryService::new(db.clone())),
            orders: Arc::new(services::orders::OrderService::new(
                db.clone(),
                Some(event_sender.clone()),
                mailer.clone(),
                email_from.clone(),
            )),
            shipments: Arc::new(services::shipments::ShipmentService::new(
                db.clone(),
                carrier,
                Some(event_sender.clone()),
                mailer,
                email_from,
            )),
            coupons: Arc::new(services::coupons::CouponService::new(
                db.clone(),
                Some(event_sender.clone()),
            )),
            offers: Arc::new(services::offers::OfferService::new(db.clone())),
            quotations: Arc::new(services::quotations::QuotationService::new(
                db.clone(),
                Some(event_sender),
            )),
            invoices: Arc::new(services::invoices::InvoiceService::new(db)),
        }
    }
}
