//! OpenAPI document and Swagger UI mounting.

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Shopcore API",
        description = "Multi-tenant e-commerce backend: catalog, inventory, orders, shipments, discounts, quotations and invoicing."
    ),
    paths(
        handlers::stores::list_stores,
        handlers::stores::create_store,
        handlers::stores::get_store,
        handlers::stores::update_store,
        handlers::stores::archive_store,
        handlers::categories::list_categories,
        handlers::categories::create_category,
        handlers::categories::get_category,
        handlers::categories::update_category,
        handlers::categories::delete_category,
        handlers::products::list_products,
        handlers::products::create_product,
        handlers::products::get_product,
        handlers::products::update_product,
        handlers::products::archive_product,
        handlers::products::list_product_images,
        handlers::products::attach_product_image,
        handlers::products::detach_product_image,
        handlers::designs::list_designs,
        handlers::designs::create_design,
        handlers::designs::get_design,
        handlers::designs::update_design,
        handlers::designs::publish_design,
        handlers::designs::delete_design,
        handlers::inventory::list_inventory,
        handlers::inventory::list_low_stock,
        handlers::inventory::get_inventory_level,
        handlers::inventory::set_inventory_level,
        handlers::inventory::adjust_inventory,
        handlers::orders::list_orders,
        handlers::orders::create_order,
        handlers::orders::get_order,
        handlers::orders::update_order_status,
        handlers::orders::pay_order,
        handlers::orders::cancel_order,
        handlers::orders::archive_order,
        handlers::shipments::list_shipments,
        handlers::shipments::create_shipment,
        handlers::shipments::get_shipment,
        handlers::shipments::update_shipment_status,
        handlers::shipments::bulk_update_shipment_status,
        handlers::shipments::quote_shipment,
        handlers::shipments::create_shipment_guide,
        handlers::shipments::track_by_number,
        handlers::coupons::list_coupons,
        handlers::coupons::create_coupon,
        handlers::coupons::get_coupon,
        handlers::coupons::update_coupon,
        handlers::coupons::delete_coupon,
        handlers::coupons::validate_coupon,
        handlers::offers::list_offers,
        handlers::offers::create_offer,
        handlers::offers::get_offer,
        handlers::offers::update_offer,
        handlers::offers::delete_offer,
        handlers::quotations::list_quotations,
        handlers::quotations::create_quotation,
        handlers::quotations::get_quotation,
        handlers::quotations::send_quotation,
        handlers::quotations::accept_quotation,
        handlers::quotations::decline_quotation,
        handlers::quotations::convert_quotation,
        handlers::invoices::list_invoices,
        handlers::invoices::get_invoice,
        handlers::invoices::get_order_invoice,
        handlers::customers::list_customers,
        handlers::customers::create_customer,
        handlers::customers::get_customer,
        handlers::customers::update_customer,
        handlers::customers::delete_customer,
        handlers::storefront::catalog,
        handlers::storefront::product_detail,
        handlers::storefront::active_offers,
        handlers::storefront::published_design,
        handlers::storefront::validate_coupon,
        handlers::maintenance::discount_sweep,
        handlers::payment_webhooks::payment_webhook,
    ),
    components(schemas(
        crate::errors::ErrorResponse,
        handlers::stores::StoreSummary,
        handlers::categories::CategorySummary,
        handlers::products::ProductSummary,
        handlers::products::ProductImageSummary,
        handlers::designs::DesignSummary,
        handlers::inventory::InventoryLevelSummary,
        handlers::orders::OrderSummary,
        handlers::orders::OrderItemSummary,
        handlers::shipments::ShipmentSummary,
        handlers::coupons::CouponSummary,
        handlers::offers::OfferSummary,
        handlers::quotations::QuotationSummary,
        handlers::quotations::QuotationItemSummary,
        handlers::invoices::InvoiceSummary,
        handlers::customers::CustomerSummary,
        handlers::maintenance::SweepReport,
    )),
    tags(
        (name = "stores", description = "Tenant management"),
        (name = "catalog", description = "Categories, products and images"),
        (name = "designs", description = "Storefront design documents"),
        (name = "inventory", description = "Stock levels and thresholds"),
        (name = "orders", description = "Order lifecycle and payment"),
        (name = "shipments", description = "Shipments, rates and guides"),
        (name = "discounts", description = "Coupons and offers"),
        (name = "quotations", description = "Price proposals"),
        (name = "invoices", description = "Issued invoices"),
        (name = "customers", description = "Store customers"),
        (name = "storefront", description = "Public storefront surface"),
        (name = "maintenance", description = "Cron-driven maintenance"),
        (name = "payments", description = "Payment provider webhooks")
    )
)]
pub struct ApiDoc;

pub fn swagger_ui() -> SwaggerUi {
    SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi())
}
