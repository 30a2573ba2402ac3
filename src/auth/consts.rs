//! Permission strings carried in session-token claims.

pub const ADMIN: &str = "admin";

pub const STORES_READ: &str = "stores:read";
pub const STORES_WRITE: &str = "stores:write";

pub const CATALOG_READ: &str = "catalog:read";
pub const CATALOG_WRITE: &str = "catalog:write";

pub const INVENTORY_READ: &str = "inventory:read";
pub const INVENTORY_WRITE: &str = "inventory:write";

pub const ORDERS_READ: &str = "orders:read";
pub const ORDERS_WRITE: &str = "orders:write";

pub const SHIPMENTS_READ: &str = "shipments:read";
pub const SHIPMENTS_WRITE: &str = "shipments:write";

pub const DISCOUNTS_READ: &str = "discounts:read";
pub const DISCOUNTS_WRITE: &str = "discounts:write";

pub const QUOTATIONS_READ: &str = "quotations:read";
pub const QUOTATIONS_WRITE: &str = "quotations:write";

pub const INVOICES_READ: &str = "invoices:read";

pub const CUSTOMERS_READ: &str = "customers:read";
pub const CUSTOMERS_WRITE: &str = "customers:write";
