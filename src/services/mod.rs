pub mod categories;
pub mod coupons;
pub mod customers;
pub mod designs;
pub mod inventory;
pub mod invoices;
pub mod offers;
pub mod orders;
pub mod products;
pub mod quotations;
pub mod shipments;
pub mod stores;

use chrono::Utc;
use rand::Rng;

/// Human-facing document number, e.g. `ORD-20260302-049213`. Uniqueness is
/// enforced by the per-store unique index; the random suffix keeps
/// collisions out of normal operation.
pub(crate) fn generate_number(prefix: &str) -> String {
    let suffix: u32 = rand::thread_rng().gen_range(0..1_000_000);
    format!("{}-{}-{:06}", prefix, Utc::now().format("%Y%m%d"), suffix)
}

#[cfg(test)]
mod tests {
    use super::generate_number;

    #[test]
    fn numbers_carry_prefix_and_date() {
        let number = generate_number("ORD");
        assert!(number.starts_with("ORD-"));
        assert_eq!(number.split('-').count(), 3);
    }
}
