use crate::{auth::AuthUser, errors::ServiceError};
use std::str::FromStr;
use uuid::Uuid;

/// Tenant gate: 403 when the session does not cover the store in the path.
pub fn ensure_store_access(user: &AuthUser, store_id: Uuid) -> Result<(), ServiceError> {
    if user.can_access_store(store_id) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "session has no access to store {}",
            store_id
        )))
    }
}

pub fn page_or_default(page: Option<u64>) -> u64 {
    page.unwrap_or(1).max(1)
}

pub fn limit_or_default(limit: Option<u64>) -> u64 {
    limit.unwrap_or(20).clamp(1, 100)
}

/// Parses an optional status query parameter, mapping bad values to 400.
pub fn parse_status<T>(raw: Option<String>) -> Result<Option<T>, ServiceError>
where
    T: FromStr<Err = String>,
{
    raw.map(|value| value.parse::<T>().map_err(ServiceError::ValidationError))
        .transpose()
}

pub fn total_pages(total: u64, limit: u64) -> u64 {
    if limit == 0 {
        0
    } else {
        (total + limit - 1) / limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::shipment::ShipmentStatus;

    #[test]
    fn pagination_defaults_and_clamps() {
        assert_eq!(page_or_default(None), 1);
        assert_eq!(page_or_default(Some(0)), 1);
        assert_eq!(limit_or_default(None), 20);
        assert_eq!(limit_or_default(Some(1000)), 100);
        assert_eq!(total_pages(41, 20), 3);
        assert_eq!(total_pages(0, 20), 0);
    }

    #[test]
    fn bad_status_becomes_validation_error() {
        let parsed = parse_status::<ShipmentStatus>(Some("warp_speed".into()));
        assert!(matches!(parsed, Err(ServiceError::ValidationError(_))));

        let parsed = parse_status::<ShipmentStatus>(Some("preparing".into())).unwrap();
        assert_eq!(parsed, Some(ShipmentStatus::Preparing));
    }

    #[test]
    fn store_access_is_enforced() {
        let store_id = Uuid::new_v4();
        let user = AuthUser {
            subject: "u".into(),
            email: None,
            name: None,
            store_ids: vec![store_id],
            permissions: vec![],
            token_id: "t".into(),
        };
        assert!(ensure_store_access(&user, store_id).is_ok());
        assert!(ensure_store_access(&user, Uuid::new_v4()).is_err());
    }
}
