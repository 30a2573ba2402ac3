use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Carrier-tracked delivery for an order. The quote (rate) and the guide
/// (label + tracking number) both come from the external carrier API and are
/// persisted here by reference.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "shipments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub store_id: Uuid,
    pub order_id: Uuid,
    pub status: ShipmentStatus,
    pub carrier: Option<String>,
    pub service_level: Option<String>,
    pub recipient_name: String,
    #[sea_orm(column_type = "Text")]
    pub shipping_address: String,
    /// Rate identifier returned by the carrier quote call
    pub rate_ref: Option<String>,
    pub rate_amount: Option<Decimal>,
    pub quoted_at: Option<DateTime<Utc>>,
    /// Guide identifier returned by the carrier guide call
    pub guide_ref: Option<String>,
    pub tracking_number: Option<String>,
    pub label_url: Option<String>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Model {
    pub fn has_quote(&self) -> bool {
        self.rate_ref.is_some()
    }

    pub fn has_guide(&self) -> bool {
        self.guide_ref.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
    #[sea_orm(
        belongs_to = "super::store::Entity",
        from = "Column::StoreId",
        to = "super::store::Column::Id"
    )]
    Store,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus {
    #[sea_orm(string_value = "preparing")]
    Preparing,
    #[sea_orm(string_value = "in_transit")]
    InTransit,
    #[sea_orm(string_value = "out_for_delivery")]
    OutForDelivery,
    #[sea_orm(string_value = "delivered")]
    Delivered,
    #[sea_orm(string_value = "exception")]
    Exception,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// Legal successors for each shipment status. Delivered and cancelled are
/// terminal; an exception can resume transit or be cancelled.
pub const ALLOWED_TRANSITIONS: &[(ShipmentStatus, &[ShipmentStatus])] = &[
    (
        ShipmentStatus::Preparing,
        &[ShipmentStatus::InTransit, ShipmentStatus::Cancelled],
    ),
    (
        ShipmentStatus::InTransit,
        &[
            ShipmentStatus::OutForDelivery,
            ShipmentStatus::Delivered,
            ShipmentStatus::Exception,
        ],
    ),
    (
        ShipmentStatus::OutForDelivery,
        &[ShipmentStatus::Delivered, ShipmentStatus::Exception],
    ),
    (ShipmentStatus::Delivered, &[]),
    (
        ShipmentStatus::Exception,
        &[ShipmentStatus::InTransit, ShipmentStatus::Cancelled],
    ),
    (ShipmentStatus::Cancelled, &[]),
];

impl ShipmentStatus {
    /// Statuses this one may move to.
    pub fn allowed_next(&self) -> &'static [ShipmentStatus] {
        ALLOWED_TRANSITIONS
            .iter()
            .find(|(from, _)| from == self)
            .map(|(_, to)| *to)
            .unwrap_or(&[])
    }

    pub fn can_transition_to(&self, target: ShipmentStatus) -> bool {
        self.allowed_next().contains(&target)
    }

    pub fn is_terminal(&self) -> bool {
        self.allowed_next().is_empty()
    }
}

impl fmt::Display for ShipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShipmentStatus::Preparing => write!(f, "preparing"),
            ShipmentStatus::InTransit => write!(f, "in_transit"),
            ShipmentStatus::OutForDelivery => write!(f, "out_for_delivery"),
            ShipmentStatus::Delivered => write!(f, "delivered"),
            ShipmentStatus::Exception => write!(f, "exception"),
            ShipmentStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

impl std::str::FromStr for ShipmentStatus {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "preparing" => Ok(ShipmentStatus::Preparing),
            "in_transit" => Ok(ShipmentStatus::InTransit),
            "out_for_delivery" => Ok(ShipmentStatus::OutForDelivery),
            "delivered" => Ok(ShipmentStatus::Delivered),
            "exception" => Ok(ShipmentStatus::Exception),
            "cancelled" => Ok(ShipmentStatus::Cancelled),
            other => Err(format!("unknown shipment status '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ShipmentStatus::Preparing, ShipmentStatus::InTransit, true)]
    #[case(ShipmentStatus::Preparing, ShipmentStatus::Delivered, false)]
    #[case(ShipmentStatus::Preparing, ShipmentStatus::OutForDelivery, false)]
    #[case(ShipmentStatus::InTransit, ShipmentStatus::Delivered, true)]
    #[case(ShipmentStatus::OutForDelivery, ShipmentStatus::Delivered, true)]
    #[case(ShipmentStatus::Exception, ShipmentStatus::InTransit, true)]
    #[case(ShipmentStatus::Exception, ShipmentStatus::Delivered, false)]
    #[case(ShipmentStatus::Delivered, ShipmentStatus::InTransit, false)]
    #[case(ShipmentStatus::Cancelled, ShipmentStatus::Preparing, false)]
    fn transition_allow_list(
        #[case] from: ShipmentStatus,
        #[case] to: ShipmentStatus,
        #[case] allowed: bool,
    ) {
        assert_eq!(from.can_transition_to(to), allowed, "{from} -> {to}");
    }

    #[test]
    fn delivered_and_cancelled_are_terminal() {
        assert!(ShipmentStatus::Delivered.is_terminal());
        assert!(ShipmentStatus::Cancelled.is_terminal());
        assert!(!ShipmentStatus::Exception.is_terminal());
    }

    #[test]
    fn every_status_has_a_table_row() {
        use sea_orm::Iterable;
        for status in ShipmentStatus::iter() {
            assert!(
                ALLOWED_TRANSITIONS.iter().any(|(from, _)| *from == status),
                "missing transition row for {status}"
            );
        }
    }

    #[test]
    fn no_status_allows_itself() {
        for (from, targets) in ALLOWED_TRANSITIONS {
            assert!(!targets.contains(from), "{from} allows a self-transition");
        }
    }

    #[test]
    fn status_round_trips_through_strings() {
        let status: ShipmentStatus = "out_for_delivery".parse().unwrap();
        assert_eq!(status, ShipmentStatus::OutForDelivery);
        assert_eq!(status.to_string(), "out_for_delivery");
        assert!("teleported".parse::<ShipmentStatus>().is_err());
    }
}
