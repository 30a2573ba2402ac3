use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

/// Lifecycle events emitted by the services. Consumed in-process by
/// `process_events`; the processor is the single place to fan these out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    StoreCreated(Uuid),

    OrderCreated(Uuid),
    OrderPaid {
        order_id: Uuid,
        payment_reference: String,
    },
    OrderStatusChanged {
        order_id: Uuid,
        old_status: String,
        new_status: String,
    },
    OrderCancelled(Uuid),

    ShipmentCreated(Uuid),
    ShipmentStatusChanged {
        shipment_id: Uuid,
        old_status: String,
        new_status: String,
    },
    ShipmentQuoted {
        shipment_id: Uuid,
        rate_ref: String,
    },
    ShipmentGuideCreated {
        shipment_id: Uuid,
        guide_ref: String,
    },

    CouponRedeemed {
        coupon_id: Uuid,
        order_id: Uuid,
    },
    DiscountSweepCompleted {
        coupons_activated: u64,
        coupons_deactivated: u64,
        offers_activated: u64,
        offers_deactivated: u64,
        swept_at: DateTime<Utc>,
    },

    QuotationConverted {
        quotation_id: Uuid,
        order_id: Uuid,
    },
    InvoiceIssued(Uuid),
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event; failure means the processor is gone, which the
    /// caller treats as non-fatal.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("failed to send event: {}", e))
    }
}

/// Drains the event channel for the lifetime of the process.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("event processor started");
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderPaid {
                order_id,
                payment_reference,
            } => {
                info!(order_id = %order_id, payment_reference = %payment_reference, "order paid");
            }
            Event::ShipmentStatusChanged {
                shipment_id,
                old_status,
                new_status,
            } => {
                info!(shipment_id = %shipment_id, old_status = %old_status, new_status = %new_status, "shipment status changed");
            }
            Event::DiscountSweepCompleted {
                coupons_activated,
                coupons_deactivated,
                offers_activated,
                offers_deactivated,
                ..
            } => {
                info!(
                    coupons_activated,
                    coupons_deactivated, offers_activated, offers_deactivated, "discount sweep completed"
                );
            }
            other => debug!(event = ?other, "event processed"),
        }
    }
    info!("event processor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_flow_through_channel() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        let order_id = Uuid::new_v4();
        sender.send(Event::OrderCreated(order_id)).await.unwrap();

        match rx.recv().await {
            Some(Event::OrderCreated(id)) => assert_eq!(id, order_id),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn send_fails_after_receiver_drops() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::StoreCreated(Uuid::new_v4())).await.is_err());
    }
}
