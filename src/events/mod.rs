use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::{backorder_request::BackorderStatus, order::OrderStatus};

/// Events emitted by the services after a state change has committed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Cart events
    CartItemAdded {
        user_id: Uuid,
        variant_id: i32,
    },
    CartCleared(Uuid),
    CartMerged {
        user_id: Uuid,
        merged_items: usize,
    },

    // Checkout events
    OrderPlaced(Uuid),
    CardDebited {
        card_id: Uuid,
        amount: Decimal,
    },

    // Fulfillment events
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    CourierAssigned {
        order_id: Uuid,
        courier_id: Uuid,
    },

    // Backorder events
    BackorderReported {
        order_id: Uuid,
        variant_id: i32,
    },
    BackorderStatusChanged {
        request_id: Uuid,
        new_status: BackorderStatus,
    },
}

/// Cloneable handle for publishing [`Event`]s onto the in-process bus.
#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event, surfacing channel failure to the caller.
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event; a full or closed channel is logged and swallowed.
    /// Used after commit, where the state change must not be failed
    /// retroactively because the bus is down.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event dropped: {}", e);
        }
    }
}

/// Consumer loop for the event bus. Runs until every sender is dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderPlaced(order_id) => {
                info!(order_id = %order_id, "order placed");
            }
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => {
                info!(order_id = %order_id, %old_status, %new_status, "order status changed");
            }
            Event::CardDebited { card_id, amount } => {
                info!(card_id = %card_id, %amount, "simulated card debited");
            }
            Event::CourierAssigned {
                order_id,
                courier_id,
            } => {
                info!(order_id = %order_id, courier_id = %courier_id, "courier assigned");
            }
            other => {
                info!(event = ?other, "event");
            }
        }
    }
}
