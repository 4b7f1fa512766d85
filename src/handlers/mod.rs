pub mod backorders;
pub mod carts;
pub mod common;
pub mod orders;

use crate::db::DbPool;
use crate::events::EventSender;
use crate::services::{
    backorders::BackorderService, cart::CartService, checkout::CheckoutService,
    fulfillment::FulfillmentService, promotions::PromotionService,
};
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub promotions: Arc<PromotionService>,
    pub cart: Arc<CartService>,
    pub checkout: Arc<CheckoutService>,
    pub fulfillment: Arc<FulfillmentService>,
    pub backorders: Arc<BackorderService>,
}

impl AppServices {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        let promotions = Arc::new(PromotionService::new(db.clone()));
        let cart = Arc::new(CartService::new(db.clone(), event_sender.clone()));
        let checkout = Arc::new(CheckoutService::new(db.clone(), event_sender.clone()));
        let fulfillment = Arc::new(FulfillmentService::new(db.clone(), event_sender.clone()));
        let backorders = Arc::new(BackorderService::new(db, event_sender));

        Self {
            promotions,
            cart,
            checkout,
            fulfillment,
            backorders,
        }
    }
}
