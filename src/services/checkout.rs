use crate::{
    db::DbPool,
    entities::{
        cart_item, order,
        order::OrderStatus,
        order_line,
        payment_method::PaymentMethodKind,
        simulated_card, CartItem, DeliveryZone, PaymentMethod, SimulatedCard,
    },
    errors::ServiceError,
    events::{Event, EventSender},
    services::cart,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Converts a cart into an order.
///
/// Every effect of a checkout — the simulated-card debit, the order row,
/// the frozen order lines and the cart wipe — happens inside a single
/// transaction. A failure at any step leaves no trace.
#[derive(Clone)]
pub struct CheckoutService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CheckoutService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Places an order from the user's cart.
    ///
    /// Preconditions are checked in order, each a distinct failure:
    /// required fields, live payment method, non-empty cart, delivery
    /// zone/address coherence, and card funds for the card branch.
    #[instrument(skip(self, input), fields(user_id = %user_id, payment_method_id = input.payment_method_id))]
    pub async fn place_order(
        &self,
        user_id: Uuid,
        input: PlaceOrderInput,
    ) -> Result<PlacedOrder, ServiceError> {
        if input.customer_name.trim().is_empty() || input.customer_surname.trim().is_empty() {
            return Err(ServiceError::ValidationError(
                "Name and surname are required".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        let method = PaymentMethod::find_by_id(input.payment_method_id)
            .one(&txn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!(
                    "Payment method {} not found",
                    input.payment_method_id
                ))
            })?;
        if !method.active {
            return Err(ServiceError::ValidationError(format!(
                "Payment method {} is not available",
                method.name
            )));
        }

        let items = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .all(&txn)
            .await?;
        if items.is_empty() {
            return Err(ServiceError::ValidationError("Cart is empty".to_string()));
        }

        // Price inside the transaction so the frozen lines match exactly
        // what the summary said at this instant.
        let priced = cart::price_items(&txn, &items).await?;
        let summary = cart::compute_summary(&priced);

        let (address, delivery_zone_id, shipping_cost) = match input.delivery_zone_id {
            Some(zone_id) => {
                let zone = DeliveryZone::find_by_id(zone_id).one(&txn).await?.ok_or_else(
                    || ServiceError::NotFound(format!("Delivery zone {} not found", zone_id)),
                )?;
                if !zone.active {
                    return Err(ServiceError::ValidationError(format!(
                        "Delivery zone {} is not available",
                        zone.district
                    )));
                }
                let address = input
                    .address
                    .as_deref()
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ServiceError::ValidationError(
                            "Address is required for home delivery".to_string(),
                        )
                    })?;
                (Some(address), Some(zone_id), Some(zone.cost))
            }
            // Store pickup: no address, no shipping cost.
            None => (None, None, None),
        };

        let total = summary.total + shipping_cost.unwrap_or(Decimal::ZERO);

        let card_id = match method.kind {
            PaymentMethodKind::Cash => None,
            PaymentMethodKind::SimulatedCard => {
                let card_id = input.card_id.ok_or_else(|| {
                    ServiceError::ValidationError(
                        "A simulated card is required for this payment method".to_string(),
                    )
                })?;
                let card = SimulatedCard::find_by_id(card_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| {
                        ServiceError::NotFound(format!("Card {} not found", card_id))
                    })?;
                if card.user_id != user_id {
                    return Err(ServiceError::Forbidden(
                        "Card does not belong to this user".to_string(),
                    ));
                }
                if card.balance < total {
                    return Err(ServiceError::PaymentFailed(
                        "Insufficient card balance".to_string(),
                    ));
                }

                // Conditional debit: the balance guard is re-applied in the
                // statement itself so a concurrent checkout against the same
                // card cannot overdraw it.
                let debit = SimulatedCard::update_many()
                    .col_expr(
                        simulated_card::Column::Balance,
                        Expr::col(simulated_card::Column::Balance).sub(total),
                    )
                    .col_expr(simulated_card::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(simulated_card::Column::Id.eq(card_id))
                    .filter(simulated_card::Column::Balance.gte(total))
                    .exec(&txn)
                    .await?;
                if debit.rows_affected == 0 {
                    return Err(ServiceError::PaymentFailed(
                        "Insufficient card balance".to_string(),
                    ));
                }

                Some(card_id)
            }
        };

        let order_id = Uuid::new_v4();
        let now = Utc::now();
        let order = order::ActiveModel {
            id: Set(order_id),
            placed_at: Set(now),
            customer_name: Set(input.customer_name.trim().to_string()),
            customer_surname: Set(input.customer_surname.trim().to_string()),
            address: Set(address),
            delivery_zone_id: Set(delivery_zone_id),
            shipping_cost: Set(shipping_cost),
            payment_method_id: Set(method.id),
            card_id: Set(card_id),
            status: Set(OrderStatus::Submitted),
            courier_id: Set(None),
            user_id: Set(user_id),
            created_at: Set(now),
            updated_at: Set(now),
        };
        order.insert(&txn).await?;

        for item in &priced {
            let line = order_line::ActiveModel {
                id: Set(Uuid::new_v4()),
                order_id: Set(order_id),
                product_id: Set(item.product_id),
                variant_id: Set(item.variant_id),
                quantity: Set(item.quantity),
                unit_price: Set(item.unit_price),
                promotion_price: Set(item.discounted_price),
                subtotal: Set(item.subtotal),
                status: Set("confirmed".to_string()),
                promotion_id: Set(item.promotion_id),
                created_at: Set(now),
            };
            line.insert(&txn).await?;
        }

        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        if let Some(card_id) = card_id {
            self.event_sender
                .send_or_log(Event::CardDebited {
                    card_id,
                    amount: total,
                })
                .await;
        }
        self.event_sender
            .send_or_log(Event::OrderPlaced(order_id))
            .await;

        info!(
            "Order {} placed by user {}: {} lines, total {}",
            order_id,
            user_id,
            priced.len(),
            total
        );

        Ok(PlacedOrder {
            order_id,
            subtotal: summary.subtotal,
            discount: summary.discount,
            shipping_cost,
            total,
        })
    }
}

/// Input for placing an order
#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderInput {
    pub customer_name: String,
    pub customer_surname: String,
    pub payment_method_id: i32,
    pub delivery_zone_id: Option<i32>,
    pub address: Option<String>,
    pub card_id: Option<Uuid>,
}

/// Result of a successful checkout
#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order_id: Uuid,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub shipping_cost: Option<Decimal>,
    pub total: Decimal,
}
