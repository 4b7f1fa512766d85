use crate::{
    auth::{ensure_role, AuthUser},
    db::DbPool,
    entities::{
        backorder_request::{self, BackorderStatus},
        order::{self, OrderStatus},
        order_line,
        user::UserRole,
        BackorderRequest, Order, OrderLine, User,
    },
    errors::ServiceError,
    events::{Event, EventSender},
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Drives an order through the staff fulfillment state machine.
///
/// The allow-list of target statuses is derived from the transition graph
/// itself, and the acting user is an explicit parameter of every
/// transition: which role may do what is decided here, not by ambient
/// session state.
#[derive(Clone)]
pub struct FulfillmentService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

/// Legal targets from a given status.
///
/// `submitted → preparing → {ready_for_pickup | en_route} → delivered`
pub fn successors(status: OrderStatus) -> &'static [OrderStatus] {
    match status {
        OrderStatus::Submitted => &[OrderStatus::Preparing],
        OrderStatus::Preparing => &[OrderStatus::ReadyForPickup, OrderStatus::EnRoute],
        OrderStatus::ReadyForPickup => &[OrderStatus::Delivered],
        OrderStatus::EnRoute => &[OrderStatus::Delivered],
        OrderStatus::Delivered => &[],
    }
}

impl FulfillmentService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Advances an order to `new_status` on behalf of `actor`.
    ///
    /// Rejects targets not reachable from the current status, enforces
    /// the role owning each edge, gates departures from `preparing` on
    /// unresolved backorders, and assigns the courier when an order goes
    /// en route.
    #[instrument(skip(self, actor), fields(order_id = %order_id, actor_id = %actor.id, new_status = %new_status))]
    pub async fn update_status(
        &self,
        actor: &AuthUser,
        order_id: Uuid,
        new_status: OrderStatus,
        courier_id: Option<Uuid>,
    ) -> Result<order::Model, ServiceError> {
        let txn = self.db.begin().await?;

        let order = Order::find_by_id(order_id)
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let old_status = order.status;
        if !successors(old_status).contains(&new_status) {
            return Err(ServiceError::Conflict(format!(
                "Cannot move order from {} to {}",
                old_status, new_status
            )));
        }

        let mut assigned_courier = order.courier_id;
        match (old_status, new_status) {
            (OrderStatus::Submitted, OrderStatus::Preparing) => {
                ensure_role(actor, UserRole::Warehouse)?;
            }
            (OrderStatus::Preparing, OrderStatus::ReadyForPickup) => {
                ensure_role(actor, UserRole::Warehouse)?;
                if order.delivery_zone_id.is_some() {
                    return Err(ServiceError::InvalidOperation(
                        "Delivery orders leave with a courier, not by pickup".to_string(),
                    ));
                }
                ensure_no_blocking_backorders(&txn, order_id).await?;
            }
            (OrderStatus::Preparing, OrderStatus::EnRoute) => {
                ensure_role(actor, UserRole::Logistics)?;
                if order.delivery_zone_id.is_none() {
                    return Err(ServiceError::InvalidOperation(
                        "Pickup orders are handed over at the store".to_string(),
                    ));
                }
                ensure_no_blocking_backorders(&txn, order_id).await?;

                let courier_id = courier_id.ok_or_else(|| {
                    ServiceError::ValidationError(
                        "A courier must be assigned to send an order en route".to_string(),
                    )
                })?;
                let courier = User::find_by_id(courier_id).one(&txn).await?.ok_or_else(
                    || ServiceError::NotFound(format!("Courier {} not found", courier_id)),
                )?;
                if courier.role != UserRole::Courier || !courier.active {
                    return Err(ServiceError::ValidationError(format!(
                        "User {} is not an available courier",
                        courier_id
                    )));
                }
                assigned_courier = Some(courier_id);
            }
            (OrderStatus::ReadyForPickup, OrderStatus::Delivered) => {
                ensure_role(actor, UserRole::Dispatcher)?;
            }
            (OrderStatus::EnRoute, OrderStatus::Delivered) => {
                ensure_role(actor, UserRole::Courier)?;
                if order.courier_id != Some(actor.id) {
                    return Err(ServiceError::Forbidden(
                        "Only the assigned courier can confirm delivery".to_string(),
                    ));
                }
            }
            (from, to) => {
                return Err(ServiceError::Conflict(format!(
                    "Cannot move order from {} to {}",
                    from, to
                )));
            }
        }

        let mut active: order::ActiveModel = order.into();
        active.status = Set(new_status);
        active.courier_id = Set(assigned_courier);
        active.updated_at = Set(Utc::now());
        let updated = active.update(&txn).await?;

        txn.commit().await?;

        if let (OrderStatus::EnRoute, Some(courier_id)) = (new_status, assigned_courier) {
            self.event_sender
                .send_or_log(Event::CourierAssigned {
                    order_id,
                    courier_id,
                })
                .await;
        }
        self.event_sender
            .send_or_log(Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            })
            .await;

        info!(
            "Order {} moved from {} to {} by {}",
            order_id, old_status, new_status, actor.id
        );
        Ok(updated)
    }

    /// Fetches an order with its frozen lines.
    #[instrument(skip(self))]
    pub async fn get_order(
        &self,
        order_id: Uuid,
    ) -> Result<(order::Model, Vec<order_line::Model>), ServiceError> {
        let order = Order::find_by_id(order_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Order {} not found", order_id)))?;

        let lines = OrderLine::find()
            .filter(order_line::Column::OrderId.eq(order_id))
            .order_by_asc(order_line::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        Ok((order, lines))
    }

    /// Lists orders with pagination, newest first.
    pub async fn list_orders(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<order::Model>, u64), ServiceError> {
        let paginator = Order::find()
            .order_by_desc(order::Column::PlacedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let orders = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok((orders, total))
    }

    /// Lists the orders placed by one user, newest first.
    pub async fn list_orders_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<order::Model>, ServiceError> {
        let orders = Order::find()
            .filter(order::Column::UserId.eq(user_id))
            .order_by_desc(order::Column::PlacedAt)
            .all(&*self.db)
            .await?;

        Ok(orders)
    }
}

/// An order may only leave `preparing` once none of its shortages are
/// still pending or in process.
async fn ensure_no_blocking_backorders(
    conn: &impl ConnectionTrait,
    order_id: Uuid,
) -> Result<(), ServiceError> {
    let blocking = BackorderRequest::find()
        .filter(backorder_request::Column::OrderId.eq(order_id))
        .filter(
            backorder_request::Column::Status
                .is_in([BackorderStatus::Pending, BackorderStatus::InProcess]),
        )
        .count(conn)
        .await?;

    if blocking > 0 {
        return Err(ServiceError::Conflict(format!(
            "Order {} has {} unresolved backorders",
            order_id, blocking
        )));
    }

    Ok(())
}
