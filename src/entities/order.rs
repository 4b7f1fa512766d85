use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer order. Created once by checkout; staff actions only ever move
/// `status` forward through the fulfillment state machine. Never deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub placed_at: DateTime<Utc>,
    pub customer_name: String,
    pub customer_surname: String,
    /// Present only for home delivery.
    #[sea_orm(nullable)]
    pub address: Option<String>,
    #[sea_orm(nullable)]
    pub delivery_zone_id: Option<i32>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))", nullable)]
    pub shipping_cost: Option<Decimal>,
    pub payment_method_id: i32,
    /// Set when the order was paid with a simulated card.
    #[sea_orm(nullable)]
    pub card_id: Option<Uuid>,
    pub status: OrderStatus,
    /// Courier assigned when the order goes en route.
    #[sea_orm(nullable)]
    pub courier_id: Option<Uuid>,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_line::Entity")]
    Lines,
    #[sea_orm(has_many = "super::backorder_request::Entity")]
    BackorderRequests,
    #[sea_orm(
        belongs_to = "super::delivery_zone::Entity",
        from = "Column::DeliveryZoneId",
        to = "super::delivery_zone::Column::Id"
    )]
    DeliveryZone,
    #[sea_orm(
        belongs_to = "super::payment_method::Entity",
        from = "Column::PaymentMethodId",
        to = "super::payment_method::Column::Id"
    )]
    PaymentMethod,
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::UserId",
        to = "super::user::Column::Id"
    )]
    User,
}

impl Related<super::order_line::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Lines.def()
    }
}

impl Related<super::backorder_request::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BackorderRequests.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Fulfillment status of an order.
///
/// `submitted → preparing → {ready_for_pickup | en_route} → delivered`.
/// The legal transitions (and which staff role may trigger each) live in
/// the fulfillment service.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    strum::Display,
    strum::EnumString,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum OrderStatus {
    #[sea_orm(string_value = "submitted")]
    Submitted,
    #[sea_orm(string_value = "preparing")]
    Preparing,
    #[sea_orm(string_value = "ready_for_pickup")]
    ReadyForPickup,
    #[sea_orm(string_value = "en_route")]
    EnRoute,
    #[sea_orm(string_value = "delivered")]
    Delivered,
}
