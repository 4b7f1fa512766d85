use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment method offered at checkout. Admin-managed reference data.
///
/// `kind` drives the checkout branch: plain cash settlement or a debit
/// against a simulated stored-value card. A typed column instead of a
/// reserved magic id keeps the branch exhaustive.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payment_methods")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub kind: PaymentMethodKind,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Settlement behavior of a payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(20))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethodKind {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "simulated_card")]
    SimulatedCard,
}
