use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Many-to-many link between promotions and product variants.
///
/// The schema does not prevent a variant from being linked to several
/// simultaneously active promotions; the resolver breaks ties by lowest
/// promotion id.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "promotion_variants")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub promotion_id: i32,
    #[sea_orm(primary_key, auto_increment = false)]
    pub variant_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::promotion::Entity",
        from = "Column::PromotionId",
        to = "super::promotion::Column::Id"
    )]
    Promotion,
    #[sea_orm(
        belongs_to = "super::product_variant::Entity",
        from = "Column::VariantId",
        to = "super::product_variant::Column::Id"
    )]
    Variant,
}

impl Related<super::promotion::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Promotion.def()
    }
}

impl Related<super::product_variant::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Variant.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
