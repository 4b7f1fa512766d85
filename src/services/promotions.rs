use crate::{
    db::DbPool,
    entities::{
        promotion::{self, PromotionKind},
        promotion_variant, Promotion,
    },
    errors::ServiceError,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, ConnectionTrait, EntityTrait, JoinType, QueryFilter, QueryOrder, QuerySelect,
    RelationTrait,
};
use std::sync::Arc;
use tracing::instrument;

/// Resolves which promotion, if any, applies to a variant at a point in
/// time, and computes the discounted price.
#[derive(Clone)]
pub struct PromotionService {
    db: Arc<DbPool>,
}

impl PromotionService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Returns the single promotion applicable to `variant_id` at `as_of`.
    ///
    /// A promotion applies iff it is active, its window contains `as_of`
    /// and the variant is linked to it. Nothing stops a variant from being
    /// linked to several live promotions at once; ties are broken by
    /// lowest promotion id.
    #[instrument(skip(self))]
    pub async fn resolve(
        &self,
        variant_id: i32,
        as_of: DateTime<Utc>,
    ) -> Result<Option<promotion::Model>, ServiceError> {
        resolve_for_variant(&*self.db, variant_id, as_of).await
    }
}

/// Query form of [`PromotionService::resolve`] usable inside a transaction.
pub async fn resolve_for_variant(
    conn: &impl ConnectionTrait,
    variant_id: i32,
    as_of: DateTime<Utc>,
) -> Result<Option<promotion::Model>, ServiceError> {
    let promotion = Promotion::find()
        .join(JoinType::InnerJoin, promotion::Relation::VariantLinks.def())
        .filter(promotion_variant::Column::VariantId.eq(variant_id))
        .filter(promotion::Column::Active.eq(true))
        .filter(promotion::Column::StartsAt.lte(as_of))
        .filter(promotion::Column::EndsAt.gte(as_of))
        .order_by_asc(promotion::Column::Id)
        .one(conn)
        .await?;

    Ok(promotion)
}

/// Fetches `promotion_id` if it is active and linked to `variant_id`.
/// This is the stamp-time check used when a cart item names a promotion
/// explicitly; the time window is enforced later, at pricing time.
pub async fn linked_active_promotion(
    conn: &impl ConnectionTrait,
    promotion_id: i32,
    variant_id: i32,
) -> Result<promotion::Model, ServiceError> {
    Promotion::find_by_id(promotion_id)
        .join(JoinType::InnerJoin, promotion::Relation::VariantLinks.def())
        .filter(promotion_variant::Column::VariantId.eq(variant_id))
        .filter(promotion::Column::Active.eq(true))
        .one(conn)
        .await?
        .ok_or_else(|| {
            ServiceError::ValidationError(format!(
                "Promotion {} is not available for variant {}",
                promotion_id, variant_id
            ))
        })
}

/// Fetches `promotion_id` only while it is live for `variant_id`: active,
/// linked, and within its window at `as_of`. Pricing uses this so a
/// promotion that was deactivated or expired after being stamped onto a
/// cart item silently stops discounting.
pub async fn live_linked_promotion(
    conn: &impl ConnectionTrait,
    promotion_id: i32,
    variant_id: i32,
    as_of: DateTime<Utc>,
) -> Result<Option<promotion::Model>, ServiceError> {
    let promotion = Promotion::find_by_id(promotion_id)
        .join(JoinType::InnerJoin, promotion::Relation::VariantLinks.def())
        .filter(promotion_variant::Column::VariantId.eq(variant_id))
        .filter(promotion::Column::Active.eq(true))
        .filter(promotion::Column::StartsAt.lte(as_of))
        .filter(promotion::Column::EndsAt.gte(as_of))
        .one(conn)
        .await?;

    Ok(promotion)
}

/// Price of a variant under a promotion.
///
/// Percentage promotions discount proportionally; fixed-price promotions
/// replace the price outright. The replacement value is not validated to
/// sit below the base price, and the result is never clamped at zero.
pub fn discounted_price(promotion: &promotion::Model, base_price: Decimal) -> Decimal {
    match promotion.kind {
        PromotionKind::Percentage => {
            base_price * (Decimal::ONE - promotion.value / Decimal::ONE_HUNDRED)
        }
        PromotionKind::FixedPrice => promotion.value,
    }
}
