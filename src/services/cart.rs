use crate::{
    db::DbPool,
    entities::{cart_item, product_variant, CartItem, Product, ProductVariant},
    errors::ServiceError,
    events::{Event, EventSender},
    services::promotions,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// Per-user shopping cart.
///
/// Cart rows store only variant references and quantities; prices and
/// discounts are joined from the live catalog and promotion state on every
/// read. A stamped promotion that has since been deactivated, unlinked or
/// fallen outside its window simply stops discounting.
#[derive(Clone)]
pub struct CartService {
    db: Arc<DbPool>,
    event_sender: Arc<EventSender>,
}

impl CartService {
    pub fn new(db: Arc<DbPool>, event_sender: Arc<EventSender>) -> Self {
        Self { db, event_sender }
    }

    /// Returns the user's cart priced against the current catalog state.
    #[instrument(skip(self))]
    pub async fn get_cart(&self, user_id: Uuid) -> Result<PricedCart, ServiceError> {
        let items = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .order_by_asc(cart_item::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        let priced = price_items(&*self.db, &items).await?;
        let summary = compute_summary(&priced);

        Ok(PricedCart {
            items: priced,
            summary,
        })
    }

    /// Adds a variant to the cart, or bumps the quantity of the existing
    /// row for the same variant.
    ///
    /// On an existing row the stored promotion reference is overwritten
    /// unconditionally with this call's `promotion_id` — including `None`,
    /// which drops a previously applied promotion.
    #[instrument(skip(self))]
    pub async fn add_item(
        &self,
        user_id: Uuid,
        input: AddItemInput,
    ) -> Result<PricedCart, ServiceError> {
        if input.quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let txn = self.db.begin().await?;

        validate_line_target(&txn, input.product_id, input.variant_id).await?;
        if let Some(promotion_id) = input.promotion_id {
            promotions::linked_active_promotion(&txn, promotion_id, input.variant_id).await?;
        }

        let existing = CartItem::find()
            .filter(cart_item::Column::UserId.eq(user_id))
            .filter(cart_item::Column::VariantId.eq(input.variant_id))
            .one(&txn)
            .await?;

        if let Some(item) = existing {
            // Atomic increment so two concurrent adds cannot lose an update.
            CartItem::update_many()
                .col_expr(
                    cart_item::Column::Quantity,
                    Expr::col(cart_item::Column::Quantity).add(input.quantity),
                )
                .col_expr(
                    cart_item::Column::PromotionId,
                    Expr::value(input.promotion_id),
                )
                .col_expr(cart_item::Column::UpdatedAt, Expr::value(Utc::now()))
                .filter(cart_item::Column::Id.eq(item.id))
                .exec(&txn)
                .await?;
        } else {
            let item = cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                user_id: Set(user_id),
                product_id: Set(input.product_id),
                variant_id: Set(input.variant_id),
                quantity: Set(input.quantity),
                promotion_id: Set(input.promotion_id),
                created_at: Set(Utc::now()),
                updated_at: Set(Utc::now()),
            };
            item.insert(&txn).await?;
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartItemAdded {
                user_id,
                variant_id: input.variant_id,
            })
            .await;

        info!(
            "Added variant {} x{} to cart of user {}",
            input.variant_id, input.quantity, user_id
        );
        self.get_cart(user_id).await
    }

    /// Sets the quantity of an owned cart item. Zero and negative
    /// quantities are rejected; removal has its own endpoint.
    #[instrument(skip(self))]
    pub async fn set_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> Result<PricedCart, ServiceError> {
        if quantity < 1 {
            return Err(ServiceError::ValidationError(
                "Quantity must be at least 1".to_string(),
            ));
        }

        let item = self.owned_item(user_id, item_id).await?;

        let mut item: cart_item::ActiveModel = item.into();
        item.quantity = Set(quantity);
        item.updated_at = Set(Utc::now());
        item.update(&*self.db).await?;

        self.get_cart(user_id).await
    }

    /// Removes an owned cart item.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<PricedCart, ServiceError> {
        let item = self.owned_item(user_id, item_id).await?;

        CartItem::delete_by_id(item.id).exec(&*self.db).await?;

        self.get_cart(user_id).await
    }

    /// Empties the user's cart.
    #[instrument(skip(self))]
    pub async fn clear(&self, user_id: Uuid) -> Result<(), ServiceError> {
        CartItem::delete_many()
            .filter(cart_item::Column::UserId.eq(user_id))
            .exec(&*self.db)
            .await?;

        self.event_sender.send_or_log(Event::CartCleared(user_id)).await;

        info!("Cleared cart of user {}", user_id);
        Ok(())
    }

    /// Re-stamps (or clears) the promotion reference of an owned item,
    /// with the same validation as `add_item`.
    #[instrument(skip(self))]
    pub async fn apply_promotion(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        promotion_id: Option<i32>,
    ) -> Result<PricedCart, ServiceError> {
        let item = self.owned_item(user_id, item_id).await?;

        if let Some(promotion_id) = promotion_id {
            promotions::linked_active_promotion(&*self.db, promotion_id, item.variant_id).await?;
        }

        let mut item: cart_item::ActiveModel = item.into();
        item.promotion_id = Set(promotion_id);
        item.updated_at = Set(Utc::now());
        item.update(&*self.db).await?;

        self.get_cart(user_id).await
    }

    /// Merges an anonymous local cart into the account cart at login.
    ///
    /// The whole batch runs in one transaction: a failing entry rolls the
    /// merge back completely, so the caller keeps its local copy and can
    /// retry. Conflicting variants get their quantities summed; the
    /// account row's promotion reference is kept, the server being the
    /// source of truth for pricing.
    #[instrument(skip(self, items), fields(count = items.len()))]
    pub async fn merge_local_cart(
        &self,
        user_id: Uuid,
        items: Vec<LocalCartItem>,
    ) -> Result<PricedCart, ServiceError> {
        let merged_items = items.len();
        let txn = self.db.begin().await?;

        for local in items {
            if local.quantity < 1 {
                return Err(ServiceError::ValidationError(format!(
                    "Quantity for variant {} must be at least 1",
                    local.variant_id
                )));
            }

            validate_line_target(&txn, local.product_id, local.variant_id).await?;
            if let Some(promotion_id) = local.promotion_id {
                promotions::linked_active_promotion(&txn, promotion_id, local.variant_id).await?;
            }

            let existing = CartItem::find()
                .filter(cart_item::Column::UserId.eq(user_id))
                .filter(cart_item::Column::VariantId.eq(local.variant_id))
                .one(&txn)
                .await?;

            if let Some(item) = existing {
                CartItem::update_many()
                    .col_expr(
                        cart_item::Column::Quantity,
                        Expr::col(cart_item::Column::Quantity).add(local.quantity),
                    )
                    .col_expr(cart_item::Column::UpdatedAt, Expr::value(Utc::now()))
                    .filter(cart_item::Column::Id.eq(item.id))
                    .exec(&txn)
                    .await?;
            } else {
                let item = cart_item::ActiveModel {
                    id: Set(Uuid::new_v4()),
                    user_id: Set(user_id),
                    product_id: Set(local.product_id),
                    variant_id: Set(local.variant_id),
                    quantity: Set(local.quantity),
                    promotion_id: Set(local.promotion_id),
                    created_at: Set(Utc::now()),
                    updated_at: Set(Utc::now()),
                };
                item.insert(&txn).await?;
            }
        }

        txn.commit().await?;

        self.event_sender
            .send_or_log(Event::CartMerged {
                user_id,
                merged_items,
            })
            .await;

        info!("Merged {} local items into cart of user {}", merged_items, user_id);
        self.get_cart(user_id).await
    }

    async fn owned_item(
        &self,
        user_id: Uuid,
        item_id: Uuid,
    ) -> Result<cart_item::Model, ServiceError> {
        let item = CartItem::find_by_id(item_id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Cart item {} not found", item_id)))?;

        if item.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Cart item does not belong to this user".to_string(),
            ));
        }

        Ok(item)
    }
}

/// Checks that the product is active, the variant is active, and the
/// variant belongs to the product.
async fn validate_line_target(
    conn: &impl ConnectionTrait,
    product_id: i32,
    variant_id: i32,
) -> Result<product_variant::Model, ServiceError> {
    let product = Product::find_by_id(product_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", product_id)))?;
    if !product.active {
        return Err(ServiceError::ValidationError(format!(
            "Product {} is not available",
            product_id
        )));
    }

    let variant = ProductVariant::find_by_id(variant_id)
        .one(conn)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Variant {} not found", variant_id)))?;
    if !variant.active {
        return Err(ServiceError::ValidationError(format!(
            "Variant {} is not available",
            variant_id
        )));
    }
    if variant.product_id != product_id {
        return Err(ServiceError::ValidationError(format!(
            "Variant {} does not belong to product {}",
            variant_id, product_id
        )));
    }

    Ok(variant)
}

/// Prices stored cart rows against the current variant and promotion
/// state. Shared with checkout, which runs it inside its transaction to
/// freeze exactly what the customer saw.
pub(crate) async fn price_items(
    conn: &impl ConnectionTrait,
    items: &[cart_item::Model],
) -> Result<Vec<PricedCartItem>, ServiceError> {
    let now = Utc::now();
    let mut priced = Vec::with_capacity(items.len());

    for item in items {
        let variant = ProductVariant::find_by_id(item.variant_id)
            .one(conn)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("Variant {} no longer exists", item.variant_id))
            })?;

        let promotion = match item.promotion_id {
            Some(promotion_id) => {
                promotions::live_linked_promotion(conn, promotion_id, item.variant_id, now).await?
            }
            None => None,
        };

        let unit_price = variant.price;
        let discounted_price = promotion
            .as_ref()
            .map(|p| promotions::discounted_price(p, unit_price))
            .unwrap_or(unit_price);
        let quantity = Decimal::from(item.quantity);

        priced.push(PricedCartItem {
            id: item.id,
            product_id: item.product_id,
            variant_id: item.variant_id,
            variant_name: variant.name,
            quantity: item.quantity,
            unit_price,
            discounted_price,
            promotion_id: promotion.map(|p| p.id),
            subtotal: discounted_price * quantity,
            discount: (unit_price - discounted_price) * quantity,
        });
    }

    Ok(priced)
}

/// Aggregates priced items into the cart summary.
pub fn compute_summary(items: &[PricedCartItem]) -> CartSummary {
    let subtotal: Decimal = items
        .iter()
        .map(|i| i.unit_price * Decimal::from(i.quantity))
        .sum();
    let discount: Decimal = items.iter().map(|i| i.discount).sum();

    CartSummary {
        item_count: items.len(),
        unit_count: items.iter().map(|i| i.quantity).sum(),
        subtotal,
        discount,
        total: subtotal - discount,
    }
}

/// Input for adding an item to the cart
#[derive(Debug, Clone, Deserialize)]
pub struct AddItemInput {
    pub product_id: i32,
    pub variant_id: i32,
    pub quantity: i32,
    pub promotion_id: Option<i32>,
}

/// A client-held anonymous cart line submitted at login
#[derive(Debug, Clone, Deserialize)]
pub struct LocalCartItem {
    pub product_id: i32,
    pub variant_id: i32,
    pub quantity: i32,
    pub promotion_id: Option<i32>,
}

/// Cart line priced against the live catalog
#[derive(Debug, Clone, Serialize)]
pub struct PricedCartItem {
    pub id: Uuid,
    pub product_id: i32,
    pub variant_id: i32,
    pub variant_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub discounted_price: Decimal,
    /// The promotion actually in effect at pricing time, not the raw stamp.
    pub promotion_id: Option<i32>,
    pub subtotal: Decimal,
    pub discount: Decimal,
}

/// Aggregate totals over a priced cart
#[derive(Debug, Clone, Serialize)]
pub struct CartSummary {
    pub item_count: usize,
    pub unit_count: i32,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Cart with priced items and summary
#[derive(Debug, Serialize)]
pub struct PricedCart {
    pub items: Vec<PricedCartItem>,
    pub summary: CartSummary,
}
