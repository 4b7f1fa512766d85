mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, Set};
use storefront_api::{
    entities::{cart_item, promotion, promotion::PromotionKind, user::UserRole, CartItem},
    errors::ServiceError,
    services::cart::{AddItemInput, LocalCartItem},
};
use uuid::Uuid;

fn add(product_id: i32, variant_id: i32, quantity: i32, promotion_id: Option<i32>) -> AddItemInput {
    AddItemInput {
        product_id,
        variant_id,
        quantity,
        promotion_id,
    }
}

#[tokio::test]
async fn adding_same_variant_twice_merges_into_one_row() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let product = app.create_product(true).await;
    let variant = app.create_variant(product.id, dec!(25.00), true).await;

    let cart_service = &app.state.services.cart;
    cart_service
        .add_item(user.id, add(product.id, variant.id, 1, None))
        .await
        .expect("first add");
    let cart = cart_service
        .add_item(user.id, add(product.id, variant.id, 2, None))
        .await
        .expect("second add");

    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.summary.unit_count, 3);

    let rows = CartItem::find()
        .filter(cart_item::Column::UserId.eq(user.id))
        .all(&*app.state.db)
        .await
        .expect("query rows");
    assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn promotion_scenario_ten_percent_off_two_units() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let product = app.create_product(true).await;
    let variant = app.create_variant(product.id, dec!(100.00), true).await;
    let promo = app
        .create_live_promotion(PromotionKind::Percentage, dec!(10))
        .await;
    app.link_promotion(promo.id, variant.id).await;

    let cart = app
        .state
        .services
        .cart
        .add_item(user.id, add(product.id, variant.id, 2, Some(promo.id)))
        .await
        .expect("add with promotion");

    assert_eq!(cart.summary.subtotal, dec!(200.00));
    assert_eq!(cart.summary.discount, dec!(20.00));
    assert_eq!(cart.summary.total, dec!(180.00));
    assert_eq!(cart.items[0].discounted_price, dec!(90.00));
    assert_eq!(cart.items[0].promotion_id, Some(promo.id));
}

#[tokio::test]
async fn readding_with_no_promotion_drops_the_stored_one() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let product = app.create_product(true).await;
    let variant = app.create_variant(product.id, dec!(50.00), true).await;
    let promo = app
        .create_live_promotion(PromotionKind::Percentage, dec!(20))
        .await;
    app.link_promotion(promo.id, variant.id).await;

    let cart_service = &app.state.services.cart;
    let cart = cart_service
        .add_item(user.id, add(product.id, variant.id, 2, Some(promo.id)))
        .await
        .expect("add with promotion");
    assert_eq!(cart.summary.discount, dec!(20.00));

    // The overwrite is unconditional: None silently clears the promotion.
    let cart = cart_service
        .add_item(user.id, add(product.id, variant.id, 1, None))
        .await
        .expect("re-add without promotion");

    assert_eq!(cart.items[0].quantity, 3);
    assert_eq!(cart.items[0].promotion_id, None);
    assert_eq!(cart.summary.discount, dec!(0.00));
}

#[tokio::test]
async fn add_validations_reject_bad_targets() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let product = app.create_product(true).await;
    let other_product = app.create_product(true).await;
    let variant = app.create_variant(product.id, dec!(10.00), true).await;
    let inactive_variant = app.create_variant(product.id, dec!(10.00), false).await;

    let cart_service = &app.state.services.cart;

    // Zero quantity
    let err = cart_service
        .add_item(user.id, add(product.id, variant.id, 0, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Unknown product
    let err = cart_service
        .add_item(user.id, add(9999, variant.id, 1, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // Inactive variant
    let err = cart_service
        .add_item(user.id, add(product.id, inactive_variant.id, 1, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Variant from a different product
    let err = cart_service
        .add_item(user.id, add(other_product.id, variant.id, 1, None))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Promotion not linked to the variant
    let promo = app
        .create_live_promotion(PromotionKind::Percentage, dec!(10))
        .await;
    let err = cart_service
        .add_item(user.id, add(product.id, variant.id, 1, Some(promo.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn set_quantity_enforces_ownership_and_bounds() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let stranger = app.create_user(UserRole::Customer).await;
    let product = app.create_product(true).await;
    let variant = app.create_variant(product.id, dec!(10.00), true).await;

    let cart_service = &app.state.services.cart;
    let cart = cart_service
        .add_item(user.id, add(product.id, variant.id, 1, None))
        .await
        .expect("add");
    let item_id = cart.items[0].id;

    let err = cart_service
        .set_quantity(stranger.id, item_id, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let err = cart_service.set_quantity(user.id, item_id, 0).await.unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = cart_service
        .set_quantity(user.id, Uuid::new_v4(), 2)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let cart = cart_service
        .set_quantity(user.id, item_id, 7)
        .await
        .expect("set quantity");
    assert_eq!(cart.items[0].quantity, 7);
}

#[tokio::test]
async fn remove_and_clear_empty_the_cart() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let product = app.create_product(true).await;
    let variant_a = app.create_variant(product.id, dec!(10.00), true).await;
    let variant_b = app.create_variant(product.id, dec!(20.00), true).await;

    let cart_service = &app.state.services.cart;
    let cart = cart_service
        .add_item(user.id, add(product.id, variant_a.id, 1, None))
        .await
        .expect("add a");
    cart_service
        .add_item(user.id, add(product.id, variant_b.id, 1, None))
        .await
        .expect("add b");

    let cart_after_remove = cart_service
        .remove_item(user.id, cart.items[0].id)
        .await
        .expect("remove");
    assert_eq!(cart_after_remove.items.len(), 1);

    cart_service.clear(user.id).await.expect("clear");
    let cart = cart_service.get_cart(user.id).await.expect("get");
    assert!(cart.items.is_empty());
    assert_eq!(cart.summary.total, dec!(0));
}

#[tokio::test]
async fn apply_promotion_restamps_and_clears() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let product = app.create_product(true).await;
    let variant = app.create_variant(product.id, dec!(40.00), true).await;
    let promo = app
        .create_live_promotion(PromotionKind::FixedPrice, dec!(30.00))
        .await;
    app.link_promotion(promo.id, variant.id).await;

    let cart_service = &app.state.services.cart;
    let cart = cart_service
        .add_item(user.id, add(product.id, variant.id, 1, None))
        .await
        .expect("add");
    let item_id = cart.items[0].id;

    let cart = cart_service
        .apply_promotion(user.id, item_id, Some(promo.id))
        .await
        .expect("apply");
    assert_eq!(cart.items[0].discounted_price, dec!(30.00));
    assert_eq!(cart.summary.discount, dec!(10.00));

    let cart = cart_service
        .apply_promotion(user.id, item_id, None)
        .await
        .expect("clear promotion");
    assert_eq!(cart.items[0].discounted_price, dec!(40.00));
    assert_eq!(cart.summary.discount, dec!(0.00));
}

#[tokio::test]
async fn deactivated_promotion_stops_discounting_at_read_time() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let product = app.create_product(true).await;
    let variant = app.create_variant(product.id, dec!(100.00), true).await;
    let promo = app
        .create_live_promotion(PromotionKind::Percentage, dec!(10))
        .await;
    app.link_promotion(promo.id, variant.id).await;

    let cart_service = &app.state.services.cart;
    let cart = cart_service
        .add_item(user.id, add(product.id, variant.id, 1, Some(promo.id)))
        .await
        .expect("add");
    assert_eq!(cart.summary.discount, dec!(10.00));

    let mut active: promotion::ActiveModel = promo.into();
    active.active = Set(false);
    active.update(&*app.state.db).await.expect("deactivate");

    let cart = cart_service.get_cart(user.id).await.expect("get");
    assert_eq!(cart.items[0].discounted_price, dec!(100.00));
    assert_eq!(cart.items[0].promotion_id, None);
    assert_eq!(cart.summary.discount, dec!(0.00));
}

#[tokio::test]
async fn merge_sums_conflicting_variants_and_creates_the_rest() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let product = app.create_product(true).await;
    let variant_a = app.create_variant(product.id, dec!(10.00), true).await;
    let variant_b = app.create_variant(product.id, dec!(20.00), true).await;

    let cart_service = &app.state.services.cart;
    cart_service
        .add_item(user.id, add(product.id, variant_a.id, 2, None))
        .await
        .expect("seed account cart");

    let cart = cart_service
        .merge_local_cart(
            user.id,
            vec![
                LocalCartItem {
                    product_id: product.id,
                    variant_id: variant_a.id,
                    quantity: 3,
                    promotion_id: None,
                },
                LocalCartItem {
                    product_id: product.id,
                    variant_id: variant_b.id,
                    quantity: 1,
                    promotion_id: None,
                },
            ],
        )
        .await
        .expect("merge");

    assert_eq!(cart.items.len(), 2);
    let merged_a = cart
        .items
        .iter()
        .find(|i| i.variant_id == variant_a.id)
        .expect("variant a present");
    assert_eq!(merged_a.quantity, 5);
    let merged_b = cart
        .items
        .iter()
        .find(|i| i.variant_id == variant_b.id)
        .expect("variant b present");
    assert_eq!(merged_b.quantity, 1);
}

#[tokio::test]
async fn failed_merge_rolls_back_completely() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let product = app.create_product(true).await;
    let variant = app.create_variant(product.id, dec!(10.00), true).await;
    let inactive = app.create_variant(product.id, dec!(10.00), false).await;

    let cart_service = &app.state.services.cart;
    cart_service
        .add_item(user.id, add(product.id, variant.id, 2, None))
        .await
        .expect("seed account cart");

    let err = cart_service
        .merge_local_cart(
            user.id,
            vec![
                LocalCartItem {
                    product_id: product.id,
                    variant_id: variant.id,
                    quantity: 1,
                    promotion_id: None,
                },
                LocalCartItem {
                    product_id: product.id,
                    variant_id: inactive.id,
                    quantity: 1,
                    promotion_id: None,
                },
            ],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Nothing from the batch may stick, not even the valid first entry.
    let cart = cart_service.get_cart(user.id).await.expect("get");
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 2);
}
