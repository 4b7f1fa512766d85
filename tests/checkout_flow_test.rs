mod common;

use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, Set};
use storefront_api::{
    entities::{
        cart_item, order::OrderStatus, order_line, payment_method::PaymentMethodKind, promotion,
        promotion::PromotionKind, user::UserRole, CartItem, Order, OrderLine, SimulatedCard,
    },
    errors::ServiceError,
    services::{cart::AddItemInput, checkout::PlaceOrderInput},
};
use uuid::Uuid;

fn order_input(payment_method_id: i32) -> PlaceOrderInput {
    PlaceOrderInput {
        customer_name: "Ada".to_string(),
        customer_surname: "Lovelace".to_string(),
        payment_method_id,
        delivery_zone_id: None,
        address: None,
        card_id: None,
    }
}

async fn seed_cart(app: &TestApp, user_id: Uuid, price: rust_decimal::Decimal, quantity: i32) {
    let product = app.create_product(true).await;
    let variant = app.create_variant(product.id, price, true).await;
    app.state
        .services
        .cart
        .add_item(
            user_id,
            AddItemInput {
                product_id: product.id,
                variant_id: variant.id,
                quantity,
                promotion_id: None,
            },
        )
        .await
        .expect("seed cart");
}

#[tokio::test]
async fn empty_cart_fails_and_creates_no_order() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let method = app.create_payment_method(PaymentMethodKind::Cash, true).await;

    let err = app
        .state
        .services
        .checkout
        .place_order(user.id, order_input(method.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let orders = Order::find().count(&*app.state.db).await.expect("count");
    assert_eq!(orders, 0);
}

#[tokio::test]
async fn missing_names_fail_before_anything_else() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;

    let err = app
        .state
        .services
        .checkout
        .place_order(
            user.id,
            PlaceOrderInput {
                customer_name: "  ".to_string(),
                customer_surname: "Lovelace".to_string(),
                payment_method_id: 1,
                delivery_zone_id: None,
                address: None,
                card_id: None,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn inactive_or_unknown_payment_method_fails() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    seed_cart(&app, user.id, dec!(10.00), 1).await;

    let err = app
        .state
        .services
        .checkout
        .place_order(user.id, order_input(9999))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    let inactive = app
        .create_payment_method(PaymentMethodKind::Cash, false)
        .await;
    let err = app
        .state
        .services
        .checkout
        .place_order(user.id, order_input(inactive.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn insufficient_funds_leave_no_trace() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let method = app
        .create_payment_method(PaymentMethodKind::SimulatedCard, true)
        .await;
    let card = app.create_card(user.id, dec!(50.00)).await;
    seed_cart(&app, user.id, dec!(75.00), 1).await;

    let mut input = order_input(method.id);
    input.card_id = Some(card.id);
    let err = app
        .state
        .services
        .checkout
        .place_order(user.id, input)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::PaymentFailed(_)));

    // No debit, no order, cart unchanged.
    let card = SimulatedCard::find_by_id(card.id)
        .one(&*app.state.db)
        .await
        .expect("query card")
        .expect("card exists");
    assert_eq!(card.balance, dec!(50.00));

    let orders = Order::find().count(&*app.state.db).await.expect("count");
    assert_eq!(orders, 0);

    let items = CartItem::find()
        .filter(cart_item::Column::UserId.eq(user.id))
        .count(&*app.state.db)
        .await
        .expect("count items");
    assert_eq!(items, 1);
}

#[tokio::test]
async fn card_checkout_debits_and_freezes_lines() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let method = app
        .create_payment_method(PaymentMethodKind::SimulatedCard, true)
        .await;
    let card = app.create_card(user.id, dec!(100.00)).await;
    seed_cart(&app, user.id, dec!(30.00), 2).await;

    let mut input = order_input(method.id);
    input.card_id = Some(card.id);
    let placed = app
        .state
        .services
        .checkout
        .place_order(user.id, input)
        .await
        .expect("place order");

    assert_eq!(placed.subtotal, dec!(60.00));
    assert_eq!(placed.discount, dec!(0.00));
    assert_eq!(placed.shipping_cost, None);
    assert_eq!(placed.total, dec!(60.00));

    let card = SimulatedCard::find_by_id(card.id)
        .one(&*app.state.db)
        .await
        .expect("query card")
        .expect("card exists");
    assert_eq!(card.balance, dec!(40.00));

    let order = Order::find_by_id(placed.order_id)
        .one(&*app.state.db)
        .await
        .expect("query order")
        .expect("order exists");
    assert_eq!(order.status, OrderStatus::Submitted);
    assert_eq!(order.card_id, Some(card.id));
    assert_eq!(order.shipping_cost, None);
    assert_eq!(order.address, None);

    let lines = OrderLine::find()
        .filter(order_line::Column::OrderId.eq(placed.order_id))
        .all(&*app.state.db)
        .await
        .expect("query lines");
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0].quantity, 2);
    assert_eq!(lines[0].unit_price, dec!(30.00));
    assert_eq!(lines[0].promotion_price, dec!(30.00));
    assert_eq!(lines[0].subtotal, dec!(60.00));

    let items = CartItem::find()
        .filter(cart_item::Column::UserId.eq(user.id))
        .count(&*app.state.db)
        .await
        .expect("count items");
    assert_eq!(items, 0);
}

#[tokio::test]
async fn frozen_prices_survive_later_promotion_edits() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let method = app.create_payment_method(PaymentMethodKind::Cash, true).await;
    let product = app.create_product(true).await;
    let variant = app.create_variant(product.id, dec!(100.00), true).await;
    let promo = app
        .create_live_promotion(PromotionKind::Percentage, dec!(10))
        .await;
    app.link_promotion(promo.id, variant.id).await;

    app.state
        .services
        .cart
        .add_item(
            user.id,
            AddItemInput {
                product_id: product.id,
                variant_id: variant.id,
                quantity: 2,
                promotion_id: Some(promo.id),
            },
        )
        .await
        .expect("add");

    let placed = app
        .state
        .services
        .checkout
        .place_order(user.id, order_input(method.id))
        .await
        .expect("place order");
    assert_eq!(placed.total, dec!(180.00));

    // Deactivate the promotion after checkout; the snapshot must not move.
    let mut active: promotion::ActiveModel = promo.clone().into();
    active.active = Set(false);
    active.update(&*app.state.db).await.expect("deactivate");

    let lines = OrderLine::find()
        .filter(order_line::Column::OrderId.eq(placed.order_id))
        .all(&*app.state.db)
        .await
        .expect("query lines");
    assert_eq!(lines[0].unit_price, dec!(100.00));
    assert_eq!(lines[0].promotion_price, dec!(90.00));
    assert_eq!(lines[0].subtotal, dec!(180.00));
    assert_eq!(lines[0].promotion_id, Some(promo.id));
}

#[tokio::test]
async fn home_delivery_requires_address_and_adds_shipping() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let method = app.create_payment_method(PaymentMethodKind::Cash, true).await;
    let zone = app.create_delivery_zone(dec!(5.00), true).await;
    seed_cart(&app, user.id, dec!(20.00), 1).await;

    let mut input = order_input(method.id);
    input.delivery_zone_id = Some(zone.id);
    let err = app
        .state
        .services
        .checkout
        .place_order(user.id, input)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let mut input = order_input(method.id);
    input.delivery_zone_id = Some(zone.id);
    input.address = Some("Calle Falsa 123".to_string());
    let placed = app
        .state
        .services
        .checkout
        .place_order(user.id, input)
        .await
        .expect("place order");

    assert_eq!(placed.shipping_cost, Some(dec!(5.00)));
    assert_eq!(placed.total, dec!(25.00));

    let order = Order::find_by_id(placed.order_id)
        .one(&*app.state.db)
        .await
        .expect("query order")
        .expect("order exists");
    assert_eq!(order.delivery_zone_id, Some(zone.id));
    assert_eq!(order.address.as_deref(), Some("Calle Falsa 123"));
    assert_eq!(order.shipping_cost, Some(dec!(5.00)));
}

#[tokio::test]
async fn card_path_requires_an_owned_card() {
    let app = TestApp::new().await;
    let user = app.create_user(UserRole::Customer).await;
    let stranger = app.create_user(UserRole::Customer).await;
    let method = app
        .create_payment_method(PaymentMethodKind::SimulatedCard, true)
        .await;
    seed_cart(&app, user.id, dec!(10.00), 1).await;

    // Card is mandatory on the card branch.
    let err = app
        .state
        .services
        .checkout
        .place_order(user.id, order_input(method.id))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    // Another user's card is rejected.
    let foreign_card = app.create_card(stranger.id, dec!(500.00)).await;
    let mut input = order_input(method.id);
    input.card_id = Some(foreign_card.id);
    let err = app
        .state
        .services
        .checkout
        .place_order(user.id, input)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}
