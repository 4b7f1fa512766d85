mod common;

use chrono::{TimeZone, Utc};
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use storefront_api::{
    entities::{
        backorder_request, backorder_request::BackorderStatus,
        payment_method::PaymentMethodKind, user::UserRole, BackorderRequest,
    },
    errors::ServiceError,
    services::{backorders::ShortageInput, cart::AddItemInput, checkout::PlaceOrderInput},
};
use uuid::Uuid;

/// Places a pickup order over two variants; returns (order id, variant ids).
async fn place_order(app: &TestApp, user_id: Uuid) -> (Uuid, Vec<i32>) {
    let method = app.create_payment_method(PaymentMethodKind::Cash, true).await;
    let product = app.create_product(true).await;
    let variant_a = app.create_variant(product.id, dec!(10.00), true).await;
    let variant_b = app.create_variant(product.id, dec!(20.00), true).await;

    for variant_id in [variant_a.id, variant_b.id] {
        app.state
            .services
            .cart
            .add_item(
                user_id,
                AddItemInput {
                    product_id: product.id,
                    variant_id,
                    quantity: 2,
                    promotion_id: None,
                },
            )
            .await
            .expect("seed cart");
    }

    let placed = app
        .state
        .services
        .checkout
        .place_order(
            user_id,
            PlaceOrderInput {
                customer_name: "Ada".to_string(),
                customer_surname: "Lovelace".to_string(),
                payment_method_id: method.id,
                delivery_zone_id: None,
                address: None,
                card_id: None,
            },
        )
        .await
        .expect("place order");

    (placed.order_id, vec![variant_a.id, variant_b.id])
}

#[tokio::test]
async fn duplicate_reports_are_idempotent() {
    let app = TestApp::new().await;
    let customer = app.create_user(UserRole::Customer).await;
    let (order_id, variants) = place_order(&app, customer.id).await;

    let backorders = &app.state.services.backorders;
    let first = backorders
        .report_shortages(
            order_id,
            vec![ShortageInput {
                variant_id: variants[0],
                quantity: 2,
            }],
        )
        .await
        .expect("first report");
    assert_eq!(first.len(), 1);

    let second = backorders
        .report_shortages(
            order_id,
            vec![ShortageInput {
                variant_id: variants[0],
                quantity: 5,
            }],
        )
        .await
        .expect("second report");
    assert!(second.is_empty());

    let rows = BackorderRequest::find()
        .filter(backorder_request::Column::OrderId.eq(order_id))
        .all(&*app.state.db)
        .await
        .expect("query rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity_requested, 2);
    assert_eq!(rows[0].status, BackorderStatus::Pending);
}

#[tokio::test]
async fn reports_validate_order_and_lines() {
    let app = TestApp::new().await;
    let customer = app.create_user(UserRole::Customer).await;
    let (order_id, variants) = place_order(&app, customer.id).await;

    let backorders = &app.state.services.backorders;

    let err = backorders
        .report_shortages(
            Uuid::new_v4(),
            vec![ShortageInput {
                variant_id: variants[0],
                quantity: 1,
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // A variant that is not part of the order cannot be short for it.
    let err = backorders
        .report_shortages(
            order_id,
            vec![ShortageInput {
                variant_id: 9999,
                quantity: 1,
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));

    let err = backorders
        .report_shortages(
            order_id,
            vec![ShortageInput {
                variant_id: variants[0],
                quantity: 0,
            }],
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::ValidationError(_)));
}

#[tokio::test]
async fn grouped_view_lists_unresolved_shortages() {
    let app = TestApp::new().await;
    let customer = app.create_user(UserRole::Customer).await;
    let (order_a, variants_a) = place_order(&app, customer.id).await;
    let (order_b, variants_b) = place_order(&app, customer.id).await;

    let backorders = &app.state.services.backorders;
    backorders
        .report_shortages(
            order_a,
            vec![ShortageInput {
                variant_id: variants_a[0],
                quantity: 2,
            }],
        )
        .await
        .expect("report a");
    backorders
        .report_shortages(
            order_b,
            vec![
                ShortageInput {
                    variant_id: variants_b[0],
                    quantity: 3,
                },
                ShortageInput {
                    variant_id: variants_b[1],
                    quantity: 1,
                },
            ],
        )
        .await
        .expect("report b");

    let grouped = backorders.list_grouped().await.expect("grouped");
    // Three distinct variants were reported, each its own pending group.
    assert_eq!(grouped.len(), 3);
    assert!(grouped.iter().all(|g| g.status == BackorderStatus::Pending));
    assert!(grouped.iter().all(|g| !g.variant_name.is_empty()));

    // Received requests disappear from the aggregate view.
    let first_id = BackorderRequest::find()
        .filter(backorder_request::Column::OrderId.eq(order_a))
        .one(&*app.state.db)
        .await
        .expect("query")
        .expect("row")
        .id;
    backorders
        .advance_status(vec![first_id], BackorderStatus::Received, None)
        .await
        .expect("receive");

    let grouped = backorders.list_grouped().await.expect("grouped again");
    assert_eq!(grouped.len(), 2);
}

#[tokio::test]
async fn line_availability_follows_request_status() {
    let app = TestApp::new().await;
    let customer = app.create_user(UserRole::Customer).await;
    let (order_id, variants) = place_order(&app, customer.id).await;

    let backorders = &app.state.services.backorders;
    let created = backorders
        .report_shortages(
            order_id,
            vec![ShortageInput {
                variant_id: variants[0],
                quantity: 1,
            }],
        )
        .await
        .expect("report");

    let lines = backorders.list_for_order(order_id).await.expect("lines");
    assert_eq!(lines.len(), 2);

    let short_line = lines
        .iter()
        .find(|l| l.variant_id == variants[0])
        .expect("short line");
    assert!(!short_line.available);
    assert_eq!(short_line.backorder_status, Some(BackorderStatus::Pending));

    // The line without a request counts as available.
    let ok_line = lines
        .iter()
        .find(|l| l.variant_id == variants[1])
        .expect("ok line");
    assert!(ok_line.available);
    assert_eq!(ok_line.backorder_status, None);

    // Once received, the shortage no longer blocks the line.
    backorders
        .advance_status(
            created.iter().map(|r| r.id).collect(),
            BackorderStatus::Received,
            None,
        )
        .await
        .expect("receive");
    let lines = backorders.list_for_order(order_id).await.expect("lines");
    let short_line = lines
        .iter()
        .find(|l| l.variant_id == variants[0])
        .expect("short line");
    assert!(short_line.available);
    assert_eq!(short_line.backorder_status, Some(BackorderStatus::Received));
}

#[tokio::test]
async fn batch_advance_is_all_or_nothing() {
    let app = TestApp::new().await;
    let customer = app.create_user(UserRole::Customer).await;
    let (order_id, variants) = place_order(&app, customer.id).await;

    let backorders = &app.state.services.backorders;
    let created = backorders
        .report_shortages(
            order_id,
            vec![
                ShortageInput {
                    variant_id: variants[0],
                    quantity: 1,
                },
                ShortageInput {
                    variant_id: variants[1],
                    quantity: 2,
                },
            ],
        )
        .await
        .expect("report");
    assert_eq!(created.len(), 2);

    let mut ids: Vec<Uuid> = created.iter().map(|r| r.id).collect();
    ids.push(Uuid::new_v4());

    let err = backorders
        .advance_status(ids, BackorderStatus::Received, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound(_)));

    // Nothing moved: every request in the batch is still pending.
    let rows = BackorderRequest::find()
        .filter(backorder_request::Column::OrderId.eq(order_id))
        .all(&*app.state.db)
        .await
        .expect("query rows");
    assert!(rows.iter().all(|r| r.status == BackorderStatus::Pending));
}

#[tokio::test]
async fn reception_timestamp_is_normalized_and_cleared() {
    let app = TestApp::new().await;
    let customer = app.create_user(UserRole::Customer).await;
    let (order_id, variants) = place_order(&app, customer.id).await;

    let backorders = &app.state.services.backorders;
    let created = backorders
        .report_shortages(
            order_id,
            vec![ShortageInput {
                variant_id: variants[0],
                quantity: 1,
            }],
        )
        .await
        .expect("report");
    let ids: Vec<Uuid> = created.iter().map(|r| r.id).collect();

    let received_at = Utc.with_ymd_and_hms(2025, 6, 2, 17, 30, 45).unwrap();
    let updated = backorders
        .advance_status(ids.clone(), BackorderStatus::Received, Some(received_at))
        .await
        .expect("receive");

    assert_eq!(updated[0].status, BackorderStatus::Received);
    assert_eq!(
        updated[0].received_at,
        Some(Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 0).unwrap())
    );

    // Moving back to in_process clears the reception timestamp.
    let updated = backorders
        .advance_status(ids, BackorderStatus::InProcess, None)
        .await
        .expect("back to in_process");
    assert_eq!(updated[0].status, BackorderStatus::InProcess);
    assert_eq!(updated[0].received_at, None);
}
