#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use storefront_api::{
    auth::AuthService,
    config::AppConfig,
    db,
    entities::{
        delivery_zone, payment_method,
        payment_method::PaymentMethodKind,
        product, product_variant, promotion,
        promotion::PromotionKind,
        promotion_variant, simulated_card, user,
        user::UserRole,
    },
    events::{self, EventSender},
    handlers::AppServices,
    AppState,
};
use tokio::sync::mpsc;
use uuid::Uuid;

/// Helper harness spinning up application state backed by a private
/// SQLite database, migrated from scratch for every test.
pub struct TestApp {
    pub state: AppState,
    _tmp: tempfile::TempDir,
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        let tmp = tempfile::TempDir::new().expect("temp dir");
        let db_file = tmp.path().join("storefront_test.db");

        let mut cfg = AppConfig::new(
            format!("sqlite://{}?mode=rwc", db_file.display()),
            "test_secret_key_for_testing_purposes_only",
            "127.0.0.1",
            18_080,
            "test",
        );
        cfg.db_max_connections = 1;
        cfg.db_min_connections = 1;

        let db_pool = db::establish_connection_from_app_config(&cfg)
            .await
            .expect("database connection");
        db::run_migrations(&db_pool).await.expect("migrations");
        let db_arc = Arc::new(db_pool);

        let (event_tx, event_rx) = mpsc::channel(256);
        let event_sender = EventSender::new(event_tx);
        tokio::spawn(events::process_events(event_rx));

        let services = AppServices::new(db_arc.clone(), Arc::new(event_sender.clone()));
        let auth = Arc::new(AuthService::new(
            &cfg.jwt_secret,
            Duration::from_secs(3600),
        ));

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
            auth,
        };

        Self { state, _tmp: tmp }
    }

    /// Full application router, as served by the binary.
    pub fn router(&self) -> Router {
        Router::new()
            .nest("/api/v1", storefront_api::api_v1_routes())
            .with_state(self.state.clone())
    }

    pub async fn create_user(&self, role: UserRole) -> user::Model {
        self.create_user_with_active(role, true).await
    }

    pub async fn create_user_with_active(&self, role: UserRole, active: bool) -> user::Model {
        let id = Uuid::new_v4();
        user::ActiveModel {
            id: Set(id),
            email: Set(format!("{}@example.test", id)),
            full_name: Set("Test User".to_string()),
            role: Set(role),
            active: Set(active),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("create user")
    }

    pub async fn create_product(&self, active: bool) -> product::Model {
        product::ActiveModel {
            name: Set("Test product".to_string()),
            description: Set(None),
            active: Set(active),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("create product")
    }

    pub async fn create_variant(
        &self,
        product_id: i32,
        price: Decimal,
        active: bool,
    ) -> product_variant::Model {
        product_variant::ActiveModel {
            product_id: Set(product_id),
            name: Set("Test variant".to_string()),
            price: Set(price),
            active: Set(active),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("create variant")
    }

    /// Promotion whose window covers now, yesterday through tomorrow.
    pub async fn create_live_promotion(
        &self,
        kind: PromotionKind,
        value: Decimal,
    ) -> promotion::Model {
        let now = Utc::now();
        self.create_promotion(kind, value, now - ChronoDuration::days(1), now + ChronoDuration::days(1), true)
            .await
    }

    pub async fn create_promotion(
        &self,
        kind: PromotionKind,
        value: Decimal,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        active: bool,
    ) -> promotion::Model {
        promotion::ActiveModel {
            name: Set("Test promotion".to_string()),
            kind: Set(kind),
            value: Set(value),
            starts_at: Set(starts_at),
            ends_at: Set(ends_at),
            active: Set(active),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("create promotion")
    }

    pub async fn link_promotion(&self, promotion_id: i32, variant_id: i32) {
        promotion_variant::ActiveModel {
            promotion_id: Set(promotion_id),
            variant_id: Set(variant_id),
        }
        .insert(&*self.state.db)
        .await
        .expect("link promotion");
    }

    pub async fn create_delivery_zone(&self, cost: Decimal, active: bool) -> delivery_zone::Model {
        delivery_zone::ActiveModel {
            district: Set("Centro".to_string()),
            cost: Set(cost),
            estimated_days: Set(2),
            active: Set(active),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("create delivery zone")
    }

    pub async fn create_payment_method(
        &self,
        kind: PaymentMethodKind,
        active: bool,
    ) -> payment_method::Model {
        payment_method::ActiveModel {
            name: Set(match kind {
                PaymentMethodKind::Cash => "Cash".to_string(),
                PaymentMethodKind::SimulatedCard => "Simulated card".to_string(),
            }),
            kind: Set(kind),
            active: Set(active),
            ..Default::default()
        }
        .insert(&*self.state.db)
        .await
        .expect("create payment method")
    }

    pub async fn create_card(&self, user_id: Uuid, balance: Decimal) -> simulated_card::Model {
        simulated_card::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(user_id),
            number: Set("4111111111111111".to_string()),
            holder_name: Set("Test Holder".to_string()),
            expiry: Set("12/29".to_string()),
            cvv: Set("123".to_string()),
            balance: Set(balance),
            created_at: Set(Utc::now()),
            updated_at: Set(Utc::now()),
        }
        .insert(&*self.state.db)
        .await
        .expect("create card")
    }
}
