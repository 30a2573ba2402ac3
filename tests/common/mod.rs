//! Test harness: the real migrator against a throwaway SQLite database, the
//! real services, and a stub carrier whose behavior each test controls.

#![allow(dead_code)]

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use tokio::sync::mpsc;
use uuid::Uuid;

use shopcore_api::{
    auth,
    cache::CacheClient,
    carriers::{CarrierClient, CarrierError, GuideDocument, GuideRequest, RateQuote, RateRequest},
    config::AppConfig,
    db::{self, DbPool},
    entities::{customer, product, store},
    events::EventSender,
    handlers::AppServices,
    AppState,
};

pub const SESSION_SECRET: &str =
    "test_session_secret_for_integration_tests_that_is_at_least_64_chars_long";

/// Carrier stub: canned responses, flips to provider failure on demand.
pub struct StubCarrier {
    pub fail: AtomicBool,
}

impl StubCarrier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            fail: AtomicBool::new(false),
        })
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), CarrierError> {
        if self.fail.load(Ordering::SeqCst) {
            Err(CarrierError::Provider {
                status: 422,
                message: "postal code not serviced".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl CarrierClient for StubCarrier {
    async fn quote_rate(&self, request: &RateRequest) -> Result<RateQuote, CarrierError> {
        self.check()?;
        Ok(RateQuote {
            rate_id: format!("rate-{}", request.shipment_id.simple()),
            amount: Decimal::new(1250, 2),
            currency: "USD".to_string(),
            carrier: "TestExpress".to_string(),
        })
    }

    async fn create_guide(&self, request: &GuideRequest) -> Result<GuideDocument, CarrierError> {
        self.check()?;
        Ok(GuideDocument {
            guide_id: format!("guide-{}", request.shipment_id.simple()),
            tracking_number: format!("TRK{}", request.shipment_id.simple()),
            label_url: "https://labels.test/label.pdf".to_string(),
        })
    }
}

pub struct TestApp {
    pub state: AppState,
    pub carrier: Arc<StubCarrier>,
    _event_task: tokio::task::JoinHandle<()>,
    _tmp: tempfile::TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        let tmp = tempfile::tempdir().expect("tempdir");
        let db_path = tmp.path().join("shopcore_test.db");
        let database_url = format!("sqlite://{}?mode=rwc", db_path.display());

        let mut cfg = AppConfig::new(
            database_url.clone(),
            // Port with no Redis listening: cache calls degrade to misses.
            "redis://127.0.0.1:6399".to_string(),
            SESSION_SECRET.to_string(),
            "127.0.0.1".to_string(),
            18080,
            "test".to_string(),
        );
        cfg.cron_token = Some("cron-secret".to_string());

        let pool = db::establish_connection(&database_url)
            .await
            .expect("failed to open test database");
        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations");
        let db_arc = Arc::new(pool);

        let (event_tx, mut event_rx) = mpsc::channel(64);
        let event_sender = EventSender::new(event_tx);
        let event_task = tokio::spawn(async move { while event_rx.recv().await.is_some() {} });

        let redis_client = Arc::new(redis::Client::open(cfg.redis_url.clone()).expect("redis url"));
        let cache = CacheClient::new(
            redis_client.clone(),
            cfg.cache_namespace.clone(),
            Duration::from_secs(cfg.cache_ttl_secs),
        );

        let carrier = StubCarrier::new();
        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(event_sender.clone()),
            carrier.clone(),
            None,
            None,
            cfg.email_from.clone(),
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            event_sender,
            services,
            cache,
            redis: redis_client,
        };

        Self {
            state,
            carrier,
            _event_task: event_task,
            _tmp: tmp,
        }
    }

    pub fn db(&self) -> &DbPool {
        &self.state.db
    }

    /// Full router with middleware, for handler-level tests.
    pub fn router(&self) -> Router {
        let verifier = Arc::new(auth::SessionVerifier::new(
            SESSION_SECRET,
            &self.state.config.session_issuer,
            &self.state.config.session_audience,
        ));
        Router::new()
            .nest("/api/v1", shopcore_api::api_v1_routes())
            .layer(axum::middleware::from_fn_with_state(
                verifier,
                |axum::extract::State(verifier): axum::extract::State<
                    Arc<auth::SessionVerifier>,
                >,
                 mut req: axum::http::Request<axum::body::Body>,
                 next: axum::middleware::Next| async move {
                    req.extensions_mut().insert(verifier);
                    next.run(req).await
                },
            ))
            .with_state(self.state.clone())
    }

    /// Session token for a user who manages `store_ids` with the given
    /// permissions.
    pub fn token(&self, store_ids: Vec<Uuid>, permissions: Vec<&str>) -> String {
        auth::issue_session_token(
            SESSION_SECRET,
            &self.state.config.session_issuer,
            &self.state.config.session_audience,
            "test-user",
            store_ids,
            permissions.into_iter().map(String::from).collect(),
            3600,
        )
        .expect("token")
    }

    pub async fn seed_store(&self) -> store::Model {
        let now = Utc::now();
        let slug_tag = Uuid::new_v4().simple().to_string();
        store::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set("Test Store".to_string()),
            slug: Set(format!("test-store-{}", &slug_tag[..8])),
            owner_subject: Set("test-user".to_string()),
            contact_email: Set("owner@test.dev".to_string()),
            currency: Set("USD".to_string()),
            logo_url: Set(None),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed store")
    }

    pub async fn seed_customer(&self, store_id: Uuid) -> customer::Model {
        let now = Utc::now();
        customer::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            email: Set(format!("buyer-{}@test.dev", Uuid::new_v4().simple())),
            name: Set("Test Buyer".to_string()),
            phone: Set(None),
            shipping_address: Set(Some("1 Test Street, Testville".to_string())),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed customer")
    }

    pub async fn seed_product(&self, store_id: Uuid, price: Decimal) -> product::Model {
        let now = Utc::now();
        let slug_tag = Uuid::new_v4().simple().to_string();
        product::ActiveModel {
            id: Set(Uuid::new_v4()),
            store_id: Set(store_id),
            category_id: Set(None),
            name: Set("Test Product".to_string()),
            slug: Set(format!("test-product-{}", &slug_tag[..8])),
            description: Set("A product for tests".to_string()),
            sku: Set(None),
            price: Set(price),
            compare_at_price: Set(None),
            status: Set(product::ProductStatus::Active),
            is_featured: Set(false),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(self.db())
        .await
        .expect("seed product")
    }
}
