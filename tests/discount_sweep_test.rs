mod common;

use chrono::{Duration, Utc};
use common::TestApp;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait, Set};
use shopcore_api::db::DbPool;
use shopcore_api::entities::{
    coupon::{self, DiscountKind},
    offer,
};
use uuid::Uuid;

async fn reload_coupon(db: &DbPool, id: Uuid) -> coupon::Model {
    coupon::Entity::find_by_id(id).one(db).await.unwrap().unwrap()
}

async fn reload_offer(db: &DbPool, id: Uuid) -> offer::Model {
    offer::Entity::find_by_id(id).one(db).await.unwrap().unwrap()
}

async fn seed_coupon(
    app: &TestApp,
    store_id: Uuid,
    code: &str,
    starts_offset_hours: i64,
    ends_offset_hours: i64,
    max_uses: Option<i32>,
    used_count: i32,
    is_active: bool,
) -> coupon::Model {
    let now = Utc::now();
    coupon::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        code: Set(code.to_string()),
        kind: Set(DiscountKind::Percentage),
        value: Set(dec!(10)),
        min_order_value: Set(None),
        max_uses: Set(max_uses),
        used_count: Set(used_count),
        starts_at: Set(now + Duration::hours(starts_offset_hours)),
        ends_at: Set(now + Duration::hours(ends_offset_hours)),
        is_active: Set(is_active),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(app.db())
    .await
    .expect("seed coupon")
}

async fn seed_offer(
    app: &TestApp,
    store_id: Uuid,
    name: &str,
    starts_offset_hours: i64,
    ends_offset_hours: i64,
    is_active: bool,
) -> offer::Model {
    let now = Utc::now();
    offer::ActiveModel {
        id: Set(Uuid::new_v4()),
        store_id: Set(store_id),
        category_id: Set(None),
        name: Set(name.to_string()),
        description: Set(None),
        kind: Set(DiscountKind::Fixed),
        value: Set(dec!(5)),
        starts_at: Set(now + Duration::hours(starts_offset_hours)),
        ends_at: Set(now + Duration::hours(ends_offset_hours)),
        is_active: Set(is_active),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(app.db())
    .await
    .expect("seed offer")
}

#[tokio::test]
async fn sweep_flips_coupons_to_match_window_and_usage() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;

    let expired = seed_coupon(&app, store.id, "EXPIRED", -48, -24, None, 0, true).await;
    let future = seed_coupon(&app, store.id, "FUTURE", 24, 48, None, 0, true).await;
    let exhausted = seed_coupon(&app, store.id, "MAXED", -1, 24, Some(3), 3, true).await;
    let dormant = seed_coupon(&app, store.id, "DORMANT", -1, 24, Some(10), 2, false).await;
    let unlimited = seed_coupon(&app, store.id, "UNLIMITED", -1, 24, None, 9999, false).await;
    let steady = seed_coupon(&app, store.id, "STEADY", -1, 24, None, 0, true).await;

    let outcome = app
        .state
        .coupon_service()
        .run_validity_sweep()
        .await
        .expect("sweep");
    assert_eq!(outcome.deactivated, 3, "expired, future and maxed flip off");
    assert_eq!(outcome.activated, 2, "dormant and unlimited flip on");

    assert!(!reload_coupon(app.db(), expired.id).await.is_active);
    assert!(!reload_coupon(app.db(), future.id).await.is_active);
    assert!(!reload_coupon(app.db(), exhausted.id).await.is_active);
    assert!(reload_coupon(app.db(), dormant.id).await.is_active);
    assert!(reload_coupon(app.db(), unlimited.id).await.is_active);
    assert!(
        reload_coupon(app.db(), steady.id).await.is_active,
        "untouched coupon stays"
    );

    // A second sweep is a no-op: the flags already match reality.
    let outcome = app.state.coupon_service().run_validity_sweep().await.unwrap();
    assert_eq!(outcome.activated, 0);
    assert_eq!(outcome.deactivated, 0);
}

#[tokio::test]
async fn exhausted_coupon_is_never_reactivated() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;

    // In-window but out of uses, currently inactive.
    let maxed = seed_coupon(&app, store.id, "USEDUP", -1, 24, Some(5), 5, false).await;

    let outcome = app.state.coupon_service().run_validity_sweep().await.unwrap();
    assert_eq!(outcome.activated, 0);

    let reloaded = reload_coupon(app.db(), maxed.id).await;
    assert!(!reloaded.is_active);
}

#[tokio::test]
async fn sweep_flips_offers_on_window_alone() {
    let app = TestApp::new().await;
    let store = app.seed_store().await;

    let ended = seed_offer(&app, store.id, "Summer sale", -48, -24, true).await;
    let upcoming = seed_offer(&app, store.id, "Holiday sale", 24, 48, false).await;
    let live_but_off = seed_offer(&app, store.id, "Flash sale", -1, 24, false).await;

    let outcome = app
        .state
        .offer_service()
        .run_validity_sweep()
        .await
        .expect("sweep");
    assert_eq!(outcome.deactivated, 1);
    assert_eq!(outcome.activated, 1);

    assert!(!reload_offer(app.db(), ended.id).await.is_active);
    assert!(!reload_offer(app.db(), upcoming.id).await.is_active);
    assert!(reload_offer(app.db(), live_but_off.id).await.is_active);
}
