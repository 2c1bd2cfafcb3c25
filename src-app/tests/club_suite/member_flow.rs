// FICHIER : src-app/tests/club_suite/member_flow.rs

use crate::{init_memory_env, init_test_env};
use clubhouse::session::{authenticate, AuthOutcome, MemberSession};
use clubhouse::store::{document_id, DocumentStore, Filter, FACILITIES, NOTIFICATIONS, USAGE_LOGS};
use clubhouse::utils::AppError;
use chrono::{Duration, TimeZone, Utc};

#[tokio::test]
async fn test_login_routes_admin_and_member() {
    let env = init_test_env().await;
    let store = env.store.as_ref();

    assert_eq!(
        authenticate(store, &env.config.admin, "Admin", "admin123")
            .await
            .unwrap(),
        AuthOutcome::Admin
    );
    assert!(matches!(
        authenticate(store, &env.config.admin, "Hesham", "hesham123").await,
        Ok(AuthOutcome::Member(_))
    ));
    assert_eq!(
        authenticate(store, &env.config.admin, "Hesham", "nope")
            .await
            .unwrap(),
        AuthOutcome::Unauthorized
    );
    assert!(matches!(
        authenticate(store, &env.config.admin, "", "x").await,
        Err(AppError::Validation(_))
    ));
}

async fn login(env: &crate::TestEnv) -> MemberSession {
    let AuthOutcome::Member(member) =
        authenticate(env.store.as_ref(), &env.config.admin, "Hesham", "hesham123")
            .await
            .unwrap()
    else {
        panic!("membre attendu");
    };
    MemberSession::new(env.store.clone(), env.registry.clone(), member, &env.config).unwrap()
}

async fn gym_id(store: &dyn clubhouse::store::DocumentStore) -> String {
    let gyms = store
        .find(FACILITIES, &Filter::eq("name", "Gym A"), Some(1))
        .await
        .unwrap();
    document_id(&gyms[0]).unwrap().to_string()
}

#[tokio::test]
async fn test_booking_lifecycle_with_notifications() {
    let env = init_test_env().await;
    let session = login(&env).await;
    let gym = gym_id(env.store.as_ref()).await;

    let id = session
        .create_booking(&gym, "2025-11-21T09:00:00", "2025-11-21T10:00:00", None)
        .await
        .unwrap();
    let list = session.bookings().await.unwrap();
    assert_eq!(list.rows.len(), 1);
    assert_eq!(
        list.columns[..6],
        ["_id", "facilityId", "startTime", "endTime", "durationMinutes", "status"]
    );

    let before = env.store.count(NOTIFICATIONS, &Filter::all()).await.unwrap();
    session.cancel_booking(&id).await.unwrap();
    let after = env.store.count(NOTIFICATIONS, &Filter::all()).await.unwrap();
    assert_eq!(after, before + 1);

    let stats = session.stats().await.unwrap();
    assert_eq!(stats.cancelled_bookings, 1);
    assert_eq!(stats.confirmed_bookings, 0);
}

#[tokio::test]
async fn test_cancel_survives_notification_failure() {
    let (store, registry, config) = init_memory_env().await;
    let AuthOutcome::Member(member) =
        authenticate(store.as_ref(), &config.admin, "Hesham", "hesham123")
            .await
            .unwrap()
    else {
        panic!("membre attendu");
    };
    let session = MemberSession::new(store.clone(), registry, member, &config).unwrap();
    let gym = gym_id(store.as_ref()).await;
    let id = session
        .create_booking(&gym, "2025-11-21T09:00", "2025-11-21T10:00", None)
        .await
        .unwrap();

    store.fail_inserts_into(NOTIFICATIONS);
    let before = store.count(NOTIFICATIONS, &Filter::all()).await.unwrap();
    session.cancel_booking(&id).await.unwrap();
    assert_eq!(
        store.count(NOTIFICATIONS, &Filter::all()).await.unwrap(),
        before
    );
}

#[tokio::test]
async fn test_visit_duration_and_stats() {
    let env = init_test_env().await;
    let session = login(&env).await;
    let gym = gym_id(env.store.as_ref()).await;

    let t0 = Utc.with_ymd_and_hms(2025, 11, 21, 9, 0, 0).unwrap();
    let log = session.check_in_at(&gym, None, t0).await.unwrap();
    let minutes = session
        .check_out_at(&log, t0 + Duration::minutes(95))
        .await
        .unwrap();
    assert_eq!(minutes, 95);

    let stored = env.store.find_one(USAGE_LOGS, &log).await.unwrap().unwrap();
    assert_eq!(stored["durationMinutes"], 95);

    let stats = session.stats().await.unwrap();
    assert_eq!(stats.completed_visits, 1);
    assert_eq!(stats.total_minutes, 95);
    assert_eq!(stats.minutes_per_facility, vec![("Gym A".to_string(), 95)]);

    session.logout().await;
}
