// FICHIER : src-app/tests/club_suite/admin_flow.rs

use crate::{init_memory_env, init_test_env};
use clubhouse::admin::form::{FormMode, Widget};
use clubhouse::admin::{AdminCommand, AdminOutcome, AdminSession};
use clubhouse::store::{document_id, DocumentStore, Filter, BOOKINGS, FACILITIES, MEMBERS};
use clubhouse::utils::json::{json, Value};
use clubhouse::utils::AppError;

#[tokio::test]
async fn test_booking_with_payment_via_form() {
    let env = init_test_env().await;
    let mut admin = AdminSession::new(env.store.clone(), env.registry.clone(), &env.config);

    admin.execute(AdminCommand::Load(BOOKINGS)).await.unwrap();
    assert_eq!(admin.browser().status_line(), "Showing 0 documents (max 200)");

    let AdminOutcome::Form(mut form) = admin.execute(AdminCommand::NewForm).await.unwrap() else {
        panic!("formulaire attendu");
    };
    assert_eq!(form.mode(), &FormMode::Insert);
    form.choose("memberId", 1).unwrap();
    form.choose("facilityId", 1).unwrap();
    form.set_text("startTime", "2025-11-21T09:00:00").unwrap();
    form.set_text("durationMinutes", "60").unwrap();
    form.set_subfield("payment", "amount", "50").unwrap();
    form.set_subfield("payment", "method", "cash").unwrap();

    let AdminOutcome::Inserted(id) = admin.execute(AdminCommand::Submit(&form)).await.unwrap()
    else {
        panic!("insertion attendue");
    };
    let booking = env.store.find_one(BOOKINGS, &id).await.unwrap().unwrap();
    assert_eq!(booking["payment"], json!({"amount": 50, "method": "cash"}));
    assert_eq!(booking["durationMinutes"], 60);
    // Horodatage conservé tel que saisi
    assert_eq!(booking["startTime"], "2025-11-21T09:00:00");
    assert_eq!(admin.browser().visible_count(), 1);
}

#[tokio::test]
async fn test_round_trip_edit_without_changes() {
    let env = init_test_env().await;
    let mut admin = AdminSession::new(env.store.clone(), env.registry.clone(), &env.config);
    admin.execute(AdminCommand::Load(FACILITIES)).await.unwrap();

    let original = admin.browser().select(0).unwrap().clone();
    let AdminOutcome::Form(form) = admin.execute(AdminCommand::EditForm(0)).await.unwrap() else {
        panic!("formulaire attendu");
    };

    // Tableaux et objets pré-remplis en JSON complet
    match &form.field("assignedStaff").unwrap().widget {
        Widget::MultiLine { text } | Widget::Line { text, .. } => {
            assert_eq!(text, &original["assignedStaff"].to_string())
        }
        other => panic!("champ texte attendu, reçu {:?}", other),
    }

    let out = admin.execute(AdminCommand::Submit(&form)).await.unwrap();
    assert!(matches!(out, AdminOutcome::Updated { changed: false, .. }));

    let id = document_id(&original).unwrap();
    let stored = env.store.find_one(FACILITIES, id).await.unwrap().unwrap();
    assert_eq!(stored, original);
}

#[tokio::test]
async fn test_filter_on_loaded_collection() {
    let env = init_test_env().await;
    let mut admin = AdminSession::new(env.store.clone(), env.registry.clone(), &env.config);
    admin.execute(AdminCommand::Load(FACILITIES)).await.unwrap();

    let AdminOutcome::Filtered(n) = admin.execute(AdminCommand::Filter("MAINT")).await.unwrap()
    else {
        panic!("filtre attendu");
    };
    assert_eq!(n, 1);
    let first = admin.browser().table();
    admin.execute(AdminCommand::Filter("MAINT")).await.unwrap();
    assert_eq!(admin.browser().table(), first);

    admin.execute(AdminCommand::Filter("")).await.unwrap();
    assert_eq!(admin.browser().visible_count(), 2);
}

#[tokio::test]
async fn test_duplicate_member_email_is_rejected() {
    let (store, registry, config) = init_memory_env().await;
    let mut admin = AdminSession::new(store.clone(), registry, &config);
    admin.execute(AdminCommand::Load(MEMBERS)).await.unwrap();
    let before = store.count(MEMBERS, &Filter::all()).await.unwrap();

    let AdminOutcome::Form(mut form) = admin.execute(AdminCommand::NewForm).await.unwrap() else {
        panic!("formulaire attendu");
    };
    form.set_text("firstName", "Copy").unwrap();
    form.set_text("email", "hesham@example.com").unwrap();

    let res = admin.execute(AdminCommand::Submit(&form)).await;
    assert!(matches!(res, Err(AppError::DuplicateKey { .. })));
    assert_eq!(store.count(MEMBERS, &Filter::all()).await.unwrap(), before);

    // Le formulaire reste utilisable après correction
    form.set_text("email", "copy@example.com").unwrap();
    assert!(matches!(
        admin.execute(AdminCommand::Submit(&form)).await,
        Ok(AdminOutcome::Inserted(_))
    ));
}

#[tokio::test]
async fn test_unselected_reference_stores_null() {
    let (store, registry, config) = init_memory_env().await;
    let mut admin = AdminSession::new(store.clone(), registry, &config);
    admin.execute(AdminCommand::Load(MEMBERS)).await.unwrap();

    let AdminOutcome::Form(mut form) = admin.execute(AdminCommand::NewForm).await.unwrap() else {
        panic!("formulaire attendu");
    };
    form.set_text("firstName", "Mona").unwrap();
    form.set_text("email", "mona@example.com").unwrap();
    form.choose("membershipLevelId", 0).unwrap();

    let AdminOutcome::Inserted(id) = admin.execute(AdminCommand::Submit(&form)).await.unwrap()
    else {
        panic!("insertion attendue");
    };
    let doc = store.find_one(MEMBERS, &id).await.unwrap().unwrap();
    assert_eq!(doc["membershipLevelId"], Value::Null);
}

#[tokio::test]
async fn test_store_offline_surfaces_connection_error() {
    let (store, registry, config) = init_memory_env().await;
    let mut admin = AdminSession::new(store.clone(), registry, &config);
    admin.execute(AdminCommand::Load(MEMBERS)).await.unwrap();

    store.set_offline(true);
    let res = admin.execute(AdminCommand::Load(FACILITIES)).await;
    assert!(matches!(res, Err(AppError::Connection(_))));
    assert_eq!(admin.browser().collection(), Some(MEMBERS));

    store.clear_faults();
    assert!(admin.execute(AdminCommand::Load(FACILITIES)).await.is_ok());
}
