// FICHIER : src-app/tests/club_suite/schema_inference.rs

use clubhouse::admin::schema::{infer_columns, FieldKind, SchemaRegistry};
use clubhouse::store::{into_document, Document};
use clubhouse::utils::json::json;

fn docs() -> Vec<Document> {
    vec![
        into_document(json!({"_id": "1", "status": "x", "extra": 1})).unwrap(),
        into_document(json!({"_id": "2", "name": "Gym A", "type": "gym", "other": true})).unwrap(),
    ]
}

#[test]
fn test_preferred_columns_then_first_appearance() {
    let columns = infer_columns(&docs(), &["_id", "name", "type", "status"]);
    assert_eq!(columns, ["_id", "name", "type", "status", "extra", "other"]);
}

#[test]
fn test_registry_drives_columns_and_kinds() {
    let registry = SchemaRegistry::builtin().unwrap();
    let columns = registry.columns("facilities", &docs());
    assert_eq!(columns[0], "_id");
    assert_eq!(columns.len(), 6);

    assert_eq!(
        registry.field_kind("bookings", "memberId"),
        FieldKind::Reference {
            target: "members".into()
        }
    );
    assert!(matches!(
        registry.field_kind("bookings", "payment"),
        FieldKind::Composite { .. }
    ));
    // Champ inconnu du registre : heuristique de nom
    assert_eq!(registry.field_kind("lockers", "openedAt"), FieldKind::Timestamp);
    assert_eq!(registry.field_kind("lockers", "status"), FieldKind::Plain);
    assert_eq!(registry.field_kind("lockers", "notes"), FieldKind::LongText);
}
