// FICHIER : src-app/src/session/notify.rs

use crate::store::{Document, DocumentStore, NOTIFICATIONS};
use crate::utils::json::Value;
use crate::utils::{Arc, DateTime, Utc};
use chrono::SecondsFormat;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    BookingCreated,
    BookingCancelled,
    CheckIn,
    CheckOut,
    Logout,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingCreated => "booking_created",
            NotificationKind::BookingCancelled => "booking_cancelled",
            NotificationKind::CheckIn => "check_in",
            NotificationKind::CheckOut => "check_out",
            NotificationKind::Logout => "logout",
        }
    }
}

/// Écrit les notifications d'un membre. Effet de bord pur : un échec est
/// journalisé et n'altère jamais le résultat de l'opération principale.
#[derive(Clone)]
pub struct Notifier {
    store: Arc<dyn DocumentStore>,
}

impl Notifier {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Renvoie l'identifiant de la notification, `None` si l'écriture a échoué.
    pub async fn notify(
        &self,
        member_id: &str,
        booking_id: Option<&str>,
        kind: NotificationKind,
        title: &str,
        message: &str,
    ) -> Option<String> {
        let doc = build(member_id, booking_id, kind, title, message, Utc::now());
        match self.store.insert(NOTIFICATIONS, doc).await {
            Ok(id) => {
                tracing::debug!("🔔 Notification {} ({}) pour {}", id, kind.as_str(), member_id);
                Some(id)
            }
            Err(e) => {
                tracing::warn!(
                    "⚠️ Notification '{}' non enregistrée pour {} : {}",
                    kind.as_str(),
                    member_id,
                    e
                );
                None
            }
        }
    }
}

pub fn build(
    member_id: &str,
    booking_id: Option<&str>,
    kind: NotificationKind,
    title: &str,
    message: &str,
    sent_at: DateTime<Utc>,
) -> Document {
    let mut doc = Document::new();
    doc.insert("memberId".into(), Value::from(member_id));
    if let Some(id) = booking_id {
        doc.insert("bookingId".into(), Value::from(id));
    }
    doc.insert("type".into(), Value::from(kind.as_str()));
    doc.insert("title".into(), Value::from(title));
    doc.insert("message".into(), Value::from(message));
    doc.insert(
        "sentAt".into(),
        Value::from(sent_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
    );
    doc.insert("status".into(), Value::from("sent"));
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::Filter;
    use chrono::TimeZone;

    #[test]
    fn test_document_shape() {
        let at = Utc.with_ymd_and_hms(2025, 11, 21, 9, 0, 0).unwrap();
        let doc = build("m1", Some("b1"), NotificationKind::CheckIn, "T", "M", at);
        let keys: Vec<&str> = doc.keys().map(String::as_str).collect();
        assert_eq!(
            keys,
            ["memberId", "bookingId", "type", "title", "message", "sentAt", "status"]
        );
        assert_eq!(doc["type"], "check_in");
        assert_eq!(doc["sentAt"], "2025-11-21T09:00:00Z");

        let bare = build("m1", None, NotificationKind::Logout, "T", "M", at);
        assert!(!bare.contains_key("bookingId"));
    }

    #[tokio::test]
    async fn test_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::new());
        let notifier = Notifier::new(store.clone());

        assert!(notifier
            .notify("m1", None, NotificationKind::Logout, "Bye", "See you")
            .await
            .is_some());

        store.fail_inserts_into(NOTIFICATIONS);
        assert!(notifier
            .notify("m1", None, NotificationKind::Logout, "Bye", "See you")
            .await
            .is_none());
        assert_eq!(store.count(NOTIFICATIONS, &Filter::all()).await.unwrap(), 1);
    }
}
