// FICHIER : src-app/src/session/member.rs

//! Espace membre : réservations, annulation, passages (check-in/out),
//! statistiques. Chaque action réussie émet une notification.

use crate::admin::browser::render_row;
use crate::admin::coercion;
use crate::admin::schema::{infer_columns, SchemaRegistry};
use crate::session::notify::{NotificationKind, Notifier};
use crate::session::stats::{self, MemberStats};
use crate::store::filter::Operator;
use crate::store::{
    document_id, Document, DocumentStore, Filter, BOOKINGS, FACILITIES, MEMBERS, USAGE_LOGS,
};
use crate::utils::json::Value;
use crate::utils::{AppConfig, AppError, Arc, DateTime, OnceLock, Result, Utc};
use chrono::{NaiveDateTime, SecondsFormat};
use regex::Regex;

pub const BOOKING_COLUMNS: [&str; 6] = [
    "_id",
    "facilityId",
    "startTime",
    "endTime",
    "durationMinutes",
    "status",
];

pub const STATUS_CONFIRMED: &str = "confirmed";
pub const STATUS_CANCELLED: &str = "cancelled";
pub const STATUS_ACTIVE: &str = "active";
pub const STATUS_COMPLETED: &str = "completed";

const ACTIVE_BOOKINGS_FIELD: &str = "activeBookingsCount";

// --- HORODATAGE ---

fn loose_datetime_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}(:\d{2})?$").expect("regex littérale valide")
    })
}

/// RFC 3339, ou `YYYY-MM-DDTHH:MM[:SS]` sans fuseau (lu en UTC).
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    let text = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Ok(dt.with_timezone(&Utc));
    }
    if let Some(caps) = loose_datetime_re().captures(text) {
        let format = if caps.get(1).is_some() {
            "%Y-%m-%dT%H:%M:%S"
        } else {
            "%Y-%m-%dT%H:%M"
        };
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Ok(naive.and_utc());
        }
    }
    Err(AppError::validation(format!(
        "Date/heure invalide : '{}' (attendu ISO, ex. 2025-11-21T09:00:00)",
        text
    )))
}

pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Durée arrondie à la minute la plus proche, jamais négative.
pub fn minutes_between(start: DateTime<Utc>, end: DateTime<Utc>) -> i64 {
    let seconds = (end - start).num_seconds().max(0);
    (seconds as f64 / 60.0).round() as i64
}

// --- RÉSERVATIONS ---

/// Réservations du membre et colonnes à afficher.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookingList {
    pub columns: Vec<String>,
    pub rows: Vec<Document>,
}

impl BookingList {
    pub fn table(&self, max_len: usize) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|doc| render_row(doc, &self.columns, max_len))
            .collect()
    }
}

pub struct MemberSession {
    store: Arc<dyn DocumentStore>,
    registry: Arc<SchemaRegistry>,
    notifier: Notifier,
    member: Document,
    member_id: String,
    bookings_limit: usize,
}

impl MemberSession {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        registry: Arc<SchemaRegistry>,
        member: Document,
        config: &AppConfig,
    ) -> Result<Self> {
        let member_id = document_id(&member)
            .map(str::to_string)
            .ok_or_else(|| AppError::validation("Membre sans _id"))?;
        Ok(Self {
            notifier: Notifier::new(store.clone()),
            store,
            registry,
            member,
            member_id,
            bookings_limit: config.ui.bookings_limit,
        })
    }

    pub fn member(&self) -> &Document {
        &self.member
    }

    pub fn member_id(&self) -> &str {
        &self.member_id
    }

    pub fn display_name(&self) -> String {
        self.registry.label_for(MEMBERS, &self.member)
    }

    fn own(&self) -> Filter {
        Filter::eq("memberId", self.member_id.as_str())
    }

    pub async fn bookings(&self) -> Result<BookingList> {
        let rows = self
            .store
            .find(BOOKINGS, &self.own(), Some(self.bookings_limit))
            .await?;
        Ok(BookingList {
            columns: infer_columns(&rows, &BOOKING_COLUMNS),
            rows,
        })
    }

    /// Installations réservables : (identifiant, libellé).
    pub async fn facilities(&self) -> Result<Vec<(String, String)>> {
        let docs = self
            .store
            .find(FACILITIES, &Filter::all(), Some(self.bookings_limit))
            .await?;
        Ok(docs
            .iter()
            .filter_map(|d| {
                document_id(d).map(|id| (id.to_string(), self.registry.label_for(FACILITIES, d)))
            })
            .collect())
    }

    async fn facility(&self, facility_id: &str) -> Result<Document> {
        self.store
            .find_one(FACILITIES, facility_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("{}/{}", FACILITIES, facility_id)))
    }

    // Document du membre dans `collection`, sinon introuvable.
    async fn owned(&self, collection: &str, id: &str) -> Result<Document> {
        match self.store.find_one(collection, id).await? {
            Some(doc)
                if doc.get("memberId").and_then(Value::as_str) == Some(self.member_id.as_str()) =>
            {
                Ok(doc)
            }
            _ => Err(AppError::not_found(format!("{}/{}", collection, id))),
        }
    }

    pub async fn create_booking(
        &self,
        facility_id: &str,
        start: &str,
        end: &str,
        payment: Option<Document>,
    ) -> Result<String> {
        let start = parse_timestamp(start)?;
        let end = parse_timestamp(end)?;
        if end <= start {
            return Err(AppError::validation(
                "La fin de réservation doit suivre le début",
            ));
        }
        let facility = self.facility(facility_id).await?;
        let facility_label = self.registry.label_for(FACILITIES, &facility);

        let mut booking = Document::new();
        booking.insert("memberId".into(), Value::from(self.member_id.as_str()));
        booking.insert("facilityId".into(), Value::from(facility_id));
        booking.insert("startTime".into(), Value::from(format_timestamp(start)));
        booking.insert("endTime".into(), Value::from(format_timestamp(end)));
        booking.insert(
            "durationMinutes".into(),
            Value::from(minutes_between(start, end)),
        );
        booking.insert("status".into(), Value::from(STATUS_CONFIRMED));
        booking.insert("createdAt".into(), Value::from(format_timestamp(Utc::now())));
        if let Some(payment) = payment.filter(|p| !p.is_empty()) {
            booking.insert("payment".into(), Value::Object(payment));
        }

        let id = self.store.insert(BOOKINGS, booking).await?;
        tracing::info!("📅 Réservation {} créée ({})", id, facility_label);
        self.adjust_active_bookings(1).await;
        self.notifier
            .notify(
                &self.member_id,
                Some(&id),
                NotificationKind::BookingCreated,
                "Booking confirmed",
                &format!(
                    "Your booking for {} on {} is confirmed.",
                    facility_label,
                    format_timestamp(start)
                ),
            )
            .await;
        Ok(id)
    }

    /// Annulation douce : le document reste, statut `cancelled`.
    pub async fn cancel_booking(&self, booking_id: &str) -> Result<()> {
        let booking = self.owned(BOOKINGS, booking_id).await?;
        if booking.get("status").and_then(Value::as_str) == Some(STATUS_CANCELLED) {
            return Err(AppError::validation(format!(
                "Réservation {} déjà annulée",
                booking_id
            )));
        }

        let mut changes = Document::new();
        changes.insert("status".into(), Value::from(STATUS_CANCELLED));
        changes.insert("cancelledAt".into(), Value::from(format_timestamp(Utc::now())));
        if self.store.update(BOOKINGS, booking_id, changes).await? == 0 {
            return Err(AppError::not_found(format!("{}/{}", BOOKINGS, booking_id)));
        }
        tracing::info!("🚫 Réservation {} annulée", booking_id);

        self.adjust_active_bookings(-1).await;
        self.notifier
            .notify(
                &self.member_id,
                Some(booking_id),
                NotificationKind::BookingCancelled,
                "Booking cancelled",
                &format!("Your booking {} has been cancelled.", booking_id),
            )
            .await;
        Ok(())
    }

    // Compteur dénormalisé : un échec est journalisé, la réservation reste valide.
    async fn adjust_active_bookings(&self, delta: i64) {
        let result = async {
            let current = self
                .store
                .find_one(MEMBERS, &self.member_id)
                .await?
                .and_then(|m| m.get(ACTIVE_BOOKINGS_FIELD).and_then(Value::as_i64))
                .unwrap_or(0);
            let mut changes = Document::new();
            changes.insert(
                ACTIVE_BOOKINGS_FIELD.into(),
                Value::from((current + delta).max(0)),
            );
            self.store.update(MEMBERS, &self.member_id, changes).await
        }
        .await;
        if let Err(e) = result {
            tracing::warn!(
                "⚠️ Compteur de réservations non mis à jour pour {} : {}",
                self.member_id,
                e
            );
        }
    }

    // --- PASSAGES ---

    pub async fn check_in(&self, facility_id: &str, booking_id: Option<&str>) -> Result<String> {
        self.check_in_at(facility_id, booking_id, Utc::now()).await
    }

    pub async fn check_in_at(
        &self,
        facility_id: &str,
        booking_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let facility = self.facility(facility_id).await?;
        if let Some(id) = booking_id {
            let booking = self.owned(BOOKINGS, id).await?;
            if booking.get("status").and_then(Value::as_str) == Some(STATUS_CANCELLED) {
                return Err(AppError::validation(format!(
                    "Réservation {} annulée : passage impossible",
                    id
                )));
            }
        }

        let active = self
            .own()
            .and("status", Operator::Eq, STATUS_ACTIVE);
        if self.store.count(USAGE_LOGS, &active).await? > 0 {
            return Err(AppError::validation(
                "Un passage est déjà en cours : faites d'abord un check-out",
            ));
        }

        let mut log = Document::new();
        log.insert("memberId".into(), Value::from(self.member_id.as_str()));
        log.insert("facilityId".into(), Value::from(facility_id));
        if let Some(id) = booking_id {
            log.insert("bookingId".into(), Value::from(id));
        }
        log.insert("checkInTime".into(), Value::from(format_timestamp(now)));
        log.insert("status".into(), Value::from(STATUS_ACTIVE));

        let id = self.store.insert(USAGE_LOGS, log).await?;
        let label = self.registry.label_for(FACILITIES, &facility);
        tracing::info!("🚪 Check-in {} ({})", id, label);
        self.notifier
            .notify(
                &self.member_id,
                booking_id,
                NotificationKind::CheckIn,
                "Checked in",
                &format!("You checked in at {}.", label),
            )
            .await;
        Ok(id)
    }

    pub async fn check_out(&self, log_id: &str) -> Result<i64> {
        self.check_out_at(log_id, Utc::now()).await
    }

    /// Clôt un passage actif ; renvoie la durée en minutes.
    pub async fn check_out_at(&self, log_id: &str, now: DateTime<Utc>) -> Result<i64> {
        let log = self.owned(USAGE_LOGS, log_id).await?;
        if log.get("status").and_then(Value::as_str) != Some(STATUS_ACTIVE) {
            return Err(AppError::validation(format!(
                "Le passage {} n'est pas en cours",
                log_id
            )));
        }
        let check_in = log
            .get("checkInTime")
            .map(coercion::to_edit)
            .ok_or_else(|| AppError::validation("Passage sans heure d'arrivée"))
            .and_then(|raw| parse_timestamp(&raw))?;
        let minutes = minutes_between(check_in, now);

        let mut changes = Document::new();
        changes.insert("checkOutTime".into(), Value::from(format_timestamp(now)));
        changes.insert("durationMinutes".into(), Value::from(minutes));
        changes.insert("status".into(), Value::from(STATUS_COMPLETED));
        if self.store.update(USAGE_LOGS, log_id, changes).await? == 0 {
            return Err(AppError::not_found(format!("{}/{}", USAGE_LOGS, log_id)));
        }
        tracing::info!("🏁 Check-out {} : {} min", log_id, minutes);

        let booking_id = log.get("bookingId").and_then(Value::as_str);
        self.notifier
            .notify(
                &self.member_id,
                booking_id,
                NotificationKind::CheckOut,
                "Checked out",
                &format!("Visit finished after {} minutes.", minutes),
            )
            .await;
        Ok(minutes)
    }

    pub async fn stats(&self) -> Result<MemberStats> {
        stats::compute(&*self.store, &self.registry, &self.member_id).await
    }

    pub async fn logout(self) {
        self.notifier
            .notify(
                &self.member_id,
                None,
                NotificationKind::Logout,
                "Logged out",
                "You have been logged out.",
            )
            .await;
        tracing::info!("👋 Déconnexion de {}", self.member_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::{into_document, NOTIFICATIONS};
    use crate::utils::json::json;
    use chrono::{Duration, TimeZone};

    struct Club {
        store: Arc<MemoryStore>,
        session: MemberSession,
        gym: String,
    }

    async fn club() -> Club {
        let store = Arc::new(MemoryStore::new());
        let member_id = store
            .insert(
                MEMBERS,
                into_document(json!({"firstName": "Hesham", "lastName": "El Afandi",
                                     "activeBookingsCount": 0}))
                .unwrap(),
            )
            .await
            .unwrap();
        let gym = store
            .insert(FACILITIES, into_document(json!({"name": "Gym A"})).unwrap())
            .await
            .unwrap();
        let member = store.find_one(MEMBERS, &member_id).await.unwrap().unwrap();
        let session = MemberSession::new(
            store.clone(),
            Arc::new(SchemaRegistry::builtin().unwrap()),
            member,
            &AppConfig::default(),
        )
        .unwrap();
        Club {
            store,
            session,
            gym,
        }
    }

    impl Club {
        async fn notifications(&self) -> u64 {
            self.store.count(NOTIFICATIONS, &Filter::all()).await.unwrap()
        }

        async fn active_count(&self) -> i64 {
            self.store
                .find_one(MEMBERS, self.session.member_id())
                .await
                .unwrap()
                .unwrap()[ACTIVE_BOOKINGS_FIELD]
                .as_i64()
                .unwrap()
        }
    }

    #[test]
    fn test_parse_timestamp_forms() {
        let expected = Utc.with_ymd_and_hms(2025, 11, 21, 9, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2025-11-21T09:00:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-11-21T09:00").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-11-21T09:00:00Z").unwrap(), expected);
        assert_eq!(parse_timestamp("2025-11-21T11:00:00+02:00").unwrap(), expected);
        assert!(matches!(
            parse_timestamp("21/11/2025"),
            Err(AppError::Validation(_))
        ));
        assert!(parse_timestamp("2025-13-40T09:00").is_err());
    }

    #[tokio::test]
    async fn test_create_booking() {
        let club = club().await;
        let id = club
            .session
            .create_booking(&club.gym, "2025-11-21T09:00", "2025-11-21T10:30", None)
            .await
            .unwrap();

        let booking = club.store.find_one(BOOKINGS, &id).await.unwrap().unwrap();
        assert_eq!(booking["durationMinutes"], 90);
        assert_eq!(booking["status"], STATUS_CONFIRMED);
        assert_eq!(booking["startTime"], "2025-11-21T09:00:00Z");
        assert_eq!(club.active_count().await, 1);
        assert_eq!(club.notifications().await, 1);

        let list = club.session.bookings().await.unwrap();
        assert_eq!(list.rows.len(), 1);
        assert_eq!(
            club.session.facilities().await.unwrap(),
            vec![(club.gym.clone(), "Gym A".to_string())]
        );
        assert_eq!(list.columns[0], "_id");
        assert_eq!(list.columns[1], "facilityId");
    }

    #[tokio::test]
    async fn test_create_booking_validation() {
        let club = club().await;
        let s = &club.session;
        assert!(matches!(
            s.create_booking(&club.gym, "2025-11-21T10:00", "2025-11-21T09:00", None)
                .await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            s.create_booking(&club.gym, "demain", "2025-11-21T09:00", None)
                .await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            s.create_booking("nope", "2025-11-21T09:00", "2025-11-21T10:00", None)
                .await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(club.notifications().await, 0);
    }

    #[tokio::test]
    async fn test_cancel_adds_exactly_one_notification() {
        let club = club().await;
        let id = club
            .session
            .create_booking(&club.gym, "2025-11-21T09:00", "2025-11-21T10:00", None)
            .await
            .unwrap();
        let before = club.notifications().await;

        club.session.cancel_booking(&id).await.unwrap();
        assert_eq!(club.notifications().await, before + 1);
        let booking = club.store.find_one(BOOKINGS, &id).await.unwrap().unwrap();
        assert_eq!(booking["status"], STATUS_CANCELLED);
        assert_eq!(club.active_count().await, 0);

        assert!(matches!(
            club.session.cancel_booking(&id).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_cancel_succeeds_when_notification_fails() {
        let club = club().await;
        let id = club
            .session
            .create_booking(&club.gym, "2025-11-21T09:00", "2025-11-21T10:00", None)
            .await
            .unwrap();
        let before = club.notifications().await;

        club.store.fail_inserts_into(NOTIFICATIONS);
        club.session.cancel_booking(&id).await.unwrap();
        assert_eq!(club.notifications().await, before);
        let booking = club.store.find_one(BOOKINGS, &id).await.unwrap().unwrap();
        assert_eq!(booking["status"], STATUS_CANCELLED);
    }

    #[tokio::test]
    async fn test_cancel_foreign_booking_is_not_found() {
        let club = club().await;
        let foreign = club
            .store
            .insert(
                BOOKINGS,
                into_document(json!({"memberId": "someone-else", "status": "confirmed"}))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(matches!(
            club.session.cancel_booking(&foreign).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_check_out_after_95_minutes() {
        let club = club().await;
        let t0 = Utc.with_ymd_and_hms(2025, 11, 21, 9, 0, 0).unwrap();
        let log = club
            .session
            .check_in_at(&club.gym, None, t0)
            .await
            .unwrap();

        // Un seul passage actif à la fois
        assert!(matches!(
            club.session.check_in_at(&club.gym, None, t0).await,
            Err(AppError::Validation(_))
        ));

        let minutes = club
            .session
            .check_out_at(&log, t0 + Duration::minutes(95))
            .await
            .unwrap();
        assert_eq!(minutes, 95);

        let doc = club.store.find_one(USAGE_LOGS, &log).await.unwrap().unwrap();
        assert_eq!(doc["durationMinutes"], 95);
        assert_eq!(doc["status"], STATUS_COMPLETED);
        assert_eq!(doc["checkOutTime"], "2025-11-21T10:35:00Z");

        assert!(matches!(
            club.session.check_out_at(&log, t0).await,
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_minutes_rounding() {
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(minutes_between(t0, t0 + Duration::seconds(89)), 1);
        assert_eq!(minutes_between(t0, t0 + Duration::seconds(90)), 2);
        assert_eq!(minutes_between(t0 + Duration::minutes(5), t0), 0);
    }
}
