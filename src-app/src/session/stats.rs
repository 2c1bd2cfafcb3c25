// FICHIER : src-app/src/session/stats.rs

use crate::admin::schema::SchemaRegistry;
use crate::store::{Document, DocumentStore, BOOKINGS, FACILITIES, USAGE_LOGS};
use crate::utils::json::{json, Value};
use crate::utils::Result;

/// Tableau de bord d'un membre, calculé par agrégation côté magasin.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemberStats {
    pub bookings_by_status: Vec<(String, i64)>,
    pub total_bookings: i64,
    pub confirmed_bookings: i64,
    pub cancelled_bookings: i64,
    pub completed_visits: i64,
    pub total_minutes: i64,
    pub average_minutes: Option<f64>,
    /// (libellé de l'installation, minutes), par durée décroissante.
    pub minutes_per_facility: Vec<(String, i64)>,
}

impl MemberStats {
    fn status_count(&self, status: &str) -> i64 {
        self.bookings_by_status
            .iter()
            .find(|(s, _)| s == status)
            .map(|(_, n)| *n)
            .unwrap_or(0)
    }
}

fn as_int(doc: &Document, field: &str) -> i64 {
    match doc.get(field) {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.round() as i64))
            .unwrap_or(0),
        _ => 0,
    }
}

pub async fn compute(
    store: &dyn DocumentStore,
    registry: &SchemaRegistry,
    member_id: &str,
) -> Result<MemberStats> {
    let by_status = store
        .aggregate(
            BOOKINGS,
            &[
                json!({"$match": {"memberId": member_id}}),
                json!({"$group": {"_id": "$status", "count": {"$sum": 1}}}),
                json!({"$sort": {"count": -1}}),
            ],
        )
        .await?;

    let mut stats = MemberStats {
        bookings_by_status: by_status
            .iter()
            .map(|g| {
                let status = match g.get("_id") {
                    Some(Value::String(s)) => s.clone(),
                    _ => "unknown".to_string(),
                };
                (status, as_int(g, "count"))
            })
            .collect(),
        ..Default::default()
    };
    stats.total_bookings = stats.bookings_by_status.iter().map(|(_, n)| n).sum();
    stats.confirmed_bookings = stats.status_count("confirmed");
    stats.cancelled_bookings = stats.status_count("cancelled");

    let completed = json!({"$match": {"memberId": member_id, "status": "completed"}});
    let usage = store
        .aggregate(
            USAGE_LOGS,
            &[
                completed.clone(),
                json!({"$group": {"_id": null, "visits": {"$sum": 1},
                                  "total": {"$sum": "$durationMinutes"},
                                  "average": {"$avg": "$durationMinutes"}}}),
            ],
        )
        .await?;
    if let Some(totals) = usage.first() {
        stats.completed_visits = as_int(totals, "visits");
        stats.total_minutes = as_int(totals, "total");
        stats.average_minutes = totals.get("average").and_then(Value::as_f64);
    }

    let per_facility = store
        .aggregate(
            USAGE_LOGS,
            &[
                completed,
                json!({"$group": {"_id": "$facilityId", "minutes": {"$sum": "$durationMinutes"}}}),
                json!({"$sort": {"minutes": -1}}),
            ],
        )
        .await?;
    for group in &per_facility {
        let id = group.get("_id").and_then(Value::as_str).unwrap_or_default();
        let label = match store.find_one(FACILITIES, id).await? {
            Some(facility) => registry.label_for(FACILITIES, &facility),
            None => id.to_string(),
        };
        stats.minutes_per_facility.push((label, as_int(group, "minutes")));
    }

    tracing::debug!(
        "📊 Statistiques {} : {} réservation(s), {} visite(s)",
        member_id,
        stats.total_bookings,
        stats.completed_visits
    );
    Ok(stats)
}
