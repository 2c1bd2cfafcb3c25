// FICHIER : src-app/src/store/seed.rs

use crate::store::{
    document_id, into_document, DocumentStore, Filter, COLLECTIONS, FACILITIES, MEMBERS,
    MEMBERSHIP_LEVELS,
};
use crate::utils::json::json;
use crate::utils::{AppError, Result};

/// Bilan d'un amorçage : ce qui a été créé ou inséré.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SeedReport {
    pub created_collections: Vec<String>,
    pub inserted: Vec<(String, usize)>,
}

impl SeedReport {
    pub fn total_inserted(&self) -> usize {
        self.inserted.iter().map(|(_, n)| n).sum()
    }

    fn record(&mut self, collection: &str, n: usize) {
        if n > 0 {
            self.inserted.push((collection.to_string(), n));
        }
    }
}

/// Crée les collections manquantes et l'index unique `members.email`.
pub async fn ensure_collections(store: &dyn DocumentStore) -> Result<Vec<String>> {
    let existing = store.list_collections().await?;
    let mut created = Vec::new();
    for name in COLLECTIONS {
        if !existing.contains(name) {
            store.ensure_collection(name).await?;
            created.push(name.to_string());
        }
    }

    match store.create_unique_index(MEMBERS, "email").await {
        Ok(()) => {}
        // Des doublons déjà présents n'empêchent pas le démarrage
        Err(e @ AppError::DuplicateKey { .. }) => {
            tracing::warn!("⚠️ Index unique members.email non créé : {}", e)
        }
        Err(e) => return Err(e),
    }
    Ok(created)
}

/// Insère le jeu d'exemple dans les collections vides uniquement.
pub async fn seed_sample_data(store: &dyn DocumentStore) -> Result<SeedReport> {
    let mut report = SeedReport {
        created_collections: ensure_collections(store).await?,
        ..Default::default()
    };

    if store.count(MEMBERSHIP_LEVELS, &Filter::all()).await? == 0 {
        let levels = [
            json!({"name": "Basic", "maxBookingsPerDay": 1, "advanceBookingWindowDays": 7,
                   "accessibleFacilityTypes": ["gym"], "price": 100}),
            json!({"name": "Premium", "maxBookingsPerDay": 3, "advanceBookingWindowDays": 30,
                   "accessibleFacilityTypes": ["gym", "pool", "court"], "price": 300}),
        ];
        for level in levels {
            store
                .insert(MEMBERSHIP_LEVELS, into_document(level)?)
                .await?;
        }
        report.record(MEMBERSHIP_LEVELS, 2);
    }

    if store.count(FACILITIES, &Filter::all()).await? == 0 {
        let facilities = [
            json!({"name": "Gym A", "type": "gym", "status": "available", "maintenanceNote": "",
                   "bookedSlots": [],
                   "assignedStaff": [{"name": "Ahmed", "role": "manager", "contact": "010..."}],
                   "openingHours": [{"day": "Mon", "open": "06:00", "close": "22:00"}]}),
            json!({"name": "Pool 1", "type": "pool", "status": "maintenance",
                   "maintenanceNote": "Cleaning", "bookedSlots": [],
                   "assignedStaff": [{"name": "Mona", "role": "lifeguard", "contact": "011..."}],
                   "openingHours": [{"day": "Tue", "open": "08:00", "close": "20:00"}]}),
        ];
        for facility in facilities {
            store.insert(FACILITIES, into_document(facility)?).await?;
        }
        report.record(FACILITIES, 2);
    }

    if store.count(MEMBERS, &Filter::all()).await? == 0 {
        let basic = store
            .find(MEMBERSHIP_LEVELS, &Filter::eq("name", "Basic"), Some(1))
            .await?;
        let level_id = basic
            .first()
            .and_then(document_id)
            .map(|id| json!(id))
            .unwrap_or(json!(null));

        let member = json!({
            "firstName": "Hesham", "lastName": "El Afandi", "email": "hesham@example.com",
            "phone": "01000000000", "password": "hesham123",
            "membershipLevelId": level_id, "status": "active", "activeBookingsCount": 0
        });
        match store.insert(MEMBERS, into_document(member)?).await {
            Ok(_) => report.record(MEMBERS, 1),
            Err(AppError::DuplicateKey { .. }) => {
                tracing::info!("Membre d'exemple déjà présent, ignoré")
            }
            Err(e) => return Err(e),
        }
    }

    tracing::info!(
        "🌱 Amorçage terminé : {} collection(s) créée(s), {} document(s) inséré(s)",
        report.created_collections.len(),
        report.total_inserted()
    );
    Ok(report)
}
