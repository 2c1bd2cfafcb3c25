// FICHIER : src-app/src/admin/mod.rs

//! Interface d'administration générique : navigation tabulaire, formulaires
//! dérivés du registre de schémas, commandes CRUD.

pub mod browser;
pub mod coercion;
pub mod form;
pub mod schema;
pub mod session;

pub use browser::BrowserState;
pub use form::{FormBuilder, FormModel};
pub use schema::{FieldKind, SchemaRegistry};
pub use session::{AdminCommand, AdminOutcome, AdminSession};
