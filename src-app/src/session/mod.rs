// FICHIER : src-app/src/session/mod.rs

//! Routage des connexions et services de l'espace membre.

pub mod auth;
pub mod member;
pub mod notify;
pub mod stats;

pub use auth::{authenticate, AuthOutcome};
pub use member::MemberSession;
pub use notify::{NotificationKind, Notifier};
pub use stats::MemberStats;
