// FICHIER : src-app/src/lib.rs

pub mod admin;
pub mod session;
pub mod store;

pub mod utils;
