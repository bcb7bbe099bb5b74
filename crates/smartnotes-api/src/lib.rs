//! smartnotes-api - REST backend for SmartNotes clients
//!
//! Per-user note CRUD and a stub summarizer behind static bearer tokens.
//! State is in memory; restarting the server forgets every note.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod store;
pub mod summarize;

pub use config::AppConfig;
pub use routes::{app_router, AppState};
