//! clientq-core - Core library for clientq
//!
//! This crate contains the shared models, Supabase clients, and the pending
//! approval queue used by every clientq interface.

pub mod auth;
pub mod config;
pub mod error;
pub mod models;
pub mod queue;
pub mod realtime;
pub mod services;
pub mod store;
pub mod util;

pub use error::{Error, Result};
pub use models::{ClientId, ClientRecord, Decision, NewClient, Notification, PendingRecord};
