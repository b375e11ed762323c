//! Data models for clientq

mod client;
mod notification;
mod role;

pub use client::{ClientId, ClientRecord, ClientUpdate, NewClient, PendingRecord};
pub use notification::{Decision, Notification};
pub use role::Role;
