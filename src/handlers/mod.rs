//! HTTP handlers

pub mod health;
pub mod devices;
pub mod vlans;
pub mod rules;
pub mod simulate;
pub mod ingest;
pub mod history;
