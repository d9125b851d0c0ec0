// src/health/mod.rs
mod tracker;

pub use tracker::{HealthReport, HealthSnapshot, HealthTracker};
