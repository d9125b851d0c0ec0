// src/lib.rs
pub mod config;
pub mod engine;
pub mod error;
pub mod guard;
pub mod health;
pub mod metrics;
pub mod registry;
pub mod selector;
pub mod server;
pub mod stats;
