// src/registry/backend.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Host and port of a downstream server. Uniqueness across the registry is
/// enforced on this value, not on the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub host: String,
    pub port: u16,
}

impl Address {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A routable downstream server instance. Created on registration with a
/// fresh id; health lives in the tracker, keyed by that id, so a health
/// report never contends on the backend record itself.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Backend {
    pub id: String,
    #[serde(flatten)]
    pub address: Address,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub registered_at: DateTime<Utc>,
}

impl Backend {
    pub fn new(address: Address) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            address,
            registered_at: Utc::now(),
        }
    }
}
