// src/guard/alerts.rs
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    SuspiciousTraffic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub raised_at: DateTime<Utc>,
    pub detail: String,
}

impl Alert {
    pub fn suspicious_traffic(detail: String) -> Self {
        Self {
            kind: AlertKind::SuspiciousTraffic,
            severity: Severity::Medium,
            raised_at: Utc::now(),
            detail,
        }
    }
}

/// Append-only alert log. Entries are never mutated after creation.
pub struct AlertLog {
    entries: RwLock<Vec<Alert>>,
}

impl AlertLog {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
        }
    }

    // Appends keep the vector consistent even if a holder panicked, so a
    // poisoned lock is recovered rather than cascaded into more panics.
    pub fn push(&self, alert: Alert) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(alert);
    }

    pub fn all(&self) -> Vec<Alert> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new()
    }
}
