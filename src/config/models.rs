// src/config/models.rs
use anyhow::{bail, Result};
use serde::Deserialize;
use std::net::SocketAddr;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the routing API listens on.
    pub listen: SocketAddr,
    pub health: HealthThresholds,
    pub overload: OverloadConfig,
    pub metrics: MetricsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: ([0, 0, 0, 0], 8080).into(),
            health: HealthThresholds::default(),
            overload: OverloadConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.health.validate()?;
        self.overload.validate()?;
        Ok(())
    }
}

/// Eligibility cut-offs for backend health snapshots. A backend must pass
/// every one of these, plus the freshness check, to receive traffic.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HealthThresholds {
    pub max_cpu_percent: f64,
    pub max_memory_percent: f64,
    pub max_latency_millis: u64,
    /// A snapshot older than this is ignored regardless of its values.
    pub staleness_window_secs: u64,
}

impl Default for HealthThresholds {
    fn default() -> Self {
        Self {
            max_cpu_percent: 80.0,
            max_memory_percent: 80.0,
            max_latency_millis: 1000,
            staleness_window_secs: 30,
        }
    }
}

impl HealthThresholds {
    pub fn staleness_window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.staleness_window_secs as i64)
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.max_cpu_percent) {
            bail!("health.max_cpu_percent must be within 0..=100");
        }
        if !(0.0..=100.0).contains(&self.max_memory_percent) {
            bail!("health.max_memory_percent must be within 0..=100");
        }
        if self.max_latency_millis == 0 {
            bail!("health.max_latency_millis must be positive");
        }
        if self.staleness_window_secs == 0 {
            bail!("health.staleness_window_secs must be positive");
        }
        Ok(())
    }
}

/// Where the admission rate comes from: the server-side per-key counter
/// (default), or a rate the caller reports about itself. The reported mode
/// exists for the threat-detection endpoint; routing always has the
/// measured counter to fall back on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdmissionMode {
    Measured,
    Reported,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OverloadConfig {
    /// Per-source admission ceiling. Crossing it rejects the request and
    /// raises a suspicious-traffic alert.
    pub max_requests_per_second: f64,
    /// Length of the fixed accounting window.
    pub window_secs: u64,
    pub mode: AdmissionMode,
    /// Rate windows untouched for this long are dropped by the sweeper.
    pub idle_eviction_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for OverloadConfig {
    fn default() -> Self {
        Self {
            max_requests_per_second: 1000.0,
            window_secs: 1,
            mode: AdmissionMode::Measured,
            idle_eviction_secs: 300,
            sweep_interval_secs: 60,
        }
    }
}

impl OverloadConfig {
    pub fn window(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.window_secs as i64)
    }

    pub fn idle_eviction(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.idle_eviction_secs as i64)
    }

    fn validate(&self) -> Result<()> {
        if self.max_requests_per_second <= 0.0 {
            bail!("overload.max_requests_per_second must be positive");
        }
        if self.window_secs == 0 {
            bail!("overload.window_secs must be positive");
        }
        if self.idle_eviction_secs == 0 || self.sweep_interval_secs == 0 {
            bail!("overload eviction intervals must be positive");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub port: u16,
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: 9090,
            path: "/metrics".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn partial_yaml_fills_in_defaults() {
        let config: Config = serde_yaml::from_str(
            "listen: \"127.0.0.1:9000\"\noverload:\n  max_requests_per_second: 50\n",
        )
        .unwrap();
        assert_eq!(config.listen.port(), 9000);
        assert_eq!(config.overload.max_requests_per_second, 50.0);
        assert_eq!(config.overload.mode, AdmissionMode::Measured);
        assert_eq!(config.health.staleness_window_secs, 30);
    }

    #[test]
    fn zero_staleness_window_is_rejected() {
        let mut config = Config::default();
        config.health.staleness_window_secs = 0;
        assert!(config.validate().is_err());
    }
}
