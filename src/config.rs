//! Runtime configuration for the Gate connection engine and its
//! supporting subsystems.
//!
//! Each subsystem gets its own small config struct with a `Default` impl,
//! following the teacher's per-subsystem config convention
//! (`TcpConfig`, `PoolConfig`, `DiscoveryConfig`, ...) rather than one
//! monolithic options blob. Every struct also derives `Serialize`/
//! `Deserialize` with a container-level `#[serde(default)]` so a
//! deployment can load a partial JSON config and fall back to the same
//! defaults used in code.

use crate::error::{GateMeshError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Heartbeat delivery mechanism for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeartbeatMechanism {
    /// Server pushes a heartbeat frame on every tick.
    Tick,
    /// Server only replies when the client sends a heartbeat.
    Resp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeartbeatConfig {
    /// Zero disables heartbeat checking entirely.
    pub interval: Duration,
    pub mechanism: HeartbeatMechanism,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            mechanism: HeartbeatMechanism::Tick,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionLimits {
    pub max_connections: usize,
    pub accept_timeout: Duration,
    pub tcp_write_queue: usize,
    pub ws_high_write_queue: usize,
    pub ws_low_write_queue: usize,
    /// Zero disables the authorize timer.
    pub authorize_timeout: Duration,
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self {
            max_connections: 100_000,
            accept_timeout: Duration::from_secs(5),
            tcp_write_queue: 4096,
            ws_high_write_queue: 1024,
            ws_low_write_queue: 4096,
            authorize_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub watch_channel_capacity: usize,
    pub refresh_interval: Duration,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            watch_channel_capacity: 256,
            refresh_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub call_timeout: Duration,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(3),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcClientConfig {
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub backoff_multiplier: f64,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(30),
            backoff_multiplier: 2.0,
        }
    }
}

/// Top-level Gate configuration, composing the subsystem configs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GateConfig {
    pub instance_id: String,
    pub heartbeat: HeartbeatConfig,
    pub limits: ConnectionLimits,
    pub discovery: DiscoveryConfig,
    pub locator: LocatorConfig,
    pub rpc_client: RpcClientConfig,
}

impl GateConfig {
    /// Parse a JSON-encoded config (e.g. loaded from a deployment's
    /// config map); fields left out fall back to their code defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| GateMeshError::Config(e.to_string()))
    }

    /// A random per-process instance id for deployments that don't pin
    /// one explicitly, grounded in the teacher's node-id generation
    /// (`networking::membership`).
    pub fn generate_instance_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Overlay environment-variable overrides onto an existing config,
    /// following the "env overrides defaults" convention used throughout
    /// the pack for ambient (non-business) settings.
    pub fn apply_env_overrides(mut self) -> Self {
        if self.instance_id.is_empty() {
            self.instance_id = std::env::var("GATEMESH_INSTANCE_ID")
                .unwrap_or_else(|_| Self::generate_instance_id());
        }
        if let Ok(v) = std::env::var("GATEMESH_MAX_CONNECTIONS") {
            if let Ok(n) = v.parse() {
                self.limits.max_connections = n;
            }
        }
        if let Ok(v) = std::env::var("GATEMESH_HEARTBEAT_INTERVAL_MS") {
            if let Ok(ms) = v.parse() {
                self.heartbeat.interval = Duration::from_millis(ms);
            }
        }
        if let Ok(v) = std::env::var("GATEMESH_AUTHORIZE_TIMEOUT_MS") {
            if let Ok(ms) = v.parse() {
                self.limits.authorize_timeout = Duration::from_millis(ms);
            }
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let cfg = GateConfig::default();
        assert_eq!(cfg.limits.tcp_write_queue, 4096);
        assert_eq!(cfg.limits.ws_high_write_queue, 1024);
        assert_eq!(cfg.limits.ws_low_write_queue, 4096);
    }

    #[test]
    fn generate_instance_id_is_unique_and_nonempty() {
        let a = GateConfig::generate_instance_id();
        let b = GateConfig::generate_instance_id();
        assert_ne!(a, b);
        assert!(!a.is_empty());
    }

    #[test]
    fn from_json_overrides_only_specified_fields() {
        let cfg = GateConfig::from_json(r#"{"instance_id":"gate-7","limits":{"max_connections":10}}"#).unwrap();
        assert_eq!(cfg.instance_id, "gate-7");
        assert_eq!(cfg.limits.max_connections, 10);
        // everything left unspecified keeps its code default
        assert_eq!(cfg.limits.tcp_write_queue, 4096);
        assert_eq!(cfg.heartbeat.mechanism, HeartbeatMechanism::Tick);
    }

    #[test]
    fn from_json_rejects_malformed_input() {
        assert!(matches!(GateConfig::from_json("not json"), Err(GateMeshError::Config(_))));
    }
}
