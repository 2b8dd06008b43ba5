//! Consensus-layer client contexts, the per-family launch capability, and
//! the beacon availability poller.

pub mod prysm;
pub mod rest;

use crate::config::{LogLevel, RetryPolicy};
use crate::el::ElClientContext;
use crate::enclave::{LaunchSpec, NodeEnv, PortSpec};
use crate::genesis::GenesisData;
use crate::Error;
use rest::ClRestClient;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::time::sleep;
use tracing::debug;

/// Logical port names shared by every CL client family.
pub const TCP_DISCOVERY_PORT_ID: &str = "tcp-discovery";
pub const UDP_DISCOVERY_PORT_ID: &str = "udp-discovery";
pub const RPC_PORT_ID: &str = "rpc";
pub const HTTP_PORT_ID: &str = "http";
pub const MONITORING_PORT_ID: &str = "monitoring";

/// Metrics path exposed by every launched CL process.
pub const METRICS_PATH: &str = "/metrics";

/// Peering identity of a healthy beacon node, discovered once per launch
/// and immutable afterwards.
#[derive(Clone, Debug)]
pub struct NodeIdentity {
    /// Address record other nodes use to bootstrap against this one.
    pub enr: String,
    /// Private network address of the beacon node.
    pub ip: String,
    /// Exposed port numbers keyed by logical port name.
    pub ports: BTreeMap<String, u16>,
}

/// Scrape target for one launched process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClNodeMetricsInfo {
    pub service: String,
    pub path: String,
    pub url: String,
}

impl ClNodeMetricsInfo {
    pub fn new(service: impl Into<String>, path: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            path: path.into(),
            url: url.into(),
        }
    }
}

/// What the network assembly layer needs from a launched beacon/validator
/// pair: the beacon's identity (the next participant's bootnode reference)
/// and the metrics descriptors for both processes.
#[derive(Clone, Debug)]
pub struct ClClientContext {
    identity: NodeIdentity,
    http_port: u16,
    metrics: Vec<ClNodeMetricsInfo>,
}

impl ClClientContext {
    pub fn new(identity: NodeIdentity, http_port: u16, metrics: Vec<ClNodeMetricsInfo>) -> Self {
        Self {
            identity,
            http_port,
            metrics,
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn enr(&self) -> &str {
        &self.identity.enr
    }

    pub fn ip(&self) -> &str {
        &self.identity.ip
    }

    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    pub fn metrics(&self) -> &[ClNodeMetricsInfo] {
        &self.metrics
    }
}

/// Locations of the pre-generated validator key material for one node.
#[derive(Clone, Debug)]
pub struct KeystoreDirs {
    /// Raw EIP-2335 keystores.
    pub keys: PathBuf,
    /// Client-specific wallet/secrets directory.
    pub secrets: PathBuf,
}

/// Launch capability one CL client family supplies to the generic
/// orchestrator: spec builders plus the family's immutable port and
/// verbosity tables. Builders are pure; the files they need staged are
/// declared on the returned spec and staged by the runtime before start.
pub trait ClClientFamily {
    /// Client verbosity string for a log level.
    fn verbosity(&self, level: LogLevel) -> &'static str;

    /// Ports the beacon process exposes, keyed by logical port name.
    fn beacon_ports(&self) -> &BTreeMap<&'static str, PortSpec>;

    /// Ports the validator process exposes, keyed by logical port name.
    fn validator_ports(&self) -> &BTreeMap<&'static str, PortSpec>;

    /// Builds the launch spec for a beacon node. `bootnode` absent means
    /// this node bootstraps the network and gets no bootstrap-peer flag.
    #[allow(clippy::too_many_arguments)]
    fn build_beacon_spec(
        &self,
        env: &NodeEnv,
        image: &str,
        bootnode: Option<&ClClientContext>,
        el: &ElClientContext,
        log_level: LogLevel,
        genesis: &GenesisData,
        extra_args: &[String],
    ) -> LaunchSpec;

    /// Builds the launch spec for a validator node bound to an
    /// already-healthy beacon node's RPC and HTTP endpoints.
    #[allow(clippy::too_many_arguments)]
    fn build_validator_spec(
        &self,
        env: &NodeEnv,
        image: &str,
        service_id: &str,
        beacon_rpc_endpoint: &str,
        beacon_http_endpoint: &str,
        log_level: LogLevel,
        keystores: &KeystoreDirs,
        extra_args: &[String],
    ) -> LaunchSpec;
}

/// Polls the beacon status endpoint until it reports healthy, sleeping
/// `retry.interval` between attempts. The first success short-circuits;
/// exhausting `retry.max_attempts` is fatal for the whole launch. The
/// sleep is the launch sequence's only suspension point, so dropping the
/// future cancels a stuck launch without side effects.
pub async fn wait_for_beacon_availability<C: ClRestClient>(
    client: &C,
    retry: RetryPolicy,
) -> Result<(), Error> {
    for attempt in 1..=retry.max_attempts {
        match client.health().await {
            Ok(()) => {
                debug!(attempt, "beacon node is available");
                return Ok(());
            }
            Err(err) => {
                debug!(attempt, error = %err, "beacon node not yet available");
            }
        }
        if attempt < retry.max_attempts {
            sleep(retry.interval).await;
        }
    }
    Err(Error::HealthTimeout(retry.max_attempts))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedRestClient;
    use std::time::Duration;

    fn quick_retry(max_attempts: usize) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            interval: Duration::from_secs(5),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_after_k_failures_with_exactly_k_plus_one_polls() {
        let client = ScriptedRestClient::healthy_after(3);
        wait_for_beacon_availability(&client, quick_retry(10))
            .await
            .unwrap();
        assert_eq!(client.health_polls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn first_attempt_success_short_circuits() {
        let client = ScriptedRestClient::healthy_after(0);
        wait_for_beacon_availability(&client, quick_retry(10))
            .await
            .unwrap();
        assert_eq!(client.health_polls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_budget_with_exactly_max_attempts_polls() {
        let client = ScriptedRestClient::never_healthy();
        let result = wait_for_beacon_availability(&client, quick_retry(7)).await;
        assert!(matches!(result, Err(Error::HealthTimeout(7))));
        assert_eq!(client.health_polls(), 7);
    }
}
