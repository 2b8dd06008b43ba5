//! Prysm client family: launch-spec builders plus the family's port and
//! verbosity tables. Prysm ships separate beacon and validator images, so
//! the caller-facing image string is the delimited pair form.

use super::{
    ClClientContext, ClClientFamily, KeystoreDirs, HTTP_PORT_ID, MONITORING_PORT_ID, RPC_PORT_ID,
    TCP_DISCOVERY_PORT_ID, UDP_DISCOVERY_PORT_ID,
};
use crate::config::LogLevel;
use crate::el::ElClientContext;
use crate::enclave::{Artifact, LaunchSpec, NodeEnv, PortSpec, Role};
use crate::genesis::GenesisData;
use std::collections::BTreeMap;

const CONSENSUS_DATA_DIRPATH: &str = "/consensus-data";

const DISCOVERY_TCP_PORT: u16 = 13000;
const DISCOVERY_UDP_PORT: u16 = 12000;
const RPC_PORT: u16 = 4000;
const HTTP_PORT: u16 = 3500;
const BEACON_MONITORING_PORT: u16 = 8080;
const VALIDATOR_MONITORING_PORT: u16 = 8081;

// Staged file layout inside each node's shared directory.
const GENESIS_CONFIG_YML_REL: &str = "genesis-config.yml";
const GENESIS_SSZ_REL: &str = "genesis.ssz";
const PRYSM_PASSWORD_TXT_REL: &str = "prysm-password.txt";
const VALIDATOR_KEYS_REL: &str = "validator-keys";
const VALIDATOR_SECRETS_REL: &str = "validator-secrets";

const MIN_SYNC_PEERS: u16 = 1;

/// Prysm's [ClClientFamily] implementation.
pub struct PrysmClientFamily {
    beacon_ports: BTreeMap<&'static str, PortSpec>,
    validator_ports: BTreeMap<&'static str, PortSpec>,
    wallet_password: String,
}

impl PrysmClientFamily {
    /// `wallet_password` unlocks the validator wallet; it is staged as
    /// `prysm-password.txt` next to the keystores.
    pub fn new(wallet_password: impl Into<String>) -> Self {
        let beacon_ports = BTreeMap::from([
            (TCP_DISCOVERY_PORT_ID, PortSpec::tcp(DISCOVERY_TCP_PORT)),
            (UDP_DISCOVERY_PORT_ID, PortSpec::udp(DISCOVERY_UDP_PORT)),
            (RPC_PORT_ID, PortSpec::tcp(RPC_PORT)),
            (HTTP_PORT_ID, PortSpec::tcp(HTTP_PORT)),
            (MONITORING_PORT_ID, PortSpec::tcp(BEACON_MONITORING_PORT)),
        ]);
        let validator_ports = BTreeMap::from([(
            MONITORING_PORT_ID,
            PortSpec::tcp(VALIDATOR_MONITORING_PORT),
        )]);
        Self {
            beacon_ports,
            validator_ports,
            wallet_password: wallet_password.into(),
        }
    }
}

impl ClClientFamily for PrysmClientFamily {
    fn verbosity(&self, level: LogLevel) -> &'static str {
        match level {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    fn beacon_ports(&self) -> &BTreeMap<&'static str, PortSpec> {
        &self.beacon_ports
    }

    fn validator_ports(&self) -> &BTreeMap<&'static str, PortSpec> {
        &self.validator_ports
    }

    fn build_beacon_spec(
        &self,
        env: &NodeEnv,
        image: &str,
        bootnode: Option<&ClClientContext>,
        el: &ElClientContext,
        log_level: LogLevel,
        genesis: &GenesisData,
        extra_args: &[String],
    ) -> LaunchSpec {
        let genesis_config = env.shared_dir.child(GENESIS_CONFIG_YML_REL);
        let genesis_ssz = env.shared_dir.child(GENESIS_SSZ_REL);
        let el_rpc_url = el.rpc_url();

        let mut args = vec![
            // Mandatory to run the node at all.
            "--accept-terms-of-use=true".to_string(),
            // Testnet setup requires picking a target network.
            "--prater".to_string(),
            format!("--datadir={CONSENSUS_DATA_DIRPATH}"),
            format!("--chain-config-file={}", genesis_config.remote().display()),
            format!("--genesis-state={}", genesis_ssz.remote().display()),
            format!("--http-web3provider={el_rpc_url}"),
            format!("--execution-provider={el_rpc_url}"),
            "--http-modules=prysm,eth".to_string(),
            format!("--rpc-host={}", env.private_ip),
            format!("--rpc-port={RPC_PORT}"),
            "--grpc-gateway-host=0.0.0.0".to_string(),
            format!("--grpc-gateway-port={HTTP_PORT}"),
            format!("--p2p-tcp-port={DISCOVERY_TCP_PORT}"),
            format!("--p2p-udp-port={DISCOVERY_UDP_PORT}"),
            format!("--min-sync-peers={MIN_SYNC_PEERS}"),
            format!("--verbosity={}", self.verbosity(log_level)),
            // Reduces gossip noise on small networks.
            "--subscribe-all-subnets=true".to_string(),
            "--disable-monitoring=false".to_string(),
            format!("--monitoring-host={}", env.private_ip),
            format!("--monitoring-port={BEACON_MONITORING_PORT}"),
        ];
        if let Some(bootnode) = bootnode {
            args.push(format!("--bootstrap-node={}", bootnode.enr()));
        }
        args.extend(extra_args.iter().cloned());

        let artifacts = vec![
            Artifact::file(genesis.config_path(), GENESIS_CONFIG_YML_REL),
            Artifact::file(genesis.state_path(), GENESIS_SSZ_REL),
        ];
        LaunchSpec::new(
            Role::Beacon,
            image,
            self.beacon_ports.clone(),
            args,
            artifacts,
        )
    }

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
    ) -> LaunchSpec {
        let secrets = env.shared_dir.child(VALIDATOR_SECRETS_REL);
        let password = env.shared_dir.child(PRYSM_PASSWORD_TXT_REL);
        let datadir = format!("{CONSENSUS_DATA_DIRPATH}/{service_id}");

        let mut args = vec![
            "--accept-terms-of-use=true".to_string(),
            "--prater".to_string(),
            format!("--beacon-rpc-gateway-provider={beacon_http_endpoint}"),
            format!("--beacon-rpc-provider={beacon_rpc_endpoint}"),
            format!("--wallet-dir={}", secrets.remote().display()),
            format!("--wallet-password-file={}", password.remote().display()),
            format!("--datadir={datadir}"),
            format!("--verbosity={}", self.verbosity(log_level)),
            "--disable-monitoring=false".to_string(),
            format!("--monitoring-host={}", env.private_ip),
            format!("--monitoring-port={VALIDATOR_MONITORING_PORT}"),
        ];
        args.extend(extra_args.iter().cloned());

        let artifacts = vec![
            Artifact::dir(&keystores.keys, VALIDATOR_KEYS_REL),
            Artifact::dir(&keystores.secrets, VALIDATOR_SECRETS_REL),
            Artifact::content(self.wallet_password.clone(), PRYSM_PASSWORD_TXT_REL),
        ];
        LaunchSpec::new(
            Role::Validator,
            image,
            self.validator_ports.clone(),
            args,
            artifacts,
        )
    }
}
