//! Sequencing for one participant launch: genesis data, then the beacon
//! node, then (only once the beacon is healthy and identified) the
//! paired validator node.
//!
//! The sequence is strictly ordered because each step's input is the
//! previous step's output: the genesis bundle feeds the beacon spec, the
//! beacon's discovered identity feeds the validator spec and the returned
//! context. There is no retry across steps beyond the bounded health poll;
//! any failure aborts the launch and surfaces to the caller, with no
//! compensating teardown of an already-launched beacon. Independent
//! participants may be launched concurrently by running one orchestration
//! per participant, each against its own working directories.

use crate::cl::{
    rest::ClRestClient, wait_for_beacon_availability, ClClientContext, ClClientFamily,
    ClNodeMetricsInfo, KeystoreDirs, NodeIdentity, HTTP_PORT_ID, METRICS_PATH,
    MONITORING_PORT_ID, RPC_PORT_ID,
};
use crate::config::{GenesisConfig, ImagePair, LogLevel, RetryPolicy};
use crate::el::ElClientContext;
use crate::enclave::{Enclave, Service};
use crate::genesis;
use crate::Error;
use std::path::Path;
use tracing::info;

/// Service-id suffixes for the two processes of a participant.
const BEACON_SUFFIX: &str = "beacon";
const VALIDATOR_SUFFIX: &str = "validator";

/// Validated inputs for one participant launch.
pub struct ParticipantParams<'a> {
    pub id: &'a str,
    pub images: &'a ImagePair,
    pub log_level: LogLevel,
    /// Execution-layer client this participant's beacon node drives.
    pub el: &'a ElClientContext,
    /// Beacon context of an earlier participant. Absent for the network's
    /// first node, which launches as the bootstrapping node.
    pub bootnode: Option<&'a ClClientContext>,
    pub keystores: &'a KeystoreDirs,
    pub extra_beacon_args: &'a [String],
    pub extra_validator_args: &'a [String],
}

/// Launches one beacon/validator pair and returns the context later
/// participants bootstrap against.
///
/// `rest_client` builds the status/identity client for a beacon node from
/// its private address and allocated HTTP port. `generator` is the service
/// the genesis-construction tool runs inside.
#[allow(clippy::too_many_arguments)]
pub async fn launch_participant<E, F, C, R>(
    enclave: &mut E,
    generator: &E::Service,
    family: &F,
    rest_client: R,
    genesis_config: &GenesisConfig,
    jwt_secret: &Path,
    retry: RetryPolicy,
    params: &ParticipantParams<'_>,
) -> Result<ClClientContext, Error>
where
    E: Enclave,
    F: ClClientFamily + Sync,
    C: ClRestClient,
    R: Fn(&str, u16) -> C,
{
    // Genesis data first: every later step consumes it.
    let genesis = genesis::generate(generator, genesis_config, jwt_secret).await?;
    info!(participant = params.id, "generated CL genesis data");

    let beacon_id = format!("{}-{}", params.id, BEACON_SUFFIX);
    let validator_id = format!("{}-{}", params.id, VALIDATOR_SUFFIX);

    let beacon = enclave
        .launch(&beacon_id, |env| {
            Ok(family.build_beacon_spec(
                env,
                &params.images.beacon,
                params.bootnode,
                params.el,
                params.log_level,
                &genesis,
                params.extra_beacon_args,
            ))
        })
        .await?;
    info!(
        service = beacon_id.as_str(),
        ip = beacon.private_ip(),
        "launched beacon node"
    );

    // The REST client addresses the allocated HTTP port; availability and
    // identity are both fatal if they cannot be established.
    let http_port = *beacon
        .ports()
        .get(HTTP_PORT_ID)
        .ok_or(Error::MissingPort(HTTP_PORT_ID))?;
    let rest = rest_client(beacon.private_ip(), http_port);
    wait_for_beacon_availability(&rest, retry).await?;
    let identity_data = rest.identity().await?;
    info!(
        service = beacon_id.as_str(),
        enr = identity_data.enr.as_str(),
        "beacon node is healthy and identified"
    );

    let rpc_port = family
        .beacon_ports()
        .get(RPC_PORT_ID)
        .ok_or(Error::MissingPort(RPC_PORT_ID))?
        .number;
    let beacon_rpc_endpoint = format!("{}:{}", beacon.private_ip(), rpc_port);
    let beacon_http_endpoint = format!("{}:{}", beacon.private_ip(), http_port);
    let validator = enclave
        .launch(&validator_id, |env| {
            Ok(family.build_validator_spec(
                env,
                &params.images.validator,
                &validator_id,
                &beacon_rpc_endpoint,
                &beacon_http_endpoint,
                params.log_level,
                params.keystores,
                params.extra_validator_args,
            ))
        })
        .await?;
    info!(
        service = validator_id.as_str(),
        ip = validator.private_ip(),
        "launched validator node"
    );

    // Metrics descriptors for both processes; validator health itself is
    // the caller's concern.
    let beacon_monitoring = *beacon
        .ports()
        .get(MONITORING_PORT_ID)
        .ok_or(Error::MissingPort(MONITORING_PORT_ID))?;
    let validator_monitoring = *validator
        .ports()
        .get(MONITORING_PORT_ID)
        .ok_or(Error::MissingPort(MONITORING_PORT_ID))?;
    let metrics = vec![
        ClNodeMetricsInfo::new(
            beacon_id,
            METRICS_PATH,
            format!("{}:{}", beacon.private_ip(), beacon_monitoring),
        ),
        ClNodeMetricsInfo::new(
            validator_id,
            METRICS_PATH,
            format!("{}:{}", validator.private_ip(), validator_monitoring),
        ),
    ];

    let identity = NodeIdentity {
        enr: identity_data.enr,
        ip: beacon.private_ip().to_string(),
        ports: beacon.ports().clone(),
    };
    Ok(ClClientContext::new(identity, http_port, metrics))
}
