//! Provision paired consensus-layer (CL) beacon and validator nodes for a
//! merge testnet.
//!
//! The crate sequences one participant launch end-to-end: it generates the
//! CL genesis artifacts every node consumes, launches a beacon node through
//! a pluggable process runtime ([enclave::Enclave]), waits for the node to
//! become healthy with a bounded retry budget, fetches its peering identity
//! (ENR), and only then launches the paired validator node wired to the
//! beacon's RPC and HTTP endpoints. The returned [cl::ClClientContext] is
//! the bootnode reference for the next participant, so contexts chain:
//! participant N's beacon becomes participant N+1's bootstrap peer.
//!
//! Client families (Prysm today) plug in through [cl::ClClientFamily],
//! which supplies only the launch-spec builders and the family's port and
//! verbosity tables; the sequencing, retry, and error policy live in
//! [orchestrator::launch_participant] and are shared by every family.

pub mod artifacts;
pub mod cl;
pub mod config;
pub mod el;
pub mod enclave;
pub mod genesis;
pub mod mocks;
pub mod orchestrator;

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while provisioning a participant.
///
/// Every variant carries the parameters a caller needs to diagnose the
/// failure (paths, endpoints, attempt counts). There is no retry at this
/// level beyond the bounded health poll: any error aborts the launch and
/// surfaces to the caller, which decides whether to retry the whole
/// sequence or abort network assembly.
#[derive(Error, Debug)]
pub enum Error {
    #[error("expected image string '{0}' to contain a beacon and a validator image delimited by ','")]
    InvalidImages(String),
    #[error("blank {role} image in '{images}'")]
    BlankImage { role: &'static str, images: String },
    #[error("staging {src} to '{dst}': {source}")]
    Staging {
        src: String,
        dst: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("rendering {document}: {source}")]
    Render {
        document: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("genesis generation command '{command}' exited with code {code}:\n{output}")]
    GenesisCommand {
        command: String,
        code: i32,
        output: String,
    },
    #[error("genesis generation command produced no state at '{0}'")]
    GenesisStateMissing(PathBuf),
    #[error("launching service '{service}': {reason}")]
    Launch { service: String, reason: String },
    #[error("executing command '{command}': {reason}")]
    Exec { command: String, reason: String },
    #[error("service is missing expected port '{0}'")]
    MissingPort(&'static str),
    #[error("health check against {endpoint}: {reason}")]
    Health { endpoint: String, reason: String },
    #[error("beacon node not healthy after {0} attempts")]
    HealthTimeout(usize),
    #[error("fetching node identity from {endpoint}: {reason}")]
    IdentityFetch { endpoint: String, reason: String },
    #[error("system clock is before the unix epoch")]
    Clock,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
