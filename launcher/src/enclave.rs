//! Contracts for the process runtime that starts and addresses services.
//!
//! The launcher never talks to a container engine directly: it hands an
//! [Enclave] a service id and a spec supplier, and gets back a [Service]
//! handle exposing the process's private address, allocated ports, and a
//! command-execution hook. Implementations must stage every artifact a
//! returned [LaunchSpec] declares (via [crate::artifacts::stage_all]) into
//! the service's shared directory before starting the process.

use crate::Error;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Dual view of one location in the storage shared between the launcher
/// and a launched service: the same bytes, addressed by the launcher-local
/// path and by the path the service sees inside its container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SharedPath {
    local: PathBuf,
    remote: PathBuf,
}

impl SharedPath {
    pub fn new(local: impl Into<PathBuf>, remote: impl Into<PathBuf>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }

    /// Resolves a child of this location in both views.
    pub fn child(&self, name: &str) -> Self {
        Self {
            local: self.local.join(name),
            remote: self.remote.join(name),
        }
    }

    /// Path on the launcher's own filesystem.
    pub fn local(&self) -> &Path {
        &self.local
    }

    /// Path as seen by the launched service.
    pub fn remote(&self) -> &Path {
        &self.remote
    }
}

/// Transport protocol of an exposed port.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Protocol {
    Tcp,
    Udp,
}

/// One named port a service exposes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PortSpec {
    pub number: u16,
    pub protocol: Protocol,
}

impl PortSpec {
    pub const fn tcp(number: u16) -> Self {
        Self {
            number,
            protocol: Protocol::Tcp,
        }
    }

    pub const fn udp(number: u16) -> Self {
        Self {
            number,
            protocol: Protocol::Udp,
        }
    }
}

/// Role of a launched CL process.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    Beacon,
    Validator,
}

/// Where an artifact's bytes come from.
#[derive(Clone, Debug)]
pub enum ArtifactSource {
    /// A single file on the launcher's filesystem.
    File(PathBuf),
    /// A directory tree on the launcher's filesystem, copied recursively.
    Dir(PathBuf),
    /// Literal content written as a file.
    Content(String),
}

/// One file or directory a service expects staged into its shared
/// directory before the process starts.
#[derive(Clone, Debug)]
pub struct Artifact {
    pub source: ArtifactSource,
    /// Destination path, relative to the service's shared directory.
    pub dest: String,
}

impl Artifact {
    pub fn file(source: impl Into<PathBuf>, dest: impl Into<String>) -> Self {
        Self {
            source: ArtifactSource::File(source.into()),
            dest: dest.into(),
        }
    }

    pub fn dir(source: impl Into<PathBuf>, dest: impl Into<String>) -> Self {
        Self {
            source: ArtifactSource::Dir(source.into()),
            dest: dest.into(),
        }
    }

    pub fn content(content: impl Into<String>, dest: impl Into<String>) -> Self {
        Self {
            source: ArtifactSource::Content(content.into()),
            dest: dest.into(),
        }
    }

    /// Human-readable description of the source, for error context.
    pub fn describe_source(&self) -> String {
        match &self.source {
            ArtifactSource::File(path) => format!("file '{}'", path.display()),
            ArtifactSource::Dir(path) => format!("directory '{}'", path.display()),
            ArtifactSource::Content(_) => "inline content".to_string(),
        }
    }
}

/// Immutable, role-tagged description of how to start one process. Built
/// fresh per launch and never mutated afterwards: any additional argument
/// must be folded in at build time.
#[derive(Clone, Debug)]
pub struct LaunchSpec {
    role: Role,
    image: String,
    ports: BTreeMap<&'static str, PortSpec>,
    args: Vec<String>,
    artifacts: Vec<Artifact>,
}

impl LaunchSpec {
    pub fn new(
        role: Role,
        image: impl Into<String>,
        ports: BTreeMap<&'static str, PortSpec>,
        args: Vec<String>,
        artifacts: Vec<Artifact>,
    ) -> Self {
        Self {
            role,
            image: image.into(),
            ports,
            args,
            artifacts,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn ports(&self) -> &BTreeMap<&'static str, PortSpec> {
        &self.ports
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn artifacts(&self) -> &[Artifact] {
        &self.artifacts
    }
}

/// What a spec builder knows about its service before the process exists:
/// the private address the runtime allocated and the shared directory the
/// service will see.
#[derive(Clone, Debug)]
pub struct NodeEnv {
    pub private_ip: String,
    pub shared_dir: SharedPath,
}

/// Handle to a launched (or launchable) service.
pub trait Service: Send + Sync {
    /// Private network address of the process.
    fn private_ip(&self) -> &str;

    /// Allocated port numbers keyed by logical port name.
    fn ports(&self) -> &BTreeMap<String, u16>;

    /// Shared directory for this service.
    fn shared_dir(&self) -> &SharedPath;

    /// Executes a command inside the service, returning the exit code and
    /// combined output.
    fn exec(&self, args: &[String])
        -> impl Future<Output = Result<(i32, String), Error>> + Send;
}

/// Process runtime that turns a [LaunchSpec] into a running service.
pub trait Enclave {
    type Service: Service;

    /// Allocates a service environment, calls `supplier` to build the
    /// spec, stages the spec's declared artifacts into the service's
    /// shared directory, and starts the process.
    fn launch<F>(
        &mut self,
        id: &str,
        supplier: F,
    ) -> impl Future<Output = Result<Self::Service, Error>> + Send
    where
        F: FnOnce(&NodeEnv) -> Result<LaunchSpec, Error> + Send;
}
