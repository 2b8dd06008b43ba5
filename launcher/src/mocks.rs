//! Mock collaborators for exercising the launch sequence without a real
//! process runtime or a live beacon node.

use crate::cl::rest::{ClRestClient, IdentityData};
use crate::enclave::{Enclave, LaunchSpec, NodeEnv, Service, SharedPath};
use crate::{artifacts, Error};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Side effect a [MockService] runs for each executed command.
pub type ExecEffect = Box<dyn Fn(&[String]) + Send + Sync>;

/// Canned [Service] handle recording every executed command.
pub struct MockService {
    ip: String,
    ports: BTreeMap<String, u16>,
    shared_dir: SharedPath,
    exec_result: (i32, String),
    exec_effect: Option<ExecEffect>,
    exec_calls: Mutex<Vec<Vec<String>>>,
}

impl MockService {
    pub fn new(ip: impl Into<String>, ports: BTreeMap<String, u16>, shared_dir: SharedPath) -> Self {
        Self {
            ip: ip.into(),
            ports,
            shared_dir,
            exec_result: (0, String::new()),
            exec_effect: None,
            exec_calls: Mutex::new(Vec::new()),
        }
    }

    /// A service backed by a fresh temporary directory. The local and
    /// remote views share the same path so exec effects can write through
    /// the remote view.
    pub fn for_test(name: &str) -> Self {
        let dir = std::env::temp_dir()
            .join("testnet-launcher-tests")
            .join(format!("{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).expect("failed to create mock shared directory");
        Self::new("10.0.0.2", BTreeMap::new(), SharedPath::new(dir.clone(), dir))
    }

    /// Exit code and combined output every exec returns.
    pub fn with_exec_result(mut self, code: i32, output: String) -> Self {
        self.exec_result = (code, output);
        self
    }

    pub fn with_exec_effect(mut self, effect: ExecEffect) -> Self {
        self.exec_effect = Some(effect);
        self
    }

    pub fn shared_dir(&self) -> &SharedPath {
        &self.shared_dir
    }

    /// Every argv passed to [Service::exec], in call order.
    pub fn exec_calls(&self) -> Vec<Vec<String>> {
        self.exec_calls.lock().unwrap().clone()
    }
}

impl Service for MockService {
    fn private_ip(&self) -> &str {
        &self.ip
    }

    fn ports(&self) -> &BTreeMap<String, u16> {
        &self.ports
    }

    fn shared_dir(&self) -> &SharedPath {
        &self.shared_dir
    }

    async fn exec(&self, args: &[String]) -> Result<(i32, String), Error> {
        self.exec_calls.lock().unwrap().push(args.to_vec());
        if let Some(effect) = &self.exec_effect {
            effect(args);
        }
        Ok(self.exec_result.clone())
    }
}

/// Exec effect that mimics the genesis-construction tool: writes a state
/// file and creates the tranches directory at the paths named in the argv.
pub fn genesis_exec_effect() -> ExecEffect {
    Box::new(|args: &[String]| {
        let mut iter = args.iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--state-output" => {
                    if let Some(path) = iter.next() {
                        let _ = fs::write(path, b"mock-ssz");
                    }
                }
                "--tranches-dir" => {
                    if let Some(path) = iter.next() {
                        let _ = fs::create_dir_all(path);
                    }
                }
                _ => {}
            }
        }
    })
}

/// Spy [Enclave]: records every launch, allocates sequential private
/// addresses starting at `10.0.0.5`, and stages declared artifacts into a
/// per-service temporary directory.
pub struct MockEnclave {
    base_dir: PathBuf,
    launched: Vec<(String, LaunchSpec)>,
    fail_on: Option<String>,
}

impl MockEnclave {
    pub fn for_test(name: &str) -> Self {
        let base_dir = std::env::temp_dir()
            .join("testnet-launcher-tests")
            .join(format!("enclave-{}-{}", name, std::process::id()));
        let _ = fs::remove_dir_all(&base_dir);
        fs::create_dir_all(&base_dir).expect("failed to create mock enclave directory");
        Self {
            base_dir,
            launched: Vec::new(),
            fail_on: None,
        }
    }

    /// Fails any launch of the service with this id.
    pub fn with_launch_failure(mut self, id: impl Into<String>) -> Self {
        self.fail_on = Some(id.into());
        self
    }

    /// Every `(service id, spec)` launched, in order.
    pub fn launched(&self) -> &[(String, LaunchSpec)] {
        &self.launched
    }

    /// Shared directory a launched service was staged into.
    pub fn service_dir(&self, id: &str) -> PathBuf {
        self.base_dir.join(id)
    }

    /// A generator service whose shared directory lives under this
    /// enclave's directory.
    pub fn generator(&self) -> MockService {
        let dir = self.base_dir.join("genesis-generator");
        fs::create_dir_all(&dir).expect("failed to create generator directory");
        MockService::new(
            "10.0.0.3",
            BTreeMap::new(),
            SharedPath::new(dir.clone(), dir),
        )
        .with_exec_effect(genesis_exec_effect())
    }
}

impl Enclave for MockEnclave {
    type Service = MockService;

    async fn launch<F>(&mut self, id: &str, supplier: F) -> Result<MockService, Error>
    where
        F: FnOnce(&NodeEnv) -> Result<LaunchSpec, Error> + Send,
    {
        if self.fail_on.as_deref() == Some(id) {
            return Err(Error::Launch {
                service: id.to_string(),
                reason: "injected launch failure".to_string(),
            });
        }
        let ip = format!("10.0.0.{}", 5 + self.launched.len());
        let dir = self.base_dir.join(id);
        fs::create_dir_all(&dir)?;
        let shared = SharedPath::new(dir.clone(), dir);
        let env = NodeEnv {
            private_ip: ip.clone(),
            shared_dir: shared.clone(),
        };
        let spec = supplier(&env)?;
        artifacts::stage_all(&shared, spec.artifacts())?;
        let ports = spec
            .ports()
            .iter()
            .map(|(name, port)| (name.to_string(), port.number))
            .collect();
        self.launched.push((id.to_string(), spec.clone()));
        Ok(MockService::new(ip, ports, shared))
    }
}

/// REST client that reports unhealthy a configured number of times before
/// its first success, and serves a canned identity.
#[derive(Clone)]
pub struct ScriptedRestClient {
    healthy_after: usize,
    health_polls: Arc<AtomicUsize>,
    identity: Option<IdentityData>,
}

impl ScriptedRestClient {
    /// Unhealthy for `failures` polls, healthy afterwards.
    pub fn healthy_after(failures: usize) -> Self {
        Self {
            healthy_after: failures,
            health_polls: Arc::new(AtomicUsize::new(0)),
            identity: Some(IdentityData {
                peer_id: "16Uiu2HAmMock".to_string(),
                enr: "enr:mock".to_string(),
                p2p_addresses: Vec::new(),
                discovery_addresses: Vec::new(),
            }),
        }
    }

    pub fn never_healthy() -> Self {
        Self {
            healthy_after: usize::MAX,
            ..Self::healthy_after(0)
        }
    }

    pub fn with_enr(mut self, enr: impl Into<String>) -> Self {
        if let Some(identity) = &mut self.identity {
            identity.enr = enr.into();
        }
        self
    }

    /// Healthy node whose identity endpoint fails.
    pub fn without_identity(mut self) -> Self {
        self.identity = None;
        self
    }

    pub fn health_polls(&self) -> usize {
        self.health_polls.load(Ordering::SeqCst)
    }
}

impl ClRestClient for ScriptedRestClient {
    async fn health(&self) -> Result<(), Error> {
        let polled = self.health_polls.fetch_add(1, Ordering::SeqCst);
        if polled >= self.healthy_after {
            Ok(())
        } else {
            Err(Error::Health {
                endpoint: "mock".to_string(),
                reason: "unhealthy".to_string(),
            })
        }
    }

    async fn identity(&self) -> Result<IdentityData, Error> {
        self.identity.clone().ok_or_else(|| Error::IdentityFetch {
            endpoint: "mock".to_string(),
            reason: "injected identity failure".to_string(),
        })
    }
}
