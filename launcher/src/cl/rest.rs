//! REST access to a beacon node's status and identity endpoints.

use crate::Error;
use serde::Deserialize;
use std::future::Future;

const HEALTH_ENDPOINT: &str = "eth/v1/node/health";
const IDENTITY_ENDPOINT: &str = "eth/v1/node/identity";

/// Identity record a beacon node reports once healthy.
#[derive(Clone, Debug, Deserialize)]
pub struct IdentityData {
    pub peer_id: String,
    pub enr: String,
    #[serde(default)]
    pub p2p_addresses: Vec<String>,
    #[serde(default)]
    pub discovery_addresses: Vec<String>,
}

#[derive(Deserialize)]
struct IdentityEnvelope {
    data: IdentityData,
}

/// Client for a beacon node's status/identity HTTP API.
pub trait ClRestClient: Send + Sync {
    /// Liveness probe; `Ok` when the node reports healthy.
    fn health(&self) -> impl Future<Output = Result<(), Error>> + Send;

    /// Fetches the node's identity. Called once, unretried, only after
    /// [health](Self::health) has succeeded; any failure is fatal for the
    /// launch since every downstream spec needs the identity.
    fn identity(&self) -> impl Future<Output = Result<IdentityData, Error>> + Send;
}

/// [ClRestClient] over HTTP, addressing the node by its private address
/// and allocated HTTP port.
#[derive(Clone, Debug)]
pub struct HttpClRestClient {
    base: String,
    client: reqwest::Client,
}

impl HttpClRestClient {
    pub fn new(ip: &str, port: u16) -> Self {
        Self {
            base: format!("http://{ip}:{port}"),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.base
    }
}

impl ClRestClient for HttpClRestClient {
    async fn health(&self) -> Result<(), Error> {
        let url = format!("{}/{}", self.base, HEALTH_ENDPOINT);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| Error::Health {
                endpoint: url.clone(),
                reason: err.to_string(),
            })?;
        let status = response.status();
        // 200 is healthy, 206 is syncing but alive; both count as available.
        if status.is_success() {
            Ok(())
        } else {
            Err(Error::Health {
                endpoint: url,
                reason: format!("status {status}"),
            })
        }
    }

    async fn identity(&self) -> Result<IdentityData, Error> {
        let url = format!("{}/{}", self.base, IDENTITY_ENDPOINT);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|err| Error::IdentityFetch {
                endpoint: url.clone(),
                reason: err.to_string(),
            })?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::IdentityFetch {
                endpoint: url,
                reason: format!("status {status}"),
            });
        }
        let envelope: IdentityEnvelope =
            response.json().await.map_err(|err| Error::IdentityFetch {
                endpoint: url.clone(),
                reason: err.to_string(),
            })?;
        Ok(envelope.data)
    }
}
