//! Execution-layer collaborator context.

/// Address of an already-running execution-layer client, as handed to the
/// CL beacon node for its engine/web3 connection.
#[derive(Clone, Debug)]
pub struct ElClientContext {
    ip: String,
    rpc_port: u16,
}

impl ElClientContext {
    pub fn new(ip: impl Into<String>, rpc_port: u16) -> Self {
        Self {
            ip: ip.into(),
            rpc_port,
        }
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn rpc_port(&self) -> u16 {
        self.rpc_port
    }

    /// HTTP RPC URL the beacon node dials.
    pub fn rpc_url(&self) -> String {
        format!("http://{}:{}", self.ip, self.rpc_port)
    }
}
