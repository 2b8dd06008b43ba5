//! Shared fixtures for the launch integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use testnet_launcher::cl::KeystoreDirs;
use testnet_launcher::config::{GenesisConfig, RetryPolicy};
use testnet_launcher::el::ElClientContext;

/// A fresh per-test directory for fixture files.
pub fn test_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir()
        .join("testnet-launcher-tests")
        .join(format!("fixtures-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

pub fn genesis_config() -> GenesisConfig {
    GenesisConfig {
        network_id: "test".to_string(),
        seconds_per_slot: 12,
        genesis_unix_timestamp: 1_700_000_000,
        total_terminal_difficulty: 0,
        altair_fork_epoch: 0,
        merge_fork_epoch: 0,
        deposit_contract_address: "0x4242424242424242424242424242424242424242".to_string(),
        preregistered_validator_keys_mnemonic:
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about"
                .to_string(),
        num_validator_keys_to_preregister: 4,
    }
}

pub fn jwt_secret(dir: &Path) -> PathBuf {
    let path = dir.join("jwtsecret");
    fs::write(&path, "0xdeadbeefcafe").unwrap();
    path
}

/// Keystore fixture with one raw key and one wallet entry.
pub fn keystores(dir: &Path) -> KeystoreDirs {
    let keys = dir.join("validator-keys");
    fs::create_dir_all(keys.join("tranche-0")).unwrap();
    fs::write(keys.join("tranche-0").join("keystore-0.json"), "{}").unwrap();
    let secrets = dir.join("validator-secrets");
    fs::create_dir_all(&secrets).unwrap();
    fs::write(secrets.join("wallet"), "wallet-data").unwrap();
    KeystoreDirs { keys, secrets }
}

pub fn el_context() -> ElClientContext {
    ElClientContext::new("10.0.0.2", 8545)
}

pub fn quick_retry(max_attempts: usize) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        interval: Duration::from_secs(5),
    }
}
