//! CL genesis data generation.
//!
//! Renders the genesis parameter and mnemonic documents from a
//! [GenesisConfig], runs the external genesis-construction tool inside the
//! generator service, and collects the outputs into a [GenesisData] bundle
//! referenced by every later launch step. Any failure aborts the whole
//! operation; a partial bundle is never returned.

use crate::config::GenesisConfig;
use crate::enclave::Service;
use crate::{artifacts, Error};
use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Prefix of the per-run working directory inside the shared directory.
const GENERATION_INSTANCE_DIR_PREFIX: &str = "cl-genesis-";

const CONFIG_DIRNAME: &str = "config";
const GENERATION_CONFIG_YML_FILENAME: &str = "config.yaml";
const GENERATION_MNEMONICS_YML_FILENAME: &str = "mnemonics.yaml";

const OUTPUT_DIRNAME: &str = "output";
const TRANCHES_DIRNAME: &str = "tranches";
// WARNING: Do not change this! The CL clients are hardcoded to look for
// this filename.
const GENESIS_CONFIG_YML_FILENAME: &str = "config.yaml";
const GENESIS_STATE_FILENAME: &str = "genesis.ssz";
const DEPLOY_BLOCK_FILENAME: &str = "deploy_block.txt";
const DEPOSIT_CONTRACT_FILENAME: &str = "deposit_contract.txt";
const JWT_SECRET_FILENAME: &str = "jwtsecret";

/// Path of the genesis-construction binary inside the generator service.
const GENERATION_BINARY_FILEPATH: &str = "/usr/local/bin/eth2-testnet-genesis";
const DEPLOY_BLOCK: &str = "0";
const ETH1_BLOCK: &str = "0x0000000000000000000000000000000000000000000000000000000000000000";
const SUCCESS_EXIT_CODE: i32 = 0;

const PRESET_BASE: &str = "mainnet";
const GENESIS_DELAY: u64 = 0;
const GENESIS_FORK_VERSION: &str = "0x00000000";
const ALTAIR_FORK_VERSION: &str = "0x01000000";
const MERGE_FORK_VERSION: &str = "0x02000000";

/// Genesis parameter document consumed by the generation tool and, via the
/// stable `config.yaml` copy, by every CL client.
#[derive(Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
struct GenesisParamsDocument<'a> {
    preset_base: &'static str,
    min_genesis_active_validator_count: u32,
    min_genesis_time: u64,
    genesis_fork_version: &'static str,
    genesis_delay: u64,
    terminal_total_difficulty: u64,
    altair_fork_version: &'static str,
    altair_fork_epoch: u64,
    merge_fork_version: &'static str,
    merge_fork_epoch: u64,
    seconds_per_slot: u32,
    deposit_chain_id: &'a str,
    deposit_network_id: &'a str,
    deposit_contract_address: &'a str,
}

/// One entry of the mnemonic document: a mnemonic and how many validator
/// keys to derive from it.
#[derive(Serialize)]
struct MnemonicEntry<'a> {
    mnemonic: &'a str,
    count: u32,
}

/// Output bundle of one genesis generation run. All paths are absolute on
/// the launcher's filesystem and owned for the lifetime of the network run.
#[derive(Clone, Debug)]
pub struct GenesisData {
    output_dir: PathBuf,
    config_path: PathBuf,
    state_path: PathBuf,
    jwt_secret_path: PathBuf,
    deploy_block_path: PathBuf,
    deposit_contract_path: PathBuf,
    tranches_dir: PathBuf,
}

impl GenesisData {
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// The genesis config document under its fixed, client-hardcoded name.
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// JWT secret for EL<->CL authenticated RPC.
    pub fn jwt_secret_path(&self) -> &Path {
        &self.jwt_secret_path
    }

    pub fn deploy_block_path(&self) -> &Path {
        &self.deploy_block_path
    }

    pub fn deposit_contract_path(&self) -> &Path {
        &self.deposit_contract_path
    }

    /// Directory holding per-key-batch validator material.
    pub fn tranches_dir(&self) -> &Path {
        &self.tranches_dir
    }
}

/// Generates the CL genesis data bundle by running the genesis tool inside
/// `generator` against documents rendered from `config`, and copies the
/// caller's JWT secret alongside the outputs.
pub async fn generate<S: Service>(
    generator: &S,
    config: &GenesisConfig,
    jwt_secret: &Path,
) -> Result<GenesisData, Error> {
    // Unique working area per run so repeated runs against a shared
    // filesystem never collide.
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|_| Error::Clock)?
        .as_secs();
    fs::create_dir_all(generator.shared_dir().local())?;
    let base = format!("{GENERATION_INSTANCE_DIR_PREFIX}{now}");
    let mut suffix = 0u32;
    let instance_dir = loop {
        let name = if suffix == 0 {
            base.clone()
        } else {
            format!("{base}-{suffix}")
        };
        let dir = generator.shared_dir().child(&name);
        // The timestamp has one-second granularity, so the directory must
        // be claimed with a non-recursive create: an existing directory
        // belongs to another run and sharing it would let that run's
        // bundle be overwritten in place.
        match fs::create_dir(dir.local()) {
            Ok(()) => break dir,
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => suffix += 1,
            Err(err) => return Err(err.into()),
        }
    };
    let config_dir = instance_dir.child(CONFIG_DIRNAME);
    let output_dir = instance_dir.child(OUTPUT_DIRNAME);
    for dir in [&config_dir, &output_dir] {
        fs::create_dir_all(dir.local())?;
    }
    debug!(path = %instance_dir.local().display(), "created genesis working area");

    // Render the generation inputs.
    let generation_config = config_dir.child(GENERATION_CONFIG_YML_FILENAME);
    let params = GenesisParamsDocument {
        preset_base: PRESET_BASE,
        min_genesis_active_validator_count: config.num_validator_keys_to_preregister,
        min_genesis_time: config.genesis_unix_timestamp,
        genesis_fork_version: GENESIS_FORK_VERSION,
        genesis_delay: GENESIS_DELAY,
        terminal_total_difficulty: config.total_terminal_difficulty,
        altair_fork_version: ALTAIR_FORK_VERSION,
        altair_fork_epoch: config.altair_fork_epoch,
        merge_fork_version: MERGE_FORK_VERSION,
        merge_fork_epoch: config.merge_fork_epoch,
        seconds_per_slot: config.seconds_per_slot,
        deposit_chain_id: &config.network_id,
        deposit_network_id: &config.network_id,
        deposit_contract_address: &config.deposit_contract_address,
    };
    artifacts::render_yaml(
        "genesis generation config",
        &params,
        generation_config.local(),
    )?;
    let generation_mnemonics = config_dir.child(GENERATION_MNEMONICS_YML_FILENAME);
    let mnemonics = [MnemonicEntry {
        mnemonic: &config.preregistered_validator_keys_mnemonic,
        count: config.num_validator_keys_to_preregister,
    }];
    artifacts::render_yaml(
        "genesis generation mnemonics",
        &mnemonics,
        generation_mnemonics.local(),
    )?;

    // Copy the parameter document into the output layout under the fixed
    // filename before running the tool, so the bundle layout is stable.
    let genesis_config = output_dir.child(GENESIS_CONFIG_YML_FILENAME);
    fs::copy(generation_config.local(), genesis_config.local()).map_err(|source| {
        Error::Staging {
            src: format!("file '{}'", generation_config.local().display()),
            dst: genesis_config.local().to_path_buf(),
            source,
        }
    })?;
    let deploy_block = output_dir.child(DEPLOY_BLOCK_FILENAME);
    fs::write(deploy_block.local(), DEPLOY_BLOCK)?;
    let deposit_contract = output_dir.child(DEPOSIT_CONTRACT_FILENAME);
    fs::write(deposit_contract.local(), &config.deposit_contract_address)?;

    // Run the genesis-construction tool inside the generator service.
    let genesis_state = output_dir.child(GENESIS_STATE_FILENAME);
    let tranches_dir = output_dir.child(TRANCHES_DIRNAME);
    let argv = vec![
        GENERATION_BINARY_FILEPATH.to_string(),
        "phase0".to_string(),
        "--config".to_string(),
        generation_config.remote().display().to_string(),
        "--eth1-block".to_string(),
        ETH1_BLOCK.to_string(),
        "--mnemonics".to_string(),
        generation_mnemonics.remote().display().to_string(),
        "--timestamp".to_string(),
        config.genesis_unix_timestamp.to_string(),
        "--tranches-dir".to_string(),
        tranches_dir.remote().display().to_string(),
        "--state-output".to_string(),
        genesis_state.remote().display().to_string(),
    ];
    let (exit_code, output) = generator.exec(&argv).await?;
    if exit_code != SUCCESS_EXIT_CODE {
        return Err(Error::GenesisCommand {
            command: argv.join(" "),
            code: exit_code,
            output,
        });
    }
    let state_ok = fs::metadata(genesis_state.local())
        .map(|m| m.len() > 0)
        .unwrap_or(false);
    if !state_ok {
        return Err(Error::GenesisStateMissing(
            genesis_state.local().to_path_buf(),
        ));
    }

    // Make the EL<->CL auth secret part of the bundle.
    let jwt_secret_out = output_dir.child(JWT_SECRET_FILENAME);
    fs::copy(jwt_secret, jwt_secret_out.local()).map_err(|source| Error::Staging {
        src: format!("file '{}'", jwt_secret.display()),
        dst: jwt_secret_out.local().to_path_buf(),
        source,
    })?;

    info!(
        output = %output_dir.local().display(),
        "generated CL genesis data"
    );
    Ok(GenesisData {
        output_dir: output_dir.local().to_path_buf(),
        config_path: genesis_config.local().to_path_buf(),
        state_path: genesis_state.local().to_path_buf(),
        jwt_secret_path: jwt_secret_out.local().to_path_buf(),
        deploy_block_path: deploy_block.local().to_path_buf(),
        deposit_contract_path: deposit_contract.local().to_path_buf(),
        tranches_dir: tranches_dir.local().to_path_buf(),
    })
}

/// Stable filename of the genesis config inside the bundle. Exposed for
/// callers that address the bundle layout directly.
pub const fn genesis_config_filename() -> &'static str {
    GENESIS_CONFIG_YML_FILENAME
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::{genesis_exec_effect, MockService};

    fn sample_config() -> GenesisConfig {
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

    fn jwt_fixture(service: &MockService) -> PathBuf {
        let path = service.shared_dir().local().join("jwt.hex");
        fs::write(&path, "0xdeadbeef").unwrap();
        path
    }

    #[tokio::test]
    async fn produces_complete_bundle() {
        let generator =
            MockService::for_test("genesis-complete").with_exec_effect(genesis_exec_effect());
        let jwt = jwt_fixture(&generator);

        let bundle = generate(&generator, &sample_config(), &jwt).await.unwrap();

        // Every referenced path exists and is non-empty (directories: exist).
        for path in [
            bundle.config_path(),
            bundle.state_path(),
            bundle.jwt_secret_path(),
            bundle.deploy_block_path(),
            bundle.deposit_contract_path(),
        ] {
            let metadata = fs::metadata(path).unwrap();
            assert!(metadata.len() > 0, "{} is empty", path.display());
        }
        assert!(bundle.tranches_dir().is_dir());
        assert_eq!(
            bundle.config_path().file_name().unwrap(),
            genesis_config_filename()
        );
        assert_eq!(
            fs::read_to_string(bundle.deploy_block_path()).unwrap(),
            "0"
        );
        assert_eq!(
            fs::read_to_string(bundle.deposit_contract_path()).unwrap(),
            "0x4242424242424242424242424242424242424242"
        );
        assert_eq!(fs::read_to_string(bundle.jwt_secret_path()).unwrap(), "0xdeadbeef");

        let rendered = fs::read_to_string(bundle.config_path()).unwrap();
        assert!(rendered.contains("SECONDS_PER_SLOT: 12"));
        assert!(rendered.contains("DEPOSIT_NETWORK_ID: test"));
        assert!(rendered.contains("MIN_GENESIS_ACTIVE_VALIDATOR_COUNT: 4"));
    }

    #[tokio::test]
    async fn repeated_runs_get_exclusive_working_areas() {
        let generator =
            MockService::for_test("genesis-exclusive").with_exec_effect(genesis_exec_effect());
        let jwt = jwt_fixture(&generator);

        let first = generate(&generator, &sample_config(), &jwt).await.unwrap();
        let mut second_config = sample_config();
        second_config.deposit_contract_address =
            "0x9999999999999999999999999999999999999999".to_string();
        let second = generate(&generator, &second_config, &jwt).await.unwrap();

        // Each run owns its working area, even within the same second; the
        // first bundle must still read back its own content.
        assert_ne!(first.output_dir(), second.output_dir());
        assert_eq!(
            fs::read_to_string(first.deposit_contract_path()).unwrap(),
            "0x4242424242424242424242424242424242424242"
        );
        assert_eq!(
            fs::read_to_string(second.deposit_contract_path()).unwrap(),
            "0x9999999999999999999999999999999999999999"
        );
    }

    #[tokio::test]
    async fn generation_command_receives_expected_argv() {
        let generator =
            MockService::for_test("genesis-argv").with_exec_effect(genesis_exec_effect());
        let jwt = jwt_fixture(&generator);

        generate(&generator, &sample_config(), &jwt).await.unwrap();

        let calls = generator.exec_calls();
        assert_eq!(calls.len(), 1);
        let argv = &calls[0];
        assert_eq!(argv[0], "/usr/local/bin/eth2-testnet-genesis");
        assert_eq!(argv[1], "phase0");
        assert!(argv.contains(&"--eth1-block".to_string()));
        assert!(argv.contains(&ETH1_BLOCK.to_string()));
        assert!(argv.contains(&"--timestamp".to_string()));
        assert!(argv.contains(&"1700000000".to_string()));
    }

    #[tokio::test]
    async fn nonzero_exit_aborts_with_captured_output() {
        let generator =
            MockService::for_test("genesis-fail").with_exec_result(2, "bad mnemonic".to_string());
        let jwt = jwt_fixture(&generator);

        match generate(&generator, &sample_config(), &jwt).await {
            Err(Error::GenesisCommand { code, output, .. }) => {
                assert_eq!(code, 2);
                assert_eq!(output, "bad mnemonic");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_state_output_is_an_error() {
        // Exit code 0 but the tool wrote nothing.
        let generator = MockService::for_test("genesis-no-state");
        let jwt = jwt_fixture(&generator);

        assert!(matches!(
            generate(&generator, &sample_config(), &jwt).await,
            Err(Error::GenesisStateMissing(_))
        ));
    }

    #[tokio::test]
    async fn missing_jwt_secret_is_a_staging_error() {
        let generator =
            MockService::for_test("genesis-no-jwt").with_exec_effect(genesis_exec_effect());
        let missing = generator.shared_dir().local().join("missing-jwt.hex");

        assert!(matches!(
            generate(&generator, &sample_config(), &missing).await,
            Err(Error::Staging { .. })
        ));
    }
}
