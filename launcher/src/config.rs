//! Caller-facing configuration for a participant launch.

use crate::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Delimiter between the beacon and validator images when a client family
/// ships two cooperating images.
const IMAGE_SEPARATOR: &str = ",";

/// Number of images the delimited form must carry.
const EXPECTED_NUM_IMAGES: usize = 2;

/// Default number of health-check attempts before giving up on a beacon node.
const DEFAULT_MAX_HEALTHCHECK_ATTEMPTS: usize = 100;

/// Default pause between health-check attempts.
const DEFAULT_HEALTHCHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Network genesis parameters, fixed for the lifetime of a network run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenesisConfig {
    pub network_id: String,
    pub seconds_per_slot: u32,
    pub genesis_unix_timestamp: u64,
    pub total_terminal_difficulty: u64,
    pub altair_fork_epoch: u64,
    pub merge_fork_epoch: u64,
    pub deposit_contract_address: String,
    pub preregistered_validator_keys_mnemonic: String,
    pub num_validator_keys_to_preregister: u32,
}

/// Beacon and validator container images, parsed once at the boundary from
/// the delimited `"<beacon>,<validator>"` form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImagePair {
    pub beacon: String,
    pub validator: String,
}

impl ImagePair {
    /// Parses the delimited dual-image form. Exactly two segments are
    /// required and each must be non-blank after trimming; anything else
    /// fails before any launch is attempted.
    pub fn parse(delimited: &str) -> Result<Self, Error> {
        let segments: Vec<&str> = delimited.split(IMAGE_SEPARATOR).collect();
        if segments.len() != EXPECTED_NUM_IMAGES {
            return Err(Error::InvalidImages(delimited.to_string()));
        }
        let beacon = segments[0].trim();
        if beacon.is_empty() {
            return Err(Error::BlankImage {
                role: "beacon",
                images: delimited.to_string(),
            });
        }
        let validator = segments[1].trim();
        if validator.is_empty() {
            return Err(Error::BlankImage {
                role: "validator",
                images: delimited.to_string(),
            });
        }
        Ok(Self {
            beacon: beacon.to_string(),
            validator: validator.to_string(),
        })
    }
}

/// Client log verbosity, mapped to a client-specific string by each family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Bounded retry budget for the beacon health poll.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    #[serde(with = "duration_secs")]
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_HEALTHCHECK_ATTEMPTS,
            interval: DEFAULT_HEALTHCHECK_INTERVAL,
        }
    }
}

/// One participant as declared in the caller's network definition.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParticipantConfig {
    pub id: String,
    /// Delimited `"<beacon>,<validator>"` image pair; validated by
    /// [ParticipantConfig::images].
    pub images: String,
    /// Participant-level override of the network-wide log level.
    #[serde(default)]
    pub log_level: Option<LogLevel>,
    #[serde(default)]
    pub extra_beacon_args: Vec<String>,
    #[serde(default)]
    pub extra_validator_args: Vec<String>,
}

impl ParticipantConfig {
    /// Validates and parses the delimited image pair.
    pub fn images(&self) -> Result<ImagePair, Error> {
        ImagePair::parse(&self.images)
    }

    /// Log level this participant runs at, falling back to the
    /// network-wide default.
    pub fn effective_log_level(&self, global: LogLevel) -> LogLevel {
        self.log_level.unwrap_or(global)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test]
    fn parse_valid_image_pair() {
        let pair = ImagePair::parse("prysm/beacon:latest,prysm/validator:latest").unwrap();
        assert_eq!(pair.beacon, "prysm/beacon:latest");
        assert_eq!(pair.validator, "prysm/validator:latest");
    }

    #[test]
    fn parse_trims_segments() {
        let pair = ImagePair::parse(" beacon:v1 , validator:v1 ").unwrap();
        assert_eq!(pair.beacon, "beacon:v1");
        assert_eq!(pair.validator, "validator:v1");
    }

    #[test_case(""; "empty string")]
    #[test_case("beacon:latest"; "single segment")]
    #[test_case("a,b,c"; "three segments")]
    fn parse_rejects_wrong_segment_count(input: &str) {
        assert!(matches!(
            ImagePair::parse(input),
            Err(Error::InvalidImages(_))
        ));
    }

    #[test_case(" ,validator:latest", "beacon"; "blank beacon")]
    #[test_case("beacon:latest,  ", "validator"; "blank validator")]
    fn parse_rejects_blank_segments(input: &str, expected_role: &str) {
        match ImagePair::parse(input) {
            Err(Error::BlankImage { role, .. }) => assert_eq!(role, expected_role),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn retry_policy_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 100);
        assert_eq!(policy.interval, Duration::from_secs(5));
    }

    #[test]
    fn participant_log_level_falls_back_to_global() {
        let mut participant = ParticipantConfig {
            id: "p0".to_string(),
            images: "a,b".to_string(),
            log_level: None,
            extra_beacon_args: Vec::new(),
            extra_validator_args: Vec::new(),
        };
        assert_eq!(participant.effective_log_level(LogLevel::Info), LogLevel::Info);
        participant.log_level = Some(LogLevel::Trace);
        assert_eq!(participant.effective_log_level(LogLevel::Info), LogLevel::Trace);
    }

    #[test]
    fn participant_config_from_yaml() {
        let yaml = r#"
id: p0
images: "beacon:latest,validator:latest"
log_level: debug
extra_beacon_args:
  - "--foo=bar"
"#;
        let participant: ParticipantConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(participant.id, "p0");
        assert_eq!(participant.log_level, Some(LogLevel::Debug));
        assert_eq!(participant.extra_beacon_args, vec!["--foo=bar".to_string()]);
        assert!(participant.extra_validator_args.is_empty());
        participant.images().unwrap();
    }
}
