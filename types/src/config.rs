use core::num::NonZeroU64;
use std::{borrow::Cow, collections::BTreeMap};

use hex_literal::hex;
use nonzero_ext::nonzero;
use serde::{de::IgnoredAny, Deserialize, Serialize};
use thiserror::Error;

use crate::{
    phase0::primitives::{Gwei, UnixSeconds, Version, H32},
    preset::PresetName,
};

/// Configuration variables customizable at runtime.
///
/// See [configurations in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/v1.0.0/configs).
#[derive(Debug, Deserialize, Serialize)]
#[serde(default, rename_all = "SCREAMING_SNAKE_CASE")]
pub struct Config {
    // Meta
    pub config_name: Cow<'static, str>,
    pub preset_base: PresetName,

    // Genesis
    pub genesis_delay: u64,
    pub genesis_fork_version: Version,
    pub min_genesis_active_validator_count: u64,
    pub min_genesis_time: UnixSeconds,

    // Time parameters
    pub min_validator_withdrawability_delay: u64,
    pub persistent_committee_period: u64,
    pub seconds_per_slot: NonZeroU64,

    // Validator cycle
    pub churn_limit_quotient: NonZeroU64,
    pub ejection_balance: Gwei,
    pub min_per_epoch_churn_limit: u64,

    // Later phases and other unknown variables
    //
    // Collected so that loading a newer configuration file does not fail.
    #[expect(
        clippy::zero_sized_map_values,
        reason = "False positive. Serde can only flatten structs and maps."
    )]
    #[serde(flatten, skip_serializing)]
    pub unknown: BTreeMap<String, IgnoredAny>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            // Meta
            //
            // Use `default` as the default `config_name` and override it in `Config::mainnet`.
            config_name: Cow::Borrowed("default"),
            preset_base: PresetName::Mainnet,

            // Genesis
            genesis_delay: 172_800,
            genesis_fork_version: H32(hex!("00000000")),
            min_genesis_active_validator_count: 1 << 14,
            min_genesis_time: 0,

            // Time parameters
            min_validator_withdrawability_delay: 256,
            persistent_committee_period: 2048,
            seconds_per_slot: nonzero!(12_u64),

            // Validator cycle
            churn_limit_quotient: nonzero!(1_u64 << 16),
            ejection_balance: 16_000_000_000,
            min_per_epoch_churn_limit: 4,

            unknown: BTreeMap::new(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn mainnet() -> Self {
        Self {
            config_name: Cow::Borrowed("mainnet"),
            min_genesis_time: 1_606_824_000,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn minimal() -> Self {
        Self {
            // Meta
            config_name: Cow::Borrowed("minimal"),
            preset_base: PresetName::Minimal,

            // Genesis
            genesis_delay: 300,
            genesis_fork_version: H32(hex!("00000001")),
            min_genesis_active_validator_count: 64,
            min_genesis_time: 1_578_009_600,

            // Time parameters
            persistent_committee_period: 64,
            seconds_per_slot: nonzero!(6_u64),

            ..Self::default()
        }
    }

    /// Parses a configuration in the format of `config.yaml` files.
    ///
    /// Missing variables take their values from [`Config::default`].
    pub fn from_yaml(yaml: &str) -> Result<Self, Error> {
        let config = serde_yaml::from_str::<Self>(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.config_name.is_empty() {
            return Err(Error::NameEmpty);
        }

        for character in self.config_name.chars() {
            if !matches!(character, 'a'..='z' | '0'..='9' | '-') {
                return Err(Error::NameContainsIllegalCharacters);
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn unknown_variables(&self) -> impl Iterator<Item = &str> {
        self.unknown.keys().map(String::as_str)
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("configuration name is empty")]
    NameEmpty,
    #[error("configuration name contains illegal characters")]
    NameContainsIllegalCharacters,
    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Refactoring worsens readability, which is more important in tests."
)]
