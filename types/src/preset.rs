use core::{fmt::Debug, hash::Hash, num::NonZeroU64};

use nonzero_ext::nonzero;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::phase0::primitives::Gwei;

/// Compile-time configuration variables.
///
/// See [presets in `consensus-specs`](https://github.com/ethereum/consensus-specs/tree/v1.0.0/presets).
/// Variables that have the same value in every preset are defined here with defaults.
pub trait Preset: Copy + Eq + Ord + Hash + Default + Debug + Send + Sync + 'static {
    const NAME: PresetName;

    // > Misc
    const MAX_COMMITTEES_PER_SLOT: NonZeroU64;
    const SHUFFLE_ROUND_COUNT: u8;
    const TARGET_COMMITTEE_SIZE: NonZeroU64;
    const HYSTERESIS_DOWNWARD_MULTIPLIER: u64 = 1;
    const HYSTERESIS_QUOTIENT: NonZeroU64 = nonzero!(4_u64);
    const HYSTERESIS_UPWARD_MULTIPLIER: u64 = 5;

    // > Gwei values
    const EFFECTIVE_BALANCE_INCREMENT: NonZeroU64 = nonzero!(1_000_000_000_u64);
    const MAX_EFFECTIVE_BALANCE: Gwei = 32_000_000_000;
    const MIN_DEPOSIT_AMOUNT: Gwei = 1_000_000_000;

    // > Time parameters
    const SLOTS_PER_EPOCH: NonZeroU64;
    const SLOTS_PER_ETH1_VOTING_PERIOD: NonZeroU64;
    const SLOTS_PER_HISTORICAL_ROOT: NonZeroU64;
    const MAX_SEED_LOOKAHEAD: u64 = 4;
    const MIN_ATTESTATION_INCLUSION_DELAY: NonZeroU64 = NonZeroU64::MIN;
    const MIN_EPOCHS_TO_INACTIVITY_PENALTY: u64 = 4;
    const MIN_SEED_LOOKAHEAD: u64 = 1;

    // > State list lengths
    const EPOCHS_PER_HISTORICAL_VECTOR: NonZeroU64;
    const EPOCHS_PER_SLASHINGS_VECTOR: NonZeroU64;

    // > Rewards and penalties
    const BASE_REWARD_FACTOR: u64 = 64;
    const INACTIVITY_PENALTY_QUOTIENT: NonZeroU64 = nonzero!(1_u64 << 25);
    const MIN_SLASHING_PENALTY_QUOTIENT: NonZeroU64 = nonzero!(32_u64);
    const PROPORTIONAL_SLASHING_MULTIPLIER: u64 = 3;
    const PROPOSER_REWARD_QUOTIENT: NonZeroU64 = nonzero!(8_u64);
    const WHISTLEBLOWER_REWARD_QUOTIENT: NonZeroU64 = nonzero!(512_u64);

    // > Fork choice
    const SAFE_SLOTS_TO_UPDATE_JUSTIFIED: u64;

    // Derived variables
    const EPOCHS_PER_HISTORICAL_ROOT: NonZeroU64 = nonzero_quotient(
        Self::SLOTS_PER_HISTORICAL_ROOT,
        Self::SLOTS_PER_EPOCH,
    );
    const MAX_ATTESTATIONS_PER_EPOCH: u64 =
        crate::phase0::consts::MAX_ATTESTATIONS as u64 * Self::SLOTS_PER_EPOCH.get();
}

/// [Mainnet preset](https://github.com/ethereum/consensus-specs/tree/v1.0.0/presets/mainnet).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Mainnet;

impl Preset for Mainnet {
    const NAME: PresetName = PresetName::Mainnet;

    const MAX_COMMITTEES_PER_SLOT: NonZeroU64 = nonzero!(64_u64);
    const SHUFFLE_ROUND_COUNT: u8 = 90;
    const TARGET_COMMITTEE_SIZE: NonZeroU64 = nonzero!(128_u64);

    const SLOTS_PER_EPOCH: NonZeroU64 = nonzero!(32_u64);
    const SLOTS_PER_ETH1_VOTING_PERIOD: NonZeroU64 = nonzero!(1024_u64);
    const SLOTS_PER_HISTORICAL_ROOT: NonZeroU64 = nonzero!(8192_u64);

    const EPOCHS_PER_HISTORICAL_VECTOR: NonZeroU64 = nonzero!(65536_u64);
    const EPOCHS_PER_SLASHINGS_VECTOR: NonZeroU64 = nonzero!(8192_u64);

    const SAFE_SLOTS_TO_UPDATE_JUSTIFIED: u64 = 8;
}

/// [Minimal preset](https://github.com/ethereum/consensus-specs/tree/v1.0.0/presets/minimal).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Debug)]
pub struct Minimal;

impl Preset for Minimal {
    const NAME: PresetName = PresetName::Minimal;

    const MAX_COMMITTEES_PER_SLOT: NonZeroU64 = nonzero!(4_u64);
    const SHUFFLE_ROUND_COUNT: u8 = 10;
    const TARGET_COMMITTEE_SIZE: NonZeroU64 = nonzero!(4_u64);

    const SLOTS_PER_EPOCH: NonZeroU64 = nonzero!(8_u64);
    const SLOTS_PER_ETH1_VOTING_PERIOD: NonZeroU64 = nonzero!(16_u64);
    const SLOTS_PER_HISTORICAL_ROOT: NonZeroU64 = nonzero!(64_u64);

    const EPOCHS_PER_HISTORICAL_VECTOR: NonZeroU64 = nonzero!(64_u64);
    const EPOCHS_PER_SLASHINGS_VECTOR: NonZeroU64 = nonzero!(64_u64);

    const SAFE_SLOTS_TO_UPDATE_JUSTIFIED: u64 = 2;
}

#[derive(
    Clone, Copy, PartialEq, Eq, Debug, Display, EnumString, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PresetName {
    Mainnet,
    Minimal,
}

const fn nonzero_quotient(dividend: NonZeroU64, divisor: NonZeroU64) -> NonZeroU64 {
    match NonZeroU64::new(dividend.get() / divisor.get()) {
        Some(quotient) => quotient,
        None => panic!("quotient of preset variables is zero"),
    }
}

#[cfg(test)]
mod tests {
    use core::str::FromStr as _;

    use test_case::test_case;

    use super::*;

    #[test]
    fn derived_variables_are_consistent() {
        assert_eq!(Minimal::EPOCHS_PER_HISTORICAL_ROOT.get(), 8);
        assert_eq!(Mainnet::EPOCHS_PER_HISTORICAL_ROOT.get(), 256);
        assert_eq!(Minimal::MAX_ATTESTATIONS_PER_EPOCH, 1024);
    }

    #[test]
    fn voting_and_history_periods_are_epoch_aligned() {
        fn check<P: Preset>() {
            assert_eq!(P::SLOTS_PER_ETH1_VOTING_PERIOD.get() % P::SLOTS_PER_EPOCH, 0);
            assert_eq!(P::SLOTS_PER_HISTORICAL_ROOT.get() % P::SLOTS_PER_EPOCH, 0);
        }

        check::<Minimal>();
        check::<Mainnet>();
    }

    #[test_case("mainnet", PresetName::Mainnet)]
    #[test_case("minimal", PresetName::Minimal)]
    fn preset_name_parses_from_lowercase(string: &str, expected: PresetName) {
        assert_eq!(PresetName::from_str(string).ok(), Some(expected));
        assert_eq!(expected.to_string(), string);
    }
}
