use core::num::NonZeroU64;

use anyhow::{bail, ensure, Result};
use bls::PublicKeyBytes;
use integer_sqrt::IntegerSquareRoot as _;
use itertools::Itertools as _;
use ssz::{BitList, SszHash as _};
use tap::{Pipe as _, TryConv as _};
use types::{
    collections::VectorExt as _,
    config::Config,
    nonstandard::{AttestationEpoch, RelativeEpoch},
    phase0::{
        beacon_state::BeaconState,
        consts::{
            BASE_REWARDS_PER_EPOCH, DOMAIN_BEACON_ATTESTER, DOMAIN_BEACON_PROPOSER, GENESIS_EPOCH,
            MAX_VALIDATORS_PER_COMMITTEE,
        },
        containers::{Attestation, AttestationData, IndexedAttestation},
        primitives::{CommitteeIndex, DomainType, Epoch, Gwei, Slot, ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::{error::Error, misc, predicates};

#[must_use]
pub fn get_previous_epoch<P: Preset>(state: &BeaconState<P>) -> Epoch {
    get_current_epoch(state)
        .saturating_sub(1)
        .max(GENESIS_EPOCH)
}

#[must_use]
pub const fn get_current_epoch<P: Preset>(state: &BeaconState<P>) -> Epoch {
    misc::compute_epoch_at_slot::<P>(state.slot)
}

#[must_use]
pub const fn get_next_epoch<P: Preset>(state: &BeaconState<P>) -> Epoch {
    get_current_epoch(state) + 1
}

#[must_use]
pub fn absolute_epoch<P: Preset>(state: &BeaconState<P>, relative_epoch: RelativeEpoch) -> Epoch {
    match relative_epoch {
        RelativeEpoch::Previous => get_previous_epoch(state),
        RelativeEpoch::Current => get_current_epoch(state),
        RelativeEpoch::Next => get_next_epoch(state),
    }
}

pub fn attestation_epoch<P: Preset>(
    state: &BeaconState<P>,
    epoch: Epoch,
) -> Result<AttestationEpoch> {
    match get_current_epoch(state).checked_sub(epoch) {
        None => bail!(Error::EpochInTheFuture { epoch }),
        Some(0) => Ok(AttestationEpoch::Current),
        Some(1) => Ok(AttestationEpoch::Previous),
        Some(_) => bail!(Error::EpochBeforePrevious { epoch }),
    }
}

pub fn relative_epoch<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> Result<RelativeEpoch> {
    match get_next_epoch(state).checked_sub(epoch) {
        None => bail!(Error::EpochAfterNext { epoch }),
        Some(0) => Ok(RelativeEpoch::Next),
        Some(1) => Ok(RelativeEpoch::Current),
        // In the genesis epoch the previous epoch is the same as the current one.
        Some(2) => Ok(RelativeEpoch::Previous),
        Some(_) => bail!(Error::EpochBeforePrevious { epoch }),
    }
}

#[must_use]
pub fn get_finality_delay<P: Preset>(state: &BeaconState<P>) -> u64 {
    get_previous_epoch(state).saturating_sub(state.finalized_checkpoint.epoch)
}

/// [`get_block_root`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/beacon-chain.md#get_block_root)
pub fn get_block_root<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> Result<H256> {
    get_block_root_at_slot(state, misc::compute_start_slot_at_epoch::<P>(epoch))
}

pub fn get_block_root_at_slot<P: Preset>(state: &BeaconState<P>, slot: Slot) -> Result<H256> {
    ensure!(slot < state.slot, Error::SlotOutOfRange { slot });

    ensure!(
        state.slot <= slot + P::SLOTS_PER_HISTORICAL_ROOT.get(),
        Error::SlotOutOfRange { slot },
    );

    Ok(*state.block_roots.mod_index(slot))
}

/// Root of the latest block applied to `state`.
///
/// The state root in `latest_block_header` is only filled in at the start of the next slot.
#[must_use]
pub fn latest_block_root<P: Preset>(state: &BeaconState<P>) -> H256 {
    let mut header = state.latest_block_header;

    if header.state_root.is_zero() {
        header.state_root = state.hash_tree_root();
    }

    header.hash_tree_root()
}

#[must_use]
pub fn get_randao_mix<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> H256 {
    *state.randao_mixes.mod_index(epoch)
}

pub fn public_key<P: Preset>(
    state: &BeaconState<P>,
    validator_index: ValidatorIndex,
) -> Result<&PublicKeyBytes> {
    Ok(&state.validators.get_at(validator_index)?.pubkey)
}

#[must_use]
pub fn index_of_public_key<P: Preset>(
    state: &BeaconState<P>,
    public_key: &PublicKeyBytes,
) -> Option<ValidatorIndex> {
    state
        .validators
        .iter()
        .position(|validator| validator.pubkey == *public_key)
        .map(|position| {
            position
                .try_conv::<ValidatorIndex>()
                .expect("validator indices fit in u64")
        })
}

pub fn get_active_validator_indices<P: Preset>(
    state: &BeaconState<P>,
    epoch: Epoch,
) -> impl Iterator<Item = ValidatorIndex> + '_ {
    (0..)
        .zip(state.validators.iter())
        .filter(move |(_, validator)| predicates::is_active_validator(validator, epoch))
        .map(|(validator_index, _)| validator_index)
}

#[must_use]
pub fn active_validator_count<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> u64 {
    get_active_validator_indices(state, epoch)
        .count()
        .try_conv::<u64>()
        .expect("the number of validators fits in u64")
}

#[must_use]
pub fn get_validator_churn_limit<P: Preset>(config: &Config, state: &BeaconState<P>) -> u64 {
    (active_validator_count(state, get_current_epoch(state)) / config.churn_limit_quotient)
        .max(config.min_per_epoch_churn_limit)
}

#[must_use]
pub fn get_seed<P: Preset>(state: &BeaconState<P>, epoch: Epoch, domain_type: DomainType) -> H256 {
    let mix = get_randao_mix(
        state,
        epoch + P::EPOCHS_PER_HISTORICAL_VECTOR.get() - P::MIN_SEED_LOOKAHEAD - 1,
    );

    hashing::hash_32_64_256(domain_type.to_fixed_bytes(), epoch, mix)
}

#[must_use]
pub fn get_committee_count_per_slot<P: Preset>(state: &BeaconState<P>, epoch: Epoch) -> u64 {
    misc::committee_count_from_active_validator_count::<P>(active_validator_count(state, epoch))
}

#[must_use]
pub fn get_committee_count_at_slot<P: Preset>(state: &BeaconState<P>, slot: Slot) -> u64 {
    get_committee_count_per_slot(state, misc::compute_epoch_at_slot::<P>(slot))
}

/// [`get_beacon_committee`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/beacon-chain.md#get_beacon_committee)
pub fn get_beacon_committee<P: Preset>(
    state: &BeaconState<P>,
    slot: Slot,
    committee_index: CommitteeIndex,
) -> Result<Vec<ValidatorIndex>> {
    let epoch = misc::compute_epoch_at_slot::<P>(slot);

    relative_epoch(state, epoch)?;

    let committees_per_slot = get_committee_count_per_slot(state, epoch);

    ensure!(
        committee_index < committees_per_slot,
        Error::CommitteeIndexOutOfBounds {
            index: committee_index,
            committee_count: committees_per_slot,
        },
    );

    let indices = get_active_validator_indices(state, epoch).collect_vec();
    let seed = get_seed(state, epoch, DOMAIN_BEACON_ATTESTER);
    let index_in_epoch =
        misc::slots_since_epoch_start::<P>(slot) * committees_per_slot + committee_index;
    let committees_in_epoch = committees_in_epoch::<P>(committees_per_slot);

    misc::compute_committee::<P>(&indices, seed, index_in_epoch, committees_in_epoch)
}

/// Computes all committees at `slot`, shuffling the active validators only once.
pub fn beacon_committees<P: Preset>(
    state: &BeaconState<P>,
    slot: Slot,
) -> Result<impl Iterator<Item = Vec<ValidatorIndex>>> {
    let epoch = misc::compute_epoch_at_slot::<P>(slot);

    relative_epoch(state, epoch)?;

    let committees_per_slot = get_committee_count_per_slot(state, epoch);
    let committees_in_epoch = committees_in_epoch::<P>(committees_per_slot);
    let seed = get_seed(state, epoch, DOMAIN_BEACON_ATTESTER);
    let indices = get_active_validator_indices(state, epoch).collect_vec();
    let total = indices.len().try_conv::<u64>()?;
    let shuffled = misc::shuffle_active_indices::<P>(indices, seed)?;
    let first_index_in_slot = misc::slots_since_epoch_start::<P>(slot) * committees_per_slot;

    (0..committees_per_slot)
        .map(move |committee_index| {
            let range = misc::committee_range(
                total,
                first_index_in_slot + committee_index,
                committees_in_epoch,
            );

            let start = range.start.try_conv::<usize>().expect("range is within shuffled");
            let end = range.end.try_conv::<usize>().expect("range is within shuffled");

            shuffled[start..end].to_vec()
        })
        .pipe(Ok)
}

fn committees_in_epoch<P: Preset>(committees_per_slot: u64) -> NonZeroU64 {
    NonZeroU64::new(committees_per_slot)
        .expect("committee count is clamped to at least 1")
        .saturating_mul(P::SLOTS_PER_EPOCH)
}

pub fn get_beacon_proposer_index<P: Preset>(state: &BeaconState<P>) -> Result<ValidatorIndex> {
    let epoch = get_current_epoch(state);
    let seed = hashing::hash_256_64(get_seed(state, epoch, DOMAIN_BEACON_PROPOSER), state.slot);
    let indices = get_active_validator_indices(state, epoch).collect_vec();

    misc::compute_proposer_index(state, &indices, seed)
}

#[must_use]
pub fn get_domain<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    domain_type: DomainType,
    epoch: Option<Epoch>,
) -> H256 {
    let epoch = epoch.unwrap_or_else(|| get_current_epoch(state));
    let fork = state.fork;

    let fork_version = if epoch < fork.epoch {
        fork.previous_version
    } else {
        fork.current_version
    };

    misc::compute_domain(
        config,
        domain_type,
        Some(fork_version),
        Some(state.genesis_validators_root),
    )
}

pub fn get_indexed_attestation<P: Preset>(
    state: &BeaconState<P>,
    attestation: &Attestation,
) -> Result<IndexedAttestation> {
    let mut attesting_indices =
        get_attesting_indices(state, attestation.data, &attestation.aggregation_bits)?;

    attesting_indices.sort_unstable();

    Ok(IndexedAttestation {
        attesting_indices: attesting_indices.try_into()?,
        data: attestation.data,
        signature: attestation.signature,
    })
}

/// Returns the attesting indices in committee order.
///
/// Committees never contain duplicates, so the result does not either.
pub fn get_attesting_indices<P: Preset>(
    state: &BeaconState<P>,
    attestation_data: AttestationData,
    aggregation_bits: &BitList<MAX_VALIDATORS_PER_COMMITTEE>,
) -> Result<Vec<ValidatorIndex>> {
    let committee = get_beacon_committee(state, attestation_data.slot, attestation_data.index)?;

    ensure!(
        committee.len() == aggregation_bits.len(),
        Error::CommitteeLengthMismatch {
            aggregation_bitlist_length: aggregation_bits.len(),
            committee_length: committee.len(),
        },
    );

    aggregation_bits
        .ones()
        .map(|position| committee[position])
        .collect_vec()
        .pipe(Ok)
}

/// [`get_total_balance`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/beacon-chain.md#get_total_balance)
///
/// Returns at least `EFFECTIVE_BALANCE_INCREMENT` to avoid division by zero.
pub fn get_total_balance<P: Preset>(
    state: &BeaconState<P>,
    indices: impl IntoIterator<Item = ValidatorIndex>,
) -> Result<Gwei> {
    let mut total = 0;

    for validator_index in indices {
        total += state.validators.get_at(validator_index)?.effective_balance;
    }

    Ok(total.max(P::EFFECTIVE_BALANCE_INCREMENT.get()))
}

#[must_use]
pub fn get_total_active_balance<P: Preset>(state: &BeaconState<P>) -> Gwei {
    let epoch = get_current_epoch(state);

    state
        .validators
        .iter()
        .filter(|validator| predicates::is_active_validator(validator, epoch))
        .map(|validator| validator.effective_balance)
        .sum::<Gwei>()
        .max(P::EFFECTIVE_BALANCE_INCREMENT.get())
}

pub fn get_base_reward<P: Preset>(
    state: &BeaconState<P>,
    validator_index: ValidatorIndex,
    total_active_balance: Gwei,
) -> Result<Gwei> {
    let effective_balance = state.validators.get_at(validator_index)?.effective_balance;

    Ok(effective_balance * P::BASE_REWARD_FACTOR
        / total_active_balance.integer_sqrt()
        / BASE_REWARDS_PER_EPOCH)
}

#[cfg(test)]
mod tests {
    use types::{
        phase0::{
            consts::FAR_FUTURE_EPOCH,
            containers::{Checkpoint, Validator},
        },
        preset::Minimal,
    };

    use super::*;

    fn state_with_validators(count: u64) -> BeaconState<Minimal> {
        let validators = (0..count)
            .map(|index| Validator {
                pubkey: PublicKeyBytes::repeat_byte(u8::try_from(index % 256).unwrap_or_default()),
                effective_balance: Minimal::MAX_EFFECTIVE_BALANCE,
                activation_epoch: 0,
                exit_epoch: FAR_FUTURE_EPOCH,
                withdrawable_epoch: FAR_FUTURE_EPOCH,
                ..Validator::default()
            })
            .collect();

        BeaconState {
            validators,
            balances: (0..count).map(|_| Minimal::MAX_EFFECTIVE_BALANCE).collect(),
            ..BeaconState::default()
        }
    }

    #[test]
    fn previous_epoch_does_not_go_below_genesis() {
        let mut state = state_with_validators(0);

        assert_eq!(get_previous_epoch(&state), GENESIS_EPOCH);

        state.slot = 17;

        assert_eq!(get_current_epoch(&state), 2);
        assert_eq!(get_previous_epoch(&state), 1);
    }

    #[test]
    fn attestation_epoch_accepts_only_current_and_previous() {
        let state = BeaconState::<Minimal> {
            slot: 24,
            ..state_with_validators(0)
        };

        assert_eq!(attestation_epoch(&state, 3).ok(), Some(AttestationEpoch::Current));
        assert_eq!(attestation_epoch(&state, 2).ok(), Some(AttestationEpoch::Previous));
        assert!(attestation_epoch(&state, 1).is_err());
        assert!(attestation_epoch(&state, 4).is_err());
    }

    #[test]
    fn block_root_at_slot_must_be_in_the_past() {
        let mut state = state_with_validators(0);
        state.slot = 5;
        *state.block_roots.mod_index_mut(4) = H256::repeat_byte(4);

        assert_eq!(get_block_root_at_slot(&state, 4).ok(), Some(H256::repeat_byte(4)));
        assert!(get_block_root_at_slot(&state, 5).is_err());
    }

    #[test]
    fn finality_delay_counts_from_previous_epoch() {
        let state = BeaconState::<Minimal> {
            slot: 80,
            finalized_checkpoint: Checkpoint {
                epoch: 3,
                root: H256::zero(),
            },
            ..state_with_validators(0)
        };

        assert_eq!(get_finality_delay(&state), 6);
    }

    #[test]
    fn beacon_committees_match_individual_committees() -> Result<()> {
        let state = state_with_validators(64);

        for slot in 0..8 {
            let committees = beacon_committees(&state, slot)?.collect_vec();

            assert_eq!(
                committees.len().try_conv::<u64>()?,
                get_committee_count_at_slot(&state, slot),
            );

            for (committee_index, committee) in (0..).zip(committees) {
                assert_eq!(committee, get_beacon_committee(&state, slot, committee_index)?);
            }
        }

        Ok(())
    }

    #[test]
    fn every_active_validator_is_in_exactly_one_committee_per_epoch() -> Result<()> {
        let state = state_with_validators(64);

        let members = (0..8)
            .map(|slot| beacon_committees(&state, slot))
            .flatten_ok()
            .flatten_ok()
            .collect::<Result<Vec<_>>>()?;

        assert_eq!(members.into_iter().sorted().collect_vec(), (0..64).collect_vec());

        Ok(())
    }

    #[test]
    fn committee_index_out_of_bounds_is_rejected() {
        let state = state_with_validators(64);

        assert!(get_beacon_committee(&state, 0, 2).is_err());
    }

    #[test]
    fn proposer_is_active() -> Result<()> {
        let state = state_with_validators(16);
        let proposer_index = get_beacon_proposer_index(&state)?;

        assert!(proposer_index < 16);

        Ok(())
    }

    #[test]
    fn proposer_requires_active_validators() {
        assert!(get_beacon_proposer_index(&state_with_validators(0)).is_err());
    }

    #[test]
    fn total_balance_is_at_least_one_increment() -> Result<()> {
        let state = state_with_validators(4);

        assert_eq!(get_total_balance(&state, [])?, 1_000_000_000);
        assert_eq!(get_total_balance(&state, [0, 1])?, 64_000_000_000);
        assert_eq!(get_total_active_balance(&state), 128_000_000_000);

        Ok(())
    }

    #[test]
    fn public_keys_are_found_by_linear_search() {
        let state = state_with_validators(4);

        assert_eq!(index_of_public_key(&state, &PublicKeyBytes::repeat_byte(2)), Some(2));
        assert_eq!(index_of_public_key(&state, &PublicKeyBytes::repeat_byte(9)), None);
    }
}
