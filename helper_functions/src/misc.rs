use core::{num::NonZeroU64, ops::Range};

use anyhow::Result;
use bls::PublicKeyBytes;
use ssz::SszHash;
use tap::{Pipe as _, TryConv as _};
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::{BLS_WITHDRAWAL_PREFIX, GENESIS_SLOT},
        containers::{ForkData, SigningData},
        primitives::{
            Domain, DomainType, Epoch, Slot, UnixSeconds, ValidatorIndex, Version, H256,
        },
    },
    preset::Preset,
};

use crate::error::Error;

#[must_use]
pub const fn compute_epoch_at_slot<P: Preset>(slot: Slot) -> Epoch {
    slot / P::SLOTS_PER_EPOCH.get()
}

#[must_use]
pub const fn compute_start_slot_at_epoch<P: Preset>(epoch: Epoch) -> Slot {
    epoch.saturating_mul(P::SLOTS_PER_EPOCH.get())
}

#[must_use]
pub const fn is_epoch_start<P: Preset>(slot: Slot) -> bool {
    slots_since_epoch_start::<P>(slot) == 0
}

#[must_use]
pub const fn slots_since_epoch_start<P: Preset>(slot: Slot) -> u64 {
    slot % P::SLOTS_PER_EPOCH.get()
}

#[must_use]
pub const fn slots_in_epoch<P: Preset>(epoch: Epoch) -> Range<Slot> {
    compute_start_slot_at_epoch::<P>(epoch)..compute_start_slot_at_epoch::<P>(epoch + 1)
}

#[must_use]
pub const fn compute_activation_exit_epoch<P: Preset>(epoch: Epoch) -> Epoch {
    epoch + 1 + P::MAX_SEED_LOOKAHEAD
}

/// Computes the time at which `slot` starts.
#[must_use]
pub const fn compute_time_at_slot<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    slot: Slot,
) -> UnixSeconds {
    state.genesis_time + (slot - GENESIS_SLOT) * config.seconds_per_slot.get()
}

#[must_use]
pub fn bls_withdrawal_credentials(public_key: PublicKeyBytes) -> H256 {
    let mut withdrawal_credentials = hashing::hash(public_key);
    withdrawal_credentials[..BLS_WITHDRAWAL_PREFIX.len()].copy_from_slice(BLS_WITHDRAWAL_PREFIX);
    withdrawal_credentials
}

// > Return the 32-byte fork data root for the ``current_version`` and ``genesis_validators_root``.
// > This is used primarily in signature domains to avoid collisions across forks/chains.
fn compute_fork_data_root(current_version: Version, genesis_validators_root: H256) -> H256 {
    ForkData {
        current_version,
        genesis_validators_root,
    }
    .hash_tree_root()
}

#[must_use]
pub fn compute_domain(
    config: &Config,
    domain_type: DomainType,
    fork_version: Option<Version>,
    genesis_validators_root: Option<H256>,
) -> Domain {
    let fork_version = fork_version.unwrap_or(config.genesis_fork_version);
    let genesis_validators_root = genesis_validators_root.unwrap_or_else(H256::zero);
    let fork_data_root = compute_fork_data_root(fork_version, genesis_validators_root);

    let mut domain = Domain::zero();
    domain[..DomainType::len_bytes()].copy_from_slice(domain_type.as_bytes());
    domain[DomainType::len_bytes()..].copy_from_slice(&fork_data_root[..28]);
    domain
}

pub fn compute_signing_root(object: &(impl SszHash + ?Sized), domain: Domain) -> H256 {
    SigningData {
        object_root: object.hash_tree_root(),
        domain,
    }
    .hash_tree_root()
}

#[must_use]
pub fn compute_shuffled_index<P: Preset>(
    index: ValidatorIndex,
    index_count: NonZeroU64,
    seed: H256,
) -> ValidatorIndex {
    shuffling::shuffle_single::<P>(index, index_count, seed)
}

#[must_use]
pub fn committee_count_from_active_validator_count<P: Preset>(active_validator_count: u64) -> u64 {
    (active_validator_count / P::SLOTS_PER_EPOCH / P::TARGET_COMMITTEE_SIZE)
        .clamp(1, P::MAX_COMMITTEES_PER_SLOT.get())
}

/// [`compute_committee`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/beacon-chain.md#compute_committee)
///
/// Shuffles only the positions that end up in the committee.
/// Use [`shuffle_active_indices`] followed by [`committee_range`] to compute many committees at
/// once.
pub fn compute_committee<P: Preset>(
    indices: &[ValidatorIndex],
    seed: H256,
    index: u64,
    count: NonZeroU64,
) -> Result<Vec<ValidatorIndex>> {
    let Some(total) = indices.len().try_conv::<u64>()?.pipe(NonZeroU64::new) else {
        return Ok(vec![]);
    };

    committee_range(total.get(), index, count)
        .map(|position| {
            let shuffled = compute_shuffled_index::<P>(position, total, seed)
                .try_conv::<usize>()
                .expect("shuffled position is less than indices.len()");

            indices[shuffled]
        })
        .collect::<Vec<_>>()
        .pipe(Ok)
}

/// Positions in a shuffled list of `total` indices that belong to the committee at `index`.
#[must_use]
pub const fn committee_range(total: u64, index: u64, count: NonZeroU64) -> Range<u64> {
    let start = total * index / count.get();
    let end = total * (index + 1) / count.get();
    start..end
}

/// Applies the full shuffle to `indices` so that committees are contiguous ranges of the result.
pub fn shuffle_active_indices<P: Preset>(
    mut indices: Vec<ValidatorIndex>,
    seed: H256,
) -> Result<Vec<ValidatorIndex>> {
    shuffling::shuffle_slice::<P, _>(&mut indices, seed)?;
    Ok(indices)
}

pub fn compute_proposer_index<P: Preset>(
    state: &BeaconState<P>,
    indices: &[ValidatorIndex],
    seed: H256,
) -> Result<ValidatorIndex> {
    let total = indices
        .len()
        .try_conv::<u64>()?
        .pipe(NonZeroU64::new)
        .ok_or(Error::NoActiveValidators)?;

    let max_random_byte = u64::from(u8::MAX);

    (0..u64::MAX / H256::len_bytes() as u64)
        .flat_map(|quotient| {
            hashing::hash_256_64(seed, quotient)
                .to_fixed_bytes()
                .into_iter()
                .map(u64::from)
        })
        .zip(0..)
        .find_map(|(random_byte, attempt)| {
            let shuffled_index_of_index = compute_shuffled_index::<P>(attempt % total, total, seed)
                .try_conv::<usize>()
                .expect(
                    "shuffled_index_of_index fits in usize because it is less than indices.len()",
                );

            let candidate_index = indices[shuffled_index_of_index];

            let effective_balance = state
                .validators
                .get(candidate_index.try_conv::<usize>().ok()?)?
                .effective_balance;

            (effective_balance * max_random_byte >= P::MAX_EFFECTIVE_BALANCE * random_byte)
                .then_some(candidate_index)
        })
        .ok_or(Error::FailedToSelectProposer)
        .map_err(Into::into)
}
