use anyhow::{ensure, Result};
use bls::PublicKey;
use itertools::Itertools as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::FAR_FUTURE_EPOCH,
        containers::{AttestationData, IndexedAttestation, Validator},
        primitives::{Epoch, H256},
    },
    preset::Preset,
};

use crate::{
    accessors,
    error::{Error, SignatureKind},
    signing::SignForSingleFork as _,
    verifier::Verifier,
};

// > Check if ``validator`` is active.
#[inline]
#[must_use]
pub const fn is_active_validator(validator: &Validator, epoch: Epoch) -> bool {
    validator.activation_epoch <= epoch && epoch < validator.exit_epoch
}

// > Check if ``validator`` is eligible to be placed into the activation queue.
#[must_use]
pub const fn is_eligible_for_activation_queue<P: Preset>(validator: &Validator) -> bool {
    validator.activation_eligibility_epoch == FAR_FUTURE_EPOCH
        && validator.effective_balance == P::MAX_EFFECTIVE_BALANCE
}

// > Check if ``validator`` is eligible for activation.
#[must_use]
pub const fn is_eligible_for_activation<P: Preset>(
    state: &BeaconState<P>,
    validator: &Validator,
) -> bool {
    // > Placement in queue is finalized
    validator.activation_eligibility_epoch <= state.finalized_checkpoint.epoch
        // > Has not yet been activated
        && validator.activation_epoch == FAR_FUTURE_EPOCH
}

#[inline]
#[must_use]
pub const fn is_eligible_for_penalties(validator: &Validator, previous_epoch: Epoch) -> bool {
    is_active_validator(validator, previous_epoch)
        || (validator.slashed && previous_epoch + 1 < validator.withdrawable_epoch)
}

// > Check if ``validator`` is slashable.
#[inline]
#[must_use]
pub const fn is_slashable_validator(validator: &Validator, epoch: Epoch) -> bool {
    !validator.slashed
        && validator.activation_epoch <= epoch
        && epoch < validator.withdrawable_epoch
}

// > Check if ``data_1`` and ``data_2`` are slashable according to Casper FFG rules.
#[inline]
#[must_use]
pub fn is_slashable_attestation_data(data_1: AttestationData, data_2: AttestationData) -> bool {
    // > Double vote
    (data_1 != data_2 && data_1.target.epoch == data_2.target.epoch)
        // > Surround vote
        || (data_1.source.epoch < data_2.source.epoch && data_2.target.epoch < data_1.target.epoch)
}

#[must_use]
pub fn is_in_inactivity_leak<P: Preset>(state: &BeaconState<P>) -> bool {
    accessors::get_finality_delay(state) > P::MIN_EPOCHS_TO_INACTIVITY_PENALTY
}

// > Check if ``indexed_attestation`` is not empty, has sorted and unique indices and has a valid
// > aggregate signature.
pub fn validate_indexed_attestation<P: Preset, V: Verifier>(
    config: &Config,
    state: &BeaconState<P>,
    indexed_attestation: &IndexedAttestation,
    mut verifier: V,
) -> Result<()> {
    let indices = &indexed_attestation.attesting_indices;

    ensure!(!indices.is_empty(), Error::AttestationHasNoAttestingIndices);

    // > Verify indices are sorted and unique
    ensure!(
        indices.iter().tuple_windows().all(|(a, b)| a < b),
        Error::AttestingIndicesNotSortedAndUnique,
    );

    // Indices still have to refer to existing validators.
    let public_keys = indices
        .iter()
        .map(|validator_index| accessors::public_key(state, *validator_index))
        .collect::<Result<Vec<_>>>()?;

    if V::IS_NULL {
        return Ok(());
    }

    // > Verify aggregate signature
    let public_keys = public_keys
        .into_iter()
        .map(|public_key_bytes| PublicKey::try_from(*public_key_bytes))
        .collect::<Result<Vec<_>, _>>()?;

    verifier.verify_aggregate(
        indexed_attestation.data.signing_root(config, state),
        indexed_attestation.signature,
        &public_keys,
        SignatureKind::Attestation,
    )
}

/// [`is_valid_merkle_branch`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/beacon-chain.md#is_valid_merkle_branch)
#[must_use]
pub fn is_valid_merkle_branch(
    leaf: H256,
    branch: impl IntoIterator<Item = H256>,
    index: u64,
    root: H256,
) -> bool {
    let mut hash = leaf;

    for (height, node) in branch.into_iter().enumerate() {
        if (index >> height) & 1 == 1 {
            hash = hashing::hash_256_256(node, hash);
        } else {
            hash = hashing::hash_256_256(hash, node);
        }
    }

    hash == root
}

#[cfg(test)]
mod tests {
    use duplicate::duplicate_item;
    use ssz::MerkleTree;
    use types::{phase0::containers::Checkpoint, preset::Minimal};

    use crate::verifier::NullVerifier;

    use super::*;

    fn validator(activation_epoch: Epoch, exit_epoch: Epoch) -> Validator {
        Validator {
            activation_epoch,
            exit_epoch,
            withdrawable_epoch: exit_epoch.saturating_add(256),
            ..Validator::default()
        }
    }

    fn data(source: Epoch, target: Epoch, root: u8) -> AttestationData {
        AttestationData {
            beacon_block_root: H256::repeat_byte(root),
            source: Checkpoint {
                epoch: source,
                root: H256::zero(),
            },
            target: Checkpoint {
                epoch: target,
                root: H256::zero(),
            },
            ..AttestationData::default()
        }
    }

    #[test]
    fn validator_is_active_from_activation_until_exit() {
        let validator = validator(2, 5);

        assert!(!is_active_validator(&validator, 1));
        assert!(is_active_validator(&validator, 2));
        assert!(is_active_validator(&validator, 4));
        assert!(!is_active_validator(&validator, 5));
    }

    #[test]
    fn slashed_validator_is_not_slashable_again() {
        let mut validator = validator(0, FAR_FUTURE_EPOCH);

        assert!(is_slashable_validator(&validator, 3));

        validator.slashed = true;

        assert!(!is_slashable_validator(&validator, 3));
    }

    #[test]
    fn double_and_surround_votes_are_slashable() {
        assert!(is_slashable_attestation_data(data(0, 3, 1), data(0, 3, 2)));
        assert!(is_slashable_attestation_data(data(0, 5, 1), data(1, 4, 1)));
        assert!(!is_slashable_attestation_data(data(1, 4, 1), data(0, 5, 1)));
        assert!(!is_slashable_attestation_data(data(0, 3, 1), data(0, 3, 1)));
        assert!(!is_slashable_attestation_data(data(0, 3, 1), data(0, 4, 2)));
    }

    #[test]
    fn activation_queue_requires_full_effective_balance() {
        let mut validator = Validator {
            activation_eligibility_epoch: FAR_FUTURE_EPOCH,
            effective_balance: Minimal::MAX_EFFECTIVE_BALANCE,
            ..Validator::default()
        };

        assert!(is_eligible_for_activation_queue::<Minimal>(&validator));

        validator.effective_balance -= Minimal::EFFECTIVE_BALANCE_INCREMENT.get();

        assert!(!is_eligible_for_activation_queue::<Minimal>(&validator));
    }

    #[duplicate_item(
        test_name                          indices;
        [empty_indices_are_rejected]       [vec![]];
        [unsorted_indices_are_rejected]    [vec![1, 0]];
        [duplicate_indices_are_rejected]   [vec![0, 0]];
        [unknown_validators_are_rejected]  [vec![0, 7]];
    )]
    #[test]
    fn test_name() {
        let state = BeaconState::<Minimal> {
            validators: [validator(0, FAR_FUTURE_EPOCH), validator(0, FAR_FUTURE_EPOCH)]
                .into_iter()
                .collect(),
            ..BeaconState::default()
        };

        let indexed_attestation = IndexedAttestation {
            attesting_indices: indices.try_into().expect("test indices fit in a list"),
            ..IndexedAttestation::default()
        };

        validate_indexed_attestation(&Config::minimal(), &state, &indexed_attestation, NullVerifier)
            .expect_err("indexed attestation should be rejected");
    }

    #[test]
    fn merkle_proofs_from_tree_are_valid() {
        let mut tree = MerkleTree::new(4);

        for byte in 1..=6 {
            tree.push(H256::repeat_byte(byte));
        }

        let root = tree.root();

        assert!(is_valid_merkle_branch(H256::repeat_byte(4), tree.proof(3), 3, root));
        assert!(!is_valid_merkle_branch(H256::repeat_byte(4), tree.proof(3), 2, root));
        assert!(!is_valid_merkle_branch(H256::repeat_byte(5), tree.proof(3), 3, root));
    }
}
