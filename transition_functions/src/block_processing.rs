use anyhow::{ensure, Result};
use helper_functions::{
    accessors::{
        attestation_epoch, get_beacon_proposer_index, get_current_epoch, get_indexed_attestation,
        get_randao_mix, index_of_public_key,
    },
    error::SignatureKind,
    misc::compute_epoch_at_slot,
    mutators::{balance, increase_balance, initiate_validator_exit, slash_validator},
    predicates::{
        is_active_validator, is_slashable_attestation_data, is_slashable_validator,
        is_valid_merkle_branch, validate_indexed_attestation,
    },
    signing::{RandaoEpoch, SignForAllForks as _, SignForSingleFork as _},
    verifier::Verifier,
};
use arithmetic::U64Ext as _;
use itertools::{EitherOrBoth, Itertools as _};
use log::debug;
use ssz::SszHash as _;
use types::{
    collections::VectorExt as _,
    config::Config,
    nonstandard::AttestationEpoch,
    phase0::{
        beacon_state::BeaconState,
        consts::{FAR_FUTURE_EPOCH, MAX_DEPOSITS},
        containers::{
            Attestation, AttestationData, AttesterSlashing, BeaconBlock, BeaconBlockBody,
            BeaconBlockHeader, Deposit, DepositData, DepositMessage, PendingAttestation,
            ProposerSlashing, SignedVoluntaryExit, Validator,
        },
        primitives::{ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::error::Error;

/// Applies `block` to `state`, which must already be at the slot of the block.
///
/// `state` is only modified if the block is valid. Signatures are checked with `verifier`.
pub fn process_block<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    block: &BeaconBlock,
    mut verifier: impl Verifier,
) -> Result<()> {
    let mut post_state = state.clone();

    apply_block(config, &mut post_state, block, &mut verifier)?;

    verifier.finish()?;

    *state = post_state;

    Ok(())
}

// Callers are responsible for discarding `state` if this fails.
pub(crate) fn apply_block<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    block: &BeaconBlock,
    mut verifier: impl Verifier,
) -> Result<()> {
    process_block_header(state, block)?;
    process_randao(config, state, &block.body, &mut verifier)?;
    process_eth1_data(state, &block.body)?;
    process_operations(config, state, &block.body, verifier)?;

    debug!(
        "processed block at slot {} (parent: {:?})",
        block.slot, block.parent_root,
    );

    Ok(())
}

pub fn process_block_header<P: Preset>(
    state: &mut BeaconState<P>,
    block: &BeaconBlock,
) -> Result<()> {
    // > Verify that the slots match
    ensure!(
        block.slot == state.slot,
        Error::SlotMismatch {
            state_slot: state.slot,
            block_slot: block.slot,
        },
    );

    // > Verify that the block is newer than latest block header
    //
    // Only the genesis header can be at the same slot as a state, and no block is at slot 0.
    ensure!(
        block.slot > state.latest_block_header.slot,
        Error::BlockNotNewerThanLatestBlockHeader {
            block_slot: block.slot,
            block_header_slot: state.latest_block_header.slot,
        },
    );

    // > Verify that the parent matches
    let computed = state.latest_block_header.hash_tree_root();
    let in_block = block.parent_root;

    ensure!(
        computed == in_block,
        Error::ParentRootMismatch { computed, in_block },
    );

    // > Cache current block as the new latest block
    state.latest_block_header = BeaconBlockHeader {
        slot: block.slot,
        parent_root: block.parent_root,
        // > Overwritten in the next process_slot call
        state_root: H256::zero(),
        body_root: block.body.hash_tree_root(),
    };

    // > Verify proposer is not slashed
    let index = get_beacon_proposer_index(state)?;
    let proposer = state.validators.get_at(index)?;

    ensure!(!proposer.slashed, Error::ProposerSlashed { index });

    Ok(())
}

fn process_randao<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    body: &BeaconBlockBody,
    mut verifier: impl Verifier,
) -> Result<()> {
    let epoch = get_current_epoch(state);
    let randao_reveal = body.randao_reveal;

    // > Verify RANDAO reveal
    let proposer_index = get_beacon_proposer_index(state)?;
    let public_key = &state.validators.get_at(proposer_index)?.pubkey;

    verifier.verify_singular(
        RandaoEpoch::from(epoch).signing_root(config, state),
        randao_reveal,
        public_key,
        SignatureKind::Randao,
    )?;

    // > Mix in RANDAO reveal
    let mix = get_randao_mix(state, epoch) ^ hashing::hash(randao_reveal);
    *state.randao_mixes.mod_index_mut(epoch) = mix;

    Ok(())
}

fn process_eth1_data<P: Preset>(state: &mut BeaconState<P>, body: &BeaconBlockBody) -> Result<()> {
    state.eth1_data_votes.push_back(body.eth1_data);

    let vote_count = state
        .eth1_data_votes
        .iter()
        .filter(|vote| **vote == body.eth1_data)
        .count();

    if u64::try_from(vote_count)? * 2 > P::SLOTS_PER_ETH1_VOTING_PERIOD.get() {
        state.eth1_data = body.eth1_data;
    }

    Ok(())
}

fn process_operations<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    body: &BeaconBlockBody,
    mut verifier: impl Verifier,
) -> Result<()> {
    // > Verify that outstanding deposits are processed up to the maximum number of deposits
    let computed = u64::try_from(MAX_DEPOSITS)?
        .min(state.eth1_data.deposit_count.saturating_sub(state.eth1_deposit_index));
    let in_block = u64::try_from(body.deposits.len())?;

    ensure!(
        computed == in_block,
        Error::DepositCountMismatch { computed, in_block },
    );

    for proposer_slashing in body.proposer_slashings.iter().copied() {
        process_proposer_slashing(config, state, proposer_slashing, &mut verifier)?;
    }

    for attester_slashing in &body.attester_slashings {
        process_attester_slashing(config, state, attester_slashing, &mut verifier)?;
    }

    for attestation in &body.attestations {
        process_attestation(config, state, attestation, &mut verifier)?;
    }

    for deposit in body.deposits.iter().copied() {
        process_deposit(config, state, deposit)?;
    }

    for voluntary_exit in body.voluntary_exits.iter().copied() {
        process_voluntary_exit(config, state, voluntary_exit, &mut verifier)?;
    }

    Ok(())
}

pub fn validate_proposer_slashing<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    proposer_slashing: ProposerSlashing,
    mut verifier: impl Verifier,
) -> Result<()> {
    let header_1 = proposer_slashing.signed_header_1.message;
    let header_2 = proposer_slashing.signed_header_2.message;

    // > Verify header slots match
    ensure!(
        header_1.slot == header_2.slot,
        Error::ProposerSlashingSlotMismatch {
            slot_1: header_1.slot,
            slot_2: header_2.slot,
        },
    );

    // > Verify the headers are different
    ensure!(
        header_1 != header_2,
        Error::ProposerSlashingHeadersIdentical { header: header_1 },
    );

    // > Verify the proposer is slashable
    let index = proposer_slashing.proposer_index;
    let proposer = state.validators.get_at(index)?;

    ensure!(
        is_slashable_validator(proposer, get_current_epoch(state)),
        Error::ProposerNotSlashable {
            index,
            proposer: Box::new(proposer.clone()),
        },
    );

    // > Verify signatures
    for signed_header in [
        proposer_slashing.signed_header_1,
        proposer_slashing.signed_header_2,
    ] {
        verifier.verify_singular(
            signed_header.message.signing_root(config, state),
            signed_header.signature,
            &proposer.pubkey,
            SignatureKind::Block,
        )?;
    }

    Ok(())
}

fn process_proposer_slashing<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    proposer_slashing: ProposerSlashing,
    verifier: impl Verifier,
) -> Result<()> {
    validate_proposer_slashing(config, state, proposer_slashing, verifier)?;

    slash_validator(config, state, proposer_slashing.proposer_index, None)
}

/// Returns the indices of validators that would be slashed by `attester_slashing`.
pub fn validate_attester_slashing<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    attester_slashing: &AttesterSlashing,
    mut verifier: impl Verifier,
) -> Result<Vec<ValidatorIndex>> {
    let attestation_1 = &attester_slashing.attestation_1;
    let attestation_2 = &attester_slashing.attestation_2;

    let data_1 = attestation_1.data;
    let data_2 = attestation_2.data;

    ensure!(
        is_slashable_attestation_data(data_1, data_2),
        Error::AttestationDataNotSlashable { data_1, data_2 },
    );

    validate_indexed_attestation(config, state, attestation_1, &mut verifier)?;
    validate_indexed_attestation(config, state, attestation_2, &mut verifier)?;

    let current_epoch = get_current_epoch(state);

    // Both lists were validated to be sorted and unique, so their intersection can be merged.
    let mut slashable_indices = vec![];

    for either_or_both in attestation_1
        .attesting_indices
        .iter()
        .merge_join_by(&attestation_2.attesting_indices, |left, right| left.cmp(right))
    {
        if let EitherOrBoth::Both(attester_index, _) = either_or_both {
            let attester = state.validators.get_at(*attester_index)?;

            if is_slashable_validator(attester, current_epoch) {
                slashable_indices.push(*attester_index);
            }
        }
    }

    ensure!(!slashable_indices.is_empty(), Error::NoAttestersSlashed);

    Ok(slashable_indices)
}

fn process_attester_slashing<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    attester_slashing: &AttesterSlashing,
    verifier: impl Verifier,
) -> Result<()> {
    for validator_index in validate_attester_slashing(config, state, attester_slashing, verifier)? {
        slash_validator(config, state, validator_index, None)?;
    }

    Ok(())
}

pub fn validate_attestation<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    attestation: &Attestation,
    verifier: impl Verifier,
) -> Result<AttestationEpoch> {
    let AttestationData {
        slot: attestation_slot,
        source,
        target,
        ..
    } = attestation.data;

    // Blocks cannot contain attestations from the future or epochs before the previous one.
    let attestation_epoch = attestation_epoch(state, target.epoch)?;

    ensure!(
        target.epoch == compute_epoch_at_slot::<P>(attestation_slot),
        Error::AttestationTargetsWrongEpoch {
            attestation: Box::new(attestation.clone()),
        },
    );

    let low_slot = attestation_slot + P::MIN_ATTESTATION_INCLUSION_DELAY.get();
    let high_slot = attestation_slot + P::SLOTS_PER_EPOCH.get();

    ensure!(
        (low_slot..=high_slot).contains(&state.slot),
        Error::AttestationOutsideInclusionRange {
            state_slot: state.slot,
            attestation_slot,
        },
    );

    let in_state = match attestation_epoch {
        AttestationEpoch::Previous => state.previous_justified_checkpoint,
        AttestationEpoch::Current => state.current_justified_checkpoint,
    };
    let in_block = source;

    ensure!(
        in_state == in_block,
        Error::AttestationSourceMismatch { in_state, in_block },
    );

    // The committee index and the length of `aggregation_bits` are checked here.
    let indexed_attestation = get_indexed_attestation(state, attestation)?;

    // > Verify signature
    validate_indexed_attestation(config, state, &indexed_attestation, verifier)?;

    Ok(attestation_epoch)
}

fn process_attestation<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    attestation: &Attestation,
    verifier: impl Verifier,
) -> Result<()> {
    let attestation_epoch = validate_attestation(config, state, attestation, verifier)?;

    let pending_attestation = PendingAttestation {
        aggregation_bits: attestation.aggregation_bits.clone(),
        data: attestation.data,
        inclusion_delay: state.slot - attestation.data.slot,
        proposer_index: get_beacon_proposer_index(state)?,
    };

    match attestation_epoch {
        AttestationEpoch::Previous => state
            .previous_epoch_attestations
            .push_back(pending_attestation),
        AttestationEpoch::Current => state
            .current_epoch_attestations
            .push_back(pending_attestation),
    }

    Ok(())
}

fn process_deposit<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    deposit: Deposit,
) -> Result<()> {
    // > Verify the Merkle branch
    ensure!(
        is_valid_merkle_branch(
            deposit.data.hash_tree_root(),
            deposit.proof,
            state.eth1_deposit_index,
            state.eth1_data.deposit_root,
        ),
        Error::DepositProofInvalid {
            deposit: Box::new(deposit),
        },
    );

    // > Deposits must be processed in order
    state.eth1_deposit_index += 1;

    process_deposit_data(config, state, deposit.data)
}

/// Applies a deposit whose Merkle proof has already been checked.
///
/// A deposit for a new public key with an invalid proof of possession is ignored.
pub fn process_deposit_data<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    deposit_data: DepositData,
) -> Result<()> {
    let DepositData {
        pubkey,
        withdrawal_credentials,
        amount,
        signature,
    } = deposit_data;

    if let Some(validator_index) = index_of_public_key(state, &pubkey) {
        // > Increase balance by deposit amount
        increase_balance(balance(state, validator_index)?, amount);

        debug!("validator {validator_index} topped up by {amount} Gwei");

        return Ok(());
    }

    // > Verify the deposit signature (proof of possession)
    // > which is not checked by the deposit contract
    let deposit_message = DepositMessage::from(deposit_data);

    if deposit_message.verify(config, signature, &pubkey).is_err() {
        debug!("ignoring deposit with invalid proof of possession: {deposit_data:?}");
        return Ok(());
    }

    // > Add validator and balance entries
    let effective_balance = amount
        .prev_multiple_of(P::EFFECTIVE_BALANCE_INCREMENT)
        .min(P::MAX_EFFECTIVE_BALANCE);

    state.validators.push_back(Validator {
        pubkey,
        withdrawal_credentials,
        effective_balance,
        slashed: false,
        activation_eligibility_epoch: FAR_FUTURE_EPOCH,
        activation_epoch: FAR_FUTURE_EPOCH,
        exit_epoch: FAR_FUTURE_EPOCH,
        withdrawable_epoch: FAR_FUTURE_EPOCH,
    });

    state.balances.push_back(amount);

    debug!(
        "validator {} added by deposit of {amount} Gwei",
        state.validators.len() - 1,
    );

    Ok(())
}

pub fn validate_voluntary_exit<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    signed_voluntary_exit: SignedVoluntaryExit,
    mut verifier: impl Verifier,
) -> Result<()> {
    let voluntary_exit = signed_voluntary_exit.message;
    let index = voluntary_exit.validator_index;
    let validator = state.validators.get_at(index)?;
    let current_epoch = get_current_epoch(state);

    // > Verify the validator is active
    ensure!(
        is_active_validator(validator, current_epoch),
        Error::ValidatorNotActive {
            index,
            current_epoch,
        },
    );

    // > Verify exit has not been initiated
    ensure!(
        validator.exit_epoch == FAR_FUTURE_EPOCH,
        Error::ValidatorAlreadyExited {
            index,
            exit_epoch: validator.exit_epoch,
        },
    );

    // > Exits must specify an epoch when they become valid; they are not valid before then
    ensure!(
        current_epoch >= voluntary_exit.epoch,
        Error::VoluntaryExitIsFromTheFuture {
            epoch: voluntary_exit.epoch,
            current_epoch,
        },
    );

    // > Verify the validator has been active long enough
    ensure!(
        current_epoch >= validator.activation_epoch + config.persistent_committee_period,
        Error::ValidatorHasNotBeenActiveLongEnough {
            index,
            activation_epoch: validator.activation_epoch,
            current_epoch,
        },
    );

    // > Verify signature
    verifier.verify_singular(
        voluntary_exit.signing_root(config, state),
        signed_voluntary_exit.signature,
        &validator.pubkey,
        SignatureKind::VoluntaryExit,
    )
}

fn process_voluntary_exit<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    signed_voluntary_exit: SignedVoluntaryExit,
    verifier: impl Verifier,
) -> Result<()> {
    validate_voluntary_exit(config, state, signed_voluntary_exit, verifier)?;

    // > Initiate exit
    initiate_validator_exit(config, state, signed_voluntary_exit.message.validator_index)
}

#[cfg(test)]
mod tests {
    use helper_functions::verifier::NullVerifier;
    use ssz::{ContiguousList, ReadError};
    use types::{
        phase0::{
            consts::MAX_VOLUNTARY_EXITS,
            containers::{Eth1Data, SignedBeaconBlockHeader, VoluntaryExit},
        },
        preset::Minimal,
    };

    use super::*;

    const VALIDATOR_COUNT: usize = 16;

    fn state_with_validators() -> BeaconState<Minimal> {
        let validator = Validator {
            effective_balance: Minimal::MAX_EFFECTIVE_BALANCE,
            activation_eligibility_epoch: 0,
            activation_epoch: 0,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
            ..Validator::default()
        };

        BeaconState {
            slot: 1,
            validators: core::iter::repeat(validator).take(VALIDATOR_COUNT).collect(),
            balances: core::iter::repeat(Minimal::MAX_EFFECTIVE_BALANCE)
                .take(VALIDATOR_COUNT)
                .collect(),
            ..BeaconState::default()
        }
    }

    fn block_for(state: &BeaconState<Minimal>) -> BeaconBlock {
        BeaconBlock {
            slot: state.slot,
            parent_root: state.latest_block_header.hash_tree_root(),
            ..BeaconBlock::default()
        }
    }

    #[test]
    fn block_at_wrong_slot_is_rejected_without_modifying_state() {
        let config = Config::minimal();
        let mut state = state_with_validators();
        let before = state.clone();

        let block = BeaconBlock {
            slot: 2,
            ..block_for(&state)
        };

        let error = process_block(&config, &mut state, &block, NullVerifier)
            .expect_err("block slot does not match state slot");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::SlotMismatch {
                state_slot: 1,
                block_slot: 2,
            }),
        ));
        assert_eq!(state, before);
    }

    #[test]
    fn block_with_wrong_parent_is_rejected() {
        let config = Config::minimal();
        let mut state = state_with_validators();

        let block = BeaconBlock {
            parent_root: H256::repeat_byte(1),
            ..block_for(&state)
        };

        let error = process_block(&config, &mut state, &block, NullVerifier)
            .expect_err("parent root does not match latest block header");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::ParentRootMismatch { .. }),
        ));
    }

    #[test]
    fn empty_block_updates_header_randao_and_eth1_votes() -> Result<()> {
        let config = Config::minimal();
        let mut state = state_with_validators();
        let block = block_for(&state);

        process_block(&config, &mut state, &block, NullVerifier)?;

        assert_eq!(state.latest_block_header.slot, block.slot);
        assert_eq!(state.latest_block_header.state_root, H256::zero());
        assert_eq!(
            state.latest_block_header.body_root,
            block.body.hash_tree_root(),
        );
        assert_eq!(state.eth1_data_votes.len(), 1);
        assert_ne!(get_randao_mix(&state, 0), H256::zero());

        Ok(())
    }

    #[test]
    fn eth1_data_is_adopted_only_by_strict_majority() -> Result<()> {
        let mut state = state_with_validators();
        let vote = Eth1Data {
            deposit_count: 5,
            ..Eth1Data::default()
        };
        let body = BeaconBlockBody {
            eth1_data: vote,
            ..BeaconBlockBody::default()
        };

        // Exactly half of the 16 slot voting period is not a majority.
        for _ in 0..8 {
            process_eth1_data(&mut state, &body)?;
        }

        assert_eq!(state.eth1_data, Eth1Data::default());

        process_eth1_data(&mut state, &body)?;

        assert_eq!(state.eth1_data, vote);

        Ok(())
    }

    #[test]
    fn voluntary_exits_past_the_maximum_do_not_fit_in_a_block() {
        let voluntary_exit = SignedVoluntaryExit {
            message: VoluntaryExit {
                epoch: 0,
                validator_index: 0,
            },
            signature: bls::SignatureBytes::empty(),
        };

        let error = ContiguousList::<_, MAX_VOLUNTARY_EXITS>::try_from(vec![
            voluntary_exit;
            MAX_VOLUNTARY_EXITS + 1
        ])
        .expect_err("list is longer than MAX_VOLUNTARY_EXITS");

        assert_eq!(
            error,
            ReadError::ListTooLong {
                maximum: 16,
                actual: 17,
            },
        );
    }

    #[test]
    fn block_with_maximum_voluntary_exits_is_hashed_and_rejected_by_policy() -> Result<()> {
        let config = Config::minimal();
        let mut state = state_with_validators();
        let before = state.clone();

        let voluntary_exit = SignedVoluntaryExit {
            message: VoluntaryExit {
                epoch: 0,
                validator_index: 0,
            },
            signature: bls::SignatureBytes::empty(),
        };

        let mut block = block_for(&state);
        block.body.voluntary_exits = ContiguousList::full(voluntary_exit);

        assert_ne!(block.hash_tree_root(), block_for(&state).hash_tree_root());

        let error = process_block(&config, &mut state, &block, NullVerifier)
            .expect_err("validator 0 has not been active long enough to exit");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::ValidatorHasNotBeenActiveLongEnough { index: 0, .. }),
        ));
        assert_eq!(state, before);

        Ok(())
    }

    #[test]
    fn missing_expected_deposit_is_rejected() {
        let config = Config::minimal();
        let mut state = state_with_validators();

        state.eth1_data.deposit_count = 17;
        state.eth1_deposit_index = 16;

        let block = block_for(&state);

        let error = process_block(&config, &mut state, &block, NullVerifier)
            .expect_err("block is missing a deposit");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::DepositCountMismatch {
                computed: 1,
                in_block: 0,
            }),
        ));
    }

    #[test]
    fn proposer_slashing_with_identical_headers_is_rejected() {
        let config = Config::minimal();
        let state = state_with_validators();
        let signed_header = SignedBeaconBlockHeader::default();

        let proposer_slashing = ProposerSlashing {
            proposer_index: 3,
            signed_header_1: signed_header,
            signed_header_2: signed_header,
        };

        let error = validate_proposer_slashing(&config, &state, proposer_slashing, NullVerifier)
            .expect_err("headers are identical");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::ProposerSlashingHeadersIdentical { .. }),
        ));
    }

    #[test]
    fn voluntary_exit_before_persistent_committee_period_is_rejected() {
        let config = Config::minimal();
        let state = state_with_validators();

        let voluntary_exit = SignedVoluntaryExit {
            message: VoluntaryExit {
                epoch: 0,
                validator_index: 2,
            },
            signature: bls::SignatureBytes::empty(),
        };

        let error = validate_voluntary_exit(&config, &state, voluntary_exit, NullVerifier)
            .expect_err("validator has not been active long enough");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::ValidatorHasNotBeenActiveLongEnough { index: 2, .. }),
        ));
    }

    #[test]
    fn deposit_with_invalid_proof_of_possession_is_ignored() -> Result<()> {
        let config = Config::minimal();
        let mut state = state_with_validators();

        let deposit_data = DepositData {
            pubkey: bls::PublicKeyBytes::repeat_byte(1),
            amount: Minimal::MAX_EFFECTIVE_BALANCE,
            ..DepositData::default()
        };

        process_deposit_data(&config, &mut state, deposit_data)?;

        assert_eq!(state.validators.len(), VALIDATOR_COUNT);
        assert_eq!(state.balances.len(), VALIDATOR_COUNT);

        Ok(())
    }
}
