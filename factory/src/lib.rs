//! Builders for blocks and operations signed with interop keys.
//!
//! Only meant for tests. Blocks are built by running the state transition on a copy of the
//! pre-state, so every block returned here is valid on top of the state it was built from.

pub use interop::deposit_data;

use core::ops::Range;

use anyhow::{bail, ensure, Result};
use bls::Signature;
use deposit_tree::DepositTree;
use helper_functions::{
    accessors, misc,
    signing::{RandaoEpoch, SignForSingleFork as _},
    verifier::NullVerifier,
};
use interop::MockedStart;
use itertools::Itertools as _;
use ssz::{BitList, ContiguousList, SszHash as _};
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{
            Attestation, AttestationData, AttesterSlashing, BeaconBlock, BeaconBlockBody,
            BeaconBlockHeader, Checkpoint, Deposit, DepositData, Eth1Data, IndexedAttestation,
            ProposerSlashing, SignedBeaconBlock, SignedVoluntaryExit, VoluntaryExit,
        },
        primitives::{Epoch, Eth1BlockHash, Slot, ValidatorIndex, H256},
    },
    preset::Preset,
};

/// Operations to include in a block. Anything left out is empty.
#[derive(Clone, Default, Debug)]
pub struct Operations {
    pub eth1_data: Option<Eth1Data>,
    pub proposer_slashings: Vec<ProposerSlashing>,
    pub attester_slashings: Vec<AttesterSlashing>,
    pub attestations: Vec<Attestation>,
    pub deposits: Vec<Deposit>,
    pub voluntary_exits: Vec<SignedVoluntaryExit>,
}

/// A genesis state with exactly `MIN_GENESIS_ACTIVE_VALIDATOR_COUNT` validators.
pub fn min_genesis_state<P: Preset>(config: &Config) -> Result<(BeaconState<P>, DepositTree)> {
    let mocked_start = MockedStart {
        genesis_time: config.min_genesis_time,
        validator_count: config.min_genesis_active_validator_count.try_into()?,
    };

    mocked_start.beacon_state(config)
}

// The `graffiti` parameters make otherwise identical blocks distinct.

pub fn empty_block<P: Preset>(
    config: &Config,
    pre_state: &BeaconState<P>,
    slot: Slot,
    graffiti: H256,
) -> Result<(SignedBeaconBlock, BeaconState<P>)> {
    block(config, pre_state, slot, graffiti, Operations::default())
}

/// Builds a block at `slot` signed by its proposer, along with the post-state.
pub fn block<P: Preset>(
    config: &Config,
    pre_state: &BeaconState<P>,
    slot: Slot,
    graffiti: H256,
    operations: Operations,
) -> Result<(SignedBeaconBlock, BeaconState<P>)> {
    let mut state = pre_state.clone();

    if state.slot < slot {
        transition_functions::process_slots(config, &mut state, slot)?;
    }

    let proposer_index = accessors::get_beacon_proposer_index(&state)?;
    let secret_key = interop::secret_key(proposer_index);
    let epoch = accessors::get_current_epoch(&state);

    let Operations {
        eth1_data,
        proposer_slashings,
        attester_slashings,
        attestations,
        deposits,
        voluntary_exits,
    } = operations;

    let body = BeaconBlockBody {
        randao_reveal: RandaoEpoch::from(epoch)
            .sign(config, &state, &secret_key)
            .into(),
        eth1_data: eth1_data.unwrap_or(state.eth1_data),
        graffiti,
        proposer_slashings: proposer_slashings.try_into()?,
        attester_slashings: attester_slashings.try_into()?,
        attestations: attestations.try_into()?,
        deposits: deposits.try_into()?,
        voluntary_exits: voluntary_exits.try_into()?,
    };

    let mut block = BeaconBlock {
        slot,
        parent_root: accessors::latest_block_root(&state),
        state_root: H256::zero(),
        body,
    };

    transition_functions::process_block(config, &mut state, &block, NullVerifier)?;

    block.state_root = state.hash_tree_root();

    let signature = block.sign(config, &state, &secret_key).into();

    Ok((block.with_signature(signature), state))
}

/// Builds a block in the last slot of `epoch` containing attestations from every committee in
/// the earlier slots of the epoch. Processing the epoch afterwards justifies it.
pub fn block_justifying_current_epoch<P: Preset>(
    config: &Config,
    pre_state: &BeaconState<P>,
    epoch: Epoch,
    graffiti: H256,
) -> Result<(SignedBeaconBlock, BeaconState<P>)> {
    let slots = misc::slots_in_epoch::<P>(epoch);
    let slot = slots.end - 1;

    block_with_attestations(config, pre_state, slot, slots.start..slot, graffiti)
}

/// Builds a block in the first slot of the epoch after `epoch` containing attestations from every
/// committee in `epoch`. Processing the next epoch afterwards justifies `epoch`.
pub fn block_justifying_previous_epoch<P: Preset>(
    config: &Config,
    pre_state: &BeaconState<P>,
    epoch: Epoch,
    graffiti: H256,
) -> Result<(SignedBeaconBlock, BeaconState<P>)> {
    let slots = misc::slots_in_epoch::<P>(epoch);

    block_with_attestations(config, pre_state, slots.end, slots, graffiti)
}

fn block_with_attestations<P: Preset>(
    config: &Config,
    pre_state: &BeaconState<P>,
    slot: Slot,
    attested_slots: Range<Slot>,
    graffiti: H256,
) -> Result<(SignedBeaconBlock, BeaconState<P>)> {
    let mut state_at_slot = pre_state.clone();

    if state_at_slot.slot < slot {
        transition_functions::process_slots(config, &mut state_at_slot, slot)?;
    }

    let attestations = attested_slots
        .map(|attested_slot| full_attestations(config, &state_at_slot, attested_slot))
        .flatten_ok()
        .try_collect()?;

    let operations = Operations {
        attestations,
        ..Operations::default()
    };

    block(config, pre_state, slot, graffiti, operations)
}

/// Attestations for `slot` signed by every member of every committee.
///
/// `state` must be in a later slot so that the block root at `slot` is known.
pub fn full_attestations<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    slot: Slot,
) -> Result<Vec<Attestation>> {
    accessors::beacon_committees(state, slot)?
        .zip(0..)
        .map(|(committee, committee_index)| {
            let data = attestation_data(state, slot, committee_index)?;
            let signature = aggregate_signature(config, state, data, &committee);

            Ok(Attestation {
                aggregation_bits: BitList::try_from_iter(
                    core::iter::repeat(true).take(committee.len()),
                )?,
                data,
                signature: signature.into(),
            })
        })
        .collect()
}

/// An attestation from a single validator in `epoch`, in the slot the validator is assigned to.
///
/// `state` is advanced past the assigned slot if needed.
pub fn singular_attestation<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    epoch: Epoch,
    validator_index: ValidatorIndex,
) -> Result<Attestation> {
    let mut state = state.clone();
    let (slot, committee_index, committee) = assignment(&state, epoch, validator_index)?;

    if state.slot <= slot {
        transition_functions::process_slots(config, &mut state, slot + 1)?;
    }

    let position = committee
        .iter()
        .position(|member| *member == validator_index)
        .expect("assignment returns a committee containing the validator");

    let mut aggregation_bits =
        BitList::try_from_iter(core::iter::repeat(false).take(committee.len()))?;
    aggregation_bits.set(position, true);

    let data = attestation_data(&state, slot, committee_index)?;
    let signature = data.sign(config, &state, &interop::secret_key(validator_index));

    Ok(Attestation {
        aggregation_bits,
        data,
        signature: signature.into(),
    })
}

fn assignment<P: Preset>(
    state: &BeaconState<P>,
    epoch: Epoch,
    validator_index: ValidatorIndex,
) -> Result<(Slot, u64, Vec<ValidatorIndex>)> {
    for slot in misc::slots_in_epoch::<P>(epoch) {
        for (committee, committee_index) in accessors::beacon_committees(state, slot)?.zip(0..) {
            if committee.contains(&validator_index) {
                return Ok((slot, committee_index, committee));
            }
        }
    }

    bail!("validator {validator_index} is not assigned to any committee in epoch {epoch}")
}

fn attestation_data<P: Preset>(
    state: &BeaconState<P>,
    slot: Slot,
    committee_index: u64,
) -> Result<AttestationData> {
    let epoch = misc::compute_epoch_at_slot::<P>(slot);

    let source = if epoch == accessors::get_current_epoch(state) {
        state.current_justified_checkpoint
    } else {
        state.previous_justified_checkpoint
    };

    let target = Checkpoint {
        epoch,
        root: accessors::get_block_root(state, epoch)?,
    };

    Ok(AttestationData {
        slot,
        index: committee_index,
        beacon_block_root: accessors::get_block_root_at_slot(state, slot)?,
        source,
        target,
    })
}

fn aggregate_signature<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    data: AttestationData,
    validator_indices: &[ValidatorIndex],
) -> Signature {
    Signature::aggregate(validator_indices.iter().map(|validator_index| {
        data.sign(config, state, &interop::secret_key(*validator_index))
    }))
}

/// Two distinct headers for the current slot, both signed by `validator_index`.
pub fn proposer_slashing<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    validator_index: ValidatorIndex,
) -> ProposerSlashing {
    let secret_key = interop::secret_key(validator_index);

    let [signed_header_1, signed_header_2] = [1, 2].map(|byte| {
        let header = BeaconBlockHeader {
            slot: state.slot,
            body_root: H256::repeat_byte(byte),
            ..BeaconBlockHeader::default()
        };

        header.with_signature(header.sign(config, state, &secret_key).into())
    });

    ProposerSlashing {
        proposer_index: validator_index,
        signed_header_1,
        signed_header_2,
    }
}

/// A double vote in the current epoch by `validator_indices`.
pub fn attester_slashing<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    validator_indices: &[ValidatorIndex],
) -> Result<AttesterSlashing> {
    ensure!(
        !validator_indices.is_empty(),
        "attester slashing must slash at least one validator",
    );

    let attesting_indices =
        ContiguousList::try_from_iter(validator_indices.iter().copied().sorted().dedup())?;

    let target = Checkpoint {
        epoch: accessors::get_current_epoch(state),
        root: H256::zero(),
    };

    let [attestation_1, attestation_2] = [1, 2].map(|byte| {
        let data = AttestationData {
            slot: state.slot,
            beacon_block_root: H256::repeat_byte(byte),
            source: state.current_justified_checkpoint,
            target,
            ..AttestationData::default()
        };

        IndexedAttestation {
            attesting_indices: attesting_indices.clone(),
            data,
            signature: aggregate_signature(config, state, data, &attesting_indices).into(),
        }
    });

    Ok(AttesterSlashing {
        attestation_1,
        attestation_2,
    })
}

/// Adds `data` to `deposit_tree` and returns deposits proven against the resulting root,
/// along with the `Eth1Data` a state must contain for the deposits to be processed.
pub fn deposits(
    deposit_tree: &mut DepositTree,
    data: &[DepositData],
    block_hash: Eth1BlockHash,
) -> Result<(Vec<Deposit>, Eth1Data)> {
    let start = deposit_tree.deposit_count();
    let end = start + u64::try_from(data.len())?;
    let deposits = deposit_tree.extend_and_construct_proofs(data, start..end, start..end)?;

    Ok((deposits, deposit_tree.eth1_data(block_hash)))
}

#[must_use]
pub fn voluntary_exit<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    epoch: Epoch,
    validator_index: ValidatorIndex,
) -> SignedVoluntaryExit {
    let message = VoluntaryExit {
        epoch,
        validator_index,
    };

    let signature = message
        .sign(config, state, &interop::secret_key(validator_index))
        .into();

    SignedVoluntaryExit { message, signature }
}
