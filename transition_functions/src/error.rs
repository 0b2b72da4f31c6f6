use thiserror::Error;
use types::{
    nonstandard::ErrorCategory,
    phase0::{
        containers::{
            Attestation, AttestationData, BeaconBlockHeader, Checkpoint, Deposit, Validator,
        },
        primitives::{Epoch, Slot, ValidatorIndex, H256},
    },
};

#[derive(Debug, Error)]
pub enum Error {
    #[error("attestation data is not slashable (data_1: {data_1:?}, data_2: {data_2:?})")]
    AttestationDataNotSlashable {
        data_1: AttestationData,
        data_2: AttestationData,
    },
    #[error(
        "attestation in slot {attestation_slot} is outside \
         inclusion range for state at slot {state_slot}"
    )]
    AttestationOutsideInclusionRange {
        state_slot: Slot,
        attestation_slot: Slot,
    },
    #[error(
        "attestation source does not match justified checkpoint \
         (in_state: {in_state:?}, in_block: {in_block:?})"
    )]
    AttestationSourceMismatch {
        in_state: Checkpoint,
        in_block: Checkpoint,
    },
    #[error("attestation votes for a checkpoint in the wrong epoch: {attestation:?}")]
    AttestationTargetsWrongEpoch { attestation: Box<Attestation> },
    #[error("block is not newer than latest block header ({block_slot} <= {block_header_slot})")]
    BlockNotNewerThanLatestBlockHeader {
        block_slot: Slot,
        block_header_slot: Slot,
    },
    #[error("deposit count is incorrect (computed: {computed}, in_block: {in_block})")]
    DepositCountMismatch { computed: u64, in_block: u64 },
    #[error("deposit proof is invalid: {deposit:?}")]
    DepositProofInvalid { deposit: Box<Deposit> },
    #[error("no attesters slashed")]
    NoAttestersSlashed,
    #[error("parent root is incorrect (computed: {computed:?}, in_block: {in_block:?})")]
    ParentRootMismatch { computed: H256, in_block: H256 },
    #[error("proposer {index} is not slashable: {proposer:?}")]
    ProposerNotSlashable {
        index: ValidatorIndex,
        proposer: Box<Validator>,
    },
    #[error("proposer {index} is slashed")]
    ProposerSlashed { index: ValidatorIndex },
    #[error("proposer slashing headers are identical: {header:?}")]
    ProposerSlashingHeadersIdentical { header: BeaconBlockHeader },
    #[error("proposer slashing slots do not match ({slot_1} != {slot_2})")]
    ProposerSlashingSlotMismatch { slot_1: Slot, slot_2: Slot },
    #[error("slot mismatch (state_slot: {state_slot}, block_slot: {block_slot})")]
    SlotMismatch { state_slot: Slot, block_slot: Slot },
    #[error("target slot ({target}) is not later than current slot ({current})")]
    SlotNotLater { current: Slot, target: Slot },
    #[error("state root is incorrect (computed: {computed:?}, in_block: {in_block:?})")]
    StateRootMismatch { computed: H256, in_block: H256 },
    #[error("validator {index} has already initiated exit (exit_epoch: {exit_epoch})")]
    ValidatorAlreadyExited {
        index: ValidatorIndex,
        exit_epoch: Epoch,
    },
    #[error(
        "validator {index} has not been active long enough \
         (activation_epoch: {activation_epoch}, current_epoch: {current_epoch})"
    )]
    ValidatorHasNotBeenActiveLongEnough {
        index: ValidatorIndex,
        activation_epoch: Epoch,
        current_epoch: Epoch,
    },
    #[error("validator {index} is not active in epoch {current_epoch}")]
    ValidatorNotActive {
        index: ValidatorIndex,
        current_epoch: Epoch,
    },
    #[error("voluntary exit is from the future (epoch: {epoch}, current_epoch: {current_epoch})")]
    VoluntaryExitIsFromTheFuture { epoch: Epoch, current_epoch: Epoch },
}

impl Error {
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::AttestationDataNotSlashable { .. }
            | Self::AttestationSourceMismatch { .. }
            | Self::AttestationTargetsWrongEpoch { .. }
            | Self::DepositProofInvalid { .. }
            | Self::ParentRootMismatch { .. }
            | Self::ProposerSlashingHeadersIdentical { .. }
            | Self::ProposerSlashingSlotMismatch { .. } => ErrorCategory::Structural,
            Self::AttestationOutsideInclusionRange { .. }
            | Self::BlockNotNewerThanLatestBlockHeader { .. }
            | Self::SlotMismatch { .. }
            | Self::SlotNotLater { .. }
            | Self::VoluntaryExitIsFromTheFuture { .. } => ErrorCategory::Sequencing,
            Self::DepositCountMismatch { .. }
            | Self::NoAttestersSlashed
            | Self::ProposerNotSlashable { .. }
            | Self::ProposerSlashed { .. }
            | Self::ValidatorAlreadyExited { .. }
            | Self::ValidatorHasNotBeenActiveLongEnough { .. }
            | Self::ValidatorNotActive { .. } => ErrorCategory::PolicyViolation,
            Self::StateRootMismatch { .. } => ErrorCategory::StateRootMismatch,
        }
    }
}

/// Classifies an error returned by any function in this crate.
///
/// Errors from collaborators that are not listed here (out of bounds indices and the like)
/// indicate malformed input and are treated as structural.
#[must_use]
pub fn categorize(error: &anyhow::Error) -> ErrorCategory {
    if let Some(error) = error.downcast_ref::<Error>() {
        return error.category();
    }

    if let Some(error) = error.downcast_ref::<helper_functions::error::Error>() {
        return error.category();
    }

    if error.downcast_ref::<bls::Error>().is_some() {
        return ErrorCategory::Signature;
    }

    ErrorCategory::Structural
}
