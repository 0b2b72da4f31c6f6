use thiserror::Error;
use types::{
    nonstandard::ErrorCategory,
    phase0::{
        containers::{AttestationData, Checkpoint},
        primitives::{Epoch, Slot, UnixSeconds, H256},
    },
};

#[derive(Debug, Error)]
pub enum Error {
    #[error(
        "attestation votes for a block from the future \
         (data: {data:?}, block_slot: {block_slot})"
    )]
    AttestationForFutureBlock { data: AttestationData, block_slot: Slot },
    #[error("attestation votes for an unknown block: {data:?}")]
    AttestationForUnknownBlock { data: AttestationData },
    #[error("attestation votes for an unknown target: {data:?}")]
    AttestationForUnknownTarget { data: AttestationData },
    #[error(
        "attestation targets a future epoch \
         (data: {data:?}, current_epoch: {current_epoch})"
    )]
    AttestationFromFutureEpoch {
        data: AttestationData,
        current_epoch: Epoch,
    },
    #[error(
        "attestation is not from a past slot \
         (data: {data:?}, current_slot: {current_slot})"
    )]
    AttestationNotFromPastSlot {
        data: AttestationData,
        current_slot: Slot,
    },
    #[error(
        "attestation targets an epoch that is too old \
         (data: {data:?}, current_epoch: {current_epoch})"
    )]
    AttestationTargetsStaleEpoch {
        data: AttestationData,
        current_epoch: Epoch,
    },
    #[error("attestation votes for a checkpoint in the wrong epoch: {data:?}")]
    AttestationTargetsWrongEpoch { data: AttestationData },
    #[error(
        "block is from the future \
         (block_root: {block_root:?}, block_slot: {block_slot}, current_slot: {current_slot})"
    )]
    BlockFromFuture {
        block_root: H256,
        block_slot: Slot,
        current_slot: Slot,
    },
    #[error(
        "block does not descend from the finalized block \
         (block_root: {block_root:?}, finalized_checkpoint: {finalized_checkpoint:?})"
    )]
    BlockNotDescendantOfFinalized {
        block_root: H256,
        finalized_checkpoint: Checkpoint,
    },
    #[error(
        "block is not later than the finalized epoch start \
         (block_root: {block_root:?}, block_slot: {block_slot}, \
         finalized_slot: {finalized_slot})"
    )]
    BlockNotLaterThanFinalized {
        block_root: H256,
        block_slot: Slot,
        finalized_slot: Slot,
    },
    #[error("LMD GHOST vote is inconsistent with FFG vote target: {data:?}")]
    LmdGhostInconsistentWithFfgTarget { data: AttestationData },
    #[error("time went backwards (current: {current}, new: {new})")]
    TimeWentBackwards {
        current: UnixSeconds,
        new: UnixSeconds,
    },
    #[error(
        "parent of block is unknown \
         (block_root: {block_root:?}, parent_root: {parent_root:?})"
    )]
    UnknownParent { block_root: H256, parent_root: H256 },
}

impl Error {
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::AttestationTargetsWrongEpoch { .. }
            | Self::LmdGhostInconsistentWithFfgTarget { .. } => ErrorCategory::Structural,
            Self::AttestationForFutureBlock { .. }
            | Self::AttestationFromFutureEpoch { .. }
            | Self::AttestationNotFromPastSlot { .. }
            | Self::AttestationTargetsStaleEpoch { .. }
            | Self::BlockFromFuture { .. }
            | Self::BlockNotLaterThanFinalized { .. }
            | Self::TimeWentBackwards { .. } => ErrorCategory::Sequencing,
            Self::AttestationForUnknownBlock { .. }
            | Self::AttestationForUnknownTarget { .. }
            | Self::BlockNotDescendantOfFinalized { .. }
            | Self::UnknownParent { .. } => ErrorCategory::UnknownAncestor,
        }
    }
}

/// Categorizes errors raised by the store or by the state transition it runs.
#[must_use]
pub fn categorize(error: &anyhow::Error) -> ErrorCategory {
    match error.downcast_ref::<Error>() {
        Some(error) => error.category(),
        None => transition_functions::categorize(error),
    }
}
