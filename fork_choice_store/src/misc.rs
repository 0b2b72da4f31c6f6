use core::fmt::{Formatter, Result as FmtResult};
use std::sync::Arc;

use derivative::Derivative;
use helper_functions::misc;
use types::{
    phase0::{
        beacon_state::BeaconState,
        containers::{AttestationData, Checkpoint, SignedBeaconBlock},
        primitives::{Epoch, Slot, UnixSeconds, ValidatorIndex, H256},
    },
    preset::Preset,
};

/// A block together with its post-state.
#[derive(Clone, Derivative)]
#[derivative(Debug(bound = ""))]
pub struct ChainLink<P: Preset> {
    pub block_root: H256,
    #[derivative(Debug(format_with = "fmt_block_concisely"))]
    pub block: Arc<SignedBeaconBlock>,
    #[derivative(Debug(format_with = "fmt_as_wildcard"))]
    pub state: Arc<BeaconState<P>>,
}

impl<P: Preset> ChainLink<P> {
    #[must_use]
    pub fn slot(&self) -> Slot {
        self.block.message.slot
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        misc::compute_epoch_at_slot::<P>(self.slot())
    }

    #[must_use]
    pub fn parent_root(&self) -> H256 {
        self.block.message.parent_root
    }
}

/// [`LatestMessage`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#latestmessage)
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct LatestMessage {
    pub epoch: Epoch,
    // This is the LMD GHOST vote root and it corresponds to `AttestationData.beacon_block_root`.
    pub beacon_block_root: H256,
}

pub enum TickAction {
    Accept(UnixSeconds),
    // The tick does not move time forward.
    Ignore,
}

pub enum BlockAction<P: Preset> {
    Accept(ValidBlock<P>),
    // The block is already in the store.
    Ignore,
}

pub struct ValidBlock<P: Preset> {
    pub chain_link: ChainLink<P>,
    // Present if the block justifies a checkpoint whose state is not cached yet.
    pub justified_checkpoint_state: Option<(Checkpoint, Arc<BeaconState<P>>)>,
}

pub struct ValidAttestation<P: Preset> {
    pub data: AttestationData,
    pub attesting_indices: Vec<ValidatorIndex>,
    // Present if the target checkpoint state had to be computed during validation.
    pub target_state: Option<Arc<BeaconState<P>>>,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct CheckpointChanges {
    pub justified_checkpoint_updated: bool,
    pub finalized_checkpoint_updated: bool,
}

impl CheckpointChanges {
    #[must_use]
    pub const fn any(self) -> bool {
        self.justified_checkpoint_updated || self.finalized_checkpoint_updated
    }
}

fn fmt_block_concisely(block: &SignedBeaconBlock, formatter: &mut Formatter) -> FmtResult {
    formatter
        .debug_struct("SignedBeaconBlock")
        .field("slot", &block.message.slot)
        .field("parent_root", &block.message.parent_root)
        .field("state_root", &block.message.state_root)
        .finish_non_exhaustive()
}

fn fmt_as_wildcard<T>(_: T, formatter: &mut Formatter) -> FmtResult {
    formatter.write_str("_")
}
