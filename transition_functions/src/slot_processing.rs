use anyhow::{ensure, Result};
use helper_functions::misc;
use log::trace;
use ssz::SszHash as _;
use types::{
    collections::VectorExt as _,
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::BeaconBlock,
        primitives::{Slot, H256},
    },
    preset::Preset,
};

use crate::{epoch_processing, error::Error};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ProcessSlots {
    Always,
    IfNeeded,
    Never,
}

impl ProcessSlots {
    #[must_use]
    pub fn should_process(self, state: &BeaconState<impl Preset>, block: &BeaconBlock) -> bool {
        match self {
            Self::Always => true,
            Self::IfNeeded => state.slot < block.slot,
            Self::Never => false,
        }
    }
}

/// Advances `state` to `slot`, running epoch processing at every epoch boundary crossed.
///
/// Advancing to the current slot does nothing.
pub fn process_slots<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    slot: Slot,
) -> Result<()> {
    ensure!(
        state.slot <= slot,
        Error::SlotNotLater {
            current: state.slot,
            target: slot,
        },
    );

    while state.slot < slot {
        process_slot(state);

        // > Process epoch on the start slot of the next epoch
        if misc::is_epoch_start::<P>(state.slot + 1) {
            trace!("processing epoch {}", misc::compute_epoch_at_slot::<P>(state.slot));
            epoch_processing::process_epoch(config, state)?;
        }

        state.slot += 1;
    }

    Ok(())
}

pub fn process_slot<P: Preset>(state: &mut BeaconState<P>) {
    // > Cache state root
    let previous_state_root = state.hash_tree_root();

    *state.state_roots.mod_index_mut(state.slot) = previous_state_root;

    // > Cache latest block header state root
    if state.latest_block_header.state_root == H256::zero() {
        state.latest_block_header.state_root = previous_state_root;
    }

    // > Cache block root
    let previous_block_root = state.latest_block_header.hash_tree_root();

    *state.block_roots.mod_index_mut(state.slot) = previous_block_root;
}
