//! The phase 0 state transition.
//!
//! Functions that modify a [`BeaconState`] either succeed or leave it as it was.
//! The only exception is [`process_slots`], which may stop partway if epoch processing fails.
//! That can only happen with a malformed state.
//!
//! [`BeaconState`]: types::phase0::beacon_state::BeaconState

pub use crate::{
    block_processing::{
        process_block, process_block_header, process_deposit_data, validate_attestation,
        validate_attester_slashing, validate_proposer_slashing, validate_voluntary_exit,
    },
    epoch_processing::process_epoch,
    error::{categorize, Error},
    slot_processing::{process_slot, process_slots, ProcessSlots},
    state_transition::{state_transition, verify_block_signature, StateRootPolicy},
};

mod block_processing;
mod epoch_intermediates;
mod epoch_processing;
mod error;
mod slot_processing;
mod state_transition;
