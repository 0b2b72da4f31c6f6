//! Implementation of [Beacon Chain Fork Choice].
//!
//! `fork_choice_control::extra_tests` has scenarios that exercise most of this crate.
//!
//! Blocks are kept in a map keyed by their roots. Each block is stored together with its
//! post-state. A secondary index maps parent roots to the roots of their children, which is all
//! LMD GHOST needs to walk the block tree from the justified checkpoint down to the head.
//!
//! Tick, block and attestation processing is split into pairs of `validate_*` and `apply_*`
//! methods. The `validate_*` methods do not mutate [`Store`] and do all of the work that can fail,
//! including state transitions and checkpoint state computation. The `apply_*` methods cannot fail.
//! Because of the split some functions from the Fork Choice specification do not have exact
//! equivalents in the implementation. The `on_*` methods compose the two halves.
//!
//! This implementation makes use of persistent data structures, but they are not required for the
//! algorithm to work. They're only used to make snapshots cheap.
//!
//! Python `assert`s are represented by statements that return [`Err`]. Unlike the Networking
//! specification, nothing is delayed. Blocks from the future and blocks with unknown parents are
//! rejected and may be resubmitted later by the caller.
//!
//! Blocks and states are never pruned.
//!
//! [Beacon Chain Fork Choice]: https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md

pub use crate::{
    error::{categorize, Error},
    misc::{
        BlockAction, ChainLink, CheckpointChanges, LatestMessage, TickAction, ValidAttestation,
        ValidBlock,
    },
    store::Store,
};

mod error;
mod misc;
mod store;

#[cfg(test)]
mod tests;
