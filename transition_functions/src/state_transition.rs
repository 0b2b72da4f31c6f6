use anyhow::{ensure, Result};
use helper_functions::{
    accessors::{get_beacon_proposer_index, public_key},
    error::SignatureKind,
    signing::SignForSingleFork as _,
    verifier::Verifier,
};
use ssz::SszHash as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{BeaconBlock, SignedBeaconBlock},
    },
    preset::Preset,
};

use crate::{
    block_processing,
    error::Error,
    slot_processing::{self, ProcessSlots},
};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum StateRootPolicy {
    Verify,
    Trust,
}

impl StateRootPolicy {
    pub fn verify<P: Preset>(self, state: &BeaconState<P>, block: &BeaconBlock) -> Result<()> {
        match self {
            Self::Verify => {
                let computed = state.hash_tree_root();
                let in_block = block.state_root;

                ensure!(
                    computed == in_block,
                    Error::StateRootMismatch { computed, in_block },
                );
            }
            Self::Trust => {}
        }

        Ok(())
    }
}

/// Advances `state` to the slot of `signed_block` and applies the block.
///
/// `state` is replaced only if every step succeeds.
pub fn state_transition<P: Preset>(
    config: &Config,
    state: &mut BeaconState<P>,
    signed_block: &SignedBeaconBlock,
    process_slots: ProcessSlots,
    state_root_policy: StateRootPolicy,
    mut verifier: impl Verifier,
) -> Result<()> {
    let block = &signed_block.message;
    let mut post_state = state.clone();

    // > Process slots (including those with no blocks) since block
    if process_slots.should_process(&post_state, block) {
        slot_processing::process_slots(config, &mut post_state, block.slot)?;
    }

    // > Verify signature
    verify_block_signature(config, &post_state, signed_block, &mut verifier)?;

    // > Process block
    block_processing::apply_block(config, &mut post_state, block, &mut verifier)?;

    verifier.finish()?;

    // > Verify state root
    state_root_policy.verify(&post_state, block)?;

    *state = post_state;

    Ok(())
}

/// Checks the proposer signature of `signed_block` against `state` at the slot of the block.
pub fn verify_block_signature<P: Preset>(
    config: &Config,
    state: &BeaconState<P>,
    signed_block: &SignedBeaconBlock,
    mut verifier: impl Verifier,
) -> Result<()> {
    let proposer_index = get_beacon_proposer_index(state)?;

    verifier.verify_singular(
        signed_block.message.signing_root(config, state),
        signed_block.signature,
        public_key(state, proposer_index)?,
        SignatureKind::Block,
    )
}

#[cfg(test)]
mod tests {
    use helper_functions::verifier::NullVerifier;
    use types::{
        phase0::{consts::FAR_FUTURE_EPOCH, containers::Validator, primitives::H256},
        preset::Minimal,
    };

    use super::*;

    fn genesis_like_state() -> BeaconState<Minimal> {
        let validator = Validator {
            effective_balance: Minimal::MAX_EFFECTIVE_BALANCE,
            activation_eligibility_epoch: 0,
            activation_epoch: 0,
            exit_epoch: FAR_FUTURE_EPOCH,
            withdrawable_epoch: FAR_FUTURE_EPOCH,
            ..Validator::default()
        };

        BeaconState {
            validators: core::iter::repeat(validator).take(16).collect(),
            balances: core::iter::repeat(Minimal::MAX_EFFECTIVE_BALANCE)
                .take(16)
                .collect(),
            ..BeaconState::default()
        }
    }

    fn unsigned_block_at_slot_1(state: &BeaconState<Minimal>) -> SignedBeaconBlock {
        let mut latest_block_header = state.latest_block_header;
        latest_block_header.state_root = state.hash_tree_root();

        BeaconBlock {
            slot: 1,
            parent_root: latest_block_header.hash_tree_root(),
            ..BeaconBlock::default()
        }
        .with_signature(bls::SignatureBytes::empty())
    }

    #[test]
    fn trusted_state_root_is_not_checked() -> Result<()> {
        let config = Config::minimal();
        let mut state = genesis_like_state();
        let signed_block = unsigned_block_at_slot_1(&state);

        state_transition(
            &config,
            &mut state,
            &signed_block,
            ProcessSlots::IfNeeded,
            StateRootPolicy::Trust,
            NullVerifier,
        )?;

        assert_eq!(state.slot, 1);
        assert_eq!(state.latest_block_header.slot, 1);

        Ok(())
    }

    #[test]
    fn wrong_state_root_leaves_state_unchanged() -> Result<()> {
        let config = Config::minimal();
        let mut state = genesis_like_state();
        let before = state.clone();
        let mut signed_block = unsigned_block_at_slot_1(&state);

        signed_block.message.state_root = H256::repeat_byte(0xff);

        let error = state_transition(
            &config,
            &mut state,
            &signed_block,
            ProcessSlots::IfNeeded,
            StateRootPolicy::Verify,
            NullVerifier,
        )
        .expect_err("state root in block is wrong");

        assert!(matches!(
            error.downcast_ref(),
            Some(Error::StateRootMismatch { .. }),
        ));
        assert_eq!(state, before);

        // The same block with the correct state root is accepted.
        let mut post_state = state.clone();

        state_transition(
            &config,
            &mut post_state,
            &signed_block,
            ProcessSlots::IfNeeded,
            StateRootPolicy::Trust,
            NullVerifier,
        )?;

        signed_block.message.state_root = post_state.hash_tree_root();

        state_transition(
            &config,
            &mut state,
            &signed_block,
            ProcessSlots::IfNeeded,
            StateRootPolicy::Verify,
            NullVerifier,
        )?;

        assert_eq!(state, post_state);

        Ok(())
    }

    #[test]
    fn empty_signature_is_rejected_by_real_verifier() {
        let config = Config::minimal();
        let mut state = genesis_like_state();
        let signed_block = unsigned_block_at_slot_1(&state);

        let result = state_transition(
            &config,
            &mut state,
            &signed_block,
            ProcessSlots::IfNeeded,
            StateRootPolicy::Trust,
            helper_functions::verifier::SingleVerifier,
        );

        assert!(result.is_err());
        assert_eq!(state.slot, 0);
    }
}
