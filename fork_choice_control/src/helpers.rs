use std::sync::Arc;

use anyhow::{Error as AnyhowError, Result};
use fork_choice_store::{CheckpointChanges, LatestMessage};
use helper_functions::misc;
use ssz::SszHash as _;
use std_ext::ArcExt as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{Attestation, Checkpoint, SignedBeaconBlock},
        primitives::{Epoch, Slot, UnixSeconds, ValidatorIndex, H256},
    },
    preset::{Minimal, Preset},
};

use crate::controller::Controller;

pub struct Context<P: Preset> {
    config: Arc<Config>,
    controller: Controller<P>,
    genesis_block: Arc<SignedBeaconBlock>,
    genesis_state: Arc<BeaconState<P>>,
}

impl<P: Preset> Context<P> {
    fn with_config(config: Config) -> Result<Self> {
        let config = Arc::new(config);
        let (genesis_state, _) = factory::min_genesis_state::<P>(&config)?;
        let genesis_block = Arc::new(genesis::beacon_block(&genesis_state));
        let genesis_state = Arc::new(genesis_state);

        let controller = Controller::new(
            config.clone_arc(),
            genesis_block.clone_arc(),
            genesis_state.clone_arc(),
        );

        Ok(Self {
            config,
            controller,
            genesis_block,
            genesis_state,
        })
    }

    pub const fn controller(&self) -> &Controller<P> {
        &self.controller
    }

    #[must_use]
    pub fn genesis(&self) -> (Arc<SignedBeaconBlock>, Arc<BeaconState<P>>) {
        (self.genesis_block.clone_arc(), self.genesis_state.clone_arc())
    }

    // The `graffiti` parameters are needed for two reasons:
    // - To make otherwise identical blocks distinct.
    // - To break ties the desired way.

    #[must_use]
    pub fn empty_block(
        &self,
        pre_state: &Arc<BeaconState<P>>,
        slot: Slot,
        graffiti: H256,
    ) -> (Arc<SignedBeaconBlock>, Arc<BeaconState<P>>) {
        factory::empty_block(&self.config, pre_state, slot, graffiti)
            .map(|(block, state)| (Arc::new(block), Arc::new(state)))
            .expect("block should be constructed successfully")
    }

    #[must_use]
    pub fn block_justifying_previous_epoch(
        &self,
        pre_state: &Arc<BeaconState<P>>,
        epoch: Epoch,
        graffiti: H256,
    ) -> (Arc<SignedBeaconBlock>, Arc<BeaconState<P>>) {
        factory::block_justifying_previous_epoch(&self.config, pre_state, epoch, graffiti)
            .map(|(block, state)| (Arc::new(block), Arc::new(state)))
            .expect("block should be constructed successfully")
    }

    #[must_use]
    pub fn block_justifying_current_epoch(
        &self,
        pre_state: &Arc<BeaconState<P>>,
        epoch: Epoch,
        graffiti: H256,
    ) -> (Arc<SignedBeaconBlock>, Arc<BeaconState<P>>) {
        factory::block_justifying_current_epoch(&self.config, pre_state, epoch, graffiti)
            .map(|(block, state)| (Arc::new(block), Arc::new(state)))
            .expect("block should be constructed successfully")
    }

    /// Attestations from every committee at `slot` voting for the block that is at `slot` in the
    /// history of `state`. `state` is advanced past `slot` if needed.
    #[must_use]
    pub fn attestations(&self, state: &Arc<BeaconState<P>>, slot: Slot) -> Vec<Attestation> {
        let mut state = state.clone_arc();

        if state.slot <= slot {
            transition_functions::process_slots(&self.config, state.make_mut(), slot + 1)
                .expect("empty slots should be processed successfully");
        }

        factory::full_attestations(&self.config, &state, slot)
            .expect("attestations should be constructed successfully")
    }

    #[must_use]
    pub fn singular_attestation(
        &self,
        state: &Arc<BeaconState<P>>,
        epoch: Epoch,
        validator_index: ValidatorIndex,
    ) -> Attestation {
        factory::singular_attestation(&self.config, state, epoch, validator_index)
            .expect("attestation should be constructed successfully")
    }

    pub fn on_slot(&self, slot: Slot) -> CheckpointChanges {
        self.controller
            .on_tick(self.start_of_slot(slot))
            .expect("time should only move forward in tests")
    }

    pub fn on_acceptable_block(&self, block: &Arc<SignedBeaconBlock>) -> CheckpointChanges {
        let changes = self
            .controller
            .on_block(block.clone_arc())
            .expect("block should be accepted");

        assert!(self.controller.contains_block(block.message.hash_tree_root()));

        changes
    }

    pub fn on_invalid_block(&self, block: &Arc<SignedBeaconBlock>) -> AnyhowError {
        let error = self
            .controller
            .on_block(block.clone_arc())
            .expect_err("block should be rejected");

        assert!(!self.controller.contains_block(block.message.hash_tree_root()));

        error
    }

    pub fn on_acceptable_attestation(&self, attestation: &Attestation) {
        self.controller
            .on_attestation(attestation)
            .expect("attestation should be accepted");
    }

    pub fn on_acceptable_attestations(&self, attestations: impl IntoIterator<Item = Attestation>) {
        for attestation in attestations {
            self.on_acceptable_attestation(&attestation);
        }
    }

    pub fn on_invalid_attestation(&self, attestation: &Attestation) -> AnyhowError {
        self.controller
            .on_attestation(attestation)
            .expect_err("attestation should be rejected")
    }

    pub fn assert_head(&self, expected_head: &SignedBeaconBlock) {
        let head = self.controller.head();

        assert_eq!(head.block_root, expected_head.message.hash_tree_root());
        assert_eq!(head.slot(), expected_head.message.slot);
    }

    pub fn assert_justified_checkpoint(&self, expected_checkpoint: Checkpoint) {
        assert_eq!(
            self.controller.justified_checkpoint(),
            expected_checkpoint,
        );
    }

    pub fn assert_finalized_checkpoint(&self, expected_checkpoint: Checkpoint) {
        assert_eq!(
            self.controller.finalized_checkpoint(),
            expected_checkpoint,
        );
    }

    pub fn assert_latest_message(
        &self,
        validator_index: ValidatorIndex,
        expected_message: Option<LatestMessage>,
    ) {
        assert_eq!(
            self.controller.latest_message(validator_index),
            expected_message,
        );
    }

    fn start_of_slot(&self, slot: Slot) -> UnixSeconds {
        self.controller.genesis_time() + slot * self.config.seconds_per_slot.get()
    }
}

impl Context<Minimal> {
    pub fn minimal() -> Self {
        Self::with_config(Config::minimal()).expect("minimal configuration is valid")
    }
}

pub const fn epoch_at_slot(slot: Slot) -> Epoch {
    misc::compute_epoch_at_slot::<Minimal>(slot)
}

pub const fn start_of_epoch(epoch: Epoch) -> Slot {
    misc::compute_start_slot_at_epoch::<Minimal>(epoch)
}

pub fn checkpoint(epoch: Epoch, block: &SignedBeaconBlock) -> Checkpoint {
    Checkpoint {
        epoch,
        root: block.message.hash_tree_root(),
    }
}
