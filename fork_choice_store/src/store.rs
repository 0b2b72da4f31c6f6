use std::{collections::HashMap as StdHashMap, sync::Arc};

use anyhow::{bail, ensure, Result};
use helper_functions::{accessors, misc, predicates, verifier::SingleVerifier};
use im::{HashMap, OrdSet};
use log::{debug, info};
use ssz::SszHash as _;
use std_ext::ArcExt as _;
use transition_functions::{ProcessSlots, StateRootPolicy};
use types::{
    collections::VectorExt as _,
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        consts::GENESIS_EPOCH,
        containers::{Attestation, AttestationData, Checkpoint, SignedBeaconBlock},
        primitives::{Epoch, Gwei, Slot, UnixSeconds, ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::{
    error::Error,
    misc::{
        BlockAction, ChainLink, CheckpointChanges, LatestMessage, TickAction, ValidAttestation,
        ValidBlock,
    },
};

/// [`Store`] from the Fork Choice specification.
///
/// Blocks are never pruned. Orphaned forks stay in the store but can never become the head once
/// they fall behind the justified checkpoint.
///
/// [`Store`]: https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#store
#[derive(Clone)]
pub struct Store<P: Preset> {
    config: Arc<Config>,
    time: UnixSeconds,
    genesis_time: UnixSeconds,
    justified_checkpoint: Checkpoint,
    best_justified_checkpoint: Checkpoint,
    finalized_checkpoint: Checkpoint,
    anchor_root: H256,
    blocks: HashMap<H256, ChainLink<P>>,
    // Derived from `Store.blocks`. Roots are ordered to make iteration deterministic.
    children: HashMap<H256, OrdSet<H256>>,
    // Effectively a cache. Every entry can be recomputed from `Store.blocks`.
    // The state for `Store.justified_checkpoint` and `Store.best_justified_checkpoint` is always
    // present because checkpoints are only adopted after their states are inserted.
    checkpoint_states: HashMap<Checkpoint, Arc<BeaconState<P>>>,
    latest_messages: HashMap<ValidatorIndex, LatestMessage>,
}

impl<P: Preset> Store<P> {
    /// [`get_forkchoice_store`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#get_forkchoice_store)
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        anchor_block: Arc<SignedBeaconBlock>,
        anchor_state: Arc<BeaconState<P>>,
    ) -> Self {
        let block_root = anchor_block.message.hash_tree_root();
        let state_root = anchor_state.hash_tree_root();

        assert!(misc::is_epoch_start::<P>(anchor_block.message.slot));
        assert_eq!(anchor_block.message.state_root, state_root);
        assert_eq!(accessors::latest_block_root(&anchor_state), block_root);

        // If `anchor_state` is the genesis state, this checkpoint is not equal to any checkpoint
        // in it. All checkpoints in a genesis state have their `root` set to 0x00…00.
        let checkpoint = Checkpoint {
            epoch: accessors::get_current_epoch(&anchor_state),
            root: block_root,
        };

        let genesis_time = anchor_state.genesis_time;
        let time = misc::compute_time_at_slot::<P>(&config, &anchor_state, anchor_state.slot);

        let anchor = ChainLink {
            block_root,
            block: anchor_block,
            state: anchor_state.clone_arc(),
        };

        Self {
            config,
            time,
            genesis_time,
            justified_checkpoint: checkpoint,
            best_justified_checkpoint: checkpoint,
            finalized_checkpoint: checkpoint,
            anchor_root: block_root,
            blocks: HashMap::unit(block_root, anchor),
            children: HashMap::new(),
            checkpoint_states: HashMap::unit(checkpoint, anchor_state),
            latest_messages: HashMap::new(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn time(&self) -> UnixSeconds {
        self.time
    }

    #[must_use]
    pub const fn genesis_time(&self) -> UnixSeconds {
        self.genesis_time
    }

    /// [`get_current_slot`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#get_current_slot)
    #[must_use]
    pub fn current_slot(&self) -> Slot {
        self.time.saturating_sub(self.genesis_time) / self.config.seconds_per_slot
    }

    #[must_use]
    pub fn current_epoch(&self) -> Epoch {
        Self::epoch_at_slot(self.current_slot())
    }

    #[must_use]
    pub fn previous_epoch(&self) -> Epoch {
        self.current_epoch().saturating_sub(1).max(GENESIS_EPOCH)
    }

    #[must_use]
    pub const fn justified_checkpoint(&self) -> Checkpoint {
        self.justified_checkpoint
    }

    #[must_use]
    pub const fn best_justified_checkpoint(&self) -> Checkpoint {
        self.best_justified_checkpoint
    }

    #[must_use]
    pub const fn finalized_checkpoint(&self) -> Checkpoint {
        self.finalized_checkpoint
    }

    #[must_use]
    pub const fn finalized_slot(&self) -> Slot {
        Self::start_of_epoch(self.finalized_checkpoint.epoch)
    }

    #[must_use]
    pub const fn anchor_root(&self) -> H256 {
        self.anchor_root
    }

    #[must_use]
    pub fn contains_block(&self, block_root: H256) -> bool {
        self.blocks.contains_key(&block_root)
    }

    #[must_use]
    pub fn chain_link(&self, block_root: H256) -> Option<&ChainLink<P>> {
        self.blocks.get(&block_root)
    }

    #[must_use]
    pub fn block(&self, block_root: H256) -> Option<&Arc<SignedBeaconBlock>> {
        self.chain_link(block_root)
            .map(|chain_link| &chain_link.block)
    }

    #[must_use]
    pub fn state_by_block_root(&self, block_root: H256) -> Option<Arc<BeaconState<P>>> {
        self.chain_link(block_root)
            .map(|chain_link| chain_link.state.clone_arc())
    }

    #[must_use]
    pub fn contains_checkpoint_state(&self, checkpoint: Checkpoint) -> bool {
        self.checkpoint_states.contains_key(&checkpoint)
    }

    #[must_use]
    pub fn checkpoint_state(&self, checkpoint: Checkpoint) -> Option<&Arc<BeaconState<P>>> {
        self.checkpoint_states.get(&checkpoint)
    }

    #[must_use]
    pub fn latest_message(&self, validator_index: ValidatorIndex) -> Option<LatestMessage> {
        self.latest_messages.get(&validator_index).copied()
    }

    /// Roots of blocks whose parent is `block_root`, in ascending order.
    pub fn children(&self, block_root: H256) -> impl Iterator<Item = H256> + '_ {
        self.children
            .get(&block_root)
            .into_iter()
            .flat_map(|children| children.iter().copied())
    }

    /// [`get_ancestor`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#get_ancestor)
    ///
    /// Returns the root of the latest block at or before `ancestor_slot` in the chain ending with
    /// `descendant_root`. Returns [`None`] if that block is older than the anchor or
    /// `descendant_root` is not in the store.
    #[must_use]
    pub fn ancestor(&self, descendant_root: H256, ancestor_slot: Slot) -> Option<H256> {
        let mut block_root = descendant_root;

        loop {
            let chain_link = self.chain_link(block_root)?;

            if chain_link.slot() <= ancestor_slot {
                return Some(block_root);
            }

            block_root = chain_link.parent_root();
        }
    }

    /// [`get_head`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#get_head)
    ///
    /// Ties are broken in favor of the block with the greatest root.
    #[must_use]
    pub fn head(&self) -> H256 {
        let justified_slot = Self::start_of_epoch(self.justified_checkpoint.epoch);
        let attesting_balances = self.latest_attesting_balances(justified_slot);

        // > Execute the LMD-GHOST fork choice
        let mut head = self.justified_checkpoint.root;

        loop {
            let best_child = self
                .children(head)
                .filter(|child| {
                    self.chain_link(*child)
                        .is_some_and(|chain_link| chain_link.slot() > justified_slot)
                })
                .max_by_key(|child| {
                    let balance = attesting_balances.get(child).copied().unwrap_or_default();
                    (balance, *child)
                });

            match best_child {
                Some(child) => head = child,
                None => return head,
            }
        }
    }

    pub fn validate_tick(&self, time: UnixSeconds) -> Result<TickAction> {
        ensure!(
            self.time <= time,
            Error::TimeWentBackwards {
                current: self.time,
                new: time,
            },
        );

        if time == self.time {
            return Ok(TickAction::Ignore);
        }

        Ok(TickAction::Accept(time))
    }

    /// Applies a tick previously validated using [`Self::validate_tick`].
    ///
    /// [`on_tick`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#on_tick)
    pub fn apply_tick(&mut self, time: UnixSeconds) -> CheckpointChanges {
        let old_slot = self.current_slot();

        // > update store time
        self.time = time;

        let new_slot = self.current_slot();
        let mut changes = CheckpointChanges::default();

        debug!("tick applied (time: {time}, slot: {new_slot})");

        // > Not a new epoch, return
        if Self::epoch_at_slot(new_slot) <= Self::epoch_at_slot(old_slot) {
            return changes;
        }

        // Promoting a checkpoint late in the epoch could cause an unsafe reorganization.
        if misc::slots_since_epoch_start::<P>(new_slot) >= P::SAFE_SLOTS_TO_UPDATE_JUSTIFIED {
            return changes;
        }

        // > Update store.justified_checkpoint if a better checkpoint is known
        if self.best_justified_checkpoint.epoch > self.justified_checkpoint.epoch {
            self.justified_checkpoint = self.best_justified_checkpoint;
            changes.justified_checkpoint_updated = true;

            info!(
                "justified checkpoint updated on epoch start: {:?}",
                self.justified_checkpoint,
            );
        }

        changes
    }

    pub fn on_tick(&mut self, time: UnixSeconds) -> Result<CheckpointChanges> {
        match self.validate_tick(time)? {
            TickAction::Accept(time) => Ok(self.apply_tick(time)),
            TickAction::Ignore => Ok(CheckpointChanges::default()),
        }
    }

    /// Runs the validations and the state transition from [`on_block`] without mutating the store.
    ///
    /// [`on_block`]: https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#on_block
    pub fn validate_block(&self, block: Arc<SignedBeaconBlock>) -> Result<BlockAction<P>> {
        let block_root = block.message.hash_tree_root();
        let block_slot = block.message.slot;
        let parent_root = block.message.parent_root;

        // Duplicates are not an error. Processing one has no effect.
        if self.contains_block(block_root) {
            return Ok(BlockAction::Ignore);
        }

        // > Parent block must be known
        let Some(parent) = self.chain_link(parent_root) else {
            bail!(Error::UnknownParent {
                block_root,
                parent_root,
            });
        };

        // > Blocks cannot be in the future.
        let current_slot = self.current_slot();

        ensure!(
            block_slot <= current_slot,
            Error::BlockFromFuture {
                block_root,
                block_slot,
                current_slot,
            },
        );

        // > Check that block is later than the finalized epoch slot
        let finalized_slot = self.finalized_slot();

        ensure!(
            finalized_slot < block_slot,
            Error::BlockNotLaterThanFinalized {
                block_root,
                block_slot,
                finalized_slot,
            },
        );

        // > Check block is a descendant of the finalized block at the checkpoint finalized slot
        ensure!(
            self.ancestor(parent_root, finalized_slot) == Some(self.finalized_checkpoint.root),
            Error::BlockNotDescendantOfFinalized {
                block_root,
                finalized_checkpoint: self.finalized_checkpoint,
            },
        );

        // > Check the block is valid and compute the post-state
        let mut state = parent.state.clone_arc();

        transition_functions::state_transition(
            &self.config,
            state.make_mut(),
            &block,
            ProcessSlots::IfNeeded,
            StateRootPolicy::Verify,
            SingleVerifier,
        )?;

        let justified_checkpoint = state.current_justified_checkpoint;

        let may_adopt_justified = justified_checkpoint.epoch > self.justified_checkpoint.epoch
            || state.finalized_checkpoint.epoch > self.finalized_checkpoint.epoch;

        let justified_checkpoint_state = if may_adopt_justified
            && !self.contains_checkpoint_state(justified_checkpoint)
        {
            self.chain_link(justified_checkpoint.root)
                .map(|base| self.derive_checkpoint_state(justified_checkpoint, base))
                .transpose()?
                .map(|checkpoint_state| (justified_checkpoint, checkpoint_state))
        } else {
            None
        };

        let chain_link = ChainLink {
            block_root,
            block,
            state,
        };

        // > Add new block to the store
        //
        // > Add new state for this block to the store
        Ok(BlockAction::Accept(ValidBlock {
            chain_link,
            justified_checkpoint_state,
        }))
    }

    /// Applies a block previously validated using [`Self::validate_block`].
    ///
    /// Roughly corresponds to [`on_block`] from the Fork Choice specification.
    ///
    /// [`on_block`]: https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#on_block
    pub fn apply_block(&mut self, valid_block: ValidBlock<P>) -> CheckpointChanges {
        let ValidBlock {
            chain_link,
            justified_checkpoint_state,
        } = valid_block;

        let block_root = chain_link.block_root;
        let parent_root = chain_link.parent_root();
        let slot = chain_link.slot();
        let justified_checkpoint = chain_link.state.current_justified_checkpoint;
        let finalized_checkpoint = chain_link.state.finalized_checkpoint;

        if let Some((checkpoint, state)) = justified_checkpoint_state {
            self.checkpoint_states.insert(checkpoint, state);
        }

        self.blocks.insert(block_root, chain_link);

        self.children
            .entry(parent_root)
            .or_insert_with(OrdSet::new)
            .insert(block_root);

        debug!("block accepted (block_root: {block_root:?}, slot: {slot})");

        // > Update justified checkpoint
        //
        // > Update finalized checkpoint
        self.update_checkpoints(justified_checkpoint, finalized_checkpoint)
    }

    pub fn on_block(&mut self, block: Arc<SignedBeaconBlock>) -> Result<CheckpointChanges> {
        match self.validate_block(block)? {
            BlockAction::Accept(valid_block) => Ok(self.apply_block(valid_block)),
            BlockAction::Ignore => Ok(CheckpointChanges::default()),
        }
    }

    /// Runs the validations from [`on_attestation`] without mutating the store.
    ///
    /// The target checkpoint state is computed here if it is not cached yet.
    /// [`Self::apply_attestation`] inserts it into the cache.
    ///
    /// [`on_attestation`]: https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#on_attestation
    pub fn validate_attestation(&self, attestation: &Attestation) -> Result<ValidAttestation<P>> {
        let data = attestation.data;

        let AttestationData {
            slot,
            beacon_block_root,
            target,
            ..
        } = data;

        // > Check that the epoch number and slot number are matching
        ensure!(
            target.epoch == Self::epoch_at_slot(slot),
            Error::AttestationTargetsWrongEpoch { data },
        );

        // > Attestations must be from the current or previous epoch
        let current_epoch = self.current_epoch();

        ensure!(
            target.epoch <= current_epoch,
            Error::AttestationFromFutureEpoch {
                data,
                current_epoch,
            },
        );

        ensure!(
            self.previous_epoch() <= target.epoch,
            Error::AttestationTargetsStaleEpoch {
                data,
                current_epoch,
            },
        );

        // > Attestation target must be for a known block
        let Some(target_chain_link) = self.chain_link(target.root) else {
            bail!(Error::AttestationForUnknownTarget { data });
        };

        // > Attestations must be for a known block
        let Some(ghost_vote_chain_link) = self.chain_link(beacon_block_root) else {
            bail!(Error::AttestationForUnknownBlock { data });
        };

        // > Attestations must not be for blocks in the future
        let block_slot = ghost_vote_chain_link.slot();

        ensure!(
            block_slot <= slot,
            Error::AttestationForFutureBlock { data, block_slot },
        );

        // > LMD vote must be consistent with FFG vote target
        ensure!(
            self.ancestor(beacon_block_root, Self::start_of_epoch(target.epoch))
                == Some(target.root),
            Error::LmdGhostInconsistentWithFfgTarget { data },
        );

        // > Attestations can only affect the fork choice of subsequent slots
        let current_slot = self.current_slot();

        ensure!(
            slot < current_slot,
            Error::AttestationNotFromPastSlot { data, current_slot },
        );

        // > Store target checkpoint state if not yet seen
        let (checkpoint_state, target_state) = match self.checkpoint_state(target) {
            Some(checkpoint_state) => (checkpoint_state.clone_arc(), None),
            None => {
                let checkpoint_state = self.derive_checkpoint_state(target, target_chain_link)?;
                (checkpoint_state.clone_arc(), Some(checkpoint_state))
            }
        };

        // > Get state at the `target` to fully validate attestation
        let indexed_attestation =
            accessors::get_indexed_attestation(&checkpoint_state, attestation)?;

        predicates::validate_indexed_attestation(
            &self.config,
            &checkpoint_state,
            &indexed_attestation,
            SingleVerifier,
        )?;

        Ok(ValidAttestation {
            data,
            attesting_indices: indexed_attestation.attesting_indices.into(),
            target_state,
        })
    }

    /// Applies an attestation previously validated using [`Self::validate_attestation`].
    ///
    /// Latest messages only move forward. A vote for an epoch that is not later than the
    /// previously recorded one has no effect.
    pub fn apply_attestation(&mut self, valid_attestation: ValidAttestation<P>) {
        let ValidAttestation {
            data,
            attesting_indices,
            target_state,
        } = valid_attestation;

        if let Some(state) = target_state {
            self.checkpoint_states.insert(data.target, state);
        }

        let latest_message = LatestMessage {
            epoch: data.target.epoch,
            beacon_block_root: data.beacon_block_root,
        };

        // > Update latest messages for attesting indices
        for validator_index in attesting_indices {
            if self
                .latest_messages
                .get(&validator_index)
                .is_some_and(|old| latest_message.epoch <= old.epoch)
            {
                continue;
            }

            self.latest_messages.insert(validator_index, latest_message);
        }

        debug!("attestation accepted: {data:?}");
    }

    pub fn on_attestation(&mut self, attestation: &Attestation) -> Result<()> {
        let valid_attestation = self.validate_attestation(attestation)?;
        self.apply_attestation(valid_attestation);
        Ok(())
    }

    /// [`should_update_justified_checkpoint`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#should_update_justified_checkpoint)
    ///
    /// > To address the bouncing attack, only update conflicting justified
    /// > checkpoints in the fork choice if in the early slots of the epoch.
    /// > Otherwise, delay incorporation of new justified checkpoint until next epoch boundary.
    #[must_use]
    pub fn should_update_justified_checkpoint(&self, new_justified_checkpoint: Checkpoint) -> bool {
        if misc::slots_since_epoch_start::<P>(self.current_slot())
            < P::SAFE_SLOTS_TO_UPDATE_JUSTIFIED
        {
            return true;
        }

        let justified_slot = Self::start_of_epoch(self.justified_checkpoint.epoch);

        self.ancestor(new_justified_checkpoint.root, justified_slot)
            == Some(self.justified_checkpoint.root)
    }

    fn update_checkpoints(
        &mut self,
        justified_checkpoint: Checkpoint,
        finalized_checkpoint: Checkpoint,
    ) -> CheckpointChanges {
        let old_justified_checkpoint = self.justified_checkpoint;
        let old_finalized_checkpoint = self.finalized_checkpoint;

        // A checkpoint without a cached state cannot be used to weigh votes.
        let justified_state_known = self.contains_checkpoint_state(justified_checkpoint);

        // > Update justified checkpoint
        if justified_state_known && justified_checkpoint.epoch > self.justified_checkpoint.epoch {
            if justified_checkpoint.epoch > self.best_justified_checkpoint.epoch {
                self.best_justified_checkpoint = justified_checkpoint;
            }

            if self.should_update_justified_checkpoint(justified_checkpoint) {
                self.justified_checkpoint = justified_checkpoint;
            }
        }

        // > Update finalized checkpoint
        if finalized_checkpoint.epoch > self.finalized_checkpoint.epoch {
            self.finalized_checkpoint = finalized_checkpoint;

            // > Potentially update justified if different from store
            if justified_state_known && self.justified_checkpoint != justified_checkpoint {
                let finalized_slot = self.finalized_slot();

                // > Update justified if new justified is later than store justified
                // > or if store justified is not in chain with finalized checkpoint
                if justified_checkpoint.epoch > self.justified_checkpoint.epoch
                    || self.ancestor(self.justified_checkpoint.root, finalized_slot)
                        != Some(self.finalized_checkpoint.root)
                {
                    self.justified_checkpoint = justified_checkpoint;
                }
            }
        }

        let changes = CheckpointChanges {
            justified_checkpoint_updated: old_justified_checkpoint != self.justified_checkpoint,
            finalized_checkpoint_updated: old_finalized_checkpoint != self.finalized_checkpoint,
        };

        if changes.justified_checkpoint_updated {
            info!("justified checkpoint updated: {:?}", self.justified_checkpoint);
        }

        if changes.finalized_checkpoint_updated {
            info!("finalized checkpoint updated: {:?}", self.finalized_checkpoint);
        }

        changes
    }

    /// [`store_target_checkpoint_state`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#store_target_checkpoint_state)
    fn derive_checkpoint_state(
        &self,
        checkpoint: Checkpoint,
        base: &ChainLink<P>,
    ) -> Result<Arc<BeaconState<P>>> {
        let mut state = base.state.clone_arc();
        let slot = Self::start_of_epoch(checkpoint.epoch);

        if state.slot < slot {
            transition_functions::process_slots(&self.config, state.make_mut(), slot)?;
        }

        Ok(state)
    }

    fn justified_state(&self) -> &BeaconState<P> {
        self.checkpoint_states
            .get(&self.justified_checkpoint)
            .expect(
                "Store::update_checkpoints only adopts checkpoints with cached states \
                 and Store::new caches the state of the anchor checkpoint",
            )
    }

    /// [`get_latest_attesting_balance`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/fork-choice.md#get_latest_attesting_balance)
    /// for every block later than `justified_slot`, computed in one pass over latest messages.
    fn latest_attesting_balances(&self, justified_slot: Slot) -> StdHashMap<H256, Gwei> {
        let state = self.justified_state();
        let epoch = accessors::get_current_epoch(state);
        let mut balances = StdHashMap::<_, Gwei>::new();

        for (validator_index, latest_message) in &self.latest_messages {
            let Ok(validator) = state.validators.get_at(*validator_index) else {
                continue;
            };

            if !predicates::is_active_validator(validator, epoch) {
                continue;
            }

            let mut block_root = latest_message.beacon_block_root;

            while let Some(chain_link) = self.chain_link(block_root) {
                if chain_link.slot() <= justified_slot {
                    break;
                }

                *balances.entry(block_root).or_default() += validator.effective_balance;

                block_root = chain_link.parent_root();
            }
        }

        balances
    }

    const fn start_of_epoch(epoch: Epoch) -> Slot {
        misc::compute_start_slot_at_epoch::<P>(epoch)
    }

    const fn epoch_at_slot(slot: Slot) -> Epoch {
        misc::compute_epoch_at_slot::<P>(slot)
    }
}
