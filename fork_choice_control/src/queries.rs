use std::sync::Arc;

use fork_choice_store::{ChainLink, LatestMessage, Store};
use types::{
    phase0::{
        beacon_state::BeaconState,
        containers::{Checkpoint, SignedBeaconBlock},
        primitives::{Epoch, Slot, UnixSeconds, ValidatorIndex, H256},
    },
    preset::Preset,
};

use crate::controller::Controller;

// All of these operate on the latest published snapshot and never block on mutations.
impl<P: Preset> Controller<P> {
    /// Returns a snapshot of the store that stays consistent even while mutations happen.
    #[must_use]
    pub fn snapshot(&self) -> Arc<Store<P>> {
        self.owned_store_snapshot()
    }

    #[must_use]
    pub fn time(&self) -> UnixSeconds {
        self.store_snapshot().time()
    }

    #[must_use]
    pub fn genesis_time(&self) -> UnixSeconds {
        self.store_snapshot().genesis_time()
    }

    #[must_use]
    pub fn slot(&self) -> Slot {
        self.store_snapshot().current_slot()
    }

    #[must_use]
    pub fn epoch(&self) -> Epoch {
        self.store_snapshot().current_epoch()
    }

    #[must_use]
    pub fn justified_checkpoint(&self) -> Checkpoint {
        self.store_snapshot().justified_checkpoint()
    }

    #[must_use]
    pub fn best_justified_checkpoint(&self) -> Checkpoint {
        self.store_snapshot().best_justified_checkpoint()
    }

    #[must_use]
    pub fn finalized_checkpoint(&self) -> Checkpoint {
        self.store_snapshot().finalized_checkpoint()
    }

    #[must_use]
    pub fn head_root(&self) -> H256 {
        self.store_snapshot().head()
    }

    #[must_use]
    pub fn head(&self) -> ChainLink<P> {
        let store = self.store_snapshot();
        let head_root = store.head();

        store
            .chain_link(head_root)
            .cloned()
            .expect("Store::head only returns roots of blocks in the store")
    }

    #[must_use]
    pub fn head_state(&self) -> Arc<BeaconState<P>> {
        self.head().state
    }

    #[must_use]
    pub fn contains_block(&self, block_root: H256) -> bool {
        self.store_snapshot().contains_block(block_root)
    }

    #[must_use]
    pub fn block_by_root(&self, block_root: H256) -> Option<Arc<SignedBeaconBlock>> {
        self.store_snapshot().block(block_root).cloned()
    }

    #[must_use]
    pub fn state_by_block_root(&self, block_root: H256) -> Option<Arc<BeaconState<P>>> {
        self.store_snapshot().state_by_block_root(block_root)
    }

    #[must_use]
    pub fn checkpoint_state(&self, checkpoint: Checkpoint) -> Option<Arc<BeaconState<P>>> {
        self.store_snapshot().checkpoint_state(checkpoint).cloned()
    }

    #[must_use]
    pub fn latest_message(&self, validator_index: ValidatorIndex) -> Option<LatestMessage> {
        self.store_snapshot().latest_message(validator_index)
    }
}
