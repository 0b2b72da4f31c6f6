// `Controller` owns the only mutable copy of `Store`. The `on_*` methods lock it, validate the
// object against it, and publish a new snapshot only if the object was accepted. Query methods
// operate on the latest published snapshot and never wait for the lock.
//
// Mutations are copy-on-write. If a reader still holds the previous snapshot, the first
// `Arc::make_mut` in a mutation clones `Store`. Most of `Store` is made of persistent collections,
// so the clone is cheap.

use std::sync::Arc;

use anyhow::Result;
use arc_swap::{ArcSwap, Guard};
use fork_choice_store::{BlockAction, CheckpointChanges, Store, TickAction};
use log::{debug, warn};
use parking_lot::Mutex;
use ssz::SszHash as _;
use std_ext::ArcExt as _;
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{Attestation, SignedBeaconBlock},
        primitives::UnixSeconds,
    },
    preset::Preset,
};

pub struct Controller<P: Preset> {
    // The latest consistent snapshot of the store.
    store_snapshot: ArcSwap<Store<P>>,
    // Held for the entire duration of a mutation.
    store: Mutex<Arc<Store<P>>>,
}

impl<P: Preset> Controller<P> {
    #[must_use]
    pub fn new(
        config: Arc<Config>,
        anchor_block: Arc<SignedBeaconBlock>,
        anchor_state: Arc<BeaconState<P>>,
    ) -> Self {
        let store = Arc::new(Store::new(config, anchor_block, anchor_state));

        Self {
            store_snapshot: ArcSwap::new(store.clone_arc()),
            store: Mutex::new(store),
        }
    }

    pub fn on_tick(&self, time: UnixSeconds) -> Result<CheckpointChanges> {
        let mut store = self.store.lock();

        let time = match store.validate_tick(time) {
            Ok(TickAction::Accept(time)) => time,
            Ok(TickAction::Ignore) => return Ok(CheckpointChanges::default()),
            Err(error) => {
                warn!(
                    "tick rejected ({}): {error:#}",
                    fork_choice_store::categorize(&error),
                );
                return Err(error);
            }
        };

        let changes = store.make_mut().apply_tick(time);

        self.update_store_snapshot(&store);

        Ok(changes)
    }

    pub fn on_block(&self, block: Arc<SignedBeaconBlock>) -> Result<CheckpointChanges> {
        let mut store = self.store.lock();
        let block_root = block.message.hash_tree_root();
        let slot = block.message.slot;

        let valid_block = match store.validate_block(block) {
            Ok(BlockAction::Accept(valid_block)) => valid_block,
            Ok(BlockAction::Ignore) => {
                debug!("block ignored because it is already known (block_root: {block_root:?})");
                return Ok(CheckpointChanges::default());
            }
            Err(error) => {
                warn!(
                    "block rejected ({}) (block_root: {block_root:?}, slot: {slot}): {error:#}",
                    fork_choice_store::categorize(&error),
                );
                return Err(error);
            }
        };

        let changes = store.make_mut().apply_block(valid_block);

        self.update_store_snapshot(&store);

        Ok(changes)
    }

    pub fn on_attestation(&self, attestation: &Attestation) -> Result<()> {
        let mut store = self.store.lock();

        let valid_attestation = match store.validate_attestation(attestation) {
            Ok(valid_attestation) => valid_attestation,
            Err(error) => {
                warn!(
                    "attestation rejected ({}) (data: {:?}): {error:#}",
                    fork_choice_store::categorize(&error),
                    attestation.data,
                );
                return Err(error);
            }
        };

        store.make_mut().apply_attestation(valid_attestation);

        self.update_store_snapshot(&store);

        Ok(())
    }

    pub(crate) fn store_snapshot(&self) -> Guard<Arc<Store<P>>> {
        self.store_snapshot.load()
    }

    pub(crate) fn owned_store_snapshot(&self) -> Arc<Store<P>> {
        self.store_snapshot.load_full()
    }

    fn update_store_snapshot(&self, store: &Arc<Store<P>>) {
        // `ArcSwap::rcu` is not necessary here because mutations are serialized by `Self.store`.
        self.store_snapshot.store(store.clone_arc());
    }
}
