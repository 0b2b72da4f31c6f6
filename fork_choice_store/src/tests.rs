use std::sync::Arc;

use anyhow::Result;
use ssz::{BitList, ContiguousList, SszHash as _};
use std_ext::ArcExt as _;
use types::{
    config::Config,
    nonstandard::ErrorCategory,
    phase0::{
        beacon_state::BeaconState,
        consts::MAX_VALIDATORS_PER_COMMITTEE,
        containers::{
            Attestation, AttesterSlashing, IndexedAttestation, SignedBeaconBlock,
            SignedVoluntaryExit, VoluntaryExit,
        },
        primitives::{Slot, UnixSeconds, ValidatorIndex, H256},
    },
    preset::Minimal,
};

use crate::{categorize, Error, Store};

fn genesis(config: &Arc<Config>) -> Result<(Store<Minimal>, BeaconState<Minimal>)> {
    let (genesis_state, _) = factory::min_genesis_state::<Minimal>(config)?;
    let genesis_block = genesis::beacon_block(&genesis_state);

    let store = Store::new(
        config.clone_arc(),
        Arc::new(genesis_block),
        Arc::new(genesis_state.clone()),
    );

    Ok((store, genesis_state))
}

fn start_of_slot(store: &Store<Minimal>, slot: Slot) -> UnixSeconds {
    store.genesis_time() + slot * store.config().seconds_per_slot.get()
}

fn block_at(
    config: &Config,
    state: &BeaconState<Minimal>,
    slot: Slot,
    graffiti: u8,
) -> Result<(Arc<SignedBeaconBlock>, BeaconState<Minimal>)> {
    let (block, post_state) =
        factory::empty_block(config, state, slot, H256::repeat_byte(graffiti))?;

    Ok((Arc::new(block), post_state))
}

#[test]
fn store_starts_at_anchor() -> Result<()> {
    let config = Arc::new(Config::minimal());
    let (store, genesis_state) = genesis(&config)?;
    let anchor_root = store.anchor_root();

    assert_eq!(store.time(), genesis_state.genesis_time);
    assert_eq!(store.current_slot(), 0);
    assert_eq!(store.justified_checkpoint().root, anchor_root);
    assert_eq!(store.finalized_checkpoint().root, anchor_root);
    assert_eq!(store.best_justified_checkpoint(), store.justified_checkpoint());
    assert_eq!(store.head(), anchor_root);
    assert!(store.contains_checkpoint_state(store.justified_checkpoint()));

    Ok(())
}

#[test]
fn tick_backwards_is_rejected_and_equal_tick_is_ignored() -> Result<()> {
    let config = Arc::new(Config::minimal());
    let (mut store, _) = genesis(&config)?;
    let time = start_of_slot(&store, 3);

    store.on_tick(time)?;
    store.on_tick(time)?;

    assert_eq!(store.time(), time);

    let error = store
        .on_tick(time - 1)
        .expect_err("time cannot go backwards");

    assert!(matches!(
        error.downcast_ref(),
        Some(Error::TimeWentBackwards { .. }),
    ));
    assert_eq!(categorize(&error), ErrorCategory::Sequencing);
    assert_eq!(store.time(), time);

    Ok(())
}

#[test]
fn block_from_future_is_rejected() -> Result<()> {
    let config = Arc::new(Config::minimal());
    let (mut store, genesis_state) = genesis(&config)?;
    let (block, _) = block_at(&config, &genesis_state, 2, 0)?;

    store.on_tick(start_of_slot(&store, 1))?;

    let error = store
        .on_block(block.clone_arc())
        .expect_err("block is in slot 2 while the store is in slot 1");

    assert!(matches!(
        error.downcast_ref(),
        Some(Error::BlockFromFuture { .. }),
    ));
    assert!(!store.contains_block(block.message.hash_tree_root()));

    store.on_tick(start_of_slot(&store, 2))?;
    store.on_block(block)?;

    Ok(())
}

#[test]
fn block_with_unknown_parent_is_rejected() -> Result<()> {
    let config = Arc::new(Config::minimal());
    let (mut store, genesis_state) = genesis(&config)?;
    let (_, state_1) = block_at(&config, &genesis_state, 1, 0)?;
    let (block_2, _) = block_at(&config, &state_1, 2, 0)?;

    store.on_tick(start_of_slot(&store, 2))?;

    let error = store
        .on_block(block_2)
        .expect_err("parent of block was never added");

    assert_eq!(categorize(&error), ErrorCategory::UnknownAncestor);
    assert_eq!(store.children(store.anchor_root()).count(), 0);

    Ok(())
}

#[test]
fn duplicate_block_has_no_effect() -> Result<()> {
    let config = Arc::new(Config::minimal());
    let (mut store, genesis_state) = genesis(&config)?;
    let (block, _) = block_at(&config, &genesis_state, 1, 0)?;
    let block_root = block.message.hash_tree_root();

    store.on_tick(start_of_slot(&store, 1))?;
    store.on_block(block.clone_arc())?;
    store.on_block(block)?;

    assert_eq!(
        store.children(store.anchor_root()).collect::<Vec<_>>(),
        [block_root],
    );
    assert_eq!(store.head(), block_root);

    Ok(())
}

#[test]
fn ancestor_carries_roots_through_empty_slots() -> Result<()> {
    let config = Arc::new(Config::minimal());
    let (mut store, genesis_state) = genesis(&config)?;
    let (block_1, state_1) = block_at(&config, &genesis_state, 1, 0)?;
    let (block_4, _) = block_at(&config, &state_1, 4, 0)?;
    let root_1 = block_1.message.hash_tree_root();
    let root_4 = block_4.message.hash_tree_root();

    store.on_tick(start_of_slot(&store, 4))?;
    store.on_block(block_1)?;
    store.on_block(block_4)?;

    assert_eq!(store.ancestor(root_4, 5), Some(root_4));
    assert_eq!(store.ancestor(root_4, 4), Some(root_4));
    assert_eq!(store.ancestor(root_4, 3), Some(root_1));
    assert_eq!(store.ancestor(root_4, 0), Some(store.anchor_root()));
    assert_eq!(store.ancestor(H256::repeat_byte(1), 0), None);

    Ok(())
}

#[test]
fn head_without_votes_is_block_with_greatest_root() -> Result<()> {
    let config = Arc::new(Config::minimal());
    let (mut store, genesis_state) = genesis(&config)?;
    let (block_a, _) = block_at(&config, &genesis_state, 1, 1)?;
    let (block_b, _) = block_at(&config, &genesis_state, 1, 2)?;
    let root_a = block_a.message.hash_tree_root();
    let root_b = block_b.message.hash_tree_root();

    store.on_tick(start_of_slot(&store, 1))?;
    store.on_block(block_a)?;
    store.on_block(block_b)?;

    assert_eq!(store.head(), root_a.max(root_b));

    Ok(())
}

#[test]
fn head_follows_votes() -> Result<()> {
    let config = Arc::new(Config::minimal());
    let (mut store, genesis_state) = genesis(&config)?;
    let (block_a, state_a) = block_at(&config, &genesis_state, 1, 1)?;
    let (block_b, state_b) = block_at(&config, &genesis_state, 1, 2)?;
    let root_a = block_a.message.hash_tree_root();
    let root_b = block_b.message.hash_tree_root();

    let (lighter_root, mut lighter_state) = if root_a < root_b {
        (root_a, state_a)
    } else {
        (root_b, state_b)
    };

    store.on_tick(start_of_slot(&store, 2))?;
    store.on_block(block_a)?;
    store.on_block(block_b)?;

    assert_ne!(store.head(), lighter_root);

    transition_functions::process_slots(&config, &mut lighter_state, 2)?;

    for attestation in factory::full_attestations(&config, &lighter_state, 1)? {
        store.on_attestation(&attestation)?;
    }

    assert_eq!(store.head(), lighter_root);

    Ok(())
}

#[test]
fn operation_lists_cannot_exceed_their_limits() {
    let too_many_indices =
        ContiguousList::<ValidatorIndex, MAX_VALIDATORS_PER_COMMITTEE>::try_from_iter(0..=2048);
    let too_many_bits = BitList::<MAX_VALIDATORS_PER_COMMITTEE>::try_from_iter(
        core::iter::repeat(true).take(MAX_VALIDATORS_PER_COMMITTEE + 1),
    );

    assert!(too_many_indices.is_err());
    assert!(too_many_bits.is_err());
}

#[test]
fn block_with_full_operation_lists_is_rejected_without_side_effects() -> Result<()> {
    let config = Arc::new(Config::minimal());
    let (mut store, genesis_state) = genesis(&config)?;
    let (block, _) = block_at(&config, &genesis_state, 1, 0)?;

    let voluntary_exit = SignedVoluntaryExit {
        message: VoluntaryExit {
            epoch: 0,
            validator_index: 0,
        },
        signature: block.signature,
    };

    let indexed_attestation = IndexedAttestation {
        attesting_indices: ContiguousList::try_from_iter(0..2048)?,
        ..IndexedAttestation::default()
    };

    let attestation = Attestation {
        aggregation_bits: BitList::new(true, MAX_VALIDATORS_PER_COMMITTEE),
        ..Attestation::default()
    };

    let mut full_block = SignedBeaconBlock::clone(&block);
    let body = &mut full_block.message.body;

    body.voluntary_exits = ContiguousList::full(voluntary_exit);
    body.attester_slashings = ContiguousList::full(AttesterSlashing {
        attestation_1: indexed_attestation.clone(),
        attestation_2: indexed_attestation,
    });
    body.attestations = ContiguousList::full(attestation);

    let full_block = Arc::new(full_block);
    let full_block_root = full_block.message.hash_tree_root();

    store.on_tick(start_of_slot(&store, 1))?;

    store
        .on_block(full_block)
        .expect_err("operations in block are invalid");

    assert!(!store.contains_block(full_block_root));
    assert_eq!(store.head(), store.anchor_root());

    store.on_block(block)?;

    Ok(())
}
