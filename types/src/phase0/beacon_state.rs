use core::marker::PhantomData;

use derivative::Derivative;
use ssz::BitVector;

use crate::{
    collections::{
        Attestations, Balances, Eth1DataVotes, HistoricalRoots, RandaoMixes, RecentRoots,
        Slashings, Validators, VectorExt as _,
    },
    phase0::{
        consts::JUSTIFICATION_BITS_LENGTH,
        containers::{BeaconBlockHeader, Checkpoint, Eth1Data, Fork},
        primitives::{DepositIndex, Slot, UnixSeconds, H256},
    },
    preset::Preset,
};

#[derive(Clone, Debug, Derivative)]
#[derivative(PartialEq, Eq)]
pub struct BeaconState<P: Preset> {
    // > Versioning
    pub genesis_time: UnixSeconds,
    pub genesis_validators_root: H256,
    pub slot: Slot,
    pub fork: Fork,

    // > History
    pub latest_block_header: BeaconBlockHeader,
    pub block_roots: RecentRoots,
    pub state_roots: RecentRoots,
    pub historical_roots: HistoricalRoots,

    // > Eth1
    pub eth1_data: Eth1Data,
    pub eth1_data_votes: Eth1DataVotes,
    pub eth1_deposit_index: DepositIndex,

    // > Registry
    pub validators: Validators,
    pub balances: Balances,

    // > Randomness
    pub randao_mixes: RandaoMixes,

    // > Slashings
    pub slashings: Slashings,

    // > Attestations
    pub previous_epoch_attestations: Attestations,
    pub current_epoch_attestations: Attestations,

    // > Finality
    pub justification_bits: BitVector<JUSTIFICATION_BITS_LENGTH>,
    pub previous_justified_checkpoint: Checkpoint,
    pub current_justified_checkpoint: Checkpoint,
    pub finalized_checkpoint: Checkpoint,

    // Limits of the lists above and lengths of the vectors depend on the preset.
    #[derivative(PartialEq = "ignore")]
    pub phantom: PhantomData<P>,
}

// Vectors are created at their full length.
impl<P: Preset> Default for BeaconState<P> {
    fn default() -> Self {
        Self {
            genesis_time: 0,
            genesis_validators_root: H256::zero(),
            slot: 0,
            fork: Fork::default(),
            latest_block_header: BeaconBlockHeader::default(),
            block_roots: RecentRoots::repeat(H256::zero(), P::SLOTS_PER_HISTORICAL_ROOT.get()),
            state_roots: RecentRoots::repeat(H256::zero(), P::SLOTS_PER_HISTORICAL_ROOT.get()),
            historical_roots: HistoricalRoots::new(),
            eth1_data: Eth1Data::default(),
            eth1_data_votes: Eth1DataVotes::new(),
            eth1_deposit_index: 0,
            validators: Validators::new(),
            balances: Balances::new(),
            randao_mixes: RandaoMixes::repeat(H256::zero(), P::EPOCHS_PER_HISTORICAL_VECTOR.get()),
            slashings: Slashings::repeat(0, P::EPOCHS_PER_SLASHINGS_VECTOR.get()),
            previous_epoch_attestations: Attestations::new(),
            current_epoch_attestations: Attestations::new(),
            justification_bits: BitVector::default(),
            previous_justified_checkpoint: Checkpoint::default(),
            current_justified_checkpoint: Checkpoint::default(),
            finalized_checkpoint: Checkpoint::default(),
            phantom: PhantomData,
        }
    }
}
