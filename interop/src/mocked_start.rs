use core::num::NonZeroU64;

use anyhow::Result;
use deposit_tree::DepositTree;
use genesis::Incremental;
use helper_functions::{misc, signing::SignForAllForks as _};
use types::{
    config::Config,
    phase0::{
        beacon_state::BeaconState,
        containers::{DepositData, DepositMessage},
        primitives::{Eth1BlockHash, Gwei, UnixSeconds, ValidatorIndex},
    },
    preset::Preset,
};

use crate::keys;

/// A genesis where every validator deposits `MAX_EFFECTIVE_BALANCE` and is active immediately.
#[derive(Clone, Copy, Debug)]
pub struct MockedStart {
    pub genesis_time: UnixSeconds,
    pub validator_count: NonZeroU64,
}

impl MockedStart {
    const ETH1_BLOCK_HASH: Eth1BlockHash = Eth1BlockHash::repeat_byte(0x42);

    // Only affects the genesis time computed from deposits, which is overridden anyway.
    const ETH1_TIMESTAMP: UnixSeconds = 1 << 40;

    /// Builds the genesis state along with the deposit tree it was built from.
    ///
    /// The state is not checked against `MIN_GENESIS_TIME` or
    /// `MIN_GENESIS_ACTIVE_VALIDATOR_COUNT`.
    pub fn beacon_state<P: Preset>(
        self,
        config: &Config,
    ) -> Result<(BeaconState<P>, DepositTree)> {
        let Self {
            genesis_time,
            validator_count,
        } = self;

        let mut incremental = Incremental::<P>::new(config);

        incremental.set_eth1_timestamp(Self::ETH1_TIMESTAMP);

        for validator_index in 0..validator_count.get() {
            let data = deposit_data::<P>(config, validator_index, P::MAX_EFFECTIVE_BALANCE);
            incremental.add_deposit_data(data, validator_index)?;
        }

        let (mut state, deposit_tree) = incremental.finish(Self::ETH1_BLOCK_HASH);

        state.genesis_time = genesis_time;

        Ok((state, deposit_tree))
    }
}

/// Deposit data for `validator_index` with BLS withdrawal credentials, signed with its key.
///
/// Deposits for indices of existing validators are top-ups.
#[must_use]
pub fn deposit_data<P: Preset>(
    config: &Config,
    validator_index: ValidatorIndex,
    amount: Gwei,
) -> DepositData {
    let secret_key = keys::secret_key(validator_index);
    let pubkey = secret_key.to_public_key().into();
    let withdrawal_credentials = misc::bls_withdrawal_credentials(pubkey);

    let message = DepositMessage {
        pubkey,
        withdrawal_credentials,
        amount,
    };

    DepositData {
        pubkey,
        withdrawal_credentials,
        amount,
        signature: message.sign(config, &secret_key).into(),
    }
}
