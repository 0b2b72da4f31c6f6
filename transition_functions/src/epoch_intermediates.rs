use core::num::NonZeroU64;

use anyhow::Result;
use helper_functions::{
    accessors::{
        get_attesting_indices, get_block_root, get_block_root_at_slot, get_current_epoch,
        get_finality_delay, get_previous_epoch,
    },
    predicates::{is_active_validator, is_eligible_for_penalties, is_in_inactivity_leak},
};
use integer_sqrt::IntegerSquareRoot as _;
use itertools::{izip, Itertools as _};
#[cfg(target_arch = "x86_64")]
use static_assertions::assert_eq_size;
use types::{
    phase0::{
        beacon_state::BeaconState,
        consts::BASE_REWARDS_PER_EPOCH,
        containers::{PendingAttestation, Validator},
        primitives::{Epoch, Gwei, ValidatorIndex},
    },
    preset::Preset,
};

/// Attesting balances in the epoch being processed.
///
/// All balances are at least `EFFECTIVE_BALANCE_INCREMENT`.
#[derive(Clone, Copy, Default, Debug)]
pub struct Statistics {
    pub previous_epoch_source_attesting_balance: Gwei,
    pub previous_epoch_target_attesting_balance: Gwei,
    pub previous_epoch_head_attesting_balance: Gwei,
    pub current_epoch_active_balance: Gwei,
    pub current_epoch_target_attesting_balance: Gwei,
}

impl Statistics {
    fn accumulate_previous_epoch_attestation(
        &mut self,
        performance: &mut Performance,
        attestation: &PendingAttestation,
        target: bool,
        head: bool,
        effective_balance: Gwei,
    ) {
        if !performance.previous_epoch_matching_source() {
            self.previous_epoch_source_attesting_balance += effective_balance;
            performance.previous_epoch_match = Match::Source;
        }

        if !performance.previous_epoch_matching_target() && target {
            self.previous_epoch_target_attesting_balance += effective_balance;
            performance.previous_epoch_match = Match::Target;
        }

        if !performance.previous_epoch_matching_head() && target && head {
            self.previous_epoch_head_attesting_balance += effective_balance;
            performance.previous_epoch_match = Match::Head;
        }

        let PendingAttestation {
            inclusion_delay,
            proposer_index,
            ..
        } = *attestation;

        let Some(delay) = NonZeroU64::new(inclusion_delay) else {
            return;
        };

        let inclusion = Inclusion {
            delay,
            proposer_index,
        };

        let current = performance
            .previous_epoch_fastest_inclusion
            .get_or_insert(inclusion);

        if delay < current.delay {
            *current = inclusion;
        }
    }

    fn clamp_balances<P: Preset>(&mut self) {
        let increment = P::EFFECTIVE_BALANCE_INCREMENT.get();

        for balance in [
            &mut self.previous_epoch_source_attesting_balance,
            &mut self.previous_epoch_target_attesting_balance,
            &mut self.previous_epoch_head_attesting_balance,
            &mut self.current_epoch_active_balance,
            &mut self.current_epoch_target_attesting_balance,
        ] {
            *balance = (*balance).max(increment);
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ValidatorSummary {
    pub effective_balance: Gwei,
    pub slashed: bool,
    pub withdrawable_epoch: Epoch,
    pub eligible_for_penalties: bool,
}

#[cfg(target_arch = "x86_64")]
assert_eq_size!(ValidatorSummary, [u64; 3]);

impl ValidatorSummary {
    // This does not update `eligible_for_penalties` because `process_slashings` does not use it.
    pub fn update_from(&mut self, validator: &Validator) {
        self.effective_balance = validator.effective_balance;
        self.slashed = validator.slashed;
        self.withdrawable_epoch = validator.withdrawable_epoch;
    }
}

#[derive(Clone, Copy, Default)]
pub struct Performance {
    previous_epoch_match: Match,
    previous_epoch_fastest_inclusion: Option<Inclusion>,
    current_epoch_matching_target: bool,
}

impl Performance {
    #[inline]
    const fn previous_epoch_matching_source(self) -> bool {
        !matches!(self.previous_epoch_match, Match::None)
    }

    #[inline]
    const fn previous_epoch_matching_target(self) -> bool {
        matches!(self.previous_epoch_match, Match::Target | Match::Head)
    }

    #[inline]
    const fn previous_epoch_matching_head(self) -> bool {
        matches!(self.previous_epoch_match, Match::Head)
    }
}

// Each level implies the ones before it.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
enum Match {
    #[default]
    None,
    Source,
    Target,
    Head,
}

#[derive(Clone, Copy)]
struct Inclusion {
    delay: NonZeroU64,
    proposer_index: ValidatorIndex,
}

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct EpochDeltas {
    pub reward: Gwei,
    pub penalty: Gwei,
}

pub fn statistics<P: Preset>(
    state: &BeaconState<P>,
) -> Result<(Statistics, Vec<ValidatorSummary>, Vec<Performance>)> {
    let current_epoch = get_current_epoch(state);
    let previous_epoch = get_previous_epoch(state);

    let mut statistics = Statistics::default();

    let summaries = state
        .validators
        .iter()
        .map(|validator| {
            if is_active_validator(validator, current_epoch) {
                statistics.current_epoch_active_balance += validator.effective_balance;
            }

            ValidatorSummary {
                effective_balance: validator.effective_balance,
                slashed: validator.slashed,
                withdrawable_epoch: validator.withdrawable_epoch,
                eligible_for_penalties: is_eligible_for_penalties(validator, previous_epoch),
            }
        })
        .collect_vec();

    let mut performance = vec![Performance::default(); summaries.len()];

    // `get_block_root` fails if the state is in the first slot of an epoch.
    // That never happens during epoch processing, but the check keeps this usable on its own.
    if let Ok(previous_epoch_target_block_root) = get_block_root(state, previous_epoch) {
        for attestation in &state.previous_epoch_attestations {
            let target = attestation.data.target.root == previous_epoch_target_block_root;
            let head = attestation.data.beacon_block_root
                == get_block_root_at_slot(state, attestation.data.slot)?;

            for validator_index in
                get_attesting_indices(state, attestation.data, &attestation.aggregation_bits)?
            {
                let index = usize::try_from(validator_index)?;
                let summary = summaries[index];

                if summary.slashed {
                    continue;
                }

                statistics.accumulate_previous_epoch_attestation(
                    &mut performance[index],
                    attestation,
                    target,
                    head,
                    summary.effective_balance,
                );
            }
        }
    }

    if let Ok(current_epoch_target_block_root) = get_block_root(state, current_epoch) {
        for attestation in &state.current_epoch_attestations {
            if attestation.data.target.root != current_epoch_target_block_root {
                continue;
            }

            for validator_index in
                get_attesting_indices(state, attestation.data, &attestation.aggregation_bits)?
            {
                let index = usize::try_from(validator_index)?;
                let summary = summaries[index];

                if summary.slashed || performance[index].current_epoch_matching_target {
                    continue;
                }

                statistics.current_epoch_target_attesting_balance += summary.effective_balance;
                performance[index].current_epoch_matching_target = true;
            }
        }
    }

    statistics.clamp_balances::<P>();

    Ok((statistics, summaries, performance))
}

/// Computes rewards and penalties for attestations made in the previous epoch.
///
/// Must be called after justification and finalization because the inactivity leak depends on
/// the finalized checkpoint.
pub fn epoch_deltas<P: Preset>(
    state: &BeaconState<P>,
    statistics: Statistics,
    summaries: &[ValidatorSummary],
    performance: &[Performance],
) -> Result<Vec<EpochDeltas>> {
    let finality_delay = get_finality_delay(state);
    let in_inactivity_leak = is_in_inactivity_leak(state);
    let total_active_balance = statistics.current_epoch_active_balance;
    let total_active_balance_sqrt = total_active_balance.integer_sqrt();

    let mut deltas = vec![EpochDeltas::default(); summaries.len()];

    for (index, summary, performance) in izip!(0.., summaries, performance) {
        let ValidatorSummary {
            effective_balance,
            eligible_for_penalties,
            ..
        } = *summary;

        let base_reward = effective_balance * P::BASE_REWARD_FACTOR
            / total_active_balance_sqrt
            / BASE_REWARDS_PER_EPOCH;

        let attestation_component_reward = |attesting_balance: Gwei| {
            // > Factored out from balance totals to avoid uint64 overflow
            let increment = P::EFFECTIVE_BALANCE_INCREMENT;

            if in_inactivity_leak {
                // > Since full base reward will be canceled out by inactivity penalty deltas,
                // > optimal participation receives full base reward compensation here.
                base_reward
            } else {
                let reward_numerator = base_reward * (attesting_balance / increment);
                reward_numerator / (total_active_balance / increment)
            }
        };

        let proposer_reward = base_reward / P::PROPOSER_REWARD_QUOTIENT;

        if eligible_for_penalties {
            let deltas = &mut deltas[index];

            // Slashed validators never match because `statistics` skips them.
            for (matching, attesting_balance) in [
                (
                    performance.previous_epoch_matching_source(),
                    statistics.previous_epoch_source_attesting_balance,
                ),
                (
                    performance.previous_epoch_matching_target(),
                    statistics.previous_epoch_target_attesting_balance,
                ),
                (
                    performance.previous_epoch_matching_head(),
                    statistics.previous_epoch_head_attesting_balance,
                ),
            ] {
                if matching {
                    deltas.reward += attestation_component_reward(attesting_balance);
                } else {
                    deltas.penalty += base_reward;
                }
            }

            if in_inactivity_leak {
                // > If validator is performing optimally this cancels all rewards for a neutral
                // > balance
                deltas.penalty += BASE_REWARDS_PER_EPOCH.get() * base_reward - proposer_reward;

                if !performance.previous_epoch_matching_target() {
                    deltas.penalty +=
                        effective_balance * finality_delay / P::INACTIVITY_PENALTY_QUOTIENT;
                }

                // > No rewards associated with inactivity penalties
            }
        }

        if let Some(inclusion) = performance.previous_epoch_fastest_inclusion {
            let Inclusion {
                delay,
                proposer_index,
            } = inclusion;

            let proposer_index = usize::try_from(proposer_index)?;
            let max_attester_reward = base_reward - proposer_reward;

            deltas[proposer_index].reward += proposer_reward;
            deltas[index].reward += max_attester_reward / delay;

            // > No penalties associated with inclusion delay
        }
    }

    Ok(deltas)
}
