//! The swap-or-not shuffle used to assign validators to committees.

use core::{
    num::NonZeroU64,
    ops::{Index as _, Rem as _},
};

use anyhow::Result;
use itertools::izip;
use tap::TryConv as _;
use types::{phase0::primitives::H256, preset::Preset};

const BITS_PER_HASH: usize = H256::len_bytes() * 8;

/// Applies the whole shuffle to `slice` in place.
///
/// Afterwards `slice[i]` holds the element that was at `shuffle_single(i, len, seed)`.
/// Performing all rounds over the whole slice computes each source hash once per round instead of
/// once per element.
// Based on <https://github.com/protolambda/eth2-shuffle/tree/fd840f1036c1f8f6d7625ffe6ff4d9c60f942876>.
pub fn shuffle_slice<P: Preset, T>(slice: &mut [T], seed: H256) -> Result<()> {
    let Some(length) = slice.len().try_conv::<u64>().map(NonZeroU64::new)? else {
        return Ok(());
    };

    for round in (0..P::SHUFFLE_ROUND_COUNT).rev() {
        let pivot = compute_pivot(seed, round, length)
            .try_conv::<usize>()
            .expect("remainder of division by number that fits in usize also fits in usize");

        let midpoint = pivot + 1;
        let (low, high) = slice.split_at_mut(midpoint);

        swap_around_mirror(seed, round, low, 0);
        swap_around_mirror(seed, round, high, midpoint);
    }

    Ok(())
}

fn swap_around_mirror<T>(seed: H256, round: u8, slice: &mut [T], offset: usize) {
    let mirror = slice.len() / 2;
    let offset_mirror = offset + mirror;
    let offset_length = offset + slice.len();
    let trailing = mirror.min(offset_length % BITS_PER_HASH);
    let leading = (mirror - trailing) % BITS_PER_HASH;

    let (low, mut high) = slice.split_at_mut(mirror);

    if low.len() < high.len() {
        high = &mut high[1..];
    }

    assert_eq!(low.len(), mirror);
    assert_eq!(high.len(), mirror);

    if trailing > 0 {
        let source = compute_source(seed, round, position_window(offset_length));
        let bit_indices = (0..offset_length % BITS_PER_HASH).rev();
        let low_elements = low[..trailing].iter_mut();
        let high_elements = high[mirror - trailing..].iter_mut().rev();

        swap_using_source(source, bit_indices, low_elements, high_elements);
    }

    for (offset_chunk_index, low_chunk, high_chunk) in izip!(
        (0..offset_length / BITS_PER_HASH).rev(),
        low[trailing..].chunks_exact_mut(BITS_PER_HASH),
        high[..mirror - trailing].rchunks_exact_mut(BITS_PER_HASH),
    ) {
        let window = offset_chunk_index.try_conv::<u64>().expect(WINDOW_FITS);
        let source = compute_source(seed, round, window);
        let bit_indices = 0..BITS_PER_HASH;
        let low_elements = low_chunk.iter_mut().rev();
        let high_elements = high_chunk;

        swap_using_source(source, bit_indices, low_elements, high_elements);
    }

    if leading > 0 {
        let source = compute_source(seed, round, position_window(offset_mirror));
        let bit_indices = (0..BITS_PER_HASH).rev();
        let low_elements = low[mirror - leading..].iter_mut();
        let high_elements = high[..leading].iter_mut().rev();

        swap_using_source(source, bit_indices, low_elements, high_elements);
    }
}

fn swap_using_source<'slice, T: 'slice>(
    source: H256,
    bit_indices: impl IntoIterator<Item = usize>,
    low: impl IntoIterator<Item = &'slice mut T>,
    high: impl IntoIterator<Item = &'slice mut T>,
) {
    for (bit_index, index, flip) in izip!(bit_indices, low, high) {
        if get_bit(source, bit_index) {
            core::mem::swap(index, flip);
        }
    }
}

/// [`compute_shuffled_index`](https://github.com/ethereum/consensus-specs/blob/v1.0.0/specs/phase0/beacon-chain.md#compute_shuffled_index)
///
/// # Panics
///
/// Panics if `index` is not less than `index_count`.
#[must_use]
pub fn shuffle_single<P: Preset>(mut index: u64, index_count: NonZeroU64, seed: H256) -> u64 {
    assert!(index < index_count.get());

    for round in 0..P::SHUFFLE_ROUND_COUNT {
        let pivot = compute_pivot(seed, round, index_count);
        let flip = (pivot + index_count.get() - index) % index_count;
        let position = index.max(flip);
        let position_window = position / BITS_PER_HASH as u64;
        let source = compute_source(seed, round, position_window);
        let bit_index = usize::from(position.to_le_bytes()[0]);

        if get_bit(source, bit_index) {
            index = flip;
        }
    }

    index
}

fn compute_pivot(seed: H256, round: u8, index_count: NonZeroU64) -> u64 {
    hashing::hash_256_8_32(seed, round, None)
        .index(..size_of::<u64>())
        .try_into()
        .map(u64::from_le_bytes)
        .expect("slice has the same size as u64")
        .rem(index_count)
}

fn compute_source(seed: H256, round: u8, position_window: u64) -> H256 {
    // Truncate to match the 4 byte encoding of the position window in `compute_shuffled_index`.
    #[expect(clippy::cast_possible_truncation)]
    let position_window = position_window as u32;

    hashing::hash_256_8_32(seed, round, Some(position_window))
}

fn position_window(position: usize) -> u64 {
    (position / BITS_PER_HASH).try_conv::<u64>().expect(WINDOW_FITS)
}

const WINDOW_FITS: &str = "position window is derived from a slice length, which fits in u64";

const fn get_bit(source: H256, bit_index: usize) -> bool {
    (source.0[bit_index / 8] >> (bit_index % 8)) & 1 == 1
}
