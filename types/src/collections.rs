//! Persistent collections used in [`BeaconState`](crate::phase0::beacon_state::BeaconState).
//!
//! Cloning a state clones the root of each [`Vector`] and shares the rest.
//! Mutations copy only the affected nodes.

use easy_ext::ext;
use im::Vector;
use thiserror::Error;

use crate::phase0::{
    containers::{Eth1Data, PendingAttestation, Validator},
    primitives::{Gwei, H256},
};

pub type Attestations = Vector<PendingAttestation>;
pub type Balances = Vector<Gwei>;
pub type Eth1DataVotes = Vector<Eth1Data>;
pub type HistoricalRoots = Vector<H256>;
pub type RandaoMixes = Vector<H256>;
pub type RecentRoots = Vector<H256>;
pub type Slashings = Vector<Gwei>;
pub type Validators = Vector<Validator>;

#[derive(Debug, Error)]
#[error("index {index} is out of bounds for a collection of length {length}")]
pub struct IndexOutOfBounds {
    pub index: u64,
    pub length: usize,
}

#[ext(VectorExt)]
pub impl<T: Clone> Vector<T> {
    /// Builds a vector of `length` copies of `element`.
    fn repeat(element: T, length: u64) -> Self {
        (0..length).map(|_| element.clone()).collect()
    }

    fn get_at(&self, index: u64) -> Result<&T, IndexOutOfBounds> {
        usize::try_from(index)
            .ok()
            .and_then(|position| self.get(position))
            .ok_or(IndexOutOfBounds {
                index,
                length: self.len(),
            })
    }

    fn get_mut_at(&mut self, index: u64) -> Result<&mut T, IndexOutOfBounds> {
        let length = self.len();

        match usize::try_from(index) {
            Ok(position) if position < length => Ok(&mut self[position]),
            _ => Err(IndexOutOfBounds { index, length }),
        }
    }

    /// Indexes the vector as a ring buffer.
    ///
    /// # Panics
    ///
    /// Panics if the vector is empty.
    fn mod_index(&self, index: u64) -> &T {
        &self[ring_position(index, self.len())]
    }

    /// # Panics
    ///
    /// Panics if the vector is empty.
    fn mod_index_mut(&mut self, index: u64) -> &mut T {
        let position = ring_position(index, self.len());
        &mut self[position]
    }

    fn len_u64(&self) -> u64 {
        u64::try_from(self.len()).expect("collection lengths fit in u64")
    }
}

fn ring_position(index: u64, length: usize) -> usize {
    let length = u64::try_from(length).expect("collection lengths fit in u64");
    usize::try_from(index % length).expect("remainder is less than a length that fits in usize")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mod_index_wraps_around() {
        let mut vector = Vector::repeat(0_u64, 4);

        *vector.mod_index_mut(6) = 7;

        assert_eq!(vector[2], 7);
        assert_eq!(*vector.mod_index(10), 7);
    }

    #[test]
    fn get_at_reports_out_of_bounds_index() {
        let vector = Vector::repeat(H256::zero(), 2);

        assert!(vector.get_at(1).is_ok());

        let error = vector.get_at(2).expect_err("index 2 is out of bounds");

        assert_eq!(error.index, 2);
        assert_eq!(error.length, 2);
    }
}
