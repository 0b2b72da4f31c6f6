//! Deterministic keys and genesis states for [mocked starts].
//!
//! Every client derives the same secret key for a given validator index, which lets tests sign
//! blocks and operations for any validator without storing keys.
//!
//! [mocked starts]: https://github.com/ethereum/eth2.0-pm/tree/b7c76e7a9d036ce73ca6aa0b7065db92f7728f41/interop/mocked_start

pub use crate::{
    keys::secret_key,
    mocked_start::{deposit_data, MockedStart},
};

mod keys;
mod mocked_start;
