use core::{
    fmt::{Debug, Display, LowerHex, UpperHex},
    ops::Deref,
};

use derive_more::{AsMut, AsRef, From};
use serde::Serialize;
use ssz::SszHash;
use static_assertions::assert_not_impl_any;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::consts::SECRET_KEY_SIZE;

#[derive(Default, AsRef, AsMut, From, Zeroize, ZeroizeOnDrop)]
#[as_ref(forward)]
#[as_mut(forward)]
pub struct SecretKeyBytes {
    pub(crate) bytes: [u8; SECRET_KEY_SIZE],
}

// Secret key material must not be copied or printed.
assert_not_impl_any! {
    SecretKeyBytes:

    Clone,
    Copy,
    Deref,
    ToOwned,

    Debug,
    Display,
    LowerHex,
    UpperHex,

    Serialize,
    SszHash,
}
