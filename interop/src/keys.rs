use bls::{SecretKey, SecretKeyBytes};
use num_bigint::BigUint;
use once_cell::sync::Lazy;
use ssz::SszHash as _;
use types::phase0::primitives::ValidatorIndex;

// The order of the BLS12-381 scalar field.
static CURVE_ORDER: Lazy<BigUint> = Lazy::new(|| {
    BigUint::parse_bytes(
        b"52435875175126190479447740508185965837690552500527637822603658699938581184513",
        10,
    )
    .expect("curve order is a valid decimal number")
});

/// Derives the secret key of `validator_index`.
///
/// The seed is the hash of the index encoded as a little-endian 32 byte integer.
/// The seed is itself read as a little-endian integer and reduced modulo the curve order.
#[must_use]
pub fn secret_key(validator_index: ValidatorIndex) -> SecretKey {
    let seed = hashing::hash_256(validator_index.hash_tree_root());
    let scalar = BigUint::from_bytes_le(seed.as_bytes()) % &*CURVE_ORDER;

    let mut bytes = scalar.to_bytes_le();
    bytes.resize(size_of::<SecretKeyBytes>(), 0);
    bytes.reverse();

    let bytes = <[u8; size_of::<SecretKeyBytes>()]>::try_from(bytes)
        .expect("scalars below the curve order fit in a secret key");

    SecretKeyBytes::from(bytes)
        .try_into()
        .expect("nonzero scalars below the curve order are valid secret keys")
}
