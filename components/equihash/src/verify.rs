//! Verification functions for the [Equihash] proof-of-work algorithm.
//!
//! [Equihash]: https://zips.z.cash/protocol/protocol.pdf#equihash

use blake2b_simd::State as Blake2bState;

use crate::{
    digest::{leaf_hash, nonce_bytes, seeded_state, ZCASH_PERSONALIZATION},
    error::{Error, Kind},
    minimal::indices_from_minimal,
    params::Params,
};

fn has_duplicates(indices: &[u32]) -> bool {
    let mut sorted = indices.to_vec();
    sorted.sort_unstable();
    sorted.windows(2).any(|w| w[0] == w[1])
}

/// Recomputes the hash of the subtree spanned by `indices`, with every collided digit
/// trimmed off.
fn tree_validator(p: &Params, state: &Blake2bState, indices: &[u32]) -> Result<Vec<u8>, Error> {
    if indices.len() > 1 {
        let end = indices.len();
        let mid = end / 2;
        if indices[0] >= indices[mid] {
            return Err(Error(Kind::OutOfOrder));
        }
        let a = tree_validator(p, state, &indices[0..mid])?;
        let b = tree_validator(p, state, &indices[mid..end])?;

        let trim = p.collision_byte_length();
        let xor: Vec<u8> = a.iter().zip(b.iter()).map(|(a, b)| a ^ b).collect();
        if xor[..trim].iter().any(|v| *v != 0) {
            return Err(Error(Kind::NonZeroXor));
        }
        Ok(xor[trim..].to_vec())
    } else {
        Ok(leaf_hash(p, state, indices[0]))
    }
}

/// Checks `indices` against a digest that has already absorbed the header and nonce.
///
/// `indices` must contain `2^k` entries.
pub(crate) fn check_indices(
    p: &Params,
    state: &Blake2bState,
    indices: &[u32],
) -> Result<(), Error> {
    debug_assert_eq!(indices.len(), p.solution_index_count());
    if has_duplicates(indices) {
        return Err(Error(Kind::Duplicate));
    }

    let root = tree_validator(p, state, indices)?;

    // Hashes were trimmed, so only need to check remaining length
    if root.iter().all(|v| *v == 0) {
        Ok(())
    } else {
        Err(Error(Kind::NonZeroXor))
    }
}

fn verify_minimal(
    p: Params,
    tag: &[u8; 8],
    input: &[u8],
    nonce: &[u8],
    soln: &[u8],
) -> Result<(), Error> {
    let indices = indices_from_minimal(p, soln).ok_or(Error(Kind::SolutionSizeMismatch))?;
    let state = seeded_state(&p, tag, input, nonce);
    check_indices(&p, &state, &indices)
}

/// Checks whether `soln` is a valid solution for `(input, nonce)` with the
/// parameters `(n, k)`.
///
/// This accepts any well-formed parameters (not only the ones the solvers are
/// registered for) and absorbs `nonce` exactly as given.
pub fn is_valid_solution(
    n: u32,
    k: u32,
    input: &[u8],
    nonce: &[u8],
    soln: &[u8],
) -> Result<(), Error> {
    let p = Params::new(n, k).ok_or(Error(Kind::UnknownParams))?;
    verify_minimal(p, &ZCASH_PERSONALIZATION, input, nonce, soln)
}

/// Checks whether `soln` is a valid solution for `header` and `nonce` with the
/// registered parameters `(n, k)`.
///
/// The nonce is absorbed in its 32-byte encoding (see [`nonce_bytes`]).
pub fn verify(n: u32, k: u32, header: &[u8], nonce: i64, soln: &[u8]) -> Result<(), Error> {
    verify_with_personalization(&ZCASH_PERSONALIZATION, n, k, header, nonce, soln)
}

/// As [`verify`], with a BLAKE2b personalization prefix other than `ZcashPoW`.
pub fn verify_with_personalization(
    personalization: &[u8; 8],
    n: u32,
    k: u32,
    header: &[u8],
    nonce: i64,
    soln: &[u8],
) -> Result<(), Error> {
    let p = Params::registered(n, k)?.params;
    if header.is_empty() {
        return Err(Error(Kind::InvalidHeaderLength));
    }
    verify_minimal(p, personalization, header, &nonce_bytes(nonce), soln)
}
