//! The personalized BLAKE2b instance that generates Equihash leaf hashes.

use blake2b_simd::{Hash as Blake2bHash, Params as Blake2bParams, State as Blake2bState};
use byteorder::{LittleEndian, WriteBytesExt};

use crate::{minimal::expand_array, params::Params};

/// The BLAKE2b personalization prefix used by Zcash.
pub const ZCASH_PERSONALIZATION: [u8; 8] = *b"ZcashPoW";

/// Length of the nonce that is absorbed after the header.
pub const NONCE_LENGTH: usize = 32;

/// Encodes `nonce` as absorbed by the hash: its low 32 bits in little-endian order,
/// followed by 28 zero bytes.
pub fn nonce_bytes(nonce: i64) -> [u8; NONCE_LENGTH] {
    let mut bytes = [0; NONCE_LENGTH];
    bytes[..4].copy_from_slice(&(nonce as u32).to_le_bytes());
    bytes
}

pub(crate) fn initialise_state(p: &Params, tag: &[u8; 8]) -> Blake2bState {
    let mut personalization: Vec<u8> = Vec::from(&tag[..]);
    personalization
        .write_u32::<LittleEndian>(p.n)
        .expect("writing to a Vec cannot fail");
    personalization
        .write_u32::<LittleEndian>(p.k)
        .expect("writing to a Vec cannot fail");

    Blake2bParams::new()
        .hash_length(p.hash_output() as usize)
        .fanout(1)
        .max_depth(1)
        .personal(&personalization)
        .to_state()
}

/// Returns the personalized state after absorbing `input` and `nonce`.
pub(crate) fn seeded_state(
    p: &Params,
    tag: &[u8; 8],
    input: &[u8],
    nonce: &[u8],
) -> Blake2bState {
    let mut state = initialise_state(p, tag);
    state.update(input);
    state.update(nonce);
    state
}

/// Generates hash block `i` without touching `base_state`.
pub(crate) fn generate_hash(base_state: &Blake2bState, i: u32) -> Blake2bHash {
    let mut lei = [0u8; 4];
    (&mut lei[..])
        .write_u32::<LittleEndian>(i)
        .expect("buffer is four bytes");

    let mut state = base_state.clone();
    state.update(&lei);
    state.finalize()
}

/// Returns the `n`-bit slice of `block` that belongs to leaf `i`.
pub(crate) fn leaf_slice<'a>(p: &Params, block: &'a Blake2bHash, i: u32) -> &'a [u8] {
    let start = ((i % p.indices_per_hash_output()) * p.n / 8) as usize;
    let end = start + (p.n as usize) / 8;
    &block.as_bytes()[start..end]
}

/// The hash of leaf `i`, expanded to one byte-aligned digit per collision round.
pub(crate) fn leaf_hash(p: &Params, state: &Blake2bState, i: u32) -> Vec<u8> {
    let block = generate_hash(state, i / p.indices_per_hash_output());
    let hash = expand_array(leaf_slice(p, &block, i), p.collision_bit_length(), 0);
    debug_assert_eq!(hash.len(), p.hash_length());
    hash
}
