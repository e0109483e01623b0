//! Conversion between densely bit-packed arrays and byte-aligned arrays, and the
//! minimal solution encoding built on top of it.

use std::io::Cursor;
use std::mem::size_of;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::params::Params;

fn check_bit_len(bit_len: usize) {
    assert!(bit_len >= 8);
    assert!(u32::BITS as usize >= 7 + bit_len);
}

/// Unpacks `vin`, a sequence of big-endian `bit_len`-bit fields, into fields of
/// `ceil(bit_len / 8) + byte_pad` bytes each. The leading `byte_pad` bytes of every
/// output field are zero.
///
/// # Panics
///
/// Panics if `bit_len` is outside `8..=25`, or if `vin` does not hold a whole number
/// of fields.
pub(crate) fn expand_array(vin: &[u8], bit_len: usize, byte_pad: usize) -> Vec<u8> {
    check_bit_len(bit_len);
    assert_eq!((8 * vin.len()) % bit_len, 0, "input is not a whole number of fields");

    let out_width = (bit_len + 7) / 8 + byte_pad;
    let out_len = 8 * out_width * vin.len() / bit_len;

    // Shortcut for parameters where expansion is a no-op
    if out_len == vin.len() {
        return vin.to_vec();
    }

    let mut vout: Vec<u8> = vec![0; out_len];
    let bit_len_mask: u32 = (1 << bit_len) - 1;

    // The acc_bits least-significant bits of acc_value represent a bit sequence
    // in big-endian order.
    let mut acc_bits = 0;
    let mut acc_value: u32 = 0;

    let mut j = 0;
    for b in vin {
        acc_value = (acc_value << 8) | u32::from(*b);
        acc_bits += 8;

        // When we have bit_len or more bits in the accumulator, write the next
        // output element.
        if acc_bits >= bit_len {
            acc_bits -= bit_len;
            for x in byte_pad..out_width {
                vout[j + x] = ((
                    // Big-endian
                    acc_value >> (acc_bits + (8 * (out_width - x - 1)))
                ) & (
                    // Apply bit_len_mask across byte boundaries
                    (bit_len_mask >> (8 * (out_width - x - 1))) & 0xFF
                )) as u8;
            }
            j += out_width;
        }
    }

    vout
}

/// Packs `vin`, a sequence of byte-aligned fields of `ceil(bit_len / 8) + byte_pad`
/// bytes, into big-endian `bit_len`-bit fields. This is the inverse of
/// [`expand_array`]; bits of a field above `bit_len` are ignored.
///
/// # Panics
///
/// Panics if `bit_len` is outside `8..=25`, or if `vin` does not pack into a whole
/// number of bytes.
pub(crate) fn compress_array(vin: &[u8], bit_len: usize, byte_pad: usize) -> Vec<u8> {
    check_bit_len(bit_len);

    let in_width = (bit_len + 7) / 8 + byte_pad;
    assert_eq!(vin.len() % in_width, 0, "input is not a whole number of fields");
    let fields = vin.len() / in_width;
    assert_eq!((fields * bit_len) % 8, 0, "fields do not fill whole bytes");
    let out_len = fields * bit_len / 8;

    if out_len == vin.len() {
        return vin.to_vec();
    }

    let mut vout: Vec<u8> = vec![0; out_len];
    let bit_len_mask: u32 = (1 << bit_len) - 1;

    // The acc_bits least-significant bits of acc_value represent a bit sequence
    // in big-endian order.
    let mut acc_bits = 0;
    let mut acc_value: u32 = 0;

    let mut j = 0;
    for out in vout.iter_mut() {
        // When we have fewer than 8 bits left in the accumulator, read the next
        // input element.
        if acc_bits < 8 {
            acc_value <<= bit_len;
            for x in byte_pad..in_width {
                let shift = 8 * (in_width - x - 1);
                acc_value |= (u32::from(vin[j + x]) & ((bit_len_mask >> shift) & 0xFF)) << shift;
            }
            j += in_width;
            acc_bits += bit_len;
        }

        acc_bits -= 8;
        *out = (acc_value >> acc_bits) as u8;
    }

    vout
}

/// Returns `None` if the parameters are invalid for this minimal encoding.
pub(crate) fn indices_from_minimal(p: Params, minimal: &[u8]) -> Option<Vec<u32>> {
    let c_bit_len = p.collision_bit_length();
    if minimal.len() != p.solution_size() {
        return None;
    }

    assert!(((c_bit_len + 1) + 7) / 8 <= size_of::<u32>());
    let len_indices = u32::BITS as usize * minimal.len() / (c_bit_len + 1);
    let byte_pad = size_of::<u32>() - ((c_bit_len + 1) + 7) / 8;

    let mut csr = Cursor::new(expand_array(minimal, c_bit_len + 1, byte_pad));
    let mut ret = Vec::with_capacity(len_indices);

    // Big-endian so that lexicographic array comparison is equivalent to integer
    // comparison
    while let Ok(i) = csr.read_u32::<BigEndian>() {
        ret.push(i);
    }

    Some(ret)
}

/// Encodes `indices` at `n / (k + 1) + 1` bits each.
///
/// Callers must ensure there are `2^k` indices, each of which fits in the encoding.
pub(crate) fn minimal_from_indices(p: Params, indices: &[u32]) -> Vec<u8> {
    let c_bit_len = p.collision_bit_length();
    let index_bytes = size_of::<u32>();
    let digit_bytes = ((c_bit_len + 1) + 7) / 8;
    assert!(digit_bytes <= index_bytes);
    let byte_pad = index_bytes - digit_bytes;

    let mut array = Vec::with_capacity(indices.len() * index_bytes);
    for i in indices {
        array
            .write_u32::<BigEndian>(*i)
            .expect("writing to a Vec cannot fail");
    }

    compress_array(&array, c_bit_len + 1, byte_pad)
}
