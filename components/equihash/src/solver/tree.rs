//! Compact provenance tags for the bucket solver.
//!
//! A slot in round 0 is tagged with the leaf index that produced it. A slot in any
//! later round is tagged with the bucket its parents lived in and their two slot
//! positions. The slot pair is Cantor-paired, which saves a bit over packing the two
//! slots side by side because the first slot is always the smaller one.

/// The provenance of a bucket slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(super) struct Tag(u64);

impl Tag {
    pub(super) fn leaf(index: u32) -> Self {
        Tag(u64::from(index))
    }

    pub(super) fn leaf_index(self) -> u32 {
        self.0 as u32
    }
}

fn triangle(y: u64) -> u64 {
    y * (y + 1) / 2
}

/// Maps `x < y` to a unique integer smaller than `triangle(y + 1)`.
fn cantor(x: u32, y: u32) -> u64 {
    debug_assert!(x < y);
    triangle(u64::from(y)) + u64::from(x)
}

fn cantor_inverse(z: u64) -> (u32, u32) {
    // Floating point gets us within one of the answer.
    let mut y = (((8 * z + 1) as f64).sqrt() as u64).saturating_sub(1) / 2;
    while triangle(y) > z {
        y -= 1;
    }
    while triangle(y + 1) <= z {
        y += 1;
    }
    ((z - triangle(y)) as u32, y as u32)
}

/// The bit layout of merge tags for a given slot capacity.
#[derive(Clone, Copy, Debug)]
pub(super) struct TagLayout {
    pair_bits: u32,
}

impl TagLayout {
    pub(super) fn new(slot_capacity: usize) -> Self {
        let max_slot = slot_capacity as u32 - 1;
        let max_pair = cantor(max_slot - 1, max_slot);
        TagLayout {
            pair_bits: u64::BITS - max_pair.leading_zeros(),
        }
    }

    /// Tags a slot formed from slots `s0 < s1` of `bucket`.
    pub(super) fn node(&self, bucket: u32, s0: u32, s1: u32) -> Tag {
        Tag((u64::from(bucket) << self.pair_bits) | cantor(s0, s1))
    }

    /// Returns `(bucket, s0, s1)` for a tag created by [`TagLayout::node`].
    pub(super) fn unpack(&self, tag: Tag) -> (u32, u32, u32) {
        let bucket = (tag.0 >> self.pair_bits) as u32;
        let (s0, s1) = cantor_inverse(tag.0 & ((1 << self.pair_bits) - 1));
        (bucket, s0, s1)
    }

    /// A cheap, incomplete test that the subtrees behind two merge tags share no
    /// leaves. It only catches subtrees built from the same slot of the same bucket.
    pub(super) fn prob_disjoint(&self, a: Tag, b: Tag) -> bool {
        let (bucket_a, a0, a1) = self.unpack(a);
        let (bucket_b, b0, b1) = self.unpack(b);
        bucket_a != bucket_b || (a0 != b0 && a1 != b1)
    }
}
