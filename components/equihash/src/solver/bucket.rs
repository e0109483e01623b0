//! The bucket solver.
//!
//! Rows live in `2^bucket_bits` buckets of fixed capacity, chosen by the top bits of
//! their leading digit. Each slot holds the row's remaining digits, one `u32` word per
//! digit, and a [`Tag`] recording where it came from. Within a bucket, rows whose
//! leading digits also agree on the remaining "rest" bits collide; they are found by
//! chaining slots with equal rest bits into intrusive linked lists.
//!
//! Hash words are only needed for the current and next round, so two heaps are
//! alternated. Tags are kept for every round so that candidates can be expanded back
//! into leaf indices once the final round is reached.

use blake2b_simd::State as Blake2bState;
use byteorder::{BigEndian, ByteOrder};
use tracing::{debug, trace};

use super::{
    tree::{Tag, TagLayout},
    Halt, Sink,
};
use crate::{
    digest::{generate_hash, leaf_slice},
    minimal::expand_array,
    params::{Params, Registered},
};

const NIL: u32 = u32::MAX;

fn slot_words(heap: &[u32], pos: usize, words: usize) -> &[u32] {
    &heap[pos * words..(pos + 1) * words]
}

/// Tags and fill counts for the slots written in one round.
struct Round {
    counts: Vec<u32>,
    tags: Vec<Tag>,
}

/// Chains together the slots of a bucket that share rest bits.
struct Groups {
    heads: Vec<u32>,
    next: Vec<u32>,
}

impl Groups {
    fn new(rest_bits: u32, slot_capacity: usize) -> Self {
        Groups {
            heads: vec![NIL; 1 << rest_bits],
            next: vec![NIL; slot_capacity],
        }
    }

    fn clear(&mut self) {
        self.heads.fill(NIL);
    }

    /// Adds `slot` to the group for `rest`, returning the slots already in it, most
    /// recent first.
    fn add(&mut self, slot: u32, rest: usize) -> impl Iterator<Item = u32> + '_ {
        let head = self.heads[rest];
        self.next[slot as usize] = head;
        self.heads[rest] = slot;
        let next = &self.next;
        std::iter::successors((head != NIL).then_some(head), move |s| {
            let n = next[*s as usize];
            (n != NIL).then_some(n)
        })
    }
}

/// Bytes allocated for the tag tables and hash heaps of a bucket solver.
fn footprint(registered: &Registered) -> usize {
    let slots = registered.bucket_count() * registered.slot_capacity();
    let k = registered.params.k as usize;
    slots * (k * std::mem::size_of::<Tag>() + (2 * k + 1) * std::mem::size_of::<u32>())
}

struct BucketSolver<'a> {
    p: Params,
    state: &'a Blake2bState,
    rest_bits: u32,
    buckets: usize,
    capacity: usize,
    layout: TagLayout,
    rounds: Vec<Round>,
    heaps: [Vec<u32>; 2],
    groups: Groups,
    dropped: usize,
}

impl<'a> BucketSolver<'a> {
    fn new(registered: &Registered, state: &'a Blake2bState) -> Self {
        let p = registered.params;
        let buckets = registered.bucket_count();
        let capacity = registered.slot_capacity();
        let slots = buckets * capacity;
        let k = p.k as usize;
        debug!(
            buckets,
            capacity,
            bytes = footprint(registered),
            "Allocating bucket solver"
        );

        BucketSolver {
            p,
            state,
            rest_bits: registered.rest_bits,
            buckets,
            capacity,
            layout: TagLayout::new(capacity),
            rounds: (0..k)
                .map(|_| Round {
                    counts: vec![0; buckets],
                    tags: vec![Tag::default(); slots],
                })
                .collect(),
            heaps: [vec![0; slots * (k + 1)], vec![0; slots * k]],
            groups: Groups::new(registered.rest_bits, capacity),
            dropped: 0,
        }
    }

    /// Number of digit words stored per slot in round `r`.
    fn words(&self, r: usize) -> usize {
        self.p.k as usize + 1 - r
    }

    fn rest_mask(&self) -> u32 {
        (1 << self.rest_bits) - 1
    }

    /// Fills round 0 with the hashes of every leaf.
    fn digit0<S: Sink>(&mut self, sink: &mut S) -> Result<(), Halt> {
        let p = self.p;
        let words = self.words(0);
        let per_block = p.indices_per_hash_output();
        let blocks = (p.initial_list_size() + per_block - 1) / per_block;
        // One big-endian u32 per digit.
        let byte_pad = 4 - p.collision_byte_length();
        let mut digits = vec![0; words];

        for block in 0..blocks {
            sink.poll()?;
            let hash = generate_hash(self.state, block);
            for i in (block * per_block..(block + 1) * per_block)
                .take_while(|i| *i < p.initial_list_size())
            {
                let expanded =
                    expand_array(leaf_slice(&p, &hash, i), p.collision_bit_length(), byte_pad);
                BigEndian::read_u32_into(&expanded, &mut digits);

                let bucket = (digits[0] >> self.rest_bits) as usize;
                let round = &mut self.rounds[0];
                let slot = round.counts[bucket] as usize;
                if slot >= self.capacity {
                    self.dropped += 1;
                    continue;
                }
                round.counts[bucket] += 1;

                let pos = bucket * self.capacity + slot;
                round.tags[pos] = Tag::leaf(i);
                self.heaps[0][pos * words..(pos + 1) * words].copy_from_slice(&digits);
            }
        }

        Ok(())
    }

    /// Collides the rows of round `r - 1` on their leading digit, writing round `r`.
    fn digit(&mut self, r: usize) {
        let words_in = self.words(r - 1);
        let words_out = words_in - 1;
        let capacity = self.capacity;
        let rest_bits = self.rest_bits;
        let rest_mask = self.rest_mask();
        let layout = self.layout;

        let (done, todo) = self.rounds.split_at_mut(r);
        let prev = &done[r - 1];
        let cur = &mut todo[0];
        let (heap_a, heap_b) = self.heaps.split_at_mut(1);
        let (src, dst) = if r % 2 == 1 {
            (&heap_a[0], &mut heap_b[0])
        } else {
            (&heap_b[0], &mut heap_a[0])
        };
        let groups = &mut self.groups;
        let mut dropped = 0;

        for bucket in 0..self.buckets {
            groups.clear();
            let base = bucket * capacity;
            for s1 in 0..prev.counts[bucket] {
                let h1 = slot_words(src, base + s1 as usize, words_in);
                let rest = (h1[0] & rest_mask) as usize;
                for s0 in groups.add(s1, rest) {
                    let h0 = slot_words(src, base + s0 as usize, words_in);
                    if h0 == h1 {
                        continue;
                    }

                    // The leading words are equal, so only the rest is kept.
                    let xor_bucket = ((h0[1] ^ h1[1]) >> rest_bits) as usize;
                    let xor_slot = cur.counts[xor_bucket] as usize;
                    if xor_slot >= capacity {
                        dropped += 1;
                        continue;
                    }
                    cur.counts[xor_bucket] += 1;

                    let pos = xor_bucket * capacity + xor_slot;
                    cur.tags[pos] = layout.node(bucket as u32, s0, s1);
                    for (out, (a, b)) in dst[pos * words_out..(pos + 1) * words_out]
                        .iter_mut()
                        .zip(h0[1..].iter().zip(h1[1..].iter()))
                    {
                        *out = a ^ b;
                    }
                }
            }
        }

        self.dropped += dropped;
        debug!(
            round = r,
            rows = cur.counts.iter().map(|c| *c as usize).sum::<usize>(),
            dropped,
            "Bucket round complete"
        );
    }

    /// Finds rows of the last round whose two remaining digits are equal.
    fn digit_k(&mut self) -> Vec<(usize, u32, u32)> {
        let last = self.p.k as usize - 1;
        let words = self.words(last);
        let capacity = self.capacity;
        let rest_mask = self.rest_mask();
        let layout = self.layout;
        let round = &self.rounds[last];
        let src = &self.heaps[last % 2];
        let groups = &mut self.groups;
        let mut candidates = vec![];

        for bucket in 0..self.buckets {
            groups.clear();
            let base = bucket * capacity;
            for s1 in 0..round.counts[bucket] {
                let pos1 = base + s1 as usize;
                let h1 = slot_words(src, pos1, words);
                let rest = (h1[0] & rest_mask) as usize;
                for s0 in groups.add(s1, rest) {
                    let pos0 = base + s0 as usize;
                    if slot_words(src, pos0, words) == h1
                        && layout.prob_disjoint(round.tags[pos0], round.tags[pos1])
                    {
                        candidates.push((bucket, s0, s1));
                    }
                }
            }
        }

        candidates
    }

    /// Expands the slot at `(bucket, slot)` of round `r` into its leaf indices.
    ///
    /// Returns `None` if two sibling subtrees start with the same leaf.
    fn indices(&self, r: usize, bucket: usize, slot: u32) -> Option<Vec<u32>> {
        let tag = self.rounds[r].tags[bucket * self.capacity + slot as usize];
        if r == 0 {
            return Some(vec![tag.leaf_index()]);
        }
        let (parent, s0, s1) = self.layout.unpack(tag);
        join(
            self.indices(r - 1, parent as usize, s0)?,
            self.indices(r - 1, parent as usize, s1)?,
        )
    }
}

/// Concatenates two sibling index lists, smallest leading index first.
fn join(a: Vec<u32>, b: Vec<u32>) -> Option<Vec<u32>> {
    let (mut first, second) = match a[0].cmp(&b[0]) {
        std::cmp::Ordering::Less => (a, b),
        std::cmp::Ordering::Greater => (b, a),
        std::cmp::Ordering::Equal => return None,
    };
    first.extend(second);
    Some(first)
}

pub(super) fn run<S: Sink>(
    registered: &Registered,
    state: &Blake2bState,
    sink: &mut S,
) -> Result<(), Halt> {
    let mut solver = BucketSolver::new(registered, state);
    solver.digit0(sink)?;
    debug!(dropped = solver.dropped, "Generated initial buckets");

    for r in 1..registered.params.k as usize {
        sink.poll()?;
        solver.digit(r);
    }

    sink.poll()?;
    let last = registered.params.k as usize - 1;
    let candidates = solver.digit_k();
    debug!(candidates = candidates.len(), "Final round complete");

    for (bucket, s0, s1) in candidates {
        let indices = solver
            .indices(last, bucket, s0)
            .zip(solver.indices(last, bucket, s1))
            .and_then(|(a, b)| join(a, b));
        match indices {
            Some(indices) => sink.submit(indices)?,
            None => trace!(bucket, s0, s1, "Discarding candidate with repeated leaves"),
        }
    }

    Ok(())
}
