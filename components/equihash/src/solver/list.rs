//! The collision-list solver.

use blake2b_simd::State as Blake2bState;
use tracing::debug;

#[cfg(feature = "multicore")]
use rayon::prelude::*;

use super::{Halt, Sink};
use crate::{
    digest::{generate_hash, leaf_slice},
    minimal::expand_array,
    params::Params,
};

#[derive(Clone)]
struct Row {
    hash: Vec<u8>,
    indices: Vec<u32>,
}

impl Row {
    fn from_children(a: &Row, b: &Row, trim: usize) -> Self {
        let hash: Vec<_> = a
            .hash
            .iter()
            .zip(b.hash.iter())
            .skip(trim)
            .map(|(a, b)| a ^ b)
            .collect();
        Row {
            hash,
            indices: join(a, b),
        }
    }

    fn indices_before(&self, other: &Row) -> bool {
        self.indices[0] < other.indices[0]
    }
}

/// Concatenates the index lists of `a` and `b`, smallest leading index first.
fn join(a: &Row, b: &Row) -> Vec<u32> {
    let (first, second) = if a.indices_before(b) { (a, b) } else { (b, a) };
    let mut indices = Vec::with_capacity(a.indices.len() + b.indices.len());
    indices.extend(first.indices.iter());
    indices.extend(second.indices.iter());
    indices
}

fn has_collision(a: &Row, b: &Row, len: usize) -> bool {
    a.hash
        .iter()
        .zip(b.hash.iter())
        .take(len)
        .all(|(a, b)| a == b)
}

fn distinct_indices(a: &Row, b: &Row) -> bool {
    for i in &(a.indices) {
        for j in &(b.indices) {
            if i == j {
                return false;
            }
        }
    }
    true
}

/// Returns the length of the run at the start of `rows` whose first `len` hash bytes
/// match.
fn run_length(rows: &[Row], len: usize) -> usize {
    1 + rows[1..]
        .iter()
        .take_while(|row| has_collision(&rows[0], row, len))
        .count()
}

fn block_rows(p: &Params, state: &Blake2bState, block: u32) -> Vec<Row> {
    let per_block = p.indices_per_hash_output();
    let hash = generate_hash(state, block);
    (block * per_block..(block + 1) * per_block)
        .take_while(|i| *i < p.initial_list_size())
        .map(|i| Row {
            hash: expand_array(leaf_slice(p, &hash, i), p.collision_bit_length(), 0),
            indices: vec![i],
        })
        .collect()
}

fn block_count(p: &Params) -> u32 {
    let per_block = p.indices_per_hash_output();
    (p.initial_list_size() + per_block - 1) / per_block
}

#[cfg(not(feature = "multicore"))]
fn initial_rows<S: Sink>(
    p: &Params,
    state: &Blake2bState,
    sink: &mut S,
) -> Result<Vec<Row>, Halt> {
    let mut rows = Vec::with_capacity(p.initial_list_size() as usize);
    for block in 0..block_count(p) {
        sink.poll()?;
        rows.extend(block_rows(p, state, block));
    }
    Ok(rows)
}

#[cfg(feature = "multicore")]
fn initial_rows<S: Sink>(
    p: &Params,
    state: &Blake2bState,
    sink: &mut S,
) -> Result<Vec<Row>, Halt> {
    sink.poll()?;
    let blocks: Vec<Vec<Row>> = (0..block_count(p))
        .into_par_iter()
        .map(|block| block_rows(p, state, block))
        .collect();
    sink.poll()?;
    Ok(blocks.into_iter().flatten().collect())
}

/// Merges every disjoint pair in each run of rows sharing a leading digit.
fn collide(rows: &[Row], trim: usize) -> Vec<Row> {
    let mut next = Vec::with_capacity(rows.len());
    let mut i = 0;
    while i < rows.len() {
        let j = run_length(&rows[i..], trim);
        for l in 0..j - 1 {
            for m in l + 1..j {
                let (a, b) = (&rows[i + l], &rows[i + m]);
                if distinct_indices(a, b) {
                    next.push(Row::from_children(a, b, trim));
                }
            }
        }
        i += j;
    }
    next
}

pub(super) fn run<S: Sink>(p: &Params, state: &Blake2bState, sink: &mut S) -> Result<(), Halt> {
    let trim = p.collision_byte_length();
    let mut rows = initial_rows(p, state, sink)?;
    debug!(rows = rows.len(), "Generated initial list");

    for r in 1..p.k {
        sink.poll()?;
        rows.sort_by(|a, b| a.hash.cmp(&b.hash));
        rows = collide(&rows, trim);
        debug!(round = r, rows = rows.len(), "Collision round complete");
        if rows.is_empty() {
            return Ok(());
        }
    }

    // The remaining two digits must collide completely.
    sink.poll()?;
    rows.sort_by(|a, b| a.hash.cmp(&b.hash));
    let mut i = 0;
    while i < rows.len() {
        let j = run_length(&rows[i..], rows[i].hash.len());
        for l in 0..j - 1 {
            for m in l + 1..j {
                let (a, b) = (&rows[i + l], &rows[i + m]);
                if distinct_indices(a, b) {
                    let indices = join(a, b);
                    debug_assert_eq!(indices.len(), p.solution_index_count());
                    sink.submit(indices)?;
                }
            }
        }
        i += j;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{collide, join, run, run_length, Row};
    use crate::digest::{nonce_bytes, seeded_state, ZCASH_PERSONALIZATION};
    use crate::params::Params;
    use crate::solver::testing::Recorder;
    use crate::verify::check_indices;

    fn row(hash: &[u8], indices: &[u32]) -> Row {
        Row {
            hash: hash.to_vec(),
            indices: indices.to_vec(),
        }
    }

    #[test]
    fn wagner_ordering() {
        let a = row(&[1, 2], &[7, 3]);
        let b = row(&[1, 3], &[5, 9]);
        assert_eq!(join(&a, &b), vec![5, 9, 7, 3]);
        assert_eq!(join(&b, &a), vec![5, 9, 7, 3]);

        let merged = Row::from_children(&a, &b, 1);
        assert_eq!(merged.hash, vec![1]);
        assert_eq!(merged.indices, vec![5, 9, 7, 3]);
    }

    #[test]
    fn runs_and_collisions() {
        let rows = vec![
            row(&[0, 1], &[0]),
            row(&[0, 2], &[1]),
            row(&[0, 3], &[2]),
            row(&[1, 1], &[3]),
            row(&[2, 4], &[4]),
            row(&[2, 4], &[4]),
        ];
        assert_eq!(run_length(&rows, 1), 3);
        assert_eq!(run_length(&rows[3..], 1), 1);
        assert_eq!(run_length(&rows[4..], 2), 2);

        // Three pairs from the first run; the shared index rejects the last run.
        let next = collide(&rows, 1);
        assert_eq!(next.len(), 3);
        assert_eq!(next[0].hash, vec![3]);
        assert_eq!(next[0].indices, vec![0, 1]);
        assert_eq!(next[2].indices, vec![1, 2]);
    }

    #[test]
    fn candidates_are_wagner_ordered() {
        let p = Params::new(48, 5).unwrap();
        let mut recorder = Recorder::default();
        for nonce in 0..8 {
            let state = seeded_state(&p, &ZCASH_PERSONALIZATION, b"list", &nonce_bytes(nonce));
            recorder.candidates.clear();
            run(&p, &state, &mut recorder).unwrap();
            for indices in &recorder.candidates {
                // The list solver rejects overlapping merges, so every candidate is valid.
                check_indices(&p, &state, indices).unwrap();
            }
        }
        // Every round polls at least once.
        assert!(recorder.polls >= 8 * 5);
    }
}
