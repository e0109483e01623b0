//! Equihash is a Proof-of-Work algorithm, based on a generalization of the Birthday
//! problem which finds colliding hash values. It was designed to be memory-hard; more
//! specifically, the bottle-neck for parallel implementations of Equihash solvers would
//! be memory bandwidth.
//!
//! This crate implements Equihash as specified for the Zcash consensus rules:
//!
//! - [`is_valid_solution`] and [`verify`] check solutions. `is_valid_solution` accepts
//!   any valid `(n, k)` parameters, as long as the row indices are no larger than 25
//!   bits; `verify` accepts the registered parameter sets `(48, 5)`, `(96, 5)`,
//!   `(144, 5)` and `(200, 9)`.
//! - [`Solver`] and [`solve`] search for solutions, using either a collision-list or a
//!   bucket-based algorithm (see [`Algorithm`]).
//! - [`indices_from_solution`] and [`solution_from_indices`] convert between the
//!   minimal encoding of a solution and its leaf indices.
//!
//! Verification is the sole source of truth for validity. Solver candidates are
//! always re-checked by the verifier before they are reported.
//!
#![cfg_attr(feature = "std", doc = "## Feature flags")]
#![cfg_attr(feature = "std", doc = document_features::document_features!())]
//!
//! References
//! ==========
//! - [Section 7.6.1: Equihash.] Zcash Protocol Specification, version 2020.1.10 or later.
//! - Alex Biryukov and Dmitry Khovratovich.
//!   [*Equihash: Asymmetric Proof-of-Work Based on the Generalized Birthday Problem.*][BK16]
//!   NDSS ’16.
//!
//! [Section 7.6.1: Equihash.]: https://zips.z.cash/protocol/protocol.pdf#equihash
//! [BK16]: https://www.internetsociety.org/sites/default/files/blogs-media/equihash-asymmetric-proof-of-work-based-generalized-birthday-problem.pdf

// Catch documentation errors caused by code changes.
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![cfg_attr(docsrs, doc(auto_cfg))]

mod digest;
mod error;
mod minimal;
mod params;
mod solver;
mod verify;

#[cfg(test)]
mod test_vectors;

pub use digest::{nonce_bytes, NONCE_LENGTH, ZCASH_PERSONALIZATION};
pub use error::{Error, Kind};
pub use solver::{solve, Algorithm, Candidate, Control, Outcome, Solver, SolverConfig};
pub use verify::{is_valid_solution, verify, verify_with_personalization};

use params::Params;

/// Decodes a minimally-encoded solution for the registered parameters `(n, k)` into
/// its `2^k` leaf indices.
pub fn indices_from_solution(n: u32, k: u32, soln: &[u8]) -> Result<Vec<u32>, Error> {
    let p = Params::registered(n, k)?.params;
    minimal::indices_from_minimal(p, soln).ok_or(Error(Kind::SolutionSizeMismatch))
}

/// Encodes the `2^k` leaf indices of a solution for the registered parameters
/// `(n, k)`.
pub fn solution_from_indices(n: u32, k: u32, indices: &[u32]) -> Result<Vec<u8>, Error> {
    let p = Params::registered(n, k)?.params;
    if indices.len() != p.solution_index_count() {
        return Err(Error(Kind::IndexCountMismatch));
    }
    if indices.iter().any(|i| *i >= p.initial_list_size()) {
        return Err(Error(Kind::IndexOutOfRange));
    }
    Ok(minimal::minimal_from_indices(p, indices))
}

#[cfg(test)]
mod tests {
    use super::{indices_from_solution, solution_from_indices, Kind};
    use crate::test_vectors::VALID_INDICES;

    #[test]
    fn solution_codec() {
        let soln = solution_from_indices(96, 5, VALID_INDICES).unwrap();
        assert_eq!(soln.len(), 68);
        assert_eq!(hex::encode(&soln[..4]), "046a8ed4");
        assert_eq!(indices_from_solution(96, 5, &soln).unwrap(), VALID_INDICES);
    }

    #[test]
    fn solution_codec_errors() {
        assert_eq!(
            solution_from_indices(96, 5, &VALID_INDICES[1..])
                .unwrap_err()
                .kind(),
            Kind::IndexCountMismatch
        );
        let mut too_big = VALID_INDICES.to_vec();
        too_big[3] = 1 << 17;
        assert_eq!(
            solution_from_indices(96, 5, &too_big).unwrap_err().kind(),
            Kind::IndexOutOfRange
        );
        assert_eq!(
            solution_from_indices(96, 4, VALID_INDICES)
                .unwrap_err()
                .kind(),
            Kind::UnknownParams
        );
        assert_eq!(
            indices_from_solution(96, 5, &[0; 67]).unwrap_err().kind(),
            Kind::SolutionSizeMismatch
        );
    }
}
