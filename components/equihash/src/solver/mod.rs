//! Equihash solvers.
//!
//! Two algorithms are available, selected with [`SolverConfig::algorithm`]:
//!
//! - [`Algorithm::List`] merges explicit `(hash, indices)` rows round by round. It is
//!   simple and finds every solution, at the cost of memory that grows with the index
//!   lists.
//! - [`Algorithm::Bucket`] partitions rows into fixed-capacity buckets and records
//!   compact tree tags instead of index lists, reconstructing indices only for final
//!   candidates. Rows that overflow a bucket are dropped, so it may miss solutions.
//!
//! Every candidate either solver produces is checked with the verifier before it is
//! handed to the caller, so emitted solutions always verify.

use std::collections::BTreeSet;

use blake2b_simd::State as Blake2bState;
use tracing::{debug, trace};

use crate::{
    digest::{nonce_bytes, seeded_state, ZCASH_PERSONALIZATION},
    error::{Error, Kind},
    minimal::minimal_from_indices,
    params::Params,
    verify,
};

mod bucket;
mod list;
mod tree;

/// An event reported to the candidate callback of [`Solver::solve`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Candidate<'a> {
    /// The search is still running. Returning [`Control::Stop`] cancels it.
    Poll,
    /// A verified solution, in its minimal encoding.
    Solution(&'a [u8]),
}

/// Returned by the candidate callback to steer the search.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control {
    /// Keep searching.
    Continue,
    /// End the search. See [`Outcome`] for how the search is reported.
    Stop,
}

/// How a call to [`Solver::solve`] ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The whole search space for the nonce was explored.
    Exhausted(usize),
    /// The search ended early, either because the callback returned
    /// [`Control::Stop`] for a solution or because the solution limit was reached.
    Stopped(usize),
    /// The callback returned [`Control::Stop`] for a [`Candidate::Poll`].
    Cancelled,
}

impl Outcome {
    /// The number of solutions passed to the callback, or zero if cancelled.
    pub fn solutions(&self) -> usize {
        match self {
            Outcome::Exhausted(n) | Outcome::Stopped(n) => *n,
            Outcome::Cancelled => 0,
        }
    }
}

/// The solving algorithm.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Algorithm {
    /// Collision lists with explicit index lists.
    List,
    /// Fixed-capacity buckets with compact tree tags.
    ///
    /// Memory is allocated up front and depends only on the parameters: about 86 kB
    /// for `(48, 5)`, 22 MB for `(96, 5)`, 400 MB for `(200, 9)` and 3.6 GB for
    /// `(144, 5)`.
    Bucket,
}

/// Configuration for a [`Solver`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolverConfig {
    pub algorithm: Algorithm,
    /// Upper bound on the solutions reported for a single nonce. With a limit of zero,
    /// the search stops at the first candidate without reporting it.
    pub max_solutions: usize,
    /// The BLAKE2b personalization prefix; `(n, k)` are appended to it.
    pub personalization: [u8; 8],
}

impl Default for SolverConfig {
    fn default() -> Self {
        SolverConfig {
            algorithm: Algorithm::Bucket,
            max_solutions: 8,
            personalization: ZCASH_PERSONALIZATION,
        }
    }
}

/// Why a search ended before exploring everything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Halt {
    Cancelled,
    Stopped,
}

/// Receives progress polls and candidate index trees from a solving algorithm.
pub(crate) trait Sink {
    /// Gives the caller a chance to cancel the search.
    fn poll(&mut self) -> Result<(), Halt>;

    /// Offers a candidate solution. Candidates need not be valid.
    fn submit(&mut self, indices: Vec<u32>) -> Result<(), Halt>;
}

/// Verifies, de-duplicates and encodes candidates before passing them to the callback.
struct Collector<'a, F> {
    p: Params,
    state: &'a Blake2bState,
    on_candidate: F,
    max_solutions: usize,
    seen: BTreeSet<Vec<u32>>,
}

impl<F: FnMut(Candidate<'_>) -> Control> Sink for Collector<'_, F> {
    fn poll(&mut self) -> Result<(), Halt> {
        match (self.on_candidate)(Candidate::Poll) {
            Control::Continue => Ok(()),
            Control::Stop => Err(Halt::Cancelled),
        }
    }

    fn submit(&mut self, indices: Vec<u32>) -> Result<(), Halt> {
        if self.seen.len() >= self.max_solutions {
            return Err(Halt::Stopped);
        }
        if let Err(e) = verify::check_indices(&self.p, self.state, &indices) {
            debug!("Discarding candidate: {}", e);
            return Ok(());
        }
        if self.seen.contains(&indices) {
            trace!("Discarding repeated solution");
            return Ok(());
        }
        self.poll()?;

        let soln = minimal_from_indices(self.p, &indices);
        self.seen.insert(indices);
        if (self.on_candidate)(Candidate::Solution(&soln)) == Control::Stop
            || self.seen.len() >= self.max_solutions
        {
            return Err(Halt::Stopped);
        }
        Ok(())
    }
}

/// An Equihash solver.
#[derive(Clone, Debug, Default)]
pub struct Solver {
    config: SolverConfig,
}

impl Solver {
    pub fn new(config: SolverConfig) -> Self {
        Solver { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Searches for solutions for `header` and `nonce` with the parameters `(n, k)`.
    ///
    /// `on_candidate` is called with [`Candidate::Poll`] at coarse intervals (per
    /// generated hash block, per round, and before every solution), and with each
    /// solution found. Returning [`Control::Stop`] ends the search.
    ///
    /// A nonce may have no solutions; callers should then retry with another nonce,
    /// for example with [`Solver::search`].
    #[tracing::instrument(
        skip(self, header, on_candidate),
        fields(algorithm = ?self.config.algorithm),
    )]
    pub fn solve<F>(
        &self,
        header: &[u8],
        nonce: i64,
        n: u32,
        k: u32,
        on_candidate: F,
    ) -> Result<Outcome, Error>
    where
        F: FnMut(Candidate<'_>) -> Control,
    {
        let registered = Params::registered(n, k)?;
        if header.is_empty() {
            return Err(Error(Kind::InvalidHeaderLength));
        }

        let p = registered.params;
        let state = seeded_state(
            &p,
            &self.config.personalization,
            header,
            &nonce_bytes(nonce),
        );
        let mut collector = Collector {
            p,
            state: &state,
            on_candidate,
            max_solutions: self.config.max_solutions,
            seen: BTreeSet::new(),
        };

        let res = match self.config.algorithm {
            Algorithm::List => list::run(&p, &state, &mut collector),
            Algorithm::Bucket => bucket::run(&registered, &state, &mut collector),
        };

        let found = collector.seen.len();
        let outcome = match res {
            Ok(()) => Outcome::Exhausted(found),
            Err(Halt::Stopped) => Outcome::Stopped(found),
            Err(Halt::Cancelled) => Outcome::Cancelled,
        };
        debug!(?outcome, "Search finished");
        Ok(outcome)
    }

    /// Performs multiple solver runs for `header` with parameters `(n, k)`. Between
    /// each run, obtains a new nonce from `next_nonce`.
    ///
    /// Returns the first nonce that has solutions together with its solutions, or
    /// `None` if `next_nonce` runs out first.
    pub fn search(
        &self,
        header: &[u8],
        n: u32,
        k: u32,
        mut next_nonce: impl FnMut() -> Option<i64>,
    ) -> Result<Option<(i64, Vec<Vec<u8>>)>, Error> {
        loop {
            let nonce = match next_nonce() {
                Some(nonce) => nonce,
                None => break Ok(None),
            };

            let mut solutions = vec![];
            self.solve(header, nonce, n, k, |candidate| {
                if let Candidate::Solution(soln) = candidate {
                    solutions.push(soln.to_vec());
                }
                Control::Continue
            })?;

            if !solutions.is_empty() {
                break Ok(Some((nonce, solutions)));
            }
        }
    }
}

/// Searches for solutions with the default [`SolverConfig`].
///
/// See [`Solver::solve`].
pub fn solve<F>(
    header: &[u8],
    nonce: i64,
    n: u32,
    k: u32,
    on_candidate: F,
) -> Result<Outcome, Error>
where
    F: FnMut(Candidate<'_>) -> Control,
{
    Solver::default().solve(header, nonce, n, k, on_candidate)
}
