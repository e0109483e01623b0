use std::fmt;

/// An Equihash operation was given invalid parameters, or a solution failed to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Error(pub(crate) Kind);

impl Error {
    /// Returns the reason for this error.
    pub fn kind(&self) -> Kind {
        self.0
    }

    /// Returns `true` if this error is a structural verification failure, as opposed to
    /// a problem with the parameters or the shape of the input.
    pub fn is_invalid_solution(&self) -> bool {
        matches!(
            self.0,
            Kind::Duplicate | Kind::OutOfOrder | Kind::NonZeroXor
        )
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_invalid_solution() {
            write!(f, "Invalid solution: {}", self.0)
        } else {
            write!(f, "Invalid input: {}", self.0)
        }
    }
}

impl std::error::Error for Error {}

/// The closed set of reasons an Equihash operation can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// `(n, k)` is not a supported parameter set.
    UnknownParams,
    /// The header to be hashed is empty.
    InvalidHeaderLength,
    /// The encoded solution does not have the length implied by `(n, k)`.
    SolutionSizeMismatch,
    /// The number of indices is not `2^k`.
    IndexCountMismatch,
    /// An index does not fit in `n / (k + 1) + 1` bits.
    IndexOutOfRange,
    /// The solution contains the same index more than once.
    Duplicate,
    /// A subtree's first index is not smaller than its sibling's.
    OutOfOrder,
    /// The hashes of a subtree do not XOR to zero over the collided bits.
    NonZeroXor,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Kind::UnknownParams => f.write_str("unknown parameters"),
            Kind::InvalidHeaderLength => f.write_str("invalid header length"),
            Kind::SolutionSizeMismatch => f.write_str("solution size mismatch"),
            Kind::IndexCountMismatch => f.write_str("wrong number of indices"),
            Kind::IndexOutOfRange => f.write_str("index out of range"),
            Kind::Duplicate => f.write_str("duplicate indices"),
            Kind::OutOfOrder => f.write_str("index tree incorrectly ordered"),
            Kind::NonZeroXor => f.write_str("hashes do not collide"),
        }
    }
}
