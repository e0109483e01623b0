use crate::error::{Error, Kind};

/// Equihash parameters `(n, k)`, together with every length derived from them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Params {
    pub(crate) n: u32,
    pub(crate) k: u32,
}

/// Per-parameter tuning for the bucket solver.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Registered {
    pub(crate) params: Params,
    /// Digit bits below the bucket-selecting prefix.
    pub(crate) rest_bits: u32,
    /// Slot capacity multiplier, as a fraction `(numerator, denominator)`.
    pub(crate) save_mem: (u32, u32),
}

/// The parameter sets the solvers are registered for.
pub(crate) const REGISTRY: &[Registered] = &[
    Registered {
        params: Params { n: 48, k: 5 },
        rest_bits: 4,
        save_mem: (1, 1),
    },
    Registered {
        params: Params { n: 96, k: 5 },
        rest_bits: 8,
        save_mem: (1, 1),
    },
    Registered {
        params: Params { n: 144, k: 5 },
        rest_bits: 8,
        save_mem: (9, 14),
    },
    Registered {
        params: Params { n: 200, k: 9 },
        rest_bits: 8,
        save_mem: (9, 14),
    },
];

impl Params {
    /// Returns `None` if the parameters are invalid.
    pub(crate) fn new(n: u32, k: u32) -> Option<Self> {
        // We place the following requirements on the parameters:
        // - n is a multiple of 8, so the hash output has an exact byte length.
        // - k >= 3 so the encoded solutions have an exact byte length.
        // - k < n, so the collision bit length is at least 1.
        // - n is a multiple of k + 1, so we have an integer collision bit length.
        // - indices fit in the 32-bit accumulator used to pack them.
        // - the solution length in bits fits in a usize.
        if (n % 8 == 0) && (k >= 3) && (k < n) && (n % (k + 1) == 0) {
            let p = Params { n, k };
            let solution_bits = 1usize
                .checked_shl(k)
                .and_then(|count| count.checked_mul(p.collision_bit_length() + 1));
            if (8..=24).contains(&p.collision_bit_length())
                && n <= 512
                && solution_bits.is_some()
            {
                return Some(p);
            }
        }
        None
    }

    /// Looks up `(n, k)` in the registry of supported parameter sets.
    pub(crate) fn registered(n: u32, k: u32) -> Result<Registered, Error> {
        REGISTRY
            .iter()
            .find(|r| r.params.n == n && r.params.k == k)
            .copied()
            .ok_or(Error(Kind::UnknownParams))
    }

    pub(crate) fn indices_per_hash_output(&self) -> u32 {
        512 / self.n
    }
    pub(crate) fn hash_output(&self) -> u8 {
        (self.indices_per_hash_output() * self.n / 8) as u8
    }
    pub(crate) fn collision_bit_length(&self) -> usize {
        (self.n / (self.k + 1)) as usize
    }
    pub(crate) fn collision_byte_length(&self) -> usize {
        (self.collision_bit_length() + 7) / 8
    }
    pub(crate) fn hash_length(&self) -> usize {
        ((self.k as usize) + 1) * self.collision_byte_length()
    }
    /// Number of leaf indices in a solution.
    pub(crate) fn solution_index_count(&self) -> usize {
        1 << self.k
    }
    /// Number of leaves the solvers generate, `2^(collision_bit_length + 1)`.
    pub(crate) fn initial_list_size(&self) -> u32 {
        1 << (self.collision_bit_length() + 1)
    }
    /// Length in bytes of a minimally-encoded solution.
    pub(crate) fn solution_size(&self) -> usize {
        // Division is exact because k >= 3.
        (self.solution_index_count() * (self.collision_bit_length() + 1)) / 8
    }
}

impl Registered {
    pub(crate) fn bucket_bits(&self) -> u32 {
        self.params.collision_bit_length() as u32 - self.rest_bits
    }
    pub(crate) fn bucket_count(&self) -> usize {
        1 << self.bucket_bits()
    }
    /// Twice the expected number of entries per bucket, scaled by the memory saving
    /// factor.
    pub(crate) fn slot_capacity(&self) -> usize {
        let expected = 1usize << (self.rest_bits + 1);
        let (num, den) = self.save_mem;
        2 * expected * num as usize / den as usize
    }
}
