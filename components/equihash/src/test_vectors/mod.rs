mod invalid;

pub(crate) use invalid::INVALID_TEST_VECTORS;

pub(crate) const VALID_INPUT: &[u8] =
    b"Equihash is an asymmetric PoW based on the Generalised Birthday problem.";

/// A solution for `(n, k) = (96, 5)`, `VALID_INPUT` and nonce 1.
pub(crate) const VALID_INDICES: &[u32] = &[
    2261, 15185, 36112, 104243, 23779, 118390, 118332, 130041, 32642, 69878, 76925, 80080, 45858,
    116805, 92842, 111026, 15972, 115059, 85191, 90330, 68190, 122819, 81830, 91132, 23460, 49807,
    52426, 80391, 69567, 114474, 104973, 122568,
];
