use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;

/// Odd multiplier spreading generation and slot indices across the seed space.
const DERIVATION_PRIME: u64 = 0x9E37_79B9_7F4A_7C15;

/// Create a deterministic RNG from a seed.
pub fn create_rng(seed: u64) -> ChaCha12Rng {
    ChaCha12Rng::seed_from_u64(seed)
}

/// Seed of the simulation stream used to evaluate population slot `slot` in `generation`.
pub fn derive_seed(base_seed: u64, generation: usize, slot: usize) -> u64 {
    base_seed
        .wrapping_add((generation as u64 + 1).wrapping_mul(DERIVATION_PRIME))
        .wrapping_add((slot as u64).wrapping_mul(DERIVATION_PRIME.rotate_left(17)))
}
