//! # Reproducible random functions
//!
//! This module uses the [`ChaCha8Rng`] RNG from the [rand_chacha] crate
//! to achieve reproducible random number generation.
//!
//! Every penalty calculation takes its random source explicitly. Parallel
//! Monte Carlo runs give each realization its own generator with
//! [`realization_rng`], so that realizations are statistically independent
//! and the results do not depend on how the work is scheduled.
//!
//! # Examples
//! ```
//! # use mmse_penalty::rand::Rng;
//! # use mmse_penalty::rand::*;
//! let seed = 42;
//! let mut rng = Rng::seed_from_u64(seed);
//! assert_eq!(rng.next_u64(), 12578764544318200737);
//! ```
use rand_chacha::ChaCha8Rng;
pub use rand_chacha::rand_core::SeedableRng;
pub use rand_core::RngCore;

/// The RNG used in throughout this crate for algorithms using pseudorandom
/// generation.
pub type Rng = ChaCha8Rng;

/// Returns the RNG for realization number `index` of a run seeded with
/// `seed`.
///
/// All the realizations share the same key and use a different ChaCha
/// stream.
///
/// # Examples
/// ```
/// # use mmse_penalty::rand::*;
/// let mut a = realization_rng(7, 0);
/// let mut b = realization_rng(7, 1);
/// assert_ne!(a.next_u64(), b.next_u64());
/// ```
pub fn realization_rng(seed: u64, index: u64) -> Rng {
    let mut rng = Rng::seed_from_u64(seed);
    rng.set_stream(index);
    rng
}
