use rand::rngs::SmallRng;
use rand::SeedableRng;

/// Deterministic, cross-platform RNG seeded from a fixed 64-bit constant.
///
/// `SmallRng` is xoshiro256** under the hood, which is specified bit-for-bit
/// and therefore reproduces identical output on every rank/process given the
/// same seed -- unlike relying on libc `rand()` or an OS-entropy source.
/// Never seed this from `0`/entropy in core code: every rank must derive the
/// same hash family without coordination.
pub fn create_rng(seed: u64) -> SmallRng {
    SmallRng::seed_from_u64(seed)
}
