//! The linear congruential generator used throughout training.

use crate::real;

/// A 64-bit LCG, `x' = x * 25214903917 + 11` (wrapping).
///
/// State is always explicit: the trainer seeds one for weight initialisation
/// and each worker owns its own, so runs with the same seed are reproducible.
#[derive(Debug, Clone)]
pub struct Rng(u64);

impl Rng {
    pub fn new(seed: u64) -> Self {
        Rng(seed)
    }

    pub fn rand_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(25214903917).wrapping_add(11);
        self.0
    }

    /// Get a uniformly distributed random number in `0.0 .. 1.0`, with
    /// 16 bits of resolution.
    pub fn rand_real(&mut self) -> real {
        (self.rand_u64() & 0xFFFF) as real / 65536.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_from_zero() {
        let mut rng = Rng::new(0);
        assert_eq!(rng.rand_u64(), 11);
        assert_eq!(rng.rand_u64(), 11 * 25214903917 + 11);
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = Rng::new(42);
        let mut b = Rng::new(42);
        for _ in 0..100 {
            assert_eq!(a.rand_u64(), b.rand_u64());
        }
    }

    #[test]
    fn rand_real_range() {
        let mut rng = Rng::new(7);
        for _ in 0..10_000 {
            let x = rng.rand_real();
            assert!((0.0..1.0).contains(&x));
        }
    }
}
