//! Table lookup for the logistic function.

use crate::real;

pub const EXP_TABLE_SIZE: usize = 1000;

/// Dot products at or beyond `±MAX_EXP` are treated as saturated.
pub const MAX_EXP: real = 6.0;

/// `1 / (1 + e^-x)` precomputed at `EXP_TABLE_SIZE` points spanning
/// `[-MAX_EXP, MAX_EXP)`. Built once and shared read-only by all workers.
#[derive(Debug, Clone)]
pub struct ExpTable {
    table: Vec<real>,
}

impl Default for ExpTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpTable {
    pub fn new() -> Self {
        let table = (0..EXP_TABLE_SIZE)
            .map(|i| {
                let x = (i as real / EXP_TABLE_SIZE as real * 2.0 - 1.0) * MAX_EXP;
                let e = (x as f64).exp() as real; // Precompute the exp() table
                e / (e + 1.0) // Precompute f(x) = x / (x + 1)
            })
            .collect();
        ExpTable { table }
    }

    /// Approximate the logistic function for `x` in `[-MAX_EXP, MAX_EXP]`.
    /// Callers handle the saturated range themselves.
    pub fn sigmoid(&self, x: real) -> real {
        debug_assert!((-MAX_EXP..=MAX_EXP).contains(&x), "{x} is out of range");
        let i = ((x + MAX_EXP) * (EXP_TABLE_SIZE as real / MAX_EXP / 2.0)) as usize;
        self.table[i.min(EXP_TABLE_SIZE - 1)]
    }
}
