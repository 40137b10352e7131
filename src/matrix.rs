//! Weight matrices shared by all training workers without locking.

use std::sync::atomic::{AtomicU32, Ordering};

use aligned_box::AlignedBox;

use crate::{real, Error, Result};

const ALIGNMENT: usize = 128;

/// A weight that worker threads read and write concurrently, stored as the
/// bits of an `f32`. `add` is a plain load then store, so two threads adding
/// to one weight at once may lose an update.
#[derive(Default)]
#[repr(transparent)]
pub(crate) struct Weight(AtomicU32);

impl Weight {
    pub fn load(&self) -> real {
        real::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn store(&self, value: real) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn add(&self, delta: real) {
        self.store(self.load() + delta);
    }
}

/// A dense row-major matrix of [`Weight`] weights with `cols` entries per row.
pub(crate) struct Matrix {
    cols: usize,
    data: AlignedBox<[Weight]>,
}

impl Matrix {
    pub fn zeros(rows: usize, cols: usize) -> Result<Self> {
        let elems = rows * cols;
        let data = AlignedBox::<[Weight]>::slice_from_default(ALIGNMENT, elems)
            .map_err(|_| Error::Allocation { elems })?;
        Ok(Matrix { cols, data })
    }

    #[cfg(test)]
    pub fn rows(&self) -> usize {
        self.data.len() / self.cols
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> &[Weight] {
        &self.data[i * self.cols..][..self.cols]
    }

    /// `row(i) · v`
    pub fn dot(&self, i: usize, v: &[real]) -> real {
        self.row(i).iter().zip(v).map(|(w, &x)| w.load() * x).sum()
    }

    /// `out += g * row(i)`
    pub fn accumulate_scaled(&self, i: usize, g: real, out: &mut [real]) {
        for (o, w) in out.iter_mut().zip(self.row(i)) {
            *o += g * w.load();
        }
    }

    /// `row(i) += g * v`
    pub fn add_scaled(&self, i: usize, g: real, v: &[real]) {
        for (w, &x) in self.row(i).iter().zip(v) {
            w.add(g * x);
        }
    }

    /// `row(i) += v`
    pub fn add_row(&self, i: usize, v: &[real]) {
        for (w, &x) in self.row(i).iter().zip(v) {
            w.add(x);
        }
    }

    pub fn row_to_vec(&self, i: usize) -> Vec<real> {
        self.row(i).iter().map(Weight::load).collect()
    }

    pub fn to_vec(&self) -> Vec<real> {
        self.data.iter().map(Weight::load).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_operations() {
        let m = Matrix::zeros(3, 4).unwrap();
        assert_eq!((m.rows(), m.cols()), (3, 4));
        m.add_row(1, &[1.0, 2.0, 3.0, 4.0]);
        m.add_scaled(1, 0.5, &[2.0, 2.0, 2.0, 2.0]);
        assert_eq!(m.row_to_vec(1), vec![2.0, 3.0, 4.0, 5.0]);
        assert_eq!(m.row_to_vec(0), vec![0.0; 4]);
        assert_eq!(m.dot(1, &[1.0, 0.0, 0.0, 1.0]), 7.0);

        let mut out = vec![1.0; 4];
        m.accumulate_scaled(1, 2.0, &mut out);
        assert_eq!(out, vec![5.0, 7.0, 9.0, 11.0]);

        let all = m.to_vec();
        assert_eq!(all.len(), 12);
        assert_eq!(&all[4..8], &[2.0, 3.0, 4.0, 5.0]);
    }
}
