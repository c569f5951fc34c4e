//! Atomic `f64` cells for the scatter-add kernels.
//!
//! Rust has no native floating-point atomics, so adds go through the bit
//! pattern in an `AtomicU64` with a compare-exchange retry loop. The
//! permuted MTTKRP kernel additionally uses a cheap non-atomic-style add
//! for rows it can prove exclusive to one block; a lost update there is
//! impossible by construction, and the relaxed load/store pair costs one
//! retry loop less than a real atomic add.

use kruskal_core::Real;
use std::sync::atomic::{AtomicU64, Ordering};

/// A `Real` value supporting concurrent adds.
#[derive(Debug)]
pub struct AtomicF64(AtomicU64);

impl AtomicF64 {
    pub fn new(v: Real) -> Self {
        Self(AtomicU64::new(v.to_bits()))
    }

    #[inline]
    pub fn load(&self) -> Real {
        Real::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Atomic `self += v`.
    #[inline]
    pub fn fetch_add(&self, v: Real) {
        let mut cur = self.0.load(Ordering::Relaxed);
        loop {
            let next = (Real::from_bits(cur) + v).to_bits();
            match self
                .0
                .compare_exchange_weak(cur, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return,
                Err(actual) => cur = actual,
            }
        }
    }

    /// Non-synchronizing `self += v`. Correct only while no other worker
    /// touches this cell; used for block-interior rows of the permuted
    /// kernel.
    #[inline]
    pub fn plain_add(&self, v: Real) {
        let cur = Real::from_bits(self.0.load(Ordering::Relaxed));
        self.0.store((cur + v).to_bits(), Ordering::Relaxed);
    }
}

/// A zeroed scatter buffer of `len` cells.
pub fn zero_buffer(len: usize) -> Vec<AtomicF64> {
    (0..len).map(|_| AtomicF64::new(0.0)).collect()
}
