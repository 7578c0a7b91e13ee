//! Reusable pool of square scratch matrices.
//!
//! One pool serves one RHS evaluation (or one rayon worker inside an
//! evaluation). Buffers handed back with [`ScratchPool::give`] are reused by
//! later calls to [`ScratchPool::take`] instead of reaching for the allocator
//! again, which matters inside the O(N⁶) dissipator loop.

use ndarray as nd;

/// Free list of `n × n` real matrices.
#[derive(Clone, Debug)]
pub struct ScratchPool {
    n: usize,
    free: Vec<nd::Array2<f64>>,
    allocated: usize,
}

impl ScratchPool {
    /// Create an empty pool for `n × n` matrices.
    pub fn new(n: usize) -> Self {
        Self { n, free: Vec::new(), allocated: 0 }
    }

    fn alloc(&mut self) -> nd::Array2<f64> {
        self.allocated += 1;
        nd::Array2::zeros((self.n, self.n))
    }

    /// Dimension of the matrices in this pool.
    pub fn dim(&self) -> usize { self.n }

    /// Take a buffer whose contents are unspecified.
    ///
    /// Every operation in this crate that receives a taken buffer as output
    /// overwrites it completely.
    pub fn take(&mut self) -> nd::Array2<f64> {
        self.free.pop().unwrap_or_else(|| self.alloc())
    }

    /// Take a buffer filled with zeros.
    pub fn take_zeroed(&mut self) -> nd::Array2<f64> {
        let mut buf = self.take();
        buf.fill(0.0);
        buf
    }

    /// Return a buffer to the pool. Buffers of the wrong shape are dropped.
    pub fn give(&mut self, buf: nd::Array2<f64>) {
        if buf.dim() == (self.n, self.n) {
            self.free.push(buf);
        }
    }

    /// Total number of buffers this pool has ever allocated.
    pub fn allocated(&self) -> usize { self.allocated }
}
