//! Rolling statistics over the most recent weight samples.
//!
//! Fixed-capacity ring with running sum and sum-of-squares, so `push`,
//! `mean` and `stddev` are all O(1). The stddev is the population form
//! `sqrt(max(E[x^2] - E[x]^2, 0))`; with fewer than two samples it reports
//! `f64::INFINITY` so a stability threshold can never be satisfied by an
//! under-filled buffer.

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub mean: f64,
    pub stddev: f64,
    pub count: usize,
}

#[derive(Debug)]
pub struct StabilityBuffer {
    buf: Vec<f64>,
    next: usize,
    len: usize,
    sum: f64,
    sum_sq: f64,
}

impl StabilityBuffer {
    /// Capacity is clamped to at least 2; a single-slot buffer could never
    /// produce a finite stddev.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(2);
        Self {
            buf: vec![0.0; capacity],
            next: 0,
            len: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// O(1) insert; overwrites the oldest sample when full.
    pub fn push(&mut self, sample: f64) {
        if self.len == self.buf.len() {
            let evicted = self.buf[self.next];
            self.sum -= evicted;
            self.sum_sq -= evicted * evicted;
        } else {
            self.len += 1;
        }
        self.buf[self.next] = sample;
        self.sum += sample;
        self.sum_sq += sample * sample;
        self.next = (self.next + 1) % self.buf.len();
    }

    /// Arithmetic mean over the valid entries; 0.0 when empty.
    pub fn mean(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.sum / self.len as f64
    }

    /// Population standard deviation over the valid entries.
    pub fn stddev(&self) -> f64 {
        if self.len < 2 {
            return f64::INFINITY;
        }
        let mean = self.mean();
        let var = (self.sum_sq / self.len as f64 - mean * mean).max(0.0);
        var.sqrt()
    }

    /// Reset to empty without reallocating.
    pub fn clear(&mut self) {
        self.next = 0;
        self.len = 0;
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }

    pub fn stats(&self) -> Stats {
        Stats {
            mean: self.mean(),
            stddev: self.stddev(),
            count: self.len,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_buffer_reports_zero_mean_and_sentinel_stddev() {
        let buf = StabilityBuffer::new(10);
        assert_eq!(buf.mean(), 0.0);
        assert!(buf.stddev().is_infinite());
    }

    #[test]
    fn single_sample_keeps_sentinel_stddev() {
        let mut buf = StabilityBuffer::new(10);
        buf.push(5.0);
        assert_eq!(buf.mean(), 5.0);
        assert!(buf.stddev().is_infinite());
        assert!(!(buf.stddev() < 1e9), "sentinel must never satisfy a threshold");
    }

    #[test]
    fn identical_samples_have_zero_stddev() {
        let mut buf = StabilityBuffer::new(10);
        for _ in 0..10 {
            buf.push(3.25);
        }
        assert_eq!(buf.stddev(), 0.0);
        assert_eq!(buf.mean(), 3.25);
    }

    #[test]
    fn overwrites_oldest_when_full() {
        let mut buf = StabilityBuffer::new(4);
        for v in [1.0, 2.0, 3.0, 4.0, 5.0, 6.0] {
            buf.push(v);
        }
        // Window is now [3, 4, 5, 6].
        assert_eq!(buf.len(), 4);
        assert!((buf.mean() - 4.5).abs() < 1e-12);
    }

    #[test]
    fn stddev_matches_direct_computation() {
        let samples = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let mut buf = StabilityBuffer::new(8);
        for s in samples {
            buf.push(s);
        }
        // Classic textbook set with population stddev exactly 2.
        assert!((buf.stddev() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn clear_resets_statistics() {
        let mut buf = StabilityBuffer::new(4);
        buf.push(10.0);
        buf.push(12.0);
        buf.clear();
        assert!(buf.is_empty());
        assert_eq!(buf.mean(), 0.0);
        assert!(buf.stddev().is_infinite());
        buf.push(1.0);
        buf.push(1.0);
        assert_eq!(buf.stddev(), 0.0);
    }
}
