//! Logic-level conditioning for digital mode
//!
//! Each raw sample pair is pushed into a short shift register. The
//! population standard deviation of each channel over the register decides
//! the logic level: below the threshold is `0`, anything else is `1`.

use crate::config::{DIG_SIG_THR, DIG_SR_SIZE};
use crate::types::{RawSample, Sample};
use std::collections::VecDeque;

/// Rolling RMS estimator producing logic levels
#[derive(Debug, Clone)]
pub struct DigitalConditioner {
    register: VecDeque<RawSample>,
    size: usize,
    threshold: f64,
}

impl Default for DigitalConditioner {
    fn default() -> Self {
        Self::new(DIG_SR_SIZE, DIG_SIG_THR)
    }
}

impl DigitalConditioner {
    /// Create a conditioner with a custom register length and threshold
    pub fn new(size: usize, threshold: f64) -> Self {
        Self {
            register: VecDeque::with_capacity(size + 1),
            size: size.max(1),
            threshold,
        }
    }

    /// Push one raw pair and return the logic levels for both channels
    pub fn condition(&mut self, raw: RawSample) -> Sample {
        self.register.push_back(raw);
        if self.register.len() > self.size {
            self.register.pop_front();
        }

        let n = self.register.len() as f64;
        let (mut m1, mut m2, mut s1, mut s2) = (0.0, 0.0, 0.0, 0.0);
        for sample in &self.register {
            let (a, b) = (sample.ch1 as f64, sample.ch2 as f64);
            m1 += a;
            m2 += b;
            s1 += a * a;
            s2 += b * b;
        }
        m1 /= n;
        m2 /= n;
        let var1 = s1 / n - m1 * m1;
        let var2 = s2 / n - m2 * m2;

        Sample::new(self.level(var1), self.level(var2))
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.register.len()
    }

    pub fn is_empty(&self) -> bool {
        self.register.is_empty()
    }

    fn level(&self, variance: f64) -> f64 {
        // Rounding can push a zero variance slightly negative
        if variance.max(0.0).sqrt() < self.threshold {
            0.0
        } else {
            1.0
        }
    }
}
