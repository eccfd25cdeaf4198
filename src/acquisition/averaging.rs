//! Multi-frame averaging
//!
//! Holds the most recent calibrated traces of one channel and produces their
//! per-sample arithmetic mean.

use std::collections::VecDeque;

/// Bounded queue of single-channel traces
#[derive(Debug, Clone, Default)]
pub struct AveragingAccumulator {
    frames: VecDeque<Vec<f64>>,
}

impl AveragingAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame, dropping the oldest ones beyond `depth`
    ///
    /// A frame whose length differs from the held frames (the trace size
    /// changed) starts a new average.
    pub fn push(&mut self, frame: Vec<f64>, depth: usize) {
        if self
            .frames
            .front()
            .map(|held| held.len() != frame.len())
            .unwrap_or(false)
        {
            self.frames.clear();
        }

        self.frames.push_back(frame);
        while self.frames.len() > depth.max(1) {
            self.frames.pop_front();
        }
    }

    /// Per-sample mean over the held frames
    pub fn mean(&self) -> Vec<f64> {
        let Some(first) = self.frames.front() else {
            return Vec::new();
        };
        let count = self.frames.len() as f64;
        (0..first.len())
            .map(|j| self.frames.iter().map(|frame| frame[j]).sum::<f64>() / count)
            .collect()
    }

    /// Number of frames held
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_held_frames() {
        let mut acc = AveragingAccumulator::new();
        acc.push(vec![1.0, 2.0], 3);
        acc.push(vec![3.0, 4.0], 3);
        assert_eq!(acc.mean(), vec![2.0, 3.0]);
    }

    #[test]
    fn test_oldest_evicted() {
        let mut acc = AveragingAccumulator::new();
        for v in [1.0, 2.0, 3.0, 4.0] {
            acc.push(vec![v], 2);
        }
        assert_eq!(acc.depth(), 2);
        assert_eq!(acc.mean(), vec![3.5]);
    }

    #[test]
    fn test_depth_one_is_identity() {
        let mut acc = AveragingAccumulator::new();
        acc.push(vec![5.0, -5.0], 1);
        acc.push(vec![1.0, 2.0], 1);
        assert_eq!(acc.mean(), vec![1.0, 2.0]);
    }

    #[test]
    fn test_length_change_restarts() {
        let mut acc = AveragingAccumulator::new();
        acc.push(vec![1.0, 1.0], 4);
        acc.push(vec![3.0, 3.0, 3.0], 4);
        assert_eq!(acc.depth(), 1);
        assert_eq!(acc.mean(), vec![3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_empty_mean() {
        assert!(AveragingAccumulator::new().mean().is_empty());
    }
}
