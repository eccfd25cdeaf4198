//! Trigger detection
//!
//! The detector compares the newest sample with the previous one on the
//! trigger channel. Analog and voltmeter data use level crossing, digital
//! data uses logic edges.
//!
//! A search is bounded: once the budget of incoming samples is spent the
//! caller renders whatever the window holds and the frame is marked
//! untriggered.

use crate::config::TriggerSettings;
use crate::error::Result;
use crate::types::Sample;

use super::buffer::SlidingWindowBuffer;

/// How a crossing is recognised
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    /// Signal passes through the trigger level
    Level,
    /// Logic level flips between 0 and 1
    Logic,
}

/// Result of a trigger search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    /// A crossing was found after consuming `searched` samples
    Triggered { searched: usize },
    /// The budget ran out without a crossing
    Abandoned { searched: usize },
}

impl TriggerOutcome {
    pub fn is_triggered(&self) -> bool {
        matches!(self, TriggerOutcome::Triggered { .. })
    }
}

/// Edge detector with a bounded search
#[derive(Debug, Clone, Copy)]
pub struct TriggerDetector {
    settings: TriggerSettings,
    kind: TriggerKind,
    budget: usize,
}

impl TriggerDetector {
    /// Create a detector that gives up after `budget` samples
    pub fn new(settings: TriggerSettings, kind: TriggerKind, budget: usize) -> Self {
        Self {
            settings,
            kind,
            budget,
        }
    }

    pub fn kind(&self) -> TriggerKind {
        self.kind
    }

    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Whether the step from `previous` to `current` is a trigger event
    pub fn crossed(&self, previous: &Sample, current: &Sample) -> bool {
        let channel = self.settings.channel;
        let (prev, cur) = (previous.channel(channel), current.channel(channel));
        match self.kind {
            TriggerKind::Level => self.settings.crosses_level(prev, cur),
            TriggerKind::Logic => self.settings.crosses_logic(prev, cur),
        }
    }

    /// Slide `lookback` forward until a crossing or until the budget is spent
    ///
    /// Every sample from `next` is compared against the newest sample held in
    /// `lookback` and then appended. While no crossing is seen the oldest
    /// sample is evicted, so the window keeps its size; the crossing sample
    /// itself is appended without eviction and ends up right after the
    /// pre-trigger samples. An empty window never crosses.
    pub fn search<F>(
        &self,
        lookback: &mut SlidingWindowBuffer,
        mut next: F,
    ) -> Result<TriggerOutcome>
    where
        F: FnMut() -> Result<Sample>,
    {
        let mut searched = 0;
        loop {
            if searched >= self.budget {
                return Ok(TriggerOutcome::Abandoned { searched });
            }

            let sample = next()?;
            searched += 1;

            let crossed = lookback
                .last()
                .map(|previous| self.crossed(previous, &sample))
                .unwrap_or(false);

            if crossed {
                lookback.set_cap(lookback.len() + 1);
                lookback.push(sample);
                return Ok(TriggerOutcome::Triggered { searched });
            }
            lookback.push(sample);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Channel, TriggerEdge};

    fn level_detector(edge: TriggerEdge, level: f64, budget: usize) -> TriggerDetector {
        TriggerDetector::new(
            TriggerSettings {
                channel: Channel::One,
                edge,
                level,
            },
            TriggerKind::Level,
            budget,
        )
    }

    fn feed(values: Vec<f64>) -> impl FnMut() -> Result<Sample> {
        let mut iter = values.into_iter();
        move || Ok(Sample::new(iter.next().unwrap_or(0.0), 0.0))
    }

    #[test]
    fn test_search_finds_rising_crossing() {
        let detector = level_detector(TriggerEdge::Rising, 0.0, 100);
        let mut lookback = SlidingWindowBuffer::new(3);
        for v in [-5.0, -4.0, -3.0] {
            lookback.push(Sample::new(v, 0.0));
        }

        let outcome = detector
            .search(&mut lookback, feed(vec![-2.0, -1.0, 0.5, 2.0]))
            .unwrap();
        assert_eq!(outcome, TriggerOutcome::Triggered { searched: 3 });

        // Window kept its three pre-trigger samples and gained the crossing one
        let values: Vec<f64> = lookback.iter().map(|s| s.ch1).collect();
        assert_eq!(values, vec![-3.0, -2.0, -1.0, 0.5]);
    }

    #[test]
    fn test_search_abandons_after_budget() {
        let detector = level_detector(TriggerEdge::Rising, 100.0, 5);
        let mut lookback = SlidingWindowBuffer::new(2);
        lookback.push(Sample::new(0.0, 0.0));

        let outcome = detector.search(&mut lookback, feed(vec![1.0; 10])).unwrap();
        assert_eq!(outcome, TriggerOutcome::Abandoned { searched: 5 });
        assert!(!outcome.is_triggered());
        assert_eq!(lookback.len(), 2);
    }

    #[test]
    fn test_empty_lookback_never_crosses() {
        let detector = level_detector(TriggerEdge::Rising, 0.0, 1);
        let mut lookback = SlidingWindowBuffer::new(0);
        let outcome = detector.search(&mut lookback, feed(vec![10.0])).unwrap();
        assert_eq!(outcome, TriggerOutcome::Abandoned { searched: 1 });
    }

    #[test]
    fn test_falling_edge_on_channel_two() {
        let detector = TriggerDetector::new(
            TriggerSettings {
                channel: Channel::Two,
                edge: TriggerEdge::Falling,
                level: 10.0,
            },
            TriggerKind::Level,
            10,
        );
        // Channel one crossing must be ignored
        assert!(!detector.crossed(&Sample::new(20.0, 5.0), &Sample::new(0.0, 5.0)));
        assert!(detector.crossed(&Sample::new(0.0, 20.0), &Sample::new(0.0, 10.0)));
    }

    #[test]
    fn test_logic_edges() {
        let detector = TriggerDetector::new(TriggerSettings::default(), TriggerKind::Logic, 10);
        assert!(detector.crossed(&Sample::new(0.0, 0.0), &Sample::new(1.0, 0.0)));
        assert!(!detector.crossed(&Sample::new(1.0, 0.0), &Sample::new(1.0, 0.0)));
        // A logic detector ignores the analog level
        assert!(!detector.crossed(&Sample::new(-5.0, 0.0), &Sample::new(5.0, 0.0)));
    }

    #[test]
    fn test_error_propagates() {
        let detector = level_detector(TriggerEdge::Rising, 0.0, 10);
        let mut lookback = SlidingWindowBuffer::new(1);
        let result = detector.search(&mut lookback, || {
            Err(crate::error::ScopeError::Device("gone".to_string()))
        });
        assert!(result.is_err());
    }
}
