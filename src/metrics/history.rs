//! Bounded, time-ordered sample window.

use std::collections::VecDeque;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use rand::Rng;

use crate::metrics::generator::SampleGenerator;
use crate::metrics::sample::MetricSample;

/// Fixed-capacity FIFO of samples, oldest first.
///
/// Invariants: `len() <= capacity()`, timestamps non-decreasing front to back.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    samples: VecDeque<MetricSample>,
    capacity: usize,
}

impl History {
    /// Empty window. A zero capacity is raised to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Full window of back-dated samples, one per `step`, the last stamped `now`.
    pub fn seeded<R: Rng>(
        capacity: usize,
        now: DateTime<Utc>,
        step: std::time::Duration,
        generator: &SampleGenerator,
        stressed: bool,
        rng: &mut R,
    ) -> Self {
        let mut history = Self::new(capacity);
        let step = ChronoDuration::from_std(step).unwrap_or_else(|_| ChronoDuration::seconds(1));
        for back in (0..history.capacity).rev() {
            let offset = i32::try_from(back).unwrap_or(i32::MAX);
            let at = now - step * offset;
            history.push(generator.generate(at, stressed, rng));
        }
        history
    }

    /// Build from existing samples; keeps the newest `capacity` of them.
    #[must_use]
    pub fn from_samples(capacity: usize, samples: impl IntoIterator<Item = MetricSample>) -> Self {
        let mut history = Self::new(capacity);
        for sample in samples {
            history.push(sample);
        }
        history
    }

    /// Append a sample, evicting the oldest when over capacity.
    ///
    /// A sample older than the newest retained one is restamped with the newest
    /// timestamp so ordering survives wall-clock steps. Returns the evicted sample.
    pub fn push(&mut self, mut sample: MetricSample) -> Option<MetricSample> {
        if let Some(newest) = self.samples.back()
            && sample.timestamp < newest.timestamp
        {
            sample.timestamp = newest.timestamp;
        }
        self.samples.push_back(sample);
        if self.samples.len() > self.capacity {
            self.samples.pop_front()
        } else {
            None
        }
    }

    /// Newest sample.
    #[must_use]
    pub fn latest(&self) -> Option<&MetricSample> {
        self.samples.back()
    }

    /// Oldest retained sample.
    #[must_use]
    pub fn oldest(&self) -> Option<&MetricSample> {
        self.samples.front()
    }

    /// Samples held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Whether no samples are held.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Maximum samples retained.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples oldest first.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = &MetricSample> + '_ {
        self.samples.iter()
    }

    /// Owned copy of the window, oldest first.
    #[must_use]
    pub fn to_vec(&self) -> Vec<MetricSample> {
        self.samples.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(secs, 0).unwrap()
    }

    fn sample(secs: i64, cpu: f64) -> MetricSample {
        let mut s = MetricSample::zeroed(at(secs));
        s.cpu_usage = cpu;
        s
    }

    #[test]
    fn capacity_three_keeps_last_three_in_order() {
        let mut history = History::new(3);
        for i in 0..5 {
            #[allow(clippy::cast_precision_loss)]
            history.push(sample(i, i as f64));
        }
        let kept: Vec<f64> = history.iter().map(|s| s.cpu_usage).collect();
        assert_eq!(kept, vec![2.0, 3.0, 4.0]);
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn push_reports_evicted_sample() {
        let mut history = History::new(2);
        assert!(history.push(sample(0, 1.0)).is_none());
        assert!(history.push(sample(1, 2.0)).is_none());
        let evicted = history.push(sample(2, 3.0)).expect("oldest evicted");
        assert_eq!(evicted.timestamp, at(0));
    }

    #[test]
    fn out_of_order_sample_is_restamped() {
        let mut history = History::new(4);
        history.push(sample(10, 1.0));
        history.push(sample(5, 2.0));
        let latest = history.latest().unwrap();
        assert_eq!(latest.timestamp, at(10));
        assert!((latest.cpu_usage - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zero_capacity_raised_to_one() {
        let mut history = History::new(0);
        history.push(sample(0, 1.0));
        history.push(sample(1, 2.0));
        assert_eq!(history.capacity(), 1);
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn seeded_window_is_full_and_back_dated() {
        let now = at(1_000);
        let mut rng = StdRng::seed_from_u64(5);
        let history = History::seeded(
            60,
            now,
            std::time::Duration::from_secs(1),
            &SampleGenerator::default(),
            false,
            &mut rng,
        );
        assert_eq!(history.len(), 60);
        assert_eq!(history.latest().unwrap().timestamp, now);
        assert_eq!(history.oldest().unwrap().timestamp, at(1_000 - 59));
    }

    #[test]
    fn to_vec_is_detached_copy() {
        let mut history = History::from_samples(3, [sample(0, 1.0), sample(1, 2.0)]);
        let mut copy = history.to_vec();
        copy[0].cpu_usage = 99.0;
        history.push(sample(2, 3.0));
        assert!((history.oldest().unwrap().cpu_usage - 1.0).abs() < f64::EPSILON);
        assert_eq!(copy.len(), 2);
    }

    proptest! {
        #[test]
        fn window_stays_bounded_and_ordered(
            capacity in 1usize..20,
            pushes in 0usize..80,
        ) {
            let mut history = History::new(capacity);
            let mut evicted_max: Option<DateTime<Utc>> = None;
            for i in 0..pushes {
                let secs = i64::try_from(i).unwrap();
                if let Some(old) = history.push(sample(secs, 0.0)) {
                    evicted_max = Some(evicted_max.map_or(old.timestamp, |m| m.max(old.timestamp)));
                }
                prop_assert!(history.len() <= capacity);
            }
            prop_assert_eq!(history.len(), pushes.min(capacity));
            let stamps: Vec<_> = history.iter().map(|s| s.timestamp).collect();
            prop_assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
            if let (Some(max_evicted), Some(oldest)) = (evicted_max, history.oldest()) {
                prop_assert!(oldest.timestamp > max_evicted);
            }
        }
    }
}
