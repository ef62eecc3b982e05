//! Incremental statistics.
//!
//! `RunningMoments` uses Welford's update for single values and Chan et al.'s
//! pairwise combine for merging partials, so the mean never goes through a
//! large running sum.
use crate::config::RatingScale;
use crate::types::{AggregatedStats, GpaSummary};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMoments {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningMoments {
    #[allow(clippy::cast_precision_loss)]
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    /// Commutative, associative combine of two partials.
    #[allow(clippy::cast_precision_loss)]
    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = *other;
            return;
        }
        let (n_a, n_b) = (self.count as f64, other.count as f64);
        let total = n_a + n_b;
        let delta = other.mean - self.mean;
        self.mean += delta * n_b / total;
        self.m2 += other.m2 + delta * delta * n_a * n_b / total;
        self.count += other.count;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.count > 0).then_some(self.mean)
    }

    /// Population standard deviation.
    #[allow(clippy::cast_precision_loss)]
    pub fn stddev(&self) -> Option<f64> {
        (self.count > 0).then(|| (self.m2 / self.count as f64).max(0.0).sqrt())
    }
}

/// Accumulates ratings and GPAs for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsAccumulator {
    rating: RunningMoments,
    histogram: Vec<u64>,
    gpa: RunningMoments,
}

impl StatsAccumulator {
    pub fn new(scale: &RatingScale) -> Self {
        Self { rating: RunningMoments::default(), histogram: vec![0; scale.buckets], gpa: RunningMoments::default() }
    }

    pub fn push(&mut self, scale: &RatingScale, rating: f64, gpa: Option<f64>) {
        self.rating.push(rating);
        if let Some(slot) = self.histogram.get_mut(scale.bucket(rating)) {
            *slot += 1;
        }
        // Absent GPA is skipped, never counted as zero.
        if let Some(gpa) = gpa {
            self.gpa.push(gpa);
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.rating.merge(&other.rating);
        self.gpa.merge(&other.gpa);
        for (slot, n) in self.histogram.iter_mut().zip(&other.histogram) {
            *slot += n;
        }
    }

    pub fn count(&self) -> u64 {
        self.rating.count()
    }

    pub fn snapshot(&self) -> AggregatedStats {
        AggregatedStats {
            count: self.rating.count(),
            rating_histogram: self.histogram.clone(),
            mean_rating: self.rating.mean().unwrap_or(0.0),
            rating_stddev: self.rating.stddev().unwrap_or(0.0),
            gpa: GpaSummary { count: self.gpa.count(), mean: self.gpa.mean(), stddev: self.gpa.stddev() },
        }
    }
}
