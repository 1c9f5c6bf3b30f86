//! Rolling sensor history and the per-tick sensor context snapshot.
//!
//! The engine keeps the last [`HISTORY_WINDOW`] biometric samples and
//! derives channel averages plus a cheap trend estimate (mean of the last
//! five minus mean of the first five samples in the window). The same
//! snapshot feeds both the neural predictor's inputs and the durable
//! feedback records, so training sees exactly what inference saw.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use pulsegate_shared::{BiometricSample, StressLevel};

/// Number of samples retained for averaging and trend estimation.
pub const HISTORY_WINDOW: usize = 30;

/// Samples taken from each end of the window for the trend estimate.
const TREND_SPAN: usize = 5;

/// Bounded FIFO of recent biometric samples.
#[derive(Debug, Clone, Default)]
pub struct SensorHistory {
    samples: VecDeque<BiometricSample>,
}

impl SensorHistory {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY_WINDOW),
        }
    }

    /// Appends a sample, evicting the oldest once the window is full.
    pub fn push(&mut self, sample: BiometricSample) {
        if self.samples.len() == HISTORY_WINDOW {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<&BiometricSample> {
        self.samples.back()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn hr_average(&self) -> f32 {
        mean(self.samples.iter().map(|s| s.heart_rate))
    }

    pub fn gsr_average(&self) -> f32 {
        mean(self.samples.iter().map(|s| s.gsr_value))
    }

    /// First-5-vs-last-5 delta of heart rate across the window.
    pub fn hr_trend(&self) -> f32 {
        edge_trend(self.samples.iter().map(|s| s.heart_rate))
    }

    /// First-5-vs-last-5 delta of GSR across the window.
    pub fn gsr_trend(&self) -> f32 {
        edge_trend(self.samples.iter().map(|s| s.gsr_value))
    }

    /// Temperature change from the oldest to the newest retained sample.
    pub fn temp_delta(&self) -> f32 {
        match (self.samples.front(), self.samples.back()) {
            (Some(first), Some(last)) => last.temperature - first.temperature,
            _ => 0.0,
        }
    }

    /// Snapshot of the current sensor picture plus session bookkeeping.
    pub fn context(
        &self,
        edge_count: u32,
        time_since_edge_sec: f32,
        current_level: StressLevel,
        session_time_sec: f32,
    ) -> SensorContext {
        let latest = self.latest().copied().unwrap_or(BiometricSample {
            heart_rate: 0.0,
            temperature: 0.0,
            gsr_value: 0.0,
            timestamp_ms: 0,
        });

        SensorContext {
            heart_rate: latest.heart_rate,
            hr_average: self.hr_average(),
            hr_trend: self.hr_trend(),
            temperature: latest.temperature,
            temp_delta: self.temp_delta(),
            gsr: latest.gsr_value,
            gsr_average: self.gsr_average(),
            gsr_trend: self.gsr_trend(),
            edge_count,
            time_since_edge_sec,
            current_level,
            session_time_sec,
        }
    }
}

/// The full sensor context at one instant. Feeds the predictor's input
/// vector and the durable feedback log.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorContext {
    pub heart_rate: f32,
    pub hr_average: f32,
    pub hr_trend: f32,
    pub temperature: f32,
    pub temp_delta: f32,
    pub gsr: f32,
    pub gsr_average: f32,
    pub gsr_trend: f32,
    pub edge_count: u32,
    pub time_since_edge_sec: f32,
    pub current_level: StressLevel,
    pub session_time_sec: f32,
}

fn mean(values: impl Iterator<Item = f32>) -> f32 {
    let mut sum = 0.0f32;
    let mut count = 0usize;
    for value in values {
        sum += value;
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        sum / count as f32
    }
}

/// Mean of the last span minus mean of the first span. Falls back to a
/// simple last-minus-first difference for very short histories.
fn edge_trend(values: impl Iterator<Item = f32>) -> f32 {
    let values: Vec<f32> = values.collect();
    let len = values.len();
    if len < 2 {
        return 0.0;
    }

    let span = TREND_SPAN.min(len / 2).max(1);
    let head = mean(values[..span].iter().copied());
    let tail = mean(values[len - span..].iter().copied());
    tail - head
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(hr: f32, temp: f32, gsr: f32, ts: u32) -> BiometricSample {
        BiometricSample::new(hr, temp, gsr, ts)
    }

    #[test]
    fn window_evicts_oldest() {
        let mut history = SensorHistory::new();
        for i in 0..(HISTORY_WINDOW as u32 + 10) {
            history.push(sample(60.0 + i as f32, 36.5, 300.0, i * 1_000));
        }
        assert_eq!(history.len(), HISTORY_WINDOW);
        assert_eq!(history.latest().unwrap().timestamp_ms, 39_000);
    }

    #[test]
    fn averages_match_manual_computation() {
        let mut history = SensorHistory::new();
        history.push(sample(60.0, 36.0, 200.0, 0));
        history.push(sample(80.0, 36.4, 400.0, 1_000));
        assert!((history.hr_average() - 70.0).abs() < 1e-6);
        assert!((history.gsr_average() - 300.0).abs() < 1e-6);
        assert!((history.temp_delta() - 0.4).abs() < 1e-6);
    }

    #[test]
    fn trend_reflects_rising_signal() {
        let mut history = SensorHistory::new();
        for i in 0..HISTORY_WINDOW as u32 {
            history.push(sample(60.0 + i as f32, 36.5, 300.0, i * 1_000));
        }
        // First five average 62, last five average 87.
        assert!((history.hr_trend() - 25.0).abs() < 1e-4);
        assert!(history.gsr_trend().abs() < 1e-6);
    }

    #[test]
    fn trend_of_flat_or_empty_history_is_zero() {
        let history = SensorHistory::new();
        assert_eq!(history.hr_trend(), 0.0);

        let mut flat = SensorHistory::new();
        for i in 0..10 {
            flat.push(sample(72.0, 36.5, 310.0, i * 1_000));
        }
        assert_eq!(flat.hr_trend(), 0.0);
    }

    #[test]
    fn context_carries_session_bookkeeping() {
        let mut history = SensorHistory::new();
        history.push(sample(75.0, 36.7, 350.0, 5_000));
        let ctx = history.context(2, 45.0, StressLevel::Active, 600.0);
        assert_eq!(ctx.heart_rate, 75.0);
        assert_eq!(ctx.edge_count, 2);
        assert_eq!(ctx.current_level, StressLevel::Active);
        assert!((ctx.session_time_sec - 600.0).abs() < f32::EPSILON);
    }
}
