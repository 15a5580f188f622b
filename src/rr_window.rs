//! # RR Interval Window Module
//!
//! Maintains the rolling window of recently observed RR intervals that feeds
//! the HRV calculation, and cleans it of ectopic-beat artifacts.
//!
//! ## Windowing
//! Every interval is stamped with its arrival time and retained for at most
//! 15 seconds. Expiry is evaluated lazily on each ingest rather than by a
//! background timer, so a long idle gap followed by new data produces one
//! expiry sweep at that moment.
//!
//! ## Artifact Rejection
//! A single pass over the raw window keeps each interval only if it lies
//! within 0.8x..1.2x of the immediately preceding *raw* interval. The
//! comparison base is always the prior raw element, even when that element
//! was itself rejected; the pass is never re-applied to its own output.

/// Horizon for retained RR samples, in milliseconds.
const WINDOW_MS: u64 = 15_000;

/// An RR interval tagged with its arrival time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RrSample {
    pub interval_ms: f64,
    pub observed_at_ms: u64,
}

/// Rolling time-window over RR intervals. Sole owner of historical RR state.
#[derive(Debug, Default)]
pub struct RrWindow {
    samples: Vec<RrSample>,
}

impl RrWindow {
    pub fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    /// Append new intervals stamped `now_ms`, expire everything older than
    /// the 15-second horizon, and return the retained intervals in arrival
    /// order (timestamps stripped) for HRV computation.
    pub fn ingest(&mut self, intervals: &[f64], now_ms: u64) -> Vec<f64> {
        for &interval_ms in intervals {
            self.samples.push(RrSample {
                interval_ms,
                observed_at_ms: now_ms,
            });
        }

        self.samples
            .retain(|s| now_ms.saturating_sub(s.observed_at_ms) <= WINDOW_MS);

        self.samples.iter().map(|s| s.interval_ms).collect()
    }

    /// Tagged RR history for consumers that want raw intervals + arrival times.
    pub fn samples(&self) -> &[RrSample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }
}

/// Remove artifact beats from an RR sequence.
///
/// Fewer than 3 values is too little data to judge outliers and is returned
/// unchanged. Otherwise index 0 is kept unconditionally and each later value
/// survives only if it is strictly within (0.8x, 1.2x) of its raw predecessor.
pub fn clean_rr_intervals(intervals: &[f64]) -> Vec<f64> {
    if intervals.len() < 3 {
        return intervals.to_vec();
    }

    intervals
        .iter()
        .enumerate()
        .filter(|&(i, &val)| {
            i == 0 || (val > intervals[i - 1] * 0.8 && val < intervals[i - 1] * 1.2)
        })
        .map(|(_, &val)| val)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ingest_returns_intervals_in_order() {
        let mut window = RrWindow::new();
        let out = window.ingest(&[800.0, 810.0], 1_000);
        assert_eq!(out, vec![800.0, 810.0]);

        let out = window.ingest(&[790.0], 2_000);
        assert_eq!(out, vec![800.0, 810.0, 790.0]);
    }

    #[test]
    fn test_expiry_on_ingest() {
        let mut window = RrWindow::new();
        window.ingest(&[800.0], 0);

        // 20 s later the first sample has aged past the 15 s horizon
        let out = window.ingest(&[820.0], 20_000);
        assert_eq!(out, vec![820.0]);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_sample_at_horizon_boundary_is_retained() {
        let mut window = RrWindow::new();
        window.ingest(&[800.0], 0);

        let out = window.ingest(&[820.0], 15_000);
        assert_eq!(out, vec![800.0, 820.0]);
    }

    #[test]
    fn test_expiry_runs_with_no_new_intervals() {
        let mut window = RrWindow::new();
        window.ingest(&[800.0], 0);

        let out = window.ingest(&[], 20_000);
        assert!(out.is_empty());
        assert!(window.is_empty());
    }

    #[test]
    fn test_samples_keep_arrival_timestamps() {
        let mut window = RrWindow::new();
        window.ingest(&[800.0, 810.0], 5_000);

        let samples = window.samples();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].observed_at_ms, 5_000);
        assert_eq!(samples[1].interval_ms, 810.0);
    }

    #[test]
    fn test_clear() {
        let mut window = RrWindow::new();
        window.ingest(&[800.0], 0);
        window.clear();
        assert!(window.is_empty());
    }

    #[test]
    fn test_clean_rejects_spike() {
        let cleaned = clean_rr_intervals(&[800.0, 810.0, 2000.0]);
        assert_eq!(cleaned, vec![800.0, 810.0]);
    }

    #[test]
    fn test_clean_value_after_spike_judged_against_spike() {
        // 2000 is rejected against 810; 815 is then judged against the raw
        // 2000 and rejected as well, while 1900 would have survived
        assert_eq!(
            clean_rr_intervals(&[800.0, 810.0, 2000.0, 815.0]),
            vec![800.0, 810.0]
        );
        assert_eq!(
            clean_rr_intervals(&[800.0, 810.0, 2000.0, 1900.0]),
            vec![800.0, 810.0, 1900.0]
        );
    }

    #[test]
    fn test_clean_short_input_unchanged() {
        assert_eq!(clean_rr_intervals(&[800.0, 2000.0]), vec![800.0, 2000.0]);
        assert_eq!(clean_rr_intervals(&[]), Vec::<f64>::new());
    }

    #[test]
    fn test_clean_compares_against_raw_predecessor() {
        // 400 is rejected against 800, but 420 is then compared against the
        // raw 400 (not the kept 800) and survives. The single raw-predecessor
        // pass admits this drift deliberately.
        let cleaned = clean_rr_intervals(&[800.0, 400.0, 420.0]);
        assert_eq!(cleaned, vec![800.0, 420.0]);
    }

    #[test]
    fn test_clean_bounds_are_exclusive() {
        // Exactly 1.2x the predecessor is rejected, exactly 0.8x likewise
        let cleaned = clean_rr_intervals(&[1000.0, 1200.0, 960.0]);
        assert_eq!(cleaned, vec![1000.0]);
    }
}
