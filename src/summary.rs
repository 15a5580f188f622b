//! # Session Summary Module
//!
//! End-of-session statistics over the accumulated series. Computation is a
//! pure function of the session data: calling it twice on the same series
//! gives identical results, and nothing here mutates the session.
//!
//! ## Empty Input
//! A session with zero heart-rate samples has no defined averages or extrema;
//! `compute` returns `None` rather than letting a divide-by-zero put NaN in
//! front of the user. A session with heart-rate samples but no HRV samples
//! (sparse RR data) reports heart-rate statistics with the HRV block absent.

use crate::session::SessionData;

/// Samples per summary sub-window: 5 minutes at the nominal 1 Hz
/// notification rate.
const WINDOW_SAMPLES: usize = 300;

/// A series extremum and the index of its first occurrence.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    pub value: f64,
    pub index: usize,
}

/// Statistics over the heart-rate series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeartRateStats {
    pub average: f64,
    pub max: Extremum,
    pub min: Extremum,
}

/// Statistics over the HRV score series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HrvStats {
    pub average: f64,
    pub max: Extremum,
    /// Minimum over non-zero entries; zero scores are placeholder readings,
    /// not true minima. `None` when every entry is zero.
    pub min: Option<Extremum>,
    /// Mean of the first `min(300, len)` samples.
    pub opening_average: f64,
    /// Mean of the last `min(300, len)` samples. Equals `opening_average`
    /// when the series is shorter than one window.
    pub closing_average: f64,
}

/// Aggregate statistics for a completed session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSummary {
    pub heart_rate: HeartRateStats,
    /// `None` when no HRV sample was ever produced.
    pub hrv: Option<HrvStats>,
}

impl SessionSummary {
    /// Compute summary statistics, or `None` for a session with no
    /// heart-rate samples.
    pub fn compute(session: &SessionData) -> Option<Self> {
        let hr: Vec<f64> = session
            .heart_rate_series()
            .iter()
            .map(|&bpm| bpm as f64)
            .collect();
        if hr.is_empty() {
            return None;
        }

        let heart_rate = HeartRateStats {
            average: mean(&hr),
            max: max_with_index(&hr)?,
            min: min_with_index(&hr)?,
        };

        Some(Self {
            heart_rate,
            hrv: hrv_stats(session.hrv_series()),
        })
    }
}

fn hrv_stats(hrv: &[f64]) -> Option<HrvStats> {
    if hrv.is_empty() {
        return None;
    }

    let opening = &hrv[..hrv.len().min(WINDOW_SAMPLES)];
    let closing = &hrv[hrv.len().saturating_sub(WINDOW_SAMPLES)..];

    Some(HrvStats {
        average: mean(hrv),
        max: max_with_index(hrv)?,
        min: min_nonzero_with_index(hrv),
        opening_average: mean(opening),
        closing_average: mean(closing),
    })
}

fn mean(series: &[f64]) -> f64 {
    series.iter().sum::<f64>() / series.len() as f64
}

/// First occurrence wins ties.
fn max_with_index(series: &[f64]) -> Option<Extremum> {
    series
        .iter()
        .enumerate()
        .fold(None, |best: Option<Extremum>, (index, &value)| match best {
            Some(b) if value <= b.value => Some(b),
            _ => Some(Extremum { value, index }),
        })
}

/// First occurrence wins ties.
fn min_with_index(series: &[f64]) -> Option<Extremum> {
    series
        .iter()
        .enumerate()
        .fold(None, |best: Option<Extremum>, (index, &value)| match best {
            Some(b) if value >= b.value => Some(b),
            _ => Some(Extremum { value, index }),
        })
}

/// Minimum over entries strictly greater than zero.
fn min_nonzero_with_index(series: &[f64]) -> Option<Extremum> {
    series
        .iter()
        .enumerate()
        .filter(|&(_, &value)| value > 0.0)
        .fold(None, |best: Option<Extremum>, (index, &value)| match best {
            Some(b) if value >= b.value => Some(b),
            _ => Some(Extremum { value, index }),
        })
}
