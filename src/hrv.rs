//! # HRV Estimation Module
//!
//! Turns a cleaned RR interval window into the 0-100 HRV score shown to the
//! user. RMSSD (root mean square of successive differences) is the underlying
//! time-domain metric; the score is `ln(RMSSD)` rescaled against fixed
//! calibration bounds.
//!
//! ## Score Calibration
//! The rescale maps `ln(RMSSD)` from 0..6.5 onto 0..100 and clamps. The
//! bounds are domain-calibrated constants, not configuration. The score is
//! this application's unit, not a clinical one.

/// Upper calibration bound for ln(RMSSD).
const MAX_LN_RMSSD: f64 = 6.5;

/// RMSSD over an RR interval sequence in milliseconds.
///
/// Returns `None` for fewer than 2 intervals; no successive difference
/// exists, so no HRV sample is produced for that tick.
pub fn rmssd(rr_intervals: &[f64]) -> Option<f64> {
    if rr_intervals.len() < 2 {
        return None;
    }

    let squared_sum: f64 = rr_intervals
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).powi(2))
        .sum();
    let count = (rr_intervals.len() - 1) as f64;

    Some((squared_sum / count).sqrt())
}

/// Rescale an RMSSD value into the bounded 0-100 score.
///
/// A degenerate RMSSD of zero (perfectly uniform intervals) is pinned to
/// score 0 rather than routed through `ln(0) = -inf`.
pub fn score_from_rmssd(rmssd: f64) -> f64 {
    if rmssd <= 0.0 {
        return 0.0;
    }
    (rmssd.ln() / MAX_LN_RMSSD * 100.0).clamp(0.0, 100.0)
}

/// Round a score (or interval) to 2 decimal places for display and storage.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rmssd_known_sequence() {
        // diffs [10, -20], mean of squares (100 + 400) / 2 = 250
        let value = rmssd(&[800.0, 810.0, 790.0]).unwrap();
        assert!((value - 250.0_f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_rmssd_insufficient_data() {
        assert_eq!(rmssd(&[]), None);
        assert_eq!(rmssd(&[800.0]), None);
    }

    #[test]
    fn test_rmssd_two_intervals() {
        assert_eq!(rmssd(&[800.0, 820.0]), Some(20.0));
    }

    #[test]
    fn test_score_midrange() {
        // ln(50) / 6.5 * 100
        let score = score_from_rmssd(50.0);
        assert!((score - 50.0_f64.ln() / 6.5 * 100.0).abs() < 1e-9);
        assert!(score > 0.0 && score < 100.0);
    }

    #[test]
    fn test_score_clamps_high() {
        // ln is above the 6.5 calibration ceiling
        assert_eq!(score_from_rmssd(1000.0), 100.0);
    }

    #[test]
    fn test_score_clamps_low() {
        // RMSSD below 1 ms gives a negative ln
        assert_eq!(score_from_rmssd(0.5), 0.0);
    }

    #[test]
    fn test_score_zero_rmssd_pinned() {
        let score = score_from_rmssd(0.0);
        assert_eq!(score, 0.0);
        assert!(score.is_finite());
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(15.811388), 15.81);
        assert_eq!(round2(15.816), 15.82);
        assert_eq!(round2(100.0), 100.0);
    }
}
