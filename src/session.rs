//! # Session Data Module
//!
//! Owns everything accumulated over one monitoring session: the append-only
//! heart-rate and HRV series, the rolling RR window, and the user's tags.
//! `handle_notification` is the composition point of the acquisition
//! pipeline: decode, window, clean, estimate, with each step a pure function
//! whose result flows into the next, with this struct as the only state.
//!
//! ## Series Alignment
//! One heart-rate sample is appended per decoded notification, but an HRV
//! sample only when the cleaned window yields a valid RMSSD, so the HRV
//! series may trail the heart-rate series in length. The two align by
//! relative order of computation, not by index.
//!
//! ## Lifecycle
//! All series start empty at connection, are mutated only by the pipeline or
//! tag operations, and are cleared together by `reset()` on disconnect.
//! Reset runs between notification events, never concurrently with a decode.

use crate::hrv::{rmssd, round2, score_from_rmssd};
use crate::measurement::HeartRateMeasurement;
use crate::rr_window::{clean_rr_intervals, RrSample, RrWindow};

/// Display color for a session tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagColor {
    Red,
    Green,
    Blue,
    Orange,
    Purple,
}

impl TagColor {
    /// Parse a user-supplied color name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "red" => Some(TagColor::Red),
            "green" => Some(TagColor::Green),
            "blue" => Some(TagColor::Blue),
            "orange" => Some(TagColor::Orange),
            "purple" => Some(TagColor::Purple),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            TagColor::Red => "red",
            TagColor::Green => "green",
            TagColor::Blue => "blue",
            TagColor::Orange => "orange",
            TagColor::Purple => "purple",
        }
    }
}

/// A user annotation captured at a moment in the session.
#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    /// Elapsed session time at creation, formatted ("MM:SS" or "H:MM:SS").
    pub time: String,
    /// Last known heart rate when the tag was created.
    pub heart_rate: Option<u16>,
    /// Last known HRV score when the tag was created.
    pub hrv: Option<f64>,
    /// Index of the most recent heart-rate sample at creation. Zero when the
    /// series was still empty, in which case `heart_rate` is `None`.
    pub index: usize,
    pub color: TagColor,
    pub label: String,
    /// Free text, mutable after creation via `SessionData::edit_tag_comments`.
    pub comments: String,
}

/// Result of processing one notification, for the live display layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickUpdate {
    pub bpm: u16,
    /// Score appended this tick, if the window yielded a valid RMSSD.
    pub hrv: Option<f64>,
}

/// Accumulated state for one monitoring session.
#[derive(Debug, Default)]
pub struct SessionData {
    heart_rate: Vec<u16>,
    hrv: Vec<f64>,
    rr_window: RrWindow,
    tags: Vec<Tag>,
}

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the full acquisition pipeline for one raw notification payload.
    ///
    /// Returns `None` when the payload was too short to decode; the tick is
    /// skipped entirely and no series is touched.
    pub fn handle_notification(&mut self, payload: &[u8], now_ms: u64) -> Option<TickUpdate> {
        let measurement = HeartRateMeasurement::parse(payload);
        let bpm = measurement.bpm?;

        self.push_heart_rate(bpm);

        let rounded: Vec<f64> = measurement.rr_intervals_ms.iter().map(|&rr| round2(rr)).collect();
        let windowed = self.push_rr(&rounded, now_ms);
        let cleaned = clean_rr_intervals(&windowed);

        let hrv = rmssd(&cleaned).map(|r| {
            let score = round2(score_from_rmssd(r));
            self.push_hrv(score);
            score
        });

        log::debug!(
            "tick: bpm={} rr_in={} window={} hrv={:?}",
            bpm,
            rounded.len(),
            cleaned.len(),
            hrv
        );

        Some(TickUpdate { bpm, hrv })
    }

    pub fn push_heart_rate(&mut self, bpm: u16) {
        self.heart_rate.push(bpm);
    }

    pub fn push_hrv(&mut self, score: f64) {
        self.hrv.push(score);
    }

    /// Stamp and window new RR intervals; returns the retained window.
    pub fn push_rr(&mut self, intervals_ms: &[f64], now_ms: u64) -> Vec<f64> {
        self.rr_window.ingest(intervals_ms, now_ms)
    }

    pub fn heart_rate_series(&self) -> &[u16] {
        &self.heart_rate
    }

    pub fn hrv_series(&self) -> &[f64] {
        &self.hrv
    }

    /// Tagged RR history retained in the 15-second window.
    pub fn rr_samples(&self) -> &[RrSample] {
        self.rr_window.samples()
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn last_heart_rate(&self) -> Option<u16> {
        self.heart_rate.last().copied()
    }

    pub fn last_hrv(&self) -> Option<f64> {
        self.hrv.last().copied()
    }

    /// Create a tag carrying the last known readings and the index of the
    /// most recent heart-rate sample. `elapsed_secs` is the session clock at
    /// creation.
    pub fn add_tag(&mut self, elapsed_secs: u64, color: TagColor, label: &str, comments: &str) {
        let tag = Tag {
            time: format_elapsed(elapsed_secs),
            heart_rate: self.last_heart_rate(),
            hrv: self.last_hrv(),
            index: self.heart_rate.len().saturating_sub(1),
            color,
            label: label.to_string(),
            comments: comments.to_string(),
        };
        log::info!("tag '{}' at {} (#{})", tag.label, tag.time, self.tags.len());
        self.tags.push(tag);
    }

    /// Replace the free-text comments of an existing tag.
    pub fn edit_tag_comments(&mut self, index: usize, comments: &str) -> bool {
        match self.tags.get_mut(index) {
            Some(tag) => {
                tag.comments = comments.to_string();
                true
            }
            None => false,
        }
    }

    /// Clear all series, the RR window, and the tag list. Used on
    /// disconnect/stop; runs between notifications.
    pub fn reset(&mut self) {
        self.heart_rate.clear();
        self.hrv.clear();
        self.rr_window.clear();
        self.tags.clear();
    }
}

/// Format elapsed whole seconds as "MM:SS", or "H:MM:SS" past an hour.
pub fn format_elapsed(elapsed_secs: u64) -> String {
    let hours = elapsed_secs / 3600;
    let minutes = (elapsed_secs % 3600) / 60;
    let seconds = elapsed_secs % 60;
    if hours > 0 {
        format!("{}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// flags = u8 BPM | RR present, followed by RR fields in 1/1024 s units.
    fn packet(bpm: u8, rr_units: &[u16]) -> Vec<u8> {
        let mut data = vec![0x10, bpm];
        for unit in rr_units {
            data.extend_from_slice(&unit.to_le_bytes());
        }
        data
    }

    #[test]
    fn test_notification_appends_heart_rate() {
        let mut session = SessionData::new();
        let update = session.handle_notification(&packet(72, &[]), 0).unwrap();

        assert_eq!(update.bpm, 72);
        assert_eq!(update.hrv, None);
        assert_eq!(session.heart_rate_series(), &[72]);
        assert!(session.hrv_series().is_empty());
    }

    #[test]
    fn test_short_payload_skips_tick() {
        let mut session = SessionData::new();
        assert_eq!(session.handle_notification(&[0x01, 72], 0), None);
        assert!(session.heart_rate_series().is_empty());
    }

    #[test]
    fn test_hrv_appended_once_window_fills() {
        let mut session = SessionData::new();
        // 819 units = 799.8 ms, 829 units ~ 809.57 ms
        session.handle_notification(&packet(74, &[819]), 0);
        let update = session.handle_notification(&packet(75, &[829]), 1000).unwrap();

        assert!(update.hrv.is_some());
        assert_eq!(session.hrv_series().len(), 1);
        assert_eq!(session.heart_rate_series().len(), 2);
        let score = update.hrv.unwrap();
        assert!(score > 0.0 && score <= 100.0);
    }

    #[test]
    fn test_hrv_series_trails_heart_rate_series() {
        let mut session = SessionData::new();
        // No RR data on any tick: HR grows, HRV never does
        for i in 0..5 {
            session.handle_notification(&[0x00, 70 + i], i as u64 * 1000);
        }
        assert_eq!(session.heart_rate_series().len(), 5);
        assert!(session.hrv_series().is_empty());
    }

    #[test]
    fn test_rr_samples_carry_timestamps() {
        let mut session = SessionData::new();
        session.handle_notification(&packet(70, &[1024]), 4_000);

        let samples = session.rr_samples();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].observed_at_ms, 4_000);
        assert_eq!(samples[0].interval_ms, 1000.0);
    }

    #[test]
    fn test_tags_capture_last_readings() {
        let mut session = SessionData::new();
        session.handle_notification(&packet(72, &[819]), 0);
        session.handle_notification(&packet(73, &[829]), 1000);

        session.add_tag(65, TagColor::Green, "rest", "");
        let tag = &session.tags()[0];

        assert_eq!(tag.time, "01:05");
        assert_eq!(tag.heart_rate, Some(73));
        assert_eq!(tag.hrv, session.last_hrv());
        // Index annotates the sample just recorded, 73 at position 1
        assert_eq!(tag.index, 1);
        assert_eq!(session.heart_rate_series()[tag.index], 73);
        assert_eq!(tag.color, TagColor::Green);
    }

    #[test]
    fn test_tag_before_any_data() {
        let mut session = SessionData::new();
        session.add_tag(0, TagColor::Red, "start", "baseline");

        let tag = &session.tags()[0];
        assert_eq!(tag.heart_rate, None);
        assert_eq!(tag.hrv, None);
        assert_eq!(tag.index, 0);
    }

    #[test]
    fn test_edit_tag_comments() {
        let mut session = SessionData::new();
        session.add_tag(10, TagColor::Blue, "note", "");

        assert!(session.edit_tag_comments(0, "updated"));
        assert_eq!(session.tags()[0].comments, "updated");
        assert!(!session.edit_tag_comments(5, "missing"));
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut session = SessionData::new();
        session.handle_notification(&packet(72, &[819, 829]), 0);
        session.add_tag(5, TagColor::Red, "x", "");

        session.reset();
        assert!(session.heart_rate_series().is_empty());
        assert!(session.hrv_series().is_empty());
        assert!(session.rr_samples().is_empty());
        assert!(session.tags().is_empty());
        assert_eq!(session.last_heart_rate(), None);
    }

    #[test]
    fn test_format_elapsed() {
        assert_eq!(format_elapsed(0), "00:00");
        assert_eq!(format_elapsed(59), "00:59");
        assert_eq!(format_elapsed(125), "02:05");
        assert_eq!(format_elapsed(3725), "1:02:05");
    }
}
