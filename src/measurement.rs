//! # Heart Rate Measurement Decoding Module
//!
//! Parses raw GATT Heart Rate Measurement notifications (characteristic
//! 0x2A37) into heart rate and RR interval values.
//!
//! ## Packet Layout
//! ```text
//! byte 0        flags
//!   bit 0       1 = BPM is a little-endian u16 at byte 1, 0 = u8 at byte 1
//!   bit 4       1 = one or more u16 RR interval fields follow the BPM
//! byte 1..      BPM (1 or 2 bytes)
//! then          RR intervals, little-endian u16, units of 1/1024 second
//! ```
//!
//! ## Error Policy
//! Malformed or truncated packets never panic: a buffer too short for the
//! selected BPM encoding decodes to `bpm: None` with no RR intervals, and the
//! caller treats that as "no update" for the tick. RR parsing is
//! bounds-checked in 2-byte steps and stops before the end of the buffer.

/// One decoded Heart Rate Measurement notification.
#[derive(Debug, Clone, PartialEq)]
pub struct HeartRateMeasurement {
    /// Heart rate in BPM, or `None` when the packet was too short to decode.
    pub bpm: Option<u16>,
    /// RR intervals converted to milliseconds, in transmission order.
    pub rr_intervals_ms: Vec<f64>,
}

const FLAG_BPM_U16: u8 = 0x01;
const FLAG_RR_PRESENT: u8 = 0x10;

impl HeartRateMeasurement {
    /// Decode a raw characteristic payload.
    pub fn parse(data: &[u8]) -> Self {
        let Some(&flags) = data.first() else {
            return Self::empty();
        };

        let bpm_u16 = flags & FLAG_BPM_U16 != 0;
        let (bpm, rr_offset) = if bpm_u16 {
            if data.len() < 3 {
                return Self::empty();
            }
            (u16::from_le_bytes([data[1], data[2]]), 3)
        } else {
            if data.len() < 2 {
                return Self::empty();
            }
            (data[1] as u16, 2)
        };

        let mut rr_intervals_ms = Vec::new();
        if flags & FLAG_RR_PRESENT != 0 {
            let mut index = rr_offset;
            while index + 2 <= data.len() {
                let raw = u16::from_le_bytes([data[index], data[index + 1]]);
                // Sensor units are 1/1024 s
                rr_intervals_ms.push(raw as f64 / 1024.0 * 1000.0);
                index += 2;
            }
        }

        Self {
            bpm: Some(bpm),
            rr_intervals_ms,
        }
    }

    fn empty() -> Self {
        Self {
            bpm: None,
            rr_intervals_ms: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_u8_bpm_no_rr() {
        let m = HeartRateMeasurement::parse(&[0x00, 72]);
        assert_eq!(m.bpm, Some(72));
        assert!(m.rr_intervals_ms.is_empty());
    }

    #[test]
    fn test_parse_u16_bpm_with_rr() {
        // flags = u16 BPM | RR present, BPM = 72, RR units = [512, 1024]
        let m = HeartRateMeasurement::parse(&[0x11, 72, 0, 0x00, 0x02, 0x00, 0x04]);
        assert_eq!(m.bpm, Some(72));
        assert_eq!(m.rr_intervals_ms, vec![500.0, 1000.0]);
    }

    #[test]
    fn test_parse_u8_bpm_with_rr() {
        // RR fields start at byte 2 when BPM is a single byte
        let m = HeartRateMeasurement::parse(&[0x10, 60, 0x00, 0x04]);
        assert_eq!(m.bpm, Some(60));
        assert_eq!(m.rr_intervals_ms, vec![1000.0]);
    }

    #[test]
    fn test_parse_short_buffers() {
        assert_eq!(HeartRateMeasurement::parse(&[]).bpm, None);
        assert_eq!(HeartRateMeasurement::parse(&[0x00]).bpm, None);
        // u16 BPM flagged but only one BPM byte present
        assert_eq!(HeartRateMeasurement::parse(&[0x01, 72]).bpm, None);
    }

    #[test]
    fn test_parse_truncated_rr_field() {
        // One complete RR field plus a dangling byte, which must be ignored
        let m = HeartRateMeasurement::parse(&[0x10, 60, 0x00, 0x04, 0xFF]);
        assert_eq!(m.bpm, Some(60));
        assert_eq!(m.rr_intervals_ms, vec![1000.0]);
    }

    #[test]
    fn test_rr_ignored_when_flag_clear() {
        // Trailing bytes without the RR flag are not interpreted as intervals
        let m = HeartRateMeasurement::parse(&[0x00, 60, 0x00, 0x04]);
        assert_eq!(m.bpm, Some(60));
        assert!(m.rr_intervals_ms.is_empty());
    }

    #[test]
    fn test_rr_unit_conversion() {
        // 1024 units = exactly one second
        let m = HeartRateMeasurement::parse(&[0x10, 60, 0x00, 0x04]);
        assert_eq!(m.rr_intervals_ms[0], 1000.0);
    }
}
