//! Human-readable timestamps for logs and job results.

use crate::segment::Segment;

/// `HH:MM:SS`, with `.mmm` appended when the value has a fractional part.
pub fn format_seconds(seconds: f64) -> String {
    let millis = (seconds.max(0.0) * 1000.0).round() as u64;
    let (whole, frac) = (millis / 1000, millis % 1000);
    let hms = format!("{:02}:{:02}:{:02}", whole / 3600, (whole % 3600) / 60, whole % 60);
    if frac == 0 {
        hms
    } else {
        format!("{}.{:03}", hms, frac)
    }
}

/// `HH:MM:SS-HH:MM:SS` for a segment.
pub fn format_segment(segment: &Segment) -> String {
    format!("{}-{}", format_seconds(segment.start), format_seconds(segment.end))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_seconds() {
        assert_eq!(format_seconds(0.0), "00:00:00");
        assert_eq!(format_seconds(90.0), "00:01:30");
        assert_eq!(format_seconds(3661.0), "01:01:01");
        assert_eq!(format_seconds(30.5), "00:00:30.500");
        assert_eq!(format_seconds(59.9996), "00:01:00");
    }

    #[test]
    fn test_negative_clamps_to_zero() {
        assert_eq!(format_seconds(-3.0), "00:00:00");
    }

    #[test]
    fn test_format_segment() {
        let segment = Segment::new(300.0, 450.0).unwrap();
        assert_eq!(format_segment(&segment), "00:05:00-00:07:30");
    }
}
