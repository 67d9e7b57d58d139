use std::time::Duration;

use regex::Regex;

/// A normalized progress update for a single in-flight encode.
///
/// Transient: produced continuously while the encoder runs, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressEvent {
    /// 0-100, or `None` when the total duration is unknown
    pub percentage: Option<f64>,
    /// Encode speed multiplier (1.0 == realtime)
    pub speed: Option<f64>,
    /// Last reported output bitrate, verbatim
    pub bitrate: Option<String>,
    /// Elapsed output time reported by the encoder
    pub elapsed: Option<Duration>,
    /// Cumulative output size in bytes, if the encoder has reported one
    pub total_size: Option<u64>,
    pub message: String,
}

/// Incremental decoder for the encoder's `key=value` progress stream.
///
/// Stateful per job: fields may arrive in any order and at any cadence, so
/// the parser keeps the last-seen value of each and emits an event whenever
/// the elapsed output time advances. Malformed lines are ignored.
#[derive(Debug)]
pub struct ProgressParser {
    total_duration_secs: Option<f64>,
    out_time_us: Option<u64>,
    speed: Option<f64>,
    bitrate: Option<String>,
    total_size: Option<u64>,
    speed_re: Regex,
}

impl ProgressParser {
    pub fn new(total_duration_secs: Option<f64>) -> Self {
        Self {
            total_duration_secs,
            out_time_us: None,
            speed: None,
            bitrate: None,
            total_size: None,
            speed_re: Regex::new(r"^([0-9]*\.?[0-9]+)x$").expect("valid speed pattern"),
        }
    }

    /// Feed one line from the progress stream.
    ///
    /// Returns an event when the line carries user-visible progress (an
    /// elapsed-time update, end-of-stream, or an opaque passthrough key).
    pub fn feed(&mut self, line: &str) -> Option<ProgressEvent> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let (key, value) = line.split_once('=')?;
        let (key, value) = (key.trim(), value.trim());

        match key {
            // FFmpeg emits out_time_ms in microseconds as well; treat both
            // fields identically.
            "out_time_us" | "out_time_ms" => {
                let us = value.parse::<u64>().ok()?;
                self.out_time_us = Some(us);
                Some(self.event(line))
            }
            "out_time" => None,
            "speed" => {
                self.speed = self
                    .speed_re
                    .captures(value)
                    .and_then(|c| c.get(1))
                    .and_then(|m| m.as_str().parse::<f64>().ok());
                None
            }
            "bitrate" => {
                if value != "N/A" {
                    self.bitrate = Some(value.to_string());
                }
                None
            }
            "total_size" => {
                self.total_size = value.parse::<u64>().ok();
                None
            }
            "progress" => {
                if value == "end" {
                    Some(self.event(line))
                } else {
                    None
                }
            }
            // Vendor-specific keys pass through as opaque message text.
            _ => Some(self.event(line)),
        }
    }

    fn event(&self, message: &str) -> ProgressEvent {
        ProgressEvent {
            percentage: self.percentage(),
            speed: self.speed,
            bitrate: self.bitrate.clone(),
            elapsed: self.out_time_us.map(Duration::from_micros),
            total_size: self.total_size,
            message: message.to_string(),
        }
    }

    fn percentage(&self) -> Option<f64> {
        let total = self.total_duration_secs.filter(|t| *t > 0.0)?;
        let elapsed_secs = self.out_time_us? as f64 / 1_000_000.0;
        Some((elapsed_secs / total * 100.0).clamp(0.0, 100.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_duration_yields_percentage() {
        let mut parser = ProgressParser::new(Some(10.0));
        let event = parser.feed("out_time_us=5000000").unwrap();
        assert_eq!(event.percentage, Some(50.0));
        assert_eq!(event.elapsed, Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_unknown_duration_yields_no_percentage() {
        let mut parser = ProgressParser::new(None);
        let event = parser.feed("out_time_us=5000000").unwrap();
        assert_eq!(event.percentage, None);
    }

    #[test]
    fn test_zero_duration_yields_no_percentage() {
        let mut parser = ProgressParser::new(Some(0.0));
        let event = parser.feed("out_time_us=5000000").unwrap();
        assert_eq!(event.percentage, None);
    }

    #[test]
    fn test_percentage_is_clamped() {
        let mut parser = ProgressParser::new(Some(2.0));
        let event = parser.feed("out_time_us=9000000").unwrap();
        assert_eq!(event.percentage, Some(100.0));
    }

    #[test]
    fn test_out_time_ms_is_microseconds() {
        let mut parser = ProgressParser::new(Some(10.0));
        let event = parser.feed("out_time_ms=5000000").unwrap();
        assert_eq!(event.percentage, Some(50.0));
    }

    #[test]
    fn test_malformed_lines_are_ignored() {
        let mut parser = ProgressParser::new(Some(10.0));
        assert!(parser.feed("no separator here").is_none());
        assert!(parser.feed("").is_none());

        // Parser state survives garbage in between.
        assert!(parser.feed("out_time_us=1000000").is_some());
        assert!(parser.feed("???").is_none());
        let event = parser.feed("out_time_us=2000000").unwrap();
        assert_eq!(event.percentage, Some(20.0));
    }

    #[test]
    fn test_fields_arrive_in_any_order() {
        let mut parser = ProgressParser::new(Some(4.0));
        assert!(parser.feed("speed=2.5x").is_none());
        assert!(parser.feed("bitrate=1500.2kbits/s").is_none());

        let event = parser.feed("out_time_us=1000000").unwrap();
        assert_eq!(event.percentage, Some(25.0));
        assert_eq!(event.speed, Some(2.5));
        assert_eq!(event.bitrate.as_deref(), Some("1500.2kbits/s"));
    }

    #[test]
    fn test_unparseable_speed_is_dropped() {
        let mut parser = ProgressParser::new(Some(4.0));
        assert!(parser.feed("speed=N/A").is_none());
        let event = parser.feed("out_time_us=1000000").unwrap();
        assert_eq!(event.speed, None);
    }

    #[test]
    fn test_total_size_carried_on_events() {
        let mut parser = ProgressParser::new(None);
        assert!(parser.feed("total_size=1048576").is_none());
        let event = parser.feed("out_time_us=1000000").unwrap();
        assert_eq!(event.total_size, Some(1048576));
    }

    #[test]
    fn test_unknown_key_passes_through() {
        let mut parser = ProgressParser::new(None);
        let event = parser.feed("frame=42").unwrap();
        assert_eq!(event.message, "frame=42");
    }

    #[test]
    fn test_progress_end_emits_event() {
        let mut parser = ProgressParser::new(Some(10.0));
        parser.feed("out_time_us=10000000");
        let event = parser.feed("progress=end").unwrap();
        assert_eq!(event.percentage, Some(100.0));
    }
}
