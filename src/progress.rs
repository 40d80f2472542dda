//! Progress reporting boundary
//!
//! The engine only ever hands out `(bytes_done, total_bytes, elapsed)`
//! tuples; everything about how that becomes pixels lives here. The line
//! format is produced by pure functions so rendering carries no state beyond
//! the session baseline used for the remaining-time estimate.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::cell::Cell;
use std::time::Duration;

/// Observational callback driven by the transfer engine.
///
/// Implementations cannot influence the transfer; the engine ignores
/// everything about the sink except that the call returns.
pub trait ProgressSink {
    fn on_progress(&self, _bytes_done: u64, _total_bytes: u64, _elapsed: Duration) {}
}

pub struct NoopProgress;
impl ProgressSink for NoopProgress {}

/// Terminal progress bar in the classic "[####] X MB of Y MB" shape.
pub struct ConsoleProgress {
    bar: ProgressBar,
    // First observed byte count; on a resumed run this is the resume offset,
    // and the remaining-time estimate only counts bytes moved this session.
    baseline: Cell<Option<u64>>,
}

impl ConsoleProgress {
    pub fn new() -> Self {
        let bar = ProgressBar::hidden();
        bar.set_style(
            ProgressStyle::with_template("[{bar:50.green/238}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("██░"),
        );
        Self {
            bar,
            baseline: Cell::new(None),
        }
    }
}

impl Default for ConsoleProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressSink for ConsoleProgress {
    fn on_progress(&self, bytes_done: u64, total_bytes: u64, elapsed: Duration) {
        if self.baseline.get().is_none() {
            self.baseline.set(Some(bytes_done));
            self.bar.set_length(total_bytes);
            self.bar.set_draw_target(ProgressDrawTarget::stdout());
            if bytes_done > 0 {
                self.bar.println(format!(
                    "Continuing previous copy ({} already present)",
                    format_mb(bytes_done)
                ));
            }
        }
        let baseline = self.baseline.get().unwrap_or(0);
        self.bar.set_position(bytes_done);
        self.bar
            .set_message(status_line(bytes_done, total_bytes, elapsed, baseline));
        if bytes_done >= total_bytes {
            self.bar.finish();
        }
    }
}

/// Render the status suffix: done/total in MB, percent, elapsed, remaining.
pub fn status_line(bytes_done: u64, total_bytes: u64, elapsed: Duration, baseline: u64) -> String {
    let percent = if total_bytes == 0 {
        100.0
    } else {
        bytes_done as f64 / total_bytes as f64 * 100.0
    };
    format!(
        "{} of {} ({:.2}%) {} {}",
        format_mb(bytes_done),
        format_mb(total_bytes),
        percent,
        format_hms(elapsed),
        format_hms(estimate_remaining(bytes_done, total_bytes, elapsed, baseline)),
    )
}

/// Remaining time at the average rate of bytes moved in this session.
fn estimate_remaining(
    bytes_done: u64,
    total_bytes: u64,
    elapsed: Duration,
    baseline: u64,
) -> Duration {
    let session = bytes_done.saturating_sub(baseline);
    if session == 0 {
        return Duration::ZERO;
    }
    let remaining = total_bytes.saturating_sub(bytes_done);
    Duration::from_secs_f64(elapsed.as_secs_f64() * remaining as f64 / session as f64)
}

pub fn format_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1_048_576.0)
}

pub fn format_hms(d: Duration) -> String {
    let s = d.as_secs();
    format!("{:02}:{:02}:{:02}", s / 3600, (s % 3600) / 60, s % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mb_formatting() {
        assert_eq!(format_mb(0), "0.00 MB");
        assert_eq!(format_mb(1_048_576), "1.00 MB");
        assert_eq!(format_mb(2_500_000), "2.38 MB");
    }

    #[test]
    fn hms_formatting() {
        assert_eq!(format_hms(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_hms(Duration::from_secs(65)), "00:01:05");
        assert_eq!(format_hms(Duration::from_secs(3 * 3600 + 600)), "03:10:00");
    }

    #[test]
    fn status_line_shape() {
        let line = status_line(1_048_576, 2_097_152, Duration::from_secs(4), 0);
        assert_eq!(line, "1.00 MB of 2.00 MB (50.00%) 00:00:04 00:00:04");
    }

    #[test]
    fn zero_length_file_reports_complete() {
        let line = status_line(0, 0, Duration::ZERO, 0);
        assert!(line.contains("(100.00%)"));
    }

    #[test]
    fn remaining_estimate_ignores_resumed_bytes() {
        // 2 of 4 MB done, but 1 MB was already present: 1 MB moved in 10s
        // with 2 MB left, so the estimate is 20s, not 10s.
        let d = estimate_remaining(
            2 * 1_048_576,
            4 * 1_048_576,
            Duration::from_secs(10),
            1_048_576,
        );
        assert_eq!(d.as_secs(), 20);
    }

    #[test]
    fn no_session_bytes_means_no_estimate() {
        assert_eq!(
            estimate_remaining(5, 10, Duration::from_secs(3), 5),
            Duration::ZERO
        );
    }
}
