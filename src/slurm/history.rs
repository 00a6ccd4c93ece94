use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use super::command::Reporter;
use super::usage::{ClusterUsage, UsageError, UtilizationSample};
use super::DATETIME_FORMAT;

/// Time span covered by a utilization history and the size of each sampled window
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Horizon {
    pub span: TimeDelta,
    pub window: TimeDelta,
}

impl Default for Horizon {
    /// 24 hours in 30 minute windows
    fn default() -> Self {
        Self {
            span: TimeDelta::hours(24),
            window: TimeDelta::minutes(30),
        }
    }
}

impl Horizon {
    /// Returns the `(start, end)` windows covering the horizon ending at `now`,
    /// most recent window first. Every window lies entirely within the horizon.
    pub fn windows(&self, now: NaiveDateTime) -> Vec<(NaiveDateTime, NaiveDateTime)> {
        let mut windows = Vec::new();
        if self.window <= TimeDelta::zero() {
            return windows;
        }

        let start = now - self.span;
        let mut cursor = now;
        while cursor - self.window >= start {
            windows.push((cursor - self.window, cursor));
            cursor -= self.window;
        }

        windows
    }
}

/// A window for which no sample could be obtained
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SkippedWindow {
    pub end: NaiveDateTime,
    pub reason: UsageError,
}

/// Cluster utilization sampled over consecutive windows
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct TimeSeries {
    /// Samples in chronological order, timestamped with the end of their window.
    /// Windows without data are left out rather than reported as zero.
    #[serde(rename = "data")]
    pub samples: Vec<UtilizationSample>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<SkippedWindow>,
}

impl TimeSeries {
    /// Runs one utilization report per window, one after the other. Unlike a
    /// single [`ClusterUsage`] report, each window uses the first valid line.
    pub fn collect<R>(reporter: &R, exe: &str, now: NaiveDateTime, horizon: &Horizon) -> TimeSeries
    where
        R: Reporter + ?Sized,
    {
        let mut series = TimeSeries::default();

        for (start, end) in horizon.windows(now) {
            let command = ClusterUsage::command(
                exe,
                start.format(DATETIME_FORMAT),
                end.format(DATETIME_FORMAT),
            );

            match UtilizationSample::parse_first(&reporter.run_report(&command), end) {
                Ok(sample) => series.samples.push(sample),
                Err(reason) => {
                    log::info!("skipping utilization window ending {}: {}", end, reason);
                    series.skipped.push(SkippedWindow { end, reason });
                }
            }
        }

        series.samples.sort_by_key(|sample| sample.timestamp);
        series
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use chrono::NaiveDate;

    use super::*;
    use crate::slurm::command::ReportCommand;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 2)
            .unwrap()
            .and_hms_opt(12, 15, 0)
            .unwrap()
    }

    fn end_of(command: &ReportCommand) -> NaiveDateTime {
        let end = command.value("end").expect("end argument");
        NaiveDateTime::parse_from_str(end, DATETIME_FORMAT).expect("valid end")
    }

    #[test]
    fn test_windows() {
        let windows = Horizon::default().windows(now());
        assert_eq!(windows.len(), 48);
        assert_eq!(windows[0], (now() - TimeDelta::minutes(30), now()));
        assert_eq!(windows[47].0, now() - TimeDelta::hours(24));

        let horizon = Horizon {
            span: TimeDelta::hours(1),
            window: TimeDelta::minutes(25),
        };
        assert_eq!(horizon.windows(now()).len(), 2);

        let horizon = Horizon {
            span: TimeDelta::hours(1),
            window: TimeDelta::zero(),
        };
        assert!(horizon.windows(now()).is_empty());
    }

    #[test]
    fn test_full_day() {
        let commands = RefCell::new(Vec::new());
        let reporter = |command: &ReportCommand| {
            commands.borrow_mut().push(command.clone());
            "hpc 25 0 0 75 0 100\n".to_string()
        };

        let series = TimeSeries::collect(&reporter, "sreport", now(), &Horizon::default());
        assert_eq!(series.samples.len(), 48);
        assert!(series.skipped.is_empty());
        assert!(series
            .samples
            .windows(2)
            .all(|w| w[1].timestamp - w[0].timestamp == TimeDelta::minutes(30)));
        assert_eq!(series.samples[47].timestamp, now());
        assert_eq!(series.samples[0].timestamp, now() - TimeDelta::minutes(23 * 60 + 30));
        assert!(series.samples.iter().all(|s| s.utilization == 25.0));

        // Windows are requested one at a time, most recent first
        let commands = commands.into_inner();
        assert_eq!(commands.len(), 48);
        assert_eq!(
            commands[0].to_string(),
            "sreport cluster utilization start=2024-03-02T11:45:00 end=2024-03-02T12:15:00 -t Hours -n"
        );
        assert!(commands.windows(2).all(|w| end_of(&w[0]) > end_of(&w[1])));
    }

    #[test]
    fn test_failed_windows_leave_gaps() {
        let failing = [2, 17, 40].map(|n| now() - TimeDelta::minutes(30 * n));
        let reporter = |command: &ReportCommand| {
            let end = end_of(command);
            if end == failing[0] {
                String::new()
            } else if end == failing[1] {
                "hpc 25 0 0\n".to_string()
            } else if end == failing[2] {
                "--------- ----------\n".to_string()
            } else {
                "hpc 25 0 0 75 0 100\n".to_string()
            }
        };

        let series = TimeSeries::collect(&reporter, "sreport", now(), &Horizon::default());
        assert_eq!(series.samples.len(), 45);
        assert!(series
            .samples
            .iter()
            .all(|s| !failing.contains(&s.timestamp)));
        assert!(series
            .samples
            .windows(2)
            .all(|w| w[0].timestamp < w[1].timestamp));

        assert_eq!(
            series.skipped.iter().map(|s| s.end).collect::<Vec<_>>(),
            failing
        );
        assert_eq!(series.skipped[0].reason, UsageError::NoData);
        assert!(matches!(series.skipped[1].reason, UsageError::Parse(_)));
        assert_eq!(series.skipped[2].reason, UsageError::NoData);
    }

    #[test]
    fn test_first_line_per_window() {
        let reporter = |_: &ReportCommand| "hpc 10 0 0 90 0 100\nhpc 90 0 0 10 0 100\n".to_string();
        let horizon = Horizon {
            span: TimeDelta::hours(1),
            window: TimeDelta::minutes(30),
        };

        let series = TimeSeries::collect(&reporter, "sreport", now(), &horizon);
        assert_eq!(series.samples.len(), 2);
        assert!(series.samples.iter().all(|s| s.utilization == 10.0));
    }
}
