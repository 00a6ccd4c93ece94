mod command;
mod history;
mod jobs;
mod misc;
mod nodes;
mod outcome;
mod usage;
mod users;

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use serde::Serialize;

pub use command::{ReportCommand, Reporter, SystemReporter};
pub use history::{Horizon, SkippedWindow, TimeSeries};
pub use jobs::{parse_duration, Job, JobError, JobList, JobState, JobStats};
pub use misc::unique_values;
pub use nodes::{CPUState, Node, NodeClass, NodeReport, NodeState, NodeStats, PartitionName};
pub use outcome::{LineOutcome, SkipReason, Skipped};
pub use usage::{ClusterUsage, UsageError, UtilizationSample};
pub use users::{parse_usage, Layout, TopUsers, UserUsage, TOP_USERS};

/// Date format accepted by sreport
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Date and time format accepted by sreport
pub const DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
/// Length of the period summarized by sreport
const REPORT_DAYS: i64 = 30;

/// Reporting period for sreport summaries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Period {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl Period {
    /// The `days` days leading up to and including `end`
    pub fn ending(end: NaiveDate, days: i64) -> Self {
        Self {
            start: end - TimeDelta::days(days),
            end,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} - {}",
            self.start.format(DATE_FORMAT),
            self.end.format(DATE_FORMAT)
        )
    }
}

/// Locations of the Slurm reporting tools
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Executables {
    pub squeue: String,
    pub sinfo: String,
    pub sreport: String,
}

impl Default for Executables {
    fn default() -> Self {
        Self {
            squeue: "squeue".to_string(),
            sinfo: "sinfo".to_string(),
            sreport: "sreport".to_string(),
        }
    }
}

/// Queries Slurm state. Every call runs a fresh report; nothing is cached.
#[derive(Debug)]
pub struct Slurm<R> {
    reporter: R,
    exe: Executables,
    horizon: Horizon,
}

impl<R: Reporter> Slurm<R> {
    pub fn new(reporter: R, exe: Executables) -> Self {
        Self {
            reporter,
            exe,
            horizon: Horizon::default(),
        }
    }

    pub fn with_horizon(mut self, horizon: Horizon) -> Self {
        self.horizon = horizon;
        self
    }

    /// Current jobs and their states
    pub fn jobs(&self) -> Result<JobList, JobError> {
        let output = self
            .reporter
            .run_report(&JobList::command(&self.exe.squeue));

        JobList::parse(&output)
    }

    /// Current nodes, merged across partitions
    pub fn nodes(&self) -> NodeReport {
        let output = self
            .reporter
            .run_report(&NodeReport::command(&self.exe.sinfo));

        NodeReport::parse(&output)
    }

    /// Users with the highest CPU usage over the last 30 days
    pub fn top_users(&self, now: NaiveDateTime) -> TopUsers {
        let period = Period::ending(now.date(), REPORT_DAYS);
        let output = self
            .reporter
            .run_report(&TopUsers::command(&self.exe.sreport, &period));

        TopUsers::parse(&output, period)
    }

    /// Cluster utilization over the last 30 days
    pub fn cluster_usage(&self, now: NaiveDateTime) -> ClusterUsage {
        let period = Period::ending(now.date(), REPORT_DAYS);
        let command = ClusterUsage::command(
            &self.exe.sreport,
            period.start.format(DATE_FORMAT),
            period.end.format(DATE_FORMAT),
        );

        ClusterUsage::parse(&self.reporter.run_report(&command), period, now)
    }

    /// Cluster utilization over the configured horizon, e.g. the last 24 hours
    pub fn history(&self, now: NaiveDateTime) -> TimeSeries {
        TimeSeries::collect(&self.reporter, &self.exe.sreport, now, &self.horizon)
    }
}
