use std::fmt::Display;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};

use super::command::ReportCommand;
use super::misc::round2;
use super::outcome::SkipReason;
use super::Period;
use crate::utilities::{is_header, is_separator, lines, tokens};

/// Number of leading fields used from a utilization line
const USAGE_FIELDS: usize = 7;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UtilizationSample {
    /// Time at which the sample was taken, or the end of the sampled window
    pub timestamp: NaiveDateTime,
    /// Allocated hours as a percentage of reported hours, rounded to 2 decimals
    pub utilization: f64,
    pub allocated_hours: f64,
    pub total_hours: f64,
    pub idle_hours: f64,
    pub down_hours: f64,
}

/// Reasons for a utilization report not producing a sample
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum UsageError {
    #[error("no data available")]
    NoData,
    #[error("could not parse sreport output: {0}")]
    Parse(SkipReason),
}

impl Serialize for UsageError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Fields of a `sreport cluster utilization` line, in hours
#[derive(Clone, Debug, PartialEq)]
struct UsageLine {
    allocated: f64,
    down: f64,
    planned_down: f64,
    idle: f64,
    reserved: f64,
    reported: f64,
}

impl FromStr for UsageLine {
    type Err = SkipReason;

    // Parse example: hpc 120000 310 0 25890 0 146200
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tokens = tokens(s);
        if tokens.len() < USAGE_FIELDS {
            return Err(SkipReason::TooFewTokens {
                expected: USAGE_FIELDS,
                found: tokens.len(),
            });
        }

        let field = |idx: usize, name: &'static str| {
            tokens[idx]
                .parse::<f64>()
                .map_err(|_| SkipReason::invalid(name, tokens[idx]))
        };

        Ok(Self {
            allocated: field(1, "allocated")?,
            down: field(2, "down")?,
            planned_down: field(3, "planned down")?,
            idle: field(4, "idle")?,
            reserved: field(5, "reserved")?,
            reported: field(6, "reported")?,
        })
    }
}

impl UsageLine {
    fn sample(&self, timestamp: NaiveDateTime) -> UtilizationSample {
        let utilization = if self.reported > 0.0 {
            self.allocated / self.reported * 100.0
        } else {
            0.0
        };

        log::trace!(
            "utilization {:.2}% (planned down {}, reserved {})",
            utilization,
            self.planned_down,
            self.reserved
        );

        UtilizationSample {
            timestamp,
            utilization: round2(utilization),
            allocated_hours: self.allocated,
            total_hours: self.reported,
            idle_hours: self.idle,
            down_hours: self.down,
        }
    }
}

/// Lines that may contain utilization data, i.e. neither separators nor headers
fn candidates(text: &str) -> impl Iterator<Item = &str> {
    lines(text)
        .map(|(_, line)| line)
        .filter(|line| !is_separator(line) && !is_header(line, &["Cluster"]))
}

impl UtilizationSample {
    /// Parses the last candidate line of a utilization report; earlier lines are ignored
    pub fn parse_last(text: &str, timestamp: NaiveDateTime) -> Result<Self, UsageError> {
        let line = candidates(text).last().ok_or(UsageError::NoData)?;

        line.parse::<UsageLine>()
            .map(|usage| usage.sample(timestamp))
            .map_err(UsageError::Parse)
    }

    /// Parses the first candidate line of a utilization report that contains valid data
    pub fn parse_first(text: &str, timestamp: NaiveDateTime) -> Result<Self, UsageError> {
        let mut error = UsageError::NoData;
        for line in candidates(text) {
            match line.parse::<UsageLine>() {
                Ok(usage) => return Ok(usage.sample(timestamp)),
                Err(reason) => {
                    if error == UsageError::NoData {
                        error = UsageError::Parse(reason);
                    }
                }
            }
        }

        Err(error)
    }
}

/// Cluster utilization over a reporting period
#[derive(Clone, Debug, PartialEq)]
pub struct ClusterUsage {
    pub period: Period,
    pub sample: Result<UtilizationSample, UsageError>,
}

impl ClusterUsage {
    /// Command reporting utilization in hours between `start` and `end`
    pub fn command<T: Display>(exe: &str, start: T, end: T) -> ReportCommand {
        ReportCommand::new(exe)
            .arg("cluster")
            .arg("utilization")
            .arg(format!("start={}", start))
            .arg(format!("end={}", end))
            .arg("-t")
            .arg("Hours")
            .arg("-n")
    }

    pub fn parse(text: &str, period: Period, timestamp: NaiveDateTime) -> ClusterUsage {
        let sample = UtilizationSample::parse_last(text, timestamp);
        if let Err(error) = &sample {
            log::warn!("no cluster utilization for {}: {}", period, error);
        }

        ClusterUsage { period, sample }
    }
}

/// Serialized as `{"data": [sample], "period": ...}` or `{"data": [], "error": ..., "period": ...}`
impl Serialize for ClusterUsage {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match &self.sample {
            Ok(sample) => {
                let mut state = serializer.serialize_struct("ClusterUsage", 2)?;
                state.serialize_field("data", std::slice::from_ref(sample))?;
                state.serialize_field("period", &self.period)?;
                state.end()
            }
            Err(error) => {
                let mut state = serializer.serialize_struct("ClusterUsage", 3)?;
                state.serialize_field("data", &[] as &[UtilizationSample])?;
                state.serialize_field("error", &error.to_string())?;
                state.serialize_field("period", &self.period)?;
                state.end()
            }
        }
    }
}
