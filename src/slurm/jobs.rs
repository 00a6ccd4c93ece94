use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::command::ReportCommand;
use super::misc::format_string;
use crate::utilities::pipe_reader;

/// `squeue` format specifiers: id, user, partition, name, state, time used,
/// time limit, nodes, cpus, and the optional node list
const SQUEUE_FIELDS: [&str; 10] = ["i", "u", "P", "j", "T", "M", "l", "D", "C", "N"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum JobState {
    Running,
    Pending,
    /// Any other state, e.g. COMPLETING, passed through verbatim
    Other(String),
}

impl JobState {
    pub fn from_label(label: &str) -> Self {
        match label {
            "RUNNING" => JobState::Running,
            "PENDING" => JobState::Pending,
            other => JobState::Other(other.to_string()),
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            JobState::Running => f.write_str("RUNNING"),
            JobState::Pending => f.write_str("PENDING"),
            JobState::Other(label) => f.write_str(label),
        }
    }
}

impl<'de> Deserialize<'de> for JobState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Ok(JobState::from_label(&value))
    }
}

impl Serialize for JobState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// A job as reported by `squeue`; fields are kept as printed
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Job {
    #[serde(rename = "job_id")]
    pub id: String,
    /// Owner of the job
    pub user: String,
    pub partition: String,
    /// Full name of the job
    pub name: String,
    pub state: JobState,
    /// Runtime, e.g. `1-02:03:04`
    pub time: String,
    pub time_limit: String,
    /// Number of nodes requested by/allocated to the job
    pub nodes: String,
    /// Number of CPUs requested by/allocated to the job
    pub cpus: String,
    /// Zero or more nodes assigned to this job; only present in the extended format
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nodelist: Option<String>,
}

impl Job {
    /// Time used by the job in seconds, if it is a valid duration
    pub fn runtime(&self) -> Option<u64> {
        parse_duration(&self.time)
    }

    /// Time limit of the job in seconds; `None` for `UNLIMITED` and other non-durations
    pub fn limit(&self) -> Option<u64> {
        parse_duration(&self.time_limit)
    }
}

/// Parses `squeue` durations, i.e. `[days-][hours:]minutes:seconds`, into seconds
pub fn parse_duration(value: &str) -> Option<u64> {
    let (days, value) = match value.split_once('-') {
        Some((days, value)) => (days.parse::<u64>().ok()?, value),
        None => (0, value),
    };

    let mut values = value.rsplit(':');
    let seconds = values.next()?.parse::<u64>().ok()?;
    let minutes = values.next()?.parse::<u64>().ok()?;
    let hours = values.next().unwrap_or("0").parse::<u64>().ok()?;
    if values.next().is_some() {
        return None;
    }

    days.checked_mul(24)?
        .checked_add(hours)?
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct JobStats {
    pub total: usize,
    pub running: usize,
    pub pending: usize,
}

impl JobStats {
    /// Jobs neither running nor pending
    pub fn other(&self) -> usize {
        self.total - self.running - self.pending
    }

    fn count(&mut self, state: &JobState) {
        self.total += 1;
        match state {
            JobState::Running => self.running += 1,
            JobState::Pending => self.pending += 1,
            JobState::Other(_) => {}
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct JobList {
    pub jobs: Vec<Job>,
    pub stats: JobStats,
}

/// Unlike the other reports, a malformed `squeue` line fails the entire parse
#[derive(Debug, thiserror::Error)]
pub enum JobError {
    #[error("line {line}: expected 9 or 10 fields, found {found}")]
    FieldCount { line: u64, found: usize },
    #[error("error while parsing squeue output: {0}")]
    Csv(#[from] csv::Error),
}

impl JobList {
    /// Command listing all jobs in the extended (10 field) format
    pub fn command(exe: &str) -> ReportCommand {
        ReportCommand::new(exe)
            .arg("--noheader")
            .arg(format!("--format={}", format_string(SQUEUE_FIELDS.iter())))
    }

    pub fn parse(text: &str) -> Result<JobList, JobError> {
        let mut list = JobList::default();
        for record in pipe_reader(text).records() {
            let record = record?;
            // Blank lines are ignored, as for the other reports
            if record.len() == 1 && record[0].is_empty() {
                continue;
            }

            if !(SQUEUE_FIELDS.len() - 1..=SQUEUE_FIELDS.len()).contains(&record.len()) {
                return Err(JobError::FieldCount {
                    line: record.position().map(|p| p.line()).unwrap_or_default(),
                    found: record.len(),
                });
            }

            let job: Job = record.deserialize(None)?;
            list.stats.count(&job.state);
            list.jobs.push(job);
        }

        Ok(list)
    }
}
