use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde_json::{json, Value};

use crate::slurm::{JobStats, Reporter, Slurm};

/// Reports that can be printed as JSON with `--dump`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Report {
    Jobs,
    Nodes,
    Users,
    Usage,
    History,
}

impl FromStr for Report {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jobs" => Ok(Report::Jobs),
            "nodes" => Ok(Report::Nodes),
            "users" => Ok(Report::Users),
            "usage" => Ok(Report::Usage),
            "history" => Ok(Report::History),
            _ => Err(format!(
                "unknown report {:?}; expected jobs, nodes, users, usage, or history",
                s
            )),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match self {
            Report::Jobs => "jobs",
            Report::Nodes => "nodes",
            Report::Users => "users",
            Report::Usage => "usage",
            Report::History => "history",
        })
    }
}

impl Report {
    /// Runs the report and converts the result to JSON. Failures are part of
    /// the returned value; the error only covers serialization.
    pub fn to_json<R: Reporter>(self, slurm: &Slurm<R>, now: NaiveDateTime) -> serde_json::Result<Value> {
        match self {
            Report::Jobs => match slurm.jobs() {
                Ok(list) => serde_json::to_value(list),
                Err(error) => Ok(json!({
                    "error": error.to_string(),
                    "jobs": [],
                    "stats": JobStats::default(),
                })),
            },
            Report::Nodes => serde_json::to_value(slurm.nodes()),
            Report::Users => serde_json::to_value(slurm.top_users(now)),
            Report::Usage => serde_json::to_value(slurm.cluster_usage(now)),
            Report::History => serde_json::to_value(slurm.history(now)),
        }
    }
}
