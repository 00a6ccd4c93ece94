use std::collections::HashMap;
use std::fmt;
use std::str::{FromStr, Split};

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::command::ReportCommand;
use super::misc::format_string;
use super::outcome::{LineOutcome, SkipReason, Skipped};
use crate::utilities::pipe_reader;
use crate::widgets::Utilization;

/// `sinfo` format specifiers: node name, partition, compact state, CPUs (A/I/O/T),
/// memory, free memory and temporary disk space
const SINFO_FIELDS: [&str; 7] = ["N", "P", "t", "C", "m", "e", "d"];

/// Summarizes the state of CPUs on a node
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CPUState {
    /// Allocated CPUs
    pub allocated: usize,
    /// Idle CPUs
    pub idle: usize,
    /// Unavailable CPUs
    pub other: usize,
    /// Total number of CPUs
    pub total: usize,
}

impl<'de> Deserialize<'de> for CPUState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_str(CPUStateVisitor)
    }
}

struct CPUStateVisitor;

impl<'de> Visitor<'de> for CPUStateVisitor {
    type Value = CPUState;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a string representing CPU states in the form '0/1/2/3'")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        fn parse_next<E>(s: &mut Split<char>) -> Result<usize, E>
        where
            E: de::Error,
        {
            let value = s
                .next()
                .ok_or_else(|| E::custom("number of CPUs not found"))?;

            value
                .parse::<usize>()
                .map_err(|_| E::custom(format!("{:?} is not a valid number of CPUs", value)))
        }

        let mut values: Split<char> = v.split('/');
        let state = CPUState {
            allocated: parse_next(&mut values)?,
            idle: parse_next(&mut values)?,
            other: parse_next(&mut values)?,
            total: parse_next(&mut values)?,
        };

        if values.next().is_some() {
            return Err(E::custom(format!("too many CPU states in {:?}", v)));
        }

        Ok(state)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PartitionName {
    /// Name of partition
    pub label: String,
    /// Indicates the default partition; this flag is explicitly ignored
    /// as it is purely used for formatting purposes to match sinfo/squeue
    pub default: bool,
}

impl PartitionName {
    /// Trims the trailing '*' indicating that a partition is the default partition
    pub fn from_str<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;

        Ok(Self {
            label: value.trim_end_matches('*').to_string(),
            default: value.ends_with('*'),
        })
    }

    /// Indicates if two partitions are the same, ignoring the 'default' flag
    pub fn same(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl fmt::Display for PartitionName {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.default {
            write!(f, "{}*", self.label)
        } else {
            fmt::Display::fmt(&self.label, f)
        }
    }
}

impl Serialize for PartitionName {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.label)
    }
}

/// Buckets used when counting node states
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeClass {
    Allocated,
    Idle,
    Down,
    Reserved,
}

impl NodeClass {
    /// Substrings identifying each class, in order of priority
    const PATTERNS: [(&'static str, NodeClass); 4] = [
        ("alloc", NodeClass::Allocated),
        ("idle", NodeClass::Idle),
        ("down", NodeClass::Down),
        ("resv", NodeClass::Reserved),
    ];

    /// Classifies a state label, e.g. `alloc` or `down*`; states such as
    /// `mix` or `drain` belong to no class
    pub fn classify(label: &str) -> Option<NodeClass> {
        let label = label.to_ascii_lowercase();

        Self::PATTERNS
            .iter()
            .find(|(pattern, _)| label.contains(pattern))
            .map(|(_, class)| *class)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeState {
    /// State as reported by sinfo, without the non-responding marker
    pub label: String,
    pub responds: bool,
}

impl NodeState {
    fn from_str<'de, D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        if value.is_empty() {
            return Err(de::Error::custom("empty node state"));
        }

        Ok(NodeState {
            label: value.trim_end_matches('*').to_string(),
            responds: !value.ends_with('*'),
        })
    }

    pub fn class(&self) -> Option<NodeClass> {
        NodeClass::classify(&self.label)
    }

    /// Returns true if the node is available for executing jobs
    pub fn is_available(&self) -> bool {
        let label = self.label.to_ascii_lowercase();

        self.responds
            && ["alloc", "idle", "mix", "resv", "comp"]
                .iter()
                .any(|state| label.starts_with(state))
    }
}

impl fmt::Display for NodeState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.responds {
            fmt::Display::fmt(&self.label, f)
        } else {
            write!(f, "{}*", self.label)
        }
    }
}

impl Serialize for NodeState {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// A single line of `sinfo --Node` output
#[derive(Debug, Deserialize)]
struct NodeLine {
    name: String,
    #[serde(deserialize_with = "PartitionName::from_str")]
    partition: PartitionName,
    #[serde(deserialize_with = "NodeState::from_str")]
    state: NodeState,
    cpus: CPUState,
    memory: usize,
    #[serde(deserialize_with = "parse_free_mem")]
    free_memory: Option<usize>,
    disk: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Node {
    pub name: String,
    /// Partitions in order of appearance
    pub partitions: Vec<PartitionName>,
    pub state: NodeState,
    pub cpus: CPUState,
    /// Memory in MB
    pub memory: usize,
    /// Free memory in MB; not available for nodes that are down
    pub free_memory: Option<usize>,
    /// Temporary disk space in MB
    pub disk: usize,
}

impl Node {
    pub fn cpu_utilization(&self) -> Utilization {
        Utilization {
            allocated: self.cpus.allocated as f64,
            unavailable: self.cpus.other as f64,
            capacity: self.cpus.total as f64,
        }
    }

    fn parse_line(record: &csv::StringRecord) -> LineOutcome<Node> {
        if record.len() != SINFO_FIELDS.len() {
            return LineOutcome::Skipped(SkipReason::FieldCount {
                expected: SINFO_FIELDS.len(),
                found: record.len(),
            });
        }

        record
            .deserialize::<NodeLine>(None)
            .map(Node::from)
            .map_err(|error| match error.kind() {
                csv::ErrorKind::Deserialize { err, .. } => SkipReason::Malformed(err.to_string()),
                _ => SkipReason::Malformed(error.to_string()),
            })
            .into()
    }

    /// Adds a partition unless the node is already known to belong to it
    fn add_partition(&mut self, partition: PartitionName) {
        if !self.partitions.iter().any(|p| p.same(&partition)) {
            self.partitions.push(partition);
        }
    }
}

impl From<NodeLine> for Node {
    fn from(line: NodeLine) -> Self {
        Node {
            name: line.name,
            partitions: vec![line.partition],
            state: line.state,
            cpus: line.cpus,
            memory: line.memory,
            free_memory: line.free_memory,
            disk: line.disk,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct NodeStats {
    pub total: usize,
    pub allocated: usize,
    pub idle: usize,
    pub down: usize,
    pub reserved: usize,
}

impl NodeStats {
    fn count(&mut self, state: &NodeState) {
        self.total += 1;
        match state.class() {
            Some(NodeClass::Allocated) => self.allocated += 1,
            Some(NodeClass::Idle) => self.idle += 1,
            Some(NodeClass::Down) => self.down += 1,
            Some(NodeClass::Reserved) => self.reserved += 1,
            None => {}
        }
    }
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct NodeReport {
    /// One entry per node, in order of first appearance
    pub nodes: Vec<Node>,
    pub stats: NodeStats,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<Skipped>,
}

impl NodeReport {
    /// Command listing one line per node and partition
    pub fn command(exe: &str) -> ReportCommand {
        ReportCommand::new(exe)
            .arg("--Node")
            .arg("--noheader")
            .arg(format!("--format={}", format_string(SINFO_FIELDS.iter())))
    }

    /// Parses `sinfo` output, merging nodes listed once per partition. Only the
    /// partition of a repeated node is used; all other values are taken from the
    /// first line describing that node.
    pub fn parse(text: &str) -> NodeReport {
        let mut report = NodeReport::default();
        let mut index = HashMap::<String, usize>::new();

        for record in pipe_reader(text).records() {
            let (line, outcome) = match record {
                Ok(record) => (
                    record.position().map(|p| p.line()).unwrap_or_default(),
                    Node::parse_line(&record),
                ),
                Err(error) => (
                    error.position().map(|p| p.line()).unwrap_or_default(),
                    LineOutcome::Skipped(SkipReason::Malformed(error.to_string())),
                ),
            };

            match outcome {
                LineOutcome::Parsed(node) => {
                    if let Some(&idx) = index.get(&node.name) {
                        for partition in node.partitions {
                            report.nodes[idx].add_partition(partition);
                        }
                    } else {
                        report.stats.count(&node.state);
                        index.insert(node.name.clone(), report.nodes.len());
                        report.nodes.push(node);
                    }
                }
                LineOutcome::Skipped(reason) => {
                    report.skipped.push(Skipped::log("sinfo", line, reason));
                }
            }
        }

        report
    }

    /// Summed CPU allocation across all nodes
    pub fn cpu_utilization(&self) -> Utilization {
        self.nodes.iter().map(|n| n.cpu_utilization()).sum()
    }
}

fn parse_optional_value<'de, D, T>(name: &str, deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
{
    let value = String::deserialize(deserializer)?;
    if value == "N/A" {
        return Ok(None);
    }

    Ok(Some(value.parse::<T>().map_err(|_| {
        de::Error::custom(format!("invalid {}: {:?}", name, value))
    })?))
}

fn parse_free_mem<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    parse_optional_value("FREE_MEM", deserializer)
}
