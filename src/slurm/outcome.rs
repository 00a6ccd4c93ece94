use serde::Serialize;

/// Reasons for skipping a line of report output
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SkipReason {
    #[error("expected {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },
    #[error("expected at least {expected} tokens, found {found}")]
    TooFewTokens { expected: usize, found: usize },
    #[error("no `cpu` token found")]
    NoCpuToken,
    #[error("invalid {field}: {value:?}")]
    InvalidField { field: &'static str, value: String },
    #[error("malformed line: {0}")]
    Malformed(String),
}

impl SkipReason {
    pub fn invalid<S: Into<String>>(field: &'static str, value: S) -> Self {
        SkipReason::InvalidField {
            field,
            value: value.into(),
        }
    }
}

impl Serialize for SkipReason {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}

/// Result of parsing a single line of a report
#[derive(Clone, Debug, PartialEq)]
pub enum LineOutcome<T> {
    Parsed(T),
    Skipped(SkipReason),
}

impl<T> From<Result<T, SkipReason>> for LineOutcome<T> {
    fn from(value: Result<T, SkipReason>) -> Self {
        match value {
            Ok(value) => LineOutcome::Parsed(value),
            Err(reason) => LineOutcome::Skipped(reason),
        }
    }
}

/// A line that was skipped while parsing a report
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Skipped {
    /// 1-based line number in the report
    pub line: u64,
    pub reason: SkipReason,
}

impl Skipped {
    /// Records a skipped line, logging the reason
    pub fn log(report: &str, line: u64, reason: SkipReason) -> Self {
        log::warn!("skipping line {} of {} output: {}", line, report, reason);
        Self { line, reason }
    }
}
