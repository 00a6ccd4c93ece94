use serde::Serialize;

use super::command::ReportCommand;
use super::outcome::{LineOutcome, SkipReason, Skipped};
use super::Period;
use crate::utilities::{column, is_header, is_separator, lines, tokens};

/// Number of users returned by [`TopUsers::parse`]
pub const TOP_USERS: usize = 5;
/// Number of users requested from sreport
const TOP_COUNT: usize = 50;
/// Appended by sreport to values truncated to fit their column
const TRUNCATION_MARKER: char = '+';
/// Minimum number of tokens in a token-scan line
const MIN_TOKENS: usize = 6;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct UserUsage {
    /// Login, without truncation marker
    pub user: String,
    pub account: String,
    /// Percentage of the total CPU time used in the period
    pub cpu_percent: f64,
    pub cpu_hours: f64,
}

/// Line layouts produced by different versions of `sreport user top`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Layout {
    /// Whitespace separated tokens, located relative to the `cpu` TRES name
    TokenScan,
    /// Fixed character columns; used when wide values run into each other
    FixedWidth,
}

impl Layout {
    pub fn parse(self, line: &str) -> Result<UserUsage, SkipReason> {
        match self {
            Layout::TokenScan => Self::parse_tokens(line),
            Layout::FixedWidth => Self::parse_columns(line),
        }
    }

    fn parse_tokens(line: &str) -> Result<UserUsage, SkipReason> {
        let tokens = tokens(line);
        if tokens.len() < MIN_TOKENS {
            return Err(SkipReason::TooFewTokens {
                expected: MIN_TOKENS,
                found: tokens.len(),
            });
        }

        let account = match tokens.iter().position(|&t| t == "cpu") {
            Some(0) | None => return Err(SkipReason::NoCpuToken),
            Some(idx) => tokens[idx - 1],
        };

        Ok(UserUsage::new(tokens[1], account, tokens[tokens.len() - 1]))
    }

    /// Columns: cluster [0, 10), login [10, 20), proper name [20, 35),
    /// account [35, 50), TRES name [50, 65), and usage [65, ..)
    fn parse_columns(line: &str) -> Result<UserUsage, SkipReason> {
        let tres = column(line, 50, Some(65));
        if !tres.eq_ignore_ascii_case("cpu") {
            return Err(SkipReason::invalid("TRES name", tres));
        }

        Ok(UserUsage::new(
            column(line, 10, Some(20)),
            column(line, 35, Some(50)),
            column(line, 65, None),
        ))
    }
}

impl UserUsage {
    fn new(login: &str, account: &str, usage: &str) -> Self {
        let (cpu_hours, cpu_percent) = parse_usage(usage);

        Self {
            user: login
                .strip_suffix(TRUNCATION_MARKER)
                .unwrap_or(login)
                .to_string(),
            account: account.to_string(),
            cpu_percent,
            cpu_hours,
        }
    }

    /// Parses a line, trying the token-scan layout before the fixed-width layout
    pub fn parse_line(line: &str) -> LineOutcome<UserUsage> {
        match Layout::TokenScan.parse(line) {
            Ok(usage) => LineOutcome::Parsed(usage),
            Err(reason) => Layout::FixedWidth.parse(line).map_err(|_| reason).into(),
        }
    }
}

/// Parses usage in the form `hours(percent%)`, e.g. `1051(16.23%)`, or plain
/// `hours`. Invalid values, including negative or non-finite hours and
/// percentages outside 0-100, are reported as zero hours/percent.
pub fn parse_usage(value: &str) -> (f64, f64) {
    fn number(text: &str) -> Result<f64, String> {
        text.trim().parse::<f64>().map_err(|error| error.to_string())
    }

    fn try_parse(value: &str) -> Result<(f64, f64), String> {
        let (hours, percent) = match value.split_once('(') {
            Some((hours, percent)) => (
                number(hours)?,
                number(percent.trim_end_matches(&['%', ')'][..]))?,
            ),
            None => (number(value)?, 0.0),
        };

        if !hours.is_finite() || hours < 0.0 {
            Err(format!("hours out of range: {}", hours))
        } else if !(0.0..=100.0).contains(&percent) {
            Err(format!("percentage out of range: {}", percent))
        } else {
            Ok((hours, percent))
        }
    }

    try_parse(value).unwrap_or_else(|error| {
        log::debug!("invalid usage {:?} ({}); using zero", value, error);
        (0.0, 0.0)
    })
}

#[derive(Clone, Debug, Serialize)]
pub struct TopUsers {
    /// Users with the highest CPU usage, in descending order
    pub users: Vec<UserUsage>,
    pub period: Period,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<Skipped>,
}

impl TopUsers {
    pub fn command(exe: &str, period: &Period) -> ReportCommand {
        ReportCommand::new(exe)
            .arg("user")
            .arg("top")
            .arg(format!("start={}", period.start.format("%m%d")))
            .arg(format!("end={}", period.end.format("%m%d")))
            .arg(format!("TopCount={}", TOP_COUNT))
            .arg("-t")
            .arg("hourper")
            .arg("--tres=cpu")
            .arg("-n")
    }

    pub fn parse(text: &str, period: Period) -> TopUsers {
        let mut users = Vec::new();
        let mut skipped = Vec::new();

        for (line, content) in lines(text) {
            if is_separator(content) || is_header(content, &["Cluster", "Login"]) {
                continue;
            }

            match UserUsage::parse_line(content) {
                LineOutcome::Parsed(usage) => users.push(usage),
                LineOutcome::Skipped(reason) => skipped.push(Skipped::log("sreport", line, reason)),
            }
        }

        // Stable sort, so that ties keep the order reported by sreport
        users.sort_by(|a, b| b.cpu_percent.total_cmp(&a.cpu_percent));
        users.truncate(TOP_USERS);

        TopUsers {
            users,
            period,
            skipped,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use indoc::indoc;

    use super::*;

    fn period() -> Period {
        Period {
            start: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        }
    }

    /// Formats a line using the fixed column widths of `sreport`
    fn fixed(login: &str, name: &str, account: &str, usage: &str) -> String {
        format!(
            "{:<10}{:<10}{:<15}{:<15}{:<15}{}",
            "hpc", login, name, account, "cpu", usage
        )
    }

    #[test]
    fn test_command() {
        assert_eq!(
            TopUsers::command("sreport", &period()).to_string(),
            "sreport user top start=0201 end=0302 TopCount=50 -t hourper --tres=cpu -n"
        );
    }

    #[test]
    fn test_parse_usage() {
        assert_eq!(parse_usage("1051(16.23%)"), (1051.0, 16.23));
        assert_eq!(parse_usage("500"), (500.0, 0.0));
        assert_eq!(parse_usage("abc"), (0.0, 0.0));
        assert_eq!(parse_usage("12(x%)"), (0.0, 0.0));
        assert_eq!(parse_usage("1(2(3%)"), (0.0, 0.0));
        assert_eq!(parse_usage(""), (0.0, 0.0));
    }

    #[test]
    fn test_parse_usage_out_of_range() {
        assert_eq!(parse_usage("nan"), (0.0, 0.0));
        assert_eq!(parse_usage("inf"), (0.0, 0.0));
        assert_eq!(parse_usage("10(inf%)"), (0.0, 0.0));
        assert_eq!(parse_usage("10(NaN%)"), (0.0, 0.0));
        assert_eq!(parse_usage("-5(-3%)"), (0.0, 0.0));
        assert_eq!(parse_usage("5(100.5%)"), (0.0, 0.0));
        assert_eq!(parse_usage("0(0%)"), (0.0, 0.0));
        assert_eq!(parse_usage("10(100%)"), (10.0, 100.0));
    }

    #[test]
    fn test_token_scan_layout() {
        let usage = Layout::TokenScan
            .parse("   hpc     alice   Alice Smith     physics    cpu    1051(16.23%)")
            .unwrap();

        assert_eq!(usage.user, "alice");
        assert_eq!(usage.account, "physics");
        assert_eq!(usage.cpu_hours, 1051.0);
        assert_eq!(usage.cpu_percent, 16.23);

        assert_eq!(
            Layout::TokenScan.parse("hpc alice physics cpu 10"),
            Err(SkipReason::TooFewTokens {
                expected: 6,
                found: 5
            })
        );
        assert_eq!(
            Layout::TokenScan.parse("hpc alice Alice Smith physics gpu 10(1%)"),
            Err(SkipReason::NoCpuToken)
        );
    }

    #[test]
    fn test_fixed_width_layout() {
        let line = fixed("bob", "Bob Jones", "chemistry", "20(0.31%)");
        let usage = Layout::FixedWidth.parse(&line).unwrap();

        assert_eq!(usage.user, "bob");
        assert_eq!(usage.account, "chemistry");
        assert_eq!(usage.cpu_hours, 20.0);
        assert_eq!(usage.cpu_percent, 0.31);

        assert!(matches!(
            Layout::FixedWidth.parse("hpc bob"),
            Err(SkipReason::InvalidField { .. })
        ));
    }

    #[test]
    fn test_fallback_to_fixed_width() {
        // A 15 character account runs into the TRES name
        let line = fixed("carol", "Carol Ann", "bioinformatics1", "300(4.5%)");
        assert_eq!(Layout::TokenScan.parse(&line), Err(SkipReason::NoCpuToken));

        match UserUsage::parse_line(&line) {
            LineOutcome::Parsed(usage) => {
                assert_eq!(usage.user, "carol");
                assert_eq!(usage.account, "bioinformatics1");
                assert_eq!(usage.cpu_percent, 4.5);
            }
            LineOutcome::Skipped(reason) => panic!("line skipped: {}", reason),
        }

        assert_eq!(
            UserUsage::parse_line("some unrelated line of text here"),
            LineOutcome::Skipped(SkipReason::NoCpuToken)
        );
    }

    #[test]
    fn test_truncated_login() {
        let usage = Layout::TokenScan
            .parse("hpc verylongna+ Some Name physics cpu 1(0.1%)")
            .unwrap();

        assert_eq!(usage.user, "verylongna");
    }

    #[test]
    fn test_parse_report() {
        let output = indoc! {"
            --------------------------------------------------------------------------------
            Top 50 Users 2024-02-01T00:00:00 - 2024-03-01T23:59:59 (2592000 secs)
            Usage reported in TRES Hours/Percentage of Total
            --------------------------------------------------------------------------------
              Cluster     Login     Proper Name         Account      TRES Name                Used
            --------- --------- --------------- --------------- -------------- ------------------
                  hpc     alice     Alice Smith         physics            cpu      1051(16.23%)
                  hpc       bob       Bob Jones       chemistry            cpu        20(0.31%)
                  hpc     carol           Carol         biology            cpu      3000(46.33%)
                  hpc      dave            Dave         physics            cpu          oops
                  hpc       eve             Eve         physics            cpu       400(6.18%)
                  hpc     frank           Frank         biology            cpu       400(6.18%)
                  hpc     grace           Grace         biology            cpu       900(13.9%)
        "};

        let report = TopUsers::parse(output, period());
        assert_eq!(report.period, period());
        assert_eq!(
            report.users.iter().map(|u| u.user.as_str()).collect::<Vec<_>>(),
            ["carol", "alice", "grace", "eve", "frank"]
        );
        assert_eq!(
            report.skipped.iter().map(|s| s.line).collect::<Vec<_>>(),
            [2, 3]
        );
    }

    #[test]
    fn test_ranking() {
        let output = (0..12)
            .map(|n| format!("hpc user{} Name account{} cpu {}({}%)", n, n, n * 10, n))
            .collect::<Vec<_>>()
            .join("\n");

        let report = TopUsers::parse(&output, period());
        assert_eq!(report.users.len(), TOP_USERS);
        assert!(report
            .users
            .windows(2)
            .all(|w| w[0].cpu_percent >= w[1].cpu_percent));
        assert_eq!(report.users[0].user, "user11");
        assert_eq!(report.users[0].cpu_hours, 110.0);
    }

    #[test]
    fn test_ranking_ignores_invalid_usage() {
        let output = indoc! {"
            hpc alice Alice physics cpu 10(50%)
            hpc mallory M physics cpu 1(NaN%)
            hpc trudy T physics cpu inf(20%)
        "};

        let report = TopUsers::parse(output, period());
        let ranked = report
            .users
            .iter()
            .map(|u| (u.user.as_str(), u.cpu_hours, u.cpu_percent))
            .collect::<Vec<_>>();

        assert_eq!(
            ranked,
            [
                ("alice", 10.0, 50.0),
                ("mallory", 0.0, 0.0),
                ("trudy", 0.0, 0.0)
            ]
        );
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn test_parse_empty() {
        let report = TopUsers::parse("", period());
        assert!(report.users.is_empty());
        assert!(report.skipped.is_empty());
    }
}
