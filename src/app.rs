use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};

use crate::args::Args;
use crate::slurm::{
    ClusterUsage, JobList, NodeReport, Reporter, Slurm, SystemReporter, TimeSeries, TopUsers,
};

/// Minimum number of seconds between refreshes of the sreport summaries
pub const MIN_REPORT_INTERVAL: u64 = 10;

/// Most recent results of every report
#[derive(Debug, Default)]
pub struct Dashboard {
    pub jobs: JobList,
    /// Set if the job list could not be parsed
    pub job_error: Option<String>,
    pub nodes: NodeReport,
    pub users: Option<TopUsers>,
    pub usage: Option<ClusterUsage>,
    pub history: TimeSeries,
}

#[derive(Debug)]
pub struct App<R = SystemReporter> {
    /// Is the application running?
    pub running: bool,
    /// Command-line args
    pub args: Args,
    pub dashboard: Dashboard,
    slurm: Slurm<R>,
    /// Time of last update of jobs and nodes
    last_update: Option<Instant>,
    /// Time of last update of sreport summaries
    last_report: Option<Instant>,
}

impl App {
    /// Constructs a new instance of [`App`] running the Slurm commands named in `args`.
    pub fn new(args: Args) -> Self {
        let slurm = Slurm::new(SystemReporter::new(args.timeout()), args.executables());
        Self::with_slurm(args, slurm)
    }
}

impl<R: Reporter> App<R> {
    pub fn with_slurm(args: Args, slurm: Slurm<R>) -> Self {
        let mut app = Self {
            running: true,
            args,
            dashboard: Dashboard::default(),
            slurm,
            last_update: None,
            last_report: None,
        };

        app.refresh_queue();
        app.refresh_reports();
        app
    }

    /// Handles the tick event of the terminal, returning true if anything was updated.
    pub fn tick(&mut self) -> bool {
        let mut updated = false;
        if self.args.interval > 0 {
            updated |= self.update(self.args.interval);
        }

        if self.args.report_interval > 0 {
            updated |= self.update_reports(self.args.report_interval);
        }

        updated
    }

    /// Force update of jobs and nodes
    pub fn update(&mut self, interval: u64) -> bool {
        // A minimum refresh rate is enforced to prevent the user just holding `r`
        let update_rate = Duration::from_secs(interval.max(1));
        if due(self.last_update, update_rate) {
            self.refresh_queue();
            return true;
        }

        false
    }

    /// Update sreport summaries if `interval` seconds have passed, returning
    /// true if they were refreshed
    pub fn update_reports(&mut self, interval: u64) -> bool {
        // Each refresh runs dozens of sreport commands
        let update_rate = Duration::from_secs(interval.max(MIN_REPORT_INTERVAL));
        if due(self.last_report, update_rate) {
            self.refresh_reports();
            return true;
        }

        false
    }

    /// Set running to false to quit the application.
    pub fn quit(&mut self) {
        self.running = false;
    }

    fn refresh_queue(&mut self) {
        match self.slurm.jobs() {
            Ok(jobs) => {
                self.dashboard.jobs = jobs;
                self.dashboard.job_error = None;
            }
            Err(error) => {
                log::error!("failed to parse job list: {}", error);
                self.dashboard.jobs = JobList::default();
                self.dashboard.job_error = Some(error.to_string());
            }
        }

        self.dashboard.nodes = self.slurm.nodes();
        self.last_update = Some(Instant::now());
    }

    fn refresh_reports(&mut self) {
        let now = now();
        log::debug!("updating sreport summaries at {}", now);

        self.dashboard.users = Some(self.slurm.top_users(now));
        self.dashboard.usage = Some(self.slurm.cluster_usage(now));
        self.dashboard.history = self.slurm.history(now);
        self.last_report = Some(Instant::now());
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Returns true if `interval` has passed since `last`, or if there was no last time
fn due(last: Option<Instant>, interval: Duration) -> bool {
    last.map_or(true, |last| last.elapsed() >= interval)
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use argh::FromArgs;

    use super::*;
    use crate::slurm::{Executables, ReportCommand};

    fn args(args: &[&str]) -> Args {
        Args::from_args(&["slurmdash"], args).unwrap()
    }

    fn reporter(command: &ReportCommand) -> String {
        match command.program.as_str() {
            "squeue" => "1|alice|compute|a|RUNNING|1:00|2:00|1|4|node01\n".to_string(),
            "sinfo" => "node01|compute*|mix|4/4/0/8|64000|1000|100\n".to_string(),
            _ => "hpc 30 0 0 70 0 100\n".to_string(),
        }
    }

    fn app(args: Args) -> App<fn(&ReportCommand) -> String> {
        let slurm = Slurm::new(reporter as fn(&ReportCommand) -> String, Executables::default());
        App::with_slurm(args, slurm)
    }

    #[test]
    fn test_initial_state() {
        let app = app(args(&[]));
        assert!(app.running);
        assert_eq!(app.dashboard.jobs.stats.total, 1);
        assert!(app.dashboard.job_error.is_none());
        assert_eq!(app.dashboard.nodes.nodes.len(), 1);
        assert_eq!(app.dashboard.history.samples.len(), 48);
        assert!(app.dashboard.usage.as_ref().is_some_and(|u| u.sample.is_ok()));
        // The usage line is not a valid user line
        assert!(app.dashboard.users.as_ref().is_some_and(|u| u.users.is_empty()));
    }

    #[test]
    fn test_minimum_refresh_rate() {
        let mut app = app(args(&[]));
        assert!(!app.update(1));
        assert!(!app.tick());

        app.last_update = None;
        assert!(app.update(1));
        assert!(!app.update(1));
    }

    #[test]
    fn test_disabled_updates() {
        let mut app = app(args(&["--interval", "0", "--report-interval", "0"]));
        app.last_update = None;
        app.last_report = None;
        assert!(!app.tick());
    }

    #[test]
    fn test_report_interval() {
        let mut app = app(args(&["--interval", "0", "--report-interval", "60"]));
        assert!(!app.tick());

        app.last_report = None;
        assert!(app.tick());
        assert!(app.last_report.is_some());
        assert!(!app.tick());
    }

    #[test]
    fn test_minimum_report_rate() {
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let slurm = Slurm::new(
            move |command: &ReportCommand| {
                if command.program == "sreport" {
                    counter.set(counter.get() + 1);
                }
                String::new()
            },
            Executables::default(),
        );

        let mut app = App::with_slurm(args(&[]), slurm);
        let initial = calls.get();
        assert!(initial > 0);
        assert!(!app.update_reports(0));
        assert_eq!(calls.get(), initial);

        app.last_report = None;
        assert!(app.update_reports(0));
        assert!(!app.update_reports(0));
        assert_eq!(calls.get(), 2 * initial);
    }

    #[test]
    fn test_job_error() {
        let slurm = Slurm::new(
            |command: &ReportCommand| match command.program.as_str() {
                "squeue" => "1|alice\n".to_string(),
                _ => String::new(),
            },
            Executables::default(),
        );

        let app = App::with_slurm(args(&[]), slurm);
        assert!(app.dashboard.jobs.jobs.is_empty());
        assert_eq!(
            app.dashboard.job_error.as_deref(),
            Some("line 1: expected 9 or 10 fields, found 2")
        );
    }

    #[test]
    fn test_quit() {
        let mut app = app(args(&[]));
        app.quit();
        assert!(!app.running);
    }
}
