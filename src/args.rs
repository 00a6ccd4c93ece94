use std::path::PathBuf;
use std::time::Duration;

use argh::FromArgs;

use crate::report::Report;
use crate::slurm::Executables;

/// Text-based dashboard for Slurm jobs, nodes and usage reports
#[derive(FromArgs, Debug)]
pub struct Args {
    /// refresh frequency of jobs and nodes in seconds; a value of zero disables automatic updates
    #[argh(option, default = "5")]
    pub interval: u64,

    /// refresh frequency of sreport summaries in seconds; a value of zero disables automatic updates
    #[argh(option, default = "600")]
    pub report_interval: u64,

    /// seconds after which a Slurm command is killed; a value of zero disables the timeout
    #[argh(option, default = "30")]
    pub timeout: u64,

    /// location of `squeue` executable
    #[argh(option, default = "\"squeue\".to_string()")]
    pub squeue: String,

    /// location of `sinfo` executable
    #[argh(option, default = "\"sinfo\".to_string()")]
    pub sinfo: String,

    /// location of `sreport` executable
    #[argh(option, default = "\"sreport\".to_string()")]
    pub sreport: String,

    /// print one report as JSON and exit; one of jobs, nodes, users, usage, or history
    #[argh(option)]
    pub dump: Option<Report>,

    /// write log messages to this file; controlled by RUST_LOG (default "warn")
    #[argh(option)]
    pub log_file: Option<PathBuf>,

    /// print version information
    #[argh(switch, short = 'v')]
    pub version: bool,
}

impl Args {
    pub fn executables(&self) -> Executables {
        Executables {
            squeue: self.squeue.clone(),
            sinfo: self.sinfo.clone(),
            sreport: self.sreport.clone(),
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout > 0).then(|| Duration::from_secs(self.timeout))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Args, argh::EarlyExit> {
        Args::from_args(&["slurmdash"], args)
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]).unwrap();
        assert_eq!(args.interval, 5);
        assert_eq!(args.report_interval, 600);
        assert_eq!(args.timeout(), Some(Duration::from_secs(30)));
        assert_eq!(args.executables(), Executables::default());
        assert_eq!(args.dump, None);
        assert!(args.log_file.is_none());
    }

    #[test]
    fn test_options() {
        let args = parse(&[
            "--sreport",
            "/opt/slurm/bin/sreport",
            "--timeout",
            "0",
            "--dump",
            "history",
            "--log-file",
            "dash.log",
        ])
        .unwrap();

        assert_eq!(args.executables().sreport, "/opt/slurm/bin/sreport");
        assert_eq!(args.executables().squeue, "squeue");
        assert_eq!(args.timeout(), None);
        assert_eq!(args.dump, Some(Report::History));
        assert_eq!(args.log_file, Some(PathBuf::from("dash.log")));
    }

    #[test]
    fn test_invalid_report() {
        assert!(parse(&["--dump", "partitions"]).is_err());
    }
}
