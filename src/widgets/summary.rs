use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::{Color, Stylize},
    text::{Line, Span},
    widgets::{Widget, WidgetRef},
};

use crate::slurm::{ClusterUsage, JobStats, NodeStats};

use super::Utilization;

/// Maximum width of the cluster-wide CPU allocation bar
const BAR_WIDTH: u16 = 30;

/// One-line overview of jobs, nodes and allocated CPUs
#[derive(Debug)]
pub struct Summary<'a> {
    pub jobs: &'a JobStats,
    /// Number of distinct users with jobs
    pub users: usize,
    pub nodes: &'a NodeStats,
    pub cpus: Utilization,
    pub usage: Option<&'a ClusterUsage>,
}

impl<'a> Summary<'a> {
    fn line(&self) -> Line<'a> {
        let separator = || Span::from("  │  ").dark_gray();
        let mut spans = vec![
            "Jobs ".bold(),
            Span::from(format!(
                "{} ({} running, {} pending, {} other) from {} users",
                self.jobs.total,
                self.jobs.running,
                self.jobs.pending,
                self.jobs.other(),
                self.users
            )),
            separator(),
            "Nodes ".bold(),
            Span::from(format!(
                "{} ({} alloc, {} idle, {} resv, ",
                self.nodes.total, self.nodes.allocated, self.nodes.idle, self.nodes.reserved
            )),
            Span::from(format!("{} down", self.nodes.down)).fg(if self.nodes.down > 0 {
                Color::Red
            } else {
                Color::Reset
            }),
            Span::from(")"),
            separator(),
            "Utilization ".bold(),
        ];

        spans.push(match self.usage.map(|usage| &usage.sample) {
            Some(Ok(sample)) => Span::from(format!("{:.2}%", sample.utilization)),
            Some(Err(error)) => Span::from(error.to_string()).fg(Color::Red),
            None => Span::from("pending").dim(),
        });

        spans.push(separator());
        spans.push("CPUs ".bold());
        spans.push(Span::from(format!(
            "{:.0}/{:.0} ",
            self.cpus.allocated, self.cpus.capacity
        )));

        Line::from(spans)
    }
}

impl WidgetRef for Summary<'_> {
    fn render_ref(&self, area: Rect, buf: &mut Buffer) {
        let line = self.line();
        let width = line.width() as u16;
        let [text, bar] = Layout::horizontal([
            Constraint::Length(width),
            Constraint::Max(BAR_WIDTH),
        ])
        .areas(area);

        line.render(text, buf);
        self.cpus.to_line(bar.width).render(bar, buf);
    }
}
