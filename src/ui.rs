use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Position, Rect},
    style::Stylize,
    symbols::{self, border},
    text::Line,
    widgets::{Block, Borders, StatefulWidgetRef, Widget, WidgetRef},
};

use crate::{
    app::Dashboard,
    slurm::{unique_values, ClusterUsage, JobStats, NodeStats, Period, TimeSeries, TOP_USERS},
    widgets::{
        JobTable, JobTableState, NodeTable, NodeTableState, Summary, UserTable, UserTableState,
        Utilization, UtilizationHistory,
    },
};

/// Height of the report panels: one row per user, a header, and borders
const REPORT_HEIGHT: u16 = TOP_USERS as u16 + 3;

#[derive(Debug, Default, PartialEq, Eq)]
enum Focus {
    #[default]
    Jobs,
    Nodes,
}

#[derive(Debug, Default)]
pub struct UI {
    /// Indicates if the node list or job list has focus
    focus: Focus,
    nodes: NodeTable,
    node_state: NodeTableState,
    jobs: JobTable,
    job_state: JobTableState,
    users: UserTable,
    user_state: UserTableState,
    /// Cluster-wide counts shown in the summary line
    job_stats: JobStats,
    job_users: usize,
    node_stats: NodeStats,
    cpus: Utilization,
    usage: Option<ClusterUsage>,
    period: Option<Period>,
    history: TimeSeries,
    /// Areas of the last rendered tables; used to determine mouse-click targets
    node_area: Rect,
    job_area: Rect,
}

impl UI {
    pub fn new(dashboard: &Dashboard) -> Self {
        let mut ui = Self::default();
        // Set initial focus on job list
        ui.job_state.focus(true);
        ui.update(dashboard);
        ui
    }

    pub fn update(&mut self, dashboard: &Dashboard) {
        self.job_state
            .update(&dashboard.jobs.jobs, dashboard.job_error.as_deref());
        self.job_stats = dashboard.jobs.stats;
        self.job_users = unique_values(dashboard.jobs.jobs.iter().map(|job| &job.user));

        self.node_state.update(&dashboard.nodes.nodes);
        self.node_stats = dashboard.nodes.stats;
        self.cpus = dashboard.nodes.cpu_utilization();

        match &dashboard.users {
            Some(report) => {
                self.user_state.update(&report.users);
                self.period = Some(report.period);
            }
            None => {
                self.user_state.update(&[]);
                self.period = None;
            }
        }

        self.usage = dashboard.usage.clone();
        self.history = dashboard.history.clone();
    }

    pub fn scroll(&mut self, delta: isize) {
        match self.focus {
            Focus::Nodes => self.node_state.scroll(delta),
            Focus::Jobs => self.job_state.scroll(delta),
        }
    }

    pub fn set_sort_column(&mut self, delta: isize) {
        self.job_state.cycle_sort_column(delta);
    }

    pub fn toggle_sort_order(&mut self) {
        self.job_state.toggle_sort_order();
    }

    pub fn mouse_click(&mut self, column: u16, row: u16) {
        if let Some((focus, area)) = self.focus_at(column, row) {
            if self.focus != focus {
                self.toggle_focus();
            }

            let row = (row - area.y) as usize;
            match focus {
                Focus::Nodes => self.node_state.click(row),
                Focus::Jobs => self.job_state.click(row),
            }
        }
    }

    pub fn mouse_wheel(&mut self, column: u16, row: u16, delta: isize) {
        match self.focus_at(column, row) {
            Some((Focus::Jobs, _)) => self.job_state.scroll(delta),
            Some((Focus::Nodes, _)) => self.node_state.scroll(delta),
            None => {}
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Jobs => Focus::Nodes,
            Focus::Nodes => Focus::Jobs,
        };

        self.node_state.focus(self.focus == Focus::Nodes);
        self.job_state.focus(self.focus == Focus::Jobs);
    }

    pub fn toggle_unavailable(&mut self) {
        self.node_state.toggle_unavailable();
    }

    pub fn render(&mut self, area: Rect, buf: &mut Buffer) {
        let [summary, main] =
            Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(area);

        Summary {
            jobs: &self.job_stats,
            users: self.job_users,
            nodes: &self.node_stats,
            cpus: self.cpus.clone(),
            usage: self.usage.as_ref(),
        }
        .render_ref(summary, buf);

        // Require space for a few rows of each table before showing the sreport panels
        let tables = if main.height >= REPORT_HEIGHT + 2 * (3 + 2) + 3 {
            let [tables, reports] =
                Layout::vertical([Constraint::Fill(1), Constraint::Length(REPORT_HEIGHT)])
                    .areas(main);

            self.render_reports(reports, buf);
            tables
        } else {
            main
        };

        // +2 for top border and an empty line to clearly indicate the end of the list
        let [nodes, jobs] = Layout::vertical([
            Constraint::Max((self.node_state.height() + 2).max(5)),
            Constraint::Min(4),
        ])
        .areas(tables);

        self.render_nodes(nodes, buf);
        self.render_jobs(jobs, buf, UI::instructions());
    }

    fn focus_at(&self, column: u16, row: u16) -> Option<(Focus, Rect)> {
        let position = Position::new(column, row);
        if self.job_area.contains(position) {
            Some((Focus::Jobs, self.job_area))
        } else if self.node_area.contains(position) {
            Some((Focus::Nodes, self.node_area))
        } else {
            None
        }
    }

    fn render_nodes(&mut self, area: Rect, buf: &mut Buffer) {
        let block = Block::default()
            .title_top(Line::from(" Nodes ").bold().centered())
            .borders(Borders::TOP | Borders::LEFT | Borders::RIGHT)
            .border_set(border::PLAIN);

        self.node_area = block.inner(area);
        self.nodes.render_ref(self.node_area, buf, &mut self.node_state);
        block.render(area, buf);
    }

    fn render_jobs(&mut self, area: Rect, buf: &mut Buffer, instructions: Line) {
        // Join border with border-less bottom of nodes table
        let border = symbols::border::Set {
            top_left: symbols::line::NORMAL.vertical_right,
            top_right: symbols::line::NORMAL.vertical_left,
            ..symbols::border::PLAIN
        };

        let block = Block::default()
            .title_top(Line::from(" Jobs ").bold().centered())
            .title_bottom(instructions)
            .borders(Borders::ALL)
            .border_set(border);

        self.job_area = block.inner(area);
        self.jobs.render_ref(self.job_area, buf, &mut self.job_state);
        block.render(area, buf);
    }

    fn render_reports(&mut self, area: Rect, buf: &mut Buffer) {
        let [users, history] =
            Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)])
                .areas(area);

        let title = match &self.period {
            Some(period) => format!(" Top users {} ", period),
            None => " Top users ".to_string(),
        };

        let block = Block::bordered()
            .title_top(Line::from(title).bold().centered())
            .border_set(border::PLAIN);
        self.users
            .render_ref(block.inner(users), buf, &mut self.user_state);
        block.render(users, buf);

        let block = Block::bordered()
            .title_top(Line::from(" Utilization, last 24 hours ").bold().centered())
            .border_set(border::PLAIN);
        UtilizationHistory::new(&self.history).render_ref(block.inner(history), buf);
        block.render(history, buf);
    }

    fn instructions() -> Line<'static> {
        Line::from(vec![
            " <Tab> ".bold(),
            "Focus".into(),
            " <←/→> ".bold(),
            "Sort by".into(),
            " <S> ".bold(),
            "Sort order".into(),
            " <H> ".bold(),
            "Hide/Show unavailable".into(),
            " <R> ".bold(),
            "Refresh".into(),
            " <U> ".bold(),
            "Update reports".into(),
            " <Q> ".bold(),
            "Quit ".into(),
        ])
        .centered()
    }
}
