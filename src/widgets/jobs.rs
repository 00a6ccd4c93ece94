use std::{cmp::Ordering, fmt};

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Stylize},
    text::Text,
    widgets::{StatefulWidgetRef, TableState},
};

use crate::slurm::{Job, JobState};

use super::{
    misc::{click, render_notice, right_align_text, scroll},
    table::{GenericTable, GenericTableState, SortOrder},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Column {
    JobID,
    User,
    Partition,
    State,
    Time,
    Limit,
    Nodes,
    CPUs,
    Nodelist,
    Name,
}

const COLUMNS: [Column; 10] = [
    Column::JobID,
    Column::User,
    Column::Partition,
    Column::State,
    Column::Time,
    Column::Limit,
    Column::Nodes,
    Column::CPUs,
    Column::Nodelist,
    Column::Name,
];

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Column::JobID => "Job ID",
            Column::User => "User",
            Column::Partition => "Partition",
            Column::State => "State",
            Column::Time => "Time",
            Column::Limit => "Limit",
            Column::Nodes => "Nodes",
            Column::CPUs => "CPUs",
            Column::Nodelist => "Nodelist",
            Column::Name => "Name",
        };

        f.write_str(label)
    }
}

impl Column {
    /// Ascending order of two jobs by this column
    fn compare(self, a: &Job, b: &Job) -> Ordering {
        match self {
            Column::JobID => numeric(&a.id, &b.id),
            Column::User => a.user.cmp(&b.user),
            Column::Partition => a.partition.cmp(&b.partition),
            Column::State => a.state.to_string().cmp(&b.state.to_string()),
            Column::Time => a.runtime().cmp(&b.runtime()),
            // UNLIMITED sorts after any finite limit
            Column::Limit => a
                .limit()
                .unwrap_or(u64::MAX)
                .cmp(&b.limit().unwrap_or(u64::MAX)),
            Column::Nodes => numeric(&a.nodes, &b.nodes),
            Column::CPUs => numeric(&a.cpus, &b.cpus),
            Column::Nodelist => a.nodelist.cmp(&b.nodelist),
            Column::Name => a.name.cmp(&b.name),
        }
        .then_with(|| numeric(&a.id, &b.id))
    }
}

/// Compares values by their leading number, e.g. `9 < 10` and `12_3 < 13`,
/// falling back to plain string comparison
fn numeric(a: &str, b: &str) -> Ordering {
    fn leading(value: &str) -> Option<u64> {
        value
            .split(|c: char| !c.is_ascii_digit())
            .next()
            .and_then(|n| n.parse().ok())
    }

    leading(a).cmp(&leading(b)).then_with(|| a.cmp(b))
}

#[derive(Debug)]
pub struct JobTableState {
    focus: bool,
    table: TableState,
    jobs: Vec<Job>,
    sort_column: Column,
    sort_order: SortOrder,
    /// Shown in place of the table if the job list could not be retrieved
    error: Option<String>,
}

impl JobTableState {
    pub fn focus(&mut self, focus: bool) {
        self.focus = focus;
    }

    pub fn update(&mut self, jobs: &[Job], error: Option<&str>) {
        let selection = self.selected_job().map(|job| job.id.clone());

        self.jobs.clear();
        self.jobs.extend_from_slice(jobs);
        self.error = error.map(str::to_string);
        self.resort(selection);
    }

    /// Sorts by the next (`delta > 0`) or previous column
    pub fn cycle_sort_column(&mut self, delta: isize) {
        let idx = COLUMNS
            .iter()
            .position(|&c| c == self.sort_column)
            .unwrap_or_default() as isize;

        self.sort_column = COLUMNS[(idx + delta).rem_euclid(COLUMNS.len() as isize) as usize];
        self.resort(self.selected_job().map(|job| job.id.clone()));
    }

    pub fn toggle_sort_order(&mut self) {
        self.sort_order = self.sort_order.toggle();
        self.resort(self.selected_job().map(|job| job.id.clone()));
    }

    pub fn selected_job(&self) -> Option<&Job> {
        self.table.selected().and_then(|idx| self.jobs.get(idx))
    }

    pub fn scroll(&mut self, delta: isize) {
        scroll(&mut self.table, self.jobs.len(), delta);
    }

    pub fn click(&mut self, row: usize) {
        click(&mut self.table, self.jobs.len(), row);
    }

    /// Sorts jobs and re-selects the job with the given ID, if it is still present
    fn resort(&mut self, selection: Option<String>) {
        let (column, order) = (self.sort_column, self.sort_order);
        self.jobs.sort_by(|a, b| order.apply(column.compare(a, b)));

        let idx = selection.and_then(|id| self.jobs.iter().position(|job| job.id == id));
        self.table.select(idx);

        // Update/clear job selection depending on the new contents
        self.scroll(0);
    }
}

impl Default for JobTableState {
    fn default() -> Self {
        Self {
            focus: false,
            table: TableState::default(),
            jobs: Vec::default(),
            // Longest running jobs first
            sort_column: Column::Time,
            sort_order: SortOrder::Descending,
            error: None,
        }
    }
}

impl GenericTableState<Column> for JobTableState {
    fn focus(&self) -> bool {
        self.focus
    }

    fn nrows(&self) -> usize {
        self.jobs.len()
    }

    fn columns(&self) -> &[Column] {
        &COLUMNS
    }

    fn sort(&self) -> Option<(Column, SortOrder)> {
        Some((self.sort_column, self.sort_order))
    }

    fn selected(&self) -> Option<usize> {
        self.table.selected()
    }

    fn variable_width(&self, column: Column) -> bool {
        matches!(column, Column::Name)
    }

    fn text<'a>(&self, _width: u16, row: usize, column: Column) -> Text<'a> {
        let job = &self.jobs[row];
        let text = match column {
            Column::JobID => job.id.clone().into(),
            Column::User => job.user.clone().into(),
            Column::Partition => job.partition.clone().into(),
            Column::State => job.state.to_string().into(),
            Column::Time => right_align_text(&job.time),
            Column::Limit => right_align_text(&job.time_limit),
            Column::Nodes => right_align_text(&job.nodes),
            Column::CPUs => right_align_text(&job.cpus),
            Column::Nodelist => Text::from(job.nodelist.clone().unwrap_or_default()),
            Column::Name => job.name.clone().into(),
        };

        match job.state {
            JobState::Running => text,
            JobState::Pending => text.fg(Color::Gray),
            JobState::Other(_) => text.fg(Color::DarkGray),
        }
    }

    fn inner_state(&mut self) -> &mut TableState {
        &mut self.table
    }
}

#[derive(Debug, Default)]
pub struct JobTable {}

impl JobTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatefulWidgetRef for JobTable {
    type State = JobTableState;

    fn render_ref(&self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if let Some(error) = &state.error {
            render_notice(area, buf, error)
        } else if state.jobs.is_empty() {
            render_notice(area, buf, "No jobs found")
        } else {
            GenericTable::<Column, JobTableState>::new().render_ref(area, buf, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use super::*;
    use crate::slurm::JobList;

    fn jobs() -> Vec<Job> {
        let output = indoc! {"
            9|alice|compute|train|RUNNING|1:02:03|2-00:00:00|1|16|node01
            10|bob|gpu|sweep|PENDING|0:00|UNLIMITED|2|32|
            12_3|carol|compute|post|RUNNING|10:00|1:00:00|1|4|node02
        "};

        JobList::parse(output).unwrap().jobs
    }

    fn ids(state: &JobTableState) -> Vec<&str> {
        state.jobs.iter().map(|job| job.id.as_str()).collect()
    }

    fn render(state: &mut JobTableState, width: u16, height: u16) -> Vec<String> {
        let area = Rect::new(0, 0, width, height);
        let mut buf = Buffer::empty(area);
        JobTable::new().render_ref(area, &mut buf, state);

        (0..height)
            .map(|y| (0..width).map(|x| buf[(x, y)].symbol()).collect())
            .collect()
    }

    #[test]
    fn test_default_sort() {
        let mut state = JobTableState::default();
        state.update(&jobs(), None);
        assert_eq!(ids(&state), ["9", "12_3", "10"]);
    }

    #[test]
    fn test_sort_columns() {
        let mut state = JobTableState::default();
        state.update(&jobs(), None);

        // Time -> Limit; unlimited jobs are the longest
        state.cycle_sort_column(1);
        assert_eq!(ids(&state), ["10", "9", "12_3"]);

        state.toggle_sort_order();
        assert_eq!(ids(&state), ["12_3", "9", "10"]);

        // Limit -> Time -> State -> Partition -> User -> JobID
        state.cycle_sort_column(-5);
        assert_eq!(state.sort_column, Column::JobID);
        assert_eq!(ids(&state), ["9", "10", "12_3"]);

        // Wraps around to the last column
        state.cycle_sort_column(-1);
        assert_eq!(state.sort_column, Column::Name);
    }

    #[test]
    fn test_selection_follows_job() {
        let mut state = JobTableState::default();
        state.update(&jobs(), None);
        state.scroll(1);
        assert_eq!(state.selected_job().map(|j| j.id.as_str()), Some("12_3"));

        state.toggle_sort_order();
        assert_eq!(state.selected_job().map(|j| j.id.as_str()), Some("12_3"));

        // Removed jobs fall back to the first row
        let remaining = jobs().into_iter().filter(|j| j.id != "12_3").collect::<Vec<_>>();
        state.update(&remaining, None);
        assert_eq!(state.table.selected(), Some(0));
    }

    #[test]
    fn test_click() {
        let mut state = JobTableState::default();
        state.update(&jobs(), None);
        state.click(3);
        assert_eq!(state.selected_job().map(|j| j.id.as_str()), Some("10"));
    }

    #[test]
    fn test_render() {
        let mut state = JobTableState::default();
        state.update(&jobs(), None);

        let lines = render(&mut state, 120, 6);
        assert!(lines[0].starts_with("Job ID"));
        assert!(lines[0].contains("Time ▼"));
        assert!(lines[1].starts_with("9 "));
        assert!(lines[1].contains("train"));
        assert!(lines[3].contains("UNLIMITED"));
    }

    #[test]
    fn test_render_notices() {
        let mut state = JobTableState::default();
        let lines = render(&mut state, 40, 5);
        assert!(lines.iter().any(|line| line.contains("No jobs found")));

        state.update(&[], Some("squeue failed"));
        let lines = render(&mut state, 40, 5);
        assert!(lines.iter().any(|line| line.contains("squeue failed")));
    }
}
