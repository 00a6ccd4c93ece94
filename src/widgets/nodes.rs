use std::fmt;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Stylize},
    text::Text,
    widgets::{StatefulWidgetRef, TableState},
};

use crate::slurm::{Node, NodeClass, NodeState};

use super::{
    misc::{click, mb_to_string, render_notice, right_align_text, scroll},
    table::{GenericTable, GenericTableState},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Column {
    Node,
    Partitions,
    State,
    CPUs,
    Allocation,
    Memory,
    Free,
}

const COLUMNS: [Column; 7] = [
    Column::Node,
    Column::Partitions,
    Column::State,
    Column::CPUs,
    Column::Allocation,
    Column::Memory,
    Column::Free,
];

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self, f)
    }
}

#[derive(Debug, Default)]
pub struct NodeTableState {
    /// Does this widget have focus?
    focus: bool,
    /// Should unavailable nodes be hidden?
    hide_unavailable: bool,
    table: TableState,
    /// All nodes, in the order reported by sinfo
    nodes: Vec<Node>,
    /// Indices into `nodes` of visible rows
    rows: Vec<usize>,
}

impl GenericTableState<Column> for NodeTableState {
    fn focus(&self) -> bool {
        self.focus
    }

    fn nrows(&self) -> usize {
        self.rows.len()
    }

    fn columns(&self) -> &[Column] {
        &COLUMNS
    }

    fn selected(&self) -> Option<usize> {
        self.table.selected()
    }

    fn variable_width(&self, column: Column) -> bool {
        matches!(column, Column::Allocation)
    }

    fn text<'a>(&self, width: u16, row: usize, column: Column) -> Text<'a> {
        let node = &self.nodes[self.rows[row]];
        match column {
            Column::Node => node.name.clone().into(),
            Column::Partitions => Text::from(
                node.partitions
                    .iter()
                    .map(|p| p.to_string())
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Column::State => color_state_text(&node.state),
            Column::CPUs => right_align_text(format!("{}/{}", node.cpus.allocated, node.cpus.total)),
            Column::Allocation => node.cpu_utilization().to_line(width).into(),
            Column::Memory => right_align_text(mb_to_string(node.memory)),
            Column::Free => match node.free_memory {
                Some(mb) => right_align_text(mb_to_string(mb)),
                None => right_align_text("N/A"),
            },
        }
    }

    fn inner_state(&mut self) -> &mut TableState {
        &mut self.table
    }
}

impl NodeTableState {
    pub fn focus(&mut self, focus: bool) {
        self.focus = focus;
    }

    pub fn update(&mut self, nodes: &[Node]) {
        let selection = self.selected_node().map(|node| node.name.clone());
        self.nodes.clear();
        self.nodes.extend_from_slice(nodes);
        self.update_rows(selection);
    }

    pub fn toggle_unavailable(&mut self) {
        let selection = self.selected_node().map(|node| node.name.clone());
        self.hide_unavailable = !self.hide_unavailable;
        self.update_rows(selection);
    }

    pub fn selected_node(&self) -> Option<&Node> {
        self.table
            .selected()
            .and_then(|idx| self.rows.get(idx))
            .map(|&idx| &self.nodes[idx])
    }

    pub fn scroll(&mut self, delta: isize) {
        scroll(&mut self.table, self.rows.len(), delta);
    }

    pub fn click(&mut self, row: usize) {
        click(&mut self.table, self.rows.len(), row);
    }

    /// Number of lines needed to show every row, including the header
    pub fn height(&self) -> u16 {
        self.rows.len() as u16 + 1
    }

    fn update_rows(&mut self, selection: Option<String>) {
        self.rows = self
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| !self.hide_unavailable || node.state.is_available())
            .map(|(idx, _)| idx)
            .collect();

        let idx = selection.and_then(|name| {
            self.rows
                .iter()
                .position(|&idx| self.nodes[idx].name == name)
        });

        self.table.select(idx);
        self.scroll(0);
    }
}

#[derive(Debug, Default)]
pub struct NodeTable {}

impl NodeTable {
    pub fn new() -> NodeTable {
        NodeTable::default()
    }
}

impl StatefulWidgetRef for NodeTable {
    type State = NodeTableState;

    fn render_ref(&self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if state.rows.is_empty() {
            render_notice(area, buf, "No nodes found");
        } else {
            GenericTable::<Column, NodeTableState>::new().render_ref(area, buf, state);
        }
    }
}

/// Colorize a Node state based on its class and availability
fn color_state_text<'a>(state: &NodeState) -> Text<'a> {
    let text = Text::from(state.to_string());

    match state.class() {
        Some(NodeClass::Down) => text.fg(Color::Red),
        Some(NodeClass::Reserved) => text.fg(Color::Cyan),
        _ if !state.is_available() => text.fg(Color::Red),
        _ => text.dim(),
    }
}
