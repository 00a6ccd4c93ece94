use std::{cmp::Ordering, fmt::Display, marker::PhantomData};

use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Layout, Rect},
    style::Stylize,
    text::Text,
    widgets::{
        Row, Scrollbar, ScrollbarOrientation, ScrollbarState, StatefulWidget, StatefulWidgetRef,
        Table, TableState,
    },
};

use super::misc::COLUMN_SPACING;

/// User selected sort order of columns
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    #[default]
    Descending,
}

impl SortOrder {
    pub fn toggle(self) -> SortOrder {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }

    /// Orders an ascending comparison according to this sort order
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }

    fn marker(self) -> &'static str {
        match self {
            SortOrder::Ascending => "▲",
            SortOrder::Descending => "▼",
        }
    }
}

pub trait GenericTableState<C>
where
    C: Copy + Display + PartialEq,
{
    fn focus(&self) -> bool;

    fn nrows(&self) -> usize;

    fn columns(&self) -> &[C];

    /// Column and order by which rows are currently sorted
    fn sort(&self) -> Option<(C, SortOrder)> {
        None
    }

    /// Returns the text object for a given row and column. `width` is the
    /// final width of variable width columns, and zero while measuring
    /// fixed width columns
    fn text<'a>(&self, width: u16, row: usize, column: C) -> Text<'a>;

    /// Returns true if a column should grow to consume available space
    fn variable_width(&self, _column: C) -> bool {
        false
    }

    /// Returns TableState object used by the actual table
    fn inner_state(&mut self) -> &mut TableState;

    /// Returns the currently selected row
    fn selected(&self) -> Option<usize>;
}

/// Table with one header row and a scrollbar, rendering any [`GenericTableState`]
#[derive(Debug, Default)]
pub struct GenericTable<C, S> {
    c: PhantomData<C>,
    s: PhantomData<S>,
}

impl<C, S> GenericTable<C, S>
where
    C: Copy + Display + PartialEq,
    S: GenericTableState<C>,
{
    pub fn new() -> Self {
        Self {
            c: PhantomData,
            s: PhantomData,
        }
    }

    /// Width of each column; variable width columns share what remains of `width`
    fn widths(state: &S, width: u16) -> Vec<u16> {
        let sort = state.sort();
        let fixed = state
            .columns()
            .iter()
            .map(|&column| {
                if state.variable_width(column) {
                    None
                } else {
                    let mut width = header(column, sort).chars().count();
                    for row in 0..state.nrows() {
                        width = width.max(state.text(0, row, column).width());
                    }

                    Some(width as u16)
                }
            })
            .collect::<Vec<_>>();

        let variable = fixed.iter().filter(|w| w.is_none()).count() as u16;
        let spacing = fixed.len().saturating_sub(1) as u16 * COLUMN_SPACING;
        let used = fixed.iter().flatten().sum::<u16>() + spacing;
        let remaining = width.saturating_sub(used) / variable.max(1);

        fixed
            .into_iter()
            .map(|w| w.unwrap_or(remaining))
            .collect()
    }
}

impl<C, S> StatefulWidgetRef for GenericTable<C, S>
where
    C: Copy + Display + PartialEq,
    S: GenericTableState<C>,
{
    type State = S;

    fn render_ref(&self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let area = render_scrollbar(area, buf, state.nrows(), state.selected());
        let widths = Self::widths(state, area.width);

        let sort = state.sort();
        let header = Row::new(state.columns().iter().map(|&c| header(c, sort))).bold();

        let mut rows = Vec::with_capacity(state.nrows());
        for idx in 0..state.nrows() {
            let mut row = Row::new(
                state
                    .columns()
                    .iter()
                    .zip(&widths)
                    .map(|(&column, &width)| state.text(width, idx, column)),
            );

            // Used instead of Table::highlight_style so that it doesn't override the style of
            // individual cells; utilization bars use both fg and bg colors to draw fractions.
            if state.focus() && state.selected() == Some(idx) {
                row = row.reversed();
            }

            rows.push(row);
        }

        let table = Table::new(rows, widths.into_iter().map(Constraint::Length))
            .column_spacing(COLUMN_SPACING)
            .header(header);

        StatefulWidget::render(table, area, buf, state.inner_state());
    }
}

/// Column label, with a marker if the table is sorted by this column
fn header<C: Display + PartialEq>(column: C, sort: Option<(C, SortOrder)>) -> String {
    match sort {
        Some((sorted, order)) if sorted == column => format!("{} {}", column, order.marker()),
        _ => column.to_string(),
    }
}

/// Draws a scrollbar along the right side of `area`, below the header row, and
/// returns the area left for the table itself
fn render_scrollbar(area: Rect, buf: &mut Buffer, items: usize, selected: Option<usize>) -> Rect {
    let [table, bar] = Layout::horizontal([Constraint::Fill(1), Constraint::Length(2)]).areas(area);
    let [_, track] = Layout::vertical([Constraint::Length(1), Constraint::Fill(1)]).areas(bar);

    let mut state = ScrollbarState::new(items).position(selected.unwrap_or_default());
    Scrollbar::new(ScrollbarOrientation::VerticalRight)
        .begin_symbol(None)
        .end_symbol(None)
        .track_symbol(None)
        .thumb_symbol("▐")
        .render(track, buf, &mut state);

    table
}
