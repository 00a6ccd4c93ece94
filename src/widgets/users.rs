use std::fmt;

use ratatui::{
    buffer::Buffer,
    layout::Rect,
    text::Text,
    widgets::{StatefulWidgetRef, TableState},
};

use crate::slurm::UserUsage;

use super::{
    misc::{render_notice, right_align_text},
    table::{GenericTable, GenericTableState},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Column {
    Rank,
    User,
    Account,
    Hours,
    Share,
}

const COLUMNS: [Column; 5] = [
    Column::Rank,
    Column::User,
    Column::Account,
    Column::Hours,
    Column::Share,
];

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Column::Rank => "#",
            Column::User => "User",
            Column::Account => "Account",
            Column::Hours => "CPU hours",
            Column::Share => "CPU %",
        })
    }
}

/// Ranked CPU usage; rows are never selected
#[derive(Debug, Default)]
pub struct UserTableState {
    table: TableState,
    users: Vec<UserUsage>,
}

impl UserTableState {
    pub fn update(&mut self, users: &[UserUsage]) {
        self.users.clear();
        self.users.extend_from_slice(users);
    }
}

impl GenericTableState<Column> for UserTableState {
    fn focus(&self) -> bool {
        false
    }

    fn nrows(&self) -> usize {
        self.users.len()
    }

    fn columns(&self) -> &[Column] {
        &COLUMNS
    }

    fn variable_width(&self, column: Column) -> bool {
        matches!(column, Column::Account)
    }

    fn text<'a>(&self, _width: u16, row: usize, column: Column) -> Text<'a> {
        let usage = &self.users[row];
        match column {
            Column::Rank => right_align_text(row + 1),
            Column::User => usage.user.clone().into(),
            Column::Account => usage.account.clone().into(),
            Column::Hours => right_align_text(format!("{:.0}", usage.cpu_hours)),
            Column::Share => right_align_text(format!("{:.2}", usage.cpu_percent)),
        }
    }

    fn inner_state(&mut self) -> &mut TableState {
        &mut self.table
    }

    fn selected(&self) -> Option<usize> {
        None
    }
}

#[derive(Debug, Default)]
pub struct UserTable {}

impl UserTable {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatefulWidgetRef for UserTable {
    type State = UserTableState;

    fn render_ref(&self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        if state.users.is_empty() {
            render_notice(area, buf, "No usage reported");
        } else {
            GenericTable::<Column, UserTableState>::new().render_ref(area, buf, state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let mut state = UserTableState::default();
        state.update(&[
            UserUsage {
                user: "carol".into(),
                account: "biology".into(),
                cpu_percent: 46.33,
                cpu_hours: 3000.0,
            },
            UserUsage {
                user: "alice".into(),
                account: "physics".into(),
                cpu_percent: 16.2,
                cpu_hours: 1051.4,
            },
        ]);

        let area = Rect::new(0, 0, 60, 3);
        let mut buf = Buffer::empty(area);
        UserTable::new().render_ref(area, &mut buf, &mut state);

        let lines = (0..area.height)
            .map(|y| (0..area.width).map(|x| buf[(x, y)].symbol()).collect::<String>())
            .collect::<Vec<_>>();

        assert!(lines[0].starts_with("#  User"));
        assert!(lines[1].starts_with("1  carol"));
        assert!(lines[1].contains("3000  46.33"));
        assert!(lines[2].contains("1051  16.20"));
    }
}
