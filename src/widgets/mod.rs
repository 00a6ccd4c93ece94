mod history;
mod jobs;
mod misc;
mod nodes;
mod summary;
mod table;
mod users;
mod utilization;

pub use history::UtilizationHistory;
pub use jobs::{JobTable, JobTableState};
pub use nodes::{NodeTable, NodeTableState};
pub use summary::Summary;
pub use users::{UserTable, UserTableState};
pub use utilization::Utilization;
