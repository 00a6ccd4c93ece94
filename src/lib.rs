/// Application.
pub mod app;
/// Command-line arguments
pub mod args;
/// Terminal events handler
pub mod event;
/// Event handler.
pub mod handler;
/// JSON reports
pub mod report;
/// Querying of Slurm state
pub mod slurm;
/// Terminal user interface
pub mod tui;
/// Widget renderer
pub mod ui;
/// Normalization of report output
pub mod utilities;
/// Custom widgets
pub mod widgets;
