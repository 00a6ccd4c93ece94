use std::error::Error;
use std::fs::File;
use std::io;

use chrono::Local;
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use slurmdash::app::App;
use slurmdash::args::Args;
use slurmdash::event::{Event, EventHandler};
use slurmdash::handler::{handle_key_events, handle_mouse_events};
use slurmdash::report::Report;
use slurmdash::slurm::{Slurm, SystemReporter};
use slurmdash::tui::Tui;
use slurmdash::ui::UI;

fn main() -> Result<(), Box<dyn Error>> {
    let args: Args = argh::from_env();
    if args.version {
        println!("slurmdash v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    init_logging(&args)?;

    if let Some(report) = args.dump {
        color_eyre::install()?;
        dump(&args, report)?;
        return Ok(());
    }

    let mut app = App::new(args);
    let mut ui = UI::new(&app.dashboard);

    // Initialize the terminal user interface
    let backend = CrosstermBackend::new(io::stderr());
    let terminal = Terminal::new(backend)?;
    let events = EventHandler::new(50);
    let mut tui = Tui::new(terminal, events);
    tui.init()?;
    tui.draw(&mut ui)?;

    // Main loop
    while app.running {
        let redraw = match tui.events.next()? {
            Event::Tick => {
                if app.tick() {
                    ui.update(&app.dashboard);
                    true
                } else {
                    false
                }
            }
            Event::Key(key_event) => handle_key_events(key_event, &mut app, &mut ui),
            Event::Mouse(mouse_event) => handle_mouse_events(mouse_event, &mut ui),
            Event::Resize(_, _) => true,
        };

        if redraw {
            tui.draw(&mut ui)?;
        }
    }

    tui.exit()?;
    Ok(())
}

/// Logs to `--log-file` if given. Otherwise only `--dump` logs (to stderr),
/// since messages written to the terminal would corrupt the dashboard.
fn init_logging(args: &Args) -> Result<()> {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));

    if let Some(path) = &args.log_file {
        let file = File::create(path)
            .wrap_err_with(|| format!("failed to create log file {}", path.display()))?;
        builder.target(env_logger::Target::Pipe(Box::new(file)));
    } else if args.dump.is_none() {
        return Ok(());
    }

    builder.init();
    Ok(())
}

/// Prints a single report as JSON
fn dump(args: &Args, report: Report) -> Result<()> {
    let slurm = Slurm::new(SystemReporter::new(args.timeout()), args.executables());
    let value = report.to_json(&slurm, Local::now().naive_local())?;
    println!("{}", serde_json::to_string_pretty(&value)?);

    Ok(())
}
