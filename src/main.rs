use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing::info;

mod controller;
mod dataset;
mod domain;
mod filter;
mod inputter;
mod loader;
mod logging;
mod model;
mod sort;
mod ui;
mod view;

use controller::Controller;
use domain::{Message, TVConfig, TVError};
use loader::{Loader, Source};
use model::{Model, Status};
use ui::TableUI;

/// View a tab separated table from a URL or a local file.
#[derive(Parser, Debug)]
#[command(name = "tsvt", version, about, long_about = None)]
struct Args {
    /// URL (http/https) or path of the tab separated data
    source: String,

    /// Milliseconds to wait for terminal events between redraws
    #[arg(long, default_value_t = 100)]
    poll_ms: u64,

    /// Upper bound for the rendered width of a column
    #[arg(long, default_value_t = 32)]
    max_column_width: usize,

    /// Give up on a request after this many seconds, no timeout by default
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn config(&self) -> TVConfig {
        TVConfig::default()
            .with_event_poll_time(self.poll_ms)
            .with_max_column_width(self.max_column_width)
            .with_fetch_timeout(self.timeout_secs.map(Duration::from_secs))
    }
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = logging::init(args.log_file.as_deref(), &args.log_level) {
        eprintln!("Error: could not set up logging: {e}");
        return ExitCode::FAILURE;
    }

    match run(&args) {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

/// Everything that can fail before the terminal is switched into raw mode.
fn prepare(args: &Args) -> Result<(TVConfig, Source), TVError> {
    let config = args.config();
    let source = Source::parse(&args.source)?;
    Ok((config, source))
}

fn run(args: &Args) -> Result<(), TVError> {
    let (config, source) = prepare(args)?;
    info!("Starting tsvt for {source:?} with {config:?}");

    let mut terminal = ratatui::init();
    let result = event_loop(&mut terminal, &config, source);
    ratatui::restore();
    result
}

fn event_loop(
    terminal: &mut ratatui::DefaultTerminal,
    config: &TVConfig,
    source: Source,
) -> Result<(), TVError> {
    let size = terminal.size()?;
    let mut model = Model::init(
        config,
        Some(source),
        size.width as usize,
        size.height as usize,
    );
    let ui = TableUI::new();
    let controller = Controller::new(config);
    let loader = Loader::new(config);

    while model.status != Status::Quitting {
        for (source, ticket) in model.take_load_requests() {
            loader.spawn(source, ticket);
        }
        while let Some((ticket, result)) = loader.try_recv() {
            model.update(Some(Message::Loaded(ticket, result)))?;
        }

        // Render the current view
        let uidata = model.ui_data();
        terminal.draw(|f| ui.draw(&uidata, f))?;

        // Handle events and map to a Message
        if let Some(message) = controller.handle_event(&model)? {
            model.update(Some(message))?;
        }
    }

    info!("Quitting tsvt");
    Ok(())
}
