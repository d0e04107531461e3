use std::fs::File;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use cva::controller::Controller;
use cva::domain::{CvaConfig, CvaError, PagePolicy};
use cva::model::{Model, Status};
use cva::records::catalog_for;
use cva::source::{DataSource, FetchQuery};
use cva::ui::TableUI;

#[derive(Parser)]
#[command(name = "cva", about = "A tui based viewer for Construvida AYJ affiliation records.")]
struct Args {
    /// Records file (CSV export from the backend)
    path: String,

    /// Which record type to view: affiliations | unsubscriptions
    #[arg(long, default_value = "affiliations")]
    dataset: String,

    #[arg(long, default_value_t = 10)]
    page_size: usize,

    /// Reject out-of-range page requests instead of clamping them
    #[arg(long)]
    strict_pages: bool,

    /// Restrict to a month (1-12); 0 shows everything
    #[arg(long, default_value_t = 0)]
    month: u32,

    #[arg(long, default_value_t = 0)]
    year: i32,

    #[arg(long)]
    day: Option<u32>,

    #[arg(long)]
    office: Option<u64>,

    #[arg(long)]
    user: Option<u64>,

    /// Write a trace log to this file (RUST_LOG controls the level)
    #[arg(long)]
    log_file: Option<String>,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            ratatui::restore();
            eprintln!("Error: {e:?}");
            ExitCode::FAILURE
        }
        Ok(_) => {
            ratatui::restore();
            ExitCode::SUCCESS
        }
    }
}

fn init_logging(path: &str) -> Result<(), CvaError> {
    let file = File::create(path)?;
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn run() -> Result<(), CvaError> {
    let args = Args::parse();
    if let Some(log_file) = &args.log_file {
        init_logging(log_file)?;
    }

    let path = shellexpand::full(&args.path)
        .map_err(|e| CvaError::LoadingFailed(format!("{e}")))?
        .into_owned();

    let catalog = catalog_for(&args.dataset)?;
    let query = FetchQuery {
        day: args.day,
        month: args.month,
        year: args.year,
        office_id: args.office,
        user_id: args.user,
    };
    let cfg = CvaConfig {
        page_size: args.page_size,
        page_policy: if args.strict_pages {
            PagePolicy::Reject
        } else {
            PagePolicy::Clamp
        },
        ..Default::default()
    };

    let source = DataSource::new(PathBuf::from(path), catalog.clone(), query);
    let mut model = Model::init(&cfg, catalog, source)?;
    model.start();

    let mut ui = TableUI::new(&cfg);
    let controller = Controller::new(&cfg);
    let mut terminal = ratatui::init();

    while model.status != Status::QUITTING {
        terminal.draw(|f| ui.draw(model.get_uidata(), f))?;

        // Handle events and map to a Message; the model also pumps
        // finished fetches on every tick.
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    Ok(())
}
