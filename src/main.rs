use std::fs::OpenOptions;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;
use std::time::Duration;

use clap::Parser;
use tracing::{error, info, info_span};
use tracing_error::ErrorLayer;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

mod catalog;
mod controller;
mod domain;
mod fetcher;
mod grid;
mod inputter;
mod model;
mod normalizer;
mod selection;
mod table;
mod ui;

use controller::Controller;
use domain::{
    DEFAULT_CATALOG, DEFAULT_DATASETS_DIR, DEFAULT_PAGE_SIZE, ExplorerConfig, ExplorerError,
};
use fetcher::ContentSource;
use grid::TerminalGrid;
use model::{Model, Status};
use normalizer::{FixedSchema, RecordNormalizer, SchemaConfig};
use selection::SelectionController;
use table::{GridOptions, PAGE_SIZE_CHOICES, PageSize, TableViewController};
use ui::ExplorerUI;

/// Browse archive inventories and their records in the terminal.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// Directory or http(s) url holding the catalog and the datasets
    #[arg(default_value = "data")]
    source: String,

    /// Catalog document, relative to the source
    #[arg(long, default_value = DEFAULT_CATALOG)]
    catalog: String,

    /// Directory of the dataset documents, relative to the source
    #[arg(long, default_value = DEFAULT_DATASETS_DIR)]
    datasets_dir: String,

    /// `free`, `tanap` or the path of a json column mapping
    #[arg(long, default_value = "free", value_parser = parse_schema)]
    schema: SchemaConfig,

    /// Rows per page: 10, 25, 50 or 100
    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE, value_parser = parse_page_size)]
    page_size: usize,

    /// Request timeout in seconds for http sources
    #[arg(long)]
    timeout: Option<u64>,

    /// Where exported files are written
    #[arg(long, default_value = ".", value_parser = expand_path)]
    export_dir: PathBuf,

    #[arg(long, default_value = "archive-explorer.log", value_parser = expand_path)]
    log_file: PathBuf,

    /// Overrides RUST_LOG, e.g. `debug` or `archive_explorer=trace`
    #[arg(long)]
    log_level: Option<String>,
}

fn parse_schema(value: &str) -> Result<SchemaConfig, String> {
    match value {
        "free" => Ok(SchemaConfig::SchemaFree),
        "tanap" => Ok(SchemaConfig::Fixed(FixedSchema::tanap())),
        path => FixedSchema::from_file(&expand_path(path)?)
            .map(SchemaConfig::Fixed)
            .map_err(|e| e.to_string()),
    }
}

fn parse_page_size(value: &str) -> Result<usize, String> {
    let rows: usize = value.parse().map_err(|e| format!("{e}"))?;
    if PAGE_SIZE_CHOICES.contains(&PageSize::Rows(rows)) {
        Ok(rows)
    } else {
        Err(format!("{rows} is not one of 10, 25, 50 or 100"))
    }
}

fn expand_path(value: &str) -> Result<PathBuf, String> {
    shellexpand::full(value)
        .map(|p| PathBuf::from(p.as_ref()))
        .map_err(|e| e.to_string())
}

fn init_logging(args: &Args) -> io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&args.log_file)?;
    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level).map_err(io::Error::other)?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    // The terminal belongs to the ui, logs only go to the file
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Mutex::new(file)).with_ansi(false))
        .with(ErrorLayer::default())
        .init();
    Ok(())
}

fn main() -> ExitCode {
    let args = Args::parse();
    if let Err(e) = init_logging(&args) {
        eprintln!("Error: can not open log file {}: {e}", args.log_file.display());
        return ExitCode::FAILURE;
    }

    let mut terminal = ratatui::init();
    let result = run(&args, &mut terminal);
    ratatui::restore();

    match result {
        Err(e) => {
            error!("{e}");
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run(args: &Args, terminal: &mut ratatui::DefaultTerminal) -> Result<(), ExplorerError> {
    let _session = info_span!("session", source = %args.source).entered();
    info!("Starting archive explorer on {}", args.source);

    let cfg = ExplorerConfig::default()
        .page_size(args.page_size)
        .export_dir(args.export_dir.clone());

    let fetcher = ContentSource::parse(&args.source)
        .build(&args.datasets_dir, args.timeout.map(Duration::from_secs))?;
    let table = TableViewController::new(
        GridOptions::default().with_page_size(cfg.page_size),
        Box::new(TerminalGrid::new),
    );
    let selection =
        SelectionController::new(fetcher, RecordNormalizer::new(args.schema.clone()), table);

    let size = terminal.size()?;
    let mut model = Model::init(&cfg, selection, size.height as usize);
    let ui = ExplorerUI::new(format!("Archive explorer: {}", args.source));
    let controller = Controller::new(&cfg);

    terminal.draw(|f| ui.draw(&model, f))?;
    model.start(&args.catalog);

    while model.status != Status::QUITTING {
        // Render the current view
        terminal.draw(|f| ui.draw(&model, f))?;

        // Handle events and map to a Message, finished loads are applied
        // on every tick
        let message = controller.handle_event(&model)?;
        model.update(message)?;
    }

    info!("Bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_arguments() {
        let args = Args::try_parse_from(["archive-explorer"]).unwrap();
        assert_eq!(args.source, "data");
        assert_eq!(args.catalog, DEFAULT_CATALOG);
        assert_eq!(args.schema, SchemaConfig::SchemaFree);
        assert_eq!(args.page_size, DEFAULT_PAGE_SIZE);

        let args = Args::try_parse_from([
            "archive-explorer",
            "https://example.org/archive",
            "--schema",
            "tanap",
            "--page-size",
            "50",
            "--timeout",
            "5",
        ])
        .unwrap();
        assert_eq!(args.schema, SchemaConfig::Fixed(FixedSchema::tanap()));
        assert_eq!(args.timeout, Some(5));
        assert_eq!(
            ContentSource::parse(&args.source),
            ContentSource::Http("https://example.org/archive".into())
        );
    }

    #[test]
    fn page_size_must_be_a_known_choice() {
        for bad in ["7", "0", "all", "-25"] {
            assert!(
                Args::try_parse_from(["archive-explorer", "--page-size", bad]).is_err(),
                "{bad}"
            );
        }
        let args = Args::try_parse_from(["archive-explorer", "--page-size", "100"]).unwrap();
        assert_eq!(args.page_size, 100);
        assert_eq!(parse_page_size("10"), Ok(10));
    }

    #[test]
    fn rejects_bad_schema_files() {
        assert!(Args::try_parse_from(["archive-explorer", "--schema", "/no/such/schema.json"]).is_err());
    }
}
