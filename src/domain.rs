use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

pub const DEFAULT_CATALOG: &str = "inventory_index.json";
pub const DEFAULT_DATASETS_DIR: &str = "inventories";
pub const DEFAULT_PAGE_SIZE: usize = 25;

/// Failures of the content source. These reach the selection controller
/// unmodified, it is the only place that turns them into user text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("status {0}")]
    HttpStatus(u16),
    #[error("malformed document: {0}")]
    Parse(String),
    #[error("request timed out")]
    Timeout,
    #[error("{0}")]
    Io(String),
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if let Some(status) = err.status() {
            FetchError::HttpStatus(status.as_u16())
        } else {
            FetchError::Io(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum ExplorerError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("dataset contains no records")]
    EmptyDataset,
    #[error("inventory '{0}' not found")]
    NotFound(String),
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("column '{0}' can not be toggled")]
    ColumnNotToggleable(String),
    #[error("export failed: {0}")]
    Export(String),
    #[error("invalid schema {path}: {reason}")]
    Schema { path: PathBuf, reason: String },
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

impl From<PolarsError> for ExplorerError {
    fn from(err: PolarsError) -> Self {
        ExplorerError::Export(err.to_string())
    }
}

/// Runtime settings shared by the model and the grid.
#[derive(Debug, Clone, Setters)]
pub struct ExplorerConfig {
    pub event_poll_time: u64,
    pub page_size: usize,
    pub max_column_width: usize,
    pub export_dir: PathBuf,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            page_size: DEFAULT_PAGE_SIZE,
            max_column_width: 40,
            export_dir: PathBuf::from("."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMDMode {
    Filter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    Quit,
    Help,
    Exit,
    Enter,
    SwitchFocus,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    MoveLeft,
    MoveRight,
    NextPage,
    PreviousPage,
    CyclePageSize,
    SortAscending,
    SortDescending,
    Filter,
    ToggleColumn(usize),
    ExportCsv,
    ExportParquet,
    CopyRow,
    ClearSelection,
    Resize(usize, usize),
    RawKey(KeyEvent),
}

pub const HELP_TEXT: &str = "\
Archive explorer

  Up/Down PgUp/PgDn Home/End   move
  Enter                        load the highlighted inventory / reload
  Tab                          switch between inventory list and table
  x / Backspace                clear the selection
  Left/Right                   previous / next page
  < / >                        move the column cursor
  s / S                        sort by column ascending / descending
  p                            cycle page size (10, 25, 50, 100, All)
  /                            filter records
  1-9                          toggle optional column
  e / E                        export to CSV / Parquet
  y                            copy the current row
  ?                            this help
  Esc                          close popup
  q                            quit
";
