use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::catalog::{CatalogEntry, CatalogStore, format_count};
use crate::domain::{ExplorerError, FetchError};
use crate::fetcher::DatasetFetcher;
use crate::normalizer::{RawRecord, RecordNormalizer};
use crate::table::{Grid, TableViewController};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionState {
    Idle,
    Loading { token: u64, id: String },
    Loaded { id: String, records: usize },
    Error(String),
}

/// A dataset fetch that was started for one selection.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    pub token: u64,
    pub entry: CatalogEntry,
}

/// Result of a fetch, delivered back to the ui loop.
#[derive(Debug)]
pub struct LoadOutcome {
    pub token: u64,
    pub result: Result<Vec<RawRecord>, FetchError>,
}

/// What the ui needs to draw the selection and table mount points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ViewState {
    pub selection_enabled: bool,
    pub loading: bool,
    pub error: Option<String>,
    pub table_visible: bool,
    pub caption: Option<String>,
    pub item_count: Option<String>,
}

/// Turns internal failures into the single line shown to the user.
pub fn user_message(err: &ExplorerError) -> String {
    match err {
        ExplorerError::EmptyDataset => "No data found for this inventory".to_string(),
        ExplorerError::NotFound(_) => "Inventory not found".to_string(),
        ExplorerError::Fetch(e) => format!("Could not load inventory data: {e}"),
        other => other.to_string(),
    }
}

/// Drives catalog, fetcher, normalizer and table for the user's choices.
///
/// Every selection gets a fresh token. Results carrying an older token are
/// dropped without touching the view, so only the latest choice is rendered.
pub struct SelectionController<G: Grid> {
    fetcher: Arc<dyn DatasetFetcher>,
    catalog: CatalogStore,
    normalizer: RecordNormalizer,
    table: TableViewController<G>,
    state: SelectionState,
    selected: Option<CatalogEntry>,
    selection_enabled: bool,
    latest_token: u64,
    started: Option<Instant>,
}

impl<G: Grid> SelectionController<G> {
    pub fn new(
        fetcher: Arc<dyn DatasetFetcher>,
        normalizer: RecordNormalizer,
        table: TableViewController<G>,
    ) -> Self {
        Self {
            fetcher,
            catalog: CatalogStore::new(),
            normalizer,
            table,
            state: SelectionState::Idle,
            selected: None,
            selection_enabled: false,
            latest_token: 0,
            started: None,
        }
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    pub fn catalog(&self) -> &CatalogStore {
        &self.catalog
    }

    pub fn table(&self) -> &TableViewController<G> {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut TableViewController<G> {
        &mut self.table
    }

    pub fn selected(&self) -> Option<&CatalogEntry> {
        self.selected.as_ref()
    }

    pub fn selection_enabled(&self) -> bool {
        self.selection_enabled
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SelectionState::Loading { .. })
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.state {
            SelectionState::Error(message) => Some(message),
            _ => None,
        }
    }

    /// Loads the catalog, called once at startup.
    pub fn start(&mut self, locator: &str) {
        match self.catalog.load(self.fetcher.as_ref(), locator) {
            Ok(entries) => {
                debug!("Selection enabled for {} inventories", entries.len());
                self.selection_enabled = true;
                self.state = SelectionState::Idle;
            }
            Err(e) => {
                error!("Catalog load failed: {e}");
                self.selection_enabled = false;
                self.state = SelectionState::Error(format!("Could not load inventory list: {e}"));
            }
        }
    }

    fn next_token(&mut self) -> u64 {
        self.latest_token += 1;
        self.latest_token
    }

    /// Handles a choice in the inventory list. `None` clears the table
    /// without fetching anything.
    pub fn on_select(&mut self, id: Option<&str>) -> Option<LoadRequest> {
        if !self.selection_enabled {
            warn!("Selection while the catalog is unavailable");
            return None;
        }
        // Supersedes whatever is still in flight
        let token = self.next_token();
        let Some(id) = id.map(str::trim).filter(|id| !id.is_empty()) else {
            debug!("Selection cleared");
            self.selected = None;
            self.table.clear();
            self.state = SelectionState::Idle;
            return None;
        };
        match self.catalog.find_by_id(id).cloned() {
            Ok(entry) => {
                self.selected = Some(entry.clone());
                Some(self.begin_load(token, entry))
            }
            Err(e) => {
                self.selected = None;
                self.fail(&e);
                None
            }
        }
    }

    /// Fetches the current selection again.
    pub fn on_load_requested(&mut self) -> Option<LoadRequest> {
        if !self.selection_enabled {
            return None;
        }
        let entry = self.selected.clone()?;
        let token = self.next_token();
        Some(self.begin_load(token, entry))
    }

    fn begin_load(&mut self, token: u64, entry: CatalogEntry) -> LoadRequest {
        info!("Loading inventory {} from {}", entry.id, entry.source_ref);
        self.started = Some(Instant::now());
        self.state = SelectionState::Loading {
            token,
            id: entry.id.clone(),
        };
        LoadRequest { token, entry }
    }

    /// Applies a finished fetch. Returns `false` when the result belonged to a
    /// superseded selection and was dropped.
    pub fn on_load_finished(
        &mut self,
        token: u64,
        result: Result<Vec<RawRecord>, FetchError>,
    ) -> bool {
        if token != self.latest_token || !self.is_loading() {
            debug!("Dropping stale result {token}, latest is {}", self.latest_token);
            return false;
        }
        let Some(entry) = self.selected.clone() else {
            return false;
        };
        match result.map_err(ExplorerError::from).and_then(|records| self.render(&records)) {
            Ok(records) => {
                let elapsed = self.started.map(|s| s.elapsed().as_millis()).unwrap_or(0);
                info!("Inventory {} ready, {records} records in {elapsed}ms", entry.id);
                self.state = SelectionState::Loaded {
                    id: entry.id,
                    records,
                };
            }
            Err(e) => self.fail(&e),
        }
        true
    }

    fn render(&mut self, records: &[RawRecord]) -> Result<usize, ExplorerError> {
        let columns = self.normalizer.derive_columns(records.first())?;
        let rows = self.normalizer.normalize(records, &columns);
        let count = rows.len();
        self.table.present(columns, rows);
        Ok(count)
    }

    fn fail(&mut self, err: &ExplorerError) {
        error!("{err}");
        self.table.hide();
        self.state = SelectionState::Error(user_message(err));
    }

    /// Runs the fetch on the calling thread.
    pub fn fetch(&self, request: &LoadRequest) -> LoadOutcome {
        LoadOutcome {
            token: request.token,
            result: self.fetcher.fetch_dataset(&request.entry.source_ref),
        }
    }

    /// Runs the fetch on the rayon pool and sends the outcome to `tx`.
    pub fn spawn_load(&self, request: LoadRequest, tx: Sender<LoadOutcome>) {
        let fetcher = Arc::clone(&self.fetcher);
        rayon::spawn(move || {
            let result = fetcher.fetch_dataset(&request.entry.source_ref);
            if tx
                .send(LoadOutcome {
                    token: request.token,
                    result,
                })
                .is_err()
            {
                debug!("Ui gone before load {} finished", request.token);
            }
        });
    }

    /// Selects and loads `id` without leaving the calling thread.
    pub fn load_blocking(&mut self, id: &str) -> bool {
        match self.on_select(Some(id)) {
            Some(request) => {
                let outcome = self.fetch(&request);
                self.on_load_finished(outcome.token, outcome.result)
            }
            None => false,
        }
    }

    pub fn view_state(&self) -> ViewState {
        let caption = match &self.state {
            SelectionState::Loaded { id, records } => Some(format!(
                "Inventory: {id} ({} records)",
                format_count(*records as u64)
            )),
            _ => None,
        };
        ViewState {
            selection_enabled: self.selection_enabled,
            loading: self.is_loading(),
            error: self.error_message().map(str::to_string),
            table_visible: self.table.is_visible(),
            caption,
            item_count: self.selected.as_ref().map(|e| {
                format!("{} documents in inventory {}", format_count(e.item_count), e.id)
            }),
        }
    }

    pub fn teardown(&mut self) {
        self.next_token();
        self.table.teardown();
        self.selected = None;
        self.state = SelectionState::Idle;
    }
}
