use arboard::Clipboard;
use chrono::{Local, NaiveDate};
use ratatui::crossterm::event::KeyEvent;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::catalog::CatalogEntry;
use crate::domain::{CMDMode, ExplorerConfig, ExplorerError, HELP_TEXT, Message};
use crate::grid::{ExportFormat, TerminalGrid};
use crate::inputter::{InputResult, Inputter};
use crate::selection::{LoadOutcome, LoadRequest, SelectionController, SelectionState, ViewState};
use crate::ui::CHROME_HEIGHT;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    CATALOG,
    TABLE,
    POPUP,
    CMDINPUT,
}

/// Everything the table panel draws for the current page.
#[derive(Debug, Clone, Default)]
pub struct TableData {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    pub widths: Vec<usize>,
    pub selected_row: usize,
    pub selected_column: usize,
    pub info: String,
    pub page: usize,
    pub page_count: usize,
    pub page_size: String,
    pub sorted_by: Option<(String, bool)>,
    pub filter: Option<String>,
    pub toggles: Vec<(String, bool)>,
}

pub struct UIData {
    pub inventories: Arc<Vec<CatalogEntry>>,
    pub catalog_loaded: bool,
    pub list_cursor: usize,
    pub list_focused: bool,
    pub selected_id: Option<String>,
    /// Index of the selected inventory in `inventories`.
    pub selected_position: Option<usize>,
    pub view: ViewState,
    pub table: Option<TableData>,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
    pub last_status_message_update: Instant,
}

/// `archive_{id}_{date}.{ext}`, with characters unsafe for file names replaced.
pub fn export_file_name(id: &str, format: ExportFormat, date: NaiveDate) -> String {
    let id: String = id
        .trim()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!(
        "archive_{id}_{}.{}",
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

pub struct Model {
    config: ExplorerConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    selection: SelectionController<TerminalGrid>,
    list_cursor: usize,
    loads_tx: Sender<LoadOutcome>,
    loads_rx: Receiver<LoadOutcome>,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    table_height: usize,
    status_message: String,
    last_status_message_update: Instant,
}

impl Model {
    pub fn init(
        config: &ExplorerConfig,
        selection: SelectionController<TerminalGrid>,
        ui_height: usize,
    ) -> Self {
        let (loads_tx, loads_rx) = mpsc::channel();
        Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::CATALOG,
            previous_modus: Modus::CATALOG,
            selection,
            list_cursor: 0,
            loads_tx,
            loads_rx,
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            table_height: ui_height.saturating_sub(CHROME_HEIGHT).max(1),
            status_message: "Started archive explorer".to_string(),
            last_status_message_update: Instant::now(),
        }
    }

    /// Loads the catalog. Failures leave the list disabled and are shown in
    /// the error line.
    pub fn start(&mut self, locator: &str) {
        let start_time = Instant::now();
        self.selection.start(locator);
        if self.selection.selection_enabled() {
            let count = self.selection.catalog().len();
            info!("Loaded {count} inventories in {}ms", start_time.elapsed().as_millis());
            self.set_status_message(format!("Loaded {count} inventories"));
        } else {
            self.set_status_message("Inventory list unavailable");
        }
    }

    pub fn selection(&self) -> &SelectionController<TerminalGrid> {
        &self.selection
    }

    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
        self.selection.teardown();
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.last_status_message_update = Instant::now();
        trace!("Status: {}", self.status_message);
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!("UI was resized to w:{width}, h:{height}");
        self.table_height = height.saturating_sub(CHROME_HEIGHT).max(1);
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), ExplorerError> {
        self.poll_loads();

        if let Some(msg) = message {
            match self.modus {
                Modus::CATALOG => match msg {
                    Message::MoveUp => self.move_list_cursor(-1),
                    Message::MoveDown => self.move_list_cursor(1),
                    Message::MovePageUp => self.move_list_cursor(-(self.table_height as isize)),
                    Message::MovePageDown => self.move_list_cursor(self.table_height as isize),
                    Message::MoveBeginning => self.list_cursor = 0,
                    Message::MoveEnd => self.move_list_cursor(isize::MAX),
                    Message::SwitchFocus => self.switch_focus(),
                    msg => self.handle_common(msg),
                },
                Modus::TABLE => match msg {
                    Message::MoveUp => self.with_grid(|g| g.move_up(1)),
                    Message::MoveDown => self.with_grid(|g| g.move_down(1)),
                    Message::MovePageUp => {
                        let size = self.table_height;
                        self.with_grid(|g| g.move_up(size))
                    }
                    Message::MovePageDown => {
                        let size = self.table_height;
                        self.with_grid(|g| g.move_down(size))
                    }
                    Message::MoveBeginning => self.with_grid(TerminalGrid::first_row),
                    Message::MoveEnd => self.with_grid(TerminalGrid::last_row),
                    Message::MoveLeft => self.with_grid(TerminalGrid::move_left),
                    Message::MoveRight => self.with_grid(TerminalGrid::move_right),
                    Message::SwitchFocus | Message::Exit => self.switch_focus(),
                    msg => self.handle_common(msg),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit | Message::Help | Message::Enter => self.exit(),
                    _ => (),
                },
                Modus::CMDINPUT => {
                    if let Message::RawKey(key) = msg {
                        self.raw_input(key)
                    }
                }
            }
        }
        Ok(())
    }

    // Messages that behave the same whichever panel has the focus.
    fn handle_common(&mut self, msg: Message) {
        match msg {
            Message::Quit => self.quit(),
            Message::Help => self.show_help(),
            Message::Exit => self.exit(),
            Message::Enter => self.enter(),
            Message::ClearSelection => self.clear_selection(),
            Message::Resize(width, height) => self.ui_resize(width, height),
            Message::NextPage => self.with_grid(TerminalGrid::next_page),
            Message::PreviousPage => self.with_grid(TerminalGrid::previous_page),
            Message::MoveLeft => self.with_grid(TerminalGrid::move_left),
            Message::MoveRight => self.with_grid(TerminalGrid::move_right),
            Message::CyclePageSize => self.cycle_page_size(),
            Message::SortAscending => self.sort_current_column(true),
            Message::SortDescending => self.sort_current_column(false),
            Message::Filter => self.enter_cmd_mode(CMDMode::Filter),
            Message::ToggleColumn(nth) => self.toggle_column(nth),
            Message::ExportCsv => self.export(ExportFormat::Csv),
            Message::ExportParquet => self.export(ExportFormat::Parquet),
            Message::CopyRow => self.copy_table_row(),
            _ => (),
        }
    }

    // ------------------------- Loading ----------------------------------- //

    fn dispatch(&mut self, request: Option<LoadRequest>) {
        if let Some(request) = request {
            self.set_status_message(format!("Loading inventory {} ...", request.entry.id));
            self.selection.spawn_load(request, self.loads_tx.clone());
        }
    }

    /// Applies finished background loads. Superseded ones are dropped by the
    /// selection controller.
    fn poll_loads(&mut self) {
        while let Ok(outcome) = self.loads_rx.try_recv() {
            if self.selection.on_load_finished(outcome.token, outcome.result) {
                self.after_load();
            }
        }
    }

    fn after_load(&mut self) {
        match self.selection.state().clone() {
            SelectionState::Loaded { id, records } => {
                self.set_status_message(format!("Loaded inventory {id}, {records} records"))
            }
            SelectionState::Error(message) => self.set_status_message(message),
            _ => (),
        }
    }

    fn highlighted_id(&self) -> Option<String> {
        self.selection
            .catalog()
            .entries()
            .get(self.list_cursor)
            .map(|e| e.id.clone())
    }

    fn enter(&mut self) {
        if !self.selection.selection_enabled() {
            self.set_status_message("Inventory list unavailable");
            return;
        }
        let highlighted = self.highlighted_id();
        let current = self.selection.selected().map(|e| e.id.clone());
        let request = if self.modus == Modus::TABLE || highlighted == current {
            self.selection.on_load_requested()
        } else {
            self.selection.on_select(highlighted.as_deref())
        };
        if request.is_none()
            && let Some(message) = self.selection.error_message()
        {
            let message = message.to_string();
            self.set_status_message(message);
        }
        self.dispatch(request);
    }

    fn clear_selection(&mut self) {
        if self.selection.on_select(None).is_none() && self.selection.selection_enabled() {
            self.modus = Modus::CATALOG;
            self.set_status_message("Selection cleared");
        }
    }

    // ------------------------- Navigation -------------------------------- //

    fn move_list_cursor(&mut self, step: isize) {
        let len = self.selection.catalog().len();
        if len == 0 {
            return;
        }
        self.list_cursor = self
            .list_cursor
            .saturating_add_signed(step)
            .min(len - 1);
    }

    fn switch_focus(&mut self) {
        self.modus = match self.modus {
            Modus::CATALOG if self.grid().is_some() => Modus::TABLE,
            _ => Modus::CATALOG,
        };
        debug!("Focus on {:?}", self.modus);
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::POPUP => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::POPUP;
            }
            Modus::TABLE => self.modus = Modus::CATALOG,
            Modus::CATALOG | Modus::CMDINPUT => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::POPUP;
    }

    // ------------------------- Table ------------------------------------- //

    fn grid(&self) -> Option<&TerminalGrid> {
        let table = self.selection.table();
        if table.is_visible() { table.grid() } else { None }
    }

    fn with_grid(&mut self, f: impl FnOnce(&mut TerminalGrid)) {
        let table = self.selection.table_mut();
        if !table.is_visible() {
            return;
        }
        if let Some(grid) = table.grid_mut() {
            f(grid);
        }
    }

    fn cycle_page_size(&mut self) {
        let mut size = None;
        self.with_grid(|g| size = Some(g.cycle_page_size()));
        if let Some(size) = size {
            self.set_status_message(format!("Page size {size}"));
        }
    }

    fn sort_current_column(&mut self, ascending: bool) {
        self.with_grid(|g| g.sort_cursor_column(ascending));
    }

    fn toggle_column(&mut self, nth: usize) {
        if self.grid().is_none() {
            return;
        }
        let title = self
            .selection
            .table()
            .toggleable_columns()
            .get(nth)
            .map(|c| c.title.clone());
        match self.selection.table_mut().toggle_nth(nth) {
            Ok(visible) => {
                let title = title.unwrap_or_default();
                let state = if visible { "shown" } else { "hidden" };
                self.set_status_message(format!("Column {title} {state}"));
            }
            Err(e) => self.set_status_message(e.to_string()),
        }
    }

    fn export(&mut self, format: ExportFormat) {
        let Some(id) = self.selection.selected().map(|e| e.id.clone()) else {
            return;
        };
        let Some(grid) = self.grid() else {
            return;
        };
        let name = export_file_name(&id, format, Local::now().date_naive());
        let path = self.config.export_dir.join(name);
        let rows = grid.filtered_rows();
        match grid.export(&path, format) {
            Ok(path) => {
                self.set_status_message(format!("Exported {rows} records to {}", path.display()))
            }
            Err(e) => {
                warn!("{e}");
                self.set_status_message(e.to_string())
            }
        }
    }

    fn copy_table_row(&mut self) {
        let Some(row) = self.grid().and_then(TerminalGrid::current_row_as_csv) else {
            return;
        };
        if self.clipboard.is_none() {
            self.clipboard = Clipboard::new()
                .map_err(|e| warn!("Clipboard unavailable: {e:?}"))
                .ok();
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            self.set_status_message("Clipboard unavailable");
            return;
        };
        match clipboard.set_text(row) {
            Ok(_) => self.set_status_message("Copied row to clipboard"),
            Err(e) => {
                trace!("Error copying to clipboard: {:?}", e);
                self.set_status_message("Could not copy row")
            }
        }
    }

    // ------------------------- Command input ----------------------------- //

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        let Some(current) = self.grid().map(|g| g.filter_term().unwrap_or("").to_string()) else {
            return;
        };
        trace!("Entering command mode ...");
        self.previous_modus = self.modus;
        self.modus = Modus::CMDINPUT;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.set(&current);
        self.last_input = self.input.get();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CMDINPUT;

        if self.last_input.canceled {
            self.cmd_mode = None;
            return;
        }
        let term = self.last_input.input.clone();
        match self.cmd_mode.take() {
            Some(CMDMode::Filter) => {
                self.with_grid(|g| g.set_filter(Some(term)));
                if let Some(info) = self.grid().map(TerminalGrid::info_line) {
                    self.set_status_message(info);
                }
            }
            None => info!("Cmd mode is none!"),
        }
    }

    // ------------------------- UI data ----------------------------------- //

    fn table_data(&self) -> Option<TableData> {
        let grid = self.grid()?;
        let sort = grid.sort_order();
        let sorted_by = grid
            .columns()
            .get(sort.column)
            .filter(|c| c.visible)
            .map(|c| (c.title.clone(), sort.ascending));
        Some(TableData {
            headers: grid.headers().into_iter().map(str::to_string).collect(),
            rows: grid
                .page_rows()
                .into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
            widths: grid.column_widths(self.config.max_column_width),
            selected_row: grid.cursor_row(),
            selected_column: grid.cursor_column(),
            info: grid.info_line(),
            page: grid.page(),
            page_count: grid.page_count(),
            page_size: grid.page_size().to_string(),
            sorted_by,
            filter: grid.filter_term().map(str::to_string),
            toggles: self
                .selection
                .table()
                .toggleable_columns()
                .into_iter()
                .map(|c| (c.title.clone(), c.visible))
                .collect(),
        })
    }

    pub fn get_uidata(&self) -> UIData {
        let catalog = self.selection.catalog();
        let selected = self.selection.selected();
        UIData {
            inventories: catalog.snapshot(),
            catalog_loaded: catalog.is_loaded(),
            list_cursor: self.list_cursor,
            list_focused: matches!(self.focus(), Modus::CATALOG),
            selected_id: selected.map(|e| e.id.clone()),
            selected_position: selected.and_then(|e| catalog.position(&e.id)),
            view: self.selection.view_state(),
            table: self.table_data(),
            show_popup: self.modus == Modus::POPUP,
            popup_message: HELP_TEXT.to_string(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.active_cmdinput,
            status_message: self.status_message.clone(),
            last_status_message_update: self.last_status_message_update,
        }
    }

    // The panel keys go to once popups and prompts are closed.
    fn focus(&self) -> Modus {
        match self.modus {
            Modus::POPUP | Modus::CMDINPUT => self.previous_modus,
            modus => modus,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetcher::DirectoryFetcher;
    use crate::normalizer::{FixedSchema, RecordNormalizer, SchemaConfig};
    use crate::table::{GridOptions, TableViewController};
    use ratatui::crossterm::event::{KeyCode, KeyModifiers};
    use std::path::PathBuf;
    use std::time::Duration;

    fn fixtures() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
    }

    fn model_with(schema: SchemaConfig, config: ExplorerConfig) -> Model {
        let table = TableViewController::new(
            GridOptions::default().with_page_size(config.page_size),
            Box::new(TerminalGrid::new),
        );
        let selection = SelectionController::new(
            Arc::new(DirectoryFetcher::new(fixtures())),
            RecordNormalizer::new(schema),
            table,
        );
        let mut model = Model::init(&config, selection, 30);
        model.start("inventory_index.json");
        model
    }

    fn model() -> Model {
        model_with(SchemaConfig::SchemaFree, ExplorerConfig::default())
    }

    fn send(model: &mut Model, message: Message) {
        model.update(Some(message)).unwrap();
    }

    // Blocks until the background load started last has been applied.
    fn settle(model: &mut Model) {
        while model.selection.is_loading() {
            let outcome = model
                .loads_rx
                .recv_timeout(Duration::from_secs(10))
                .unwrap();
            if model.selection.on_load_finished(outcome.token, outcome.result) {
                model.after_load();
            }
        }
    }

    fn type_text(model: &mut Model, text: &str) {
        for chr in text.chars() {
            send(model, Message::RawKey(KeyEvent::new(KeyCode::Char(chr), KeyModifiers::NONE)));
        }
    }

    fn select(model: &mut Model, id: &str) {
        let idx = model
            .get_uidata()
            .inventories
            .iter()
            .position(|e| e.id == id)
            .unwrap();
        send(model, Message::MoveBeginning);
        for _ in 0..idx {
            send(model, Message::MoveDown);
        }
        send(model, Message::Enter);
        settle(model);
    }

    #[test]
    fn lists_inventories_in_numeric_order() {
        let model = model();
        let data = model.get_uidata();
        assert!(data.view.selection_enabled);
        assert!(data.catalog_loaded);
        assert_eq!(data.inventories[0].label(), "1053 (4 items)");
        assert_eq!(data.inventories[1].label(), "1120 (3 items)");
        assert_eq!(data.selected_position, None);
        assert!(data.table.is_none());
        assert!(data.list_focused);
    }

    #[test]
    fn selecting_loads_the_table() {
        let mut model = model();
        select(&mut model, "1120");
        let data = model.get_uidata();
        assert_eq!(data.selected_id.as_deref(), Some("1120"));
        assert_eq!(data.selected_position, Some(1));
        assert_eq!(data.view.caption.as_deref(), Some("Inventory: 1120 (3 records)"));
        let table = data.table.unwrap();
        assert_eq!(table.rows.len(), 3);
        assert_eq!(table.info, "Showing 1 to 3 of 3 records");
        assert_eq!(data.status_message, "Loaded inventory 1120, 3 records");
    }

    #[test]
    fn missing_dataset_shows_error() {
        let mut model = model();
        select(&mut model, "2001");
        let data = model.get_uidata();
        assert_eq!(
            data.view.error.as_deref(),
            Some("Could not load inventory data: status 404")
        );
        assert!(data.table.is_none());
    }

    #[test]
    fn filter_prompt_narrows_rows() {
        let mut model = model();
        select(&mut model, "1053");
        send(&mut model, Message::Filter);
        assert!(model.raw_keyevents());
        type_text(&mut model, "cochin");
        send(&mut model, Message::RawKey(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE)));
        assert!(!model.raw_keyevents());
        let table = model.get_uidata().table.unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.filter.as_deref(), Some("cochin"));
        assert_eq!(
            table.info,
            "Showing 1 to 2 of 2 records (filtered from 4 total records)"
        );

        // Esc keeps the previous filter
        send(&mut model, Message::Filter);
        type_text(&mut model, "x");
        send(&mut model, Message::RawKey(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)));
        assert_eq!(model.get_uidata().table.unwrap().rows.len(), 2);
    }

    #[test]
    fn focus_moves_and_page_size_cycles() {
        let mut model = model();
        send(&mut model, Message::SwitchFocus);
        assert!(model.get_uidata().list_focused);

        select(&mut model, "1053");
        send(&mut model, Message::SwitchFocus);
        assert!(!model.get_uidata().list_focused);
        send(&mut model, Message::MoveEnd);
        assert_eq!(model.get_uidata().table.unwrap().selected_row, 3);
        send(&mut model, Message::CyclePageSize);
        assert_eq!(model.get_uidata().table.unwrap().page_size, "50");
        assert_eq!(model.get_uidata().status_message, "Page size 50");

        send(&mut model, Message::Help);
        assert!(model.get_uidata().show_popup);
        assert!(!model.get_uidata().list_focused);
        send(&mut model, Message::Exit);
        assert!(!model.get_uidata().show_popup);
        send(&mut model, Message::Exit);
        assert!(model.get_uidata().list_focused);
    }

    #[test]
    fn clear_selection_hides_table() {
        let mut model = model();
        select(&mut model, "1053");
        send(&mut model, Message::ClearSelection);
        let data = model.get_uidata();
        assert!(data.table.is_none());
        assert_eq!(data.selected_id, None);
        assert_eq!(data.selected_position, None);
        assert_eq!(data.status_message, "Selection cleared");
    }

    #[test]
    fn fixed_schema_toggles_columns() {
        let mut model = model_with(
            SchemaConfig::Fixed(FixedSchema::tanap()),
            ExplorerConfig::default(),
        );
        select(&mut model, "1053");
        let table = model.get_uidata().table.unwrap();
        assert_eq!(table.toggles.len(), 3);
        assert!(table.toggles.iter().all(|(_, visible)| !visible));
        let headers = table.headers.len();

        send(&mut model, Message::ToggleColumn(0));
        let table = model.get_uidata().table.unwrap();
        assert_eq!(table.headers.len(), headers + 1);
        assert!(table.toggles[0].1);

        send(&mut model, Message::ToggleColumn(8));
        assert_eq!(model.get_uidata().status_message, "unknown column '#9'");
    }

    #[test]
    fn exports_with_dated_names() {
        let dir = tempfile::tempdir().unwrap();
        let config = ExplorerConfig::default().export_dir(dir.path().to_path_buf());
        let mut model = model_with(SchemaConfig::SchemaFree, config);
        select(&mut model, "1053");
        send(&mut model, Message::ExportCsv);
        let name = export_file_name("1053", ExportFormat::Csv, Local::now().date_naive());
        let path = dir.path().join(&name);
        assert!(path.exists(), "{name}");
        assert!(model.get_uidata().status_message.starts_with("Exported 4 records"));
    }

    #[test]
    fn export_names_are_safe() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            export_file_name("1053", ExportFormat::Parquet, date),
            "archive_1053_2024-03-09.parquet"
        );
        assert_eq!(
            export_file_name(" a/b ", ExportFormat::Csv, date),
            "archive_a_b_2024-03-09.csv"
        );
    }

    #[test]
    fn quit_tears_down() {
        let mut model = model();
        select(&mut model, "1053");
        send(&mut model, Message::Quit);
        assert_eq!(model.status, Status::QUITTING);
        assert!(!model.selection().table().is_active());
    }
}
