use std::fmt;

use tracing::{debug, info, trace, warn};

use crate::domain::{DEFAULT_PAGE_SIZE, ExplorerError};
use crate::normalizer::{CanonicalColumn, CanonicalRow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageSize {
    Rows(usize),
    All,
}

impl PageSize {
    pub fn rows(&self, total: usize) -> usize {
        match self {
            PageSize::Rows(n) => (*n).max(1),
            PageSize::All => total.max(1),
        }
    }
}

impl fmt::Display for PageSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageSize::Rows(n) => write!(f, "{n}"),
            PageSize::All => write!(f, "All"),
        }
    }
}

pub const PAGE_SIZE_CHOICES: [PageSize; 5] = [
    PageSize::Rows(10),
    PageSize::Rows(25),
    PageSize::Rows(50),
    PageSize::Rows(100),
    PageSize::All,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub column: usize,
    pub ascending: bool,
}

/// Settings a grid is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridOptions {
    pub page_size: PageSize,
    pub page_size_choices: Vec<PageSize>,
    pub sort: SortOrder,
}

impl Default for GridOptions {
    fn default() -> Self {
        Self {
            page_size: PageSize::Rows(DEFAULT_PAGE_SIZE),
            page_size_choices: PAGE_SIZE_CHOICES.to_vec(),
            sort: SortOrder {
                column: 0,
                ascending: true,
            },
        }
    }
}

impl GridOptions {
    /// Uses `page_size` as default when it is one of the offered choices.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        let wanted = PageSize::Rows(page_size);
        if self.page_size_choices.contains(&wanted) {
            self.page_size = wanted;
        } else {
            warn!("Page size {page_size} is not offered, keeping {:?}", self.page_size);
        }
        self
    }
}

/// The rendering capability the table controller drives. Sorting, paging and
/// filtering are the grid's own business.
pub trait Grid {
    fn add_rows(&mut self, rows: Vec<CanonicalRow>);
    /// Removes all rows but keeps columns, visibility and sort state.
    fn clear(&mut self);
    /// Releases the grid. It is not used again afterwards.
    fn destroy(&mut self);
    fn set_column_visible(&mut self, index: usize, visible: bool);
    fn column_visible(&self, index: usize) -> bool;
    fn row_count(&self) -> usize;
}

pub type GridBuilder<G> = Box<dyn FnMut(&[CanonicalColumn], &GridOptions) -> G>;

/// The grid that is currently attached to the table container.
pub struct TableSession<G: Grid> {
    grid: G,
    columns: Vec<CanonicalColumn>,
    instance: u64,
}

impl<G: Grid> TableSession<G> {
    pub fn grid(&self) -> &G {
        &self.grid
    }

    pub fn grid_mut(&mut self) -> &mut G {
        &mut self.grid
    }

    pub fn instance(&self) -> u64 {
        self.instance
    }

    fn same_schema(&self, columns: &[CanonicalColumn]) -> bool {
        self.columns.len() == columns.len()
            && self.columns.iter().zip(columns).all(|(a, b)| a.key == b.key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentOutcome {
    Created,
    UpdatedInPlace,
    Rebuilt,
}

/// Owns the single table session. Only one grid exists at any time, a schema
/// change destroys the old one before the new one is built.
pub struct TableViewController<G: Grid> {
    build: GridBuilder<G>,
    options: GridOptions,
    session: Option<TableSession<G>>,
    visible: bool,
    instances: u64,
}

impl<G: Grid> TableViewController<G> {
    pub fn new(options: GridOptions, build: GridBuilder<G>) -> Self {
        Self {
            build,
            options,
            session: None,
            visible: false,
            instances: 0,
        }
    }

    pub fn session(&self) -> Option<&TableSession<G>> {
        self.session.as_ref()
    }

    pub fn grid(&self) -> Option<&G> {
        self.session.as_ref().map(TableSession::grid)
    }

    pub fn grid_mut(&mut self) -> Option<&mut G> {
        self.session.as_mut().map(TableSession::grid_mut)
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.visible && self.session.is_some()
    }

    /// Number of grids built so far.
    pub fn instances_created(&self) -> u64 {
        self.instances
    }

    pub fn present(&mut self, columns: Vec<CanonicalColumn>, rows: Vec<CanonicalRow>) -> PresentOutcome {
        let nrows = rows.len();
        let same_schema = self.session.as_ref().map(|s| s.same_schema(&columns));
        let outcome = match same_schema {
            Some(true) => {
                if let Some(session) = self.session.as_mut() {
                    session.grid.clear();
                    session.grid.add_rows(rows);
                }
                PresentOutcome::UpdatedInPlace
            }
            Some(false) => {
                self.teardown();
                self.create(columns, rows);
                PresentOutcome::Rebuilt
            }
            None => {
                self.create(columns, rows);
                PresentOutcome::Created
            }
        };
        self.visible = true;
        info!("Presented {nrows} rows ({outcome:?})");
        outcome
    }

    fn create(&mut self, columns: Vec<CanonicalColumn>, rows: Vec<CanonicalRow>) {
        let mut grid = (self.build)(&columns, &self.options);
        for (idx, column) in columns.iter().enumerate() {
            grid.set_column_visible(idx, column.visible);
        }
        grid.add_rows(rows);
        self.instances += 1;
        debug!("Created grid instance {}", self.instances);
        self.session = Some(TableSession {
            grid,
            columns,
            instance: self.instances,
        });
    }

    pub fn set_column_visible(&mut self, key: &str, visible: bool) -> Result<(), ExplorerError> {
        let session = self
            .session
            .as_mut()
            .ok_or_else(|| ExplorerError::UnknownColumn(key.to_string()))?;
        let idx = session
            .columns
            .iter()
            .position(|c| c.key == key)
            .ok_or_else(|| ExplorerError::UnknownColumn(key.to_string()))?;
        if !session.columns[idx].toggleable {
            return Err(ExplorerError::ColumnNotToggleable(key.to_string()));
        }
        trace!("Column {key} visible: {visible}");
        session.columns[idx].visible = visible;
        session.grid.set_column_visible(idx, visible);
        Ok(())
    }

    /// Flips the `nth` toggleable column and returns its new visibility.
    pub fn toggle_nth(&mut self, nth: usize) -> Result<bool, ExplorerError> {
        let column = self
            .toggleable_columns()
            .into_iter()
            .nth(nth)
            .cloned()
            .ok_or_else(|| ExplorerError::UnknownColumn(format!("#{}", nth + 1)))?;
        self.set_column_visible(&column.key, !column.visible)?;
        Ok(!column.visible)
    }

    pub fn toggleable_columns(&self) -> Vec<&CanonicalColumn> {
        self.session
            .as_ref()
            .map(|s| s.columns.iter().filter(|c| c.toggleable).collect())
            .unwrap_or_default()
    }

    /// Hides the table container, the grid stays attached.
    pub fn hide(&mut self) {
        self.visible = false;
    }

    /// Drops all rows and hides the container.
    pub fn clear(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.grid.clear();
        }
        self.visible = false;
    }

    pub fn teardown(&mut self) {
        if let Some(mut session) = self.session.take() {
            debug!("Destroying grid instance {}", session.instance);
            session.grid.destroy();
        }
        self.visible = false;
    }
}

impl<G: Grid> Drop for TableViewController<G> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;

    pub type EventLog = Rc<RefCell<Vec<String>>>;

    /// Grid that writes every call into a shared log.
    pub struct RecordingGrid {
        pub id: usize,
        pub log: EventLog,
        pub rows: Vec<CanonicalRow>,
        pub visible: Vec<bool>,
        pub destroyed: bool,
    }

    impl Grid for RecordingGrid {
        fn add_rows(&mut self, rows: Vec<CanonicalRow>) {
            self.log
                .borrow_mut()
                .push(format!("grid{}.add({})", self.id, rows.len()));
            self.rows.extend(rows);
        }

        fn clear(&mut self) {
            self.log.borrow_mut().push(format!("grid{}.clear", self.id));
            self.rows.clear();
        }

        fn destroy(&mut self) {
            self.log.borrow_mut().push(format!("grid{}.destroy", self.id));
            self.destroyed = true;
        }

        fn set_column_visible(&mut self, index: usize, visible: bool) {
            self.visible[index] = visible;
        }

        fn column_visible(&self, index: usize) -> bool {
            self.visible[index]
        }

        fn row_count(&self) -> usize {
            self.rows.len()
        }
    }

    pub fn recording_controller() -> (TableViewController<RecordingGrid>, EventLog) {
        let log: EventLog = Rc::new(RefCell::new(Vec::new()));
        let builder_log = Rc::clone(&log);
        let mut next_id = 0;
        let build: GridBuilder<RecordingGrid> = Box::new(move |columns, _options| {
            next_id += 1;
            builder_log.borrow_mut().push(format!("grid{next_id}.new"));
            RecordingGrid {
                id: next_id,
                log: Rc::clone(&builder_log),
                rows: Vec::new(),
                visible: vec![true; columns.len()],
                destroyed: false,
            }
        });
        (TableViewController::new(GridOptions::default(), build), log)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::recording_controller;
    use super::*;

    fn column(key: &str, visible: bool) -> CanonicalColumn {
        CanonicalColumn {
            key: key.to_string(),
            title: key.to_uppercase(),
            visible,
            order: 0,
            toggleable: !visible,
        }
    }

    fn rows(n: usize) -> Vec<CanonicalRow> {
        (0..n)
            .map(|i| CanonicalRow::new(vec![i.to_string(), String::new()]))
            .collect()
    }

    #[test]
    fn defaults_follow_the_listing_policy() {
        let options = GridOptions::default();
        assert_eq!(options.page_size, PageSize::Rows(25));
        assert_eq!(options.sort, SortOrder { column: 0, ascending: true });
        assert_eq!(
            options.page_size_choices.iter().map(|p| p.to_string()).collect::<Vec<_>>(),
            vec!["10", "25", "50", "100", "All"]
        );
        assert_eq!(GridOptions::default().with_page_size(50).page_size, PageSize::Rows(50));
        assert_eq!(GridOptions::default().with_page_size(7).page_size, PageSize::Rows(25));
    }

    #[test]
    fn same_schema_updates_in_place() {
        let (mut table, log) = recording_controller();
        let schema = vec![column("id", true), column("folio", false)];
        assert_eq!(table.present(schema.clone(), rows(3)), PresentOutcome::Created);
        table.set_column_visible("folio", true).unwrap();

        assert_eq!(table.present(schema, rows(2)), PresentOutcome::UpdatedInPlace);
        assert_eq!(table.instances_created(), 1);
        assert_eq!(table.grid().unwrap().row_count(), 2);
        assert!(table.grid().unwrap().column_visible(1));
        assert_eq!(
            *log.borrow(),
            vec!["grid1.new", "grid1.add(3)", "grid1.clear", "grid1.add(2)"]
        );
    }

    #[test]
    fn schema_change_destroys_before_building() {
        let (mut table, log) = recording_controller();
        table.present(vec![column("id", true)], rows(1));
        let outcome = table.present(vec![column("id", true), column("x", true)], rows(4));
        assert_eq!(outcome, PresentOutcome::Rebuilt);
        assert_eq!(table.session().unwrap().instance(), 2);
        assert_eq!(
            *log.borrow(),
            vec!["grid1.new", "grid1.add(1)", "grid1.destroy", "grid2.new", "grid2.add(4)"]
        );
    }

    #[test]
    fn only_optional_columns_toggle() {
        let (mut table, _log) = recording_controller();
        assert!(matches!(
            table.set_column_visible("id", false),
            Err(ExplorerError::UnknownColumn(_))
        ));
        table.present(vec![column("id", true), column("folio", false)], rows(1));
        assert!(!table.grid().unwrap().column_visible(1));
        assert!(matches!(
            table.set_column_visible("id", false),
            Err(ExplorerError::ColumnNotToggleable(_))
        ));
        assert!(matches!(
            table.set_column_visible("nope", true),
            Err(ExplorerError::UnknownColumn(_))
        ));
        assert!(table.toggle_nth(0).unwrap());
        assert!(table.grid().unwrap().column_visible(1));
        assert_eq!(table.grid().unwrap().rows, rows(1));
        assert!(table.toggle_nth(1).is_err());
    }

    #[test]
    fn hide_clear_and_teardown() {
        let (mut table, log) = recording_controller();
        table.present(vec![column("id", true)], rows(2));
        assert!(table.is_visible());
        table.hide();
        assert!(!table.is_visible());
        assert!(table.is_active());
        table.clear();
        assert_eq!(table.grid().unwrap().row_count(), 0);
        table.teardown();
        assert!(!table.is_active());
        table.teardown();
        assert_eq!(log.borrow().last().unwrap(), "grid1.destroy");
        assert_eq!(
            log.borrow().iter().filter(|e| e.ends_with("destroy")).count(),
            1
        );
    }
}
