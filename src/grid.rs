use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use polars::prelude::{Column, CsvWriter, DataFrame, ParquetWriter, PolarsResult, SerWriter};
use rayon::prelude::*;
use tracing::{debug, info, trace};

use crate::domain::ExplorerError;
use crate::normalizer::{CanonicalColumn, CanonicalRow};
use crate::table::{Grid, GridOptions, PageSize, SortOrder};

const PARALLEL_FILTER_THRESHOLD: usize = 5_000;

// `f64::from_str` also takes "NaN" and "inf", those stay text.
fn parse_finite(cell: &str) -> Option<f64> {
    cell.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

#[derive(Debug, Clone)]
pub struct GridColumn {
    pub key: String,
    pub title: String,
    pub visible: bool,
    numeric: bool,
}

/// Client side grid rendered by the terminal ui. Keeps all rows in memory and
/// maps the filtered and sorted view onto them by index.
#[derive(Debug)]
pub struct TerminalGrid {
    columns: Vec<GridColumn>,
    rows: Vec<CanonicalRow>,
    view: Arc<Vec<usize>>, // Mapping of view position to row index
    sort: SortOrder,
    filter: Option<String>,
    page_size: PageSize,
    page_size_choices: Vec<PageSize>,
    cursor: usize, // Position in view
    cursor_column: usize, // Position in visible columns
    destroyed: bool,
}

impl TerminalGrid {
    pub fn new(columns: &[CanonicalColumn], options: &GridOptions) -> Self {
        TerminalGrid {
            columns: columns
                .iter()
                .map(|c| GridColumn {
                    key: c.key.clone(),
                    title: c.title.clone(),
                    visible: c.visible,
                    numeric: false,
                })
                .collect(),
            rows: Vec::new(),
            view: Arc::new(Vec::new()),
            sort: options.sort,
            filter: None,
            page_size: options.page_size,
            page_size_choices: options.page_size_choices.clone(),
            cursor: 0,
            cursor_column: 0,
            destroyed: false,
        }
    }

    pub fn columns(&self) -> &[GridColumn] {
        &self.columns
    }

    pub fn visible_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.visible)
            .map(|(idx, _)| idx)
            .collect()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn sort_order(&self) -> SortOrder {
        self.sort
    }

    pub fn filter_term(&self) -> Option<&str> {
        self.filter.as_deref()
    }

    pub fn page_size(&self) -> PageSize {
        self.page_size
    }

    /// Rows left after filtering.
    pub fn filtered_rows(&self) -> usize {
        self.view.len()
    }

    fn page_len(&self) -> usize {
        self.page_size.rows(self.view.len())
    }

    pub fn page(&self) -> usize {
        self.cursor / self.page_len()
    }

    pub fn page_count(&self) -> usize {
        self.view.len().div_ceil(self.page_len()).max(1)
    }

    fn page_bounds(&self) -> (usize, usize) {
        let begin = self.page() * self.page_len();
        let end = std::cmp::min(begin + self.page_len(), self.view.len());
        (begin, end)
    }

    /// Cursor row relative to the current page.
    pub fn cursor_row(&self) -> usize {
        self.cursor - self.page_bounds().0
    }

    pub fn cursor_column(&self) -> usize {
        self.cursor_column
    }

    pub fn headers(&self) -> Vec<&str> {
        self.visible_columns()
            .into_iter()
            .map(|idx| self.columns[idx].title.as_str())
            .collect()
    }

    /// Visible cells of the rows on the current page.
    pub fn page_rows(&self) -> Vec<Vec<&str>> {
        let visible = self.visible_columns();
        let (begin, end) = self.page_bounds();
        self.view[begin..end]
            .iter()
            .map(|&ridx| visible.iter().map(|&c| self.rows[ridx].cell(c)).collect())
            .collect()
    }

    /// Width needed per visible column, capped at `max_width`.
    pub fn column_widths(&self, max_width: usize) -> Vec<usize> {
        let visible = self.visible_columns();
        let (begin, end) = self.page_bounds();
        visible
            .iter()
            .map(|&c| {
                let data_width = self.view[begin..end]
                    .iter()
                    .map(|&r| self.rows[r].cell(c).chars().count())
                    .max()
                    .unwrap_or(0);
                let width = std::cmp::max(self.columns[c].title.chars().count(), data_width);
                std::cmp::min(width, max_width)
            })
            .collect()
    }

    pub fn info_line(&self) -> String {
        let shown = self.view.len();
        let mut info = if shown == 0 {
            "No records available".to_string()
        } else {
            let (begin, end) = self.page_bounds();
            format!("Showing {} to {} of {} records", begin + 1, end, shown)
        };
        if self.filter.is_some() && shown != self.rows.len() {
            info.push_str(&format!(" (filtered from {} total records)", self.rows.len()));
        }
        info
    }

    pub fn current_row(&self) -> Option<&CanonicalRow> {
        self.view.get(self.cursor).map(|&ridx| &self.rows[ridx])
    }

    fn detect_numeric(&mut self) {
        for (cidx, column) in self.columns.iter_mut().enumerate() {
            let mut seen = false;
            column.numeric = self.rows.iter().all(|row| {
                let cell = row.cell(cidx).trim();
                if cell.is_empty() {
                    return true;
                }
                seen = true;
                parse_finite(cell).is_some()
            }) && seen;
        }
    }

    fn refresh(&mut self) {
        let start_time = Instant::now();
        let mut view = self.filtered_indices();
        self.sort_indices(&mut view);
        self.view = Arc::new(view);
        self.cursor = std::cmp::min(self.cursor, self.view.len().saturating_sub(1));
        let visible = self.visible_columns().len();
        self.cursor_column = std::cmp::min(self.cursor_column, visible.saturating_sub(1));
        trace!(
            "Refreshed view: {} of {} rows in {}ms",
            self.view.len(),
            self.rows.len(),
            start_time.elapsed().as_millis()
        );
    }

    fn filtered_indices(&self) -> Vec<usize> {
        let Some(term) = self.filter.as_ref().map(|t| t.to_lowercase()) else {
            return (0..self.rows.len()).collect();
        };
        let visible = self.visible_columns();
        let matches = |row: &CanonicalRow| {
            visible
                .iter()
                .any(|&c| row.cell(c).to_lowercase().contains(&term))
        };
        if self.rows.len() >= PARALLEL_FILTER_THRESHOLD {
            self.rows
                .par_iter()
                .enumerate()
                .filter(|(_, row)| matches(row))
                .map(|(idx, _)| idx)
                .collect()
        } else {
            self.rows
                .iter()
                .enumerate()
                .filter(|(_, row)| matches(row))
                .map(|(idx, _)| idx)
                .collect()
        }
    }

    fn sort_indices(&self, view: &mut [usize]) {
        let column = self.sort.column;
        let Some(meta) = self.columns.get(column) else {
            return;
        };
        let ascending = self.sort.ascending;
        let rows = &self.rows;
        if meta.numeric {
            // Numbers first, blanks last, in both directions
            view.sort_by(|&a, &b| {
                match (parse_finite(rows[a].cell(column)), parse_finite(rows[b].cell(column))) {
                    (Some(x), Some(y)) => {
                        let ord = x.total_cmp(&y);
                        if ascending { ord } else { ord.reverse() }
                    }
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                }
            });
        } else if ascending {
            view.sort_by(|&a, &b| rows[a].cell(column).cmp(rows[b].cell(column)));
        } else {
            view.sort_by(|&a, &b| rows[b].cell(column).cmp(rows[a].cell(column)));
        }
    }

    pub fn sort_by(&mut self, column: usize, ascending: bool) {
        if column >= self.columns.len() {
            return;
        }
        debug!("Sorting by column {column} ascending: {ascending}");
        self.sort = SortOrder { column, ascending };
        self.cursor = 0;
        self.refresh();
    }

    /// Sorts by the column under the cursor.
    pub fn sort_cursor_column(&mut self, ascending: bool) {
        if let Some(&column) = self.visible_columns().get(self.cursor_column) {
            self.sort_by(column, ascending);
        }
    }

    pub fn set_filter(&mut self, term: Option<String>) {
        self.filter = term.filter(|t| !t.trim().is_empty());
        self.cursor = 0;
        self.refresh();
        info!(
            "Filter {:?} leaves {} of {} rows",
            self.filter,
            self.view.len(),
            self.rows.len()
        );
    }

    pub fn cycle_page_size(&mut self) -> PageSize {
        let idx = self
            .page_size_choices
            .iter()
            .position(|p| *p == self.page_size)
            .map(|i| (i + 1) % self.page_size_choices.len())
            .unwrap_or(0);
        if let Some(next) = self.page_size_choices.get(idx) {
            self.page_size = *next;
        }
        self.page_size
    }

    pub fn next_page(&mut self) {
        if self.page() + 1 < self.page_count() {
            self.cursor = (self.page() + 1) * self.page_len();
        }
    }

    pub fn previous_page(&mut self) {
        if self.page() > 0 {
            self.cursor = (self.page() - 1) * self.page_len();
        }
    }

    pub fn first_row(&mut self) {
        self.cursor = 0;
    }

    pub fn last_row(&mut self) {
        self.cursor = self.view.len().saturating_sub(1);
    }

    pub fn move_up(&mut self, size: usize) {
        self.cursor = self.cursor.saturating_sub(size);
    }

    pub fn move_down(&mut self, size: usize) {
        self.cursor = std::cmp::min(self.cursor + size, self.view.len().saturating_sub(1));
    }

    pub fn move_left(&mut self) {
        self.cursor_column = self.cursor_column.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        let visible = self.visible_columns().len();
        if self.cursor_column + 1 < visible {
            self.cursor_column += 1;
        }
    }

    fn wrap_cell_content(c: &str) -> String {
        let needs_escaping = c.contains('"');
        let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',');
        let mut out = String::from(c);

        if needs_escaping {
            out = out.replace('"', "\"\"");
        }
        if needs_escaping || needs_wrapping {
            out = format!("\"{out}\"");
        }
        out
    }

    /// The cursor row as one comma separated line of visible cells.
    pub fn current_row_as_csv(&self) -> Option<String> {
        let row = self.current_row()?;
        Some(
            self.visible_columns()
                .into_iter()
                .map(|c| Self::wrap_cell_content(row.cell(c)))
                .collect::<Vec<String>>()
                .join(","),
        )
    }

    /// Filtered and sorted rows restricted to the visible columns.
    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let mut names = HashSet::new();
        let columns = self
            .visible_columns()
            .into_iter()
            .map(|c| {
                let meta = &self.columns[c];
                let name = if names.insert(meta.title.as_str()) {
                    meta.title.as_str()
                } else {
                    meta.key.as_str()
                };
                let values: Vec<&str> = self.view.iter().map(|&r| self.rows[r].cell(c)).collect();
                Column::new(name.into(), values)
            })
            .collect::<Vec<Column>>();
        DataFrame::new(columns)
    }

    pub fn export(&self, path: &Path, format: ExportFormat) -> Result<PathBuf, ExplorerError> {
        let start_time = Instant::now();
        let mut frame = self.to_frame()?;
        let mut file = File::create(path)
            .map_err(|e| ExplorerError::Export(format!("{}: {e}", path.display())))?;
        match format {
            ExportFormat::Csv => CsvWriter::new(&mut file)
                .include_header(true)
                .finish(&mut frame)?,
            ExportFormat::Parquet => {
                ParquetWriter::new(&mut file).finish(&mut frame)?;
            }
        }
        info!(
            "Exported {} rows to {} in {}ms",
            frame.height(),
            path.display(),
            start_time.elapsed().as_millis()
        );
        Ok(path.to_path_buf())
    }
}

impl Grid for TerminalGrid {
    fn add_rows(&mut self, rows: Vec<CanonicalRow>) {
        self.rows.extend(rows);
        self.detect_numeric();
        self.refresh();
    }

    fn clear(&mut self) {
        self.rows.clear();
        self.view = Arc::new(Vec::new());
        self.cursor = 0;
    }

    fn destroy(&mut self) {
        self.clear();
        self.destroyed = true;
    }

    fn set_column_visible(&mut self, index: usize, visible: bool) {
        if let Some(column) = self.columns.get_mut(index) {
            column.visible = visible;
        }
        self.refresh();
    }

    fn column_visible(&self, index: usize) -> bool {
        self.columns.get(index).is_some_and(|c| c.visible)
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }
}
