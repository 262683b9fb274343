use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Position, Rect},
    style::{Color, Modifier, Style, Stylize},
    symbols::border,
    text::{Line, Span},
    widgets::{Block, Cell, Clear, List, ListItem, ListState, Paragraph, Row, Table, TableState, Wrap},
};

use crate::domain::CMDMode;
use crate::model::{Model, TableData, UIData};

pub const CMDLINE_HEIGH: usize = 1;
pub const HEADER_HEIGHT: usize = 1;
pub const CATALOG_WIDTH: u16 = 28;
const STATUS_MESSAGE_TTL: Duration = Duration::from_secs(5);
/// Lines around the table rows: header and status lines, borders, the column
/// titles, the toggle line and the info line.
pub const CHROME_HEIGHT: usize = HEADER_HEIGHT + CMDLINE_HEIGH + 2 + 1 + 2;

pub struct ExplorerUI {
    title: String,
}

impl ExplorerUI {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let data = model.get_uidata();
        let [header, main, cmdline] = Layout::vertical([
            Constraint::Length(HEADER_HEIGHT as u16),
            Constraint::Min(3),
            Constraint::Length(CMDLINE_HEIGH as u16),
        ])
        .areas(frame.area());
        let [catalog, table] =
            Layout::horizontal([Constraint::Length(CATALOG_WIDTH), Constraint::Min(10)]).areas(main);

        self.render_header(&data, frame, header);
        Self::render_catalog(&data, frame, catalog);
        Self::render_table(&data, frame, table);
        Self::render_cmdline(&data, frame, cmdline);
        if data.show_popup {
            Self::render_popup(&data.popup_message, frame);
        }
    }

    fn render_header(&self, data: &UIData, frame: &mut Frame, area: Rect) {
        let mut spans = vec![Span::from(format!(" {} ", self.title)).bold()];
        if let Some(count) = &data.view.item_count {
            spans.push(Span::from(format!(" {count} ")).cyan());
        }
        if data.view.loading {
            spans.push(Span::from(" Loading ... ").yellow().italic());
        }
        if let Some(error) = &data.view.error {
            spans.push(Span::from(format!(" {error} ")).white().on_red());
        }
        frame.render_widget(Paragraph::new(Line::from(spans)), area);
    }

    fn render_catalog(data: &UIData, frame: &mut Frame, area: Rect) {
        let mut block = Block::bordered().title(" Inventories ");
        block = if data.list_focused {
            block.border_set(border::THICK)
        } else {
            block.dim()
        };
        if !data.view.selection_enabled {
            let text = if data.catalog_loaded || data.view.error.is_some() {
                "Inventory list unavailable"
            } else {
                "Loading inventories ..."
            };
            let message = Paragraph::new(text)
                .dark_gray()
                .wrap(Wrap { trim: true })
                .block(block);
            frame.render_widget(message, area);
            return;
        }

        let items = Self::catalog_items(data);
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::new().add_modifier(Modifier::REVERSED))
            .highlight_symbol("> ");
        let mut state = ListState::default().with_selected(Some(data.list_cursor));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn catalog_items(data: &UIData) -> Vec<ListItem<'static>> {
        data.inventories
            .iter()
            .enumerate()
            .map(|(idx, entry)| {
                let item = ListItem::new(entry.label());
                if data.selected_position == Some(idx) {
                    item.green()
                } else {
                    item
                }
            })
            .collect()
    }

    fn render_table(data: &UIData, frame: &mut Frame, area: Rect) {
        let caption = data.view.caption.clone().unwrap_or_default();
        let mut block = Block::bordered().title(Line::from(format!(" {caption} ")).bold());
        if data.list_focused {
            block = block.dim();
        } else {
            block = block.border_set(border::THICK);
        }
        let Some(table) = data.table.as_ref().filter(|_| data.view.table_visible) else {
            let hint = if data.view.loading {
                ""
            } else {
                "Select an inventory and press Enter"
            };
            frame.render_widget(Paragraph::new(hint).dark_gray().block(block), area);
            return;
        };

        let inner = block.inner(area);
        frame.render_widget(block, area);
        let [rows_area, toggles_area, info_area] = Layout::vertical([
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .areas(inner);

        Self::render_rows(table, frame, rows_area);
        frame.render_widget(Paragraph::new(Self::toggle_line(table)), toggles_area);
        frame.render_widget(Paragraph::new(Self::info_line(table)), info_area);
    }

    fn render_rows(table: &TableData, frame: &mut Frame, area: Rect) {
        let sorted = table.sorted_by.as_ref();
        let header = Row::new(table.headers.iter().map(|title| {
            let marker = match sorted {
                Some((name, true)) if name == title => " ▲",
                Some((name, false)) if name == title => " ▼",
                _ => "",
            };
            Cell::from(format!("{title}{marker}"))
        }))
        .style(Style::new().bold().underlined());

        let rows = table
            .rows
            .iter()
            .map(|r| Row::new(r.iter().map(|c| Cell::from(c.as_str()))));
        let widths = table
            .widths
            .iter()
            .map(|w| Constraint::Length((*w as u16).saturating_add(2)));

        let grid = Table::new(rows, widths)
            .header(header)
            .column_spacing(1)
            .row_highlight_style(Style::new().bg(Color::DarkGray))
            .cell_highlight_style(Style::new().add_modifier(Modifier::REVERSED));
        let mut state = TableState::default()
            .with_selected(Some(table.selected_row))
            .with_selected_column(Some(table.selected_column));
        frame.render_stateful_widget(grid, area, &mut state);
    }

    fn toggle_line(table: &TableData) -> Line<'_> {
        if table.toggles.is_empty() {
            return Line::default();
        }
        let mut spans = vec![Span::from("Columns: ").dark_gray()];
        for (idx, (title, visible)) in table.toggles.iter().enumerate() {
            let mark = if *visible { "x" } else { " " };
            let span = Span::from(format!("{}[{mark}] {title}  ", idx + 1));
            spans.push(if *visible { span } else { span.dark_gray() });
        }
        Line::from(spans)
    }

    fn info_line(table: &TableData) -> Line<'_> {
        let mut spans = vec![
            Span::from(table.info.as_str()),
            Span::from(format!(
                "  page {}/{}  ({} per page)",
                table.page + 1,
                table.page_count,
                table.page_size
            ))
            .dark_gray(),
        ];
        if let Some(filter) = &table.filter {
            spans.push(Span::from(format!("  filter: {filter}")).yellow());
        }
        Line::from(spans)
    }

    fn render_cmdline(data: &UIData, frame: &mut Frame, area: Rect) {
        if data.active_cmdinput {
            let prompt = match data.cmd_mode {
                Some(CMDMode::Filter) => "/",
                None => ":",
            };
            let line = Line::from(vec![
                Span::from(prompt).bold(),
                Span::from(data.cmdinput.input.as_str()),
            ]);
            frame.render_widget(Paragraph::new(line), area);
            let x = area.x + (prompt.len() + data.cmdinput.curser_pos) as u16;
            frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(1)), area.y));
        } else {
            let status = Span::from(data.status_message.as_str());
            let status = if data.last_status_message_update.elapsed() > STATUS_MESSAGE_TTL {
                status.dark_gray()
            } else {
                status
            };
            let line = Line::from(vec![
                status,
                Span::from("  ? help  q quit").dark_gray(),
            ]);
            frame.render_widget(Paragraph::new(line), area);
        }
    }

    fn render_popup(message: &str, frame: &mut Frame) {
        let area = popup_area(frame.area(), 70, 80);
        let block = Block::bordered()
            .title(" Help ")
            .title_bottom(Line::from(" <Esc> close ").centered())
            .border_set(border::THICK);
        frame.render_widget(Clear, area);
        frame.render_widget(Paragraph::new(message).block(block), area);
    }
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let vertical = Layout::vertical([Constraint::Percentage(percent_y)]).flex(Flex::Center);
    let horizontal = Layout::horizontal([Constraint::Percentage(percent_x)]).flex(Flex::Center);
    let [area] = vertical.areas(area);
    let [area] = horizontal.areas(area);
    area
}
