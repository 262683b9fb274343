use std::time::Duration;
use tracing::trace;

use ratatui::crossterm::event::{self, Event, KeyCode, KeyModifiers};
use crate::domain::{ExplorerConfig, ExplorerError, Message};
use crate::model::Model;

pub struct Controller {
    event_poll_time: u64,
}

impl Controller {
    pub fn new(cfg: &ExplorerConfig) -> Self {
        Self {
            event_poll_time: cfg.event_poll_time,
        }
    }

    pub fn handle_event(&self, model: &Model) -> Result<Option<Message>, ExplorerError> {
        if !event::poll(Duration::from_millis(self.event_poll_time))? {
            return Ok(None);
        }
        match event::read()? {
            Event::Key(key) if key.kind == event::KeyEventKind::Press => {
                if model.raw_keyevents() {
                    Ok(Some(Message::RawKey(key)))
                } else {
                    Ok(self.handle_key(key))
                }
            }
            Event::Resize(width, height) => Ok(Some(Message::Resize(width as usize, height as usize))),
            _ => Ok(None),
        }
    }

    fn handle_key(&self, key: event::KeyEvent) -> Option<Message> {
        let message = match (key.code, key.modifiers) {
            (KeyCode::Char('c'), KeyModifiers::CONTROL) => Some(Message::Quit),
            (KeyCode::Char('q'), _) => Some(Message::Quit),
            (KeyCode::Char('?'), _) => Some(Message::Help),
            (KeyCode::Esc, _) => Some(Message::Exit),
            (KeyCode::Enter, _) => Some(Message::Enter),
            (KeyCode::Tab, _) | (KeyCode::BackTab, _) => Some(Message::SwitchFocus),
            (KeyCode::Up, _) | (KeyCode::Char('k'), _) => Some(Message::MoveUp),
            (KeyCode::Down, _) | (KeyCode::Char('j'), _) => Some(Message::MoveDown),
            (KeyCode::PageUp, _) => Some(Message::MovePageUp),
            (KeyCode::PageDown, _) => Some(Message::MovePageDown),
            (KeyCode::Home, _) | (KeyCode::Char('g'), _) => Some(Message::MoveBeginning),
            (KeyCode::End, _) | (KeyCode::Char('G'), _) => Some(Message::MoveEnd),
            (KeyCode::Left, _) => Some(Message::PreviousPage),
            (KeyCode::Right, _) => Some(Message::NextPage),
            (KeyCode::Char('<'), _) | (KeyCode::Char('h'), _) => Some(Message::MoveLeft),
            (KeyCode::Char('>'), _) | (KeyCode::Char('l'), _) => Some(Message::MoveRight),
            (KeyCode::Char('p'), _) => Some(Message::CyclePageSize),
            (KeyCode::Char('s'), _) => Some(Message::SortAscending),
            (KeyCode::Char('S'), _) => Some(Message::SortDescending),
            (KeyCode::Char('/'), _) => Some(Message::Filter),
            (KeyCode::Char('e'), _) => Some(Message::ExportCsv),
            (KeyCode::Char('E'), _) => Some(Message::ExportParquet),
            (KeyCode::Char('y'), _) => Some(Message::CopyRow),
            (KeyCode::Char('x'), _) | (KeyCode::Backspace, _) => Some(Message::ClearSelection),
            (KeyCode::Char(chr @ '1'..='9'), _) => chr
                .to_digit(10)
                .map(|d| Message::ToggleColumn(d as usize - 1)),
            _ => None,
        };
        trace!("Mapped: {key:?} => {message:?}");
        message
    }
}
