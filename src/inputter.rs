use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

/// Single line editor for the filter prompt.
#[derive(Default)]
pub struct Inputter {
    buffer: Vec<char>,
    curser_pos: usize,
    finished: bool,
    canceled: bool,
}

#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct InputResult {
    pub input: String,
    pub finished: bool,
    pub canceled: bool,
    pub curser_pos: usize,
}

impl Inputter {
    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => self.finished = true,
            (KeyCode::Esc, _) => {
                self.clear();
                self.canceled = true;
                self.finished = true;
            }
            (KeyCode::Backspace, _) => {
                if self.curser_pos > 0 {
                    self.curser_pos -= 1;
                    self.buffer.remove(self.curser_pos);
                }
            }
            (KeyCode::Delete, _) => {
                if self.curser_pos < self.buffer.len() {
                    self.buffer.remove(self.curser_pos);
                }
            }
            (KeyCode::Left, _) => self.curser_pos = self.curser_pos.saturating_sub(1),
            (KeyCode::Right, _) => {
                self.curser_pos = std::cmp::min(self.curser_pos + 1, self.buffer.len())
            }
            (KeyCode::Home, _) => self.curser_pos = 0,
            (KeyCode::End, _) => self.curser_pos = self.buffer.len(),
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                self.buffer.drain(..self.curser_pos);
                self.curser_pos = 0;
            }
            (KeyCode::Char(chr), m) if !m.contains(KeyModifiers::CONTROL) => {
                self.buffer.insert(self.curser_pos, chr);
                self.curser_pos += 1;
            }
            (code, _) => trace!("Ignoring input key {code:?}"),
        }
        self.get()
    }

    /// Starts a new edit prefilled with `s`, cursor at the end.
    pub fn set(&mut self, s: &str) {
        self.clear();
        self.buffer = s.chars().collect();
        self.curser_pos = self.buffer.len();
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.buffer.iter().collect(),
            finished: self.finished,
            canceled: self.canceled,
            curser_pos: self.curser_pos,
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.curser_pos = 0;
        self.finished = false;
        self.canceled = false;
    }
}
