use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::trace;

/// Single line editor behind the search prompt. The cursor counts chars,
/// not bytes.
#[derive(Default)]
pub struct Inputter {
    current_input: String,
    cursor_pos: usize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct InputResult {
    pub input: String,
    pub cursor_pos: usize,
    pub changed: bool,
    pub finished: bool,
    pub canceled: bool,
}

impl Inputter {
    pub fn read(&mut self, key: KeyEvent) -> InputResult {
        let before = self.current_input.clone();
        let (finished, canceled) = match (key.code, key.modifiers) {
            (KeyCode::Enter, _) => (true, false),
            (KeyCode::Esc, _) => {
                self.clear();
                (true, true)
            }
            (KeyCode::Backspace, _) => {
                self.backspace();
                (false, false)
            }
            (KeyCode::Delete, _) => {
                self.delete();
                (false, false)
            }
            (KeyCode::Left, _) => {
                self.cursor_pos = self.cursor_pos.saturating_sub(1);
                (false, false)
            }
            (KeyCode::Right, _) => {
                self.cursor_pos = (self.cursor_pos + 1).min(self.char_len());
                (false, false)
            }
            (KeyCode::Home, _) => {
                self.cursor_pos = 0;
                (false, false)
            }
            (KeyCode::End, _) => {
                self.cursor_pos = self.char_len();
                (false, false)
            }
            (KeyCode::Char('u'), KeyModifiers::CONTROL) => {
                self.clear();
                (false, false)
            }
            (KeyCode::Char(chr), m) if !m.contains(KeyModifiers::CONTROL) => {
                self.insert(chr);
                (false, false)
            }
            _ => (false, false),
        };

        let result = InputResult {
            input: self.current_input.clone(),
            cursor_pos: self.cursor_pos,
            changed: before != self.current_input,
            finished,
            canceled,
        };
        trace!("Input {:?} => {:?}", key.code, result);
        result
    }

    pub fn get(&self) -> InputResult {
        InputResult {
            input: self.current_input.clone(),
            cursor_pos: self.cursor_pos,
            ..InputResult::default()
        }
    }

    pub fn clear(&mut self) {
        self.current_input.clear();
        self.cursor_pos = 0;
    }

    fn insert(&mut self, chr: char) {
        let at = self.byte_pos(self.cursor_pos);
        self.current_input.insert(at, chr);
        self.cursor_pos += 1;
    }

    fn backspace(&mut self) {
        if self.cursor_pos > 0 {
            self.cursor_pos -= 1;
            let at = self.byte_pos(self.cursor_pos);
            self.current_input.remove(at);
        }
    }

    fn delete(&mut self) {
        if self.cursor_pos < self.char_len() {
            let at = self.byte_pos(self.cursor_pos);
            self.current_input.remove(at);
        }
    }

    fn char_len(&self) -> usize {
        self.current_input.chars().count()
    }

    fn byte_pos(&self, char_pos: usize) -> usize {
        self.current_input
            .char_indices()
            .nth(char_pos)
            .map(|(byte_idx, _)| byte_idx)
            .unwrap_or(self.current_input.len())
    }
}
