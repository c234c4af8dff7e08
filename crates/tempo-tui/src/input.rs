//! Single-line prompt editing with history.

use std::collections::VecDeque;

const MAX_HISTORY: usize = 100;

/// Prompt text, cursor, and previously submitted prompts.
#[derive(Debug, Clone, Default)]
pub struct InputState {
    content: String,
    /// Byte offset, always on a char boundary.
    cursor: usize,
    history: VecDeque<String>,
    history_index: Option<usize>,
    draft: Option<String>,
}

impl InputState {
    /// Create an empty input.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current text.
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Check if the input is empty.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Cursor column in characters.
    pub fn cursor_column(&self) -> usize {
        self.content[..self.cursor].chars().count()
    }

    /// Insert a character at the cursor.
    pub fn insert_char(&mut self, c: char) {
        self.content.insert(self.cursor, c);
        self.cursor += c.len_utf8();
        self.leave_history();
    }

    /// Delete the character before the cursor.
    pub fn backspace(&mut self) {
        if let Some((start, _)) = self.content[..self.cursor].char_indices().next_back() {
            self.content.remove(start);
            self.cursor = start;
            self.leave_history();
        }
    }

    /// Delete the character at the cursor.
    pub fn delete(&mut self) {
        if self.cursor < self.content.len() {
            self.content.remove(self.cursor);
            self.leave_history();
        }
    }

    /// Move the cursor one character left.
    pub fn move_left(&mut self) {
        if let Some((start, _)) = self.content[..self.cursor].char_indices().next_back() {
            self.cursor = start;
        }
    }

    /// Move the cursor one character right.
    pub fn move_right(&mut self) {
        if let Some(c) = self.content[self.cursor..].chars().next() {
            self.cursor += c.len_utf8();
        }
    }

    /// Move the cursor to the start.
    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    /// Move the cursor to the end.
    pub fn move_end(&mut self) {
        self.cursor = self.content.len();
    }

    /// Clear the text and leave history browsing.
    pub fn clear(&mut self) {
        self.content.clear();
        self.cursor = 0;
        self.leave_history();
    }

    /// Take the trimmed prompt and record it in history.
    pub fn submit(&mut self) -> String {
        let text = self.content.trim().to_string();
        if !text.is_empty() && self.history.back() != Some(&text) {
            if self.history.len() >= MAX_HISTORY {
                self.history.pop_front();
            }
            self.history.push_back(text.clone());
        }
        self.clear();
        text
    }

    /// Step back through history, saving the draft on first use.
    pub fn history_prev(&mut self) {
        if self.history.is_empty() {
            return;
        }
        let index = match self.history_index {
            None => {
                self.draft = Some(self.content.clone());
                self.history.len() - 1
            }
            Some(0) => 0,
            Some(i) => i - 1,
        };
        self.history_index = Some(index);
        self.set_content(self.history[index].clone());
    }

    /// Step forward; past the newest entry the draft comes back.
    pub fn history_next(&mut self) {
        let Some(index) = self.history_index else {
            return;
        };
        if index + 1 < self.history.len() {
            self.history_index = Some(index + 1);
            self.set_content(self.history[index + 1].clone());
        } else {
            self.history_index = None;
            let draft = self.draft.take().unwrap_or_default();
            self.set_content(draft);
        }
    }

    fn set_content(&mut self, content: String) {
        self.content = content;
        self.cursor = self.content.len();
    }

    fn leave_history(&mut self) {
        self.history_index = None;
        self.draft = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typed(text: &str) -> InputState {
        let mut input = InputState::new();
        text.chars().for_each(|c| input.insert_char(c));
        input
    }

    #[test]
    fn test_editing_respects_char_boundaries() {
        let mut input = typed("häst");
        input.move_left();
        input.move_left();
        input.backspace();
        assert_eq!(input.content(), "hst");
        assert_eq!(input.cursor_column(), 1);

        input.delete();
        assert_eq!(input.content(), "ht");
        input.move_end();
        input.insert_char('!');
        assert_eq!(input.content(), "ht!");
    }

    #[test]
    fn test_submit_trims_and_records() {
        let mut input = typed("  notice period?  ");
        assert_eq!(input.submit(), "notice period?");
        assert!(input.is_empty());

        input.history_prev();
        assert_eq!(input.content(), "notice period?");
    }

    #[test]
    fn test_history_restores_draft() {
        let mut input = InputState::new();
        for prompt in ["first", "second"] {
            prompt.chars().for_each(|c| input.insert_char(c));
            input.submit();
        }
        "dra".chars().for_each(|c| input.insert_char(c));

        input.history_prev();
        assert_eq!(input.content(), "second");
        input.history_prev();
        input.history_prev();
        assert_eq!(input.content(), "first");
        input.history_next();
        assert_eq!(input.content(), "second");
        input.history_next();
        assert_eq!(input.content(), "dra");
    }
}
