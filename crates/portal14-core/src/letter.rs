//! Letter panel with a typewriter reveal.

use serde::{Deserialize, Serialize};

/// Cursor state for the typed letter.
///
/// `typed_length` counts characters, not bytes, so multi-byte text never
/// gets sliced mid-codepoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LetterTyper {
    text: String,
    len: usize,
    open: bool,
    typed_length: usize,
}

impl LetterTyper {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let len = text.chars().count();
        Self {
            text,
            len,
            open: false,
            typed_length: 0,
        }
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn typed_length(&self) -> usize {
        self.typed_length
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// True once every character is shown.
    pub fn is_complete(&self) -> bool {
        self.typed_length >= self.len
    }

    /// Open the panel with the cursor at zero.
    pub fn open(&mut self) {
        self.open = true;
        self.typed_length = 0;
    }

    /// Close the panel and reset the cursor.
    pub fn close(&mut self) {
        self.open = false;
        self.typed_length = 0;
    }

    /// Advance the cursor by one. Returns false when nothing moved.
    pub fn tick(&mut self) -> bool {
        if !self.open || self.is_complete() {
            return false;
        }
        self.typed_length += 1;
        true
    }

    /// The visible prefix.
    pub fn typed_text(&self) -> &str {
        match self.text.char_indices().nth(self.typed_length) {
            Some((byte, _)) => &self.text[..byte],
            None => &self.text,
        }
    }
}
