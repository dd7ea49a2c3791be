use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

/// Result of offering one terminal event to the input buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// The input changed; the full new snapshot is attached
    Changed(String),
    /// The event does not edit text
    Unchanged,
    /// Bulk insertion refused at the boundary
    Rejected,
}

/// Builds full-string input snapshots from individual key presses.
///
/// Only organic key input reaches the engine: printable characters append,
/// Backspace removes the last character, and pasted text is refused.
#[derive(Debug, Default, Clone)]
pub struct InputBuffer {
    text: String,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn clear(&mut self) {
        self.text.clear();
    }

    pub fn on_key(&mut self, key: &KeyEvent) -> Edit {
        if key
            .modifiers
            .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
        {
            return Edit::Unchanged;
        }

        match key.code {
            KeyCode::Char(c) => {
                self.text.push(c);
                Edit::Changed(self.text.clone())
            }
            KeyCode::Backspace => match self.text.pop() {
                Some(_) => Edit::Changed(self.text.clone()),
                None => Edit::Unchanged,
            },
            _ => Edit::Unchanged,
        }
    }

    pub fn on_paste(&self, pasted: &str) -> Edit {
        debug!(chars = pasted.chars().count(), "rejected pasted text");
        Edit::Rejected
    }
}
