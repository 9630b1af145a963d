//! Editable text buffer fed by decoded key events.

use crate::event::{KeyAction, KeyEvent};

/// A growable list of characters with append and delete-last.
///
/// Deleting from an empty buffer is a no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextBuffer {
    chars: Vec<char>,
}

impl TextBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a character.
    pub fn push(&mut self, c: char) {
        self.chars.push(c);
    }

    /// Remove and return the last character, if any.
    pub fn backspace(&mut self) -> Option<char> {
        self.chars.pop()
    }

    /// Apply a decoded action. Returns `true` if the buffer changed.
    pub fn apply_action(&mut self, action: KeyAction) -> bool {
        match action {
            KeyAction::Insert(c) => {
                self.push(c);
                true
            }
            KeyAction::Delete => self.backspace().is_some(),
            KeyAction::Ignore => false,
        }
    }

    /// Decode and apply a key event. Returns `true` if the buffer changed.
    pub fn apply(&mut self, event: &KeyEvent) -> bool {
        self.apply_action(event.action())
    }

    /// Number of characters held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chars.len()
    }

    /// Check if the buffer holds no characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Collect the buffer into a string.
    #[must_use]
    pub fn as_string(&self) -> String {
        self.chars.iter().collect()
    }
}

impl std::fmt::Display for TextBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use std::fmt::Write;

        for c in &self.chars {
            f.write_char(*c)?;
        }
        Ok(())
    }
}

impl<'a> Extend<&'a KeyEvent> for TextBuffer {
    fn extend<I: IntoIterator<Item = &'a KeyEvent>>(&mut self, iter: I) {
        for event in iter {
            self.apply(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn replay(events: &[KeyEvent]) -> String {
        let mut buffer = TextBuffer::new();
        buffer.extend(events);
        buffer.as_string()
    }

    #[test]
    fn test_single_chars_concatenate() {
        let events: Vec<_> = "hello, world"
            .chars()
            .map(|c| KeyEvent::down(c.to_string()))
            .collect();
        assert_eq!(replay(&events), "hello, world");
    }

    #[test]
    fn test_space_equals_literal_space() {
        let named = replay(&[
            KeyEvent::down("a"),
            KeyEvent::down("space"),
            KeyEvent::down("b"),
        ]);
        let literal = replay(&[
            KeyEvent::down("a"),
            KeyEvent::down(" "),
            KeyEvent::down("b"),
        ]);
        assert_eq!(named, literal);
        assert_eq!(named, "a b");
    }

    #[test]
    fn test_backspace_on_empty_is_noop() {
        let mut buffer = TextBuffer::new();
        assert!(!buffer.apply(&KeyEvent::down("backspace")));
        assert!(!buffer.apply(&KeyEvent::down("backspace")));
        assert!(buffer.is_empty());
        assert_eq!(buffer.as_string(), "");
    }

    #[test]
    fn test_backspace_removes_most_recent() {
        let mut buffer = TextBuffer::new();
        for name in ["x", "y", "z"] {
            buffer.apply(&KeyEvent::down(name));
        }
        let before = buffer.clone();

        buffer.apply(&KeyEvent::down("q"));
        buffer.apply(&KeyEvent::down("backspace"));

        assert_eq!(buffer, before);
        assert_eq!(buffer.len(), 3);
    }

    #[test]
    fn test_backspace_removes_newline() {
        assert_eq!(
            replay(&[
                KeyEvent::down("a"),
                KeyEvent::down("enter"),
                KeyEvent::down("backspace"),
            ]),
            "a"
        );
    }

    #[test]
    fn test_up_events_never_mutate() {
        let mut buffer = TextBuffer::new();
        buffer.push('k');
        for name in ["a", "space", "enter", "backspace", "shift"] {
            assert!(!buffer.apply(&KeyEvent::up(name)));
        }
        assert_eq!(buffer.as_string(), "k");
    }

    #[test]
    fn test_modifier_names_never_mutate() {
        let mut buffer = TextBuffer::new();
        buffer.push('k');
        for name in ["shift", "ctrl", "alt", "tab", "caps lock", "f12", "up"] {
            assert!(!buffer.apply(&KeyEvent::down(name)));
        }
        assert_eq!(buffer.as_string(), "k");
    }

    #[test]
    fn test_scenario_hi_bang() {
        let events = [
            KeyEvent::down("h"),
            KeyEvent::down("i"),
            KeyEvent::down("space"),
            KeyEvent::down("backspace"),
            KeyEvent::down("!"),
        ];
        assert_eq!(replay(&events), "hi!");
    }

    #[test]
    fn test_scenario_enter() {
        let events = [
            KeyEvent::down("a"),
            KeyEvent::down("enter"),
            KeyEvent::down("b"),
        ];
        assert_eq!(replay(&events), "a\nb");
    }

    #[test]
    fn test_display_matches_as_string() {
        let mut buffer = TextBuffer::new();
        buffer.push('o');
        buffer.push('k');
        assert_eq!(buffer.to_string(), buffer.as_string());
    }
}
