//! Key events from the controlling terminal.
//!
//! [`TerminalSource`] puts the terminal in raw mode and reads crossterm key
//! events, so only keys typed into the keyrec terminal window are seen.
//! `Esc` and `Ctrl+C` fire the session's stop handle instead of being
//! recorded; raw mode swallows the usual SIGINT.
//!
//! Raw mode also turns off newline translation, so nothing here logs while it
//! is active. Stderr log lines from other tasks (for example the monitor's
//! stats sampler) still land on the raw terminal unless `-q` is given.

use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent as TermKeyEvent, KeyEventKind, KeyModifiers, ModifierKeyCode,
};
use crossterm::terminal;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::event::{EventSource, KeyEvent, KeyPhase, NextEvent};
use crate::signal::StopHandle;

/// What a raw terminal key event means to the recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translated {
    /// A key transition to feed the recorder.
    Key(KeyEvent),
    /// The user asked to stop recording.
    Stop,
    /// Nothing the recorder cares about.
    Skip,
}

/// Name a crossterm key code the way the recorder expects.
///
/// Printable keys become their single character, `' '` becomes `"space"`,
/// and everything else gets a lowercase word.
#[must_use]
pub fn key_name(code: KeyCode) -> Option<String> {
    let name = match code {
        KeyCode::Char(' ') => "space".to_string(),
        KeyCode::Char(c) => c.to_string(),
        KeyCode::Enter => "enter".to_string(),
        KeyCode::Backspace => "backspace".to_string(),
        KeyCode::Tab | KeyCode::BackTab => "tab".to_string(),
        KeyCode::Esc => "esc".to_string(),
        KeyCode::Left => "left".to_string(),
        KeyCode::Right => "right".to_string(),
        KeyCode::Up => "up".to_string(),
        KeyCode::Down => "down".to_string(),
        KeyCode::Home => "home".to_string(),
        KeyCode::End => "end".to_string(),
        KeyCode::PageUp => "page up".to_string(),
        KeyCode::PageDown => "page down".to_string(),
        KeyCode::Delete => "delete".to_string(),
        KeyCode::Insert => "insert".to_string(),
        KeyCode::CapsLock => "caps lock".to_string(),
        KeyCode::F(n) => format!("f{n}"),
        KeyCode::Modifier(modifier) => modifier_name(modifier).to_string(),
        _ => return None,
    };
    Some(name)
}

fn modifier_name(modifier: ModifierKeyCode) -> &'static str {
    match modifier {
        ModifierKeyCode::LeftShift | ModifierKeyCode::RightShift => "shift",
        ModifierKeyCode::LeftControl | ModifierKeyCode::RightControl => "ctrl",
        ModifierKeyCode::LeftAlt | ModifierKeyCode::RightAlt => "alt",
        ModifierKeyCode::LeftSuper | ModifierKeyCode::RightSuper => "windows",
        _ => "modifier",
    }
}

/// Decode a crossterm key event.
#[must_use]
pub fn translate(event: &TermKeyEvent) -> Translated {
    let phase = match event.kind {
        KeyEventKind::Press | KeyEventKind::Repeat => KeyPhase::Down,
        KeyEventKind::Release => KeyPhase::Up,
    };

    let is_stop = event.code == KeyCode::Esc
        || (event.code == KeyCode::Char('c') && event.modifiers.contains(KeyModifiers::CONTROL));
    if is_stop {
        return if phase == KeyPhase::Down {
            Translated::Stop
        } else {
            Translated::Skip
        };
    }

    match key_name(event.code) {
        Some(name) => Translated::Key(KeyEvent { name, phase }),
        None => Translated::Skip,
    }
}

/// Reads key events from the terminal in raw mode.
///
/// Raw mode is restored when the source is dropped.
#[derive(Debug)]
pub struct TerminalSource {
    stop: StopHandle,
}

impl TerminalSource {
    /// Enable raw mode and start reading keys.
    ///
    /// `stop` is fired when the user presses `Esc` or `Ctrl+C`.
    ///
    /// # Errors
    ///
    /// Returns a platform error if raw mode cannot be enabled (for example
    /// when stdin is not a terminal).
    pub fn new(stop: StopHandle) -> Result<Self> {
        debug!("Enabling terminal raw mode");
        terminal::enable_raw_mode()
            .map_err(|e| Error::platform(format!("failed to enable raw mode: {e}")))?;
        Ok(Self { stop })
    }
}

impl Drop for TerminalSource {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            warn!(error = %e, "Failed to restore terminal mode");
        }
    }
}

impl EventSource for TerminalSource {
    fn name(&self) -> &'static str {
        "terminal"
    }

    fn next_event(&mut self, timeout: Duration) -> Result<NextEvent> {
        let ready =
            event::poll(timeout).map_err(|e| Error::event_source(self.name(), e.to_string()))?;
        if !ready {
            return Ok(NextEvent::Idle);
        }

        match event::read().map_err(|e| Error::event_source(self.name(), e.to_string()))? {
            Event::Key(key) => match translate(&key) {
                Translated::Key(event) => Ok(NextEvent::Key(event)),
                Translated::Stop => {
                    self.stop.stop();
                    Ok(NextEvent::Idle)
                }
                Translated::Skip => Ok(NextEvent::Idle),
            },
            _ => Ok(NextEvent::Idle),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> TermKeyEvent {
        TermKeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_key_name_printable() {
        assert_eq!(key_name(KeyCode::Char('a')), Some("a".to_string()));
        assert_eq!(key_name(KeyCode::Char('A')), Some("A".to_string()));
        assert_eq!(key_name(KeyCode::Char('!')), Some("!".to_string()));
    }

    #[test]
    fn test_key_name_special() {
        assert_eq!(key_name(KeyCode::Char(' ')), Some("space".to_string()));
        assert_eq!(key_name(KeyCode::Enter), Some("enter".to_string()));
        assert_eq!(key_name(KeyCode::Backspace), Some("backspace".to_string()));
        assert_eq!(key_name(KeyCode::F(5)), Some("f5".to_string()));
        assert_eq!(key_name(KeyCode::PageUp), Some("page up".to_string()));
        assert_eq!(
            key_name(KeyCode::Modifier(ModifierKeyCode::LeftShift)),
            Some("shift".to_string())
        );
    }

    #[test]
    fn test_key_name_unmapped() {
        assert_eq!(key_name(KeyCode::Null), None);
    }

    #[test]
    fn test_translate_press_is_down() {
        assert_eq!(
            translate(&press(KeyCode::Char('x'))),
            Translated::Key(KeyEvent::down("x"))
        );
    }

    #[test]
    fn test_translate_repeat_is_down() {
        let event = TermKeyEvent::new_with_kind(
            KeyCode::Char('x'),
            KeyModifiers::NONE,
            KeyEventKind::Repeat,
        );
        assert_eq!(translate(&event), Translated::Key(KeyEvent::down("x")));
    }

    #[test]
    fn test_translate_release_is_up() {
        let event = TermKeyEvent::new_with_kind(
            KeyCode::Enter,
            KeyModifiers::NONE,
            KeyEventKind::Release,
        );
        assert_eq!(translate(&event), Translated::Key(KeyEvent::up("enter")));
    }

    #[test]
    fn test_translate_stop_keys() {
        assert_eq!(translate(&press(KeyCode::Esc)), Translated::Stop);
        assert_eq!(
            translate(&TermKeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Translated::Stop
        );
    }

    #[test]
    fn test_translate_stop_key_release_skipped() {
        let event =
            TermKeyEvent::new_with_kind(KeyCode::Esc, KeyModifiers::NONE, KeyEventKind::Release);
        assert_eq!(translate(&event), Translated::Skip);
    }

    #[test]
    fn test_translate_plain_c_records() {
        assert_eq!(
            translate(&press(KeyCode::Char('c'))),
            Translated::Key(KeyEvent::down("c"))
        );
    }

    #[test]
    fn test_translate_ctrl_letter_records_letter() {
        assert_eq!(
            translate(&TermKeyEvent::new(KeyCode::Char('a'), KeyModifiers::CONTROL)),
            Translated::Key(KeyEvent::down("a"))
        );
    }
}
