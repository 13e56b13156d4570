//! Key bindings: arrows and vim-style letters.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveLeft,
    MoveRight,
    SoftDrop,
    Rotate,
    Pause,
    Restart,
    Confirm,
    Quit,
    None,
}

impl Action {
    /// Actions that keep firing while the key is held.
    pub fn repeats(self) -> bool {
        matches!(self, Self::MoveLeft | Self::MoveRight | Self::SoftDrop)
    }
}

/// Map a key event to an action. Ctrl-C always quits.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL {
        return match code {
            KeyCode::Char('c') => Action::Quit,
            _ => Action::None,
        };
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('p' | 'P') => Action::Pause,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Left | KeyCode::Char('h') => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k') => Action::Rotate,
        KeyCode::Down | KeyCode::Char('j') => Action::SoftDrop,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Confirm,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn arrows_and_vim_keys_agree() {
        assert_eq!(key_to_action(key(KeyCode::Left)), Action::MoveLeft);
        assert_eq!(key_to_action(key(KeyCode::Char('h'))), Action::MoveLeft);
        assert_eq!(key_to_action(key(KeyCode::Up)), Action::Rotate);
        assert_eq!(key_to_action(key(KeyCode::Char('k'))), Action::Rotate);
        assert_eq!(key_to_action(key(KeyCode::Char('j'))), Action::SoftDrop);
    }

    #[test]
    fn control_keys() {
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert_eq!(key_to_action(ctrl_c), Action::Quit);
        let alt_p = KeyEvent::new(KeyCode::Char('p'), KeyModifiers::ALT);
        assert_eq!(key_to_action(alt_p), Action::None);
        assert_eq!(key_to_action(key(KeyCode::Char('R'))), Action::Restart);
    }
}
