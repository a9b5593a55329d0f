//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    /// Toggle the block under the cursor in or out of the selection.
    Toggle,
    /// Deselect every selected block.
    DeselectAll,
    Pause,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, enter/space)
/// and vim (hjkl) layouts.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent {
        code, modifiers, ..
    } = key;
    let no_mod = modifiers.is_empty() || modifiers == KeyModifiers::SHIFT;
    if !no_mod && modifiers != KeyModifiers::CONTROL {
        return Action::None;
    }
    match code {
        KeyCode::Char('q') | KeyCode::Esc if no_mod => Action::Quit,
        KeyCode::Char('p') if no_mod => Action::Pause,
        KeyCode::Left | KeyCode::Char('h') if no_mod => Action::MoveLeft,
        KeyCode::Right | KeyCode::Char('l') if no_mod => Action::MoveRight,
        KeyCode::Up | KeyCode::Char('k') if no_mod => Action::MoveUp,
        KeyCode::Down | KeyCode::Char('j') if no_mod => Action::MoveDown,
        KeyCode::Enter | KeyCode::Char(' ') if no_mod => Action::Toggle,
        KeyCode::Char('c') if no_mod => Action::DeselectAll,
        _ => Action::None,
    }
}
