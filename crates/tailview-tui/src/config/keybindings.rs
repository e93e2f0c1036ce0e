use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;

use crate::app::Action;

/// A key combination
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn shift(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::SHIFT,
        }
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            code: event.code,
            modifiers: event.modifiers,
        }
    }
}

/// Context for keybindings
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyContext {
    Global,
    LogViewer,
    FilterInput,
    ConfirmDelete,
}

/// Keybinding configuration
pub struct KeyBindings {
    bindings: HashMap<KeyContext, HashMap<KeyBinding, Action>>,
}

impl KeyBindings {
    pub fn new() -> Self {
        let mut bindings = HashMap::new();

        // Global bindings
        let mut global = HashMap::new();
        global.insert(KeyBinding::new(KeyCode::Char('?')), Action::ToggleHelp);
        global.insert(KeyBinding::new(KeyCode::Esc), Action::Cancel);
        global.insert(KeyBinding::ctrl(KeyCode::Char('c')), Action::Quit);
        global.insert(KeyBinding::new(KeyCode::Char('q')), Action::Quit);
        bindings.insert(KeyContext::Global, global);

        // Log viewer bindings - less-like navigation, newest at the top
        let mut log_viewer = HashMap::new();
        log_viewer.insert(KeyBinding::new(KeyCode::Char('j')), Action::ScrollDown(1));
        log_viewer.insert(KeyBinding::new(KeyCode::Down), Action::ScrollDown(1));
        log_viewer.insert(KeyBinding::new(KeyCode::Char('k')), Action::ScrollUp(1));
        log_viewer.insert(KeyBinding::new(KeyCode::Up), Action::ScrollUp(1));
        log_viewer.insert(KeyBinding::ctrl(KeyCode::Char('f')), Action::PageDown);
        log_viewer.insert(KeyBinding::ctrl(KeyCode::Char('b')), Action::PageUp);
        log_viewer.insert(KeyBinding::ctrl(KeyCode::Char('d')), Action::PageDown);
        log_viewer.insert(KeyBinding::ctrl(KeyCode::Char('u')), Action::PageUp);
        log_viewer.insert(KeyBinding::new(KeyCode::PageDown), Action::PageDown);
        log_viewer.insert(KeyBinding::new(KeyCode::PageUp), Action::PageUp);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('g')), Action::ScrollToNewest);
        log_viewer.insert(KeyBinding::new(KeyCode::Home), Action::ScrollToNewest);
        log_viewer.insert(KeyBinding::shift(KeyCode::Char('G')), Action::ScrollToOldest);
        log_viewer.insert(KeyBinding::new(KeyCode::End), Action::ScrollToOldest);
        // Stream control
        log_viewer.insert(KeyBinding::new(KeyCode::Char(' ')), Action::TogglePause);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('p')), Action::TogglePause);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('c')), Action::ClearDisplay);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('r')), Action::Resume);
        log_viewer.insert(KeyBinding::shift(KeyCode::Char('R')), Action::Retry);
        log_viewer.insert(KeyBinding::ctrl(KeyCode::Char('r')), Action::Reload);
        // Filters
        log_viewer.insert(KeyBinding::new(KeyCode::Char('/')), Action::OpenSearch);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('n')), Action::ClearFilter);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('l')), Action::CycleLevel);
        // Dates
        log_viewer.insert(KeyBinding::new(KeyCode::Char('[')), Action::PreviousDay);
        log_viewer.insert(KeyBinding::new(KeyCode::Char(']')), Action::NextDay);
        log_viewer.insert(KeyBinding::shift(KeyCode::Char('T')), Action::Today);
        // Display and admin
        log_viewer.insert(KeyBinding::new(KeyCode::Char('t')), Action::ToggleTimestamps);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('s')), Action::ToggleStats);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('e')), Action::ExportLogs);
        log_viewer.insert(KeyBinding::shift(KeyCode::Char('D')), Action::RequestDelete);
        bindings.insert(KeyContext::LogViewer, log_viewer);

        // Filter input bindings (when search bar is active)
        let mut filter_input = HashMap::new();
        filter_input.insert(KeyBinding::new(KeyCode::Enter), Action::ApplyFilter);
        filter_input.insert(KeyBinding::new(KeyCode::Esc), Action::CloseSearch);
        filter_input.insert(KeyBinding::new(KeyCode::Backspace), Action::SearchBackspace);
        filter_input.insert(KeyBinding::ctrl(KeyCode::Char('u')), Action::SearchClear);
        filter_input.insert(KeyBinding::ctrl(KeyCode::Char('c')), Action::CloseSearch);
        bindings.insert(KeyContext::FilterInput, filter_input);

        // Delete confirmation: anything but 'y' cancels
        let mut confirm = HashMap::new();
        confirm.insert(KeyBinding::new(KeyCode::Char('y')), Action::ConfirmDelete);
        confirm.insert(KeyBinding::shift(KeyCode::Char('Y')), Action::ConfirmDelete);
        bindings.insert(KeyContext::ConfirmDelete, confirm);

        Self { bindings }
    }

    /// Look up action for key event in given context
    pub fn get_action(&self, context: KeyContext, key: &KeyEvent) -> Option<Action> {
        let binding = KeyBinding::from_event(key);

        // First check context-specific bindings
        if let Some(action) = self
            .bindings
            .get(&context)
            .and_then(|context_bindings| context_bindings.get(&binding))
        {
            return Some(action.clone());
        }

        // Fall back to global bindings
        self.bindings
            .get(&KeyContext::Global)?
            .get(&binding)
            .cloned()
    }

    /// Handle key event in filter input mode
    /// Returns Some(Action) for special keys, None for regular character input
    pub fn get_filter_input_action(&self, key: &KeyEvent) -> Option<Action> {
        let binding = KeyBinding::from_event(key);

        if let Some(action) = self
            .bindings
            .get(&KeyContext::FilterInput)
            .and_then(|filter_bindings| filter_bindings.get(&binding))
        {
            return Some(action.clone());
        }

        // For regular characters, return SearchInput action
        if let KeyCode::Char(c) = key.code
            && (key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT)
        {
            return Some(Action::SearchInput(c));
        }

        None
    }

    /// Handle key event while the delete prompt is showing
    pub fn get_confirm_action(&self, key: &KeyEvent) -> Action {
        let binding = KeyBinding::from_event(key);
        self.bindings
            .get(&KeyContext::ConfirmDelete)
            .and_then(|confirm| confirm.get(&binding))
            .cloned()
            .unwrap_or(Action::CancelDelete)
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_viewer_bindings() {
        let bindings = KeyBindings::new();
        assert_eq!(
            bindings.get_action(KeyContext::LogViewer, &key(KeyCode::Char(' '))),
            Some(Action::TogglePause)
        );
        assert_eq!(
            bindings.get_action(KeyContext::LogViewer, &key(KeyCode::End)),
            Some(Action::ScrollToOldest)
        );
    }

    #[test]
    fn test_global_fallback() {
        let bindings = KeyBindings::new();
        assert_eq!(
            bindings.get_action(KeyContext::LogViewer, &key(KeyCode::Char('q'))),
            Some(Action::Quit)
        );
        assert_eq!(bindings.get_action(KeyContext::LogViewer, &key(KeyCode::Char('z'))), None);
    }

    #[test]
    fn test_filter_input_passes_characters() {
        let bindings = KeyBindings::new();
        assert_eq!(
            bindings.get_filter_input_action(&key(KeyCode::Char('q'))),
            Some(Action::SearchInput('q'))
        );
        assert_eq!(
            bindings.get_filter_input_action(&key(KeyCode::Enter)),
            Some(Action::ApplyFilter)
        );
    }

    #[test]
    fn test_confirm_defaults_to_cancel() {
        let bindings = KeyBindings::new();
        assert_eq!(bindings.get_confirm_action(&key(KeyCode::Char('y'))), Action::ConfirmDelete);
        assert_eq!(bindings.get_confirm_action(&key(KeyCode::Char('n'))), Action::CancelDelete);
        assert_eq!(bindings.get_confirm_action(&key(KeyCode::Enter)), Action::CancelDelete);
    }
}
