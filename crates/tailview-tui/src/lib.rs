//! TUI components for tailview
//!
//! This crate provides the terminal user interface for tailview,
//! including state management, keybindings, event handling, and the log
//! viewer screen.

pub mod app;
pub mod config;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, UiState};
pub use config::{KeyBinding, KeyBindings, KeyContext};
pub use tui::{Event, EventHandler, Tui};
pub use ui::components::{HelpOverlay, StatusBar, viewer_hints};
pub use ui::screens::LogViewerScreen;
pub use ui::{Layout, Theme};
