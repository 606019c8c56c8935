//! Keyboard shortcut registry and documentation.

use crate::input::{Key, Modifiers};

/// Editor commands reachable from the keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorCommand {
    DeleteSelection,
    Undo,
    Redo,
    Save,
    Cancel,
    ResetZoom,
}

/// A keyboard shortcut definition.
#[derive(Debug, Clone)]
pub struct Shortcut {
    pub key: &'static str,
    /// Ctrl, or Cmd on macOS.
    pub ctrl: bool,
    pub shift: bool,
    pub description: &'static str,
    pub command: EditorCommand,
}

impl Shortcut {
    pub const fn new(
        key: &'static str,
        ctrl: bool,
        shift: bool,
        description: &'static str,
        command: EditorCommand,
    ) -> Self {
        Self {
            key,
            ctrl,
            shift,
            description,
            command,
        }
    }

    /// Format the shortcut for display (e.g., "Ctrl+S").
    pub fn format(&self) -> String {
        let mut parts = Vec::new();
        if self.ctrl {
            parts.push("Ctrl");
        }
        if self.shift {
            parts.push("Shift");
        }
        parts.push(self.key);
        parts.join("+")
    }

    fn matches(&self, key: &Key, modifiers: Modifiers) -> bool {
        if self.ctrl != modifiers.command() || self.shift != modifiers.shift {
            return false;
        }
        match key {
            Key::Delete => self.key == "Delete",
            Key::Backspace => self.key == "Backspace",
            Key::Escape => self.key == "Escape",
            Key::Enter => self.key == "Enter",
            Key::Char(c) => {
                let mut chars = self.key.chars();
                matches!((chars.next(), chars.next()), (Some(k), None) if k.eq_ignore_ascii_case(c))
            }
        }
    }
}

static SHORTCUTS: [Shortcut; 8] = [
    Shortcut::new("Delete", false, false, "Delete the selected node or connection", EditorCommand::DeleteSelection),
    Shortcut::new("Backspace", false, false, "Delete the selected node or connection", EditorCommand::DeleteSelection),
    Shortcut::new("Z", true, false, "Undo", EditorCommand::Undo),
    Shortcut::new("Z", true, true, "Redo", EditorCommand::Redo),
    Shortcut::new("Y", true, false, "Redo", EditorCommand::Redo),
    Shortcut::new("S", true, false, "Save", EditorCommand::Save),
    Shortcut::new("0", true, false, "Reset zoom to 100%", EditorCommand::ResetZoom),
    Shortcut::new("Escape", false, false, "Cancel current action and clear selection", EditorCommand::Cancel),
];

/// Registry of all keyboard shortcuts.
pub struct ShortcutRegistry;

impl ShortcutRegistry {
    /// Get all registered shortcuts.
    pub fn all() -> &'static [Shortcut] {
        &SHORTCUTS
    }

    /// Command bound to a key press, if any.
    pub fn resolve(key: &Key, modifiers: Modifiers) -> Option<EditorCommand> {
        // Escape cancels whatever else is held.
        if *key == Key::Escape {
            return Some(EditorCommand::Cancel);
        }
        SHORTCUTS
            .iter()
            .find(|shortcut| shortcut.matches(key, modifiers))
            .map(|shortcut| shortcut.command)
    }

    /// Render the shortcut table.
    pub fn describe() -> String {
        let mut out = String::from("=== Keyboard Shortcuts ===\n");
        for shortcut in Self::all() {
            out.push_str(&format!("  {:20} {}\n", shortcut.format(), shortcut.description));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctrl() -> Modifiers {
        Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        }
    }

    #[test]
    fn test_resolve_bindings() {
        assert_eq!(ShortcutRegistry::resolve(&Key::Char('z'), ctrl()), Some(EditorCommand::Undo));
        let shift = Modifiers { shift: true, ..ctrl() };
        assert_eq!(ShortcutRegistry::resolve(&Key::Char('Z'), shift), Some(EditorCommand::Redo));
        assert_eq!(ShortcutRegistry::resolve(&Key::Char('y'), ctrl()), Some(EditorCommand::Redo));
        assert_eq!(ShortcutRegistry::resolve(&Key::Char('0'), ctrl()), Some(EditorCommand::ResetZoom));
        assert_eq!(
            ShortcutRegistry::resolve(&Key::Backspace, Modifiers::NONE),
            Some(EditorCommand::DeleteSelection)
        );
    }

    #[test]
    fn test_cmd_counts_as_ctrl() {
        let meta = Modifiers {
            meta: true,
            ..Modifiers::NONE
        };
        assert_eq!(ShortcutRegistry::resolve(&Key::Char('s'), meta), Some(EditorCommand::Save));
    }

    #[test]
    fn test_unbound_keys() {
        assert_eq!(ShortcutRegistry::resolve(&Key::Char('z'), Modifiers::NONE), None);
        assert_eq!(ShortcutRegistry::resolve(&Key::Enter, Modifiers::NONE), None);
    }

    #[test]
    fn test_format() {
        assert_eq!(SHORTCUTS[3].format(), "Ctrl+Shift+Z");
        assert!(ShortcutRegistry::describe().contains("Reset zoom"));
    }
}
