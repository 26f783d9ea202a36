//! Menu entries and the actions bound to them.

use super::MenuSystem;
use crate::error::MenuError;
use std::fmt;

/// A zero-argument callback; `true` ends the menu loop, `false` redraws.
pub type Callback = Box<dyn FnMut() -> bool>;

/// What happens when an entry's key is selected.
#[derive(Default)]
pub enum MenuAction {
    /// Return the key to the caller.
    #[default]
    None,
    /// Run a nested menu and return the parent key followed by the child's result.
    SubMenu(MenuSystem),
    /// Run the callback; stop if it returns `true`, redraw otherwise.
    Callback(Callback),
}

impl MenuAction {
    /// Box `f` as a callback action.
    pub fn callback<F>(f: F) -> Self
    where
        F: FnMut() -> bool + 'static,
    {
        MenuAction::Callback(Box::new(f))
    }

    /// Nest `menu` under an entry.
    pub fn submenu(menu: MenuSystem) -> Self {
        MenuAction::SubMenu(menu)
    }
}

impl fmt::Debug for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuAction::None => f.write_str("None"),
            MenuAction::SubMenu(menu) => f.debug_tuple("SubMenu").field(&menu.title()).finish(),
            MenuAction::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

/// One row of a menu: a selectable entry or a separator.
#[derive(Debug)]
pub struct MenuEntry {
    /// `None` marks a separator.
    key: Option<char>,
    label: String,
    pub(super) action: MenuAction,
}

impl MenuEntry {
    pub(super) fn separator() -> Self {
        Self {
            key: None,
            label: String::new(),
            action: MenuAction::None,
        }
    }

    /// The selection key, `None` for a separator.
    pub fn key(&self) -> Option<char> {
        self.key
    }

    /// Text shown after the key.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// What selecting the entry does.
    pub fn action(&self) -> &MenuAction {
        &self.action
    }

    /// Whether this row is a separator.
    pub fn is_separator(&self) -> bool {
        self.key.is_none()
    }
}

/// Check a registration against the existing entries.
///
/// An empty key with an empty label yields a separator entry. Otherwise the
/// rules are applied in order and the first violation is reported.
pub(super) fn validate(
    existing: &[MenuEntry],
    key: &str,
    label: &str,
    max_label_len: usize,
    action: MenuAction,
) -> Result<MenuEntry, MenuError> {
    if key.is_empty() && label.is_empty() {
        return Ok(MenuEntry::separator());
    }

    let mut chars = key.chars();
    let key_char = match (chars.next(), chars.next()) {
        (Some(c), None) => c,
        _ => return Err(MenuError::KeyLength(key.to_string())),
    };

    let label_len = label.chars().count();
    if label_len > max_label_len {
        return Err(MenuError::LabelTooLong {
            len: label_len,
            max: max_label_len,
        });
    }

    if !key_char.is_ascii_alphanumeric() {
        return Err(MenuError::BadKey(key_char));
    }

    if existing.iter().any(|entry| entry.key == Some(key_char)) {
        return Err(MenuError::DuplicateKey(key_char));
    }

    Ok(MenuEntry {
        key: Some(key_char),
        label: label.to_string(),
        action,
    })
}
