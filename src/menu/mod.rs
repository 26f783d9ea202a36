//! Interactive text menu.
//!
//! A [`MenuSystem`] is an ordered list of entries, each bound to a single
//! alphanumeric key. [`MenuSystem::run`] renders the menu, reads one line from a
//! [`Console`], and dispatches on the entry's [`MenuAction`]:
//!
//! - **`None`**: the key is returned to the caller.
//! - **`SubMenu`**: the nested menu runs; the parent returns its own key followed
//!   by the child's result (`"s"` then `"x"` yields `"sx"`).
//! - **`Callback`**: the callback runs; `true` returns the key, `false` redraws
//!   the menu and prompts again.
//!
//! Lines that are not exactly one character, or name no entry, print
//! `invalid menu entry` on the error stream and the loop starts over. Only
//! exhausted or interrupted input ends `run` without a key.
//!
//! ## Example
//!
//! ```no_run
//! use andor_menu::console::{Console, ScriptedInput};
//! use andor_menu::menu::{MenuAction, MenuSystem};
//!
//! let mut menu = MenuSystem::new("main menu", "$ ");
//! menu.add_entry("1", "view the current status", MenuAction::callback(|| false))?;
//! menu.add_separator();
//! menu.add_entry("q", "quit", MenuAction::None)?;
//!
//! let (console, _out, _err) = Console::scripted(ScriptedInput::new(["1", "q"]));
//! assert_eq!(menu.run(&console, None)?, "q");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod entry;
mod style;

pub use entry::{Callback, MenuAction, MenuEntry};
pub use style::{MenuStyle, DEFAULT_WIDTH};

use crate::console::Console;
use crate::error::{InputError, InvalidSelection, MenuError};
use tracing::debug;

/// Key substituted for a failed sub-menu under [`SubMenuPolicy::Sentinel`].
pub const SUBMENU_SENTINEL: &str = "0";

/// What a parent menu returns when its sub-menu ends without a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SubMenuPolicy {
    /// Return the sub-menu's input error from the parent's `run`.
    #[default]
    Propagate,
    /// Return the parent key followed by [`SUBMENU_SENTINEL`].
    Sentinel,
}

/// An ordered, keyed text menu with its own dispatch loop.
#[derive(Debug)]
pub struct MenuSystem {
    title: String,
    prompt: String,
    style: MenuStyle,
    submenu_policy: SubMenuPolicy,
    entries: Vec<MenuEntry>,
}

impl MenuSystem {
    /// A menu with the default style and no entries.
    pub fn new(title: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::with_style(title, prompt, MenuStyle::default())
    }

    /// Build a menu with custom decoration; the label budget follows from `style`.
    pub fn with_style(
        title: impl Into<String>,
        prompt: impl Into<String>,
        style: MenuStyle,
    ) -> Self {
        Self {
            title: title.into(),
            prompt: prompt.into(),
            style,
            submenu_policy: SubMenuPolicy::default(),
            entries: Vec::new(),
        }
    }

    /// Choose what a failed sub-menu returns.
    pub fn with_submenu_policy(mut self, policy: SubMenuPolicy) -> Self {
        self.submenu_policy = policy;
        self
    }

    /// Text rendered above the entries.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Text shown before reading a selection.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Decoration used by [`MenuSystem::render`].
    pub fn style(&self) -> &MenuStyle {
        &self.style
    }

    /// Entries in insertion order, separators included.
    pub fn entries(&self) -> &[MenuEntry] {
        &self.entries
    }

    /// Longest label [`MenuSystem::add_entry`] accepts.
    pub fn max_label_len(&self) -> usize {
        self.style.max_label_len()
    }

    /// Register an entry.
    ///
    /// `key` must be a single ASCII letter or digit not already used in this
    /// menu, and `label` must fit the width budget. An empty key together with
    /// an empty label registers a separator, which is always accepted.
    pub fn add_entry(&mut self, key: &str, label: &str, action: MenuAction) -> Result<(), MenuError> {
        let entry = entry::validate(&self.entries, key, label, self.max_label_len(), action)?;
        self.entries.push(entry);
        Ok(())
    }

    /// Append a separator row.
    pub fn add_separator(&mut self) {
        self.entries.push(MenuEntry::separator());
    }

    /// The title followed by every entry, in insertion order.
    pub fn render(&self) -> String {
        let style = &self.style;
        let mut text = String::new();
        text.push_str(&self.title);
        text.push_str(&style.newline);
        for entry in &self.entries {
            text.push_str(&style.prefix);
            match entry.key() {
                None => text.push_str(&style.separator),
                Some(key) => {
                    text.push(key);
                    text.push_str(&style.postfix);
                    text.push_str(entry.label());
                }
            }
            text.push_str(&style.newline);
        }
        text
    }

    /// Run the menu loop until an entry ends it or input runs out.
    ///
    /// A `preset` answer is dispatched first, without rendering or prompting.
    /// It is consumed by the first iteration whatever the outcome.
    pub fn run(&mut self, console: &Console, preset: Option<&str>) -> Result<String, InputError> {
        let mut answer = preset.map(str::to_owned);
        loop {
            let line = match answer.take() {
                Some(line) => line,
                None => {
                    console.write_out(&self.render())?;
                    self.read_answer(console)?
                }
            };

            let key = match self.select(&line) {
                Ok(key) => key,
                Err(invalid) => {
                    debug!(%invalid, "Rejected menu input");
                    let nl = &self.style.newline;
                    console.write_err(&format!("invalid menu entry{nl}{nl}"))?;
                    continue;
                }
            };

            let policy = self.submenu_policy;
            let newline = self.style.newline.clone();
            let Some(entry) = self.entries.iter_mut().find(|e| e.key() == Some(key)) else {
                continue;
            };

            match &mut entry.action {
                MenuAction::None => {
                    debug!(%key, "Menu selection");
                    return Ok(key.to_string());
                }
                MenuAction::SubMenu(submenu) => {
                    console.write_out(&newline)?;
                    return match submenu.run(console, None) {
                        Ok(child) => Ok(format!("{key}{child}")),
                        Err(err) => match policy {
                            SubMenuPolicy::Propagate => Err(err),
                            SubMenuPolicy::Sentinel => {
                                debug!(%key, %err, "Sub-menu ended without a key");
                                Ok(format!("{key}{SUBMENU_SENTINEL}"))
                            }
                        },
                    };
                }
                MenuAction::Callback(callback) => {
                    if callback() {
                        debug!(%key, "Callback ended the menu");
                        return Ok(key.to_string());
                    }
                    debug!(%key, "Callback asked to continue");
                }
            }
        }
    }

    fn read_answer(&self, console: &Console) -> Result<String, InputError> {
        let nl = &self.style.newline;
        match console.prompt(&self.prompt) {
            Ok(line) => Ok(line),
            Err(InputError::Exhausted) => {
                console.write_err(&format!("you pressed ^D{nl}"))?;
                Err(InputError::Exhausted)
            }
            Err(InputError::Interrupted) => {
                console.write_err(&format!("you pressed ^C{nl}"))?;
                Err(InputError::Interrupted)
            }
            Err(err) => Err(err),
        }
    }

    /// Resolve one line of input to a registered key.
    pub fn select(&self, line: &str) -> Result<char, InvalidSelection> {
        let mut chars = line.chars();
        let key = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => return Err(InvalidSelection::WrongLength(line.chars().count())),
        };
        if self.entries.iter().any(|entry| entry.key() == Some(key)) {
            Ok(key)
        } else {
            Err(InvalidSelection::UnknownKey(key))
        }
    }
}
