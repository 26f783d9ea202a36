//! Menu decoration strings and the terminal width budget.

/// Default terminal width a rendered entry line must fit in.
pub const DEFAULT_WIDTH: usize = 80;

/// How a menu decorates its lines.
///
/// An entry renders as `prefix + key + postfix + label + newline`; a separator
/// renders as `prefix + separator + newline`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuStyle {
    /// Line terminator
    pub newline: String,
    /// Printed before every row
    pub prefix: String,
    /// Printed between key and label
    pub postfix: String,
    /// Body of a separator row
    pub separator: String,
    /// Terminal width a row must fit in
    pub width: usize,
}

impl Default for MenuStyle {
    fn default() -> Self {
        Self {
            newline: "\n".to_string(),
            prefix: String::new(),
            postfix: ") ".to_string(),
            separator: String::new(),
            width: DEFAULT_WIDTH,
        }
    }
}

impl MenuStyle {
    /// Longest label that keeps an entry line within `width`.
    ///
    /// The fixed overhead is the prefix, the postfix, the one key character and
    /// the newline. With the default style this is `80 - (0 + 2 + 1 + 1) = 76`.
    pub fn max_label_len(&self) -> usize {
        let overhead = self.prefix.chars().count()
            + self.postfix.chars().count()
            + 1
            + self.newline.chars().count();
        self.width.saturating_sub(overhead)
    }

    /// Replace the row prefix.
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Replace the key/label separator.
    pub fn with_postfix(mut self, postfix: impl Into<String>) -> Self {
        self.postfix = postfix.into();
        self
    }

    /// Replace the separator row body.
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Replace the line terminator.
    pub fn with_newline(mut self, newline: impl Into<String>) -> Self {
        self.newline = newline.into();
        self
    }

    /// Replace the width budget.
    pub fn with_width(mut self, width: usize) -> Self {
        self.width = width;
        self
    }
}
