//! Menu item data.

/// A single entry of the tray popup menu.
///
/// Items are identified by a caller-assigned `menu_id`. Upserting the same id again
/// updates the existing entry instead of adding a new one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MenuItem {
    /// Caller-assigned identity, reported back on selection.
    pub menu_id: i32,
    /// Display text.
    pub title: String,
    /// Reserved. Stored with the item but not shown by any backend.
    pub tooltip: String,
    /// Whether the item is greyed out and cannot be selected.
    pub disabled: bool,
    /// Whether the item shows a check mark.
    pub checked: bool,
}

impl MenuItem {
    pub fn new(menu_id: i32, title: impl Into<String>) -> Self {
        Self {
            menu_id,
            title: title.into(),
            tooltip: String::new(),
            disabled: false,
            checked: false,
        }
    }

    /// Whether the item can be selected.
    pub fn enabled(&self) -> bool {
        !self.disabled
    }
}
