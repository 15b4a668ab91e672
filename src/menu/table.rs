//! Menu item table.
//!
//! Keeps the ordered mapping from caller-assigned menu ids to native menu entries.
//! The table only grows: entries are appended on first sight of an id and updated
//! in place afterwards, so an entry's position in the table is also its position in
//! the native menu.

use crate::error::TrayError;
use crate::menu::item::MenuItem;
use crate::platform::Backend;
use tracing::debug;

struct Entry<H> {
    item: MenuItem,
    native: H,
}

/// Outcome of [`MenuItemTable::upsert`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Upserted {
    Inserted,
    Updated,
}

/// Ordered `menu_id -> native item` table, owned by the event loop.
pub struct MenuItemTable<H> {
    entries: Vec<Entry<H>>,
}

impl<H> Default for MenuItemTable<H> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H> MenuItemTable<H> {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Adds `item` to the native menu, or updates the entry already tracked for its id.
    ///
    /// On a native failure the table keeps its previous contents.
    pub fn upsert<B>(&mut self, item: MenuItem, backend: &mut B) -> Result<Upserted, TrayError>
    where
        B: Backend<Item = H>,
    {
        let outcome = match self.position_of(item.menu_id) {
            Some(pos) => {
                let entry = &mut self.entries[pos];
                backend.update_item(&mut entry.native, &item)?;
                entry.item = item;
                Upserted::Updated
            }
            None => {
                let native = backend.append_item(&item)?;
                debug!(menu_id = item.menu_id, position = self.entries.len(), "menu item added");
                self.entries.push(Entry { item, native });
                Upserted::Inserted
            }
        };
        backend.show_menu();
        Ok(outcome)
    }

    /// Resolves a native menu position back to the caller-assigned id.
    pub fn lookup_id_by_position(&self, position: usize) -> Option<i32> {
        self.entries.get(position).map(|entry| entry.item.menu_id)
    }

    pub fn contains(&self, menu_id: i32) -> bool {
        self.position_of(menu_id).is_some()
    }

    pub fn get(&self, menu_id: i32) -> Option<&MenuItem> {
        self.position_of(menu_id).map(|pos| &self.entries[pos].item)
    }

    #[cfg(test)]
    pub fn native(&self, menu_id: i32) -> Option<&H> {
        self.position_of(menu_id).map(|pos| &self.entries[pos].native)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Items in menu order.
    pub fn iter(&self) -> impl Iterator<Item = &MenuItem> {
        self.entries.iter().map(|entry| &entry.item)
    }

    fn position_of(&self, menu_id: i32) -> Option<usize> {
        self.entries
            .iter()
            .position(|entry| entry.item.menu_id == menu_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingBackend};

    fn item(menu_id: i32, title: &str, disabled: bool, checked: bool) -> MenuItem {
        MenuItem {
            disabled,
            checked,
            ..MenuItem::new(menu_id, title)
        }
    }

    #[test]
    fn repeated_upserts_keep_one_entry_with_latest_values() {
        let (mut backend, log) = RecordingBackend::detached();
        let mut table = MenuItemTable::new();

        assert_eq!(
            table.upsert(item(7, "Open", false, false), &mut backend).unwrap(),
            Upserted::Inserted
        );
        let handle = *table.native(7).unwrap();
        assert_eq!(
            table.upsert(item(7, "Open now", true, false), &mut backend).unwrap(),
            Upserted::Updated
        );
        assert_eq!(
            table.upsert(item(7, "Opened", true, true), &mut backend).unwrap(),
            Upserted::Updated
        );

        assert_eq!(table.len(), 1);
        let current = table.get(7).unwrap();
        assert_eq!(current.title, "Opened");
        assert!(current.disabled);
        assert!(current.checked);
        assert_eq!(*table.native(7).unwrap(), handle);

        let appended = log
            .calls()
            .into_iter()
            .filter(|c| matches!(c, Call::Append { .. }))
            .count();
        assert_eq!(appended, 1);
    }

    #[test]
    fn new_ids_are_appended_in_order() {
        let (mut backend, _log) = RecordingBackend::detached();
        let mut table = MenuItemTable::new();
        for (id, title) in [(3, "c"), (1, "a"), (2, "b")] {
            table.upsert(MenuItem::new(id, title), &mut backend).unwrap();
        }
        table.upsert(MenuItem::new(1, "a2"), &mut backend).unwrap();

        let ids: Vec<i32> = table.iter().map(|i| i.menu_id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
        assert_eq!(table.lookup_id_by_position(0), Some(3));
        assert_eq!(table.lookup_id_by_position(2), Some(2));
        assert_eq!(table.lookup_id_by_position(3), None);
    }

    #[test]
    fn failed_append_leaves_table_unchanged() {
        let (mut backend, log) = RecordingBackend::detached();
        let mut table = MenuItemTable::new();
        table.upsert(MenuItem::new(1, "a"), &mut backend).unwrap();

        backend.fail_next_append();
        assert!(table.upsert(MenuItem::new(2, "b"), &mut backend).is_err());
        assert_eq!(table.len(), 1);
        assert!(!table.contains(2));
        assert_eq!(log.count(|c| matches!(c, Call::ShowMenu)), 1);
    }

    #[test]
    fn every_change_refreshes_the_menu() {
        let (mut backend, log) = RecordingBackend::detached();
        let mut table = MenuItemTable::new();
        table.upsert(MenuItem::new(1, "a"), &mut backend).unwrap();
        table.upsert(MenuItem::new(1, "b"), &mut backend).unwrap();
        assert_eq!(log.count(|c| matches!(c, Call::ShowMenu)), 2);
    }
}
