//! Menu item data and the table tracking native menu entries.

pub mod item;
pub mod table;

pub use item::MenuItem;
pub use table::{MenuItemTable, Upserted};
