//! # systray-bridge
//!
//! A system tray icon (icon, tooltip, title and a popup menu of selectable items)
//! for Linux and Windows, usable from Rust, from C, and from Godot 4 as a
//! GDExtension node.
//!
//! ## Overview
//!
//! Native tray handles may only be used on the thread that created them. This crate
//! dedicates one thread to an event loop that owns those handles; every other thread
//! talks to it through a [`TrayProxy`], which queues each request as a task and wakes
//! the loop. The loop reports back through two events: [`TrayEvent::Ready`] and
//! [`TrayEvent::ItemSelected`].
//!
//! - **Linux** publishes a StatusNotifierItem via [ksni](https://crates.io/crates/ksni).
//! - **Windows** uses a hidden message window and a Shell notification icon.
//!
//! Menu items are keyed by a caller-assigned integer id. Adding an id that already
//! exists updates the item in place; items are never removed.
//!
//! ## Usage
//!
//! ### From Rust
//!
//! ```rust,no_run
//! use systray_bridge::{NativeBackend, TrayConfig, TrayEvent, channel, run};
//!
//! let (proxy, mailbox) = channel();
//! proxy.set_icon_path("/usr/share/icons/hicolor/48x48/apps/my-app.png");
//! proxy.set_tooltip("My Application");
//! proxy.add_or_update_menu_item(1, "Quit", "", false, false);
//!
//! let quit = proxy.clone();
//! run::<NativeBackend, _>(&TrayConfig::from_env(), mailbox, move |event| {
//!     if event == TrayEvent::ItemSelected(1) {
//!         quit.quit();
//!     }
//! })
//! .expect("tray failed");
//! ```
//!
//! ### From C
//!
//! Build the `cdylib` and call `systray_run(on_ready, on_menu_item_selected)` on a
//! thread dedicated to the tray. `systray_set_icon`, `systray_set_icon_path`,
//! `systray_set_title`, `systray_set_tooltip`, `systray_add_or_update_menu_item` and
//! `systray_quit` may be called from any thread.
//!
//! ### From Godot
//!
//! 1. Build the library with default features (includes the `gdextension` feature).
//!
//! 2. Create a `SystrayBridge.gdextension` file in your Godot project directory:
//!    ```gdextension
//!    [configuration]
//!    entry_symbol = "gdext_rust_init"
//!    compatibility_minimum = 4.5
//!    reloadable = true
//!
//!    [libraries]
//!    linux.debug.x86_64 = "res://../systray-bridge/target/debug/libsystray_bridge.so"
//!    windows.debug.x86_64 = "res://../systray-bridge/target/debug/systray_bridge.dll"
//!    ```
//!
//! 3. Use the `TrayIcon` node:
//!
//! ```gdscript
//! extends Node
//!
//! var tray_icon: TrayIcon
//!
//! func _ready():
//!     tray_icon = TrayIcon.new()
//!     add_child(tray_icon)
//!
//!     tray_icon.set_tray_id("my_app")
//!     tray_icon.set_icon_from_path("res://icon.png")
//!     tray_icon.upsert_menu_item(1, "Quit", "", false, false)
//!
//!     tray_icon.menu_item_selected.connect(_on_menu_item_selected)
//!     tray_icon.spawn_tray()
//!
//! func _on_menu_item_selected(id: int):
//!     if id == 1:
//!         get_tree().quit()
//! ```
//!
//! When embedding in another Rust GDExtension, depend on this crate with
//! `default-features = false` to avoid a duplicate `gdext_rust_init` symbol.

// Module declarations
pub mod config;
pub mod error;
pub mod ffi;
pub mod godot;
pub mod menu;
pub mod platform;
pub mod tray;

#[cfg(test)]
mod testing;

// Public re-exports
pub use config::TrayConfig;
pub use error::TrayError;
pub use crate::godot::TrayIcon;
pub use menu::{MenuItem, MenuItemTable};
pub use platform::{Backend, NativeBackend};
pub use tray::{IconSource, Mailbox, TrayEvent, TrayProxy, channel, run};

// Conditional GDExtension entry point
#[cfg(feature = "gdextension")]
mod gdextension {
    use godot::prelude::*;

    struct SystrayBridgeExtension;

    #[gdextension]
    unsafe impl ExtensionLibrary for SystrayBridgeExtension {}
}
