//! Godot integration.
//!
//! This module contains the Godot node that hosts the tray event loop and exposes
//! it to GDScript through the GDExtension API.

pub mod tray_icon;

pub use tray_icon::TrayIcon;
