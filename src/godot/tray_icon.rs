//! Godot TrayIcon node implementation.
//!
//! This module contains the `TrayIcon` Godot node. The node runs the tray event loop
//! on a dedicated thread and forwards its events to Godot signals from `process()`.

use crate::config::TrayConfig;
use crate::error::TrayError;
use crate::menu::MenuItem;
use crate::platform::NativeBackend;
use crate::tray::dispatcher::{Mailbox, TrayProxy, channel};
use crate::tray::event::TrayEvent;
use crate::tray::event_loop;
use godot::classes::{Image, ResourceLoader, Texture2D};
use godot::prelude::*;
use std::sync::mpsc::{Receiver, channel as event_channel};
use std::thread::{self, JoinHandle};

#[derive(GodotClass)]
#[class(base=Node)]
/// A Godot node that provides a system tray icon on Linux and Windows.
///
/// Calls made before `spawn_tray()` are queued and applied once the tray is up.
/// Menu items are identified by integer ids; adding an id twice updates the item.
///
/// # Signals
///
/// - `tray_ready()` - Emitted once the native tray icon has been created
/// - `menu_item_selected(id: int)` - Emitted when a menu item is clicked
///
/// # Example
///
/// ```gdscript
/// var tray = TrayIcon.new()
/// add_child(tray)
/// tray.set_icon_from_path("res://icon.png")
/// tray.upsert_menu_item(1, "Quit", "", false, false)
/// tray.menu_item_selected.connect(_on_menu_item_selected)
/// tray.spawn_tray()
/// ```
pub struct TrayIcon {
    base: Base<Node>,
    config: TrayConfig,
    proxy: TrayProxy,
    mailbox: Option<Mailbox>,
    event_receiver: Option<Receiver<TrayEvent>>,
    worker: Option<JoinHandle<Result<(), TrayError>>>,
}

#[godot_api]
impl INode for TrayIcon {
    fn init(base: Base<Node>) -> Self {
        let (proxy, mailbox) = channel();
        Self {
            base,
            config: TrayConfig::default()
                .with_id("godot_tray_icon")
                .with_env_overrides(),
            proxy,
            mailbox: Some(mailbox),
            event_receiver: None,
            worker: None,
        }
    }

    fn ready(&mut self) {
        self.base_mut().set_process(true);
    }

    fn process(&mut self, _delta: f64) {
        let mut events = Vec::new();
        if let Some(ref rx) = self.event_receiver {
            while let Ok(event) = rx.try_recv() {
                events.push(event);
            }
        }

        for event in events {
            match event {
                TrayEvent::Ready => {
                    self.base_mut().emit_signal("tray_ready", &[]);
                }
                TrayEvent::ItemSelected(id) => {
                    self.base_mut()
                        .emit_signal("menu_item_selected", &[Variant::from(id as i64)]);
                }
            }
        }

        if self.worker.as_ref().is_some_and(|w| w.is_finished()) {
            self.join_worker();
        }
    }

    fn exit_tree(&mut self) {
        if self.worker.is_some() {
            self.proxy.quit();
            self.join_worker();
        }
    }
}

#[godot_api]
impl TrayIcon {
    /// Signal emitted once the tray icon exists and accepts updates.
    #[signal]
    fn tray_ready();

    /// Signal emitted when a menu item is clicked.
    ///
    /// # Parameters
    ///
    /// - `id` - The id the menu item was added with
    #[signal]
    fn menu_item_selected(id: i64);

    /// Starts the tray event loop on its own thread.
    ///
    /// It should only be called once. Subsequent calls will be ignored and return false.
    ///
    /// # Returns
    ///
    /// Returns `true` if the event loop thread was started. Native setup failures are
    /// reported with `godot_error!` from the next `process()` call.
    #[func]
    fn spawn_tray(&mut self) -> bool {
        let Some(mailbox) = self.mailbox.take() else {
            godot_warn!("Tray already spawned");
            return false;
        };

        let (tx, rx) = event_channel();
        self.event_receiver = Some(rx);

        let config = self.config.clone();
        let spawned = thread::Builder::new()
            .name("systray-event-loop".to_string())
            .spawn(move || {
                event_loop::run::<NativeBackend, _>(&config, mailbox, move |event| {
                    let _ = tx.send(event);
                })
            });

        match spawned {
            Ok(worker) => {
                self.worker = Some(worker);
                true
            }
            Err(e) => {
                godot_error!("Failed to start tray thread: {}", e);
                false
            }
        }
    }

    /// Sets the identifier registered with the desktop. Only effective before `spawn_tray()`.
    ///
    /// # Parameters
    ///
    /// - `tray_id` - A unique identifier string (e.g., "com.example.myapp")
    #[func]
    fn set_tray_id(&mut self, tray_id: GString) {
        if self.mailbox.is_none() {
            godot_warn!("Tray id cannot change after spawn_tray()");
            return;
        }
        self.config.id = tray_id.to_string();
    }

    /// Sets the tray icon from a texture.
    ///
    /// The texture's image is encoded as PNG and handed to the tray.
    ///
    /// # Example (GDScript)
    /// ```gdscript
    /// var texture = load("res://icon.svg")
    /// tray_icon.set_icon_from_texture(texture)
    /// ```
    #[func]
    fn set_icon_from_texture(&mut self, texture: Gd<Texture2D>) -> bool {
        let Some(image) = texture.get_image() else {
            godot_error!("Failed to get image from texture");
            return false;
        };
        self.set_icon_from_image(image)
    }

    /// Sets the tray icon by loading a texture from a Godot resource path.
    ///
    /// Works with exported games because it uses `ResourceLoader`, which finds the
    /// imported texture rather than the source file.
    ///
    /// # Parameters
    /// * `path` - A Godot resource path (e.g., "res://icon.png")
    ///
    /// # Returns
    /// `true` if the icon was loaded and queued, `false` otherwise
    #[func]
    fn set_icon_from_path(&mut self, path: GString) -> bool {
        let Some(resource) = ResourceLoader::singleton().load(&path) else {
            godot_error!("Failed to load resource from path: {}", path);
            return false;
        };
        match resource.try_cast::<Texture2D>() {
            Ok(texture) => self.set_icon_from_texture(texture),
            Err(_) => {
                godot_error!("Resource is not a Texture2D: {}", path);
                false
            }
        }
    }

    /// Sets the tray icon from encoded image bytes (PNG, SVG or ICO).
    ///
    /// # Returns
    ///
    /// Returns `false` if `data` is empty.
    #[func]
    fn set_icon_from_data(&mut self, data: PackedByteArray) -> bool {
        if data.is_empty() {
            godot_error!("Invalid icon data size");
            return false;
        }
        self.proxy.set_icon_bytes(data.to_vec());
        true
    }

    /// Sets the title text displayed next to the tray icon, where supported.
    #[func]
    fn set_title(&mut self, title: GString) {
        self.proxy.set_title(title.to_string());
    }

    /// Sets the tooltip displayed when hovering over the tray icon.
    #[func]
    fn set_tooltip(&mut self, tooltip: GString) {
        self.proxy.set_tooltip(tooltip.to_string());
    }

    /// Adds a menu item, or updates the item previously added with the same id.
    ///
    /// Items are shown in the order their ids were first added.
    ///
    /// # Parameters
    ///
    /// - `id` - Identifier reported by `menu_item_selected`
    /// - `title` - Text displayed in the menu
    /// - `tooltip` - Reserved, currently not shown
    /// - `disabled` - Whether the item is greyed out
    /// - `checked` - Whether the item shows a check mark
    #[func]
    fn upsert_menu_item(
        &mut self,
        id: i64,
        title: GString,
        tooltip: GString,
        disabled: bool,
        checked: bool,
    ) -> bool {
        let Ok(menu_id) = i32::try_from(id) else {
            godot_error!("Menu item id out of range: {}", id);
            return false;
        };
        self.proxy.upsert_menu_item(MenuItem {
            menu_id,
            title: title.to_string(),
            tooltip: tooltip.to_string(),
            disabled,
            checked,
        });
        true
    }

    /// Removes the tray icon and stops the event loop.
    #[func]
    fn quit(&mut self) {
        self.proxy.quit();
    }
}

impl TrayIcon {
    fn set_icon_from_image(&mut self, mut image: Gd<Image>) -> bool {
        if image.is_compressed() && image.decompress() != godot::global::Error::OK {
            godot_error!("Failed to decompress icon image");
            return false;
        }
        let data = image.save_png_to_buffer();
        if data.is_empty() {
            godot_error!("Failed to encode icon image as PNG");
            return false;
        }
        self.proxy.set_icon_bytes(data.to_vec());
        true
    }

    fn join_worker(&mut self) {
        let Some(worker) = self.worker.take() else {
            return;
        };
        match worker.join() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => godot_error!("Tray event loop failed: {}", e),
            Err(_) => godot_error!("Tray event loop panicked"),
        }
    }
}
