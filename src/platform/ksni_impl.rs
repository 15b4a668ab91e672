//! StatusNotifierItem backend built on ksni.
//!
//! ksni runs the D-Bus service on its own thread and calls back into [`KsniTray`]
//! from there. The event loop only mutates the tray through `Handle::update`, and
//! menu selections come back as [`NativeInput`] carrying the captured menu id.

use super::Backend;
use super::staging::{IconStaging, icon_suffix};
use crate::config::TrayConfig;
use crate::error::TrayError;
use crate::menu::MenuItem;
use crate::tray::dispatcher::{InputSender, NativeInput};
use crate::tray::registry::SessionSlot;
use crate::tray::task::IconSource;
use ksni::blocking::{Handle, TrayMethods};
use ksni::menu::{CheckmarkItem, StandardItem};
use std::io;
use std::path::Path;
use tracing::{debug, warn};

/// A menu entry as published over D-Bus.
#[derive(Clone, Debug, PartialEq, Eq)]
struct NativeItem {
    menu_id: i32,
    label: String,
    enabled: bool,
    checked: bool,
}

impl From<&MenuItem> for NativeItem {
    fn from(item: &MenuItem) -> Self {
        Self {
            menu_id: item.menu_id,
            label: item.title.clone(),
            enabled: item.enabled(),
            checked: item.checked,
        }
    }
}

impl NativeItem {
    fn build(&self, inputs: &InputSender) -> ksni::MenuItem<KsniTray> {
        let menu_id = self.menu_id;
        let inputs = inputs.clone();
        let activate = Box::new(move |_this: &mut KsniTray| {
            inputs.send(NativeInput::ItemSelected(menu_id));
        });
        if self.checked {
            CheckmarkItem {
                label: self.label.clone(),
                enabled: self.enabled,
                checked: true,
                activate,
                ..Default::default()
            }
            .into()
        } else {
            StandardItem {
                label: self.label.clone(),
                enabled: self.enabled,
                activate,
                ..Default::default()
            }
            .into()
        }
    }
}

/// Tray state served to the StatusNotifierWatcher.
pub struct KsniTray {
    id: String,
    title: String,
    tooltip: String,
    icon_name: String,
    icon_theme_path: String,
    visible: bool,
    items: Vec<NativeItem>,
    inputs: InputSender,
}

impl KsniTray {
    fn new(config: &TrayConfig, inputs: InputSender) -> Self {
        Self {
            id: config.id.clone(),
            title: config.title.clone(),
            tooltip: String::new(),
            icon_name: String::new(),
            icon_theme_path: String::new(),
            visible: true,
            items: Vec::new(),
            inputs,
        }
    }
}

impl ksni::Tray for KsniTray {
    fn id(&self) -> String {
        self.id.clone()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn status(&self) -> ksni::Status {
        if self.visible {
            ksni::Status::Active
        } else {
            ksni::Status::Passive
        }
    }

    fn icon_name(&self) -> String {
        self.icon_name.clone()
    }

    fn attention_icon_name(&self) -> String {
        self.icon_name.clone()
    }

    fn icon_theme_path(&self) -> String {
        self.icon_theme_path.clone()
    }

    fn tool_tip(&self) -> ksni::ToolTip {
        ksni::ToolTip {
            icon_name: String::new(),
            icon_pixmap: vec![],
            title: self.tooltip.clone(),
            description: String::new(),
        }
    }

    fn menu(&self) -> Vec<ksni::MenuItem<Self>> {
        self.items
            .iter()
            .map(|item| item.build(&self.inputs))
            .collect()
    }
}

/// Linux backend: one SNI item per process.
pub struct KsniBackend {
    handle: Handle<KsniTray>,
    staging: IconStaging,
    _slot: SessionSlot,
}

impl KsniBackend {
    fn update<R: Send>(
        &self,
        f: impl FnOnce(&mut KsniTray) -> R + Send,
    ) -> Result<R, TrayError> {
        self.handle.update(f).ok_or(TrayError::ServiceGone)
    }
}

impl Backend for KsniBackend {
    /// Index into the published item list.
    type Item = usize;

    fn initialize(config: &TrayConfig, inputs: InputSender) -> Result<Self, TrayError> {
        let slot = SessionSlot::claim()?;
        let handle = KsniTray::new(config, inputs)
            .spawn()
            .map_err(|e| TrayError::Spawn(e.to_string()))?;
        Ok(Self {
            handle,
            staging: IconStaging::new(config.icon_dir.as_deref()),
            _slot: slot,
        })
    }

    fn set_icon(&mut self, icon: IconSource) -> Result<(), TrayError> {
        let (theme_path, name) = resolve_icon(&mut self.staging, icon)?;
        debug!(theme_path = %theme_path, name = %name, "setting tray icon");
        self.update(move |tray| {
            tray.icon_theme_path = theme_path;
            tray.icon_name = name;
        })
    }

    fn set_title(&mut self, title: &str) -> Result<(), TrayError> {
        let title = title.to_string();
        self.update(move |tray| tray.title = title)
    }

    fn set_tooltip(&mut self, tooltip: &str) -> Result<(), TrayError> {
        let tooltip = tooltip.to_string();
        self.update(move |tray| tray.tooltip = tooltip)
    }

    fn append_item(&mut self, item: &MenuItem) -> Result<usize, TrayError> {
        let native = NativeItem::from(item);
        self.update(move |tray| {
            tray.items.push(native);
            tray.items.len() - 1
        })
    }

    fn update_item(&mut self, native: &mut usize, item: &MenuItem) -> Result<(), TrayError> {
        let index = *native;
        let replacement = NativeItem::from(item);
        let found = self.update(move |tray| match tray.items.get_mut(index) {
            Some(slot) => {
                *slot = replacement;
                true
            }
            None => false,
        })?;
        if found {
            Ok(())
        } else {
            Err(TrayError::Native {
                operation: "update menu item",
                source: io::Error::new(io::ErrorKind::NotFound, "stale menu item index"),
            })
        }
    }

    fn teardown(&mut self) {
        // SNI has no call to remove an item from the host; go passive so it is hidden.
        if let Err(error) = self.update(|tray| tray.visible = false) {
            warn!(%error, "failed to hide tray icon");
        }
        self.handle.shutdown().wait();
        self.staging.cleanup();
    }
}

/// Turns an icon into the theme directory and icon name ksni expects.
///
/// Bytes are staged to a file first. Relative paths are made absolute against the
/// working directory.
fn resolve_icon(
    staging: &mut IconStaging,
    icon: IconSource,
) -> Result<(String, String), TrayError> {
    let path = match icon {
        IconSource::Bytes(bytes) => staging
            .stage(&bytes, icon_suffix(&bytes))
            .map_err(|source| TrayError::Native {
                operation: "write temp icon file",
                source,
            })?,
        IconSource::Path(path) => path,
    };
    split_icon_path(&path)
}

fn split_icon_path(path: &Path) -> Result<(String, String), TrayError> {
    let invalid = || TrayError::Native {
        operation: "resolve icon path",
        source: io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("not an icon file path: {}", path.display()),
        ),
    };
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(invalid)?;
    let absolute = std::path::absolute(path).map_err(|source| TrayError::Native {
        operation: "resolve icon path",
        source,
    })?;
    let dir = absolute.parent().ok_or_else(invalid)?;
    Ok((dir.to_string_lossy().into_owned(), name.to_string()))
}
