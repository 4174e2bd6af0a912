use crate::config::WindowConfig;
use crate::devtools::DevtoolsPanel;
use crate::geometry::WindowGeometry;
use crate::menu::MenuModel;
use crate::{Rect, Result, WindowId, MIN_WINDOW_SIZE};
use serde::Serialize;
use std::path::PathBuf;

/// Settings the loaded content reads from its window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DebuggerConfig {
    pub port: Option<u16>,
    pub editor: Option<String>,
    pub font_family: String,
    pub devtools_theme: String,
    pub devtools_port: u16,
    pub network_inspect: bool,
    /// No packager port was requested, so the content has to ask for one.
    pub port_setting_required: bool,
    #[serde(rename = "timesJSLoadToRefreshDevTools")]
    pub times_js_load_to_refresh_devtools: i32,
}

impl DebuggerConfig {
    pub fn new(config: &WindowConfig, port: Option<u16>) -> Self {
        Self {
            port,
            editor: config.editor.clone(),
            font_family: config.font_family.clone(),
            devtools_theme: config.default_devtools_theme.clone(),
            devtools_port: config.default_devtools_port,
            network_inspect: config.default_network_inspect,
            port_setting_required: port.is_none(),
            times_js_load_to_refresh_devtools: config.times_js_load_to_refresh_devtools,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowOptions {
    pub title: String,
    pub geometry: WindowGeometry,
    pub min_width: f64,
    pub min_height: f64,
    pub icon_path: Option<PathBuf>,
    pub debugger_config: DebuggerConfig,
}

impl WindowOptions {
    pub fn new(geometry: WindowGeometry, debugger_config: DebuggerConfig) -> Self {
        Self {
            title: "Debugger".to_string(),
            geometry,
            min_width: MIN_WINDOW_SIZE,
            min_height: MIN_WINDOW_SIZE,
            icon_path: None,
            debugger_config,
        }
    }
}

/// The GUI runtime the manager drives. Lifecycle notifications flow back as
/// `WindowEvent`s on the manager's event channel.
pub trait WindowHost: Send + Sync {
    fn create_window(&self, options: &WindowOptions) -> Result<WindowId>;
    fn bounds(&self, window: WindowId) -> Result<Rect>;
    fn zoom_level(&self, window: WindowId) -> Result<f64>;
    fn set_zoom_level(&self, window: WindowId, level: f64) -> Result<()>;
    fn is_always_on_top(&self, window: WindowId) -> Result<bool>;
    fn set_always_on_top(&self, window: WindowId, on_top: bool) -> Result<()>;
    fn open_devtools(&self, window: WindowId) -> Result<()>;
    fn destroy(&self, window: WindowId) -> Result<()>;
    /// Blocks until the user dismisses it.
    fn show_error_dialog(&self, title: &str, message: &str);
    fn set_application_menu(&self, menu: &MenuModel) -> Result<()>;
    fn devtools(&self) -> &dyn DevtoolsPanel;
}
