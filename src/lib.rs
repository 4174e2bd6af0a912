pub mod config;
pub mod devtools;
pub mod geometry;
pub mod headless;
pub mod host;
pub mod menu;
pub mod script;
pub mod shortcuts;
pub mod store;
pub mod updater;
pub mod window_manager;

pub use config::WindowConfig;
pub use window_manager::{Command, ManagerSettings, WindowEvent, WindowManager};

pub type Result<T> = anyhow::Result<T>;

/// Windows are never laid out smaller than this in either dimension.
pub const MIN_WINDOW_SIZE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u32);

impl std::fmt::Display for WindowId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}
