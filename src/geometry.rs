use crate::{Rect, MIN_WINDOW_SIZE};
use serde::{Deserialize, Serialize};

pub const DEFAULT_WIDTH: f64 = 1024.0;
pub const DEFAULT_HEIGHT: f64 = 750.0;

/// Offset applied per already-open window so new windows cascade.
pub const CASCADE_STEP: f64 = 10.0;

/// Bounds where any field may be missing: persisted state written by an
/// older build, or a user override that only pins some of the fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialBounds {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

impl From<Rect> for PartialBounds {
    fn from(rect: Rect) -> Self {
        Self {
            x: Some(rect.x),
            y: Some(rect.y),
            width: Some(rect.width),
            height: Some(rect.height),
        }
    }
}

/// Geometry handed to the host. A missing position means "let the host center it".
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WindowGeometry {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: f64,
    pub height: f64,
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self {
            x: None,
            y: None,
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
        }
    }
}

/// Works out where a new window goes.
///
/// Persisted sizes under the minimum fall back to the defaults field by field.
/// A persisted position is cascaded by `open_windows * CASCADE_STEP`. Configured
/// overrides then replace whichever fields they set. The final size is still
/// raised to `MIN_WINDOW_SIZE`.
pub fn resolve_bounds(
    persisted: Option<&PartialBounds>,
    overrides: Option<&PartialBounds>,
    open_windows: usize,
) -> WindowGeometry {
    let mut geometry = WindowGeometry::default();

    if let Some(persisted) = persisted {
        if let Some(width) = persisted.width.filter(|w| *w >= MIN_WINDOW_SIZE) {
            geometry.width = width;
        }
        if let Some(height) = persisted.height.filter(|h| *h >= MIN_WINDOW_SIZE) {
            geometry.height = height;
        }
        if let (Some(x), Some(y)) = (persisted.x, persisted.y) {
            let offset = open_windows as f64 * CASCADE_STEP;
            geometry.x = Some(x + offset);
            geometry.y = Some(y + offset);
        }
    }

    if let Some(overrides) = overrides {
        if overrides.x.is_some() {
            geometry.x = overrides.x;
        }
        if overrides.y.is_some() {
            geometry.y = overrides.y;
        }
        if let Some(width) = overrides.width {
            geometry.width = width;
        }
        if let Some(height) = overrides.height {
            geometry.height = height;
        }
    }

    geometry.width = geometry.width.max(MIN_WINDOW_SIZE);
    geometry.height = geometry.height.max(MIN_WINDOW_SIZE);
    geometry
}
