use crate::Result;
use log::{debug, info, warn};
use std::path::{Path, PathBuf};

/// External update checker.
pub trait Updater: Send + Sync {
    fn auto_update(&self, icon_path: Option<&Path>) -> Result<()>;
}

/// Runs the update check at most once per process, for the first window only.
pub struct UpdateGate {
    icon_path: Option<PathBuf>,
    fired: bool,
}

impl UpdateGate {
    pub fn new(icon_path: Option<PathBuf>) -> Self {
        Self {
            icon_path,
            fired: false,
        }
    }

    pub fn has_fired(&self) -> bool {
        self.fired
    }

    /// Called on a window's first content load. Returns whether the check ran.
    pub fn on_first_load(&mut self, updater: &dyn Updater, first_window: bool, enabled: bool) -> bool {
        if self.fired || !first_window {
            return false;
        }
        if !enabled {
            debug!("Auto update disabled in config");
            return false;
        }

        self.fired = true;
        info!("Checking for updates");
        if let Err(e) = updater.auto_update(self.icon_path.as_deref()) {
            warn!("Update check failed: {}", e);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::RecordingUpdater;

    #[test]
    fn fires_once_for_first_window() {
        let updater = RecordingUpdater::default();
        let mut gate = UpdateGate::new(Some(PathBuf::from("/icons/app.png")));

        assert!(!gate.on_first_load(&updater, false, true));
        assert!(gate.on_first_load(&updater, true, true));
        assert!(!gate.on_first_load(&updater, true, true));

        assert_eq!(updater.calls(), vec![Some(PathBuf::from("/icons/app.png"))]);
    }

    #[test]
    fn disabled_config_never_fires() {
        let updater = RecordingUpdater::default();
        let mut gate = UpdateGate::new(None);

        assert!(!gate.on_first_load(&updater, true, false));
        assert!(!gate.has_fired());
        assert!(updater.calls().is_empty());
    }
}
