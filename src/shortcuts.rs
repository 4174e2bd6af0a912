use crate::{Result, WindowId};
use log::{debug, info, warn};
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Accelerator {
    pub modifiers: Vec<ModifierKey>,
    pub key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModifierKey {
    Alt,
    Ctrl,
    Shift,
    Cmd,
    /// Cmd on macOS, Ctrl elsewhere.
    CmdOrCtrl,
}

impl ModifierKey {
    fn as_str(self) -> &'static str {
        match self {
            ModifierKey::Alt => "Alt",
            ModifierKey::Ctrl => "Ctrl",
            ModifierKey::Shift => "Shift",
            ModifierKey::Cmd => "Cmd",
            ModifierKey::CmdOrCtrl => "CmdOrCtrl",
        }
    }
}

impl Accelerator {
    pub fn parse(combo: &str) -> Option<Self> {
        let parts: Vec<&str> = combo.split('+').map(str::trim).collect();
        let key_str = parts.last().filter(|k| !k.is_empty())?;

        let mut modifiers = Vec::new();
        for part in &parts[..parts.len() - 1] {
            match part.to_lowercase().as_str() {
                "alt" | "option" => modifiers.push(ModifierKey::Alt),
                "ctrl" | "control" => modifiers.push(ModifierKey::Ctrl),
                "shift" => modifiers.push(ModifierKey::Shift),
                "cmd" | "command" | "super" => modifiers.push(ModifierKey::Cmd),
                "cmdorctrl" | "commandorcontrol" => modifiers.push(ModifierKey::CmdOrCtrl),
                _ => {
                    warn!("Unknown modifier key: {}", part);
                    return None;
                }
            }
        }

        Some(Self {
            modifiers,
            key: key_str.to_uppercase(),
        })
    }
}

impl fmt::Display for Accelerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for modifier in &self.modifiers {
            write!(f, "{}+", modifier.as_str())?;
        }
        f.write_str(&self.key)
    }
}

/// Methods the content exposes for the global shortcuts to call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DevMethod {
    Reload,
    ToggleElementInspector,
}

impl DevMethod {
    pub fn name(self) -> &'static str {
        match self {
            DevMethod::Reload => "reload",
            DevMethod::ToggleElementInspector => "toggleElementInspector",
        }
    }
}

pub const RELOAD_ACCELERATOR: &str = "CmdOrCtrl+R";
pub const INSPECT_ACCELERATOR: &str = "CmdOrCtrl+I";

/// Host side of process-wide shortcut registration.
pub trait ShortcutBackend: Send + Sync {
    fn register(&self, accelerator: &Accelerator) -> Result<()>;
    fn unregister_all(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutState {
    Unregistered,
    Registered(WindowId),
}

/// Owns the global reload/inspect shortcuts. Only one window holds them at a
/// time; the last `claim` wins.
pub struct ShortcutService {
    backend: Arc<dyn ShortcutBackend>,
    bindings: Vec<(Accelerator, DevMethod)>,
    state: ShortcutState,
}

impl ShortcutService {
    pub fn new(backend: Arc<dyn ShortcutBackend>) -> Self {
        let bindings = [
            (RELOAD_ACCELERATOR, DevMethod::Reload),
            (INSPECT_ACCELERATOR, DevMethod::ToggleElementInspector),
        ]
        .into_iter()
        .filter_map(|(combo, method)| Accelerator::parse(combo).map(|a| (a, method)))
        .collect();

        Self {
            backend,
            bindings,
            state: ShortcutState::Unregistered,
        }
    }

    pub fn state(&self) -> ShortcutState {
        self.state
    }

    pub fn owner(&self) -> Option<WindowId> {
        match self.state {
            ShortcutState::Registered(id) => Some(id),
            ShortcutState::Unregistered => None,
        }
    }

    /// Registers the shortcuts for `window`. Returns `false` when it already
    /// held them and nothing changed.
    pub fn claim(&mut self, window: WindowId) -> Result<bool> {
        if self.state == ShortcutState::Registered(window) {
            debug!("Shortcuts already held by window {}", window);
            return Ok(false);
        }

        self.backend.unregister_all();
        self.state = ShortcutState::Unregistered;

        for (accelerator, method) in &self.bindings {
            debug!("Registering {} -> {}", accelerator, method.name());
            if let Err(e) = self.backend.register(accelerator) {
                // Nothing may stay registered while the state is Unregistered.
                self.backend.unregister_all();
                return Err(e);
            }
        }
        self.state = ShortcutState::Registered(window);
        info!("Window {} claimed global shortcuts", window);
        Ok(true)
    }

    pub fn release(&mut self) {
        self.backend.unregister_all();
        if let ShortcutState::Registered(id) = self.state {
            debug!("Window {} released global shortcuts", id);
        }
        self.state = ShortcutState::Unregistered;
    }

    /// Resolves a pressed accelerator to the owning window and method.
    pub fn dispatch(&self, accelerator: &Accelerator) -> Option<(WindowId, DevMethod)> {
        let owner = self.owner()?;
        self.bindings
            .iter()
            .find(|(a, _)| a == accelerator)
            .map(|(_, method)| (owner, *method))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::HeadlessShortcuts;
    use anyhow::anyhow;
    use std::sync::Mutex;

    /// Backend that refuses one key, like an accelerator taken by another app.
    struct RejectingBackend {
        rejected_key: &'static str,
        active: Mutex<Vec<Accelerator>>,
    }

    impl ShortcutBackend for RejectingBackend {
        fn register(&self, accelerator: &Accelerator) -> Result<()> {
            if accelerator.key == self.rejected_key {
                return Err(anyhow!("{} is taken", accelerator));
            }
            self.active.lock().unwrap().push(accelerator.clone());
            Ok(())
        }

        fn unregister_all(&self) {
            self.active.lock().unwrap().clear();
        }
    }

    fn service() -> (ShortcutService, Arc<HeadlessShortcuts>) {
        let backend = Arc::new(HeadlessShortcuts::default());
        (ShortcutService::new(backend.clone()), backend)
    }

    #[test]
    fn parses_modifiers_case_insensitively() {
        let accel = Accelerator::parse("cmdorctrl+shift+r").unwrap();
        assert_eq!(accel.modifiers, vec![ModifierKey::CmdOrCtrl, ModifierKey::Shift]);
        assert_eq!(accel.key, "R");
        assert_eq!(accel.to_string(), "CmdOrCtrl+Shift+R");
    }

    #[test]
    fn rejects_unknown_modifier_and_empty_key() {
        assert!(Accelerator::parse("hyper+r").is_none());
        assert!(Accelerator::parse("ctrl+").is_none());
    }

    #[test]
    fn claim_registers_reload_and_inspect() {
        let (mut shortcuts, backend) = service();
        assert!(shortcuts.claim(WindowId(1)).unwrap());

        let active: Vec<String> = backend.active().iter().map(|a| a.to_string()).collect();
        assert_eq!(active, vec!["CmdOrCtrl+R", "CmdOrCtrl+I"]);
        assert_eq!(shortcuts.state(), ShortcutState::Registered(WindowId(1)));
    }

    #[test]
    fn repeated_claim_by_same_window_is_a_no_op() {
        let (mut shortcuts, backend) = service();
        shortcuts.claim(WindowId(1)).unwrap();
        assert!(!shortcuts.claim(WindowId(1)).unwrap());
        assert_eq!(backend.unregister_calls(), 1);
        assert_eq!(backend.active().len(), 2);
    }

    #[test]
    fn last_claim_wins_without_leaking_registrations() {
        let (mut shortcuts, backend) = service();
        shortcuts.claim(WindowId(1)).unwrap();
        shortcuts.claim(WindowId(2)).unwrap();

        assert_eq!(backend.active().len(), 2);
        assert_eq!(shortcuts.owner(), Some(WindowId(2)));

        let reload = Accelerator::parse(RELOAD_ACCELERATOR).unwrap();
        assert_eq!(
            shortcuts.dispatch(&reload),
            Some((WindowId(2), DevMethod::Reload))
        );
    }

    #[test]
    fn release_always_unregisters() {
        let (mut shortcuts, backend) = service();
        shortcuts.release();
        assert_eq!(backend.unregister_calls(), 1);

        shortcuts.claim(WindowId(3)).unwrap();
        shortcuts.release();
        assert!(backend.active().is_empty());
        assert_eq!(shortcuts.state(), ShortcutState::Unregistered);

        let inspect = Accelerator::parse(INSPECT_ACCELERATOR).unwrap();
        assert_eq!(shortcuts.dispatch(&inspect), None);
    }

    #[test]
    fn failed_claim_leaves_nothing_registered() {
        let backend = Arc::new(RejectingBackend {
            rejected_key: "I",
            active: Mutex::new(Vec::new()),
        });
        let mut shortcuts = ShortcutService::new(backend.clone());

        assert!(shortcuts.claim(WindowId(1)).is_err());
        assert_eq!(shortcuts.state(), ShortcutState::Unregistered);
        assert!(backend.active.lock().unwrap().is_empty());

        let reload = Accelerator::parse(RELOAD_ACCELERATOR).unwrap();
        assert_eq!(shortcuts.dispatch(&reload), None);
    }
}
