use crate::config::WindowConfig;
use crate::devtools::DevtoolsCustomizer;
use crate::geometry::resolve_bounds;
use crate::host::{DebuggerConfig, WindowHost, WindowOptions};
use crate::menu::{MenuItemPatch, MenuModel, OPEN_IN_EDITOR, STAY_IN_FRONT};
use crate::script::{ContentBridge, ContentHandle};
use crate::shortcuts::{Accelerator, ShortcutBackend, ShortcutService};
use crate::store::{self, StateStore};
use crate::updater::{UpdateGate, Updater};
use crate::{Result, WindowId};
use log::{debug, error, info, warn};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Duration;

/// Set by automated test runs; suppresses opening devtools on new windows.
pub const E2E_TEST_ENV: &str = "E2E_TEST";

#[derive(Debug)]
pub enum WindowEvent {
    ContentLoaded {
        window: WindowId,
        content: Option<ContentHandle>,
    },
    Shown(WindowId),
    Focused(WindowId),
    Restored(WindowId),
    Hidden(WindowId),
    Blurred(WindowId),
    Minimized(WindowId),
    CloseRequested(WindowId),
    DevtoolsOpened(WindowId),
    ShortcutPressed(Accelerator),
}

#[derive(Debug)]
pub enum Command {
    CreateWindow { port: Option<u16> },
    ToggleStayInFront,
    SetOpenInEditor(bool),
    ListWindows,
    Quit,
}

#[derive(Debug, Clone)]
pub struct ManagerSettings {
    pub config_path: PathBuf,
    pub icon_path: Option<PathBuf>,
    pub open_devtools: bool,
    pub welcome_delay: Duration,
}

impl ManagerSettings {
    pub fn new(config_path: PathBuf) -> Self {
        Self {
            config_path,
            icon_path: None,
            open_devtools: true,
            welcome_delay: crate::devtools::WELCOME_MESSAGE_DELAY,
        }
    }

    pub fn from_env(config_path: PathBuf) -> Self {
        Self::with_e2e_flag(config_path, std::env::var_os(E2E_TEST_ENV).is_some())
    }

    /// Settings for an automated run (`e2e`) or an interactive one.
    pub fn with_e2e_flag(config_path: PathBuf, e2e: bool) -> Self {
        let mut settings = Self::new(config_path);
        settings.open_devtools = !e2e;
        settings
    }
}

/// External pieces the manager sequences calls into.
pub struct Collaborators {
    pub host: Arc<dyn WindowHost>,
    pub shortcuts: Arc<dyn ShortcutBackend>,
    pub store: Box<dyn StateStore>,
    pub updater: Arc<dyn Updater>,
}

struct ManagedWindow {
    config: WindowConfig,
    first: bool,
    loaded: bool,
    /// Devtools opened before the first content load; customized once it arrives.
    devtools_pending: bool,
    bridge: Option<Arc<ContentBridge>>,
}

pub struct WindowManager {
    settings: ManagerSettings,
    windows: BTreeMap<WindowId, ManagedWindow>,

    host: Arc<dyn WindowHost>,
    store: Box<dyn StateStore>,
    updater: Arc<dyn Updater>,
    shortcuts: ShortcutService,
    menu: MenuModel,
    update_gate: UpdateGate,
    devtools: DevtoolsCustomizer,

    event_rx: mpsc::Receiver<WindowEvent>,
    event_tx: mpsc::Sender<WindowEvent>,
    command_rx: mpsc::Receiver<Command>,
    command_tx: mpsc::Sender<Command>,
}

impl WindowManager {
    pub fn new(settings: ManagerSettings, collaborators: Collaborators) -> Self {
        let (event_tx, event_rx) = mpsc::channel(1000);
        let (command_tx, command_rx) = mpsc::channel(100);

        Self {
            update_gate: UpdateGate::new(settings.icon_path.clone()),
            devtools: DevtoolsCustomizer::new(settings.welcome_delay),
            settings,
            windows: BTreeMap::new(),
            host: collaborators.host,
            store: collaborators.store,
            updater: collaborators.updater,
            shortcuts: ShortcutService::new(collaborators.shortcuts),
            menu: MenuModel::default(),
            event_rx,
            event_tx,
            command_rx,
            command_tx,
        }
    }

    /// Channel the host uses to report window lifecycle events.
    pub fn event_sender(&self) -> mpsc::Sender<WindowEvent> {
        self.event_tx.clone()
    }

    pub fn command_sender(&self) -> mpsc::Sender<Command> {
        self.command_tx.clone()
    }

    pub fn window_ids(&self) -> Vec<WindowId> {
        self.windows.keys().copied().collect()
    }

    pub fn shortcut_owner(&self) -> Option<WindowId> {
        self.shortcuts.owner()
    }

    pub fn menu(&self) -> &MenuModel {
        &self.menu
    }

    pub fn update_checked(&self) -> bool {
        self.update_gate.has_fired()
    }

    pub async fn run(&mut self) -> Result<()> {
        info!("Starting window manager event loop");

        if let Err(e) = self.host.set_application_menu(&self.menu) {
            warn!("Failed to install application menu: {}", e);
        }

        loop {
            tokio::select! {
                Some(event) = self.event_rx.recv() => {
                    if let Err(e) = self.handle_window_event(event).await {
                        error!("Error handling window event: {}", e);
                    }
                }
                Some(command) = self.command_rx.recv() => {
                    if let Command::Quit = command {
                        info!("Shutting down window manager");
                        break;
                    }
                    if let Err(e) = self.handle_command(command).await {
                        error!("Error handling command: {}", e);
                    }
                }
                else => break,
            }
        }

        Ok(())
    }

    /// Opens a new window. A broken config is reported once through a dialog
    /// and the window is created with defaults anyway.
    pub async fn create_window(&mut self, port: Option<u16>) -> Result<WindowId> {
        let loaded = WindowConfig::load_or_default(&self.settings.config_path);
        if let Some(err) = &loaded.broken {
            self.host.show_error_dialog(
                "Root config error",
                &format!(
                    "Parse config {} failed, falling back to defaults:\n{}",
                    err.path().display(),
                    err.raw_message()
                ),
            );
        }
        let config = loaded.config;

        let open_windows = self.windows.len();
        let persisted = store::load_bounds(&*self.store);
        let geometry = resolve_bounds(
            persisted.as_ref(),
            config.window_bounds.as_ref(),
            open_windows,
        );

        let mut options = WindowOptions::new(geometry, DebuggerConfig::new(&config, port));
        options.icon_path = self.settings.icon_path.clone();
        let id = self.host.create_window(&options)?;
        info!(
            "Created window {} ({}x{}, {} already open)",
            id, geometry.width, geometry.height, open_windows
        );

        self.windows.insert(
            id,
            ManagedWindow {
                config,
                first: open_windows == 0,
                loaded: false,
                devtools_pending: false,
                bridge: None,
            },
        );

        if self.settings.open_devtools {
            if let Err(e) = self.host.open_devtools(id) {
                warn!("Failed to open devtools for {}: {}", id, e);
            }
        }

        Ok(id)
    }

    pub async fn handle_window_event(&mut self, event: WindowEvent) -> Result<()> {
        debug!("Handling window event: {:?}", event);

        match event {
            WindowEvent::ContentLoaded { window, content } => {
                self.handle_content_loaded(window, content)?;
            }
            WindowEvent::Shown(id) | WindowEvent::Focused(id) | WindowEvent::Restored(id) => {
                if !self.windows.contains_key(&id) {
                    debug!("Ignoring focus for unmanaged window {}", id);
                    return Ok(());
                }
                if self.shortcuts.claim(id)? {
                    self.sync_menu(id)?;
                }
            }
            WindowEvent::Hidden(_) | WindowEvent::Blurred(_) | WindowEvent::Minimized(_) => {
                self.shortcuts.release();
            }
            WindowEvent::CloseRequested(id) => {
                self.close_window(id)?;
            }
            WindowEvent::DevtoolsOpened(id) => {
                let Some(window) = self.windows.get_mut(&id) else {
                    debug!("Devtools opened for unmanaged window {}", id);
                    return Ok(());
                };
                if window.loaded {
                    self.devtools.customize(
                        self.host.devtools(),
                        id,
                        window.bridge.clone(),
                        &window.config,
                    );
                } else {
                    debug!("Devtools for {} opened before content loaded", id);
                    window.devtools_pending = true;
                }
            }
            WindowEvent::ShortcutPressed(accelerator) => {
                match self.shortcuts.dispatch(&accelerator) {
                    Some((id, method)) => {
                        debug!("{} -> {} on window {}", accelerator, method.name(), id);
                        if let Some(bridge) = self.windows.get(&id).and_then(|w| w.bridge.as_ref()) {
                            bridge.invoke_dev_method(method);
                        }
                    }
                    None => debug!("No owner for shortcut {}", accelerator),
                }
            }
        }

        Ok(())
    }

    pub async fn handle_command(&mut self, command: Command) -> Result<()> {
        debug!("Handling command: {:?}", command);

        match command {
            Command::CreateWindow { port } => {
                self.create_window(port).await?;
            }
            Command::ToggleStayInFront => {
                let Some(id) = self.shortcuts.owner() else {
                    debug!("No focused window to keep in front");
                    return Ok(());
                };
                let on_top = !self.host.is_always_on_top(id)?;
                self.host.set_always_on_top(id, on_top)?;
                self.menu.patch(STAY_IN_FRONT, &MenuItemPatch::checked(on_top));
                self.host.set_application_menu(&self.menu)?;
                info!("Window {} stay in front: {}", id, on_top);
            }
            Command::SetOpenInEditor(enabled) => {
                let Some(id) = self.shortcuts.owner() else {
                    debug!("No focused window for open-in-editor");
                    return Ok(());
                };
                let applied = self
                    .windows
                    .get(&id)
                    .and_then(|w| w.bridge.as_ref())
                    .and_then(|b| b.set_open_in_editor_enabled(enabled))
                    .is_some();
                if applied {
                    self.menu.patch(OPEN_IN_EDITOR, &MenuItemPatch::checked(enabled));
                    self.host.set_application_menu(&self.menu)?;
                }
            }
            Command::ListWindows => {
                for (id, window) in &self.windows {
                    info!(
                        "Window {}: loaded={} content_hooks={}",
                        id,
                        window.loaded,
                        window.bridge.is_some()
                    );
                }
            }
            Command::Quit => {
                info!("Quit is handled by the event loop");
            }
        }

        Ok(())
    }

    fn handle_content_loaded(&mut self, id: WindowId, content: Option<ContentHandle>) -> Result<()> {
        let Some(window) = self.windows.get_mut(&id) else {
            debug!("Content loaded in unmanaged window {}", id);
            return Ok(());
        };

        window.bridge = content.map(|handle| Arc::new(ContentBridge::new(handle.0)));

        if window.devtools_pending {
            window.devtools_pending = false;
            self.devtools.customize(
                self.host.devtools(),
                id,
                window.bridge.clone(),
                &window.config,
            );
        }

        let zoom = window
            .config
            .zoom_level
            .or_else(|| store::load_zoom_level(&*self.store));
        if let Some(level) = zoom {
            self.host.set_zoom_level(id, level)?;
        }

        if !window.loaded {
            window.loaded = true;
            self.update_gate.on_first_load(
                self.updater.as_ref(),
                window.first,
                window.config.auto_update,
            );
        }

        Ok(())
    }

    /// Re-applies the checkbox state that depends on the focused window.
    fn sync_menu(&mut self, id: WindowId) -> Result<()> {
        let on_top = self.host.is_always_on_top(id)?;
        let open_in_editor = self
            .windows
            .get(&id)
            .and_then(|w| w.bridge.as_ref())
            .and_then(|b| b.is_open_in_editor_enabled())
            .unwrap_or(false);

        self.menu.patch(STAY_IN_FRONT, &MenuItemPatch::checked(on_top));
        self.menu
            .patch(OPEN_IN_EDITOR, &MenuItemPatch::checked(open_in_editor));
        self.host.set_application_menu(&self.menu)
    }

    /// Close sequence: release shortcuts, persist bounds and zoom, run the
    /// content's pre-close hook, destroy. The window stays managed until the
    /// host has destroyed it, so a failed destroy can be retried.
    fn close_window(&mut self, id: WindowId) -> Result<()> {
        let Some(bridge) = self.windows.get(&id).map(|w| w.bridge.clone()) else {
            debug!("Close requested for unmanaged window {}", id);
            return Ok(());
        };

        self.shortcuts.release();

        // A host that cannot report the value is the one case where a write is
        // skipped; the previous value stays in the store.
        match self.host.bounds(id) {
            Ok(rect) => {
                if let Err(e) = store::save_bounds(&mut *self.store, rect) {
                    error!("Failed to persist bounds of {}: {}", id, e);
                }
            }
            Err(e) => warn!("Could not read bounds of {}: {}", id, e),
        }
        match self.host.zoom_level(id) {
            Ok(level) => {
                if let Err(e) = store::save_zoom_level(&mut *self.store, level) {
                    error!("Failed to persist zoom level of {}: {}", id, e);
                }
            }
            Err(e) => warn!("Could not read zoom level of {}: {}", id, e),
        }

        if let Some(bridge) = &bridge {
            bridge.before_window_close();
        }

        self.host.destroy(id)?;
        self.windows.remove(&id);
        info!("Closed window {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{HeadlessHost, HeadlessShortcuts, RecordingUpdater};
    use crate::store::MemoryStore;
    use tempfile::TempDir;

    fn manager() -> (WindowManager, Arc<HeadlessHost>, TempDir) {
        let temp = tempfile::tempdir().unwrap();
        let mut settings = ManagerSettings::new(temp.path().join("config.toml"));
        settings.open_devtools = false;
        let host = Arc::new(HeadlessHost::new());
        let wm = WindowManager::new(
            settings,
            Collaborators {
                host: host.clone(),
                shortcuts: Arc::new(HeadlessShortcuts::default()),
                store: Box::new(MemoryStore::new()),
                updater: Arc::new(RecordingUpdater::default()),
            },
        );
        (wm, host, temp)
    }

    #[test]
    fn e2e_flag_disables_devtools() {
        let automated = ManagerSettings::with_e2e_flag(PathBuf::from("c.toml"), true);
        assert!(!automated.open_devtools);
        assert_eq!(automated.config_path, PathBuf::from("c.toml"));

        let interactive = ManagerSettings::with_e2e_flag(PathBuf::from("c.toml"), false);
        assert!(interactive.open_devtools);
        assert_eq!(interactive.welcome_delay, crate::devtools::WELCOME_MESSAGE_DELAY);
    }

    #[tokio::test]
    async fn events_for_unknown_windows_are_ignored() {
        let (mut wm, host, _temp) = manager();
        wm.handle_window_event(WindowEvent::Focused(WindowId(42)))
            .await
            .unwrap();
        wm.handle_window_event(WindowEvent::CloseRequested(WindowId(42)))
            .await
            .unwrap();
        assert_eq!(wm.shortcut_owner(), None);
        assert!(host.calls().is_empty());
    }

    #[tokio::test]
    async fn stay_in_front_toggles_focused_window() {
        let (mut wm, host, _temp) = manager();
        let id = wm.create_window(None).await.unwrap();
        wm.handle_window_event(WindowEvent::Focused(id)).await.unwrap();

        wm.handle_command(Command::ToggleStayInFront).await.unwrap();
        assert!(host.is_always_on_top(id).unwrap());
        assert!(wm.menu().item(STAY_IN_FRONT).unwrap().checked);

        wm.handle_command(Command::ToggleStayInFront).await.unwrap();
        assert!(!host.is_always_on_top(id).unwrap());
        assert!(!wm.menu().item(STAY_IN_FRONT).unwrap().checked);
    }

    #[tokio::test]
    async fn run_processes_commands_until_quit() {
        let (mut wm, host, _temp) = manager();
        let commands = wm.command_sender();
        commands
            .send(Command::CreateWindow { port: Some(8081) })
            .await
            .unwrap();
        commands.send(Command::ListWindows).await.unwrap();
        commands.send(Command::Quit).await.unwrap();

        wm.run().await.unwrap();
        assert_eq!(host.open_windows().len(), 1);
    }
}
