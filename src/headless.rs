//! In-memory stand-ins for the GUI runtime and content.
//!
//! Every collaborator here records what it was asked to do. The CLI's
//! `simulate` command drives the manager with them, and so do the tests.

use crate::devtools::DevtoolsPanel;
use crate::host::{WindowHost, WindowOptions};
use crate::menu::MenuModel;
use crate::script::{ContentHook, DebugTarget, HookSet, ScriptContext, WindowInfo};
use crate::shortcuts::{Accelerator, DevMethod, ShortcutBackend};
use crate::updater::Updater;
use crate::{Rect, Result, WindowId};
use anyhow::anyhow;
use log::{debug, info};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

const SCREEN_WIDTH: f64 = 1920.0;
const SCREEN_HEIGHT: f64 = 1080.0;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    Created(WindowId, WindowOptions),
    DevtoolsOpened(WindowId),
    ZoomSet(WindowId, f64),
    AlwaysOnTopSet(WindowId, bool),
    MenuApplied,
    Destroyed(WindowId),
    ErrorDialog { title: String, message: String },
    ConsoleDeepLinks(WindowId, DebugTarget),
    TabsRemoved(WindowId, Vec<String>),
    ExecutionContextSelected(WindowId, String),
}

#[derive(Debug, Clone)]
struct HeadlessWindow {
    bounds: Rect,
    zoom_level: f64,
    always_on_top: bool,
}

#[derive(Default)]
struct HostState {
    next_id: u32,
    windows: BTreeMap<WindowId, HeadlessWindow>,
    calls: Vec<HostCall>,
    menu: Option<MenuModel>,
    refuse_destroy: bool,
}

/// A window system with no screen. Windows without a position are centered
/// on a 1920x1080 display.
#[derive(Default)]
pub struct HeadlessHost {
    state: Mutex<HostState>,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<HostCall> {
        lock(&self.state).calls.clone()
    }

    pub fn open_windows(&self) -> Vec<WindowId> {
        lock(&self.state).windows.keys().copied().collect()
    }

    pub fn menu(&self) -> Option<MenuModel> {
        lock(&self.state).menu.clone()
    }

    pub fn error_dialogs(&self) -> usize {
        lock(&self.state)
            .calls
            .iter()
            .filter(|c| matches!(c, HostCall::ErrorDialog { .. }))
            .count()
    }

    pub fn created_options(&self, window: WindowId) -> Option<WindowOptions> {
        lock(&self.state).calls.iter().find_map(|c| match c {
            HostCall::Created(id, options) if *id == window => Some(options.clone()),
            _ => None,
        })
    }

    /// While set, `destroy` fails and leaves the window open.
    pub fn refuse_destroy(&self, refuse: bool) {
        lock(&self.state).refuse_destroy = refuse;
    }

    /// Simulates the user moving or resizing a window.
    pub fn move_window(&self, window: WindowId, bounds: Rect) -> Result<()> {
        let mut state = lock(&self.state);
        let entry = state
            .windows
            .get_mut(&window)
            .ok_or_else(|| anyhow!("Unknown window {}", window))?;
        entry.bounds = bounds;
        Ok(())
    }

    fn with_window<T>(
        &self,
        window: WindowId,
        f: impl FnOnce(&mut HeadlessWindow) -> T,
    ) -> Result<T> {
        let mut state = lock(&self.state);
        let entry = state
            .windows
            .get_mut(&window)
            .ok_or_else(|| anyhow!("Unknown window {}", window))?;
        Ok(f(entry))
    }

    fn record(&self, call: HostCall) {
        lock(&self.state).calls.push(call);
    }
}

impl WindowHost for HeadlessHost {
    fn create_window(&self, options: &WindowOptions) -> Result<WindowId> {
        let geometry = options.geometry;
        let width = geometry.width.max(options.min_width);
        let height = geometry.height.max(options.min_height);
        let bounds = Rect::new(
            geometry.x.unwrap_or((SCREEN_WIDTH - width) / 2.0),
            geometry.y.unwrap_or((SCREEN_HEIGHT - height) / 2.0),
            width,
            height,
        );

        let mut state = lock(&self.state);
        state.next_id += 1;
        let id = WindowId(state.next_id);
        state.windows.insert(
            id,
            HeadlessWindow {
                bounds,
                zoom_level: 0.0,
                always_on_top: false,
            },
        );
        state.calls.push(HostCall::Created(id, options.clone()));
        debug!("Headless window {} created at {:?}", id, bounds);
        Ok(id)
    }

    fn bounds(&self, window: WindowId) -> Result<Rect> {
        self.with_window(window, |w| w.bounds)
    }

    fn zoom_level(&self, window: WindowId) -> Result<f64> {
        self.with_window(window, |w| w.zoom_level)
    }

    fn set_zoom_level(&self, window: WindowId, level: f64) -> Result<()> {
        self.with_window(window, |w| w.zoom_level = level)?;
        self.record(HostCall::ZoomSet(window, level));
        Ok(())
    }

    fn is_always_on_top(&self, window: WindowId) -> Result<bool> {
        self.with_window(window, |w| w.always_on_top)
    }

    fn set_always_on_top(&self, window: WindowId, on_top: bool) -> Result<()> {
        self.with_window(window, |w| w.always_on_top = on_top)?;
        self.record(HostCall::AlwaysOnTopSet(window, on_top));
        Ok(())
    }

    fn open_devtools(&self, window: WindowId) -> Result<()> {
        self.with_window(window, |_| ())?;
        self.record(HostCall::DevtoolsOpened(window));
        Ok(())
    }

    fn destroy(&self, window: WindowId) -> Result<()> {
        let mut state = lock(&self.state);
        if state.refuse_destroy {
            return Err(anyhow!("Window {} refused to close", window));
        }
        state
            .windows
            .remove(&window)
            .ok_or_else(|| anyhow!("Unknown window {}", window))?;
        state.calls.push(HostCall::Destroyed(window));
        Ok(())
    }

    fn show_error_dialog(&self, title: &str, message: &str) {
        info!("[dialog] {}: {}", title, message);
        self.record(HostCall::ErrorDialog {
            title: title.to_string(),
            message: message.to_string(),
        });
    }

    fn set_application_menu(&self, menu: &MenuModel) -> Result<()> {
        let mut state = lock(&self.state);
        state.menu = Some(menu.clone());
        state.calls.push(HostCall::MenuApplied);
        Ok(())
    }

    fn devtools(&self) -> &dyn DevtoolsPanel {
        self
    }
}

impl DevtoolsPanel for HeadlessHost {
    fn enable_console_deep_links(&self, window: WindowId, target: &DebugTarget) -> Result<()> {
        self.record(HostCall::ConsoleDeepLinks(window, target.clone()));
        Ok(())
    }

    fn remove_tabs(&self, window: WindowId, tabs: &[String]) -> Result<()> {
        self.record(HostCall::TabsRemoved(window, tabs.to_vec()));
        Ok(())
    }

    fn select_execution_context(&self, window: WindowId, name: &str) -> Result<()> {
        self.record(HostCall::ExecutionContextSelected(window, name.to_string()));
        Ok(())
    }
}

/// Shortcut table that only tracks what is currently registered.
#[derive(Default)]
pub struct HeadlessShortcuts {
    active: Mutex<Vec<Accelerator>>,
    unregister_calls: AtomicUsize,
}

impl HeadlessShortcuts {
    pub fn active(&self) -> Vec<Accelerator> {
        lock(&self.active).clone()
    }

    pub fn unregister_calls(&self) -> usize {
        self.unregister_calls.load(Ordering::SeqCst)
    }
}

impl ShortcutBackend for HeadlessShortcuts {
    fn register(&self, accelerator: &Accelerator) -> Result<()> {
        let mut active = lock(&self.active);
        if active.contains(accelerator) {
            return Err(anyhow!("{} is already registered", accelerator));
        }
        active.push(accelerator.clone());
        Ok(())
    }

    fn unregister_all(&self) {
        lock(&self.active).clear();
        self.unregister_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentCall {
    WindowInfo,
    OpenInEditorEnabled,
    SetOpenInEditor(bool),
    DevMethod(DevMethod),
    WelcomeMessage,
    BeforeClose,
}

/// Content that implements a chosen set of hooks and records every call.
pub struct ScriptedContent {
    hooks: HookSet,
    failing: bool,
    open_in_editor: Mutex<bool>,
    calls: Mutex<Vec<ContentCall>>,
}

impl ScriptedContent {
    pub fn new<I: IntoIterator<Item = ContentHook>>(hooks: I) -> Self {
        Self {
            hooks: hooks.into_iter().collect(),
            failing: false,
            open_in_editor: Mutex::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn all_hooks() -> Self {
        Self::new([
            ContentHook::WindowInfo,
            ContentHook::OpenInEditorEnabled,
            ContentHook::SetOpenInEditor,
            ContentHook::DevMethod,
            ContentHook::WelcomeMessage,
            ContentHook::BeforeClose,
        ])
    }

    /// Every hook call returns an error after being recorded.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    pub fn with_open_in_editor(self, enabled: bool) -> Self {
        *lock(&self.open_in_editor) = enabled;
        self
    }

    pub fn default_target() -> DebugTarget {
        DebugTarget {
            host: "localhost".to_string(),
            port: 8081,
        }
    }

    pub fn calls(&self) -> Vec<ContentCall> {
        lock(&self.calls).clone()
    }

    fn record(&self, call: ContentCall) -> Result<()> {
        lock(&self.calls).push(call.clone());
        if self.failing {
            return Err(anyhow!("content rejected {:?}", call));
        }
        Ok(())
    }
}

impl ScriptContext for ScriptedContent {
    fn hooks(&self) -> HookSet {
        self.hooks.clone()
    }

    fn window_info(&self) -> Result<WindowInfo> {
        self.record(ContentCall::WindowInfo)?;
        Ok(WindowInfo {
            location: Self::default_target(),
        })
    }

    fn is_open_in_editor_enabled(&self) -> Result<bool> {
        self.record(ContentCall::OpenInEditorEnabled)?;
        Ok(*lock(&self.open_in_editor))
    }

    fn set_open_in_editor_enabled(&self, enabled: bool) -> Result<()> {
        self.record(ContentCall::SetOpenInEditor(enabled))?;
        *lock(&self.open_in_editor) = enabled;
        Ok(())
    }

    fn invoke_dev_method(&self, method: DevMethod) -> Result<()> {
        self.record(ContentCall::DevMethod(method))
    }

    fn log_welcome_message(&self) -> Result<()> {
        self.record(ContentCall::WelcomeMessage)
    }

    fn before_window_close(&self) -> Result<()> {
        self.record(ContentCall::BeforeClose)
    }
}

#[derive(Default)]
pub struct RecordingUpdater {
    calls: Mutex<Vec<Option<PathBuf>>>,
}

impl RecordingUpdater {
    pub fn calls(&self) -> Vec<Option<PathBuf>> {
        lock(&self.calls).clone()
    }
}

impl Updater for RecordingUpdater {
    fn auto_update(&self, icon_path: Option<&Path>) -> Result<()> {
        info!("Update check requested (icon: {:?})", icon_path);
        lock(&self.calls).push(icon_path.map(Path::to_path_buf));
        Ok(())
    }
}
