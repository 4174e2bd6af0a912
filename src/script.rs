//! Calls into the content loaded in a window.
//!
//! Content declares which hooks it implements when it loads. `ContentBridge`
//! only forwards calls for declared hooks and reports `None` for the rest, so
//! the window manager never has to guess which optional entry points exist.

use crate::shortcuts::DevMethod;
use crate::Result;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentHook {
    WindowInfo,
    OpenInEditorEnabled,
    SetOpenInEditor,
    DevMethod,
    WelcomeMessage,
    BeforeClose,
}

pub type HookSet = HashSet<ContentHook>;

/// Where the content's debug target lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugTarget {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowInfo {
    pub location: DebugTarget,
}

/// Entry points a window's content may implement. Only the methods whose hook
/// appears in `hooks()` are ever called.
pub trait ScriptContext: Send + Sync {
    fn hooks(&self) -> HookSet;

    fn window_info(&self) -> Result<WindowInfo>;
    fn is_open_in_editor_enabled(&self) -> Result<bool>;
    fn set_open_in_editor_enabled(&self, enabled: bool) -> Result<()>;
    fn invoke_dev_method(&self, method: DevMethod) -> Result<()>;
    fn log_welcome_message(&self) -> Result<()>;
    fn before_window_close(&self) -> Result<()>;
}

/// Content attached to a window, as delivered with its load event.
#[derive(Clone)]
pub struct ContentHandle(pub Arc<dyn ScriptContext>);

impl std::fmt::Debug for ContentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ContentHandle").field(&self.0.hooks()).finish()
    }
}

pub struct ContentBridge {
    context: Arc<dyn ScriptContext>,
    hooks: HookSet,
}

impl ContentBridge {
    pub fn new(context: Arc<dyn ScriptContext>) -> Self {
        let hooks = context.hooks();
        debug!("Content registered {} hooks", hooks.len());
        Self { context, hooks }
    }

    pub fn supports(&self, hook: ContentHook) -> bool {
        self.hooks.contains(&hook)
    }

    /// Runs `call` if `hook` was registered. Failures are logged and become `None`.
    fn call<T>(
        &self,
        hook: ContentHook,
        call: impl FnOnce(&dyn ScriptContext) -> Result<T>,
    ) -> Option<T> {
        if !self.supports(hook) {
            debug!("Content hook {:?} not registered, skipping", hook);
            return None;
        }
        match call(self.context.as_ref()) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Content hook {:?} failed: {}", hook, e);
                None
            }
        }
    }

    pub fn window_info(&self) -> Option<WindowInfo> {
        self.call(ContentHook::WindowInfo, |c| c.window_info())
    }

    pub fn is_open_in_editor_enabled(&self) -> Option<bool> {
        self.call(ContentHook::OpenInEditorEnabled, |c| {
            c.is_open_in_editor_enabled()
        })
    }

    pub fn set_open_in_editor_enabled(&self, enabled: bool) -> Option<()> {
        self.call(ContentHook::SetOpenInEditor, |c| {
            c.set_open_in_editor_enabled(enabled)
        })
    }

    pub fn invoke_dev_method(&self, method: DevMethod) -> Option<()> {
        self.call(ContentHook::DevMethod, |c| c.invoke_dev_method(method))
    }

    pub fn log_welcome_message(&self) -> Option<()> {
        self.call(ContentHook::WelcomeMessage, |c| c.log_welcome_message())
    }

    pub fn before_window_close(&self) -> Option<()> {
        self.call(ContentHook::BeforeClose, |c| c.before_window_close())
    }
}
