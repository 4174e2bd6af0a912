use crate::config::WindowConfig;
use crate::script::{ContentBridge, DebugTarget};
use crate::{Result, WindowId};
use log::{debug, info, warn};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::{sleep, Duration};

/// No readiness signal exists for the devtools UI; wait this long before
/// writing the welcome message into it.
pub const WELCOME_MESSAGE_DELAY: Duration = Duration::from_secs(1);

pub const DEBUGGER_WORKER_CONTEXT: &str = "debugger-worker.js";

const NON_ESSENTIAL_TABS: &[&str] = &["elements", "security", "lighthouse"];

/// Host hooks into the embedded devtools UI of a window.
pub trait DevtoolsPanel: Send + Sync {
    fn enable_console_deep_links(&self, window: WindowId, target: &DebugTarget) -> Result<()>;
    fn remove_tabs(&self, window: WindowId, tabs: &[String]) -> Result<()>;
    fn select_execution_context(&self, window: WindowId, name: &str) -> Result<()>;
}

/// Tabs stripped from the devtools panel for this config. The network tab
/// only stays when network inspection is on.
pub fn hidden_tabs(config: &WindowConfig) -> Vec<String> {
    if config.show_all_devtools_tab {
        return Vec::new();
    }
    let mut tabs: Vec<String> = NON_ESSENTIAL_TABS.iter().map(|t| t.to_string()).collect();
    if !config.default_network_inspect {
        tabs.push("network".to_string());
    }
    tabs
}

pub struct DevtoolsCustomizer {
    welcome_delay: Duration,
}

impl Default for DevtoolsCustomizer {
    fn default() -> Self {
        Self::new(WELCOME_MESSAGE_DELAY)
    }
}

impl DevtoolsCustomizer {
    pub fn new(welcome_delay: Duration) -> Self {
        Self { welcome_delay }
    }

    /// Patches the freshly opened devtools of `window` and schedules the
    /// welcome message. Individual steps that fail are logged and skipped.
    pub fn customize(
        &self,
        panel: &dyn DevtoolsPanel,
        window: WindowId,
        bridge: Option<Arc<ContentBridge>>,
        config: &WindowConfig,
    ) -> Option<JoinHandle<()>> {
        debug!("Customizing devtools for window {}", window);

        match bridge.as_ref().and_then(|b| b.window_info()) {
            Some(info) => {
                if let Err(e) = panel.enable_console_deep_links(window, &info.location) {
                    warn!("Failed to enable console deep links for {}: {}", window, e);
                }
            }
            None => debug!("No debug target for window {}, deep links left off", window),
        }

        let tabs = hidden_tabs(config);
        if !tabs.is_empty() {
            if let Err(e) = panel.remove_tabs(window, &tabs) {
                warn!("Failed to remove devtools tabs for {}: {}", window, e);
            }
        }

        if let Err(e) = panel.select_execution_context(window, DEBUGGER_WORKER_CONTEXT) {
            warn!("Failed to select worker context for {}: {}", window, e);
        }

        let bridge = bridge?;
        let delay = self.welcome_delay;
        Some(tokio::spawn(async move {
            sleep(delay).await;
            if bridge.log_welcome_message().is_some() {
                info!("Welcome message shown in window {}", window);
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headless::{ContentCall, HeadlessHost, HostCall, ScriptedContent};
    use crate::script::ContentHook;

    #[test]
    fn hidden_tabs_follow_config() {
        let mut config = WindowConfig::default();
        assert_eq!(
            hidden_tabs(&config),
            vec!["elements", "security", "lighthouse", "network"]
        );

        config.default_network_inspect = true;
        assert!(!hidden_tabs(&config).contains(&"network".to_string()));

        config.show_all_devtools_tab = true;
        assert!(hidden_tabs(&config).is_empty());
    }

    #[tokio::test]
    async fn customize_patches_panel_and_welcomes_later() {
        let host = HeadlessHost::new();
        let content = Arc::new(ScriptedContent::all_hooks());
        let bridge = Arc::new(ContentBridge::new(content.clone()));
        let customizer = DevtoolsCustomizer::new(Duration::from_millis(20));

        let handle = customizer
            .customize(&host, WindowId(7), Some(bridge), &WindowConfig::default())
            .unwrap();
        assert!(!content.calls().contains(&ContentCall::WelcomeMessage));
        handle.await.unwrap();

        assert!(content.calls().contains(&ContentCall::WelcomeMessage));
        let calls = host.calls();
        assert!(calls.contains(&HostCall::ConsoleDeepLinks(
            WindowId(7),
            ScriptedContent::default_target()
        )));
        assert!(calls.contains(&HostCall::ExecutionContextSelected(
            WindowId(7),
            DEBUGGER_WORKER_CONTEXT.to_string()
        )));
        assert!(calls
            .iter()
            .any(|c| matches!(c, HostCall::TabsRemoved(WindowId(7), _))));
    }

    #[tokio::test]
    async fn customize_without_content_skips_deep_links_and_welcome() {
        let host = HeadlessHost::new();
        let mut config = WindowConfig::default();
        config.show_all_devtools_tab = true;

        let handle = DevtoolsCustomizer::default().customize(&host, WindowId(1), None, &config);
        assert!(handle.is_none());
        assert_eq!(
            host.calls(),
            vec![HostCall::ExecutionContextSelected(
                WindowId(1),
                DEBUGGER_WORKER_CONTEXT.to_string()
            )]
        );
    }

    #[tokio::test]
    async fn content_without_welcome_hook_is_tolerated() {
        let host = HeadlessHost::new();
        let content = Arc::new(ScriptedContent::new([ContentHook::WindowInfo]));
        let bridge = Arc::new(ContentBridge::new(content.clone()));

        let handle = DevtoolsCustomizer::new(Duration::ZERO)
            .customize(&host, WindowId(2), Some(bridge), &WindowConfig::default())
            .unwrap();
        handle.await.unwrap();
        assert_eq!(content.calls(), vec![ContentCall::WindowInfo]);
    }
}
