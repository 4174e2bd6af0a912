use clap::{Parser, Subcommand};
use debugger_windows::config::{default_config_path, WindowConfig};
use debugger_windows::geometry::resolve_bounds;
use debugger_windows::headless::{
    HeadlessHost, HeadlessShortcuts, RecordingUpdater, ScriptedContent,
};
use debugger_windows::host::WindowHost;
use debugger_windows::script::ContentHandle;
use debugger_windows::store::{self, default_state_path, JsonFileStore};
use debugger_windows::window_manager::Collaborators;
use debugger_windows::{Command, ManagerSettings, Rect, Result, WindowEvent, WindowManager};
use log::{error, info};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "debugger-windows")]
#[command(about = "Window lifecycle tooling for the debugger")]
struct Cli {
    #[arg(short, long, help = "Configuration file path")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Persisted window state file path")]
    state: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Validate the configuration file")]
    CheckConfig,
    #[command(about = "Show persisted bounds, zoom and the next window's geometry")]
    State,
    #[command(about = "Forget persisted window bounds and zoom level")]
    ResetState,
    #[command(about = "Drive the window manager against a headless host")]
    Simulate {
        #[arg(short, long, default_value_t = 2)]
        windows: usize,
        #[arg(short, long, help = "Packager port passed to each window")]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(default_config_path);
    let state_path = cli.state.unwrap_or_else(default_state_path);

    match cli.command {
        Some(Commands::CheckConfig) | None => {
            let loaded = WindowConfig::load_or_default(&config_path);
            match loaded.broken {
                Some(e) => {
                    error!("{}", e);
                    std::process::exit(1);
                }
                None => {
                    println!("{}: ok\n", config_path.display());
                    println!("{}", toml::to_string_pretty(&loaded.config)?);
                }
            }
        }
        Some(Commands::State) => {
            let state = JsonFileStore::open(&state_path)?;
            let config = WindowConfig::load_or_default(&config_path).config;
            let bounds = store::load_bounds(&state);
            println!("state file: {}", state.path().display());
            println!("{}: {:?}", store::WIN_BOUNDS_KEY, bounds);
            println!("{}: {:?}", store::ZOOM_LEVEL_KEY, store::load_zoom_level(&state));
            println!(
                "next window: {:?}",
                resolve_bounds(bounds.as_ref(), config.window_bounds.as_ref(), 0)
            );
        }
        Some(Commands::ResetState) => {
            let mut state = JsonFileStore::open(&state_path)?;
            state.clear()?;
            info!("Cleared persisted window state at {:?}", state_path);
        }
        Some(Commands::Simulate { windows, port }) => {
            simulate(config_path, state_path, windows, port).await?;
        }
    }

    Ok(())
}

/// Opens `count` windows, cycles focus through them, then closes them all,
/// persisting state to the real state file.
async fn simulate(
    config_path: PathBuf,
    state_path: PathBuf,
    count: usize,
    port: Option<u16>,
) -> Result<()> {
    let host = Arc::new(HeadlessHost::new());
    let shortcuts = Arc::new(HeadlessShortcuts::default());
    let mut wm = WindowManager::new(
        ManagerSettings::from_env(config_path),
        Collaborators {
            host: host.clone(),
            shortcuts: shortcuts.clone(),
            store: Box::new(JsonFileStore::open(&state_path)?),
            updater: Arc::new(RecordingUpdater::default()),
        },
    );

    for _ in 0..count {
        wm.handle_command(Command::CreateWindow { port }).await?;
    }

    for (n, id) in wm.window_ids().into_iter().enumerate() {
        let content = ContentHandle(Arc::new(ScriptedContent::all_hooks()));
        wm.handle_window_event(WindowEvent::ContentLoaded {
            window: id,
            content: Some(content),
        })
        .await?;
        wm.handle_window_event(WindowEvent::Focused(id)).await?;
        wm.handle_window_event(WindowEvent::DevtoolsOpened(id)).await?;

        let bounds = host.bounds(id)?;
        host.move_window(
            id,
            Rect::new(bounds.x + n as f64 * 5.0, bounds.y, bounds.width, bounds.height),
        )?;
        info!(
            "Window {} focused, shortcuts: {:?}",
            id,
            shortcuts.active().iter().map(|a| a.to_string()).collect::<Vec<_>>()
        );
    }

    for id in wm.window_ids() {
        wm.handle_window_event(WindowEvent::CloseRequested(id)).await?;
    }

    println!("host calls:");
    for call in host.calls() {
        println!("  {:?}", call);
    }
    Ok(())
}
