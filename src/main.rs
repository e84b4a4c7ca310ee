// Dashboard entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file, not terminal)
// 2. Load config (copying defaults on first run)
// 3. Open the row cache
// 4. Build the CSV source and application state
// 5. Create mpsc channels
// 6. Spawn the app logic task (performs the initial load)
// 7. Run the TUI event loop (blocking until the user quits)
// 8. Cleanup on exit

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use nexus_stats::app;
use nexus_stats::cache::{RowCache, SqliteStore};
use nexus_stats::config;
use nexus_stats::dataset::loader::source_from_config;
use nexus_stats::dataset::CACHE_SCHEMA_VERSION;
use nexus_stats::tui;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing (log to file, not terminal)
    init_tracing()?;
    info!("Nexus Stats starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    let source_desc = config
        .data
        .csv_url
        .clone()
        .or_else(|| config.data.csv_path.clone())
        .unwrap_or_default();
    info!("Config loaded: source={source_desc}, cache enabled={}", config.cache.enabled);

    // 3. Open the row cache
    let cache = if config.cache.enabled {
        let path = cache_path(&config)?;
        match SqliteStore::open(&path.display().to_string()) {
            Ok(store) => {
                info!("Row cache opened at {}", path.display());
                Some(RowCache::new(Arc::new(store), CACHE_SCHEMA_VERSION))
            }
            Err(e) => {
                // A broken cache file must not keep the dashboard down.
                warn!("could not open row cache at {}: {e}", path.display());
                None
            }
        }
    } else {
        info!("Row cache disabled by config");
        None
    };

    // 4. Build the CSV source and application state
    let source = source_from_config(&config.data);
    let app_state = app::AppState::new(config, source, cache);

    // 5. Create mpsc channels
    let (cmd_tx, cmd_rx) = mpsc::channel(64);
    let (ui_tx, ui_rx) = mpsc::channel(256);

    // 6. Spawn the app logic task
    let app_handle = tokio::spawn(async move {
        if let Err(e) = app::run(cmd_rx, ui_tx, app_state).await {
            error!("Application loop error: {e}");
        }
    });

    // 7. Run the TUI event loop (blocking until the user quits)
    if let Err(e) = tui::run(ui_rx, cmd_tx).await {
        error!("TUI error: {e}");
    }

    // 8. Cleanup: wait for the app task to finish (with timeout)
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), async {
        let _ = app_handle.await;
    })
    .await;

    info!("Nexus Stats shut down cleanly");
    Ok(())
}

/// Resolve the cache database location: the configured path when set,
/// otherwise the platform cache directory.
fn cache_path(config: &nexus_stats::config::Config) -> anyhow::Result<PathBuf> {
    if let Some(path) = config.cache.path.as_deref() {
        return Ok(PathBuf::from(path));
    }

    let dirs = directories::ProjectDirs::from("", "", "nexus-stats")
        .context("could not determine a platform cache directory")?;
    let dir = dirs.cache_dir();
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create cache directory {}", dir.display()))?;
    Ok(dir.join("rows.db"))
}

/// Initialize tracing to log to a file (not the terminal, which is used by
/// the TUI).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("nexus-stats.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("nexus_stats=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
