//! callsyncd - headless call-log sync agent
//!
//! Runs the same sync service the Android app embeds, reading calls from a
//! JSON export of the platform call log instead of the content provider.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use callsync::{
    AgentSettings, BootOutcome, BootReason, BootTrigger, CallLogProvider, CallUploader,
    DeviceConfig, HttpUploader, JsonCallLogFile, LogStatusSink, NoopWakeLock, SqliteSyncStore,
    SyncEngine, SyncService, SyncStore,
};
use clap::Parser;
use log::{error, info, warn};
use tokio::sync::mpsc;

mod watcher;

use watcher::ExportWatcher;

/// Database filename in the config directory
const DB_FILE: &str = "callsync.db";

/// How often the export file is checked for changes
const EXPORT_POLL: Duration = Duration::from_secs(2);

#[derive(Parser)]
#[command(name = "callsyncd")]
#[command(about = "Sync a device call log to the warehouse backend", long_about = None)]
struct Cli {
    /// Settings file (defaults to ~/.config/callsync/agent.json)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Call-log export to read (overrides `call_log_path`)
    #[arg(short, long)]
    call_log: Option<PathBuf>,

    /// SQLite database (defaults to ~/.config/callsync/callsync.db)
    #[arg(long)]
    db: Option<PathBuf>,

    /// Run a single sync cycle and exit
    #[arg(long)]
    once: bool,

    /// Forget the sync watermark before starting
    #[arg(long)]
    reset: bool,

    /// Write a settings template and exit
    #[arg(long)]
    init: bool,
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    // Bootstrap config directory
    if let Err(e) = config::init() {
        error!("Failed to initialize config directory: {}", e);
    }

    let cli = Cli::parse();
    if cli.init {
        return write_settings_template(cli.settings.as_deref());
    }

    let settings = match &cli.settings {
        Some(path) => AgentSettings::from_file(path)?,
        None => AgentSettings::load()?,
    };

    let db_path = match &cli.db {
        Some(path) => path.clone(),
        None => config::config_path(DB_FILE).context("Could not determine config directory")?,
    };
    let store = Arc::new(SqliteSyncStore::new(&db_path)?);
    seed_device_config(store.as_ref(), &settings)?;

    if cli.reset {
        store.reset_sync_state()?;
        info!("Sync watermark reset");
    }

    let Some(export_path) = cli.call_log.clone().or_else(|| settings.call_log_path.clone())
    else {
        bail!("No call-log export configured (pass --call-log or set call_log_path)");
    };

    let provider: Arc<dyn CallLogProvider> = Arc::new(JsonCallLogFile::new(&export_path));
    let uploader: Arc<dyn CallUploader> =
        Arc::new(HttpUploader::new(&settings.api_base_url, settings.http_timeout())?);
    let shared_store: Arc<dyn SyncStore> = store.clone();
    let build_engine = || {
        SyncEngine::new(
            provider.clone(),
            uploader.clone(),
            shared_store.clone(),
            settings.sync_options(),
        )
    };

    if cli.once {
        let report = build_engine().run_cycle()?;
        info!(
            "Uploaded {} of {} calls ({} filtered, {} duplicates), watermark {}",
            report.uploaded,
            report.queried,
            report.filtered_by_sim,
            report.skipped_duplicates,
            report.watermark
        );
        return Ok(());
    }

    let running: Mutex<Option<SyncService>> = Mutex::new(None);
    let launch = || -> Result<()> {
        let service = SyncService::start(
            build_engine(),
            Arc::new(NoopWakeLock),
            Arc::new(LogStatusSink),
            settings.service_options(),
        )?;
        *running.lock().unwrap_or_else(PoisonError::into_inner) = Some(service);
        Ok(())
    };

    let trigger = BootTrigger::new(shared_store.clone(), settings.boot_policy());
    match trigger.on_boot(BootReason::Manual, &launch)? {
        BootOutcome::Started { .. } => {}
        BootOutcome::SkippedConfigInvalid => {
            let hint = AgentSettings::default_settings_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "agent.json".to_string());
            bail!("Device is not configured; add a \"device\" section to {}", hint);
        }
        BootOutcome::SkippedAutoStartDisabled => {
            info!("Auto-start is disabled for this device, exiting");
            return Ok(());
        }
        BootOutcome::Failed { attempts, error } => {
            bail!("Sync service failed to start after {} attempts: {}", attempts, error);
        }
    }

    let service = running
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner)
        .map(Arc::new)
        .context("Sync service reported started but is missing")?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(supervise(service.clone(), export_path));

    service.stop();
    Ok(())
}

/// Create a settings file with defaults and an empty device section
fn write_settings_template(path: Option<&Path>) -> Result<()> {
    let target = match path {
        Some(path) => path.to_path_buf(),
        None => AgentSettings::default_settings_path()
            .context("Could not determine config directory")?,
    };
    if target.exists() {
        bail!("{} already exists", target.display());
    }

    let template = AgentSettings {
        device: Some(DeviceConfig::new("", "", "")),
        ..AgentSettings::default()
    };
    match path {
        Some(path) => template.save_to(path)?,
        None => template.save()?,
    }
    info!("Wrote settings template to {}", target.display());
    Ok(())
}

/// Write the device section of the settings into the store when it differs
fn seed_device_config(store: &dyn SyncStore, settings: &AgentSettings) -> Result<()> {
    let Some(device) = &settings.device else {
        return Ok(());
    };
    if let Err(e) = device.validate() {
        warn!("Ignoring device section in settings: {}", e);
        return Ok(());
    }
    if store.get_device_config()?.as_ref() != Some(device) {
        store.save_device_config(device.clone())?;
        info!("Device {} registered for warehouse {}", device.device_id, device.warehouse_id);
    }
    Ok(())
}

/// Watch the export and handle signals until asked to stop
async fn supervise(service: Arc<SyncService>, export_path: PathBuf) {
    let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
    let watched = service.clone();
    let watcher = ExportWatcher::new(export_path, EXPORT_POLL);
    let watcher = tokio::spawn(watcher.run(move || watched.notify_change(), shutdown_rx));

    wait_for_shutdown(&service).await;
    info!("Shutting down");

    let _ = shutdown_tx.send(()).await;
    if let Err(e) = watcher.await {
        warn!("Export watcher ended abnormally: {}", e);
    }
}

/// Block until Ctrl+C or SIGTERM; SIGUSR1 requests an immediate sync
async fn wait_for_shutdown(service: &SyncService) {
    use tokio::signal;

    #[cfg(unix)]
    {
        use signal::unix::{SignalKind, signal as unix_signal};

        let (Ok(mut terminate), Ok(mut user1)) = (
            unix_signal(SignalKind::terminate()),
            unix_signal(SignalKind::user_defined1()),
        ) else {
            warn!("Failed to install signal handlers, only Ctrl+C will stop the agent");
            let _ = signal::ctrl_c().await;
            return;
        };

        loop {
            tokio::select! {
                _ = signal::ctrl_c() => break,
                _ = terminate.recv() => break,
                _ = user1.recv() => {
                    info!("Sync requested by signal");
                    service.request_sync();
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = service;
        let _ = signal::ctrl_c().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use callsync::InMemorySyncStore;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_seed_device_config() {
        let store = InMemorySyncStore::new();
        let mut settings = AgentSettings {
            device: Some(DeviceConfig::new("", "dev-1", "+15550100")),
            ..AgentSettings::default()
        };

        seed_device_config(&store, &settings).unwrap();
        assert!(store.get_device_config().unwrap().is_none());

        settings.device = Some(DeviceConfig::new("WH-1", "dev-1", "+15550100"));
        seed_device_config(&store, &settings).unwrap();
        assert_eq!(store.get_device_config().unwrap(), settings.device);
    }

    #[test]
    fn test_settings_template_refuses_to_overwrite() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("agent.json");

        write_settings_template(Some(&path)).unwrap();
        let written: AgentSettings = config::load_json_file(&path).unwrap();
        assert!(written.device.is_some());

        assert!(write_settings_template(Some(&path)).is_err());
    }
}
