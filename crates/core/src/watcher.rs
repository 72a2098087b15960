//! File watching and scheduled reprocessing.
//!
//! In live mode the watcher runs the processor once at startup, then again whenever one of
//! the four export files under the raw root is created or changed (after the change has been
//! quiet for the stability window), and on a fixed interval. Processing always runs on the
//! blocking pool. Stopping the watcher aborts the timer and the event loop; a run already in
//! progress finishes on its own.

use crate::config::CoreConfig;
use crate::processor::Processor;
use crate::TransformerResult;
use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use records::RecordKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Starts processing runs in the background.
type Trigger = Arc<dyn Fn() + Send + Sync>;

/// Handle to a running watcher session.
///
/// The interval timer always runs. File watching is absent when the raw root could not be
/// watched.
pub struct WatcherHandle {
    watcher: Option<RecommendedWatcher>,
    debounce_task: Option<JoinHandle<()>>,
    interval_task: JoinHandle<()>,
}

impl WatcherHandle {
    /// Whether file changes are being watched, as opposed to interval runs only.
    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Stops the interval timer and file watching.
    pub fn stop(self) {
        self.interval_task.abort();
        if let Some(task) = self.debounce_task {
            task.abort();
        }
        tracing::info!("File watcher stopped");
    }
}

/// Watches the raw tree and keeps the parsed output current.
#[derive(Clone, Debug)]
pub struct FileWatcher {
    cfg: Arc<CoreConfig>,
    processor: Arc<Processor>,
}

impl FileWatcher {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        let processor = Arc::new(Processor::new(cfg.clone()));
        Self { cfg, processor }
    }

    /// Starts a watcher session.
    ///
    /// Returns `None` without processing anything when an anonymized index is present.
    /// Otherwise performs the initial run, then installs the interval timer and the file
    /// watcher. A raw root that cannot be watched is logged and leaves the session on interval
    /// runs only. Must be called from within a Tokio runtime.
    pub async fn start(&self) -> Option<WatcherHandle> {
        if self.cfg.demo_mode() {
            tracing::info!(
                "DEMO MODE: anonymized data found in {}, file watching and processing disabled",
                self.cfg.parsed_data_dir().display()
            );
            return None;
        }

        tracing::info!("Starting file watcher for {}", self.cfg.raw_data_dir().display());
        run_processing(self.processor.clone()).await;

        let interval_task = tokio::spawn(run_on_interval(
            self.cfg.processing_interval(),
            self.processor.clone(),
        ));

        let (tx, rx) = mpsc::unbounded_channel();
        let (watcher, debounce_task) = match watch_raw_tree(self.cfg.raw_data_dir(), tx) {
            Ok(watcher) => {
                let processor = self.processor.clone();
                let trigger: Trigger = Arc::new(move || {
                    tokio::spawn(run_processing(processor.clone()));
                });
                let task = tokio::spawn(debounce_changes(rx, self.cfg.stability_window(), trigger));
                (Some(watcher), Some(task))
            }
            Err(e) => {
                tracing::error!(
                    "Cannot watch {}, continuing with scheduled processing only: {}",
                    self.cfg.raw_data_dir().display(),
                    e
                );
                (None, None)
            }
        };

        Some(WatcherHandle {
            watcher,
            debounce_task,
            interval_task,
        })
    }
}

/// Installs a recursive watcher on `raw_root` that forwards changed export paths to `tx`.
fn watch_raw_tree(
    raw_root: &Path,
    tx: mpsc::UnboundedSender<PathBuf>,
) -> TransformerResult<RecommendedWatcher> {
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) if is_relevant_event(&event) => {
            for path in event.paths {
                // Fails only once the session has stopped.
                let _ = tx.send(path);
            }
        }
        Ok(_) => {}
        Err(e) => tracing::error!("File watcher error: {}", e),
    })?;
    watcher.watch(raw_root, RecursiveMode::Recursive)?;
    Ok(watcher)
}

/// Runs the processor on the blocking pool and logs the outcome.
async fn run_processing(processor: Arc<Processor>) {
    match tokio::task::spawn_blocking(move || processor.run()).await {
        Ok(Ok(result)) => tracing::info!(
            "Processing run finished: {} residents, {} facilities",
            result.residents_processed,
            result.facilities_processed
        ),
        Ok(Err(e)) => tracing::error!("Processing run failed: {}", e),
        Err(e) => tracing::error!("Processing task failed: {}", e),
    }
}

/// Whether an event concerns one of the export files and changes its content or presence.
fn is_relevant_event(event: &Event) -> bool {
    let relevant_kind = match event.kind {
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    };
    relevant_kind && event.paths.iter().any(|path| is_export_file(path))
}

fn is_export_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(RecordKind::from_file_name)
        .is_some()
}

/// Collapses bursts of change notifications into one trigger each.
///
/// A burst ends once no further change arrives within `window`. Returns when the sender side
/// is dropped.
async fn debounce_changes(
    mut rx: mpsc::UnboundedReceiver<PathBuf>,
    window: Duration,
    trigger: Trigger,
) {
    while let Some(first) = rx.recv().await {
        tracing::info!("File changed: {}", first.display());
        loop {
            match tokio::time::timeout(window, rx.recv()).await {
                Ok(Some(path)) => tracing::debug!("Further change: {}", path.display()),
                Ok(None) | Err(_) => break,
            }
        }
        trigger();
    }
}

async fn run_on_interval(period: Duration, processor: Arc<Processor>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately; the initial run has already happened.
    ticker.tick().await;
    loop {
        ticker.tick().await;
        tracing::info!("Running scheduled file processing...");
        run_processing(processor.clone()).await;
    }
}
