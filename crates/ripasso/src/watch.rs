use anyhow::{Context, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;
use tracing::{debug, error, info};

const DEBOUNCE: Duration = Duration::from_secs(2);

/// Run `rebuild` every time the dataset file changes. Blocks until the
/// watcher goes away; rebuild failures are logged and watching continues.
pub fn watch_dataset<F>(data_file: &Path, mut rebuild: F) -> Result<()>
where
    F: FnMut() -> Result<()>,
{
    let data_file = data_file
        .canonicalize()
        .with_context(|| format!("Dataset file not found: {}", data_file.display()))?;
    // Editors often replace the file, so watch its directory
    let watch_dir = data_file
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let (tx, rx) = mpsc::channel::<DebounceEventResult>();
    let mut debouncer = new_debouncer(DEBOUNCE, tx).context("Failed to create file watcher")?;
    debouncer
        .watcher()
        .watch(&watch_dir, RecursiveMode::NonRecursive)
        .with_context(|| format!("Failed to watch {}", watch_dir.display()))?;

    info!(path = %data_file.display(), "Watching dataset for changes");

    for result in rx {
        match result {
            Ok(events) => {
                if !touches_file(events.iter().map(|e| e.path.as_path()), &data_file) {
                    continue;
                }
                info!("Dataset changed, rebuilding");
                match rebuild() {
                    Ok(()) => debug!("Rebuild finished"),
                    Err(e) => error!(error = %format!("{e:#}"), "Rebuild failed"),
                }
            }
            Err(e) => error!(error = ?e, "Watch error"),
        }
    }

    Ok(())
}

/// Whether any changed path refers to the watched file
fn touches_file<'a, I>(paths: I, target: &Path) -> bool
where
    I: IntoIterator<Item = &'a Path>,
{
    paths.into_iter().any(|path| {
        path == target || (path.file_name().is_some() && path.file_name() == target.file_name())
    })
}
