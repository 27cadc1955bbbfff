//! `localStorage` persistence for viewer settings and the recent-files list.

use gloo_storage::errors::StorageError;
use gloo_storage::{LocalStorage, Storage};
use tracing::warn;

use folio_shared::config::{RECENT_FILES_KEY, SETTINGS_KEY};
use folio_shared::{RecentEntry, RecentFiles, ViewerConfig};

/// Persisted settings, or defaults when absent or invalid. The second value
/// says why the stored settings were ignored; it is returned rather than
/// logged because this runs before the subscriber is installed.
pub fn load_settings() -> (ViewerConfig, Option<String>) {
    resolve_settings(LocalStorage::get::<ViewerConfig>(SETTINGS_KEY))
}

fn resolve_settings(stored: Result<ViewerConfig, StorageError>) -> (ViewerConfig, Option<String>) {
    let saved = match stored {
        Ok(saved) => saved,
        Err(StorageError::KeyNotFound(_)) => return (ViewerConfig::default(), None),
        Err(err) => {
            return (
                ViewerConfig::default(),
                Some(format!("could not read viewer settings: {err}")),
            );
        }
    };
    match saved.validated() {
        Ok(config) => (config, None),
        Err(err) => (
            ViewerConfig::default(),
            Some(format!("ignoring invalid viewer settings: {err}")),
        ),
    }
}

pub fn load_recent(cap: usize) -> RecentFiles {
    let entries: Vec<RecentEntry> = LocalStorage::get(RECENT_FILES_KEY).unwrap_or_default();
    RecentFiles::load(entries, cap)
}

pub fn save_recent(recent: &RecentFiles) {
    if let Err(err) = LocalStorage::set(RECENT_FILES_KEY, recent.entries()) {
        warn!(error = %err, "could not save recent files");
    }
}
