//! Filesystem change notifications
//!
//! The mirror consumes `WatchEvent` values and registers interest through
//! the `Watcher` trait. `NotifyWatcher` backs the trait with the `notify`
//! crate and forwards translated events into a tokio channel, which the
//! daemon's event loop drains one event at a time.

use log::{debug, warn};
use notify::event::{CreateKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

use crate::models::{StorageError, WatchEvent, WatchEventKind};

/// Registration interface of a change-notification source.
///
/// Watches are non-recursive: events report entries directly inside the
/// registered directory, plus the removal of the directory itself.
pub trait Watcher {
    fn register(&mut self, path: &Path) -> Result<(), StorageError>;
    fn unregister(&mut self, path: &Path);
}

/// `Watcher` backed by the platform's recommended `notify` backend
pub struct NotifyWatcher {
    inner: RecommendedWatcher,
}

impl NotifyWatcher {
    /// Create a watcher for the storage root `root`, delivering events to `events`
    pub fn new(root: &Path, events: UnboundedSender<WatchEvent>) -> Result<Self, StorageError> {
        let translate_root = root.to_path_buf();
        let inner = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                for watch_event in translate_event(&translate_root, &event) {
                    if events.send(watch_event).is_err() {
                        // Receiver gone, daemon is shutting down
                        break;
                    }
                }
            }
            Err(e) => warn!("Notification error: {}", e),
        })
        .map_err(|e| StorageError::Watch {
            path: root.to_path_buf(),
            message: e.to_string(),
        })?;

        Ok(Self { inner })
    }

    /// Create a watcher together with the receiving end of its event stream
    pub fn channel(root: &Path) -> Result<(Self, UnboundedReceiver<WatchEvent>), StorageError> {
        let (tx, rx) = unbounded_channel();
        Ok((Self::new(root, tx)?, rx))
    }
}

impl Watcher for NotifyWatcher {
    fn register(&mut self, path: &Path) -> Result<(), StorageError> {
        use notify::Watcher as _;

        debug!("Watching {}", path.display());
        self.inner
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| StorageError::Watch {
                path: path.to_path_buf(),
                message: e.to_string(),
            })
    }

    fn unregister(&mut self, path: &Path) {
        use notify::Watcher as _;

        // The backend drops watches of deleted directories on its own
        if let Err(e) = self.inner.unwatch(path) {
            debug!("Unwatch {}: {}", path.display(), e);
        }
    }
}

/// Translate a backend event into mirror events.
///
/// Removal of `root` itself becomes `SelfDeleted`; every other path is
/// reported relative to its parent directory. Where the backend does not
/// say whether the entry is a directory, existing entries are checked with
/// `stat` and vanished entries count as directories only directly under
/// `root`.
pub fn translate_event(root: &Path, event: &Event) -> Vec<WatchEvent> {
    let kind = match event.kind {
        EventKind::Create(_) => WatchEventKind::Created,
        EventKind::Remove(_) => WatchEventKind::Deleted,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => WatchEventKind::RenamedFrom,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => WatchEventKind::RenamedTo,
        _ => return Vec::new(),
    };

    event
        .paths
        .iter()
        .filter_map(|path| {
            if kind == WatchEventKind::Deleted && path == root {
                return Some(WatchEvent::self_deleted(root));
            }

            let watch = path.parent()?;
            let name = path.file_name()?.to_string_lossy().into_owned();
            let is_dir = match event.kind {
                EventKind::Create(CreateKind::Folder) | EventKind::Remove(RemoveKind::Folder) => true,
                EventKind::Create(CreateKind::File) | EventKind::Remove(RemoveKind::File) => false,
                _ if matches!(kind, WatchEventKind::Deleted | WatchEventKind::RenamedFrom) => watch == root,
                _ => path.is_dir(),
            };

            Some(WatchEvent::new(PathBuf::from(watch), kind, name, is_dir))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::AccessKind;
    use tempfile::tempdir;

    fn event(kind: EventKind, path: &Path) -> Event {
        Event::new(kind).add_path(path.to_path_buf())
    }

    #[test]
    fn test_root_removal_is_self_deleted() {
        let root = Path::new("/var/lib/connman");
        let events = translate_event(root, &event(EventKind::Remove(RemoveKind::Folder), root));
        assert_eq!(events, vec![WatchEvent::self_deleted(root)]);
    }

    #[test]
    fn test_created_folder_under_root() {
        let root = Path::new("/var/lib/connman");
        let events = translate_event(
            root,
            &event(EventKind::Create(CreateKind::Folder), &root.join("wifi_abc")),
        );
        assert_eq!(
            events,
            vec![WatchEvent::new(root, WatchEventKind::Created, "wifi_abc", true)]
        );
    }

    #[test]
    fn test_settings_file_removed_in_subdir() {
        let root = Path::new("/var/lib/connman");
        let path = root.join("wifi_abc").join("settings");
        let events = translate_event(root, &event(EventKind::Remove(RemoveKind::File), &path));
        assert_eq!(
            events,
            vec![WatchEvent::new(root.join("wifi_abc"), WatchEventKind::Deleted, "settings", false)]
        );
    }

    #[test]
    fn test_rename_from_directory_guess() {
        let root = Path::new("/var/lib/connman");
        let from = EventKind::Modify(ModifyKind::Name(RenameMode::From));

        let events = translate_event(root, &event(from, &root.join("wifi_abc")));
        assert!(events[0].is_dir);
        assert_eq!(events[0].kind, WatchEventKind::RenamedFrom);

        let events = translate_event(root, &event(from, &root.join("wifi_abc").join("settings")));
        assert!(!events[0].is_dir);
    }

    #[test]
    fn test_rename_to_uses_stat() {
        let dir = tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir(root.join("moved_in")).unwrap();
        std::fs::write(root.join("plain"), b"x").unwrap();
        let to = EventKind::Modify(ModifyKind::Name(RenameMode::To));

        let events = translate_event(root, &event(to, &root.join("moved_in")));
        assert_eq!(events[0].kind, WatchEventKind::RenamedTo);
        assert!(events[0].is_dir);

        let events = translate_event(root, &event(to, &root.join("plain")));
        assert!(!events[0].is_dir);
    }

    #[test]
    fn test_irrelevant_kinds_are_dropped() {
        let root = Path::new("/var/lib/connman");
        let path = root.join("wifi_abc");
        assert!(translate_event(root, &event(EventKind::Access(AccessKind::Any), &path)).is_empty());
        assert!(translate_event(
            root,
            &event(EventKind::Modify(ModifyKind::Name(RenameMode::Both)), &path)
        )
        .is_empty());
    }
}
