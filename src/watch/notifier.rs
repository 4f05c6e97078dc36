// src/watch/notifier.rs

use std::path::PathBuf;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, info, trace};

use crate::errors::{Result, RunwatchError};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{RootKind, WatchPlan};
use crate::watch::queue::{ChangeEvent, EventSink};

/// Live filesystem subscriptions for one watch session, one per root.
///
/// Dropping the notifier unregisters every subscription, so holding it in a
/// local for the lifetime of the session tears it down on every exit path.
pub struct Notifier {
    subscriptions: Vec<RecommendedWatcher>,
}

impl std::fmt::Debug for Notifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notifier")
            .field("subscriptions", &self.subscriptions.len())
            .finish()
    }
}

impl Notifier {
    /// Subscribe to every root of `plan`, forwarding root-relative paths to
    /// `sink`. Directories are watched recursively, files directly.
    pub fn subscribe(plan: &WatchPlan, sink: EventSink) -> Result<Self> {
        let mut subscriptions = Vec::with_capacity(plan.roots().len());

        for (index, root) in plan.roots().iter().enumerate() {
            let mode = match root.kind() {
                RootKind::Directory => RecursiveMode::Recursive,
                RootKind::File => RecursiveMode::NonRecursive,
            };

            debug!(root = ?root.path(), globs = ?root.globs(), ?mode, "start watching");
            let mut watcher = RecommendedWatcher::new(
                forwarder(index, root.path().to_path_buf(), sink.clone()),
                Config::default(),
            )?;
            watcher.watch(root.path(), mode).map_err(|err| {
                RunwatchError::WatchRoot {
                    path: root.path().to_path_buf(),
                    reason: format!("start watching: {err}"),
                }
            })?;

            subscriptions.push(watcher);
        }

        info!(roots = subscriptions.len(), "file watcher started");
        Ok(Self { subscriptions })
    }

    /// Number of active subscriptions (always the number of distinct roots).
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }
}

/// Create, modify, remove and rename all count; opening or reading a file
/// does not.
fn is_change(kind: &EventKind) -> bool {
    !matches!(kind, EventKind::Access(_))
}

/// Build the callback notify invokes (on its own thread) for one root.
fn forwarder(
    index: usize,
    base: PathBuf,
    sink: EventSink,
) -> impl FnMut(notify::Result<Event>) + Send + 'static {
    move |res: notify::Result<Event>| match res {
        Ok(event) if !is_change(&event.kind) => {
            trace!(root = ?base, kind = ?event.kind, "ignoring access event");
        }
        Ok(event) => {
            for path in event.paths {
                match relative_str(&base, &path) {
                    Some(rel) => {
                        trace!(root = ?base, path = %rel, "forwarding change");
                        sink.publish(ChangeEvent {
                            root: index,
                            path: rel,
                        });
                    }
                    None => {
                        debug!(root = ?base, ?path, "error converting path to root-relative");
                    }
                }
            }
        }
        Err(err) => sink.fault(RunwatchError::Notify(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RemoveKind, RenameMode};

    #[test]
    fn only_access_events_are_filtered() {
        assert!(!is_change(&EventKind::Access(AccessKind::Open(AccessMode::Read))));
        assert!(!is_change(&EventKind::Access(AccessKind::Close(AccessMode::Read))));

        assert!(is_change(&EventKind::Create(CreateKind::File)));
        assert!(is_change(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))));
        assert!(is_change(&EventKind::Remove(RemoveKind::File)));
        assert!(is_change(&EventKind::Any));
    }
}
