//! # Filesystem watcher for the node agent's socket directory.
//!
//! [`FsWatcher`] watches one directory (non-recursively) through `notify` and exposes
//! two unbounded channels: [`FsEvent`]s and [`WatchError`]s. Events keep the order in
//! which the OS reported them; nothing is deduplicated.
//!
//! ```text
//! notify thread ──► callback ──┬──► events: UnboundedReceiver<FsEvent>
//!                              └──► errors: UnboundedReceiver<WatchError>
//! ```

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{EventKind as NotifyKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::error::WatchError;

/// Kind of filesystem change.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FsOp {
    Create,
    Write,
    Remove,
    Rename,
    Chmod,
    Other,
}

impl From<&NotifyKind> for FsOp {
    fn from(kind: &NotifyKind) -> Self {
        match kind {
            NotifyKind::Create(_) => FsOp::Create,
            NotifyKind::Modify(ModifyKind::Name(_)) => FsOp::Rename,
            NotifyKind::Modify(ModifyKind::Metadata(_)) => FsOp::Chmod,
            NotifyKind::Modify(_) => FsOp::Write,
            NotifyKind::Remove(_) => FsOp::Remove,
            _ => FsOp::Other,
        }
    }
}

/// One change reported for one path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsEvent {
    pub path: PathBuf,
    pub op: FsOp,
}

impl FsEvent {
    /// `true` if this event reports the creation of exactly `path`.
    pub fn is_create_of(&self, path: &Path) -> bool {
        self.op == FsOp::Create && self.path == path
    }
}

/// Watches a directory and exposes its events as channels.
pub struct FsWatcher {
    dir: PathBuf,
    watcher: Option<RecommendedWatcher>,
    pub(crate) events: mpsc::UnboundedReceiver<FsEvent>,
    pub(crate) errors: mpsc::UnboundedReceiver<WatchError>,
}

impl FsWatcher {
    /// Starts watching `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, WatchError> {
        let dir = dir.into();
        let (ev_tx, events) = mpsc::unbounded_channel();
        let (err_tx, errors) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let op = FsOp::from(&event.kind);
                    for path in event.paths {
                        let _ = ev_tx.send(FsEvent { path, op });
                    }
                }
                Err(e) => {
                    let _ = err_tx.send(WatchError(e));
                }
            }
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        Ok(Self {
            dir,
            watcher: Some(watcher),
            events,
            errors,
        })
    }

    /// Wraps existing channels (no OS watcher).
    pub fn from_channels(
        dir: impl Into<PathBuf>,
        events: mpsc::UnboundedReceiver<FsEvent>,
        errors: mpsc::UnboundedReceiver<WatchError>,
    ) -> Self {
        Self {
            dir: dir.into(),
            watcher: None,
            events,
            errors,
        }
    }

    /// Directory being watched.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Stops watching. Consumes the watcher so it can only happen once.
    pub fn close(mut self) -> Result<(), WatchError> {
        match self.watcher.take() {
            Some(mut w) => w.unwatch(&self.dir).map_err(WatchError),
            None => Ok(()),
        }
    }
}
