//! The isolation boundary a sandbox document executes in.

use crate::bridge::ExecutionId;
use crate::handles::ExecutionHandle;
use crate::websocket::{HostMessage, StatusHub};

/// Something that can show exactly one sandbox document at a time.
///
/// Loading replaces whatever was shown before, so at most one boundary
/// element exists per controller.
pub trait Boundary: Send {
    /// Load the document behind `handle` for `execution`.
    fn load(&mut self, execution: ExecutionId, handle: &ExecutionHandle);

    /// Remove the current document, if any.
    fn clear(&mut self);

    /// The handle loaded for `execution` no longer serves its document.
    ///
    /// A document that already loaded keeps running; only a fresh load of
    /// the same handle would fail.
    fn released(&mut self, _execution: ExecutionId) {}
}

/// Boundary living in the host page, driven over the status hub.
///
/// The host script replaces its iframe on every mount, so stale documents
/// are discarded rather than navigated.
#[derive(Debug, Clone)]
pub struct HostBoundary {
    hub: StatusHub,
}

impl HostBoundary {
    pub fn new(hub: StatusHub) -> Self {
        Self { hub }
    }
}

impl Boundary for HostBoundary {
    fn load(&mut self, execution: ExecutionId, handle: &ExecutionHandle) {
        self.hub.send(HostMessage::Mount {
            execution,
            url: handle.url_for(execution),
        });
    }

    fn clear(&mut self) {
        self.hub.send(HostMessage::Unmount);
    }

    fn released(&mut self, execution: ExecutionId) {
        self.hub.forget_mount(execution);
    }
}
