//! Transient, addressable handles for sandbox documents.
//!
//! A handle maps a fresh id to one document and is served under
//! `/sandbox/<id>` until released. Released ids answer `410 Gone` instead of
//! `404` so a late load from a stale boundary is easy to spot in logs.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use sandpit_sandbox::SandboxDocument;
use serde::Serialize;
use uuid::Uuid;

use crate::bridge::ExecutionId;

/// Route prefix documents are served under.
pub const HANDLE_ROUTE_PREFIX: &str = "/sandbox";

/// A live reference to one sandbox document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExecutionHandle {
    id: Uuid,
    url: String,
}

impl ExecutionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Path the document is served at.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Load URL carrying the execution id the sandbox should report back.
    pub fn url_for(&self, execution: ExecutionId) -> String {
        format!("{}?execution={}", self.url, execution)
    }
}

/// Result of looking a handle id up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleLookup {
    Live(Arc<str>),
    Released,
    Unknown,
}

/// Counters over the lifetime of a store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct HandleStats {
    pub created: u64,
    pub released: u64,
    pub live: usize,
}

#[derive(Debug, Default)]
struct Inner {
    live: HashMap<Uuid, Arc<str>>,
    released: HashSet<Uuid>,
    created: u64,
    released_count: u64,
}

/// Shared table of live handles.
#[derive(Debug, Clone, Default)]
pub struct HandleStore {
    inner: Arc<Mutex<Inner>>,
}

impl HandleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document and return its handle.
    pub fn create(&self, document: &SandboxDocument) -> ExecutionHandle {
        let id = Uuid::new_v4();
        let mut inner = self.lock();

        inner.live.insert(id, Arc::from(document.as_str()));
        inner.created += 1;

        tracing::debug!("Created handle {} for {}", id, document.identity);

        ExecutionHandle {
            id,
            url: format!("{}/{}", HANDLE_ROUTE_PREFIX, id),
        }
    }

    /// Release a handle. Returns `false` if it was not live.
    pub fn release(&self, handle: &ExecutionHandle) -> bool {
        let mut inner = self.lock();

        if inner.live.remove(&handle.id).is_none() {
            return false;
        }
        inner.released.insert(handle.id);
        inner.released_count += 1;

        tracing::debug!("Released handle {}", handle.id);
        true
    }

    pub fn lookup(&self, id: &Uuid) -> HandleLookup {
        let inner = self.lock();

        if let Some(document) = inner.live.get(id) {
            HandleLookup::Live(Arc::clone(document))
        } else if inner.released.contains(id) {
            HandleLookup::Released
        } else {
            HandleLookup::Unknown
        }
    }

    pub fn is_live(&self, handle: &ExecutionHandle) -> bool {
        self.lock().live.contains_key(&handle.id)
    }

    pub fn stats(&self) -> HandleStats {
        let inner = self.lock();

        HandleStats {
            created: inner.created,
            released: inner.released_count,
            live: inner.live.len(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sandpit_sandbox::DocumentBuilder;

    fn document() -> SandboxDocument {
        DocumentBuilder::default()
            .build("const Card = () => <div />;", "Card")
            .unwrap()
    }

    #[test]
    fn creates_addressable_handles() {
        let store = HandleStore::new();
        let doc = document();
        let handle = store.create(&doc);

        assert_eq!(handle.url(), format!("/sandbox/{}", handle.id()));
        assert_eq!(
            handle.url_for(ExecutionId::new(3)),
            format!("/sandbox/{}?execution=3", handle.id())
        );
        assert_eq!(
            store.lookup(&handle.id()),
            HandleLookup::Live(Arc::from(doc.as_str()))
        );
    }

    #[test]
    fn handles_are_unique() {
        let store = HandleStore::new();
        let doc = document();

        assert_ne!(store.create(&doc), store.create(&doc));
        assert_eq!(store.stats().live, 2);
    }

    #[test]
    fn releases_exactly_once() {
        let store = HandleStore::new();
        let handle = store.create(&document());

        assert!(store.release(&handle));
        assert!(!store.release(&handle));
        assert!(!store.is_live(&handle));
        assert_eq!(store.lookup(&handle.id()), HandleLookup::Released);
        assert_eq!(
            store.stats(),
            HandleStats {
                created: 1,
                released: 1,
                live: 0
            }
        );
    }

    #[test]
    fn unknown_ids_are_distinct_from_released() {
        let store = HandleStore::new();
        assert_eq!(store.lookup(&Uuid::new_v4()), HandleLookup::Unknown);
    }
}
