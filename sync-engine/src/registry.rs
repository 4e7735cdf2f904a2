//! Long-lived engine client registry.
//!
//! Hands out [`ClientHandle`]s for engine clients so callers can name a
//! client with a plain integer. Handles are never reused.

use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use sync_types::ClientHandle;

use crate::session::EngineClient;

/// Concurrent map from client handle to engine client.
#[derive(Default)]
pub struct ClientRegistry {
    clients: DashMap<ClientHandle, Arc<dyn EngineClient>>,
    issued: AtomicU64,
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientRegistry")
            .field("clients_count", &self.clients.len())
            .field("issued", &self.issued.load(Ordering::Relaxed))
            .finish()
    }
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a client and return its handle.
    pub fn register(&self, client: Arc<dyn EngineClient>) -> ClientHandle {
        let issued = self.issued.fetch_add(1, Ordering::Relaxed);
        let handle = ClientHandle::new(NonZeroU64::MIN.saturating_add(issued));
        self.clients.insert(handle, client);

        tracing::debug!(
            "Registered engine client {} (total: {})",
            handle,
            self.clients.len()
        );
        handle
    }

    /// Look up a client.
    pub fn get(&self, handle: ClientHandle) -> Option<Arc<dyn EngineClient>> {
        self.clients.get(&handle).map(|entry| Arc::clone(entry.value()))
    }

    /// Look up a client by the raw value a caller passed. Zero resolves to nothing.
    pub fn resolve(&self, raw: u64) -> Option<Arc<dyn EngineClient>> {
        ClientHandle::from_raw(raw).and_then(|handle| self.get(handle))
    }

    /// Drop a client from the registry.
    ///
    /// Sessions already opened from it keep their own references.
    pub fn remove(&self, handle: ClientHandle) -> Option<Arc<dyn EngineClient>> {
        self.clients.remove(&handle).map(|(_, client)| client)
    }

    /// Number of registered clients.
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Whether no client is registered.
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
