//! # Stream registry: the id → context map.
//!
//! The registry is the only state shared between the control loop and caller
//! threads.
//!
//! ## Rules
//! - Mutations (`insert`, `take`, `drain_all`) are crate-private and called
//!   only from the control loop, so every write is serialized by the action queue.
//! - Every critical section is a single map operation; no lock is held across
//!   a worker start, join or drain.
//! - Readers (`list`, `contains`, `get`) see a point-in-time view.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::error::StreamError;
use crate::stream::StreamContext;

/// Registry of live streams keyed by id.
#[derive(Default)]
pub struct Registry {
    streams: RwLock<HashMap<String, Arc<StreamContext>>>,
}

impl Registry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns sorted list of registered stream ids.
    pub async fn list(&self) -> Vec<String> {
        let streams = self.streams.read().await;
        let mut ids: Vec<String> = streams.keys().cloned().collect();
        ids.sort_unstable();
        ids
    }

    /// Returns true if `id` is registered.
    pub async fn contains(&self, id: &str) -> bool {
        self.streams.read().await.contains_key(id)
    }

    /// Returns the context registered under `id`.
    pub async fn get(&self, id: &str) -> Result<Arc<StreamContext>, StreamError> {
        self.streams
            .read()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| StreamError::UnknownStream { id: id.to_string() })
    }

    /// Returns the number of registered streams.
    pub async fn len(&self) -> usize {
        self.streams.read().await.len()
    }

    /// Returns true if no stream is registered.
    pub async fn is_empty(&self) -> bool {
        self.streams.read().await.is_empty()
    }

    /// Registers `ctx`; fails if the id is taken.
    pub(crate) async fn insert(&self, ctx: Arc<StreamContext>) -> Result<(), StreamError> {
        let mut streams = self.streams.write().await;
        if streams.contains_key(ctx.id()) {
            return Err(StreamError::DuplicateStream {
                id: ctx.id().to_string(),
            });
        }
        streams.insert(ctx.id().to_string(), ctx);
        Ok(())
    }

    /// Unregisters and returns the context under `id`.
    pub(crate) async fn take(&self, id: &str) -> Result<Arc<StreamContext>, StreamError> {
        self.streams
            .write()
            .await
            .remove(id)
            .ok_or_else(|| StreamError::UnknownStream { id: id.to_string() })
    }

    /// Copies every entry out, sorted by id; the map is left untouched.
    pub(crate) async fn snapshot(&self) -> Vec<(String, Arc<StreamContext>)> {
        let streams = self.streams.read().await;
        let mut all: Vec<_> = streams
            .iter()
            .map(|(id, ctx)| (id.clone(), Arc::clone(ctx)))
            .collect();
        all.sort_unstable_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Unregisters every stream and returns them.
    pub(crate) async fn drain_all(&self) -> Vec<(String, Arc<StreamContext>)> {
        let mut streams = self.streams.write().await;
        streams.drain().collect()
    }
}
