//! Two-level telemetry store port
//!
//! The store is an ordered key-value tree: outer keys are date buckets and
//! inner keys are times of day, both sortable lexicographically by recency.
//! Leaves are raw device sample documents.

pub mod memory;
pub mod snapshot;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

pub use memory::MemoryStore;

/// A keyed child of a store level
#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    pub key: String,
    pub value: Value,
}

/// Callback receiving the last child of a watched level (`None` when empty)
pub type Listener = Arc<dyn Fn(Option<Child>) + Send + Sync>;

/// Live watch on a store level; cancelling is idempotent and happens on drop
pub struct WatchHandle {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl WatchHandle {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }

    pub fn is_active(&self) -> bool {
        self.cancel.is_some()
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.is_active())
            .finish()
    }
}

/// Port onto the backing time-series store
#[async_trait]
pub trait TelemetryStore: Send + Sync + 'static {
    /// Watch the last child of the outer level (`bucket == None`) or of one bucket
    ///
    /// The listener fires with the current last child on registration and
    /// whenever that child's key or value changes. On the outer level only the
    /// bucket key is tracked and delivered; the child's value is `Null`.
    fn watch_last(&self, bucket: Option<&str>, listener: Listener) -> WatchHandle;

    /// One-shot read of up to `limit` last children of a bucket (all when `None`)
    async fn fetch_last(
        &self,
        bucket: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Child>, StoreError>;
}
