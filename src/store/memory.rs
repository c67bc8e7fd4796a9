/// In-process implementation of the telemetry store port
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use async_trait::async_trait;
use log::debug;
use serde_json::Value;

use super::{Child, Listener, TelemetryStore, WatchHandle};
use crate::error::StoreError;

/// Date bucket -> time-of-day key -> raw sample
pub type Tree = BTreeMap<String, BTreeMap<String, Value>>;

struct Watcher {
    bucket: Option<String>,
    listener: Listener,
    last: Option<Child>,
}

#[derive(Default)]
struct State {
    tree: Tree,
    watchers: HashMap<u64, Watcher>,
    next_id: u64,
    cancelled: usize,
    unavailable: Option<String>,
}

impl State {
    fn last_child(&self, bucket: Option<&str>) -> Option<Child> {
        match bucket {
            None => self.tree.keys().next_back().map(|key| Child {
                key: key.clone(),
                value: Value::Null,
            }),
            Some(bucket) => self
                .tree
                .get(bucket)
                .and_then(|samples| samples.last_key_value())
                .map(|(key, value)| Child {
                    key: key.clone(),
                    value: value.clone(),
                }),
        }
    }
}

/// Ordered in-memory store with live watches
///
/// Listeners are called outside the state lock, one delivery batch at a time,
/// so they observe changes in order. Listeners must not register new watches
/// from inside a callback.
#[derive(Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
    delivery: Arc<Mutex<()>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite one sample and notify affected watchers
    pub fn insert(&self, bucket: &str, key: &str, sample: Value) {
        self.mutate(|tree| {
            tree.entry(bucket.to_string())
                .or_default()
                .insert(key.to_string(), sample);
        });
    }

    /// Replace the whole tree, e.g. after reloading a snapshot
    pub fn replace_all(&self, tree: Tree) {
        self.mutate(move |current| *current = tree);
    }

    pub fn remove_bucket(&self, bucket: &str) {
        self.mutate(|tree| {
            tree.remove(bucket);
        });
    }

    /// Make one-shot fetches fail until cleared with `None`
    pub fn set_unavailable(&self, reason: Option<&str>) {
        lock(&self.state).unavailable = reason.map(str::to_string);
    }

    /// Most recent date bucket, if any
    pub fn last_bucket(&self) -> Option<String> {
        lock(&self.state).tree.keys().next_back().cloned()
    }

    /// Number of live watches on a level
    pub fn active_watchers(&self, bucket: Option<&str>) -> usize {
        lock(&self.state)
            .watchers
            .values()
            .filter(|w| w.bucket.as_deref() == bucket)
            .count()
    }

    /// Number of watches torn down so far
    pub fn cancelled_watchers(&self) -> usize {
        lock(&self.state).cancelled
    }

    fn mutate(&self, change: impl FnOnce(&mut Tree)) {
        let _delivery = lock(&self.delivery);

        let pending = {
            let mut state = lock(&self.state);
            change(&mut state.tree);

            let mut updates = Vec::new();
            for id in state.watchers.keys().copied().collect::<Vec<_>>() {
                let bucket = state.watchers[&id].bucket.clone();
                let current = state.last_child(bucket.as_deref());
                if let Some(watcher) = state.watchers.get_mut(&id) {
                    if watcher.last != current {
                        watcher.last = current.clone();
                        updates.push((watcher.listener.clone(), current));
                    }
                }
            }
            updates
        };

        for (listener, child) in pending {
            listener(child);
        }
    }
}

#[async_trait]
impl TelemetryStore for MemoryStore {
    fn watch_last(&self, bucket: Option<&str>, listener: Listener) -> WatchHandle {
        let _delivery = lock(&self.delivery);

        let (id, current) = {
            let mut state = lock(&self.state);
            let id = state.next_id;
            state.next_id += 1;
            let current = state.last_child(bucket);
            state.watchers.insert(
                id,
                Watcher {
                    bucket: bucket.map(str::to_string),
                    listener: listener.clone(),
                    last: current.clone(),
                },
            );
            (id, current)
        };
        debug!("Watch {} registered on {:?}", id, bucket);

        listener(current);

        let state: Weak<Mutex<State>> = Arc::downgrade(&self.state);
        WatchHandle::new(move || {
            if let Some(state) = state.upgrade() {
                let mut state = lock(&state);
                if state.watchers.remove(&id).is_some() {
                    state.cancelled += 1;
                    debug!("Watch {} cancelled", id);
                }
            }
        })
    }

    async fn fetch_last(
        &self,
        bucket: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Child>, StoreError> {
        let state = lock(&self.state);
        if let Some(reason) = &state.unavailable {
            return Err(StoreError::Unavailable(reason.clone()));
        }

        let Some(samples) = state.tree.get(bucket) else {
            return Ok(Vec::new());
        };
        let skip = limit.map_or(0, |limit| samples.len().saturating_sub(limit));
        Ok(samples
            .iter()
            .skip(skip)
            .map(|(key, value)| Child {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }
}
