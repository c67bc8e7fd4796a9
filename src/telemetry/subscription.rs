//! Live "latest reading" feed over the two-level store
//!
//! The outer level (date buckets) is watched for its last key. Each time that
//! key changes the inner watch is torn down first and then re-established on
//! the new bucket, so at most one inner watch is ever live. Store listeners
//! only post [`FeedEvent`]s into a channel; a single task owns the
//! [`FeedMachine`] and applies them one at a time.
//!
//! Inner emissions are tagged with the generation of the watch that produced
//! them. A callback from a predecessor watch that was already in flight when
//! the rewire happened is dropped instead of being reported as current.

use std::sync::Arc;

use log::{debug, info};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::decoder::{decode_value, key_timestamp};
use crate::models::SensorReading;
use crate::store::{Child, Listener, TelemetryStore, WatchHandle};

/// Lifecycle of the feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    OuterActive,
    RewiringInner,
    Disposed,
}

/// Store notifications and control messages, applied in arrival order
#[derive(Debug)]
pub enum FeedEvent {
    Outer(Option<String>),
    Inner { generation: u64, child: Option<Child> },
    Dispose,
}

pub type UpdateCallback = Box<dyn FnMut(SensorReading) + Send>;
pub type LoadingCallback = Box<dyn FnMut(bool) + Send>;

/// Outer/inner watch state machine
///
/// Not thread-safe on its own; confine it to one task.
pub struct FeedMachine<S: TelemetryStore> {
    store: Arc<S>,
    events: mpsc::UnboundedSender<FeedEvent>,
    phase: Phase,
    outer: Option<WatchHandle>,
    inner: Option<WatchHandle>,
    bucket: Option<String>,
    generation: u64,
    loading: bool,
    on_update: UpdateCallback,
    on_loading: LoadingCallback,
}

impl<S: TelemetryStore> FeedMachine<S> {
    pub fn new(
        store: Arc<S>,
        events: mpsc::UnboundedSender<FeedEvent>,
        on_update: UpdateCallback,
        on_loading: LoadingCallback,
    ) -> Self {
        Self {
            store,
            events,
            phase: Phase::Idle,
            outer: None,
            inner: None,
            bucket: None,
            generation: 0,
            loading: false,
            on_update,
            on_loading,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn bucket(&self) -> Option<&str> {
        self.bucket.as_deref()
    }

    pub fn has_inner(&self) -> bool {
        self.inner.is_some()
    }

    /// Idle -> OuterActive: watch the last date bucket
    pub fn start(&mut self) {
        if self.phase != Phase::Idle {
            return;
        }
        self.set_loading(true);
        self.phase = Phase::OuterActive;

        let events = self.events.clone();
        let listener: Listener = Arc::new(move |child: Option<Child>| {
            let _ = events.send(FeedEvent::Outer(child.map(|c| c.key)));
        });
        self.outer = Some(self.store.watch_last(None, listener));
        debug!("Outer watch established");
    }

    /// Apply one event; returns false once the feed is disposed
    pub fn handle(&mut self, event: FeedEvent) -> bool {
        if self.phase == Phase::Disposed {
            return false;
        }
        match event {
            FeedEvent::Outer(Some(bucket)) => self.on_outer_key(bucket),
            FeedEvent::Outer(None) => self.on_outer_empty(),
            FeedEvent::Inner { generation, child } => self.on_inner(generation, child),
            FeedEvent::Dispose => self.dispose(),
        }
        self.phase != Phase::Disposed
    }

    fn on_outer_key(&mut self, bucket: String) {
        if self.inner.is_some() && self.bucket.as_deref() == Some(bucket.as_str()) {
            return;
        }

        self.phase = Phase::RewiringInner;
        if let Some(mut previous) = self.inner.take() {
            previous.cancel();
            debug!(
                "Inner watch generation {} on {:?} torn down",
                self.generation, self.bucket
            );
        }

        self.generation += 1;
        let generation = self.generation;
        let events = self.events.clone();
        let listener: Listener = Arc::new(move |child: Option<Child>| {
            let _ = events.send(FeedEvent::Inner { generation, child });
        });

        info!("Following date bucket {}", bucket);
        self.inner = Some(self.store.watch_last(Some(bucket.as_str()), listener));
        self.bucket = Some(bucket);
        self.phase = Phase::OuterActive;
    }

    fn on_outer_empty(&mut self) {
        if let Some(mut previous) = self.inner.take() {
            previous.cancel();
        }
        self.bucket = None;
        debug!("Store has no date buckets");
        self.set_loading(false);
    }

    fn on_inner(&mut self, generation: u64, child: Option<Child>) {
        if generation != self.generation || self.inner.is_none() {
            debug!(
                "Dropping emission from stale inner watch {} (current {})",
                generation, self.generation
            );
            return;
        }
        let Some(child) = child else {
            return;
        };

        let fallback = match self.bucket.as_deref() {
            Some(bucket) => key_timestamp(bucket, &child.key),
            None => child.key.clone(),
        };
        let reading = decode_value(&child.value, &fallback);
        (self.on_update)(reading);
        self.set_loading(false);
    }

    /// Tear down both levels; safe to call repeatedly
    pub fn dispose(&mut self) {
        if self.phase == Phase::Disposed {
            return;
        }
        if let Some(mut inner) = self.inner.take() {
            inner.cancel();
        }
        if let Some(mut outer) = self.outer.take() {
            outer.cancel();
        }
        self.phase = Phase::Disposed;
        debug!("Feed disposed");
    }

    fn set_loading(&mut self, loading: bool) {
        if self.loading != loading {
            self.loading = loading;
            (self.on_loading)(loading);
        }
    }
}

/// Handle to a running latest-reading feed
pub struct LatestSubscription {
    control: mpsc::UnboundedSender<FeedEvent>,
    task: Option<JoinHandle<()>>,
}

impl LatestSubscription {
    /// Stop both watch levels; idempotent
    pub fn unsubscribe(&self) {
        let _ = self.control.send(FeedEvent::Dispose);
    }

    /// Wait until the feed task has torn everything down
    pub async fn closed(mut self) {
        self.unsubscribe();
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for LatestSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Follow the most recent reading in the store
///
/// Must be called from within a tokio runtime. `on_update` receives every
/// decoded reading as a full replacement of the previous one; `on_loading`
/// reports true until the first reading arrives or the store turns out to
/// be empty.
pub fn subscribe_latest<S, U, L>(store: Arc<S>, on_update: U, on_loading: L) -> LatestSubscription
where
    S: TelemetryStore,
    U: FnMut(SensorReading) + Send + 'static,
    L: FnMut(bool) + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel();
    let mut machine = FeedMachine::new(
        store,
        tx.clone(),
        Box::new(on_update),
        Box::new(on_loading),
    );

    let task = tokio::spawn(async move {
        machine.start();
        while let Some(event) = rx.recv().await {
            if !machine.handle(event) {
                break;
            }
        }
        machine.dispose();
    });

    LatestSubscription {
        control: tx,
        task: Some(task),
    }
}

/// Latest-reading feed exposed as watch channels
///
/// Watch receivers only ever hold the newest value, so a slow consumer skips
/// intermediate readings instead of queueing them.
pub struct LiveFeed {
    pub subscription: LatestSubscription,
    pub readings: watch::Receiver<Option<SensorReading>>,
    pub loading: watch::Receiver<bool>,
}

pub fn watch_latest<S: TelemetryStore>(store: Arc<S>) -> LiveFeed {
    let (reading_tx, readings) = watch::channel(None);
    let (loading_tx, loading) = watch::channel(true);

    let subscription = subscribe_latest(
        store,
        move |reading| {
            reading_tx.send_replace(Some(reading));
        },
        move |is_loading| {
            loading_tx.send_replace(is_loading);
        },
    );

    LiveFeed {
        subscription,
        readings,
        loading,
    }
}
