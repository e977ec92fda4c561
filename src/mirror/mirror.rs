//! # Realtime Mirror
//!
//! A local copy of one remote collection kept live by its change feed.
//!
//! ## Initialization order
//!
//! 1. Subscribe. Events start buffering on the feed immediately.
//! 2. Fetch the full collection together with its watermark.
//! 3. Install the fetched rows and go live; `on_change` sees that snapshot.
//! 4. Start the pump, which drains the feed in delivery order. Buffered
//!    events with `sequence <= watermark` are already reflected by the fetch
//!    and are skipped. Sequence `0` marks an unsequenced event and is never
//!    skipped; upsert/delete by id keeps it idempotent.
//!
//! ## Teardown
//!
//! Teardown bumps a generation counter under the state lock. The pump and
//! any in-flight initialize compare generations before touching state, so
//! events that slip through after teardown are ignored and the mirror stays
//! empty. The generation is checked again right before every `on_change`
//! call, so a snapshot taken before teardown is dropped rather than
//! delivered. A callback that is already running when `teardown` is called
//! may still finish after it returns.

use std::cmp::Ordering;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::cache::MirrorCache;
use super::config::MirrorConfig;
use super::errors::{MirrorError, MirrorResult};
use super::mutation::{Mutation, MutationOutcome};
use super::state::MirrorState;
use crate::observability::{log_event, Event, MirrorMetrics, MirrorMetricsSnapshot};
use crate::realtime::{ChangeEvent, ChangeFeed};
use crate::record::{Record, RecordId};
use crate::remote::{RemoteError, RemoteResult, RemoteStore};

/// Callback receiving the full snapshot after every observed change
pub type OnChange<R> = Arc<dyn Fn(&[R]) + Send + Sync>;

/// State shared between the mirror handle and its pump task
struct Shared<R> {
    collection: String,
    core: RwLock<Core<R>>,
    metrics: MirrorMetrics,
}

struct Core<R> {
    state: MirrorState,
    cache: MirrorCache<R>,
    watermark: u64,
    generation: u64,
    subscription_id: Option<String>,
    pump: Option<JoinHandle<()>>,
}

impl<R: Record> Shared<R> {
    fn read(&self) -> RwLockReadGuard<'_, Core<R>> {
        self.core.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Core<R>> {
        self.core.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, on_change: &OnChange<R>, snapshot: &[R]) {
        self.metrics.increment_snapshots_emitted();
        on_change(snapshot);
    }

    /// Emit only if no teardown happened since `generation` was taken
    fn emit_current(&self, on_change: &OnChange<R>, snapshot: &[R], generation: u64) -> bool {
        if self.read().generation != generation {
            return false;
        }
        self.emit(on_change, snapshot);
        true
    }

    /// Apply one event. Returns the new snapshot if the event was applied.
    fn apply_event(&self, event: &ChangeEvent, generation: u64) -> Option<Vec<R>> {
        let sequence = event.sequence.to_string();
        let event_type = event.event_type().to_string();
        let fields = [
            ("collection", self.collection.as_str()),
            ("sequence", sequence.as_str()),
            ("type", event_type.as_str()),
        ];

        let mut core = self.write();
        if core.generation != generation || core.state != MirrorState::Live {
            self.metrics.increment_events_ignored();
            log_event(Event::ChangeIgnored, &fields);
            return None;
        }
        if event.sequence != 0 && event.sequence <= core.watermark {
            self.metrics.increment_events_stale();
            log_event(Event::ChangeStale, &fields);
            return None;
        }

        match core.cache.apply(&event.change) {
            Ok(_) => {
                self.metrics.increment_events_applied();
                log_event(Event::ChangeApplied, &fields);
                Some(core.cache.snapshot())
            }
            Err(e) => {
                self.metrics.increment_decode_failures();
                let reason = e.to_string();
                log_event(
                    Event::DecodeFailed,
                    &[
                        ("collection", self.collection.as_str()),
                        ("sequence", sequence.as_str()),
                        ("reason", reason.as_str()),
                    ],
                );
                None
            }
        }
    }
}

/// Drain a feed into the mirror until the publisher goes away or the task
/// is aborted by teardown.
async fn pump<R: Record>(shared: Arc<Shared<R>>, mut feed: ChangeFeed, on_change: OnChange<R>, generation: u64) {
    while let Some(event) = feed.recv().await {
        if let Some(snapshot) = shared.apply_event(&event, generation) {
            if !shared.emit_current(&on_change, &snapshot, generation) {
                return;
            }
        }
    }

    if shared.read().generation == generation {
        log_event(
            Event::FeedClosed,
            &[("collection", shared.collection.as_str()), ("subscription", feed.subscription_id())],
        );
    }
}

async fn bounded<T>(limit: Duration, request: impl Future<Output = RemoteResult<T>>) -> RemoteResult<T> {
    tokio::time::timeout(limit, request)
        .await
        .unwrap_or_else(|_| Err(RemoteError::Timeout(limit)))
}

/// Client-side mirror of one remote collection
pub struct RealtimeMirror<R: Record> {
    collection: String,
    remote: Arc<dyn RemoteStore>,
    config: MirrorConfig,
    shared: Arc<Shared<R>>,
    init_gate: Mutex<()>,
}

impl<R: Record> RealtimeMirror<R> {
    /// Create an empty, uninitialized mirror with default configuration
    pub fn new(remote: Arc<dyn RemoteStore>, collection: impl Into<String>) -> Self {
        let collection = collection.into();
        Self {
            shared: Arc::new(Shared {
                collection: collection.clone(),
                core: RwLock::new(Core {
                    state: MirrorState::Uninitialized,
                    cache: MirrorCache::new(),
                    watermark: 0,
                    generation: 0,
                    subscription_id: None,
                    pump: None,
                }),
                metrics: MirrorMetrics::new(),
            }),
            collection,
            remote,
            config: MirrorConfig::default(),
            init_gate: Mutex::new(()),
        }
    }

    /// Create a mirror with an explicit configuration
    pub fn with_config(
        remote: Arc<dyn RemoteStore>,
        collection: impl Into<String>,
        config: MirrorConfig,
    ) -> MirrorResult<Self> {
        config.validate()?;
        let mut mirror = Self::new(remote, collection);
        mirror.config = config;
        Ok(mirror)
    }

    /// Mirrored collection
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Active configuration
    pub fn config(&self) -> &MirrorConfig {
        &self.config
    }

    /// Current lifecycle state
    pub fn state(&self) -> MirrorState {
        self.shared.read().state
    }

    /// Sequence of the last change reflected by the initial fetch
    pub fn watermark(&self) -> u64 {
        self.shared.read().watermark
    }

    /// Counters for this mirror
    pub fn metrics(&self) -> MirrorMetricsSnapshot {
        self.shared.metrics.snapshot()
    }

    /// Populate the mirror and follow the change feed.
    ///
    /// Concurrent calls are serialized. On a live mirror this only invokes
    /// `on_change` once with the current snapshot. On failure `on_change`
    /// receives an empty slice and the error is returned; nothing is retried.
    pub async fn initialize<F>(&self, on_change: F) -> MirrorResult<()>
    where
        F: Fn(&[R]) + Send + Sync + 'static,
    {
        let on_change: OnChange<R> = Arc::new(on_change);
        let _gate = self.init_gate.lock().await;
        let collection = self.collection.as_str();

        let generation = {
            let mut core = self.shared.write();
            if core.state == MirrorState::Live {
                let snapshot = core.cache.snapshot();
                drop(core);
                log_event(Event::InitReentry, &[("collection", collection)]);
                self.shared.emit(&on_change, &snapshot);
                return Ok(());
            }
            core.state = MirrorState::Initializing;
            core.generation
        };
        log_event(Event::InitStart, &[("collection", collection)]);

        let feed = match bounded(self.config.fetch_timeout(), self.remote.subscribe(collection)).await {
            Ok(feed) => feed,
            Err(source) => {
                self.reset_after_failure(generation);
                let reason = source.to_string();
                log_event(Event::FeedOpenFailed, &[("collection", collection), ("error", reason.as_str())]);
                self.shared.emit(&on_change, &[]);
                return Err(MirrorError::Subscribe {
                    collection: self.collection.clone(),
                    source,
                });
            }
        };
        log_event(
            Event::FeedOpened,
            &[("collection", collection), ("subscription", feed.subscription_id())],
        );

        let fetched = match bounded(self.config.fetch_timeout(), self.remote.fetch_all(collection)).await {
            Ok(fetched) => fetched,
            Err(source) => {
                self.close_feed(feed.subscription_id());
                self.reset_after_failure(generation);
                self.shared.metrics.increment_fetch_failures();
                let reason = source.to_string();
                log_event(Event::FetchFailed, &[("collection", collection), ("error", reason.as_str())]);
                self.shared.emit(&on_change, &[]);
                return Err(MirrorError::Fetch {
                    collection: self.collection.clone(),
                    source,
                });
            }
        };

        let mut records = Vec::with_capacity(fetched.rows.len());
        for row in fetched.rows {
            match R::decode(row) {
                Ok(record) => records.push(record),
                Err(e) => {
                    self.shared.metrics.increment_decode_failures();
                    let reason = e.to_string();
                    log_event(Event::DecodeFailed, &[("collection", collection), ("reason", reason.as_str())]);
                }
            }
        }

        let snapshot = {
            let mut core = self.shared.write();
            if core.generation != generation {
                drop(core);
                self.close_feed(feed.subscription_id());
                log_event(Event::InitCancelled, &[("collection", collection)]);
                return Err(MirrorError::Cancelled);
            }
            core.cache.replace_all(records);
            core.watermark = fetched.watermark;
            core.state = MirrorState::Live;
            core.subscription_id = Some(feed.subscription_id().to_string());
            core.cache.snapshot()
        };

        self.shared.metrics.increment_initializations();
        let count = snapshot.len().to_string();
        let watermark = fetched.watermark.to_string();
        log_event(
            Event::Live,
            &[
                ("collection", collection),
                ("records", count.as_str()),
                ("watermark", watermark.as_str()),
            ],
        );
        if !self.shared.emit_current(&on_change, &snapshot, generation) {
            log_event(Event::InitCancelled, &[("collection", collection)]);
            return Err(MirrorError::Cancelled);
        }

        let handle = tokio::spawn(pump(Arc::clone(&self.shared), feed, on_change, generation));
        let mut core = self.shared.write();
        if core.generation == generation {
            core.pump = Some(handle);
        } else {
            handle.abort();
        }
        Ok(())
    }

    /// Submit a mutation to the remote store.
    ///
    /// The mirror is not updated here; it changes when the matching change
    /// event arrives.
    pub async fn mutate(&self, mutation: Mutation) -> MirrorResult<MutationOutcome> {
        let mutation = mutation.normalized()?;
        let kind = mutation.kind();

        if self.config.strict_local_lookup {
            if let Some(id) = mutation.target() {
                let core = self.shared.read();
                if core.state == MirrorState::Live && !core.cache.contains(id) {
                    return Err(MirrorError::NotFoundLocally(id.clone()));
                }
            }
        }

        let operation = kind.to_string();
        let collection = self.collection.as_str();
        self.shared.metrics.increment_mutations_submitted();
        log_event(
            Event::MutationSubmitted,
            &[("collection", collection), ("operation", operation.as_str())],
        );

        let limit = self.config.mutation_timeout();
        let result = match mutation {
            Mutation::Insert(fields) => bounded(limit, self.remote.insert(collection, fields))
                .await
                .map(MutationOutcome::Inserted),
            Mutation::Update { id, fields } => bounded(limit, self.remote.update(collection, &id, fields))
                .await
                .map(|_| MutationOutcome::Updated),
            Mutation::Delete(id) => bounded(limit, self.remote.delete(collection, &id))
                .await
                .map(|_| MutationOutcome::Deleted),
            Mutation::DeleteAll => bounded(limit, self.remote.delete_all(collection))
                .await
                .map(MutationOutcome::Cleared),
        };

        match result {
            Ok(outcome) => {
                log_event(
                    Event::MutationAccepted,
                    &[("collection", collection), ("operation", operation.as_str())],
                );
                Ok(outcome)
            }
            Err(source) => {
                self.shared.metrics.increment_mutations_rejected();
                let reason = source.to_string();
                log_event(
                    Event::MutationRejected,
                    &[
                        ("collection", collection),
                        ("error", reason.as_str()),
                        ("operation", operation.as_str()),
                    ],
                );
                Err(MirrorError::RemoteWrite {
                    operation: kind,
                    source,
                })
            }
        }
    }

    /// Insert a record; returns the id the remote assigned
    pub async fn insert(&self, fields: Value) -> MirrorResult<RecordId> {
        match self.mutate(Mutation::Insert(fields)).await? {
            MutationOutcome::Inserted(id) => Ok(id),
            other => Err(MirrorError::InvalidPayload(format!("unexpected outcome {:?}", other))),
        }
    }

    /// Merge `fields` onto a record
    pub async fn update(&self, id: RecordId, fields: Value) -> MirrorResult<()> {
        self.mutate(Mutation::Update { id, fields }).await.map(|_| ())
    }

    /// Delete a record
    pub async fn delete(&self, id: RecordId) -> MirrorResult<()> {
        self.mutate(Mutation::Delete(id)).await.map(|_| ())
    }

    /// Delete every record; returns the count the remote removed
    pub async fn delete_all(&self) -> MirrorResult<u64> {
        match self.mutate(Mutation::DeleteAll).await? {
            MutationOutcome::Cleared(count) => Ok(count),
            other => Err(MirrorError::InvalidPayload(format!("unexpected outcome {:?}", other))),
        }
    }

    /// Current records in insertion order
    pub fn snapshot(&self) -> Vec<R> {
        self.shared.read().cache.snapshot()
    }

    /// Current records sorted by `compare`
    pub fn snapshot_sorted_by<F>(&self, compare: F) -> Vec<R>
    where
        F: FnMut(&R, &R) -> Ordering,
    {
        let mut records = self.snapshot();
        records.sort_by(compare);
        records
    }

    /// Look up one record
    pub fn get(&self, id: &RecordId) -> Option<R> {
        self.shared.read().cache.get(id).cloned()
    }

    /// Number of mirrored records
    pub fn len(&self) -> usize {
        self.shared.read().cache.len()
    }

    /// Whether the mirror holds no records
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop following the feed and clear the mirror.
    ///
    /// Idempotent. A mirror that was never initialized stays `Uninitialized`.
    /// In-flight mutations are not cancelled.
    pub fn teardown(&self) {
        let (previous, pump, subscription_id) = {
            let mut core = self.shared.write();
            let previous = core.state;
            core.generation += 1;
            core.cache.clear();
            core.watermark = 0;
            if previous != MirrorState::Uninitialized {
                core.state = MirrorState::TornDown;
            }
            (previous, core.pump.take(), core.subscription_id.take())
        };

        if let Some(pump) = pump {
            pump.abort();
        }
        if let Some(subscription_id) = subscription_id {
            self.close_feed(&subscription_id);
        }
        if matches!(previous, MirrorState::Live | MirrorState::Initializing) {
            log_event(
                Event::Teardown,
                &[("collection", self.collection.as_str()), ("previous", previous.as_str())],
            );
        }
    }

    fn reset_after_failure(&self, generation: u64) {
        let mut core = self.shared.write();
        if core.generation == generation {
            core.state = MirrorState::Uninitialized;
        }
    }

    fn close_feed(&self, subscription_id: &str) {
        if let Err(e) = self.remote.unsubscribe(subscription_id) {
            let reason = e.to_string();
            log_event(
                Event::FeedCloseFailed,
                &[
                    ("collection", self.collection.as_str()),
                    ("error", reason.as_str()),
                    ("subscription", subscription_id),
                ],
            );
        }
    }
}

impl<R: Record> Drop for RealtimeMirror<R> {
    fn drop(&mut self) {
        self.teardown();
    }
}
