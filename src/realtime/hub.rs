//! # Change Hub
//!
//! In-process change-feed fan-out used by the bundled stores.
//!
//! The hub assigns commit sequence numbers and delivers every event to all
//! subscribers of its collection. Callers that need `watermark()` to be
//! consistent with their data must publish while holding their own write lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use tokio::sync::mpsc;
use uuid::Uuid;

use super::errors::{RealtimeError, RealtimeResult};
use super::event::{Change, ChangeEvent};

/// Event sender for a subscription
pub type EventSender = mpsc::UnboundedSender<ChangeEvent>;

/// Event receiver for a subscription
pub type EventReceiver = mpsc::UnboundedReceiver<ChangeEvent>;

/// Configuration for the hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Maximum live subscriptions per collection
    pub max_subscriptions_per_collection: usize,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            max_subscriptions_per_collection: 100,
        }
    }
}

/// Receiving end of one collection subscription.
#[derive(Debug)]
pub struct ChangeFeed {
    subscription_id: String,
    collection: String,
    receiver: EventReceiver,
}

impl ChangeFeed {
    /// Wrap a receiver. Stores that bring their own transport use this.
    pub fn new(subscription_id: impl Into<String>, collection: impl Into<String>, receiver: EventReceiver) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            collection: collection.into(),
            receiver,
        }
    }

    /// Id to pass to `unsubscribe`
    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    /// Subscribed collection
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Wait for the next event. `None` once the publisher is gone.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.recv().await
    }

    /// Take an already-delivered event without waiting
    pub fn try_recv(&mut self) -> Option<ChangeEvent> {
        self.receiver.try_recv().ok()
    }
}

/// Result of dispatching an event
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchResult {
    /// Number of subscriptions on the collection
    pub matched: usize,
    /// Number of events delivered
    pub delivered: usize,
    /// Number of subscriptions whose receiver was gone
    pub failed: usize,
}

/// Sequencing fan-out of change events
#[derive(Debug)]
pub struct ChangeHub {
    config: HubConfig,

    /// Last assigned sequence number (0 = nothing published yet)
    last_sequence: AtomicU64,

    /// Senders by collection, then by subscription id
    subscribers: RwLock<HashMap<String, HashMap<String, EventSender>>>,
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl ChangeHub {
    /// Create a new hub
    pub fn new(config: HubConfig) -> Self {
        Self {
            config,
            last_sequence: AtomicU64::new(0),
            subscribers: RwLock::new(HashMap::new()),
        }
    }

    /// Sequence of the most recently published event
    pub fn watermark(&self) -> u64 {
        self.last_sequence.load(Ordering::Acquire)
    }

    /// Open a subscription on a collection
    pub fn subscribe(&self, collection: &str) -> RealtimeResult<ChangeFeed> {
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|_| RealtimeError::Internal("Lock poisoned".into()))?;

        let subs = subscribers.entry(collection.to_string()).or_default();
        if subs.len() >= self.config.max_subscriptions_per_collection {
            return Err(RealtimeError::TooManySubscriptions(
                self.config.max_subscriptions_per_collection,
            ));
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4().to_string();
        subs.insert(id.clone(), tx);

        Ok(ChangeFeed::new(id, collection, rx))
    }

    /// Close a subscription
    pub fn unsubscribe(&self, subscription_id: &str) -> RealtimeResult<()> {
        let mut subscribers = self
            .subscribers
            .write()
            .map_err(|_| RealtimeError::Internal("Lock poisoned".into()))?;

        for subs in subscribers.values_mut() {
            if subs.remove(subscription_id).is_some() {
                return Ok(());
            }
        }
        Err(RealtimeError::SubscriptionNotFound(subscription_id.to_string()))
    }

    /// Assign the next sequence number and deliver the change
    pub fn publish(&self, collection: &str, change: Change) -> (ChangeEvent, DispatchResult) {
        let sequence = self.last_sequence.fetch_add(1, Ordering::AcqRel) + 1;
        let event = ChangeEvent::new(sequence, collection, change);
        let result = self.dispatch(&event);
        (event, result)
    }

    /// Deliver an already-sequenced event to the collection's subscribers.
    ///
    /// Subscriptions whose receiver has been dropped are pruned.
    pub fn dispatch(&self, event: &ChangeEvent) -> DispatchResult {
        let mut result = DispatchResult::default();

        let Ok(mut subscribers) = self.subscribers.write() else {
            return result;
        };
        let Some(subs) = subscribers.get_mut(&event.collection) else {
            return result;
        };

        result.matched = subs.len();
        subs.retain(|_, sender| match sender.send(event.clone()) {
            Ok(()) => {
                result.delivered += 1;
                true
            }
            Err(_) => {
                result.failed += 1;
                false
            }
        });

        result
    }

    /// Number of live subscriptions on a collection
    pub fn subscriber_count(&self, collection: &str) -> usize {
        self.subscribers
            .read()
            .map(|s| s.get(collection).map(HashMap::len).unwrap_or(0))
            .unwrap_or(0)
    }
}
