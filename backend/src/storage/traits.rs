//! # Storage Traits
//!
//! The state container talks to exactly one `PersistenceBackend` at a time.
//! Two implementations exist: the local-storage backend (no identity) and the
//! cloud backend (identity present). The state manager selects one at session
//! start and swaps it atomically when the identity changes.
//!
//! Backends feed the state container through an explicit event stream
//! (`StateEvent`). The local backend hands over its whole state at attach time
//! and applies mutations synchronously; the cloud backend only writes to the
//! remote store and lets live subscriptions deliver the authoritative value.

use anyhow::Result;
use async_trait::async_trait;
use shared::PersistenceMode;
use std::fmt;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::domain::models::{AppData, BenefitSettings, Merchant, Purchase};
use crate::domain::state::Mutation;

/// The three synchronized collections
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Settings,
    Purchases,
    Merchants,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Settings, Collection::Purchases, Collection::Merchants];

    /// Collection name in the remote document store
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Settings => "settings",
            Collection::Purchases => "purchases",
            Collection::Merchants => "merchants",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Update delivered from a backend to the state container.
///
/// Collection events carry the full, authoritative content of the collection;
/// applying them in delivery order gives last-write-wins per document.
#[derive(Debug, Clone, PartialEq)]
pub enum StateEvent {
    /// `None` when the remote settings document does not exist yet
    SettingsChanged(Option<BenefitSettings>),
    PurchasesChanged(Vec<Purchase>),
    MerchantsChanged(Vec<Merchant>),
    SubscriptionFailed { collection: Collection, reason: String },
}

pub type EventSink = mpsc::UnboundedSender<StateEvent>;

/// Result of attaching a backend to the state container
pub struct Attachment {
    /// State available immediately (local backend); `None` when the state will
    /// arrive through the event stream
    pub initial: Option<AppData>,
    pub subscription: Subscription,
}

/// What a commit did to the in-memory state
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    /// Mutation applied synchronously; this is the new state
    Applied(AppData),
    /// Mutation written remotely; the subscription will deliver the new state
    AwaitingSync,
}

#[async_trait]
pub trait PersistenceBackend: Send + Sync {
    fn mode(&self) -> PersistenceMode;

    /// Start feeding the state container. Fails when live updates cannot be
    /// established (permission or connectivity).
    async fn attach(&self, sink: EventSink) -> Result<Attachment>;

    /// Persist a mutation. `current` is the state the mutation applies to.
    async fn commit(&self, mutation: &Mutation, current: &AppData) -> Result<CommitOutcome>;
}

/// Live listeners and forwarding tasks of one session.
///
/// Cancelling (or dropping) runs every teardown hook and aborts every task, so
/// no callback from a previous identity can reach the state container.
#[derive(Default)]
pub struct Subscription {
    teardowns: Vec<Box<dyn FnOnce() + Send>>,
    tasks: Vec<JoinHandle<()>>,
}

impl Subscription {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn on_teardown(&mut self, teardown: impl FnOnce() + Send + 'static) {
        self.teardowns.push(Box::new(teardown));
    }

    pub fn track(&mut self, task: JoinHandle<()>) {
        self.tasks.push(task);
    }

    pub fn is_active(&self) -> bool {
        !self.teardowns.is_empty() || !self.tasks.is_empty()
    }

    pub fn cancel(&mut self) {
        for teardown in self.teardowns.drain(..) {
            teardown();
        }
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_cancel_runs_teardowns_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut subscription = Subscription::none();
        assert!(!subscription.is_active());

        let counter = calls.clone();
        subscription.on_teardown(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        subscription.track(tokio::spawn(std::future::pending::<()>()));
        assert!(subscription.is_active());

        subscription.cancel();
        drop(subscription);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_aborts_tasks() {
        let (tx, mut rx) = mpsc::unbounded_channel::<()>();
        let mut subscription = Subscription::none();
        subscription.track(tokio::spawn(async move {
            let _keep = tx;
            std::future::pending::<()>().await;
        }));

        drop(subscription);
        // The aborted task drops its sender, closing the channel.
        assert!(rx.recv().await.is_none());
    }
}
