//! # State Manager
//!
//! Single owner of the live `AppData`. Selects the persistence backend from the
//! presence of an identity, swaps it on sign-in/sign-out and applies the
//! backend's event stream to the in-memory state.
//!
//! ## Sessions
//!
//! Every backend attachment is a session with its own epoch. Events carry the
//! epoch of the session that produced them and are dropped once a newer
//! session exists, so a listener that outlives its identity can never write
//! into the next identity's state.
//!
//! ## Locking
//!
//! `session` (async) serializes commits against session swaps. When both
//! `status` and `data` are needed they are taken in that order.

use anyhow::{anyhow, Result};
use log::{debug, error, info, warn};
use shared::PersistenceMode;
use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use super::mutation::Mutation;
use crate::domain::models::app_data::{sort_merchants, sort_purchases};
use crate::domain::models::{AppData, Identity};
use crate::domain::notifications::NotificationCenter;
use crate::storage::cloud::{CloudBackend, RemoteDocumentStore};
use crate::storage::local::{LocalBackend, LocalStateRepository};
use crate::storage::{Collection, CommitOutcome, PersistenceBackend, StateEvent, Subscription};

/// Point-in-time view of the live state
#[derive(Debug, Clone, PartialEq)]
pub struct StateSnapshot {
    pub data: AppData,
    pub mode: PersistenceMode,
    pub identity: Option<Identity>,
    /// False until every collection of the session delivered once
    pub ready: bool,
    pub sync_error: Option<String>,
}

struct SessionStatus {
    mode: PersistenceMode,
    identity: Option<Identity>,
    ready: bool,
    sync_error: Option<String>,
    received: HashSet<Collection>,
    epoch: u64,
}

struct ActiveSession {
    backend: Arc<dyn PersistenceBackend>,
    subscription: Subscription,
    consumer: Option<JoinHandle<()>>,
}

impl ActiveSession {
    fn teardown(mut self) {
        self.subscription.cancel();
        if let Some(consumer) = self.consumer.take() {
            consumer.abort();
        }
    }
}

struct Inner {
    data: RwLock<AppData>,
    status: Mutex<SessionStatus>,
    session: tokio::sync::Mutex<Option<ActiveSession>>,
    repository: LocalStateRepository,
    remote_store: Arc<dyn RemoteDocumentStore>,
    notifications: NotificationCenter,
    revision: watch::Sender<u64>,
    remote_timeout: Duration,
}

impl Inner {
    fn status(&self) -> MutexGuard<'_, SessionStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn replace_data(&self, mut data: AppData) {
        sort_purchases(&mut data.purchases);
        sort_merchants(&mut data.merchants);
        *self.data.write().unwrap_or_else(PoisonError::into_inner) = data;
    }

    fn bump_revision(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    /// Apply one backend event. Returns false when the session is gone.
    fn apply_event(&self, epoch: u64, event: StateEvent) -> bool {
        {
            let mut status = self.status();
            if status.epoch != epoch {
                debug!("Dropping event from stale session {} (current {})", epoch, status.epoch);
                return false;
            }

            let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
            match event {
                StateEvent::SettingsChanged(settings) => {
                    data.settings = settings.unwrap_or_default();
                    status.received.insert(Collection::Settings);
                }
                StateEvent::PurchasesChanged(mut purchases) => {
                    sort_purchases(&mut purchases);
                    data.purchases = purchases;
                    status.received.insert(Collection::Purchases);
                }
                StateEvent::MerchantsChanged(mut merchants) => {
                    sort_merchants(&mut merchants);
                    data.merchants = merchants;
                    status.received.insert(Collection::Merchants);
                }
                StateEvent::SubscriptionFailed { collection, reason } => {
                    error!("❌ Live sync of {} failed: {}", collection, reason);
                    let message = format!("Sync error on {}: {}", collection, reason);
                    status.sync_error = Some(message.clone());
                    self.notifications.persistent_error(message);
                }
            }

            if !status.ready && status.received.len() == Collection::ALL.len() {
                status.ready = true;
                info!("✅ Cloud state ready (session {})", epoch);
            }
        }
        self.bump_revision();
        true
    }
}

async fn consume_events(inner: Weak<Inner>, epoch: u64, mut events: mpsc::UnboundedReceiver<StateEvent>) {
    while let Some(event) = events.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        if !inner.apply_event(epoch, event) {
            break;
        }
    }
}

#[derive(Clone)]
pub struct StateManager {
    inner: Arc<Inner>,
}

impl StateManager {
    pub fn new(
        repository: LocalStateRepository,
        remote_store: Arc<dyn RemoteDocumentStore>,
        notifications: NotificationCenter,
        remote_timeout: Duration,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                data: RwLock::new(AppData::default()),
                status: Mutex::new(SessionStatus {
                    mode: PersistenceMode::Local,
                    identity: None,
                    ready: false,
                    sync_error: None,
                    received: HashSet::new(),
                    epoch: 0,
                }),
                session: tokio::sync::Mutex::new(None),
                repository,
                remote_store,
                notifications,
                revision,
                remote_timeout,
            }),
        }
    }

    /// Start-up: re-enter cloud mode when an identity was persisted, else local
    pub async fn restore_session(&self) -> Result<()> {
        match self.inner.repository.load_identity()? {
            Some(identity) => {
                info!("🔑 Restoring cloud session for {}", identity.email);
                self.switch_to_cloud(identity).await
            }
            None => self.start_local().await,
        }
    }

    /// Attach the local backend and load the persisted local state
    pub async fn start_local(&self) -> Result<()> {
        let backend = Arc::new(LocalBackend::new(self.inner.repository.clone()));
        self.attach(backend, None).await
    }

    /// Local -> Cloud. The local state stays on disk untouched.
    pub async fn sign_in(&self, identity: Identity) -> Result<()> {
        info!("🔑 Signing in {}", identity.email);
        self.inner.repository.save_identity(&identity)?;
        self.switch_to_cloud(identity).await
    }

    /// Cloud -> Local: detach live listeners and reload local storage
    pub async fn sign_out(&self) -> Result<()> {
        if let Some(identity) = self.identity() {
            info!("🔒 Signing out {}", identity.email);
        }
        self.inner.repository.clear_identity()?;
        self.start_local().await
    }

    async fn switch_to_cloud(&self, identity: Identity) -> Result<()> {
        let backend = Arc::new(CloudBackend::new(
            self.inner.remote_store.clone(),
            identity.clone(),
            self.inner.remote_timeout,
        ));
        self.attach(backend, Some(identity)).await
    }

    async fn attach(&self, backend: Arc<dyn PersistenceBackend>, identity: Option<Identity>) -> Result<()> {
        let mut session = self.inner.session.lock().await;
        if let Some(previous) = session.take() {
            previous.teardown();
        }

        let mode = backend.mode();
        let epoch = {
            let mut status = self.inner.status();
            status.epoch += 1;
            status.mode = mode;
            status.identity = identity;
            status.ready = false;
            status.sync_error = None;
            status.received.clear();
            status.epoch
        };
        self.inner.replace_data(AppData::default());
        self.inner.notifications.clear_persistent();
        self.inner.bump_revision();

        let (sink, events) = mpsc::unbounded_channel();
        let consumer = tokio::spawn(consume_events(Arc::downgrade(&self.inner), epoch, events));

        match backend.attach(sink).await {
            Ok(attachment) => {
                if let Some(initial) = attachment.initial {
                    self.inner.replace_data(initial);
                    self.inner.status().ready = true;
                    self.inner.bump_revision();
                }
                info!("🔌 Session {} attached in {} mode", epoch, mode);
                *session = Some(ActiveSession {
                    backend,
                    subscription: attachment.subscription,
                    consumer: Some(consumer),
                });
                Ok(())
            }
            Err(e) => {
                error!("❌ Could not attach {} session: {}", mode, e);
                let message = format!("Could not connect to {} storage: {}", mode, e);
                self.inner.status().sync_error = Some(message.clone());
                self.inner.notifications.persistent_error(message);
                self.inner.bump_revision();
                // Keep the backend so writes keep targeting this identity.
                *session = Some(ActiveSession {
                    backend,
                    subscription: Subscription::none(),
                    consumer: Some(consumer),
                });
                Err(e)
            }
        }
    }

    /// Persist a mutation through the active backend.
    ///
    /// Local sessions see the new state when this returns; cloud sessions see
    /// it once the subscription echoes it back.
    pub async fn commit(&self, mutation: Mutation) -> Result<()> {
        self.commit_with(move |_| Ok(Some(mutation))).await.map(|_| ())
    }

    /// Decide on a mutation against the current state while holding the
    /// session lock, then commit it.
    ///
    /// Returns false when `decide` chose not to write anything. An error from
    /// `decide` is returned unchanged and nothing is written.
    pub async fn commit_with<F>(&self, decide: F) -> Result<bool>
    where
        F: FnOnce(&AppData) -> Result<Option<Mutation>> + Send,
    {
        let session = self.inner.session.lock().await;
        let active = session.as_ref().ok_or_else(|| anyhow!("No active session"))?;

        let current = self.data();
        let Some(mutation) = decide(&current)? else {
            return Ok(false);
        };
        match active.backend.commit(&mutation, &current).await? {
            CommitOutcome::Applied(next) => {
                self.inner.replace_data(next);
                self.inner.bump_revision();
            }
            CommitOutcome::AwaitingSync => {
                debug!("Commit '{}' awaiting sync", mutation.label());
            }
        }
        Ok(true)
    }

    pub fn data(&self) -> AppData {
        self.inner
            .data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        let status = self.inner.status();
        let data = self.data();
        StateSnapshot {
            data,
            mode: status.mode,
            identity: status.identity.clone(),
            ready: status.ready,
            sync_error: status.sync_error.clone(),
        }
    }

    pub fn mode(&self) -> PersistenceMode {
        self.inner.status().mode
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.status().identity.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.inner.status().ready
    }

    /// Revision counter, bumped on every state or status change
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    /// Wait until `predicate` holds for the live state. Returns false on timeout.
    pub async fn wait_for(&self, timeout: Duration, predicate: impl Fn(&StateSnapshot) -> bool) -> bool {
        let mut changes = self.changes();
        let wait = async {
            loop {
                if predicate(&self.snapshot()) {
                    return true;
                }
                if changes.changed().await.is_err() {
                    return false;
                }
            }
        };
        match tokio::time::timeout(timeout, wait).await {
            Ok(reached) => reached,
            Err(_) => {
                warn!("⏱️ State did not reach the expected condition within {:?}", timeout);
                false
            }
        }
    }

    pub async fn wait_until_ready(&self, timeout: Duration) -> bool {
        self.wait_for(timeout, |s| s.ready).await
    }

    pub fn notifications(&self) -> &NotificationCenter {
        &self.inner.notifications
    }

    pub fn is_setup_complete(&self) -> Result<bool> {
        self.inner.repository.is_setup_complete()
    }

    pub fn mark_setup_complete(&self) -> Result<()> {
        self.inner.repository.mark_setup_complete()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{BenefitSettings, Merchant};
    use crate::storage::cloud::InMemoryDocumentStore;
    use crate::storage::test_utils::TestEnvironment;

    const WAIT: Duration = Duration::from_secs(2);

    fn identity(uid: &str) -> Identity {
        Identity {
            uid: uid.to_string(),
            email: format!("{}@example.com", uid),
            display_name: None,
        }
    }

    fn manager(env: &TestEnvironment, store: Arc<InMemoryDocumentStore>) -> StateManager {
        StateManager::new(env.repository(), store, NotificationCenter::new(), Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_local_commit_applies_synchronously() {
        let env = TestEnvironment::new().unwrap();
        let state = manager(&env, Arc::new(InMemoryDocumentStore::new()));
        state.start_local().await.unwrap();
        assert!(state.is_ready());

        state
            .commit(Mutation::EnsureMerchant(Merchant::new("Bodegón", None)))
            .await
            .unwrap();
        assert_eq!(state.data().merchants.len(), 1);

        // A fresh manager over the same storage sees the persisted state.
        let reloaded = manager(&env, Arc::new(InMemoryDocumentStore::new()));
        reloaded.restore_session().await.unwrap();
        assert_eq!(reloaded.data().merchants.len(), 1);
        assert_eq!(reloaded.mode(), PersistenceMode::Local);
    }

    #[tokio::test]
    async fn test_commit_with_can_decline_or_fail() {
        let env = TestEnvironment::new().unwrap();
        let state = manager(&env, Arc::new(InMemoryDocumentStore::new()));
        state.start_local().await.unwrap();
        let revision = *state.changes().borrow();

        assert!(!state.commit_with(|_| Ok(None)).await.unwrap());
        assert!(state.commit_with(|_| Err(anyhow!("rejected"))).await.is_err());
        assert_eq!(*state.changes().borrow(), revision);

        let committed = state
            .commit_with(|current| {
                assert!(current.merchants.is_empty());
                Ok(Some(Mutation::EnsureMerchant(Merchant::new("Bodegón", None))))
            })
            .await
            .unwrap();
        assert!(committed);
        assert_eq!(state.data().merchants.len(), 1);
    }

    #[tokio::test]
    async fn test_sign_in_replaces_state_and_becomes_ready() {
        let env = TestEnvironment::new().unwrap();
        let store = Arc::new(InMemoryDocumentStore::new());
        let state = manager(&env, store.clone());
        state.start_local().await.unwrap();
        state
            .commit(Mutation::EnsureMerchant(Merchant::new("Local only", None)))
            .await
            .unwrap();

        state.sign_in(identity("u1")).await.unwrap();
        assert_eq!(state.mode(), PersistenceMode::Cloud);
        assert!(state.wait_until_ready(WAIT).await);
        assert!(state.data().merchants.is_empty());
        assert_eq!(state.data().settings, BenefitSettings::default());

        state
            .commit(Mutation::EnsureMerchant(Merchant::new("Remote", None)))
            .await
            .unwrap();
        assert!(state.wait_for(WAIT, |s| s.data.merchants.len() == 1).await);
        assert_eq!(state.data().merchants[0].name, "Remote");
    }

    #[tokio::test]
    async fn test_sign_out_detaches_and_reloads_local() {
        let env = TestEnvironment::new().unwrap();
        let store = Arc::new(InMemoryDocumentStore::new());
        let state = manager(&env, store.clone());
        state.start_local().await.unwrap();
        state
            .commit(Mutation::EnsureMerchant(Merchant::new("Local", None)))
            .await
            .unwrap();

        state.sign_in(identity("u1")).await.unwrap();
        assert!(state.wait_until_ready(WAIT).await);
        assert_eq!(store.active_listeners(), 3);

        state.sign_out().await.unwrap();
        assert_eq!(store.active_listeners(), 0);
        assert_eq!(state.mode(), PersistenceMode::Local);
        assert_eq!(state.data().merchants[0].name, "Local");
        assert_eq!(env.repository().load_identity().unwrap(), None);
    }

    #[tokio::test]
    async fn test_permission_denied_sets_sync_error() {
        let env = TestEnvironment::new().unwrap();
        let store = Arc::new(InMemoryDocumentStore::new());
        store.deny_user("blocked");
        let state = manager(&env, store);

        assert!(state.sign_in(identity("blocked")).await.is_err());
        let snapshot = state.snapshot();
        assert_eq!(snapshot.mode, PersistenceMode::Cloud);
        assert!(!snapshot.ready);
        assert!(snapshot.sync_error.is_some());
        assert!(state.notifications().recent().iter().any(|n| n.persistent));
    }

    #[tokio::test]
    async fn test_connection_loss_surfaces_sync_error() {
        let env = TestEnvironment::new().unwrap();
        let store = Arc::new(InMemoryDocumentStore::new());
        let state = manager(&env, store.clone());
        state.sign_in(identity("u1")).await.unwrap();
        assert!(state.wait_until_ready(WAIT).await);

        store.set_offline(true);
        assert!(state.wait_for(WAIT, |s| s.sync_error.is_some()).await);
    }

    #[tokio::test]
    async fn test_stale_session_events_are_dropped() {
        let env = TestEnvironment::new().unwrap();
        let state = manager(&env, Arc::new(InMemoryDocumentStore::new()));
        state.start_local().await.unwrap();
        let stale_epoch = state.inner.status().epoch;

        state.start_local().await.unwrap();
        let applied = state
            .inner
            .apply_event(stale_epoch, StateEvent::MerchantsChanged(vec![Merchant::new("Ghost", None)]));
        assert!(!applied);
        assert!(state.data().merchants.is_empty());
    }
}
