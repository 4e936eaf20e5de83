//! Persistence backend used while an identity is present.
//!
//! Every mutation becomes a write to the remote document store. The in-memory
//! state is never touched here: live listeners on the three collections
//! forward the authoritative content to the state container.

use anyhow::Result;
use async_trait::async_trait;
use log::{error, info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use shared::PersistenceMode;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use super::document_store::{
    BatchOp, CollectionPath, Document, DocumentPath, Listener, OrderBy, RemoteDocumentStore,
    StoreError,
};
use crate::domain::errors::DomainError;
use crate::domain::models::{AppData, BenefitSettings, Identity, Merchant, Purchase};
use crate::domain::state::Mutation;
use crate::storage::traits::{
    Attachment, Collection, CommitOutcome, EventSink, PersistenceBackend, StateEvent, Subscription,
};

pub const SETTINGS_DOCUMENT_ID: &str = "current";

#[derive(Clone)]
pub struct CloudBackend {
    store: Arc<dyn RemoteDocumentStore>,
    identity: Identity,
    timeout: Duration,
}

impl CloudBackend {
    pub fn new(store: Arc<dyn RemoteDocumentStore>, identity: Identity, timeout: Duration) -> Self {
        Self {
            store,
            identity,
            timeout,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn collection_path(&self, collection: Collection) -> CollectionPath {
        CollectionPath::for_user(&self.identity.uid, collection.name())
    }

    fn settings_path(&self) -> DocumentPath {
        self.collection_path(Collection::Settings).doc(SETTINGS_DOCUMENT_ID)
    }

    fn order_for(collection: Collection) -> Option<OrderBy> {
        match collection {
            Collection::Settings => None,
            Collection::Purchases => Some(OrderBy::desc("date")),
            Collection::Merchants => Some(OrderBy::asc("name")),
        }
    }

    /// Run a remote call under the configured timeout
    async fn remote<T>(&self, call: impl Future<Output = Result<T, StoreError>>) -> Result<T> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DomainError::Remote(e.to_string()).into()),
            Err(_) => Err(DomainError::RemoteTimeout(self.timeout.as_secs()).into()),
        }
    }

    fn set_op<T: Serialize>(&self, path: DocumentPath, value: &T) -> Result<BatchOp> {
        Ok(BatchOp::Set(path, serde_json::to_value(value)?))
    }

    async fn subscribe_all(&self) -> Result<Vec<(Collection, Listener)>, StoreError> {
        let mut listeners: Vec<(Collection, Listener)> = Vec::new();
        for collection in Collection::ALL {
            let path = self.collection_path(collection);
            match self.store.subscribe(&path, Self::order_for(collection)).await {
                Ok(listener) => listeners.push((collection, listener)),
                Err(e) => {
                    for (_, listener) in &listeners {
                        self.store.unsubscribe(listener.id);
                    }
                    return Err(e);
                }
            }
        }
        Ok(listeners)
    }

    /// Translate a mutation into remote writes
    async fn build_ops(&self, mutation: &Mutation) -> Result<Vec<BatchOp>> {
        let purchases = self.collection_path(Collection::Purchases);
        let merchants = self.collection_path(Collection::Merchants);

        let ops = match mutation {
            Mutation::UpsertPurchase(purchase) => vec![self.set_op(purchases.doc(&purchase.id), purchase)?],
            Mutation::DeletePurchase(id) => vec![BatchOp::Delete(purchases.doc(id))],
            Mutation::UpdateSettings(patch) => vec![BatchOp::Merge(self.settings_path(), serde_json::to_value(patch)?)],
            Mutation::EnsureMerchant(merchant) => {
                // The local copy may lag behind the remote one, so check the remote collection.
                let existing = self.remote(self.store.list_documents(&merchants)).await?;
                let known = decode_documents::<Merchant>(Collection::Merchants, existing)
                    .iter()
                    .any(|m| m.matches(&merchant.name, merchant.location.as_deref()));
                if known {
                    Vec::new()
                } else {
                    vec![self.set_op(merchants.doc(&merchant.id), merchant)?]
                }
            }
            Mutation::ReplaceCollections {
                purchases: new_purchases,
                merchants: new_merchants,
            } => {
                let existing_purchases = self.remote(self.store.list_documents(&purchases)).await?;
                let existing_merchants = self.remote(self.store.list_documents(&merchants)).await?;

                let mut ops: Vec<BatchOp> = existing_purchases
                    .into_iter()
                    .map(|d| BatchOp::Delete(purchases.doc(d.id)))
                    .chain(existing_merchants.into_iter().map(|d| BatchOp::Delete(merchants.doc(d.id))))
                    .collect();
                for purchase in new_purchases {
                    ops.push(self.set_op(purchases.doc(&purchase.id), purchase)?);
                }
                for merchant in new_merchants {
                    ops.push(self.set_op(merchants.doc(&merchant.id), merchant)?);
                }
                ops
            }
            Mutation::MergeBackup {
                purchases: new_purchases,
                merchants: new_merchants,
                settings,
            } => {
                let mut ops = Vec::new();
                for purchase in new_purchases {
                    ops.push(self.set_op(purchases.doc(&purchase.id), purchase)?);
                }
                for merchant in new_merchants {
                    ops.push(self.set_op(merchants.doc(&merchant.id), merchant)?);
                }
                if let Some(settings) = settings {
                    ops.push(self.set_op(self.settings_path(), settings)?);
                }
                ops
            }
        };
        Ok(ops)
    }
}

fn decode_documents<T: DeserializeOwned>(collection: Collection, documents: Vec<Document>) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|doc| match serde_json::from_value::<T>(doc.data) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("⚠️ Skipping unreadable {} document '{}': {}", collection, doc.id, e);
                None
            }
        })
        .collect()
}

fn to_event(collection: Collection, documents: Vec<Document>) -> StateEvent {
    match collection {
        Collection::Settings => {
            let settings = documents
                .into_iter()
                .find(|d| d.id == SETTINGS_DOCUMENT_ID)
                .and_then(|d| decode_documents::<BenefitSettings>(collection, vec![d]).pop());
            StateEvent::SettingsChanged(settings)
        }
        Collection::Purchases => StateEvent::PurchasesChanged(decode_documents::<Purchase>(collection, documents)),
        Collection::Merchants => StateEvent::MerchantsChanged(decode_documents::<Merchant>(collection, documents)),
    }
}

#[async_trait]
impl PersistenceBackend for CloudBackend {
    fn mode(&self) -> PersistenceMode {
        PersistenceMode::Cloud
    }

    async fn attach(&self, sink: EventSink) -> Result<Attachment> {
        info!("☁️ Attaching live subscriptions for {}", self.identity.email);

        let listeners = match tokio::time::timeout(self.timeout, self.subscribe_all()).await {
            Ok(Ok(listeners)) => listeners,
            Ok(Err(e)) => {
                error!("❌ Could not subscribe for {}: {}", self.identity.email, e);
                return Err(DomainError::Remote(e.to_string()).into());
            }
            Err(_) => {
                error!("❌ Subscribing for {} timed out", self.identity.email);
                return Err(DomainError::RemoteTimeout(self.timeout.as_secs()).into());
            }
        };

        let mut subscription = Subscription::none();
        for (collection, mut listener) in listeners {
            let store = self.store.clone();
            let listener_id = listener.id;
            subscription.on_teardown(move || store.unsubscribe(listener_id));

            let sink = sink.clone();
            subscription.track(tokio::spawn(async move {
                while let Some(update) = listener.updates.recv().await {
                    let event = match update {
                        Ok(documents) => to_event(collection, documents),
                        Err(e) => StateEvent::SubscriptionFailed {
                            collection,
                            reason: e.to_string(),
                        },
                    };
                    if sink.send(event).is_err() {
                        break;
                    }
                }
            }));
        }

        Ok(Attachment {
            initial: None,
            subscription,
        })
    }

    async fn commit(&self, mutation: &Mutation, _current: &AppData) -> Result<CommitOutcome> {
        let ops = self.build_ops(mutation).await?;
        let op_count = ops.len();

        match ops.len() {
            0 => {}
            1 => match ops.into_iter().next() {
                Some(BatchOp::Set(path, data)) => self.remote(self.store.set_document(&path, data)).await?,
                Some(BatchOp::Delete(path)) => self.remote(self.store.delete_document(&path)).await?,
                Some(op @ BatchOp::Merge(..)) => self.remote(self.store.commit_batch(vec![op])).await?,
                None => {}
            },
            _ => self.remote(self.store.commit_batch(ops)).await?,
        }

        info!(
            "☁️ Remote commit '{}' for {} ({} write(s)), awaiting sync",
            mutation.label(),
            self.identity.email,
            op_count
        );
        Ok(CommitOutcome::AwaitingSync)
    }
}

/// Read a single remote settings document, if present
pub async fn fetch_settings(
    store: &dyn RemoteDocumentStore,
    uid: &str,
) -> Result<Option<BenefitSettings>, StoreError> {
    let path = CollectionPath::for_user(uid, Collection::Settings.name()).doc(SETTINGS_DOCUMENT_ID);
    match store.get_document(&path).await? {
        Some(Value::Null) | None => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| StoreError::InvalidDocument(e.to_string())),
    }
}
