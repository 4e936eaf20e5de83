//! In-process document store with live listeners.
//!
//! Used as the default remote store for a single-machine deployment and in
//! tests. Supports per-user permission denial and an offline switch so the
//! failure paths of the cloud backend can be exercised.

use async_trait::async_trait;
use log::debug;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc;

use super::document_store::{
    BatchOp, CollectionPath, Document, DocumentPath, Listener, ListenerId, OrderBy,
    RemoteDocumentStore, SnapshotResult, StoreError,
};

struct ListenerEntry {
    collection: CollectionPath,
    order: Option<OrderBy>,
    sender: mpsc::UnboundedSender<SnapshotResult>,
}

#[derive(Default)]
struct StoreState {
    collections: HashMap<CollectionPath, BTreeMap<String, Value>>,
    listeners: HashMap<ListenerId, ListenerEntry>,
    next_listener: ListenerId,
    denied_users: HashSet<String>,
    offline: bool,
}

#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, StoreError> {
        self.state
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".to_string()))
    }

    /// Reject every operation on `users/{uid}/...` from now on
    pub fn deny_user(&self, uid: &str) {
        if let Ok(mut state) = self.state.lock() {
            state.denied_users.insert(uid.to_string());
        }
    }

    /// Fail every operation with `Unavailable` while offline. Going offline
    /// also errors out the open listeners.
    pub fn set_offline(&self, offline: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.offline = offline;
            if offline {
                for entry in state.listeners.values() {
                    let _ = entry
                        .sender
                        .send(Err(StoreError::Unavailable("connection lost".to_string())));
                }
            }
        }
    }

    /// Number of listeners still attached
    pub fn active_listeners(&self) -> usize {
        self.state.lock().map(|s| s.listeners.len()).unwrap_or(0)
    }

    pub fn document_count(&self, collection: &CollectionPath) -> usize {
        self.state
            .lock()
            .map(|s| s.collections.get(collection).map(|c| c.len()).unwrap_or(0))
            .unwrap_or(0)
    }

    fn check_access(state: &StoreState, collection: &CollectionPath) -> Result<(), StoreError> {
        if state.offline {
            return Err(StoreError::Unavailable("store is offline".to_string()));
        }
        if let Some(uid) = collection.owner() {
            if state.denied_users.contains(uid) {
                return Err(StoreError::PermissionDenied(format!(
                    "missing or insufficient permissions for {}",
                    collection
                )));
            }
        }
        Ok(())
    }

    fn snapshot(state: &StoreState, collection: &CollectionPath, order: Option<&OrderBy>) -> Vec<Document> {
        let mut documents: Vec<Document> = state
            .collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, data)| Document {
                        id: id.clone(),
                        data: data.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        if let Some(order) = order {
            documents.sort_by(|a, b| {
                let ordering = compare_values(a.data.get(&order.field), b.data.get(&order.field));
                if order.descending {
                    ordering.reverse()
                } else {
                    ordering
                }
            });
        }
        documents
    }

    fn notify(state: &mut StoreState, changed: &HashSet<CollectionPath>) {
        let mut closed = Vec::new();
        for (id, entry) in &state.listeners {
            if !changed.contains(&entry.collection) {
                continue;
            }
            let documents = Self::snapshot(state, &entry.collection, entry.order.as_ref());
            if entry.sender.send(Ok(documents)).is_err() {
                closed.push(*id);
            }
        }
        for id in closed {
            state.listeners.remove(&id);
        }
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl RemoteDocumentStore for InMemoryDocumentStore {
    async fn get_document(&self, path: &DocumentPath) -> Result<Option<Value>, StoreError> {
        let state = self.lock()?;
        Self::check_access(&state, &path.collection)?;
        Ok(state
            .collections
            .get(&path.collection)
            .and_then(|docs| docs.get(&path.id))
            .cloned())
    }

    async fn set_document(&self, path: &DocumentPath, data: Value) -> Result<(), StoreError> {
        self.commit_batch(vec![BatchOp::Set(path.clone(), data)]).await
    }

    async fn delete_document(&self, path: &DocumentPath) -> Result<(), StoreError> {
        self.commit_batch(vec![BatchOp::Delete(path.clone())]).await
    }

    async fn list_documents(&self, collection: &CollectionPath) -> Result<Vec<Document>, StoreError> {
        let state = self.lock()?;
        Self::check_access(&state, collection)?;
        Ok(Self::snapshot(&state, collection, None))
    }

    async fn commit_batch(&self, ops: Vec<BatchOp>) -> Result<(), StoreError> {
        let mut state = self.lock()?;

        // Validate everything before touching any collection.
        for op in &ops {
            let path = match op {
                BatchOp::Set(path, data) | BatchOp::Merge(path, data) => {
                    if !data.is_object() {
                        return Err(StoreError::InvalidDocument(format!("{} is not an object", path)));
                    }
                    path
                }
                BatchOp::Delete(path) => path,
            };
            Self::check_access(&state, &path.collection)?;
        }

        let mut changed = HashSet::new();
        for op in ops {
            match op {
                BatchOp::Set(path, data) => {
                    state
                        .collections
                        .entry(path.collection.clone())
                        .or_default()
                        .insert(path.id, data);
                    changed.insert(path.collection);
                }
                BatchOp::Merge(path, Value::Object(fields)) => {
                    let document = state
                        .collections
                        .entry(path.collection.clone())
                        .or_default()
                        .entry(path.id)
                        .or_insert_with(|| Value::Object(Map::new()));
                    match document {
                        Value::Object(existing) => existing.extend(fields),
                        other => *other = Value::Object(fields),
                    }
                    changed.insert(path.collection);
                }
                BatchOp::Merge(..) => {}
                BatchOp::Delete(path) => {
                    if let Some(docs) = state.collections.get_mut(&path.collection) {
                        docs.remove(&path.id);
                    }
                    changed.insert(path.collection);
                }
            }
        }

        debug!("🗄️ Committed batch touching {} collection(s)", changed.len());
        Self::notify(&mut state, &changed);
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &CollectionPath,
        order: Option<OrderBy>,
    ) -> Result<Listener, StoreError> {
        let mut state = self.lock()?;
        Self::check_access(&state, collection)?;

        let (sender, updates) = mpsc::unbounded_channel();
        let initial = Self::snapshot(&state, collection, order.as_ref());
        let _ = sender.send(Ok(initial));

        state.next_listener += 1;
        let id = state.next_listener;
        state.listeners.insert(
            id,
            ListenerEntry {
                collection: collection.clone(),
                order,
                sender,
            },
        );
        debug!("👂 Listener {} attached to {}", id, collection);
        Ok(Listener { id, updates })
    }

    fn unsubscribe(&self, listener: ListenerId) {
        if let Ok(mut state) = self.state.lock() {
            if state.listeners.remove(&listener).is_some() {
                debug!("🔇 Listener {} detached", listener);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_listener_gets_initial_and_ordered_updates() {
        let store = InMemoryDocumentStore::new();
        let merchants = CollectionPath::for_user("u1", "merchants");
        store
            .set_document(&merchants.doc("m1"), json!({"name": "Zeta"}))
            .await
            .unwrap();

        let mut listener = store
            .subscribe(&merchants, Some(OrderBy::asc("name")))
            .await
            .unwrap();
        let initial = listener.updates.recv().await.unwrap().unwrap();
        assert_eq!(initial.len(), 1);

        store
            .set_document(&merchants.doc("m2"), json!({"name": "alfa"}))
            .await
            .unwrap();
        let update = listener.updates.recv().await.unwrap().unwrap();
        let names: Vec<_> = update.iter().map(|d| d.data["name"].as_str().unwrap()).collect();
        assert_eq!(names, vec!["alfa", "Zeta"]);
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let store = InMemoryDocumentStore::new();
        let mine = CollectionPath::for_user("u1", "purchases");
        let theirs = CollectionPath::for_user("u2", "purchases");
        store.deny_user("u2");

        let result = store
            .commit_batch(vec![
                BatchOp::Set(mine.doc("p1"), json!({"amount": 1})),
                BatchOp::Set(theirs.doc("p2"), json!({"amount": 2})),
            ])
            .await;

        assert!(matches!(result, Err(StoreError::PermissionDenied(_))));
        assert_eq!(store.document_count(&mine), 0);
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_updates() {
        let store = InMemoryDocumentStore::new();
        let purchases = CollectionPath::for_user("u1", "purchases");
        let mut listener = store.subscribe(&purchases, None).await.unwrap();
        let _ = listener.updates.recv().await;
        assert_eq!(store.active_listeners(), 1);

        store.unsubscribe(listener.id);
        assert_eq!(store.active_listeners(), 0);

        store
            .set_document(&purchases.doc("p1"), json!({"amount": 1}))
            .await
            .unwrap();
        // Sender was dropped with the entry, so the stream ends.
        assert!(listener.updates.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_denied_subscription_and_offline() {
        let store = InMemoryDocumentStore::new();
        store.deny_user("u1");
        let result = store
            .subscribe(&CollectionPath::for_user("u1", "settings"), None)
            .await;
        assert!(matches!(result, Err(StoreError::PermissionDenied(_))));

        store.set_offline(true);
        let result = store
            .list_documents(&CollectionPath::for_user("u2", "settings"))
            .await;
        assert!(matches!(result, Err(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_merge_keeps_fields_it_does_not_name() {
        let store = InMemoryDocumentStore::new();
        let path = CollectionPath::for_user("u1", "settings").doc("current");
        store
            .set_document(&path, json!({"discountPercentage": 30.0, "weeklyReminder": true}))
            .await
            .unwrap();

        store
            .commit_batch(vec![BatchOp::Merge(path.clone(), json!({"discountPercentage": 10.0}))])
            .await
            .unwrap();

        assert_eq!(
            store.get_document(&path).await.unwrap(),
            Some(json!({"discountPercentage": 10.0, "weeklyReminder": true}))
        );

        let fresh = CollectionPath::for_user("u1", "settings").doc("other");
        store
            .commit_batch(vec![BatchOp::Merge(fresh.clone(), json!({"lastReminderMonth": "2024-05"}))])
            .await
            .unwrap();
        assert_eq!(
            store.get_document(&fresh).await.unwrap(),
            Some(json!({"lastReminderMonth": "2024-05"}))
        );
    }

    #[tokio::test]
    async fn test_rejects_non_object_documents() {
        let store = InMemoryDocumentStore::new();
        let path = CollectionPath::for_user("u1", "settings").doc("current");
        let result = store.set_document(&path, json!(42)).await;
        assert!(matches!(result, Err(StoreError::InvalidDocument(_))));
    }
}
