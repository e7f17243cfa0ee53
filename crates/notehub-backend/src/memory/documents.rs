use super::Operation;
use crate::document::{
    Document, DocumentId, DocumentStore, FieldValue, Fields, Query, Subscription,
    SubscriptionHandle, WriteFields,
};
use crate::error::BackendError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::mpsc;
use ulid::Ulid;

/// In-memory document database with live queries
///
/// Every write to a collection pushes a full re-sorted snapshot to each active
/// subscriber on that collection. Cancelled or abandoned subscribers are
/// pruned on the next delivery and never receive another snapshot.
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    inner: Mutex<StoreInner>,
}

#[derive(Debug, Default)]
struct StoreInner {
    collections: HashMap<String, BTreeMap<String, Fields>>,
    subscribers: Vec<Subscriber>,
    /// Last issued server timestamp (microseconds)
    last_stamp: i64,
    faults: HashMap<Operation, BackendError>,
    writes: usize,
}

#[derive(Debug)]
struct Subscriber {
    query: Query,
    sender: mpsc::UnboundedSender<Vec<Document>>,
    handle: SubscriptionHandle,
}

impl Subscriber {
    fn is_live(&self) -> bool {
        !self.handle.is_cancelled() && !self.sender.is_closed()
    }
}

impl StoreInner {
    /// Strictly increasing per store, never behind the wall clock
    fn stamp(&mut self) -> i64 {
        let now = chrono::Utc::now().timestamp_micros();
        self.last_stamp = now.max(self.last_stamp + 1);
        self.last_stamp
    }

    fn take_fault(&mut self, op: Operation) -> Result<(), BackendError> {
        match self.faults.remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn resolve(&mut self, fields: WriteFields) -> Fields {
        let mut resolved = Fields::new();
        for (key, value) in fields {
            let value = match value {
                FieldValue::Value(v) => v,
                FieldValue::ServerTimestamp => Value::from(self.stamp()),
            };
            resolved.insert(key, value);
        }
        resolved
    }

    fn snapshot(collections: &HashMap<String, BTreeMap<String, Fields>>, query: &Query) -> Vec<Document> {
        let mut documents: Vec<Document> = collections
            .get(&query.collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| Document {
                        id: DocumentId(id.clone()),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        query.sort(&mut documents);
        documents
    }

    /// Push a fresh snapshot to every live subscriber of `collection`
    fn publish(&mut self, collection: &str) {
        let StoreInner {
            collections,
            subscribers,
            ..
        } = self;
        subscribers.retain(|sub| {
            if !sub.is_live() {
                return false;
            }
            if sub.query.collection != collection {
                return true;
            }
            let snapshot = Self::snapshot(collections, &sub.query);
            tracing::trace!(collection, count = snapshot.len(), "pushing snapshot");
            sub.sender.send(snapshot).is_ok()
        });
    }
}

impl MemoryDocumentStore {
    /// Create empty store
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call of `op` fail with `error`
    pub fn fail_next(&self, op: Operation, error: BackendError) {
        self.inner.lock().faults.insert(op, error);
    }

    /// Insert or replace a document with literal fields.
    ///
    /// Bypasses server stamping so callers can seed exact timestamps.
    pub fn put_document(&self, collection: &str, id: &str, fields: Fields) {
        let mut inner = self.inner.lock();
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        inner.publish(collection);
    }

    /// Current fields of a document
    #[must_use]
    pub fn fields(&self, collection: &str, id: &str) -> Option<Fields> {
        self.inner
            .lock()
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
    }

    /// Number of documents in `collection`
    #[must_use]
    pub fn document_count(&self, collection: &str) -> usize {
        self.inner
            .lock()
            .collections
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    /// Live queries still receiving pushes
    #[must_use]
    pub fn active_subscribers(&self) -> usize {
        self.inner
            .lock()
            .subscribers
            .iter()
            .filter(|s| s.is_live())
            .count()
    }

    /// Successful create and update calls so far
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.inner.lock().writes
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn subscribe(&self, query: Query) -> Result<Subscription, BackendError> {
        let mut inner = self.inner.lock();
        inner.take_fault(Operation::Subscribe)?;

        let (sender, snapshots) = mpsc::unbounded_channel();
        let handle = SubscriptionHandle::new();

        let initial = StoreInner::snapshot(&inner.collections, &query);
        // Receiver is held locally, send cannot fail
        let _ = sender.send(initial);

        tracing::debug!(collection = %query.collection, "live query opened");
        inner.subscribers.push(Subscriber {
            query,
            sender,
            handle: handle.clone(),
        });

        Ok(Subscription { snapshots, handle })
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, BackendError> {
        let mut inner = self.inner.lock();
        inner.take_fault(Operation::Get)?;

        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|fields| Document {
                id: DocumentId(id.to_string()),
                fields: fields.clone(),
            }))
    }

    async fn create(
        &self,
        collection: &str,
        fields: WriteFields,
    ) -> Result<DocumentId, BackendError> {
        let mut inner = self.inner.lock();
        inner.take_fault(Operation::Create)?;

        let id = Ulid::new().to_string();
        let resolved = inner.resolve(fields);
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), resolved);
        inner.writes += 1;
        inner.publish(collection);

        tracing::debug!(collection, id = %id, "document created");
        Ok(DocumentId(id))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        fields: WriteFields,
    ) -> Result<(), BackendError> {
        let mut inner = self.inner.lock();
        inner.take_fault(Operation::Update)?;

        let resolved = inner.resolve(fields);
        let existing = inner
            .collections
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| BackendError::NotFound(format!("{collection}/{id}")))?;
        existing.extend(resolved);
        inner.writes += 1;
        inner.publish(collection);

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(title: &str) -> WriteFields {
        let mut fields = WriteFields::new();
        fields.insert("title".to_string(), FieldValue::value(title));
        fields.insert("createdAt".to_string(), FieldValue::ServerTimestamp);
        fields
    }

    #[tokio::test]
    async fn create_stamps_monotonic_timestamps() {
        let store = MemoryDocumentStore::new();
        let a = store.create("notes", fields("a")).await.unwrap();
        let b = store.create("notes", fields("b")).await.unwrap();

        let ta = store.fields("notes", a.as_str()).unwrap()["createdAt"].as_i64().unwrap();
        let tb = store.fields("notes", b.as_str()).unwrap()["createdAt"].as_i64().unwrap();
        assert!(tb > ta);
    }

    #[tokio::test]
    async fn subscribe_delivers_initial_and_change_snapshots() {
        let store = MemoryDocumentStore::new();
        let mut sub = store
            .subscribe(Query::ordered_desc("notes", "createdAt"))
            .await
            .unwrap();

        assert!(sub.snapshots.recv().await.unwrap().is_empty());

        store.create("notes", fields("first")).await.unwrap();
        store.create("notes", fields("second")).await.unwrap();

        assert_eq!(sub.snapshots.recv().await.unwrap().len(), 1);
        let latest = sub.snapshots.recv().await.unwrap();
        assert_eq!(latest.len(), 2);
        assert_eq!(latest[0].fields["title"], json!("second"));
    }

    #[tokio::test]
    async fn cancelled_subscriber_stops_receiving() {
        let store = MemoryDocumentStore::new();
        let mut sub = store.subscribe(Query::collection("notes")).await.unwrap();
        let _ = sub.snapshots.recv().await;
        assert_eq!(store.active_subscribers(), 1);

        sub.handle.cancel();
        sub.handle.cancel();
        assert_eq!(store.active_subscribers(), 0);

        store.create("notes", fields("late")).await.unwrap();
        assert!(sub.snapshots.try_recv().is_err());
    }

    #[tokio::test]
    async fn other_collections_do_not_notify() {
        let store = MemoryDocumentStore::new();
        let mut sub = store.subscribe(Query::collection("notes")).await.unwrap();
        let _ = sub.snapshots.recv().await;

        store.create("comments", fields("x")).await.unwrap();
        assert!(sub.snapshots.try_recv().is_err());
    }

    #[tokio::test]
    async fn update_merges_fields() {
        let store = MemoryDocumentStore::new();
        let id = store.create("notes", fields("a")).await.unwrap();

        let mut patch = WriteFields::new();
        patch.insert("views".to_string(), FieldValue::value(3));
        store.update("notes", id.as_str(), patch).await.unwrap();

        let stored = store.fields("notes", id.as_str()).unwrap();
        assert_eq!(stored["title"], json!("a"));
        assert_eq!(stored["views"], json!(3));
    }

    #[tokio::test]
    async fn update_missing_document_is_not_found() {
        let store = MemoryDocumentStore::new();
        let err = store
            .update("notes", "missing", WriteFields::new())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn injected_fault_fires_once() {
        let store = MemoryDocumentStore::new();
        store.fail_next(
            Operation::Create,
            BackendError::PermissionDenied("rules".to_string()),
        );

        assert!(store.create("notes", fields("a")).await.is_err());
        assert!(store.create("notes", fields("a")).await.is_ok());
        assert_eq!(store.document_count("notes"), 1);
        assert_eq!(store.write_count(), 1);
    }
}
