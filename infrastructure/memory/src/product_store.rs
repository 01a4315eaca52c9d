use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Map, Value};
use tokio::sync::{Mutex, mpsc, watch};

use business::domain::errors::RepositoryError;
use business::domain::product::model::{Product, ProductDraft, ProductPatch};
use business::domain::product::repository::ProductRepository;
use business::domain::product::snapshot::{Snapshot, decode_product, encode_draft, encode_patch};
use business::domain::product::subscription::{CancelHandle, SnapshotEvent, SnapshotSubscription};
use business::domain::product::value_objects::ProductId;

const SUBSCRIPTION_BUFFER: usize = 1;

/// Process-local product collection with the same observable behavior as
/// the realtime database: chronologically sortable keys, server-set
/// `createdAt`, and a full snapshot pushed to every subscriber on each write.
///
/// Writes publish into a `watch` channel and never wait on subscribers; a
/// subscriber that falls behind skips straight to the latest snapshot.
pub struct InMemoryProductStore {
    state: Mutex<StoreState>,
    snapshots: watch::Sender<Snapshot>,
}

#[derive(Default)]
struct StoreState {
    records: Map<String, Value>,
    sequence: u64,
}

impl StoreState {
    fn next_key(&mut self) -> String {
        self.sequence += 1;
        format!("-M{:012x}{:06x}", Utc::now().timestamp_millis(), self.sequence)
    }

    fn snapshot(&self) -> Snapshot {
        if self.records.is_empty() {
            Snapshot::empty()
        } else {
            Snapshot::new(Some(Value::Object(self.records.clone())))
        }
    }
}

impl Default for InMemoryProductStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        let (snapshots, _) = watch::channel(Snapshot::empty());
        Self {
            state: Mutex::new(StoreState::default()),
            snapshots,
        }
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.records.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Writes a raw record under `key`, bypassing validation. Lets tests and
    /// seed data reproduce records other clients may have written.
    pub async fn insert_raw(&self, key: &str, record: Value) {
        let mut state = self.state.lock().await;
        state.records.insert(key.to_string(), record);
        self.publish(&state);
    }

    /// Publishes the current state. Called with the lock held so published
    /// snapshots follow write order.
    fn publish(&self, state: &StoreState) {
        self.snapshots.send_replace(state.snapshot());
    }
}

/// Forwards the latest published snapshot to one subscriber until it is
/// cancelled, its receiver closes or the store is dropped.
async fn forward_snapshots(
    mut snapshots: watch::Receiver<Snapshot>,
    sender: mpsc::Sender<SnapshotEvent>,
    cancel: CancelHandle,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            changed = snapshots.changed() => {
                if changed.is_err() {
                    return;
                }
            }
        }
        let snapshot = snapshots.borrow_and_update().clone();
        tokio::select! {
            _ = cancel.cancelled() => return,
            sent = sender.send(Ok(snapshot)) => {
                if sent.is_err() {
                    return;
                }
            }
        }
    }
}

#[async_trait]
impl ProductRepository for InMemoryProductStore {
    async fn subscribe(&self) -> Result<SnapshotSubscription, RepositoryError> {
        let (sender, cancel, subscription) = SnapshotSubscription::channel(SUBSCRIPTION_BUFFER);
        let mut snapshots = self.snapshots.subscribe();
        let current = snapshots.borrow_and_update().clone();
        sender
            .try_send(Ok(current))
            .map_err(|_| RepositoryError::transport())?;
        tokio::spawn(forward_snapshots(snapshots, sender, cancel));
        Ok(subscription)
    }

    async fn get_by_id(&self, id: &ProductId) -> Result<Product, RepositoryError> {
        let state = self.state.lock().await;
        let record = state
            .records
            .get(id.as_str())
            .ok_or(RepositoryError::not_found())?;
        decode_product(id.as_str(), record).map_err(|_| RepositoryError::CorruptedRecord)
    }

    async fn create(&self, draft: &ProductDraft) -> Result<ProductId, RepositoryError> {
        let mut record = encode_draft(draft);
        if let Value::Object(fields) = &mut record {
            fields.insert(
                "createdAt".to_string(),
                Value::from(Utc::now().timestamp_millis()),
            );
        }

        let mut state = self.state.lock().await;
        let key = state.next_key();
        state.records.insert(key.clone(), record);
        self.publish(&state);
        Ok(ProductId::new(key))
    }

    async fn update(&self, id: &ProductId, patch: &ProductPatch) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        let Some(Value::Object(fields)) = state.records.get_mut(id.as_str()) else {
            return Err(RepositoryError::not_found());
        };
        if let Value::Object(changes) = encode_patch(patch) {
            fields.extend(changes);
        }
        self.publish(&state);
        Ok(())
    }

    async fn delete(&self, id: &ProductId) -> Result<(), RepositoryError> {
        let mut state = self.state.lock().await;
        if state.records.remove(id.as_str()).is_some() {
            self.publish(&state);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use business::domain::product::model::{DetailsProps, ProductDetails};
    use serde_json::json;
    use std::time::Duration;
    use tokio::time::timeout;

    fn details(name_th: &str, price: &str) -> ProductDetails {
        ProductDetails::new(DetailsProps {
            name_th: name_th.to_string(),
            name_en: Some("Orange".to_string()),
            name_mm: None,
            name_cn: None,
            price: price.to_string(),
        })
        .unwrap()
    }

    fn draft(name_th: &str) -> ProductDraft {
        ProductDraft {
            details: details(name_th, "25"),
            image_url: "memory://products/a.png".to_string(),
        }
    }

    fn names(snapshot: &Snapshot) -> Vec<String> {
        snapshot
            .materialize()
            .unwrap()
            .products
            .into_iter()
            .map(|p| p.name_th)
            .collect()
    }

    /// Reads the feed until a snapshot with `count` products arrives.
    async fn latest_with(feed: &mut SnapshotSubscription, count: usize) -> Snapshot {
        timeout(Duration::from_secs(1), async {
            loop {
                let snapshot = feed.next().await.unwrap().unwrap();
                if names(&snapshot).len() == count {
                    return snapshot;
                }
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn should_emit_current_snapshot_on_subscribe() {
        let store = InMemoryProductStore::new();
        store.create(&draft("ส้ม")).await.unwrap();

        let mut feed = store.subscribe().await.unwrap();

        let snapshot = feed.next().await.unwrap().unwrap();
        assert_eq!(names(&snapshot), vec!["ส้ม"]);
    }

    #[tokio::test]
    async fn should_emit_empty_snapshot_for_empty_store() {
        let store = InMemoryProductStore::new();

        let mut feed = store.subscribe().await.unwrap();

        let snapshot = feed.next().await.unwrap().unwrap();
        assert_eq!(snapshot, Snapshot::empty());
    }

    #[tokio::test]
    async fn should_keep_creation_order_in_snapshots() {
        let store = InMemoryProductStore::new();
        let mut feed = store.subscribe().await.unwrap();
        feed.next().await.unwrap().unwrap();

        for name in ["ส้ม", "กล้วย", "มะม่วง"] {
            store.create(&draft(name)).await.unwrap();
        }

        let last = latest_with(&mut feed, 3).await;
        assert_eq!(names(&last), vec!["ส้ม", "กล้วย", "มะม่วง"]);
    }

    #[tokio::test]
    async fn should_stamp_created_at_on_create() {
        let store = InMemoryProductStore::new();

        let id = store.create(&draft("ส้ม")).await.unwrap();

        let product = store.get_by_id(&id).await.unwrap();
        assert!(product.created_at.is_some());
        assert_eq!(product.image_url, "memory://products/a.png");
    }

    #[tokio::test]
    async fn should_merge_patch_and_keep_created_at() {
        let store = InMemoryProductStore::new();
        let id = store.create(&draft("ส้ม")).await.unwrap();
        let before = store.get_by_id(&id).await.unwrap();

        store
            .update(
                &id,
                &ProductPatch {
                    details: details("ส้มโอ", "40"),
                    image_url: None,
                },
            )
            .await
            .unwrap();

        let after = store.get_by_id(&id).await.unwrap();
        assert_eq!(after.name_th, "ส้มโอ");
        assert_eq!(after.price.amount(), 40.0);
        assert_eq!(after.image_url, before.image_url);
        assert_eq!(after.created_at, before.created_at);
    }

    #[tokio::test]
    async fn should_report_missing_product() {
        let store = InMemoryProductStore::new();
        let id = ProductId::new("missing");

        assert!(matches!(
            store.get_by_id(&id).await,
            Err(RepositoryError::NotFound)
        ));
        assert!(matches!(
            store
                .update(
                    &id,
                    &ProductPatch {
                        details: details("ส้ม", "1"),
                        image_url: None,
                    },
                )
                .await,
            Err(RepositoryError::NotFound)
        ));
    }

    #[tokio::test]
    async fn should_flag_malformed_record_as_corrupted() {
        let store = InMemoryProductStore::new();
        store.insert_raw("bad", json!({ "name_th": "x" })).await;

        assert!(matches!(
            store.get_by_id(&ProductId::new("bad")).await,
            Err(RepositoryError::CorruptedRecord)
        ));
    }

    #[tokio::test]
    async fn should_stop_feeding_cancelled_subscription() {
        let store = InMemoryProductStore::new();
        let feed = store.subscribe().await.unwrap();
        assert_eq!(store.snapshots.receiver_count(), 1);
        feed.cancel();

        store.create(&draft("ส้ม")).await.unwrap();

        timeout(Duration::from_secs(1), async {
            while store.snapshots.receiver_count() > 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn should_keep_writing_while_a_subscriber_is_not_reading() {
        let store = InMemoryProductStore::new();
        let mut idle = store.subscribe().await.unwrap();

        for index in 0..40 {
            timeout(Duration::from_secs(1), store.create(&draft(&format!("p{index}"))))
                .await
                .unwrap_or_else(|_| panic!("create #{index} blocked"))
                .unwrap();
        }
        let id = timeout(Duration::from_secs(1), store.create(&draft("last")))
            .await
            .unwrap()
            .unwrap();
        timeout(Duration::from_secs(1), store.get_by_id(&id))
            .await
            .unwrap()
            .unwrap();

        let latest = latest_with(&mut idle, 41).await;
        assert_eq!(names(&latest).last().map(String::as_str), Some("last"));
    }
}
