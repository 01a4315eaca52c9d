use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::domain::logger::Logger;
use crate::domain::product::errors::ProductError;
use crate::domain::product::model::Product;
use crate::domain::product::repository::ProductRepository;
use crate::domain::product::snapshot::Snapshot;
use crate::domain::product::subscription::{CancelHandle, SnapshotSubscription};

/// Shared, immutable view of the synchronized collection.
pub type ProductList = Arc<Vec<Product>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Uninitialized,
    Subscribed,
    Updated,
    Unsubscribed,
}

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Delay before re-opening a feed that ended on its own. `None` leaves
    /// the list frozen at its last snapshot.
    pub resubscribe_delay: Option<Duration>,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            resubscribe_delay: Some(Duration::from_secs(2)),
        }
    }
}

/// Keeps a local, ordered copy of the remote `products` collection.
///
/// Every snapshot replaces the list wholesale. Once deactivated, no snapshot
/// is applied anymore: the phase check and the replacement happen under the
/// same lock as the transition to [`SyncPhase::Unsubscribed`].
pub struct ProductSynchronizer {
    repository: Arc<dyn ProductRepository>,
    options: SyncOptions,
    shared: Arc<SyncShared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

struct SyncShared {
    phase: Mutex<SyncPhase>,
    products: watch::Sender<ProductList>,
    teardown: CancelHandle,
    logger: Arc<dyn Logger>,
}

impl SyncShared {
    fn lock_phase(&self) -> std::sync::MutexGuard<'_, SyncPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn apply(&self, snapshot: &Snapshot) -> bool {
        let mut phase = self.lock_phase();
        if *phase == SyncPhase::Unsubscribed {
            self.logger.debug("Dropping snapshot delivered after teardown");
            return false;
        }

        match snapshot.materialize() {
            Ok(materialized) => {
                for rejected in &materialized.rejected {
                    self.logger.warn(&format!(
                        "Skipping malformed product {}: {}",
                        rejected.key, rejected.reason
                    ));
                }
                let count = materialized.products.len();
                self.products.send_replace(Arc::new(materialized.products));
                *phase = SyncPhase::Updated;
                self.logger
                    .debug(&format!("Synchronized {} products", count));
                true
            }
            Err(err) => {
                self.logger
                    .error(&format!("Ignoring product snapshot: {}", err));
                false
            }
        }
    }
}

impl ProductSynchronizer {
    pub fn new(
        repository: Arc<dyn ProductRepository>,
        logger: Arc<dyn Logger>,
        options: SyncOptions,
    ) -> Self {
        let (products, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            repository,
            options,
            shared: Arc::new(SyncShared {
                phase: Mutex::new(SyncPhase::Uninitialized),
                products,
                teardown: CancelHandle::new(),
                logger,
            }),
            task: Mutex::new(None),
        }
    }

    pub fn phase(&self) -> SyncPhase {
        *self.shared.lock_phase()
    }

    /// Current list.
    pub fn products(&self) -> ProductList {
        self.shared.products.borrow().clone()
    }

    /// Receiver notified on every applied snapshot.
    pub fn watch(&self) -> watch::Receiver<ProductList> {
        self.shared.products.subscribe()
    }

    /// Opens the feed and starts applying snapshots. Only valid once, from
    /// [`SyncPhase::Uninitialized`].
    ///
    /// When the first subscribe fails and a resubscribe delay is configured,
    /// the failure is logged and retried on that delay; without one it is
    /// returned.
    pub async fn activate(&self) -> Result<(), ProductError> {
        if self.phase() != SyncPhase::Uninitialized {
            return Err(ProductError::InvalidSyncTransition);
        }

        let subscription = match self.repository.subscribe().await {
            Ok(subscription) => Some(subscription),
            Err(err) => match self.options.resubscribe_delay {
                Some(delay) => {
                    self.shared.logger.error(&format!(
                        "Subscribe to product feed failed, retrying in {} ms: {}",
                        delay.as_millis(),
                        err
                    ));
                    None
                }
                None => return Err(err.into()),
            },
        };

        {
            let mut phase = self.shared.lock_phase();
            if *phase != SyncPhase::Uninitialized {
                return Err(ProductError::InvalidSyncTransition);
            }
            *phase = SyncPhase::Subscribed;
        }
        self.shared.logger.info("Subscribed to product feed");

        let handle = tokio::spawn(run_feed(
            self.shared.clone(),
            self.repository.clone(),
            self.options.clone(),
            subscription,
        ));
        *self.task.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
        Ok(())
    }

    /// Cancels the feed. Idempotent; the list keeps its last value.
    pub fn deactivate(&self) {
        {
            let mut phase = self.shared.lock_phase();
            if *phase == SyncPhase::Unsubscribed {
                return;
            }
            *phase = SyncPhase::Unsubscribed;
        }
        self.shared.teardown.cancel();
        if let Some(task) = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
        self.shared.logger.info("Unsubscribed from product feed");
    }
}

impl Drop for ProductSynchronizer {
    fn drop(&mut self) {
        self.deactivate();
    }
}

async fn run_feed(
    shared: Arc<SyncShared>,
    repository: Arc<dyn ProductRepository>,
    options: SyncOptions,
    mut subscription: Option<SnapshotSubscription>,
) {
    loop {
        if let Some(mut feed) = subscription.take() {
            loop {
                let event = tokio::select! {
                    _ = shared.teardown.cancelled() => return,
                    event = feed.next() => event,
                };
                match event {
                    Some(Ok(snapshot)) => {
                        shared.apply(&snapshot);
                    }
                    Some(Err(err)) => shared
                        .logger
                        .warn(&format!("Product feed error: {}", err)),
                    None => break,
                }
            }

            if shared.teardown.is_cancelled() {
                return;
            }
            match options.resubscribe_delay {
                Some(delay) => shared.logger.warn(&format!(
                    "Product feed ended, resubscribing in {} ms",
                    delay.as_millis()
                )),
                None => {
                    shared
                        .logger
                        .warn("Product feed ended, updates stopped");
                    return;
                }
            }
        }

        let Some(delay) = options.resubscribe_delay else {
            return;
        };

        tokio::select! {
            _ = shared.teardown.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }

        match repository.subscribe().await {
            Ok(feed) => {
                shared.logger.info("Resubscribed to product feed");
                subscription = Some(feed);
            }
            Err(err) => shared
                .logger
                .error(&format!("Resubscribe to product feed failed: {}", err)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::errors::RepositoryError;
    use crate::domain::product::model::{ProductDraft, ProductPatch};
    use crate::domain::product::subscription::SnapshotEvent;
    use crate::domain::product::value_objects::ProductId;
    use async_trait::async_trait;
    use mockall::mock;
    use serde_json::json;
    use tokio::sync::mpsc;

    mock! {
        pub ProductRepo {}

        #[async_trait]
        impl ProductRepository for ProductRepo {
            async fn subscribe(&self) -> Result<SnapshotSubscription, RepositoryError>;
            async fn get_by_id(&self, id: &ProductId) -> Result<Product, RepositoryError>;
            async fn create(&self, draft: &ProductDraft) -> Result<ProductId, RepositoryError>;
            async fn update(&self, id: &ProductId, patch: &ProductPatch) -> Result<(), RepositoryError>;
            async fn delete(&self, id: &ProductId) -> Result<(), RepositoryError>;
        }
    }

    mock! {
        pub Log {}

        impl Logger for Log {
            fn info(&self, message: &str);
            fn warn(&self, message: &str);
            fn error(&self, message: &str);
            fn debug(&self, message: &str);
        }
    }

    fn mock_logger() -> Arc<dyn Logger> {
        let mut logger = MockLog::new();
        logger.expect_info().returning(|_| ());
        logger.expect_warn().returning(|_| ());
        logger.expect_error().returning(|_| ());
        logger.expect_debug().returning(|_| ());
        Arc::new(logger)
    }

    /// Synchronizer over a repository whose single feed is driven by the test.
    fn synchronizer_with_feed(
        options: SyncOptions,
    ) -> (ProductSynchronizer, mpsc::Sender<SnapshotEvent>, CancelHandle) {
        let (sender, producer_cancel, subscription) = SnapshotSubscription::channel(8);
        let mut repo = MockProductRepo::new();
        repo.expect_subscribe()
            .times(1)
            .return_once(move || Ok(subscription));
        let synchronizer = ProductSynchronizer::new(Arc::new(repo), mock_logger(), options);
        (synchronizer, sender, producer_cancel)
    }

    fn no_resubscribe() -> SyncOptions {
        SyncOptions {
            resubscribe_delay: None,
        }
    }

    async fn wait_for_len(rx: &mut watch::Receiver<ProductList>, len: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if rx.borrow_and_update().len() == len {
                    return;
                }
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap();
    }

    fn fruit_snapshot() -> Snapshot {
        Snapshot::new(Some(json!({
            "a": { "name_th": "ผลไม้", "price": 10, "imageUrl": "u1" }
        })))
    }

    #[tokio::test]
    async fn should_materialize_snapshot_into_list() {
        let (synchronizer, sender, _) = synchronizer_with_feed(no_resubscribe());
        let mut rx = synchronizer.watch();
        synchronizer.activate().await.unwrap();
        assert_eq!(synchronizer.phase(), SyncPhase::Subscribed);

        sender.send(Ok(fruit_snapshot())).await.unwrap();
        wait_for_len(&mut rx, 1).await;

        let products = synchronizer.products();
        assert_eq!(products[0].id.as_str(), "a");
        assert_eq!(products[0].name_th, "ผลไม้");
        assert_eq!(products[0].price.amount(), 10.0);
        assert_eq!(products[0].image_url, "u1");
        assert_eq!(synchronizer.phase(), SyncPhase::Updated);
    }

    #[tokio::test]
    async fn should_clear_list_when_snapshot_is_empty() {
        let (synchronizer, sender, _) = synchronizer_with_feed(no_resubscribe());
        let mut rx = synchronizer.watch();
        synchronizer.activate().await.unwrap();

        sender.send(Ok(fruit_snapshot())).await.unwrap();
        wait_for_len(&mut rx, 1).await;
        sender.send(Ok(Snapshot::empty())).await.unwrap();
        wait_for_len(&mut rx, 0).await;

        assert!(synchronizer.products().is_empty());
    }

    #[tokio::test]
    async fn should_keep_previous_list_when_snapshot_is_not_a_collection() {
        let (synchronizer, _sender, _) = synchronizer_with_feed(no_resubscribe());
        synchronizer.activate().await.unwrap();
        synchronizer.shared.apply(&fruit_snapshot());

        let applied = synchronizer
            .shared
            .apply(&Snapshot::new(Some(json!(42))));

        assert!(!applied);
        assert_eq!(synchronizer.products().len(), 1);
    }

    #[tokio::test]
    async fn should_ignore_snapshots_after_teardown() {
        let (synchronizer, sender, producer_cancel) = synchronizer_with_feed(no_resubscribe());
        let mut rx = synchronizer.watch();
        synchronizer.activate().await.unwrap();
        sender.send(Ok(fruit_snapshot())).await.unwrap();
        wait_for_len(&mut rx, 1).await;

        synchronizer.deactivate();
        synchronizer.deactivate();
        let _ = sender.send(Ok(Snapshot::empty())).await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(synchronizer.products().len(), 1);
        assert_eq!(synchronizer.phase(), SyncPhase::Unsubscribed);
        assert!(producer_cancel.is_cancelled());
        assert!(!synchronizer.shared.apply(&Snapshot::empty()));
        assert_eq!(synchronizer.products().len(), 1);
    }

    #[tokio::test]
    async fn should_reject_second_activation() {
        let (synchronizer, _sender, _) = synchronizer_with_feed(no_resubscribe());
        synchronizer.activate().await.unwrap();

        let result = synchronizer.activate().await;

        assert!(matches!(result, Err(ProductError::InvalidSyncTransition)));
    }

    #[tokio::test]
    async fn should_keep_listening_after_feed_error() {
        let (synchronizer, sender, _) = synchronizer_with_feed(no_resubscribe());
        let mut rx = synchronizer.watch();
        synchronizer.activate().await.unwrap();

        sender.send(Err(RepositoryError::Transport)).await.unwrap();
        sender.send(Ok(fruit_snapshot())).await.unwrap();

        wait_for_len(&mut rx, 1).await;
    }

    #[tokio::test]
    async fn should_retry_when_first_subscribe_fails() {
        let (sender, _, feed) = SnapshotSubscription::channel(1);
        let mut feed = Some(feed);
        let mut attempts = 0;
        let mut repo = MockProductRepo::new();
        repo.expect_subscribe().times(2).returning(move || {
            attempts += 1;
            if attempts == 1 {
                Err(RepositoryError::Transport)
            } else {
                feed.take().ok_or(RepositoryError::Transport)
            }
        });
        let synchronizer = ProductSynchronizer::new(
            Arc::new(repo),
            mock_logger(),
            SyncOptions {
                resubscribe_delay: Some(Duration::from_millis(5)),
            },
        );
        let mut rx = synchronizer.watch();

        synchronizer.activate().await.unwrap();
        assert_eq!(synchronizer.phase(), SyncPhase::Subscribed);

        sender.send(Ok(fruit_snapshot())).await.unwrap();
        wait_for_len(&mut rx, 1).await;
        assert_eq!(synchronizer.phase(), SyncPhase::Updated);
    }

    #[tokio::test]
    async fn should_fail_activation_when_subscribe_fails_without_retry() {
        let mut repo = MockProductRepo::new();
        repo.expect_subscribe()
            .times(1)
            .returning(|| Err(RepositoryError::Unauthorized));
        let synchronizer = ProductSynchronizer::new(Arc::new(repo), mock_logger(), no_resubscribe());

        let result = synchronizer.activate().await;

        assert!(result.is_err());
        assert_eq!(synchronizer.phase(), SyncPhase::Uninitialized);
    }

    #[tokio::test]
    async fn should_resubscribe_when_feed_ends() {
        let (first_sender, _, first) = SnapshotSubscription::channel(1);
        let (second_sender, _, second) = SnapshotSubscription::channel(1);
        drop(first_sender);
        let feeds = Mutex::new(vec![second, first]);
        let mut repo = MockProductRepo::new();
        repo.expect_subscribe()
            .times(2)
            .returning(move || Ok(feeds.lock().unwrap().pop().unwrap()));
        let synchronizer = ProductSynchronizer::new(
            Arc::new(repo),
            mock_logger(),
            SyncOptions {
                resubscribe_delay: Some(Duration::from_millis(5)),
            },
        );
        let mut rx = synchronizer.watch();
        synchronizer.activate().await.unwrap();

        second_sender.send(Ok(fruit_snapshot())).await.unwrap();

        wait_for_len(&mut rx, 1).await;
    }
}
