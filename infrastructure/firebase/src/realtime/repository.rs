use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use business::domain::errors::RepositoryError;
use business::domain::logger::Logger;
use business::domain::product::model::{Product, ProductDraft, ProductPatch};
use business::domain::product::repository::ProductRepository;
use business::domain::product::snapshot::{decode_product, encode_draft, encode_patch};
use business::domain::product::subscription::{CancelHandle, SnapshotEvent, SnapshotSubscription};
use business::domain::product::value_objects::ProductId;

use crate::client::FirebaseClient;
use crate::realtime::event_stream::{FeedEvent, SseDecoder};
use crate::realtime::tree::RemoteTree;
use crate::status::repository_error;

/// Database node holding the catalog.
pub const PRODUCTS_NODE: &str = "products";

const FEED_BUFFER: usize = 16;

#[derive(Deserialize)]
struct PushResponse {
    name: String,
}

pub struct ProductRepositoryFirebase {
    client: Arc<FirebaseClient>,
    logger: Arc<dyn Logger>,
}

impl ProductRepositoryFirebase {
    pub fn new(client: Arc<FirebaseClient>, logger: Arc<dyn Logger>) -> Self {
        Self { client, logger }
    }

    fn product_path(id: &ProductId) -> String {
        format!("{}/{}", PRODUCTS_NODE, id.as_str())
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, RepositoryError> {
        let request = self.client.timed(self.client.with_database_auth(request));
        let response = request.send().await.map_err(|err| {
            self.logger
                .error(&format!("Realtime Database request failed: {}", err));
            RepositoryError::transport()
        })?;

        if !response.status().is_success() {
            self.logger.error(&format!(
                "Realtime Database responded with status {}",
                response.status()
            ));
            return Err(repository_error(response.status()));
        }
        Ok(response)
    }
}

#[async_trait]
impl ProductRepository for ProductRepositoryFirebase {
    async fn subscribe(&self) -> Result<SnapshotSubscription, RepositoryError> {
        let request = self
            .client
            .client
            .get(self.client.node_url(PRODUCTS_NODE))
            .header("Accept", "text/event-stream");
        let response = self
            .client
            .with_database_auth(request)
            .send()
            .await
            .map_err(|err| {
                self.logger
                    .error(&format!("Could not open product event stream: {}", err));
                RepositoryError::transport()
            })?;

        if !response.status().is_success() {
            self.logger.error(&format!(
                "Product event stream refused with status {}",
                response.status()
            ));
            return Err(repository_error(response.status()));
        }

        let (sender, cancel, subscription) = SnapshotSubscription::channel(FEED_BUFFER);
        tokio::spawn(pump_events(response, sender, cancel, self.logger.clone()));
        self.logger.debug("Product event stream opened");
        Ok(subscription)
    }

    async fn get_by_id(&self, id: &ProductId) -> Result<Product, RepositoryError> {
        let request = self
            .client
            .client
            .get(self.client.node_url(&Self::product_path(id)));
        let record: Value = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|_| RepositoryError::CorruptedRecord)?;

        if record.is_null() {
            return Err(RepositoryError::not_found());
        }
        decode_product(id.as_str(), &record).map_err(|err| {
            self.logger
                .warn(&format!("Product {} is malformed: {}", id, err));
            RepositoryError::CorruptedRecord
        })
    }

    async fn create(&self, draft: &ProductDraft) -> Result<ProductId, RepositoryError> {
        let mut record = encode_draft(draft);
        if let Value::Object(fields) = &mut record {
            fields.insert("createdAt".to_string(), json!({ ".sv": "timestamp" }));
        }

        let request = self
            .client
            .client
            .post(self.client.node_url(PRODUCTS_NODE))
            .json(&record);
        let pushed: PushResponse = self
            .send(request)
            .await?
            .json()
            .await
            .map_err(|_| RepositoryError::persistence())?;

        Ok(ProductId::new(pushed.name))
    }

    async fn update(&self, id: &ProductId, patch: &ProductPatch) -> Result<(), RepositoryError> {
        let request = self
            .client
            .client
            .patch(self.client.node_url(&Self::product_path(id)))
            .json(&encode_patch(patch));
        self.send(request).await?;
        Ok(())
    }

    async fn delete(&self, id: &ProductId) -> Result<(), RepositoryError> {
        let request = self
            .client
            .client
            .delete(self.client.node_url(&Self::product_path(id)));
        self.send(request).await?;
        Ok(())
    }
}

/// Reads the event stream until it ends, the subscriber goes away, or the
/// subscription is cancelled, forwarding a full snapshot after each change.
async fn pump_events(
    response: reqwest::Response,
    sender: mpsc::Sender<SnapshotEvent>,
    cancel: CancelHandle,
    logger: Arc<dyn Logger>,
) {
    let mut stream = std::pin::pin!(response.bytes_stream());
    let mut decoder = SseDecoder::new();
    let mut tree = RemoteTree::new();

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => return,
            chunk = stream.next() => chunk,
        };
        let bytes = match chunk {
            Some(Ok(bytes)) => bytes,
            Some(Err(err)) => {
                logger.warn(&format!("Product event stream broke: {}", err));
                let _ = sender.send(Err(RepositoryError::transport())).await;
                return;
            }
            None => {
                logger.info("Product event stream closed by server");
                return;
            }
        };

        for event in decoder.feed(&bytes) {
            let changed = match FeedEvent::parse(&event) {
                Ok(FeedEvent::Put { path, data }) => {
                    tree.put(&path, data);
                    true
                }
                Ok(FeedEvent::Patch { path, data }) => {
                    if !tree.patch(&path, data) {
                        logger.warn(&format!("Ignoring non-object patch at {}", path));
                    }
                    true
                }
                Ok(FeedEvent::KeepAlive) => false,
                Ok(FeedEvent::Cancel) | Ok(FeedEvent::AuthRevoked) => {
                    logger.warn(&format!(
                        "Product event stream ended by server: {}",
                        event.event
                    ));
                    let _ = sender.send(Err(RepositoryError::Unauthorized)).await;
                    return;
                }
                Ok(FeedEvent::Other(name)) => {
                    logger.debug(&format!("Ignoring stream event {}", name));
                    false
                }
                Err(err) => {
                    logger.warn(&format!(
                        "Malformed {} event on product stream: {}",
                        event.event, err
                    ));
                    false
                }
            };

            if changed && sender.send(Ok(tree.snapshot())).await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use business::domain::product::model::{DetailsProps, ProductDetails};
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct SilentLogger;

    impl Logger for SilentLogger {
        fn info(&self, _message: &str) {}
        fn warn(&self, _message: &str) {}
        fn error(&self, _message: &str) {}
        fn debug(&self, _message: &str) {}
    }

    fn repository(server: &MockServer, token: Option<&str>) -> ProductRepositoryFirebase {
        let client = FirebaseClient::new(
            &server.uri(),
            "bucket",
            token.map(str::to_string),
            Duration::from_secs(5),
        )
        .unwrap();
        ProductRepositoryFirebase::new(Arc::new(client), Arc::new(SilentLogger))
    }

    fn details() -> ProductDetails {
        ProductDetails::new(DetailsProps {
            name_th: "ส้ม".to_string(),
            name_en: None,
            name_mm: None,
            name_cn: None,
            price: "25".to_string(),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn should_push_record_with_server_timestamp() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/products.json"))
            .and(query_param("auth", "secret"))
            .and(body_partial_json(json!({
                "name_th": "ส้ม",
                "price": 25.0,
                "imageUrl": "https://img/a.png",
                "createdAt": { ".sv": "timestamp" }
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "-Nabc" })))
            .expect(1)
            .mount(&server)
            .await;

        let id = repository(&server, Some("secret"))
            .create(&ProductDraft {
                details: details(),
                image_url: "https://img/a.png".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(id.as_str(), "-Nabc");
    }

    #[tokio::test]
    async fn should_decode_fetched_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/-Nabc.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "name_th": "ส้ม",
                "price": 25,
                "imageUrl": "https://img/a.png",
                "createdAt": 1700000000000i64
            })))
            .mount(&server)
            .await;

        let product = repository(&server, None)
            .get_by_id(&ProductId::new("-Nabc"))
            .await
            .unwrap();

        assert_eq!(product.id.as_str(), "-Nabc");
        assert_eq!(product.price.amount(), 25.0);
        assert!(product.created_at.is_some());
    }

    #[tokio::test]
    async fn should_report_absent_record_as_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products/gone.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let result = repository(&server, None)
            .get_by_id(&ProductId::new("gone"))
            .await;

        assert!(matches!(result, Err(RepositoryError::NotFound)));
    }

    #[tokio::test]
    async fn should_map_denied_request_to_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/products/a.json"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Permission denied" })))
            .mount(&server)
            .await;

        let result = repository(&server, None).delete(&ProductId::new("a")).await;

        assert!(matches!(result, Err(RepositoryError::Unauthorized)));
    }

    #[tokio::test]
    async fn should_patch_only_changed_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/products/a.json"))
            .and(body_partial_json(json!({ "name_th": "ส้ม", "price": 25.0 })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name_th": "ส้ม" })))
            .expect(1)
            .mount(&server)
            .await;

        repository(&server, None)
            .update(
                &ProductId::new("a"),
                &ProductPatch {
                    details: details(),
                    image_url: None,
                },
            )
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert!(body.get("imageUrl").is_none());
        assert!(body.get("createdAt").is_none());
    }

    #[tokio::test]
    async fn should_stream_snapshots_from_put_and_patch_events() {
        let server = MockServer::start().await;
        let body = concat!(
            "event: put\n",
            "data: {\"path\":\"/\",\"data\":{\"a\":{\"name_th\":\"ผลไม้\",\"price\":10,\"imageUrl\":\"u1\"}}}\n\n",
            "event: keep-alive\n",
            "data: null\n\n",
            "event: patch\n",
            "data: {\"path\":\"/a\",\"data\":{\"price\":12}}\n\n",
        );
        Mock::given(method("GET"))
            .and(path("/products.json"))
            .and(header("Accept", "text/event-stream"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/event-stream")
                    .set_body_string(body),
            )
            .mount(&server)
            .await;

        let mut feed = repository(&server, None).subscribe().await.unwrap();

        let first = feed.next().await.unwrap().unwrap().materialize().unwrap();
        assert_eq!(first.products.len(), 1);
        assert_eq!(first.products[0].id.as_str(), "a");
        assert_eq!(first.products[0].name_th, "ผลไม้");
        assert_eq!(first.products[0].price.amount(), 10.0);

        let second = feed.next().await.unwrap().unwrap().materialize().unwrap();
        assert_eq!(second.products[0].price.amount(), 12.0);

        assert!(feed.next().await.is_none());
    }

    #[tokio::test]
    async fn should_surface_revoked_auth_as_feed_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Content-Type", "text/event-stream")
                    .set_body_string("event: auth_revoked\ndata: credential is no longer valid\n\n"),
            )
            .mount(&server)
            .await;

        let mut feed = repository(&server, None).subscribe().await.unwrap();

        assert!(matches!(
            feed.next().await,
            Some(Err(RepositoryError::Unauthorized))
        ));
        assert!(feed.next().await.is_none());
    }

    #[tokio::test]
    async fn should_refuse_subscription_on_denied_stream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products.json"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let result = repository(&server, None).subscribe().await;

        assert!(matches!(result, Err(RepositoryError::Unauthorized)));
    }
}
