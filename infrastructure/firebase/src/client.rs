use std::time::Duration;

use reqwest::{Client, RequestBuilder};

pub const DEFAULT_STORAGE_BASE_URL: &str = "https://firebasestorage.googleapis.com";

/// Shared Firebase HTTP client configuration.
///
/// The underlying client only carries a connect timeout: the realtime feed is
/// a long-lived response, so the request timeout is applied per call through
/// [`FirebaseClient::timed`].
pub struct FirebaseClient {
    pub client: Client,
    pub database_url: String,
    pub storage_bucket: String,
    pub storage_base_url: String,
    pub auth_token: Option<String>,
    pub request_timeout: Duration,
}

impl FirebaseClient {
    pub fn new(
        database_url: &str,
        storage_bucket: &str,
        auth_token: Option<String>,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            database_url: database_url.trim_end_matches('/').to_string(),
            storage_bucket: storage_bucket.to_string(),
            storage_base_url: DEFAULT_STORAGE_BASE_URL.to_string(),
            auth_token: auth_token.filter(|t| !t.is_empty()),
            request_timeout,
        })
    }

    pub fn with_storage_base_url(mut self, base_url: &str) -> Self {
        self.storage_base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// REST URL of a database node, e.g. `products/-Nabc` →
    /// `{db}/products/-Nabc.json`.
    pub fn node_url(&self, path: &str) -> String {
        format!("{}/{}.json", self.database_url, path.trim_matches('/'))
    }

    /// Collection endpoint of the storage bucket.
    pub fn objects_url(&self) -> String {
        format!(
            "{}/v0/b/{}/o",
            self.storage_base_url, self.storage_bucket
        )
    }

    pub fn object_url(&self, object_path: &str) -> String {
        format!(
            "{}/{}",
            self.objects_url(),
            urlencoding::encode(object_path)
        )
    }

    /// Public download URL of an uploaded object.
    pub fn download_url(&self, object_path: &str, token: Option<&str>) -> String {
        match token {
            Some(token) => format!(
                "{}?alt=media&token={}",
                self.object_url(object_path),
                urlencoding::encode(token)
            ),
            None => format!("{}?alt=media", self.object_url(object_path)),
        }
    }

    /// Adds the database `auth` query parameter when a credential is set.
    pub fn with_database_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.query(&[("auth", token)]),
            None => request,
        }
    }

    /// Adds the storage bearer header when a credential is set.
    pub fn with_storage_auth(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.header("Authorization", format!("Bearer {}", token)),
            None => request,
        }
    }

    pub fn timed(&self, request: RequestBuilder) -> RequestBuilder {
        request.timeout(self.request_timeout)
    }
}
