use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode, decode_header};
use poem::Request;
use poem_openapi::SecurityScheme;
use serde::Deserialize;

const GOOGLE_CERTS_URL: &str =
    "https://www.googleapis.com/robot/v1/metadata/x509/securetoken@system.gserviceaccount.com";
const CACHE_TTL: Duration = Duration::from_secs(3600);

/// Authentication failures, as code-style identifiers.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("auth.certs_fetch_failed")]
    CertsFetchFailed,
    #[error("auth.cert_decode_failed")]
    CertDecodeFailed,
    #[error("auth.invalid_token_header")]
    InvalidTokenHeader,
    #[error("auth.missing_kid")]
    MissingKid,
    #[error("auth.unknown_kid")]
    UnknownKid,
    #[error("auth.token_validation_failed")]
    TokenValidationFailed,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct FirebaseClaims {
    sub: String,
    email: Option<String>,
    iss: String,
    aud: String,
    exp: u64,
    iat: u64,
}

struct CachedCerts {
    keys: HashMap<String, DecodingKey>,
    fetched_at: Instant,
}

/// Verifies Firebase ID tokens against Google's rotating signing certs.
///
/// Shared through the request data, so handlers and the websocket upgrade
/// use the same cert cache.
pub struct FirebaseTokenVerifier {
    project_id: String,
    certs_url: String,
    http: reqwest::Client,
    cache: RwLock<Option<CachedCerts>>,
}

impl FirebaseTokenVerifier {
    pub fn new(project_id: &str, request_timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()?;
        Ok(Self {
            project_id: project_id.to_string(),
            certs_url: GOOGLE_CERTS_URL.to_string(),
            http,
            cache: RwLock::new(None),
        })
    }

    /// Verifies `token` and returns the user id it was issued to.
    pub async fn verify(&self, token: &str) -> Result<String, AuthError> {
        if !self.has_fresh_certs() {
            let keys = self.fetch_certs().await?;
            self.store_certs(keys);
        }
        self.uid_from_token(token)
    }

    fn has_fresh_certs(&self) -> bool {
        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        cache
            .as_ref()
            .is_some_and(|cached| cached.fetched_at.elapsed() < CACHE_TTL)
    }

    fn store_certs(&self, keys: HashMap<String, DecodingKey>) {
        let mut cache = self.cache.write().unwrap_or_else(|e| e.into_inner());
        *cache = Some(CachedCerts {
            keys,
            fetched_at: Instant::now(),
        });
    }

    async fn fetch_certs(&self) -> Result<HashMap<String, DecodingKey>, AuthError> {
        let response: HashMap<String, String> = self
            .http
            .get(&self.certs_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch Google certs: {e}");
                AuthError::CertsFetchFailed
            })?
            .json()
            .await
            .map_err(|e| {
                tracing::error!("Failed to parse Google certs: {e}");
                AuthError::CertsFetchFailed
            })?;

        let mut keys = HashMap::new();
        for (kid, pem) in response {
            let key = DecodingKey::from_rsa_pem(pem.as_bytes())
                .map_err(|_| AuthError::CertDecodeFailed)?;
            keys.insert(kid, key);
        }
        Ok(keys)
    }

    fn uid_from_token(&self, token: &str) -> Result<String, AuthError> {
        let header: Header = decode_header(token).map_err(|_| AuthError::InvalidTokenHeader)?;
        let kid = header.kid.ok_or(AuthError::MissingKid)?;

        let cache = self.cache.read().unwrap_or_else(|e| e.into_inner());
        let decoding_key = cache
            .as_ref()
            .and_then(|cached| cached.keys.get(&kid))
            .ok_or(AuthError::UnknownKid)?;

        let expected_issuer = format!("https://securetoken.google.com/{}", self.project_id);
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_audience(&[&self.project_id]);
        validation.set_issuer(&[&expected_issuer]);
        validation.validate_exp = true;

        let token_data = decode::<FirebaseClaims>(token, decoding_key, &validation)
            .map_err(|_| AuthError::TokenValidationFailed)?;
        Ok(token_data.claims.sub)
    }
}

/// Firebase Bearer token authentication
#[derive(SecurityScheme)]
#[oai(
    ty = "bearer",
    bearer_format = "JWT",
    checker = "firebase_bearer_checker"
)]
pub struct FirebaseBearer(pub String);

async fn firebase_bearer_checker(
    req: &Request,
    bearer: poem_openapi::auth::Bearer,
) -> Option<String> {
    let Some(verifier) = req.data::<Arc<FirebaseTokenVerifier>>() else {
        tracing::error!("Token verifier missing from request data");
        return None;
    };

    match verifier.verify(&bearer.token).await {
        Ok(uid) => Some(uid),
        Err(e) => {
            tracing::warn!("Firebase auth failed: {e}");
            None
        }
    }
}
