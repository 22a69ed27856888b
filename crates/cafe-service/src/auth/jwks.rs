//! Key set cache for verifying access tokens.
//!
//! Fetches the issuer's published JSON Web Key Set and caches the signing
//! keys by key ID. The cache is refreshed only when a requested key ID is
//! missing, and a refresh replaces the whole set: a key the issuer stopped
//! publishing disappears.
//!
//! # Concurrency
//!
//! - Readers clone an `Arc` snapshot of the current set and never observe a
//!   partially built one.
//! - Refreshes are serialized by a mutex and tagged with a generation. A
//!   caller that queued behind an in-flight refresh reuses its result
//!   instead of fetching again, so at most one fetch runs per generation.
//! - Every fetch is bounded by a timeout; a timeout is a fetch failure.

use crate::observability::metrics;
use async_trait::async_trait;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::instrument;

/// Default bound on a single key-set fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON Web Key as published by the issuer.
///
/// Only the members needed to build a verification key are read; anything
/// else (`x5c`, `x5t`, ...) is ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type: "RSA", "EC" or "OKP".
    pub kty: String,

    /// Key ID - used to select the correct key for verification.
    #[serde(default)]
    pub kid: Option<String>,

    /// Algorithm the key is intended for.
    #[serde(default)]
    pub alg: Option<String>,

    /// Key use (should be "sig" for signing).
    #[serde(default, rename = "use")]
    pub key_use: Option<String>,

    /// RSA modulus (base64url).
    #[serde(default)]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default)]
    pub e: Option<String>,

    /// Curve name for EC / OKP keys.
    #[serde(default)]
    pub crv: Option<String>,

    /// EC x coordinate, or the OKP public key (base64url).
    #[serde(default)]
    pub x: Option<String>,

    /// EC y coordinate (base64url).
    #[serde(default)]
    pub y: Option<String>,
}

/// Key-set document (`{"keys": [...]}`).
#[derive(Debug, Clone, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<Jwk>,
}

/// Failure to obtain a key-set document from a [`KeySource`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct KeySourceError(pub String);

/// Outcome of a failed key resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum KeySetError {
    /// The key ID is absent even after refreshing.
    #[error("Key not found in key set")]
    KeyNotFound,

    /// The key set could not be fetched (network, status, body or timeout).
    #[error("Key source unavailable: {0}")]
    KeySourceUnavailable(String),
}

/// Where key-set documents come from.
#[async_trait]
pub trait KeySource: Send + Sync {
    /// Fetch the complete, current key-set document.
    async fn fetch(&self) -> Result<JwksDocument, KeySourceError>;
}

/// Key source backed by the issuer's HTTPS endpoint.
pub struct HttpKeySource {
    /// URL to the key-set document.
    url: String,

    /// HTTP client for fetching the document.
    http_client: reqwest::Client,
}

impl HttpKeySource {
    /// Create a key source for the given endpoint.
    ///
    /// The client's own timeout matches `timeout`; the cache applies the
    /// same bound around the whole fetch.
    pub fn new(url: String, timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "cafe.auth.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self { url, http_client }
    }
}

#[async_trait]
impl KeySource for HttpKeySource {
    async fn fetch(&self) -> Result<JwksDocument, KeySourceError> {
        tracing::debug!(target: "cafe.auth.jwks", url = %self.url, "Fetching key set");

        let response = self
            .http_client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| KeySourceError(format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(KeySourceError(format!(
                "endpoint returned {}",
                response.status()
            )));
        }

        response
            .json::<JwksDocument>()
            .await
            .map_err(|e| KeySourceError(format!("malformed key set document: {e}")))
    }
}

/// Key type family of a [`SigningKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    Rsa,
    Ec,
    Okp,
}

impl KeyType {
    fn for_algorithm(alg: Algorithm) -> Option<Self> {
        match alg {
            Algorithm::RS256
            | Algorithm::RS384
            | Algorithm::RS512
            | Algorithm::PS256
            | Algorithm::PS384
            | Algorithm::PS512 => Some(KeyType::Rsa),
            Algorithm::ES256 | Algorithm::ES384 => Some(KeyType::Ec),
            Algorithm::EdDSA => Some(KeyType::Okp),
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => None,
        }
    }
}

/// A verification key resolved from the key set.
///
/// Immutable once built; shared read-only across concurrent verifications.
#[derive(Clone)]
pub struct SigningKey {
    kid: String,
    key_type: KeyType,
    algorithm: Option<Algorithm>,
    decoding_key: DecodingKey,
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("key_type", &self.key_type)
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

impl SigningKey {
    /// Build a verification key from a published JWK.
    ///
    /// # Errors
    ///
    /// Returns a reason string when the JWK is not a usable signing key.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, String> {
        if let Some(key_use) = jwk.key_use.as_deref() {
            if key_use != "sig" {
                return Err(format!("key use '{key_use}' is not 'sig'"));
            }
        }

        let kid = jwk
            .kid
            .clone()
            .filter(|kid| !kid.is_empty())
            .ok_or_else(|| "missing kid".to_string())?;

        let algorithm = jwk
            .alg
            .as_deref()
            .map(|alg| {
                alg.parse::<Algorithm>()
                    .map_err(|_| format!("unsupported alg '{alg}'"))
            })
            .transpose()?;

        let (key_type, decoding_key) = match jwk.kty.as_str() {
            "RSA" => {
                let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
                    return Err("RSA key missing n or e".to_string());
                };
                let key = DecodingKey::from_rsa_components(n, e)
                    .map_err(|e| format!("invalid RSA components: {e}"))?;
                (KeyType::Rsa, key)
            }
            "EC" => {
                let (Some(x), Some(y)) = (jwk.x.as_deref(), jwk.y.as_deref()) else {
                    return Err("EC key missing x or y".to_string());
                };
                let key = DecodingKey::from_ec_components(x, y)
                    .map_err(|e| format!("invalid EC components: {e}"))?;
                (KeyType::Ec, key)
            }
            "OKP" => {
                if let Some(crv) = jwk.crv.as_deref() {
                    if crv != "Ed25519" {
                        return Err(format!("unsupported curve '{crv}'"));
                    }
                }
                let x = jwk.x.as_deref().ok_or_else(|| "OKP key missing x".to_string())?;
                let key = DecodingKey::from_ed_components(x)
                    .map_err(|e| format!("invalid OKP public key: {e}"))?;
                (KeyType::Okp, key)
            }
            other => return Err(format!("unsupported key type '{other}'")),
        };

        if let Some(alg) = algorithm {
            if KeyType::for_algorithm(alg) != Some(key_type) {
                return Err(format!("alg {alg:?} does not match key type {key_type:?}"));
            }
        }

        Ok(Self {
            kid,
            key_type,
            algorithm,
            decoding_key,
        })
    }

    /// Key ID.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Key type family.
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Whether this key may verify signatures made with `alg`.
    ///
    /// The key type must belong to the algorithm's family and, when the key
    /// declares its own `alg`, that value must match exactly.
    pub fn supports(&self, alg: Algorithm) -> bool {
        KeyType::for_algorithm(alg) == Some(self.key_type)
            && self.algorithm.map_or(true, |declared| declared == alg)
    }

    /// Key material for `jsonwebtoken::crypto::verify`.
    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding_key
    }
}

/// One complete, immutable generation of the cache.
struct KeySet {
    /// 0 until the first successful fetch, then incremented per refresh.
    generation: u64,

    /// Map of key ID to signing key.
    keys: HashMap<String, Arc<SigningKey>>,
}

impl KeySet {
    fn empty() -> Self {
        Self {
            generation: 0,
            keys: HashMap::new(),
        }
    }

    fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.get(kid).cloned()
    }
}

/// Cache of the issuer's signing keys, keyed by key ID.
///
/// Constructed once at startup and shared by reference with the verifier.
pub struct KeySetCache {
    /// Where key-set documents come from.
    source: Arc<dyn KeySource>,

    /// Current generation; swapped wholesale on refresh.
    current: RwLock<Arc<KeySet>>,

    /// Serializes refreshes and holds the failure of the last attempt,
    /// if it failed.
    refresh_lock: Mutex<Option<KeySetError>>,

    /// Completed fetch attempts, successful or not.
    attempts: AtomicU64,

    /// Bound on one fetch.
    fetch_timeout: Duration,
}

impl KeySetCache {
    /// Create an empty cache over `source` with the default fetch timeout.
    pub fn new(source: Arc<dyn KeySource>) -> Self {
        Self::with_fetch_timeout(source, DEFAULT_FETCH_TIMEOUT)
    }

    /// Create an empty cache over `source` with a custom fetch timeout.
    pub fn with_fetch_timeout(source: Arc<dyn KeySource>, fetch_timeout: Duration) -> Self {
        Self {
            source,
            current: RwLock::new(Arc::new(KeySet::empty())),
            refresh_lock: Mutex::new(None),
            attempts: AtomicU64::new(0),
            fetch_timeout,
        }
    }

    /// Resolve a signing key by key ID.
    ///
    /// A cache hit returns immediately. A miss triggers at most one refresh
    /// for this call; if the key is still absent afterwards the lookup
    /// fails with `KeyNotFound`.
    ///
    /// # Errors
    ///
    /// - `KeyNotFound` - the key ID is not in the refreshed set
    /// - `KeySourceUnavailable` - the refresh failed or timed out
    #[instrument(skip(self), fields(kid = %kid))]
    pub async fn resolve(&self, kid: &str) -> Result<Arc<SigningKey>, KeySetError> {
        let snapshot = self.snapshot().await;
        if let Some(key) = snapshot.get(kid) {
            tracing::debug!(target: "cafe.auth.jwks", kid = %kid, "Key set cache hit");
            return Ok(key);
        }

        tracing::debug!(target: "cafe.auth.jwks", kid = %kid, "Key set cache miss");
        let refreshed = self.refresh_after(snapshot.generation).await?;

        refreshed.get(kid).ok_or_else(|| {
            tracing::warn!(target: "cafe.auth.jwks", kid = %kid, "Key not found in key set after refresh");
            KeySetError::KeyNotFound
        })
    }

    /// Fetch the key set if it has never been loaded.
    ///
    /// # Errors
    ///
    /// Returns `KeySourceUnavailable` if the initial fetch fails.
    pub async fn ensure_loaded(&self) -> Result<(), KeySetError> {
        let snapshot = self.snapshot().await;
        if snapshot.generation == 0 {
            self.refresh_after(0).await?;
        }
        Ok(())
    }

    #[cfg(test)]
    async fn generation(&self) -> u64 {
        self.snapshot().await.generation
    }

    async fn snapshot(&self) -> Arc<KeySet> {
        self.current.read().await.clone()
    }

    /// Refresh unless a fetch completed while this caller waited for the
    /// lock. Waiters share that fetch's outcome: the new set if it
    /// succeeded, its `KeySourceUnavailable` if it failed.
    async fn refresh_after(&self, seen_generation: u64) -> Result<Arc<KeySet>, KeySetError> {
        let seen_attempt = self.attempts.load(Ordering::Acquire);
        let mut last_failure = self.refresh_lock.lock().await;

        let latest = self.snapshot().await;
        if latest.generation != seen_generation {
            tracing::debug!(
                target: "cafe.auth.jwks",
                generation = latest.generation,
                "Reusing key set from concurrent refresh"
            );
            return Ok(latest);
        }

        if self.attempts.load(Ordering::Acquire) != seen_attempt {
            if let Some(failure) = last_failure.as_ref() {
                tracing::debug!(target: "cafe.auth.jwks", "Sharing failure of concurrent refresh");
                return Err(failure.clone());
            }
        }

        let outcome = self.fetch_next(latest.generation).await;
        *last_failure = outcome.as_ref().err().cloned();
        self.attempts.fetch_add(1, Ordering::Release);

        let next = outcome?;
        *self.current.write().await = next.clone();
        Ok(next)
    }

    /// One bounded fetch, building the set that follows `generation`.
    async fn fetch_next(&self, generation: u64) -> Result<Arc<KeySet>, KeySetError> {
        let start = Instant::now();
        let document = match tokio::time::timeout(self.fetch_timeout, self.source.fetch()).await {
            Ok(Ok(document)) => document,
            Ok(Err(e)) => {
                tracing::error!(target: "cafe.auth.jwks", error = %e, "Failed to fetch key set");
                metrics::record_jwks_refresh("error", start.elapsed());
                return Err(KeySetError::KeySourceUnavailable(e.to_string()));
            }
            Err(_) => {
                tracing::error!(
                    target: "cafe.auth.jwks",
                    timeout_ms = self.fetch_timeout.as_millis() as u64,
                    "Key set fetch timed out"
                );
                metrics::record_jwks_refresh("timeout", start.elapsed());
                return Err(KeySetError::KeySourceUnavailable(
                    "key set fetch timed out".to_string(),
                ));
            }
        };

        let keys: HashMap<String, Arc<SigningKey>> = document
            .keys
            .iter()
            .filter_map(|jwk| match SigningKey::from_jwk(jwk) {
                Ok(key) => Some((key.kid.clone(), Arc::new(key))),
                Err(reason) => {
                    tracing::warn!(
                        target: "cafe.auth.jwks",
                        kid = ?jwk.kid,
                        reason = %reason,
                        "Skipping unusable key in key set"
                    );
                    None
                }
            })
            .collect();

        let next = Arc::new(KeySet {
            generation: generation + 1,
            keys,
        });

        tracing::info!(
            target: "cafe.auth.jwks",
            key_count = next.keys.len(),
            generation = next.generation,
            "Key set cache refreshed"
        );
        metrics::record_jwks_refresh("success", start.elapsed());

        Ok(next)
    }
}
