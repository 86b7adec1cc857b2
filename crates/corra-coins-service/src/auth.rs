//! Request authentication extractors.
//!
//! Two identities exist in this API: shoppers, who present a Bearer JWT
//! minted by the external auth provider ([`AuthUser`]), and back-office
//! operators working the verification queue, who present a shared API key
//! ([`AdminAuth`]). Signing keys are pulled from the provider's JWKS
//! endpoint and cached in-process.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use corra_coins_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// How long fetched signing keys stay valid before a re-fetch.
const JWKS_CACHE_DURATION: Duration = Duration::from_secs(3600);

/// Timeout for a single JWKS fetch.
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// The shopper a validated JWT belongs to.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Ledger account owner.
    pub user_id: UserId,

    /// Raw `sub` claim, kept for audit logs.
    pub subject: String,
}

impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let token = parts
                .headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                .and_then(|h| h.strip_prefix("Bearer "))
                .ok_or(ApiError::Unauthorized)?;

            // Test builds accept `test-token:<user-uuid>` so the harness can
            // act as arbitrary users without a signing provider. Compiled out
            // of release binaries.
            #[cfg(any(test, feature = "test-auth"))]
            if let Some(raw_id) = token.strip_prefix("test-token:") {
                let user_id = raw_id.parse::<UserId>().map_err(|_| ApiError::Unauthorized)?;
                return Ok(AuthUser {
                    user_id,
                    subject: raw_id.to_string(),
                });
            }

            let claims = validate_jwt(token, state).await?;

            // The provider's subject is the ledger user id.
            let user_id = claims
                .sub
                .parse::<UserId>()
                .map_err(|_| ApiError::Unauthorized)?;

            Ok(AuthUser {
                user_id,
                subject: claims.sub,
            })
        })
    }
}

/// An operator authenticated for the admin surface.
///
/// The `x-admin-key` header must match the configured key; `x-admin-id`,
/// when present, names the operator in transaction notes and logs.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Operator name for the audit trail.
    pub admin_id: String,
}

impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut Parts,
        state: &'life1 Arc<AppState>,
    ) -> ::core::pin::Pin<
        Box<
            dyn ::core::future::Future<Output = Result<Self, Self::Rejection>>
                + ::core::marker::Send
                + 'async_trait,
        >,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let presented = parts
                .headers
                .get("x-admin-key")
                .and_then(|v| v.to_str().ok())
                .ok_or(ApiError::Unauthorized)?;

            // No configured key means the admin surface is closed.
            let expected = state
                .config
                .admin_api_key
                .as_ref()
                .ok_or(ApiError::Unauthorized)?;

            if presented != expected {
                return Err(ApiError::Unauthorized);
            }

            let admin_id = parts
                .headers
                .get("x-admin-id")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("admin")
                .to_string();

            tracing::debug!(admin_id = %admin_id, "Admin authenticated");

            Ok(AdminAuth { admin_id })
        })
    }
}

/// Claims this service reads out of a shopper JWT.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject; parsed as the ledger user id.
    pub sub: String,
    /// Audience, string or array depending on the provider.
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    /// Issuer.
    pub iss: String,
    /// Expiry (unix seconds).
    pub exp: i64,
    /// Issued-at (unix seconds).
    pub iat: i64,
}

/// JWKS document as served at `/.well-known/jwks.json`.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    /// Published signing keys.
    pub keys: Vec<Jwk>,
}

/// One signing key from the JWKS document.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type; only `RSA` is accepted.
    pub kty: String,
    /// Key id matched against the token header.
    pub kid: Option<String>,
    /// Declared algorithm.
    pub alg: Option<String>,
    /// RSA modulus, base64url.
    pub n: Option<String>,
    /// RSA exponent, base64url.
    pub e: Option<String>,
    /// Declared use (`sig`).
    #[serde(rename = "use")]
    pub key_use: Option<String>,
}

/// In-process signing-key cache, shared by every request.
struct JwksCache {
    /// One pooled HTTP client for all JWKS fetches.
    client: reqwest::Client,
    /// Decoding keys by `kid`.
    keys: HashMap<String, DecodingKey>,
    /// Fallback for tokens whose header carries no `kid`.
    default_key: Option<DecodingKey>,
    /// Stamp of the last successful refresh.
    last_updated: Instant,
}

impl JwksCache {
    fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            keys: HashMap::new(),
            default_key: None,
            // Born expired so the first token triggers a fetch.
            last_updated: Instant::now()
                .checked_sub(JWKS_CACHE_DURATION)
                .unwrap_or_else(Instant::now),
        }
    }

    fn is_expired(&self) -> bool {
        self.last_updated.elapsed() >= JWKS_CACHE_DURATION
    }
}

static JWKS_CACHE: std::sync::OnceLock<RwLock<JwksCache>> = std::sync::OnceLock::new();

fn jwks_cache() -> &'static RwLock<JwksCache> {
    JWKS_CACHE.get_or_init(|| RwLock::new(JwksCache::new()))
}

/// Validate a shopper token: RS256 signature against the cached JWKS,
/// audience and issuer pinned to the configured auth provider.
async fn validate_jwt(token: &str, state: &AppState) -> Result<JwtClaims, ApiError> {
    let header = decode_header(token).map_err(|e| {
        tracing::debug!(error = %e, "Failed to decode JWT header");
        ApiError::Unauthorized
    })?;

    let decoding_key = decoding_key_for(header.kid.as_deref(), state).await?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_audience(&[&state.config.auth_audience]);
    validation.set_issuer(&[&state.config.auth_base_url]);

    let token_data = decode::<JwtClaims>(token, &decoding_key, &validation).map_err(|e| {
        tracing::debug!(error = %e, "JWT validation failed");
        ApiError::Unauthorized
    })?;

    Ok(token_data.claims)
}

/// Look up the decoding key for `kid`, refreshing the cache when it is
/// stale or the key is unknown.
async fn decoding_key_for(kid: Option<&str>, state: &AppState) -> Result<DecodingKey, ApiError> {
    let cache = jwks_cache();

    {
        let cached = cache.read().await;
        if !cached.is_expired() {
            if let Some(kid) = kid {
                if let Some(key) = cached.keys.get(kid) {
                    return Ok(key.clone());
                }
            } else if let Some(key) = &cached.default_key {
                return Ok(key.clone());
            }
        }
    }

    let jwks = fetch_jwks(state).await?;

    let mut cached = cache.write().await;
    cached.keys.clear();
    cached.default_key = None;
    cached.last_updated = Instant::now();

    for jwk in &jwks.keys {
        if let Some(decoding_key) = jwk_to_decoding_key(jwk) {
            if let Some(ref key_kid) = jwk.kid {
                cached.keys.insert(key_kid.clone(), decoding_key.clone());
            }
            // First usable key doubles as the kid-less fallback.
            if cached.default_key.is_none() {
                cached.default_key = Some(decoding_key);
            }
        }
    }

    if let Some(kid) = kid {
        cached.keys.get(kid).cloned().ok_or(ApiError::Unauthorized)
    } else {
        cached.default_key.clone().ok_or(ApiError::Unauthorized)
    }
}

/// Pull the JWKS document from the auth provider.
async fn fetch_jwks(state: &AppState) -> Result<Jwks, ApiError> {
    let jwks_url = format!("{}/.well-known/jwks.json", state.config.auth_base_url);

    tracing::debug!(url = %jwks_url, "Fetching JWKS");

    let client = {
        let cached = jwks_cache().read().await;
        cached.client.clone()
    };

    let response = client.get(&jwks_url).send().await.map_err(|e| {
        tracing::error!(error = %e, url = %jwks_url, "Failed to fetch JWKS");
        ApiError::Internal("Failed to fetch authentication keys".into())
    })?;

    if !response.status().is_success() {
        tracing::error!(
            status = %response.status(),
            url = %jwks_url,
            "JWKS fetch returned non-success status"
        );
        return Err(ApiError::Internal(
            "Failed to fetch authentication keys".into(),
        ));
    }

    let jwks: Jwks = response.json().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to parse JWKS response");
        ApiError::Internal("Failed to parse authentication keys".into())
    })?;

    tracing::info!(keys_count = %jwks.keys.len(), "JWKS fetched");

    Ok(jwks)
}

fn jwk_to_decoding_key(jwk: &Jwk) -> Option<DecodingKey> {
    if jwk.kty != "RSA" {
        tracing::debug!(kty = %jwk.kty, "Skipping non-RSA JWK");
        return None;
    }

    let n = jwk.n.as_ref()?;
    let e = jwk.e.as_ref()?;

    DecodingKey::from_rsa_components(n, e).ok()
}
