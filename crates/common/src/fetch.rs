//! Cache-then-failover lookups with graceful degradation
//!
//! Every upstream-backed lookup (market quotes, ESG scores, DID documents)
//! follows the same steps: compute a cache key, return a cached value if
//! there is one, otherwise ask an ordered list of providers, write the answer
//! back with a TTL, and on total failure serve a default payload instead of
//! an error. [`CachedFetch`] packages those steps.
//!
//! ```
//! # tokio_test::block_on(async {
//! use std::time::Duration;
//!
//! use rocville_common::cache::{MemoryStore, TieredCache, TieredCacheConfig};
//! use rocville_common::failover::FailoverChain;
//! use rocville_common::fetch::{CachedFetch, FetchOrigin};
//!
//! let cache = TieredCache::new(MemoryStore::new(), TieredCacheConfig::default()).unwrap();
//! let fetch = CachedFetch::new(&cache, "esg:data:ACME", Duration::from_secs(600));
//!
//! let chain = FailoverChain::<f64, String>::new()
//!     .provider("msci", || async { Err("quota exceeded".to_string()) })
//!     .provider("sustainalytics", || async { Ok(71.5) });
//!
//! let fetched = fetch.fetch_or_else(chain, || 0.0).await;
//! assert_eq!(fetched.value, 71.5);
//! assert_eq!(fetched.origin, FetchOrigin::Provider("sustainalytics".into()));
//! # });
//! ```

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, error, instrument, warn};

use crate::cache::{SharedStore, TieredCache};
use crate::failover::{FailoverChain, FailoverError, Truthy};
use crate::resilience::{ResilienceError, ResilienceRegistry};
use crate::time::{Clock, SystemClock};

/// Where a fetched value came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOrigin {
    /// Served by either cache tier
    Cache,
    /// Answered by the named provider and written back to the cache
    Provider(String),
    /// Every provider failed; the caller's default payload was served
    Default,
}

/// A value together with its [`FetchOrigin`]
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    /// The value handed to the caller
    pub value: T,
    /// Where it came from
    pub origin: FetchOrigin,
}

impl<T> Fetched<T> {
    /// Whether the value is the degraded default
    pub fn is_degraded(&self) -> bool {
        self.origin == FetchOrigin::Default
    }

    /// Whether the value was served from cache
    pub fn is_cached(&self) -> bool {
        self.origin == FetchOrigin::Cache
    }

    /// Discard the origin
    pub fn into_value(self) -> T {
        self.value
    }
}

/// One cached lookup: a cache, a key and the TTL to write back with
pub struct CachedFetch<'c, S, C = SystemClock>
where
    S: SharedStore,
    C: Clock,
{
    cache: &'c TieredCache<S, C>,
    key: String,
    ttl: Duration,
}

impl<S: SharedStore, C: Clock> fmt::Debug for CachedFetch<'_, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedFetch").field("key", &self.key).field("ttl", &self.ttl).finish()
    }
}

impl<'c, S: SharedStore, C: Clock> CachedFetch<'c, S, C> {
    /// Prepare a lookup of `key`, writing answers back with `ttl`
    pub fn new(cache: &'c TieredCache<S, C>, key: impl Into<String>, ttl: Duration) -> Self {
        Self { cache, key: key.into(), ttl }
    }

    /// Prepare a lookup that writes back with the cache's default TTL
    pub fn with_default_ttl(cache: &'c TieredCache<S, C>, key: impl Into<String>) -> Self {
        let ttl = cache.config().default_ttl;
        Self::new(cache, key, ttl)
    }

    /// Cache key of this lookup
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Return the cached value or run `chain`, writing its answer back
    ///
    /// Cache failures never fail the lookup: read errors count as a miss and
    /// write-back errors are logged.
    #[instrument(skip_all, fields(key = %self.key))]
    pub async fn fetch<T, E>(&self, chain: FailoverChain<'_, T, E>) -> Result<Fetched<T>, FailoverError<E>>
    where
        T: Serialize + DeserializeOwned + Truthy,
    {
        if let Some(value) = self.cached().await {
            return Ok(Fetched { value, origin: FetchOrigin::Cache });
        }

        let success = chain.execute_named().await?;
        self.write_back(&success.value).await;
        debug!(provider = %success.provider, position = success.position, "Served by provider");

        Ok(Fetched { value: success.value, origin: FetchOrigin::Provider(success.provider) })
    }

    /// Like [`fetch`](Self::fetch) but serve `default()` when every provider
    /// fails
    pub async fn fetch_or_else<T, E, D>(&self, chain: FailoverChain<'_, T, E>, default: D) -> Fetched<T>
    where
        T: Serialize + DeserializeOwned + Truthy,
        E: fmt::Display,
        D: FnOnce() -> T,
    {
        match self.fetch(chain).await {
            Ok(fetched) => fetched,
            Err(failure) => {
                let causes: Vec<String> = failure
                    .failures()
                    .iter()
                    .map(|f| format!("{}: {}", f.provider, f.cause))
                    .collect();
                error!(key = %self.key, error = %failure, causes = ?causes, "Serving default payload");
                Fetched { value: default(), origin: FetchOrigin::Default }
            }
        }
    }

    /// [`fetch`](Self::fetch) with the provider chain run through
    /// `registry` under `operation_key`
    ///
    /// `make_chain` is called once per attempt, since a chain is consumed
    /// when it runs.
    #[instrument(skip_all, fields(key = %self.key, operation_key = %operation_key))]
    pub async fn fetch_guarded<'p, T, E, RC, M>(
        &self,
        registry: &ResilienceRegistry<RC>,
        operation_key: &str,
        mut make_chain: M,
    ) -> Result<Fetched<T>, ResilienceError<FailoverError<E>>>
    where
        T: Serialize + DeserializeOwned + Truthy,
        E: fmt::Debug + fmt::Display + Send + Sync + 'static,
        RC: Clock,
        M: FnMut() -> FailoverChain<'p, T, E>,
    {
        if let Some(value) = self.cached().await {
            return Ok(Fetched { value, origin: FetchOrigin::Cache });
        }

        let success =
            registry.retry_operation(operation_key, || make_chain().execute_named()).await?;
        self.write_back(&success.value).await;

        Ok(Fetched { value: success.value, origin: FetchOrigin::Provider(success.provider) })
    }

    async fn cached<T: DeserializeOwned>(&self) -> Option<T> {
        match self.cache.get::<T>(&self.key).await {
            Ok(Some(value)) => {
                debug!(key = %self.key, "Cache hit");
                Some(value)
            }
            Ok(None) => None,
            Err(error) => {
                warn!(key = %self.key, error = %error, "Cache read failed, treating as miss");
                None
            }
        }
    }

    async fn write_back<T: Serialize>(&self, value: &T) {
        if let Err(error) = self.cache.set(&self.key, value, self.ttl).await {
            if error.is_unavailable() {
                debug!(key = %self.key, error = %error, "Cache write-back skipped");
            } else {
                warn!(key = %self.key, error = %error, "Cache write-back failed");
            }
        }
    }
}
