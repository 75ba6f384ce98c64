//! Ordered provider failover

use std::future::Future;

use futures::future::BoxFuture;
use futures::FutureExt;

use super::error::{FailoverError, FailoverResult, FailureCause, ProviderFailure};
use super::truthy::Truthy;

/// Boxed future produced by a provider in a [`FailoverChain`]
pub type ProviderFuture<'a, T, E> = BoxFuture<'a, Result<T, E>>;

/// Type-erased provider so a chain can mix different closures
pub type BoxedProvider<'a, T, E> = Box<dyn FnOnce() -> ProviderFuture<'a, T, E> + Send + 'a>;

struct NamedProvider<'a, T, E> {
    name: String,
    call: BoxedProvider<'a, T, E>,
}

/// The winning provider and its value
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderSuccess<T> {
    /// Name of the provider that answered
    pub provider: String,
    /// Zero-based position of that provider in the chain
    pub position: usize,
    /// The value it returned
    pub value: T,
}

/// Try providers in order and return the first truthy success.
///
/// Each provider is invoked at most once. Errors and empty values move on to
/// the next provider; later providers are never invoked once one succeeds.
/// An empty list fails with [`FailoverError::AllProvidersFailed`].
///
/// ```
/// # tokio_test::block_on(async {
/// use rocville_common::failover::failover;
///
/// let providers: Vec<Box<dyn FnOnce() -> std::future::Ready<Result<u32, String>>>> = vec![
///     Box::new(|| std::future::ready(Err("rate limited".to_string()))),
///     Box::new(|| std::future::ready(Ok(0))),
///     Box::new(|| std::future::ready(Ok(42))),
/// ];
///
/// assert_eq!(failover(providers).await.ok(), Some(42));
/// # });
/// ```
pub async fn failover<I, F, Fut, T, E>(providers: I) -> FailoverResult<T, E>
where
    I: IntoIterator<Item = F>,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    T: Truthy,
{
    let mut failures = Vec::new();

    for (position, provider) in providers.into_iter().enumerate() {
        let cause = match provider().await {
            Ok(value) if value.is_truthy() => return Ok(value),
            Ok(_) => FailureCause::Empty,
            Err(error) => FailureCause::Error(error),
        };
        failures.push(ProviderFailure { provider: format!("provider[{position}]"), position, cause });
    }

    Err(FailoverError::AllProvidersFailed { failures })
}

/// Builder for a named, heterogeneous provider list
///
/// ```
/// # tokio_test::block_on(async {
/// use rocville_common::failover::FailoverChain;
///
/// let quote = FailoverChain::<f64, String>::new()
///     .provider("alpha_vantage", || async { Err("quota exceeded".to_string()) })
///     .provider("finnhub", || async { Ok(187.42) })
///     .execute()
///     .await;
///
/// assert_eq!(quote.ok(), Some(187.42));
/// # });
/// ```
pub struct FailoverChain<'a, T, E> {
    providers: Vec<NamedProvider<'a, T, E>>,
}

impl<T, E> std::fmt::Debug for FailoverChain<'_, T, E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailoverChain").field("providers", &self.provider_names()).finish()
    }
}

impl<T, E> Default for FailoverChain<'_, T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, T, E> FailoverChain<'a, T, E> {
    /// Create an empty chain
    pub fn new() -> Self {
        Self { providers: Vec::new() }
    }

    /// Append a provider; providers run in the order they were added
    pub fn provider<F, Fut>(mut self, name: impl Into<String>, provider: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a,
    {
        self.push(name, provider);
        self
    }

    /// Append a provider to an existing chain
    pub fn push<F, Fut>(&mut self, name: impl Into<String>, provider: F)
    where
        F: FnOnce() -> Fut + Send + 'a,
        Fut: Future<Output = Result<T, E>> + Send + 'a,
    {
        self.providers
            .push(NamedProvider { name: name.into(), call: Box::new(move || provider().boxed()) });
    }

    /// Number of providers in the chain
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// Whether the chain has no providers
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in evaluation order
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    /// Run the chain and return the first truthy value
    pub async fn execute(self) -> FailoverResult<T, E>
    where
        T: Truthy,
    {
        self.execute_named().await.map(|success| success.value)
    }

    /// Run the chain and report which provider answered
    pub async fn execute_named(self) -> FailoverResult<ProviderSuccess<T>, E>
    where
        T: Truthy,
    {
        let mut failures = Vec::new();

        for (position, NamedProvider { name, call }) in self.providers.into_iter().enumerate() {
            let cause = match call().await {
                Ok(value) if value.is_truthy() => {
                    return Ok(ProviderSuccess { provider: name, position, value });
                }
                Ok(_) => FailureCause::Empty,
                Err(error) => FailureCause::Error(error),
            };
            failures.push(ProviderFailure { provider: name, position, cause });
        }

        Err(FailoverError::AllProvidersFailed { failures })
    }
}
