//! Token derivation through an opaque vendor module.
//!
//! The module itself is a black box behind [`TokenModule`]. [`TokenProvider`]
//! wraps it with process-wide lazy initialization and readiness polling, and
//! hands each derivation call its own [`PageContext`].

pub mod process;
#[cfg(any(test, feature = "test-utils"))]
pub mod stub;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
pub use process::ProcessTokenModule;
#[cfg(any(test, feature = "test-utils"))]
pub use stub::StubTokenModule;
use tokio::sync::OnceCell;

use crate::config::TokenConfig;
use crate::content::PageContext;

/// Errors from initializing or calling the token module.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The module has not exposed its derivation entry point.
    #[error("Token derivation entry point is not available")]
    Unavailable,

    /// Derivation ran but produced no token.
    #[error("Token derivation returned an empty value")]
    EmptyToken,

    /// The entry point never appeared within the readiness window.
    #[error("Token module not ready after {waited:?}")]
    InitTimeout {
        /// How long readiness was polled for
        waited: Duration,
    },

    /// The module artifact or its host could not be started.
    #[error("Failed to load token module: {reason}")]
    ModuleLoad {
        /// Underlying load failure
        reason: String,
    },

    /// The module host went away mid-exchange.
    #[error("Token module host exited: {reason}")]
    ModuleCrashed {
        /// What was observed when the host went away
        reason: String,
    },

    /// The module host answered with something unintelligible.
    #[error("Token module protocol error: {reason}")]
    Protocol {
        /// Description of the malformed exchange
        reason: String,
    },

    /// The module reported a failure of its own.
    #[error("Token derivation failed: {reason}")]
    Derivation {
        /// Message reported by the module
        reason: String,
    },
}

/// Capability interface of the vendor token module.
///
/// Implementations must tolerate concurrent calls; [`TokenProvider`]
/// guarantees `load` runs at most once at a time.
#[async_trait]
pub trait TokenModule: Send + Sync + fmt::Debug {
    /// Loads and starts the module.
    ///
    /// # Errors
    ///
    /// - `TokenError::ModuleLoad` - Artifact missing or host failed to start
    async fn load(&self) -> Result<(), TokenError>;

    /// Reports whether the derivation entry point is exposed yet.
    ///
    /// # Errors
    ///
    /// - `TokenError::ModuleCrashed` - Host stopped responding
    /// - `TokenError::Protocol` - Malformed probe response
    async fn has_entry_point(&self) -> Result<bool, TokenError>;

    /// Derives a token for `key` as if running on the page in `context`.
    ///
    /// # Errors
    ///
    /// - `TokenError::Derivation` - Module reported a failure
    /// - `TokenError::ModuleCrashed` - Host stopped responding
    /// - `TokenError::Protocol` - Malformed derivation response
    async fn derive(&self, key: &str, context: &PageContext) -> Result<Option<String>, TokenError>;
}

/// How long and how often readiness is polled after loading.
#[derive(Debug, Clone, Copy)]
pub struct Readiness {
    pub timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for Readiness {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            poll_interval: Duration::from_millis(50),
        }
    }
}

impl From<&TokenConfig> for Readiness {
    fn from(config: &TokenConfig) -> Self {
        Self {
            timeout: config.readiness_timeout,
            poll_interval: config.poll_interval,
        }
    }
}

/// Process-wide handle to the token module.
///
/// Initialization happens once; concurrent callers share the in-flight
/// attempt. A failed attempt leaves the handle uninitialized so the next
/// caller retries.
#[derive(Debug)]
pub struct TokenProvider {
    module: Arc<dyn TokenModule>,
    readiness: Readiness,
    initialized: OnceCell<()>,
}

impl TokenProvider {
    /// Wraps a module with the given readiness policy.
    pub fn new(module: Arc<dyn TokenModule>, readiness: Readiness) -> Self {
        Self {
            module,
            readiness,
            initialized: OnceCell::new(),
        }
    }

    /// Provider backed by the process-hosted vendor module.
    pub fn from_config(config: &TokenConfig) -> Self {
        Self::new(
            Arc::new(ProcessTokenModule::from_config(config)),
            Readiness::from(config),
        )
    }

    /// Loads the module and waits for its entry point.
    ///
    /// Returns immediately once a previous call has succeeded.
    ///
    /// # Errors
    ///
    /// - `TokenError::ModuleLoad` - Module could not be loaded
    /// - `TokenError::InitTimeout` - Entry point never appeared
    pub async fn ensure_ready(&self) -> Result<(), TokenError> {
        self.initialized
            .get_or_try_init(|| self.initialize())
            .await
            .map(|_| ())
    }

    async fn initialize(&self) -> Result<(), TokenError> {
        tracing::info!("Loading token module");
        self.module.load().await?;

        let Readiness {
            timeout,
            poll_interval,
        } = self.readiness;

        let poll = async {
            loop {
                if self.module.has_entry_point().await? {
                    return Ok::<(), TokenError>(());
                }
                tokio::time::sleep(poll_interval).await;
            }
        };

        match tokio::time::timeout(timeout, poll).await {
            Ok(Ok(())) => {
                tracing::info!("Token module ready");
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => {
                tracing::error!("Token module entry point did not appear within {timeout:?}");
                Err(TokenError::InitTimeout { waited: timeout })
            }
        }
    }

    /// Whether initialization has completed. Never regresses once true.
    pub fn is_ready(&self) -> bool {
        self.initialized.initialized()
    }

    /// Derives a token for `key` against a request-scoped page context.
    ///
    /// Does not initialize the module; call [`ensure_ready`](Self::ensure_ready) first.
    ///
    /// # Errors
    ///
    /// - `TokenError::Unavailable` - Module not initialized or entry point missing
    /// - `TokenError::EmptyToken` - Derivation produced no value
    /// - `TokenError::Derivation` - Module reported a failure
    /// - `TokenError::ModuleCrashed` - Host went away during this call
    pub async fn derive_token(&self, key: &str, context: &PageContext) -> Result<String, TokenError> {
        if !self.is_ready() || !self.module.has_entry_point().await? {
            return Err(TokenError::Unavailable);
        }

        match self.module.derive(key, context).await? {
            Some(token) if !token.trim().is_empty() => Ok(token),
            _ => Err(TokenError::EmptyToken),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use futures::future::join_all;

    use super::*;

    fn fast_readiness() -> Readiness {
        Readiness {
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(5),
        }
    }

    fn context() -> PageContext {
        PageContext {
            href: "https://vidlink.pro/movie/550".to_string(),
            path: "/movie/550".to_string(),
            origin: "https://vidlink.pro".to_string(),
        }
    }

    #[tokio::test]
    async fn test_concurrent_ensure_ready_loads_once() {
        let module = Arc::new(
            StubTokenModule::with_token("tok").with_load_delay(Duration::from_millis(30)),
        );
        let provider = Arc::new(TokenProvider::new(module.clone(), fast_readiness()));

        let calls = (0..8).map(|_| {
            let provider = provider.clone();
            async move { provider.ensure_ready().await }
        });
        let results = join_all(calls).await;

        assert!(results.iter().all(Result::is_ok));
        assert_eq!(module.load_count(), 1);
        assert!(provider.is_ready());
    }

    #[tokio::test]
    async fn test_readiness_polls_until_entry_point_appears() {
        let module = Arc::new(StubTokenModule::with_token("tok").ready_after_probes(3));
        let provider = TokenProvider::new(module.clone(), fast_readiness());

        provider.ensure_ready().await.unwrap();
        assert!(module.probe_count() >= 3);
    }

    #[tokio::test]
    async fn test_init_timeout_when_entry_point_never_appears() {
        let module = Arc::new(StubTokenModule::with_token("tok").never_ready());
        let provider = TokenProvider::new(
            module,
            Readiness {
                timeout: Duration::from_millis(40),
                poll_interval: Duration::from_millis(5),
            },
        );

        let err = provider.ensure_ready().await.unwrap_err();
        assert!(matches!(err, TokenError::InitTimeout { .. }));
        assert!(!provider.is_ready());
    }

    #[tokio::test]
    async fn test_failed_load_is_retried_by_next_caller() {
        let module = Arc::new(StubTokenModule::with_token("tok").failing_loads(1));
        let provider = TokenProvider::new(module.clone(), fast_readiness());

        assert!(matches!(
            provider.ensure_ready().await,
            Err(TokenError::ModuleLoad { .. })
        ));
        assert!(!provider.is_ready());

        provider.ensure_ready().await.unwrap();
        assert_eq!(module.load_count(), 2);
        assert!(provider.is_ready());
    }

    #[tokio::test]
    async fn test_derive_before_initialization_is_unavailable() {
        let module = Arc::new(StubTokenModule::with_token("tok"));
        let provider = TokenProvider::new(module.clone(), fast_readiness());

        let err = provider.derive_token("550", &context()).await.unwrap_err();
        assert_eq!(err, TokenError::Unavailable);
        assert_eq!(module.derive_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_token_is_rejected() {
        for token in [None, Some(String::new()), Some("  ".to_string())] {
            let module = Arc::new(StubTokenModule::with_tokens(move |_, _| token.clone()));
            let provider = TokenProvider::new(module, fast_readiness());
            provider.ensure_ready().await.unwrap();

            let err = provider.derive_token("550", &context()).await.unwrap_err();
            assert_eq!(err, TokenError::EmptyToken);
        }
    }

    #[tokio::test]
    async fn test_context_is_passed_per_call() {
        let module = Arc::new(StubTokenModule::with_tokens(|key, context| {
            Some(format!("{key}@{}", context.path))
        }));
        let provider = TokenProvider::new(module.clone(), fast_readiness());
        provider.ensure_ready().await.unwrap();

        let movie = context();
        let series = PageContext {
            href: "https://vidlink.pro/tv/1399".to_string(),
            path: "/tv/1399".to_string(),
            origin: "https://vidlink.pro".to_string(),
        };

        let (a, b) = tokio::join!(
            provider.derive_token("550", &movie),
            provider.derive_token("1399", &series)
        );
        assert_eq!(a.unwrap(), "550@/movie/550");
        assert_eq!(b.unwrap(), "1399@/tv/1399");
        assert_eq!(module.seen_contexts(), vec![movie, series]);
    }
}
