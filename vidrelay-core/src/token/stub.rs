//! Scripted token module for tests.

use std::fmt;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use super::{TokenError, TokenModule};
use crate::content::PageContext;

type TokenFn = dyn Fn(&str, &PageContext) -> Option<String> + Send + Sync;

/// In-memory [`TokenModule`] with scripted tokens and readiness.
///
/// Counts loads, probes and derivations so tests can assert which calls
/// happened.
pub struct StubTokenModule {
    tokens: Box<TokenFn>,
    ready_after: Option<usize>,
    load_delay: Duration,
    failing_loads: AtomicUsize,
    loaded: AtomicBool,
    loads: AtomicUsize,
    probes: AtomicUsize,
    contexts: Mutex<Vec<PageContext>>,
}

impl StubTokenModule {
    /// Module that returns the same token for every derivation.
    pub fn with_token(token: &str) -> Self {
        let token = token.to_string();
        Self::with_tokens(move |_, _| Some(token.clone()))
    }

    /// Module whose derivation result is computed from the key and context.
    pub fn with_tokens<F>(tokens: F) -> Self
    where
        F: Fn(&str, &PageContext) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            tokens: Box::new(tokens),
            ready_after: Some(1),
            load_delay: Duration::ZERO,
            failing_loads: AtomicUsize::new(0),
            loaded: AtomicBool::new(false),
            loads: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            contexts: Mutex::new(Vec::new()),
        }
    }

    /// Entry point appears on the `probes`-th readiness probe.
    pub fn ready_after_probes(mut self, probes: usize) -> Self {
        self.ready_after = Some(probes.max(1));
        self
    }

    /// Entry point never appears.
    pub fn never_ready(mut self) -> Self {
        self.ready_after = None;
        self
    }

    /// Each load sleeps this long before returning.
    pub fn with_load_delay(mut self, delay: Duration) -> Self {
        self.load_delay = delay;
        self
    }

    /// The first `count` loads fail with `ModuleLoad`.
    pub fn failing_loads(self, count: usize) -> Self {
        self.failing_loads.store(count, Ordering::SeqCst);
        self
    }

    /// Number of `load` calls so far.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Number of readiness probes after a successful load.
    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    /// Number of derivation calls so far.
    pub fn derive_count(&self) -> usize {
        self.seen_contexts().len()
    }

    /// Page contexts received by derivation, in call order.
    pub fn seen_contexts(&self) -> Vec<PageContext> {
        self.contexts
            .lock()
            .map(|contexts| contexts.clone())
            .unwrap_or_default()
    }
}

impl fmt::Debug for StubTokenModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubTokenModule")
            .field("ready_after", &self.ready_after)
            .field("loads", &self.load_count())
            .field("probes", &self.probe_count())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl TokenModule for StubTokenModule {
    async fn load(&self) -> Result<(), TokenError> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if !self.load_delay.is_zero() {
            tokio::time::sleep(self.load_delay).await;
        }

        let failing = self
            .failing_loads
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1));
        if failing.is_ok() {
            return Err(TokenError::ModuleLoad {
                reason: "scripted load failure".to_string(),
            });
        }

        self.loaded.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn has_entry_point(&self) -> Result<bool, TokenError> {
        if !self.loaded.load(Ordering::SeqCst) {
            return Ok(false);
        }
        let probes = self.probes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self.ready_after.is_some_and(|after| probes >= after))
    }

    async fn derive(&self, key: &str, context: &PageContext) -> Result<Option<String>, TokenError> {
        if let Ok(mut contexts) = self.contexts.lock() {
            contexts.push(context.clone());
        }
        Ok((self.tokens)(key, context))
    }
}
