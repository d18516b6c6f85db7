use chrono::TimeDelta;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::auth::token::{is_valid, Credential, Token};
use crate::config::settings::TokenConfig;
use crate::errors::AuthError;
use crate::helpers::time::{get_instant, now, seconds};
use crate::observability::metrics::get_metrics;
use crate::remote::Authenticator;
use crate::store::token_store::TokenStore;

type LoginAttempt = Shared<BoxFuture<'static, Result<Token, AuthError>>>;

/// How tokens are judged and where they are persisted.
#[derive(Debug, Clone)]
pub struct TokenPolicy {
    pub validity: TimeDelta,
    pub safety_margin: TimeDelta,
    pub store_key: String,
}

impl TokenPolicy {
    pub fn new(config: &TokenConfig, store_key: impl Into<String>) -> Self {
        Self {
            validity: seconds(config.validity_seconds),
            safety_margin: seconds(config.safety_margin_seconds),
            store_key: store_key.into(),
        }
    }
}

/// Owns the credential and the current token. Cheap to clone; clones share
/// state.
///
/// At most one login runs at a time: callers arriving while one is in flight
/// await that attempt and get its result, success or failure.
#[derive(Clone)]
pub struct TokenLifecycleManager {
    inner: Arc<Inner>,
}

struct Inner {
    authenticator: Arc<dyn Authenticator>,
    store: Arc<dyn TokenStore>,
    credential: Credential,
    policy: TokenPolicy,
    current: RwLock<Option<Token>>,
    in_flight: Mutex<Option<LoginAttempt>>,
}

impl TokenLifecycleManager {
    pub fn new(
        authenticator: Arc<dyn Authenticator>,
        store: Arc<dyn TokenStore>,
        credential: Credential,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                authenticator,
                store,
                credential,
                policy,
                current: RwLock::new(None),
                in_flight: Mutex::new(None),
            }),
        }
    }

    pub fn policy(&self) -> &TokenPolicy {
        &self.inner.policy
    }

    /// Cached token, valid or not.
    pub async fn current(&self) -> Option<Token> {
        self.inner.current.read().await.clone()
    }

    /// Cached token if it is still outside the safety margin, otherwise a
    /// fresh one from a single-flight login.
    pub async fn get_valid_token(&self) -> Result<Token, AuthError> {
        if let Some(token) = self.inner.valid_cached().await {
            return Ok(token);
        }
        debug!("no valid cached token, refreshing");
        self.refresh(false).await
    }

    /// Force a new token even if the cached one looks valid (a 401 is ground
    /// truth). Joins a login already in flight instead of starting another.
    pub async fn login(&self) -> Result<Token, AuthError> {
        self.refresh(true).await
    }

    /// Load a persisted token. Anything unusable is discarded from the store.
    pub async fn hydrate(&self) -> Option<Token> {
        let key = self.inner.policy.store_key.as_str();
        let blob = match self.inner.store.get(key).await {
            Ok(Some(blob)) => blob,
            Ok(None) => {
                debug!(key, "no stored token");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "token store read failed, starting without a token");
                return None;
            }
        };

        let token = match serde_json::from_str::<Token>(&blob) {
            Ok(token) if is_valid(&token, now(), self.inner.policy.safety_margin) => token,
            Ok(_) => {
                info!(key, "stored token past its safety margin, discarding");
                self.inner.clear_store().await;
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "stored token unreadable, discarding");
                self.inner.clear_store().await;
                return None;
            }
        };

        info!(expires_at = %token.expires_at(), "token restored from store");
        get_metrics().await.token_expiry_unix.set(token.expires_at().timestamp());
        *self.inner.current.write().await = Some(token.clone());
        Some(token)
    }

    /// Forget the token, in memory and in the store.
    pub async fn clear(&self) {
        *self.inner.current.write().await = None;
        self.inner.clear_store().await;
        get_metrics().await.token_expiry_unix.set(0);
        info!("token cleared");
    }

    async fn refresh(&self, force: bool) -> Result<Token, AuthError> {
        let attempt = {
            let mut slot = self.inner.in_flight.lock().await;
            // someone may have refreshed while we waited for the slot
            if !force {
                if let Some(token) = self.inner.valid_cached().await {
                    return Ok(token);
                }
            }
            match slot.as_ref().filter(|attempt| attempt.peek().is_none()) {
                Some(attempt) => {
                    debug!("login already in flight, joining it");
                    attempt.clone()
                }
                None => {
                    let attempt = Inner::login_once(self.inner.clone()).boxed().shared();
                    *slot = Some(attempt.clone());
                    attempt
                }
            }
        };

        let result = attempt.clone().await;

        let mut slot = self.inner.in_flight.lock().await;
        if slot.as_ref().is_some_and(|current| current.ptr_eq(&attempt)) {
            *slot = None;
        }
        result
    }
}

impl Inner {
    async fn valid_cached(&self) -> Option<Token> {
        self.current
            .read()
            .await
            .as_ref()
            .filter(|token| is_valid(token, now(), self.policy.safety_margin))
            .cloned()
    }

    async fn login_once(self: Arc<Self>) -> Result<Token, AuthError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        metrics.login_requests.inc();
        info!(username = %self.credential.username(), "logging in");

        let value = self
            .authenticator
            .authenticate(&self.credential)
            .await
            .inspect_err(|e| {
                metrics.login_failures.with_label_values(&[e.reason()]).inc();
                warn!(error = %e, "login failed");
            });
        metrics.login_duration.observe(start.elapsed().as_secs_f64());
        let value = value?;

        let token = Token::issue(value, now(), self.policy.validity);
        *self.current.write().await = Some(token.clone());
        metrics.token_expiry_unix.set(token.expires_at().timestamp());
        info!(expires_at = %token.expires_at(), "login succeeded");

        self.persist(&token).await;
        Ok(token)
    }

    // the in-memory token stays authoritative if persisting fails
    async fn persist(&self, token: &Token) {
        let key = self.policy.store_key.as_str();
        let blob = match serde_json::to_string(token) {
            Ok(blob) => blob,
            Err(e) => {
                warn!(key, error = %e, "token serialization failed, not persisted");
                return;
            }
        };
        if let Err(e) = self.store.set(key, blob, token.expires_at()).await {
            get_metrics().await.token_store_failures.with_label_values(&["set"]).inc();
            warn!(key, error = %e, "token persist failed");
        }
    }

    async fn clear_store(&self) {
        let key = self.policy.store_key.as_str();
        if let Err(e) = self.store.clear(key).await {
            get_metrics().await.token_store_failures.with_label_values(&["clear"]).inc();
            warn!(key, error = %e, "token store clear failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryTokenStore;
    use async_trait::async_trait;
    use futures::future::join_all;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Counts calls; fails while `fail` is set.
    struct FakeAuthenticator {
        calls: AtomicUsize,
        delay: Duration,
        fail: bool,
    }

    impl FakeAuthenticator {
        fn new(delay: Duration, fail: bool) -> Arc<Self> {
            Arc::new(Self { calls: AtomicUsize::new(0), delay, fail })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Authenticator for FakeAuthenticator {
        async fn authenticate(&self, _credential: &Credential) -> Result<String, AuthError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            tokio::time::sleep(self.delay).await;
            if self.fail {
                Err(AuthError::InvalidCredentials("bad password".into()))
            } else {
                Ok(format!("token-{}", n))
            }
        }
    }

    fn policy() -> TokenPolicy {
        TokenPolicy::new(&TokenConfig::default(), "apiToken")
    }

    fn manager(auth: Arc<FakeAuthenticator>, store: Arc<InMemoryTokenStore>) -> TokenLifecycleManager {
        TokenLifecycleManager::new(auth, store, Credential::new("operator", "secret"), policy())
    }

    fn store() -> Arc<InMemoryTokenStore> {
        Arc::new(InMemoryTokenStore::new(TimeDelta::minutes(5)))
    }

    #[tokio::test]
    async fn concurrent_callers_share_one_login() {
        let auth = FakeAuthenticator::new(Duration::from_millis(50), false);
        let manager = manager(auth.clone(), store());

        let tokens = join_all((0..10).map(|_| {
            let manager = manager.clone();
            async move { manager.get_valid_token().await }
        }))
        .await;

        assert_eq!(auth.calls(), 1);
        for token in tokens {
            assert_eq!(token.unwrap().value(), "token-1");
        }
    }

    #[tokio::test]
    async fn spawned_callers_share_one_login() {
        let auth = FakeAuthenticator::new(Duration::from_millis(50), false);
        let manager = manager(auth.clone(), store());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let manager = manager.clone();
                tokio::spawn(async move { manager.get_valid_token().await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap().value(), "token-1");
        }
        assert_eq!(auth.calls(), 1);
    }

    #[tokio::test]
    async fn cached_token_is_reused_and_forced_login_replaces_it() {
        let auth = FakeAuthenticator::new(Duration::ZERO, false);
        let store = store();
        let manager = manager(auth.clone(), store.clone());

        let first = manager.get_valid_token().await.unwrap();
        let again = manager.get_valid_token().await.unwrap();
        assert_eq!(first, again);
        assert_eq!(auth.calls(), 1);

        let forced = manager.login().await.unwrap();
        assert_eq!(forced.value(), "token-2");
        assert_eq!(auth.calls(), 2);
        assert_eq!(manager.current().await, Some(forced.clone()));

        // persisted blob is the latest token
        let blob = store.get("apiToken").await.unwrap().unwrap();
        assert_eq!(serde_json::from_str::<Token>(&blob).unwrap(), forced);
    }

    #[tokio::test]
    async fn forced_logins_during_flight_are_coalesced() {
        let auth = FakeAuthenticator::new(Duration::from_millis(50), false);
        let manager = manager(auth.clone(), store());

        let (a, b, c) = tokio::join!(manager.login(), manager.login(), manager.get_valid_token());
        assert_eq!(auth.calls(), 1);
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(c.unwrap().value(), "token-1");
    }

    #[tokio::test]
    async fn failed_login_leaves_state_untouched_and_is_shared() {
        let auth = FakeAuthenticator::new(Duration::from_millis(20), true);
        let store = store();
        let manager = manager(auth.clone(), store.clone());

        let (a, b) = tokio::join!(manager.get_valid_token(), manager.get_valid_token());
        assert_eq!(a.unwrap_err(), AuthError::InvalidCredentials("bad password".into()));
        assert!(b.is_err());
        assert_eq!(auth.calls(), 1);
        assert_eq!(manager.current().await, None);
        assert_eq!(store.get("apiToken").await.unwrap(), None);

        // no automatic retry, but the next call tries again
        assert!(manager.get_valid_token().await.is_err());
        assert_eq!(auth.calls(), 2);
    }

    #[tokio::test]
    async fn failed_forced_login_keeps_previous_token() {
        let store = store();
        let ok = manager(FakeAuthenticator::new(Duration::ZERO, false), store.clone());
        let token = ok.get_valid_token().await.unwrap();

        let failing = manager(FakeAuthenticator::new(Duration::ZERO, true), store.clone());
        assert_eq!(failing.hydrate().await, Some(token.clone()));
        assert!(failing.login().await.is_err());
        assert_eq!(failing.current().await, Some(token));
    }

    #[tokio::test]
    async fn hydrate_restores_valid_token_without_login() {
        let store = store();
        let token = Token::issue("persisted".into(), now(), TimeDelta::hours(10));
        store
            .set("apiToken", serde_json::to_string(&token).unwrap(), token.expires_at())
            .await
            .unwrap();

        let auth = FakeAuthenticator::new(Duration::ZERO, false);
        let manager = manager(auth.clone(), store);
        assert_eq!(manager.hydrate().await, Some(token.clone()));
        assert_eq!(manager.get_valid_token().await.unwrap(), token);
        assert_eq!(auth.calls(), 0);
    }

    #[tokio::test]
    async fn hydrate_discards_token_inside_margin() {
        // store without margin so the stale blob is handed back to the manager
        let store = Arc::new(InMemoryTokenStore::new(TimeDelta::zero()));
        let stale = Token::issue("stale".into(), now() - TimeDelta::hours(10), TimeDelta::hours(10) + TimeDelta::minutes(3));
        store
            .set("apiToken", serde_json::to_string(&stale).unwrap(), stale.expires_at())
            .await
            .unwrap();

        let auth = FakeAuthenticator::new(Duration::ZERO, false);
        let manager = manager(auth.clone(), store.clone());
        assert_eq!(manager.hydrate().await, None);
        assert!(store.entry("apiToken").await.is_none(), "stale entry cleared");

        assert_eq!(manager.get_valid_token().await.unwrap().value(), "token-1");
        assert_eq!(auth.calls(), 1);
    }

    #[tokio::test]
    async fn hydrate_discards_garbage() {
        let store = store();
        store.set("apiToken", "not a token".into(), now() + TimeDelta::hours(1)).await.unwrap();
        let manager = manager(FakeAuthenticator::new(Duration::ZERO, false), store.clone());
        assert_eq!(manager.hydrate().await, None);
        assert!(store.entry("apiToken").await.is_none());
    }

    #[tokio::test]
    async fn corrupt_token_file_does_not_block_persisting() {
        use crate::store::file::FileTokenStore;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{ half written").unwrap();
        let store = Arc::new(FileTokenStore::new(&path, TimeDelta::minutes(5)));
        let manager = TokenLifecycleManager::new(
            FakeAuthenticator::new(Duration::ZERO, false),
            store.clone(),
            Credential::new("operator", "secret"),
            policy(),
        );

        assert_eq!(manager.hydrate().await, None);
        let token = manager.get_valid_token().await.unwrap();

        let blob = store.get("apiToken").await.unwrap().expect("token persisted");
        assert_eq!(serde_json::from_str::<Token>(&blob).unwrap(), token);
    }

    #[tokio::test]
    async fn clear_forgets_everything() {
        let store = store();
        let auth = FakeAuthenticator::new(Duration::ZERO, false);
        let manager = manager(auth.clone(), store.clone());
        manager.get_valid_token().await.unwrap();

        manager.clear().await;
        assert_eq!(manager.current().await, None);
        assert!(store.entry("apiToken").await.is_none());

        manager.get_valid_token().await.unwrap();
        assert_eq!(auth.calls(), 2);
    }
}
