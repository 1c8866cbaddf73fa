//! Token management for bundle services.
//!
//! Tokens live in the `auth` section of the state document, keyed by address.
//! [`AuthenticationEngine::ensure_token`] returns a cached token while it is
//! comfortably valid, refreshes it when it is close to expiry, and otherwise
//! performs a full login.

use std::sync::Arc;

use parking_lot::Mutex;

use codalab_client::{BundleClient, GrantKind, IssuedToken, is_local_address};
use codalab_config::{AuthEntry, PersistedStore, State, TokenInfo};

use crate::error::{AuthError, Result};
use crate::prompt::{CredentialPrompt, Credentials};

/// Tokens expiring within this many seconds are refreshed before use.
pub const REFRESH_THRESHOLD_SECS: f64 = 600.0;

/// Current time in seconds since the Unix epoch.
pub fn now_secs() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}

// ============================================================================
// AuthenticationEngine
// ============================================================================

/// Obtains access tokens, prompting only when nothing cached can be used.
pub struct AuthenticationEngine {
    state: Arc<Mutex<State>>,
    store: PersistedStore,
    prompt: Box<dyn CredentialPrompt>,
    root_user_name: String,
}

impl std::fmt::Debug for AuthenticationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthenticationEngine")
            .field("state_path", &self.store.state_path())
            .field("root_user_name", &self.root_user_name)
            .finish()
    }
}

impl AuthenticationEngine {
    /// Create an engine over a shared state document.
    pub fn new(
        state: Arc<Mutex<State>>,
        store: PersistedStore,
        prompt: Box<dyn CredentialPrompt>,
        root_user_name: impl Into<String>,
    ) -> Self {
        Self {
            state,
            store,
            prompt,
            root_user_name: root_user_name.into(),
        }
    }

    /// Return a usable access token for `client`'s address.
    pub fn ensure_token(&self, client: &dyn BundleClient) -> Result<String> {
        let address = client.address();
        let cached = self.state.lock().auth.get(address).cloned();

        if let Some(info) = cached.as_ref().and_then(|entry| entry.token_info.as_ref()) {
            if info.expires_at > now_secs() + REFRESH_THRESHOLD_SECS {
                tracing::debug!(%address, "using cached token");
                return Ok(info.access_token.clone());
            }
        }

        self.renew(client, cached)
    }

    /// Replace `rejected`, a token the service refused.
    ///
    /// If the cached token is `rejected` it is refreshed or replaced by a full
    /// login regardless of its expiry. Otherwise the cache was already renewed
    /// and this behaves like [`ensure_token`](Self::ensure_token).
    pub fn reauthenticate(&self, client: &dyn BundleClient, rejected: &str) -> Result<String> {
        let address = client.address();
        let cached = self.state.lock().auth.get(address).cloned();

        let is_rejected = cached
            .as_ref()
            .and_then(|entry| entry.token_info.as_ref())
            .is_some_and(|info| info.access_token == rejected);
        if !is_rejected {
            return self.ensure_token(client);
        }

        tracing::debug!(%address, "cached token rejected by service");
        self.renew(client, cached)
    }

    /// Refresh the cached token if it has not expired, else log in.
    fn renew(&self, client: &dyn BundleClient, cached: Option<AuthEntry>) -> Result<String> {
        let address = client.address();

        if let Some(AuthEntry {
            token_info: Some(info),
            username,
        }) = cached
        {
            if info.expires_at > now_secs() {
                match username.as_deref() {
                    Some(username) => {
                        if let Some(token) = self.refresh(client, username, &info)? {
                            return Ok(token);
                        }
                    }
                    None => tracing::warn!(%address, "cached token has no username, cannot refresh"),
                }
            }
        }

        self.state.lock().auth.remove(address);
        self.login(client)
    }

    /// Forget the credentials for `address` and persist.
    pub fn logout(&self, address: &str) -> Result<()> {
        let mut state = self.state.lock();
        if state.auth.remove(address).is_some() {
            tracing::info!(%address, "logged out");
        }
        self.store.save_state(&state)?;
        Ok(())
    }

    /// Expiry details for the token cached under `address`.
    pub fn token_status(&self, address: &str) -> Option<TokenStatus> {
        let state = self.state.lock();
        let entry = state.auth.get(address)?;
        let info = entry.token_info.as_ref()?;
        let remaining = info.expires_at - now_secs();
        Some(TokenStatus {
            username: entry.username.clone(),
            expires_in_secs: remaining.max(0.0) as u64,
            is_expired: remaining <= 0.0,
        })
    }

    /// Attempt a refresh. `Ok(None)` means fall through to a full login.
    fn refresh(
        &self,
        client: &dyn BundleClient,
        username: &str,
        info: &TokenInfo,
    ) -> Result<Option<String>> {
        let address = client.address();
        tracing::debug!(%address, "token near expiry, refreshing");

        match client.login(GrantKind::RefreshToken, username, &info.refresh_token) {
            Ok(Some(mut issued)) => {
                if issued.refresh_token.is_empty() {
                    issued.refresh_token = info.refresh_token.clone();
                }
                self.cache_token(address, issued, None).map(Some)
            }
            Ok(None) => {
                tracing::warn!(%address, "refresh token rejected");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(%address, error = %e, "token refresh failed");
                Ok(None)
            }
        }
    }

    fn login(&self, client: &dyn BundleClient) -> Result<String> {
        let address = client.address();

        let credentials = if is_local_address(address) {
            Credentials {
                username: self.root_user_name.clone(),
                password: String::new(),
            }
        } else {
            self.prompt.request_credentials(address)?
        };

        let issued = client
            .login(
                GrantKind::Credentials,
                &credentials.username,
                &credentials.password,
            )?
            .ok_or_else(|| AuthError::PermissionDenied("Invalid username or password.".to_string()))?;

        tracing::info!(%address, username = %credentials.username, "logged in");
        self.cache_token(address, issued, Some(credentials.username))
    }

    /// Store `issued` with an absolute expiry, persist, and return the access token.
    fn cache_token(
        &self,
        address: &str,
        issued: IssuedToken,
        username: Option<String>,
    ) -> Result<String> {
        let access_token = issued.access_token.clone();
        let info = TokenInfo {
            access_token: issued.access_token,
            refresh_token: issued.refresh_token,
            expires_at: now_secs() + issued.expires_in,
            token_type: issued.token_type,
            scope: issued.scope,
        };

        let mut state = self.state.lock();
        let entry = state.auth.entry(address.to_string()).or_default();
        entry.token_info = Some(info);
        if username.is_some() {
            entry.username = username;
        }
        self.store.save_state(&state)?;
        Ok(access_token)
    }
}

// ============================================================================
// TokenStatus
// ============================================================================

/// Information about a cached token for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenStatus {
    pub username: Option<String>,
    pub expires_in_secs: u64,
    pub is_expired: bool,
}

impl TokenStatus {
    pub fn expires_in_display(&self) -> String {
        if self.is_expired {
            "Expired (will log in again on next use)".to_string()
        } else {
            let hours = self.expires_in_secs / 3600;
            let minutes = (self.expires_in_secs % 3600) / 60;
            format!("{}h {}m", hours, minutes)
        }
    }
}
