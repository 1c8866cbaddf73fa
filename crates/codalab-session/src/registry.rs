//! One bundle client per address.
//!
//! Clients are built on first request and cached for the life of the
//! process. Building a client also authenticates it, so a cached handle always
//! has a token installed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};

use codalab_auth::{AuthError, AuthenticationEngine};
use codalab_client::{
    AuthHandler, BundleClient, BundleStore, LocalBundleClient, MockAuthHandler, Model,
    RemoteBundleClient, TokenSource, User, is_local_address,
};
use codalab_config::{AuthHandlerConfig, Config, ConfigError, ServerConfig};

use crate::error::{ManagerError, Result};

/// Cache of bundle clients keyed by address.
pub struct ClientRegistry {
    config: Arc<RwLock<Config>>,
    home: PathBuf,
    engine: Arc<AuthenticationEngine>,
    clients: Mutex<HashMap<String, Arc<dyn BundleClient>>>,
    bundle_store: OnceLock<Arc<BundleStore>>,
    model: OnceLock<Arc<Model>>,
    mock_auth_handler: OnceLock<Arc<AuthHandler>>,
    auth_handler: OnceLock<Arc<AuthHandler>>,
}

impl std::fmt::Debug for ClientRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let addresses: Vec<String> = self.clients.lock().keys().cloned().collect();
        f.debug_struct("ClientRegistry")
            .field("home", &self.home)
            .field("clients", &addresses)
            .finish()
    }
}

impl ClientRegistry {
    pub fn new(
        config: Arc<RwLock<Config>>,
        home: impl Into<PathBuf>,
        engine: Arc<AuthenticationEngine>,
    ) -> Self {
        Self {
            config,
            home: home.into(),
            engine,
            clients: Mutex::new(HashMap::new()),
            bundle_store: OnceLock::new(),
            model: OnceLock::new(),
            mock_auth_handler: OnceLock::new(),
            auth_handler: OnceLock::new(),
        }
    }

    /// Return the client for `address`, building and authenticating it if
    /// needed.
    ///
    /// For local addresses, `is_cli` selects the mock auth handler and logs
    /// the root user in; server-side callers get the configured handler and
    /// authenticate per request themselves.
    pub fn get_client(&self, address: &str, is_cli: bool) -> Result<Arc<dyn BundleClient>> {
        if let Some(client) = self.get(address) {
            return Ok(client);
        }

        let client: Arc<dyn BundleClient> = if is_local_address(address) {
            self.build_local(address, is_cli)?
        } else {
            self.build_remote(address)?
        };

        tracing::debug!(%address, "registered client");
        self.clients
            .lock()
            .insert(address.to_string(), client.clone());
        Ok(client)
    }

    /// Cached client for `address`, if any.
    pub fn get(&self, address: &str) -> Option<Arc<dyn BundleClient>> {
        self.clients.lock().get(address).cloned()
    }

    /// Seed the cache with a prebuilt client.
    pub fn register(&self, address: impl Into<String>, client: Arc<dyn BundleClient>) {
        self.clients.lock().insert(address.into(), client);
    }

    /// Drop the cached client for `address`.
    pub fn forget(&self, address: &str) -> Option<Arc<dyn BundleClient>> {
        self.clients.lock().remove(address)
    }

    /// Addresses with a cached client.
    pub fn addresses(&self) -> Vec<String> {
        let mut addresses: Vec<String> = self.clients.lock().keys().cloned().collect();
        addresses.sort();
        addresses
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Local
    // ─────────────────────────────────────────────────────────────────────────

    fn build_local(&self, address: &str, is_cli: bool) -> Result<Arc<dyn BundleClient>> {
        let auth_handler = if is_cli {
            self.mock_auth_handler()
        } else {
            self.auth_handler()?
        };
        let verbose = self.config.read().cli.verbose.unwrap_or(0);

        let client = LocalBundleClient::new(
            address,
            self.bundle_store()?,
            self.model()?,
            auth_handler.clone(),
            verbose,
        );

        if is_cli {
            self.log_in_root(&client, &auth_handler)?;
        }

        Ok(Arc::new(client))
    }

    /// Install a token on `client` that `auth_handler` accepts.
    ///
    /// A cached token the handler refuses is replaced once before giving up.
    fn log_in_root(&self, client: &LocalBundleClient, auth_handler: &AuthHandler) -> Result<()> {
        let token = self.engine.ensure_token(client)?;
        client.install_token(&token);
        if auth_handler.validate_token(&token)? {
            return Ok(());
        }

        let address = client.address();
        tracing::warn!(%address, "cached token not accepted, logging in again");
        let token = self.engine.reauthenticate(client, &token)?;
        client.install_token(&token);
        if auth_handler.validate_token(&token)? {
            return Ok(());
        }

        Err(ManagerError::Auth(AuthError::PermissionDenied(format!(
            "Token for {} was not accepted",
            address
        ))))
    }

    fn server_config(&self) -> Result<ServerConfig> {
        self.config
            .read()
            .server
            .clone()
            .ok_or_else(|| {
                ManagerError::Config(ConfigError::MissingField {
                    field: "server".to_string(),
                    context: "a local client".to_string(),
                })
            })
    }

    fn root_user(&self) -> User {
        let config = self.config.read();
        User::new(config.root_user_name(), config.root_user_id())
    }

    /// Bundle store under the home directory.
    pub fn bundle_store(&self) -> Result<Arc<BundleStore>> {
        if let Some(store) = self.bundle_store.get() {
            return Ok(store.clone());
        }
        let server = self.server_config()?;
        let store = Arc::new(BundleStore::new(&self.home, &server.direct_upload_paths)?);
        Ok(self.bundle_store.get_or_init(|| store).clone())
    }

    /// Model named by `server.class`.
    pub fn model(&self) -> Result<Arc<Model>> {
        if let Some(model) = self.model.get() {
            return Ok(model.clone());
        }
        let server = self.server_config()?;
        let model = Arc::new(Model::from_config(
            &server.model,
            &self.home,
            self.root_user().id.as_str(),
        )?);
        Ok(self.model.get_or_init(|| model).clone())
    }

    /// Mock handler knowing only the root user.
    pub fn mock_auth_handler(&self) -> Arc<AuthHandler> {
        self.mock_auth_handler
            .get_or_init(|| {
                Arc::new(AuthHandler::Mock(MockAuthHandler::new(vec![
                    self.root_user(),
                ])))
            })
            .clone()
    }

    /// Handler named by `server.auth.class`.
    pub fn auth_handler(&self) -> Result<Arc<AuthHandler>> {
        if let Some(handler) = self.auth_handler.get() {
            return Ok(handler.clone());
        }
        let server = self.server_config()?;
        let handler = match server.auth {
            AuthHandlerConfig::Mock => self.mock_auth_handler(),
            ref auth => Arc::new(AuthHandler::from_config(auth, self.root_user())?),
        };
        Ok(self.auth_handler.get_or_init(|| handler).clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Remote
    // ─────────────────────────────────────────────────────────────────────────

    fn build_remote(&self, address: &str) -> Result<Arc<dyn BundleClient>> {
        let verbose = self.config.read().cli.verbose.unwrap_or(0);
        let client = RemoteBundleClient::builder(address, token_source(self.engine.clone()))
            .verbose(verbose)
            .build()?;

        let token = self.engine.ensure_token(&client)?;
        client.install_token(&token);
        Ok(Arc::new(client))
    }
}

/// Callback that lets a remote client re-authenticate through `engine`.
fn token_source(engine: Arc<AuthenticationEngine>) -> TokenSource {
    Arc::new(move |client: &dyn BundleClient, rejected: Option<&str>| {
        match rejected {
            Some(token) => engine.reauthenticate(client, token),
            None => engine.ensure_token(client),
        }
        .map_err(into_client_error)
    })
}

fn into_client_error(err: AuthError) -> codalab_client::Error {
    match err {
        AuthError::PermissionDenied(message) => codalab_client::Error::PermissionDenied(message),
        AuthError::Client(e) => e,
        other => codalab_client::Error::Config(other.to_string()),
    }
}
