//! Per-invocation context tying sessions, clients and credentials together.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use codalab_auth::{AuthenticationEngine, CredentialPrompt, TerminalPrompt, TokenStatus};
use codalab_client::{AuthHandler, BundleClient, BundleStore, LOCAL_ADDRESS, Model};
use codalab_config::{
    Config, PersistedStore, SessionEntry, State, codalab_home, effective_home, expand_path,
};

use crate::error::{ManagerError, Result};
use crate::registry::ClientRegistry;
use crate::resolver::{ProcessTable, SessionResolver, SysinfoProcessTable};
use crate::worksheet::{WorksheetContextManager, split_worksheet_spec};

/// Everything one CLI invocation needs: config, state, session, clients.
#[derive(Debug)]
pub struct CodaLabManager {
    store: PersistedStore,
    config: Arc<RwLock<Config>>,
    state: Arc<Mutex<State>>,
    resolver: Arc<SessionResolver>,
    engine: Arc<AuthenticationEngine>,
    registry: Arc<ClientRegistry>,
    worksheets: WorksheetContextManager,
}

impl CodaLabManager {
    /// Create a manager builder.
    pub fn builder() -> CodaLabManagerBuilder {
        CodaLabManagerBuilder::default()
    }

    /// Build a manager over the default home directory.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn home(&self) -> &Path {
        self.store.home()
    }

    pub fn is_temporary(&self) -> bool {
        self.store.is_temporary()
    }

    pub fn store(&self) -> &PersistedStore {
        &self.store
    }

    /// Read access to the loaded config.
    pub fn config(&self) -> RwLockReadGuard<'_, Config> {
        self.config.read()
    }

    /// Snapshot of the in-memory state.
    pub fn state(&self) -> State {
        self.state.lock().clone()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Sessions and worksheets
    // ─────────────────────────────────────────────────────────────────────────

    pub fn session_name(&self) -> &str {
        self.resolver.resolve_session_name()
    }

    pub fn session(&self) -> SessionEntry {
        self.worksheets.session()
    }

    pub fn get_current_worksheet_uuid(&self) -> Result<(Arc<dyn BundleClient>, String)> {
        self.worksheets.get_current_worksheet_uuid()
    }

    pub fn set_current_worksheet_uuid(
        &self,
        client: &dyn BundleClient,
        worksheet_uuid: &str,
    ) -> Result<()> {
        self.worksheets
            .set_current_worksheet_uuid(client, worksheet_uuid)
    }

    /// Resolve a worksheet spec to a client and uuid.
    ///
    /// `address::name` looks `name` up on the (alias-resolved) address. A bare
    /// name is looked up on the current client relative to the current
    /// worksheet. An empty spec is the current worksheet.
    pub fn resolve_worksheet_spec(&self, spec: &str) -> Result<(Arc<dyn BundleClient>, String)> {
        if spec.is_empty() {
            return self.get_current_worksheet_uuid();
        }

        match split_worksheet_spec(spec) {
            (Some(address), name) => {
                let client = self.client(&self.apply_alias(address), true)?;
                let uuid = client.get_worksheet_uuid(None, name)?;
                Ok((client, uuid))
            }
            (None, name) => {
                let (client, base) = self.get_current_worksheet_uuid()?;
                let uuid = client.get_worksheet_uuid(Some(&base), name)?;
                Ok((client, uuid))
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Clients and credentials
    // ─────────────────────────────────────────────────────────────────────────

    /// Client for `address`, authenticated for CLI use when `is_cli`.
    pub fn client(&self, address: &str, is_cli: bool) -> Result<Arc<dyn BundleClient>> {
        self.registry.get_client(address, is_cli)
    }

    /// Client for the current session's address.
    pub fn current_client(&self) -> Result<Arc<dyn BundleClient>> {
        let address = self.session().address;
        self.client(&address, true)
    }

    pub fn local_client(&self) -> Result<Arc<dyn BundleClient>> {
        self.client(LOCAL_ADDRESS, true)
    }

    /// Clear credentials for `client`'s address and drop the cached handle.
    pub fn logout(&self, client: &dyn BundleClient) -> Result<()> {
        self.logout_address(client.address())
    }

    /// Like [`logout`](Self::logout) for an address that may have no client yet.
    pub fn logout_address(&self, address: &str) -> Result<()> {
        self.engine.logout(address)?;
        self.registry.forget(address);
        Ok(())
    }

    /// Expiry details for the cached token of `address`.
    pub fn token_status(&self, address: &str) -> Option<TokenStatus> {
        self.engine.token_status(address)
    }

    pub fn bundle_store(&self) -> Result<Arc<BundleStore>> {
        self.registry.bundle_store()
    }

    pub fn model(&self) -> Result<Arc<Model>> {
        self.registry.model()
    }

    /// Auth handler for server-side use; `mock` forces the mock handler.
    pub fn auth_handler(&self, mock: bool) -> Result<Arc<AuthHandler>> {
        if mock {
            Ok(self.registry.mock_auth_handler())
        } else {
            self.registry.auth_handler()
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Config
    // ─────────────────────────────────────────────────────────────────────────

    /// Resolve an alias, returning `key` when no alias matches.
    pub fn apply_alias(&self, key: &str) -> String {
        self.config.read().apply_alias(key).to_string()
    }

    /// Add or replace an alias and save the config.
    pub fn set_alias(&self, name: &str, address: &str) -> Result<()> {
        self.config
            .write()
            .aliases
            .insert(name.to_string(), address.to_string());
        self.save_config()
    }

    /// Remove an alias and save the config.
    pub fn remove_alias(&self, name: &str) -> Result<()> {
        if self.config.write().aliases.remove(name).is_none() {
            return Err(ManagerError::AliasNotFound(name.to_string()));
        }
        self.save_config()
    }

    pub fn save_config(&self) -> Result<()> {
        self.store.save_config(&self.config.read())?;
        Ok(())
    }

    pub fn save_state(&self) -> Result<()> {
        self.store.save_state(&self.state.lock())?;
        Ok(())
    }

    pub fn root_user_name(&self) -> String {
        self.config.read().root_user_name().to_string()
    }

    pub fn root_user_id(&self) -> String {
        self.config.read().root_user_id().to_string()
    }

    pub fn cli_verbose(&self) -> Option<u8> {
        self.config.read().cli.verbose
    }
}

/// Builder for creating a CodaLabManager.
#[derive(Default)]
pub struct CodaLabManagerBuilder {
    home: Option<PathBuf>,
    install_root: Option<PathBuf>,
    temporary: bool,
    session_name: Option<String>,
    prompt: Option<Box<dyn CredentialPrompt>>,
    process_table: Option<Box<dyn ProcessTable>>,
    clients: Vec<(String, Arc<dyn BundleClient>)>,
}

impl CodaLabManagerBuilder {
    /// Use `home` instead of `CODALAB_HOME` / `~/.codalab`.
    pub fn home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Directory `$CODALAB_CLI` expands to in the config.
    pub fn install_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.install_root = Some(root.into());
        self
    }

    /// Never read or write config and state on disk.
    pub fn temporary(mut self, temporary: bool) -> Self {
        self.temporary = temporary;
        self
    }

    /// Name the session instead of reading `CODALAB_SESSION`.
    pub fn session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = Some(name.into());
        self
    }

    /// Where usernames and passwords come from.
    pub fn prompt(mut self, prompt: impl CredentialPrompt + 'static) -> Self {
        self.prompt = Some(Box::new(prompt));
        self
    }

    /// Like [`prompt`](Self::prompt) for a prompt chosen at runtime.
    pub fn boxed_prompt(mut self, prompt: Box<dyn CredentialPrompt>) -> Self {
        self.prompt = Some(prompt);
        self
    }

    pub fn process_table(mut self, table: impl ProcessTable + 'static) -> Self {
        self.process_table = Some(Box::new(table));
        self
    }

    /// Seed a prebuilt client for `address`.
    pub fn client(mut self, address: impl Into<String>, client: Arc<dyn BundleClient>) -> Self {
        self.clients.push((address.into(), client));
        self
    }

    /// Load config and state and wire the components.
    pub fn build(self) -> Result<CodaLabManager> {
        let home = match self.home {
            Some(home) if self.temporary => expand_path(&home),
            Some(home) => {
                let home = expand_path(&home);
                std::fs::create_dir_all(&home).map_err(|source| {
                    codalab_config::ConfigError::WriteFile {
                        path: home.display().to_string(),
                        source,
                    }
                })?;
                home
            }
            None if self.temporary => effective_home(),
            None => codalab_home()?,
        };

        let mut store = if self.temporary {
            PersistedStore::temporary(home.clone())
        } else {
            PersistedStore::new(home.clone())
        };
        if let Some(root) = self.install_root {
            store = store.with_install_root(root);
        }

        let config = Arc::new(RwLock::new(store.load_config()?));
        let state = Arc::new(Mutex::new(store.load_state()?));

        let table = self
            .process_table
            .unwrap_or_else(|| Box::new(SysinfoProcessTable::new()));
        let resolver = Arc::new(match self.session_name {
            Some(name) => SessionResolver::with_override(table, self.temporary, Some(name)),
            None => SessionResolver::new(table, self.temporary),
        });

        let root_user_name = config.read().root_user_name().to_string();
        let prompt = self.prompt.unwrap_or_else(|| Box::new(TerminalPrompt));
        let engine = Arc::new(AuthenticationEngine::new(
            state.clone(),
            store.clone(),
            prompt,
            root_user_name,
        ));

        let registry = Arc::new(ClientRegistry::new(config.clone(), home, engine.clone()));
        for (address, client) in self.clients {
            registry.register(address, client);
        }

        let worksheets = WorksheetContextManager::new(
            state.clone(),
            store.clone(),
            config.clone(),
            registry.clone(),
            resolver.clone(),
        );

        tracing::debug!(home = %store.home().display(), temporary = store.is_temporary(), "manager ready");

        Ok(CodaLabManager {
            store,
            config,
            state,
            resolver,
            engine,
            registry,
            worksheets,
        })
    }
}
