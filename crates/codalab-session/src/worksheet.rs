//! Current worksheet per session.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use codalab_client::BundleClient;
use codalab_config::{Config, DEFAULT_ADDRESS, PersistedStore, SessionEntry, State};

use crate::error::Result;
use crate::registry::ClientRegistry;
use crate::resolver::SessionResolver;

/// Separator between the address and worksheet parts of a spec.
pub const CLIENT_SEPARATOR: &str = "::";

/// Split `address::name` into its parts.
///
/// A spec without `::` names a worksheet on the current client.
pub fn split_worksheet_spec(spec: &str) -> (Option<&str>, &str) {
    match spec.split_once(CLIENT_SEPARATOR) {
        Some((address, name)) => (Some(address), name),
        None => (None, spec),
    }
}

/// Maps the current session to an address and worksheet.
#[derive(Debug)]
pub struct WorksheetContextManager {
    state: Arc<Mutex<State>>,
    store: PersistedStore,
    config: Arc<RwLock<Config>>,
    registry: Arc<ClientRegistry>,
    resolver: Arc<SessionResolver>,
}

impl WorksheetContextManager {
    pub fn new(
        state: Arc<Mutex<State>>,
        store: PersistedStore,
        config: Arc<RwLock<Config>>,
        registry: Arc<ClientRegistry>,
        resolver: Arc<SessionResolver>,
    ) -> Self {
        Self {
            state,
            store,
            config,
            registry,
            resolver,
        }
    }

    /// The current session's entry.
    ///
    /// A session seen for the first time starts on the configured default
    /// address and worksheet. It is not written until something else saves
    /// the state.
    pub fn session(&self) -> SessionEntry {
        let name = self.resolver.resolve_session_name();
        let mut state = self.state.lock();
        state
            .sessions
            .entry(name.to_string())
            .or_insert_with(|| {
                let config = self.config.read();
                let address = config
                    .cli
                    .default_address
                    .clone()
                    .unwrap_or_else(|| DEFAULT_ADDRESS.to_string());
                SessionEntry::new(address, config.cli.default_worksheet_uuid.clone())
            })
            .clone()
    }

    /// The current session's client and worksheet.
    ///
    /// When the session has no worksheet the client's home worksheet is used;
    /// that choice is not saved.
    pub fn get_current_worksheet_uuid(&self) -> Result<(Arc<dyn BundleClient>, String)> {
        let session = self.session();
        let client = self.registry.get_client(&session.address, true)?;
        let uuid = match session.worksheet_uuid {
            Some(uuid) => uuid,
            None => client.get_worksheet_uuid(None, "")?,
        };
        Ok((client, uuid))
    }

    /// Point the current session at `worksheet_uuid` on `client` and save.
    ///
    /// An empty uuid clears the worksheet so the home worksheet is used.
    pub fn set_current_worksheet_uuid(
        &self,
        client: &dyn BundleClient,
        worksheet_uuid: &str,
    ) -> Result<()> {
        let mut entry = self.session();
        entry.address = client.address().to_string();
        entry.worksheet_uuid = Some(worksheet_uuid.to_string()).filter(|uuid| !uuid.is_empty());

        let name = self.resolver.resolve_session_name();
        let mut state = self.state.lock();
        state.sessions.insert(name.to_string(), entry);
        self.store.save_state(&state)?;
        tracing::debug!(session = %name, address = %client.address(), "switched worksheet");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codalab_auth::{AuthenticationEngine, NonInteractivePrompt};
    use codalab_client::{GrantKind, IssuedToken};
    use crate::resolver::ProcessTable;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::tempdir;

    #[derive(Debug)]
    struct FakeClient {
        address: String,
        home_lookups: AtomicU32,
    }

    impl BundleClient for FakeClient {
        fn address(&self) -> &str {
            &self.address
        }

        fn login(
            &self,
            _grant: GrantKind,
            _username: &str,
            _credential: &str,
        ) -> codalab_client::Result<Option<IssuedToken>> {
            Ok(None)
        }

        fn install_token(&self, _access_token: &str) {}

        fn get_worksheet_uuid(
            &self,
            _parent_uuid: Option<&str>,
            name: &str,
        ) -> codalab_client::Result<String> {
            assert_eq!(name, "");
            self.home_lookups.fetch_add(1, Ordering::SeqCst);
            Ok("0xhome".to_string())
        }
    }

    struct NoProcesses;

    impl ProcessTable for NoProcesses {
        fn current_pid(&self) -> Option<u32> {
            None
        }
        fn parent(&self, _pid: u32) -> Option<u32> {
            None
        }
        fn name(&self, _pid: u32) -> Option<String> {
            None
        }
    }

    const ADDRESS: &str = "https://worksheets.example.org";

    fn context(
        home: &std::path::Path,
        config: Config,
    ) -> (WorksheetContextManager, Arc<FakeClient>, PersistedStore) {
        let store = PersistedStore::new(home);
        let state = Arc::new(Mutex::new(State::default()));
        let config = Arc::new(RwLock::new(config));
        let engine = AuthenticationEngine::new(
            state.clone(),
            store.clone(),
            Box::new(NonInteractivePrompt),
            "codalab",
        );
        let registry = Arc::new(ClientRegistry::new(config.clone(), home, Arc::new(engine)));
        let client = Arc::new(FakeClient {
            address: ADDRESS.to_string(),
            home_lookups: AtomicU32::new(0),
        });
        registry.register(ADDRESS, client.clone());
        let resolver = Arc::new(SessionResolver::with_override(
            Box::new(NoProcesses),
            false,
            Some("s1".to_string()),
        ));
        let manager =
            WorksheetContextManager::new(state, store.clone(), config, registry, resolver);
        (manager, client, store)
    }

    fn remote_default() -> Config {
        let mut config = Config::default();
        config.cli.default_address = Some(ADDRESS.to_string());
        config
    }

    #[test]
    fn test_split_worksheet_spec() {
        assert_eq!(split_worksheet_spec("main::home-alice"), (Some("main"), "home-alice"));
        assert_eq!(split_worksheet_spec("home-alice"), (None, "home-alice"));
        assert_eq!(split_worksheet_spec("main::"), (Some("main"), ""));
    }

    #[test]
    fn test_new_session_uses_defaults_without_saving() {
        let temp = tempdir().unwrap();
        let (manager, _, store) = context(temp.path(), Config::default());

        let session = manager.session();
        assert_eq!(session.address, "local");
        assert!(session.worksheet_uuid.is_none());
        assert!(!store.state_path().exists());
    }

    #[test]
    fn test_unset_worksheet_resolves_home_each_time() {
        let temp = tempdir().unwrap();
        let (manager, client, store) = context(temp.path(), remote_default());

        let (resolved, uuid) = manager.get_current_worksheet_uuid().unwrap();
        assert_eq!(resolved.address(), ADDRESS);
        assert_eq!(uuid, "0xhome");
        manager.get_current_worksheet_uuid().unwrap();
        assert_eq!(client.home_lookups.load(Ordering::SeqCst), 2);
        assert!(!store.state_path().exists());
    }

    #[test]
    fn test_set_then_get_worksheet() {
        let temp = tempdir().unwrap();
        let (manager, client, store) = context(temp.path(), remote_default());

        manager
            .set_current_worksheet_uuid(client.as_ref(), "0xabc")
            .unwrap();
        let (_, uuid) = manager.get_current_worksheet_uuid().unwrap();
        assert_eq!(uuid, "0xabc");
        assert_eq!(client.home_lookups.load(Ordering::SeqCst), 0);

        let saved = store.load_state().unwrap();
        assert_eq!(saved.sessions["s1"], SessionEntry::new(ADDRESS, Some("0xabc".to_string())));
    }

    #[test]
    fn test_empty_uuid_clears_worksheet() {
        let temp = tempdir().unwrap();
        let (manager, client, store) = context(temp.path(), remote_default());

        manager
            .set_current_worksheet_uuid(client.as_ref(), "0xabc")
            .unwrap();
        manager.set_current_worksheet_uuid(client.as_ref(), "").unwrap();

        let saved = store.load_state().unwrap();
        assert!(saved.sessions["s1"].worksheet_uuid.is_none());
        let raw = std::fs::read_to_string(store.state_path()).unwrap();
        assert!(!raw.contains("worksheet_uuid"));

        let (_, uuid) = manager.get_current_worksheet_uuid().unwrap();
        assert_eq!(uuid, "0xhome");
    }
}
