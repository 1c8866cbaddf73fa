//! Client for the in-process bundle service.

use std::sync::Arc;

use crate::auth_handler::AuthHandler;
use crate::bundle_store::BundleStore;
use crate::client::BundleClient;
use crate::error::{Error, Result};
use crate::model::Model;
use crate::types::{GrantKind, IssuedToken};

/// Talks directly to the local model, bundle store and auth handler.
#[derive(Debug)]
pub struct LocalBundleClient {
    address: String,
    bundle_store: Arc<BundleStore>,
    model: Arc<Model>,
    auth_handler: Arc<AuthHandler>,
    verbose: u8,
}

impl LocalBundleClient {
    pub fn new(
        address: impl Into<String>,
        bundle_store: Arc<BundleStore>,
        model: Arc<Model>,
        auth_handler: Arc<AuthHandler>,
        verbose: u8,
    ) -> Self {
        Self {
            address: address.into(),
            bundle_store,
            model,
            auth_handler,
            verbose,
        }
    }

    pub fn bundle_store(&self) -> &BundleStore {
        &self.bundle_store
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    pub fn auth_handler(&self) -> &AuthHandler {
        &self.auth_handler
    }

    pub fn verbose(&self) -> u8 {
        self.verbose
    }
}

impl BundleClient for LocalBundleClient {
    fn address(&self) -> &str {
        &self.address
    }

    fn login(
        &self,
        grant: GrantKind,
        username: &str,
        credential: &str,
    ) -> Result<Option<IssuedToken>> {
        self.auth_handler.generate_token(grant, username, credential)
    }

    // Calls are in-process; the current user lives on the auth handler.
    fn install_token(&self, _access_token: &str) {}

    fn get_worksheet_uuid(&self, parent_uuid: Option<&str>, name: &str) -> Result<String> {
        let user = self
            .auth_handler
            .current_user()
            .ok_or_else(|| Error::PermissionDenied("not logged in".to_string()))?;
        self.model.get_worksheet_uuid(&user, parent_uuid, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth_handler::{MOCK_TOKEN, MockAuthHandler};
    use crate::types::User;
    use codalab_config::ModelConfig;
    use tempfile::tempdir;

    fn client(home: &std::path::Path) -> LocalBundleClient {
        let root = User::new("codalab", "0");
        LocalBundleClient::new(
            "local",
            Arc::new(BundleStore::new(home, &[]).unwrap()),
            Arc::new(Model::from_config(&ModelConfig::Sqlite, home, "0").unwrap()),
            Arc::new(AuthHandler::Mock(MockAuthHandler::new(vec![root]))),
            1,
        )
    }

    #[test]
    fn test_login_delegates_to_auth_handler() {
        let temp = tempdir().unwrap();
        let client = client(temp.path());

        let token = client
            .login(GrantKind::Credentials, "codalab", "")
            .unwrap()
            .unwrap();
        assert_eq!(token.access_token, MOCK_TOKEN);
        assert!(client
            .login(GrantKind::Credentials, "nobody", "")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_worksheet_requires_validated_user() {
        let temp = tempdir().unwrap();
        let client = client(temp.path());

        let err = client.get_worksheet_uuid(None, "").unwrap_err();
        assert!(err.is_auth_error());

        client.auth_handler().validate_token(MOCK_TOKEN).unwrap();
        let home = client.get_worksheet_uuid(None, "").unwrap();
        assert_eq!(client.get_worksheet_uuid(None, "home-codalab").unwrap(), home);
    }
}
