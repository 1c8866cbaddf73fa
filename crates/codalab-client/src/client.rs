//! The bundle service client capability.

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::types::{GrantKind, IssuedToken};

/// Address of the in-process bundle service.
pub const LOCAL_ADDRESS: &str = "local";

/// Whether an address names the in-process bundle service.
///
/// `local` and any `local:`-prefixed address are local; everything else is a
/// network location.
pub fn is_local_address(address: &str) -> bool {
    address == LOCAL_ADDRESS || address.starts_with("local:")
}

/// Callback a transport invokes when it needs a fresh access token.
///
/// The second argument is the token the service just refused, if any. A
/// source must not hand that token back.
pub type TokenSource =
    Arc<dyn Fn(&dyn BundleClient, Option<&str>) -> Result<String> + Send + Sync>;

/// A connection to one bundle service.
pub trait BundleClient: Debug + Send + Sync {
    /// The address this client talks to.
    fn address(&self) -> &str;

    /// Ask the service for a token.
    ///
    /// Returns `Ok(None)` when the service rejects the grant.
    fn login(
        &self,
        grant: GrantKind,
        username: &str,
        credential: &str,
    ) -> Result<Option<IssuedToken>>;

    /// Use `access_token` for subsequent requests.
    fn install_token(&self, access_token: &str);

    /// Resolve a worksheet spec relative to `parent_uuid`.
    ///
    /// An empty `name` resolves to the caller's home worksheet.
    fn get_worksheet_uuid(&self, parent_uuid: Option<&str>, name: &str) -> Result<String>;
}
