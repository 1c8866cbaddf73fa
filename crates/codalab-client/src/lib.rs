//! Bundle service clients for the CodaLab CLI.
//!
//! A [`BundleClient`] is one connection to a bundle service. Two kinds exist:
//!
//! - [`LocalBundleClient`] runs the service in-process against the local
//!   [`Model`], [`BundleStore`] and [`AuthHandler`]
//! - [`RemoteBundleClient`] talks HTTP to a service at a network address
//!
//! Remote clients receive a [`TokenSource`] callback so they can obtain a
//! fresh access token without knowing how credentials are managed.

pub mod auth_handler;
pub mod bundle_store;
pub mod client;
pub mod error;
pub mod local;
pub mod model;
pub mod remote;
pub mod types;

pub use auth_handler::{AuthHandler, MOCK_TOKEN, MockAuthHandler, OAuthHandler};
pub use bundle_store::BundleStore;
pub use client::{BundleClient, LOCAL_ADDRESS, TokenSource, is_local_address};
pub use error::{Error, Result};
pub use local::LocalBundleClient;
pub use model::{Model, MySqlModel, SqliteModel};
pub use remote::{ClientBuilder, RemoteBundleClient};
pub use types::{GrantKind, IssuedToken, User};
