//! HTTP client for a remote bundle service.

use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use reqwest::StatusCode;
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Deserialize;
use url::Url;

use crate::client::{BundleClient, TokenSource};
use crate::error::{Error, ErrorResponse, Result};
use crate::types::{GrantKind, IssuedToken};

/// Timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Remote bundle service client.
///
/// Holds the current access token. When the service rejects it, the client
/// asks its [`TokenSource`] for a fresh one and retries the request once.
pub struct RemoteBundleClient {
    address: String,
    base_url: Url,
    http: reqwest::blocking::Client,
    token: Mutex<Option<String>>,
    token_source: TokenSource,
    verbose: u8,
}

#[derive(Debug, Deserialize)]
struct WorksheetUuidResponse {
    uuid: String,
}

impl RemoteBundleClient {
    /// Create a client builder.
    pub fn builder(address: impl Into<String>, token_source: TokenSource) -> ClientBuilder {
        ClientBuilder::new(address, token_source)
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    /// Build a URL for an API path.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.base_url.join(path).map_err(Error::from)
    }

    fn current_token(&self) -> Result<String> {
        if let Some(token) = self.token.lock().clone() {
            return Ok(token);
        }
        self.fetch_token(None)
    }

    /// Ask the token source for a new token and install it.
    fn fetch_token(&self, rejected: Option<&str>) -> Result<String> {
        let token = (self.token_source)(self, rejected)?;
        self.install_token(&token);
        Ok(token)
    }

    /// Send an authorized request, re-authenticating once on 401.
    fn send_authorized<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&reqwest::blocking::Client) -> Result<RequestBuilder>,
    {
        let token = self.current_token()?;
        let response = build(&self.http)?.bearer_auth(&token).send()?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return Ok(response);
        }

        tracing::debug!(address = %self.address, "access token rejected, re-authenticating");
        let token = self.fetch_token(Some(token.as_str()))?;
        Ok(build(&self.http)?.bearer_auth(&token).send()?)
    }

    /// Handle a response, extracting the body or error.
    fn handle_response<T: serde::de::DeserializeOwned>(&self, response: Response) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json()?)
        } else {
            Err(self.extract_error(response))
        }
    }

    /// Extract an error from a failed response.
    fn extract_error(&self, response: Response) -> Error {
        let status = response.status().as_u16();

        match response.json::<ErrorResponse>() {
            Ok(err) if status == 404 => Error::NotFound(err.message),
            Ok(err) if status == 401 || status == 403 => Error::PermissionDenied(err.message),
            Ok(err) => Error::Api {
                status,
                message: err.message,
            },
            Err(_) => Error::Api {
                status,
                message: format!("HTTP {}", status),
            },
        }
    }
}

impl fmt::Debug for RemoteBundleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteBundleClient")
            .field("address", &self.address)
            .field("base_url", &self.base_url.as_str())
            .field("has_token", &self.token.lock().is_some())
            .finish()
    }
}

impl BundleClient for RemoteBundleClient {
    fn address(&self) -> &str {
        &self.address
    }

    fn login(
        &self,
        grant: GrantKind,
        username: &str,
        credential: &str,
    ) -> Result<Option<IssuedToken>> {
        let secret_field = match grant {
            GrantKind::Credentials => "password",
            GrantKind::RefreshToken => "refresh_token",
        };
        let form = [
            ("grant_type", grant.as_str()),
            ("username", username),
            (secret_field, credential),
        ];

        let response = self.http.post(self.url("auth/token")?).form(&form).send()?;
        let status = response.status().as_u16();
        if matches!(status, 400 | 401 | 403) {
            return Ok(None);
        }
        self.handle_response(response).map(Some)
    }

    fn install_token(&self, access_token: &str) {
        *self.token.lock() = Some(access_token.to_string());
    }

    fn get_worksheet_uuid(&self, parent_uuid: Option<&str>, name: &str) -> Result<String> {
        let url = self.url("worksheets/uuid")?;
        let query = [("base", parent_uuid.unwrap_or("")), ("spec", name)];
        let response = self.send_authorized(|http| Ok(http.get(url.clone()).query(&query)))?;
        let body: WorksheetUuidResponse = self.handle_response(response)?;
        Ok(body.uuid)
    }
}

/// Builder for creating a RemoteBundleClient.
pub struct ClientBuilder {
    address: String,
    token_source: TokenSource,
    verbose: u8,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new(address: impl Into<String>, token_source: TokenSource) -> Self {
        Self {
            address: address.into(),
            token_source,
            verbose: 0,
        }
    }

    pub fn verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<RemoteBundleClient> {
        // Parse and normalize base URL
        let mut base_url = Url::parse(&self.address)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::blocking::Client::builder()
            .default_headers(headers)
            .user_agent(format!("codalab-cli/{}", env!("CARGO_PKG_VERSION")))
            .timeout(DEFAULT_TIMEOUT)
            .build()?;

        Ok(RemoteBundleClient {
            address: self.address,
            base_url,
            http,
            token: Mutex::new(None),
            token_source: self.token_source,
            verbose: self.verbose,
        })
    }
}
