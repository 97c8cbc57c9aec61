//! HTTP client implementation for the key-value store

use std::fmt;
use std::io;
use std::sync::Arc;

use http::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HttpClient;
use hyper_util::rt::TokioExecutor;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use crate::config::{normalize_base_url, ApiToken, ClientConfig};
use crate::error::{Error, Result};
use crate::types::*;

/// Characters allowed unencoded in a single URI path segment per RFC 3986.
/// Everything else (including `/`, spaces, `#`, `?`, `%`, non-ASCII) gets percent-encoded.
const PATH_SEGMENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@');

/// Percent-encode a key as one path segment below the base URL.
///
/// `/` is encoded, so the only dot segments left are the keys `.` and `..`
/// themselves; their dots are encoded too.
fn encode_key(key: &str) -> String {
    if key == "." || key == ".." {
        return key.replace('.', "%2E");
    }
    utf8_percent_encode(key, PATH_SEGMENT).to_string()
}

/// Remove at most one trailing newline.
fn strip_trailing_newline(mut value: String) -> String {
    if value.ends_with('\n') {
        value.pop();
    }
    value
}

/// Add `line` as the last line of `current`. An empty `current` gets no separator.
fn append_line(current: &str, line: &str) -> String {
    if current.is_empty() {
        return line.to_string();
    }
    let mut lines: Vec<&str> = current.split('\n').collect();
    lines.push(line);
    lines.join("\n")
}

/// Map the envelope's `success` flag to a result, tagging failures with `operation`.
fn settle<T>(operation: Operation, envelope: Envelope<T>) -> Result<(String, T)> {
    match envelope.into_outcome() {
        Outcome::Success { message, payload } => Ok((message, payload)),
        Outcome::Failure { message } => Err(Error::Store { operation, message }),
    }
}

/// Standard CA verification against the bundled webpki roots.
///
/// The ring provider is pinned so the result does not depend on which rustls
/// backends other crates in the build happen to enable.
fn build_tls_config() -> Result<rustls::ClientConfig> {
    let provider = Arc::new(rustls::crypto::ring::default_provider());

    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    Ok(rustls::ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| Error::Tls(e.to_string()))?
        .with_root_certificates(roots)
        .with_no_client_auth())
}

type HttpsConnector = hyper_rustls::HttpsConnector<HttpConnector>;

/// Client for a bearer-authenticated JSON key-value store
///
/// Every operation is a single request (two for [`Client::append`]) whose JSON
/// envelope carries a `success` flag. A refused operation becomes
/// [`Error::Store`]; transport and decoding failures are returned as-is.
///
/// Cloning is cheap and clones share the connection pool.
///
/// # Example
/// ```rust,no_run
/// use kv_store_client::Client;
///
/// #[tokio::main]
/// async fn main() -> Result<(), kv_store_client::Error> {
///     let client = Client::new("http://localhost:3000/kv", "your-token")?;
///
///     let message = client.set("greeting", "hello").await?;
///     println!("{}", message);
///
///     let value = client.get("greeting").await?;
///     assert_eq!(value, "hello");
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Client {
    config: Arc<ClientConfig>,
    http_client: HttpClient<HttpsConnector, Full<Bytes>>,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.config.base_url)
            .field("timeout", &self.config.timeout)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a new store client
    ///
    /// # Arguments
    /// * `base_url` - Store endpoint, e.g. "http://localhost:3000/kv". Trailing slashes are normalized.
    /// * `api_token` - Bearer token, sent verbatim
    ///
    /// Neither argument is validated here; a malformed URL is reported by the first request.
    ///
    /// # Errors
    /// Returns [`Error::Tls`] if the TLS backend cannot be set up
    pub fn new(base_url: &str, api_token: &str) -> Result<Self> {
        Self::with_config(ClientConfig {
            base_url: base_url.to_string(),
            token: ApiToken::new(api_token),
            ..Default::default()
        })
    }

    /// Create a new client with custom configuration
    pub fn with_config(mut config: ClientConfig) -> Result<Self> {
        config.base_url = normalize_base_url(&config.base_url);

        let https_connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_tls_config(build_tls_config()?)
            .https_or_http()
            .enable_http1()
            .enable_http2()
            .build();

        let http_client = HttpClient::builder(TokioExecutor::new()).build(https_connector);

        Ok(Self {
            config: Arc::new(config),
            http_client,
        })
    }

    /// Get the normalized base URL (always ends with exactly one `/`)
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Get the authentication token
    pub fn token(&self) -> &str {
        self.config.token.as_str()
    }

    /// Full request URL for a key
    pub fn key_url(&self, key: &str) -> String {
        format!("{}{}", self.config.base_url, encode_key(key))
    }

    /// Send one request and decode the response envelope.
    ///
    /// The envelope is decoded before the status is looked at; only a body that
    /// does not decode on a non-2xx response becomes [`Error::Status`].
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        url: String,
        body: Option<Bytes>,
    ) -> Result<Envelope<T>> {
        let uri: Uri = url
            .parse()
            .map_err(|e| Error::InvalidUrl(format!("Invalid request URL '{}': {}", url, e)))?;

        let mut builder = Request::builder()
            .method(method.clone())
            .uri(uri)
            .header(AUTHORIZATION, format!("Bearer {}", self.config.token.as_str()))
            .header(ACCEPT, "application/json");

        let body = match body {
            Some(body) => {
                builder = builder.header(CONTENT_TYPE, "application/json");
                body
            }
            None => Bytes::new(),
        };

        let req = builder
            .body(Full::new(body))
            .map_err(|e| Error::InvalidRequest(format!("Failed to build request: {}", e)))?;

        debug!("Sending request: {} {}", method, url);

        let (status, body) = match self.config.timeout {
            Some(timeout) => tokio::time::timeout(timeout, self.exchange(req))
                .await
                .map_err(|_| Error::Timeout(timeout))??,
            None => self.exchange(req).await?,
        };

        trace!("Response: {} ({} bytes)", status, body.len());

        match serde_json::from_slice::<Envelope<T>>(&body) {
            Ok(envelope) => Ok(envelope),
            Err(_) if !status.is_success() => Err(Error::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
            Err(e) => Err(Error::Json(e)),
        }
    }

    /// Send the request and collect the whole response body
    async fn exchange(&self, req: Request<Full<Bytes>>) -> Result<(StatusCode, Bytes)> {
        let response = self
            .http_client
            .request(req)
            .await
            .map_err(|e| Error::Connection(format!("Request failed: {}", e)))?;

        let status = response.status();
        let collected = response
            .into_body()
            .collect()
            .await
            .map_err(|e| Error::Io(io::Error::new(io::ErrorKind::Other, e)))?;

        Ok((status, collected.to_bytes()))
    }

    /// Store a value under a key
    ///
    /// # Returns
    /// The server's description of what it did (e.g. "created" or "updated")
    ///
    /// # Example
    /// ```rust,no_run
    /// # use kv_store_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), kv_store_client::Error> {
    /// # let client = Client::new("http://localhost:3000", "token")?;
    /// let message = client.set("config", "{\"theme\":\"dark\"}").await?;
    /// println!("{}", message);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn set(&self, key: &str, value: &str) -> Result<String> {
        let body = serde_json::to_vec(&SetRequest { value })?;
        let envelope = self
            .request::<Ack>(Method::POST, self.key_url(key), Some(Bytes::from(body)))
            .await?;
        let (message, _) = settle(Operation::Set, envelope)?;
        Ok(message)
    }

    /// Retrieve the value of a key, with one trailing newline removed
    ///
    /// # Example
    /// ```rust,no_run
    /// # use kv_store_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), kv_store_client::Error> {
    /// # let client = Client::new("http://localhost:3000", "token")?;
    /// let text = client.get("config").await?;
    /// println!("Config: {}", text);
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get(&self, key: &str) -> Result<String> {
        let envelope = self
            .request::<ValuePayload>(Method::GET, self.key_url(key), None)
            .await?;
        let (_, payload) = settle(Operation::Get, envelope)?;
        Ok(strip_trailing_newline(payload.value))
    }

    /// Retrieve the value of a key, or `default` when the value is empty
    pub async fn get_or_default(&self, key: &str, default: &str) -> Result<String> {
        let value = self.get(key).await?;
        if value.is_empty() {
            Ok(default.to_string())
        } else {
            Ok(value)
        }
    }

    /// Add `value` as a new last line of the key's current value
    ///
    /// This is a get followed by a set. Another writer touching the key in
    /// between will have its update overwritten.
    ///
    /// # Example
    /// ```rust,no_run
    /// # use kv_store_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), kv_store_client::Error> {
    /// # let client = Client::new("http://localhost:3000", "token")?;
    /// client.set("log", "line1").await?;
    /// client.append("log", "line2").await?;
    /// assert_eq!(client.get("log").await?, "line1\nline2");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn append(&self, key: &str, value: &str) -> Result<String> {
        let current = self.get(key).await?;
        let updated = append_line(&current, value);
        self.set(key, &updated).await
    }

    /// Delete a key
    ///
    /// # Returns
    /// The server's description of what it did
    pub async fn delete(&self, key: &str) -> Result<String> {
        let envelope = self
            .request::<Ack>(Method::DELETE, self.key_url(key), None)
            .await?;
        let (message, _) = settle(Operation::Delete, envelope)?;
        Ok(message)
    }

    /// List every key, in the order the server reports them
    ///
    /// # Example
    /// ```rust,no_run
    /// # use kv_store_client::Client;
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), kv_store_client::Error> {
    /// # let client = Client::new("http://localhost:3000", "token")?;
    /// for key in client.list().await? {
    ///     println!("  {}", key);
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub async fn list(&self) -> Result<Vec<String>> {
        let envelope = self
            .request::<ListPayload>(Method::GET, self.config.base_url.clone(), None)
            .await?;
        let (_, payload) = settle(Operation::List, envelope)?;
        Ok(payload.items.into_iter().map(|item| item.k).collect())
    }
}
