// ABOUTME: HTTP wait strategy issuing requests against a liveness endpoint.
// ABOUTME: Readiness is a status-code policy plus an optional response body predicate.

use super::poll::{POLL_INTERVAL, poll_until_ready};
use super::{DEFAULT_STARTUP_TIMEOUT, WaitStrategy};
use crate::error::{Result, WaitError};
use crate::rate_limiter::RateLimiter;
use crate::target::WaitStrategyTarget;
use async_trait::async_trait;
use reqwest::{Client, Method};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

type StatusPredicate = Arc<dyn Fn(u16) -> bool + Send + Sync>;
type BodyPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Waits until an HTTP endpoint on the container answers with an acceptable
/// status code (and, optionally, an acceptable body).
///
/// With no explicit status configuration, only HTTP 200 satisfies the
/// probe. Explicit codes replace that default; a status predicate can be
/// combined with codes, the two being ORed together.
pub struct HttpWaitStrategy {
    path: String,
    port: Option<u16>,
    tls: bool,
    insecure: bool,
    method: Method,
    basic_credentials: Option<(String, String)>,
    headers: Vec<(String, String)>,
    status_codes: BTreeSet<u16>,
    status_predicate: Option<StatusPredicate>,
    body_predicate: Option<BodyPredicate>,
    read_timeout: Duration,
    rate_limiter: Arc<RateLimiter>,
    startup_timeout: Duration,
}

impl std::fmt::Debug for HttpWaitStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpWaitStrategy")
            .field("path", &self.path)
            .field("port", &self.port)
            .field("tls", &self.tls)
            .field("method", &self.method)
            .field("status_codes", &self.status_codes)
            .field("startup_timeout", &self.startup_timeout)
            .finish_non_exhaustive()
    }
}

impl Default for HttpWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpWaitStrategy {
    pub fn new() -> Self {
        Self {
            path: "/".to_string(),
            port: None,
            tls: false,
            insecure: false,
            method: Method::GET,
            basic_credentials: None,
            headers: Vec::new(),
            status_codes: BTreeSet::new(),
            status_predicate: None,
            body_predicate: None,
            read_timeout: Duration::from_secs(1),
            rate_limiter: RateLimiter::shared(),
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
        }
    }

    /// Path to request, default `/`.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Probe this container port instead of the first liveness-check port.
    pub fn with_port(mut self, container_port: u16) -> Self {
        self.port = Some(container_port);
        self
    }

    /// Use https as the scheme (and 443 as the default port).
    pub fn using_tls(mut self) -> Self {
        self.tls = true;
        self
    }

    /// Accept self-signed or otherwise invalid TLS certificates, as
    /// throwaway test containers rarely carry real ones.
    pub fn allow_insecure(mut self) -> Self {
        self.insecure = true;
        self
    }

    /// HTTP method to use, default GET.
    ///
    /// # Errors
    ///
    /// Returns `WaitError::InvalidConfig` for an invalid method token.
    pub fn with_method(mut self, method: &str) -> Result<Self> {
        self.method = Method::from_bytes(method.as_bytes())
            .map_err(|_| WaitError::InvalidConfig(format!("invalid HTTP method '{}'", method)))?;
        Ok(self)
    }

    /// Send HTTP Basic credentials with every request.
    pub fn with_basic_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.basic_credentials = Some((username.into(), password.into()));
        self
    }

    /// Add a header to every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Accept this status code. May be called repeatedly to accept several.
    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_codes.insert(status_code);
        self
    }

    /// Accept any status code passing the predicate. Combined with
    /// explicitly configured codes via logical OR.
    pub fn with_status_code_predicate(
        mut self,
        predicate: impl Fn(u16) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.status_predicate = Some(Arc::new(predicate));
        self
    }

    /// Additionally require the response body to pass the predicate. The
    /// body is read for success- and error-range responses alike.
    pub fn with_response_predicate(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.body_predicate = Some(Arc::new(predicate));
        self
    }

    /// Cap on a single request round trip, default 1 second.
    ///
    /// # Errors
    ///
    /// Returns `WaitError::InvalidConfig` for values below 1 millisecond.
    pub fn with_read_timeout(mut self, timeout: Duration) -> Result<Self> {
        if timeout < Duration::from_millis(1) {
            return Err(WaitError::InvalidConfig(
                "read timeout must be at least 1 millisecond".to_string(),
            ));
        }
        self.read_timeout = timeout;
        Ok(self)
    }

    pub fn with_rate_limiter(mut self, rate_limiter: Arc<RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    /// The URL this strategy probes for a given host and mapped port. The
    /// port suffix is omitted exactly when the port is the scheme default
    /// (80 for http, 443 for https).
    pub fn liveness_uri(&self, host: &str, port: u16) -> String {
        let scheme = if self.tls { "https" } else { "http" };
        let default_port = if self.tls { 443 } else { 80 };
        if port == default_port {
            format!("{}://{}{}", scheme, host, self.path)
        } else {
            format!("{}://{}:{}{}", scheme, host, port, self.path)
        }
    }

    fn status_acceptable(&self, status: u16) -> bool {
        match (&self.status_predicate, self.status_codes.is_empty()) {
            (None, true) => status == 200,
            (None, false) => self.status_codes.contains(&status),
            (Some(predicate), true) => predicate(status),
            (Some(predicate), false) => predicate(status) || self.status_codes.contains(&status),
        }
    }

    fn expected_status_description(&self) -> String {
        match (&self.status_predicate, self.status_codes.is_empty()) {
            (None, true) => "200".to_string(),
            (Some(_), true) => "a code accepted by the configured predicate".to_string(),
            (None, false) => format!("one of {:?}", self.status_codes),
            (Some(_), false) => format!(
                "one of {:?} or a code accepted by the configured predicate",
                self.status_codes
            ),
        }
    }

    async fn attempt(&self, client: &Client, uri: &str) -> bool {
        let mut request = client
            .request(self.method.clone(), uri)
            .timeout(self.read_timeout);
        if let Some((username, password)) = &self.basic_credentials {
            request = request.basic_auth(username, Some(password));
        }
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::trace!(uri, error = %e, "liveness request failed");
                return false;
            }
        };

        let status = response.status().as_u16();
        tracing::trace!(uri, status, "liveness response");
        if !self.status_acceptable(status) {
            return false;
        }

        if let Some(predicate) = &self.body_predicate {
            let body = match response.text().await {
                Ok(body) => body,
                Err(_) => return false,
            };
            if !predicate(&body) {
                tracing::trace!(uri, "response body did not match predicate");
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl WaitStrategy for HttpWaitStrategy {
    async fn wait_until_ready(&self, target: &dyn WaitStrategyTarget) -> Result<()> {
        let container_port = match self.port {
            Some(port) => port,
            None => {
                let ports = target
                    .liveness_check_ports()
                    .await
                    .map_err(|e| WaitError::Target(e.to_string()))?;
                match ports.first() {
                    Some(&port) => port,
                    None => {
                        tracing::warn!(
                            container = %target.container_id(),
                            "no exposed or mapped ports, cannot wait for HTTP status"
                        );
                        return Ok(());
                    }
                }
            }
        };

        let mapped = target
            .mapped_port(container_port)
            .await
            .map_err(|e| WaitError::Target(e.to_string()))?;
        let uri = self.liveness_uri(&target.host(), mapped);

        let client = Client::builder()
            .danger_accept_invalid_certs(self.insecure)
            .build()
            .map_err(|e| WaitError::Target(format!("failed to build HTTP client: {}", e)))?;

        tracing::info!(
            container = %target.container_id(),
            %uri,
            container_port,
            "waiting for HTTP endpoint"
        );

        let client_ref = &client;
        let uri_ref = uri.as_str();

        poll_until_ready(
            self.startup_timeout,
            POLL_INTERVAL,
            || async move {
                self.rate_limiter.acquire().await;
                self.attempt(client_ref, uri_ref).await
            },
            || {
                format!(
                    "{} did not return HTTP {}",
                    uri,
                    self.expected_status_description()
                )
            },
        )
        .await
    }

    fn startup_timeout(&self) -> Duration {
        self.startup_timeout
    }

    fn set_startup_timeout(&mut self, timeout: Duration) {
        self.startup_timeout = timeout;
    }
}
