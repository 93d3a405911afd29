//! Lease acquisition and caching.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::AUTHORIZATION;
use tokio::sync::Mutex;
use tracing::debug;

use crate::{
    credentials::Credentials,
    error::{Error, Result},
    lease::Lease,
};

/// Default lease endpoint URL.
pub const DEFAULT_LEASE_URL: &str = "https://api.play.ht/api/v2/leases";

/// Default HTTP timeout for the lease exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Grants API access by fetching a fresh lease whenever the cached one has
/// gone stale.
///
/// A session owns its cached lease; independent sessions never share state.
/// One session may be shared across tasks (wrap it in an [`Arc`]): the
/// check-then-refresh sequence runs under an internal lock, so concurrent
/// callers see at most one refresh in flight and never a half-constructed
/// lease.
///
/// # Example
///
/// ```rust,no_run
/// use playht::Session;
///
/// # async fn run() -> playht::Result<()> {
/// let session = Session::from_env()?;
/// let lease = session.current_lease().await?;
/// println!("synthesis backend: {}", lease.routing_address()?);
/// # Ok(())
/// # }
/// ```
pub struct Session {
    credentials: Credentials,
    endpoint_url: String,
    http: reqwest::Client,
    lease: Mutex<Option<Arc<Lease>>>,
}

impl Session {
    /// Creates a session with the default endpoint URL and timeout.
    pub fn new(credentials: Credentials) -> Result<Self> {
        Self::builder().credentials(credentials).build()
    }

    /// Creates a session with credentials resolved from the environment.
    pub fn from_env() -> Result<Self> {
        Self::builder().build()
    }

    /// Creates a new session builder.
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    /// Returns the configured credentials.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Returns the lease endpoint URL.
    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// Returns the cached lease, refreshing it first if absent or expired.
    ///
    /// Back-to-back calls within the validity window hit the cache and
    /// perform no HTTP request. The internal lock spans the whole
    /// check-then-refresh sequence.
    pub async fn current_lease(&self) -> Result<Arc<Lease>> {
        let mut slot = self.lease.lock().await;
        if let Some(lease) = slot.as_ref() {
            if !lease.is_expired() {
                return Ok(lease.clone());
            }
            debug!(expires = %lease.expires_at(), "cached lease is stale");
        }

        let lease = Arc::new(self.fetch_lease().await?);
        *slot = Some(lease.clone());
        Ok(lease)
    }

    /// Refreshes the lease unconditionally.
    ///
    /// The cache is replaced only after a successful decode; a failed
    /// refresh leaves any previous lease untouched.
    pub async fn refresh(&self) -> Result<Arc<Lease>> {
        let mut slot = self.lease.lock().await;
        let lease = Arc::new(self.fetch_lease().await?);
        *slot = Some(lease.clone());
        Ok(lease)
    }

    /// Performs the lease exchange: one authorized POST, the full response
    /// body is the raw token.
    async fn fetch_lease(&self) -> Result<Lease> {
        debug!(url = %self.endpoint_url, "requesting lease");

        let response = self
            .http
            .post(&self.endpoint_url)
            .header("X-User-Id", self.credentials.user_id())
            .header(
                AUTHORIZATION,
                format!("Bearer {}", self.credentials.api_key()),
            )
            .send()
            .await
            .map_err(Error::auth)?;

        let status = response.status();
        let body = response.bytes().await.map_err(Error::auth)?;
        if !status.is_success() {
            return Err(Error::auth_status(status.as_u16(), &body));
        }

        let lease = Lease::decode(&body)?;
        debug!(
            expires = %lease.expires_at(),
            premium = lease.is_premium(),
            "lease refreshed"
        );
        Ok(lease)
    }
}

/// Builder for creating a [`Session`].
pub struct SessionBuilder {
    credentials: Option<Credentials>,
    url: String,
    timeout: Duration,
}

impl SessionBuilder {
    /// Creates a new session builder.
    pub fn new() -> Self {
        Self {
            credentials: None,
            url: DEFAULT_LEASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Sets explicit credentials. Defaults to loading them from the
    /// environment at build time.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Sets a custom lease endpoint URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Sets the HTTP timeout for the lease exchange.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builds the session.
    pub fn build(self) -> Result<Session> {
        let credentials = match self.credentials {
            Some(credentials) => credentials,
            None => Credentials::from_env()?,
        };

        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| Error::Config(format!("http client: {e}")))?;

        Ok(Session {
            credentials,
            endpoint_url: self.url,
            http,
            lease: Mutex::new(None),
        })
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use axum::{
        extract::State,
        http::{HeaderMap, StatusCode},
        response::IntoResponse,
        routing::post,
        Router,
    };
    use chrono::Utc;

    use super::*;
    use crate::lease::{lease_epoch, LEASE_HEADER_LEN};

    /// Token that is valid for an hour from now, real-clock.
    fn fresh_token(meta: &str) -> Vec<u8> {
        let created = (Utc::now() - lease_epoch()).num_seconds() as u32;
        let mut raw = vec![0u8; LEASE_HEADER_LEN];
        raw[64..68].copy_from_slice(&created.to_be_bytes());
        raw[68..72].copy_from_slice(&3600u32.to_be_bytes());
        raw.extend_from_slice(meta.as_bytes());
        raw
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/leases")
    }

    fn session_for(url: String) -> Session {
        Session::builder()
            .credentials(Credentials::new("test-user", "test-key").unwrap())
            .url(url)
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn current_lease_hits_cache_on_second_call() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/leases",
                post(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    fresh_token(r#"{"inference_address":"tts.example:443"}"#)
                }),
            )
            .with_state(hits.clone());

        let session = session_for(serve(app).await);

        let first = session.current_lease().await.unwrap();
        let second = session.current_lease().await.unwrap();

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.routing_address().unwrap(), "tts.example:443");
    }

    #[tokio::test]
    async fn refresh_sends_expected_headers() {
        let app = Router::new().route(
            "/leases",
            post(|headers: HeaderMap| async move {
                assert_eq!(headers.get("x-user-id").unwrap(), "test-user");
                assert_eq!(headers.get("authorization").unwrap(), "Bearer test-key");
                fresh_token(r#"{"inference_address":"tts.example:443"}"#)
            }),
        );

        let session = session_for(serve(app).await);
        session.refresh().await.unwrap();
    }

    #[tokio::test]
    async fn http_failure_maps_to_auth_error() {
        let app = Router::new().route(
            "/leases",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        );

        let session = session_for(serve(app).await);
        let err = session.current_lease().await.unwrap_err();
        assert!(err.is_auth_error());
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn failed_refresh_keeps_cached_lease_usable() {
        let fail = Arc::new(AtomicBool::new(false));
        let app = Router::new()
            .route(
                "/leases",
                post(|State(fail): State<Arc<AtomicBool>>| async move {
                    if fail.load(Ordering::SeqCst) {
                        StatusCode::INTERNAL_SERVER_ERROR.into_response()
                    } else {
                        fresh_token(r#"{"inference_address":"tts.example:443"}"#).into_response()
                    }
                }),
            )
            .with_state(fail.clone());

        let session = session_for(serve(app).await);

        let first = session.current_lease().await.unwrap();
        fail.store(true, Ordering::SeqCst);

        // Forced refresh fails, but the still-valid cached lease survives.
        assert!(session.refresh().await.is_err());
        let second = session.current_lease().await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[tokio::test]
    async fn malformed_body_is_reported() {
        let app = Router::new().route("/leases", post(|| async { "way too short" }));

        let session = session_for(serve(app).await);
        let err = session.current_lease().await.unwrap_err();
        assert!(matches!(err, Error::MalformedLease(_)));
    }
}
