//! Streaming synthesis client.

use std::sync::Arc;
use std::time::Duration;

use async_stream::try_stream;
use futures::Stream;
use tokio::sync::Mutex;
use tonic::{
    client::Grpc,
    codec::{CompressionEncoding, ProstCodec},
    codegen::http::uri::PathAndQuery,
    transport::{Channel, ClientTlsConfig, Endpoint},
    Request,
};
use tracing::debug;

use crate::{
    error::{Error, Result},
    params::SynthesisParams,
    proto::{self, tts_response::Response, Code},
    session::Session,
};

/// Default connect timeout for the synthesis channel.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Options for the gRPC channel to the synthesis backend.
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// Timeout for establishing the TLS connection.
    pub connect_timeout: Duration,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }
}

/// A chunk of streamed synthesis output.
#[derive(Debug, Clone, Default)]
pub struct AudioChunk {
    /// Raw audio bytes. Empty on the final completion marker.
    pub audio: Vec<u8>,
    /// True when the server signaled completion; no audio follows.
    pub is_last: bool,
    /// Server-side job ID, when reported.
    pub id: Option<String>,
}

/// Streaming TTS client.
///
/// Owns a [`Session`] for lease renewal and a lazily established gRPC
/// channel to whichever synthesis backend the current lease routes to.
/// The channel is reused across calls and rebuilt when the routing address
/// changes. One synthesis stream per client at a time; for concurrent
/// streams create one client per task over a shared session.
///
/// # Example
///
/// ```rust,no_run
/// use std::pin::pin;
///
/// use futures::StreamExt;
/// use playht::{Session, TtsClient};
///
/// # async fn run() -> playht::Result<()> {
/// let session = std::sync::Arc::new(Session::from_env()?);
/// let client = TtsClient::new(session);
///
/// let stream = client.synthesize(["Hello, world!"]).await?;
/// let mut stream = pin!(stream);
/// while let Some(chunk) = stream.next().await {
///     let chunk = chunk?;
///     // chunk.audio holds raw WAV bytes
/// }
/// # Ok(())
/// # }
/// ```
pub struct TtsClient {
    session: Arc<Session>,
    params: SynthesisParams,
    options: ChannelOptions,
    channel: Mutex<Option<ConnectedChannel>>,
}

/// Cached channel, keyed by the routing address it was built for.
struct ConnectedChannel {
    address: String,
    channel: Channel,
}

impl TtsClient {
    /// Creates a client with the default synthesis parameters.
    pub fn new(session: Arc<Session>) -> Self {
        Self::builder(session).defaults().build()
    }

    /// Creates a new client builder with no parameters set.
    pub fn builder(session: Arc<Session>) -> TtsClientBuilder {
        TtsClientBuilder::new(session)
    }

    /// Returns the session this client renews leases through.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Returns the merged synthesis parameters sent with each call.
    pub fn params(&self) -> &SynthesisParams {
        &self.params
    }

    /// Converts the given texts to a lazy stream of audio chunks.
    ///
    /// Each call obtains a fresh-or-cached lease, connects to (or reuses)
    /// the backend the lease routes to, and issues one server-streaming
    /// RPC carrying the lease token and the merged parameters with the
    /// text field replaced by `texts`. The returned stream is single-pass
    /// and finite; dropping it releases the RPC. An empty `texts` sequence
    /// is accepted and sent as-is.
    ///
    /// A server-signaled error surfaces as [`Error::Synthesis`] and
    /// terminates the stream; it is never silently dropped.
    pub async fn synthesize(
        &self,
        texts: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<impl Stream<Item = Result<AudioChunk>>> {
        let texts: Vec<String> = texts.into_iter().map(Into::into).collect();

        let lease = self.session.current_lease().await?;
        let address = lease.routing_address()?.to_string();
        let channel = self.channel_for(&address).await?;

        let request = proto::TtsRequest {
            params: Some(self.params.clone().into_proto(texts)),
            lease: lease.token()?.to_vec(),
        };

        let mut grpc = Grpc::new(channel)
            .send_compressed(CompressionEncoding::Gzip)
            .accept_compressed(CompressionEncoding::Gzip);
        grpc.ready()
            .await
            .map_err(|e| Error::Synthesis(format!("channel not ready: {e}")))?;

        let codec: ProstCodec<proto::TtsRequest, proto::TtsResponse> = ProstCodec::default();
        let path = PathAndQuery::from_static(proto::TTS_METHOD);
        let mut streaming = grpc
            .server_streaming(Request::new(request), path, codec)
            .await
            .map_err(Error::synthesis_status)?
            .into_inner();

        Ok(try_stream! {
            while let Some(message) = streaming
                .message()
                .await
                .map_err(Error::synthesis_status)?
            {
                match message.response {
                    Some(Response::Data(audio)) => {
                        yield AudioChunk {
                            audio,
                            is_last: false,
                            id: None,
                        };
                    }
                    Some(Response::Status(status)) => match status.code() {
                        Code::Error => {
                            Err(Error::Synthesis(format!(
                                "server error for job {}: {}",
                                status.id, status.message
                            )))?;
                        }
                        Code::Complete => {
                            yield AudioChunk {
                                audio: Vec::new(),
                                is_last: true,
                                id: (!status.id.is_empty()).then_some(status.id),
                            };
                            break;
                        }
                        // Progress markers carry no audio.
                        Code::Generating | Code::Unspecified => {}
                    },
                    None => {}
                }
            }
        })
    }

    /// Returns the cached channel for `address`, connecting anew when the
    /// lease started routing somewhere else.
    ///
    /// A bare `host:port` address (the service's normal form) gets an
    /// `https` scheme with TLS; an explicit scheme in the lease metadata is
    /// honored as-is, with TLS only for `https`.
    async fn channel_for(&self, address: &str) -> Result<Channel> {
        let mut slot = self.channel.lock().await;
        if let Some(connected) = slot.as_ref() {
            if connected.address == address {
                return Ok(connected.channel.clone());
            }
            debug!(old = %connected.address, new = %address, "routing address changed");
        }

        debug!(%address, "connecting to synthesis backend");
        let (uri, tls) = match address.split_once("://") {
            Some(("https", _)) => (address.to_string(), true),
            Some(_) => (address.to_string(), false),
            None => (format!("https://{address}"), true),
        };
        let mut endpoint = Endpoint::from_shared(uri)?;
        if tls {
            endpoint = endpoint.tls_config(ClientTlsConfig::new())?;
        }
        let channel = endpoint
            .connect_timeout(self.options.connect_timeout)
            .connect()
            .await?;

        *slot = Some(ConnectedChannel {
            address: address.to_string(),
            channel: channel.clone(),
        });
        Ok(channel)
    }
}

/// Builder for creating a [`TtsClient`].
pub struct TtsClientBuilder {
    session: Arc<Session>,
    params: SynthesisParams,
    options: ChannelOptions,
}

impl TtsClientBuilder {
    /// Creates a builder with an empty parameter set.
    pub fn new(session: Arc<Session>) -> Self {
        Self {
            session,
            params: SynthesisParams::default(),
            options: ChannelOptions::default(),
        }
    }

    /// Seeds the baseline defaults underneath any parameters merged so
    /// far (explicit overrides keep winning).
    pub fn defaults(mut self) -> Self {
        self.params = SynthesisParams::defaults().merge(self.params);
        self
    }

    /// Merges a parameter override set; fields it sets replace earlier
    /// values, fields it leaves unset are untouched.
    pub fn params(mut self, params: SynthesisParams) -> Self {
        self.params = self.params.merge(params);
        self
    }

    /// Sets the connect timeout for the synthesis channel.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.options.connect_timeout = timeout;
        self
    }

    /// Builds the client.
    pub fn build(self) -> TtsClient {
        TtsClient {
            session: self.session,
            params: self.params,
            options: self.options,
            channel: Mutex::new(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::pin::pin;
    use std::sync::Mutex as StdMutex;
    use std::task::{Context, Poll};

    use axum::{routing::post, Router};
    use chrono::Utc;
    use futures::StreamExt;
    use tonic::codegen::{empty_body, http, Body, BoxFuture, Service, StdError};
    use tonic::server::{NamedService, ServerStreamingService};
    use tonic::transport::server::TcpIncoming;
    use tonic::Status;

    use super::*;
    use crate::{
        credentials::Credentials,
        lease::{lease_epoch, LEASE_HEADER_LEN},
        proto::{Quality, TtsStatus},
    };

    fn fresh_token(meta: &str) -> Vec<u8> {
        let created = (Utc::now() - lease_epoch()).num_seconds() as u32;
        let mut raw = vec![0u8; LEASE_HEADER_LEN];
        raw[64..68].copy_from_slice(&created.to_be_bytes());
        raw[68..72].copy_from_slice(&3600u32.to_be_bytes());
        raw.extend_from_slice(meta.as_bytes());
        raw
    }

    async fn session_with_lease(meta: String) -> Arc<Session> {
        let app = Router::new().route("/leases", post(move || async move { fresh_token(&meta) }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Arc::new(
            Session::builder()
                .credentials(Credentials::new("u", "k").unwrap())
                .url(format!("http://{addr}/leases"))
                .build()
                .unwrap(),
        )
    }

    /// Synthesis backend that answers every call with a fixed response
    /// script and records the decoded request. Laid out like a
    /// prost-generated gRPC service so the real wire path (codec,
    /// compression, routing) is exercised end to end.
    #[derive(Clone)]
    struct ScriptedBackend {
        script: Arc<Vec<proto::TtsResponse>>,
        seen: Arc<StdMutex<Option<proto::TtsRequest>>>,
    }

    impl ServerStreamingService<proto::TtsRequest> for ScriptedBackend {
        type Response = proto::TtsResponse;
        type ResponseStream = futures::stream::Iter<
            std::vec::IntoIter<std::result::Result<proto::TtsResponse, Status>>,
        >;
        type Future = futures::future::Ready<
            std::result::Result<tonic::Response<Self::ResponseStream>, Status>,
        >;

        fn call(&mut self, request: tonic::Request<proto::TtsRequest>) -> Self::Future {
            *self.seen.lock().unwrap() = Some(request.into_inner());
            let items: Vec<_> = self.script.iter().cloned().map(Ok).collect();
            futures::future::ready(Ok(tonic::Response::new(futures::stream::iter(items))))
        }
    }

    impl<B> Service<http::Request<B>> for ScriptedBackend
    where
        B: Body + Send + 'static,
        B::Error: Into<StdError> + Send + 'static,
    {
        type Response = http::Response<tonic::body::BoxBody>;
        type Error = Infallible;
        type Future = BoxFuture<Self::Response, Self::Error>;

        fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<std::result::Result<(), Self::Error>> {
            Poll::Ready(Ok(()))
        }

        fn call(&mut self, req: http::Request<B>) -> Self::Future {
            if req.uri().path() != proto::TTS_METHOD {
                return Box::pin(async move {
                    Ok(http::Response::builder()
                        .status(200)
                        .header("grpc-status", "12")
                        .header("content-type", "application/grpc")
                        .body(empty_body())
                        .unwrap())
                });
            }
            let method = self.clone();
            Box::pin(async move {
                let codec: ProstCodec<proto::TtsResponse, proto::TtsRequest> =
                    ProstCodec::default();
                let mut grpc = tonic::server::Grpc::new(codec)
                    .accept_compressed(CompressionEncoding::Gzip)
                    .send_compressed(CompressionEncoding::Gzip);
                Ok(grpc.server_streaming(method, req).await)
            })
        }
    }

    impl NamedService for ScriptedBackend {
        const NAME: &'static str = "playht.v1.Tts";
    }

    /// Spawns the scripted backend plus a lease endpoint routing to it,
    /// and returns a client wired to both.
    async fn client_against(
        script: Vec<proto::TtsResponse>,
    ) -> (TtsClient, Arc<StdMutex<Option<proto::TtsRequest>>>) {
        let seen = Arc::new(StdMutex::new(None));
        let backend = ScriptedBackend {
            script: Arc::new(script),
            seen: seen.clone(),
        };
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let incoming = TcpIncoming::from_listener(listener, true, None).unwrap();
        tokio::spawn(async move {
            tonic::transport::Server::builder()
                .add_service(backend)
                .serve_with_incoming(incoming)
                .await
                .unwrap();
        });

        let meta = format!(r#"{{"inference_address":"http://{addr}"}}"#);
        let session = session_with_lease(meta).await;
        (TtsClient::new(session), seen)
    }

    fn data(bytes: &[u8]) -> proto::TtsResponse {
        proto::TtsResponse {
            response: Some(Response::Data(bytes.to_vec())),
        }
    }

    fn status(code: Code, id: &str, message: &str) -> proto::TtsResponse {
        proto::TtsResponse {
            response: Some(Response::Status(TtsStatus {
                id: id.to_string(),
                code: code as i32,
                message: message.to_string(),
            })),
        }
    }

    #[tokio::test]
    async fn streaming_yields_audio_then_completion_marker() {
        let (client, seen) = client_against(vec![
            data(b"first"),
            status(Code::Generating, "job-7", ""),
            data(b"second"),
            status(Code::Complete, "job-7", ""),
        ])
        .await;

        let stream = client.synthesize(["hello", "world"]).await.unwrap();
        let mut stream = pin!(stream);

        let first = stream.next().await.unwrap().unwrap();
        assert_eq!(first.audio, b"first");
        assert!(!first.is_last);

        // The progress marker between the data messages yields no chunk.
        let second = stream.next().await.unwrap().unwrap();
        assert_eq!(second.audio, b"second");
        assert!(!second.is_last);

        let last = stream.next().await.unwrap().unwrap();
        assert!(last.audio.is_empty());
        assert!(last.is_last);
        assert_eq!(last.id.as_deref(), Some("job-7"));
        assert!(stream.next().await.is_none());

        let request = seen.lock().unwrap().take().unwrap();
        assert_eq!(request.params.unwrap().text, vec!["hello", "world"]);
        assert!(request.lease.len() >= LEASE_HEADER_LEN);
    }

    #[tokio::test]
    async fn server_error_status_surfaces_and_ends_the_stream() {
        let (client, _seen) = client_against(vec![
            data(b"partial"),
            status(Code::Error, "job-8", "voice not found"),
        ])
        .await;

        let stream = client.synthesize(["hello"]).await.unwrap();
        let mut stream = pin!(stream);

        assert_eq!(stream.next().await.unwrap().unwrap().audio, b"partial");

        let err = stream.next().await.unwrap().unwrap_err();
        assert!(matches!(err, Error::Synthesis(_)));
        assert!(err.to_string().contains("voice not found"));

        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn empty_text_sequence_is_accepted() {
        let (client, seen) = client_against(vec![status(Code::Complete, "", "")]).await;

        let stream = client.synthesize(Vec::<String>::new()).await.unwrap();
        let mut stream = pin!(stream);

        let last = stream.next().await.unwrap().unwrap();
        assert!(last.is_last);
        assert!(last.id.is_none());
        assert!(stream.next().await.is_none());

        let request = seen.lock().unwrap().take().unwrap();
        assert!(request.params.unwrap().text.is_empty());
    }

    #[tokio::test]
    async fn synthesize_fails_fast_without_routing_address() {
        let session = session_with_lease("{}".to_string()).await;
        let client = TtsClient::new(session);

        let err = client.synthesize(["hello"]).await.err().unwrap();
        assert!(matches!(err, Error::RoutingUnavailable));
    }

    #[tokio::test]
    async fn builder_merges_overrides_onto_defaults() {
        let session = session_with_lease("{}".to_string()).await;
        let client = TtsClient::builder(session)
            .defaults()
            .params(SynthesisParams {
                quality: Some(Quality::High),
                ..Default::default()
            })
            .params(SynthesisParams {
                sample_rate: Some(24000),
                ..Default::default()
            })
            .build();

        let params = client.params();
        assert_eq!(params.quality, Some(Quality::High));
        assert_eq!(params.sample_rate, Some(24000));
        // Untouched defaults survive the overrides.
        assert_eq!(params.speed, Some(1.0));
        assert!(params.voice.is_some());
    }

    #[tokio::test]
    async fn bare_builder_starts_empty() {
        let session = session_with_lease("{}".to_string()).await;
        let client = TtsClient::builder(session).build();
        assert_eq!(client.params(), &SynthesisParams::default());
    }
}
