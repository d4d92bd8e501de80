use std::time::Duration;

use bytes::Bytes;
use futures_util::stream::{self, BoxStream, StreamExt};
use reqwest::Client;

use super::error::TransportError;
use crate::config::ProxyConfig;

/// Default timeout for connecting and for each read, applied to Graph calls
/// and asset downloads alike.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

const USER_AGENT: &str = concat!("fbbackup-rs/", env!("CARGO_PKG_VERSION"));

/// Raw outcome of a GET: status plus the fully-read body.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl TransportResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Body chunks as they arrive off the wire.
pub type ByteStream = BoxStream<'static, Result<Bytes, TransportError>>;

/// Outcome of a streaming GET. The body has not been read yet.
pub struct StreamingResponse {
    pub status: u16,
    pub body: ByteStream,
}

impl StreamingResponse {
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Minimal HTTP surface used by the Graph client and the downloader.
/// The concrete implementation is [`HttpTransport`]; tests plug in stubs.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError>;

    /// GET whose body is consumed chunk by chunk. Used for asset downloads
    /// so large videos never sit in memory whole.
    async fn get_stream(&self, url: &str) -> Result<StreamingResponse, TransportError> {
        let response = self.get(url).await?;
        let body = Bytes::from(response.body);
        Ok(StreamingResponse {
            status: response.status,
            body: stream::once(async move { Ok(body) }).boxed(),
        })
    }
}

/// `reqwest`-backed transport with connect/read timeouts and an optional
/// HTTP proxy.
///
/// There is no deadline on the request as a whole: a download that keeps
/// receiving bytes may take as long as it needs, while a stalled one fails
/// after `timeout` without progress.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(timeout: Duration, proxy: Option<&ProxyConfig>) -> anyhow::Result<Self> {
        let mut builder = Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(timeout)
            .read_timeout(timeout);

        if let Some(proxy) = proxy {
            let mut p = reqwest::Proxy::all(proxy.url())?;
            if let Some(login) = &proxy.login {
                p = p.basic_auth(login, proxy.password.as_deref().unwrap_or(""));
            }
            tracing::debug!(host = %proxy.host, port = proxy.port, "Using HTTP proxy");
            builder = builder.proxy(p);
        }

        Ok(Self {
            client: builder.build()?,
            timeout,
        })
    }

    async fn send(&self, url: &str) -> Result<reqwest::Response, TransportError> {
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| classify(url, self.timeout, e))
    }
}

fn classify(url: &str, timeout: Duration, e: reqwest::Error) -> TransportError {
    if e.is_timeout() {
        TransportError::Timeout {
            url: url.to_string(),
            secs: timeout.as_secs(),
        }
    } else {
        TransportError::Http {
            url: url.to_string(),
            source: e,
        }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<TransportResponse, TransportError> {
        let response = self.send(url).await?;
        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| classify(url, self.timeout, e))?;
        Ok(TransportResponse {
            status,
            body: body.to_vec(),
        })
    }

    async fn get_stream(&self, url: &str) -> Result<StreamingResponse, TransportError> {
        let response = self.send(url).await?;
        let status = response.status().as_u16();
        let owned_url = url.to_string();
        let timeout = self.timeout;
        let body = response
            .bytes_stream()
            .map(move |chunk| chunk.map_err(|e| classify(&owned_url, timeout, e)))
            .boxed();
        Ok(StreamingResponse { status, body })
    }
}
