//! Single-attempt HTTP transport and connection-failure classification

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, Response};
use std::error::Error as _;
use std::io::{self, SeekFrom};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncSeekExt, AsyncWriteExt};

use crate::core::errors::Result;

/// Request body of one attempt
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    /// No body
    #[default]
    Empty,
    /// URL-encoded pairs; repeated keys are sent repeatedly, without indices.
    /// Sent as the query string for GET and DELETE.
    Form(Vec<(String, String)>),
    /// JSON document with a matching content type
    Json(serde_json::Value),
    /// Form pairs plus a file uploaded as the `file` part
    Multipart {
        /// Text fields sent before the file
        params: Vec<(String, String)>,
        /// Streamed from disk on each attempt
        file: PathBuf,
    },
}

/// Everything needed for one network round-trip
#[derive(Debug, Clone, Copy)]
pub struct AttemptRequest<'a> {
    /// HTTP method
    pub method: &'a Method,
    /// Absolute URL
    pub url: &'a str,
    /// Whole-exchange timeout for this attempt
    pub timeout: Duration,
    /// Final headers, defaults already merged
    pub headers: &'a HeaderMap,
    /// Body to send
    pub body: &'a RequestBody,
}

/// Outcome of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptResult {
    /// Any HTTP response, whatever its status. The body is empty when it
    /// was streamed to a sink.
    Success {
        /// HTTP status code
        status: u16,
        /// Buffered response body
        body: Vec<u8>,
    },
    /// No usable response
    ConnectionFailure {
        /// Whether another attempt may succeed
        retryable: bool,
        /// Description of the failure
        message: String,
    },
}

/// Destination for streamed response bodies
#[async_trait]
pub trait OutputSink: Send {
    /// Drop anything written by an earlier attempt
    async fn reset(&mut self) -> io::Result<()>;

    /// Append one chunk of the body
    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// Called once after the last chunk
    async fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[async_trait]
impl OutputSink for tokio::fs::File {
    async fn reset(&mut self) -> io::Result<()> {
        self.set_len(0).await?;
        self.seek(SeekFrom::Start(0)).await?;
        Ok(())
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.write_all(chunk).await
    }

    async fn finish(&mut self) -> io::Result<()> {
        self.flush().await
    }
}

#[async_trait]
impl OutputSink for Vec<u8> {
    async fn reset(&mut self) -> io::Result<()> {
        self.clear();
        Ok(())
    }

    async fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.extend_from_slice(chunk);
        Ok(())
    }
}

/// Performs exactly one request; never retries
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `request` once. When a sink is given, a successful (2xx) body is
    /// streamed into it instead of being returned.
    async fn attempt(
        &self,
        request: &AttemptRequest<'_>,
        sink: Option<&mut (dyn OutputSink + '_)>,
    ) -> AttemptResult;
}

/// Production transport on a shared `reqwest` connection pool
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build the connection pool, optionally through a proxy
    pub fn new(proxy: Option<&str>) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(10);

        if let Some(proxy) = proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy)?);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }

    /// Wrap an existing client
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn attempt(
        &self,
        request: &AttemptRequest<'_>,
        mut sink: Option<&mut (dyn OutputSink + '_)>,
    ) -> AttemptResult {
        if let Some(sink) = sink.as_deref_mut() {
            if let Err(e) = sink.reset().await {
                return sink_failure(e);
            }
        }

        let mut builder = self
            .client
            .request(request.method.clone(), request.url)
            .timeout(request.timeout)
            .headers(request.headers.clone());

        builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Form(params) if sends_query(request.method) => builder.query(params),
            RequestBody::Form(params) => builder.form(params),
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart { params, file } => match multipart_form(params, file).await {
                Ok(form) => builder.multipart(form),
                Err(e) => {
                    return AttemptResult::ConnectionFailure {
                        retryable: false,
                        message: format!("Failed to read {}: {}", file.display(), e),
                    }
                }
            },
        };

        let response = match builder.send().await {
            Ok(response) => response,
            Err(e) => return classify_error(&e),
        };

        match sink {
            Some(sink) if response.status().is_success() => stream_to_sink(response, sink).await,
            _ => {
                let status = response.status().as_u16();
                match response.bytes().await {
                    Ok(body) => AttemptResult::Success {
                        status,
                        body: body.to_vec(),
                    },
                    Err(e) => classify_error(&e),
                }
            }
        }
    }
}

fn sends_query(method: &Method) -> bool {
    *method == Method::GET || *method == Method::DELETE
}

const UPLOAD_CHUNK_SIZE: usize = 64 * 1024;

async fn multipart_form(params: &[(String, String)], file: &Path) -> io::Result<Form> {
    // opened inside the attempt; the request body owns the handle and drops it with the attempt
    let handle = tokio::fs::File::open(file).await?;
    let length = handle.metadata().await?.len();
    let chunks = futures::stream::try_unfold(handle, |mut handle| async move {
        let mut buf = vec![0u8; UPLOAD_CHUNK_SIZE];
        let n = handle.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok::<_, io::Error>(Some((buf, handle)))
    });

    let file_name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());

    let form = params
        .iter()
        .fold(Form::new(), |form, (k, v)| form.text(k.clone(), v.clone()));
    let part = Part::stream_with_length(reqwest::Body::wrap_stream(chunks), length).file_name(file_name);
    Ok(form.part("file", part))
}

async fn stream_to_sink(mut response: Response, sink: &mut (dyn OutputSink + '_)) -> AttemptResult {
    let status = response.status().as_u16();
    loop {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                if let Err(e) = sink.write_chunk(&chunk).await {
                    return sink_failure(e);
                }
            }
            Ok(None) => break,
            Err(e) => return classify_error(&e),
        }
    }

    if let Err(e) = sink.finish().await {
        return sink_failure(e);
    }

    AttemptResult::Success {
        status,
        body: Vec::new(),
    }
}

fn sink_failure(err: io::Error) -> AttemptResult {
    AttemptResult::ConnectionFailure {
        retryable: false,
        message: format!("Failed writing response body: {}", err),
    }
}

/// Map a `reqwest` failure to a connection failure.
///
/// Bad URLs and schemes are fatal. Timeouts, refused connections and
/// responses that end before a complete message are retryable. Anything
/// else is fatal.
pub fn classify_error(err: &reqwest::Error) -> AttemptResult {
    if err.is_builder() {
        return AttemptResult::ConnectionFailure {
            retryable: false,
            message: format!("Invalid server URL. {}", err),
        };
    }

    AttemptResult::ConnectionFailure {
        retryable: err.is_timeout() || err.is_connect() || is_incomplete_message(err),
        message: err.to_string(),
    }
}

fn is_incomplete_message(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(e) = source {
        if let Some(hyper_err) = e.downcast_ref::<hyper::Error>() {
            if hyper_err.is_incomplete_message() {
                return true;
            }
        }
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::UnexpectedEof | io::ErrorKind::ConnectionReset | io::ErrorKind::ConnectionAborted
            ) {
                return true;
            }
        }
        source = e.source();
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_vec_sink_reset_discards_partial_body() {
        let mut sink: Vec<u8> = Vec::new();
        sink.write_chunk(b"partial").await.unwrap();
        sink.reset().await.unwrap();
        sink.write_chunk(b"full body").await.unwrap();
        sink.finish().await.unwrap();
        assert_eq!(sink, b"full body");
    }

    #[tokio::test]
    async fn test_file_sink_reset_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut file = tokio::fs::File::create(&path).await.unwrap();

        file.write_chunk(b"a much longer first attempt").await.unwrap();
        file.reset().await.unwrap();
        file.write_chunk(b"second").await.unwrap();
        file.finish().await.unwrap();
        drop(file);

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
    }

    #[test]
    fn test_query_methods() {
        assert!(sends_query(&Method::GET));
        assert!(sends_query(&Method::DELETE));
        assert!(!sends_query(&Method::POST));
    }
}
