//! Retry engine: repeats transport attempts with backoff until a response is final

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Duration;

use crate::core::backoff::{BackoffSettings, BackoffTimer};
use crate::core::errors::{Result, StatusContext, TranslationError};
use crate::core::logger::RequestLogger;
use crate::core::transport::{AttemptRequest, AttemptResult, OutputSink, RequestBody, Transport};

/// Limits applied to every request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrySettings {
    /// Lower bound for a single attempt's timeout
    pub min_timeout: Duration,
    /// Upper bound on attempts per request
    pub max_retries: u32,
    /// Delay curve between attempts
    pub backoff: BackoffSettings,
    /// Deadline for the whole call, retries and sleeps included
    pub total_timeout: Option<Duration>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            min_timeout: Duration::from_secs(10),
            max_retries: 5,
            backoff: BackoffSettings::default(),
            total_timeout: None,
        }
    }
}

/// Final response of a request, whatever its status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code
    pub status: u16,
    /// Buffered body; empty when it went to a sink
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Body as UTF-8, lossily
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }

    /// Fail with the mapped API error unless the status is 2xx/3xx
    pub fn check(self, context: StatusContext) -> Result<Self> {
        TranslationError::check_status(self.status, &self.body, context)?;
        Ok(self)
    }

    /// Deserialize the body, mapping failures to `InvalidResponse`
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(TranslationError::invalid_response)
    }
}

/// Per-request inputs besides method and URL
#[derive(Default)]
pub struct RequestOptions<'a> {
    /// Merged over the engine's headers, replacing same-named ones
    pub headers: HeaderMap,
    /// Body sent with every attempt
    pub body: RequestBody,
    /// Streams a successful body here instead of buffering it
    pub output: Option<&'a mut (dyn OutputSink + 'a)>,
}

impl<'a> RequestOptions<'a> {
    /// URL-encoded body, or query string for GET and DELETE
    pub fn form(params: Vec<(String, String)>) -> Self {
        Self {
            body: RequestBody::Form(params),
            ..Default::default()
        }
    }

    /// JSON body
    pub fn json(value: serde_json::Value) -> Self {
        Self {
            body: RequestBody::Json(value),
            ..Default::default()
        }
    }

    /// Add or replace one header for this request
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Stream a successful body into `output`
    pub fn with_output(mut self, output: &'a mut (dyn OutputSink + 'a)) -> Self {
        self.output = Some(output);
        self
    }
}

/// Sends requests through a [`Transport`], retrying transient failures
#[derive(Clone)]
pub struct RetryEngine {
    transport: Arc<dyn Transport>,
    headers: HeaderMap,
    settings: RetrySettings,
    logger: Option<Arc<dyn RequestLogger>>,
}

impl std::fmt::Debug for RetryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryEngine")
            .field("settings", &self.settings)
            .field("logging", &self.logger.is_some())
            .finish()
    }
}

impl RetryEngine {
    /// Engine sending `headers` with every request
    pub fn new(transport: Arc<dyn Transport>, headers: HeaderMap, settings: RetrySettings) -> Self {
        Self {
            transport,
            headers,
            settings,
            logger: None,
        }
    }

    /// Replace the logger; `None` disables logging
    pub fn with_logger(mut self, logger: Option<Arc<dyn RequestLogger>>) -> Self {
        self.logger = logger;
        self
    }

    /// Limits this engine was built with
    pub fn settings(&self) -> &RetrySettings {
        &self.settings
    }

    pub(crate) fn log_info(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.info(message);
        }
    }

    pub(crate) fn log_debug(&self, message: &str) {
        if let Some(logger) = &self.logger {
            logger.debug(message);
        }
    }

    /// Send a request, retrying while the outcome is transient.
    ///
    /// Returns the last HTTP response, including non-2xx ones; the caller
    /// interprets the status. Fails with [`TranslationError::Connection`] if
    /// the last attempt got no response, or [`TranslationError::Cancelled`]
    /// once `total_timeout` expires.
    pub async fn send_with_retries(
        &self,
        method: Method,
        url: &str,
        options: RequestOptions<'_>,
    ) -> Result<HttpResponse> {
        match self.settings.total_timeout {
            Some(limit) => tokio::time::timeout(limit, self.run(method, url, options))
                .await
                .map_err(|_| TranslationError::Cancelled(limit))?,
            None => self.run(method, url, options).await,
        }
    }

    async fn run(&self, method: Method, url: &str, mut options: RequestOptions<'_>) -> Result<HttpResponse> {
        let mut headers = self.headers.clone();
        for (name, value) in options.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }

        self.log_info(&format!("Request to DeepL API {} {}", method, url));
        self.log_debug(&format!("Request details: {}", describe_body(&options.body)));

        let mut timer = BackoffTimer::new(self.settings.backoff);
        loop {
            let request = AttemptRequest {
                method: &method,
                url,
                timeout: self.settings.min_timeout.max(timer.time_until_deadline()),
                headers: &headers,
                body: &options.body,
            };
            let result = self.transport.attempt(&request, options.output.as_deref_mut()).await;

            // budget checked before sleeping: the last attempt gets no trailing wait
            if !should_retry(&result) || timer.num_retries() + 1 >= self.settings.max_retries {
                return self.finish(&method, url, result);
            }

            if let AttemptResult::ConnectionFailure { message, .. } = &result {
                self.log_debug(&format!("Encountered a retryable-error: {}", message));
            }
            self.log_info(&format!(
                "Starting retry {} for request {} {} after sleeping for {:.2} seconds.",
                timer.num_retries() + 1,
                method,
                url,
                timer.time_until_deadline().as_secs_f64()
            ));
            timer.sleep_until_deadline().await;
        }
    }

    fn finish(&self, method: &Method, url: &str, result: AttemptResult) -> Result<HttpResponse> {
        match result {
            AttemptResult::Success { status, body } => {
                self.log_info(&format!("DeepL API response {} {} {}", method, url, status));
                self.log_debug(&format!("Response details: {}", String::from_utf8_lossy(&body)));
                Ok(HttpResponse { status, body })
            }
            AttemptResult::ConnectionFailure { retryable, message } => {
                self.log_info(&format!("DeepL API request {} {} failed: {}", method, url, message));
                Err(TranslationError::Connection { message, retryable })
            }
        }
    }
}

/// Transient outcomes: retryable connection failures, 429 and 5xx
pub fn should_retry(result: &AttemptResult) -> bool {
    match result {
        AttemptResult::ConnectionFailure { retryable, .. } => *retryable,
        AttemptResult::Success { status, .. } => *status == 429 || *status >= 500,
    }
}

fn describe_body(body: &RequestBody) -> String {
    match body {
        RequestBody::Empty => "{}".to_string(),
        RequestBody::Form(params) => {
            let pairs: Vec<String> = params.iter().map(|(k, v)| format!("{}={:?}", k, v)).collect();
            format!("{{{}}}", pairs.join(", "))
        }
        RequestBody::Json(value) => value.to_string(),
        RequestBody::Multipart { params, file } => {
            format!("{} + file {}", describe_body(&RequestBody::Form(params.clone())), file.display())
        }
    }
}
