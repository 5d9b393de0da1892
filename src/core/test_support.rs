//! Scripted transport and recording logger shared by unit tests

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::Method;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use crate::core::logger::RequestLogger;
use crate::core::transport::{AttemptRequest, AttemptResult, OutputSink, RequestBody, Transport};

/// What a scripted transport saw for one attempt
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub url: String,
    pub timeout: Duration,
    pub headers: HeaderMap,
    pub body: RequestBody,
}

impl RecordedRequest {
    /// Value of the first form/multipart param named `key`
    pub fn param(&self, key: &str) -> Option<&str> {
        let params = match &self.body {
            RequestBody::Form(params) | RequestBody::Multipart { params, .. } => params,
            _ => return None,
        };
        params.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    pub fn params(&self, key: &str) -> Vec<&str> {
        match &self.body {
            RequestBody::Form(params) | RequestBody::Multipart { params, .. } => params
                .iter()
                .filter(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
                .collect(),
            _ => Vec::new(),
        }
    }
}

enum Mode {
    /// Pops results in order; the last one repeats
    Script(Mutex<VecDeque<AttemptResult>>),
    Hang,
}

/// Transport replaying canned results
pub struct ScriptedTransport {
    mode: Mode,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedTransport {
    pub fn new(script: Vec<AttemptResult>) -> Self {
        assert!(!script.is_empty(), "script needs at least one result");
        Self {
            mode: Mode::Script(Mutex::new(script.into())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn repeating(result: AttemptResult) -> Self {
        Self::new(vec![result])
    }

    /// Never completes an attempt
    pub fn hanging() -> Self {
        Self {
            mode: Mode::Hang,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn status(status: u16) -> AttemptResult {
        AttemptResult::Success {
            status,
            body: Vec::new(),
        }
    }

    pub fn ok(body: &[u8]) -> AttemptResult {
        AttemptResult::Success {
            status: 200,
            body: body.to_vec(),
        }
    }

    pub fn json(value: serde_json::Value) -> AttemptResult {
        Self::ok(value.to_string().as_bytes())
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn timeouts(&self) -> Vec<Duration> {
        self.requests().iter().map(|r| r.timeout).collect()
    }

    fn next(&self) -> Option<AttemptResult> {
        match &self.mode {
            Mode::Script(script) => {
                let mut script = script.lock().unwrap();
                if script.len() > 1 {
                    script.pop_front()
                } else {
                    script.front().cloned()
                }
            }
            Mode::Hang => None,
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn attempt(
        &self,
        request: &AttemptRequest<'_>,
        sink: Option<&mut (dyn OutputSink + '_)>,
    ) -> AttemptResult {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: request.method.clone(),
            url: request.url.to_string(),
            timeout: request.timeout,
            headers: request.headers.clone(),
            body: request.body.clone(),
        });

        let result = match self.next() {
            Some(result) => result,
            None => std::future::pending().await,
        };

        match (result, sink) {
            (AttemptResult::Success { status, body }, Some(sink)) if (200..300).contains(&status) => {
                sink.reset().await.unwrap();
                sink.write_chunk(&body).await.unwrap();
                sink.finish().await.unwrap();
                AttemptResult::Success {
                    status,
                    body: Vec::new(),
                }
            }
            (result, _) => result,
        }
    }
}

/// Logger keeping every message
#[derive(Default)]
pub struct RecordingLogger {
    infos: Mutex<Vec<String>>,
    debugs: Mutex<Vec<String>>,
}

impl RecordingLogger {
    pub fn infos(&self) -> Vec<String> {
        self.infos.lock().unwrap().clone()
    }

    pub fn debugs(&self) -> Vec<String> {
        self.debugs.lock().unwrap().clone()
    }
}

impl RequestLogger for RecordingLogger {
    fn info(&self, message: &str) {
        self.infos.lock().unwrap().push(message.to_string());
    }

    fn debug(&self, message: &str) {
        self.debugs.lock().unwrap().push(message.to_string());
    }
}
