//! Asynchronous document translation: upload, poll, download

use reqwest::Method;
use std::path::Path;
use std::time::Duration;

use crate::core::client::Translator;
use crate::core::errors::{Result, StatusContext, TranslationError};
use crate::core::models::{DocumentHandle, DocumentStatus};
use crate::core::options::{language_params, TranslateDocumentOptions};
use crate::core::retry::RequestOptions;
use crate::core::transport::{OutputSink, RequestBody};

/// File extensions accepted for upload
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "docx", "pptx", "xlsx", "pdf", "htm", "html", "txt", "xlf", "xliff", "srt",
];

/// Reject paths that cannot be uploaded
pub fn validate_document_path(path: &Path) -> Result<()> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    if !SUPPORTED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(TranslationError::validation(format!(
            "Unsupported document type: {}",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(TranslationError::validation(format!(
            "Not a regular file: {}",
            path.display()
        )));
    }
    Ok(())
}

/// Time to wait before polling again, from the server's estimate
pub fn poll_interval(status: &DocumentStatus, min: Duration, max: Duration) -> Duration {
    let suggested = status
        .seconds_remaining
        .map(|secs| Duration::from_secs(secs / 2 + 1))
        .unwrap_or(min);
    suggested.clamp(min, max.max(min))
}

fn key_params(handle: &DocumentHandle) -> Vec<(String, String)> {
    vec![("document_key".to_string(), handle.document_key.clone())]
}

impl Translator {
    /// Upload a document for translation.
    ///
    /// Unsupported or missing files fail before any request is made.
    pub async fn upload_document(
        &self,
        input: &Path,
        source_lang: Option<&str>,
        target_lang: &str,
        options: &TranslateDocumentOptions,
    ) -> Result<DocumentHandle> {
        validate_document_path(input)?;
        let mut params = language_params(
            source_lang,
            target_lang,
            options.formality,
            options.glossary.as_ref(),
        )?;
        if let Some(format) = &options.output_format {
            params.push(("output_format".to_string(), format.clone()));
        }

        let request = RequestOptions {
            body: RequestBody::Multipart {
                params,
                file: input.to_path_buf(),
            },
            ..Default::default()
        };
        let response = self
            .send(Method::POST, "/v2/document", request, StatusContext::General)
            .await?;
        response.json()
    }

    /// Fetch the current status once
    pub async fn get_document_status(&self, handle: &DocumentHandle) -> Result<DocumentStatus> {
        let path = format!("/v2/document/{}", handle.document_id);
        let response = self
            .send(
                Method::POST,
                &path,
                RequestOptions::form(key_params(handle)),
                StatusContext::General,
            )
            .await?;
        response.json()
    }

    /// Poll until the job is done.
    ///
    /// A job ending in `error` fails with [`TranslationError::DocumentTranslation`]
    /// carrying `handle`.
    pub async fn wait_until_document_translation_complete(
        &self,
        handle: &DocumentHandle,
    ) -> Result<DocumentStatus> {
        let (min, max) = self.poll_bounds();
        let mut status = self.get_document_status(handle).await?;
        while !status.is_terminal() {
            let wait = poll_interval(&status, min, max);
            self.engine().log_debug(&format!(
                "Rechecking document translation status after sleeping for {:.3} seconds.",
                wait.as_secs_f64()
            ));
            tokio::time::sleep(wait).await;
            status = self.get_document_status(handle).await?;
        }

        if status.is_error() {
            let reason = status
                .error_message
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(TranslationError::DocumentTranslation {
                message: format!("Error occurred while translating document: {}", reason),
                handle: handle.clone(),
                source: None,
            });
        }
        Ok(status)
    }

    /// Stream the translated document into `output`.
    ///
    /// Fails with [`TranslationError::DocumentNotReady`] before the job is done.
    pub async fn download_document(
        &self,
        handle: &DocumentHandle,
        output: &mut (dyn OutputSink + '_),
    ) -> Result<()> {
        let path = format!("/v2/document/{}/result", handle.document_id);
        let request = RequestOptions::form(key_params(handle)).with_output(output);
        self.send(Method::POST, &path, request, StatusContext::DocumentDownload)
            .await?;
        Ok(())
    }

    /// Upload, wait for and download a document into a new file at `output`.
    ///
    /// An existing `output` is never overwritten. On failure the partial
    /// output is removed; failures after upload carry the document handle.
    pub async fn translate_document(
        &self,
        input: &Path,
        output: &Path,
        source_lang: Option<&str>,
        target_lang: &str,
        options: &TranslateDocumentOptions,
    ) -> Result<DocumentStatus> {
        if output.exists() {
            return Err(TranslationError::validation(format!(
                "File already exists at output path: {}",
                output.display()
            )));
        }
        validate_document_path(input)?;

        let mut file = tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(output)
            .await?;

        let result = self
            .translate_document_into(input, &mut file, source_lang, target_lang, options)
            .await;
        drop(file);

        if result.is_err() {
            // best effort; the original error is what matters
            let _ = tokio::fs::remove_file(output).await;
        }
        result
    }

    async fn translate_document_into(
        &self,
        input: &Path,
        output: &mut (dyn OutputSink + '_),
        source_lang: Option<&str>,
        target_lang: &str,
        options: &TranslateDocumentOptions,
    ) -> Result<DocumentStatus> {
        let handle = self
            .upload_document(input, source_lang, target_lang, options)
            .await?;

        self.wait_and_download(&handle, output).await.map_err(|err| match err {
            err @ TranslationError::DocumentTranslation { .. } => err,
            other => TranslationError::DocumentTranslation {
                message: other.to_string(),
                handle,
                source: Some(Box::new(other)),
            },
        })
    }

    async fn wait_and_download(
        &self,
        handle: &DocumentHandle,
        output: &mut (dyn OutputSink + '_),
    ) -> Result<DocumentStatus> {
        let status = self.wait_until_document_translation_complete(handle).await?;
        self.download_document(handle, output).await?;
        Ok(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::TranslatorConfig;
    use crate::core::models::DocumentStatusCode;
    use crate::core::test_support::ScriptedTransport;
    use crate::core::transport::AttemptResult;
    use serde_json::json;
    use std::sync::Arc;

    fn translator(script: Vec<AttemptResult>) -> (Translator, Arc<ScriptedTransport>) {
        let transport = Arc::new(ScriptedTransport::new(script));
        let mut config = TranslatorConfig::new("test-key");
        config.server_url = Some("https://api.test".to_string());
        config.backoff.jitter = 0.0;
        let translator = Translator::with_transport(config, transport.clone())
            .unwrap()
            .with_logger(None);
        (translator, transport)
    }

    fn status(value: &str) -> AttemptResult {
        ScriptedTransport::json(json!({"document_id": "D1", "status": value}))
    }

    fn handle() -> DocumentHandle {
        DocumentHandle::from_pair("D1", "K1")
    }

    fn input_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("input.txt");
        std::fs::write(&path, "Hello").unwrap();
        path
    }

    #[test]
    fn test_poll_interval() {
        let min = Duration::from_secs(1);
        let max = Duration::from_secs(60);
        let mut status = DocumentStatus {
            status: DocumentStatusCode::Translating,
            seconds_remaining: Some(20),
            billed_characters: None,
            error_message: None,
        };
        assert_eq!(poll_interval(&status, min, max), Duration::from_secs(11));

        status.seconds_remaining = Some(1000);
        assert_eq!(poll_interval(&status, min, max), max);

        status.seconds_remaining = None;
        assert_eq!(poll_interval(&status, min, max), min);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_polls_until_done() {
        let (translator, transport) = translator(vec![
            status("queued"),
            status("translating"),
            status("done"),
        ]);

        let result = translator
            .wait_until_document_translation_complete(&handle())
            .await
            .unwrap();

        assert!(result.is_done());
        assert_eq!(transport.calls(), 3);
        for request in transport.requests() {
            assert_eq!(request.url, "https://api.test/v2/document/D1");
            assert_eq!(request.param("document_key"), Some("K1"));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_status_carries_uploaded_handle() {
        let dir = tempfile::tempdir().unwrap();
        let input = input_file(&dir);
        let (translator, _) = translator(vec![
            ScriptedTransport::json(json!({"document_id": "D9", "document_key": "K9"})),
            status("translating"),
            ScriptedTransport::json(json!({"status": "error", "error_message": "Source file corrupt"})),
        ]);

        let uploaded = translator
            .upload_document(&input, None, "de", &Default::default())
            .await
            .unwrap();
        let err = translator
            .wait_until_document_translation_complete(&uploaded)
            .await
            .unwrap_err();

        assert_eq!(err.document_handle(), Some(&uploaded));
        assert!(err.to_string().contains("Source file corrupt"));
    }

    #[tokio::test]
    async fn test_unsupported_extension_makes_no_request() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("notes.md");
        std::fs::write(&input, "# hi").unwrap();
        let (translator, transport) = translator(vec![ScriptedTransport::status(200)]);

        let err = translator
            .upload_document(&input, None, "de", &Default::default())
            .await
            .unwrap_err();

        assert!(matches!(err, TranslationError::Validation { .. }));
        assert_eq!(transport.calls(), 0);

        let missing = dir.path().join("missing.docx");
        assert!(translator
            .upload_document(&missing, None, "de", &Default::default())
            .await
            .is_err());
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_upload_params() {
        let dir = tempfile::tempdir().unwrap();
        let input = input_file(&dir);
        let (translator, transport) = translator(vec![ScriptedTransport::json(
            json!({"document_id": "D1", "document_key": "K1"}),
        )]);

        let options = TranslateDocumentOptions {
            output_format: Some("docx".to_string()),
            ..Default::default()
        };
        let uploaded = translator
            .upload_document(&input, Some("EN"), "DE", &options)
            .await
            .unwrap();

        assert_eq!(uploaded, handle());
        let request = &transport.requests()[0];
        assert_eq!(request.url, "https://api.test/v2/document");
        assert_eq!(request.param("target_lang"), Some("de"));
        assert_eq!(request.param("source_lang"), Some("en"));
        assert_eq!(request.param("output_format"), Some("docx"));
        assert!(matches!(&request.body, RequestBody::Multipart { file, .. } if file == &input));
    }

    #[tokio::test]
    async fn test_persisted_handle_polls_identically() {
        let (translator, transport) = translator(vec![status("done")]);
        let original = handle();
        let restored: DocumentHandle =
            serde_json::from_str(&serde_json::to_string(&original).unwrap()).unwrap();

        translator.get_document_status(&original).await.unwrap();
        translator.get_document_status(&restored).await.unwrap();

        let requests = transport.requests();
        assert_eq!(requests[0].url, requests[1].url);
        assert_eq!(requests[0].body, requests[1].body);
    }

    #[tokio::test]
    async fn test_download_into_buffer() {
        let (translator, transport) = translator(vec![ScriptedTransport::ok(b"Hallo")]);
        let mut buffer = b"stale".to_vec();

        translator.download_document(&handle(), &mut buffer).await.unwrap();

        assert_eq!(buffer, b"Hallo");
        assert_eq!(transport.requests()[0].url, "https://api.test/v2/document/D1/result");
    }

    #[tokio::test(start_paused = true)]
    async fn test_download_before_done_is_not_ready() {
        let (translator, transport) = translator(vec![ScriptedTransport::status(503)]);
        let mut buffer = Vec::new();

        let err = translator
            .download_document(&handle(), &mut buffer)
            .await
            .unwrap_err();

        assert!(matches!(err, TranslationError::DocumentNotReady { .. }));
        assert_eq!(transport.calls(), 5);
        assert!(buffer.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_translate_document_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = input_file(&dir);
        let output = dir.path().join("output.txt");
        let (translator, transport) = translator(vec![
            ScriptedTransport::json(json!({"document_id": "D1", "document_key": "K1"})),
            status("translating"),
            ScriptedTransport::json(json!({"status": "done", "billed_characters": 5})),
            ScriptedTransport::ok(b"Hallo"),
        ]);

        let status = translator
            .translate_document(&input, &output, None, "de", &Default::default())
            .await
            .unwrap();

        assert_eq!(status.billed_characters, Some(5));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "Hallo");
        assert_eq!(transport.calls(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_translate_document_failure_removes_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = input_file(&dir);
        let output = dir.path().join("output.txt");
        let (translator, _) = translator(vec![
            ScriptedTransport::json(json!({"document_id": "D1", "document_key": "K1"})),
            ScriptedTransport::status(456),
        ]);

        let err = translator
            .translate_document(&input, &output, None, "de", &Default::default())
            .await
            .unwrap_err();

        assert_eq!(err.document_handle(), Some(&handle()));
        assert!(!output.exists());
    }

    #[tokio::test]
    async fn test_translate_document_refuses_existing_output() {
        let dir = tempfile::tempdir().unwrap();
        let input = input_file(&dir);
        let output = dir.path().join("output.txt");
        std::fs::write(&output, "keep me").unwrap();
        let (translator, transport) = translator(vec![ScriptedTransport::status(200)]);

        let err = translator
            .translate_document(&input, &output, None, "de", &Default::default())
            .await
            .unwrap_err();

        assert!(matches!(err, TranslationError::Validation { .. }));
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "keep me");
        assert_eq!(transport.calls(), 0);
    }
}
