//! Async translation client wrapping the API endpoints

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::Method;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;

use crate::core::config::TranslatorConfig;
use crate::core::errors::{Result, StatusContext, TranslationError};
use crate::core::glossary::GlossaryEntries;
use crate::core::language::{standardize_language_code, validate_target_language};
use crate::core::logger::{RequestLogger, TracingLogger};
use crate::core::models::{
    GlossaryInfo, GlossaryLanguagePair, GlossaryRef, Language, RephraseTextResult, TextResult, Usage,
};
use crate::core::options::{language_params, Params, RephraseTextOptions, TranslateTextOptions};
use crate::core::retry::{HttpResponse, RequestOptions, RetryEngine};
use crate::core::transport::{ReqwestTransport, Transport};

/// Async client for the translation API.
///
/// Cheap to clone; clones share one connection pool. Calls hold no shared
/// mutable state, so they can run concurrently from independent tasks.
#[derive(Debug, Clone)]
pub struct Translator {
    engine: RetryEngine,
    server_url: Arc<str>,
    poll_bounds: (Duration, Duration),
}

#[derive(Deserialize)]
struct TranslationsWire {
    translations: Vec<TextResult>,
}

#[derive(Deserialize)]
struct ImprovementsWire {
    #[serde(default)]
    improvements: Vec<RephraseTextResult>,
}

#[derive(Deserialize)]
struct GlossaryListWire {
    glossaries: Vec<GlossaryInfo>,
}

#[derive(Deserialize)]
struct GlossaryLanguagesWire {
    supported_languages: Vec<GlossaryLanguagePair>,
}

impl Translator {
    /// Create a translator over the default HTTP transport.
    ///
    /// Does not contact the server.
    pub fn new(config: TranslatorConfig) -> Result<Self> {
        config.validate()?;
        let transport = ReqwestTransport::new(config.proxy.as_deref())?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create from environment
    pub fn from_env() -> Result<Self> {
        let config = TranslatorConfig::from_env()?;
        Self::new(config)
    }

    /// Create a translator over a custom transport
    pub fn with_transport(config: TranslatorConfig, transport: Arc<dyn Transport>) -> Result<Self> {
        config.validate()?;

        let engine = RetryEngine::new(transport, default_headers(&config)?, config.retry_settings())
            .with_logger(Some(Arc::new(TracingLogger)));

        Ok(Self {
            engine,
            server_url: config.resolved_server_url().into(),
            poll_bounds: config.poll_bounds(),
        })
    }

    /// Replace the request logger; `None` silences request logging
    pub fn with_logger(mut self, logger: Option<Arc<dyn RequestLogger>>) -> Self {
        self.engine = self.engine.with_logger(logger);
        self
    }

    /// Base URL every request path is appended to
    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub(crate) fn engine(&self) -> &RetryEngine {
        &self.engine
    }

    pub(crate) fn poll_bounds(&self) -> (Duration, Duration) {
        self.poll_bounds
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.server_url, path)
    }

    pub(crate) async fn send(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions<'_>,
        context: StatusContext,
    ) -> Result<HttpResponse> {
        self.engine
            .send_with_retries(method, &self.url(path), options)
            .await?
            .check(context)
    }

    /// Translate texts into the target language, one result per input text
    pub async fn translate_text<S: AsRef<str>>(
        &self,
        texts: &[S],
        source_lang: Option<&str>,
        target_lang: &str,
        options: &TranslateTextOptions,
    ) -> Result<Vec<TextResult>> {
        let mut params = language_params(
            source_lang,
            target_lang,
            options.formality,
            options.glossary.as_ref(),
        )?;
        append_texts(&mut params, texts)?;
        options.append_params(&mut params);

        let response = self
            .send(
                Method::POST,
                "/v2/translate",
                RequestOptions::form(params),
                StatusContext::General,
            )
            .await?;

        let wire: TranslationsWire = response.json()?;
        wire.translations
            .into_iter()
            .map(|mut result| -> Result<TextResult> {
                result.detected_source_lang = standardize_language_code(&result.detected_source_lang)?;
                Ok(result)
            })
            .collect()
    }

    /// Translate a single text
    pub async fn translate_one(
        &self,
        text: &str,
        source_lang: Option<&str>,
        target_lang: &str,
        options: &TranslateTextOptions,
    ) -> Result<TextResult> {
        self.translate_text(&[text], source_lang, target_lang, options)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| TranslationError::invalid_response("No translation in response"))
    }

    /// Rephrase texts, optionally into another language variant
    pub async fn rephrase_text<S: AsRef<str>>(
        &self,
        texts: &[S],
        target_lang: Option<&str>,
        options: &RephraseTextOptions,
    ) -> Result<Vec<RephraseTextResult>> {
        let mut params = Params::new();
        if let Some(target) = target_lang {
            params.push(("target_lang".to_string(), validate_target_language(target)?));
        }
        if let Some(style) = &options.writing_style {
            params.push(("writing_style".to_string(), style.clone()));
        }
        if let Some(tone) = &options.tone {
            params.push(("tone".to_string(), tone.clone()));
        }
        append_texts(&mut params, texts)?;

        let response = self
            .send(
                Method::POST,
                "/v2/write/rephrase",
                RequestOptions::form(params),
                StatusContext::General,
            )
            .await?;

        let wire: ImprovementsWire = response.json()?;
        Ok(wire.improvements)
    }

    /// Character and document usage in the current billing period
    pub async fn get_usage(&self) -> Result<Usage> {
        let response = self
            .send(Method::GET, "/v2/usage", RequestOptions::default(), StatusContext::General)
            .await?;
        Usage::from_json(&response.body).map_err(TranslationError::invalid_response)
    }

    /// Languages accepted as `source_lang`
    pub async fn get_source_languages(&self) -> Result<Vec<Language>> {
        self.get_languages(false).await
    }

    /// Languages accepted as `target_lang`
    pub async fn get_target_languages(&self) -> Result<Vec<Language>> {
        self.get_languages(true).await
    }

    async fn get_languages(&self, target: bool) -> Result<Vec<Language>> {
        let kind = if target { "target" } else { "source" };
        let response = self
            .send(
                Method::GET,
                "/v2/languages",
                RequestOptions::form(vec![("type".to_string(), kind.to_string())]),
                StatusContext::General,
            )
            .await?;
        response.json()
    }

    /// Language pairs usable for glossaries
    pub async fn get_glossary_languages(&self) -> Result<Vec<GlossaryLanguagePair>> {
        let response = self
            .send(
                Method::GET,
                "/v2/glossary-language-pairs",
                RequestOptions::default(),
                StatusContext::General,
            )
            .await?;
        let wire: GlossaryLanguagesWire = response.json()?;
        Ok(wire.supported_languages)
    }

    /// Create a glossary from validated entries
    pub async fn create_glossary(
        &self,
        name: &str,
        source_lang: &str,
        target_lang: &str,
        entries: &GlossaryEntries,
    ) -> Result<GlossaryInfo> {
        self.create_glossary_internal(name, source_lang, target_lang, "tsv", entries.to_tsv())
            .await
    }

    /// Create a glossary from CSV content, passed through unparsed
    pub async fn create_glossary_from_csv(
        &self,
        name: &str,
        source_lang: &str,
        target_lang: &str,
        csv: &str,
    ) -> Result<GlossaryInfo> {
        self.create_glossary_internal(name, source_lang, target_lang, "csv", csv.to_string())
            .await
    }

    async fn create_glossary_internal(
        &self,
        name: &str,
        source_lang: &str,
        target_lang: &str,
        entries_format: &str,
        entries: String,
    ) -> Result<GlossaryInfo> {
        if name.is_empty() {
            return Err(TranslationError::validation("glossary name must be a non-empty string"));
        }
        let params = vec![
            ("name".to_string(), name.to_string()),
            ("source_lang".to_string(), standardize_language_code(source_lang)?),
            ("target_lang".to_string(), standardize_language_code(target_lang)?),
            ("entries_format".to_string(), entries_format.to_string()),
            ("entries".to_string(), entries),
        ];

        let response = self
            .send(
                Method::POST,
                "/v2/glossaries",
                RequestOptions::form(params),
                StatusContext::Glossary,
            )
            .await?;
        response.json()
    }

    /// Metadata of one glossary
    pub async fn get_glossary(&self, glossary: &GlossaryRef) -> Result<GlossaryInfo> {
        let path = format!("/v2/glossaries/{}", glossary.resolve_id());
        let response = self
            .send(Method::GET, &path, RequestOptions::default(), StatusContext::Glossary)
            .await?;
        response.json()
    }

    /// All glossaries of the account
    pub async fn list_glossaries(&self) -> Result<Vec<GlossaryInfo>> {
        let response = self
            .send(Method::GET, "/v2/glossaries", RequestOptions::default(), StatusContext::Glossary)
            .await?;
        let wire: GlossaryListWire = response.json()?;
        Ok(wire.glossaries)
    }

    /// Entries of a glossary, fetched as TSV
    pub async fn get_glossary_entries(&self, glossary: &GlossaryRef) -> Result<GlossaryEntries> {
        let path = format!("/v2/glossaries/{}/entries", glossary.resolve_id());
        let options = RequestOptions::default()
            .with_header(ACCEPT, HeaderValue::from_static("text/tab-separated-values"));
        let response = self.send(Method::GET, &path, options, StatusContext::Glossary).await?;
        GlossaryEntries::from_tsv(&response.text())
    }

    /// Delete a glossary; it cannot be used afterwards
    pub async fn delete_glossary(&self, glossary: &GlossaryRef) -> Result<()> {
        let path = format!("/v2/glossaries/{}", glossary.resolve_id());
        self.send(Method::DELETE, &path, RequestOptions::default(), StatusContext::Glossary)
            .await?;
        Ok(())
    }
}

fn append_texts<S: AsRef<str>>(params: &mut Params, texts: &[S]) -> Result<()> {
    if texts.is_empty() || texts.iter().any(|t| t.as_ref().is_empty()) {
        return Err(TranslationError::validation(
            "texts parameter must be a non-empty string or array of non-empty strings",
        ));
    }
    params.extend(texts.iter().map(|t| ("text".to_string(), t.as_ref().to_string())));
    Ok(())
}

fn default_headers(config: &TranslatorConfig) -> Result<HeaderMap> {
    let mut user_agent = format!("deepl-translator-rs/{}", crate::VERSION);
    if let Some(app_info) = &config.app_info {
        user_agent.push(' ');
        user_agent.push_str(app_info);
    }

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, header_value(&format!("DeepL-Auth-Key {}", config.auth_key))?);
    headers.insert(USER_AGENT, header_value(&user_agent)?);

    for (name, value) in &config.headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| TranslationError::Config {
            message: format!("invalid header name {}: {}", name, e),
        })?;
        headers.insert(name, header_value(value)?);
    }
    Ok(headers)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(value).map_err(|e| TranslationError::Config {
        message: format!("invalid header value: {}", e),
    })?;
    value.set_sensitive(true);
    Ok(value)
}
