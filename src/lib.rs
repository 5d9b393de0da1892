//! DeepL Translator - async Rust client for the DeepL translation API
//!
//! Text and document translation, glossaries and usage queries over a
//! retrying HTTP engine with exponential backoff.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cli;
pub mod core;

// Re-export key types for convenience
pub use core::{
    backoff::{BackoffSettings, BackoffTimer},
    client::Translator,
    config::TranslatorConfig,
    errors::{Result, StatusContext, TranslationError},
    glossary::{GlossaryEntries, MultilingualGlossaryDictionaryEntries},
    logger::{RequestLogger, TracingLogger},
    models::{
        DocumentHandle, DocumentState, DocumentStatus, DocumentStatusCode, GlossaryInfo,
        GlossaryLanguagePair, GlossaryRef, Language, MultilingualGlossaryDictionaryInfo,
        MultilingualGlossaryInfo, MultilingualGlossaryRef, RephraseTextResult, TextResult, Usage,
        UsageDetail,
    },
    options::{
        Formality, RephraseTextOptions, SplitSentences, TranslateDocumentOptions,
        TranslateTextOptions,
    },
    retry::{HttpResponse, RequestOptions, RetryEngine, RetrySettings},
    transport::{AttemptRequest, AttemptResult, OutputSink, ReqwestTransport, RequestBody, Transport},
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
