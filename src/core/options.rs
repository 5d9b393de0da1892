//! Per-request option sets and their wire parameters

use crate::core::errors::Result;
use crate::core::language::{standardize_language_code, validate_target_language};
use crate::core::models::GlossaryRef;

/// Formality preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Formality {
    /// Server default
    Default,
    /// Informal, fails for languages without formality support
    Less,
    /// Formal, fails for languages without formality support
    More,
    /// Informal where supported
    PreferLess,
    /// Formal where supported
    PreferMore,
}

impl Formality {
    /// Wire value; `None` for the server default
    fn as_param(self) -> Option<&'static str> {
        match self {
            Formality::Default => None,
            Formality::Less => Some("less"),
            Formality::More => Some("more"),
            Formality::PreferLess => Some("prefer_less"),
            Formality::PreferMore => Some("prefer_more"),
        }
    }
}

/// How input text is split into sentences
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitSentences {
    /// Split on punctuation and newlines
    On,
    /// Treat all input as one sentence
    Off,
    /// Split on punctuation only
    NoNewlines,
}

impl SplitSentences {
    fn as_param(self) -> &'static str {
        match self {
            SplitSentences::On => "1",
            SplitSentences::Off => "0",
            SplitSentences::NoNewlines => "nonewlines",
        }
    }
}

/// Options for text translation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslateTextOptions {
    /// Formality of the translation
    pub formality: Option<Formality>,
    /// Glossary to apply; requires a source language
    pub glossary: Option<GlossaryRef>,
    /// Sentence splitting mode
    pub split_sentences: Option<SplitSentences>,
    /// Keep punctuation and casing as in the input
    pub preserve_formatting: bool,
    /// `"html"` or `"xml"`
    pub tag_handling: Option<String>,
    /// `Some(false)` disables automatic outline detection
    pub outline_detection: Option<bool>,
    /// XML tags that always split sentences
    pub splitting_tags: Vec<String>,
    /// XML tags that never split sentences
    pub non_splitting_tags: Vec<String>,
    /// XML tags whose content is not translated
    pub ignore_tags: Vec<String>,
    /// Extra context that steers the translation but is not translated
    pub context: Option<String>,
    /// `quality_optimized`, `prefer_quality_optimized` or `latency_optimized`
    pub model_type: Option<String>,
}

/// Options for document translation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TranslateDocumentOptions {
    /// Formality of the translation
    pub formality: Option<Formality>,
    /// Glossary to apply; requires a source language
    pub glossary: Option<GlossaryRef>,
    /// Requested output file type, e.g. `"docx"` for a PDF input
    pub output_format: Option<String>,
}

/// Options for rephrasing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RephraseTextOptions {
    /// e.g. `business` or `casual`
    pub writing_style: Option<String>,
    /// e.g. `friendly` or `diplomatic`
    pub tone: Option<String>,
}

pub(crate) type Params = Vec<(String, String)>;

fn push(params: &mut Params, key: &str, value: impl Into<String>) {
    params.push((key.to_string(), value.into()));
}

/// Parameters shared by text and document translation
pub(crate) fn language_params(
    source_lang: Option<&str>,
    target_lang: &str,
    formality: Option<Formality>,
    glossary: Option<&GlossaryRef>,
) -> Result<Params> {
    let mut params = Params::new();
    push(&mut params, "target_lang", validate_target_language(target_lang)?);
    if let Some(source) = source_lang {
        push(&mut params, "source_lang", standardize_language_code(source)?);
    }
    if let Some(value) = formality.and_then(Formality::as_param) {
        push(&mut params, "formality", value);
    }
    if let Some(glossary) = glossary {
        push(&mut params, "glossary_id", glossary.resolve_id());
    }
    Ok(params)
}

impl TranslateTextOptions {
    pub(crate) fn append_params(&self, params: &mut Params) {
        if let Some(split) = self.split_sentences {
            push(params, "split_sentences", split.as_param());
        }
        if self.preserve_formatting {
            push(params, "preserve_formatting", "1");
        }
        if let Some(tag_handling) = &self.tag_handling {
            push(params, "tag_handling", tag_handling.as_str());
        }
        if self.outline_detection == Some(false) {
            push(params, "outline_detection", "0");
        }
        for (key, tags) in [
            ("splitting_tags", &self.splitting_tags),
            ("non_splitting_tags", &self.non_splitting_tags),
            ("ignore_tags", &self.ignore_tags),
        ] {
            if !tags.is_empty() {
                push(params, key, tags.join(","));
            }
        }
        if let Some(context) = &self.context {
            push(params, "context", context.as_str());
        }
        if let Some(model_type) = &self.model_type {
            push(params, "model_type", model_type.as_str());
        }
    }
}
