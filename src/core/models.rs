//! Core data models returned by the translation API

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Result of translating a single text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextResult {
    /// Translated text
    pub text: String,
    /// Language detected (or given) for the source text
    #[serde(rename = "detected_source_language")]
    pub detected_source_lang: String,
    /// Characters billed for this text, when reported
    #[serde(default)]
    pub billed_characters: Option<u64>,
    /// Model type the server used, when reported
    #[serde(default, rename = "model_type_used")]
    pub model_type: Option<String>,
}

impl fmt::Display for TextResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Result of rephrasing a single text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RephraseTextResult {
    /// Rephrased text
    pub text: String,
    /// Language detected for the input text
    #[serde(default, rename = "detected_source_language")]
    pub detected_source_lang: String,
    /// Language of the rephrased text
    #[serde(default, rename = "target_language")]
    pub target_lang: String,
}

/// Count and limit for one usage category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageDetail {
    /// Amount used so far
    pub count: u64,
    /// Maximum for the period
    pub limit: u64,
}

impl UsageDetail {
    /// True once the count has reached the limit
    pub fn limit_reached(&self) -> bool {
        self.count >= self.limit
    }
}

/// Usage for the current billing period
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Translated characters
    pub character: Option<UsageDetail>,
    /// Translated documents
    pub document: Option<UsageDetail>,
    /// Documents translated by the whole team
    pub team_document: Option<UsageDetail>,
}

/// Wire shape of the usage endpoint
#[derive(Debug, Deserialize)]
struct UsageWire {
    character_count: Option<u64>,
    character_limit: Option<u64>,
    document_count: Option<u64>,
    document_limit: Option<u64>,
    team_document_count: Option<u64>,
    team_document_limit: Option<u64>,
}

fn detail(count: Option<u64>, limit: Option<u64>) -> Option<UsageDetail> {
    Some(UsageDetail {
        count: count?,
        limit: limit?,
    })
}

impl Usage {
    /// Parse a usage response body
    pub fn from_json(body: &[u8]) -> serde_json::Result<Self> {
        let wire: UsageWire = serde_json::from_slice(body)?;
        Ok(Self {
            character: detail(wire.character_count, wire.character_limit),
            document: detail(wire.document_count, wire.document_limit),
            team_document: detail(wire.team_document_count, wire.team_document_limit),
        })
    }

    /// True if any of the reported limits is reached
    pub fn any_limit_reached(&self) -> bool {
        [self.character, self.document, self.team_document]
            .iter()
            .flatten()
            .any(UsageDetail::limit_reached)
    }
}

impl fmt::Display for Usage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rows = [
            ("Characters", self.character),
            ("Documents", self.document),
            ("Team documents", self.team_document),
        ];
        let mut first = true;
        for (label, value) in rows {
            if let Some(d) = value {
                if !first {
                    writeln!(f)?;
                }
                write!(f, "{}: {} of {}", label, d.count, d.limit)?;
                first = false;
            }
        }
        if first {
            write!(f, "Usage: no usage")?;
        }
        Ok(())
    }
}

/// A language supported by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    /// English name of the language
    pub name: String,
    /// Code to pass as `source_lang` or `target_lang`
    #[serde(rename = "language")]
    pub code: String,
    /// Only reported for target languages
    #[serde(default)]
    pub supports_formality: Option<bool>,
}

/// Source/target pair usable for glossaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryLanguagePair {
    /// Language of the source terms
    pub source_lang: String,
    /// Language of the target terms
    pub target_lang: String,
}

/// Information about a glossary, excluding its entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryInfo {
    /// Unique ID assigned by the server
    pub glossary_id: String,
    /// Name chosen at creation
    pub name: String,
    /// False while the server is still building the glossary
    pub ready: bool,
    /// Language of the source terms
    pub source_lang: String,
    /// Language of the target terms
    pub target_lang: String,
    /// When the glossary was created
    pub creation_time: DateTime<Utc>,
    /// Number of entries
    pub entry_count: u64,
}

/// A glossary given either by ID or by a previously fetched [`GlossaryInfo`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GlossaryRef {
    /// Bare glossary ID
    Id(String),
    /// Info returned by an earlier call
    Resolved(GlossaryInfo),
}

impl GlossaryRef {
    /// The glossary ID sent on the wire
    pub fn resolve_id(&self) -> &str {
        match self {
            GlossaryRef::Id(id) => id,
            GlossaryRef::Resolved(info) => &info.glossary_id,
        }
    }
}

impl From<&str> for GlossaryRef {
    fn from(id: &str) -> Self {
        GlossaryRef::Id(id.to_string())
    }
}

impl From<String> for GlossaryRef {
    fn from(id: String) -> Self {
        GlossaryRef::Id(id)
    }
}

impl From<GlossaryInfo> for GlossaryRef {
    fn from(info: GlossaryInfo) -> Self {
        GlossaryRef::Resolved(info)
    }
}

/// One source/target dictionary of a multilingual glossary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultilingualGlossaryDictionaryInfo {
    /// Language of the source terms
    pub source_lang: String,
    /// Language of the target terms
    pub target_lang: String,
    /// Number of entries in this dictionary
    pub entry_count: u64,
}

/// Information about a multilingual glossary, excluding its entries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MultilingualGlossaryInfo {
    /// Unique ID assigned by the server
    pub glossary_id: String,
    /// Name chosen at creation
    pub name: String,
    /// One entry per language pair
    #[serde(default)]
    pub dictionaries: Vec<MultilingualGlossaryDictionaryInfo>,
    /// When the glossary was created
    pub creation_time: DateTime<Utc>,
}

impl MultilingualGlossaryInfo {
    /// Dictionary for a language pair, compared case-insensitively
    pub fn dictionary(&self, source_lang: &str, target_lang: &str) -> Option<&MultilingualGlossaryDictionaryInfo> {
        self.dictionaries.iter().find(|d| {
            d.source_lang.eq_ignore_ascii_case(source_lang) && d.target_lang.eq_ignore_ascii_case(target_lang)
        })
    }
}

/// A multilingual glossary given either by ID or by its fetched info
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultilingualGlossaryRef {
    /// Bare glossary ID
    Id(String),
    /// Info returned by an earlier call
    Resolved(MultilingualGlossaryInfo),
}

impl MultilingualGlossaryRef {
    /// The glossary ID sent on the wire
    pub fn resolve_id(&self) -> &str {
        match self {
            MultilingualGlossaryRef::Id(id) => id,
            MultilingualGlossaryRef::Resolved(info) => &info.glossary_id,
        }
    }
}

impl From<&str> for MultilingualGlossaryRef {
    fn from(id: &str) -> Self {
        MultilingualGlossaryRef::Id(id.to_string())
    }
}

impl From<String> for MultilingualGlossaryRef {
    fn from(id: String) -> Self {
        MultilingualGlossaryRef::Id(id)
    }
}

impl From<MultilingualGlossaryInfo> for MultilingualGlossaryRef {
    fn from(info: MultilingualGlossaryInfo) -> Self {
        MultilingualGlossaryRef::Resolved(info)
    }
}

/// Multilingual glossaries are usable wherever a glossary ID is accepted
impl From<&MultilingualGlossaryInfo> for GlossaryRef {
    fn from(info: &MultilingualGlossaryInfo) -> Self {
        GlossaryRef::Id(info.glossary_id.clone())
    }
}

/// Capability token for an uploaded document.
///
/// The handle is the only way to reach a job after upload, so callers that
/// may crash between upload and download should persist it (it serializes
/// to `{"document_id": .., "document_key": ..}`). The client never
/// invalidates a handle itself; it stays usable until the document is
/// downloaded or expires on the server.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocumentHandle {
    /// Job ID, part of the URL
    pub document_id: String,
    /// Secret sent with every call for this job
    pub document_key: String,
}

impl DocumentHandle {
    /// Rebuild a handle from a persisted (id, key) pair
    pub fn from_pair(document_id: impl Into<String>, document_key: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            document_key: document_key.into(),
        }
    }

    /// Split into the (id, key) pair for persistence
    pub fn into_pair(self) -> (String, String) {
        (self.document_id, self.document_key)
    }
}

impl fmt::Display for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // the key is a secret
        write!(f, "Document ID: {}", self.document_id)
    }
}

/// Job status as reported by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatusCode {
    /// Waiting for a worker
    Queued,
    /// In progress
    Translating,
    /// Ready to download
    Done,
    /// Failed; see `error_message`
    Error,
}

impl fmt::Display for DocumentStatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentStatusCode::Queued => write!(f, "queued"),
            DocumentStatusCode::Translating => write!(f, "translating"),
            DocumentStatusCode::Done => write!(f, "done"),
            DocumentStatusCode::Error => write!(f, "error"),
        }
    }
}

/// Snapshot of a document job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentStatus {
    /// Current job status
    pub status: DocumentStatusCode,
    /// Server estimate, only while the job is running
    #[serde(default)]
    pub seconds_remaining: Option<u64>,
    /// Reported once the job is done
    #[serde(default)]
    pub billed_characters: Option<u64>,
    /// Reported when the job failed
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DocumentStatus {
    /// `done` or `error`
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, DocumentStatusCode::Done | DocumentStatusCode::Error)
    }

    /// Translation finished successfully
    pub fn is_done(&self) -> bool {
        self.status == DocumentStatusCode::Done
    }

    /// Translation failed
    pub fn is_error(&self) -> bool {
        self.status == DocumentStatusCode::Error
    }
}

/// Lifecycle of a document job as seen by the client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
    /// Not uploaded yet
    Created,
    /// Accepted by the server, no status seen yet
    Uploaded,
    /// Waiting for a worker
    Queued,
    /// In progress
    Translating,
    /// Ready to download
    Done,
    /// Failed on the server
    Error,
}

impl DocumentState {
    /// Whether a job may move from `self` to `next`.
    ///
    /// Queued and translating may alternate; done and error are final.
    pub fn can_transition_to(self, next: DocumentState) -> bool {
        use DocumentState::*;
        match (self, next) {
            (Created, Uploaded) => true,
            (Uploaded, Queued | Translating | Done | Error) => true,
            (Queued | Translating, Queued | Translating | Done | Error) => true,
            _ => false,
        }
    }

    /// No further transitions possible
    pub fn is_terminal(self) -> bool {
        matches!(self, DocumentState::Done | DocumentState::Error)
    }
}

impl From<&DocumentStatus> for DocumentState {
    fn from(status: &DocumentStatus) -> Self {
        match status.status {
            DocumentStatusCode::Queued => DocumentState::Queued,
            DocumentStatusCode::Translating => DocumentState::Translating,
            DocumentStatusCode::Done => DocumentState::Done,
            DocumentStatusCode::Error => DocumentState::Error,
        }
    }
}
