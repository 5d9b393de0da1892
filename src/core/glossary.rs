//! Glossary entries and their TSV form

use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::core::errors::{Result, TranslationError};
use crate::core::language::standardize_language_code;

/// Source → target term pairs of a glossary
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GlossaryEntries {
    entries: BTreeMap<String, String>,
}

impl GlossaryEntries {
    /// Validate and wrap a set of term pairs
    pub fn from_entries<I, S, T>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let entries: BTreeMap<String, String> = entries
            .into_iter()
            .map(|(s, t)| (s.into(), t.into()))
            .collect();
        if entries.is_empty() {
            return Err(TranslationError::validation("Input contains no entries"));
        }
        for (source, target) in &entries {
            validate_term(source)?;
            validate_term(target)?;
        }
        Ok(Self { entries })
    }

    /// Parse tab-separated `source<TAB>target` lines; blank lines are skipped
    pub fn from_tsv(tsv: &str) -> Result<Self> {
        let mut entries = BTreeMap::new();
        for (index, line) in tsv.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let line_number = index + 1;

            let terms: Vec<&str> = trimmed.splitn(3, '\t').collect();
            let (source, target) = match terms.as_slice() {
                [source, target] => (*source, *target),
                [_] => {
                    return Err(TranslationError::validation(format!(
                        "Entry on line {} does not contain separator: {}",
                        line_number, line
                    )))
                }
                _ => {
                    return Err(TranslationError::validation(format!(
                        "Entry on line {} contains more than one term separator: {}",
                        line_number, line
                    )))
                }
            };

            validate_term(source)?;
            validate_term(target)?;
            if entries.contains_key(source) {
                return Err(TranslationError::validation(format!(
                    "Entry on line {} duplicates source term \"{}\"",
                    line_number, source
                )));
            }
            entries.insert(source.to_string(), target.to_string());
        }

        if entries.is_empty() {
            return Err(TranslationError::validation("Input contains no entries"));
        }
        Ok(Self { entries })
    }

    /// One `source<TAB>target` line per entry, sorted by source term
    pub fn to_tsv(&self) -> String {
        self.entries
            .iter()
            .map(|(s, t)| format!("{}\t{}", s, t))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Target term for `source`
    pub fn get(&self, source: &str) -> Option<&str> {
        self.entries.get(source).map(String::as_str)
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in source-term order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(s, t)| (s.as_str(), t.as_str()))
    }
}

/// Entries of one language pair inside a multilingual glossary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultilingualGlossaryDictionaryEntries {
    /// Language of the source terms
    pub source_lang: String,
    /// Language of the target terms
    pub target_lang: String,
    /// Validated term pairs
    pub entries: GlossaryEntries,
}

/// Wire shape of one dictionary in a `/v3` entries response
#[derive(Debug, Deserialize)]
pub(crate) struct DictionaryEntriesWire {
    source_lang: String,
    target_lang: String,
    entries: String,
    entries_format: String,
}

impl MultilingualGlossaryDictionaryEntries {
    /// Pair validated entries with standardized language codes
    pub fn new(source_lang: &str, target_lang: &str, entries: GlossaryEntries) -> Result<Self> {
        Ok(Self {
            source_lang: standardize_language_code(source_lang)?,
            target_lang: standardize_language_code(target_lang)?,
            entries,
        })
    }

    /// JSON object sent when creating or replacing a dictionary
    pub fn to_json(&self) -> Value {
        json!({
            "source_lang": self.source_lang,
            "target_lang": self.target_lang,
            "entries": self.entries.to_tsv(),
            "entries_format": "tsv",
        })
    }

    pub(crate) fn from_wire(wire: DictionaryEntriesWire) -> Result<Self> {
        if wire.entries_format != "tsv" {
            return Err(TranslationError::invalid_response(format!(
                "Unsupported entries_format: {}",
                wire.entries_format
            )));
        }
        Ok(Self {
            source_lang: wire.source_lang,
            target_lang: wire.target_lang,
            entries: GlossaryEntries::from_tsv(&wire.entries)?,
        })
    }
}

/// Reject empty terms and terms with control characters or Unicode newlines
pub fn validate_term(term: &str) -> Result<()> {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        return Err(TranslationError::validation(format!(
            "Term \"{}\" contains no non-whitespace characters",
            term
        )));
    }

    if let Some(ch) = trimmed.chars().find(|&ch| {
        let code = ch as u32;
        code <= 31 || (128..=159).contains(&code) || code == 0x2028 || code == 0x2029
    }) {
        return Err(TranslationError::validation(format!(
            "Term \"{}\" contains invalid characters: '{}' (0x{:x})",
            term, ch, ch as u32
        )));
    }
    Ok(())
}
