//! Multilingual glossaries: one glossary holding dictionaries for several language pairs

use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::core::client::Translator;
use crate::core::errors::{Result, StatusContext, TranslationError};
use crate::core::glossary::{DictionaryEntriesWire, MultilingualGlossaryDictionaryEntries};
use crate::core::language::standardize_language_code;
use crate::core::models::{
    MultilingualGlossaryDictionaryInfo, MultilingualGlossaryInfo, MultilingualGlossaryRef,
};
use crate::core::retry::RequestOptions;

#[derive(Deserialize)]
struct MultilingualGlossaryListWire {
    glossaries: Vec<MultilingualGlossaryInfo>,
}

#[derive(Deserialize)]
struct DictionaryEntriesListWire {
    dictionaries: Vec<DictionaryEntriesWire>,
}

fn check_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TranslationError::validation("glossary name must be a non-empty string"));
    }
    Ok(())
}

fn pair_params(source_lang: &str, target_lang: &str) -> Result<Vec<(String, String)>> {
    Ok(vec![
        ("source_lang".to_string(), standardize_language_code(source_lang)?),
        ("target_lang".to_string(), standardize_language_code(target_lang)?),
    ])
}

impl Translator {
    /// Create a glossary with one dictionary per language pair
    pub async fn create_multilingual_glossary(
        &self,
        name: &str,
        dictionaries: &[MultilingualGlossaryDictionaryEntries],
    ) -> Result<MultilingualGlossaryInfo> {
        check_name(name)?;
        if dictionaries.is_empty() {
            return Err(TranslationError::validation("glossary needs at least one dictionary"));
        }
        let body = json!({
            "name": name,
            "dictionaries": dictionaries.iter().map(|d| d.to_json()).collect::<Vec<_>>(),
        });
        self.post_multilingual_glossary(body).await
    }

    /// Create a glossary with a single dictionary given as CSV, passed through unparsed
    pub async fn create_multilingual_glossary_from_csv(
        &self,
        name: &str,
        source_lang: &str,
        target_lang: &str,
        csv: &str,
    ) -> Result<MultilingualGlossaryInfo> {
        check_name(name)?;
        let body = json!({
            "name": name,
            "dictionaries": [{
                "source_lang": standardize_language_code(source_lang)?,
                "target_lang": standardize_language_code(target_lang)?,
                "entries": csv,
                "entries_format": "csv",
            }],
        });
        self.post_multilingual_glossary(body).await
    }

    async fn post_multilingual_glossary(&self, body: Value) -> Result<MultilingualGlossaryInfo> {
        let response = self
            .send(Method::POST, "/v3/glossaries", RequestOptions::json(body), StatusContext::Glossary)
            .await?;
        response.json()
    }

    /// Rename a glossary and/or merge dictionaries into it.
    ///
    /// Given dictionaries replace entries of the same source term; other
    /// entries and language pairs are kept.
    pub async fn update_multilingual_glossary(
        &self,
        glossary: &MultilingualGlossaryRef,
        name: Option<&str>,
        dictionaries: &[MultilingualGlossaryDictionaryEntries],
    ) -> Result<MultilingualGlossaryInfo> {
        let mut body = Map::new();
        if let Some(name) = name {
            check_name(name)?;
            body.insert("name".to_string(), Value::from(name));
        }
        if !dictionaries.is_empty() {
            let dictionaries = dictionaries.iter().map(|d| d.to_json()).collect();
            body.insert("dictionaries".to_string(), Value::Array(dictionaries));
        }
        if body.is_empty() {
            return Err(TranslationError::validation("nothing to update: give a name or dictionaries"));
        }

        let path = format!("/v3/glossaries/{}", glossary.resolve_id());
        let response = self
            .send(
                Method::PATCH,
                &path,
                RequestOptions::json(Value::Object(body)),
                StatusContext::Glossary,
            )
            .await?;
        response.json()
    }

    /// Replace the dictionary for one language pair, adding it if missing
    pub async fn replace_multilingual_glossary_dictionary(
        &self,
        glossary: &MultilingualGlossaryRef,
        dictionary: &MultilingualGlossaryDictionaryEntries,
    ) -> Result<MultilingualGlossaryDictionaryInfo> {
        let path = format!("/v3/glossaries/{}/dictionaries", glossary.resolve_id());
        let response = self
            .send(
                Method::PUT,
                &path,
                RequestOptions::json(dictionary.to_json()),
                StatusContext::Glossary,
            )
            .await?;
        response.json()
    }

    /// Metadata of one multilingual glossary
    pub async fn get_multilingual_glossary(
        &self,
        glossary: &MultilingualGlossaryRef,
    ) -> Result<MultilingualGlossaryInfo> {
        let path = format!("/v3/glossaries/{}", glossary.resolve_id());
        let response = self
            .send(Method::GET, &path, RequestOptions::default(), StatusContext::Glossary)
            .await?;
        response.json()
    }

    /// All multilingual glossaries of the account
    pub async fn list_multilingual_glossaries(&self) -> Result<Vec<MultilingualGlossaryInfo>> {
        let response = self
            .send(Method::GET, "/v3/glossaries", RequestOptions::default(), StatusContext::Glossary)
            .await?;
        let wire: MultilingualGlossaryListWire = response.json()?;
        Ok(wire.glossaries)
    }

    /// Entries of the dictionary for one language pair
    pub async fn get_multilingual_glossary_entries(
        &self,
        glossary: &MultilingualGlossaryRef,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<Vec<MultilingualGlossaryDictionaryEntries>> {
        let params = pair_params(source_lang, target_lang)?;
        let path = format!("/v3/glossaries/{}/entries", glossary.resolve_id());
        let response = self
            .send(Method::GET, &path, RequestOptions::form(params), StatusContext::Glossary)
            .await?;
        let wire: DictionaryEntriesListWire = response.json()?;
        wire.dictionaries
            .into_iter()
            .map(MultilingualGlossaryDictionaryEntries::from_wire)
            .collect()
    }

    /// Delete a glossary with all its dictionaries
    pub async fn delete_multilingual_glossary(&self, glossary: &MultilingualGlossaryRef) -> Result<()> {
        let path = format!("/v3/glossaries/{}", glossary.resolve_id());
        self.send(Method::DELETE, &path, RequestOptions::default(), StatusContext::Glossary)
            .await?;
        Ok(())
    }

    /// Delete the dictionary for one language pair, keeping the glossary
    pub async fn delete_multilingual_glossary_dictionary(
        &self,
        glossary: &MultilingualGlossaryRef,
        source_lang: &str,
        target_lang: &str,
    ) -> Result<()> {
        let params = pair_params(source_lang, target_lang)?;
        let path = format!("/v3/glossaries/{}/dictionaries", glossary.resolve_id());
        self.send(Method::DELETE, &path, RequestOptions::form(params), StatusContext::Glossary)
            .await?;
        Ok(())
    }
}
