//! Language code normalization and validation

use regex::Regex;
use std::sync::OnceLock;

use crate::core::errors::{Result, TranslationError};

fn code_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,4})?$").expect("language code pattern is valid")
    })
}

/// Normalize a language code: lower-case language, upper-case region.
///
/// `"EN-us"` becomes `"en-US"`. Codes that are not of the `xx` / `xx-YY`
/// shape are rejected.
pub fn standardize_language_code(code: &str) -> Result<String> {
    let code = code.trim();
    if !code_pattern().is_match(code) {
        return Err(TranslationError::validation(format!(
            "Invalid language code: \"{}\"",
            code
        )));
    }

    Ok(match code.split_once('-') {
        Some((lang, region)) => format!("{}-{}", lang.to_lowercase(), region.to_uppercase()),
        None => code.to_lowercase(),
    })
}

/// Language part of a code, e.g. `"en"` for `"en-GB"`
pub fn remove_regional_variant(code: &str) -> Result<String> {
    let code = standardize_language_code(code)?;
    Ok(code.split('-').next().unwrap_or_default().to_string())
}

/// Standardize a target language, refusing ambiguous codes the API dropped
pub fn validate_target_language(code: &str) -> Result<String> {
    let code = standardize_language_code(code)?;
    match code.as_str() {
        "en" => Err(TranslationError::validation(
            "targetLang=\"en\" is deprecated, please use \"en-GB\" or \"en-US\" instead.",
        )),
        "pt" => Err(TranslationError::validation(
            "targetLang=\"pt\" is deprecated, please use \"pt-PT\" or \"pt-BR\" instead.",
        )),
        _ => Ok(code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standardize() {
        assert_eq!(standardize_language_code("DE").unwrap(), "de");
        assert_eq!(standardize_language_code("en-us").unwrap(), "en-US");
        assert_eq!(standardize_language_code(" pt-br ").unwrap(), "pt-BR");
        assert_eq!(standardize_language_code("zh-HANS").unwrap(), "zh-HANS");
    }

    #[test]
    fn test_malformed_codes_rejected() {
        for code in ["", "e", "english", "en_US", "en-", "12"] {
            assert!(
                matches!(standardize_language_code(code), Err(TranslationError::Validation { .. })),
                "{} should be rejected",
                code
            );
        }
    }

    #[test]
    fn test_deprecated_targets() {
        assert!(validate_target_language("EN").is_err());
        assert!(validate_target_language("pt").is_err());
        assert_eq!(validate_target_language("en-gb").unwrap(), "en-GB");
    }

    #[test]
    fn test_remove_regional_variant() {
        assert_eq!(remove_regional_variant("EN-GB").unwrap(), "en");
        assert_eq!(remove_regional_variant("ja").unwrap(), "ja");
    }
}
