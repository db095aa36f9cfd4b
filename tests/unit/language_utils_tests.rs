/*!
 * Tests for language utility functions
 */

use csv_translate::language_utils::{
    base_language, get_language_name, language_codes_match, normalize_to_part2t, prompt_language_name,
    validate_language_code, LanguageCodeType,
};

/// Test validation of language codes
#[test]
fn test_validate_language_code_withValidCodes_shouldReturnCorrectType() {
    // ISO 639-1 tests
    assert!(matches!(validate_language_code("en").unwrap(), LanguageCodeType::Part1));
    assert!(matches!(validate_language_code("fr").unwrap(), LanguageCodeType::Part1));
    assert!(matches!(validate_language_code("de").unwrap(), LanguageCodeType::Part1));

    // ISO 639-2/T tests
    assert!(matches!(validate_language_code("eng").unwrap(), LanguageCodeType::Part2T));
    assert!(matches!(validate_language_code("fra").unwrap(), LanguageCodeType::Part2T));

    // ISO 639-2/B tests
    assert!(matches!(validate_language_code("fre").unwrap(), LanguageCodeType::Part2B));
    assert!(matches!(validate_language_code("ger").unwrap(), LanguageCodeType::Part2B));

    // Whitespace and case tests
    assert!(matches!(validate_language_code(" EN ").unwrap(), LanguageCodeType::Part1));

    // Invalid codes, including full locales which must be reduced first
    assert!(validate_language_code("xyz").is_err());
    assert!(validate_language_code("e").is_err());
    assert!(validate_language_code("en-US").is_err());
}

/// Test normalization of language codes to ISO 639-2/T format
#[test]
fn test_normalize_to_part2t_withValidCodes_shouldNormalizeCorrectly() {
    assert_eq!(normalize_to_part2t("en").unwrap(), "eng");
    assert_eq!(normalize_to_part2t("fre").unwrap(), "fra");
    assert_eq!(normalize_to_part2t("ger").unwrap(), "deu");
    assert_eq!(normalize_to_part2t("EN").unwrap(), "eng");
}

/// Test matching of different language code formats
#[test]
fn test_language_codes_match_withMatchingCodes_shouldReturnTrue() {
    assert!(language_codes_match("en", "eng"));
    assert!(language_codes_match("fr", "fre"));
    assert!(language_codes_match("fra", "fre"));

    // Non-matches
    assert!(!language_codes_match("en", "fra"));
    assert!(!language_codes_match("en", "not-a-code"));
}

/// Test stripping regions from locale codes
#[test]
fn test_base_language_withLocale_shouldReturnLanguagePart() {
    assert_eq!(base_language("fr-FR", "-"), "fr");
    assert_eq!(base_language("pt_BR", "_"), "pt");
    assert_eq!(base_language("de", "-"), "de");
}

/// Test retrieval of language names from codes
#[test]
fn test_get_language_name_withValidCodes_shouldReturnCorrectName() {
    assert_eq!(get_language_name("en").unwrap(), "English");
    assert_eq!(get_language_name("fre").unwrap(), "French");
    assert!(get_language_name("xyz").is_err());
}

/// Test language names used in prompts
#[test]
fn test_prompt_language_name_withLocaleAndUnknownCode_shouldFallBack() {
    assert_eq!(prompt_language_name("de-DE", "-"), "German");
    assert_eq!(prompt_language_name("klingon", "-"), "klingon");
}
