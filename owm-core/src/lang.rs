//! Mapping from POSIX/BCP-47 style locales to OpenWeatherMap `lang` codes.

use std::{env, fmt};

use serde::{Deserialize, Serialize};

/// Language codes accepted by the `lang` query parameter.
const SUPPORTED: &[&str] = &[
    "af", "al", "ar", "az", "bg", "ca", "cz", "da", "de", "el", "en", "eu", "fa", "fi", "fr", "gl",
    "he", "hi", "hr", "hu", "id", "it", "ja", "kr", "la", "lt", "mk", "no", "nl", "pl", "pt",
    "pt_br", "ro", "ru", "sv", "se", "sk", "sl", "sp", "es", "sr", "th", "tr", "ua", "uk", "vi",
    "zh_cn", "zh_tw", "zu",
];

/// A provider language code, e.g. `en`, `pt_br`, `zh_tw`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Language(String);

impl Default for Language {
    fn default() -> Self {
        Language("en".to_string())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Language {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Map a locale such as `pt_BR.UTF-8`, `zh-Hant` or `de` to a provider code.
    ///
    /// Empty or unsupported locales fall back to `en`.
    pub fn from_locale(locale: &str) -> Self {
        // Strip `.UTF-8` and `@euro` style suffixes.
        let base = locale.split(['.', '@']).next().unwrap_or_default().trim();
        let mut parts = base.split(['_', '-']);
        let language = parts.next().unwrap_or_default().to_ascii_lowercase();
        let region = parts.next().unwrap_or_default().to_ascii_lowercase();

        let code = match (language.as_str(), region.as_str()) {
            ("pt", "br") => "pt_br".to_string(),
            ("zh", "" | "cn" | "hans" | "sg") => "zh_cn".to_string(),
            ("zh", "tw" | "hant") => "zh_tw".to_string(),
            ("zh", _) => "zh".to_string(),
            // Codes where the provider departs from ISO 639-1.
            ("cs", _) => "cz".to_string(),
            ("ko", _) => "kr".to_string(),
            ("sq", _) => "al".to_string(),
            ("uk", _) => "ua".to_string(),
            _ => language,
        };

        if SUPPORTED.contains(&code.as_str()) {
            Language(code)
        } else {
            Language::default()
        }
    }

    /// Resolve the language from the process locale (`LC_ALL`, `LC_MESSAGES`, `LANG`).
    pub fn from_env() -> Self {
        ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|value| !value.is_empty() && value != "C" && value != "POSIX")
            .map(|value| Language::from_locale(&value))
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brazilian_portuguese_is_special_cased() {
        assert_eq!(Language::from_locale("pt_BR").as_str(), "pt_br");
        assert_eq!(Language::from_locale("pt-BR").as_str(), "pt_br");
        assert_eq!(Language::from_locale("pt_PT.UTF-8").as_str(), "pt");
    }

    #[test]
    fn chinese_variants() {
        assert_eq!(Language::from_locale("zh").as_str(), "zh_cn");
        assert_eq!(Language::from_locale("zh_CN.UTF-8").as_str(), "zh_cn");
        assert_eq!(Language::from_locale("zh-Hans").as_str(), "zh_cn");
        assert_eq!(Language::from_locale("zh_TW").as_str(), "zh_tw");
        assert_eq!(Language::from_locale("zh-Hant").as_str(), "zh_tw");
    }

    #[test]
    fn empty_or_unknown_falls_back_to_english() {
        assert_eq!(Language::from_locale("").as_str(), "en");
        assert_eq!(Language::from_locale("xx_YY").as_str(), "en");
        assert_eq!(Language::from_locale("zh_HK").as_str(), "en");
    }

    #[test]
    fn plain_language_passes_through() {
        assert_eq!(Language::from_locale("de_DE.UTF-8@euro").as_str(), "de");
        assert_eq!(Language::from_locale("fr").as_str(), "fr");
    }

    #[test]
    fn provider_specific_codes() {
        assert_eq!(Language::from_locale("cs_CZ.UTF-8").as_str(), "cz");
        assert_eq!(Language::from_locale("ko_KR").as_str(), "kr");
        assert_eq!(Language::from_locale("sq_AL").as_str(), "al");
        assert_eq!(Language::from_locale("uk_UA.UTF-8").as_str(), "ua");
    }
}
