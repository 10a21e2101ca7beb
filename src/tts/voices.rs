//! Таблица соответствия языка и нейронного голоса.
//!
//! Таблица неизменяемая; неизвестный код языка получает английский голос.

use std::collections::HashMap;

use once_cell::sync::Lazy;

/// Голос по умолчанию для неизвестных языков
const DEFAULT_VOICE: &str = "en-US-JennyNeural";

static VOICE_TABLE: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    HashMap::from([
        ("en", "en-US-JennyNeural"),
        ("it", "it-IT-ElsaNeural"),
        ("zh", "zh-CN-XiaoxiaoNeural"),
        ("es", "es-ES-ElviraNeural"),
        ("fr", "fr-FR-DeniseNeural"),
        ("de", "de-DE-KatjaNeural"),
        ("pt", "pt-BR-FranciscaNeural"),
        ("ru", "ru-RU-SvetlanaNeural"),
        ("ja", "ja-JP-NanamiNeural"),
        ("ko", "ko-KR-SunHiNeural"),
        ("ar", "ar-SA-ZariyahNeural"),
        ("hi", "hi-IN-SwaraNeural"),
        ("tr", "tr-TR-EmelNeural"),
        ("pl", "pl-PL-ZofiaNeural"),
        ("nl", "nl-NL-ColetteNeural"),
        ("uk", "uk-UA-PolinaNeural"),
        ("cs", "cs-CZ-VlastaNeural"),
        ("sv", "sv-SE-SofieNeural"),
    ])
});

/// Возвращает идентификатор голоса для кода языка ISO.
pub fn voice_for(language: &str) -> &'static str {
    VOICE_TABLE
        .get(language.to_ascii_lowercase().as_str())
        .copied()
        .unwrap_or(DEFAULT_VOICE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_languages() {
        assert_eq!(voice_for("en"), "en-US-JennyNeural");
        assert_eq!(voice_for("it"), "it-IT-ElsaNeural");
        assert_eq!(voice_for("zh"), "zh-CN-XiaoxiaoNeural");
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        assert_eq!(voice_for("tlh"), "en-US-JennyNeural");
        assert_eq!(voice_for(""), "en-US-JennyNeural");
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(voice_for("IT"), "it-IT-ElsaNeural");
    }
}
