//! # TTS (Text-to-Speech) модуль
//!
//! Модуль для генерации речи из переведенного текста. Включает в себя
//! интеграцию с REST API нейронного синтезатора, таблицу голосов,
//! адаптивную скорость речи и калибровку.

use std::fmt;

use crate::error::Result;

pub mod azure;
pub mod calibrator;
pub mod voices;

pub use azure::AzureTtsClient;
pub use calibrator::{CalibrationSample, RateCalibrator};
pub use voices::voice_for;

/// Смещение скорости синтеза в процентах, всегда в диапазоне [-100, +100].
///
/// Передается синтезатору в виде строки `"+N%"` / `"-N%"`; `+0%` -
/// номинальная скорость.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdaptiveRate(i32);

impl AdaptiveRate {
    /// Номинальная скорость
    pub const NOMINAL: Self = Self(0);

    /// Создает скорость из процентов с зажимом в [-100, +100]
    pub fn from_percent(percent: i32) -> Self {
        Self(percent.clamp(-100, 100))
    }

    /// Значение в процентах
    pub fn percent(&self) -> i32 {
        self.0
    }
}

impl Default for AdaptiveRate {
    fn default() -> Self {
        Self::NOMINAL
    }
}

impl fmt::Display for AdaptiveRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 < 0 {
            write!(f, "{}%", self.0)
        } else {
            write!(f, "+{}%", self.0)
        }
    }
}

/// Трейт синтезатора речи: возможность, от которой зависит движок
#[async_trait::async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Генерирует речь для текста указанным голосом и скоростью.
    ///
    /// Возвращает поток сжатого аудио (обычно MP3); движок декодирует
    /// его в PCM средствами аудио-модуля.
    async fn synthesize(&self, text: &str, voice: &str, rate: AdaptiveRate) -> Result<Vec<u8>>;
}

/// Предобрабатывает текст перед отправкой в синтезатор:
/// многоточия, дублирующиеся пробелы, переводы строк, завершающий знак.
pub fn preprocess_text(text: &str) -> String {
    let mut result = text.trim().to_string();

    result = result.replace("...", ". ");
    result = result.replace('\n', " ");

    while result.contains("  ") {
        result = result.replace("  ", " ");
    }

    if !result.is_empty() && !".!?".contains(result.chars().last().unwrap()) {
        result.push('.');
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_formatting() {
        assert_eq!(AdaptiveRate::NOMINAL.to_string(), "+0%");
        assert_eq!(AdaptiveRate::from_percent(12).to_string(), "+12%");
        assert_eq!(AdaptiveRate::from_percent(-20).to_string(), "-20%");
    }

    #[test]
    fn test_rate_clamped() {
        assert_eq!(AdaptiveRate::from_percent(250).percent(), 100);
        assert_eq!(AdaptiveRate::from_percent(-250).percent(), -100);
    }

    #[test]
    fn test_preprocess_text() {
        assert_eq!(preprocess_text("Hello  world"), "Hello world.");
        assert_eq!(preprocess_text("Hello world!"), "Hello world!");
        assert_eq!(preprocess_text("Line 1\nLine 2"), "Line 1 Line 2.");
        assert_eq!(preprocess_text("Text with...ellipsis"), "Text with. ellipsis.");
    }
}
