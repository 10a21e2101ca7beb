//! Модуль обработки ошибок библиотеки dub-sync
//!
//! Этот модуль содержит типы ошибок, которые могут возникнуть при работе движка.

use thiserror::Error;

/// Ошибки библиотеки dub-sync
#[derive(Debug, Error)]
pub enum DubSyncError {
    /// Ошибка HTTP запроса
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Ошибка ввода-вывода
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ошибка сериализации/десериализации JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Ошибка WAV-кодирования
    #[error("WAV encoding error: {0}")]
    WavEncoding(#[from] hound::Error),

    /// Временная метка не распознана при загрузке результатов распознавания
    #[error("Bad timestamp: {0}")]
    BadTimestamp(String),

    /// Распознаватель вернул нечисловые или бесконечные границы сегмента
    #[error("Invalid recognizer timestamps: {0}")]
    InvalidTimestamps(String),

    /// Генерация речи для сегмента не удалась
    #[error("Speech synthesis failed for segment {index}: {reason}")]
    SynthesisFailed { index: usize, reason: String },

    /// Ошибка API синтезатора речи
    #[error("TTS API error: {0}")]
    TtsApi(String),

    /// Ошибка аудио-инструментария (декодирование, ресемплинг, склейка)
    #[error("Audio tool failed: {0}")]
    AudioToolFailed(String),

    /// Ошибка time-stretching
    #[error("Time stretching error: {0}")]
    TimeStretching(String),

    /// Запрошено нулевое или отрицательное число частей при разбиении текста
    #[error("Empty split target: part count must be at least 1")]
    EmptyTarget,

    /// Ошибка конфигурации
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Задание отменено
    #[error("Job cancelled")]
    Cancelled,

    /// Другая ошибка
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

impl DubSyncError {
    /// Создать ошибку синтеза для сегмента с указанным индексом
    pub fn synthesis(index: usize, reason: impl Into<String>) -> Self {
        Self::SynthesisFailed {
            index,
            reason: reason.into(),
        }
    }

    /// Ошибки, при которых задание деградирует на следующую стратегию,
    /// а не завершается целиком
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            Self::InvalidTimestamps(_) | Self::SynthesisFailed { .. }
        )
    }
}

impl From<&str> for DubSyncError {
    fn from(s: &str) -> Self {
        DubSyncError::AudioToolFailed(s.to_string())
    }
}

impl From<String> for DubSyncError {
    fn from(s: String) -> Self {
        DubSyncError::AudioToolFailed(s)
    }
}

/// Тип Result для библиотеки dub-sync
pub type Result<T> = std::result::Result<T, DubSyncError>;
