//! # Транскрипт
//!
//! Модуль для работы с результатами распознавания речи: загрузка сегментов
//! с временными метками, пропорциональное разбиение перевода и выравнивание
//! переведенного текста по сегментам распознавания.

use log::warn;
use serde::Deserialize;

use crate::error::Result;

pub mod aligner;
pub mod splitter;
pub mod timestamp;

pub use aligner::{align_segments, align_segments_with_weight, char_weight, SpanWeightFn};
pub use splitter::split_proportionally;
pub use timestamp::{format_timecode, parse_timecode, TimestampValue};

/// Сегмент речи, возвращенный распознавателем. Времена в секундах.
#[derive(Clone, Debug, PartialEq)]
pub struct RecognizerSegment {
    /// Начальное время в секундах
    pub start_s: f64,
    /// Конечное время в секундах
    pub end_s: f64,
    /// Распознанный текст
    pub text: String,
}

/// Переведенный сегмент с унаследованным временным интервалом
#[derive(Clone, Debug, PartialEq)]
pub struct TimedSegment {
    /// Текст для озвучивания; для интервалов без речи хранится `" "`
    pub text: String,
    /// Начальное время в секундах
    pub start_s: f64,
    /// Конечное время в секундах
    pub end_s: f64,
}

impl TimedSegment {
    /// Целевая длительность сегмента в секундах
    pub fn target_duration(&self) -> f64 {
        self.end_s - self.start_s
    }
}

/// Сегмент распознавания в проводном формате: времена приходят либо
/// числом миллисекунд, либо строкой `HH:MM:SS,mmm` / `HH:MM:SS.mmm`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawRecognizerSegment {
    pub start: TimestampValue,
    pub end: TimestampValue,
    pub text: String,
}

/// Полный результат распознавания речи
#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionResult {
    /// Полный распознанный текст
    pub text: String,
    /// Язык речи (код ISO)
    pub language: String,
    /// Сегменты с временными метками
    pub segments: Vec<RawRecognizerSegment>,
}

impl TranscriptionResult {
    /// Нормализует проводные временные метки в сегменты с секундами.
    ///
    /// # Ошибки
    ///
    /// `DubSyncError::BadTimestamp` - если метка не распознана.
    pub fn into_segments(self) -> Result<Vec<RecognizerSegment>> {
        self.segments
            .into_iter()
            .map(|raw| {
                Ok(RecognizerSegment {
                    start_s: raw.start.to_seconds()?,
                    end_s: raw.end.to_seconds()?,
                    text: raw.text,
                })
            })
            .collect()
    }
}

/// Проверяет, что у всех сегментов конечные числовые границы.
///
/// Стратегия по временным меткам выбирается только при истинном результате.
pub fn all_timestamps_finite(segments: &[RecognizerSegment]) -> bool {
    segments
        .iter()
        .all(|s| s.start_s.is_finite() && s.end_s.is_finite())
}

/// Чинит вырожденные сегменты: при `start_s >= end_s` конец
/// отодвигается на 0.1 секунды от начала.
pub fn repair_degenerate(segments: &mut [RecognizerSegment]) {
    for (i, seg) in segments.iter_mut().enumerate() {
        if seg.start_s >= seg.end_s {
            warn!(
                "Сегмент #{}: вырожденный интервал [{:.3}, {:.3}], конец сдвинут на +0.1s",
                i, seg.start_s, seg.end_s
            );
            seg.end_s = seg.start_s + 0.1;
        }
    }
}
