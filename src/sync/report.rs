//! Структурированные отладочные записи движка.
//!
//! Для каждого сегмента и по завершении задания движок пишет в лог
//! однострочный JSON с метриками синтеза и точности.

use log::{debug, info};
use serde::Serialize;

/// Длина превью текста сегмента в отладочной записи
const PREVIEW_CHARS: usize = 40;

/// Отладочная запись одного сегмента
#[derive(Debug, Clone, Serialize)]
pub struct SegmentReport {
    pub index: usize,
    pub total: usize,
    pub text_preview: String,
    pub target_s: f64,
    pub actual_s: f64,
    pub stretched: bool,
    pub difference_s: f64,
    #[serde(rename = "ttsRate")]
    pub tts_rate: String,
    #[serde(rename = "calibrationPhase")]
    pub calibration_phase: bool,
    #[serde(rename = "silenceBefore_s")]
    pub silence_before_s: f64,
}

impl SegmentReport {
    /// Пишет запись в лог уровня debug
    pub fn emit(&self) {
        debug!(
            "{}",
            serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
        );
    }
}

/// Итоговая запись задания
#[derive(Debug, Clone, Serialize)]
pub struct JobReport {
    #[serde(rename = "originalDuration")]
    pub original_duration: f64,
    #[serde(rename = "finalDuration")]
    pub final_duration: f64,
    pub difference_s: f64,
    #[serde(rename = "differencePercent")]
    pub difference_percent: f64,
    pub segments: usize,
    pub accuracy_percent: f64,
    #[serde(rename = "filesConcatenated")]
    pub files_concatenated: usize,
}

impl JobReport {
    /// Пишет итоговую запись в лог уровня info
    pub fn emit(&self) {
        info!(
            "{}",
            serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
        );
    }
}

/// Усекает текст до превью фиксированной длины
pub fn text_preview(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= PREVIEW_CHARS {
        trimmed.to_string()
    } else {
        let preview: String = trimmed.chars().take(PREVIEW_CHARS).collect();
        format!("{}…", preview)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_truncation() {
        assert_eq!(text_preview("короткий"), "короткий");

        let long = "a".repeat(100);
        let preview = text_preview(&long);
        assert_eq!(preview.chars().count(), PREVIEW_CHARS + 1);
        assert!(preview.ends_with('…'));
    }

    #[test]
    fn test_segment_report_field_names() {
        let report = SegmentReport {
            index: 0,
            total: 1,
            text_preview: "ciao".to_string(),
            target_s: 10.0,
            actual_s: 9.5,
            stretched: true,
            difference_s: 0.5,
            tts_rate: "+0%".to_string(),
            calibration_phase: true,
            silence_before_s: 0.0,
        };

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"ttsRate\":\"+0%\""));
        assert!(json.contains("\"calibrationPhase\":true"));
        assert!(json.contains("\"silenceBefore_s\":0.0"));
        assert!(json.contains("\"target_s\":10.0"));
    }
}
