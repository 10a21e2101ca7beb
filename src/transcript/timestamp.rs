//! # Разбор временных меток
//!
//! Модуль для нормализации временных меток распознавателя. Метки приходят
//! либо числом миллисекунд, либо строкой вида `HH:MM:SS,mmm` или
//! `HH:MM:SS.mmm` и приводятся к секундам (f64).

use serde::Deserialize;

use crate::error::{DubSyncError, Result};

/// Временная метка в проводном формате
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TimestampValue {
    /// Числовая метка в миллисекундах
    Millis(f64),
    /// Строковая метка `HH:MM:SS,mmm` / `HH:MM:SS.mmm`
    Timecode(String),
}

impl TimestampValue {
    /// Нормализует метку в секунды.
    ///
    /// # Ошибки
    ///
    /// `DubSyncError::BadTimestamp` - для нечисловых значений и строк,
    /// не соответствующих формату.
    pub fn to_seconds(&self) -> Result<f64> {
        match self {
            Self::Millis(ms) => {
                if !ms.is_finite() {
                    return Err(DubSyncError::BadTimestamp(format!(
                        "нечисловое значение миллисекунд: {}",
                        ms
                    )));
                }
                Ok(ms / 1000.0)
            }
            Self::Timecode(s) => parse_timecode(s),
        }
    }
}

/// Конвертирует строку `HH:MM:SS,mmm` / `HH:MM:SS.mmm` в секунды.
///
/// Три поля, разделенные двоеточиями; последнее поле делится по `,` или `.`.
/// Отсутствующие миллисекунды считаются нулем, более трех знаков
/// миллисекунд усекаются.
///
/// # Ошибки
///
/// `DubSyncError::BadTimestamp` - если строка не соответствует формату.
pub fn parse_timecode(input: &str) -> Result<f64> {
    let bad = || DubSyncError::BadTimestamp(format!("неверный формат временной метки: '{}'", input));

    let parts: Vec<&str> = input.trim().split(':').collect();
    if parts.len() != 3 {
        return Err(bad());
    }

    let hours: u64 = parts[0].parse().map_err(|_| bad())?;
    let minutes: u64 = parts[1].parse().map_err(|_| bad())?;

    // Последнее поле: секунды и опциональная дробная часть
    let seconds_field = parts[2];
    let (sec_str, ms_str) = match seconds_field.find(|c| c == ',' || c == '.') {
        Some(pos) => (&seconds_field[..pos], Some(&seconds_field[pos + 1..])),
        None => (seconds_field, None),
    };

    let seconds: u64 = sec_str.parse().map_err(|_| bad())?;

    let millis: u64 = match ms_str {
        None => 0,
        Some("") => 0,
        Some(digits) => {
            if !digits.chars().all(|c| c.is_ascii_digit()) {
                return Err(bad());
            }
            // Дробная часть интерпретируется как доли секунды:
            // усечение до трех знаков, добивка нулями справа
            let truncated = if digits.len() > 3 { &digits[..3] } else { digits };
            let parsed: u64 = truncated.parse().map_err(|_| bad())?;
            parsed * 10u64.pow(3 - truncated.len() as u32)
        }
    };

    Ok(hours as f64 * 3600.0 + minutes as f64 * 60.0 + seconds as f64 + millis as f64 / 1000.0)
}

/// Форматирует секунды обратно в строку `HH:MM:SS,mmm`.
pub fn format_timecode(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_s = total_ms / 1000;
    let s = total_s % 60;
    let m = (total_s / 60) % 60;
    let h = total_s / 3600;
    format!("{:02}:{:02}:{:02},{:03}", h, m, s, ms)
}
