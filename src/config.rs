//! Модуль конфигурации библиотеки dub-sync
//!
//! Этот модуль содержит структуры для настройки движка синтеза дубляжа.

use serde::{Deserialize, Serialize};

/// Конфигурация HTTP-клиента нейронного синтезатора речи
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TtsApiConfig {
    /// Базовый URL REST-эндпоинта синтеза
    pub endpoint: String,
    /// API ключ
    pub api_key: String,
    /// Формат аудио, запрашиваемый у синтезатора
    pub output_format: String,
    /// Таймаут одного запроса в секундах
    pub request_timeout_secs: u64,
    /// Максимальное количество попыток запроса
    pub max_attempts: u32,
}

impl Default for TtsApiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://eastus.tts.speech.microsoft.com/cognitiveservices/v1".to_string(),
            api_key: String::new(),
            output_format: "audio-24khz-48kbitrate-mono-mp3".to_string(),
            request_timeout_secs: 30,
            max_attempts: 3,
        }
    }
}

/// Конфигурация аудио-конвейера
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioPipelineConfig {
    /// Частота дискретизации, к которой приводятся все буферы перед склейкой
    pub target_sample_rate: u32,
    /// Длительность кроссфейда между соседними фрагментами в миллисекундах
    pub crossfade_ms: u32,
    /// Минимальная длительность тишины, которая попадает в выходной поток, в секундах
    pub silence_threshold_s: f64,
    /// Порог расхождения длительностей, ниже которого stretch не применяется, в секундах
    pub stretch_threshold_s: f64,
    /// Нижняя граница одного звена time-stretch
    pub min_stretch_link: f64,
    /// Верхняя граница одного звена time-stretch
    pub max_stretch_link: f64,
    /// Допуск финальной подгонки длительности для стратегии по временным меткам
    pub trim_tolerance: f64,
    /// Допуск финальной подгонки для пропорциональной стратегии
    pub proportional_trim_tolerance: f64,
    /// Целевой пиковый уровень финальной нормализации; `None` отключает нормализацию
    pub target_peak_level: Option<f32>,
}

impl Default for AudioPipelineConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 44_100,
            crossfade_ms: 10,
            silence_threshold_s: 0.02,
            stretch_threshold_s: 0.001,
            min_stretch_link: 0.5,
            max_stretch_link: 2.0,
            trim_tolerance: 0.01,
            proportional_trim_tolerance: 0.02,
            target_peak_level: Some(0.8),
        }
    }
}

/// Конфигурация калибровки скорости синтеза
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationConfig {
    /// Максимальное количество калибровочных сегментов
    pub max_samples: usize,
    /// Доля сегментов задания, отводимая под калибровку
    pub sample_fraction: f64,
    /// Порог стандартного отклонения, при котором корректировка отключается
    pub sigma_gate: f64,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            max_samples: 15,
            sample_fraction: 0.20,
            sigma_gate: 0.3,
        }
    }
}

/// Конфигурация библиотеки
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DubSyncConfig {
    /// Настройки синтезатора речи
    pub tts: TtsApiConfig,
    /// Настройки аудио-конвейера
    pub audio: AudioPipelineConfig,
    /// Настройки калибровки
    pub calibration: CalibrationConfig,
    /// Явный идентификатор голоса; `None` - выбор по языку из таблицы голосов
    pub voice_override: Option<String>,
    /// Удалять временные файлы после завершения
    pub cleanup_temp_files: bool,
}

impl Default for DubSyncConfig {
    fn default() -> Self {
        Self {
            tts: TtsApiConfig::default(),
            audio: AudioPipelineConfig::default(),
            calibration: CalibrationConfig::default(),
            voice_override: None,
            cleanup_temp_files: true,
        }
    }
}
