//! # Аудио-модуль
//!
//! Работа с аудиоданными: декодирование сжатых форматов, кодирование WAV,
//! генерация тишины, time-stretching и склейка фрагментов с кроссфейдом.
//! Весь конвейер оперирует моно PCM-семплами f32 в памяти.

pub mod assembler;
pub mod format;
pub mod stretch;

pub use assembler::{concat_with_crossfade, normalize_peak};
pub use format::{
    compute_rms, decode_audio_bytes, decode_wav_file, duration_in_seconds, encode_wav, silence,
};
pub use stretch::stretch_to_duration;

/// Аудио-артефакт: PCM-буфер с кешированной частотой дискретизации.
///
/// Принадлежит арене задания; сборщик дорожки берет буферы взаймы.
#[derive(Debug, Clone)]
pub struct AudioArtifact {
    /// Моно PCM-семплы в диапазоне [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Частота дискретизации в Гц
    pub sample_rate: u32,
}

impl AudioArtifact {
    /// Создает артефакт из семплов
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Создает артефакт тишины точной длительности
    pub fn silence(duration_s: f64, sample_rate: u32) -> Self {
        Self {
            samples: format::silence(duration_s, sample_rate),
            sample_rate,
        }
    }

    /// Длительность артефакта в секундах
    pub fn duration_s(&self) -> f64 {
        format::duration_in_seconds(self.samples.len(), self.sample_rate)
    }
}
