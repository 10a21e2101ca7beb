//! # Аудиоформаты
//!
//! Модуль для кодирования и декодирования аудио. Сжатый ответ синтезатора
//! декодируется универсальным декодером Symphonia в моно PCM; результат
//! задания кодируется в WAV (16 бит, моно) через hound.
//!
//! ## Основные возможности
//!
//! - Декодирование сжатых аудиоданных (MP3, AAC, WAV) в PCM-семплы
//! - Сведение многоканального аудио в моно
//! - Кодирование PCM в 16-битный WAV
//! - Генерация тишины точной длительности
//! - Замер длительности и RMS

use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use log::{info, warn};
use symphonia::core::audio::{SampleBuffer, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::probe::Hint;

use crate::error::{DubSyncError, Result};

/// Вычисляет длительность аудио в секундах
pub fn duration_in_seconds(sample_count: usize, sample_rate: u32) -> f64 {
    sample_count as f64 / sample_rate as f64
}

/// Генерирует тишину точной длительности
pub fn silence(duration_s: f64, sample_rate: u32) -> Vec<f32> {
    let samples = (duration_s * sample_rate as f64).round().max(0.0) as usize;
    vec![0.0; samples]
}

/// Декодирует сжатые аудиоданные в PCM-семплы.
///
/// Формат определяется пробой Symphonia; многоканальное аудио
/// сводится в моно усреднением каналов.
///
/// # Аргументы
///
/// * `data` - Бинарные данные сжатого аудио (MP3, AAC, WAV)
///
/// # Возвращает
///
/// Кортеж из вектора PCM-семплов (f32) и частоты дискретизации
///
/// # Ошибки
///
/// `DubSyncError::AudioToolFailed` - если формат не распознан, трек не
/// найден или декодер не создан.
pub fn decode_audio_bytes(data: &[u8]) -> Result<(Vec<f32>, u32)> {
    let cursor = std::io::Cursor::new(data.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let format_opts = FormatOptions {
        enable_gapless: false,
        ..Default::default()
    };

    let probed = symphonia::default::get_probe()
        .format(&Hint::new(), mss, &format_opts, &Default::default())
        .map_err(|e| DubSyncError::AudioToolFailed(format!("проба формата: {}", e)))?;

    let mut format = probed.format;
    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| DubSyncError::AudioToolFailed("аудио-трек не найден".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| DubSyncError::AudioToolFailed(format!("создание декодера: {}", e)))?;

    let track_id = track.id;
    let sample_rate = track.codec_params.sample_rate.unwrap_or(44_100);
    let channels = track.codec_params.channels.unwrap_or_default().count();

    let mut pcm_data = Vec::new();

    while let Ok(packet) = format.next_packet() {
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let mut sample_buf =
                    SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
                sample_buf.copy_interleaved_ref(decoded);
                let samples = sample_buf.samples();

                if channels > 1 {
                    for frame in samples.chunks(channels) {
                        let sum: f32 = frame.iter().sum();
                        pcm_data.push(sum / channels as f32);
                    }
                } else {
                    pcm_data.extend_from_slice(samples);
                }
            }
            Err(e) => {
                warn!("Ошибка декодирования пакета: {}", e);
                continue;
            }
        }
    }

    if pcm_data.is_empty() {
        return Err(DubSyncError::AudioToolFailed(
            "декодер не выдал ни одного семпла".to_string(),
        ));
    }

    info!(
        "Декодировано {} семплов с частотой {}",
        pcm_data.len(),
        sample_rate
    );
    Ok((pcm_data, sample_rate))
}

/// Декодирует WAV-файл в PCM-семплы.
///
/// Поддерживаются 16/24/32-битные целочисленные форматы и 32-битный
/// с плавающей точкой; многоканальное аудио сводится в моно.
pub fn decode_wav_file<P: AsRef<Path>>(file_path: P) -> Result<(Vec<f32>, u32)> {
    let mut reader = WavReader::open(file_path.as_ref())?;

    let spec = reader.spec();
    let sample_rate = spec.sample_rate;

    let pcm_data: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / 32768.0))
            .collect::<std::result::Result<Vec<f32>, _>>()?,
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8_388_608.0))
            .collect::<std::result::Result<Vec<f32>, _>>()?,
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 2_147_483_648.0))
            .collect::<std::result::Result<Vec<f32>, _>>()?,
        (SampleFormat::Float, 32) => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()?,
        _ => {
            return Err(DubSyncError::AudioToolFailed(format!(
                "неподдерживаемый формат WAV: {:?}, {} бит",
                spec.sample_format, spec.bits_per_sample
            )));
        }
    };

    let channels = spec.channels as usize;
    if channels > 1 {
        let mut mono = Vec::with_capacity(pcm_data.len() / channels);
        for chunk in pcm_data.chunks(channels) {
            mono.push(chunk.iter().sum::<f32>() / channels as f32);
        }
        Ok((mono, sample_rate))
    } else {
        Ok((pcm_data, sample_rate))
    }
}

/// Кодирует PCM-семплы в WAV-файл (моно, 16 бит).
///
/// Семплы зажимаются в [-1.0, 1.0] перед квантованием.
pub fn encode_wav<P: AsRef<Path>>(pcm_data: &[f32], sample_rate: u32, output_path: P) -> Result<()> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut writer = WavWriter::create(output_path.as_ref(), spec)?;

    for &sample in pcm_data {
        let quantized = (sample.clamp(-1.0, 1.0) * 32767.0).round() as i16;
        writer.write_sample(quantized)?;
    }

    writer.finalize()?;

    info!(
        "Сохранен WAV-файл: {} ({} семплов, {} Гц)",
        output_path.as_ref().display(),
        pcm_data.len(),
        sample_rate
    );
    Ok(())
}

/// Вычисляет среднеквадратичное значение (RMS) для массива семплов
pub fn compute_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}
