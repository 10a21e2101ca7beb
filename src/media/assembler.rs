//! # Сборка дорожки
//!
//! Склейка аудио-артефактов в единую дорожку с треугольным кроссфейдом
//! между соседними парами. Склейка идет слева направо, порядок
//! детерминирован.

use log::{info, warn};

use crate::error::{DubSyncError, Result};
use crate::media::AudioArtifact;

/// Склеивает артефакты в одну дорожку.
///
/// Между каждой соседней парой применяется треугольный кроссфейд
/// указанной длительности; при `crossfade_ms == 0` или единственном
/// артефакте склейка выполняется встык. Все артефакты обязаны иметь
/// частоту `sample_rate`.
///
/// # Ошибки
///
/// `DubSyncError::AudioToolFailed` - при несовпадении частот дискретизации.
pub fn concat_with_crossfade(
    artifacts: &[AudioArtifact],
    crossfade_ms: u32,
    sample_rate: u32,
) -> Result<Vec<f32>> {
    if artifacts.is_empty() {
        return Ok(Vec::new());
    }

    for (i, artifact) in artifacts.iter().enumerate() {
        if artifact.sample_rate != sample_rate {
            return Err(DubSyncError::AudioToolFailed(format!(
                "артефакт #{} имеет частоту {} вместо {}",
                i, artifact.sample_rate, sample_rate
            )));
        }
    }

    let mut combined = artifacts[0].samples.clone();
    for artifact in &artifacts[1..] {
        combined = crossfade_pair(&combined, &artifact.samples, crossfade_ms, sample_rate);
    }

    info!(
        "Склеено {} фрагментов, итоговая длина {} семплов",
        artifacts.len(),
        combined.len()
    );
    Ok(combined)
}

/// Совмещает два фрагмента с треугольным кроссфейдом.
///
/// Если один из фрагментов короче длины кроссфейда, выполняется
/// простая конкатенация.
pub fn crossfade_pair(
    first: &[f32],
    second: &[f32],
    crossfade_ms: u32,
    sample_rate: u32,
) -> Vec<f32> {
    if first.is_empty() {
        return second.to_vec();
    }
    if second.is_empty() {
        return first.to_vec();
    }

    let crossfade_samples = (sample_rate as u64 * crossfade_ms as u64 / 1000) as usize;

    if crossfade_samples == 0
        || first.len() < crossfade_samples
        || second.len() < crossfade_samples
    {
        let mut result = first.to_vec();
        result.extend_from_slice(second);
        return result;
    }

    let result_len = first.len() + second.len() - crossfade_samples;
    let mut result = Vec::with_capacity(result_len);

    result.extend_from_slice(&first[..first.len() - crossfade_samples]);

    for i in 0..crossfade_samples {
        let second_factor = i as f32 / crossfade_samples as f32;
        let first_factor = 1.0 - second_factor;

        let first_idx = first.len() - crossfade_samples + i;
        result.push(first[first_idx] * first_factor + second[i] * second_factor);
    }

    result.extend_from_slice(&second[crossfade_samples..]);

    result
}

/// Нормализует пиковую амплитуду дорожки до целевого уровня.
///
/// Дорожка из одной тишины возвращается без изменений.
pub fn normalize_peak(samples: &[f32], target_peak: f32) -> Vec<f32> {
    if samples.is_empty() {
        return Vec::new();
    }

    let max_amplitude = samples.iter().fold(0.0f32, |a, &b| a.max(b.abs()));

    if max_amplitude <= 0.000_01 {
        warn!(
            "Дорожка практически беззвучна (пик {:.6}), нормализация пропущена",
            max_amplitude
        );
        return samples.to_vec();
    }

    let norm_factor = target_peak / max_amplitude;
    info!(
        "Нормализация пика: max_amplitude={:.6}, целевой уровень={:.6}, коэффициент={:.6}",
        max_amplitude, target_peak, norm_factor
    );

    samples.iter().map(|s| s * norm_factor).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crossfade_pair_length_and_edges() {
        let first = vec![1.0; 1000];
        let second = vec![0.5; 1000];

        // Кроссфейд 100 мс при 1 кГц = 100 семплов
        let result = crossfade_pair(&first, &second, 100, 1000);

        assert_eq!(result.len(), 1900);
        assert!((result[0] - 1.0).abs() < 0.0001);
        assert!((result[1899] - 0.5).abs() < 0.0001);

        // В середине кроссфейда среднее значение
        let crossfade_mid = 1000 - 50;
        assert!((result[crossfade_mid] - 0.75).abs() < 0.0001);
    }

    #[test]
    fn test_short_fragments_are_concatenated() {
        let first = vec![1.0; 10];
        let second = vec![0.5; 10];
        let result = crossfade_pair(&first, &second, 100, 1000);
        assert_eq!(result.len(), 20);
    }

    #[test]
    fn test_single_artifact_untouched() {
        let artifact = AudioArtifact::new(vec![0.3; 500], 44_100);
        let combined = concat_with_crossfade(std::slice::from_ref(&artifact), 10, 44_100).unwrap();
        assert_eq!(combined, artifact.samples);
    }

    #[test]
    fn test_chained_crossfade_total_length() {
        let a = AudioArtifact::new(vec![0.1; 1000], 1000);
        let b = AudioArtifact::new(vec![0.2; 1000], 1000);
        let c = AudioArtifact::new(vec![0.3; 1000], 1000);

        // Два перехода по 10 мс (10 семплов при 1 кГц)
        let combined = concat_with_crossfade(&[a, b, c], 10, 1000).unwrap();
        assert_eq!(combined.len(), 3000 - 2 * 10);
    }

    #[test]
    fn test_zero_crossfade_is_plain_concat() {
        let a = AudioArtifact::new(vec![0.1; 100], 1000);
        let b = AudioArtifact::new(vec![0.2; 100], 1000);
        let combined = concat_with_crossfade(&[a, b], 0, 1000).unwrap();
        assert_eq!(combined.len(), 200);
    }

    #[test]
    fn test_sample_rate_mismatch_is_error() {
        let a = AudioArtifact::new(vec![0.1; 100], 44_100);
        let b = AudioArtifact::new(vec![0.2; 100], 48_000);
        assert!(concat_with_crossfade(&[a, b], 10, 44_100).is_err());
    }

    #[test]
    fn test_normalize_peak() {
        let samples = vec![-0.3, 0.1, 0.5, -0.4, 0.2];
        let normalized = normalize_peak(&samples, 0.9);
        assert!((normalized[2] - 0.9).abs() < 0.0001);
    }

    #[test]
    fn test_normalize_silence_untouched() {
        let samples = vec![0.0; 100];
        let normalized = normalize_peak(&samples, 0.9);
        assert_eq!(normalized, samples);
    }
}
