//! # Time-stretching
//!
//! Изменение длительности аудио с помощью ресемплера Rubato
//! (Sinc-интерполяция). Экстремальные коэффициенты разбиваются на
//! цепочку звеньев, каждое из которых остается в безопасном диапазоне.

use log::info;
use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};

use crate::config::AudioPipelineConfig;
use crate::error::{DubSyncError, Result};

/// Подгоняет длительность аудио под целевую.
///
/// Если расхождение фактической и целевой длительности не превышает
/// порога (1 мс по умолчанию), буфер возвращается как есть. Иначе
/// применяется цепочка pitch-сохраняющих звеньев; итоговый буфер имеет
/// ровно `round(target_s · sample_rate)` семплов.
///
/// # Ошибки
///
/// `DubSyncError::TimeStretching` - при некорректном коэффициенте или
/// ошибке ресемплера.
pub fn stretch_to_duration(
    input: &[f32],
    sample_rate: u32,
    target_s: f64,
    config: &AudioPipelineConfig,
) -> Result<Vec<f32>> {
    let actual_s = input.len() as f64 / sample_rate as f64;

    if (target_s - actual_s).abs() <= config.stretch_threshold_s {
        return Ok(input.to_vec());
    }

    let target_len = (target_s * sample_rate as f64).round() as usize;
    if input.is_empty() || target_len == 0 {
        return Ok(vec![0.0; target_len]);
    }

    let ratio = target_len as f64 / input.len() as f64;
    if !ratio.is_finite() || ratio <= 0.0 {
        return Err(DubSyncError::TimeStretching(format!(
            "некорректный коэффициент растяжения: {}",
            ratio
        )));
    }

    let links = chain_links(ratio, config.min_stretch_link, config.max_stretch_link);
    if links.len() > 1 {
        info!(
            "Коэффициент {:.3} вне диапазона одного звена, цепочка из {} звеньев",
            ratio,
            links.len()
        );
    }

    let mut current = input.to_vec();
    for link in links {
        current = process_with_rubato(&current, link, sample_rate)?;
    }

    // Гарантируем точное число семплов после цепочки
    current.resize(target_len, 0.0);
    Ok(current)
}

/// Ресемплирует буфер с одной частоты дискретизации на другую
pub fn resample(input: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>> {
    if from_rate == to_rate || input.is_empty() {
        return Ok(input.to_vec());
    }
    let ratio = to_rate as f64 / from_rate as f64;
    process_with_rubato(input, ratio, from_rate)
}

/// Разбивает коэффициент на звенья в пределах `[min_link, max_link]`.
///
/// Произведение звеньев равно исходному коэффициенту; звеньев больше
/// одного только для экстремальных значений.
pub fn chain_links(ratio: f64, min_link: f64, max_link: f64) -> Vec<f64> {
    let mut links = Vec::new();
    let mut remaining = ratio;

    while remaining < min_link {
        links.push(min_link);
        remaining /= min_link;
    }
    while remaining > max_link {
        links.push(max_link);
        remaining /= max_link;
    }
    links.push(remaining);

    links
}

/// Однозвенная обработка через Rubato.
///
/// Вход обрабатывается блоками фиксированного размера; хвост добивается
/// нулями, внутренняя задержка ресемплера компенсируется, выход
/// усечен до `round(len · ratio)` семплов.
fn process_with_rubato(input: &[f32], ratio: f64, sample_rate: u32) -> Result<Vec<f32>> {
    if input.is_empty() {
        return Ok(Vec::new());
    }

    // Размер блока в зависимости от длительности фрагмента
    let duration_s = input.len() as f64 / sample_rate as f64;
    let block_size = if duration_s < 0.1 {
        64
    } else if duration_s < 0.5 {
        128
    } else if duration_s < 2.0 {
        256
    } else {
        512
    };

    let params = SincInterpolationParameters {
        sinc_len: 256,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(ratio, 1.0, params, block_size, 1)
        .map_err(|e| DubSyncError::TimeStretching(format!("инициализация Rubato: {}", e)))?;

    let delay = resampler.output_delay();
    let expected = (input.len() as f64 * ratio).round() as usize;
    let mut output: Vec<f32> = Vec::with_capacity(expected + block_size);

    let mut pos = 0;
    while pos < input.len() {
        let end = (pos + block_size).min(input.len());
        let mut chunk = input[pos..end].to_vec();
        chunk.resize(block_size, 0.0);

        let frames = resampler
            .process(&[chunk], None)
            .map_err(|e| DubSyncError::TimeStretching(format!("ресемплинг: {}", e)))?;
        output.extend_from_slice(&frames[0]);

        pos = end;
    }

    // Компенсируем задержку фильтра: прогоняем тишину, пока не наберем
    // delay + expected семплов
    let mut flush_rounds = 0;
    while output.len() < delay + expected {
        let frames = resampler
            .process(&[vec![0.0f32; block_size]], None)
            .map_err(|e| DubSyncError::TimeStretching(format!("дожим ресемплера: {}", e)))?;
        if frames[0].is_empty() {
            break;
        }
        output.extend_from_slice(&frames[0]);

        flush_rounds += 1;
        if flush_rounds > 1024 {
            return Err(DubSyncError::TimeStretching(
                "ресемплер не выдал ожидаемое число семплов".to_string(),
            ));
        }
    }

    let mut result: Vec<f32> = output.into_iter().skip(delay).take(expected).collect();
    result.resize(expected, 0.0);
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(duration_s: f64, sample_rate: u32) -> Vec<f32> {
        let count = (duration_s * sample_rate as f64).round() as usize;
        (0..count)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 0.5
            })
            .collect()
    }

    #[test]
    fn test_chain_links_within_range_is_single() {
        assert_eq!(chain_links(1.3, 0.5, 2.0), vec![1.3]);
        assert_eq!(chain_links(0.6, 0.5, 2.0), vec![0.6]);
    }

    #[test]
    fn test_chain_links_extreme_ratios() {
        let links = chain_links(0.25, 0.5, 2.0);
        assert_eq!(links.len(), 2);
        let product: f64 = links.iter().product();
        assert!((product - 0.25).abs() < 1e-12);
        assert!(links.iter().all(|&l| (0.5..=2.0).contains(&l)));

        let links = chain_links(5.0, 0.5, 2.0);
        let product: f64 = links.iter().product();
        assert!((product - 5.0).abs() < 1e-12);
        assert!(links.iter().all(|&l| (0.5..=2.0).contains(&l)));
    }

    #[test]
    fn test_no_stretch_within_millisecond() {
        let config = AudioPipelineConfig::default();
        let input = sine(1.0, 44_100);
        // Расхождение 0.5 мс - буфер возвращается без изменений
        let out = stretch_to_duration(&input, 44_100, 1.0005, &config).unwrap();
        assert_eq!(out.len(), input.len());
    }

    #[test]
    fn test_stretch_to_exact_target_length() {
        let config = AudioPipelineConfig::default();
        let input = sine(1.0, 44_100);

        let shorter = stretch_to_duration(&input, 44_100, 0.8, &config).unwrap();
        assert_eq!(shorter.len(), (0.8f64 * 44_100.0).round() as usize);

        let longer = stretch_to_duration(&input, 44_100, 1.5, &config).unwrap();
        assert_eq!(longer.len(), (1.5f64 * 44_100.0).round() as usize);
    }

    #[test]
    fn test_extreme_stretch_is_chained() {
        let config = AudioPipelineConfig::default();
        let input = sine(2.0, 44_100);
        // Сжатие 2.0s -> 0.4s: коэффициент 0.2, вне [0.5, 2.0]
        let out = stretch_to_duration(&input, 44_100, 0.4, &config).unwrap();
        assert_eq!(out.len(), (0.4f64 * 44_100.0).round() as usize);
    }

    #[test]
    fn test_resample_changes_length_proportionally() {
        let input = sine(1.0, 24_000);
        let out = resample(&input, 24_000, 44_100).unwrap();
        assert_eq!(out.len(), 44_100);
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let input = sine(0.5, 44_100);
        let out = resample(&input, 44_100, 44_100).unwrap();
        assert_eq!(out, input);
    }
}
