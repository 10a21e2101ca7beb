//! # Движок синтеза дорожки
//!
//! Центральный модуль: последовательный синтез выровненных сегментов с
//! калибровкой скорости, учет тишины, склейка с кроссфейдом и финальная
//! подгонка длительности. Здесь же живут резервные стратегии -
//! пропорциональная и одиночный синтез.

use std::time::Duration;

use log::{info, warn};

use crate::config::DubSyncConfig;
use crate::error::{DubSyncError, Result};
use crate::media::{self, AudioArtifact};
use crate::progress::{ProcessStep, ProgressTracker};
use crate::transcript::{char_weight, TimedSegment};
use crate::tts::{preprocess_text, AdaptiveRate, RateCalibrator, SpeechSynthesizer};

pub mod job;
pub mod report;

pub use job::SynthesisJob;
pub use report::{JobReport, SegmentReport};

/// Параметры, различающие стратегии синтеза
struct StrategyOptions {
    /// Длительность кроссфейда; 0 - склейка встык
    crossfade_ms: u32,
    /// Допуск финальной подгонки длительности
    trim_tolerance: f64,
    /// Включена ли калибровка скорости
    calibrate: bool,
}

/// Выполняет тяжелую аудио-операцию в блокирующем пуле.
///
/// Все изменения состояния остаются на ведущей задаче; в пул уходят
/// только вычисления над переданными буферами.
async fn run_blocking<T, F>(op: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(op)
        .await
        .map_err(|e| DubSyncError::AudioToolFailed(format!("блокирующая задача: {}", e)))?
}

/// Стратегия по временным меткам: сегменты синтезируются в своих
/// интервалах, паузы заполняются тишиной, склейка с кроссфейдом,
/// подгонка в допуск 1%.
pub async fn run_timestamp_strategy(
    job: &mut SynthesisJob,
    synthesizer: &dyn SpeechSynthesizer,
    segments: &[TimedSegment],
    voice: &str,
    config: &DubSyncConfig,
    tracker: Option<&ProgressTracker>,
) -> Result<Vec<f32>> {
    info!(
        "Стратегия по временным меткам: {} сегментов, цель {:.3}s",
        segments.len(),
        job.original_duration()
    );

    let options = StrategyOptions {
        crossfade_ms: config.audio.crossfade_ms,
        trim_tolerance: config.audio.trim_tolerance,
        calibrate: true,
    };
    synthesize_timed_sequence(job, synthesizer, segments, voice, config, tracker, &options).await
}

/// Пропорциональная стратегия: временные метки игнорируются, перевод
/// делится по предложениям, длительности распределяются по доле
/// символов, склейка встык, допуск 2%.
pub async fn run_proportional_strategy(
    job: &mut SynthesisJob,
    synthesizer: &dyn SpeechSynthesizer,
    translated_text: &str,
    voice: &str,
    config: &DubSyncConfig,
    tracker: Option<&ProgressTracker>,
) -> Result<Vec<f32>> {
    let sentences = split_sentences(translated_text);
    let segments = proportional_segments(&sentences, job.original_duration());
    info!(
        "Пропорциональная стратегия: {} предложений, цель {:.3}s",
        segments.len(),
        job.original_duration()
    );

    let options = StrategyOptions {
        crossfade_ms: 0,
        trim_tolerance: config.audio.proportional_trim_tolerance,
        calibrate: false,
    };
    synthesize_timed_sequence(job, synthesizer, &segments, voice, config, tracker, &options).await
}

/// Одиночный синтез: весь перевод одним запросом на номинальной
/// скорости, без растяжения и подгонки.
pub async fn run_single_shot_strategy(
    job: &mut SynthesisJob,
    synthesizer: &dyn SpeechSynthesizer,
    translated_text: &str,
    voice: &str,
    config: &DubSyncConfig,
) -> Result<Vec<f32>> {
    job.check_cancelled()?;

    let sample_rate = config.audio.target_sample_rate;
    let trimmed = translated_text.trim();
    if trimmed.is_empty() {
        warn!("Пустой перевод при одиночном синтезе, выдаем тишину");
        return Ok(media::format::silence(job.original_duration(), sample_rate));
    }

    info!("Одиночный синтез всего перевода ({} символов)", trimmed.chars().count());

    let text = preprocess_text(trimmed);
    let deadline = Duration::from_secs(config.tts.request_timeout_secs);
    let audio_bytes =
        match tokio::time::timeout(deadline, synthesizer.synthesize(&text, voice, AdaptiveRate::NOMINAL))
            .await
        {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(DubSyncError::synthesis(0, e.to_string())),
            Err(_) => {
                return Err(DubSyncError::synthesis(
                    0,
                    format!("таймаут {} секунд", deadline.as_secs()),
                ))
            }
        };

    let samples = run_blocking(move || {
        let (raw, raw_rate) = media::format::decode_audio_bytes(&audio_bytes)?;
        media::stretch::resample(&raw, raw_rate, sample_rate)
    })
    .await?;
    job.advance_progress();
    Ok(samples)
}

/// Общий цикл синтеза по списку выровненных сегментов.
///
/// Сегменты обрабатываются строго последовательно: калибровка зависит
/// от измерений предыдущих сегментов, а внешний синтезатор ограничен
/// по частоте запросов. Отмена опрашивается между сегментами.
async fn synthesize_timed_sequence(
    job: &mut SynthesisJob,
    synthesizer: &dyn SpeechSynthesizer,
    segments: &[TimedSegment],
    voice: &str,
    config: &DubSyncConfig,
    tracker: Option<&ProgressTracker>,
    options: &StrategyOptions,
) -> Result<Vec<f32>> {
    let sample_rate = config.audio.target_sample_rate;
    let total = segments.len();

    if let Some(t) = tracker {
        t.set_step(ProcessStep::SpeechGeneration);
    }

    let mut calibrator = RateCalibrator::new(total, &config.calibration);
    let mut rate = AdaptiveRate::NOMINAL;
    let mut rate_resolved = false;

    let mut artifacts: Vec<AudioArtifact> = Vec::new();
    let mut budget_s = 0.0f64;
    let mut prev_end_s = 0.0f64;

    for (i, segment) in segments.iter().enumerate() {
        job.check_cancelled()?;

        // Скорость замораживается на границе калибровочной фазы
        if options.calibrate && !rate_resolved && !calibrator.is_calibrating(i) {
            rate = calibrator.resolve();
            rate_resolved = true;
        }

        // Тишина перед сегментом
        let gap = segment.start_s - prev_end_s;
        let mut silence_before_s = 0.0;
        if gap > config.audio.silence_threshold_s {
            artifacts.push(AudioArtifact::silence(gap, sample_rate));
            budget_s += gap;
            silence_before_s = gap;
        }

        let target_s = segment.target_duration();
        let calibration_phase = options.calibrate && calibrator.is_calibrating(i);
        let applied_rate = if calibration_phase {
            AdaptiveRate::NOMINAL
        } else {
            rate
        };

        if segment.text.trim().is_empty() {
            // Интервал без речи: тишина целевой длины
            if target_s > config.audio.silence_threshold_s {
                artifacts.push(AudioArtifact::silence(target_s, sample_rate));
            }
            budget_s += target_s;

            SegmentReport {
                index: i,
                total,
                text_preview: report::text_preview(&segment.text),
                target_s,
                actual_s: target_s,
                stretched: false,
                difference_s: 0.0,
                tts_rate: applied_rate.to_string(),
                calibration_phase,
                silence_before_s,
            }
            .emit();
        } else {
            let text = preprocess_text(&segment.text);
            let deadline = Duration::from_secs(config.tts.request_timeout_secs);
            let audio_bytes = match tokio::time::timeout(
                deadline,
                synthesizer.synthesize(&text, voice, applied_rate),
            )
            .await
            {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(e)) => return Err(DubSyncError::synthesis(i, e.to_string())),
                Err(_) => {
                    return Err(DubSyncError::synthesis(
                        i,
                        format!("таймаут {} секунд", deadline.as_secs()),
                    ))
                }
            };

            // Декодирование, замер и растяжение - вычисления, уходящие
            // в блокирующий пул; ведущая задача ждет результат
            let audio_config = config.audio.clone();
            let (final_samples, actual_s, stretched, difference_s) =
                run_blocking(move || {
                    let (raw, raw_rate) = media::format::decode_audio_bytes(&audio_bytes)?;
                    let samples = media::stretch::resample(&raw, raw_rate, sample_rate)?;
                    let actual_s =
                        media::format::duration_in_seconds(samples.len(), sample_rate);

                    let difference_s = target_s - actual_s;
                    let stretched = difference_s.abs() > audio_config.stretch_threshold_s;
                    let final_samples = if stretched {
                        media::stretch::stretch_to_duration(
                            &samples,
                            sample_rate,
                            target_s,
                            &audio_config,
                        )?
                    } else {
                        samples
                    };
                    Ok((final_samples, actual_s, stretched, difference_s))
                })
                .await?;

            if calibration_phase {
                calibrator.record(target_s, actual_s);
            }

            artifacts.push(AudioArtifact::new(final_samples, sample_rate));
            budget_s += target_s;

            SegmentReport {
                index: i,
                total,
                text_preview: report::text_preview(&segment.text),
                target_s,
                actual_s,
                stretched,
                difference_s,
                tts_rate: applied_rate.to_string(),
                calibration_phase,
                silence_before_s,
            }
            .emit();
        }

        prev_end_s = segment.end_s;
        job.advance_progress();

        if let Some(t) = tracker {
            t.update_step_progress(
                (i + 1) as f32 / total.max(1) as f32 * 100.0,
                Some(format!("Сегмент {}/{}", i + 1, total)),
            );
        }
    }

    // Замыкающая тишина до конца оригинала
    let final_silence = job.original_duration() - prev_end_s;
    if final_silence > config.audio.silence_threshold_s {
        artifacts.push(AudioArtifact::silence(final_silence, sample_rate));
        budget_s += final_silence;
    }

    // Бюджет длительности до растяжений обязан сходиться с оригиналом
    let budget_error = (budget_s - job.original_duration()).abs();
    if budget_error > config.audio.silence_threshold_s {
        warn!(
            "Бюджет длительности расходится с оригиналом на {:.3}s",
            budget_error
        );
    }

    assemble_and_trim(job, artifacts, config, tracker, options, total).await
}

/// Склейка артефактов, финальная подгонка и нормализация
async fn assemble_and_trim(
    job: &SynthesisJob,
    artifacts: Vec<AudioArtifact>,
    config: &DubSyncConfig,
    tracker: Option<&ProgressTracker>,
    options: &StrategyOptions,
    segments: usize,
) -> Result<Vec<f32>> {
    job.check_cancelled()?;

    let sample_rate = config.audio.target_sample_rate;
    let files_concatenated = artifacts.len();

    if let Some(t) = tracker {
        t.set_step(ProcessStep::AudioAssembly);
    }

    let crossfade_ms = options.crossfade_ms;
    let mut track = run_blocking(move || {
        media::assembler::concat_with_crossfade(&artifacts, crossfade_ms, sample_rate)
    })
    .await?;

    if let Some(t) = tracker {
        t.set_step(ProcessStep::FinalTrim);
    }

    let original_duration = job.original_duration();
    let assembled_s = media::format::duration_in_seconds(track.len(), sample_rate);
    let deviation = (assembled_s - original_duration).abs() / original_duration;

    if deviation > options.trim_tolerance {
        info!(
            "Отклонение {:.2}% превышает допуск, глобальная подгонка {:.3}s -> {:.3}s",
            deviation * 100.0,
            assembled_s,
            original_duration
        );
        let audio_config = config.audio.clone();
        track = run_blocking(move || {
            media::stretch::stretch_to_duration(
                &track,
                sample_rate,
                original_duration,
                &audio_config,
            )
        })
        .await?;
    }

    let final_duration = media::format::duration_in_seconds(track.len(), sample_rate);
    let difference_s = final_duration - original_duration;
    let accuracy_percent = 100.0 * (1.0 - difference_s.abs() / original_duration);

    JobReport {
        original_duration,
        final_duration,
        difference_s,
        difference_percent: difference_s.abs() / original_duration * 100.0,
        segments,
        accuracy_percent,
        files_concatenated,
    }
    .emit();

    if let Some(target_peak) = config.audio.target_peak_level {
        track = media::assembler::normalize_peak(&track, target_peak);
    }

    Ok(track)
}

/// Делит текст на предложения по знакам конца предложения и точке с
/// запятой. Пустой текст дает одно предложение-заглушку.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?' | ';') {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        sentences.push(tail.to_string());
    }

    if sentences.is_empty() {
        sentences.push(" ".to_string());
    }
    sentences
}

/// Распределяет длительность оригинала между предложениями
/// пропорционально числу символов; сегменты идут встык от нуля.
fn proportional_segments(sentences: &[String], original_duration: f64) -> Vec<TimedSegment> {
    let total_weight: usize = sentences.iter().map(|s| char_weight(s)).sum();
    let mut segments = Vec::with_capacity(sentences.len());
    let mut cursor_s = 0.0f64;

    for (i, sentence) in sentences.iter().enumerate() {
        let share = original_duration * char_weight(sentence) as f64 / total_weight as f64;
        let end_s = if i == sentences.len() - 1 {
            original_duration
        } else {
            cursor_s + share
        };
        segments.push(TimedSegment {
            text: sentence.clone(),
            start_s: cursor_s,
            end_s,
        });
        cursor_s = end_s;
    }

    segments
}

#[cfg(test)]
mod tests {
    mod test_strategies;

    use super::*;

    #[test]
    fn test_split_sentences() {
        assert_eq!(split_sentences("a. b."), vec!["a.", "b."]);
        assert_eq!(
            split_sentences("Uno! Due? Tre; quattro"),
            vec!["Uno!", "Due?", "Tre;", "quattro"]
        );
        assert_eq!(split_sentences(""), vec![" "]);
        assert_eq!(split_sentences("no punctuation"), vec!["no punctuation"]);
    }

    #[test]
    fn test_proportional_segments_tile_duration() {
        let sentences = vec!["abcd".to_string(), "ef".to_string()];
        let segments = proportional_segments(&sentences, 6.0);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start_s, 0.0);
        assert!((segments[0].end_s - 4.0).abs() < 1e-9);
        assert!((segments[1].start_s - 4.0).abs() < 1e-9);
        assert_eq!(segments[1].end_s, 6.0);
    }
}
