//! # Выравнивание перевода по сегментам распознавания
//!
//! Модуль сопоставляет части переведенного текста с временными
//! интервалами распознавателя. Основной режим - попарное соответствие
//! (число частей равно числу сегментов); два других режима сохраняют
//! результат при расхождении количеств.

use log::warn;

use crate::error::{DubSyncError, Result};
use crate::transcript::{repair_degenerate, RecognizerSegment, TimedSegment};

/// Политика веса сегмента при перераспределении общего интервала
pub type SpanWeightFn = fn(&str) -> usize;

/// Вес по количеству символов - политика по умолчанию
pub fn char_weight(text: &str) -> usize {
    text.chars().count().max(1)
}

/// Выравнивает части перевода по сегментам распознавания с политикой
/// веса по умолчанию (количество символов).
pub fn align_segments(
    parts: &[String],
    recognizer_segments: &[RecognizerSegment],
    original_duration: f64,
) -> Result<Vec<TimedSegment>> {
    align_segments_with_weight(parts, recognizer_segments, original_duration, char_weight)
}

/// Выравнивает части перевода по сегментам распознавания.
///
/// Режимы:
/// - `M == R` - попарное соответствие, часть наследует интервал сегмента;
/// - `M < R` - каждой части достается диапазон сегментов по
///   коэффициенту `M/R`, интервал растягивается от первого до последнего;
/// - `M > R` - несколько частей делят один интервал, затем общий
///   интервал перераспределяется между ними пропорционально весу.
///
/// После выравнивания соседние сегменты не перекрываются, первый
/// начинается не раньше нуля, последний заканчивается не позже
/// `original_duration`.
///
/// # Ошибки
///
/// `DubSyncError::InvalidTimestamps` - если у какого-либо сегмента
/// распознавания нечисловые границы.
pub fn align_segments_with_weight(
    parts: &[String],
    recognizer_segments: &[RecognizerSegment],
    original_duration: f64,
    weight: SpanWeightFn,
) -> Result<Vec<TimedSegment>> {
    for (i, seg) in recognizer_segments.iter().enumerate() {
        if !seg.start_s.is_finite() || !seg.end_s.is_finite() {
            return Err(DubSyncError::InvalidTimestamps(format!(
                "сегмент #{}: границы [{:?}, {:?}]",
                i, seg.start_s, seg.end_s
            )));
        }
    }
    if parts.is_empty() || recognizer_segments.is_empty() {
        return Ok(Vec::new());
    }

    let mut recs = recognizer_segments.to_vec();
    repair_degenerate(&mut recs);

    let m = parts.len();
    let r = recs.len();

    let mut aligned = if m == r {
        parts
            .iter()
            .zip(recs.iter())
            .map(|(part, seg)| TimedSegment {
                text: part.clone(),
                start_s: seg.start_s,
                end_s: seg.end_s,
            })
            .collect()
    } else if m < r {
        align_fewer_parts(parts, &recs)
    } else {
        align_more_parts(parts, &recs, weight)
    };

    finalize(&mut aligned, original_duration);
    Ok(aligned)
}

/// Режим `M < R`: сегменты распознавания группируются по частям перевода,
/// часть получает интервал от первого до последнего сегмента группы.
fn align_fewer_parts(parts: &[String], recs: &[RecognizerSegment]) -> Vec<TimedSegment> {
    let m = parts.len();
    let r = recs.len();
    let ratio = m as f64 / r as f64;

    // Для каждой части - первый и последний из попавших в нее сегментов
    let mut spans: Vec<Option<(f64, f64)>> = vec![None; m];
    for (i, seg) in recs.iter().enumerate() {
        let target = ((i as f64 * ratio).floor() as usize).min(m - 1);
        spans[target] = match spans[target] {
            None => Some((seg.start_s, seg.end_s)),
            Some((first_start, _)) => Some((first_start, seg.end_s)),
        };
    }

    parts
        .iter()
        .zip(spans.iter())
        .filter_map(|(part, span)| {
            span.map(|(start_s, end_s)| TimedSegment {
                text: part.clone(),
                start_s,
                end_s,
            })
        })
        .collect()
}

/// Режим `M > R`: каждая часть получает интервал ближайшего сегмента,
/// после чего группы частей с общим интервалом перераспределяются.
fn align_more_parts(
    parts: &[String],
    recs: &[RecognizerSegment],
    weight: SpanWeightFn,
) -> Vec<TimedSegment> {
    let m = parts.len();
    let r = recs.len();
    let ratio = r as f64 / m as f64;

    let mut aligned: Vec<TimedSegment> = parts
        .iter()
        .enumerate()
        .map(|(i, part)| {
            let j = ((i as f64 * ratio).floor() as usize).min(r - 1);
            TimedSegment {
                text: part.clone(),
                start_s: recs[j].start_s,
                end_s: recs[j].end_s,
            }
        })
        .collect();

    // Перераспределение: группа подряд идущих сегментов с одним и тем же
    // интервалом делит его пропорционально весу текста
    let mut i = 0;
    while i + 1 < aligned.len() {
        if aligned[i + 1].start_s >= aligned[i].end_s {
            i += 1;
            continue;
        }

        let run_start_s = aligned[i].start_s;
        let run_end_s = aligned[i].end_s;
        let mut k = i;
        while k + 1 < aligned.len()
            && aligned[k + 1].start_s == run_start_s
            && aligned[k + 1].end_s == run_end_s
        {
            k += 1;
        }

        let total_weight: usize = aligned[i..=k].iter().map(|s| weight(&s.text)).sum();
        let span = run_end_s - run_start_s;
        let mut cursor_s = run_start_s;
        for seg in aligned[i..=k].iter_mut() {
            let share = span * weight(&seg.text) as f64 / total_weight as f64;
            seg.start_s = cursor_s;
            seg.end_s = cursor_s + share;
            cursor_s += share;
        }
        // Последний сегмент группы закрывает интервал точно
        aligned[k].end_s = run_end_s;

        i = k + 1;
    }

    aligned
}

/// Финальная чистка: зажим границ в `[0, original_duration]`, устранение
/// остаточных перекрытий, предупреждения о больших паузах. Сегменты
/// никогда не отбрасываются.
fn finalize(aligned: &mut [TimedSegment], original_duration: f64) {
    if aligned.is_empty() {
        return;
    }

    if aligned[0].start_s < 0.0 {
        warn!(
            "Первый сегмент начинается в {:.3}s, зажат в 0",
            aligned[0].start_s
        );
        aligned[0].start_s = 0.0;
    }

    let last = aligned.len() - 1;
    if aligned[last].end_s > original_duration {
        warn!(
            "Последний сегмент заканчивается в {:.3}s при длительности {:.3}s, зажат",
            aligned[last].end_s, original_duration
        );
        aligned[last].end_s = original_duration;
        if aligned[last].start_s >= aligned[last].end_s {
            warn!(
                "Последний сегмент вырожден после зажима: [{:.3}, {:.3}]",
                aligned[last].start_s, aligned[last].end_s
            );
        }
    }

    for i in 1..aligned.len() {
        let overlap = aligned[i - 1].end_s - aligned[i].start_s;
        if overlap > 0.0 {
            warn!(
                "Сегменты #{} и #{} перекрываются на {:.3}s, начало сдвинуто",
                i - 1,
                i,
                overlap
            );
            if aligned[i - 1].end_s < aligned[i].end_s {
                aligned[i].start_s = aligned[i - 1].end_s;
            }
        }

        let gap = aligned[i].start_s - aligned[i - 1].end_s;
        if gap > 5.0 {
            warn!("Пауза {:.3}s перед сегментом #{}", gap, i);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(start_s: f64, end_s: f64, text: &str) -> RecognizerSegment {
        RecognizerSegment {
            start_s,
            end_s,
            text: text.to_string(),
        }
    }

    fn parts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_equal_counts_is_identity_on_timings() {
        let recs = vec![rec(0.0, 2.0, "one"), rec(2.5, 4.0, "two")];
        let aligned = align_segments(&parts(&["uno", "due"]), &recs, 10.0).unwrap();

        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned[0].start_s, 0.0);
        assert_eq!(aligned[0].end_s, 2.0);
        assert_eq!(aligned[0].text, "uno");
        assert_eq!(aligned[1].start_s, 2.5);
        assert_eq!(aligned[1].end_s, 4.0);
    }

    #[test]
    fn test_nan_bounds_rejected() {
        let recs = vec![rec(f64::NAN, 2.0, "x")];
        let result = align_segments(&parts(&["a"]), &recs, 10.0);
        assert!(matches!(result, Err(DubSyncError::InvalidTimestamps(_))));
    }

    #[test]
    fn test_degenerate_interval_repaired() {
        let recs = vec![rec(5.0, 4.0, "invalid")];
        let aligned = align_segments(&parts(&["testo"]), &recs, 10.0).unwrap();

        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned[0].start_s, 5.0);
        assert!((aligned[0].end_s - 5.1).abs() < 1e-9);
    }

    #[test]
    fn test_fewer_parts_span_their_groups() {
        // 2 части на 4 сегмента: каждой достается пара подряд идущих
        let recs = vec![
            rec(0.0, 1.0, "a"),
            rec(1.0, 2.0, "b"),
            rec(2.0, 3.0, "c"),
            rec(3.0, 4.0, "d"),
        ];
        let aligned = align_segments(&parts(&["uno", "due"]), &recs, 10.0).unwrap();

        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned[0].start_s, 0.0);
        assert_eq!(aligned[0].end_s, 2.0);
        assert_eq!(aligned[1].start_s, 2.0);
        assert_eq!(aligned[1].end_s, 4.0);
    }

    #[test]
    fn test_more_parts_redistributed_by_char_length() {
        // 2 части на 1 сегмент: интервал [0, 6] делится 2:1 по длине текста
        let recs = vec![rec(0.0, 6.0, "source")];
        let aligned = align_segments(&parts(&["abcd", "ef"]), &recs, 10.0).unwrap();

        assert_eq!(aligned.len(), 2);
        assert_eq!(aligned[0].start_s, 0.0);
        assert!((aligned[0].end_s - 4.0).abs() < 1e-9);
        assert!((aligned[1].start_s - 4.0).abs() < 1e-9);
        assert_eq!(aligned[1].end_s, 6.0);
    }

    #[test]
    fn test_no_overlaps_after_alignment() {
        let recs = vec![rec(0.0, 3.0, "a"), rec(2.0, 5.0, "b"), rec(5.0, 8.0, "c")];
        let aligned = align_segments(&parts(&["x", "y", "z"]), &recs, 10.0).unwrap();

        for i in 1..aligned.len() {
            assert!(
                aligned[i].start_s >= aligned[i - 1].end_s,
                "перекрытие между #{} и #{}",
                i - 1,
                i
            );
        }
    }

    #[test]
    fn test_last_segment_clamped_to_original_duration() {
        let recs = vec![rec(0.0, 5.0, "a"), rec(5.0, 12.0, "b")];
        let aligned = align_segments(&parts(&["x", "y"]), &recs, 10.0).unwrap();

        assert_eq!(aligned.last().unwrap().end_s, 10.0);
    }

    #[test]
    fn test_empty_inputs_yield_empty_alignment() {
        let aligned = align_segments(&[], &[], 10.0).unwrap();
        assert!(aligned.is_empty());
    }
}
