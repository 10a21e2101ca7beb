//! # Пропорциональное разбиение перевода
//!
//! Модуль разбивает переведенный текст на заданное число частей,
//! предпочитая лингвистические границы (конец предложения, знаки
//! препинания, пробелы) вблизи идеальной точки разреза.

use crate::error::{DubSyncError, Result};

/// Класс символа-разделителя; классы перечислены в порядке предпочтения
enum BreakClass {
    /// Знак препинания, за которым следует пробел
    PunctSpace(char),
    /// Одиночный пробел
    Space,
    /// Знак препинания без пробела
    Punct(char),
}

/// Порядок предпочтения разделителей: `. `, `! `, `? `, `; `, `, `,
/// пробел, затем те же знаки без пробела
static BREAK_CLASSES: &[BreakClass] = &[
    BreakClass::PunctSpace('.'),
    BreakClass::PunctSpace('!'),
    BreakClass::PunctSpace('?'),
    BreakClass::PunctSpace(';'),
    BreakClass::PunctSpace(','),
    BreakClass::Space,
    BreakClass::Punct('.'),
    BreakClass::Punct('!'),
    BreakClass::Punct('?'),
    BreakClass::Punct(';'),
    BreakClass::Punct(','),
];

/// Разбивает текст на ровно `n` непустых частей.
///
/// Идеальная точка разреза части `i` - `round((i+1)·|T|/n)`; фактический
/// разрез ищется в окне `±0.2·|T|/n` вокруг идеальной точки. Если в окне
/// нет ни одного разделителя, разрез ставится на `cursor + ⌈|T|/n⌉`.
/// Каждый разрез строго продвигает курсор. Недостающие части добиваются
/// строкой `" "`, лишние усекаются.
///
/// # Ошибки
///
/// `DubSyncError::EmptyTarget` - только при `n == 0`. Короткий текст
/// ошибкой не является: возвращаются `n` частей, часть из которых `" "`.
pub fn split_proportionally(text: &str, n: usize) -> Result<Vec<String>> {
    if n == 0 {
        return Err(DubSyncError::EmptyTarget);
    }

    let chars: Vec<char> = text.trim().chars().collect();
    let total = chars.len();

    if total == 0 {
        return Ok(vec![" ".to_string(); n]);
    }
    if n == 1 {
        return Ok(vec![chars.iter().collect()]);
    }

    let chunk = total as f64 / n as f64;
    let window = 0.2 * chunk;

    let mut parts: Vec<String> = Vec::with_capacity(n);
    let mut cursor = 0usize;

    for i in 0..n {
        if cursor >= total {
            break;
        }
        if i == n - 1 {
            parts.push(collect_part(&chars[cursor..total]));
            cursor = total;
            break;
        }

        let ideal = ((i + 1) as f64 * chunk).round();
        let cut = find_break(&chars, cursor, ideal, window)
            .unwrap_or_else(|| (cursor + chunk.ceil() as usize).min(total))
            .clamp(cursor + 1, total);

        parts.push(collect_part(&chars[cursor..cut]));
        cursor = cut;
    }

    while parts.len() < n {
        parts.push(" ".to_string());
    }
    parts.truncate(n);

    Ok(parts)
}

/// Ищет позицию разреза в окне вокруг идеальной точки.
///
/// Позиция разреза `cut` означает, что часть заканчивается на
/// `chars[cut - 1]`. Среди кандидатов одного класса побеждает ближайший
/// к идеальной точке.
fn find_break(chars: &[char], cursor: usize, ideal: f64, window: f64) -> Option<usize> {
    let total = chars.len();
    let lo = ((ideal - window).floor().max((cursor + 1) as f64)) as usize;
    let hi = (((ideal + window).ceil()) as usize).min(total);
    if lo > hi {
        return None;
    }

    for class in BREAK_CLASSES {
        let mut best: Option<(usize, f64)> = None;
        for cut in lo..=hi {
            if !matches_class(chars, cut, class) {
                continue;
            }
            let dist = (cut as f64 - ideal).abs();
            if best.map_or(true, |(_, d)| dist < d) {
                best = Some((cut, dist));
            }
        }
        if let Some((cut, _)) = best {
            return Some(cut);
        }
    }

    None
}

fn matches_class(chars: &[char], cut: usize, class: &BreakClass) -> bool {
    match class {
        BreakClass::PunctSpace(c) => cut >= 2 && chars[cut - 1] == ' ' && chars[cut - 2] == *c,
        BreakClass::Space => cut >= 1 && chars[cut - 1] == ' ',
        BreakClass::Punct(c) => cut >= 1 && chars[cut - 1] == *c,
    }
}

fn collect_part(chars: &[char]) -> String {
    let part: String = chars.iter().collect::<String>().trim().to_string();
    if part.is_empty() {
        " ".to_string()
    } else {
        part
    }
}
