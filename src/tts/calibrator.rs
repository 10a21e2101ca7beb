//! # Калибровка скорости синтеза
//!
//! Нейронный синтезатор на номинальной скорости может систематически
//! не попадать в целевые длительности сегментов для конкретной пары
//! язык/голос. Калибратор накапливает измерения первых K сегментов и
//! выводит единое смещение скорости для остатка задания.

use log::{info, warn};

use crate::config::CalibrationConfig;
use crate::tts::AdaptiveRate;

/// Один замер калибровки: целевая и фактическая длительность сегмента
#[derive(Debug, Clone, Copy)]
pub struct CalibrationSample {
    /// Целевая длительность в секундах
    pub target_s: f64,
    /// Фактическая длительность синтезированной речи в секундах
    pub actual_s: f64,
}

/// Калибратор скорости: K = min(max_samples, ⌈fraction·N⌉)
pub struct RateCalibrator {
    samples: Vec<CalibrationSample>,
    budget: usize,
    sigma_gate: f64,
}

impl RateCalibrator {
    /// Создает калибратор для задания из `total_segments` сегментов
    pub fn new(total_segments: usize, config: &CalibrationConfig) -> Self {
        let budget = config
            .max_samples
            .min((config.sample_fraction * total_segments as f64).ceil() as usize);
        Self {
            samples: Vec::with_capacity(budget),
            budget,
            sigma_gate: config.sigma_gate,
        }
    }

    /// Количество сегментов, отведенное под калибровку
    pub fn budget(&self) -> usize {
        self.budget
    }

    /// Находится ли сегмент с данным индексом в фазе калибровки
    pub fn is_calibrating(&self, index: usize) -> bool {
        index < self.budget
    }

    /// Записывает замер калибровочного сегмента
    pub fn record(&mut self, target_s: f64, actual_s: f64) {
        if self.samples.len() < self.budget {
            self.samples.push(CalibrationSample { target_s, actual_s });
        }
    }

    /// Вычисляет смещение скорости по накопленным замерам.
    ///
    /// Отношение больше единицы (речь длиннее цели) означает
    /// «говорить быстрее» - положительный процент. При большом разбросе
    /// отношений корректировка отключается.
    pub fn resolve(&self) -> AdaptiveRate {
        if self.samples.is_empty() {
            return AdaptiveRate::NOMINAL;
        }

        let n = self.samples.len() as f64;
        let mean_target: f64 = self.samples.iter().map(|s| s.target_s).sum::<f64>() / n;
        let mean_actual: f64 = self.samples.iter().map(|s| s.actual_s).sum::<f64>() / n;

        if mean_target <= f64::EPSILON {
            return AdaptiveRate::NOMINAL;
        }

        let ratio = mean_actual / mean_target;

        let ratios: Vec<f64> = self
            .samples
            .iter()
            .filter(|s| s.target_s > f64::EPSILON)
            .map(|s| s.actual_s / s.target_s)
            .collect();
        let sigma = sample_std_dev(&ratios);

        if sigma >= self.sigma_gate {
            warn!(
                "Разброс калибровочных отношений слишком велик (σ = {:.3}), корректировка отключена",
                sigma
            );
            return AdaptiveRate::NOMINAL;
        }

        let rate = AdaptiveRate::from_percent(((ratio - 1.0) * 100.0).round() as i32);
        info!(
            "Калибровка завершена: {} замеров, отношение {:.3}, σ = {:.3}, скорость {}",
            self.samples.len(),
            ratio,
            sigma,
            rate
        );
        rate
    }
}

/// Выборочное стандартное отклонение (n - 1 в знаменателе)
fn sample_std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibrator_with(ratios: &[f64]) -> RateCalibrator {
        let mut calibrator = RateCalibrator::new(100, &CalibrationConfig::default());
        for &ratio in ratios {
            calibrator.record(1.0, ratio);
        }
        calibrator
    }

    #[test]
    fn test_budget_formula() {
        let config = CalibrationConfig::default();
        assert_eq!(RateCalibrator::new(100, &config).budget(), 15);
        assert_eq!(RateCalibrator::new(30, &config).budget(), 6);
        assert_eq!(RateCalibrator::new(3, &config).budget(), 1);
        assert_eq!(RateCalibrator::new(0, &config).budget(), 0);
    }

    #[test]
    fn test_tight_population_yields_offset() {
        // Отношения около 0.804: речь короче цели, замедляемся на 20%
        let calibrator = calibrator_with(&[0.80, 0.82, 0.79, 0.81, 0.80]);
        assert_eq!(calibrator.resolve().percent(), -20);
    }

    #[test]
    fn test_noisy_population_disables_adjustment() {
        let calibrator = calibrator_with(&[0.3, 1.8, 0.4, 2.1, 0.5]);
        assert_eq!(calibrator.resolve(), AdaptiveRate::NOMINAL);
    }

    #[test]
    fn test_offset_clamped_to_hundred() {
        let calibrator = calibrator_with(&[3.1, 3.1, 3.1, 3.1]);
        assert_eq!(calibrator.resolve().percent(), 100);
    }

    #[test]
    fn test_no_samples_is_nominal() {
        let calibrator = RateCalibrator::new(0, &CalibrationConfig::default());
        assert_eq!(calibrator.resolve(), AdaptiveRate::NOMINAL);
    }

    #[test]
    fn test_record_beyond_budget_ignored() {
        let config = CalibrationConfig::default();
        let mut calibrator = RateCalibrator::new(3, &config);
        assert_eq!(calibrator.budget(), 1);
        calibrator.record(1.0, 0.5);
        calibrator.record(1.0, 99.0);
        assert_eq!(calibrator.resolve().percent(), -50);
    }
}
