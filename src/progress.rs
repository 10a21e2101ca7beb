//! Модуль для отслеживания прогресса задания дубляжа
//!
//! Движок обрабатывает сегменты последовательно на одной ведущей задаче
//! и сообщает прогресс между сегментами. Наблюдатели регистрируются до
//! запуска задания, поэтому трекеру достаточно их списка и одного
//! мьютекса на текущее состояние этапов.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Снимок прогресса задания, рассылаемый наблюдателям
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    /// Название текущего этапа
    pub step: String,
    /// Выполнение текущего этапа (0.0 - 100.0)
    pub step_progress: f32,
    /// Выполнение задания целиком (0.0 - 100.0)
    pub total_progress: f32,
    /// Пояснение к текущему шагу
    pub details: Option<String>,
}

/// Наблюдатель прогресса.
///
/// Уведомления приходят с ведущей задачи движка между сегментами;
/// реализация не должна блокироваться надолго.
pub trait ProgressObserver: Send + Sync {
    /// Вызывается при каждом изменении прогресса
    fn on_progress_update(&self, progress: ProgressInfo);
}

/// Этапы процесса синтеза дубляжа
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProcessStep {
    /// Разбиение перевода и выравнивание по сегментам распознавания
    TranscriptAlignment,
    /// Генерация речи и подгонка длительностей сегментов
    SpeechGeneration,
    /// Склейка фрагментов и тишины в итоговую дорожку
    AudioAssembly,
    /// Финальная подгонка длительности
    FinalTrim,
}

/// Сумма весов всех этапов
const TOTAL_WEIGHT: f32 = 100.0;

impl ProcessStep {
    /// Получить название этапа в виде строки
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TranscriptAlignment => "Выравнивание перевода по сегментам",
            Self::SpeechGeneration => "Генерация речи",
            Self::AudioAssembly => "Склейка аудиодорожки",
            Self::FinalTrim => "Финальная подгонка длительности",
        }
    }

    /// Вес этапа в общем прогрессе; веса в сумме дают [`TOTAL_WEIGHT`]
    pub fn weight(&self) -> f32 {
        match self {
            Self::TranscriptAlignment => 10.0,
            Self::SpeechGeneration => 60.0,
            Self::AudioAssembly => 20.0,
            Self::FinalTrim => 10.0,
        }
    }
}

/// Изменяемое состояние трекера: текущий этап и накопленный вес закрытых
struct TrackerState {
    current_step: ProcessStep,
    step_progress: f32,
    completed_weight: f32,
}

impl TrackerState {
    fn snapshot(&self, details: Option<String>) -> ProgressInfo {
        let total = self.completed_weight + self.current_step.weight() * self.step_progress / 100.0;
        ProgressInfo {
            step: self.current_step.as_str().to_string(),
            step_progress: self.step_progress,
            total_progress: (total / TOTAL_WEIGHT * 100.0).clamp(0.0, 100.0),
            details,
        }
    }
}

/// Трекер прогресса задания.
///
/// Этапы идут вперед и закрываются при переходе к следующему; движок
/// держит трекер по общей ссылке и дергает его между сегментами.
pub struct ProgressTracker {
    /// Наблюдатели; список фиксируется до запуска задания
    observers: Vec<Box<dyn ProgressObserver>>,
    state: Mutex<TrackerState>,
}

impl ProgressTracker {
    /// Создает трекер без наблюдателей
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
            state: Mutex::new(TrackerState {
                current_step: ProcessStep::TranscriptAlignment,
                step_progress: 0.0,
                completed_weight: 0.0,
            }),
        }
    }

    /// Создает трекер с одним наблюдателем
    pub fn with_observer(observer: Box<dyn ProgressObserver>) -> Self {
        let mut tracker = Self::new();
        tracker.add_observer(observer);
        tracker
    }

    /// Добавляет наблюдателя; возвращает их текущее количество
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        self.observers.push(observer);
        self.observers.len()
    }

    /// Переходит к следующему этапу, закрывая текущий
    pub fn set_step(&self, step: ProcessStep) {
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            if state.current_step == step {
                return;
            }
            state.completed_weight += state.current_step.weight();
            state.current_step = step;
            state.step_progress = 0.0;
            state.snapshot(None)
        };
        self.notify(snapshot);
    }

    /// Обновляет выполнение текущего этапа
    pub fn update_step_progress(&self, progress: f32, details: Option<String>) {
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            state.step_progress = progress.clamp(0.0, 100.0);
            state.snapshot(details)
        };
        self.notify(snapshot);
    }

    /// Отмечает завершение всего задания
    pub fn complete(&self) {
        let snapshot = {
            let mut state = self.state.lock().unwrap();
            state.step_progress = 100.0;
            state.completed_weight = TOTAL_WEIGHT - state.current_step.weight();
            state.snapshot(Some("Процесс завершен".to_string()))
        };
        self.notify(snapshot);
    }

    fn notify(&self, progress: ProgressInfo) {
        for observer in &self.observers {
            observer.on_progress_update(progress.clone());
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    struct TestObserver {
        updates: Arc<Mutex<Vec<ProgressInfo>>>,
    }

    impl TestObserver {
        fn new() -> (Self, Arc<Mutex<Vec<ProgressInfo>>>) {
            let updates = Arc::new(Mutex::new(Vec::new()));
            (
                Self {
                    updates: updates.clone(),
                },
                updates,
            )
        }
    }

    impl ProgressObserver for TestObserver {
        fn on_progress_update(&self, progress: ProgressInfo) {
            self.updates.lock().unwrap().push(progress);
        }
    }

    #[test]
    fn test_step_progress_feeds_total() {
        let (observer, updates) = TestObserver::new();
        let tracker = ProgressTracker::with_observer(Box::new(observer));

        tracker.update_step_progress(50.0, Some("половина".to_string()));

        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].step, ProcessStep::TranscriptAlignment.as_str());
        assert_eq!(updates[0].step_progress, 50.0);
        // 50% этапа весом 10 из 100
        assert!((updates[0].total_progress - 5.0).abs() < 0.001);
    }

    #[test]
    fn test_step_transition_closes_previous() {
        let (observer, updates) = TestObserver::new();
        let tracker = ProgressTracker::with_observer(Box::new(observer));

        tracker.set_step(ProcessStep::SpeechGeneration);

        let updates = updates.lock().unwrap();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].step, ProcessStep::SpeechGeneration.as_str());
        assert_eq!(updates[0].step_progress, 0.0);
        // Этап выравнивания закрыт целиком
        assert!((updates[0].total_progress - 10.0).abs() < 0.001);
    }

    #[test]
    fn test_repeated_step_is_silent() {
        let (observer, updates) = TestObserver::new();
        let tracker = ProgressTracker::with_observer(Box::new(observer));

        tracker.set_step(ProcessStep::TranscriptAlignment);
        assert!(updates.lock().unwrap().is_empty());
    }

    #[test]
    fn test_complete_reaches_hundred() {
        let (observer, updates) = TestObserver::new();
        let tracker = ProgressTracker::with_observer(Box::new(observer));

        tracker.set_step(ProcessStep::SpeechGeneration);
        tracker.set_step(ProcessStep::AudioAssembly);
        tracker.set_step(ProcessStep::FinalTrim);
        tracker.complete();

        let updates = updates.lock().unwrap();
        let last = updates.last().unwrap();
        assert_eq!(last.total_progress, 100.0);
        assert_eq!(last.details.as_deref(), Some("Процесс завершен"));
    }

    #[test]
    fn test_multiple_observers_all_notified() {
        let (first, first_updates) = TestObserver::new();
        let (second, second_updates) = TestObserver::new();

        let mut tracker = ProgressTracker::new();
        assert_eq!(tracker.add_observer(Box::new(first)), 1);
        assert_eq!(tracker.add_observer(Box::new(second)), 2);

        tracker.update_step_progress(30.0, None);

        assert_eq!(first_updates.lock().unwrap().len(), 1);
        assert_eq!(second_updates.lock().unwrap().len(), 1);
    }
}
