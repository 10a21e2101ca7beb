//! Основной файл библиотеки dub-sync
//!
//! Библиотека синтезирует дублированную аудиодорожку по переводу и
//! сегментам распознавания речи: итоговая дорожка совпадает по
//! длительности с оригиналом, а тайминги сегментов выдерживаются с
//! точностью до 1%. Поддерживается отслеживание прогресса и
//! кооперативная отмена.

pub mod config;
pub mod error;
pub mod media;
pub mod progress;
pub mod sync;
pub mod transcript;
pub mod tts;

use std::path::{Path, PathBuf};

use log::{info, warn};
use tokio_util::sync::CancellationToken;

use crate::config::DubSyncConfig;
use crate::error::Result;
use crate::progress::{ProgressObserver, ProgressTracker, ProcessStep};
use crate::sync::SynthesisJob;
use crate::transcript::{
    align_segments, all_timestamps_finite, split_proportionally, RecognizerSegment,
};
use crate::tts::{voice_for, AzureTtsClient, SpeechSynthesizer};

/// Запрос на синтез дублированной дорожки
#[derive(Debug, Clone)]
pub struct DubRequest {
    /// Длительность оригинального аудио в секундах
    pub original_duration: f64,
    /// Сегменты распознавания с временными метками
    pub segments: Vec<RecognizerSegment>,
    /// Переведенный текст
    pub translated_text: String,
    /// Код целевого языка (ISO)
    pub language: String,
}

/// Основная структура для работы с библиотекой
pub struct DubSync {
    /// Конфигурация библиотеки
    config: DubSyncConfig,
    /// Трекер прогресса
    progress_tracker: Option<ProgressTracker>,
}

impl DubSync {
    /// Создать новый экземпляр DubSync с указанной конфигурацией
    pub fn new(config: DubSyncConfig) -> Self {
        Self {
            config,
            progress_tracker: None,
        }
    }

    /// Создать новый экземпляр с конфигурацией и наблюдателем прогресса
    pub fn with_progress_observer(
        config: DubSyncConfig,
        observer: Box<dyn ProgressObserver>,
    ) -> Self {
        Self {
            config,
            progress_tracker: Some(ProgressTracker::with_observer(observer)),
        }
    }

    /// Добавить наблюдателя прогресса; возвращает их текущее количество
    pub fn add_observer(&mut self, observer: Box<dyn ProgressObserver>) -> usize {
        self.progress_tracker
            .get_or_insert_with(ProgressTracker::new)
            .add_observer(observer)
    }

    /// Синтезирует дорожку и записывает WAV по указанному пути.
    ///
    /// Синтезатор речи создается из конфигурации.
    pub async fn process(&self, request: &DubRequest, output_path: &Path) -> Result<PathBuf> {
        let synthesizer = AzureTtsClient::new(self.config.tts.clone())?;
        self.process_with_synthesizer(request, &synthesizer, output_path, CancellationToken::new())
            .await
    }

    /// Синтезирует дорожку с внешним синтезатором и токеном отмены.
    ///
    /// Стратегии пробуются по лестнице: временные метки →
    /// пропорциональное разбиение → одиночный синтез. Деградация
    /// происходит на уровне всего задания; частичный дубляж не
    /// выполняется.
    pub async fn process_with_synthesizer(
        &self,
        request: &DubRequest,
        synthesizer: &dyn SpeechSynthesizer,
        output_path: &Path,
        cancel_token: CancellationToken,
    ) -> Result<PathBuf> {
        info!(
            "Запуск синтеза дубляжа: {:.3}s, {} сегментов, язык '{}'",
            request.original_duration,
            request.segments.len(),
            request.language
        );

        let mut job = SynthesisJob::with_cancellation(request.original_duration, cancel_token)?;
        let voice = self
            .config
            .voice_override
            .as_deref()
            .unwrap_or_else(|| voice_for(&request.language));
        let tracker = self.progress_tracker.as_ref();

        let track = self
            .run_strategy_ladder(&mut job, synthesizer, request, voice, tracker)
            .await?;

        // Результат собирается во временной директории задания и затем
        // копируется по пути, указанному вызывающей стороной
        let staging = job.temp_file("dub", "wav");
        media::format::encode_wav(&track, self.config.audio.target_sample_rate, &staging)?;
        tokio::fs::copy(&staging, output_path).await?;

        if !self.config.cleanup_temp_files {
            let kept = job.persist_temp_dir();
            warn!("Временная директория сохранена: {}", kept.display());
        }

        if let Some(t) = tracker {
            t.complete();
        }

        info!("Синтез дубляжа завершен: {}", output_path.display());
        Ok(output_path.to_path_buf())
    }

    /// Лестница стратегий с деградацией на ошибках синтеза
    async fn run_strategy_ladder(
        &self,
        job: &mut SynthesisJob,
        synthesizer: &dyn SpeechSynthesizer,
        request: &DubRequest,
        voice: &str,
        tracker: Option<&ProgressTracker>,
    ) -> Result<Vec<f32>> {
        // Стратегия 1: временные метки, если они пригодны
        let timestamps_usable =
            !request.segments.is_empty() && all_timestamps_finite(&request.segments);

        if timestamps_usable {
            match self
                .try_timestamp_strategy(job, synthesizer, request, voice, tracker)
                .await
            {
                Ok(track) => return Ok(track),
                Err(e) if e.is_degradable() => {
                    warn!("Стратегия по временным меткам не удалась ({}), переходим к пропорциональной", e);
                }
                Err(e) => return Err(e),
            }
        } else {
            warn!("Временные метки отсутствуют или непригодны, пропорциональная стратегия");
        }

        // Стратегия 2: пропорциональное разбиение
        match sync::run_proportional_strategy(
            job,
            synthesizer,
            &request.translated_text,
            voice,
            &self.config,
            tracker,
        )
        .await
        {
            Ok(track) => return Ok(track),
            Err(e) if e.is_degradable() => {
                warn!("Пропорциональная стратегия не удалась ({}), одиночный синтез", e);
            }
            Err(e) => return Err(e),
        }

        // Стратегия 3: одиночный синтез
        sync::run_single_shot_strategy(
            job,
            synthesizer,
            &request.translated_text,
            voice,
            &self.config,
        )
        .await
    }

    /// Разбиение, выравнивание и запуск стратегии по временным меткам.
    ///
    /// Разбиение ведется на число частей, равное числу сегментов
    /// распознавания, что дает попарное выравнивание.
    async fn try_timestamp_strategy(
        &self,
        job: &mut SynthesisJob,
        synthesizer: &dyn SpeechSynthesizer,
        request: &DubRequest,
        voice: &str,
        tracker: Option<&ProgressTracker>,
    ) -> Result<Vec<f32>> {
        if let Some(t) = tracker {
            t.set_step(ProcessStep::TranscriptAlignment);
        }

        let parts = split_proportionally(&request.translated_text, request.segments.len())?;
        let aligned = align_segments(&parts, &request.segments, request.original_duration)?;

        if let Some(t) = tracker {
            t.update_step_progress(100.0, Some(format!("Выровнено {} сегментов", aligned.len())));
        }

        sync::run_timestamp_strategy(job, synthesizer, &aligned, voice, &self.config, tracker).await
    }
}

/// Публичный API для удобного использования
pub async fn synthesize_dub(
    request: &DubRequest,
    output_path: &Path,
    api_key: &str,
) -> Result<PathBuf> {
    let mut config = DubSyncConfig::default();
    config.tts.api_key = api_key.to_string();

    let dub_sync = DubSync::new(config);
    dub_sync.process(request, output_path).await
}

/// Публичный API с поддержкой отслеживания прогресса
pub async fn synthesize_dub_with_progress(
    request: &DubRequest,
    output_path: &Path,
    api_key: &str,
    observer: Box<dyn ProgressObserver>,
) -> Result<PathBuf> {
    let mut config = DubSyncConfig::default();
    config.tts.api_key = api_key.to_string();

    let dub_sync = DubSync::with_progress_observer(config, observer);
    dub_sync.process(request, output_path).await
}
