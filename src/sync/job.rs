//! # Жизненный цикл задания синтеза
//!
//! Задание владеет временной директорией, длительностью оригинала,
//! токеном отмены и монотонным счетчиком прогресса. Временные файлы
//! удаляются при уничтожении задания на любом пути выхода.

use std::path::{Path, PathBuf};

use log::info;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{DubSyncError, Result};

/// Задание синтеза дубляжа
pub struct SynthesisJob {
    /// Временная директория задания; удаляется вместе с заданием
    temp_dir: TempDir,
    /// Длительность оригинального аудио в секундах
    original_duration: f64,
    /// Токен кооперативной отмены
    cancel_token: CancellationToken,
    /// Монотонный счетчик обработанных сегментов
    progress_counter: usize,
}

impl SynthesisJob {
    /// Создает задание с собственным токеном отмены
    pub fn new(original_duration: f64) -> Result<Self> {
        Self::with_cancellation(original_duration, CancellationToken::new())
    }

    /// Создает задание с внешним токеном отмены
    pub fn with_cancellation(
        original_duration: f64,
        cancel_token: CancellationToken,
    ) -> Result<Self> {
        if !original_duration.is_finite() || original_duration <= 0.0 {
            return Err(DubSyncError::Configuration(format!(
                "некорректная длительность оригинала: {}",
                original_duration
            )));
        }

        let temp_dir = tempfile::tempdir()?;
        info!(
            "Задание создано: длительность {:.3}s, временная директория {}",
            original_duration,
            temp_dir.path().display()
        );

        Ok(Self {
            temp_dir,
            original_duration,
            cancel_token,
            progress_counter: 0,
        })
    }

    /// Длительность оригинального аудио в секундах
    pub fn original_duration(&self) -> f64 {
        self.original_duration
    }

    /// Путь к временной директории задания
    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Возвращает путь для нового временного файла с уникальным именем
    pub fn temp_file(&self, prefix: &str, extension: &str) -> PathBuf {
        let file_name = format!("{}_{}.{}", prefix, Uuid::new_v4(), extension);
        self.temp_dir.path().join(file_name)
    }

    /// Проверяет токен отмены; вызывается между сегментами
    pub fn check_cancelled(&self) -> Result<()> {
        if self.cancel_token.is_cancelled() {
            info!("Задание отменено, освобождаем ресурсы");
            return Err(DubSyncError::Cancelled);
        }
        Ok(())
    }

    /// Продвигает счетчик прогресса и возвращает его значение
    pub fn advance_progress(&mut self) -> usize {
        self.progress_counter += 1;
        self.progress_counter
    }

    /// Текущее значение счетчика прогресса
    pub fn progress(&self) -> usize {
        self.progress_counter
    }

    /// Сохраняет временную директорию на диске (для отладки) и
    /// возвращает ее путь
    pub fn persist_temp_dir(self) -> PathBuf {
        self.temp_dir.keep()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_duration() {
        assert!(SynthesisJob::new(0.0).is_err());
        assert!(SynthesisJob::new(-1.0).is_err());
        assert!(SynthesisJob::new(f64::NAN).is_err());
    }

    #[test]
    fn test_temp_dir_removed_on_drop() {
        let job = SynthesisJob::new(10.0).unwrap();
        let path = job.temp_path().to_path_buf();
        assert!(path.exists());
        drop(job);
        assert!(!path.exists());
    }

    #[test]
    fn test_cancellation_polling() {
        let token = CancellationToken::new();
        let job = SynthesisJob::with_cancellation(10.0, token.clone()).unwrap();

        assert!(job.check_cancelled().is_ok());
        token.cancel();
        assert!(matches!(job.check_cancelled(), Err(DubSyncError::Cancelled)));
    }

    #[test]
    fn test_progress_is_monotonic() {
        let mut job = SynthesisJob::new(10.0).unwrap();
        assert_eq!(job.progress(), 0);
        assert_eq!(job.advance_progress(), 1);
        assert_eq!(job.advance_progress(), 2);
    }

    #[test]
    fn test_temp_file_names_are_unique() {
        let job = SynthesisJob::new(10.0).unwrap();
        let a = job.temp_file("seg", "wav");
        let b = job.temp_file("seg", "wav");
        assert_ne!(a, b);
        assert!(a.starts_with(job.temp_path()));
    }
}
