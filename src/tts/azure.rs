//! # Интеграция с нейронным синтезатором речи
//!
//! Модуль для взаимодействия с REST API синтеза речи (Azure Cognitive
//! Services, нейронные голоса). Запрос - SSML с голосом и скоростью,
//! ответ - поток сжатого аудио.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use log::{error, info, warn};
use reqwest::{header, Client};

use crate::config::TtsApiConfig;
use crate::error::{DubSyncError, Result};
use crate::tts::{AdaptiveRate, SpeechSynthesizer};

/// Клиент REST API синтезатора речи
pub struct AzureTtsClient {
    config: TtsApiConfig,
    client: Client,
    /// Кеш сгенерированных фрагментов: (текст, голос, скорость) -> аудио
    cache: Mutex<HashMap<String, Vec<u8>>>,
}

impl AzureTtsClient {
    /// Создает клиент с таймаутом из конфигурации
    pub fn new(config: TtsApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            config,
            client,
            cache: Mutex::new(HashMap::new()),
        })
    }

    /// Собирает SSML-тело запроса
    fn build_ssml(text: &str, voice: &str, rate: AdaptiveRate) -> String {
        format!(
            "<speak version='1.0' xml:lang='en-US'><voice name='{}'><prosody rate='{}'>{}</prosody></voice></speak>",
            voice,
            rate,
            escape_xml(text)
        )
    }
}

/// Экранирует спецсимволы XML в тексте реплики
fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('\'', "&apos;")
        .replace('"', "&quot;")
}

#[async_trait::async_trait]
impl SpeechSynthesizer for AzureTtsClient {
    async fn synthesize(&self, text: &str, voice: &str, rate: AdaptiveRate) -> Result<Vec<u8>> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(DubSyncError::TtsApi(
                "пустой текст для синтеза".to_string(),
            ));
        }

        let cache_key = format!("{}:{}:{}", trimmed, voice, rate);
        {
            let cache = self.cache.lock().unwrap();
            if let Some(cached) = cache.get(&cache_key) {
                info!("Используем кешированный фрагмент для: '{}'", trimmed);
                return Ok(cached.clone());
            }
        }

        let ssml = Self::build_ssml(trimmed, voice, rate);

        let mut attempts = 0;
        let max_attempts = self.config.max_attempts.max(1);

        loop {
            info!(
                "Запрос синтеза речи: '{}' голосом {} на скорости {} (попытка {}/{})",
                trimmed,
                voice,
                rate,
                attempts + 1,
                max_attempts
            );

            let response = self
                .client
                .post(&self.config.endpoint)
                .header("Ocp-Apim-Subscription-Key", &self.config.api_key)
                .header(header::CONTENT_TYPE, "application/ssml+xml")
                .header("X-Microsoft-OutputFormat", &self.config.output_format)
                .body(ssml.clone())
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();

                    if status.is_success() {
                        let audio_data = resp.bytes().await?.to_vec();

                        if audio_data.is_empty() {
                            return Err(DubSyncError::TtsApi(
                                "синтезатор вернул пустой поток".to_string(),
                            ));
                        }

                        info!("Получен аудио-ответ: {} байт", audio_data.len());

                        let mut cache = self.cache.lock().unwrap();
                        cache.insert(cache_key, audio_data.clone());

                        return Ok(audio_data);
                    }

                    let error_text = resp
                        .text()
                        .await
                        .unwrap_or_else(|_| "не удалось получить текст ошибки".to_string());
                    error!("Ошибка API синтеза (статус {}): {}", status, error_text);

                    if status.as_u16() == 429 || status.as_u16() >= 500 {
                        attempts += 1;
                        if attempts < max_attempts {
                            let wait = Duration::from_secs(2u64.pow(attempts));
                            warn!("Повтор запроса через {} секунд...", wait.as_secs());
                            tokio::time::sleep(wait).await;
                            continue;
                        }
                    }

                    return Err(DubSyncError::TtsApi(format!(
                        "статус {}: {}",
                        status, error_text
                    )));
                }
                Err(e) => {
                    error!("Ошибка HTTP при запросе синтеза: {}", e);

                    attempts += 1;
                    if attempts < max_attempts {
                        let wait = Duration::from_secs(2u64.pow(attempts));
                        warn!("Повтор запроса через {} секунд...", wait.as_secs());
                        tokio::time::sleep(wait).await;
                        continue;
                    }

                    return Err(DubSyncError::Http(e));
                }
            }
        }
    }
}
