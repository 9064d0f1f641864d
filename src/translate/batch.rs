use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::caption::{parse_caption_file, write_translated};
use crate::config::TranslateConfig;
use crate::error::Result;
use crate::progress::{ProgressEvent, ProgressReporter};
use super::{BatchRequest, TranslationService, SEPARATOR_TOKEN};

/// Batch cap for models with small output windows
const CONSTRAINED_BATCH_SIZE: usize = 25;

/// Translates caption texts in fixed-size batches, one request at a time
pub struct BatchTranslator {
    service: Box<dyn TranslationService>,
    config: TranslateConfig,
}

impl BatchTranslator {
    pub fn new(service: Box<dyn TranslationService>, config: TranslateConfig) -> Self {
        Self { service, config }
    }

    /// Haiku-class models get smaller batches and tighter token limits
    fn is_constrained_model(&self) -> bool {
        self.config.model.to_lowercase().contains("haiku")
    }

    pub fn effective_batch_size(&self) -> usize {
        let size = if self.is_constrained_model() {
            self.config.batch_size.min(CONSTRAINED_BATCH_SIZE)
        } else {
            self.config.batch_size
        };
        size.max(1)
    }

    fn max_tokens_for(&self, item_count: usize) -> u32 {
        let n = item_count as u32;
        if self.is_constrained_model() {
            4096.min(2000 + n * 30)
        } else {
            self.config.max_tokens.min(4000 + n * 50)
        }
    }

    /// Pause between consecutive batches; larger batches wait less, down to half the configured delay
    pub fn inter_batch_delay(&self) -> Duration {
        let base = Duration::from_millis(self.config.rate_limit_delay_ms);
        let factor = (1.0 - self.effective_batch_size() as f64 / 200.0).max(0.5);
        base.mul_f64(factor)
    }

    fn build_request(&self, batch: &[String], target_language: &str) -> BatchRequest {
        BatchRequest {
            text: batch.join(format!("\n{}\n", SEPARATOR_TOKEN).as_str()),
            target_language: target_language.to_string(),
            item_count: batch.len(),
            max_tokens: self.max_tokens_for(batch.len()),
            timeout: Duration::from_secs(self.config.timeout_secs),
        }
    }

    /// Translate `texts`, returning exactly one string per input in the same order.
    ///
    /// A failed batch falls back to its source texts; errors never escape.
    pub async fn translate_texts(
        &self,
        texts: &[String],
        target_language: &str,
        progress: &ProgressReporter,
    ) -> Vec<String> {
        let batch_size = self.effective_batch_size();
        let batches: Vec<&[String]> = texts.chunks(batch_size).collect();
        let total = batches.len();
        let delay = self.inter_batch_delay();

        info!("Translating {} texts to {} in {} batches", texts.len(), target_language, total);

        let mut translated = Vec::with_capacity(texts.len());

        for (idx, batch) in batches.iter().enumerate() {
            progress.report(ProgressEvent::BatchStarted { current: idx + 1, total });

            let request = self.build_request(batch, target_language);
            match self.service.translate_batch(&request).await {
                Ok(response) => translated.extend(reconcile(batch, &response)),
                Err(e) => {
                    error!("Error translating batch {}/{}: {}", idx + 1, total, e);
                    translated.extend(batch.iter().cloned());
                }
            }

            if idx + 1 < total && !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        translated
    }

    /// Translate one caption file, writing `<base>.<code>.vtt` next to it.
    ///
    /// Returns `None` when the file holds nothing to translate.
    pub async fn translate_file<P: AsRef<Path>>(
        &self,
        path: P,
        target_language: &str,
        progress: &ProgressReporter,
    ) -> Result<Option<PathBuf>> {
        let path = path.as_ref();
        let entries = parse_caption_file(path).await?;
        progress.report(ProgressEvent::Parsed {
            path: path.to_path_buf(),
            entries: entries.len(),
        });

        if entries.is_empty() {
            warn!("No caption entries found in {}", path.display());
            return Ok(None);
        }

        let texts: Vec<String> = entries
            .iter()
            .filter(|entry| entry.has_text())
            .map(|entry| entry.text.clone())
            .collect();

        if texts.is_empty() {
            warn!("No caption text to translate in {}", path.display());
            return Ok(None);
        }

        progress.report(ProgressEvent::TranslationStarted { texts: texts.len() });
        let translated = self.translate_texts(&texts, target_language, progress).await;

        let output = write_translated(path, &entries, &translated, target_language).await?;
        progress.report(ProgressEvent::Written { path: output.clone() });

        Ok(Some(output))
    }
}

/// Split a response into exactly `batch.len()` texts, padding with sources or truncating
fn reconcile(batch: &[String], response: &str) -> Vec<String> {
    let mut segments: Vec<String> = response
        .trim()
        .split(SEPARATOR_TOKEN)
        .map(|segment| segment.trim().to_string())
        .collect();

    if segments.len() != batch.len() {
        warn!(
            "Batch translation count mismatch. Expected {}, got {}",
            batch.len(),
            segments.len()
        );
    }

    if segments.len() < batch.len() {
        let missing = batch[segments.len()..].iter().cloned();
        segments.extend(missing);
    }
    segments.truncate(batch.len());
    segments
}
