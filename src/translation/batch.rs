/*!
 * Batch translation processing.
 *
 * Unique segments are grouped into batches (bounded by segment count and
 * characters), translated with bounded concurrency, and returned in input
 * order. A batch whose response never has the right number of lines is split
 * and its segments translated one by one.
 */

use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, warn};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use crate::errors::TranslationError;
use super::core::TranslationService;

/// A failed segment and the error that stopped it
#[derive(Debug)]
pub struct SegmentFailure {
    /// Index of the segment in the input slice
    pub segment: usize,
    /// Underlying error
    pub error: TranslationError,
}

/// Segments sent together in one request
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    /// Indices into the segment list
    pub indices: Vec<usize>,
    /// Whether the segment must be sent alone (it spans several lines)
    pub individual: bool,
}

/// Batch translator for processing segments concurrently
#[derive(Debug, Clone)]
pub struct BatchTranslator {
    /// The translation service to use
    service: TranslationService,

    /// Maximum number of concurrent requests
    max_concurrent_requests: usize,

    /// Maximum segments per request
    batch_size: usize,

    /// Maximum characters per request
    max_chars_per_request: usize,
}

impl BatchTranslator {
    /// Create a new batch translator using the service's configuration
    pub fn new(service: TranslationService) -> Self {
        Self {
            max_concurrent_requests: service.config.optimal_concurrent_requests().max(1),
            batch_size: service.config.common.batch_size.max(1),
            max_chars_per_request: service.config.get_max_chars_per_request().max(1),
            service,
        }
    }

    /// The underlying service
    pub fn service(&self) -> &TranslationService {
        &self.service
    }

    /// Group segments into batches. Multi-line segments go alone; the others
    /// are packed in order up to the size and character limits.
    pub fn plan_batches(&self, segments: &[String], pending: &[usize]) -> Vec<Batch> {
        let mut batches = Vec::new();
        let mut current: Vec<usize> = Vec::new();
        let mut current_chars = 0;

        for &index in pending {
            let text = &segments[index];

            if text.contains('\n') || text.contains('\r') {
                batches.push(Batch { indices: vec![index], individual: true });
                continue;
            }

            let chars = text.chars().count() + 1;
            let full = current.len() >= self.batch_size
                || (!current.is_empty() && current_chars + chars > self.max_chars_per_request);
            if full {
                batches.push(Batch { indices: std::mem::take(&mut current), individual: false });
                current_chars = 0;
            }

            current.push(index);
            current_chars += chars;
        }

        if !current.is_empty() {
            batches.push(Batch { indices: current, individual: false });
        }

        batches
    }

    /// Translate unique, non-blank segments. The result is aligned with the
    /// input. `progress` receives (segments done, total segments).
    pub async fn translate_segments<F>(
        &self,
        segments: &[String],
        source_language: &str,
        target_language: &str,
        progress: F,
    ) -> Result<Vec<String>, SegmentFailure>
    where
        F: Fn(usize, usize) + Clone + Send + Sync,
    {
        let total = segments.len();
        let mut translations = vec![String::new(); total];
        let mut pending = Vec::new();

        for (index, segment) in segments.iter().enumerate() {
            if segment.trim().is_empty() {
                return Err(SegmentFailure { segment: index, error: TranslationError::EmptyInput });
            }
            match self.service.cache.get(segment, source_language, target_language) {
                Some(cached) => translations[index] = cached,
                None => pending.push(index),
            }
        }

        let done = Arc::new(AtomicUsize::new(total - pending.len()));
        progress(done.load(Ordering::SeqCst), total);

        let batches = self.plan_batches(segments, &pending);
        let batch_count = batches.len();
        debug!(
            "Translating {} segments to {} in {} batches ({} cached)",
            pending.len(), target_language, batch_count, total - pending.len()
        );

        let results: Vec<Vec<(usize, String)>> = stream::iter(batches.into_iter().enumerate())
            .map(|(batch_index, batch)| {
                let done = done.clone();
                let progress = progress.clone();

                async move {
                    let start_time = Instant::now();
                    let result = self.translate_batch(segments, &batch, source_language, target_language).await;

                    if result.is_ok() {
                        let current = done.fetch_add(batch.indices.len(), Ordering::SeqCst) + batch.indices.len();
                        progress(current, total);
                        debug!("Batch {}/{} completed in {:?}", batch_index + 1, batch_count, start_time.elapsed());
                    }

                    result
                }
            })
            .buffer_unordered(self.max_concurrent_requests)
            .try_collect()
            .await?;

        for (index, translated) in results.into_iter().flatten() {
            translations[index] = translated;
        }

        Ok(translations)
    }

    async fn translate_batch(
        &self,
        segments: &[String],
        batch: &Batch,
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<(usize, String)>, SegmentFailure> {
        if batch.individual || batch.indices.len() == 1 {
            return self.translate_individually(segments, &batch.indices, source_language, target_language).await;
        }

        let lines: Vec<&str> = batch.indices.iter().map(|&i| segments[i].as_str()).collect();

        match self.service.translate_lines(&lines, source_language, target_language).await {
            Ok(translated) => Ok(batch.indices.iter().copied().zip(translated).collect()),
            Err(TranslationError::CountMismatch { expected, got }) => {
                warn!(
                    "Batch of {} segments kept returning {} lines, translating segments individually",
                    expected, got
                );
                self.translate_individually(segments, &batch.indices, source_language, target_language).await
            }
            Err(error) => Err(SegmentFailure { segment: batch.indices[0], error }),
        }
    }

    async fn translate_individually(
        &self,
        segments: &[String],
        indices: &[usize],
        source_language: &str,
        target_language: &str,
    ) -> Result<Vec<(usize, String)>, SegmentFailure> {
        let mut results = Vec::with_capacity(indices.len());

        for &index in indices {
            let translated = self.service
                .translate_text(&segments[index], source_language, target_language)
                .await
                .map_err(|error| SegmentFailure { segment: index, error })?;
            results.push((index, translated));
        }

        Ok(results)
    }
}
