//! Sliding-window NER inference over an injected model backend.
pub mod decode;
pub mod spans;
pub mod window;

use crate::config::NerConfig;
use crate::error::{ChemError, Result};
use crate::services::NerBackend;
use crate::text::{Token, tokenize};
use decode::{LabelSet, argmax_decode, bio_repair, viterbi};
use log::{debug, warn};
use std::sync::Arc;
use window::{merge_windows, sliding_windows};

pub use spans::NerSpan;

/// Orchestrates tokenisation, window partitioning, backend calls, merge,
/// decoding, repair, and span materialisation.
pub struct NerPredictor {
    backend: Arc<dyn NerBackend>,
    config: NerConfig,
    labels: LabelSet,
}

impl NerPredictor {
    pub fn new(backend: Arc<dyn NerBackend>, config: NerConfig) -> Self {
        let labels = LabelSet::new(&config.labels);
        Self {
            backend,
            config,
            labels,
        }
    }

    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// Runs NER over already-normalised text. Spans below the configured
    /// confidence threshold are discarded.
    pub async fn predict(&self, text: &str) -> Result<Vec<NerSpan>> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }
        let windows = sliding_windows(tokens.len(), self.config.max_sequence_length);
        let mut window_rows = Vec::with_capacity(windows.len());
        for w in &windows {
            let rows = self.predict_window(&tokens[w.start..w.end], w.start, w.end).await?;
            window_rows.push(rows);
        }

        let merged = merge_windows(tokens.len(), self.labels.len(), &windows, &window_rows);

        let mut tags = if self.config.use_crf {
            viterbi(&merged.rows, &self.labels)
        } else {
            argmax_decode(&merged.rows)
        };
        bio_repair(&mut tags, &self.labels);

        let token_probs: Vec<f64> = merged
            .rows
            .iter()
            .zip(&tags)
            .map(|(row, &tag)| row.get(tag).copied().unwrap_or(0.0))
            .collect();

        let spans = spans::materialize(text, &tokens, &tags, &token_probs, &self.labels);
        let kept: Vec<NerSpan> = spans
            .into_iter()
            .filter(|s| s.confidence >= self.config.confidence_threshold)
            .collect();
        debug!("NER produced {} spans over {} tokens", kept.len(), tokens.len());
        Ok(kept)
    }

    /// Predicts a batch of texts, `max_batch_size` elements at a time.
    /// Per-item failures are reported in place and never abort the batch.
    pub async fn predict_batch(&self, texts: &[String]) -> Vec<Result<Vec<NerSpan>>> {
        let mut results = Vec::with_capacity(texts.len());
        let chunk_size = self.config.max_batch_size.max(1);
        for chunk in texts.chunks(chunk_size) {
            let chunk_results = futures::future::join_all(chunk.iter().map(|t| self.predict(t)));
            results.extend(chunk_results.await);
        }
        results
    }

    /// One backend call with the per-window timeout and the dimension check.
    async fn predict_window(
        &self,
        tokens: &[Token],
        start: usize,
        end: usize,
    ) -> Result<Vec<Vec<f64>>> {
        let texts: Vec<String> = tokens.iter().map(|t| t.text.clone()).collect();
        let matrix = match tokio::time::timeout(self.config.timeout(), self.backend.predict(&texts))
            .await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!("NER backend timed out for window [{start}, {end})");
                return Err(ChemError::BackendTimeout(self.config.timeout_ms));
            }
        };
        if matrix.rows() != tokens.len() {
            return Err(ChemError::DimensionMismatch {
                rows: matrix.rows(),
                tokens: tokens.len(),
                start,
                end,
            });
        }
        for row in &matrix.emission {
            if row.len() != self.labels.len() {
                return Err(ChemError::BackendError(format!(
                    "emission row has {} columns, label set has {}",
                    row.len(),
                    self.labels.len()
                )));
            }
        }
        Ok(matrix.emission)
    }
}
