//! Sliding-window partitioning and per-token merge of window predictions.

/// Half-open token-index range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: usize,
    pub end: usize,
}

impl Window {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Ordered windows covering `[0, n)` with length at most `max_len` and step
/// `max_len / 2` (minimum 1). The last window always ends at `n`.
pub fn sliding_windows(n: usize, max_len: usize) -> Vec<Window> {
    if n == 0 {
        return Vec::new();
    }
    let max_len = max_len.max(1);
    if n <= max_len {
        return vec![Window { start: 0, end: n }];
    }
    let step = (max_len / 2).max(1);
    let mut windows = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + max_len).min(n);
        windows.push(Window { start, end });
        if end == n {
            break;
        }
        start += step;
    }
    windows
}

/// Global per-token predictions assembled from overlapping windows.
#[derive(Debug, Clone)]
pub struct MergedEmissions {
    /// One probability row per token; empty rows never occur for covered
    /// tokens because windows leave no gaps.
    pub rows: Vec<Vec<f64>>,
}

/// Merges per-window emission rows into global arrays. For each token, the
/// window whose row carries the highest max-label probability wins; ties go
/// to the earlier window (first writer wins, strict inequality to replace).
pub fn merge_windows(
    token_count: usize,
    label_count: usize,
    windows: &[Window],
    window_rows: &[Vec<Vec<f64>>],
) -> MergedEmissions {
    let mut rows = vec![vec![0.0; label_count]; token_count];
    let mut best = vec![f64::NEG_INFINITY; token_count];
    for (window, emissions) in windows.iter().zip(window_rows) {
        for (offset, row) in emissions.iter().enumerate() {
            let token = window.start + offset;
            if token >= token_count {
                break;
            }
            let row_max = row.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            if row_max > best[token] {
                best[token] = row_max;
                rows[token] = row.clone();
            }
        }
    }
    MergedEmissions { rows }
}
