//! Constrained BIO decoding over emission matrices.
//!
//! The decoder is oblivious to which entity kinds the model was trained on;
//! it reads everything from the configured label list.

/// Score standing in for log(0); low enough that any legal path beats it,
/// finite so arithmetic never produces NaN.
const LOG_ZERO: f64 = -1.0e18;

/// Parsed BIO label list with the legal-transition matrix.
#[derive(Debug, Clone)]
pub struct LabelSet {
    labels: Vec<String>,
    /// `kind[j]` is the entity-kind suffix for `B-`/`I-` labels, `None` for `O`.
    kinds: Vec<Option<String>>,
    inside: Vec<bool>,
    /// `transitions[from][to]`.
    transitions: Vec<Vec<bool>>,
}

impl LabelSet {
    pub fn new(labels: &[String]) -> Self {
        let kinds: Vec<Option<String>> = labels
            .iter()
            .map(|l| {
                l.strip_prefix("B-")
                    .or_else(|| l.strip_prefix("I-"))
                    .map(str::to_string)
            })
            .collect();
        let inside: Vec<bool> = labels.iter().map(|l| l.starts_with("I-")).collect();
        let k = labels.len();
        let mut transitions = vec![vec![true; k]; k];
        for from in 0..k {
            for to in 0..k {
                if inside[to] {
                    // `I-X` may only follow `B-X` or `I-X`.
                    transitions[from][to] =
                        kinds[from].is_some() && kinds[from] == kinds[to];
                }
            }
        }
        Self {
            labels: labels.to_vec(),
            kinds,
            inside,
            transitions,
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn label(&self, j: usize) -> &str {
        &self.labels[j]
    }

    pub fn kind(&self, j: usize) -> Option<&str> {
        self.kinds[j].as_deref()
    }

    pub fn is_inside(&self, j: usize) -> bool {
        self.inside[j]
    }

    pub fn is_begin(&self, j: usize) -> bool {
        self.labels[j].starts_with("B-")
    }

    pub fn is_legal(&self, from: usize, to: usize) -> bool {
        self.transitions[from][to]
    }

    /// Index of the `O` label, falling back to 0 when the list lacks one.
    pub fn outside(&self) -> usize {
        self.labels.iter().position(|l| l == "O").unwrap_or(0)
    }

    /// Index of `B-<kind>` for a given kind.
    pub fn begin_of(&self, kind: &str) -> Option<usize> {
        self.labels.iter().position(|l| {
            l.strip_prefix("B-").is_some_and(|k| k == kind)
        })
    }
}

fn log_prob(p: f64) -> f64 {
    if p > 0.0 { p.ln() } else { LOG_ZERO }
}

/// Viterbi decoding in log-space under the BIO legal-transition mask.
/// `I-*` labels are masked out at `t = 0`.
pub fn viterbi(emissions: &[Vec<f64>], labels: &LabelSet) -> Vec<usize> {
    let t_len = emissions.len();
    let k = labels.len();
    if t_len == 0 || k == 0 {
        return Vec::new();
    }

    let mut dp = vec![vec![LOG_ZERO; k]; t_len];
    let mut back = vec![vec![0usize; k]; t_len];

    for j in 0..k {
        dp[0][j] = if labels.is_inside(j) {
            LOG_ZERO
        } else {
            log_prob(emissions[0][j])
        };
    }

    for t in 1..t_len {
        for j in 0..k {
            let e = log_prob(emissions[t][j]);
            let mut best_score = LOG_ZERO;
            let mut best_prev = labels.outside();
            for prev in 0..k {
                if !labels.is_legal(prev, j) {
                    continue;
                }
                let score = dp[t - 1][prev];
                if score > best_score {
                    best_score = score;
                    best_prev = prev;
                }
            }
            dp[t][j] = if best_score <= LOG_ZERO {
                LOG_ZERO
            } else {
                best_score + e
            };
            back[t][j] = best_prev;
        }
    }

    let mut last = 0;
    let mut best = f64::NEG_INFINITY;
    for j in 0..k {
        if dp[t_len - 1][j] > best {
            best = dp[t_len - 1][j];
            last = j;
        }
    }

    let mut path = vec![0usize; t_len];
    path[t_len - 1] = last;
    for t in (1..t_len).rev() {
        path[t - 1] = back[t][path[t]];
    }
    path
}

/// Independent per-token argmax, used when Viterbi is disabled. The output
/// may violate BIO legality; callers follow up with [`bio_repair`].
pub fn argmax_decode(emissions: &[Vec<f64>]) -> Vec<usize> {
    emissions
        .iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
                .map(|(j, _)| j)
                .unwrap_or(0)
        })
        .collect()
}

/// Single left-to-right pass rewriting illegal `I-X` tags (at position 0, or
/// after `O`, `B-Y`, or `I-Y`) to `B-X`.
pub fn bio_repair(tags: &mut [usize], labels: &LabelSet) {
    for t in 0..tags.len() {
        let j = tags[t];
        if !labels.is_inside(j) {
            continue;
        }
        let legal = t > 0 && labels.is_legal(tags[t - 1], j);
        if !legal {
            if let Some(begin) = labels.kind(j).and_then(|k| labels.begin_of(k)) {
                tags[t] = begin;
            }
        }
    }
}

/// Geometric mean of per-token max probabilities, computed in log-space.
/// Any non-positive probability collapses the whole span to zero.
pub fn span_confidence(probabilities: &[f64]) -> f64 {
    if probabilities.is_empty() {
        return 0.0;
    }
    let mut sum = 0.0;
    for &p in probabilities {
        if p <= 0.0 {
            return 0.0;
        }
        sum += p.ln();
    }
    (sum / probabilities.len() as f64).exp()
}
