//! Materialises decoded tag sequences into typed spans.
use super::decode::{LabelSet, span_confidence};
use crate::text::Token;
use crate::types::EntityType;
use log::debug;

/// A typed span produced by the NER stage, with character offsets into the
/// normalised text.
#[derive(Debug, Clone, PartialEq)]
pub struct NerSpan {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub entity_type: EntityType,
    pub confidence: f64,
}

/// Scans tags left to right: `B-X` opens a span, following `I-X` tokens
/// extend it, anything else closes it. Span text is the normalised-text
/// slice between the first token's start and the last token's end, so the
/// offset invariant holds by construction. Confidence is the geometric mean
/// of the member tokens' max probabilities.
pub fn materialize(
    text: &str,
    tokens: &[Token],
    tags: &[usize],
    token_probs: &[f64],
    labels: &LabelSet,
) -> Vec<NerSpan> {
    debug_assert_eq!(tokens.len(), tags.len());
    let mut spans = Vec::new();
    let mut open: Option<(usize, usize)> = None; // (first token, last token)

    let mut close = |open: &mut Option<(usize, usize)>, spans: &mut Vec<NerSpan>, kind: &str| {
        if let Some((first, last)) = open.take() {
            let Some(entity_type) = EntityType::parse(kind) else {
                debug!("skipping span with unknown NER kind '{kind}'");
                return;
            };
            let start = tokens[first].start;
            let end = tokens[last].end;
            spans.push(NerSpan {
                text: text[start..end].to_string(),
                start,
                end,
                entity_type,
                confidence: span_confidence(&token_probs[first..=last]),
            });
        }
    };

    let mut open_kind: Option<String> = None;
    for (t, &tag) in tags.iter().enumerate() {
        if labels.is_begin(tag) {
            if let Some(kind) = open_kind.take() {
                close(&mut open, &mut spans, &kind);
            }
            open = Some((t, t));
            open_kind = labels.kind(tag).map(str::to_string);
        } else if labels.is_inside(tag)
            && open.is_some()
            && labels.kind(tag) == open_kind.as_deref()
        {
            if let Some((_, last)) = open.as_mut() {
                *last = t;
            }
        } else {
            if let Some(kind) = open_kind.take() {
                close(&mut open, &mut spans, &kind);
            }
        }
    }
    if let Some(kind) = open_kind.take() {
        close(&mut open, &mut spans, &kind);
    }
    spans
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text::tokenize;

    fn label_set() -> LabelSet {
        LabelSet::new(&[
            "O".to_string(),
            "B-COMMON_NAME".to_string(),
            "I-COMMON_NAME".to_string(),
            "B-CAS_NUMBER".to_string(),
            "I-CAS_NUMBER".to_string(),
        ])
    }

    #[test]
    fn single_span_with_offsets() {
        let text = "contains acetylsalicylic acid today";
        let tokens = tokenize(text);
        // contains=O acetylsalicylic=B acid=I today=O
        let tags = vec![0, 1, 2, 0];
        let probs = vec![0.99, 0.9, 0.9, 0.95];
        let spans = materialize(text, &tokens, &tags, &probs, &label_set());
        assert_eq!(spans.len(), 1);
        let s = &spans[0];
        assert_eq!(s.text, "acetylsalicylic acid");
        assert_eq!(&text[s.start..s.end], s.text);
        assert_eq!(s.entity_type, EntityType::CommonName);
        assert!((s.confidence - 0.9).abs() < 1e-12);
    }

    #[test]
    fn adjacent_spans_of_different_kinds() {
        let text = "aspirin 50-78-2";
        let tokens = tokenize(text);
        let tags = vec![1, 3];
        let probs = vec![0.8, 0.9];
        let spans = materialize(text, &tokens, &tags, &probs, &label_set());
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].entity_type, EntityType::CommonName);
        assert_eq!(spans[1].entity_type, EntityType::CasNumber);
        assert_eq!(spans[1].text, "50-78-2");
    }

    #[test]
    fn back_to_back_begins_split_spans() {
        let text = "aspirin ibuprofen";
        let tokens = tokenize(text);
        let tags = vec![1, 1];
        let probs = vec![0.8, 0.7];
        let spans = materialize(text, &tokens, &tags, &probs, &label_set());
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].text, "aspirin");
        assert_eq!(spans[1].text, "ibuprofen");
    }

    #[test]
    fn trailing_open_span_is_closed() {
        let text = "take aspirin";
        let tokens = tokenize(text);
        let tags = vec![0, 1];
        let probs = vec![0.9, 0.85];
        let spans = materialize(text, &tokens, &tags, &probs, &label_set());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].text, "aspirin");
    }

    #[test]
    fn empty_tags_yield_no_spans() {
        let spans = materialize("", &[], &[], &[], &label_set());
        assert!(spans.is_empty());
    }
}
