//! Merging, deduplication, and overlap resolution of candidate entities
//! from the dictionary, regex, and NER sources.
use crate::types::RawEntity;

/// Canonical candidate ordering: ascending start, ties broken by descending
/// length, then by descending confidence so the best duplicate comes first.
pub fn sort_candidates(entities: &mut [RawEntity]) {
    entities.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(b.len().cmp(&a.len()))
            .then(b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal))
    });
}

/// Merges candidates from all sources into a conflict-free entity list.
///
/// Exact duplicate spans collapse to the highest-confidence candidate.
/// Containment keeps both spans only when the inner one is the stronger
/// signal (higher confidence); a weaker contained span is subsumed by its
/// container. Partial overlaps keep the higher-confidence span, ties going
/// to the longer one. The result is sorted by ascending start.
pub fn merge_and_resolve(mut candidates: Vec<RawEntity>) -> Vec<RawEntity> {
    sort_candidates(&mut candidates);

    // Exact-span dedup; the sort already put the best candidate first.
    candidates.dedup_by(|b, a| a.start == b.start && a.end == b.end);

    let mut kept: Vec<RawEntity> = Vec::new();
    for mut entity in candidates {
        let mut dropped = false;
        let mut losers: Vec<usize> = Vec::new();
        for (idx, existing) in kept.iter().enumerate() {
            if !existing.overlaps(&entity) {
                continue;
            }
            if existing.contains(&entity) {
                if entity.confidence > existing.confidence {
                    entity.is_nested = true;
                    entity.parent_text = Some(existing.text.clone());
                } else {
                    dropped = true;
                    break;
                }
            } else {
                // Partial overlap: sorting guarantees `existing` cannot be
                // inside `entity`, so exactly one survives.
                let entity_wins = entity.confidence > existing.confidence
                    || (entity.confidence == existing.confidence
                        && entity.len() > existing.len());
                if entity_wins {
                    losers.push(idx);
                } else {
                    dropped = true;
                    break;
                }
            }
        }
        if dropped {
            continue;
        }
        for idx in losers.into_iter().rev() {
            kept.remove(idx);
        }
        kept.push(entity);
    }

    sort_candidates(&mut kept);
    kept
}

/// Attaches a ±`window` character context slice to each entity, snapped to
/// UTF-8 boundaries.
pub fn attach_context(entities: &mut [RawEntity], text: &str, window: usize) {
    for entity in entities {
        let mut from = entity.start.saturating_sub(window);
        while from > 0 && !text.is_char_boundary(from) {
            from -= 1;
        }
        let mut to = (entity.end + window).min(text.len());
        while to < text.len() && !text.is_char_boundary(to) {
            to += 1;
        }
        entity.context = text[from..to].to_string();
    }
}

/// Fraction of the text covered by entity spans. Nested spans can double
/// count bytes, so the value is clamped to 1.0.
pub fn coverage(entities: &[RawEntity], text_len: usize) -> f64 {
    if text_len == 0 {
        return 0.0;
    }
    let covered: usize = entities.iter().map(RawEntity::len).sum();
    (covered as f64 / text_len as f64).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntitySource, EntityType};

    fn entity(text: &str, start: usize, end: usize, confidence: f64) -> RawEntity {
        RawEntity::new(
            text,
            start,
            end,
            EntityType::CommonName,
            confidence,
            EntitySource::Ner,
        )
    }

    #[test]
    fn weaker_contained_span_is_subsumed() {
        let merged = merge_and_resolve(vec![
            entity("acetylsalicylic", 0, 15, 0.70),
            entity("acetylsalicylic acid", 0, 24, 0.90),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "acetylsalicylic acid");
    }

    #[test]
    fn stronger_inner_span_is_kept_nested() {
        let merged = merge_and_resolve(vec![
            entity("aspirin tablet", 10, 24, 0.85),
            entity("aspirin", 10, 17, 0.95),
        ]);
        assert_eq!(merged.len(), 2);
        let inner = merged.iter().find(|e| e.text == "aspirin").unwrap();
        assert!(inner.is_nested);
        assert_eq!(inner.parent_text.as_deref(), Some("aspirin tablet"));
        let outer = merged.iter().find(|e| e.text == "aspirin tablet").unwrap();
        assert!(!outer.is_nested);
    }

    #[test]
    fn exact_duplicates_keep_highest_confidence() {
        let mut a = entity("aspirin", 5, 12, 0.80);
        a.source = EntitySource::Dictionary;
        let b = entity("aspirin", 5, 12, 0.95);
        let merged = merge_and_resolve(vec![a, b]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].confidence, 0.95);
    }

    #[test]
    fn partial_overlap_keeps_higher_confidence() {
        let merged = merge_and_resolve(vec![
            entity("salicylic acid", 5, 19, 0.9),
            entity("acid anhydride", 15, 29, 0.6),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "salicylic acid");
    }

    #[test]
    fn partial_overlap_tie_keeps_longer() {
        let merged = merge_and_resolve(vec![
            entity("alpha beta", 0, 10, 0.8),
            entity("beta gamma delta", 6, 22, 0.8),
        ]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].text, "beta gamma delta");
    }

    #[test]
    fn non_nested_survivors_are_disjoint_and_sorted() {
        let merged = merge_and_resolve(vec![
            entity("c", 20, 25, 0.7),
            entity("a", 0, 5, 0.9),
            entity("b", 3, 9, 0.8),
            entity("d", 24, 30, 0.9),
        ]);
        for window in merged.windows(2) {
            assert!(window[0].start <= window[1].start);
        }
        for i in 0..merged.len() {
            for j in i + 1..merged.len() {
                if !merged[i].is_nested && !merged[j].is_nested {
                    assert!(!merged[i].overlaps(&merged[j]));
                }
            }
        }
    }

    #[test]
    fn context_attaches_with_clamped_window() {
        let text = "aspirin is dissolved in ethanol";
        let mut entities = vec![entity("aspirin", 0, 7, 0.9)];
        attach_context(&mut entities, text, 50);
        assert_eq!(entities[0].context, text);

        let mut entities = vec![entity("ethanol", 24, 31, 0.9)];
        attach_context(&mut entities, text, 3);
        assert_eq!(entities[0].context, "in ethanol");
    }

    #[test]
    fn context_respects_utf8_boundaries() {
        let text = "caf\u{00e9} aspirin caf\u{00e9}";
        let mut entities = vec![entity("aspirin", 6, 13, 0.9)];
        attach_context(&mut entities, text, 2);
        // Must not panic on the multi-byte é either side.
        assert!(entities[0].context.contains("aspirin"));
    }

    #[test]
    fn coverage_is_clamped() {
        let entities = vec![entity("a", 0, 80, 0.9), entity("b", 10, 60, 0.95)];
        assert_eq!(coverage(&entities, 100), 1.0);
        assert_eq!(coverage(&entities[..1], 100), 0.8);
        assert_eq!(coverage(&entities, 0), 0.0);
    }
}
