use std::collections::HashSet;
use std::sync::Arc;

use super::document::{build_document, expand_query};
use crate::text::content_tokens;
use crate::types::IndicatorRecord;

struct LexicalEntry {
    name_terms: HashSet<String>,
    doc_terms: HashSet<String>,
}

/// Unweighted token-set overlap. Cheapest strategy, no model, no statistics.
pub struct LexicalIndex {
    indicators: Vec<Arc<IndicatorRecord>>,
    entries: Vec<LexicalEntry>,
}

impl LexicalIndex {
    pub fn build(indicators: &[Arc<IndicatorRecord>]) -> Self {
        let entries = indicators
            .iter()
            .map(|ind| LexicalEntry {
                name_terms: content_tokens(&ind.name).into_iter().collect(),
                doc_terms: content_tokens(&build_document(ind)).into_iter().collect(),
            })
            .collect();

        Self {
            indicators: indicators.to_vec(),
            entries,
        }
    }

    pub fn entries(&self) -> &[Arc<IndicatorRecord>] {
        &self.indicators
    }

    pub fn score_all(&self, query: &str) -> Vec<f32> {
        let raw: HashSet<String> = content_tokens(query).into_iter().collect();
        let expanded: HashSet<String> = content_tokens(&expand_query(query)).into_iter().collect();

        self.entries
            .iter()
            .map(|e| jaccard(&raw, &e.name_terms).max(jaccard(&expanded, &e.doc_terms)))
            .collect()
    }
}

pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let inter = a.intersection(b).count();
    let union = a.len() + b.len() - inter;
    inter as f32 / union as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(words: &[&str]) -> HashSet<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_jaccard() {
        assert_eq!(jaccard(&set(&["a", "b"]), &set(&["a", "b"])), 1.0);
        assert_eq!(jaccard(&set(&["a"]), &set(&["a", "b"])), 0.5);
        assert_eq!(jaccard(&set(&[]), &set(&["a"])), 0.0);
    }

    #[test]
    fn test_unrelated_query_scores_zero() {
        let inds = vec![Arc::new(IndicatorRecord::new("A", "Forest area"))];
        let index = LexicalIndex::build(&inds);
        assert_eq!(index.score_all("mobile subscriptions"), vec![0.0]);
    }
}
