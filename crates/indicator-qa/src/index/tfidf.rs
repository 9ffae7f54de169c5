//! TF-IDF cosine scoring over indicator text.
//!
//! Query terms absent from the vocabulary still count toward the query norm
//! (at maximum idf), so a query padded with unknown words cannot reach 1.0.

use std::collections::HashMap;
use std::sync::Arc;

use super::document::{build_document, expand_query};
use crate::text::content_tokens;
use crate::types::IndicatorRecord;

/// Sparse vector sorted by term id, L2-normalised.
type SparseVec = Vec<(usize, f32)>;

struct TfidfEntry {
    name: SparseVec,
    doc: SparseVec,
}

pub struct TfidfIndex {
    indicators: Vec<Arc<IndicatorRecord>>,
    entries: Vec<TfidfEntry>,
    vocab: HashMap<String, usize>,
    idf: Vec<f32>,
    unknown_idf: f32,
}

impl TfidfIndex {
    pub fn build(indicators: &[Arc<IndicatorRecord>]) -> Self {
        let docs: Vec<Vec<String>> = indicators
            .iter()
            .map(|ind| content_tokens(&build_document(ind)))
            .collect();

        let mut vocab: HashMap<String, usize> = HashMap::new();
        let mut df: Vec<usize> = Vec::new();
        for tokens in &docs {
            let mut seen: Vec<usize> = Vec::new();
            for t in tokens {
                let next = vocab.len();
                let id = *vocab.entry(t.clone()).or_insert(next);
                if id == df.len() {
                    df.push(0);
                }
                if !seen.contains(&id) {
                    seen.push(id);
                    df[id] += 1;
                }
            }
        }

        let n = docs.len() as f32;
        let idf: Vec<f32> = df
            .iter()
            .map(|&d| ((n + 1.0) / (d as f32 + 1.0)).ln() + 1.0)
            .collect();
        let unknown_idf = (n + 1.0).ln() + 1.0;

        let mut index = Self {
            indicators: indicators.to_vec(),
            entries: Vec::with_capacity(docs.len()),
            vocab,
            idf,
            unknown_idf,
        };

        let entries = indicators
            .iter()
            .zip(&docs)
            .map(|(ind, doc_tokens)| TfidfEntry {
                name: index.weigh(&content_tokens(&ind.name)).0,
                doc: index.weigh(doc_tokens).0,
            })
            .collect();
        index.entries = entries;
        index
    }

    pub fn entries(&self) -> &[Arc<IndicatorRecord>] {
        &self.indicators
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocab.len()
    }

    pub fn score_all(&self, query: &str) -> Vec<f32> {
        let (raw, raw_norm) = self.weigh(&content_tokens(query));
        let (expanded, exp_norm) = self.weigh(&content_tokens(&expand_query(query)));

        self.entries
            .iter()
            .map(|e| {
                let by_name = if raw_norm > 0.0 { dot(&raw, &e.name) / raw_norm } else { 0.0 };
                let by_doc = if exp_norm > 0.0 { dot(&expanded, &e.doc) / exp_norm } else { 0.0 };
                by_name.max(by_doc)
            })
            .collect()
    }

    /// Term weights for known terms (unnormalised) and the full norm,
    /// including unknown terms. Entries are stored normalised.
    fn weigh(&self, tokens: &[String]) -> (SparseVec, f32) {
        let mut tf: HashMap<usize, f32> = HashMap::new();
        let mut unknown: HashMap<&str, f32> = HashMap::new();
        for t in tokens {
            match self.vocab.get(t) {
                Some(&id) => *tf.entry(id).or_insert(0.0) += 1.0,
                None => *unknown.entry(t.as_str()).or_insert(0.0) += 1.0,
            }
        }

        let mut weights: SparseVec = tf
            .into_iter()
            .map(|(id, count)| (id, count * self.idf[id]))
            .collect();
        weights.sort_by_key(|(id, _)| *id);

        let known_sq: f32 = weights.iter().map(|(_, w)| w * w).sum();
        let unknown_sq: f32 = unknown
            .values()
            .map(|c| (c * self.unknown_idf).powi(2))
            .sum();
        let norm = (known_sq + unknown_sq).sqrt();
        let known_norm = known_sq.sqrt();

        // Fully known token lists come back unit length.
        if known_norm > 0.0 && unknown_sq == 0.0 {
            for (_, w) in weights.iter_mut() {
                *w /= known_norm;
            }
            return (weights, 1.0);
        }
        (weights, norm)
    }
}

fn dot(a: &SparseVec, b: &SparseVec) -> f32 {
    let (mut i, mut j) = (0, 0);
    let mut sum = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                sum += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }
    sum
}
