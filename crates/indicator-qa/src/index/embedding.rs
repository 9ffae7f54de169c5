use anyhow::{Context, Result};
use rayon::prelude::*;
use std::sync::Arc;

use super::document::{build_document, expand_query};
use crate::embeddings::{cosine, EmbeddingModel};
use crate::types::IndicatorRecord;

struct EmbeddingEntry {
    name: Vec<f32>,
    doc: Vec<f32>,
}

/// Exact (flat) cosine search over precomputed vectors.
pub struct EmbeddingIndex {
    indicators: Vec<Arc<IndicatorRecord>>,
    entries: Vec<EmbeddingEntry>,
    model: Arc<dyn EmbeddingModel>,
}

impl EmbeddingIndex {
    pub fn build(indicators: &[Arc<IndicatorRecord>], model: Arc<dyn EmbeddingModel>) -> Result<Self> {
        let docs: Vec<String> = indicators.iter().map(|ind| build_document(ind)).collect();
        let doc_refs: Vec<&str> = docs.iter().map(String::as_str).collect();
        let name_refs: Vec<&str> = indicators.iter().map(|ind| ind.name.as_str()).collect();

        let dim = model.dimension();
        let embed_chunked = |texts: &[&str]| -> Result<Vec<Vec<f32>>> {
            let batches: Vec<Vec<Vec<f32>>> = texts
                .par_chunks(64)
                .map(|chunk| model.embed_documents(chunk))
                .collect::<Result<_>>()?;
            Ok(batches.into_iter().flatten().collect())
        };

        let doc_vecs = embed_chunked(&doc_refs).context("Failed to embed indicator documents")?;
        let name_vecs = embed_chunked(&name_refs).context("Failed to embed indicator names")?;

        if let Some(bad) = doc_vecs.iter().chain(&name_vecs).find(|v| v.len() != dim) {
            anyhow::bail!(
                "embedding model returned {} dimensions, expected {}",
                bad.len(),
                dim
            );
        }

        let entries = name_vecs
            .into_iter()
            .zip(doc_vecs)
            .map(|(name, doc)| EmbeddingEntry { name, doc })
            .collect();

        Ok(Self {
            indicators: indicators.to_vec(),
            entries,
            model,
        })
    }

    pub fn entries(&self) -> &[Arc<IndicatorRecord>] {
        &self.indicators
    }

    pub fn dimension(&self) -> usize {
        self.model.dimension()
    }

    pub fn score_all(&self, query: &str) -> Result<Vec<f32>> {
        let raw = self
            .model
            .embed_query(query)
            .context("Failed to embed query")?;
        let expanded = self
            .model
            .embed_query(&expand_query(query))
            .context("Failed to embed expanded query")?;

        Ok(self
            .entries
            .par_iter()
            .map(|e| cosine(&raw, &e.name).max(cosine(&expanded, &e.doc)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashingEmbeddings;

    struct WrongDim;

    impl EmbeddingModel for WrongDim {
        fn embed_query(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; 3])
        }
        fn embed_document(&self, _text: &str) -> Result<Vec<f32>> {
            Ok(vec![1.0; 3])
        }
        fn dimension(&self) -> usize {
            4
        }
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let inds = vec![Arc::new(IndicatorRecord::new("A", "Forest area"))];
        assert!(EmbeddingIndex::build(&inds, Arc::new(WrongDim)).is_err());
    }

    #[test]
    fn test_scores_follow_vector_similarity() {
        let inds = vec![
            Arc::new(IndicatorRecord::new("A", "Forest area")),
            Arc::new(IndicatorRecord::new("B", "Mobile cellular subscriptions")),
        ];
        let index = EmbeddingIndex::build(&inds, Arc::new(HashingEmbeddings::default())).unwrap();
        let scores = index.score_all("forest").unwrap();
        assert!(scores[0] > scores[1]);
        assert_eq!(index.dimension(), 512);
    }
}
