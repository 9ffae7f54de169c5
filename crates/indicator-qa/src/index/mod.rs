//! Similarity index over the indicator catalog.
//!
//! Built once, queried read-only from any number of requests. Every strategy
//! scores a query against both the bare indicator name and its full document
//! and keeps the better of the two.

pub mod document;
pub mod embedding;
pub mod lexical;
pub mod tfidf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::embeddings::EmbeddingModel;
use crate::types::{clamp_score, Candidate, IndicatorRecord};

pub use embedding::EmbeddingIndex;
pub use lexical::LexicalIndex;
pub use tfidf::TfidfIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexStrategy {
    /// Cosine similarity over model embeddings.
    Embedding,
    /// Cosine similarity over tf-idf weighted terms.
    Tfidf,
    /// Jaccard overlap of token sets.
    Lexical,
}

impl IndexStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Embedding => "embedding",
            Self::Tfidf => "tfidf",
            Self::Lexical => "lexical",
        }
    }
}

impl std::fmt::Display for IndexStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub enum SimilarityIndex {
    Embedding(EmbeddingIndex),
    Tfidf(TfidfIndex),
    Lexical(LexicalIndex),
}

impl SimilarityIndex {
    /// Build an index of the chosen strategy. `embedder` is only consulted by
    /// [`IndexStrategy::Embedding`], which fails without one.
    pub fn build(
        strategy: IndexStrategy,
        indicators: &[Arc<IndicatorRecord>],
        embedder: Option<Arc<dyn EmbeddingModel>>,
    ) -> Result<Self> {
        let start = std::time::Instant::now();
        let index = match strategy {
            IndexStrategy::Embedding => {
                let embedder = embedder
                    .ok_or_else(|| anyhow!("embedding index requires an embedding model"))?;
                Self::Embedding(EmbeddingIndex::build(indicators, embedder)?)
            }
            IndexStrategy::Tfidf => Self::Tfidf(TfidfIndex::build(indicators)),
            IndexStrategy::Lexical => Self::Lexical(LexicalIndex::build(indicators)),
        };

        tracing::info!(
            strategy = %strategy,
            indicators = indicators.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Similarity index built"
        );
        Ok(index)
    }

    /// Up to `k` candidates, best first. Equal scores keep catalog order.
    pub fn query(&self, text: &str, k: usize) -> Result<Vec<Candidate>> {
        if k == 0 || text.trim().is_empty() {
            return Ok(Vec::new());
        }
        let (entries, scores) = match self {
            Self::Embedding(index) => (index.entries(), index.score_all(text)?),
            Self::Tfidf(index) => (index.entries(), index.score_all(text)),
            Self::Lexical(index) => (index.entries(), index.score_all(text)),
        };
        Ok(rank(entries, scores, k))
    }

    pub fn strategy(&self) -> IndexStrategy {
        match self {
            Self::Embedding(_) => IndexStrategy::Embedding,
            Self::Tfidf(_) => IndexStrategy::Tfidf,
            Self::Lexical(_) => IndexStrategy::Lexical,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Embedding(index) => index.entries().len(),
            Self::Tfidf(index) => index.entries().len(),
            Self::Lexical(index) => index.entries().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Stable descending sort; zero scores are dropped.
fn rank(entries: &[Arc<IndicatorRecord>], scores: Vec<f32>, k: usize) -> Vec<Candidate> {
    let mut scored: Vec<(usize, f32)> = scores
        .into_iter()
        .map(clamp_score)
        .enumerate()
        .filter(|(_, s)| *s > 0.0)
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);

    scored
        .into_iter()
        .map(|(i, score)| Candidate::new(entries[i].clone(), score))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::embeddings::HashingEmbeddings;

    pub(crate) fn sample_indicators() -> Vec<Arc<IndicatorRecord>> {
        vec![
            IndicatorRecord::new("NY.GDP.MKTP.CD", "GDP (current US$)")
                .with_topic("Economy & Growth")
                .with_description("GDP at purchaser's prices is the sum of gross value added by all resident producers in the economy."),
            IndicatorRecord::new("NY.GDP.MKTP.KD", "GDP (constant 2015 US$)")
                .with_topic("Economy & Growth")
                .with_description("GDP at purchaser's prices in constant 2015 prices."),
            IndicatorRecord::new("NY.GDP.MKTP.KD.ZG", "GDP growth (annual %)")
                .with_topic("Economy & Growth")
                .with_description("Annual percentage growth rate of GDP at market prices."),
            IndicatorRecord::new("NY.GDP.PCAP.CD", "GDP per capita (current US$)")
                .with_topic("Economy & Growth")
                .with_description("GDP per capita is gross domestic product divided by midyear population."),
            IndicatorRecord::new("SP.POP.TOTL", "Population, total")
                .with_topic("Health")
                .with_description("Total population counts all residents regardless of legal status or citizenship."),
            IndicatorRecord::new("SP.POP.65UP.FE.ZS", "Population ages 65 and above, female (% of female population)")
                .with_topic("Health")
                .with_description("Female population 65 years of age or older as a percentage of the total female population."),
            IndicatorRecord::new("SL.UEM.TOTL.ZS", "Unemployment, total (% of total labor force)")
                .with_topic("Social Protection & Labor")
                .with_description("Unemployment refers to the share of the labor force that is without work."),
            IndicatorRecord::new("FP.CPI.TOTL.ZG", "Inflation, consumer prices (annual %)")
                .with_topic("Economy & Growth")
                .with_description("Inflation as measured by the consumer price index."),
            IndicatorRecord::new("AG.LND.FRST.ZS", "Forest area (% of land area)")
                .with_topic("Environment")
                .with_description("Forest area is land under natural or planted stands of trees."),
        ]
        .into_iter()
        .map(Arc::new)
        .collect()
    }

    fn all_indexes() -> Vec<SimilarityIndex> {
        let inds = sample_indicators();
        let embedder: Arc<dyn EmbeddingModel> = Arc::new(HashingEmbeddings::default());
        vec![
            SimilarityIndex::build(IndexStrategy::Embedding, &inds, Some(embedder)).unwrap(),
            SimilarityIndex::build(IndexStrategy::Tfidf, &inds, None).unwrap(),
            SimilarityIndex::build(IndexStrategy::Lexical, &inds, None).unwrap(),
        ]
    }

    #[test]
    fn test_exact_name_self_matches() {
        let inds = sample_indicators();
        for index in all_indexes() {
            for ind in &inds {
                let top = index.query(&ind.name, 3).unwrap();
                assert_eq!(
                    top[0].indicator.code, ind.code,
                    "{} did not self-match '{}'",
                    index.strategy(),
                    ind.name
                );
                assert!(top[0].score >= 0.99, "{}: {}", index.strategy(), top[0].score);
            }
        }
    }

    #[test]
    fn test_results_sorted_bounded_and_in_range() {
        for index in all_indexes() {
            let results = index.query("gdp per capita growth", 4).unwrap();
            assert!(results.len() <= 4);
            assert!(!results.is_empty());
            for pair in results.windows(2) {
                assert!(pair[0].score >= pair[1].score);
            }
            assert!(results.iter().all(|c| (0.0..=1.0).contains(&c.score)));
        }
    }

    #[test]
    fn test_lexical_gdp_tie_goes_to_first_series() {
        let inds = sample_indicators();
        let index = SimilarityIndex::build(IndexStrategy::Lexical, &inds, None).unwrap();
        let results = index.query("gdp", 5).unwrap();
        assert_eq!(results[0].indicator.code, "NY.GDP.MKTP.CD");
        assert_eq!(results[1].indicator.code, "NY.GDP.MKTP.KD.ZG");
        assert_eq!(results[0].score, results[1].score);
    }

    #[test]
    fn test_ties_keep_catalog_order() {
        let inds: Vec<Arc<IndicatorRecord>> = vec![
            Arc::new(IndicatorRecord::new("B", "rainfall index")),
            Arc::new(IndicatorRecord::new("A", "rainfall index")),
        ];
        let index = SimilarityIndex::build(IndexStrategy::Lexical, &inds, None).unwrap();
        let results = index.query("rainfall index", 2).unwrap();
        assert_eq!(results[0].indicator.code, "B");
        assert_eq!(results[1].indicator.code, "A");
        assert_eq!(results[0].score, results[1].score);
    }

    #[test]
    fn test_empty_query_and_zero_k() {
        for index in all_indexes() {
            assert!(index.query("   ", 5).unwrap().is_empty());
            assert!(index.query("gdp", 0).unwrap().is_empty());
        }
    }

    #[test]
    fn test_embedding_requires_model() {
        let inds = sample_indicators();
        assert!(SimilarityIndex::build(IndexStrategy::Embedding, &inds, None).is_err());
    }

    #[test]
    fn test_cpi_question_finds_inflation_series() {
        use crate::parser::qualifiers::build_search_text;
        let inds = sample_indicators();
        for strategy in [IndexStrategy::Lexical, IndexStrategy::Tfidf] {
            let index = SimilarityIndex::build(strategy, &inds, None).unwrap();
            let results = index.query(&build_search_text("cpi", &[]), 3).unwrap();
            assert_eq!(results[0].indicator.code, "FP.CPI.TOTL.ZG", "{}", strategy);
            assert!(results[0].score >= 0.5, "{}: {}", strategy, results[0].score);
        }
    }
}
