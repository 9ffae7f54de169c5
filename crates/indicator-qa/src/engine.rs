//! Query engine: parse, search, resolve, fetch, format.
//!
//! The catalog and index live together in an immutable [`EngineState`]
//! snapshot. Each request clones the `Arc` once, so a concurrent
//! [`QueryEngine::rebuild`] never changes the data a request is using.

use anyhow::{Context, Result};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tracing::Instrument;
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::config::QaConfig;
use crate::embeddings::{CachedEmbeddings, EmbeddingModel, HashingEmbeddings};
use crate::error::{QueryError, ResolutionError, UnavailableReason};
use crate::fetch::{DataFetcher, WorldBankClient};
use crate::format::format_value;
use crate::index::{IndexStrategy, SimilarityIndex};
use crate::parser::{search_text, IntentParser};
use crate::resolver::Resolver;
use crate::types::{FetchResult, ResolvedQuery, Response};

/// Catalog plus the index built from it.
pub struct EngineState {
    pub catalog: Arc<Catalog>,
    pub index: Arc<SimilarityIndex>,
}

pub struct QueryEngine {
    parser: IntentParser,
    resolver: Resolver,
    fetcher: Arc<dyn DataFetcher>,
    embedder: Option<Arc<dyn EmbeddingModel>>,
    config: QaConfig,
    state: RwLock<Arc<EngineState>>,
}

pub struct QueryEngineBuilder {
    config: QaConfig,
    catalog: Catalog,
    parser: Option<IntentParser>,
    fetcher: Option<Arc<dyn DataFetcher>>,
    embedder: Option<Arc<dyn EmbeddingModel>>,
}

impl QueryEngineBuilder {
    pub fn parser(mut self, parser: IntentParser) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn fetcher(mut self, fetcher: Arc<dyn DataFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    pub fn embedder(mut self, embedder: Arc<dyn EmbeddingModel>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Anything not supplied comes from the config: the OpenAI-compatible
    /// parser, the World Bank client, and a cached hashing embedder for the
    /// embedding strategy.
    pub fn build(self) -> Result<QueryEngine> {
        self.config.validate().map_err(anyhow::Error::msg)?;

        let parser = match self.parser {
            Some(parser) => parser,
            None => IntentParser::from_config(&self.config.llm)
                .context("Failed to initialize intent parser")?,
        };
        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(
                WorldBankClient::new(&self.config.fetch)
                    .context("Failed to initialize World Bank client")?,
            ),
        };
        let embedder = self.embedder.or_else(|| {
            (self.config.index.strategy == IndexStrategy::Embedding).then(|| {
                Arc::new(CachedEmbeddings::new(
                    HashingEmbeddings::default(),
                    self.config.index.embedding_cache_size,
                )) as Arc<dyn EmbeddingModel>
            })
        });

        let state = build_state(self.catalog, &self.config, embedder.clone())?;

        tracing::info!(
            indicators = state.catalog.indicators().len(),
            countries = state.catalog.countries().len(),
            strategy = %state.index.strategy(),
            llm = parser.has_llm(),
            "Query engine ready"
        );

        Ok(QueryEngine {
            parser,
            resolver: Resolver::new(self.config.resolver.clone()),
            fetcher,
            embedder,
            config: self.config,
            state: RwLock::new(Arc::new(state)),
        })
    }
}

fn build_state(
    catalog: Catalog,
    config: &QaConfig,
    embedder: Option<Arc<dyn EmbeddingModel>>,
) -> Result<EngineState> {
    let index = SimilarityIndex::build(config.index.strategy, catalog.indicators(), embedder)
        .context("Failed to build similarity index")?;
    Ok(EngineState {
        catalog: Arc::new(catalog),
        index: Arc::new(index),
    })
}

impl QueryEngine {
    pub fn builder(config: QaConfig, catalog: Catalog) -> QueryEngineBuilder {
        QueryEngineBuilder {
            config,
            catalog,
            parser: None,
            fetcher: None,
            embedder: None,
        }
    }

    pub fn new(config: QaConfig, catalog: Catalog) -> Result<Self> {
        Self::builder(config, catalog).build()
    }

    pub fn config(&self) -> &QaConfig {
        &self.config
    }

    /// The state new requests will see.
    pub fn snapshot(&self) -> Arc<EngineState> {
        self.state.read().clone()
    }

    /// Build an index for `catalog` and swap it in. Requests already running
    /// finish on the previous snapshot.
    pub fn rebuild(&self, catalog: Catalog) -> Result<()> {
        let state = build_state(catalog, &self.config, self.embedder.clone())?;
        let indicators = state.catalog.indicators().len();
        *self.state.write() = Arc::new(state);
        tracing::info!(indicators = indicators, "Swapped in rebuilt index");
        Ok(())
    }

    /// Answer one question. Dropping the returned future abandons any
    /// in-flight network call; no partial state is kept.
    pub async fn answer(&self, question: &str) -> Result<Response, QueryError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("answer", request_id = %request_id);
        self.answer_inner(question).instrument(span).await
    }

    async fn answer_inner(&self, question: &str) -> Result<Response, QueryError> {
        if question.trim().is_empty() {
            return Err(QueryError::ParseFailed);
        }
        let state = self.snapshot();
        let countries = state.catalog.countries();

        let intent = self.parser.parse(question, countries).await;
        tracing::info!(
            stage = "parsed",
            parser = intent.parser.as_str(),
            concept = %intent.concept_phrase,
            country = ?intent.country_phrase,
            year = ?intent.year,
            "Parsed question"
        );

        let query = search_text(&intent);
        let candidates = match state.index.query(&query, self.config.index.top_k) {
            Ok(candidates) => candidates,
            Err(e) => {
                tracing::warn!(error = %e, query = %query, "Index query failed");
                Vec::new()
            }
        };
        tracing::info!(stage = "searched", query = %query, candidates = candidates.len(), "Searched index");
        tracing::debug!(
            top = ?candidates
                .iter()
                .take(5)
                .map(|c| (c.indicator.code.as_str(), c.score))
                .collect::<Vec<_>>(),
            "Top candidates"
        );

        let resolved = self
            .resolver
            .resolve(&intent, &candidates, countries)
            .inspect_err(|e: &ResolutionError| tracing::warn!(error = %e, "Resolution failed"))?;
        tracing::info!(
            stage = "resolved",
            country = %resolved.country.iso3_code,
            indicator = %resolved.indicator.code,
            margin = ?resolved.confidence_margin,
            "Resolved query"
        );

        let fetched = self.fetch(&resolved).await?;
        tracing::info!(stage = "fetched", year_used = fetched.year_used, "Fetched value");

        let requested_year = resolved.year.requested();
        let note = requested_year
            .filter(|y| *y != fetched.year_used)
            .map(|y| year_note(y, fetched.year_used));

        let low_confidence = resolved
            .confidence_margin
            .is_some_and(|m| m < self.resolver.config().low_margin_warning);
        if low_confidence {
            tracing::warn!(
                indicator = %resolved.indicator.code,
                margin = ?resolved.confidence_margin,
                "Low confidence margin between top candidates"
            );
        }

        let indicator = &resolved.indicator;
        let response = Response {
            question: question.to_string(),
            country_code: resolved.country.iso3_code.clone(),
            indicator_code: indicator.code.clone(),
            indicator_name: indicator.name.clone(),
            unit: indicator.unit.clone(),
            value: format_value(fetched.value, &indicator.unit, &indicator.code),
            raw_value: fetched.value,
            requested_year,
            year_used: fetched.year_used,
            confidence_margin: resolved.confidence_margin,
            low_confidence,
            source_url: fetched.source_url,
            parser: intent.parser,
            diagnostic_note: format!(
                "{}, strategy={}",
                resolved.diagnostic_note,
                state.index.strategy()
            ),
            note,
        };
        tracing::info!(stage = "formatted", value = %response.value, "Answered question");
        Ok(response)
    }

    async fn fetch(&self, resolved: &ResolvedQuery) -> Result<FetchResult, QueryError> {
        let country_code = &resolved.country.iso3_code;
        let indicator_code = &resolved.indicator.code;
        let bound = Duration::from_millis(self.config.fetch.timeout_ms);

        let outcome = tokio::time::timeout(
            bound,
            self.fetcher.fetch(country_code, indicator_code, resolved.year),
        )
        .await;

        let reason = match outcome {
            Ok(Ok(fetched)) => return Ok(fetched),
            Ok(Err(e)) => UnavailableReason::from(e),
            Err(_) => UnavailableReason::Timeout,
        };
        tracing::warn!(
            country = %country_code,
            indicator = %indicator_code,
            reason = %reason,
            "Data unavailable"
        );
        Err(QueryError::DataUnavailable {
            country_code: country_code.clone(),
            indicator_code: indicator_code.clone(),
            reason,
        })
    }
}

fn year_note(requested: i32, used: i32) -> String {
    if used < requested {
        format!(
            "No data for {}; showing {} (nearest earlier available).",
            requested, used
        )
    } else {
        format!(
            "No data for {} or earlier; showing {} (most recent available).",
            requested, used
        )
    }
}

impl std::fmt::Debug for QueryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.snapshot();
        f.debug_struct("QueryEngine")
            .field("strategy", &state.index.strategy())
            .field("indicators", &state.catalog.indicators().len())
            .field("llm", &self.parser.has_llm())
            .finish()
    }
}
