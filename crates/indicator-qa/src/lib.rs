pub mod catalog;
pub mod config;
pub mod embeddings;
pub mod engine;
pub mod error;
pub mod fetch;
pub mod format;
pub mod index;
pub mod llm;
pub mod parser;
pub mod resolver;
pub mod text;
pub mod types;

// Re-export primary types for convenience
pub use catalog::{Catalog, CountryCatalog};
pub use config::QaConfig;
pub use engine::{EngineState, QueryEngine, QueryEngineBuilder};
pub use error::{FetchError, QueryError, ResolutionError, UnavailableReason};
pub use fetch::{DataFetcher, WorldBankClient};
pub use index::{IndexStrategy, SimilarityIndex};
pub use parser::{IntentParser, ParserUnavailable, RuleBasedParser};
pub use resolver::Resolver;
pub use types::{
    Candidate, CountryRecord, FetchResult, IndicatorRecord, ParsedIntent, ParserKind,
    ResolvedQuery, Response, YearRequest,
};

// Re-export LLM types
pub use llm::{ApiProvider, GenerationConfig, LLMProvider, OpenAICompatibleProvider};

// Re-export common types
pub use anyhow::{Error, Result};
