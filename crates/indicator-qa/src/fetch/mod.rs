//! Data-fetch collaborators.

pub mod world_bank;

use async_trait::async_trait;

use crate::error::FetchError;
use crate::types::{FetchResult, YearRequest};

pub use world_bank::WorldBankClient;

/// Looks up one value for a country and indicator. Falling back to an
/// earlier year when the requested one has no value is part of this
/// contract.
#[async_trait]
pub trait DataFetcher: Send + Sync {
    async fn fetch(
        &self,
        country_code: &str,
        indicator_code: &str,
        year: YearRequest,
    ) -> Result<FetchResult, FetchError>;
}
