use serde::Serialize;
use thiserror::Error;

/// The resolver could not turn a parsed question into a single answer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResolutionError {
    #[error("no country was named in the question")]
    CountryMissing,

    #[error("country not identified: '{phrase}'")]
    CountryNotIdentified { phrase: String },

    #[error("indicator not identified for query '{query}' (best score {best_score:.3})")]
    IndicatorNotIdentified { query: String, best_score: f32 },
}

/// Why a resolved query produced no value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum UnavailableReason {
    /// Provider answered, but no year carries a value.
    NoValue,
    /// Provider did not answer within the configured bound.
    Timeout,
    Upstream(String),
}

impl std::fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoValue => write!(f, "no value reported for any year"),
            Self::Timeout => write!(f, "provider timed out"),
            Self::Upstream(detail) => write!(f, "provider error: {}", detail),
        }
    }
}

/// Error returned to callers of [`crate::QueryEngine::answer`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("question could not be parsed")]
    ParseFailed,

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error("no data for {indicator_code} in {country_code}: {reason}")]
    DataUnavailable {
        country_code: String,
        indicator_code: String,
        reason: UnavailableReason,
    },
}

impl QueryError {
    /// Stable tag a client can branch on.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ParseFailed => "parse_failed",
            Self::Resolution(ResolutionError::CountryMissing) => "country_missing",
            Self::Resolution(ResolutionError::CountryNotIdentified { .. }) => {
                "country_not_identified"
            }
            Self::Resolution(ResolutionError::IndicatorNotIdentified { .. }) => {
                "indicator_not_identified"
            }
            Self::DataUnavailable { .. } => "data_unavailable",
        }
    }

    /// True when the question was understood but the provider had nothing.
    pub fn is_data_error(&self) -> bool {
        matches!(self, Self::DataUnavailable { .. })
    }
}

/// Failure reported by a [`crate::fetch::DataFetcher`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("no value available")]
    NoValue,
    #[error("request timed out")]
    Timeout,
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl From<FetchError> for UnavailableReason {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::NoValue => Self::NoValue,
            FetchError::Timeout => Self::Timeout,
            FetchError::Upstream(detail) => Self::Upstream(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_tags() {
        let err: QueryError = ResolutionError::CountryNotIdentified {
            phrase: "narnia".into(),
        }
        .into();
        assert_eq!(err.kind(), "country_not_identified");
        assert!(err.to_string().contains("narnia"));
        assert!(!err.is_data_error());

        let err = QueryError::DataUnavailable {
            country_code: "LBN".into(),
            indicator_code: "X".into(),
            reason: FetchError::Timeout.into(),
        };
        assert_eq!(err.kind(), "data_unavailable");
        assert!(err.is_data_error());
        assert!(err.to_string().contains("timed out"));
    }
}
