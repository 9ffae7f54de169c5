//! Turn a parsed intent plus ranked candidates into one answer.

pub mod country;
pub mod traits;

use crate::catalog::CountryCatalog;
use crate::config::ResolverConfig;
use crate::error::ResolutionError;
use crate::parser::{search_text, Qualifier};
use crate::types::{Candidate, ParsedIntent, ResolvedQuery, YearRequest};

pub use country::{resolve_country, CountryMatchKind};
pub use traits::IndicatorTraits;

#[derive(Debug, Clone)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Pure function of its inputs: the same intent and candidate list always
    /// produce the same result.
    pub fn resolve(
        &self,
        intent: &ParsedIntent,
        candidates: &[Candidate],
        countries: &CountryCatalog,
    ) -> Result<ResolvedQuery, ResolutionError> {
        let (country, country_match) = resolve_country(
            intent.country_phrase.as_deref(),
            countries,
            self.config.country_fuzzy_threshold,
        )?;

        let query = search_text(intent);
        let viable: Vec<(usize, &Candidate)> = candidates
            .iter()
            .enumerate()
            .filter(|(_, c)| c.score >= self.config.min_indicator_score)
            .collect();

        let Some(&(_, top)) = viable.first() else {
            return Err(ResolutionError::IndicatorNotIdentified {
                query,
                best_score: candidates.first().map(|c| c.score).unwrap_or(0.0),
            });
        };

        let requested: Vec<Qualifier> = intent
            .comparison_qualifiers
            .iter()
            .filter_map(|q| Qualifier::from_phrase(q))
            .collect();
        let concept = intent.concept_phrase.to_lowercase();

        // Within the tolerance window, prefer more requested qualifiers, then
        // fewer unrequested breakdowns, then the better rank.
        let floor = top.score - self.config.rerank_tolerance;
        let (selected_rank, selected) = viable
            .iter()
            .filter(|(_, c)| c.score >= floor)
            .min_by_key(|(rank, c)| {
                let t = IndicatorTraits::of(&c.indicator);
                (
                    std::cmp::Reverse(t.matches(&requested)),
                    t.conflicts(&requested, &concept),
                    *rank,
                )
            })
            .copied()
            .unwrap_or((0, top));

        let confidence_margin = margin(candidates, selected_rank);

        let year = match intent.year {
            Some(y) => YearRequest::Exact(y),
            None => YearRequest::Latest,
        };

        let mut note = format!(
            "query='{}', score={:.3}, parser={}, year={}",
            query,
            selected.score,
            intent.parser.as_str(),
            match year {
                YearRequest::Exact(y) => y.to_string(),
                YearRequest::Latest => "latest available".to_string(),
            }
        );
        if !std::ptr::eq(selected, top) {
            note.push_str(&format!(
                ", reranked over {} ({:.3})",
                top.indicator.code, top.score
            ));
        }
        if let CountryMatchKind::Fuzzy(similarity) = country_match {
            note.push_str(&format!(
                ", country '{}' matched fuzzily ({:.3})",
                intent.country_phrase.as_deref().unwrap_or_default(),
                similarity
            ));
        }
        if let Some(reason) = &intent.fallback_reason {
            note.push_str(&format!(", fallback: {}", reason));
        }

        tracing::debug!(
            country = %country.iso3_code,
            indicator = %selected.indicator.code,
            score = selected.score,
            margin = ?confidence_margin,
            "Resolved query"
        );

        Ok(ResolvedQuery {
            country,
            indicator: selected.indicator.clone(),
            year,
            score: selected.score,
            confidence_margin,
            diagnostic_note: note,
        })
    }
}

/// Selected score minus the best other score, floored at zero. Absent with
/// fewer than two candidates.
fn margin(candidates: &[Candidate], selected: usize) -> Option<f32> {
    if candidates.len() < 2 {
        return None;
    }
    let best_other = candidates
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != selected)
        .map(|(_, c)| c.score)
        .fold(f32::MIN, f32::max);
    Some((candidates[selected].score - best_other).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_countries;
    use crate::types::{IndicatorRecord, ParserKind};
    use proptest::prelude::*;
    use std::sync::Arc;

    fn intent(concept: &str, qualifiers: &[&str]) -> ParsedIntent {
        ParsedIntent {
            concept_phrase: concept.into(),
            country_phrase: Some("lebanon".into()),
            year: Some(2022),
            comparison_qualifiers: qualifiers.iter().map(|q| q.to_string()).collect(),
            parser: ParserKind::Rules,
            fallback_reason: None,
        }
    }

    fn candidate(code: &str, name: &str, score: f32) -> Candidate {
        Candidate::new(Arc::new(IndicatorRecord::new(code, name)), score)
    }

    fn gdp_candidates() -> Vec<Candidate> {
        vec![
            candidate("NY.GDP.MKTP.CD", "GDP (current US$)", 0.62),
            candidate("NY.GDP.PCAP.CD", "GDP per capita (current US$)", 0.55),
            candidate("NY.GDP.MKTP.KD.ZG", "GDP growth (annual %)", 0.40),
        ]
    }

    fn resolver() -> Resolver {
        Resolver::new(ResolverConfig::default())
    }

    #[test]
    fn test_top_candidate_selected() {
        let resolved = resolver()
            .resolve(&intent("gdp", &[]), &gdp_candidates(), &sample_countries())
            .unwrap();
        assert_eq!(resolved.country.iso3_code, "LBN");
        assert_eq!(resolved.indicator.code, "NY.GDP.MKTP.CD");
        assert_eq!(resolved.year, YearRequest::Exact(2022));
        let margin = resolved.confidence_margin.unwrap();
        assert!((margin - 0.07).abs() < 1e-5);
        assert!(resolved.diagnostic_note.starts_with("query='gdp', score=0.620"));
    }

    #[test]
    fn test_qualifier_reranks_within_tolerance() {
        let resolved = resolver()
            .resolve(&intent("gdp per capita", &["per capita"]), &gdp_candidates(), &sample_countries())
            .unwrap();
        assert_eq!(resolved.indicator.code, "NY.GDP.PCAP.CD");
        assert_eq!(resolved.confidence_margin, Some(0.0));
        assert!(resolved.diagnostic_note.contains("reranked over NY.GDP.MKTP.CD"));
    }

    #[test]
    fn test_qualifier_outside_tolerance_keeps_top() {
        let resolved = resolver()
            .resolve(&intent("gdp growth", &["growth"]), &gdp_candidates(), &sample_countries())
            .unwrap();
        // 0.40 sits more than 0.15 below 0.62.
        assert_eq!(resolved.indicator.code, "NY.GDP.MKTP.CD");
    }

    #[test]
    fn test_unrequested_breakdown_loses_to_total() {
        let candidates = vec![
            candidate("SP.POP.TOTL.FE.IN", "Population, female", 0.5),
            candidate("SP.POP.TOTL", "Population, total", 0.45),
        ];
        let resolved = resolver()
            .resolve(&intent("population", &[]), &candidates, &sample_countries())
            .unwrap();
        assert_eq!(resolved.indicator.code, "SP.POP.TOTL");
    }

    #[test]
    fn test_no_viable_candidate() {
        let candidates = vec![candidate("AG.LND.FRST.ZS", "Forest area (% of land area)", 0.05)];
        let err = resolver()
            .resolve(&intent("zebra crossings", &[]), &candidates, &sample_countries())
            .unwrap_err();
        assert_eq!(
            err,
            ResolutionError::IndicatorNotIdentified {
                query: "zebra crossings".into(),
                best_score: 0.05
            }
        );

        let err = resolver()
            .resolve(&intent("zebra", &[]), &[], &sample_countries())
            .unwrap_err();
        assert!(matches!(err, ResolutionError::IndicatorNotIdentified { best_score, .. } if best_score == 0.0));
    }

    #[test]
    fn test_country_failure_comes_first() {
        let mut i = intent("gdp", &[]);
        i.country_phrase = Some("Atlantis Prime".into());
        let err = resolver().resolve(&i, &gdp_candidates(), &sample_countries()).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::CountryNotIdentified {
                phrase: "Atlantis Prime".into()
            }
        );
    }

    #[test]
    fn test_latest_year_and_single_candidate() {
        let mut i = intent("gdp", &[]);
        i.year = None;
        let resolved = resolver()
            .resolve(&i, &gdp_candidates()[..1], &sample_countries())
            .unwrap();
        assert_eq!(resolved.year, YearRequest::Latest);
        assert_eq!(resolved.confidence_margin, None);
        assert!(resolved.diagnostic_note.contains("year=latest available"));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let mut i = intent("gdp per capita", &["per capita"]);
        i.country_phrase = Some("Lebannon".into());
        let candidates = gdp_candidates();
        let countries = sample_countries();
        let first = resolver().resolve(&i, &candidates, &countries).unwrap();
        for _ in 0..10 {
            assert_eq!(resolver().resolve(&i, &candidates, &countries).unwrap(), first);
        }
        assert!(first.diagnostic_note.contains("matched fuzzily"));
    }

    proptest! {
        #[test]
        fn prop_margin_absent_or_non_negative(scores in proptest::collection::vec(0.0f32..=1.0, 0..8)) {
            let mut scores = scores;
            scores.sort_by(|a, b| b.partial_cmp(a).unwrap());
            let candidates: Vec<Candidate> = scores
                .iter()
                .enumerate()
                .map(|(i, s)| candidate(&format!("X.{}", i), &format!("series {}", i), *s))
                .collect();

            match resolver().resolve(&intent("series", &[]), &candidates, &sample_countries()) {
                Ok(resolved) => {
                    if candidates.len() < 2 {
                        prop_assert!(resolved.confidence_margin.is_none());
                    } else {
                        prop_assert!(resolved.confidence_margin.unwrap() >= 0.0);
                    }
                }
                Err(err) => {
                    let is_indicator_not_identified = matches!(err, ResolutionError::IndicatorNotIdentified { .. });
                    prop_assert!(is_indicator_not_identified);
                }
            }
        }
    }
}
