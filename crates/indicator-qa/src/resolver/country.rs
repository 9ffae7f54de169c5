use std::sync::Arc;

use crate::catalog::{normalize_country_phrase, CountryCatalog};
use crate::error::ResolutionError;
use crate::types::CountryRecord;

/// Spellings this short are codes and only ever match exactly.
const MIN_FUZZY_CHARS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CountryMatchKind {
    Exact,
    /// Accepted with this Jaro-Winkler similarity.
    Fuzzy(f64),
}

/// Exact lookup first, then the closest spelling at or above `threshold`.
pub fn resolve_country(
    phrase: Option<&str>,
    countries: &CountryCatalog,
    threshold: f64,
) -> Result<(Arc<CountryRecord>, CountryMatchKind), ResolutionError> {
    let phrase = phrase
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .ok_or(ResolutionError::CountryMissing)?;

    if let Some(country) = countries.lookup(phrase) {
        return Ok((country.clone(), CountryMatchKind::Exact));
    }

    let key = normalize_country_phrase(phrase);
    let best = countries
        .spellings()
        .filter(|(spelling, _)| spelling.chars().count() >= MIN_FUZZY_CHARS)
        .map(|(spelling, country)| (strsim::jaro_winkler(&key, spelling), spelling, country))
        .max_by(|a, b| {
            a.0.partial_cmp(&b.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                // Lower spelling wins ties, so the result does not depend on map order.
                .then_with(|| b.1.cmp(a.1))
        });

    match best {
        Some((similarity, spelling, country)) if similarity >= threshold => {
            tracing::warn!(
                phrase = %phrase,
                matched = %spelling,
                country = %country.iso3_code,
                similarity = similarity,
                "Accepted fuzzy country match"
            );
            Ok((country.clone(), CountryMatchKind::Fuzzy(similarity)))
        }
        _ => Err(ResolutionError::CountryNotIdentified {
            phrase: phrase.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::sample_countries;

    #[test]
    fn test_exact_and_alias_resolve_to_same_code() {
        let countries = sample_countries();
        for country in countries.iter() {
            for spelling in country.spellings() {
                let (found, kind) = resolve_country(Some(spelling.as_str()), &countries, 0.9).unwrap();
                assert_eq!(found.iso3_code, country.iso3_code, "spelling '{}'", spelling);
                assert_eq!(kind, CountryMatchKind::Exact);
            }
            let (found, _) =
                resolve_country(Some(country.canonical_name.as_str()), &countries, 0.9).unwrap();
            assert_eq!(found.iso3_code, country.iso3_code);
        }
    }

    #[test]
    fn test_typo_resolves_fuzzily() {
        let (found, kind) = resolve_country(Some("Lebanonn"), &sample_countries(), 0.9).unwrap();
        assert_eq!(found.iso3_code, "LBN");
        assert!(matches!(kind, CountryMatchKind::Fuzzy(s) if s >= 0.9));
    }

    #[test]
    fn test_nonsense_is_not_identified() {
        let err = resolve_country(Some("Zzyzxland"), &sample_countries(), 0.9).unwrap_err();
        assert_eq!(
            err,
            ResolutionError::CountryNotIdentified {
                phrase: "Zzyzxland".into()
            }
        );
    }

    #[test]
    fn test_missing_phrase() {
        assert_eq!(
            resolve_country(None, &sample_countries(), 0.9).unwrap_err(),
            ResolutionError::CountryMissing
        );
        assert_eq!(
            resolve_country(Some("  "), &sample_countries(), 0.9).unwrap_err(),
            ResolutionError::CountryMissing
        );
    }

    #[test]
    fn test_fuzzy_is_deterministic() {
        let countries = sample_countries();
        let first = resolve_country(Some("Guinee"), &countries, 0.8);
        for _ in 0..5 {
            assert_eq!(resolve_country(Some("Guinee"), &countries, 0.8), first);
        }
    }
}
