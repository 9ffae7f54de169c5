//! What an indicator measures, read from its code, name and unit.

use crate::parser::Qualifier;
use crate::types::IndicatorRecord;

/// Concepts that are rates by nature; a growth-coded series is their headline.
const RATE_CONCEPTS: &[&str] = &["inflation", "cpi", "deflator"];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndicatorTraits {
    pub percent: bool,
    pub growth: bool,
    pub per_capita: bool,
    pub ppp: bool,
    pub constant_usd: bool,
    pub current_usd: bool,
    pub female: bool,
    pub male: bool,
    pub ages_65up: bool,
    pub ages_1524: bool,
}

impl IndicatorTraits {
    pub fn of(indicator: &IndicatorRecord) -> Self {
        let code = indicator.code.as_str();
        let name = indicator.name.to_lowercase();
        let unit = indicator.unit.to_lowercase();

        Self {
            percent: code.ends_with(".ZS")
                || indicator.name.contains("%)")
                || unit.contains('%')
                || unit.contains("percent"),
            growth: code.ends_with(".ZG") || name.contains("growth (annual %)"),
            per_capita: code.contains(".PC") || name.contains("per capita"),
            ppp: code.contains(".PP") || name.contains("ppp"),
            constant_usd: code.ends_with(".KD") || name.contains("constant"),
            current_usd: code.ends_with(".CD") || name.contains("current us$") || unit.contains("current"),
            female: has_segment(code, "FE"),
            male: has_segment(code, "MA"),
            ages_65up: code.contains("65UP"),
            ages_1524: code.contains("1524"),
        }
    }

    pub fn has(&self, qualifier: Qualifier) -> bool {
        match qualifier {
            Qualifier::PerCapita => self.per_capita,
            Qualifier::Ppp => self.ppp,
            Qualifier::ConstantUsd => self.constant_usd,
            Qualifier::CurrentUsd => self.current_usd,
            Qualifier::Growth => self.growth,
            Qualifier::Percent => self.percent,
            Qualifier::Female => self.female,
            Qualifier::Male => self.male,
            Qualifier::Ages65Up => self.ages_65up,
            Qualifier::Ages15To24 => self.ages_1524,
        }
    }

    /// How many requested qualifiers this indicator satisfies.
    pub fn matches(&self, requested: &[Qualifier]) -> usize {
        requested.iter().filter(|q| self.has(**q)).count()
    }

    /// Distinguishing traits the question did not ask for: a sex or age
    /// breakdown, a per capita, ppp or growth variant. A total level series
    /// has none.
    pub fn conflicts(&self, requested: &[Qualifier], concept: &str) -> usize {
        let asked = |q: Qualifier| requested.contains(&q);
        let rate_concept = concept
            .split_whitespace()
            .any(|w| RATE_CONCEPTS.contains(&w));

        [
            (self.female, Qualifier::Female),
            (self.male, Qualifier::Male),
            (self.ages_65up, Qualifier::Ages65Up),
            (self.ages_1524, Qualifier::Ages15To24),
            (self.per_capita, Qualifier::PerCapita),
            (self.ppp, Qualifier::Ppp),
            (self.growth && !rate_concept, Qualifier::Growth),
        ]
        .into_iter()
        .filter(|(present, q)| *present && !asked(*q))
        .count()
    }
}

/// `.FE.` inside the code, or `.FE` at its end.
fn has_segment(code: &str, segment: &str) -> bool {
    code.split('.').skip(1).any(|part| part == segment)
}
