// Structured filters and the interpreter that derives them from free text

use super::lexer::tokenize;
use super::matchers::{country_candidates, year_candidates};
use crate::config::QueryConfig;
use crate::error::QueryError;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};

/// Inclusive year range with `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> Result<Self, QueryError> {
        if start > end {
            return Err(QueryError::InvalidYearRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Build a range from two bounds in either order.
    pub fn ordered(a: i32, b: i32) -> Self {
        Self {
            start: a.min(b),
            end: a.max(b),
        }
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        (self.start..=self.end).contains(&year)
    }
}

/// Country and year restriction. `None` means unrestricted along that axis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryFilter {
    /// Lowercase country names.
    pub countries: Option<BTreeSet<String>>,
    pub year_range: Option<YearRange>,
}

impl QueryFilter {
    /// A filter that selects everything.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn with_countries<I, S>(mut self, countries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let set: BTreeSet<String> = countries
            .into_iter()
            .map(|c| c.as_ref().to_lowercase())
            .collect();
        self.countries = Some(set);
        self
    }

    pub fn with_year_range(mut self, range: YearRange) -> Self {
        self.year_range = Some(range);
        self
    }
}

/// Turns free text into a [`QueryFilter`].
///
/// Extraction is heuristic: capitalized phrases become country candidates
/// without any gazetteer check, and the first two plausible years become the
/// range bounds.
#[derive(Debug, Clone)]
pub struct Interpreter {
    ignored: HashSet<String>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(&QueryConfig::default())
    }
}

impl Interpreter {
    pub fn new(config: &QueryConfig) -> Self {
        Self {
            ignored: config.ignored_words.iter().map(|w| w.to_lowercase()).collect(),
        }
    }

    pub fn interpret(&self, text: &str) -> QueryFilter {
        let tokens = tokenize(text);

        let countries = country_candidates(&tokens, &self.ignored);
        let years = year_candidates(&tokens);

        let year_range = match years.as_slice() {
            [first, second, ..] => Some(YearRange::ordered(*first, *second)),
            _ => None,
        };

        QueryFilter {
            countries: if countries.is_empty() {
                None
            } else {
                Some(countries.into_iter().collect())
            },
            year_range,
        }
    }
}
