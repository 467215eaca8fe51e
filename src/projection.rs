// Filter/projection engine: snapshot + filter -> restricted row/column view

use crate::data::Snapshot;
use crate::error::QueryError;
use crate::query::QueryFilter;
use serde::Serialize;
use std::collections::HashSet;

/// One matched country, with values aligned to [`Projection::years`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedRow {
    pub country: String,
    pub values: Vec<Option<f64>>,
}

/// The part of a snapshot selected by a [`QueryFilter`].
///
/// Zero rows or zero years is a valid projection; whether it can be charted
/// is decided by the chart kind.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Projection {
    /// Matched years, ascending.
    pub years: Vec<i32>,
    /// Matched countries, in snapshot order.
    pub rows: Vec<ProjectedRow>,
    /// Requested countries that matched nothing in the snapshot.
    pub unmatched_countries: Vec<String>,
    countries_requested: bool,
}

impl Projection {
    /// `NoCountryMatch` when countries were requested and none matched.
    /// A filter without countries never produces this warning.
    pub fn no_country_match(&self) -> Option<QueryError> {
        if self.countries_requested && self.rows.is_empty() {
            Some(QueryError::NoCountryMatch {
                candidates: self.unmatched_countries.clone(),
            })
        } else {
            None
        }
    }

    /// Mean of each row's non-null values over the matched years.
    pub fn mean_values(&self) -> Vec<(String, Option<f64>)> {
        self.rows
            .iter()
            .map(|row| {
                let present: Vec<f64> = row.values.iter().flatten().copied().collect();
                let mean = if present.is_empty() {
                    None
                } else {
                    Some(present.iter().sum::<f64>() / present.len() as f64)
                };
                (row.country.clone(), mean)
            })
            .collect()
    }
}

/// Apply `filter` to `snapshot`.
///
/// Countries match by case-insensitive equality. Requested years outside
/// those present in the snapshot are dropped silently.
pub fn project(snapshot: &Snapshot, filter: &QueryFilter) -> Projection {
    let years: Vec<i32> = snapshot
        .years()
        .into_iter()
        .filter(|year| filter.year_range.map_or(true, |range| range.contains(*year)))
        .collect();

    let mut matched = HashSet::new();
    let rows: Vec<ProjectedRow> = snapshot
        .records
        .iter()
        .filter(|record| match &filter.countries {
            Some(wanted) => {
                let folded = record.country().to_lowercase();
                let hit = wanted.contains(&folded);
                if hit {
                    matched.insert(folded);
                }
                hit
            }
            None => true,
        })
        .map(|record| ProjectedRow {
            country: record.country().to_string(),
            values: years.iter().map(|&year| record.value(year).flatten()).collect(),
        })
        .collect();

    let unmatched_countries = filter
        .countries
        .iter()
        .flatten()
        .filter(|c| !matched.contains(*c))
        .cloned()
        .collect();

    Projection {
        years,
        rows,
        unmatched_countries,
        countries_requested: filter.countries.is_some(),
    }
}
