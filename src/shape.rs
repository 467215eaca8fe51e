// Aggregation/shape selector: projection + chart kind -> renderable dataset

use crate::error::NoDataForChart;
use crate::projection::Projection;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartKind {
    Bar,
    Line,
    Pie,
    Choropleth,
}

impl ChartKind {
    pub const ALL: [ChartKind; 4] = [
        ChartKind::Bar,
        ChartKind::Line,
        ChartKind::Pie,
        ChartKind::Choropleth,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::Line => "line",
            ChartKind::Pie => "pie",
            ChartKind::Choropleth => "choropleth",
        }
    }

    /// Reshape `projection` into this chart's layout, or explain why it
    /// cannot be drawn.
    pub fn shape(&self, projection: &Projection) -> Result<Dataset, NoDataForChart> {
        match self {
            ChartKind::Bar => Ok(shape_long(*self, "Population by Country and Year", projection)),
            ChartKind::Line => Ok(shape_long(*self, "Population Trend", projection)),
            ChartKind::Pie => shape_pie(projection),
            ChartKind::Choropleth => shape_choropleth(projection),
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded = s.trim().to_lowercase();
        let folded = folded.strip_suffix(" chart").unwrap_or(&folded);
        let folded = folded.strip_suffix(" map").unwrap_or(folded);
        ChartKind::ALL
            .into_iter()
            .find(|kind| kind.name() == folded)
            .ok_or_else(|| format!("unknown chart kind '{}'", s))
    }
}

/// One long-form row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observation {
    pub country: String,
    pub year: i32,
    pub value: Option<f64>,
}

/// A chart-ready dataset.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dataset {
    pub kind: ChartKind,
    pub title: String,
    pub observations: Vec<Observation>,
    /// The single year a choropleth is colored by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_year: Option<i32>,
    /// (min, max) of the non-null choropleth values.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_range: Option<(f64, f64)>,
}

impl Dataset {
    fn new(kind: ChartKind, title: impl Into<String>, observations: Vec<Observation>) -> Self {
        Self {
            kind,
            title: title.into(),
            observations,
            color_year: None,
            value_range: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

fn shape_long(kind: ChartKind, title: &str, projection: &Projection) -> Dataset {
    let observations = projection
        .rows
        .iter()
        .flat_map(move |row| {
            projection
                .years
                .iter()
                .zip(&row.values)
                .map(move |(&year, &value)| Observation {
                    country: row.country.clone(),
                    year,
                    value,
                })
        })
        .collect();
    Dataset::new(kind, title, observations)
}

fn shape_pie(projection: &Projection) -> Result<Dataset, NoDataForChart> {
    let row = match projection.rows.as_slice() {
        [row] => row,
        rows => return Err(NoDataForChart::AmbiguousSelection { matched: rows.len() }),
    };
    let (first, last) = match projection.years.as_slice() {
        [first, .., last] => (*first, *last),
        years => return Err(NoDataForChart::InsufficientYears { matched: years.len() }),
    };

    let title = format!("Population Distribution in {} ({}-{})", row.country, first, last);
    Ok(shape_long(ChartKind::Pie, &title, projection))
}

fn shape_choropleth(projection: &Projection) -> Result<Dataset, NoDataForChart> {
    let (idx, latest) = projection
        .years
        .iter()
        .copied()
        .enumerate()
        .max_by_key(|&(_, year)| year)
        .ok_or(NoDataForChart::NoYearsAvailable)?;

    let observations: Vec<Observation> = projection
        .rows
        .iter()
        .map(|row| Observation {
            country: row.country.clone(),
            year: latest,
            value: row.values.get(idx).copied().flatten(),
        })
        .collect();

    let value_range = observations
        .iter()
        .filter_map(|o| o.value)
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            None => Some((v, v)),
        });

    let mut dataset = Dataset::new(
        ChartKind::Choropleth,
        format!("Population Map for {}", latest),
        observations,
    );
    dataset.color_year = Some(latest);
    dataset.value_range = value_range;
    Ok(dataset)
}
