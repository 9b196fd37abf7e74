use std::path::Path;

use polars::prelude::*;
use tracing::{info, warn};

use crate::error::AtlasError;
use crate::normalize::normalize_column;
use crate::schema::population;
use crate::table::{read_csv_as_strings, require_columns};

/// State-wide population totals across every municipality and age band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationTotals {
    pub male: i64,
    pub female: i64,
    pub total: i64,
}

/// Load the population census report and aggregate it into one cohort row per
/// municipality.
///
/// The report is a fixed-format CSV with the header on the second row. The
/// administrative columns are stripped, the municipality name normalized, and
/// every demographic column summed per normalized name — the raw source has
/// several rows per municipality (one per locality).
///
/// The cohort schema is enumerated, not prefix-matched: every expected column
/// must be present or the load fails with a schema error. Non-numeric cells
/// are coerced to zero and reported as a data-quality warning.
pub fn load_population(path: &Path) -> Result<DataFrame, AtlasError> {
    let raw = read_csv_as_strings(path, 1)?;

    require_columns(&raw, &[population::MUNICIPIO])?;
    require_columns(&raw, &population::DROP)?;
    let cohorts = population::cohort_columns();
    require_columns(&raw, &cohorts)?;

    let kept = raw.drop_many(population::DROP);
    let kept = normalize_column(kept, population::MUNICIPIO)?;

    // Non-strict cast: dirty cells become null here, then zero below.
    let cast = kept
        .lazy()
        .with_columns(
            cohorts
                .iter()
                .map(|c| col(c.as_str()).cast(DataType::Int64))
                .collect::<Vec<_>>(),
        )
        .collect()?;

    for name in &cohorts {
        let nulls = cast.column(name)?.null_count();
        if nulls > 0 {
            warn!(column = %name, cells = nulls, "non-numeric census cells coerced to zero");
        }
    }

    let df = cast
        .lazy()
        .with_columns(
            cohorts
                .iter()
                .map(|c| col(c.as_str()).fill_null(lit(0)))
                .collect::<Vec<_>>(),
        )
        .group_by([col(population::MUNICIPIO)])
        .agg(
            cohorts
                .iter()
                .map(|c| col(c.as_str()).sum())
                .collect::<Vec<_>>(),
        )
        .sort([population::MUNICIPIO], SortMultipleOptions::default())
        .collect()?;

    info!(municipalities = df.height(), "population pyramid loaded");
    Ok(df)
}

/// Grand totals over the whole population table.
pub fn population_totals(df: &DataFrame) -> Result<PopulationTotals, AtlasError> {
    let male = sum_columns(df, &population::male_columns())?;
    let female = sum_columns(df, &population::female_columns())?;
    Ok(PopulationTotals {
        male,
        female,
        total: male + female,
    })
}

/// Sum the named integer columns across all rows of `df`.
pub(crate) fn sum_columns(df: &DataFrame, columns: &[String]) -> Result<i64, AtlasError> {
    let mut total = 0i64;
    for name in columns {
        let column = df
            .column(name)
            .map_err(|_| AtlasError::MissingColumn(name.to_string()))?;
        total += column.as_materialized_series().i64()?.sum().unwrap_or(0);
    }
    Ok(total)
}
