use std::path::Path;

use polars::prelude::*;
use tracing::info;

use crate::error::AtlasError;
use crate::normalize::normalize_column;
use crate::schema::facility;
use crate::table::{ensure_unique_keys, read_table, require_columns};

/// Build the unified facility table from the three registry sources.
///
/// The primary registry carries the full facility attributes; the secondary
/// registry contributes its alternate facility code (as `CLUES_SSH`) joined on
/// the composite natural key; the schedules table contributes operating hours
/// joined on the facility code alone. Both joins are outer-left: unmatched
/// rows keep nulls and are never dropped.
pub fn load_facilities(
    primary_path: &Path,
    secondary_path: &Path,
    schedules_path: &Path,
) -> Result<DataFrame, AtlasError> {
    let primary = read_table(primary_path)?;
    let secondary = read_table(secondary_path)?;
    let schedules = read_table(schedules_path)?;

    require_columns(&primary, &[facility::CLUES, facility::MUNICIPIO])?;
    require_columns(&primary, &facility::JOIN_KEY)?;
    require_columns(&secondary, &[facility::CLUES])?;
    require_columns(&secondary, &facility::JOIN_KEY)?;
    require_columns(&schedules, &[facility::CLUES, facility::HORARIO])?;

    // Duplicate keys on the right side of a left join would fan the facility
    // rows out; reject the dataset instead.
    ensure_unique_keys(&secondary, &facility::JOIN_KEY, "secondary registry")?;
    ensure_unique_keys(&schedules, &[facility::CLUES], "schedules table")?;

    let join_cols = || facility::JOIN_KEY.map(col).to_vec();

    let secondary_codes = secondary.lazy().select([
        col(facility::NOMBRE_UNIDAD),
        col(facility::CLAVE_MUNICIPIO),
        col(facility::CLAVE_LOCALIDAD),
        col(facility::CLUES),
    ]);

    let merged = primary
        .clone()
        .lazy()
        .join(
            secondary_codes,
            join_cols(),
            join_cols(),
            JoinArgs::new(JoinType::Left).with_suffix(Some("_SSH".into())),
        )
        .collect()?;

    // The alternate code sits right after the primary code for export
    // compatibility.
    let merged = move_column_after(merged, facility::CLUES_SSH, facility::CLUES)?;

    let unified = merged
        .lazy()
        .join(
            schedules.lazy(),
            [col(facility::CLUES)],
            [col(facility::CLUES)],
            JoinArgs::new(JoinType::Left),
        )
        .collect()?;

    if unified.height() != primary.height() {
        return Err(AtlasError::Validation(format!(
            "facility joins changed row count: {} primary rows became {}",
            primary.height(),
            unified.height()
        )));
    }

    let unified = normalize_column(unified, facility::MUNICIPIO)?;
    info!(rows = unified.height(), "unified facility table loaded");
    Ok(unified)
}

/// Reposition `column` immediately after `after`, keeping all other columns in
/// their current order.
fn move_column_after(df: DataFrame, column: &str, after: &str) -> Result<DataFrame, AtlasError> {
    let mut names: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.to_string())
        .collect();

    let from = names
        .iter()
        .position(|c| c == column)
        .ok_or_else(|| AtlasError::MissingColumn(column.to_string()))?;
    let moved = names.remove(from);
    let anchor = names
        .iter()
        .position(|c| c == after)
        .ok_or_else(|| AtlasError::MissingColumn(after.to_string()))?;
    names.insert(anchor + 1, moved);

    Ok(df.select(names)?)
}
