use polars::prelude::*;
use unidecode::unidecode;

use crate::error::AtlasError;

/// Fold a municipality name into its canonical comparable form:
/// trimmed, diacritics stripped, uppercased.
///
/// Every cross-source join and lookup goes through this, so it is applied to
/// the facility, population and boundary tables alike. Idempotent.
pub fn normalize_key(name: &str) -> Result<String, AtlasError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AtlasError::Validation(
            "municipality name must not be empty".to_string(),
        ));
    }
    Ok(unidecode(trimmed).to_uppercase())
}

/// Normalize a String column in place. Nulls pass through; an empty cell is a
/// validation error.
pub(crate) fn normalize_column(mut df: DataFrame, column: &str) -> Result<DataFrame, AtlasError> {
    let normalized: Vec<Option<String>> = df
        .column(column)
        .map_err(|_| AtlasError::MissingColumn(column.to_string()))?
        .str()?
        .into_iter()
        .map(|opt| opt.map(normalize_key).transpose())
        .collect::<Result<_, _>>()?;

    df.replace(column, Series::new(column.into(), normalized))?;
    Ok(df)
}
