use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::AtlasError;

/// Read a tabular source (CSV or Parquet, by extension) with every column
/// coerced to String dtype and column names trimmed.
///
/// Keeping all sources as strings makes multi-key joins across independently
/// produced files well behaved; numeric columns are cast where they are
/// actually consumed.
pub(crate) fn read_table(path: &Path) -> Result<DataFrame, AtlasError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("parquet") => {
            let file = File::open(path)?;
            let df = ParquetReader::new(file)
                .finish()?
                .lazy()
                .select([all().as_expr().cast(DataType::String)])
                .collect()?;
            Ok(trim_column_names(df)?)
        }
        _ => read_csv_as_strings(path, 0),
    }
}

/// Read a CSV file with all columns as String dtype, skipping `skip_rows`
/// leading rows before the header.
pub(crate) fn read_csv_as_strings(path: &Path, skip_rows: usize) -> Result<DataFrame, AtlasError> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_skip_rows(skip_rows)
        .with_infer_schema_length(Some(0)) // all columns as String
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(trim_column_names(df)?)
}

fn trim_column_names(mut df: DataFrame) -> Result<DataFrame, PolarsError> {
    let trimmed: Vec<String> = df
        .get_column_names_str()
        .iter()
        .map(|c| c.trim().to_string())
        .collect();
    df.set_column_names(trimmed.as_slice())?;
    Ok(df)
}

/// Fail with a schema error if any of the named columns is absent.
pub(crate) fn require_columns<S: AsRef<str>>(
    df: &DataFrame,
    required: &[S],
) -> Result<(), AtlasError> {
    for name in required {
        let name = name.as_ref();
        if df.column(name).is_err() {
            return Err(AtlasError::MissingColumn(name.to_string()));
        }
    }
    Ok(())
}

/// Fail if the given key columns do not uniquely identify every row.
///
/// A duplicate key would fan rows out through a left join, silently
/// duplicating facility rows downstream, so it is rejected at load time.
pub(crate) fn ensure_unique_keys(
    df: &DataFrame,
    keys: &[&str],
    source: &str,
) -> Result<(), AtlasError> {
    let dupes = df
        .clone()
        .lazy()
        .group_by(keys.iter().map(|k| col(*k)).collect::<Vec<_>>())
        .agg([len().alias("_rows")])
        .filter(col("_rows").gt(lit(1)))
        .collect()?;

    if dupes.height() > 0 {
        return Err(AtlasError::Validation(format!(
            "{} duplicate ({}) keys in {}; each key must map to exactly one row",
            dupes.height(),
            keys.join(", "),
            source
        )));
    }
    Ok(())
}
