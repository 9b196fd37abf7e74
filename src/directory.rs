use std::collections::HashSet;

use polars::prelude::*;

use crate::error::AtlasError;
use crate::schema::facility;

/// One entry of the municipality directory derived from the facility table.
///
/// Ids are dense, assigned in first-occurrence order, and stable only within
/// a single load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Municipality {
    pub id: u32,
    pub name: String,
}

/// Distinct municipality names of the unified facility table, in first-seen
/// order, with sequential ids starting at 1.
pub fn build_directory(facilities: &DataFrame) -> Result<Vec<Municipality>, AtlasError> {
    let names = facilities
        .column(facility::MUNICIPIO)
        .map_err(|_| AtlasError::MissingColumn(facility::MUNICIPIO.to_string()))?
        .str()?;

    let mut seen = HashSet::new();
    let mut directory = Vec::new();
    for name in names.into_iter().flatten() {
        if seen.insert(name) {
            directory.push(Municipality {
                id: directory.len() as u32 + 1,
                name: name.to_string(),
            });
        }
    }
    Ok(directory)
}
