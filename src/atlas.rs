use std::path::PathBuf;

use polars::prelude::*;
use tracing::info;

use crate::boundary::BoundaryRepository;
use crate::directory::{build_directory, Municipality};
use crate::error::AtlasError;
use crate::facilities::load_facilities;
use crate::normalize::normalize_key;
use crate::population::{load_population, population_totals, sum_columns, PopulationTotals};
use crate::schema::{facility, population};

/// Entity code of Hidalgo, the state the source datasets cover.
pub const HIDALGO_ENTITY_CODE: &str = "13";

/// Source locations for one atlas load.
#[derive(Debug, Clone)]
pub struct Config {
    pub base_path: PathBuf,
    /// State-entity code the boundary dataset is filtered to.
    pub entity_code: String,
    pub facilities_file: String,
    pub facilities_ssh_file: String,
    pub schedules_file: String,
    pub population_file: String,
    pub boundaries_file: String,
}

impl Config {
    pub fn new(base_path: impl Into<PathBuf>, entity_code: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            entity_code: entity_code.into(),
            facilities_file: "establecimientos.csv".to_string(),
            facilities_ssh_file: "establecimientos_ssh.csv".to_string(),
            schedules_file: "horarios.csv".to_string(),
            population_file: "reporte_poblacion.csv".to_string(),
            boundaries_file: "municipios.geojson".to_string(),
        }
    }
}

/// Per-scope summary figures shown on the dashboard cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MunicipalityStats {
    /// Distinct non-null facility codes in scope.
    pub facility_count: usize,
    pub male_total: i64,
    pub female_total: i64,
    pub population_total: i64,
}

/// The loaded, reconciled dataset behind the dashboard.
///
/// Constructed once from the raw sources and queried read-only afterwards;
/// pass it by reference to whatever serves the UI. All query operations are
/// synchronous computations over the in-memory tables and degrade to empty
/// results on lookup misses.
pub struct Atlas {
    facilities: DataFrame,
    directory: Vec<Municipality>,
    population: DataFrame,
    boundaries: BoundaryRepository,
}

impl Atlas {
    /// Load and reconcile all four sources. Any schema mismatch or join
    /// ambiguity fails here, before a single query runs.
    pub fn load(config: &Config) -> Result<Self, AtlasError> {
        info!(base = %config.base_path.display(), "loading health-facility atlas");

        let facilities = load_facilities(
            &config.base_path.join(&config.facilities_file),
            &config.base_path.join(&config.facilities_ssh_file),
            &config.base_path.join(&config.schedules_file),
        )?;
        let directory = build_directory(&facilities)?;
        let population = load_population(&config.base_path.join(&config.population_file))?;
        let boundaries = BoundaryRepository::load(
            &config.base_path.join(&config.boundaries_file),
            &config.entity_code,
        )?;

        info!(
            facilities = facilities.height(),
            municipalities = directory.len(),
            boundaries = boundaries.len(),
            "atlas ready"
        );

        Ok(Self {
            facilities,
            directory,
            population,
            boundaries,
        })
    }

    /// The municipality directory in first-seen order.
    pub fn municipalities(&self) -> &[Municipality] {
        &self.directory
    }

    /// Municipality names only, in directory order.
    pub fn list_municipalities(&self) -> Vec<&str> {
        self.directory.iter().map(|m| m.name.as_str()).collect()
    }

    /// The unified facility table, optionally filtered to one municipality.
    ///
    /// A name that cannot be normalized (empty input) behaves like any other
    /// lookup miss and yields an empty table.
    pub fn facility_rows(&self, municipality: Option<&str>) -> Result<DataFrame, AtlasError> {
        match municipality {
            None => Ok(self.facilities.clone()),
            Some(name) => {
                let Ok(key) = normalize_key(name) else {
                    return Ok(self.facilities.clear());
                };
                Ok(self
                    .facilities
                    .clone()
                    .lazy()
                    .filter(col(facility::MUNICIPIO).eq(lit(key)))
                    .collect()?)
            }
        }
    }

    /// The aggregated cohort row for one municipality, `None` if the census
    /// has no data for it or the name cannot be normalized.
    pub fn population_row(&self, municipality: &str) -> Result<Option<DataFrame>, AtlasError> {
        let Ok(key) = normalize_key(municipality) else {
            return Ok(None);
        };
        let row = self
            .population
            .clone()
            .lazy()
            .filter(col(population::MUNICIPIO).eq(lit(key)))
            .collect()?;
        Ok(if row.height() == 0 { None } else { Some(row) })
    }

    /// Dashboard card figures for one municipality. A census miss yields zero
    /// population figures rather than an error.
    pub fn municipality_stats(&self, municipality: &str) -> Result<MunicipalityStats, AtlasError> {
        let rows = self.facility_rows(Some(municipality))?;
        let facility_count = distinct_facility_codes(&rows)?;

        let (male_total, female_total) = match self.population_row(municipality)? {
            Some(row) => (
                sum_columns(&row, &population::male_columns())?,
                sum_columns(&row, &population::female_columns())?,
            ),
            None => (0, 0),
        };

        Ok(MunicipalityStats {
            facility_count,
            male_total,
            female_total,
            population_total: male_total + female_total,
        })
    }

    /// Dashboard card figures for the whole state.
    pub fn overview_stats(&self) -> Result<MunicipalityStats, AtlasError> {
        let facility_count = distinct_facility_codes(&self.facilities)?;
        let totals = self.population_totals()?;
        Ok(MunicipalityStats {
            facility_count,
            male_total: totals.male,
            female_total: totals.female,
            population_total: totals.total,
        })
    }

    /// State-wide population totals.
    pub fn population_totals(&self) -> Result<PopulationTotals, AtlasError> {
        population_totals(&self.population)
    }

    /// Municipality boundary as a GeoJSON feature, `None` on lookup miss.
    pub fn boundary_for(&self, municipality: &str) -> Option<geojson::Feature> {
        self.boundaries.boundary_for(municipality)
    }

    /// Map-centering `(lat, lon)` for a municipality, `None` on lookup miss.
    pub fn centroid_for(&self, municipality: &str) -> Option<(f64, f64)> {
        self.boundaries.centroid_for(municipality)
    }

    /// Write the facility table (filtered or full) as CSV restricted to the
    /// download columns: code, jurisdiction, name, operating hours.
    pub fn export_facilities<W: std::io::Write>(
        &self,
        municipality: Option<&str>,
        writer: W,
    ) -> Result<(), AtlasError> {
        let mut df = self.facility_rows(municipality)?.select(facility::EXPORT)?;
        CsvWriter::new(writer).finish(&mut df)?;
        Ok(())
    }
}

fn distinct_facility_codes(df: &DataFrame) -> Result<usize, AtlasError> {
    let codes = df
        .column(facility::CLUES)?
        .as_materialized_series()
        .drop_nulls();
    Ok(codes.n_unique()?)
}
