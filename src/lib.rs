//! Data-integration pipeline behind a municipal health-facility dashboard.
//!
//! Merges three facility registry sources, a population census report and a
//! municipal boundary dataset into reconciled in-memory tables, joined on
//! municipality names folded to one canonical form. [`Atlas`] is the query
//! surface the UI layer consumes: municipality directory, filtered facility
//! rows, cohort rows and summary stats, boundary geometry and centroids, and
//! CSV export.

mod atlas;
mod boundary;
mod directory;
mod error;
mod facilities;
mod normalize;
mod population;
pub mod schema;
mod table;

#[cfg(test)]
pub(crate) mod testutil {
    /// Route `tracing` output through the test harness so data-quality
    /// warnings from the loaders are visible in failing tests. Safe to call
    /// from every fixture; repeat initialization is ignored.
    pub(crate) fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }
}

pub use atlas::{Atlas, Config, MunicipalityStats, HIDALGO_ENTITY_CODE};
pub use boundary::{clean_map_artifacts, BoundaryRepository};
pub use directory::Municipality;
pub use error::AtlasError;
pub use normalize::normalize_key;
pub use population::PopulationTotals;
