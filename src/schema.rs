/// Column-name constants for the salud-atlas sources.
/// Single source of truth for every join, filter and aggregation.

// ── Facility registry columns ───────────────────────────────────────────────
pub mod facility {
    pub const CLUES: &str = "CLUES";
    pub const CLUES_SSH: &str = "CLUES_SSH";
    pub const NOMBRE_UNIDAD: &str = "NOMBRE DE LA UNIDAD";
    pub const CLAVE_MUNICIPIO: &str = "CLAVE DEL MUNICIPIO";
    pub const CLAVE_LOCALIDAD: &str = "CLAVE DE LA LOCALIDAD";
    pub const MUNICIPIO: &str = "MUNICIPIO";
    pub const JURISDICCION: &str = "JURISDICCION";
    pub const HORARIO: &str = "HORARIO";

    /// Composite natural key joining the two facility registries.
    pub const JOIN_KEY: [&str; 3] = [NOMBRE_UNIDAD, CLAVE_MUNICIPIO, CLAVE_LOCALIDAD];

    /// Columns of the downloadable facility export, in order.
    pub const EXPORT: [&str; 4] = [CLUES, JURISDICCION, NOMBRE_UNIDAD, HORARIO];
}

// ── Population census columns ───────────────────────────────────────────────
pub mod population {
    pub const MUNICIPIO: &str = "Nombre Municipio Unidad";

    pub const MALE_PREFIX: &str = "h";
    pub const FEMALE_PREFIX: &str = "m";

    /// The 19 fixed age bands of the census report, youngest first.
    pub const AGE_BANDS: [&str; 19] = [
        "0-4 años",
        "5-9 años",
        "10-14 años",
        "15-19 años",
        "20-24 años",
        "25-29 años",
        "30-34 años",
        "35-39 años",
        "40-44 años",
        "45-49 años",
        "50-54 años",
        "55-59 años",
        "60-64 años",
        "65-69 años",
        "70-74 años",
        "75-79 años",
        "80-84 años",
        "85+ años",
        "indefinido",
    ];

    /// Administrative columns stripped before aggregation. Every name must be
    /// present in the source file; a miss is a schema error, not a no-op.
    pub const DROP: [&str; 14] = [
        "Clave Jurisdicción Unidad",
        "Nombre Jurisdicción Unidad",
        "Clave Jurisdicción Loc.",
        "ageb",
        "Clave Municipio Unidad",
        "CLUES",
        "Clave Localidad Unidad",
        "Nombre Localidad Unidad",
        "Nombre Unidad",
        "Nombre Jurisdicción Loc",
        "Clave Municipio Loc",
        "Nombre Municipio Loc",
        "Clave Localidad",
        "Nombre Localidad",
    ];

    pub fn male_column(band: &str) -> String {
        format!("{MALE_PREFIX}{band}")
    }

    pub fn female_column(band: &str) -> String {
        format!("{FEMALE_PREFIX}{band}")
    }

    pub fn male_columns() -> Vec<String> {
        AGE_BANDS.iter().map(|b| male_column(b)).collect()
    }

    pub fn female_columns() -> Vec<String> {
        AGE_BANDS.iter().map(|b| female_column(b)).collect()
    }

    /// All 38 demographic columns, male bands first.
    pub fn cohort_columns() -> Vec<String> {
        let mut cols = male_columns();
        cols.extend(female_columns());
        cols
    }
}

// ── Municipal boundary properties ───────────────────────────────────────────
pub mod boundary {
    pub const NOM_MUN: &str = "NOM_MUN";
    pub const CVE_ENT: &str = "CVE_ENT";
}
