use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

static RE_INTEGER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(BIG|SMALL)INT|INTEGER|\bINT\b|BOOL").unwrap());
static RE_NUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"NUMERIC|DECIMAL|DEC\s*\(").unwrap());
static RE_REAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"DOUBLE|FLOAT|REAL").unwrap());
static RE_BLOB: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"BINARY|BLOB|VARBINARY").unwrap());

/// One of SQLite's five column affinities.
///
/// The affinity picks the declared column type in `CREATE TABLE` and decides the literal form of
/// each cell (raw numeric text, quoted string, or blob).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affinity {
    Blob,
    Numeric,
    Integer,
    Real,
    Text,
}

impl Affinity {
    /// Whether cells of this affinity are emitted as raw unquoted text.
    pub fn is_numeric(self) -> bool {
        matches!(self, Affinity::Integer | Affinity::Real | Affinity::Numeric)
    }
}

impl fmt::Display for Affinity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Affinity::Blob => "BLOB",
            Affinity::Numeric => "NUMERIC",
            Affinity::Integer => "INTEGER",
            Affinity::Real => "REAL",
            Affinity::Text => "TEXT",
        };

        f.write_str(name)
    }
}

/// Maps SIARD type strings (`INTEGER`, `VARCHAR(32)`, `TIMESTAMP(6)`, …) to SQLite affinities.
///
/// The regex pass dominates per-cell work on wide tables, so results are memoized by exact type
/// string. The cache is run-scoped: one mapper lives in each run context and is dropped with it.
#[derive(Debug, Default)]
pub struct TypeMapper {
    // Emission is single-threaded; the RefCell lets lookups stay `&self`.
    cache: RefCell<HashMap<String, Affinity>>,
}

impl TypeMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// The SQLite affinity for a SIARD type string, by first matching rule.
    ///
    /// Match order is fixed: INTEGER, NUMERIC, REAL, BLOB, then TEXT as the default. The patterns
    /// are case-sensitive; SIARD canonical type names are uppercase.
    pub fn affinity_of(&self, siard_type: &str) -> Affinity {
        if let Some(&affinity) = self.cache.borrow().get(siard_type) {
            return affinity;
        }

        let affinity = if RE_INTEGER.is_match(siard_type) {
            Affinity::Integer
        } else if RE_NUMERIC.is_match(siard_type) {
            Affinity::Numeric
        } else if RE_REAL.is_match(siard_type) {
            Affinity::Real
        } else if RE_BLOB.is_match(siard_type) {
            Affinity::Blob
        } else {
            Affinity::Text
        };

        self.cache
            .borrow_mut()
            .insert(siard_type.to_string(), affinity);

        affinity
    }
}
