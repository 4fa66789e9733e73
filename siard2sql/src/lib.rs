//! Translate SIARD relational database archives into SQLite-compliant SQL.
//!
//! [SIARD](https://dilcis.eu/content-types/siard) (Software Independent Archiving of Relational
//! Databases) is a ZIP container holding an XML description of a relational database plus
//! per-table XML data files and optional external LOB files. This library turns such an archive
//! into a self-contained SQL script that, fed to SQLite, recreates the schemas, tables, primary
//! keys, unique indexes and row data of the original database. Complex SIARD types (distinct,
//! user-defined, arrays) are flattened into JSON-producing SQL expressions; external and inline
//! binary objects become SQLite blob literals.
//!
//! ```no_run
//! use siard2sql::TranslateOptions;
//!
//! fn main() -> siard2sql::Result<()> {
//!     let mut sql = Vec::new();
//!
//!     siard2sql::translate(
//!         "archive.siard",
//!         &mut sql,
//!         &TranslateOptions::new().schema_filter("public"),
//!     )?;
//!
//!     Ok(())
//! }
//! ```
//!
//! The input may also be a directory containing an unzipped archive (`header/metadata.xml` and
//! `content/…`). LOB files referenced by the archive may live inside nested ZIP containers; the
//! archive accessor peels those layers transparently. Use [`summarize`] to inspect an archive's
//! schemas without translating it.

mod affinity;
mod archive;
mod content;
mod decode;
mod error;
mod lob;
mod metadata;
mod translate;
mod types;
mod util;
mod workspace;
mod xml;

pub use archive::UnzipMode;
pub use error::{Error, Result};
pub use metadata::SchemaStats;
pub use translate::{summarize, translate, SchemaSummary, Summary, TranslateOptions};
