use std::fs;
use std::io::Write;
use std::path::Path;

use regex::{Regex, RegexBuilder};

use crate::archive::{ArchiveStore, UnzipMode};
use crate::metadata::{Metadata, SchemaStats};
use crate::util::is_archive_name;
use crate::workspace::Workspace;

/// Options for translating a SIARD archive.
///
/// This is used with [`translate`].
#[derive(Debug, Clone)]
pub struct TranslateOptions {
    schema_filter: String,
    verbose: u8,
    unzip_mode: UnzipMode,
}

impl Default for TranslateOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl TranslateOptions {
    /// Create a new [`TranslateOptions`] with default settings.
    pub fn new() -> Self {
        Self {
            schema_filter: String::new(),
            verbose: 0,
            unzip_mode: UnzipMode::FileByFile,
        }
    }

    /// Only translate schemas whose name matches this regular expression.
    ///
    /// The match is case-insensitive and partial (`search` semantics). The default is `""`,
    /// which matches every schema.
    pub fn schema_filter<S: Into<String>>(mut self, filter: S) -> Self {
        self.schema_filter = filter.into();
        self
    }

    /// Raise the density of `--` comment lines in the SQL output.
    ///
    /// Level 0 emits only the version and schema-count header; 1 adds per-schema comments; 2
    /// adds per-table and per-column comments; 4 and above also annotate the row data.
    ///
    /// The default is `0`.
    pub fn verbose(mut self, verbose: u8) -> Self {
        self.verbose = verbose;
        self
    }

    /// Choose how the SIARD container is brought onto the filesystem.
    ///
    /// The default is [`UnzipMode::FileByFile`], extracting entries lazily as the translator
    /// asks for them.
    pub fn unzip_mode(mut self, mode: UnzipMode) -> Self {
        self.unzip_mode = mode;
        self
    }
}

/// Per-schema entry of a [`Summary`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaSummary {
    /// The schema name.
    pub name: String,

    /// Table/row/cell counts, from the metadata.
    pub stats: SchemaStats,
}

/// What `summarize` found in a SIARD archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
    /// The SIARD format version declared by the archive.
    pub version: String,

    /// Total number of schemas in the archive, before filtering.
    pub total_schemas: usize,

    /// The schemas matching the filter, in metadata order.
    pub schemas: Vec<SchemaSummary>,
}

/// Translate a SIARD archive into SQLite-compliant SQL on `out`.
///
/// `siard` is either a `.siard`/`.zip` file or a directory containing `header/metadata.xml` and
/// `content/`. The SQL statements are written in metadata order: per table, `CREATE TABLE`, then
/// all `INSERT INTO`, then the candidate keys as `CREATE UNIQUE INDEX`.
///
/// A workspace directory is created under `TMPDIR` for extracted archive members and removed
/// again before this function returns, on both the success and the error path.
///
/// # Errors
///
/// - [`SiardNotFound`]: There is no file or directory at `siard`.
/// - [`InvalidRegex`]: The schema filter is not a valid regular expression.
/// - [`MetadataLoad`] / [`Xml`]: `header/metadata.xml` is missing or malformed.
/// - [`ArchiveNotFound`] / [`EntryNotFound`] / [`DecompressionFailed`]: The container or one of
///   its nested archives could not be read.
/// - [`Io`]: Writing to `out` failed.
///
/// [`SiardNotFound`]: crate::Error::SiardNotFound
/// [`InvalidRegex`]: crate::Error::InvalidRegex
/// [`MetadataLoad`]: crate::Error::MetadataLoad
/// [`Xml`]: crate::Error::Xml
/// [`ArchiveNotFound`]: crate::Error::ArchiveNotFound
/// [`EntryNotFound`]: crate::Error::EntryNotFound
/// [`DecompressionFailed`]: crate::Error::DecompressionFailed
/// [`Io`]: crate::Error::Io
pub fn translate<P, W>(siard: P, out: &mut W, opts: &TranslateOptions) -> crate::Result<()>
where
    P: AsRef<Path>,
    W: Write,
{
    let filter = compile_filter(&opts.schema_filter)?;

    let workspace = Workspace::create()?;
    let mut store = ArchiveStore::new(workspace.path());

    let result = (|| {
        let root = resolve_root(siard.as_ref(), &mut store, opts.unzip_mode)?;
        let metadata = Metadata::load(&mut store, &root)?;
        metadata.to_sql(&mut store, &filter, opts.verbose, out)
    })();

    store.close_all();
    teardown(workspace);

    result
}

/// Summarize the schemas of a SIARD archive without translating it.
///
/// Only `header/metadata.xml` is extracted from a zipped archive. `schema_filter` follows the
/// same rules as [`TranslateOptions::schema_filter`]; pass `""` to include every schema.
///
/// # Errors
///
/// As [`translate`], minus the content-side errors.
pub fn summarize<P: AsRef<Path>>(siard: P, schema_filter: &str) -> crate::Result<Summary> {
    let filter = compile_filter(schema_filter)?;

    let workspace = Workspace::create()?;
    let mut store = ArchiveStore::new(workspace.path());

    let result = (|| {
        // Lazy resolution touches nothing but the metadata member.
        let root = resolve_root(siard.as_ref(), &mut store, UnzipMode::FileByFile)?;
        let metadata = Metadata::load(&mut store, &root)?;

        let names = metadata.schema_names();
        let total_schemas = names.len();

        let schemas = names
            .into_iter()
            .filter(|name| filter.is_match(name))
            .map(|name| {
                let stats = metadata.schema_stats(&name).unwrap_or_default();
                SchemaSummary { name, stats }
            })
            .collect();

        Ok(Summary {
            version: metadata.version().to_string(),
            total_schemas,
            schemas,
        })
    })();

    store.close_all();
    teardown(workspace);

    result
}

fn compile_filter(filter: &str) -> crate::Result<Regex> {
    RegexBuilder::new(filter)
        .case_insensitive(true)
        .build()
        .map_err(|err| crate::Error::InvalidRegex {
            reason: err.to_string(),
        })
}

// Turn the SIARD input into a root URI for the archive accessor: a directory is used in place,
// an archive either becomes a lazily peeled URI root or is extracted up front.
fn resolve_root(
    siard: &Path,
    store: &mut ArchiveStore,
    mode: UnzipMode,
) -> crate::Result<String> {
    let canonical = fs::canonicalize(siard).map_err(|_| crate::Error::SiardNotFound {
        path: siard.to_path_buf(),
    })?;

    if canonical.is_dir() {
        return Ok(canonical.to_string_lossy().into_owned());
    }

    let lazy = mode == UnzipMode::FileByFile
        && canonical
            .file_name()
            .map(|name| is_archive_name(&name.to_string_lossy()))
            .unwrap_or(false);

    if lazy {
        Ok(canonical.to_string_lossy().into_owned())
    } else {
        // Full unzip, or an archive whose name the layered resolver wouldn't recognize.
        let root = store.extract_all(&canonical)?;
        Ok(root.to_string_lossy().into_owned())
    }
}

fn teardown(workspace: Workspace) {
    if let Err(err) = workspace.remove() {
        tracing::warn!(error = %err, "failed removing the workspace directory");
    }
}
