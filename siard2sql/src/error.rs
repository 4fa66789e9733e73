use std::io;
use std::path::PathBuf;
use std::result;

use thiserror::Error;

/// The error type for siard2sql.
///
/// This type can be converted [`From`] an [`std::io::Error`]. If the value the [`std::io::Error`]
/// wraps can be downcast into a [`siard2sql::Error`], it will be. Otherwise, it will be converted
/// into a new [`siard2sql::Error::Io`].
///
/// [`siard2sql::Error`]: crate::Error
/// [`siard2sql::Error::Io`]: crate::Error::Io
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The SIARD input was not found or is not readable.
    #[error("This SIARD file or directory was not found: {path}")]
    SiardNotFound {
        /// The path of the SIARD input that was not found.
        path: PathBuf,
    },

    /// An archive crossed by a layered URI could not be opened.
    #[error("This archive could not be opened: {path}")]
    ArchiveNotFound {
        /// The path of the archive that could not be opened.
        path: PathBuf,
    },

    /// A member named by a layered URI does not exist in its archive.
    #[error("This entry was not found in archive {archive}: {entry}")]
    EntryNotFound {
        /// The archive that was searched.
        archive: PathBuf,

        /// The member path that was not found.
        entry: String,
    },

    /// An archive member could not be decompressed.
    #[error("Failed decompressing entry {entry} of archive {archive}: {reason}")]
    DecompressionFailed {
        /// The archive the member belongs to.
        archive: PathBuf,

        /// The member that failed to decompress.
        entry: String,

        /// Additional context about the error.
        ///
        /// This text is meant for humans and should not be parsed.
        reason: String,
    },

    /// The schema filter is not a valid regular expression.
    #[error("The schema filter is not a valid regular expression: {reason}")]
    InvalidRegex {
        /// The reason the expression was rejected.
        reason: String,
    },

    /// The archive metadata (`header/metadata.xml`) could not be loaded.
    #[error("Failed loading the archive metadata: {path}")]
    MetadataLoad {
        /// The path of the metadata file that could not be loaded.
        path: PathBuf,
    },

    /// An XML document could not be parsed.
    #[error("Malformed XML: {reason}")]
    Xml {
        /// The parser's description of the problem.
        ///
        /// This text is meant for humans and should not be parsed.
        reason: String,
    },

    /// The per-run workspace directory could not be created or removed.
    #[error("The workspace directory could not be set up or torn down: {path}")]
    Workspace {
        /// The path of the workspace directory.
        path: PathBuf,
    },

    /// An I/O error occurred.
    #[error("An I/O error occurred: {kind}")]
    Io {
        /// The [`std::io::ErrorKind`] of the I/O error.
        kind: io::ErrorKind,
    },
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        let kind = error.kind();
        match error.into_inner() {
            Some(payload) => match payload.downcast::<Error>() {
                Ok(crate_error) => *crate_error,
                Err(_) => Error::Io { kind },
            },
            None => Error::Io { kind },
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        // Don't use a default match arm here. We want to be explicit about how we're mapping
        // variants to `io::ErrorKind` variants and make sure we remember to update this when we
        // add new ones.
        let kind = match err {
            Error::SiardNotFound { .. } => io::ErrorKind::NotFound,
            Error::ArchiveNotFound { .. } => io::ErrorKind::NotFound,
            Error::EntryNotFound { .. } => io::ErrorKind::NotFound,
            Error::DecompressionFailed { .. } => io::ErrorKind::InvalidData,
            Error::InvalidRegex { .. } => io::ErrorKind::InvalidInput,
            Error::MetadataLoad { .. } => io::ErrorKind::InvalidData,
            Error::Xml { .. } => io::ErrorKind::InvalidData,
            Error::Workspace { .. } => io::ErrorKind::Other,
            Error::Io { kind } => kind,
        };

        io::Error::new(kind, err)
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::Xml {
            reason: err.to_string(),
        }
    }
}

/// The result type for siard2sql.
pub type Result<T> = result::Result<T, Error>;
