use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use zip::result::ZipError;
use zip::ZipArchive;

use crate::util::is_archive_name;

/// Delete a materialized member right after its consumer reads it (FILE_BY_FILE mode only).
/// Saves disk on LOB-heavy archives at the cost of re-extraction on a second access.
pub const EAGER_DELETE: bool = false;

/// How the SIARD container is brought onto the filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnzipMode {
    /// Extract the entire archive into the workspace up front.
    FullUnzip,

    /// Extract entries lazily, as the translator asks for them.
    #[default]
    FileByFile,
}

/// Cached, layered access to archives named by a SIARD URI.
///
/// A URI like `/data/db.siard/content/lobs.zip/lob0` crosses two archive boundaries: the segment
/// ending in `.siard` is an archive on disk, and `content/lobs.zip` is an archive stored inside
/// it. [`ArchiveStore::resolve`] peels these layers one at a time, materializing members into the
/// workspace on demand, and hands back a concrete filesystem path.
///
/// Open archives are cached by canonicalized path; the `zip` crate builds the member index in one
/// pass over the central directory on first open. Extracted members are cached on disk under a
/// per-archive workspace subdirectory, so tens of thousands of small LOB reads against the same
/// container amortize to one open and one extraction each.
#[derive(Debug)]
pub struct ArchiveStore {
    workspace: PathBuf,
    archives: HashMap<PathBuf, ZipArchive<File>>,
    subdirs: HashMap<PathBuf, PathBuf>,
    next_subdir: u64,
}

impl ArchiveStore {
    /// Create a store that materializes members under `workspace`.
    pub fn new<P: AsRef<Path>>(workspace: P) -> Self {
        ArchiveStore {
            workspace: workspace.as_ref().to_path_buf(),
            archives: HashMap::new(),
            subdirs: HashMap::new(),
            next_subdir: 0,
        }
    }

    /// Resolve a possibly layered URI to a local filesystem path.
    ///
    /// A path that exists on disk is returned verbatim (this covers plain directories, already
    /// materialized members, and URIs with no archive segment at all). Otherwise the longest
    /// leading prefix that exists is walked segment by segment until an archive file is found;
    /// the remainder names a member, which may itself cross further archive boundaries.
    ///
    /// # Errors
    ///
    /// - [`ArchiveNotFound`]: A prefix of the URI does not exist on disk, or an archive on the
    ///   way could not be opened.
    /// - [`EntryNotFound`]: An archive on the way has no member with the remaining path.
    /// - [`DecompressionFailed`]: A member could not be decompressed.
    ///
    /// [`ArchiveNotFound`]: crate::Error::ArchiveNotFound
    /// [`EntryNotFound`]: crate::Error::EntryNotFound
    /// [`DecompressionFailed`]: crate::Error::DecompressionFailed
    pub fn resolve(&mut self, uri: &str) -> crate::Result<PathBuf> {
        let direct = Path::new(uri);
        if direct.exists() {
            return Ok(direct.to_path_buf());
        }

        let mut outer = if uri.starts_with('/') {
            PathBuf::from("/")
        } else {
            PathBuf::new()
        };

        let segments: Vec<&str> = uri.split('/').filter(|s| !s.is_empty()).collect();

        for (i, segment) in segments.iter().enumerate() {
            outer.push(segment);

            if outer.is_file() {
                if is_archive_name(segment) {
                    return self.resolve_member(&outer, &segments[i + 1..]);
                }

                // A regular file with trailing segments: nothing to descend into.
                return Err(crate::Error::ArchiveNotFound { path: outer });
            }

            if !outer.exists() {
                return Err(crate::Error::ArchiveNotFound { path: outer });
            }
        }

        // Every segment existed, so the `direct` check above would have caught this; reaching
        // here means the URI was empty.
        Err(crate::Error::ArchiveNotFound {
            path: PathBuf::from(uri),
        })
    }

    // Resolve `member_segments` inside the archive at `archive`. An intermediate segment with an
    // archive suffix is probed as a member first; if the archive has no such member it is a
    // directory inside the archive and gets concatenated with the following segments instead.
    fn resolve_member(
        &mut self,
        archive: &Path,
        member_segments: &[&str],
    ) -> crate::Result<PathBuf> {
        let canonical = fs::canonicalize(archive).map_err(|_| crate::Error::ArchiveNotFound {
            path: archive.to_path_buf(),
        })?;

        if member_segments.is_empty() {
            return Ok(canonical);
        }

        for (i, segment) in member_segments.iter().enumerate() {
            let is_last = i + 1 == member_segments.len();

            if !is_last && is_archive_name(segment) {
                match self.extract_entry(&canonical, &member_segments[..=i].join("/")) {
                    Ok(inner) => {
                        let rest = member_segments[i + 1..].join("/");
                        let uri = format!("{}/{}", inner.display(), rest);
                        return self.resolve(&uri);
                    }
                    // Not a member after all; treat the segment as a directory inside the
                    // archive and keep scanning.
                    Err(crate::Error::EntryNotFound { .. }) => continue,
                    Err(err) => return Err(err),
                }
            }
        }

        self.extract_entry(&canonical, &member_segments.join("/"))
    }

    /// Extract a single member of `archive` into the workspace and return its path.
    ///
    /// The extraction is cached: a member that is already materialized is returned as-is.
    pub fn extract_entry(&mut self, archive: &Path, member: &str) -> crate::Result<PathBuf> {
        let canonical = fs::canonicalize(archive).map_err(|_| crate::Error::ArchiveNotFound {
            path: archive.to_path_buf(),
        })?;

        let dest = self.subdir_for(&canonical)?.join(member);
        if dest.exists() {
            return Ok(dest);
        }

        let zip = open_cached(&mut self.archives, &canonical)?;

        let mut entry = match zip.by_name(member) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(crate::Error::EntryNotFound {
                    archive: canonical,
                    entry: member.to_string(),
                })
            }
            Err(err) => {
                return Err(crate::Error::DecompressionFailed {
                    archive: canonical,
                    entry: member.to_string(),
                    reason: err.to_string(),
                })
            }
        };

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut out = File::create(&dest)?;
        io::copy(&mut entry, &mut out).map_err(|err| crate::Error::DecompressionFailed {
            archive: canonical.clone(),
            entry: member.to_string(),
            reason: err.to_string(),
        })?;

        tracing::debug!(
            archive = %canonical.display(),
            member,
            "materialized archive member"
        );

        Ok(dest)
    }

    /// Extract every member of `archive` into a workspace subdirectory and return its root.
    pub fn extract_all(&mut self, archive: &Path) -> crate::Result<PathBuf> {
        let canonical = fs::canonicalize(archive).map_err(|_| crate::Error::ArchiveNotFound {
            path: archive.to_path_buf(),
        })?;

        let dest = self.subdir_for(&canonical)?;
        let zip = open_cached(&mut self.archives, &canonical)?;

        zip.extract(&dest)
            .map_err(|err| crate::Error::DecompressionFailed {
                archive: canonical.clone(),
                entry: String::new(),
                reason: err.to_string(),
            })?;

        tracing::debug!(archive = %canonical.display(), dest = %dest.display(), "archive fully extracted");

        Ok(dest)
    }

    /// Delete a materialized member after consumption, when [`EAGER_DELETE`] is on.
    ///
    /// Only paths inside the workspace are touched; failures are ignored (the workspace teardown
    /// removes everything anyway).
    pub fn discard(&self, path: &Path) {
        if EAGER_DELETE && path.starts_with(&self.workspace) {
            let _ = fs::remove_file(path);
        }
    }

    /// Number of archives currently open.
    pub fn open_archives(&self) -> usize {
        self.archives.len()
    }

    /// Close every cached archive. Called exactly once at teardown.
    pub fn close_all(&mut self) {
        let count = self.archives.len();
        self.archives.clear();

        if count > 0 {
            tracing::debug!(count, "closed cached archives");
        }
    }

    // The workspace subdirectory holding members extracted from `canonical`. Keyed per archive so
    // that identically named members of different containers don't collide.
    fn subdir_for(&mut self, canonical: &Path) -> crate::Result<PathBuf> {
        if let Some(dir) = self.subdirs.get(canonical) {
            return Ok(dir.clone());
        }

        let dir = self.workspace.join(format!("arc{}", self.next_subdir));
        self.next_subdir += 1;

        fs::create_dir_all(&dir)?;
        self.subdirs.insert(canonical.to_path_buf(), dir.clone());

        Ok(dir)
    }
}

fn open_cached<'a>(
    archives: &'a mut HashMap<PathBuf, ZipArchive<File>>,
    canonical: &Path,
) -> crate::Result<&'a mut ZipArchive<File>> {
    match archives.entry(canonical.to_path_buf()) {
        Entry::Occupied(entry) => Ok(entry.into_mut()),
        Entry::Vacant(slot) => {
            let file = File::open(canonical).map_err(|_| crate::Error::ArchiveNotFound {
                path: canonical.to_path_buf(),
            })?;

            let zip = ZipArchive::new(file).map_err(|_| crate::Error::ArchiveNotFound {
                path: canonical.to_path_buf(),
            })?;

            tracing::debug!(
                archive = %canonical.display(),
                members = zip.len(),
                "opened archive"
            );

            Ok(slot.insert(zip))
        }
    }
}
