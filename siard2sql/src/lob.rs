use std::collections::HashMap;

use crate::util::normalize_join;
use crate::xml::Element;

/// The folders resolved for one node of a column's field tree.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderEntry {
    /// The `<lobFolder>` text as declared on this node, after `file:` stripping.
    pub declared: String,

    /// The declared folder combined with the ancestors' accumulated folder.
    pub accumulated: String,

    /// The accumulated folder joined against the SIARD URI root and normalized, ready for the
    /// archive accessor.
    pub canonical: String,
}

/// Per-column index of `lobFolder` declarations, keyed by dotted tree-path.
///
/// The tree-path mirrors the position of a cell inside nested composite values: `"/col"` for the
/// column itself, `"/col/attname"` for a udt field, `"/col/a1"` for the first array element, and
/// so on. The archive-wide `lobFolder` seeds the root path `""` and flows down to every node that
/// doesn't override it.
#[derive(Debug, Clone, Default)]
pub struct LobFolderInfo {
    folders: HashMap<String, FolderEntry>,
}

impl LobFolderInfo {
    /// Build the index for one column.
    ///
    /// `archive_lobfolder` is the `<lobFolder>` declared on `siardArchive` itself, or `""`.
    pub fn build(
        siard_root: &str,
        column_name: &str,
        column_xml: &Element,
        archive_lobfolder: &str,
    ) -> Self {
        let mut info = LobFolderInfo::default();
        let mut root_accumulated = String::new();

        if !archive_lobfolder.is_empty() {
            let declared = strip_file_scheme(archive_lobfolder).to_string();
            root_accumulated = declared.clone();

            info.folders.insert(
                String::new(),
                FolderEntry {
                    canonical: canonical(siard_root, &declared),
                    accumulated: declared.clone(),
                    declared,
                },
            );
        }

        let tree_path = format!("/{}", rename_array_field(column_name));
        info.walk(siard_root, column_xml, tree_path, &root_accumulated);

        info
    }

    fn walk(&mut self, siard_root: &str, node: &Element, tree_path: String, parent: &str) {
        let declared = strip_file_scheme(node.child_text("lobFolder")).to_string();
        let accumulated = combine(parent, &declared);

        if !accumulated.is_empty() {
            self.folders.insert(
                tree_path.clone(),
                FolderEntry {
                    canonical: canonical(siard_root, &accumulated),
                    accumulated: accumulated.clone(),
                    declared,
                },
            );
        }

        if let Some(fields) = node.child("fields") {
            for field in fields.children_named("field") {
                let name = rename_array_field(field.child_text("name"));
                let child_path = format!("{tree_path}/{name}");
                self.walk(siard_root, field, child_path, &accumulated);
            }
        }
    }

    /// The canonical folder for the given tree-path, or `""` if no `lobFolder` applies there.
    pub fn real_folder_for(&self, tree_path: &str) -> &str {
        self.folders
            .get(tree_path)
            .map(|entry| entry.canonical.as_str())
            .unwrap_or("")
    }

    /// The raw entry for a tree-path, if any folder applies there.
    pub fn entry(&self, tree_path: &str) -> Option<&FolderEntry> {
        self.folders.get(tree_path)
    }
}

/// Combine a parent's accumulated folder with a declared folder.
pub fn combine(parent: &str, declared: &str) -> String {
    if declared.starts_with('/') {
        declared.to_string()
    } else if parent.is_empty() {
        declared.to_string()
    } else if declared.is_empty() {
        parent.to_string()
    } else {
        format!("{parent}/{declared}")
    }
}

// SIARD writers commonly emit lobFolder as a file: URI. Strip the scheme and let the residue
// follow the ordinary absolute/relative rules.
fn strip_file_scheme(declared: &str) -> &str {
    declared
        .strip_prefix("file://")
        .or_else(|| declared.strip_prefix("file:"))
        .unwrap_or(declared)
}

fn canonical(siard_root: &str, accumulated: &str) -> String {
    normalize_join(siard_root, accumulated)
        .to_string_lossy()
        .into_owned()
}

// Array fields are declared as `name[N]` in metadata but tagged `<aN>` in content files; the
// tree-path uses the content form.
fn rename_array_field(name: &str) -> String {
    if let Some(open) = name.rfind('[') {
        if let Some(index) = name[open + 1..].strip_suffix(']') {
            if !index.is_empty() && index.bytes().all(|b| b.is_ascii_digit()) {
                return format!("a{index}");
            }
        }
    }

    name.to_string()
}
