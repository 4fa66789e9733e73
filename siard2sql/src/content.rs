use std::io::Write;

use crate::affinity::{Affinity, TypeMapper};
use crate::archive::ArchiveStore;
use crate::decode;
use crate::lob::LobFolderInfo;
use crate::types::{DataTypeTable, TypeCategory};
use crate::util::normalize_join;
use crate::xml::{Document, Element};

/// Recursion limit for nested composite values. SIARD leaves cyclic type graphs undefined, but
/// they are possible to construct; bailing out beats unbounded recursion.
const MAX_DEPTH: u32 = 64;

/// Everything the metadata walker resolved about one column, ready for row emission.
#[derive(Debug)]
pub(crate) struct ColumnSpec {
    pub name: String,
    pub attr: crate::types::TypeAttribute,
    pub affinity: Affinity,
    pub complex: bool,
    pub lob: LobFolderInfo,
}

/// Formats the cells of one table into `INSERT INTO` statements.
///
/// Holds shared references to the run's type registry and mapper, and mutable access to the
/// archive store for LOB materialization. Dispatch is uniform: every cell is either simple
/// (formatted directly by affinity) or a `(schema, name)` reference into the registry, where
/// arrays become `json_array(…)`, udts become `json_object(…)` and distinct wrappers recurse on
/// their base type.
pub(crate) struct Emitter<'a> {
    pub types: &'a DataTypeTable,
    pub mapper: &'a TypeMapper,
    pub store: &'a mut ArchiveStore,
    pub root: &'a str,
}

impl<'a> Emitter<'a> {
    /// Emit one `INSERT INTO` per `<row>` of a parsed content document.
    pub(crate) fn emit_rows<W: Write>(
        &mut self,
        doc: &Document,
        table_name: &str,
        columns: &[ColumnSpec],
        verbose: u8,
        out: &mut W,
    ) -> crate::Result<()> {
        if verbose > 0 {
            let version = doc.root().attr_or("version", "unknown");
            writeln!(out, "-- table name={table_name} version={version}")?;
        }

        let rows = doc.root().find_all("row", 2);

        if verbose > 1 {
            writeln!(out, "-- no. of rows={}", rows.len())?;
        }

        for row in rows {
            let mut stmt = format!("INSERT INTO '{table_name}' VALUES (\n");

            for (i, column) in columns.iter().enumerate() {
                let tag = format!("c{}", i + 1);
                let cell = row.child(&tag);
                let tree_path = format!("/{}", column.name);

                if column.complex {
                    let (schema, name) = column.attr.type_ref();
                    self.complex(cell, schema, name, 0, &tree_path, &column.lob, &mut stmt);
                } else {
                    self.simple(column.affinity, cell, &column.lob, &tree_path, false, &mut stmt);
                }

                if i + 1 < columns.len() {
                    stmt.push_str(",\n");
                }
            }

            stmt.push_str(");\n");
            out.write_all(stmt.as_bytes())?;
        }

        Ok(())
    }

    /// Format a simple cell.
    ///
    /// A `file` attribute turns the cell into a blob literal read through the archive accessor;
    /// inline text is emitted raw for numeric affinities, quoted when it carries no SIARD
    /// escapes, and decoded into a blob-cast otherwise. `textify` forces the TEXT cast on LOB
    /// content regardless of affinity (always the case inside JSON wrappers).
    fn simple(
        &mut self,
        affinity: Affinity,
        cell: Option<&Element>,
        lob: &LobFolderInfo,
        tree_path: &str,
        textify: bool,
        out: &mut String,
    ) {
        let Some(cell) = cell else {
            out.push_str("''");
            return;
        };

        if let Some(file) = cell.attr("file") {
            let folder = lob.real_folder_for(tree_path);
            let base = if folder.is_empty() { self.root } else { folder };
            let lob_uri = normalize_join(base, file).to_string_lossy().into_owned();

            let literal = self.materialize(&lob_uri);

            if affinity == Affinity::Text || textify {
                out.push_str("CAST(");
                out.push_str(&literal);
                out.push_str(" AS TEXT)");
            } else {
                out.push_str(&literal);
            }

            return;
        }

        let text = cell.text();

        if affinity.is_numeric() {
            out.push_str(text);
        } else if !decode::needs_decode(text) {
            out.push_str(&decode::sqlite_quote(text));
        } else {
            // The decoded payload may contain 0x00, so it cannot travel as a quoted string.
            out.push_str(&decode::cast_blob_as_text(&decode::decode(text)));
        }
    }

    /// Format a cell whose declared type is (or may be) registered in the data-type table.
    fn complex(
        &mut self,
        cell: Option<&Element>,
        schema: &str,
        name: &str,
        depth: u32,
        tree_path: &str,
        lob: &LobFolderInfo,
        out: &mut String,
    ) {
        // An entirely absent element is a NULL value, no matter how composite its type.
        if cell.is_none() {
            out.push_str("''");
            return;
        }

        if depth >= MAX_DEPTH {
            tracing::warn!(schema, name, tree_path, "composite value exceeds depth limit");
            out.push_str("''");
            return;
        }

        // Copy the shared registry reference out of `self` so the borrow doesn't tie up the
        // emitter across the recursive calls below.
        let types: &'a DataTypeTable = self.types;

        let Some(node) = types.lookup(schema, name) else {
            // Not a registered complex type: `name` is a simple SIARD type string.
            let affinity = self.mapper.affinity_of(name);
            self.simple(affinity, cell, lob, tree_path, true, out);
            return;
        };

        match node.category {
            TypeCategory::Array => {
                let Some(element) = node.synthetic_attribute() else {
                    out.push_str("''");
                    return;
                };

                let (inner_schema, inner_name) = element.type_ref();

                out.push_str("json_array(\n");

                for i in 1..=element.cardinality {
                    let tag = format!("a{i}");
                    let item_path = format!("{tree_path}/{tag}");

                    match cell.and_then(|el| el.child(&tag)) {
                        Some(item) => self.complex(
                            Some(item),
                            inner_schema,
                            inner_name,
                            depth + 1,
                            &item_path,
                            lob,
                            out,
                        ),
                        None => out.push_str("''"),
                    }

                    if i < element.cardinality {
                        out.push_str(",\n");
                    }
                }

                out.push(')');
            }
            TypeCategory::Distinct => {
                let Some(base) = node.synthetic_attribute() else {
                    out.push_str("''");
                    return;
                };

                // The base of a distinct type is assumed simple.
                self.complex(cell, "", &base.base, depth + 1, tree_path, lob, out);
            }
            TypeCategory::Udt => {
                out.push_str("json_object(\n");

                for (k, attr) in node.attributes.iter().enumerate() {
                    out.push('\'');
                    out.push_str(&attr.name);
                    out.push_str("', ");

                    let tag = format!("u{}", k + 1);
                    let field_path = format!("{tree_path}/{}", attr.name);

                    match cell.and_then(|el| el.child(&tag)) {
                        Some(field) => {
                            let (field_schema, field_name) = attr.type_ref();
                            self.complex(
                                Some(field),
                                field_schema,
                                field_name,
                                depth + 1,
                                &field_path,
                                lob,
                                out,
                            );
                        }
                        None => out.push_str("''"),
                    }

                    if k + 1 < node.attributes.len() {
                        out.push_str(",\n");
                    }
                }

                out.push(')');
            }
        }
    }

    // Resolve a LOB URI through the archive accessor and hex-encode its bytes. Failure is not
    // fatal for the row: the cell degrades to an empty blob.
    fn materialize(&mut self, lob_uri: &str) -> String {
        let result = self.store.resolve(lob_uri).and_then(|path| {
            let literal = decode::file_blob_literal(&path).map_err(crate::Error::from)?;
            self.store.discard(&path);
            Ok(literal)
        });

        match result {
            Ok(literal) => literal,
            Err(err) => {
                tracing::warn!(uri = lob_uri, error = %err, "unreadable LOB, emitting empty blob");
                String::from("X''")
            }
        }
    }
}
