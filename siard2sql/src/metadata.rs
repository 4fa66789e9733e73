use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;

use regex::Regex;

use crate::affinity::{Affinity, TypeMapper};
use crate::archive::ArchiveStore;
use crate::content::{ColumnSpec, Emitter};
use crate::lob::LobFolderInfo;
use crate::types::{DataTypeTable, ExtendedCategory, TypeAttribute, TypeCategory, TypeNode};
use crate::util::basename;
use crate::xml::{Document, Element};

/// Table/row/cell counts for one schema, for the summary output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchemaStats {
    pub tables: u64,
    pub rows: u64,
    pub cells: u64,
}

/// The parsed `header/metadata.xml` of a SIARD archive, bound to its root URI.
///
/// This is the entry point of the translation: it owns the metadata DOM and walks it to emit
/// `CREATE TABLE`, row insertions (through the content emitter) and unique indexes.
#[derive(Debug)]
pub(crate) struct Metadata {
    doc: Document,
    root_uri: String,
}

impl Metadata {
    /// Resolve and parse `header/metadata.xml` under the SIARD root URI.
    pub(crate) fn load(store: &mut ArchiveStore, root_uri: &str) -> crate::Result<Self> {
        let root_uri = root_uri.trim_end_matches('/').to_string();
        let metadata_uri = format!("{root_uri}/header/metadata.xml");

        let path = store
            .resolve(&metadata_uri)
            .map_err(|_| crate::Error::MetadataLoad {
                path: PathBuf::from(&metadata_uri),
            })?;

        let doc = Document::parse_file(&path)?;

        Ok(Metadata { doc, root_uri })
    }

    /// The SIARD format version declared on `siardArchive`, or `"unknown"`.
    pub(crate) fn version(&self) -> &str {
        self.doc.root().attr_or("version", "unknown")
    }

    fn schema_elements(&self) -> Vec<&Element> {
        self.doc.root().find_all("schema", 2)
    }

    /// The names of all schemas, in metadata order.
    pub(crate) fn schema_names(&self) -> Vec<String> {
        self.schema_elements()
            .into_iter()
            .map(|schema| schema.child_text("name").to_string())
            .collect()
    }

    /// Count tables, rows and cells of the named schema.
    ///
    /// Row counts come from each table's `<rows>` metadata element; cells are rows times
    /// declared columns.
    pub(crate) fn schema_stats(&self, schema_name: &str) -> Option<SchemaStats> {
        let schema = self
            .schema_elements()
            .into_iter()
            .find(|schema| schema.child_text("name") == schema_name)?;

        let mut stats = SchemaStats::default();

        if let Some(tables) = schema.child("tables") {
            for table in tables.children_named("table") {
                let rows: u64 = table.child_text("rows").parse().unwrap_or(0);
                let columns = table
                    .child("columns")
                    .map(|columns| columns.children_named("column").count() as u64)
                    .unwrap_or(0);

                stats.tables += 1;
                stats.rows += rows;
                stats.cells += rows * columns;
            }
        }

        Some(stats)
    }

    /// Translate the archive into SQL on `out`.
    ///
    /// `filter` selects schemas by name with partial-match semantics; `verbose` controls the
    /// density of `--` comment lines (0 emits only the version/schema-count header).
    pub(crate) fn to_sql<W: Write>(
        &self,
        store: &mut ArchiveStore,
        filter: &Regex,
        verbose: u8,
        out: &mut W,
    ) -> crate::Result<()> {
        let mut types = DataTypeTable::new();
        let mapper = TypeMapper::new();

        writeln!(out, "-- siard version={}", self.version())?;

        let schemas = self.schema_elements();
        writeln!(out, "-- no. of schemas={}", schemas.len())?;

        // Pre-pass: register every declared complex type across all schemas, filtered or not.
        // Udt attributes may reference types from any schema, including later ones, so the main
        // pass must resolve against the completed table.
        for schema in &schemas {
            self.register_schema_types(schema, &mut types);
        }

        if !types.is_empty() {
            tracing::debug!(count = types.len(), "registered complex types");
        }

        let archive_lobfolder = self.doc.root().child_text("lobFolder").to_string();

        // Table names must be unique in the output; replicated names across schemas are skipped.
        let mut first_schema_of: HashMap<String, String> = HashMap::new();
        let mut collisions: Vec<(String, String)> = Vec::new();

        // Candidate keys become unique indexes with a counter spanning all schemas.
        let mut unique_index = 0u64;

        for schema in &schemas {
            let schema_name = schema.child_text("name");

            if !filter.is_match(schema_name) {
                continue;
            }

            if verbose > 0 {
                writeln!(out, "-- schema='{schema_name}'")?;
            }

            let schema_folder = schema.child_text("folder");

            let tables: Vec<&Element> = schema
                .child("tables")
                .map(|tables| tables.children_named("table").collect())
                .unwrap_or_default();

            if verbose > 0 {
                writeln!(out, "-- no. of tables={}", tables.len())?;
            }

            for table in tables {
                let table_name = table.child_text("name");

                if first_schema_of.contains_key(table_name) {
                    collisions.push((schema_name.to_string(), table_name.to_string()));
                    continue;
                }
                first_schema_of.insert(table_name.to_string(), schema_name.to_string());

                if verbose > 1 {
                    writeln!(out, "--  table='{table_name}'")?;
                    writeln!(out, "--  rows='{}'", table.child_text("rows"))?;
                }

                let columns = self.build_columns(
                    table,
                    schema_name,
                    &archive_lobfolder,
                    &mut types,
                    &mapper,
                    verbose,
                    out,
                )?;

                out.write_all(create_table_sql(table_name, table, &columns).as_bytes())?;

                self.emit_table_content(
                    store,
                    &types,
                    &mapper,
                    schema_folder,
                    table,
                    table_name,
                    &columns,
                    verbose,
                    out,
                )?;

                out.write_all(
                    unique_index_sql(table, table_name, &mut unique_index).as_bytes(),
                )?;
            }
        }

        for (schema_name, table_name) in &collisions {
            let first = first_schema_of
                .get(table_name)
                .map(String::as_str)
                .unwrap_or("");

            tracing::warn!(
                table = table_name.as_str(),
                schema = schema_name.as_str(),
                first_schema = first,
                "skipped table replicated in another schema"
            );
        }

        Ok(())
    }

    // Register the `<types><type>` declarations of one schema.
    fn register_schema_types(&self, schema: &Element, types: &mut DataTypeTable) {
        let schema_name = schema.child_text("name");

        let Some(declared) = schema.child("types") else {
            return;
        };

        for type_el in declared.children_named("type") {
            let category = type_el.child_text("category");
            let name = type_el.child_text("name");

            if category.is_empty() || name.is_empty() {
                continue;
            }

            match category {
                "distinct" => {
                    types.register(TypeNode {
                        schema: schema_name.to_string(),
                        name: name.to_string(),
                        category: TypeCategory::Distinct,
                        attributes: vec![TypeAttribute {
                            base: type_el.child_text("base").to_string(),
                            ..Default::default()
                        }],
                    });
                }
                "udt" => {
                    let mut attributes = Vec::new();

                    if let Some(declared_attrs) = type_el.child("attributes") {
                        for attribute in declared_attrs.children_named("attribute") {
                            let mut attr = TypeAttribute::from_xml(attribute);

                            match attr.extended_category() {
                                ExtendedCategory::Array => {
                                    types.lift_array(schema_name, &mut attr);
                                }
                                ExtendedCategory::Distinct => {
                                    // SIARD disallows inline distinct declarations on udt
                                    // attributes; keep it and let the formatter degrade.
                                    tracing::warn!(
                                        schema = schema_name,
                                        udt = name,
                                        attribute = attr.name.as_str(),
                                        "inline distinct attribute on a udt is not allowed"
                                    );
                                }
                                _ => {}
                            }

                            attributes.push(attr);
                        }
                    }

                    types.register(TypeNode {
                        schema: schema_name.to_string(),
                        name: name.to_string(),
                        category: TypeCategory::Udt,
                        attributes,
                    });
                }
                other => {
                    tracing::warn!(
                        schema = schema_name,
                        name,
                        category = other,
                        "unknown type category"
                    );
                }
            }
        }
    }

    // Build the per-column vectors for one table: name, declaration, affinity and lobFolder
    // index. Array columns are lifted into the data-type table here, before any content is
    // emitted for the table.
    #[allow(clippy::too_many_arguments)]
    fn build_columns<W: Write>(
        &self,
        table: &Element,
        schema_name: &str,
        archive_lobfolder: &str,
        types: &mut DataTypeTable,
        mapper: &TypeMapper,
        verbose: u8,
        out: &mut W,
    ) -> crate::Result<Vec<ColumnSpec>> {
        let mut columns = Vec::new();

        let Some(declared) = table.child("columns") else {
            return Ok(columns);
        };

        for column in declared.children_named("column") {
            let name = column.child_text("name").to_string();
            let mut attr = TypeAttribute::from_xml(column);
            let lob = LobFolderInfo::build(&self.root_uri, &name, column, archive_lobfolder);

            let complex = match attr.extended_category() {
                ExtendedCategory::Array => {
                    types.lift_array(schema_name, &mut attr);
                    true
                }
                ExtendedCategory::Udt | ExtendedCategory::Distinct => true,
                ExtendedCategory::Simple | ExtendedCategory::Unknown => false,
            };

            // Complex columns hold JSON (or casted text) and always declare TEXT.
            let affinity = if complex {
                Affinity::Text
            } else {
                mapper.affinity_of(&attr.siard_type)
            };

            if verbose > 1 {
                let declared_type = if complex {
                    attr.type_name.as_str()
                } else {
                    attr.siard_type.as_str()
                };

                writeln!(out, "--   column='{name}' ({declared_type} -> {affinity})")?;
            }

            columns.push(ColumnSpec {
                name,
                attr,
                affinity,
                complex,
                lob,
            });
        }

        Ok(columns)
    }

    // Locate, parse and emit the table's content file. A missing or malformed file means zero
    // rows, never a failed translation.
    #[allow(clippy::too_many_arguments)]
    fn emit_table_content<W: Write>(
        &self,
        store: &mut ArchiveStore,
        types: &DataTypeTable,
        mapper: &TypeMapper,
        schema_folder: &str,
        table: &Element,
        table_name: &str,
        columns: &[ColumnSpec],
        verbose: u8,
        out: &mut W,
    ) -> crate::Result<()> {
        let table_folder = table.child_text("folder");

        if table_folder.is_empty() {
            return Ok(());
        }

        let content_uri = format!(
            "{}/content/{}/{}/{}.xml",
            self.root_uri,
            schema_folder,
            table_folder,
            basename(table_folder)
        );

        let path = match store.resolve(&content_uri) {
            Ok(path) => path,
            Err(err) => {
                tracing::debug!(uri = content_uri.as_str(), error = %err, "no content file for table");
                return Ok(());
            }
        };

        let doc = match Document::parse_file(&path) {
            Ok(doc) => doc,
            Err(err) => {
                tracing::warn!(uri = content_uri.as_str(), error = %err, "failed parsing table content");
                return Ok(());
            }
        };

        let mut emitter = Emitter {
            types,
            mapper,
            store,
            root: &self.root_uri,
        };

        emitter.emit_rows(&doc, table_name, columns, verbose.saturating_sub(3), out)
    }
}

// `CREATE TABLE 'name' ('col' AFFINITY, …, PRIMARY KEY (…));`
fn create_table_sql(table_name: &str, table: &Element, columns: &[ColumnSpec]) -> String {
    let mut sql = format!("CREATE TABLE '{table_name}' (\n");

    for (i, column) in columns.iter().enumerate() {
        sql.push('\'');
        sql.push_str(&column.name);
        sql.push_str("' ");
        sql.push_str(&column.affinity.to_string());

        if i + 1 < columns.len() {
            sql.push_str(",\n");
        }
    }

    if let Some(primary_key) = table.child("primaryKey") {
        let key_columns: Vec<&str> = primary_key
            .children_named("column")
            .map(Element::text_trimmed)
            .collect();

        if !key_columns.is_empty() {
            sql.push_str(",\n   PRIMARY KEY (");

            for (i, key_column) in key_columns.iter().enumerate() {
                sql.push_str("\n   ");
                sql.push_str(key_column);

                if i + 1 < key_columns.len() {
                    sql.push(',');
                }
            }

            sql.push_str(")\n");
        }
    }

    sql.push_str(");\n");
    sql
}

// `CREATE UNIQUE INDEX unique_idx<k>_<name> ON <table> (…);` per candidate key. The counter
// spans schemas.
fn unique_index_sql(table: &Element, table_name: &str, unique_index: &mut u64) -> String {
    let mut sql = String::new();

    let Some(candidate_keys) = table.child("candidateKeys") else {
        return sql;
    };

    for candidate_key in candidate_keys.children_named("candidateKey") {
        let key_name = candidate_key.child_text("name");
        let key_columns: Vec<&str> = candidate_key
            .children_named("column")
            .map(Element::text_trimmed)
            .collect();

        if key_columns.is_empty() {
            continue;
        }

        sql.push_str(&format!(
            "CREATE UNIQUE INDEX unique_idx{unique_index}_{key_name} ON {table_name} ("
        ));

        for (i, key_column) in key_columns.iter().enumerate() {
            sql.push_str("\n  ");
            sql.push_str(key_column);

            if i + 1 < key_columns.len() {
                sql.push(',');
            }
        }

        sql.push_str(");\n");
        *unique_index += 1;
    }

    sql
}
