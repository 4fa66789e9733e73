#![allow(dead_code)]

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// An in-memory SIARD fixture that can land on disk either as a zipped archive or as an
/// unzipped directory.
#[derive(Debug, Default)]
pub struct SiardFixture {
    files: Vec<(String, Vec<u8>)>,
}

impl SiardFixture {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn file<S, B>(mut self, name: S, bytes: B) -> Self
    where
        S: Into<String>,
        B: Into<Vec<u8>>,
    {
        self.files.push((name.into(), bytes.into()));
        self
    }

    /// Write the fixture as a `.siard` zip at `path`.
    pub fn write_zip(&self, path: &Path) {
        let mut writer = ZipWriter::new(File::create(path).unwrap());

        for (name, bytes) in &self.files {
            writer
                .start_file(name.as_str(), SimpleFileOptions::default())
                .unwrap();
            writer.write_all(bytes).unwrap();
        }

        writer.finish().unwrap();
    }

    /// Write the fixture as an unzipped archive directory at `dir`.
    pub fn write_dir(&self, dir: &Path) {
        for (name, bytes) in &self.files {
            let dest = dir.join(name);
            fs::create_dir_all(dest.parent().unwrap()).unwrap();
            fs::write(dest, bytes).unwrap();
        }
    }
}

/// Wrap schema declarations in a complete `metadata.xml`.
pub fn metadata_xml(schemas: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<siardArchive xmlns="http://www.bar.admin.ch/xmlns/siard/2/metadata.xsd" version="2.1">
  <dbname>testdb</dbname>
  <schemas>{schemas}</schemas>
</siardArchive>"#
    )
}

/// Translate a SIARD input into a SQL string with default options.
pub fn translate_to_string(siard: &Path) -> siard2sql::Result<String> {
    translate_with(siard, &siard2sql::TranslateOptions::new())
}

/// Translate a SIARD input into a SQL string.
pub fn translate_with(
    siard: &Path,
    opts: &siard2sql::TranslateOptions,
) -> siard2sql::Result<String> {
    let mut sql = Vec::new();
    siard2sql::translate(siard, &mut sql, opts)?;
    Ok(String::from_utf8(sql).expect("translated SQL was not UTF-8"))
}

/// A one-schema, one-table fixture. `columns` and `rows` are the raw XML of the
/// `<columns>`/table-content fragments; `keys` lands between `<rows>` and `</table>` in the
/// metadata (primary and candidate keys).
pub fn single_table(columns: &str, rows: &str, keys: &str) -> SiardFixture {
    let schemas = format!(
        "<schema><name>S</name><folder>schema1</folder><tables>\
         <table><name>T</name><folder>table1</folder>\
         <columns>{columns}</columns>{keys}<rows>1</rows></table>\
         </tables></schema>"
    );

    let content = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<table xmlns="http://www.bar.admin.ch/xmlns/siard/2/table.xsd" version="2.1">{rows}</table>"#
    );

    SiardFixture::new()
        .file("header/metadata.xml", metadata_xml(&schemas))
        .file("content/schema1/table1/table1.xml", content)
}
