#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;

use clap::Parser;
use siard2sql_cli::Cli;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Run the CLI in-process and capture its stdout.
pub fn command(args: &[&str]) -> eyre::Result<String> {
    let mut output = Vec::new();
    let mut all_args = vec!["siard2sql"];

    all_args.extend_from_slice(args);
    Cli::parse_from(all_args).dispatch(&mut output)?;

    Ok(String::from_utf8(output)?.trim().to_owned())
}

/// Write a one-schema, one-table SIARD zip at `path`.
pub fn write_tiny_siard(path: &Path) {
    let metadata = r#"<?xml version="1.0" encoding="UTF-8"?>
<siardArchive xmlns="http://www.bar.admin.ch/xmlns/siard/2/metadata.xsd" version="2.1">
  <dbname>testdb</dbname>
  <schemas><schema><name>S</name><folder>schema1</folder><tables>
    <table><name>T</name><folder>table1</folder>
      <columns><column><name>a</name><type>INTEGER</type></column></columns>
      <rows>1</rows></table>
  </tables></schema></schemas>
</siardArchive>"#;

    let content = r#"<?xml version="1.0"?><table version="2.1"><row><c1>1</c1></row></table>"#;

    let mut writer = ZipWriter::new(File::create(path).unwrap());

    for (name, bytes) in [
        ("header/metadata.xml", metadata),
        ("content/schema1/table1/table1.xml", content),
    ] {
        writer
            .start_file(name, SimpleFileOptions::default())
            .unwrap();
        writer.write_all(bytes.as_bytes()).unwrap();
    }

    writer.finish().unwrap();
}
