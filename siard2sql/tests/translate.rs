mod common;

use xpct::{be_err, be_true, expect, match_pattern, pattern};

use siard2sql::{TranslateOptions, UnzipMode};

use common::{metadata_xml, single_table, translate_to_string, translate_with, SiardFixture};

#[test]
fn integer_and_text_table_round_trips() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    single_table(
        "<column><name>a</name><type>INTEGER</type></column>\
         <column><name>b</name><type>VARCHAR(8)</type></column>",
        "<row><c1>1</c1><c2>O'Hara</c2></row>",
        "",
    )
    .write_zip(&siard);

    let sql = translate_to_string(&siard)?;

    expect!(sql.contains("CREATE TABLE 'T' (\n'a' INTEGER,\n'b' TEXT);\n")).to(be_true());
    expect!(sql.contains("INSERT INTO 'T' VALUES (\n1,\n'O''Hara');\n")).to(be_true());
    expect!(sql.contains("-- siard version=2.1")).to(be_true());

    Ok(())
}

#[test]
fn directory_input_translates_like_a_zip() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let fixture = single_table(
        "<column><name>a</name><type>INTEGER</type></column>\
         <column><name>b</name><type>VARCHAR(8)</type></column>",
        "<row><c1>1</c1><c2>O'Hara</c2></row>",
        "",
    );

    let zip_path = tmp.path().join("db.siard");
    fixture.write_zip(&zip_path);

    let dir_path = tmp.path().join("unzipped");
    std::fs::create_dir(&dir_path)?;
    fixture.write_dir(&dir_path);

    expect!(translate_to_string(&zip_path)?).to(xpct::equal(translate_to_string(&dir_path)?));

    Ok(())
}

#[test]
fn full_unzip_mode_produces_the_same_sql() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    single_table(
        "<column><name>a</name><type>INTEGER</type></column>",
        "<row><c1>1</c1></row>",
        "",
    )
    .write_zip(&siard);

    let lazy = translate_to_string(&siard)?;
    let eager = translate_with(
        &siard,
        &TranslateOptions::new().unzip_mode(UnzipMode::FullUnzip),
    )?;

    expect!(lazy).to(xpct::equal(eager));

    Ok(())
}

#[test]
fn siard_escapes_become_blob_casts() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    single_table(
        "<column><name>b</name><type>VARCHAR(8)</type></column>",
        r"<row><c1>A\u0000B</c1></row>",
        "",
    )
    .write_zip(&siard);

    let sql = translate_to_string(&siard)?;

    expect!(sql.contains("INSERT INTO 'T' VALUES (\nCAST(X'410042' AS TEXT));\n")).to(be_true());

    Ok(())
}

#[test]
fn primary_and_candidate_keys_are_emitted() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    single_table(
        "<column><name>a</name><type>INTEGER</type></column>\
         <column><name>b</name><type>VARCHAR(8)</type></column>",
        "<row><c1>1</c1><c2>x</c2></row>",
        "<primaryKey><name>pk</name><column>a</column><column>b</column></primaryKey>\
         <candidateKeys><candidateKey><name>u1</name><column>b</column></candidateKey>\
         </candidateKeys>",
    )
    .write_zip(&siard);

    let sql = translate_to_string(&siard)?;

    expect!(sql.contains(",\n   PRIMARY KEY (\n   a,\n   b)\n);\n")).to(be_true());
    expect!(sql.contains("CREATE UNIQUE INDEX unique_idx0_u1 ON T (\n  b);\n")).to(be_true());

    Ok(())
}

#[test]
fn statements_appear_in_metadata_order() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    single_table(
        "<column><name>a</name><type>INTEGER</type></column>",
        "<row><c1>1</c1></row><row><c1>2</c1></row>",
        "<candidateKeys><candidateKey><name>u1</name><column>a</column></candidateKey>\
         </candidateKeys>",
    )
    .write_zip(&siard);

    let sql = translate_to_string(&siard)?;

    let create = sql.find("CREATE TABLE 'T'").unwrap();
    let first_insert = sql.find("INSERT INTO 'T'").unwrap();
    let last_insert = sql.rfind("INSERT INTO 'T'").unwrap();
    let index = sql.find("CREATE UNIQUE INDEX").unwrap();

    expect!(create < first_insert).to(be_true());
    expect!(first_insert < last_insert).to(be_true());
    expect!(last_insert < index).to(be_true());

    Ok(())
}

#[test]
fn missing_trailing_columns_are_empty() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    single_table(
        "<column><name>a</name><type>INTEGER</type></column>\
         <column><name>b</name><type>VARCHAR(8)</type></column>",
        "<row><c1>1</c1></row>",
        "",
    )
    .write_zip(&siard);

    let sql = translate_to_string(&siard)?;

    expect!(sql.contains("INSERT INTO 'T' VALUES (\n1,\n'');\n")).to(be_true());

    Ok(())
}

#[test]
fn never_matching_filter_skips_every_schema() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    single_table(
        "<column><name>a</name><type>INTEGER</type></column>",
        "<row><c1>1</c1></row>",
        "",
    )
    .write_zip(&siard);

    let sql = translate_with(&siard, &TranslateOptions::new().schema_filter("^$"))?;

    expect!(sql.contains("CREATE TABLE")).to_not(be_true());
    expect!(sql.contains("-- no. of schemas=1")).to(be_true());

    Ok(())
}

#[test]
fn filter_matches_partially_and_case_insensitively() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    single_table(
        "<column><name>a</name><type>INTEGER</type></column>",
        "<row><c1>1</c1></row>",
        "",
    )
    .write_zip(&siard);

    // The schema is named "S".
    let sql = translate_with(&siard, &TranslateOptions::new().schema_filter("s"))?;

    expect!(sql.contains("CREATE TABLE 'T'")).to(be_true());

    Ok(())
}

#[test]
fn invalid_filter_is_rejected() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    single_table(
        "<column><name>a</name><type>INTEGER</type></column>",
        "<row><c1>1</c1></row>",
        "",
    )
    .write_zip(&siard);

    let mut out = Vec::new();
    let result = siard2sql::translate(
        &siard,
        &mut out,
        &TranslateOptions::new().schema_filter("(unclosed"),
    );

    expect!(result)
        .to(be_err())
        .to(match_pattern(pattern!(siard2sql::Error::InvalidRegex { .. })));

    Ok(())
}

#[test]
fn replicated_table_names_are_emitted_once() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    let schemas = "<schema><name>S1</name><folder>schema1</folder><tables>\
         <table><name>T</name><folder>table1</folder>\
         <columns><column><name>a</name><type>INTEGER</type></column></columns>\
         <rows>0</rows></table></tables></schema>\
         <schema><name>S2</name><folder>schema2</folder><tables>\
         <table><name>T</name><folder>table1</folder>\
         <columns><column><name>a</name><type>INTEGER</type></column></columns>\
         <rows>0</rows></table></tables></schema>";

    SiardFixture::new()
        .file("header/metadata.xml", metadata_xml(schemas))
        .write_zip(&siard);

    let sql = translate_to_string(&siard)?;

    expect!(sql.matches("CREATE TABLE 'T'").count()).to(xpct::equal(1));

    Ok(())
}

#[test]
fn malformed_content_still_creates_the_table() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    let schemas = "<schema><name>S</name><folder>schema1</folder><tables>\
         <table><name>T</name><folder>table1</folder>\
         <columns><column><name>a</name><type>INTEGER</type></column></columns>\
         <rows>1</rows></table></tables></schema>";

    SiardFixture::new()
        .file("header/metadata.xml", metadata_xml(schemas))
        .file("content/schema1/table1/table1.xml", "this is not xml <<<<")
        .write_zip(&siard);

    let sql = translate_to_string(&siard)?;

    expect!(sql.contains("CREATE TABLE 'T' (\n'a' INTEGER);\n")).to(be_true());
    expect!(sql.contains("INSERT INTO")).to_not(be_true());

    Ok(())
}

#[test]
fn verbose_levels_add_comment_lines() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    single_table(
        "<column><name>a</name><type>INTEGER</type></column>",
        "<row><c1>1</c1></row>",
        "",
    )
    .write_zip(&siard);

    let quiet = translate_to_string(&siard)?;
    let chatty = translate_with(&siard, &TranslateOptions::new().verbose(2))?;

    expect!(quiet.contains("-- schema=")).to_not(be_true());
    expect!(chatty.contains("-- schema='S'")).to(be_true());
    expect!(chatty.contains("--  table='T'")).to(be_true());
    expect!(chatty.contains("--   column='a' (INTEGER -> INTEGER)")).to(be_true());

    Ok(())
}

#[test]
fn summarize_reports_schema_stats() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    single_table(
        "<column><name>a</name><type>INTEGER</type></column>\
         <column><name>b</name><type>VARCHAR(8)</type></column>",
        "<row><c1>1</c1><c2>x</c2></row>",
        "",
    )
    .write_zip(&siard);

    let summary = siard2sql::summarize(&siard, "")?;

    expect!(summary.version.as_str()).to(xpct::equal("2.1"));
    expect!(summary.total_schemas).to(xpct::equal(1));
    expect!(summary.schemas.len()).to(xpct::equal(1));

    let schema = &summary.schemas[0];
    expect!(schema.name.as_str()).to(xpct::equal("S"));
    expect!(schema.stats.tables).to(xpct::equal(1));
    expect!(schema.stats.rows).to(xpct::equal(1));
    expect!(schema.stats.cells).to(xpct::equal(2));

    Ok(())
}

#[test]
fn summarize_applies_the_filter() -> siard2sql::Result<()> {
    let tmp = tempfile::tempdir()?;
    let siard = tmp.path().join("db.siard");

    single_table(
        "<column><name>a</name><type>INTEGER</type></column>",
        "<row><c1>1</c1></row>",
        "",
    )
    .write_zip(&siard);

    let summary = siard2sql::summarize(&siard, "^nope$")?;

    expect!(summary.total_schemas).to(xpct::equal(1));
    expect!(summary.schemas.is_empty()).to(be_true());

    Ok(())
}
