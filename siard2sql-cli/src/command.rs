use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use siard2sql::{Summary, TranslateOptions, UnzipMode};

use super::cli::Cli;
use super::error::user_err;

impl Cli {
    /// Run the requested mode, writing human-facing report lines to `stdout`.
    pub fn dispatch<W: Write>(&self, stdout: &mut W) -> eyre::Result<()> {
        match &self.output {
            Some(output) => self.translate(output, stdout),
            None => self.summarize(stdout),
        }
    }

    fn translate<W: Write>(&self, output: &Path, stdout: &mut W) -> eyre::Result<()> {
        let file = File::create(output).map_err(|err| {
            user_err!(
                "Cannot open the SQL output file '{}': {err}",
                output.display()
            )
        })?;
        let mut sql = BufWriter::new(file);

        let opts = TranslateOptions::new()
            .schema_filter(&self.schema_filter)
            .verbose(self.verbose)
            .unzip_mode(if self.full_unzip {
                UnzipMode::FullUnzip
            } else {
                UnzipMode::FileByFile
            });

        siard2sql::translate(&self.siard, &mut sql, &opts)?;
        sql.flush()?;

        let summary = siard2sql::summarize(&self.siard, &self.schema_filter)?;
        print_summary(&summary, &self.schema_filter, stdout)?;

        let size = fs::metadata(output).map(|meta| meta.len()).unwrap_or(0);
        writeln!(
            stdout,
            "SQL file: '{}' (size: {size} bytes)",
            output.display()
        )?;

        Ok(())
    }

    fn summarize<W: Write>(&self, stdout: &mut W) -> eyre::Result<()> {
        let summary = siard2sql::summarize(&self.siard, &self.schema_filter)?;

        writeln!(stdout, "SIARD version: {}", summary.version)?;
        print_summary(&summary, &self.schema_filter, stdout)?;

        Ok(())
    }
}

fn print_summary<W: Write>(summary: &Summary, filter: &str, stdout: &mut W) -> eyre::Result<()> {
    if filter.is_empty() {
        writeln!(stdout, "Found {} schemas:", summary.schemas.len())?;
    } else {
        writeln!(
            stdout,
            "Found {} schemas (out of {}) matching regexp '{}':",
            summary.schemas.len(),
            summary.total_schemas,
            filter
        )?;
    }

    for schema in &summary.schemas {
        writeln!(
            stdout,
            "  {}: {} tables, {} rows, {} cells",
            schema.name, schema.stats.tables, schema.stats.rows, schema.stats.cells
        )?;
    }

    Ok(())
}
