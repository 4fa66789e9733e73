use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about)]
pub struct Cli {
    /// The SIARD input.
    ///
    /// Either a `.siard`/`.zip` archive or a directory containing an unzipped archive
    /// (`header/metadata.xml` and `content/`).
    pub siard: PathBuf,

    /// The SQL file to write.
    ///
    /// When omitted, only a summary of the schemas found in the archive is printed.
    pub output: Option<PathBuf>,

    /// Case-insensitive regular expression selecting schemas by name.
    ///
    /// Partial matches count; an empty string selects every schema.
    #[arg(default_value = "")]
    pub schema_filter: String,

    /// Increase the density of `--` comment lines in the SQL output.
    ///
    /// May be repeated.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Extract the whole archive into the workspace up front instead of entry by entry.
    #[arg(long)]
    pub full_unzip: bool,
}
