use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Input text file, or a directory of .txt documents for batch mode.
    #[arg(short, long, value_name = "PATH")]
    pub input: PathBuf,

    /// Report format.
    #[arg(short, long, value_enum, default_value = "json")]
    pub format: OutputFormat,

    /// Output file; stdout when omitted.
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Extraction/resolution config overrides as a JSON file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Extra dictionary entries: CSV with `name,smiles` columns.
    #[arg(long, value_name = "FILE")]
    pub names_csv: Option<PathBuf>,

    /// Extra dictionary entries: CSV with `cas,smiles` columns.
    #[arg(long, value_name = "FILE")]
    pub cas_csv: Option<PathBuf>,

    /// Extra dictionary entries: CSV with `brand,common_name` columns.
    #[arg(long, value_name = "FILE")]
    pub brands_csv: Option<PathBuf>,

    /// Resolve extracted entities against the dictionary and PubChem.
    #[arg(long)]
    pub resolve: bool,

    /// Treat each document as a patent claim: expand Markush variable
    /// definitions into the report.
    #[arg(long)]
    pub claim: bool,

    /// Override the post-validation confidence floor.
    #[arg(long, value_name = "FLOAT")]
    pub min_confidence: Option<f64>,
}

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Full JSON report with statistics.
    #[value(name = "json")]
    Json,
    /// Tab-separated entity table.
    #[value(name = "tsv")]
    Tsv,
}
