use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;

use crate::bio::{Organism, TaxonomicLevel};
use crate::count_table::DuplicatePolicy;
use crate::pipeline::processor::{DEFAULT_OTU_TABLE, DEFAULT_TAXONOMY_TABLE};
use crate::pipeline::{run, RunConfig};

/// Build MicrobiomeAnalyst OTU and taxonomy tables from Kraken2 mpa reports.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Taxonomic rank the tables are built at.
    #[arg(short, long, value_enum, ignore_case = true)]
    pub rank: TaxonomicLevel,

    /// Organism group to keep in the output tables.
    #[arg(short = 'g', long, value_enum)]
    pub organism: Organism,

    /// Kraken2 mpa-style report files, one per sample (.gz/.bz2/.zst accepted).
    #[arg(short, long, num_args = 1.., required = true)]
    pub files: Vec<PathBuf>,

    /// Directory the tables are written to.
    #[arg(short, long, default_value = ".")]
    pub output_dir: PathBuf,

    /// File name of the OTU abundance table.
    #[arg(long, default_value = DEFAULT_OTU_TABLE)]
    pub otu_table: String,

    /// File name of the taxonomy table.
    #[arg(long, default_value = DEFAULT_TAXONOMY_TABLE)]
    pub taxonomy_table: String,

    /// How to handle a lineage listed twice in the same report.
    #[arg(long, value_enum, default_value_t = DuplicatePolicy::Error)]
    pub on_duplicate: DuplicatePolicy,

    /// Also write a JSON summary of the run to this path.
    #[arg(long)]
    pub summary: Option<PathBuf>,
}

impl Cli {
    pub fn into_config(self) -> RunConfig {
        let mut config = RunConfig::new(self.rank, self.organism, self.files);
        config.output_dir = self.output_dir;
        config.otu_table = self.otu_table;
        config.taxonomy_table = self.taxonomy_table;
        config.duplicate_policy = self.on_duplicate;
        config.summary = self.summary;
        config
    }
}

/// Main entry point for CLI
pub fn run_cli(cli: Cli) -> Result<()> {
    let config = cli.into_config();
    info!("Run configuration: {:?}", config);

    let paths = run(&config).context("failed to build OTU and taxonomy tables")?;

    println!("OTU table: {}", paths.otu_table.display());
    println!("Taxonomy table: {}", paths.taxonomy_table.display());
    Ok(())
}
