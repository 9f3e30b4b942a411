use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::bio::{Organism, TaxonomicLevel};
use crate::count_table::{CountTable, DuplicatePolicy};
use crate::io::mpa::{parse_report, read_report, sample_name, LineageRecord};
use crate::io::{write_json, write_tables, OutputPaths};
use crate::pipeline::filter::select_taxa;
use crate::pipeline::report::{format_taxonomy_columns, RunSummary};
use crate::taxonomy_table::TaxonomyTable;

// --- Error Type ---
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Input format error in {path}, line {line}: {message}")]
    InputFormat {
        path: String,
        line: u64,
        message: String,
    },

    #[error("Cannot read input report {path}: {source}")]
    MissingFile {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("Lineage '{lineage}' is listed more than once in sample '{sample}'")]
    DuplicateLineage { sample: String, lineage: String },

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Failed to move output into place: {0}")]
    PersistError(#[from] tempfile::PersistError),
}

/// Default name of the abundance table.
pub const DEFAULT_OTU_TABLE: &str = "microanalyst_otu_table.txt";
/// Default name of the taxonomy table.
pub const DEFAULT_TAXONOMY_TABLE: &str = "microanalyst_taxonomy_table.txt";

/// Everything one run needs, independent of how it was supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub rank: TaxonomicLevel,
    pub organism: Organism,
    pub inputs: Vec<PathBuf>,
    pub output_dir: PathBuf,
    pub otu_table: String,
    pub taxonomy_table: String,
    pub duplicate_policy: DuplicatePolicy,
    pub summary: Option<PathBuf>,
}

impl RunConfig {
    pub fn new(rank: TaxonomicLevel, organism: Organism, inputs: Vec<PathBuf>) -> Self {
        RunConfig {
            rank,
            organism,
            inputs,
            output_dir: PathBuf::from("."),
            otu_table: DEFAULT_OTU_TABLE.to_string(),
            taxonomy_table: DEFAULT_TAXONOMY_TABLE.to_string(),
            duplicate_policy: DuplicatePolicy::default(),
            summary: None,
        }
    }

    /// Cross-field checks, run before any input is read.
    ///
    /// Returns the sample name of every input, in input order.
    pub fn validate(&self) -> Result<Vec<String>, ProcessingError> {
        if self.inputs.is_empty() {
            return Err(ProcessingError::Configuration(
                "at least one input report is required".to_string(),
            ));
        }
        if self.organism.filter_level() > self.rank {
            return Err(ProcessingError::Configuration(format!(
                "organism {} is selected by {} and needs rank {} or below, got {}",
                self.organism,
                self.organism.filter_level().column_name(),
                self.organism.filter_level(),
                self.rank
            )));
        }
        if self.otu_table == self.taxonomy_table {
            return Err(ProcessingError::Configuration(format!(
                "both tables would be written to '{}'",
                self.otu_table
            )));
        }

        let mut seen: HashMap<String, &PathBuf> = HashMap::new();
        let mut names = Vec::with_capacity(self.inputs.len());
        for input in &self.inputs {
            let name = sample_name(input).ok_or_else(|| {
                ProcessingError::Configuration(format!(
                    "cannot derive a sample name from '{}'",
                    input.display()
                ))
            })?;
            if let Some(previous) = seen.insert(name.clone(), input) {
                return Err(ProcessingError::Configuration(format!(
                    "'{}' and '{}' both map to sample name '{}'",
                    previous.display(),
                    input.display(),
                    name
                )));
            }
            names.push(name);
        }
        Ok(names)
    }
}

/// Runs the whole conversion: read, join, decompose, filter, write.
///
/// Nothing is written unless every step succeeds.
pub fn run(config: &RunConfig) -> Result<OutputPaths, ProcessingError> {
    let sample_names = config.validate()?;
    info!(
        "Building tables at rank {} for {} from {} report(s)",
        config.rank.column_name(),
        config.organism,
        config.inputs.len()
    );

    // Every input is read before any table is built.
    let mut contents = Vec::with_capacity(config.inputs.len());
    for input in &config.inputs {
        contents.push(read_report(input)?);
    }

    let mut reports: Vec<(String, Vec<LineageRecord>)> = Vec::with_capacity(contents.len());
    for ((input, content), name) in config.inputs.iter().zip(&contents).zip(sample_names) {
        let records = parse_report(&input.display().to_string(), content, config.rank)?;
        info!(
            "{}: {} taxa at rank {}",
            name,
            records.len(),
            config.rank.column_name()
        );
        reports.push((name, records));
    }
    drop(contents);

    let mut counts = CountTable::build_from_reports(&reports, config.duplicate_policy)?;
    let mut taxonomy = TaxonomyTable::decompose(counts.feature_names(), config.rank);
    let taxa_before_filter = taxonomy.len();
    info!(
        "Joined table has {} taxa across {} samples",
        counts.dimensions().0,
        counts.dimensions().1
    );

    select_taxa(&mut counts, &mut taxonomy, config.organism)?;
    format_taxonomy_columns(&mut taxonomy, config.organism);
    debug!("Taxonomy columns: {:?}", taxonomy.columns());

    let paths = write_tables(
        &config.output_dir,
        &config.otu_table,
        &config.taxonomy_table,
        &counts,
        &taxonomy,
    )?;

    if let Some(summary_path) = &config.summary {
        let inputs: Vec<(PathBuf, usize)> = config
            .inputs
            .iter()
            .cloned()
            .zip(reports.iter().map(|(_, records)| records.len()))
            .collect();
        let summary = RunSummary::collect(
            config.rank,
            config.organism,
            &inputs,
            &counts,
            taxa_before_filter,
            paths.otu_table.clone(),
            paths.taxonomy_table.clone(),
        );
        write_json(&summary, summary_path)?;
    }

    Ok(paths)
}
