//! Input/Output operations module.
//!
//! Handles reading mpa reports and writing the two tab-separated tables
//! (and the optional JSON run summary). Outputs are staged in temporary
//! files next to their destination and only moved into place once every
//! table has been written in full.

pub mod mpa; // Sub-module specifically for Kraken2 mpa report handling

use log::{info, warn};
use serde::Serialize;
use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::{NamedTempFile, TempPath};

use crate::bio::leaf_taxon;
use crate::count_table::CountTable;
use crate::pipeline::report::COUNT_KEY_COLUMN;
use crate::pipeline::ProcessingError;
use crate::taxonomy_table::{TaxonomyTable, TAXONOMY_KEY_COLUMN};

fn tsv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(csv::QuoteStyle::Never)
        .from_writer(writer)
}

/// Writes a CountTable as TSV: `#NAME`, then one column per sample.
///
/// The taxon column holds the leaf taxon of each lineage.
pub fn write_count_table<W: Write>(table: &CountTable, writer: W) -> Result<(), ProcessingError> {
    let mut writer = tsv_writer(writer);

    let mut header = vec![COUNT_KEY_COLUMN.to_string()];
    header.extend(table.sample_names().iter().cloned());
    writer.write_record(&header)?;

    for (lineage, counts) in table.rows() {
        let mut record = Vec::with_capacity(counts.len() + 1);
        record.push(leaf_taxon(lineage).to_string());
        record.extend(counts.iter().map(u64::to_string));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes a TaxonomyTable as TSV: `#TAXONOMY`, then its level columns.
pub fn write_taxonomy_table<W: Write>(
    table: &TaxonomyTable,
    writer: W,
) -> Result<(), ProcessingError> {
    let mut writer = tsv_writer(writer);

    writer.write_record(
        std::iter::once(TAXONOMY_KEY_COLUMN).chain(table.columns().iter().map(String::as_str)),
    )?;
    for row in table.rows() {
        writer.write_record(
            std::iter::once(row.taxon()).chain(row.values().iter().map(String::as_str)),
        )?;
    }

    writer.flush()?;
    Ok(())
}

/// Destination paths of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub otu_table: PathBuf,
    pub taxonomy_table: PathBuf,
}

fn staged_file(dir: &Path) -> Result<NamedTempFile, ProcessingError> {
    Ok(tempfile::Builder::new()
        .prefix(".kraken2_otu.")
        .suffix(".tmp")
        .tempfile_in(dir)?)
}

/// Fails unless `path` can be replaced by a regular file.
fn check_destination(path: &Path) -> Result<(), ProcessingError> {
    if path.is_dir() {
        return Err(ProcessingError::Configuration(format!(
            "output path '{}' is a directory",
            path.display()
        )));
    }
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.is_dir() => {
            Err(ProcessingError::Configuration(format!(
                "output directory '{}' does not exist",
                parent.display()
            )))
        }
        _ => Ok(()),
    }
}

/// Moves an existing file at `dest` to a temporary path in `dir` so it can be
/// put back if the run fails. The moved file is deleted when the returned
/// path is dropped.
fn set_aside(dest: &Path, dir: &Path) -> Result<Option<TempPath>, ProcessingError> {
    if !dest.exists() {
        return Ok(None);
    }
    let backup = staged_file(dir)?.into_temp_path();
    fs::rename(dest, &backup)?;
    Ok(Some(backup))
}

/// Puts `dest` back the way it was before the run touched it.
fn roll_back(dest: &Path, backup: Option<TempPath>) {
    let restored = match backup {
        Some(previous) => previous.persist(dest).map_err(|err| err.error),
        None => fs::remove_file(dest),
    };
    if let Err(err) = restored {
        warn!("Could not roll back {}: {}", dest.display(), err);
    }
}

/// Writes both tables into `output_dir`, all or nothing.
///
/// Each table goes to a temporary file in the output directory; both are
/// renamed to their final names only after both have been written. If the
/// second rename fails the first table is removed again, or its previous
/// contents restored.
pub fn write_tables(
    output_dir: &Path,
    otu_file: &str,
    taxonomy_file: &str,
    counts: &CountTable,
    taxonomy: &TaxonomyTable,
) -> Result<OutputPaths, ProcessingError> {
    fs::create_dir_all(output_dir)?;

    let paths = OutputPaths {
        otu_table: output_dir.join(otu_file),
        taxonomy_table: output_dir.join(taxonomy_file),
    };
    check_destination(&paths.otu_table)?;
    check_destination(&paths.taxonomy_table)?;

    let mut otu_staged = staged_file(output_dir)?;
    write_count_table(counts, BufWriter::new(otu_staged.as_file_mut()))?;
    let mut taxonomy_staged = staged_file(output_dir)?;
    write_taxonomy_table(taxonomy, BufWriter::new(taxonomy_staged.as_file_mut()))?;

    let otu_backup = set_aside(&paths.otu_table, output_dir)?;
    if let Err(err) = otu_staged.persist(&paths.otu_table) {
        if let Some(previous) = otu_backup {
            if let Err(restore) = previous.persist(&paths.otu_table) {
                warn!(
                    "Could not restore {}: {}",
                    paths.otu_table.display(),
                    restore.error
                );
            }
        }
        return Err(err.into());
    }
    if let Err(err) = taxonomy_staged.persist(&paths.taxonomy_table) {
        roll_back(&paths.otu_table, otu_backup);
        return Err(err.into());
    }

    info!(
        "Wrote {} and {}",
        paths.otu_table.display(),
        paths.taxonomy_table.display()
    );
    Ok(paths)
}

/// Writes any serializable value as pretty JSON, replacing `path` atomically.
pub fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), ProcessingError> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;
    let mut staged = staged_file(dir)?;
    {
        let mut writer = BufWriter::new(staged.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value)?;
        writer.flush()?;
    }
    staged.persist(path)?;
    info!("Wrote run summary to {}", path.display());
    Ok(())
}
