//! Restricts the count and taxonomy tables to one organism group.

use log::info;

use crate::bio::{leaf_taxon, Organism};
use crate::count_table::CountTable;
use crate::pipeline::ProcessingError;
use crate::taxonomy_table::TaxonomyTable;

/// Keeps the taxonomy rows whose Domain (Kingdom for fungi) column equals the
/// organism's filter token, then the count rows whose leaf taxon is among the
/// surviving taxonomy rows.
///
/// Both tables end up with the same set of leaf taxa.
pub fn select_taxa(
    counts: &mut CountTable,
    taxonomy: &mut TaxonomyTable,
    organism: Organism,
) -> Result<(), ProcessingError> {
    let level = organism.filter_level();
    let column = taxonomy.column_index(level.column_name()).ok_or_else(|| {
        ProcessingError::Configuration(format!(
            "filtering on {} needs a {} column; build the tables at rank {} or below",
            organism,
            level.column_name(),
            level
        ))
    })?;

    let token = organism.filter_token();
    let before = taxonomy.len();
    taxonomy.retain_rows(|row| row.values()[column] == token);

    let taxa = taxonomy.taxa();
    counts.retain_features(|lineage| taxa.contains(leaf_taxon(lineage)));

    info!(
        "Kept {} of {} taxa matching {}",
        taxonomy.len(),
        before,
        token
    );
    Ok(())
}
