//! Bioinformatics utilities module.
//!
//! Groups the taxonomy-related types shared by the parser, the table
//! builders and the output filter.

pub mod taxonomy;

pub use taxonomy::{Organism, TaxonomicLevel};

/// Separator between levels of a lineage in an mpa report line.
pub const REPORT_LEVEL_SEPARATOR: char = '|';

/// Separator between levels of a lineage used as a table row key.
pub const LINEAGE_KEY_SEPARATOR: char = ';';

/// Returns the last token of a `;`-joined lineage key, i.e. the leaf taxon.
pub fn leaf_taxon(lineage_key: &str) -> &str {
    lineage_key
        .rsplit(LINEAGE_KEY_SEPARATOR)
        .next()
        .unwrap_or(lineage_key)
}
