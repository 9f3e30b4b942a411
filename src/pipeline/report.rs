//! Output shaping: the MicrobiomeAnalyst column conventions and the run
//! summary.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::bio::{Organism, TaxonomicLevel};
use crate::count_table::CountTable;
use crate::taxonomy_table::TaxonomyTable;

/// Header of the taxon column in the count table.
pub const COUNT_KEY_COLUMN: &str = "#NAME";

/// Applies the level-column convention for the selected organism.
///
/// For fungi the Domain column is dropped and Kingdom becomes the root
/// level. For every other organism the Kingdom column is dropped and Domain
/// is renamed to Kingdom in place.
pub fn format_taxonomy_columns(taxonomy: &mut TaxonomyTable, organism: Organism) {
    let domain = TaxonomicLevel::Domain.column_name();
    let kingdom = TaxonomicLevel::Kingdom.column_name();
    if organism.is_fungi() {
        taxonomy.drop_column(domain);
    } else {
        taxonomy.drop_column(kingdom);
        taxonomy.rename_column(domain, kingdom);
    }
}

/// Per-sample figures reported in the run summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleSummary {
    pub sample: String,
    pub input: PathBuf,
    /// Lines of the report at the requested rank.
    pub records: usize,
    /// Reads kept in the count table after filtering.
    pub retained_reads: u64,
}

/// What a run did, written as JSON when a summary path is configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub rank: TaxonomicLevel,
    pub organism: Organism,
    pub samples: Vec<SampleSummary>,
    pub taxa_before_filter: usize,
    pub taxa_after_filter: usize,
    pub otu_table: PathBuf,
    pub taxonomy_table: PathBuf,
}

impl RunSummary {
    /// Collects the summary once both tables are final.
    ///
    /// `inputs` pairs each input path with its eligible record count, in
    /// sample column order.
    pub fn collect(
        rank: TaxonomicLevel,
        organism: Organism,
        inputs: &[(PathBuf, usize)],
        counts: &CountTable,
        taxa_before_filter: usize,
        otu_table: PathBuf,
        taxonomy_table: PathBuf,
    ) -> Self {
        let samples = counts
            .sample_names()
            .iter()
            .zip(counts.sample_totals())
            .zip(inputs)
            .map(|((sample, retained_reads), (input, records))| SampleSummary {
                sample: sample.clone(),
                input: input.clone(),
                records: *records,
                retained_reads,
            })
            .collect();
        RunSummary {
            rank,
            organism,
            samples,
            taxa_before_filter,
            taxa_after_filter: counts.dimensions().0,
            otu_table,
            taxonomy_table,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::count_table::DuplicatePolicy;
    use crate::io::mpa::LineageRecord;

    const LINEAGE: &str = "d__Eukaryota;k__Fungi;p__Ascomycota;c__Saccharomycetes";

    #[test]
    fn test_non_fungi_collapses_domain_into_kingdom() {
        let mut taxonomy = TaxonomyTable::decompose([LINEAGE], TaxonomicLevel::Class);
        format_taxonomy_columns(&mut taxonomy, Organism::Bacteria);
        assert_eq!(taxonomy.columns(), &["Kingdom", "Phylum", "Class"]);
        assert_eq!(taxonomy.rows()[0].values()[0], "d__Eukaryota");
    }

    #[test]
    fn test_fungi_drops_domain() {
        let mut taxonomy = TaxonomyTable::decompose([LINEAGE], TaxonomicLevel::Class);
        format_taxonomy_columns(&mut taxonomy, Organism::Fungi);
        assert_eq!(taxonomy.columns(), &["Kingdom", "Phylum", "Class"]);
        assert_eq!(taxonomy.rows()[0].values()[0], "k__Fungi");
    }

    #[test]
    fn test_domain_rank_non_fungi() {
        let mut taxonomy = TaxonomyTable::decompose(["d__Bacteria"], TaxonomicLevel::Domain);
        format_taxonomy_columns(&mut taxonomy, Organism::Viruses);
        assert_eq!(taxonomy.columns(), &["Kingdom"]);
    }

    #[test]
    fn test_summary_collect() {
        let records = vec![LineageRecord::new(
            vec!["d__Bacteria".to_string(), "s__A".to_string()],
            12,
        )];
        let counts = CountTable::build_from_reports(
            &[("S1".to_string(), records), ("S2".to_string(), Vec::new())],
            DuplicatePolicy::Error,
        )
        .unwrap();
        let summary = RunSummary::collect(
            TaxonomicLevel::Species,
            Organism::Bacteria,
            &[(PathBuf::from("S1.txt"), 1), (PathBuf::from("S2.txt"), 0)],
            &counts,
            3,
            PathBuf::from("otu.txt"),
            PathBuf::from("tax.txt"),
        );
        assert_eq!(summary.samples.len(), 2);
        assert_eq!(summary.samples[0].retained_reads, 12);
        assert_eq!(summary.samples[1].records, 0);
        assert_eq!(summary.taxa_before_filter, 3);
        assert_eq!(summary.taxa_after_filter, 1);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(json.contains("\"rank\":\"Species\""));
        assert!(json.contains("\"organism\":\"Bacteria\""));
    }
}
