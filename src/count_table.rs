//! Defines the abundance (OTU) count table.
//!
//! Rows are taxa keyed by their full `;`-joined lineage, columns are
//! samples (one per input report). The table is the full outer join of the
//! per-report relations: a taxon observed in any report gets a row, and
//! every sample it was not observed in holds an explicit zero.

use clap::ValueEnum;
use indexmap::map::Entry;
use indexmap::IndexMap;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::io::mpa::LineageRecord;
use crate::pipeline::ProcessingError;

/// What to do when one report lists the same lineage more than once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum DuplicatePolicy {
    /// Fail the run.
    #[default]
    #[value(name = "error")]
    Error,
    /// Keep the count of the last occurrence.
    #[value(name = "last")]
    LastWins,
    /// Add the counts of all occurrences.
    #[value(name = "sum")]
    Sum,
}

/// Represents a count table (features x samples).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountTable {
    /// Lineage key -> one count per sample, in `sample_names` order.
    rows: IndexMap<String, Vec<u64>>,
    sample_names: Vec<String>,
}

impl CountTable {
    /// Creates a new, empty CountTable.
    pub fn new() -> Self {
        CountTable {
            rows: IndexMap::new(),
            sample_names: Vec::new(),
        }
    }

    /// Builds the joined table from the eligible records of every report.
    ///
    /// Rows are sorted by lineage key so repeated runs produce identical
    /// output regardless of the order lineages were first seen in.
    pub fn build_from_reports(
        reports: &[(String, Vec<LineageRecord>)],
        policy: DuplicatePolicy,
    ) -> Result<Self, ProcessingError> {
        let mut table = CountTable::new();
        for (sample_name, records) in reports {
            table.add_sample(sample_name, records, policy)?;
        }
        table.sort_features();
        debug!(
            "Built count table with {} taxa across {} samples",
            table.rows.len(),
            table.sample_names.len()
        );
        Ok(table)
    }

    /// Adds a sample column, outer-joining its records on lineage key.
    ///
    /// Existing rows get 0 for the new sample; new rows get 0 for every
    /// sample added before this one.
    pub fn add_sample(
        &mut self,
        sample_name: &str,
        records: &[LineageRecord],
        policy: DuplicatePolicy,
    ) -> Result<(), ProcessingError> {
        if self.sample_names.iter().any(|s| s == sample_name) {
            return Err(ProcessingError::Configuration(format!(
                "sample '{}' appears more than once among the inputs",
                sample_name
            )));
        }

        let relation = sample_relation(sample_name, records, policy)?;
        if relation.is_empty() {
            warn!(
                "Sample '{}' has no taxa at the requested rank; its column will be all zeros",
                sample_name
            );
        }

        let column = self.sample_names.len();
        self.sample_names.push(sample_name.to_string());
        for counts in self.rows.values_mut() {
            counts.push(0);
        }
        for (key, count) in relation {
            self.rows
                .entry(key)
                .or_insert_with(|| vec![0; column + 1])[column] = count;
        }
        Ok(())
    }

    /// Orders rows lexicographically by lineage key.
    pub fn sort_features(&mut self) {
        self.rows.sort_keys();
    }

    /// Keeps only the rows whose lineage key satisfies `keep`.
    pub fn retain_features<F>(&mut self, mut keep: F)
    where
        F: FnMut(&str) -> bool,
    {
        self.rows.retain(|key, _| keep(key));
    }

    /// Total reads per sample, in `sample_names` order.
    pub fn sample_totals(&self) -> Vec<u64> {
        let mut totals = vec![0u64; self.sample_names.len()];
        for counts in self.rows.values() {
            for (total, count) in totals.iter_mut().zip(counts) {
                *total += count;
            }
        }
        totals
    }

    /// Returns the dimensions of the count table (features, samples).
    pub fn dimensions(&self) -> (usize, usize) {
        (self.rows.len(), self.sample_names.len())
    }

    /// Lineage keys in row order.
    pub fn feature_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.rows.keys().map(String::as_str)
    }

    /// Rows as (lineage key, counts) pairs.
    pub fn rows(&self) -> impl Iterator<Item = (&str, &[u64])> + '_ {
        self.rows
            .iter()
            .map(|(key, counts)| (key.as_str(), counts.as_slice()))
    }

    /// Returns the list of sample names.
    pub fn sample_names(&self) -> &[String] {
        &self.sample_names
    }
}

/// Builds the {lineage key -> count} relation of one report.
fn sample_relation(
    sample_name: &str,
    records: &[LineageRecord],
    policy: DuplicatePolicy,
) -> Result<IndexMap<String, u64>, ProcessingError> {
    let mut relation: IndexMap<String, u64> = IndexMap::with_capacity(records.len());
    for record in records {
        match relation.entry(record.lineage_key()) {
            Entry::Vacant(slot) => {
                slot.insert(record.count());
            }
            Entry::Occupied(mut slot) => match policy {
                DuplicatePolicy::Error => {
                    return Err(ProcessingError::DuplicateLineage {
                        sample: sample_name.to_string(),
                        lineage: slot.key().clone(),
                    });
                }
                DuplicatePolicy::LastWins => {
                    warn!(
                        "Sample '{}': lineage '{}' repeated, keeping the later count",
                        sample_name,
                        slot.key()
                    );
                    slot.insert(record.count());
                }
                DuplicatePolicy::Sum => {
                    warn!(
                        "Sample '{}': lineage '{}' repeated, adding the counts",
                        sample_name,
                        slot.key()
                    );
                    *slot.get_mut() += record.count();
                }
            },
        }
    }
    Ok(relation)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(lineage: &str, count: u64) -> LineageRecord {
        LineageRecord::new(lineage.split('|').map(str::to_string).collect(), count)
    }

    fn counts_of<'a>(table: &'a CountTable, lineage: &str) -> Option<&'a [u64]> {
        table
            .rows()
            .find(|(key, _)| *key == lineage)
            .map(|(_, counts)| counts)
    }

    #[test]
    fn test_new_count_table() {
        let table = CountTable::new();
        assert_eq!(table.dimensions(), (0, 0));
        assert_eq!(table.feature_names().count(), 0);
        assert!(table.sample_names().is_empty());
    }

    #[test]
    fn test_outer_join_fills_zeros() {
        let reports = vec![
            (
                "A".to_string(),
                vec![
                    record("d__Bacteria|p__X|s__Y", 10),
                    record("d__Bacteria|p__X|s__Z", 3),
                ],
            ),
            ("B".to_string(), vec![record("d__Bacteria|p__X|s__Z", 5)]),
            ("C".to_string(), vec![record("d__Bacteria|p__W|s__V", 1)]),
        ];
        let table = CountTable::build_from_reports(&reports, DuplicatePolicy::Error).unwrap();

        assert_eq!(table.dimensions(), (3, 3));
        assert_eq!(table.sample_names(), &["A", "B", "C"]);
        assert_eq!(
            counts_of(&table, "d__Bacteria;p__X;s__Y"),
            Some(&[10, 0, 0][..])
        );
        assert_eq!(
            counts_of(&table, "d__Bacteria;p__X;s__Z"),
            Some(&[3, 5, 0][..])
        );
        assert_eq!(
            counts_of(&table, "d__Bacteria;p__W;s__V"),
            Some(&[0, 0, 1][..])
        );
        for (_, counts) in table.rows() {
            assert_eq!(counts.len(), 3);
        }
    }

    #[test]
    fn test_rows_sorted_by_lineage() {
        let reports = vec![
            ("A".to_string(), vec![record("d__Viruses|s__Q", 1)]),
            ("B".to_string(), vec![record("d__Bacteria|s__P", 2)]),
        ];
        let table = CountTable::build_from_reports(&reports, DuplicatePolicy::Error).unwrap();
        let names: Vec<&str> = table.feature_names().collect();
        assert_eq!(names, vec!["d__Bacteria;s__P", "d__Viruses;s__Q"]);
    }

    #[test]
    fn test_empty_report_gives_zero_column() {
        let reports = vec![
            ("A".to_string(), vec![record("d__Bacteria|s__P", 2)]),
            ("B".to_string(), Vec::new()),
        ];
        let table = CountTable::build_from_reports(&reports, DuplicatePolicy::Error).unwrap();
        assert_eq!(counts_of(&table, "d__Bacteria;s__P"), Some(&[2, 0][..]));
        assert_eq!(table.sample_totals(), vec![2, 0]);
    }

    #[test]
    fn test_duplicate_policies() {
        let records = vec![record("d__Bacteria|s__P", 2), record("d__Bacteria|s__P", 5)];
        let reports = vec![("A".to_string(), records)];

        let err = CountTable::build_from_reports(&reports, DuplicatePolicy::Error).unwrap_err();
        assert!(matches!(err, ProcessingError::DuplicateLineage { .. }));

        let last = CountTable::build_from_reports(&reports, DuplicatePolicy::LastWins).unwrap();
        assert_eq!(counts_of(&last, "d__Bacteria;s__P"), Some(&[5][..]));

        let sum = CountTable::build_from_reports(&reports, DuplicatePolicy::Sum).unwrap();
        assert_eq!(counts_of(&sum, "d__Bacteria;s__P"), Some(&[7][..]));
    }

    #[test]
    fn test_duplicate_sample_name_rejected() {
        let reports = vec![
            ("A".to_string(), vec![record("d__Bacteria|s__P", 2)]),
            ("A".to_string(), vec![record("d__Bacteria|s__Q", 2)]),
        ];
        let err = CountTable::build_from_reports(&reports, DuplicatePolicy::Error).unwrap_err();
        assert!(matches!(err, ProcessingError::Configuration(_)));
    }

    #[test]
    fn test_retain_features() {
        let reports = vec![(
            "A".to_string(),
            vec![record("d__Bacteria|s__P", 2), record("d__Viruses|s__Q", 4)],
        )];
        let mut table = CountTable::build_from_reports(&reports, DuplicatePolicy::Error).unwrap();
        table.retain_features(|key| key.starts_with("d__Viruses"));
        assert_eq!(table.dimensions(), (1, 1));
        assert_eq!(table.sample_totals(), vec![4]);
    }
}
