//! The taxonomy table: one row per abundance-table taxon, one column per
//! taxonomic level from Domain down to the requested rank.
//!
//! Levels are decoded from the prefixed tokens of the lineage key. A level
//! the lineage does not mention keeps its bare prefix (`k__`, `p__`, ...)
//! so the sparsity of the source report stays visible in the output.

use std::collections::HashSet;

use crate::bio::{leaf_taxon, TaxonomicLevel, LINEAGE_KEY_SEPARATOR};

/// Header of the leaf-taxon column, the join key back to the count table.
pub const TAXONOMY_KEY_COLUMN: &str = "#TAXONOMY";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyRow {
    taxon: String,
    values: Vec<String>,
}

impl TaxonomyRow {
    /// The leaf taxon, written in the `#TAXONOMY` column.
    pub fn taxon(&self) -> &str {
        &self.taxon
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxonomyTable {
    columns: Vec<String>,
    rows: Vec<TaxonomyRow>,
}

/// Decodes one lineage key into one value per level of `rank`'s schema.
///
/// Every token is checked against every level; when several tokens carry the
/// same prefix the last one wins.
pub fn decode_lineage(lineage_key: &str, rank: TaxonomicLevel) -> Vec<String> {
    let levels = rank.levels_through();
    let mut values: Vec<String> = levels.iter().map(|l| l.prefix().to_string()).collect();
    for token in lineage_key.split(LINEAGE_KEY_SEPARATOR) {
        for (value, level) in values.iter_mut().zip(levels) {
            if level.matches_token(token) {
                *value = token.to_string();
            }
        }
    }
    values
}

impl TaxonomyTable {
    /// Builds the table for the given lineage keys, preserving their order.
    pub fn decompose<'a, I>(lineage_keys: I, rank: TaxonomicLevel) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let columns = rank
            .levels_through()
            .iter()
            .map(|level| level.column_name().to_string())
            .collect();
        let rows = lineage_keys
            .into_iter()
            .map(|lineage| TaxonomyRow {
                taxon: leaf_taxon(lineage).to_string(),
                values: decode_lineage(lineage, rank),
            })
            .collect();
        TaxonomyTable { columns, rows }
    }

    /// Level column headers, excluding `#TAXONOMY`.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TaxonomyRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn retain_rows<F>(&mut self, keep: F)
    where
        F: FnMut(&TaxonomyRow) -> bool,
    {
        self.rows.retain(keep);
    }

    /// Removes a level column. Returns false if it was not present.
    pub fn drop_column(&mut self, name: &str) -> bool {
        let Some(index) = self.column_index(name) else {
            return false;
        };
        self.columns.remove(index);
        for row in &mut self.rows {
            row.values.remove(index);
        }
        true
    }

    /// Renames a level column in place. Returns false if it was not present.
    pub fn rename_column(&mut self, from: &str, to: &str) -> bool {
        match self.column_index(from) {
            Some(index) => {
                self.columns[index] = to.to_string();
                true
            }
            None => false,
        }
    }

    /// The set of leaf taxa present in the table.
    pub fn taxa(&self) -> HashSet<&str> {
        self.rows.iter().map(|row| row.taxon.as_str()).collect()
    }
}
