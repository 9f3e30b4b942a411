//! Taxonomic classification utilities.
//!
//! This module provides the fixed eight-level rank schema used by Kraken2
//! mpa-style reports, the prefix each rank carries in a lineage token
//! (`d__Bacteria`, `s__Escherichia_coli`, ...), and the organism groups the
//! output tables can be restricted to.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Taxonomic classification levels, ordered from the root down.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
pub enum TaxonomicLevel {
    #[value(name = "D")]
    Domain,
    #[value(name = "K")]
    Kingdom,
    #[value(name = "P")]
    Phylum,
    #[value(name = "C")]
    Class,
    #[value(name = "O")]
    Order,
    #[value(name = "F")]
    Family,
    #[value(name = "G")]
    Genus,
    #[value(name = "S")]
    Species,
}

const ALL_LEVELS: [TaxonomicLevel; 8] = [
    TaxonomicLevel::Domain,
    TaxonomicLevel::Kingdom,
    TaxonomicLevel::Phylum,
    TaxonomicLevel::Class,
    TaxonomicLevel::Order,
    TaxonomicLevel::Family,
    TaxonomicLevel::Genus,
    TaxonomicLevel::Species,
];

impl TaxonomicLevel {
    /// Single-letter rank code used on the command line.
    pub fn code(&self) -> char {
        match self {
            TaxonomicLevel::Domain => 'D',
            TaxonomicLevel::Kingdom => 'K',
            TaxonomicLevel::Phylum => 'P',
            TaxonomicLevel::Class => 'C',
            TaxonomicLevel::Order => 'O',
            TaxonomicLevel::Family => 'F',
            TaxonomicLevel::Genus => 'G',
            TaxonomicLevel::Species => 'S',
        }
    }

    /// The three-character prefix a lineage token at this level starts with.
    ///
    /// A bare prefix is also the placeholder written for a level the lineage
    /// does not specify.
    pub fn prefix(&self) -> &'static str {
        match self {
            TaxonomicLevel::Domain => "d__",
            TaxonomicLevel::Kingdom => "k__",
            TaxonomicLevel::Phylum => "p__",
            TaxonomicLevel::Class => "c__",
            TaxonomicLevel::Order => "o__",
            TaxonomicLevel::Family => "f__",
            TaxonomicLevel::Genus => "g__",
            TaxonomicLevel::Species => "s__",
        }
    }

    /// Column header used in the taxonomy table.
    pub fn column_name(&self) -> &'static str {
        match self {
            TaxonomicLevel::Domain => "Domain",
            TaxonomicLevel::Kingdom => "Kingdom",
            TaxonomicLevel::Phylum => "Phylum",
            TaxonomicLevel::Class => "Class",
            TaxonomicLevel::Order => "Order",
            TaxonomicLevel::Family => "Family",
            TaxonomicLevel::Genus => "Genus",
            TaxonomicLevel::Species => "Species",
        }
    }

    /// Returns the hierarchical depth of this level.
    pub fn depth(&self) -> usize {
        match self {
            TaxonomicLevel::Domain => 1,
            TaxonomicLevel::Kingdom => 2,
            TaxonomicLevel::Phylum => 3,
            TaxonomicLevel::Class => 4,
            TaxonomicLevel::Order => 5,
            TaxonomicLevel::Family => 6,
            TaxonomicLevel::Genus => 7,
            TaxonomicLevel::Species => 8,
        }
    }

    /// The taxonomy table schema for a table built at this rank: every level
    /// from Domain down to and including `self`.
    pub fn levels_through(&self) -> &'static [TaxonomicLevel] {
        &ALL_LEVELS[..self.depth()]
    }

    /// True when `token` is a lineage token at this level.
    pub fn matches_token(&self, token: &str) -> bool {
        token.starts_with(self.prefix())
    }
}

impl fmt::Display for TaxonomicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Organism groups the output tables can be restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
pub enum Organism {
    #[value(name = "Bacteria")]
    Bacteria,
    #[value(name = "Viruses")]
    Viruses,
    #[value(name = "Archaea")]
    Archaea,
    /// Mapped but not offered on the command line.
    #[value(skip)]
    Eukaryota,
    #[value(name = "Fungi")]
    Fungi,
}

impl Organism {
    pub fn as_str(&self) -> &'static str {
        match self {
            Organism::Bacteria => "Bacteria",
            Organism::Viruses => "Viruses",
            Organism::Archaea => "Archaea",
            Organism::Eukaryota => "Eukaryota",
            Organism::Fungi => "Fungi",
        }
    }

    /// The lineage token a taxonomy row must carry to belong to this group.
    pub fn filter_token(&self) -> &'static str {
        match self {
            Organism::Bacteria => "d__Bacteria",
            Organism::Viruses => "d__Viruses",
            Organism::Archaea => "d__Archaea",
            Organism::Eukaryota => "d__Eukaryota",
            Organism::Fungi => "k__Fungi",
        }
    }

    /// The taxonomy column compared against [`Organism::filter_token`].
    pub fn filter_level(&self) -> TaxonomicLevel {
        match self {
            Organism::Fungi => TaxonomicLevel::Kingdom,
            _ => TaxonomicLevel::Domain,
        }
    }

    pub fn is_fungi(&self) -> bool {
        matches!(self, Organism::Fungi)
    }
}

impl fmt::Display for Organism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxonomic_level_prefix() {
        assert_eq!(TaxonomicLevel::Domain.prefix(), "d__");
        assert_eq!(TaxonomicLevel::Kingdom.prefix(), "k__");
        assert_eq!(TaxonomicLevel::Species.prefix(), "s__");
    }

    #[test]
    fn test_taxonomic_level_depth() {
        assert_eq!(TaxonomicLevel::Domain.depth(), 1);
        assert_eq!(TaxonomicLevel::Species.depth(), 8);
    }

    #[test]
    fn test_levels_through() {
        assert_eq!(
            TaxonomicLevel::Domain.levels_through(),
            &[TaxonomicLevel::Domain]
        );
        assert_eq!(
            TaxonomicLevel::Phylum.levels_through(),
            &[
                TaxonomicLevel::Domain,
                TaxonomicLevel::Kingdom,
                TaxonomicLevel::Phylum
            ]
        );
        assert_eq!(TaxonomicLevel::Species.levels_through().len(), 8);
        for level in &ALL_LEVELS {
            assert_eq!(level.levels_through().last(), Some(level));
        }
    }

    #[test]
    fn test_matches_token() {
        assert!(TaxonomicLevel::Genus.matches_token("g__Escherichia"));
        assert!(TaxonomicLevel::Genus.matches_token("g__"));
        assert!(!TaxonomicLevel::Genus.matches_token("s__Escherichia_coli"));
        assert!(!TaxonomicLevel::Genus.matches_token("g_"));
        assert!(!TaxonomicLevel::Genus.matches_token(""));
    }

    #[test]
    fn test_organism_filter() {
        assert_eq!(Organism::Bacteria.filter_token(), "d__Bacteria");
        assert_eq!(Organism::Eukaryota.filter_token(), "d__Eukaryota");
        assert_eq!(Organism::Fungi.filter_token(), "k__Fungi");
        assert_eq!(Organism::Fungi.filter_level(), TaxonomicLevel::Kingdom);
        assert_eq!(Organism::Viruses.filter_level(), TaxonomicLevel::Domain);
    }

    #[test]
    fn test_eukaryota_not_offered_on_cli() {
        let names: Vec<String> = Organism::value_variants()
            .iter()
            .filter_map(|o| o.to_possible_value())
            .map(|v| v.get_name().to_string())
            .collect();
        assert_eq!(names, vec!["Bacteria", "Viruses", "Archaea", "Fungi"]);
    }
}
