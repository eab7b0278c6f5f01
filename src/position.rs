//! Reference coordinates extended with an allele tag.
//!
//! Most positions in a bundle are plain reference offsets; at a variant locus
//! the same offset exists once per observed allele. `AllelicPos` keeps the two
//! apart: ordering is primarily by the integer coordinate, and at identical
//! coordinates the non-allelic position sorts before any named allele. All
//! coordinate arithmetic uses the integer component only.

use std::fmt;

/// Allele tag of a position: non-allelic, or a nucleotide string naming the
/// allele observed at this locus.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Allele {
    #[default]
    NonAllelic,
    Seq(String),
}

impl Allele {
    pub fn is_allelic(&self) -> bool {
        matches!(self, Allele::Seq(_))
    }
}

impl fmt::Display for Allele {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Allele::NonAllelic => write!(f, "$"),
            Allele::Seq(s) => write!(f, "{s}"),
        }
    }
}

/// A reference coordinate plus its allele tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AllelicPos {
    pub p: i32,
    pub allele: Allele,
}

impl AllelicPos {
    pub fn new(p: i32) -> Self {
        AllelicPos { p, allele: Allele::NonAllelic }
    }

    pub fn with_allele(p: i32, allele: &str) -> Self {
        AllelicPos { p, allele: Allele::Seq(allele.to_string()) }
    }

    pub fn is_allelic(&self) -> bool {
        self.allele.is_allelic()
    }

    // Coordinate-only comparisons. Two positions with different allele tags
    // are equal for interval containment when their integers agree.
    pub fn same_coord(&self, o: &AllelicPos) -> bool {
        self.p == o.p
    }

    pub fn left_of(&self, o: &AllelicPos) -> bool {
        self.p < o.p
    }

    pub fn left_or_same(&self, o: &AllelicPos) -> bool {
        self.p <= o.p
    }

    pub fn right_of(&self, o: &AllelicPos) -> bool {
        self.p > o.p
    }

    pub fn right_or_same(&self, o: &AllelicPos) -> bool {
        self.p >= o.p
    }
}

impl fmt::Display for AllelicPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.allele {
            Allele::NonAllelic => write!(f, "{}", self.p),
            Allele::Seq(s) => write!(f, "{}{}", self.p, s),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_allelic_orders_before_named_alleles() {
        let plain = AllelicPos::new(125);
        let a = AllelicPos::with_allele(125, "A");
        let g = AllelicPos::with_allele(125, "G");
        assert!(plain < a);
        assert!(a < g);
        assert!(plain.same_coord(&a));
        assert!(a.same_coord(&g));
    }

    #[test]
    fn coordinate_dominates_allele_in_ordering() {
        let late_plain = AllelicPos::new(200);
        let early_allelic = AllelicPos::with_allele(100, "T");
        assert!(early_allelic < late_plain);
        assert!(early_allelic.left_of(&late_plain));
    }
}
