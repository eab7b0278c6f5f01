//! A region's coverage-decomposed exon fragment; the unit that becomes one
//! internal vertex of the splice graph.

use crate::position::AllelicPos;
use crate::vcf::Genotype;

/// Vertex life-cycle tag. `EmptyVertex` is a tombstone: downstream passes
/// treat the vertex as deleted while its index (and every hyper-set row that
/// mentions it) stays valid. `PseudoAs` marks placeholder allelic exons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PexonKind {
    #[default]
    Normal,
    EmptyVertex,
    PseudoAs,
}

#[derive(Debug, Clone)]
pub struct PartialExon {
    pub lpos: AllelicPos,
    pub rpos: AllelicPos,
    pub ltype: u32,
    pub rtype: u32,
    pub gt: Genotype,

    /// Parental region index.
    pub rid: usize,
    /// Index within the parental region's partial-exon list.
    pub rid2: usize,
    /// Index in the bundle's global sorted list; -1 until assigned.
    pub pid: i64,
    pub kind: PexonKind,

    pub ave: f64,
    pub max: f64,
    pub dev: f64,
}

impl PartialExon {
    pub fn new(lpos: AllelicPos, rpos: AllelicPos, ltype: u32, rtype: u32, gt: Genotype) -> Self {
        PartialExon {
            lpos,
            rpos,
            ltype,
            rtype,
            gt,
            rid: 0,
            rid2: 0,
            pid: -1,
            kind: PexonKind::Normal,
            ave: 0.0,
            max: 0.0,
            dev: 0.0,
        }
    }

    pub fn is_allelic(&self) -> bool {
        self.lpos.is_allelic() || self.rpos.is_allelic()
    }

    pub fn assign_as_cov(&mut self, ave: f64, max: f64, dev: f64) {
        self.ave = ave;
        self.max = max;
        self.dev = dev;
    }

    /// Sort key: leftmost coordinate first, allele tag breaking ties so that
    /// parallel allelic exons of one locus stay adjacent and deterministic.
    pub fn sort_key(&self) -> (i32, AllelicPos, i32) {
        (self.lpos.p, self.lpos.clone(), self.rpos.p)
    }
}
