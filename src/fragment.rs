//! Paired (or UMI-linked) read clusters and their bridged paths.

use crate::vcf::Genotype;

/// One candidate path connecting a fragment's two mates through the region
/// list. `v` is a run-length-encoded region index chain.
#[derive(Debug, Clone)]
pub struct FragmentPath {
    /// 1: bridged through junction evidence; 2: filled across contiguous
    /// coverage without junction support.
    pub ptype: i32,
    pub v: Vec<i32>,
    pub length: i32,
}

#[derive(Debug, Clone)]
pub struct Fragment {
    /// Hit indices into the bundle's hit arena.
    pub h1: usize,
    pub h2: usize,

    pub lpos: i32,
    pub rpos: i32,

    /// 0: paired-end, 1: UMI-only, 2: both.
    pub ftype: i32,
    pub cnt: i32,

    /// Offsets of each mate's alignment ends into its terminal regions.
    pub k1l: i32,
    pub k1r: i32,
    pub k2l: i32,
    pub k2r: i32,
    /// Whether each mate's terminal region is clean enough to anchor a bridge.
    pub b1: bool,
    pub b2: bool,

    pub gt: Genotype,
    /// UMI-link cluster id; unused until UMI chaining is wired up.
    pub ucid: i64,

    pub paths: Vec<FragmentPath>,
}

impl Fragment {
    pub fn new(h1: usize, h2: usize) -> Self {
        Fragment {
            h1,
            h2,
            lpos: 0,
            rpos: 0,
            ftype: 0,
            cnt: 1,
            k1l: 0,
            k1r: 0,
            k2l: 0,
            k2r: 0,
            b1: false,
            b2: false,
            gt: Genotype::Unphased,
            ucid: -1,
            paths: Vec::new(),
        }
    }

    pub fn is_bridged(&self) -> bool {
        self.paths.len() == 1 && (self.paths[0].ptype == 1 || self.paths[0].ptype == 2)
    }
}
