//! Atomic intervals between boundary positions, and their decomposition into
//! partial exons by observed coverage.

use crate::config::Config;
use crate::interval::CoverageMap;
use crate::partial_exon::{PartialExon, PexonKind};
use crate::position::AllelicPos;
use crate::vcf::Genotype;

// Boundary-type bits. A position can be several of these at once; region and
// partial-exon boundary types are the OR of the bits observed there.
pub const START_BOUNDARY: u32 = 1;
pub const END_BOUNDARY: u32 = 2;
pub const LEFT_SPLICE: u32 = 4;
pub const RIGHT_SPLICE: u32 = 8;
pub const ALLELIC_LEFT_SPLICE: u32 = 16;
pub const ALLELIC_RIGHT_SPLICE: u32 = 32;

#[derive(Debug, Clone)]
pub struct Region {
    pub lpos: AllelicPos,
    pub rpos: AllelicPos,
    pub ltype: u32,
    pub rtype: u32,
    pub gt: Genotype,
    pub ave: f64,
    pub dev: f64,
    pub max: f64,
    pub pexons: Vec<PartialExon>,
}

impl Region {
    pub fn new(lpos: AllelicPos, rpos: AllelicPos, ltype: u32, rtype: u32, gt: Genotype) -> Self {
        Region {
            lpos,
            rpos,
            ltype,
            rtype,
            gt,
            ave: 0.0,
            dev: 0.0,
            max: 0.0,
            pexons: Vec::new(),
        }
    }

    pub fn is_allelic(&self) -> bool {
        self.lpos.is_allelic() || self.rpos.is_allelic()
    }

    /// Fix the coverage of an allelic region from the observed allele count.
    pub fn assign_as_cov(&mut self, ave: f64, max: f64, dev: f64) {
        self.ave = ave;
        self.max = max;
        self.dev = dev;
    }

    /// Split a non-allelic region into partial exons along the covered blocks
    /// of `fmap`. A block inherits the region's boundary type on a side it
    /// touches and becomes a plain start/end boundary where coverage cut it.
    pub fn rebuild(&mut self, fmap: &CoverageMap, cfg: &Config) {
        debug_assert!(!self.is_allelic());
        self.pexons.clear();

        let l = self.lpos.p;
        let r = self.rpos.p;
        for (bs, bt) in fmap.covered_blocks(l, r) {
            if bt - bs < cfg.min_flank_length && (bs != l || bt != r) {
                continue;
            }
            let ltype = if bs == l { self.ltype } else { START_BOUNDARY };
            let rtype = if bt == r { self.rtype } else { END_BOUNDARY };
            let (ave, dev, max) = fmap.rectangle(bs, bt);
            let mut pe = PartialExon::new(
                AllelicPos::new(bs),
                AllelicPos::new(bt),
                ltype,
                rtype,
                self.gt,
            );
            pe.ave = ave;
            pe.dev = dev;
            pe.max = max;
            pe.kind = PexonKind::Normal;
            self.pexons.push(pe);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain_region(l: i32, r: i32) -> Region {
        Region::new(
            AllelicPos::new(l),
            AllelicPos::new(r),
            START_BOUNDARY,
            END_BOUNDARY,
            Genotype::Unphased,
        )
    }

    #[test]
    fn rebuild_splits_region_at_coverage_gaps() {
        let mut fmap = CoverageMap::new();
        for _ in 0..4 {
            fmap.add(100, 140);
            fmap.add(160, 200);
        }
        let mut r = plain_region(100, 200);
        r.rebuild(&fmap, &Config::default());
        assert_eq!(r.pexons.len(), 2);
        assert_eq!(r.pexons[0].lpos.p, 100);
        assert_eq!(r.pexons[0].rpos.p, 140);
        assert_eq!(r.pexons[0].ltype, START_BOUNDARY);
        assert_eq!(r.pexons[0].rtype, END_BOUNDARY);
        assert_eq!(r.pexons[1].lpos.p, 160);
        assert!((r.pexons[1].ave - 4.0).abs() < 1e-9);
    }

    #[test]
    fn rebuild_keeps_region_boundaries_on_touching_blocks() {
        let mut fmap = CoverageMap::new();
        fmap.add(100, 200);
        let mut r = Region::new(
            AllelicPos::new(100),
            AllelicPos::new(200),
            LEFT_SPLICE,
            RIGHT_SPLICE,
            Genotype::Unphased,
        );
        r.rebuild(&fmap, &Config::default());
        assert_eq!(r.pexons.len(), 1);
        assert_eq!(r.pexons[0].ltype, LEFT_SPLICE);
        assert_eq!(r.pexons[0].rtype, RIGHT_SPLICE);
    }

    #[test]
    fn rebuild_of_uncovered_region_yields_nothing() {
        let fmap = CoverageMap::new();
        let mut r = plain_region(100, 200);
        r.rebuild(&fmap, &Config::default());
        assert!(r.pexons.is_empty());
    }
}
