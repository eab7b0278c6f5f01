//! Per-bundle read accumulator: hits plus the reference coverage maps.

use crate::error::BundleError;
use crate::hit::Hit;
use crate::interval::CoverageMap;
use crate::util::{high32, low32};

#[derive(Debug, Default)]
pub struct BundleBase {
    pub tid: i32,
    pub chrm: String,
    pub lpos: i32,
    pub rpos: i32,
    pub strand: char,
    pub hits: Vec<Hit>,

    /// Match coverage over the reference.
    pub mmap: CoverageMap,
    /// Intron (and deletion) coverage.
    pub imap: CoverageMap,
    /// Non-allelic match coverage; mirrors `mmap` when no variant file is in
    /// play.
    pub nammap: CoverageMap,

    pub is_allelic: bool,
    has_vcf: bool,
}

impl BundleBase {
    pub fn new(has_vcf: bool) -> Self {
        BundleBase {
            tid: -1,
            lpos: 1 << 30,
            rpos: 0,
            strand: '.',
            has_vcf,
            ..BundleBase::default()
        }
    }

    pub fn add_hit(&mut self, ht: Hit) -> Result<(), BundleError> {
        if ht.pos < self.lpos {
            self.lpos = ht.pos;
        }
        if ht.rpos > self.rpos {
            self.rpos = ht.rpos;
        }

        if self.tid == -1 {
            self.tid = ht.tid;
        } else if self.tid != ht.tid {
            return Err(BundleError::MixedHits(format!(
                "tid {} vs bundle tid {}",
                ht.tid, self.tid
            )));
        }

        if self.hits.is_empty() {
            self.strand = ht.strand;
        } else if self.strand != ht.strand {
            return Err(BundleError::MixedHits(format!(
                "strand {} vs bundle strand {}",
                ht.strand, self.strand
            )));
        }

        if !ht.apos.is_empty() {
            self.is_allelic = true;
        }

        for &itv in &ht.itvm {
            self.mmap.add(high32(itv), low32(itv));
        }
        for &itv in &ht.itvi {
            self.imap.add(high32(itv), low32(itv));
        }
        for &itv in &ht.itvd {
            self.imap.add(high32(itv), low32(itv));
        }
        if self.has_vcf {
            for &itv in &ht.itvna {
                self.nammap.add(high32(itv), low32(itv));
            }
        } else {
            for &itv in &ht.itvm {
                self.nammap.add(high32(itv), low32(itv));
            }
        }

        self.hits.push(ht);
        Ok(())
    }

    /// Whether either end of the hit lands on already-covered reference.
    pub fn overlap(&self, ht: &Hit) -> bool {
        self.mmap.covered(ht.pos) || self.mmap.covered(ht.rpos - 1)
    }

    pub fn clear(&mut self) {
        self.tid = -1;
        self.chrm.clear();
        self.lpos = 1 << 30;
        self.rpos = 0;
        self.strand = '.';
        self.hits.clear();
        self.mmap.clear();
        self.imap.clear();
        self.nammap.clear();
        self.is_allelic = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_hit_extends_span_and_marks_allelic() {
        let mut bb = BundleBase::new(true);
        bb.add_hit(Hit::synthetic(0, "a", &[(100, 150)], &[], '.', 0, 0, 0))
            .unwrap();
        assert_eq!((bb.lpos, bb.rpos), (100, 150));
        assert!(!bb.is_allelic);

        bb.add_hit(Hit::synthetic(0, "b", &[(120, 180)], &[(125, 1, "A")], '.', 0, 0, 0))
            .unwrap();
        assert_eq!((bb.lpos, bb.rpos), (100, 180));
        assert!(bb.is_allelic);
        assert!(bb.overlap(&Hit::synthetic(0, "c", &[(170, 220)], &[], '.', 0, 0, 0)));
    }

    #[test]
    fn mixed_tid_is_a_bundle_error() {
        let mut bb = BundleBase::new(false);
        bb.add_hit(Hit::synthetic(0, "a", &[(100, 150)], &[], '.', 0, 0, 0))
            .unwrap();
        let e = bb.add_hit(Hit::synthetic(1, "b", &[(100, 150)], &[], '.', 0, 0, 0));
        assert!(e.is_err());
    }
}
