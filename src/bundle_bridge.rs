//! Junction, region, and fragment inference over one bundle, plus the
//! allele-aware bridging passes.

use crate::bridger;
use crate::bundle_base::BundleBase;
use crate::config::Config;
use crate::error::BundleError;
use crate::fragment::Fragment;
use crate::hit::Hit;
use crate::junction::{majority_strand, Junction};
use crate::position::AllelicPos;
use crate::region::{
    Region, ALLELIC_LEFT_SPLICE, ALLELIC_RIGHT_SPLICE, END_BOUNDARY, LEFT_SPLICE, RIGHT_SPLICE,
    START_BOUNDARY,
};
use crate::transcript::Transcript;
use crate::types::HashSet;
use crate::util::{decode_vlist, encode_vlist, high32, low32};
use crate::vcf::{Genotype, VcfData};
use std::collections::BTreeMap;

// Mate misalignment tolerances for the terminal-region cleanliness flags,
// relaxed by the per-hit edit distance.
const MAX_MISALIGNMENT1: i32 = 20;
const MAX_MISALIGNMENT2: i32 = 10;

// UMI-linked fragment chaining is parked until the upstream design settles;
// the machinery stays in place but is never invoked.
const UMI_CHAINING: bool = false;

#[derive(Debug, Default)]
pub struct BundleBridge {
    pub junctions: Vec<Junction>,
    pub regions: Vec<Region>,
    pub fragments: Vec<Fragment>,
    /// Query names of successfully bridged reads.
    pub breads: HashSet<String>,
    /// Fragment chains linked by a shared UMI; unused while chaining is off.
    pub umi_link: Vec<Vec<usize>>,
    /// Reference transcripts overlapping the bundle; empty unless annotation
    /// is supplied upstream.
    pub ref_trsts: Vec<Transcript>,
}

impl BundleBridge {
    pub fn build(
        bb: &mut BundleBase,
        vcf: Option<&VcfData>,
        cfg: &Config,
    ) -> Result<Self, BundleError> {
        let mut br = BundleBridge::default();
        br.build_junctions(bb, cfg);
        br.extend_junctions(bb);
        br.build_regions(bb, vcf, cfg)?;
        br.align_hits(bb)?;
        br.build_fragments(bb, cfg);
        if UMI_CHAINING {
            br.build_umi_fragments(bb);
        }

        // Allele-specific bridging never crosses genotype lines; unphased
        // fragments stay eligible throughout.
        bridger::bridge_pass(bb, &br.regions, &mut br.fragments, &mut br.breads, Genotype::Allele1, cfg);
        bridger::bridge_pass(bb, &br.regions, &mut br.fragments, &mut br.breads, Genotype::Allele2, cfg);
        bridger::bridge_pass(bb, &br.regions, &mut br.fragments, &mut br.breads, Genotype::Unphased, cfg);
        Ok(br)
    }

    /// Group observed splice pairs; keep those with enough support; call the
    /// strand by majority of the supporting hits' xs tags.
    fn build_junctions(&mut self, bb: &BundleBase, cfg: &Config) {
        let mut m: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (i, h) in bb.hits.iter().enumerate() {
            for &p in &h.spos {
                m.entry(p).or_default().push(i);
            }
        }

        self.junctions.clear();
        for (p, v) in m {
            if v.len() < cfg.min_splice_boundary_hits {
                continue;
            }
            let (mut s0, mut s1, mut s2) = (0usize, 0usize, 0usize);
            for &i in &v {
                match bb.hits[i].xs {
                    '+' => s1 += 1,
                    '-' => s2 += 1,
                    _ => s0 += 1,
                }
            }
            let mut jc = Junction::new(high32(p), low32(p), v.len() as i32);
            jc.strand = majority_strand(s0, s1, s2);
            self.junctions.push(jc);
        }
        self.junctions.sort_by_key(|j| (j.lpos, j.rpos));
    }

    /// Fold in annotation introns wholly inside the bundle with negative
    /// support counts marking their origin. A no-op until reference
    /// transcripts are attached.
    fn extend_junctions(&mut self, bb: &BundleBase) {
        let mut m: BTreeMap<i64, Vec<usize>> = BTreeMap::new();
        for (i, t) in self.ref_trsts.iter().enumerate() {
            for (l, r) in t.intron_chain() {
                if l <= bb.lpos || r >= bb.rpos {
                    continue;
                }
                m.entry(crate::util::pack(l, r)).or_default().push(i);
            }
        }
        for (p, v) in m {
            let (mut s0, mut s1, mut s2) = (0usize, 0usize, 0usize);
            for &i in &v {
                match self.ref_trsts[i].strand {
                    '+' => s1 += 1,
                    '-' => s2 += 1,
                    _ => s0 += 1,
                }
            }
            let mut jc = Junction::new(high32(p), low32(p), -(v.len() as i32));
            jc.strand = majority_strand(s0, s1, s2);
            self.junctions.push(jc);
        }
        if !self.ref_trsts.is_empty() {
            self.junctions.sort_by_key(|j| (j.lpos, j.rpos));
        }
    }

    /// Partition the bundle span into regions between consecutive interesting
    /// positions, walking the splice-type map and the variant-locus map in
    /// parallel. Every variant locus yields one region per observed allele at
    /// identical coordinates.
    fn build_regions(
        &mut self,
        bb: &BundleBase,
        vcf: Option<&VcfData>,
        cfg: &Config,
    ) -> Result<(), BundleError> {
        let _ = cfg;
        let mut pos_types: BTreeMap<i32, u32> = BTreeMap::new();
        *pos_types.entry(bb.lpos).or_insert(0) |= START_BOUNDARY;
        *pos_types.entry(bb.rpos).or_insert(0) |= END_BOUNDARY;
        for jc in &self.junctions {
            *pos_types.entry(jc.lpos).or_insert(0) |= LEFT_SPLICE;
            *pos_types.entry(jc.rpos).or_insert(0) |= RIGHT_SPLICE;
        }

        // (locus span) -> allele string -> observed count
        let mut loci: BTreeMap<(i32, i32), BTreeMap<String, i32>> = BTreeMap::new();
        for h in &bb.hits {
            for (p, ale) in &h.apos {
                *loci
                    .entry((high32(*p), low32(*p)))
                    .or_default()
                    .entry(ale.clone())
                    .or_insert(0) += 1;
            }
        }
        for &(l, r) in loci.keys() {
            *pos_types.entry(l).or_insert(0) |= ALLELIC_LEFT_SPLICE;
            *pos_types.entry(r).or_insert(0) |= ALLELIC_RIGHT_SPLICE;
        }

        let positions: Vec<(i32, u32)> = pos_types.into_iter().collect();
        let mut locus_iter = loci.iter().peekable();

        self.regions.clear();
        for w in positions.windows(2) {
            let (l1, ltype) = w[0];
            let (r1, rtype) = w[1];
            match locus_iter.peek() {
                Some(&(&(l2, r2), alleles)) if l2 < r1 => {
                    if l1 != l2 || r1 != r2 {
                        return Err(BundleError::RegionLayout(format!(
                            "variant locus [{l2},{r2}) does not align with boundaries [{l1},{r1})"
                        )));
                    }
                    for (ale, &c) in alleles {
                        let gt = vcf
                            .map(|v| v.genotype(&bb.chrm, l2, ale))
                            .unwrap_or(Genotype::Unphased);
                        let mut rr = Region::new(
                            AllelicPos::with_allele(l2, ale),
                            AllelicPos::with_allele(r2, ale),
                            ltype,
                            rtype,
                            gt,
                        );
                        rr.assign_as_cov(c as f64, c as f64, 0.01);
                        self.regions.push(rr);
                    }
                    locus_iter.next();
                }
                _ => {
                    let mut rr = Region::new(
                        AllelicPos::new(l1),
                        AllelicPos::new(r1),
                        ltype,
                        rtype,
                        Genotype::Unphased,
                    );
                    let (ave, dev, max) = bb.mmap.rectangle(l1, r1);
                    rr.ave = ave;
                    rr.dev = dev;
                    rr.max = max;
                    self.regions.push(rr);
                }
            }
        }

        self.regions
            .sort_by(|a, b| (a.lpos.clone(), a.rpos.clone()).cmp(&(b.lpos.clone(), b.rpos.clone())));

        for k in 1..self.regions.len() {
            let prev = &self.regions[k - 1];
            let cur = &self.regions[k];
            let continuous = prev.rpos.same_coord(&cur.lpos);
            let parallel =
                prev.lpos.same_coord(&cur.lpos) && prev.rpos.same_coord(&cur.rpos);
            if !continuous && !parallel {
                return Err(BundleError::RegionLayout(format!(
                    "regions {} and {} neither adjacent nor parallel",
                    k - 1,
                    k
                )));
            }
        }
        Ok(())
    }

    /// Map every hit's aligned intervals onto region indices, storing the
    /// result run-length encoded in the hit.
    fn align_hits(&mut self, bb: &mut BundleBase) -> Result<(), BundleError> {
        let mut m1: BTreeMap<AllelicPos, usize> = BTreeMap::new();
        let mut m2: BTreeMap<AllelicPos, usize> = BTreeMap::new();
        for (k, r) in self.regions.iter().enumerate() {
            m1.insert(r.lpos.clone(), k);
            m2.insert(r.rpos.clone(), k);
        }

        for h in bb.hits.iter_mut() {
            let vv = align_hit(&self.regions, &m1, &m2, h)?;
            h.vlist = encode_vlist(&vv);
        }
        Ok(())
    }

    /// Pair mates by (qhash, mate position, insert size) through a bucketed
    /// index; genotype each fragment from the regions it spans.
    fn build_fragments(&mut self, bb: &mut BundleBase, cfg: &Config) {
        self.fragments.clear();
        if bb.hits.is_empty() {
            return;
        }

        let max_index = (bb.hits.len() + 1).min(1_000_000) as u64;
        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); max_index as usize];
        for (i, h) in bb.hits.iter().enumerate() {
            if h.isize >= 0 || h.vlist.is_empty() {
                continue;
            }
            let k = (h.qhash % max_index
                + (h.pos as u64) % max_index
                + ((-h.isize) as u64) % max_index)
                % max_index;
            buckets[k as usize].push(i);
        }

        for i in 0..bb.hits.len() {
            let h = &bb.hits[i];
            if h.paired || h.isize <= 0 || h.vlist.is_empty() {
                continue;
            }
            let k = (h.qhash % max_index
                + (h.mpos as u64) % max_index
                + (h.isize as u64) % max_index)
                % max_index;

            let mut x: Option<usize> = None;
            for &j in &buckets[k as usize] {
                let z = &bb.hits[j];
                if z.paired || z.pos != h.mpos || z.isize + h.isize != 0 {
                    continue;
                }
                if z.qhash != h.qhash || z.qname != h.qname {
                    continue;
                }
                x = Some(j);
                break;
            }
            let Some(x) = x else { continue };
            if bb.hits[x].vlist.is_empty() {
                continue;
            }

            let mut fr = Fragment::new(i, x);
            fr.ftype = 0;
            fr.lpos = bb.hits[i].pos;
            fr.rpos = bb.hits[x].rpos;

            let v1 = decode_vlist(&bb.hits[i].vlist);
            let v2 = decode_vlist(&bb.hits[x].vlist);
            let (h1, h2) = (&bb.hits[i], &bb.hits[x]);
            fr.k1l = h1.pos - self.regions[*v1.first().unwrap() as usize].lpos.p;
            fr.k1r = self.regions[*v1.last().unwrap() as usize].rpos.p - h1.rpos;
            fr.k2l = h2.pos - self.regions[*v2.first().unwrap() as usize].lpos.p;
            fr.k2r = self.regions[*v2.last().unwrap() as usize].rpos.p - h2.rpos;

            fr.b1 = terminal_clean_right(&v1, self.regions.as_slice(), h1);
            fr.b2 = terminal_clean_left(&v2, self.regions.as_slice(), h2);

            fr.gt = self.fragment_genotype(&v1, &v2, cfg);

            bb.hits[i].pi = x as i64;
            bb.hits[x].pi = i as i64;
            bb.hits[i].fidx = self.fragments.len() as i64;
            bb.hits[x].fidx = self.fragments.len() as i64;
            bb.hits[i].paired = true;
            bb.hits[x].paired = true;
            self.fragments.push(fr);
        }
    }

    /// Tally allele votes across every region the fragment touches; call the
    /// allele only when it clearly dominates.
    fn fragment_genotype(&self, v1: &[i32], v2: &[i32], cfg: &Config) -> Genotype {
        let mut seen: HashSet<i32> = v1.iter().copied().collect();
        seen.extend(v2.iter().copied());
        let mut a1 = 0usize;
        let mut a2 = 0usize;
        for &r in &seen {
            match self.regions[r as usize].gt {
                Genotype::Allele1 => a1 += 1,
                Genotype::Allele2 => a2 += 1,
                _ => {}
            }
        }
        let total = (a1 + a2) as f64;
        if a1 + a2 == 0 {
            Genotype::Unphased
        } else if a1 as f64 > total * cfg.major_gt_threshold {
            Genotype::Allele1
        } else if a2 as f64 > total * cfg.major_gt_threshold {
            Genotype::Allele2
        } else {
            Genotype::Unphased
        }
    }

    /// Chain fragments sharing a UMI into `umi_link`. Wired but not enabled;
    /// see the `UMI_CHAINING` gate.
    fn build_umi_fragments(&mut self, bb: &mut BundleBase) {
        let mut ub: Vec<String> = Vec::new();
        let mut hlist: Vec<Vec<usize>> = Vec::new();
        for (i, h) in bb.hits.iter().enumerate() {
            if (h.flag & 0x4) != 0 || h.umi.is_empty() {
                continue;
            }
            match ub.iter().position(|u| *u == h.umi) {
                Some(j) => hlist[j].push(i),
                None => {
                    ub.push(h.umi.clone());
                    hlist.push(vec![i]);
                }
            }
        }

        self.umi_link.clear();
        for list in hlist {
            if list.len() <= 1 {
                continue;
            }
            let mut flist = Vec::new();
            for w in list.windows(2) {
                let (i, j) = (w[0], w[1]);
                if bb.hits[i].pi == j as i64 && bb.hits[j].pi == i as i64 && bb.hits[i].paired {
                    let fidx = bb.hits[i].fidx as usize;
                    self.fragments[fidx].ftype = 2;
                    flist.push(fidx);
                    continue;
                }
                if bb.hits[i].vlist.is_empty() || bb.hits[j].vlist.is_empty() {
                    continue;
                }
                let mut fr = Fragment::new(i, j);
                fr.ftype = 1;
                fr.lpos = bb.hits[i].pos;
                fr.rpos = bb.hits[j].rpos;
                bb.hits[i].paired = true;
                bb.hits[j].paired = true;
                flist.push(self.fragments.len());
                self.fragments.push(fr);
            }
            self.umi_link.push(flist);
        }
    }

    // ── derived views over bridged fragments ────────────────────────────────

    /// Region indices of a fragment's single bridged path.
    pub fn splices_region_index(&self, fr: &Fragment) -> Vec<i32> {
        if !fr.is_bridged() {
            return Vec::new();
        }
        decode_vlist(&fr.paths[0].v)
    }

    /// The genomic intervals covered by a bridged fragment, split at its
    /// splice junctions.
    pub fn aligned_intervals(&self, bb: &BundleBase, fr: &Fragment) -> Vec<(i32, i32)> {
        let v = self.splices_region_index(fr);
        if v.is_empty() {
            return Vec::new();
        }
        let h1 = &bb.hits[fr.h1];
        let h2 = &bb.hits[fr.h2];

        let mut splices = Vec::new();
        for w in v.windows(2) {
            let pp = self.regions[w[0] as usize].rpos.p;
            let qq = self.regions[w[1] as usize].lpos.p;
            if pp > qq {
                continue;
            }
            splices.push(pp);
            splices.push(qq);
        }
        if let (Some(&first), Some(&last)) = (splices.first(), splices.last()) {
            if h1.pos >= first || h2.rpos <= last {
                return Vec::new();
            }
        }

        let mut bounds = Vec::with_capacity(splices.len() + 2);
        bounds.push(h1.pos);
        bounds.extend(splices);
        bounds.push(h2.rpos);
        bounds
            .chunks_exact(2)
            .map(|c| (c[0], c[1]))
            .filter(|(s, t)| s < t)
            .collect()
    }

    /// Aligned length of a region chain minus the terminal offsets.
    pub fn compute_aligned_length(&self, k1l: i32, k2r: i32, v: &[i32]) -> i32 {
        let mut flen = 0;
        for &k in v {
            let r = &self.regions[k as usize];
            flen += r.rpos.p - r.lpos.p;
        }
        flen - k1l - k2r
    }
}

/// Mirror the terminal-cleanliness rule on a mate's rightmost region: a tight
/// overhang into the last region is tolerated, more so when the last two
/// regions are genomically adjacent.
fn terminal_clean_right(v: &[i32], regions: &[Region], h: &Hit) -> bool {
    if v.len() <= 1 {
        return false;
    }
    let last = *v.last().unwrap() as usize;
    let adjacent = v[v.len() - 2] == *v.last().unwrap() - 1;
    let overhang = h.rpos - regions[last].lpos.p;
    let limit = if adjacent { MAX_MISALIGNMENT1 } else { MAX_MISALIGNMENT2 };
    overhang <= limit + h.nm
}

/// Symmetric rule on a mate's leftmost region.
fn terminal_clean_left(v: &[i32], regions: &[Region], h: &Hit) -> bool {
    if v.len() <= 1 {
        return false;
    }
    let first = v[0] as usize;
    let adjacent = v[1] == v[0] + 1;
    let overhang = regions[first].rpos.p - h.pos;
    let limit = if adjacent { MAX_MISALIGNMENT1 } else { MAX_MISALIGNMENT2 };
    overhang <= limit + h.nm
}

/// Locate each aligned interval of one hit in the region list and expand to
/// the full index chain. Allelic regions must be hit as single-index points.
fn align_hit(
    regions: &[Region],
    m1: &BTreeMap<AllelicPos, usize>,
    m2: &BTreeMap<AllelicPos, usize>,
    h: &Hit,
) -> Result<Vec<i32>, BundleError> {
    let v = h.aligned_intervals();
    if v.is_empty() {
        return Ok(Vec::new());
    }

    let n = v.len();
    let mut sp = vec![(0usize, 0usize); n];

    sp[0].0 = locate_left(regions, m1, &v[0].0)?;
    for k in 1..n {
        sp[k].0 = *m1.get(&v[k].0).ok_or_else(|| {
            BundleError::RegionLayout(format!("no region starts at {}", v[k].0))
        })?;
    }
    sp[n - 1].1 = locate_right(regions, m2, &v[n - 1].1)?;
    for k in 0..n - 1 {
        sp[k].1 = *m2.get(&v[k].1).ok_or_else(|| {
            BundleError::RegionLayout(format!("no region ends at {}", v[k].1))
        })?;
    }

    let mut vv = Vec::new();
    for k in 0..n {
        if sp[k].0 > sp[k].1 || (k > 0 && sp[k - 1].1 >= sp[k].0) {
            return Err(BundleError::RegionLayout(format!(
                "hit {} maps to non-increasing region spans",
                h.qname
            )));
        }
        for j in sp[k].0..=sp[k].1 {
            if regions[j].is_allelic() && sp[k].0 != sp[k].1 {
                return Err(BundleError::RegionLayout(format!(
                    "allelic region {} spanned as a range by {}",
                    j, h.qname
                )));
            }
            vv.push(j as i32);
        }
    }
    Ok(vv)
}

fn locate_left(
    regions: &[Region],
    m1: &BTreeMap<AllelicPos, usize>,
    x: &AllelicPos,
) -> Result<usize, BundleError> {
    if x.is_allelic() {
        return m1.get(x).copied().ok_or_else(|| {
            BundleError::RegionLayout(format!("no allelic region starts at {x}"))
        });
    }
    locate_region(regions, x.p)
}

fn locate_right(
    regions: &[Region],
    m2: &BTreeMap<AllelicPos, usize>,
    x: &AllelicPos,
) -> Result<usize, BundleError> {
    if x.is_allelic() {
        return m2.get(x).copied().ok_or_else(|| {
            BundleError::RegionLayout(format!("no allelic region ends at {x}"))
        });
    }
    locate_region(regions, x.p - 1)
}

/// Binary search for the region containing non-allelic coordinate `x`.
fn locate_region(regions: &[Region], x: i32) -> Result<usize, BundleError> {
    let (mut lo, mut hi) = (0usize, regions.len());
    while lo < hi {
        let m = (lo + hi) / 2;
        let r = &regions[m];
        if x < r.lpos.p {
            hi = m;
        } else if x >= r.rpos.p {
            lo = m + 1;
        } else {
            return Ok(m);
        }
    }
    Err(BundleError::RegionLayout(format!(
        "coordinate {x} outside every region"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_exon_bundle(n: usize) -> BundleBase {
        let mut bb = BundleBase::new(false);
        for i in 0..n {
            bb.add_hit(Hit::synthetic(
                0,
                &format!("r{i}"),
                &[(100, 150), (250, 300)],
                &[],
                '+',
                0,
                0,
                0,
            ))
            .unwrap();
        }
        bb
    }

    #[test]
    fn junctions_and_regions_for_spliced_reads() {
        let mut bb = two_exon_bundle(10);
        let cfg = Config::default();
        let br = BundleBridge::build(&mut bb, None, &cfg).unwrap();

        assert_eq!(br.junctions.len(), 1);
        assert_eq!((br.junctions[0].lpos, br.junctions[0].rpos), (150, 250));
        assert_eq!(br.junctions[0].count, 10);
        assert_eq!(br.junctions[0].strand, '+');

        // regions: [100,150), [150,250) (the intron), [250,300)
        assert_eq!(br.regions.len(), 3);
        assert_eq!(br.regions[0].ltype, START_BOUNDARY);
        assert_eq!(br.regions[0].rtype, LEFT_SPLICE);
        assert_eq!(br.regions[2].ltype, RIGHT_SPLICE);
        assert_eq!(br.regions[2].rtype, END_BOUNDARY);
        assert_eq!(br.regions[2].rpos.p, 300);

        // every hit spans region 0 and region 2
        for h in &bb.hits {
            assert_eq!(decode_vlist(&h.vlist), vec![0, 2]);
        }
    }

    #[test]
    fn variant_locus_produces_parallel_regions() {
        let mut vcf = VcfData::default();
        vcf.insert("", 125, 1, &[("A", Genotype::Allele1), ("G", Genotype::Allele2)]);

        let mut bb = BundleBase::new(true);
        for i in 0..5 {
            bb.add_hit(Hit::synthetic(
                0,
                &format!("a{i}"),
                &[(100, 150), (250, 300)],
                &[(125, 1, "A")],
                '+',
                0,
                0,
                0,
            ))
            .unwrap();
            bb.add_hit(Hit::synthetic(
                0,
                &format!("g{i}"),
                &[(100, 150), (250, 300)],
                &[(125, 1, "G")],
                '+',
                0,
                0,
                0,
            ))
            .unwrap();
        }
        let cfg = Config::default();
        let br = BundleBridge::build(&mut bb, Some(&vcf), &cfg).unwrap();

        // [100,125) [125,126)A [125,126)G [126,150) [150,250) [250,300)
        assert_eq!(br.regions.len(), 6);
        assert!(br.regions[1].is_allelic());
        assert!(br.regions[2].is_allelic());
        assert_eq!(br.regions[1].gt, Genotype::Allele1);
        assert_eq!(br.regions[2].gt, Genotype::Allele2);
        assert!((br.regions[1].ave - 5.0).abs() < 1e-9);
        assert!(br.regions[1].lpos.same_coord(&br.regions[2].lpos));

        let va = decode_vlist(&bb.hits[0].vlist);
        assert_eq!(va, vec![0, 1, 3, 5]);
        let vg = decode_vlist(&bb.hits[1].vlist);
        assert_eq!(vg, vec![0, 2, 3, 5]);
    }

    #[test]
    fn mates_pair_into_genotyped_fragments() {
        let mut vcf = VcfData::default();
        vcf.insert("", 125, 1, &[("A", Genotype::Allele1), ("G", Genotype::Allele2)]);

        let mut bb = BundleBase::new(true);
        for i in 0..3 {
            let q = format!("p{i}");
            bb.add_hit(Hit::synthetic(0, &q, &[(100, 180)], &[(125, 1, "A")], '.', 220, 200, 0x43))
                .unwrap();
            bb.add_hit(Hit::synthetic(0, &q, &[(220, 300)], &[], '.', 100, -200, 0x83))
                .unwrap();
        }
        let cfg = Config::default();
        let br = BundleBridge::build(&mut bb, Some(&vcf), &cfg).unwrap();

        assert_eq!(br.fragments.len(), 3);
        for fr in &br.fragments {
            assert_eq!(fr.gt, Genotype::Allele1);
            assert_eq!(fr.ftype, 0);
            assert!(bb.hits[fr.h1].paired && bb.hits[fr.h2].paired);
        }
    }
}
