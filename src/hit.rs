//! One read alignment and everything the bundle needs from it: CIGAR-derived
//! intervals, splice positions, variant overlaps with the observed allele
//! string, and mate-pairing bookkeeping.

use crate::config::{Config, LibraryType};
use crate::position::AllelicPos;
use crate::util::{high32, low32, pack, qname_hash};
use crate::vcf::VcfData;
use rust_htslib::bam::record::{Aux, Cigar, Record};

#[derive(Debug, Clone, Default)]
pub struct Hit {
    pub tid: i32,
    pub pos: i32,
    pub rpos: i32,
    pub mpos: i32,
    pub isize: i32,
    pub qual: u8,
    pub flag: u16,
    pub n_cigar: usize,
    pub strand: char,
    pub xs: char,
    pub nh: i32,
    pub nm: i32,
    pub qlen: i32,
    pub qname: String,
    pub qhash: u64,
    pub umi: String,

    /// Match intervals (one per M run), packed `[s, t)`.
    pub itvm: Vec<i64>,
    /// Intron intervals from N operations.
    pub itvi: Vec<i64>,
    /// Deletion intervals; counted with introns for coverage purposes.
    pub itvd: Vec<i64>,
    /// Exon segments: match and deletion runs merged, split only at N.
    pub segs: Vec<i64>,
    /// Non-allelic parts of the match intervals (variant loci cut out).
    pub itvna: Vec<i64>,
    /// Splice positions, packed (intron start, intron end).
    pub spos: Vec<i64>,
    /// Overlapped variant loci: packed span plus the observed allele string.
    pub apos: Vec<(i64, String)>,

    /// Region indices spanned by this hit, run-length encoded.
    pub vlist: Vec<i32>,

    pub paired: bool,
    pub bridged: bool,
    /// Index of the mate hit once paired, -1 otherwise.
    pub pi: i64,
    /// Index of the owning fragment once paired, -1 otherwise.
    pub fidx: i64,
}

impl Hit {
    pub fn from_record(
        record: &Record,
        chrm: &str,
        cfg: &Config,
        vcf: Option<&VcfData>,
    ) -> Self {
        let pos = record.pos() as i32;
        let seq = record.seq().as_bytes();
        let qname = String::from_utf8_lossy(record.qname()).to_string();

        let mut h = Hit {
            tid: record.tid(),
            pos,
            rpos: pos,
            mpos: record.mpos() as i32,
            isize: record.insert_size() as i32,
            qual: record.mapq(),
            flag: record.flags(),
            n_cigar: record.cigar_len(),
            strand: '.',
            xs: aux_char(record, b"XS").unwrap_or('.'),
            nh: aux_int(record, b"NH").unwrap_or(1) as i32,
            nm: aux_int(record, b"NM").unwrap_or(0) as i32,
            qlen: record.seq_len() as i32,
            qhash: qname_hash(&qname),
            umi: aux_string(record, b"UB").unwrap_or_default(),
            qname,
            pi: -1,
            fidx: -1,
            ..Hit::default()
        };

        // CIGAR walk. Reference cursor advances over M/=/X/D/N; the query
        // cursor over M/=/X/I/S. Exon segments close at N only.
        let mut rp = pos;
        let mut qp = 0usize;
        let mut seg_start = pos;
        for op in record.cigar().iter() {
            match op {
                Cigar::Match(n) | Cigar::Equal(n) | Cigar::Diff(n) => {
                    let t = rp + *n as i32;
                    h.itvm.push(pack(rp, t));
                    if let Some(vcf) = vcf {
                        h.annotate_variants(vcf, chrm, rp, t, qp, &seq);
                    }
                    rp = t;
                    qp += *n as usize;
                }
                Cigar::Del(n) => {
                    let t = rp + *n as i32;
                    h.itvd.push(pack(rp, t));
                    rp = t;
                }
                Cigar::RefSkip(n) => {
                    if rp > seg_start {
                        h.segs.push(pack(seg_start, rp));
                    }
                    let t = rp + *n as i32;
                    h.itvi.push(pack(rp, t));
                    h.spos.push(pack(rp, t));
                    rp = t;
                    seg_start = rp;
                }
                Cigar::Ins(n) | Cigar::SoftClip(n) => {
                    qp += *n as usize;
                }
                Cigar::HardClip(_) | Cigar::Pad(_) => {}
            }
        }
        if rp > seg_start {
            h.segs.push(pack(seg_start, rp));
        }
        h.rpos = rp;

        h.build_itvna(vcf.is_some());
        h.set_strand(cfg);
        h
    }

    /// Record observed allele strings for variant loci inside one match run.
    fn annotate_variants(
        &mut self,
        vcf: &VcfData,
        chrm: &str,
        rs: i32,
        rt: i32,
        qp: usize,
        seq: &[u8],
    ) {
        for (vp, vlen) in vcf.loci_in(chrm, rs, rt) {
            let off = qp + (vp - rs) as usize;
            let end = (off + vlen as usize).min(qp + (rt - rs) as usize);
            if off >= end || end > seq.len() {
                continue;
            }
            let ale = String::from_utf8_lossy(&seq[off..end]).to_uppercase();
            self.apos.push((pack(vp, vp + vlen), ale));
        }
    }

    /// Compute the non-allelic match intervals by cutting the variant loci
    /// out of the match runs. Without a variant file the match intervals are
    /// fully non-allelic.
    fn build_itvna(&mut self, has_vcf: bool) {
        if !has_vcf || self.apos.is_empty() {
            self.itvna = self.itvm.clone();
            return;
        }
        let mut loci: Vec<(i32, i32)> = self
            .apos
            .iter()
            .map(|(p, _)| (high32(*p), low32(*p)))
            .collect();
        loci.sort_unstable();
        loci.dedup();

        self.itvna.clear();
        for &itv in &self.itvm {
            let mut s = high32(itv);
            let t = low32(itv);
            for &(vl, vr) in &loci {
                if vr <= s || vl >= t {
                    continue;
                }
                if vl > s {
                    self.itvna.push(pack(s, vl));
                }
                s = s.max(vr);
            }
            if s < t {
                self.itvna.push(pack(s, t));
            }
        }
    }

    /// Infer the transcription strand from the flags per library type.
    pub fn set_strand(&mut self, cfg: &Config) {
        let rev = (self.flag & 0x10) != 0;
        let paired = (self.flag & 0x1) != 0;
        let first = (self.flag & 0x40) != 0;
        self.strand = match cfg.library_type {
            LibraryType::Unstranded => '.',
            LibraryType::FrFirst => {
                if paired {
                    if first == rev { '+' } else { '-' }
                } else if rev {
                    '+'
                } else {
                    '-'
                }
            }
            LibraryType::FrSecond => {
                if paired {
                    if first == rev { '-' } else { '+' }
                } else if rev {
                    '-'
                } else {
                    '+'
                }
            }
        };
    }

    pub fn has_variant(&self) -> bool {
        !self.apos.is_empty()
    }

    /// Exon segments subdivided at the hit's variant loci, each part carrying
    /// its allele tag. Boundaries of the returned intervals are always region
    /// boundaries (splice sites, variant edges, or the hit's own ends).
    pub fn aligned_intervals(&self) -> Vec<(AllelicPos, AllelicPos)> {
        let mut loci: Vec<(i32, i32, &str)> = self
            .apos
            .iter()
            .map(|(p, a)| (high32(*p), low32(*p), a.as_str()))
            .collect();
        loci.sort_unstable();

        let mut out = Vec::new();
        for &seg in &self.segs {
            let mut s = high32(seg);
            let t = low32(seg);
            for &(vl, vr, ale) in &loci {
                if vr <= s || vl >= t {
                    continue;
                }
                if vl > s {
                    out.push((AllelicPos::new(s), AllelicPos::new(vl)));
                }
                let cl = vl.max(s);
                let cr = vr.min(t);
                if cl < cr {
                    out.push((
                        AllelicPos::with_allele(cl, ale),
                        AllelicPos::with_allele(cr, ale),
                    ));
                }
                s = s.max(vr);
            }
            if s < t {
                out.push((AllelicPos::new(s), AllelicPos::new(t)));
            }
        }
        out
    }

    /// Build a hit from pre-digested parts; scaffolding for synthetic bundles
    /// in tests and the previewer's strand votes.
    #[doc(hidden)]
    #[allow(clippy::too_many_arguments)]
    pub fn synthetic(
        tid: i32,
        qname: &str,
        segments: &[(i32, i32)],
        variants: &[(i32, i32, &str)],
        xs: char,
        mpos: i32,
        isize: i32,
        flag: u16,
    ) -> Self {
        assert!(!segments.is_empty());
        let mut h = Hit {
            tid,
            pos: segments[0].0,
            rpos: segments.last().unwrap().1,
            mpos,
            isize,
            qual: 60,
            flag,
            n_cigar: segments.len() * 2 - 1,
            strand: '.',
            xs,
            nh: 1,
            nm: 0,
            qlen: segments.iter().map(|(s, t)| t - s).sum(),
            qhash: qname_hash(qname),
            qname: qname.to_string(),
            pi: -1,
            fidx: -1,
            ..Hit::default()
        };
        for &(s, t) in segments {
            h.itvm.push(pack(s, t));
            h.segs.push(pack(s, t));
        }
        for w in segments.windows(2) {
            h.itvi.push(pack(w[0].1, w[1].0));
            h.spos.push(pack(w[0].1, w[1].0));
        }
        for &(vp, vlen, ale) in variants {
            h.apos.push((pack(vp, vp + vlen), ale.to_string()));
        }
        h.build_itvna(!variants.is_empty());
        h
    }
}

fn aux_char(record: &Record, tag: &[u8; 2]) -> Option<char> {
    match record.aux(tag).ok()? {
        Aux::Char(c) => Some(c as char),
        Aux::String(s) => s.chars().next(),
        _ => None,
    }
}

fn aux_string(record: &Record, tag: &[u8; 2]) -> Option<String> {
    match record.aux(tag).ok()? {
        Aux::String(s) => Some(s.to_string()),
        _ => None,
    }
}

fn aux_int(record: &Record, tag: &[u8; 2]) -> Option<i64> {
    match record.aux(tag).ok()? {
        Aux::I8(v) => Some(v as i64),
        Aux::U8(v) => Some(v as i64),
        Aux::I16(v) => Some(v as i64),
        Aux::U16(v) => Some(v as i64),
        Aux::I32(v) => Some(v as i64),
        Aux::U32(v) => Some(v as i64),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::Allele;

    #[test]
    fn aligned_intervals_split_at_variant_loci() {
        let h = Hit::synthetic(
            0,
            "r1",
            &[(100, 150), (250, 300)],
            &[(125, 1, "A")],
            '+',
            0,
            0,
            0,
        );
        let v = h.aligned_intervals();
        assert_eq!(v.len(), 4);
        assert_eq!(v[0].0.p, 100);
        assert_eq!(v[0].1.p, 125);
        assert_eq!(v[1].0, AllelicPos::with_allele(125, "A"));
        assert_eq!(v[1].1, AllelicPos::with_allele(126, "A"));
        assert_eq!(v[2].0.p, 126);
        assert_eq!(v[2].1.p, 150);
        assert_eq!(v[3].0.p, 250);
        assert_eq!(v[3].1.allele, Allele::NonAllelic);
        assert_eq!(h.spos, vec![pack(150, 250)]);
    }

    #[test]
    fn itvna_cuts_variant_loci_out() {
        let h = Hit::synthetic(0, "r2", &[(100, 150)], &[(125, 1, "G")], '.', 0, 0, 0);
        assert_eq!(h.itvna, vec![pack(100, 125), pack(126, 150)]);
    }
}
