//! Phased-variant annotation.
//!
//! The VCF is read once at startup and queried read-only for the rest of the
//! run: `chrm -> pos -> allele string -> genotype`, plus the reference length
//! of each variant so match intervals can be split around it.

use crate::types::{HashMap, HashMapExt};
use anyhow::{Context, Result};
use rust_htslib::bcf::{self, Read};
use std::collections::BTreeMap;
use std::path::Path;

/// Phase of an observed allele. `Nonspecific` marks alleles carried by both
/// haplotypes; `Unphased` is the lookup default for anything unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Genotype {
    #[default]
    Unphased,
    Allele1,
    Allele2,
    Nonspecific,
}

impl Genotype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Genotype::Unphased => "unphased",
            Genotype::Allele1 => "allele1",
            Genotype::Allele2 => "allele2",
            Genotype::Nonspecific => "nonspecific",
        }
    }
}

/// True if the pair names the two opposite alleles.
pub fn gt_conflict(g1: Genotype, g2: Genotype) -> bool {
    matches!(
        (g1, g2),
        (Genotype::Allele1, Genotype::Allele2) | (Genotype::Allele2, Genotype::Allele1)
    )
}

/// True if both are the same named allele.
pub fn gt_explicit_same(g1: Genotype, g2: Genotype) -> bool {
    g1 == g2 && gt_as(g1)
}

/// True if explicit-same, or both are non-specific/unphased.
pub fn gt_implicit_same(g1: Genotype, g2: Genotype) -> bool {
    gt_explicit_same(g1, g2) || (!gt_as(g1) && !gt_as(g2))
}

/// True for the two named alleles.
pub fn gt_as(g: Genotype) -> bool {
    matches!(g, Genotype::Allele1 | Genotype::Allele2)
}

#[derive(Debug, Default)]
pub struct VcfData {
    /// chrm -> pos -> allele string -> genotype
    pub pos_map: HashMap<String, BTreeMap<i32, HashMap<String, Genotype>>>,
    /// chrm -> pos -> allele length on the reference
    pub ale_len: HashMap<String, BTreeMap<i32, i32>>,
}

impl VcfData {
    /// Load the phased variants of the first sample. Records without a GT
    /// field are skipped; unphased genotypes are kept with `Unphased` so the
    /// loci still partition regions.
    pub fn load(path: &Path) -> Result<Self> {
        let mut reader = bcf::Reader::from_path(path)
            .with_context(|| format!("failed to open variant file {}", path.display()))?;

        let mut data = VcfData::default();
        for rec in reader.records() {
            let rec = rec.context("failed to parse variant record")?;
            let rid = match rec.rid() {
                Some(r) => r,
                None => continue,
            };
            let chrm = String::from_utf8_lossy(rec.header().rid2name(rid)?).to_string();
            let pos = rec.pos() as i32;

            let alleles: Vec<String> = rec
                .alleles()
                .iter()
                .map(|a| String::from_utf8_lossy(a).to_uppercase())
                .collect();
            if alleles.is_empty() {
                continue;
            }
            let ref_len = alleles[0].len() as i32;

            let mut gts = match rec.genotypes() {
                Ok(g) => g,
                Err(_) => continue,
            };
            let gt = gts.get(0);
            let hap: Vec<Option<usize>> = gt
                .iter()
                .map(|a| a.index().map(|i| i as usize))
                .collect();
            if hap.len() < 2 {
                continue;
            }
            let (h1, h2) = match (hap[0], hap[1]) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };
            let phased = gt
                .iter()
                .skip(1)
                .any(|a| matches!(*a, bcf::record::GenotypeAllele::Phased(_)));

            let entry = data
                .pos_map
                .entry(chrm.clone())
                .or_default()
                .entry(pos)
                .or_insert_with(HashMap::new);
            if h1 == h2 {
                if let Some(a) = alleles.get(h1) {
                    entry.insert(a.clone(), Genotype::Nonspecific);
                }
            } else if phased {
                if let Some(a) = alleles.get(h1) {
                    entry.insert(a.clone(), Genotype::Allele1);
                }
                if let Some(a) = alleles.get(h2) {
                    entry.insert(a.clone(), Genotype::Allele2);
                }
            } else {
                if let Some(a) = alleles.get(h1) {
                    entry.insert(a.clone(), Genotype::Unphased);
                }
                if let Some(a) = alleles.get(h2) {
                    entry.insert(a.clone(), Genotype::Unphased);
                }
            }
            data.ale_len.entry(chrm).or_default().insert(pos, ref_len);
        }
        Ok(data)
    }

    /// Genotype of an observed allele; `Unphased` when the locus or the
    /// allele string is unknown.
    pub fn genotype(&self, chrm: &str, pos: i32, ale: &str) -> Genotype {
        self.pos_map
            .get(chrm)
            .and_then(|m| m.get(&pos))
            .and_then(|m| m.get(ale))
            .copied()
            .unwrap_or(Genotype::Unphased)
    }

    /// Variant loci of `chrm` within `[l, r)` as (pos, ref length).
    pub fn loci_in(&self, chrm: &str, l: i32, r: i32) -> Vec<(i32, i32)> {
        match self.ale_len.get(chrm) {
            Some(m) => m.range(l..r).map(|(p, n)| (*p, *n)).collect(),
            None => Vec::new(),
        }
    }

    /// Insert one locus directly; test scaffolding for synthetic bundles.
    pub fn insert(&mut self, chrm: &str, pos: i32, len: i32, alleles: &[(&str, Genotype)]) {
        let entry = self
            .pos_map
            .entry(chrm.to_string())
            .or_default()
            .entry(pos)
            .or_insert_with(HashMap::new);
        for (a, g) in alleles {
            entry.insert(a.to_string(), *g);
        }
        self.ale_len
            .entry(chrm.to_string())
            .or_default()
            .insert(pos, len);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genotype_predicates() {
        assert!(gt_conflict(Genotype::Allele1, Genotype::Allele2));
        assert!(!gt_conflict(Genotype::Allele1, Genotype::Allele1));
        assert!(gt_explicit_same(Genotype::Allele2, Genotype::Allele2));
        assert!(!gt_explicit_same(Genotype::Unphased, Genotype::Unphased));
        assert!(gt_implicit_same(Genotype::Unphased, Genotype::Nonspecific));
        assert!(!gt_implicit_same(Genotype::Unphased, Genotype::Allele1));
    }

    #[test]
    fn lookup_defaults_to_unphased() {
        let mut v = VcfData::default();
        v.insert("chr1", 125, 1, &[("A", Genotype::Allele1), ("G", Genotype::Allele2)]);
        assert_eq!(v.genotype("chr1", 125, "A"), Genotype::Allele1);
        assert_eq!(v.genotype("chr1", 125, "G"), Genotype::Allele2);
        assert_eq!(v.genotype("chr1", 125, "T"), Genotype::Unphased);
        assert_eq!(v.genotype("chr2", 125, "A"), Genotype::Unphased);
        assert_eq!(v.loci_in("chr1", 100, 150), vec![(125, 1)]);
        assert!(v.loci_in("chr1", 130, 150).is_empty());
    }
}
