//! Per-bundle transcript de-duplication across build modes and repeats.

use crate::error::BundleError;
use crate::transcript::Transcript;
use crate::types::HashSet;
use crate::vcf::Genotype;
use std::collections::BTreeMap;

/// How coverage combines when the same intron chain shows up again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CovPolicy {
    Min,
    Add,
}

/// Key: strand, genotype, and the intron chain (single-exon transcripts key
/// on their span instead).
type ChainKey = (char, Genotype, Vec<(i32, i32)>);

#[derive(Debug)]
pub struct TranscriptSet {
    pub chrm: String,
    entries: BTreeMap<ChainKey, (Transcript, usize)>,
    ids: HashSet<String>,
}

impl TranscriptSet {
    pub fn new(chrm: &str) -> Self {
        TranscriptSet {
            chrm: chrm.to_string(),
            entries: BTreeMap::new(),
            ids: HashSet::default(),
        }
    }

    fn key(t: &Transcript) -> ChainKey {
        let chain = if t.num_exons() >= 2 {
            t.intron_chain()
        } else {
            vec![t.span()]
        };
        (t.strand, t.gt, chain)
    }

    /// Record one observation. Adding a distinct transcript under an id that
    /// was already used is an invariant violation.
    pub fn add(&mut self, t: Transcript, count: usize, policy: CovPolicy) -> Result<(), BundleError> {
        let key = Self::key(&t);
        match self.entries.get_mut(&key) {
            Some((kept, n)) => {
                *n += count;
                match policy {
                    CovPolicy::Min => kept.coverage = kept.coverage.min(t.coverage),
                    CovPolicy::Add => kept.coverage += t.coverage,
                }
            }
            None => {
                if !self.ids.insert(t.transcript_id.clone()) {
                    return Err(BundleError::DuplicateTranscript(t.transcript_id));
                }
                self.entries.insert(key, (t, count));
            }
        }
        Ok(())
    }

    /// Transcripts seen often enough: single-exon need `sdup` observations,
    /// multi-exon `mdup`.
    pub fn get_transcripts(&self, sdup: usize, mdup: usize) -> Vec<Transcript> {
        let mut out = Vec::new();
        for (t, n) in self.entries.values() {
            let need = if t.num_exons() >= 2 { mdup } else { sdup };
            if *n >= need {
                out.push(t.clone());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tr(id: &str, exons: &[(i32, i32)], cov: f64) -> Transcript {
        Transcript {
            seqname: "chr1".into(),
            gene_id: "g".into(),
            transcript_id: id.into(),
            strand: '+',
            exons: exons.to_vec(),
            coverage: cov,
            ..Transcript::default()
        }
    }

    #[test]
    fn same_chain_merges_counts() {
        let mut ts = TranscriptSet::new("chr1");
        ts.add(tr("a", &[(0, 10), (20, 30)], 5.0), 1, CovPolicy::Min).unwrap();
        ts.add(tr("b", &[(0, 10), (20, 30)], 3.0), 1, CovPolicy::Min).unwrap();
        let v = ts.get_transcripts(2, 2);
        assert_eq!(v.len(), 1);
        assert!((v[0].coverage - 3.0).abs() < 1e-9);
        assert!(ts.get_transcripts(3, 3).is_empty());
    }

    #[test]
    fn reusing_an_id_for_a_new_chain_is_rejected() {
        let mut ts = TranscriptSet::new("chr1");
        ts.add(tr("a", &[(0, 10), (20, 30)], 5.0), 1, CovPolicy::Add).unwrap();
        let e = ts.add(tr("a", &[(0, 10), (40, 50)], 5.0), 1, CovPolicy::Add);
        assert!(e.is_err());
    }

    #[test]
    fn single_exon_uses_span_and_sdup() {
        let mut ts = TranscriptSet::new("chr1");
        ts.add(tr("a", &[(0, 100)], 2.0), 1, CovPolicy::Add).unwrap();
        ts.add(tr("b", &[(0, 100)], 2.0), 1, CovPolicy::Add).unwrap();
        assert_eq!(ts.get_transcripts(2, 0).len(), 1);
        assert!(ts.get_transcripts(3, 0).is_empty());
    }
}
