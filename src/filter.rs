//! Post-assembly transcript filters.

use crate::config::Config;
use crate::transcript::Transcript;

/// Join overlapping single-exon transcripts on the same sequence, strand and
/// genotype into one transcript covering their union, coverage summed.
/// Multi-exon transcripts pass through untouched.
pub fn merge_single_exon_transcripts(trsts: Vec<Transcript>) -> Vec<Transcript> {
    let (mut singles, mut out): (Vec<Transcript>, Vec<Transcript>) =
        trsts.into_iter().partition(|t| t.num_exons() == 1);

    singles.sort_by(|a, b| {
        (a.seqname.as_str(), a.strand, a.gt, a.span())
            .cmp(&(b.seqname.as_str(), b.strand, b.gt, b.span()))
    });

    let mut merged: Option<Transcript> = None;
    for t in singles {
        match merged.as_mut() {
            Some(m)
                if m.seqname == t.seqname
                    && m.strand == t.strand
                    && m.gt == t.gt
                    && t.span().0 < m.span().1 =>
            {
                let (s, _) = m.exons[0];
                m.exons[0] = (s, m.span().1.max(t.span().1));
                m.coverage += t.coverage;
            }
            _ => {
                if let Some(m) = merged.take() {
                    out.push(m);
                }
                merged = Some(t);
            }
        }
    }
    if let Some(m) = merged {
        out.push(m);
    }
    out
}

/// Legacy filter, disabled pending an upstream decision; behind a flag so the
/// call sites stay in place.
pub fn filter_length_coverage(trsts: Vec<Transcript>, cfg: &Config) -> Vec<Transcript> {
    if !cfg.filter_length_coverage {
        return trsts;
    }
    trsts
}

/// Legacy filter, disabled pending an upstream decision.
pub fn remove_nested_transcripts(trsts: Vec<Transcript>, cfg: &Config) -> Vec<Transcript> {
    if !cfg.remove_nested_transcripts {
        return trsts;
    }
    trsts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vcf::Genotype;

    fn single(id: &str, s: i32, t: i32, gt: Genotype) -> Transcript {
        Transcript {
            seqname: "chr1".into(),
            gene_id: "g".into(),
            transcript_id: id.into(),
            strand: '+',
            exons: vec![(s, t)],
            coverage: 1.0,
            gt,
            ..Transcript::default()
        }
    }

    #[test]
    fn overlapping_singles_merge() {
        let v = merge_single_exon_transcripts(vec![
            single("a", 0, 100, Genotype::Unphased),
            single("b", 50, 150, Genotype::Unphased),
            single("c", 200, 300, Genotype::Unphased),
        ]);
        assert_eq!(v.len(), 2);
        let spans: Vec<(i32, i32)> = v.iter().map(|t| t.span()).collect();
        assert!(spans.contains(&(0, 150)));
        assert!(spans.contains(&(200, 300)));
    }

    #[test]
    fn different_genotypes_stay_apart() {
        let v = merge_single_exon_transcripts(vec![
            single("a", 0, 100, Genotype::Allele1),
            single("b", 50, 150, Genotype::Allele2),
        ]);
        assert_eq!(v.len(), 2);
    }
}
