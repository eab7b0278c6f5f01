//! Assembled transcripts and their GTF / GVF / FASTA renderings.

use crate::fasta::FastaDb;
use crate::vcf::Genotype;
use anyhow::Result;
use std::io::Write;

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    pub seqname: String,
    pub gene_id: String,
    pub transcript_id: String,
    pub strand: char,
    /// Half-open exon intervals on the reference, ascending.
    pub exons: Vec<(i32, i32)>,
    pub coverage: f64,
    pub rpkm: f64,
    pub gt: Genotype,
    /// Variant loci the transcript passes through: (position, observed allele).
    pub variants: Vec<(i32, String)>,
}

impl Transcript {
    pub fn length(&self) -> i32 {
        self.exons.iter().map(|(s, t)| t - s).sum()
    }

    pub fn num_exons(&self) -> usize {
        self.exons.len()
    }

    /// The introns between consecutive exons.
    pub fn intron_chain(&self) -> Vec<(i32, i32)> {
        self.exons
            .windows(2)
            .map(|w| (w[0].1, w[1].0))
            .collect()
    }

    pub fn span(&self) -> (i32, i32) {
        (
            self.exons.first().map(|e| e.0).unwrap_or(0),
            self.exons.last().map(|e| e.1).unwrap_or(0),
        )
    }

    pub fn assign_rpkm(&mut self, factor: f64) {
        let len = self.length();
        if len > 0 {
            self.rpkm = self.coverage * factor / len as f64;
        }
    }

    /// Standard GTF: one transcript record plus one record per exon,
    /// 1-based inclusive coordinates.
    pub fn write_gtf<W: Write>(&self, w: &mut W) -> Result<()> {
        let (s, t) = self.span();
        writeln!(
            w,
            "{}\tasta\ttranscript\t{}\t{}\t1000\t{}\t.\tgene_id \"{}\"; transcript_id \"{}\"; coverage \"{:.4}\"; RPKM \"{:.4}\";",
            self.seqname, s + 1, t, self.strand, self.gene_id, self.transcript_id,
            self.coverage, self.rpkm
        )?;
        for (i, (es, et)) in self.exons.iter().enumerate() {
            writeln!(
                w,
                "{}\tasta\texon\t{}\t{}\t1000\t{}\t.\tgene_id \"{}\"; transcript_id \"{}\"; exon_number \"{}\";",
                self.seqname, es + 1, et, self.strand, self.gene_id, self.transcript_id, i + 1
            )?;
        }
        Ok(())
    }

    /// Variant-aware records: GTF-shaped, annotated with the transcript's
    /// genotype and the allele observed at each variant locus it crosses.
    pub fn write_gvf<W: Write>(&self, w: &mut W) -> Result<()> {
        let (s, t) = self.span();
        let alleles = self
            .variants
            .iter()
            .map(|(p, a)| format!("{}:{}", p + 1, a))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(
            w,
            "{}\tasta\ttranscript\t{}\t{}\t1000\t{}\t.\tgene_id \"{}\"; transcript_id \"{}\"; genotype \"{}\"; alleles \"{}\"; coverage \"{:.4}\";",
            self.seqname, s + 1, t, self.strand, self.gene_id, self.transcript_id,
            self.gt.as_str(), alleles, self.coverage
        )?;
        for (i, (es, et)) in self.exons.iter().enumerate() {
            writeln!(
                w,
                "{}\tasta\texon\t{}\t{}\t1000\t{}\t.\tgene_id \"{}\"; transcript_id \"{}\"; exon_number \"{}\"; genotype \"{}\";",
                self.seqname, es + 1, et, self.strand, self.gene_id, self.transcript_id,
                i + 1, self.gt.as_str()
            )?;
        }
        Ok(())
    }

    /// Transcript sequence from the genome store, wrapped to `width` columns.
    pub fn write_fasta<W: Write>(&self, w: &mut W, width: usize, fasta: &FastaDb) -> Result<()> {
        let mut seq = Vec::new();
        for &(s, t) in &self.exons {
            if let Some(part) = fasta.get_slice(&self.seqname, s as u32, t as u32) {
                seq.extend_from_slice(&part);
            }
        }
        if seq.is_empty() {
            return Ok(());
        }
        writeln!(w, ">{} gene={} genotype={}", self.transcript_id, self.gene_id, self.gt.as_str())?;
        for chunk in seq.chunks(width) {
            w.write_all(chunk)?;
            writeln!(w)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t() -> Transcript {
        Transcript {
            seqname: "chr1".into(),
            gene_id: "gene.1".into(),
            transcript_id: "gene.1.0".into(),
            strand: '+',
            exons: vec![(100, 150), (250, 300)],
            coverage: 10.0,
            ..Transcript::default()
        }
    }

    #[test]
    fn intron_chain_and_length() {
        let tr = t();
        assert_eq!(tr.length(), 100);
        assert_eq!(tr.intron_chain(), vec![(150, 250)]);
        assert_eq!(tr.span(), (100, 300));
    }

    #[test]
    fn gtf_uses_one_based_inclusive_coordinates() {
        let tr = t();
        let mut out = Vec::new();
        tr.write_gtf(&mut out).unwrap();
        let s = String::from_utf8(out).unwrap();
        let mut lines = s.lines();
        assert!(lines.next().unwrap().contains("\ttranscript\t101\t300\t"));
        assert!(lines.next().unwrap().contains("\texon\t101\t150\t"));
        assert!(lines.next().unwrap().contains("\texon\t251\t300\t"));
    }

    #[test]
    fn rpkm_scales_by_length() {
        let mut tr = t();
        tr.assign_rpkm(1e3);
        assert!((tr.rpkm - 100.0).abs() < 1e-9);
    }
}
