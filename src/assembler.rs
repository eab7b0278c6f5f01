//! The end-to-end driver: stream hits from the BAM, cut bundles, run the
//! per-bundle pipeline, phase, and write the outputs.

use crate::bundle::Bundle;
use crate::bundle_base::BundleBase;
use crate::config::{Config, LibraryType};
use crate::decompose::FlowDecomposer;
use crate::error::BundleError;
use crate::fasta::FastaDb;
use crate::filter;
use crate::hit::Hit;
use crate::hyper_set::HyperSet;
use crate::phaser;
use crate::splice_graph::SpliceGraph;
use crate::transcript::Transcript;
use crate::transcript_set::{CovPolicy, TranscriptSet};
use crate::vcf::VcfData;
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use rust_htslib::bam::{self, Read};
use std::fs::File;
use std::io::BufWriter;

pub struct Assembler {
    cfg: Config,
    vcf: Option<VcfData>,
    fasta: Option<FastaDb>,

    bb1: BundleBase,
    bb2: BundleBase,
    pool: Vec<BundleBase>,

    pub trsts: Vec<Transcript>,
    pub non_full_trsts: Vec<Transcript>,

    target_names: Vec<String>,
    qlen: u64,
    qcnt: u64,
    index: usize,
}

impl Assembler {
    pub fn new(cfg: Config) -> Result<Self> {
        let vcf = match &cfg.vcf_file {
            Some(p) => Some(VcfData::load(p)?),
            None => None,
        };
        let fasta = match &cfg.fasta_input {
            Some(p) => Some(FastaDb::load(p)?),
            None => None,
        };
        let has_vcf = vcf.is_some();
        Ok(Assembler {
            cfg,
            vcf,
            fasta,
            bb1: BundleBase::new(has_vcf),
            bb2: BundleBase::new(has_vcf),
            pool: Vec::new(),
            trsts: Vec::new(),
            non_full_trsts: Vec::new(),
            target_names: Vec::new(),
            qlen: 0,
            qcnt: 0,
            index: 0,
        })
    }

    pub fn assemble(&mut self, quiet: bool) -> Result<()> {
        let mut reader = bam::Reader::from_path(&self.cfg.input_file)
            .with_context(|| format!("failed to open {}", self.cfg.input_file.display()))?;
        self.target_names = reader
            .header()
            .target_names()
            .iter()
            .map(|n| String::from_utf8_lossy(n).to_string())
            .collect();

        let progress = if !quiet {
            let pb = ProgressBar::new_spinner();
            pb.set_draw_target(ProgressDrawTarget::stderr_with_hz(2));
            pb.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} [{elapsed_precise}] {msg}")
                    .expect("failed to set progress bar template"),
            );
            pb.set_message("Assembling...");
            Some(pb)
        } else {
            None
        };

        let mut record = bam::Record::new();
        let mut seen: u64 = 0;
        while let Some(r) = reader.read(&mut record) {
            r.context("failed to read BAM record")?;
            seen += 1;
            if let Some(pb) = &progress {
                if seen % 100_000 == 0 {
                    pb.set_message(format!("Processed {seen} reads, {} transcripts", self.trsts.len()));
                    pb.tick();
                }
            }

            if record.tid() < 0 {
                continue;
            }
            if record.is_unmapped() {
                continue;
            }
            if record.is_secondary() && !self.cfg.use_second_alignment {
                continue;
            }
            let n_cigar = record.cigar_len();
            if n_cigar > self.cfg.max_num_cigar || n_cigar < 1 {
                continue;
            }
            if record.mapq() < self.cfg.min_mapping_quality {
                continue;
            }

            let chrm = self
                .target_names
                .get(record.tid() as usize)
                .cloned()
                .unwrap_or_default();
            let mut ht = Hit::from_record(&record, &chrm, &self.cfg, self.vcf.as_ref());
            self.qlen += ht.qlen as u64;
            self.qcnt += 1;

            // flush bundles the new hit cannot extend
            if ht.tid != self.bb1.tid || ht.pos > self.bb1.rpos + self.cfg.min_bundle_gap {
                if !self.bb1.hits.is_empty() {
                    let bb = std::mem::replace(&mut self.bb1, BundleBase::new(self.vcf.is_some()));
                    self.pool.push(bb);
                } else {
                    self.bb1.clear();
                }
            }
            if ht.tid != self.bb2.tid || ht.pos > self.bb2.rpos + self.cfg.min_bundle_gap {
                if !self.bb2.hits.is_empty() {
                    let bb = std::mem::replace(&mut self.bb2, BundleBase::new(self.vcf.is_some()));
                    self.pool.push(bb);
                } else {
                    self.bb2.clear();
                }
            }
            self.process(self.cfg.batch_bundle_size)?;

            if self.cfg.uniquely_mapped_only && ht.nh != 1 {
                continue;
            }
            let stranded = self.cfg.library_type != LibraryType::Unstranded;
            if stranded && ht.strand == '+' && ht.xs == '-' {
                continue;
            }
            if stranded && ht.strand == '-' && ht.xs == '+' {
                continue;
            }
            if stranded && ht.strand == '.' && ht.xs != '.' {
                ht.strand = ht.xs;
            }
            let route = (stranded, ht.strand, ht.xs);
            match route {
                (true, '+', _) => self.add_hit(true, ht)?,
                (true, '-', _) => self.add_hit(false, ht)?,
                (false, _, '.') => {
                    self.add_hit(true, ht.clone())?;
                    self.add_hit(false, ht)?;
                }
                (false, _, '+') => self.add_hit(true, ht)?,
                (false, _, '-') => self.add_hit(false, ht)?,
                _ => {}
            }
        }

        let bb1 = std::mem::replace(&mut self.bb1, BundleBase::new(self.vcf.is_some()));
        let bb2 = std::mem::replace(&mut self.bb2, BundleBase::new(self.vcf.is_some()));
        self.pool.push(bb1);
        self.pool.push(bb2);
        self.process(0)?;

        self.assign_rpkm();
        self.trsts = filter::merge_single_exon_transcripts(std::mem::take(&mut self.trsts));
        self.non_full_trsts =
            filter::merge_single_exon_transcripts(std::mem::take(&mut self.non_full_trsts));

        self.write()?;
        if let Some(pb) = progress {
            pb.finish_with_message(format!(
                "Done: {} reads, {} transcripts, {} non-full",
                seen,
                self.trsts.len(),
                self.non_full_trsts.len()
            ));
        }
        Ok(())
    }

    fn add_hit(&mut self, first: bool, ht: Hit) -> Result<()> {
        let bb = if first { &mut self.bb1 } else { &mut self.bb2 };
        if let Err(e) = bb.add_hit(ht) {
            // a corrupt bundle is flushed wholesale; the hit stream continues
            tracing::warn!(error = %e, "dropping bundle with inconsistent hits");
            bb.clear();
        }
        Ok(())
    }

    /// Drain the pool once it holds at least `n` bundles.
    fn process(&mut self, n: usize) -> Result<()> {
        if self.pool.len() < n || self.pool.is_empty() {
            return Ok(());
        }
        for bb in std::mem::take(&mut self.pool) {
            if bb.tid < 0 || bb.hits.len() < self.cfg.min_num_hits_in_bundle {
                continue;
            }
            match self.process_bundle(bb) {
                Ok(()) => {}
                Err(e) => match e.downcast_ref::<BundleError>() {
                    Some(be) => {
                        tracing::warn!(error = %be, "bundle dropped");
                        continue;
                    }
                    None => return Err(e),
                },
            }
        }
        Ok(())
    }

    fn process_bundle(&mut self, mut bb: BundleBase) -> Result<()> {
        bb.chrm = self
            .target_names
            .get(bb.tid as usize)
            .cloned()
            .unwrap_or_default();
        let is_allelic = bb.is_allelic;
        let chrm = bb.chrm.clone();
        tracing::debug!(
            chrm = %chrm,
            lpos = bb.lpos,
            rpos = bb.rpos,
            hits = bb.hits.len(),
            strand = %bb.strand,
            "processing bundle"
        );

        let mut ts1 = TranscriptSet::new(&chrm); // full-length set
        let mut ts2 = TranscriptSet::new(&chrm); // non-full-length set

        let mut bd = Bundle::new(bb, self.vcf.as_ref(), &self.cfg)?;
        for mode in [1u8, 2u8] {
            bd.build(mode)?;
            self.index += 1;
            let mut gr = bd.gr.clone();
            gr.gid = format!("gene.{}", self.index);
            self.assemble_graph(gr, bd.hs.clone(), is_allelic, &mut ts1, &mut ts2)?;
        }

        let sdup = self.cfg.assemble_duplicates + 1;
        let mdup = self.cfg.assemble_duplicates / 2;
        let dup = self.cfg.assemble_duplicates as f64;

        let mut gv1 = ts1.get_transcripts(sdup, mdup);
        let mut gv2 = ts2.get_transcripts(sdup, mdup);
        for t in gv1.iter_mut().chain(gv2.iter_mut()) {
            if t.num_exons() >= 2 {
                t.coverage /= dup;
            }
        }

        let gv1 = filter::filter_length_coverage(gv1, &self.cfg);
        let gv1 = filter::remove_nested_transcripts(gv1, &self.cfg);
        self.trsts.extend(gv1);
        self.non_full_trsts.extend(gv2);
        Ok(())
    }

    /// Decompose one built graph: a partial pass first, then the phaser when
    /// allelic flow survived it. Phased transcripts publish directly; the
    /// partial pass feeds the de-duplication sets.
    fn assemble_graph(
        &mut self,
        gr: SpliceGraph,
        hs: HyperSet,
        is_allelic: bool,
        ts1: &mut TranscriptSet,
        ts2: &mut TranscriptSet,
    ) -> Result<()> {
        if FlowDecomposer::is_regional_graph(&gr) {
            return Ok(());
        }
        if gr.num_edges() == 0 {
            return Ok(());
        }
        let base_gid = gr.gid.clone();

        for r in 0..self.cfg.assemble_duplicates {
            let mut gr = gr.clone();
            gr.gid = format!("{base_gid}.{r}");
            let mut sc = FlowDecomposer::new(gr, hs.clone(), true, &self.cfg);
            sc.assemble(is_allelic)?;
            for t in sc.trsts.iter().cloned() {
                ts1.add(t, 1, CovPolicy::Min)?;
            }
            for t in sc.non_full_trsts.iter().cloned() {
                ts2.add(t, 1, CovPolicy::Min)?;
            }

            match phaser::phase(&sc, is_allelic, &self.cfg) {
                Ok(out) => {
                    self.trsts.extend(out.trsts1);
                    self.trsts.extend(out.trsts2);
                    self.non_full_trsts.extend(out.non_full_trsts1);
                    self.non_full_trsts.extend(out.non_full_trsts2);
                }
                Err(e) => match e.downcast_ref::<BundleError>() {
                    Some(be) => {
                        tracing::debug!(error = %be, "phasing skipped");
                    }
                    None => return Err(e),
                },
            }
        }
        Ok(())
    }

    fn assign_rpkm(&mut self) {
        if self.qlen == 0 {
            return;
        }
        let factor = 1e9 / self.qlen as f64;
        for t in self.trsts.iter_mut().chain(self.non_full_trsts.iter_mut()) {
            t.assign_rpkm(factor);
        }
    }

    fn write(&self) -> Result<()> {
        let prefix = self.cfg.output_file.display();

        let mut gtf = BufWriter::new(File::create(format!("{prefix}.gtf"))?);
        let mut gvf = BufWriter::new(File::create(format!("{prefix}.gvf"))?);
        for t in &self.trsts {
            t.write_gtf(&mut gtf)?;
            t.write_gvf(&mut gvf)?;
        }

        if let Some(fasta) = &self.fasta {
            let mut fa = BufWriter::new(File::create(format!("{prefix}.fa"))?);
            for t in &self.trsts {
                t.write_fasta(&mut fa, 60, fasta)?;
            }
        }

        let mut full = BufWriter::new(File::create(format!("{prefix}.full.gtf"))?);
        for t in &self.non_full_trsts {
            t.write_gtf(&mut full)?;
        }

        tracing::info!(
            transcripts = self.trsts.len(),
            non_full = self.non_full_trsts.len(),
            reads = self.qcnt,
            "assembly written"
        );
        Ok(())
    }
}
