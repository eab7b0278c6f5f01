use crate::config::{Config, LibraryType};
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "asta-rs",
    about = "Assemble allele-specific transcripts from aligned RNA-seq reads",
    version
)]
pub struct Args {
    /// Input BAM with genomic alignments, sorted by position
    pub in_bam: PathBuf,

    /// Phased variant file (VCF/BCF)
    #[arg(short = 'v', long = "vcf", value_name = "VCF")]
    pub vcf_file: Option<PathBuf>,

    /// Genome sequence FASTA; enables transcript sequence output
    #[arg(short = 'S', long = "genome", value_name = "FASTA")]
    pub fasta_input: Option<PathBuf>,

    /// Output prefix; writes <prefix>.gtf, <prefix>.gvf, <prefix>.fa and
    /// <prefix>.full.gtf
    #[arg(short = 'o', long = "out", value_name = "PREFIX")]
    pub output_file: PathBuf,

    /// Library type
    #[arg(long = "library-type", value_enum)]
    pub library_type: Option<LibraryType>,

    /// Maximum gap between consecutive reads of one bundle
    #[arg(long, default_value_t = 50)]
    pub min_bundle_gap: i32,

    /// Minimum mapping quality of a used hit
    #[arg(long, default_value_t = 1)]
    pub min_mapping_quality: u8,

    /// Skip hits with more CIGAR operations than this
    #[arg(long, default_value_t = 1000)]
    pub max_num_cigar: usize,

    /// Minimum number of hits required to assemble a bundle
    #[arg(long, default_value_t = 20)]
    pub min_num_hits_in_bundle: usize,

    /// Minimum read support of a splice boundary
    #[arg(long, default_value_t = 1)]
    pub min_splice_boundary_hits: usize,

    /// Minimum exon length kept during refinement
    #[arg(long, default_value_t = 20)]
    pub min_exon_length: i32,

    /// Minimum flank length of a partial exon
    #[arg(long, default_value_t = 3)]
    pub min_flank_length: i32,

    /// Floor for vertex and edge weights in the splice graph
    #[arg(long, default_value_t = 0.01)]
    pub min_guaranteed_edge_weight: f64,

    /// Edges below this weight survive only as component maxima
    #[arg(long, default_value_t = 1.5)]
    pub min_surviving_edge_weight: f64,

    /// Minimum count for a hyper-edge to produce an edge row
    #[arg(long, default_value_t = 1)]
    pub min_router_count: i32,

    /// Maximum coverage of an intron-contamination vertex
    #[arg(long, default_value_t = 2.0)]
    pub max_intron_contamination_coverage: f64,

    /// Cap on vertex count for the phaser's local split pass
    #[arg(long, default_value_t = 1000)]
    pub max_num_exons: usize,

    /// Number of assembly repetitions contributing to duplicate counts
    #[arg(long, default_value_t = 1)]
    pub assemble_duplicates: usize,

    /// Use only uniquely mapped hits (NH == 1)
    #[arg(long)]
    pub uniquely_mapped_only: bool,

    /// Also use secondary alignments
    #[arg(long)]
    pub use_second_alignment: bool,

    /// Fraction of allelic region votes required to call a fragment's allele
    #[arg(long, default_value_t = 0.8)]
    pub major_gt_threshold: f64,

    /// Lower bound of the insert-size range (overridden by preview)
    #[arg(long, default_value_t = 80)]
    pub insertsize_low: i32,

    /// Upper bound of the insert-size range (overridden by preview)
    #[arg(long, default_value_t = 500)]
    pub insertsize_high: i32,

    /// Run the input preview only, then exit
    #[arg(long)]
    pub preview_only: bool,

    /// Raise logging to DEBUG (per-bundle diagnostics)
    #[arg(long)]
    pub verbose: bool,

    /// Suppress the progress spinner and lower logging to WARN
    #[arg(short = 'q', long)]
    pub quiet: bool,
}

impl Args {
    pub fn to_config(&self) -> Config {
        Config {
            input_file: self.in_bam.clone(),
            vcf_file: self.vcf_file.clone(),
            fasta_input: self.fasta_input.clone(),
            output_file: self.output_file.clone(),
            library_type: self.library_type.unwrap_or(LibraryType::Unstranded),
            library_type_set: self.library_type.is_some(),
            min_bundle_gap: self.min_bundle_gap,
            min_mapping_quality: self.min_mapping_quality,
            max_num_cigar: self.max_num_cigar,
            min_num_hits_in_bundle: self.min_num_hits_in_bundle,
            min_splice_boundary_hits: self.min_splice_boundary_hits,
            min_exon_length: self.min_exon_length,
            min_flank_length: self.min_flank_length,
            min_guaranteed_edge_weight: self.min_guaranteed_edge_weight,
            min_surviving_edge_weight: self.min_surviving_edge_weight,
            min_router_count: self.min_router_count,
            max_intron_contamination_coverage: self.max_intron_contamination_coverage,
            max_num_exons: self.max_num_exons,
            assemble_duplicates: self.assemble_duplicates.max(1),
            uniquely_mapped_only: self.uniquely_mapped_only,
            use_second_alignment: self.use_second_alignment,
            major_gt_threshold: self.major_gt_threshold,
            insertsize_low: self.insertsize_low,
            insertsize_high: self.insertsize_high,
            preview_only: self.preview_only,
            ..Config::default()
        }
    }
}
