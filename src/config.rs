//! Run configuration. One immutable `Config` is built from the CLI (plus the
//! previewer's inferences) and threaded through the pipeline; bundles keep a
//! clone so they stay self-contained.

use clap::ValueEnum;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum LibraryType {
    #[default]
    Unstranded,
    FrFirst,
    FrSecond,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub input_file: PathBuf,
    pub vcf_file: Option<PathBuf>,
    pub fasta_input: Option<PathBuf>,
    pub output_file: PathBuf,

    pub library_type: LibraryType,
    /// Whether the user fixed the library type; if not, the previewer infers it.
    pub library_type_set: bool,

    pub min_bundle_gap: i32,
    pub min_mapping_quality: u8,
    pub max_num_cigar: usize,
    pub min_num_hits_in_bundle: usize,
    pub min_splice_boundary_hits: usize,
    pub min_exon_length: i32,
    pub min_flank_length: i32,
    pub min_guaranteed_edge_weight: f64,
    pub min_surviving_edge_weight: f64,
    pub min_router_count: i32,
    pub max_intron_contamination_coverage: f64,
    pub max_num_exons: usize,
    pub assemble_duplicates: usize,
    pub uniquely_mapped_only: bool,
    pub use_second_alignment: bool,
    pub major_gt_threshold: f64,
    pub insertsize_low: i32,
    pub insertsize_median: i32,
    pub insertsize_high: i32,
    pub preview_only: bool,

    /// Bundles are flushed from the pool in batches of this size.
    pub batch_bundle_size: usize,
    /// Debug switch: suppress AJ_NONVAR marking of variant neighbors.
    pub decompose_as_neighbor: bool,
    /// Off-by-default legacy filters, kept as no-ops.
    pub filter_length_coverage: bool,
    pub remove_nested_transcripts: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            input_file: PathBuf::new(),
            vcf_file: None,
            fasta_input: None,
            output_file: PathBuf::new(),
            library_type: LibraryType::Unstranded,
            library_type_set: false,
            min_bundle_gap: 50,
            min_mapping_quality: 1,
            max_num_cigar: 1000,
            min_num_hits_in_bundle: 20,
            min_splice_boundary_hits: 1,
            min_exon_length: 20,
            min_flank_length: 3,
            min_guaranteed_edge_weight: 0.01,
            min_surviving_edge_weight: 1.5,
            min_router_count: 1,
            max_intron_contamination_coverage: 2.0,
            max_num_exons: 1000,
            assemble_duplicates: 1,
            uniquely_mapped_only: false,
            use_second_alignment: false,
            major_gt_threshold: 0.8,
            insertsize_low: 80,
            insertsize_median: 250,
            insertsize_high: 500,
            preview_only: false,
            batch_bundle_size: 100,
            decompose_as_neighbor: false,
            filter_length_coverage: false,
            remove_nested_transcripts: false,
        }
    }
}
