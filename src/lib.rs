//! asta-rs: assemble allele-specific transcripts from aligned RNA-seq reads.
//!
//! The pipeline clusters position-sorted hits into bundles, infers junctions
//! and variant-split regions, bridges mate pairs per allele, builds a splice
//! graph over coverage-decomposed partial exons, refines it, collects
//! multi-junction phasing evidence into a hyper-set, decomposes the graph
//! into transcript paths, and finally splits the remaining allelic flow into
//! two per-allele assemblies.
//!
//! # Library usage
//!
//! ```no_run
//! use asta_rs::assembler::Assembler;
//! use asta_rs::config::Config;
//!
//! let cfg = Config {
//!     input_file: "aligned.bam".into(),
//!     vcf_file: Some("phased.vcf.gz".into()),
//!     output_file: "out".into(),
//!     ..Config::default()
//! };
//! let mut asm = Assembler::new(cfg)?;
//! asm.assemble(true)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod assembler;
pub mod bridger;
pub mod bundle;
pub mod bundle_base;
pub mod bundle_bridge;
pub mod cli;
pub mod config;
pub mod decompose;
pub mod error;
pub mod fasta;
pub mod filter;
pub mod fragment;
pub mod hit;
pub mod hyper_set;
pub mod interval;
pub mod junction;
pub mod partial_exon;
pub mod phaser;
pub mod position;
pub mod previewer;
pub mod refine;
pub mod region;
pub mod splice_graph;
pub mod transcript;
pub mod transcript_set;
pub mod types;
pub mod util;
pub mod vcf;

// Flat re-exports for the most commonly used public types.
pub use bundle::Bundle;
pub use bundle_base::BundleBase;
pub use config::{Config, LibraryType};
pub use decompose::FlowDecomposer;
pub use error::BundleError;
pub use hit::Hit;
pub use hyper_set::HyperSet;
pub use splice_graph::SpliceGraph;
pub use transcript::Transcript;
pub use vcf::{Genotype, VcfData};
