//! Error types for the assembly core.

use thiserror::Error;

/// An invariant violation inside one bundle. The driver catches these, drops
/// the bundle's partial output, logs, and moves on to the next bundle; one bad
/// bundle never invalidates the rest of the run.
#[derive(Debug, Error)]
pub enum BundleError {
    /// Hits of one bundle must share tid and strand.
    #[error("mixed hits in bundle: {0}")]
    MixedHits(String),

    /// Regions or partial exons are out of order, or an allelic region was
    /// spanned as more than a single point.
    #[error("region layout violated: {0}")]
    RegionLayout(String),

    /// A transcript with this id was already recorded.
    #[error("duplicate transcript id: {0}")]
    DuplicateTranscript(String),

    /// An edge weight would be assigned to both alleles in full.
    #[error("conflicting allele assignment on edge {0}")]
    ConflictingAssignment(usize),

    /// The decomposed graph carries no allelic vertices; phasing is skipped.
    #[error("graph {0} has no allelic vertices to phase")]
    NoAllelicVertices(String),

    /// The decomposed graph carries no non-allelic vertices to split.
    #[error("graph {0} has no non-allelic vertices to phase")]
    NoPlainVertices(String),
}
