//! Phaser behavior on hand-built graphs: background-ratio fallback, flow
//! conservation, and allele exclusivity.

use asta_rs::config::Config;
use asta_rs::decompose::FlowDecomposer;
use asta_rs::hyper_set::HyperSet;
use asta_rs::phaser;
use asta_rs::position::AllelicPos;
use asta_rs::region::{END_BOUNDARY, START_BOUNDARY};
use asta_rs::splice_graph::{AsType, SpliceGraph, VertexInfo};
use asta_rs::vcf::Genotype;

fn vertex(l: i32, r: i32, gt: Genotype, as_type: AsType, lt: u32, rt: u32) -> VertexInfo {
    VertexInfo {
        lpos: AllelicPos::new(l),
        rpos: AllelicPos::new(r),
        length: r - l,
        gt,
        as_type,
        ltype: lt,
        rtype: rt,
        ..VertexInfo::default()
    }
}

/// source -> [100,110) allele1 -> [110,200) plain -> sink, weight 10
/// throughout. Only one allele is expressed anywhere.
fn one_sided_graph() -> SpliceGraph {
    let mut g = SpliceGraph::new();
    for _ in 0..4 {
        g.add_vertex();
    }
    g.gid = "gene.one_sided".into();
    g.strand = '+';
    g.set_vertex_info(
        1,
        vertex(100, 110, Genotype::Allele1, AsType::AsDiploidVar, START_BOUNDARY, 0),
    );
    g.set_vertex_info(
        2,
        vertex(110, 200, Genotype::Unphased, AsType::NsNonvar, 0, END_BOUNDARY),
    );
    g.set_vertex_weight(1, 10.0);
    g.set_vertex_weight(2, 10.0);
    for (s, t) in [(0usize, 1usize), (1, 2), (2, 3)] {
        let e = g.add_edge(s, t);
        g.set_edge_weight(e, 10.0);
    }
    g
}

/// With no ALLELE2 weight anywhere, the background ratio sends virtually
/// all unassigned weight to allele 1, and allele 2 assembles nothing.
#[test]
fn global_fallback_favors_the_expressed_allele() {
    let cfg = Config::default();
    let mut sc = FlowDecomposer::new(one_sided_graph(), HyperSet::new(), true, &cfg);
    sc.assemble(true).unwrap();
    assert!(!sc.asnonzeroset.is_empty());
    assert!(!sc.nsnonzeroset.is_empty());

    let out = phaser::phase(&sc, true, &cfg).unwrap();
    assert_eq!(out.trsts1.len(), 1);
    assert!(out.trsts2.is_empty());
    assert!(out.non_full_trsts2.is_empty());

    let t = &out.trsts1[0];
    assert_eq!(t.gt, Genotype::Allele1);
    assert_eq!(t.exons, vec![(100, 200)]);
    // nearly the full weight flows to allele 1
    assert!(t.coverage > 9.5, "coverage = {}", t.coverage);
}

/// Diamond with one variant vertex per allele: each allele's transcripts
/// traverse only vertices compatible with it.
#[test]
fn phased_transcripts_stay_on_their_allele() {
    let mut g = SpliceGraph::new();
    for _ in 0..6 {
        g.add_vertex();
    }
    g.gid = "gene.d".into();
    g.strand = '+';
    // 1: left flank, 2: allele1 SNP exon, 3: allele2 SNP exon, 4: right flank
    g.set_vertex_info(
        1,
        vertex(100, 125, Genotype::Unphased, AsType::AjNonvar, START_BOUNDARY, 0),
    );
    let mut v2 = vertex(125, 126, Genotype::Allele1, AsType::AsDiploidVar, 0, 0);
    v2.lpos = AllelicPos::with_allele(125, "A");
    v2.rpos = AllelicPos::with_allele(126, "A");
    g.set_vertex_info(2, v2);
    let mut v3 = vertex(125, 126, Genotype::Allele2, AsType::AsDiploidVar, 0, 0);
    v3.lpos = AllelicPos::with_allele(125, "G");
    v3.rpos = AllelicPos::with_allele(126, "G");
    g.set_vertex_info(3, v3);
    g.set_vertex_info(
        4,
        vertex(126, 200, Genotype::Unphased, AsType::AjNonvar, 0, END_BOUNDARY),
    );
    g.set_vertex_weight(1, 12.0);
    g.set_vertex_weight(2, 8.0);
    g.set_vertex_weight(3, 4.0);
    g.set_vertex_weight(4, 12.0);
    for (s, t, w) in [
        (0usize, 1usize, 12.0),
        (1, 2, 8.0),
        (1, 3, 4.0),
        (2, 4, 8.0),
        (3, 4, 4.0),
        (4, 5, 12.0),
    ] {
        let e = g.add_edge(s, t);
        g.set_edge_weight(e, w);
    }

    let cfg = Config::default();
    let mut sc = FlowDecomposer::new(g, HyperSet::new(), true, &cfg);
    sc.assemble(true).unwrap();

    let out = phaser::phase(&sc, true, &cfg).unwrap();
    assert_eq!(out.trsts1.len(), 1);
    assert_eq!(out.trsts2.len(), 1);

    let t1 = &out.trsts1[0];
    assert_eq!(t1.variants, vec![(125, "A".to_string())]);
    assert!((t1.coverage - 8.0).abs() < 0.5, "coverage = {}", t1.coverage);

    let t2 = &out.trsts2[0];
    assert_eq!(t2.variants, vec![(125, "G".to_string())]);
    assert!((t2.coverage - 4.0).abs() < 0.5, "coverage = {}", t2.coverage);

    // both alleles reconstruct the same exon chain through their own SNP exon
    assert_eq!(t1.exons, vec![(100, 200)]);
    assert_eq!(t2.exons, vec![(100, 200)]);
}

/// An edge carrying full weight for both alleles at once is a bundle error.
#[test]
fn conflicting_edge_assignment_is_rejected() {
    let mut g = SpliceGraph::new();
    for _ in 0..4 {
        g.add_vertex();
    }
    g.gid = "gene.c".into();
    g.set_vertex_info(
        1,
        vertex(100, 110, Genotype::Allele1, AsType::AsDiploidVar, START_BOUNDARY, 0),
    );
    g.set_vertex_info(
        2,
        vertex(110, 120, Genotype::Allele2, AsType::AsDiploidVar, 0, END_BOUNDARY),
    );
    g.set_vertex_weight(1, 5.0);
    g.set_vertex_weight(2, 5.0);
    for (s, t) in [(0usize, 1usize), (1, 2), (2, 3)] {
        let e = g.add_edge(s, t);
        g.set_edge_weight(e, 5.0);
    }

    let cfg = Config::default();
    let mut sc = FlowDecomposer::new(g, HyperSet::new(), true, &cfg);
    sc.assemble(true).unwrap();

    let err = phaser::phase(&sc, true, &cfg).unwrap_err();
    let be = err.downcast_ref::<asta_rs::BundleError>();
    assert!(matches!(be, Some(asta_rs::BundleError::ConflictingAssignment(_))));
}
