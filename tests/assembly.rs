//! End-to-end scenarios over the in-memory bundle pipeline: synthetic hits
//! in, splice graphs and transcripts out. No BAM files required.

use asta_rs::bundle::Bundle;
use asta_rs::bundle_base::BundleBase;
use asta_rs::config::Config;
use asta_rs::decompose::FlowDecomposer;
use asta_rs::hit::Hit;
use asta_rs::hyper_set::HyperSet;
use asta_rs::partial_exon::PexonKind;
use asta_rs::phaser;
use asta_rs::vcf::{Genotype, VcfData};

fn spliced_hit(i: usize, xs: char) -> Hit {
    Hit::synthetic(
        0,
        &format!("r{i}"),
        &[(100, 150), (250, 300)],
        &[],
        xs,
        0,
        0,
        0,
    )
}

/// Two-exon gene, no variants: one junction of count 10, two partial
/// exons, a source/exon/exon/sink graph, one full-length transcript.
#[test]
fn two_exon_transcript_single_isoform() {
    let cfg = Config::default();
    let mut bb = BundleBase::new(false);
    for i in 0..10 {
        bb.add_hit(spliced_hit(i, '+')).unwrap();
    }
    let mut bd = Bundle::new(bb, None, &cfg).unwrap();
    bd.build(1).unwrap();

    assert_eq!(bd.br.junctions.len(), 1);
    assert_eq!((bd.br.junctions[0].lpos, bd.br.junctions[0].rpos), (150, 250));
    assert_eq!(bd.br.junctions[0].count, 10);
    assert_eq!(bd.pexons.len(), 2);
    assert_eq!(bd.gr.num_vertices(), 4);

    let e = bd.gr.edge_between(1, 2).expect("junction edge");
    assert!((bd.gr.edge_weight(e) - 10.0).abs() < 1e-9);

    let mut sc = FlowDecomposer::new(bd.gr.clone(), bd.hs.clone(), true, &cfg);
    sc.assemble(false).unwrap();
    assert_eq!(sc.trsts.len(), 1);
    assert_eq!(sc.trsts[0].exons, vec![(100, 150), (250, 300)]);
    assert!((sc.trsts[0].coverage - 10.0).abs() < 1e-9);

    // no allelic vertices: phasing refuses with a bundle error
    let err = phaser::phase(&sc, false, &cfg).unwrap_err();
    assert!(err.downcast_ref::<asta_rs::BundleError>().is_some());
}

/// Heterozygous SNP inside the first exon: parallel allelic regions, five
/// partial exons, and one transcript per allele out of the phaser.
#[test]
fn heterozygous_snp_phases_into_two_isoforms() {
    let mut vcf = VcfData::default();
    vcf.insert("", 125, 1, &[("A", Genotype::Allele1), ("G", Genotype::Allele2)]);

    let cfg = Config::default();
    let mut bb = BundleBase::new(true);
    for i in 0..5 {
        bb.add_hit(Hit::synthetic(
            0,
            &format!("a{i}"),
            &[(100, 150), (250, 300)],
            &[(125, 1, "A")],
            '+',
            0,
            0,
            0,
        ))
        .unwrap();
        bb.add_hit(Hit::synthetic(
            0,
            &format!("g{i}"),
            &[(100, 150), (250, 300)],
            &[(125, 1, "G")],
            '+',
            0,
            0,
            0,
        ))
        .unwrap();
    }

    let mut bd = Bundle::new(bb, Some(&vcf), &cfg).unwrap();
    bd.build(1).unwrap();

    // [100,125) [125,126)A [125,126)G [126,150) [250,300)
    assert_eq!(bd.pexons.len(), 5);
    let allelic: Vec<_> = bd.pexons.iter().filter(|p| p.is_allelic()).collect();
    assert_eq!(allelic.len(), 2);
    assert!(allelic[0].lpos.same_coord(&allelic[1].lpos));

    let mut sc = FlowDecomposer::new(bd.gr.clone(), bd.hs.clone(), true, &cfg);
    sc.assemble(true).unwrap();
    // allele-crossing flow is left for the phaser
    assert!(!sc.asnonzeroset.is_empty());

    let out = phaser::phase(&sc, true, &cfg).unwrap();
    assert_eq!(out.trsts1.len(), 1);
    assert_eq!(out.trsts2.len(), 1);

    let t1 = &out.trsts1[0];
    let t2 = &out.trsts2[0];
    assert_eq!(t1.exons, vec![(100, 150), (250, 300)]);
    assert_eq!(t2.exons, vec![(100, 150), (250, 300)]);
    assert_eq!(t1.gt, Genotype::Allele1);
    assert_eq!(t2.gt, Genotype::Allele2);
    assert_eq!(t1.variants, vec![(125, "A".to_string())]);
    assert_eq!(t2.variants, vec![(125, "G".to_string())]);
    assert!(t1.coverage >= 4.0 && t1.coverage <= 5.0);
    assert!(t2.coverage >= 4.0 && t2.coverage <= 5.0);
}

/// Retained-intron contamination at low depth is tombstoned while the
/// dominant spliced isoform survives.
#[test]
fn intron_contamination_is_removed() {
    let cfg = Config::default();
    let mut bb = BundleBase::new(false);
    for i in 0..100 {
        bb.add_hit(spliced_hit(i, '+')).unwrap();
    }
    for i in 0..2 {
        bb.add_hit(Hit::synthetic(0, &format!("u{i}"), &[(100, 300)], &[], '+', 0, 0, 0))
            .unwrap();
    }
    let mut bd = Bundle::new(bb, None, &cfg).unwrap();
    bd.build(1).unwrap();

    // vertex 2 is the intron-covering region [150,250)
    assert_eq!(bd.gr.vertex_info(2).kind, PexonKind::EmptyVertex);

    let mut sc = FlowDecomposer::new(bd.gr.clone(), bd.hs.clone(), true, &cfg);
    sc.assemble(false).unwrap();
    assert!(!sc.trsts.is_empty());
    assert_eq!(sc.trsts[0].exons, vec![(100, 150), (250, 300)]);
    // every emitted transcript skips the tombstoned intron vertex
    for t in sc.trsts.iter().chain(sc.non_full_trsts.iter()) {
        assert_eq!(t.exons, vec![(100, 150), (250, 300)]);
    }
}

/// Revising an already-refined graph changes nothing: build twice with the
/// same mode and compare the surviving edge structure.
#[test]
fn refinement_is_idempotent_across_rebuilds() {
    let cfg = Config::default();
    let mut bb = BundleBase::new(false);
    for i in 0..30 {
        bb.add_hit(spliced_hit(i, '+')).unwrap();
    }
    let mut bd = Bundle::new(bb, None, &cfg).unwrap();
    bd.build(1).unwrap();
    let shape1: Vec<(usize, usize)> = bd
        .gr
        .edge_ids()
        .iter()
        .map(|&e| (bd.gr.source(e), bd.gr.target(e)))
        .collect();
    bd.build(1).unwrap();
    let shape2: Vec<(usize, usize)> = bd
        .gr
        .edge_ids()
        .iter()
        .map(|&e| (bd.gr.source(e), bd.gr.target(e)))
        .collect();
    assert_eq!(shape1, shape2);
}

/// An unstranded bundle with mixed xs calls its strand by majority.
#[test]
fn bundle_strand_called_by_xs_majority() {
    let cfg = Config::default();
    let mut bb = BundleBase::new(false);
    for i in 0..8 {
        bb.add_hit(spliced_hit(i, '+')).unwrap();
    }
    for i in 8..11 {
        bb.add_hit(spliced_hit(i, '.')).unwrap();
    }
    let bd = Bundle::new(bb, None, &cfg).unwrap();
    assert_eq!(bd.bb.strand, '+');
}

/// A hyper-set whose node counts sit below min_router_count yields no rows.
#[test]
fn hyper_set_below_router_count_is_empty() {
    let mut cfg = Config::default();
    cfg.min_router_count = 100;
    let mut bb = BundleBase::new(false);
    for i in 0..10 {
        bb.add_hit(spliced_hit(i, '+')).unwrap();
    }
    let mut bd = Bundle::new(bb, None, &cfg).unwrap();
    bd.build(1).unwrap();

    let sc = FlowDecomposer::new(bd.gr.clone(), bd.hs.clone(), true, &cfg);
    assert!(sc.hs.edges.is_empty());
}

/// One hyper-set path per allele after the phaser's split: the row through
/// the opposite allele's vertex is dropped.
#[test]
fn allelic_hyper_rows_follow_their_allele() {
    let mut vcf = VcfData::default();
    vcf.insert("", 125, 1, &[("A", Genotype::Allele1), ("G", Genotype::Allele2)]);

    let cfg = Config::default();
    let mut bb = BundleBase::new(true);
    for i in 0..5 {
        bb.add_hit(Hit::synthetic(
            0,
            &format!("a{i}"),
            &[(100, 150), (250, 300)],
            &[(125, 1, "A")],
            '+',
            0,
            0,
            0,
        ))
        .unwrap();
        bb.add_hit(Hit::synthetic(
            0,
            &format!("g{i}"),
            &[(100, 150), (250, 300)],
            &[(125, 1, "G")],
            '+',
            0,
            0,
            0,
        ))
        .unwrap();
    }
    let mut bd = Bundle::new(bb, Some(&vcf), &cfg).unwrap();
    bd.build(1).unwrap();

    // two phasing paths in node form, one per allele
    assert_eq!(bd.hs.nodes.len(), 2);

    let mut sc = FlowDecomposer::new(bd.gr.clone(), bd.hs.clone(), true, &cfg);
    sc.assemble(true).unwrap();
    assert_eq!(sc.hs.edges.len(), 2);

    let out = phaser::phase(&sc, true, &cfg).unwrap();
    // both allele assemblies produced exactly their own isoform
    assert_eq!(out.trsts1.len(), 1);
    assert_eq!(out.trsts2.len(), 1);
}

/// An empty hyper-set never blocks decomposition.
#[test]
fn decomposition_works_without_phasing_evidence() {
    let cfg = Config::default();
    let mut bb = BundleBase::new(false);
    for i in 0..10 {
        bb.add_hit(spliced_hit(i, '+')).unwrap();
    }
    let mut bd = Bundle::new(bb, None, &cfg).unwrap();
    bd.build(2).unwrap();

    let mut sc = FlowDecomposer::new(bd.gr.clone(), HyperSet::new(), false, &cfg);
    sc.assemble(false).unwrap();
    assert_eq!(sc.trsts.len(), 1);
}
