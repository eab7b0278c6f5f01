//! Flow decomposition: turn a refined splice graph plus its hyper-set into
//! weighted source-to-sink transcript paths.
//!
//! Paths are extracted greedily by widest bottleneck, with hyper-set route
//! support breaking ties, and their flow subtracted until no path of weight
//! at least one remains. In partial mode allelic vertices (and their marked
//! neighbors) are off limits: whatever flow crosses a variant is left intact
//! for the phaser to split.

use crate::config::Config;
use crate::hyper_set::HyperSet;
use crate::partial_exon::PexonKind;
use crate::region::{END_BOUNDARY, START_BOUNDARY};
use crate::splice_graph::{AsType, SpliceGraph};
use crate::transcript::Transcript;
use crate::types::{EdgeId, HashMap, HashMapExt};
use crate::vcf::Genotype;
use anyhow::Result;
use std::collections::BTreeSet;

/// Paths below this bottleneck are not worth a transcript.
const MIN_PATH_WEIGHT: f64 = 1.0;
/// Runaway guard; no realistic bundle decomposes into this many paths.
const MAX_PATHS: usize = 500;

pub struct FlowDecomposer {
    pub gr: SpliceGraph,
    pub hs: HyperSet,
    /// Decomposer-local edge indexing: row entries of the hyper-set are
    /// indices into `i2e`.
    pub i2e: Vec<EdgeId>,
    pub e2i: HashMap<EdgeId, i32>,
    /// Edge to the vertex pair it connects; consumers map edges back to
    /// regions through this.
    pub mev: HashMap<EdgeId, Vec<usize>>,
    /// Non-zero vertices after decomposition, split into allelic and plain.
    pub asnonzeroset: BTreeSet<usize>,
    pub nsnonzeroset: BTreeSet<usize>,
    pub trsts: Vec<Transcript>,
    pub non_full_trsts: Vec<Transcript>,
    partial: bool,
    cfg: Config,
}

impl FlowDecomposer {
    /// Host a graph whose hyper-set is still in node form.
    pub fn new(gr: SpliceGraph, mut hs: HyperSet, partial: bool, cfg: &Config) -> Self {
        let (i2e, e2i) = index_edges(&gr);
        if !hs.nodes.is_empty() {
            hs.build(&gr, &e2i, cfg.min_router_count);
        }
        let mev = build_mev(&gr);
        FlowDecomposer {
            gr,
            hs,
            i2e,
            e2i,
            mev,
            asnonzeroset: BTreeSet::new(),
            nsnonzeroset: BTreeSet::new(),
            trsts: Vec::new(),
            non_full_trsts: Vec::new(),
            partial,
            cfg: cfg.clone(),
        }
    }

    /// Host an allele graph whose hyper-set rows still index another graph's
    /// edges; `transform` must run before `assemble`.
    pub fn new_for_allele(gr: SpliceGraph, hs: HyperSet, cfg: &Config) -> Self {
        let (i2e, e2i) = index_edges(&gr);
        let mev = build_mev(&gr);
        FlowDecomposer {
            gr,
            hs,
            i2e,
            e2i,
            mev,
            asnonzeroset: BTreeSet::new(),
            nsnonzeroset: BTreeSet::new(),
            trsts: Vec::new(),
            non_full_trsts: Vec::new(),
            partial: false,
            cfg: cfg.clone(),
        }
    }

    /// Re-home the pending hyper-set rows onto this decomposer's graph via
    /// the old index list and the old-to-new edge bijection.
    pub fn transform(&mut self, i2e_old: &[EdgeId], x2y: &HashMap<EdgeId, EdgeId>) -> Result<()> {
        self.hs.transform(&self.gr, i2e_old, x2y, &self.e2i)?;
        self.hs.build_index();
        Ok(())
    }

    /// Extract transcript paths. `is_allelic` only annotates diagnostics; the
    /// graph's own vertex tags drive the behavior.
    pub fn assemble(&mut self, is_allelic: bool) -> Result<()> {
        let n = self.gr.num_vertices();
        if n < 3 {
            self.collect_nonzero();
            return Ok(());
        }
        tracing::debug!(gid = %self.gr.gid, n, is_allelic, partial = self.partial, "decompose");

        let mut counter = 0usize;
        while counter < MAX_PATHS {
            let Some((edges, bottleneck)) = self.widest_path() else {
                break;
            };
            if bottleneck < MIN_PATH_WEIGHT {
                break;
            }
            self.subtract_path(&edges, bottleneck);
            if let Some(t) = self.path_transcript(&edges, bottleneck, counter) {
                if self.is_full_length(&edges) {
                    self.trsts.push(t);
                } else {
                    self.non_full_trsts.push(t);
                }
            }
            counter += 1;
        }

        self.collect_nonzero();
        Ok(())
    }

    /// Vertices blocked for path relay in partial mode.
    fn blocked(&self, v: usize) -> bool {
        self.partial
            && matches!(
                self.gr.vertex_info(v).as_type,
                AsType::AsDiploidVar | AsType::AjNonvar
            )
    }

    /// Widest-bottleneck source-to-sink path. Vertex indices are a
    /// topological order by construction, so one ascending sweep suffices.
    /// Ties prefer routes supported by the hyper-set.
    fn widest_path(&self) -> Option<(Vec<EdgeId>, f64)> {
        let n = self.gr.num_vertices();
        let mut best: Vec<Option<(f64, i64, EdgeId)>> = vec![None; n];

        for v in 0..n - 1 {
            let (bn_v, supp_v, pred_v) = if v == 0 {
                (f64::INFINITY, 0i64, None)
            } else {
                match best[v] {
                    Some((b, s, p)) => (b, s, Some(p)),
                    None => continue,
                }
            };
            if v != 0 && self.blocked(v) {
                continue;
            }
            for e in self.gr.out_edges(v) {
                let t = self.gr.target(e);
                if t != n - 1 && self.blocked(t) {
                    continue;
                }
                let w = self.gr.edge_weight(e);
                if w <= 0.0 {
                    continue;
                }
                let cand = bn_v.min(w);
                let route_support = match pred_v {
                    Some(pe) => {
                        let (pi, ci) = (self.e2i.get(&pe), self.e2i.get(&e));
                        match (pi, ci) {
                            (Some(&pi), Some(&ci)) => {
                                *self.hs.get_successors(pi).get(&ci).unwrap_or(&0) as i64
                            }
                            _ => 0,
                        }
                    }
                    None => 0,
                };
                let supp = supp_v + route_support;
                let better = match best[t] {
                    None => true,
                    Some((b, s, _)) => cand > b + 1e-9 || ((cand - b).abs() <= 1e-9 && supp > s),
                };
                if better {
                    best[t] = Some((cand, supp, e));
                }
            }
        }

        let (bn, _, last) = best[n - 1]?;
        let mut edges = Vec::new();
        let mut e = last;
        loop {
            edges.push(e);
            let s = self.gr.source(e);
            if s == 0 {
                break;
            }
            e = best[s]?.2;
        }
        edges.reverse();
        Some((edges, bn))
    }

    fn subtract_path(&mut self, edges: &[EdgeId], w: f64) {
        for &e in edges {
            let left = (self.gr.edge_weight(e) - w).max(0.0);
            self.gr.set_edge_weight(e, left);
            if left <= 1e-9 {
                self.gr.remove_edge(e);
                if let Some(&i) = self.e2i.get(&e) {
                    self.hs.remove(i);
                }
            }
            let t = self.gr.target(e);
            if t != self.gr.num_vertices() - 1 {
                let vw = (self.gr.vertex_weight(t) - w).max(0.0);
                self.gr.set_vertex_weight(t, vw);
            }
        }
        self.hs.update_index();
    }

    /// Exon chain of a path: tombstoned vertices contribute nothing, and
    /// coordinate-adjacent vertices merge into one exon.
    fn path_transcript(&self, edges: &[EdgeId], w: f64, k: usize) -> Option<Transcript> {
        let mut exons: Vec<(i32, i32)> = Vec::new();
        let mut variants: Vec<(i32, String)> = Vec::new();
        let (mut a1, mut a2) = (0usize, 0usize);

        for &e in edges {
            let v = self.gr.target(e);
            if v == self.gr.num_vertices() - 1 {
                break;
            }
            let vi = self.gr.vertex_info(v);
            if vi.kind == PexonKind::EmptyVertex {
                continue;
            }
            match vi.gt {
                Genotype::Allele1 => a1 += 1,
                Genotype::Allele2 => a2 += 1,
                _ => {}
            }
            if let crate::position::Allele::Seq(s) = &vi.lpos.allele {
                variants.push((vi.lpos.p, s.clone()));
            }
            match exons.last_mut() {
                Some(last) if last.1 == vi.lpos.p => last.1 = vi.rpos.p,
                _ => exons.push((vi.lpos.p, vi.rpos.p)),
            }
        }
        if exons.is_empty() {
            return None;
        }

        let gt = if a1 > 0 && a2 == 0 {
            Genotype::Allele1
        } else if a2 > 0 && a1 == 0 {
            Genotype::Allele2
        } else {
            Genotype::Unphased
        };

        Some(Transcript {
            seqname: self.gr.chrm.clone(),
            gene_id: self.gr.gid.clone(),
            transcript_id: format!("{}.{}", self.gr.gid, k),
            strand: self.gr.strand,
            exons,
            coverage: w,
            rpkm: 0.0,
            gt,
            variants,
        })
    }

    /// A path is full length when its outermost real vertices carry the
    /// bundle's start and end boundary types.
    fn is_full_length(&self, edges: &[EdgeId]) -> bool {
        let n = self.gr.num_vertices();
        let internals: Vec<usize> = edges
            .iter()
            .map(|&e| self.gr.target(e))
            .filter(|&v| v != n - 1 && self.gr.vertex_info(v).kind != PexonKind::EmptyVertex)
            .collect();
        let (Some(&first), Some(&last)) = (internals.first(), internals.last()) else {
            return false;
        };
        (self.gr.vertex_info(first).ltype & START_BOUNDARY) != 0
            && (self.gr.vertex_info(last).rtype & END_BOUNDARY) != 0
    }

    fn collect_nonzero(&mut self) {
        self.asnonzeroset.clear();
        self.nsnonzeroset.clear();
        let n = self.gr.num_vertices();
        if n < 3 {
            return;
        }
        for v in 1..n - 1 {
            if self.gr.vertex_weight(v) <= 0.0 || self.gr.degree(v) == 0 {
                continue;
            }
            if self.gr.vertex_info(v).kind == PexonKind::EmptyVertex {
                continue;
            }
            if self.gr.vertex_info(v).is_as_vertex() {
                self.asnonzeroset.insert(v);
            } else {
                self.nsnonzeroset.insert(v);
            }
        }
    }

    /// True when every internal vertex is flagged regional; such graphs are
    /// local artifacts and are skipped wholesale.
    pub fn is_regional_graph(gr: &SpliceGraph) -> bool {
        let n = gr.num_vertices();
        if n < 3 {
            return false;
        }
        (1..n - 1).all(|i| gr.vertex_info(i).regional)
    }
}

fn index_edges(gr: &SpliceGraph) -> (Vec<EdgeId>, HashMap<EdgeId, i32>) {
    let i2e = gr.edge_ids();
    let mut e2i = HashMap::new();
    for (i, &e) in i2e.iter().enumerate() {
        e2i.insert(e, i as i32);
    }
    (i2e, e2i)
}

fn build_mev(gr: &SpliceGraph) -> HashMap<EdgeId, Vec<usize>> {
    let mut mev = HashMap::new();
    for e in gr.edge_ids() {
        mev.insert(e, vec![gr.source(e), gr.target(e)]);
    }
    mev
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::AllelicPos;
    use crate::splice_graph::VertexInfo;

    fn vi(l: i32, r: i32, lt: u32, rt: u32) -> VertexInfo {
        VertexInfo {
            lpos: AllelicPos::new(l),
            rpos: AllelicPos::new(r),
            length: r - l,
            ltype: lt,
            rtype: rt,
            ..VertexInfo::default()
        }
    }

    /// source -> a[100,150) -> b[250,300) -> sink, junction weight 10.
    fn two_exon_graph() -> SpliceGraph {
        let mut g = SpliceGraph::new();
        for _ in 0..4 {
            g.add_vertex();
        }
        g.gid = "gene.t".into();
        g.strand = '+';
        g.set_vertex_info(1, vi(100, 150, START_BOUNDARY, 0));
        g.set_vertex_info(2, vi(250, 300, 0, END_BOUNDARY));
        g.set_vertex_weight(1, 10.0);
        g.set_vertex_weight(2, 10.0);
        for (s, t, w) in [(0usize, 1usize, 10.0), (1, 2, 10.0), (2, 3, 10.0)] {
            let e = g.add_edge(s, t);
            g.set_edge_weight(e, w);
        }
        g
    }

    #[test]
    fn single_isoform_is_extracted_with_its_weight() {
        let cfg = Config::default();
        let mut sc = FlowDecomposer::new(two_exon_graph(), HyperSet::new(), false, &cfg);
        sc.assemble(false).unwrap();
        assert_eq!(sc.trsts.len(), 1);
        let t = &sc.trsts[0];
        assert_eq!(t.exons, vec![(100, 150), (250, 300)]);
        assert!((t.coverage - 10.0).abs() < 1e-9);
        assert!(sc.non_full_trsts.is_empty());
    }

    #[test]
    fn partial_mode_leaves_allelic_flow_alone() {
        let mut g = two_exon_graph();
        g.vertex_info_mut(1).as_type = AsType::AsDiploidVar;
        let cfg = Config::default();
        let mut sc = FlowDecomposer::new(g, HyperSet::new(), true, &cfg);
        sc.assemble(true).unwrap();
        assert!(sc.trsts.is_empty());
        assert_eq!(sc.asnonzeroset, BTreeSet::from([1]));
        assert_eq!(sc.nsnonzeroset, BTreeSet::from([2]));
        // weights untouched
        assert!((sc.gr.vertex_weight(1) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn adjacent_vertices_merge_into_one_exon() {
        let mut g = SpliceGraph::new();
        for _ in 0..4 {
            g.add_vertex();
        }
        g.gid = "gene.m".into();
        g.set_vertex_info(1, vi(100, 150, START_BOUNDARY, 0));
        g.set_vertex_info(2, vi(150, 200, 0, END_BOUNDARY));
        g.set_vertex_weight(1, 5.0);
        g.set_vertex_weight(2, 5.0);
        for (s, t) in [(0usize, 1usize), (1, 2), (2, 3)] {
            let e = g.add_edge(s, t);
            g.set_edge_weight(e, 5.0);
        }
        let cfg = Config::default();
        let mut sc = FlowDecomposer::new(g, HyperSet::new(), false, &cfg);
        sc.assemble(false).unwrap();
        assert_eq!(sc.trsts.len(), 1);
        assert_eq!(sc.trsts[0].exons, vec![(100, 200)]);
    }
}
