//! Splice-graph refinement heuristics.
//!
//! Each pass returns whether it changed the graph; the bundle drives them to
//! a fixed point. Vertices are never physically removed: boundary heuristics
//! tombstone them as `EmptyVertex`, and `refine_splice_graph` strips edges of
//! half-connected vertices so every surviving internal vertex has both an
//! in-edge and an out-edge.

use crate::config::Config;
use crate::partial_exon::PexonKind;
use crate::splice_graph::{EdgeInfo, SpliceGraph};
use crate::types::EdgeId;
use crate::util::DisjointSet;
use std::collections::BTreeSet;

/// Clear vertices that kept edges on only one side, until stable.
pub fn refine_splice_graph(gr: &mut SpliceGraph) {
    loop {
        let mut changed = false;
        for i in 1..gr.num_vertices() - 1 {
            if gr.degree(i) == 0 {
                continue;
            }
            if gr.in_degree(i) >= 1 && gr.out_degree(i) >= 1 {
                continue;
            }
            gr.clear_vertex(i);
            changed = true;
        }
        if !changed {
            break;
        }
    }
}

/// A vertex much heavier than its summed incoming edges gets a direct edge
/// from the source carrying the residue.
pub fn extend_start_boundaries(gr: &mut SpliceGraph) -> bool {
    let n = gr.num_vertices();
    let mut flag = false;
    for i in 1..n - 1 {
        if gr.edge_between(0, i).is_some() {
            continue;
        }
        let wv = gr.vertex_weight(i);
        let we: f64 = gr.in_edges(i).iter().map(|&e| gr.edge_weight(e)).sum();
        if wv < we || wv < 10.0 * we * we + 10.0 {
            continue;
        }
        let ee = gr.add_edge(0, i);
        gr.set_edge_weight(ee, wv - we);
        gr.set_edge_info(ee, EdgeInfo::default());
        tracing::debug!(vertex = i, wv, we, "extend start boundary");
        flag = true;
    }
    flag
}

pub fn extend_end_boundaries(gr: &mut SpliceGraph) -> bool {
    let n = gr.num_vertices();
    let mut flag = false;
    for i in 1..n - 1 {
        if gr.edge_between(i, n - 1).is_some() {
            continue;
        }
        let wv = gr.vertex_weight(i);
        let we: f64 = gr.out_edges(i).iter().map(|&e| gr.edge_weight(e)).sum();
        if wv < we || wv < 10.0 * we * we + 10.0 {
            continue;
        }
        let ee = gr.add_edge(i, n - 1);
        gr.set_edge_weight(ee, wv - we);
        gr.set_edge_info(ee, EdgeInfo::default());
        tracing::debug!(vertex = i, wv, we, "extend end boundary");
        flag = true;
    }
    flag
}

/// Re-route a gap-crossing edge whose single-degree endpoint dominates it:
/// the endpoint is promoted to a boundary vertex instead.
pub fn extend_boundaries(gr: &mut SpliceGraph) -> bool {
    let n = gr.num_vertices();
    for e in gr.edge_ids() {
        let s = gr.source(e);
        let t = gr.target(e);
        if s == 0 || t == n - 1 {
            continue;
        }
        let gap = gr.vertex_info(t).lpos.p - gr.vertex_info(s).rpos.p;
        if gap <= 0 {
            continue;
        }
        let we = gr.edge_weight(e);
        let ws = gr.vertex_weight(s);
        let wt = gr.vertex_weight(t);

        let b = (gr.out_degree(s) == 1 && ws >= 10.0 * we * we + 10.0)
            || (gr.in_degree(t) == 1 && wt >= 10.0 * we * we + 10.0);
        if !b {
            continue;
        }

        if gr.out_degree(s) == 1 {
            let ee = gr.add_edge(s, n - 1);
            gr.set_edge_weight(ee, ws);
            gr.set_edge_info(ee, EdgeInfo::default());
        }
        if gr.in_degree(t) == 1 {
            let ee = gr.add_edge(0, t);
            gr.set_edge_weight(ee, wt);
            gr.set_edge_info(ee, EdgeInfo::default());
        }
        gr.remove_edge(e);
        return true;
    }
    false
}

/// A 1-in/1-out vertex hanging off the source or sink with flat coverage is a
/// spurious boundary.
pub fn remove_inner_boundaries(gr: &mut SpliceGraph) -> bool {
    let n = gr.num_vertices();
    let mut flag = false;
    for i in 1..n - 1 {
        if gr.vertex_info(i).kind == PexonKind::EmptyVertex {
            continue;
        }
        if gr.in_degree(i) != 1 || gr.out_degree(i) != 1 {
            continue;
        }
        let e1 = gr.in_edges(i)[0];
        let e2 = gr.out_edges(i)[0];
        let s = gr.source(e1);
        let t = gr.target(e2);

        if s != 0 && t != n - 1 {
            continue;
        }
        if s != 0 && gr.out_degree(s) == 1 {
            continue;
        }
        if t != n - 1 && gr.in_degree(t) == 1 {
            continue;
        }
        if gr.vertex_info(i).stddev >= 0.01 {
            continue;
        }
        tracing::debug!(vertex = i, weight = gr.vertex_weight(i), "remove inner boundary");
        gr.vertex_info_mut(i).kind = PexonKind::EmptyVertex;
        flag = true;
    }
    flag
}

/// Boundary exons shorter than `min_exon_length` without any real adjacency
/// are tombstoned.
pub fn remove_small_exons(gr: &mut SpliceGraph, cfg: &Config) -> bool {
    let n = gr.num_vertices();
    let mut flag = false;
    for i in 1..n - 1 {
        if gr.vertex_info(i).kind == PexonKind::EmptyVertex {
            continue;
        }
        let p1 = gr.vertex_info(i).lpos.p;
        let p2 = gr.vertex_info(i).rpos.p;
        if p2 - p1 >= cfg.min_exon_length {
            continue;
        }
        if gr.degree(i) == 0 {
            continue;
        }

        let mut keep = false;
        for e in gr.in_edges(i) {
            let s = gr.source(e);
            if s != 0 && gr.vertex_info(s).rpos.p == p1 {
                keep = true;
                break;
            }
        }
        if !keep {
            for e in gr.out_edges(i) {
                let t = gr.target(e);
                if t != n - 1 && gr.vertex_info(t).lpos.p == p2 {
                    keep = true;
                    break;
                }
            }
        }
        if keep {
            continue;
        }

        // only boundary small exons are candidates
        if gr.edge_between(0, i).is_none() && gr.edge_between(i, n - 1).is_none() {
            continue;
        }

        tracing::debug!(length = p2 - p1, p1, p2, "remove small exon");
        gr.vertex_info_mut(i).kind = PexonKind::EmptyVertex;
        flag = true;
    }
    flag
}

/// Drop junction edges that are dwarfed by both the vertex they touch and the
/// strongest adjacent (coordinate-contiguous) neighbor.
pub fn remove_small_junctions(gr: &mut SpliceGraph) -> bool {
    let n = gr.num_vertices();
    let mut se: BTreeSet<EdgeId> = BTreeSet::new();

    for i in 1..n - 1 {
        if gr.degree(i) == 0 {
            continue;
        }
        let p1 = gr.vertex_info(i).lpos.p;
        let p2 = gr.vertex_info(i).rpos.p;
        let wi = gr.vertex_weight(i);

        let mut ws = 0.0f64;
        for e in gr.in_edges(i) {
            let s = gr.source(e);
            if s == 0 || gr.vertex_info(s).rpos.p != p1 {
                continue;
            }
            ws = ws.max(gr.vertex_weight(s));
        }
        for e in gr.in_edges(i) {
            let s = gr.source(e);
            if s == 0 || gr.vertex_info(s).rpos.p == p1 {
                continue;
            }
            let w = gr.edge_weight(e);
            if ws >= 2.0 * w * w + 18.0 && wi >= 2.0 * w * w + 18.0 {
                se.insert(e);
            }
        }

        let mut wt = 0.0f64;
        for e in gr.out_edges(i) {
            let t = gr.target(e);
            if t == n - 1 || gr.vertex_info(t).lpos.p != p2 {
                continue;
            }
            wt = wt.max(gr.vertex_weight(t));
        }
        for e in gr.out_edges(i) {
            let t = gr.target(e);
            if t == n - 1 || gr.vertex_info(t).lpos.p == p2 {
                continue;
            }
            let w = gr.edge_weight(e);
            if wt >= 2.0 * w * w + 18.0 && wi >= 2.0 * w * w + 18.0 {
                se.insert(e);
            }
        }
    }

    if se.is_empty() {
        return false;
    }
    for e in se {
        tracing::debug!(
            s = gr.source(e),
            t = gr.target(e),
            weight = gr.edge_weight(e),
            "remove small junction"
        );
        gr.remove_edge(e);
    }
    true
}

/// A vertex bridging a junction's own span with weight at or below the
/// junction edge is retained intron, not exon.
pub fn remove_intron_contamination(gr: &mut SpliceGraph, cfg: &Config) -> bool {
    let n = gr.num_vertices();
    let mut flag = false;
    for i in 1..n - 1 {
        if gr.vertex_info(i).kind == PexonKind::EmptyVertex {
            continue;
        }
        if gr.in_degree(i) != 1 || gr.out_degree(i) != 1 {
            continue;
        }
        let e1 = gr.in_edges(i)[0];
        let e2 = gr.out_edges(i)[0];
        let s = gr.source(e1);
        let t = gr.target(e2);
        let wv = gr.vertex_weight(i);

        if s == 0 || t == n - 1 {
            continue;
        }
        if gr.vertex_info(s).rpos.p != gr.vertex_info(i).lpos.p {
            continue;
        }
        if gr.vertex_info(t).lpos.p != gr.vertex_info(i).rpos.p {
            continue;
        }
        let Some(ee) = gr.edge_between(s, t) else {
            continue;
        };
        let we = gr.edge_weight(ee);
        if wv > we || wv > cfg.max_intron_contamination_coverage {
            continue;
        }

        tracing::debug!(vertex = i, wv, we, "clear intron contamination");
        gr.vertex_info_mut(i).kind = PexonKind::EmptyVertex;
        flag = true;
    }
    flag
}

/// Heaviest internal edge of each weakly connected component, weight >= 1.5.
fn compute_maximal_edges(gr: &SpliceGraph) -> Vec<EdgeId> {
    let n = gr.num_vertices();
    let mut ds = DisjointSet::new(n);
    let mut ve: Vec<(f64, EdgeId)> = Vec::new();
    for e in gr.edge_ids() {
        let s = gr.source(e);
        let t = gr.target(e);
        if s == 0 || t == n - 1 {
            continue;
        }
        ds.union(s, t);
        ve.push((gr.edge_weight(e), e));
    }
    ve.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap());

    let mut picked = Vec::new();
    let mut seen: BTreeSet<usize> = BTreeSet::new();
    for (w, e) in ve {
        if w < 1.5 {
            break;
        }
        let c = ds.find(gr.source(e));
        if seen.insert(c) {
            picked.push(e);
        }
    }
    picked
}

/// Keep edges above the surviving-weight floor plus one maximal edge per
/// component, then iteratively re-admit the heaviest incident edge of any
/// vertex that lost all of its in- or out-edges.
pub fn keep_surviving_edges(gr: &mut SpliceGraph, cfg: &Config) -> bool {
    let n = gr.num_vertices();
    let mut se: BTreeSet<EdgeId> = BTreeSet::new();
    let mut sv1: BTreeSet<usize> = BTreeSet::new(); // has a surviving in-edge
    let mut sv2: BTreeSet<usize> = BTreeSet::new(); // has a surviving out-edge

    for e in gr.edge_ids() {
        if gr.edge_weight(e) < cfg.min_surviving_edge_weight {
            continue;
        }
        sv1.insert(gr.target(e));
        sv2.insert(gr.source(e));
        se.insert(e);
    }
    for e in compute_maximal_edges(gr) {
        sv1.insert(gr.target(e));
        sv2.insert(gr.source(e));
        se.insert(e);
    }

    loop {
        let mut patched = false;
        for &e in se.clone().iter() {
            let s = gr.source(e);
            let t = gr.target(e);
            if !sv1.contains(&s) && s != 0 {
                if let Some(ee) = gr.max_in_edge(s) {
                    se.insert(ee);
                    sv2.insert(gr.source(ee));
                }
                sv1.insert(s);
                patched = true;
                break;
            }
            if !sv2.contains(&t) && t != n - 1 {
                if let Some(ee) = gr.max_out_edge(t) {
                    se.insert(ee);
                    sv1.insert(gr.target(ee));
                }
                sv2.insert(t);
                patched = true;
                break;
            }
        }
        if !patched {
            break;
        }
    }

    let doomed: Vec<EdgeId> = gr.edge_ids().into_iter().filter(|e| !se.contains(e)).collect();
    for &e in &doomed {
        tracing::debug!(
            s = gr.source(e),
            t = gr.target(e),
            weight = gr.edge_weight(e),
            "remove non-surviving edge"
        );
        gr.remove_edge(e);
    }
    !doomed.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::AllelicPos;
    use crate::splice_graph::VertexInfo;

    fn vi(l: i32, r: i32) -> VertexInfo {
        VertexInfo {
            lpos: AllelicPos::new(l),
            rpos: AllelicPos::new(r),
            length: r - l,
            ..VertexInfo::default()
        }
    }

    /// source - a[100,150) - b[150,250) - c[250,300) - sink with the spliced
    /// edge a->c; weights picked per scenario.
    fn intron_graph(wa: f64, wb: f64, wc: f64, wjunc: f64) -> SpliceGraph {
        let mut g = SpliceGraph::new();
        for _ in 0..5 {
            g.add_vertex();
        }
        g.set_vertex_info(1, vi(100, 150));
        g.set_vertex_info(2, vi(150, 250));
        g.set_vertex_info(3, vi(250, 300));
        g.set_vertex_weight(1, wa);
        g.set_vertex_weight(2, wb);
        g.set_vertex_weight(3, wc);
        for (s, t, w) in [(0usize, 1usize, wa), (1, 2, wb), (2, 3, wb), (3, 4, wc)] {
            let e = g.add_edge(s, t);
            g.set_edge_weight(e, w);
        }
        let j = g.add_edge(1, 3);
        g.set_edge_weight(j, wjunc);
        g
    }

    #[test]
    fn intron_contamination_is_tombstoned() {
        let mut g = intron_graph(100.0, 2.0, 100.0, 100.0);
        let cfg = Config::default();
        assert!(remove_intron_contamination(&mut g, &cfg));
        assert_eq!(g.vertex_info(2).kind, PexonKind::EmptyVertex);
        // a second application changes nothing
        assert!(!remove_intron_contamination(&mut g, &cfg));
    }

    #[test]
    fn small_junction_between_dominant_adjacencies_is_cut() {
        // a and c at 200x connected both by adjacency chain and a weak
        // junction of weight 2: 2*2^2+18 = 26 <= 200.
        let mut g = intron_graph(200.0, 200.0, 200.0, 2.0);
        assert!(remove_small_junctions(&mut g));
        assert!(g.edge_between(1, 3).is_none());
        assert!(g.edge_between(1, 2).is_some());
    }

    #[test]
    fn refine_clears_half_connected_vertices() {
        let mut g = SpliceGraph::new();
        for _ in 0..4 {
            g.add_vertex();
        }
        g.set_vertex_info(1, vi(0, 10));
        g.set_vertex_info(2, vi(10, 20));
        // vertex 1 has only an out-edge; vertex 2 then loses its chain
        let e1 = g.add_edge(1, 2);
        let e2 = g.add_edge(2, 3);
        g.set_edge_weight(e1, 1.0);
        g.set_edge_weight(e2, 1.0);
        refine_splice_graph(&mut g);
        assert_eq!(g.degree(1), 0);
        assert_eq!(g.degree(2), 0);
    }

    #[test]
    fn refine_is_idempotent() {
        let mut g = intron_graph(10.0, 10.0, 10.0, 5.0);
        refine_splice_graph(&mut g);
        let before = g.num_edges();
        refine_splice_graph(&mut g);
        assert_eq!(g.num_edges(), before);
    }

    #[test]
    fn keep_surviving_edges_retains_component_maximum() {
        let mut g = intron_graph(1.0, 1.0, 1.0, 2.0);
        let cfg = Config::default();
        // all weights below min_surviving_edge_weight except the junction
        assert!(keep_surviving_edges(&mut g, &cfg));
        assert!(g.edge_between(1, 3).is_some());
    }

    #[test]
    fn short_boundary_exon_is_tombstoned() {
        let mut g = SpliceGraph::new();
        for _ in 0..4 {
            g.add_vertex();
        }
        // a 1 bp exon hanging off the source, then a gap to the real exon
        g.set_vertex_info(1, vi(99, 100));
        g.set_vertex_info(2, vi(250, 300));
        g.set_vertex_weight(1, 2.0);
        g.set_vertex_weight(2, 30.0);
        for (s, t, w) in [(0usize, 1usize, 2.0), (1, 2, 2.0), (2, 3, 30.0)] {
            let e = g.add_edge(s, t);
            g.set_edge_weight(e, w);
        }
        let cfg = Config::default();
        assert!(remove_small_exons(&mut g, &cfg));
        assert_eq!(g.vertex_info(1).kind, PexonKind::EmptyVertex);
        assert_eq!(g.vertex_info(2).kind, PexonKind::Normal);
    }

    #[test]
    fn extend_start_boundary_adds_residual_edge() {
        let mut g = SpliceGraph::new();
        for _ in 0..4 {
            g.add_vertex();
        }
        g.set_vertex_info(1, vi(0, 100));
        g.set_vertex_info(2, vi(100, 200));
        g.set_vertex_weight(1, 50.0);
        g.set_vertex_weight(2, 500.0);
        let e1 = g.add_edge(0, 1);
        g.set_edge_weight(e1, 50.0);
        let e2 = g.add_edge(1, 2);
        g.set_edge_weight(e2, 3.0);
        let e3 = g.add_edge(2, 3);
        g.set_edge_weight(e3, 500.0);
        // wv=500 >= 10*9+10=100 and >= we=3
        assert!(extend_start_boundaries(&mut g));
        let ee = g.edge_between(0, 2).unwrap();
        assert!((g.edge_weight(ee) - 497.0).abs() < 1e-9);
        assert!(!extend_start_boundaries(&mut g));
    }
}
