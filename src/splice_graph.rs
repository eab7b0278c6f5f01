//! The per-bundle splice graph: a DAG from a source vertex (index 0) through
//! one vertex per partial exon to a sink (index n-1).
//!
//! Vertices and edges live in arenas. Edge ids are stable: removal tombstones
//! the record instead of reusing the slot, so maps keyed by `EdgeId` (the
//! hyper-set's `e2s`, the phaser's bijections) survive graph rewriting.

use crate::partial_exon::PexonKind;
use crate::position::AllelicPos;
use crate::types::{EdgeId, HashMap};
use crate::vcf::Genotype;

/// Vertex role with respect to allelic decomposition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AsType {
    #[default]
    StartOrSink,
    /// Plain vertex, no variant in sight.
    NsNonvar,
    /// A diploid variant vertex (or an unphased exon sitting on a variant).
    AsDiploidVar,
    /// Non-variant vertex adjacent to a variant vertex.
    AjNonvar,
}

#[derive(Debug, Clone, Default)]
pub struct VertexInfo {
    pub lpos: AllelicPos,
    pub rpos: AllelicPos,
    pub length: i32,
    pub gt: Genotype,
    pub stddev: f64,
    pub kind: PexonKind,
    pub as_type: AsType,
    pub regional: bool,
    pub ltype: u32,
    pub rtype: u32,
}

impl VertexInfo {
    pub fn is_as_vertex(&self) -> bool {
        matches!(self.as_type, AsType::AsDiploidVar)
    }
}

#[derive(Debug, Clone, Default)]
pub struct EdgeInfo {
    pub weight: f64,
    pub strand: char,
}

#[derive(Debug, Clone)]
struct EdgeRec {
    s: usize,
    t: usize,
    alive: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SpliceGraph {
    pub gid: String,
    pub chrm: String,
    pub strand: char,

    vwrt: Vec<f64>,
    vinf: Vec<VertexInfo>,

    erec: Vec<EdgeRec>,
    ewrt: Vec<f64>,
    einf: Vec<EdgeInfo>,

    adj_out: Vec<Vec<EdgeId>>,
    adj_in: Vec<Vec<EdgeId>>,
}

impl SpliceGraph {
    pub fn new() -> Self {
        SpliceGraph::default()
    }

    pub fn clear(&mut self) {
        self.vwrt.clear();
        self.vinf.clear();
        self.erec.clear();
        self.ewrt.clear();
        self.einf.clear();
        self.adj_out.clear();
        self.adj_in.clear();
    }

    // ── vertices ────────────────────────────────────────────────────────────

    pub fn add_vertex(&mut self) -> usize {
        self.vwrt.push(0.0);
        self.vinf.push(VertexInfo::default());
        self.adj_out.push(Vec::new());
        self.adj_in.push(Vec::new());
        self.vwrt.len() - 1
    }

    pub fn num_vertices(&self) -> usize {
        self.vwrt.len()
    }

    pub fn set_vertex_weight(&mut self, v: usize, w: f64) {
        self.vwrt[v] = w;
    }

    pub fn vertex_weight(&self, v: usize) -> f64 {
        self.vwrt[v]
    }

    pub fn set_vertex_info(&mut self, v: usize, vi: VertexInfo) {
        self.vinf[v] = vi;
    }

    pub fn vertex_info(&self, v: usize) -> &VertexInfo {
        &self.vinf[v]
    }

    pub fn vertex_info_mut(&mut self, v: usize) -> &mut VertexInfo {
        &mut self.vinf[v]
    }

    // ── edges ───────────────────────────────────────────────────────────────

    pub fn add_edge(&mut self, s: usize, t: usize) -> EdgeId {
        let e = self.erec.len();
        self.erec.push(EdgeRec { s, t, alive: true });
        self.ewrt.push(0.0);
        self.einf.push(EdgeInfo::default());
        self.adj_out[s].push(e);
        self.adj_in[t].push(e);
        e
    }

    pub fn remove_edge(&mut self, e: EdgeId) {
        self.erec[e].alive = false;
    }

    pub fn edge_alive(&self, e: EdgeId) -> bool {
        self.erec.get(e).map(|r| r.alive).unwrap_or(false)
    }

    pub fn source(&self, e: EdgeId) -> usize {
        self.erec[e].s
    }

    pub fn target(&self, e: EdgeId) -> usize {
        self.erec[e].t
    }

    /// The alive edge from `s` to `t`, if any.
    pub fn edge_between(&self, s: usize, t: usize) -> Option<EdgeId> {
        self.adj_out[s]
            .iter()
            .copied()
            .find(|&e| self.erec[e].alive && self.erec[e].t == t)
    }

    pub fn set_edge_weight(&mut self, e: EdgeId, w: f64) {
        self.ewrt[e] = w;
    }

    pub fn edge_weight(&self, e: EdgeId) -> f64 {
        self.ewrt[e]
    }

    pub fn set_edge_info(&mut self, e: EdgeId, ei: EdgeInfo) {
        self.einf[e] = ei;
    }

    pub fn edge_info(&self, e: EdgeId) -> &EdgeInfo {
        &self.einf[e]
    }

    pub fn in_edges(&self, v: usize) -> Vec<EdgeId> {
        self.adj_in[v]
            .iter()
            .copied()
            .filter(|&e| self.erec[e].alive)
            .collect()
    }

    pub fn out_edges(&self, v: usize) -> Vec<EdgeId> {
        self.adj_out[v]
            .iter()
            .copied()
            .filter(|&e| self.erec[e].alive)
            .collect()
    }

    pub fn in_degree(&self, v: usize) -> usize {
        self.adj_in[v].iter().filter(|&&e| self.erec[e].alive).count()
    }

    pub fn out_degree(&self, v: usize) -> usize {
        self.adj_out[v].iter().filter(|&&e| self.erec[e].alive).count()
    }

    pub fn degree(&self, v: usize) -> usize {
        self.in_degree(v) + self.out_degree(v)
    }

    pub fn clear_vertex(&mut self, v: usize) {
        for e in self.adj_in[v].clone() {
            self.erec[e].alive = false;
        }
        for e in self.adj_out[v].clone() {
            self.erec[e].alive = false;
        }
    }

    /// All alive edge ids.
    pub fn edge_ids(&self) -> Vec<EdgeId> {
        (0..self.erec.len()).filter(|&e| self.erec[e].alive).collect()
    }

    pub fn num_edges(&self) -> usize {
        self.erec.iter().filter(|r| r.alive).count()
    }

    pub fn max_in_edge(&self, v: usize) -> Option<EdgeId> {
        self.in_edges(v)
            .into_iter()
            .max_by(|&a, &b| self.ewrt[a].partial_cmp(&self.ewrt[b]).unwrap())
    }

    pub fn max_out_edge(&self, v: usize) -> Option<EdgeId> {
        self.out_edges(v)
            .into_iter()
            .max_by(|&a, &b| self.ewrt[a].partial_cmp(&self.ewrt[b]).unwrap())
    }

    /// Internal vertex containing reference coordinate `p`. Parallel allelic
    /// vertices share coordinates; any one of them satisfies the containment.
    pub fn locate_vertex(&self, p: i32) -> Option<usize> {
        let n = self.num_vertices();
        if n < 3 {
            return None;
        }
        let (mut lo, mut hi) = (1usize, n - 1);
        while lo < hi {
            let m = (lo + hi) / 2;
            let vi = &self.vinf[m];
            if p < vi.lpos.p {
                hi = m;
            } else if p >= vi.rpos.p {
                lo = m + 1;
            } else {
                return Some(m);
            }
        }
        None
    }

    /// Structural copy with substituted weights. Alive edges are re-created
    /// compactly in the copy; `x2y` receives the old-edge to new-edge
    /// bijection for hyper-set transformation.
    pub fn copy_with_weights(
        &self,
        vwrt: &[f64],
        ewrt: &HashMap<EdgeId, f64>,
        x2y: &mut HashMap<EdgeId, EdgeId>,
    ) -> SpliceGraph {
        let mut g = SpliceGraph {
            gid: self.gid.clone(),
            chrm: self.chrm.clone(),
            strand: self.strand,
            ..SpliceGraph::default()
        };
        for v in 0..self.num_vertices() {
            g.add_vertex();
            g.set_vertex_weight(v, vwrt.get(v).copied().unwrap_or(0.0).max(0.0));
            g.set_vertex_info(v, self.vinf[v].clone());
        }
        for e in self.edge_ids() {
            let ne = g.add_edge(self.erec[e].s, self.erec[e].t);
            let w = ewrt.get(&e).copied().unwrap_or(self.ewrt[e]);
            g.set_edge_weight(ne, w.max(0.0));
            g.set_edge_info(ne, self.einf[e].clone());
            x2y.insert(e, ne);
        }
        g
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HashMapExt;

    fn chain(n: usize) -> (SpliceGraph, Vec<EdgeId>) {
        let mut g = SpliceGraph::new();
        for _ in 0..n {
            g.add_vertex();
        }
        let mut es = Vec::new();
        for v in 0..n - 1 {
            let e = g.add_edge(v, v + 1);
            g.set_edge_weight(e, (v + 1) as f64);
            es.push(e);
        }
        (g, es)
    }

    #[test]
    fn edge_ids_stay_stable_across_removal() {
        let (mut g, es) = chain(4);
        g.remove_edge(es[1]);
        assert!(!g.edge_alive(es[1]));
        assert!(g.edge_alive(es[0]));
        assert_eq!(g.out_degree(1), 0);
        assert_eq!(g.in_degree(1), 1);
        assert_eq!(g.edge_between(0, 1), Some(es[0]));
        assert_eq!(g.edge_between(1, 2), None);
    }

    #[test]
    fn clear_vertex_drops_all_incident_edges() {
        let (mut g, _) = chain(4);
        g.clear_vertex(1);
        assert_eq!(g.degree(1), 0);
        assert_eq!(g.out_degree(0), 0);
        assert_eq!(g.num_edges(), 1);
    }

    #[test]
    fn copy_with_weights_builds_a_bijection() {
        let (mut g, es) = chain(3);
        g.remove_edge(es[0]);
        let mut ew = HashMap::new();
        ew.insert(es[1], 7.5);
        let mut x2y = HashMap::new();
        let c = g.copy_with_weights(&[1.0, 2.0, 3.0], &ew, &mut x2y);
        assert_eq!(x2y.len(), 1);
        let ne = x2y[&es[1]];
        assert!(c.edge_alive(ne));
        assert!((c.edge_weight(ne) - 7.5).abs() < 1e-9);
        assert_eq!(c.num_edges(), 1);
    }
}
