//! Phasing evidence: weighted ordered edge sequences over the splice graph.
//!
//! The set starts in node-list form (vertex index sequences with counts),
//! gets lowered to edge-index rows against a concrete graph, and is then
//! queried and mutated by the flow decomposer during path extraction. Rows
//! may contain `-1` gap sentinels where an edge was severed; the reverse
//! index `e2s` only lists rows in which an edge still has a live neighbor.

use crate::splice_graph::SpliceGraph;
use crate::types::{EdgeId, HashMap};
use crate::util::consecutive_subset;
use anyhow::{bail, Result};
use std::collections::{BTreeMap, BTreeSet};

pub const GAP: i32 = -1;

#[derive(Debug, Clone, Default)]
pub struct HyperSet {
    /// Node-list form: sorted vertex sequences (1-based) to counts.
    pub nodes: BTreeMap<Vec<i32>, i32>,
    /// Edge-list form: rows of edge indices with gap sentinels.
    pub edges: Vec<Vec<i32>>,
    pub ecnts: Vec<i32>,
    /// Edge index -> rows where it appears with at least one live neighbor.
    pub e2s: HashMap<i32, BTreeSet<usize>>,
    /// Rows pending re-indexing against a different host graph.
    pub edges_to_transform: Vec<Vec<i32>>,
}

impl HyperSet {
    pub fn new() -> Self {
        HyperSet::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.ecnts.clear();
        self.e2s.clear();
        self.edges_to_transform.clear();
    }

    /// Merge a vertex-index sequence into the node-list form. Indices are
    /// 0-based on entry and shifted to the graph's 1-based internal vertices;
    /// sequences are canonicalized by ascending sort so identical paths
    /// collide regardless of insertion order.
    pub fn add_node_list(&mut self, s: &[i32], c: i32) {
        let mut v: Vec<i32> = s.iter().map(|x| x + 1).collect();
        v.sort_unstable();
        *self.nodes.entry(v).or_insert(0) += c;
    }

    /// Install pre-built edge rows for later transformation onto another
    /// graph. Only `transform` and `build_index` are meaningful afterwards.
    pub fn add_edge_list(&mut self, rows: &BTreeMap<Vec<i32>, i32>) {
        self.clear();
        for (row, c) in rows {
            self.edges_to_transform.push(row.clone());
            self.ecnts.push(*c);
        }
    }

    pub fn build(&mut self, gr: &SpliceGraph, e2i: &HashMap<EdgeId, i32>, min_router_count: i32) {
        self.build_edges(gr, e2i, min_router_count);
        self.build_index();
    }

    /// Lower node sequences to edge-index rows against `gr`. A sequence is
    /// kept only when every adjacent pair is an edge of the graph and the row
    /// has at least two entries.
    pub fn build_edges(
        &mut self,
        gr: &SpliceGraph,
        e2i: &HashMap<EdgeId, i32>,
        min_router_count: i32,
    ) {
        self.edges.clear();
        self.ecnts.clear();
        for (vv, &c) in &self.nodes {
            if c < min_router_count {
                continue;
            }
            let mut ve = Vec::with_capacity(vv.len().saturating_sub(1));
            let mut complete = true;
            for k in 0..vv.len().saturating_sub(1) {
                match gr
                    .edge_between(vv[k] as usize, vv[k + 1] as usize)
                    .and_then(|e| e2i.get(&e))
                {
                    Some(&i) => ve.push(i),
                    None => {
                        complete = false;
                        ve.push(GAP);
                    }
                }
            }
            if complete && ve.len() >= 2 {
                self.edges.push(ve);
                self.ecnts.push(c);
            }
        }
    }

    pub fn build_index(&mut self) {
        self.e2s.clear();
        for (i, row) in self.edges.iter().enumerate() {
            for &e in row {
                if e == GAP {
                    continue;
                }
                self.e2s.entry(e).or_default().insert(i);
            }
        }
    }

    /// Drop index entries for occurrences that lost both neighbors to gaps.
    pub fn update_index(&mut self) {
        let mut dead_edges = Vec::new();
        for (&e, rows) in self.e2s.iter_mut() {
            let mut dead_rows = Vec::new();
            for &k in rows.iter() {
                let v = &self.edges[k];
                for i in 0..v.len() {
                    if v[i] != e {
                        continue;
                    }
                    let no_left = i == 0 || v[i - 1] == GAP;
                    let no_right = i == v.len() - 1 || v[i + 1] == GAP;
                    if no_left && no_right {
                        dead_rows.push(k);
                    }
                    break;
                }
            }
            for k in dead_rows {
                rows.remove(&k);
            }
            if rows.is_empty() {
                dead_edges.push(e);
            }
        }
        for e in dead_edges {
            self.e2s.remove(&e);
        }
    }

    /// Re-index every pending row from an old graph's edge space into a new
    /// one: old index -> old descriptor -> `x2y` -> new descriptor -> new
    /// index. Rows whose edges vanished from the target graph are dropped;
    /// counts of surviving rows are preserved. A descriptor missing from
    /// `x2y` means the caller's bookkeeping is broken and is fatal.
    pub fn transform(
        &mut self,
        gr: &SpliceGraph,
        i2e_old: &[EdgeId],
        x2y: &HashMap<EdgeId, EdgeId>,
        e2i_new: &HashMap<EdgeId, i32>,
    ) -> Result<()> {
        assert!(self.nodes.is_empty());
        assert!(self.edges.is_empty());
        assert_eq!(self.edges_to_transform.len(), self.ecnts.len());

        let mut kept_counts = Vec::new();
        for (row, &c) in self.edges_to_transform.iter().zip(self.ecnts.iter()) {
            let mut ve = Vec::with_capacity(row.len());
            let mut keep = true;
            // every entry is resolved even once the row is doomed: a missing
            // bijection later in the row must still abort
            for &k in row {
                if k == GAP {
                    ve.push(GAP);
                    continue;
                }
                let e_old = match i2e_old.get(k as usize) {
                    Some(&e) => e,
                    None => bail!("graph {}: hyper-set row references edge index {} out of range", gr.gid, k),
                };
                let e_new = match x2y.get(&e_old) {
                    Some(&e) => e,
                    None => bail!("graph {}: edge {} missing from x2y bijection", gr.gid, e_old),
                };
                match (gr.edge_alive(e_new), e2i_new.get(&e_new)) {
                    (true, Some(&i)) => ve.push(i),
                    _ => keep = false,
                }
            }
            if keep {
                self.edges.push(ve);
                kept_counts.push(c);
            }
        }
        self.ecnts = kept_counts;
        self.edges_to_transform.clear();
        Ok(())
    }

    // ── queries ─────────────────────────────────────────────────────────────

    /// Rows containing every edge of `v`.
    pub fn get_intersection(&self, v: &[i32]) -> BTreeSet<usize> {
        let mut ss = BTreeSet::new();
        let Some(&first) = v.first() else {
            return ss;
        };
        debug_assert!(first >= 0);
        match self.e2s.get(&first) {
            Some(s) => ss = s.clone(),
            None => return ss,
        }
        for &e in &v[1..] {
            debug_assert!(e >= 0);
            match self.e2s.get(&e) {
                Some(s) => ss = ss.intersection(s).copied().collect(),
                None => return BTreeSet::new(),
            }
        }
        ss
    }

    /// Edges observed immediately after `e`, with summed row counts.
    pub fn get_successors(&self, e: i32) -> BTreeMap<i32, i32> {
        let mut s = BTreeMap::new();
        let Some(rows) = self.e2s.get(&e) else {
            return s;
        };
        for &k in rows {
            let v = &self.edges[k];
            let c = self.ecnts[k];
            for i in 0..v.len().saturating_sub(1) {
                if v[i] == e && v[i + 1] != GAP {
                    *s.entry(v[i + 1]).or_insert(0) += c;
                }
            }
        }
        s
    }

    /// Edges observed immediately before `e`, with summed row counts.
    pub fn get_predecessors(&self, e: i32) -> BTreeMap<i32, i32> {
        let mut s = BTreeMap::new();
        let Some(rows) = self.e2s.get(&e) else {
            return s;
        };
        for &k in rows {
            let v = &self.edges[k];
            let c = self.ecnts[k];
            for i in 1..v.len() {
                if v[i] == e && v[i - 1] != GAP {
                    *s.entry(v[i - 1]).or_insert(0) += c;
                }
            }
        }
        s
    }

    /// Observed (in-edge, out-edge) routes through vertex `x`.
    pub fn get_routes(
        &self,
        x: usize,
        gr: &SpliceGraph,
        e2i: &HashMap<EdgeId, i32>,
    ) -> BTreeMap<(i32, i32), i32> {
        let mut mpi = BTreeMap::new();
        for ein in gr.in_edges(x) {
            let Some(&e) = e2i.get(&ein) else { continue };
            for (k, c) in self.get_successors(e) {
                mpi.insert((e, k), c);
            }
        }
        mpi
    }

    pub fn left_extend(&self, e: i32) -> bool {
        let Some(rows) = self.e2s.get(&e) else {
            return false;
        };
        for &k in rows {
            let v = &self.edges[k];
            for i in 1..v.len() {
                if v[i] == e && v[i - 1] != GAP {
                    return true;
                }
            }
        }
        false
    }

    pub fn right_extend(&self, e: i32) -> bool {
        let Some(rows) = self.e2s.get(&e) else {
            return false;
        };
        for &k in rows {
            let v = &self.edges[k];
            for i in 0..v.len().saturating_sub(1) {
                if v[i] == e && v[i + 1] != GAP {
                    return true;
                }
            }
        }
        false
    }

    pub fn left_extend_any(&self, s: &[i32]) -> bool {
        s.iter().any(|&e| self.left_extend(e))
    }

    pub fn right_extend_any(&self, s: &[i32]) -> bool {
        s.iter().any(|&e| self.right_extend(e))
    }

    /// True iff every right-neighbor pair observed after a boundary
    /// occurrence of `e` (no live left neighbor) is also observed after a
    /// non-boundary occurrence.
    pub fn left_dominate(&self, e: i32) -> bool {
        let Some(rows) = self.e2s.get(&e) else {
            return true;
        };
        let mut x1: BTreeSet<(i32, i32)> = BTreeSet::new();
        let mut x2: BTreeSet<(i32, i32)> = BTreeSet::new();
        for &k in rows {
            let v = &self.edges[k];
            for i in 0..v.len().saturating_sub(1) {
                if v[i] != e || v[i + 1] == GAP {
                    continue;
                }
                let next2 = if i + 2 < v.len() { v[i + 2] } else { GAP };
                if i == 0 || v[i - 1] == GAP {
                    x1.insert((v[i + 1], next2));
                } else {
                    x2.insert((v[i + 1], GAP));
                    if i + 2 < v.len() {
                        x2.insert((v[i + 1], v[i + 2]));
                    }
                }
            }
        }
        x1.iter().all(|p| x2.contains(p))
    }

    /// Mirror image of `left_dominate`.
    pub fn right_dominate(&self, e: i32) -> bool {
        let Some(rows) = self.e2s.get(&e) else {
            return true;
        };
        let mut x1: BTreeSet<(i32, i32)> = BTreeSet::new();
        let mut x2: BTreeSet<(i32, i32)> = BTreeSet::new();
        for &k in rows {
            let v = &self.edges[k];
            for i in 1..v.len() {
                if v[i] != e || v[i - 1] == GAP {
                    continue;
                }
                let prev2 = if i >= 2 { v[i - 2] } else { GAP };
                if i == v.len() - 1 || v[i + 1] == GAP {
                    x1.insert((v[i - 1], prev2));
                } else {
                    x2.insert((v[i - 1], GAP));
                    if i >= 2 {
                        x2.insert((v[i - 1], v[i - 2]));
                    }
                }
            }
        }
        x1.iter().all(|p| x2.contains(p))
    }

    // ── mutations (driven by the flow decomposer) ───────────────────────────

    /// Collapse every occurrence of the consecutive sub-sequence `v` into the
    /// single edge `e`, re-pointing the index.
    pub fn replace(&mut self, v: &[i32], e: i32) {
        if v.is_empty() {
            return;
        }
        let rows = self.get_intersection(v);
        let mut touched = Vec::new();
        for k in rows {
            let offsets = consecutive_subset(&self.edges[k], v);
            if offsets.is_empty() {
                continue;
            }
            debug_assert_eq!(offsets.len(), 1);
            let b = offsets[0];
            let row = &mut self.edges[k];
            row[b] = e;
            row.drain(b + 1..b + v.len());
            touched.push(k);
            self.e2s.entry(e).or_default().insert(k);
        }
        for &u in v {
            if let Some(rows) = self.e2s.get_mut(&u) {
                for &k in &touched {
                    rows.remove(&k);
                }
                if rows.is_empty() {
                    self.e2s.remove(&u);
                }
            }
        }
    }

    /// Replace every occurrence of edge `e` with a gap.
    pub fn remove(&mut self, e: i32) {
        let Some(rows) = self.e2s.remove(&e) else {
            return;
        };
        for k in rows {
            for x in self.edges[k].iter_mut() {
                if *x == e {
                    *x = GAP;
                }
            }
        }
    }

    pub fn remove_all(&mut self, v: &[i32]) {
        for &e in v {
            self.remove(e);
        }
    }

    /// Sever every `(x, y)` adjacency by inserting a gap between them.
    pub fn remove_pair(&mut self, x: i32, y: i32) {
        self.insert_between(x, y, GAP);
    }

    /// Insert `e` after every `(x, y)` adjacency.
    pub fn insert_between(&mut self, x: i32, y: i32, e: i32) {
        let Some(rows) = self.e2s.get(&x).cloned() else {
            return;
        };
        for k in rows {
            let mut i = 0;
            while i + 1 < self.edges[k].len() {
                if self.edges[k][i] == x && self.edges[k][i + 1] == y {
                    self.edges[k].insert(i + 1, e);
                    if e != GAP {
                        self.e2s.entry(e).or_default().insert(k);
                    }
                    i += 2;
                } else {
                    i += 1;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HashMapExt;

    /// Graph 0 -> 1 -> 2 -> 3 -> 4 plus a skip 1 -> 3; returns (graph, e2i,
    /// i2e) with edge indices assigned in creation order.
    fn diamond() -> (SpliceGraph, HashMap<EdgeId, i32>, Vec<EdgeId>) {
        let mut g = SpliceGraph::new();
        for _ in 0..5 {
            g.add_vertex();
        }
        let mut i2e = Vec::new();
        for (s, t) in [(0, 1), (1, 2), (2, 3), (3, 4), (1, 3)] {
            i2e.push(g.add_edge(s, t));
        }
        let mut e2i = HashMap::new();
        for (i, &e) in i2e.iter().enumerate() {
            e2i.insert(e, i as i32);
        }
        (g, e2i, i2e)
    }

    #[test]
    fn build_edges_requires_full_paths_and_min_count() {
        let (g, e2i, _) = diamond();
        let mut hs = HyperSet::new();
        hs.add_node_list(&[0, 1, 2], 3); // shifts to vertices 1,2,3 -> edges 1,2
        hs.add_node_list(&[0, 1, 2], 2);
        hs.add_node_list(&[1, 2, 3], 1); // vertices 2,3,4 -> edges 2,3
        hs.build(&g, &e2i, 2);
        // second sequence is below min_router_count=2 after no merge? counts
        // merged: [1,2,3]->5 kept, [2,3,4]->1 dropped
        assert_eq!(hs.edges, vec![vec![1, 2]]);
        assert_eq!(hs.ecnts, vec![5]);
        assert_eq!(hs.e2s[&1], BTreeSet::from([0]));
    }

    #[test]
    fn rows_below_router_count_produce_nothing() {
        let (g, e2i, _) = diamond();
        let mut hs = HyperSet::new();
        hs.add_node_list(&[0, 1, 2], 1);
        hs.build(&g, &e2i, 5);
        assert!(hs.edges.is_empty());
        assert!(hs.e2s.is_empty());
    }

    #[test]
    fn replace_collapses_subsequence() {
        let mut hs = HyperSet::new();
        hs.edges = vec![vec![1, 2, 3], vec![1, 4]];
        hs.ecnts = vec![2, 1];
        hs.build_index();
        hs.replace(&[1, 2], 9);
        assert_eq!(hs.edges[0], vec![9, 3]);
        assert_eq!(hs.edges[1], vec![1, 4]);
        assert!(hs.e2s[&9].contains(&0));
        assert!(!hs.e2s.contains_key(&2));
        assert_eq!(hs.e2s[&1], BTreeSet::from([1]));
    }

    #[test]
    fn remove_introduces_gaps_and_updates_index() {
        let mut hs = HyperSet::new();
        hs.edges = vec![vec![1, 2, 3]];
        hs.ecnts = vec![1];
        hs.build_index();
        hs.remove(2);
        assert_eq!(hs.edges[0], vec![1, GAP, 3]);
        assert!(!hs.e2s.contains_key(&2));
        assert!(hs.get_successors(1).is_empty());
        hs.update_index();
        assert!(!hs.e2s.contains_key(&1));
        assert!(!hs.e2s.contains_key(&3));
    }

    #[test]
    fn insert_between_and_remove_pair() {
        let mut hs = HyperSet::new();
        hs.edges = vec![vec![1, 2]];
        hs.ecnts = vec![1];
        hs.build_index();
        hs.insert_between(1, 2, 7);
        assert_eq!(hs.edges[0], vec![1, 7, 2]);
        hs.remove_pair(7, 2);
        assert_eq!(hs.edges[0], vec![1, 7, GAP, 2]);
    }

    #[test]
    fn successors_and_dominance() {
        let mut hs = HyperSet::new();
        hs.edges = vec![vec![1, 2, 3], vec![0, 1, 2]];
        hs.ecnts = vec![2, 3];
        hs.build_index();
        let s = hs.get_successors(1);
        assert_eq!(s[&2], 5);
        let p = hs.get_predecessors(2);
        assert_eq!(p[&1], 5);
        // boundary occurrence of 1 (row 0) sees (2,3); interior occurrence
        // (row 1) sees (2,GAP) and (2,3): dominated.
        assert!(hs.left_dominate(1));
        // edge 0 occurs only at a boundary with successors unseen elsewhere
        assert!(!hs.left_dominate(0));
    }

    #[test]
    fn transform_drops_rows_of_removed_edges() {
        let (g, _, i2e) = diamond();
        // old indexing: i -> i2e[i]; rows [e1,e2,e3] and [e1,e4]
        let mut rows = BTreeMap::new();
        rows.insert(vec![1, 2, 3], 4);
        rows.insert(vec![1, 4], 2);
        let mut hs = HyperSet::new();
        hs.add_edge_list(&rows);

        // new graph: copy of g with edge index 4 (the skip 1->3) removed
        let mut x2y = HashMap::new();
        let new_g = {
            let mut ng = g.copy_with_weights(&vec![0.0; 5], &HashMap::new(), &mut x2y);
            ng.remove_edge(x2y[&i2e[4]]);
            ng
        };
        let mut e2i_new = HashMap::new();
        for (i, e) in new_g.edge_ids().into_iter().enumerate() {
            e2i_new.insert(e, i as i32);
        }
        hs.transform(&new_g, &i2e, &x2y, &e2i_new).unwrap();
        assert_eq!(hs.edges.len(), 1);
        assert_eq!(hs.ecnts, vec![4]);
        assert_eq!(hs.edges[0].len(), 3);
    }
}
