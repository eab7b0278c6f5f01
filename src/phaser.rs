//! Allele phasing: split a decomposed mixed splice graph into two
//! allele-specific graphs with consistent edge-flow accounting, split the
//! hyper-set along the same lines, and re-run the decomposer per allele.

use crate::config::Config;
use crate::decompose::FlowDecomposer;
use crate::error::BundleError;
use crate::hyper_set::GAP;
use crate::types::{EdgeId, HashMap, HashMapExt};
use crate::vcf::Genotype;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet};

/// Additive smoothing for allelic ratios; biases uncertain splits toward
/// equal so a 0/N observation cannot collapse an allele entirely.
const EPSILON: f64 = 0.01;
/// Sentinel for weights not yet assigned to an allele.
const UNASSIGNED: f64 = -1.0;

#[derive(Debug)]
pub struct PhaserResult {
    pub trsts1: Vec<crate::transcript::Transcript>,
    pub trsts2: Vec<crate::transcript::Transcript>,
    pub non_full_trsts1: Vec<crate::transcript::Transcript>,
    pub non_full_trsts2: Vec<crate::transcript::Transcript>,
}

struct Phaser<'a> {
    sc: &'a FlowDecomposer,
    cfg: &'a Config,

    ewrt1: HashMap<EdgeId, f64>,
    ewrt2: HashMap<EdgeId, f64>,
    vwrt1: Vec<f64>,
    vwrt2: Vec<f64>,

    vwrtbg1: f64,
    vwrtbg2: f64,
    ewrtbg1: f64,
    ewrtbg2: f64,
    ratiobg1: f64,
    ratiobg2: f64,
}

/// Split the decomposed graph `sc` by allele and assemble each side.
pub fn phase(sc: &FlowDecomposer, is_allelic: bool, cfg: &Config) -> Result<PhaserResult> {
    if sc.asnonzeroset.is_empty() {
        return Err(BundleError::NoAllelicVertices(sc.gr.gid.clone()).into());
    }

    let mut ph = Phaser {
        sc,
        cfg,
        ewrt1: HashMap::new(),
        ewrt2: HashMap::new(),
        vwrt1: vec![UNASSIGNED; sc.gr.num_vertices()],
        vwrt2: vec![UNASSIGNED; sc.gr.num_vertices()],
        vwrtbg1: 0.0,
        vwrtbg2: 0.0,
        ewrtbg1: 0.0,
        ewrtbg2: 0.0,
        ratiobg1: 0.0,
        ratiobg2: 0.0,
    };

    ph.init()?;
    ph.assign_gt()?;
    ph.check_flow_conservation()?;

    // Two structural copies carrying each allele's share of the weights.
    let mut x2y_1: HashMap<EdgeId, EdgeId> = HashMap::new();
    let mut x2y_2: HashMap<EdgeId, EdgeId> = HashMap::new();
    let mut gr1 = sc.gr.copy_with_weights(&ph.vwrt1, &ph.ewrt1, &mut x2y_1);
    let mut gr2 = sc.gr.copy_with_weights(&ph.vwrt2, &ph.ewrt2, &mut x2y_2);
    gr1.gid = format!("{}.allele1", sc.gr.gid);
    gr2.gid = format!("{}.allele2", sc.gr.gid);
    refine_allelic_graph(&mut gr1, cfg);
    refine_allelic_graph(&mut gr2, cfg);

    let hs1 = ph.split_hs(&ph.ewrt1);
    let hs2 = ph.split_hs(&ph.ewrt2);

    let mut sc1 = FlowDecomposer::new_for_allele(gr1, hs1, cfg);
    let mut sc2 = FlowDecomposer::new_for_allele(gr2, hs2, cfg);
    sc1.transform(&sc.i2e, &x2y_1)?;
    sc2.transform(&sc.i2e, &x2y_2)?;
    sc1.assemble(is_allelic)?;
    sc2.assemble(is_allelic)?;

    let retag = |ts: Vec<crate::transcript::Transcript>, gt: Genotype| {
        ts.into_iter()
            .map(|mut t| {
                t.gt = gt;
                t
            })
            .collect::<Vec<_>>()
    };

    Ok(PhaserResult {
        trsts1: retag(sc1.trsts, Genotype::Allele1),
        trsts2: retag(sc2.trsts, Genotype::Allele2),
        non_full_trsts1: retag(sc1.non_full_trsts, Genotype::Allele1),
        non_full_trsts2: retag(sc2.non_full_trsts, Genotype::Allele2),
    })
}

impl<'a> Phaser<'a> {
    /// Seed the allele weights: every edge incident to an allelic vertex goes
    /// in full to that allele; everything else starts unassigned. Background
    /// sums feed the global fallback ratio.
    fn init(&mut self) -> Result<()> {
        let gr = &self.sc.gr;
        for e in gr.edge_ids() {
            self.ewrt1.insert(e, UNASSIGNED);
            self.ewrt2.insert(e, UNASSIGNED);
        }

        for i in 0..gr.num_vertices() {
            let gt = gr.vertex_info(i).gt;
            if gt != Genotype::Allele1 && gt != Genotype::Allele2 {
                continue;
            }
            let mut incident = gr.in_edges(i);
            incident.extend(gr.out_edges(i));
            for e in incident {
                let w = gr.edge_weight(e);
                let (mine, other) = match gt {
                    Genotype::Allele1 => (w, 0.0),
                    _ => (0.0, w),
                };
                let w1 = self.ewrt1[&e];
                let w2 = self.ewrt2[&e];
                let conflict = (w1 >= 0.0 && (w1 - mine).abs() > 1e-6)
                    || (w2 >= 0.0 && (w2 - other).abs() > 1e-6);
                if conflict {
                    return Err(BundleError::ConflictingAssignment(e).into());
                }
                self.ewrt1.insert(e, mine);
                self.ewrt2.insert(e, other);
                match gt {
                    Genotype::Allele1 => self.ewrtbg1 += w,
                    _ => self.ewrtbg2 += w,
                }
            }
            let wv = gr.vertex_weight(i);
            match gt {
                Genotype::Allele1 => {
                    self.vwrt1[i] = wv;
                    self.vwrt2[i] = 0.0;
                    self.vwrtbg1 += wv;
                }
                _ => {
                    self.vwrt1[i] = 0.0;
                    self.vwrt2[i] = wv;
                    self.vwrtbg2 += wv;
                }
            }
        }

        match normalize_epsilon(self.ewrtbg1, self.ewrtbg2) {
            Some((r1, r2)) => {
                self.ratiobg1 = r1;
                self.ratiobg2 = r2;
                tracing::debug!(
                    gid = %gr.gid,
                    ewrtbg1 = self.ewrtbg1,
                    ewrtbg2 = self.ewrtbg2,
                    vwrtbg1 = self.vwrtbg1,
                    vwrtbg2 = self.vwrtbg2,
                    ratiobg1 = self.ratiobg1,
                    ratiobg2 = self.ratiobg2,
                    "phaser background ratios"
                );
                Ok(())
            }
            None => Err(BundleError::NoAllelicVertices(gr.gid.clone()).into()),
        }
    }

    /// Assign every non-allelic non-zero vertex: first the ones reachable
    /// from already-split neighbors (by descending allele expression), then
    /// the remainder by the background ratio.
    fn assign_gt(&mut self) -> Result<()> {
        let gr = &self.sc.gr;
        let mut asnodes: BTreeSet<usize> = BTreeSet::new();
        let mut nsnodes: BTreeSet<usize> = BTreeSet::new();
        for &i in self.sc.asnonzeroset.iter().chain(self.sc.nsnonzeroset.iter()) {
            if gr.vertex_info(i).is_as_vertex() {
                asnodes.insert(i);
            } else {
                nsnodes.insert(i);
            }
        }
        if asnodes.is_empty() {
            return Err(BundleError::NoAllelicVertices(gr.gid.clone()).into());
        }
        if nsnodes.is_empty() {
            return Err(BundleError::NoPlainVertices(gr.gid.clone()).into());
        }

        if nsnodes.len() + asnodes.len() < self.cfg.max_num_exons {
            loop {
                let ordered = self.sort_nodes_by_current_mae(&nsnodes);
                if ordered.is_empty() {
                    break;
                }
                let mut progressed = false;
                for i in ordered {
                    if self.split_local(i) {
                        nsnodes.remove(&i);
                        progressed = true;
                    } else {
                        break;
                    }
                }
                if !progressed || nsnodes.is_empty() {
                    break;
                }
            }
        }

        for i in std::mem::take(&mut nsnodes) {
            self.split_global(i);
        }
        Ok(())
    }

    /// Nodes with a usable local ratio, ordered by descending maximum allele
    /// expression.
    fn sort_nodes_by_current_mae(&self, s: &BTreeSet<usize>) -> Vec<usize> {
        let mut nodes_mae: Vec<(f64, usize)> = Vec::new();
        for &i in s {
            let Some((r1, r2)) = self.local_ratio(i) else {
                continue;
            };
            let mae = r1.max(r2);
            if mae > 0.0 {
                nodes_mae.push((mae, i));
            }
        }
        nodes_mae.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap().then(a.1.cmp(&b.1)));
        nodes_mae.into_iter().map(|(_, i)| i).collect()
    }

    /// Normalized allelic ratio over the vertex's already-assigned incident
    /// edges; `None` until at least one neighbor was split.
    fn local_ratio(&self, i: usize) -> Option<(f64, f64)> {
        let gr = &self.sc.gr;
        let mut local1 = 0.0;
        let mut local2 = 0.0;
        let mut incident = gr.in_edges(i);
        incident.extend(gr.out_edges(i));
        for e in incident {
            let w1 = self.ewrt1[&e];
            let w2 = self.ewrt2[&e];
            if w1 > 0.0 {
                local1 += w1;
            }
            if w2 > 0.0 {
                local2 += w2;
            }
        }
        normalize_epsilon(local1, local2)
    }

    fn split_local(&mut self, i: usize) -> bool {
        match self.local_ratio(i) {
            Some((r1, _)) => self.split_by_ratio(i, r1),
            None => false,
        }
    }

    fn split_global(&mut self, i: usize) -> bool {
        self.split_by_ratio(i, self.ratiobg1)
    }

    /// Split vertex `i`'s weight and its still-unassigned incident edges by
    /// `ratio1 : 1 - ratio1`.
    fn split_by_ratio(&mut self, i: usize, ratio1: f64) -> bool {
        debug_assert!(ratio1 > 0.0 && ratio1 < 1.0);
        let gr = &self.sc.gr;
        self.vwrt1[i] = gr.vertex_weight(i) * ratio1;
        self.vwrt2[i] = gr.vertex_weight(i) * (1.0 - ratio1);
        let mut incident = gr.in_edges(i);
        incident.extend(gr.out_edges(i));
        for e in incident {
            let w = gr.edge_weight(e);
            if self.ewrt1[&e] < 0.0 {
                self.ewrt1.insert(e, w * ratio1);
            }
            if self.ewrt2[&e] < 0.0 {
                self.ewrt2.insert(e, w * (1.0 - ratio1));
            }
        }
        true
    }

    /// Every edge's two allele shares must sum back to its full weight.
    fn check_flow_conservation(&self) -> Result<()> {
        for e in self.sc.gr.edge_ids() {
            let w1 = self.ewrt1[&e].max(0.0);
            let w2 = self.ewrt2[&e].max(0.0);
            let w = self.sc.gr.edge_weight(e);
            // edges whose endpoints were never split keep the sentinel; those
            // carry no surviving coverage and are dropped on refinement
            if self.ewrt1[&e] < 0.0 && self.ewrt2[&e] < 0.0 {
                continue;
            }
            if (w1 + w2 - w).abs() > 1e-6 * w.max(1.0) {
                return Err(BundleError::ConflictingAssignment(e).into());
            }
        }
        Ok(())
    }

    /// Keep each hyper-set row on an allele when every edge carries assigned
    /// weight there and the bottleneck is at least one; the row's count
    /// becomes the floored bottleneck.
    fn split_hs(&self, ewrt: &HashMap<EdgeId, f64>) -> crate::hyper_set::HyperSet {
        let mut rows: BTreeMap<Vec<i32>, i32> = BTreeMap::new();
        for (row, &c) in self.sc.hs.edges.iter().zip(self.sc.hs.ecnts.iter()) {
            let mut bottleneck = c as f64;
            let mut keep = true;
            for &idx in row {
                if idx == GAP {
                    continue;
                }
                let e = self.sc.i2e[idx as usize];
                // edges dropped during decomposition carry no allele weight
                let w = match ewrt.get(&e) {
                    Some(&w) if w >= 0.0 => w,
                    _ => {
                        keep = false;
                        break;
                    }
                };
                bottleneck = bottleneck.min(w);
            }
            if keep && bottleneck.floor() >= 1.0 {
                rows.insert(row.clone(), bottleneck.floor() as i32);
            }
        }
        let mut hs = crate::hyper_set::HyperSet::new();
        hs.add_edge_list(&rows);
        hs
    }
}

/// Drop sub-floor edges, then strip edges of half-connected vertices until
/// stable; vertices stay in the graph, possibly isolated.
fn refine_allelic_graph(gr: &mut crate::splice_graph::SpliceGraph, cfg: &Config) {
    for e in gr.edge_ids() {
        if gr.edge_weight(e) < cfg.min_guaranteed_edge_weight {
            gr.remove_edge(e);
        }
    }
    crate::refine::refine_splice_graph(gr);
}

/// `(x + eps) / (x + y + 2 eps)` smoothing; `None` when nothing is assigned.
fn normalize_epsilon(x: f64, y: f64) -> Option<(f64, f64)> {
    debug_assert!(x >= 0.0 && y >= 0.0);
    if x + y <= 0.0 {
        return None;
    }
    let z = (x + EPSILON) / (x + y + 2.0 * EPSILON);
    debug_assert!(z > 0.0 && z < 1.0);
    Some((z, 1.0 - z))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn epsilon_normalization_matches_definition() {
        let (r1, r2) = normalize_epsilon(1.0, 0.0).unwrap();
        // 1.01 / 1.02
        assert!((r1 - 1.01 / 1.02).abs() < 1e-12);
        assert!((r1 + r2 - 1.0).abs() < 1e-12);
        assert!(normalize_epsilon(0.0, 0.0).is_none());

        let (e1, e2) = normalize_epsilon(5.0, 5.0).unwrap();
        assert!((e1 - 0.5).abs() < 1e-12);
        assert!((e2 - 0.5).abs() < 1e-12);
    }
}
